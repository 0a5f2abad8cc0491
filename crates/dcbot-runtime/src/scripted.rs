//! In-memory comment channel.
//!
//! [`ScriptedChannel`] replays a queue of pre-recorded pages and records
//! everything the bot posts.  Individual calls can be scripted to fail with
//! a [`ChannelError`], which makes the retry and fallback paths testable
//! without a network.  Once the page queue runs dry the next fetch signals
//! [`ScriptedChannel::wait_exhausted`] and then never completes, as if the
//! feed had gone quiet.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::channel::{ChannelError, CommentChannel, Credentials, Message, MessageId, Sender};

/// A public reply recorded by the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedReply {
    pub target: MessageId,
    pub text: String,
}

/// A direct message recorded by the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectMessage {
    pub recipient: Sender,
    pub subject: String,
    pub text: String,
}

/// Scripted outcome of one post call.
pub type CallResult = Result<(), ChannelError>;

#[derive(Debug)]
struct State {
    login: CallResult,
    authenticate: bool,
    authenticated: bool,
    pages: VecDeque<Result<Vec<Message>, ChannelError>>,
    reply_script: VecDeque<CallResult>,
    reply_default: CallResult,
    dm_script: VecDeque<CallResult>,
    dm_default: CallResult,
    replies: Vec<PostedReply>,
    direct_messages: Vec<DirectMessage>,
    fetches: usize,
    reply_attempts: usize,
    dm_attempts: usize,
}

impl Default for State {
    fn default() -> Self {
        Self {
            login: Ok(()),
            authenticate: true,
            authenticated: false,
            pages: VecDeque::new(),
            reply_script: VecDeque::new(),
            reply_default: Ok(()),
            dm_script: VecDeque::new(),
            dm_default: Ok(()),
            replies: Vec::new(),
            direct_messages: Vec::new(),
            fetches: 0,
            reply_attempts: 0,
            dm_attempts: 0,
        }
    }
}

/// Scripted, in-memory [`CommentChannel`].
#[derive(Debug, Default)]
pub struct ScriptedChannel {
    state: Mutex<State>,
    exhausted: Notify,
}

impl ScriptedChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel that will serve `pages` in order.
    pub fn from_pages(pages: impl IntoIterator<Item = Vec<Message>>) -> Self {
        let channel = Self::new();
        for page in pages {
            channel.push_page(page);
        }
        channel
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // -- scripting ---------------------------------------------------------

    pub fn push_page(&self, page: Vec<Message>) -> &Self {
        self.state().pages.push_back(Ok(page));
        self
    }

    /// Make the next unscripted fetch fail with `error`.
    pub fn push_fetch_error(&self, error: ChannelError) -> &Self {
        self.state().pages.push_back(Err(error));
        self
    }

    /// Queue results for upcoming `post_reply` calls.
    pub fn script_replies(&self, results: impl IntoIterator<Item = CallResult>) -> &Self {
        self.state().reply_script.extend(results);
        self
    }

    /// Result of `post_reply` once the script is used up.
    pub fn set_reply_default(&self, result: CallResult) -> &Self {
        self.state().reply_default = result;
        self
    }

    /// Queue results for upcoming `post_direct_message` calls.
    pub fn script_direct_messages(&self, results: impl IntoIterator<Item = CallResult>) -> &Self {
        self.state().dm_script.extend(results);
        self
    }

    /// Result of `post_direct_message` once the script is used up.
    pub fn set_direct_message_default(&self, result: CallResult) -> &Self {
        self.state().dm_default = result;
        self
    }

    pub fn fail_login(&self, error: ChannelError) -> &Self {
        self.state().login = Err(error);
        self
    }

    /// Accept the login but leave the session anonymous.
    pub fn stay_anonymous(&self) -> &Self {
        self.state().authenticate = false;
        self
    }

    // -- inspection --------------------------------------------------------

    pub fn replies(&self) -> Vec<PostedReply> {
        self.state().replies.clone()
    }

    pub fn direct_messages(&self) -> Vec<DirectMessage> {
        self.state().direct_messages.clone()
    }

    pub fn fetches(&self) -> usize {
        self.state().fetches
    }

    /// `post_reply` calls made, successful or not.
    pub fn reply_attempts(&self) -> usize {
        self.state().reply_attempts
    }

    /// `post_direct_message` calls made, successful or not.
    pub fn direct_message_attempts(&self) -> usize {
        self.state().dm_attempts
    }

    pub fn pending_pages(&self) -> usize {
        self.state().pages.len()
    }

    /// Resolve once a fetch has found the page queue empty.
    pub async fn wait_exhausted(&self) {
        self.exhausted.notified().await;
    }
}

#[async_trait]
impl CommentChannel for ScriptedChannel {
    async fn login(&self, _credentials: &Credentials) -> Result<(), ChannelError> {
        let mut state = self.state();
        state.login.clone()?;
        let authenticate = state.authenticate;
        state.authenticated = authenticate;
        Ok(())
    }

    fn is_authenticated(&self) -> bool {
        self.state().authenticated
    }

    async fn fetch_latest_page(&self) -> Result<Vec<Message>, ChannelError> {
        let next = {
            let mut state = self.state();
            state.fetches += 1;
            state.pages.pop_front()
        };
        match next {
            Some(page) => page,
            None => {
                self.exhausted.notify_one();
                std::future::pending().await
            }
        }
    }

    async fn post_reply(&self, target: &Message, text: &str) -> Result<(), ChannelError> {
        let mut state = self.state();
        state.reply_attempts += 1;
        let result = match state.reply_script.pop_front() {
            Some(result) => result,
            None => state.reply_default.clone(),
        };
        if result.is_ok() {
            state.replies.push(PostedReply {
                target: target.id,
                text: text.to_string(),
            });
        }
        result
    }

    async fn post_direct_message(
        &self,
        recipient: &Sender,
        subject: &str,
        text: &str,
    ) -> Result<(), ChannelError> {
        let mut state = self.state();
        state.dm_attempts += 1;
        let result = match state.dm_script.pop_front() {
            Some(result) => result,
            None => state.dm_default.clone(),
        };
        if result.is_ok() {
            state.direct_messages.push(DirectMessage {
                recipient: recipient.clone(),
                subject: subject.to_string(),
                text: text.to_string(),
            });
        }
        result
    }
}
