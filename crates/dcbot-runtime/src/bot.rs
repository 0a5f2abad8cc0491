//! The polling loop.
//!
//! A [`Bot`] logs in once, then repeatedly fetches the newest page of the
//! feed, dispatches every message it has not seen before, and posts any
//! reply through the [`Courier`].  Between iterations it sleeps for the
//! configured interval.  The loop ends on a graceful abort request, a forced
//! abort, or an external interrupt; the `abort` hook runs exactly once on
//! every one of those paths.

use std::future::Future;
use std::sync::Arc;

use dcbot_kernel::{CommandHandler, CommandRegistry, DispatchOutcome, Dispatcher};

use crate::channel::{ChannelError, CommentChannel, Credentials, Message};
use crate::config::BotConfig;
use crate::dedup::DedupCache;
use crate::error::{Result, RuntimeError};
use crate::handle::{BotHandle, SessionState};
use crate::hooks::{HookKind, Hooks, LifecycleEvent};
use crate::send::{Courier, SendOutcome, SendPolicy};

/// Dispatcher specialised for the bot: commands receive the [`BotHandle`]
/// as context and the triggering [`Message`] as sender.
pub type BotDispatcher = Dispatcher<BotHandle, Message>;

/// Registry type commands are registered into.
pub type BotRegistry = CommandRegistry<BotHandle, Message>;

/// Why the polling loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// An external interrupt abandoned the current iteration.
    Interrupted,
    /// A command forced an immediate stop.
    AbortedByCommand,
    /// A graceful abort drained the current iteration.
    Requested,
}

/// Result of one polling iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollSignal {
    /// The page was handled; sleep and poll again.
    Continue,
    /// Fetching failed transiently; sleep and poll again without having
    /// touched the dedup cache.
    Retry,
    /// A forced abort was requested while handling the page.
    ForceAbort,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects commands and hooks before the loop starts.
///
/// Registration is only possible here, so the command table is fixed by
/// the time [`Bot::run`] is called.
pub struct BotBuilder<Ch: ?Sized> {
    channel: Arc<Ch>,
    config: BotConfig,
    registry: BotRegistry,
    hooks: Hooks,
}

impl<Ch> BotBuilder<Ch>
where
    Ch: CommentChannel + ?Sized,
{
    pub fn new(channel: Arc<Ch>, config: BotConfig) -> Self {
        let registry = CommandRegistry::new(config.registry_config());
        Self {
            channel,
            config,
            registry,
            hooks: Hooks::new(),
        }
    }

    /// Register `handler` under every configured prefix.
    pub fn command<H>(mut self, handler: H) -> Result<Self>
    where
        H: CommandHandler<BotHandle, Message> + 'static,
    {
        self.registry.register(&self.config.prefixes, handler)?;
        Ok(self)
    }

    /// Register `handler` under an explicit set of prefixes.
    pub fn command_with_prefixes<P, H>(mut self, prefixes: &[P], handler: H) -> Result<Self>
    where
        P: AsRef<str>,
        H: CommandHandler<BotHandle, Message> + 'static,
    {
        self.registry.register(prefixes, handler)?;
        Ok(self)
    }

    pub fn hook<F, Fut>(mut self, kind: HookKind, handler: F) -> Self
    where
        F: Fn(BotHandle, LifecycleEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.hooks.on(kind, handler);
        self
    }

    /// Register a hook by event name; unknown names are an error.
    pub fn hook_named<F, Fut>(mut self, name: &str, handler: F) -> Result<Self>
    where
        F: Fn(BotHandle, LifecycleEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.hooks.on_named(name, handler)?;
        Ok(self)
    }

    pub fn build(self) -> Result<Bot<Ch>> {
        self.config.validate()?;
        tracing::debug!(
            commands = self.registry.len(),
            hooks = ?self.hooks,
            "bot assembled"
        );
        Ok(Bot {
            dedup: DedupCache::new(self.config.dedup_capacity, self.config.dedup_evict),
            policy: self.config.send_policy(),
            dispatcher: Dispatcher::new(self.registry),
            channel: self.channel,
            config: self.config,
            hooks: self.hooks,
            handle: BotHandle::new(),
            session: SessionState::default(),
        })
    }
}

// ---------------------------------------------------------------------------
// Bot
// ---------------------------------------------------------------------------

/// A configured bot bound to one comment channel.
pub struct Bot<Ch: ?Sized> {
    channel: Arc<Ch>,
    config: BotConfig,
    dispatcher: BotDispatcher,
    hooks: Hooks,
    handle: BotHandle,
    session: SessionState,
    dedup: DedupCache,
    policy: SendPolicy,
}

impl<Ch> Bot<Ch>
where
    Ch: CommentChannel + ?Sized,
{
    pub fn builder(channel: Arc<Ch>, config: BotConfig) -> BotBuilder<Ch> {
        BotBuilder::new(channel, config)
    }

    /// Control handle; clone it to abort or ban from another task.
    pub fn handle(&self) -> &BotHandle {
        &self.handle
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn dedup(&self) -> &DedupCache {
        &self.dedup
    }

    pub fn dispatcher(&self) -> &BotDispatcher {
        &self.dispatcher
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn channel(&self) -> &Arc<Ch> {
        &self.channel
    }

    /// Log in and poll until aborted or interrupted with Ctrl-C.
    pub async fn run(&mut self, credentials: &Credentials) -> Result<LoopExit> {
        let interrupt = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "cannot listen for Ctrl-C, interrupt disabled");
                std::future::pending::<()>().await;
            }
        };
        self.run_until(credentials, interrupt).await
    }

    /// Log in and poll until aborted or until `interrupt` resolves.
    ///
    /// A login failure returns before the loop starts and runs no hooks.
    pub async fn run_until<F>(&mut self, credentials: &Credentials, interrupt: F) -> Result<LoopExit>
    where
        F: Future<Output = ()>,
    {
        self.login(credentials).await?;

        let exit = tokio::select! {
            exit = self.poll_loop() => exit,
            () = interrupt => LoopExit::Interrupted,
        };

        match exit {
            LoopExit::Interrupted => tracing::warn!("interrupted, current iteration abandoned"),
            _ => tracing::info!(exit = ?exit, "polling stopped"),
        }
        self.hooks
            .fire(&self.handle, LifecycleEvent::Abort { exit })
            .await;
        Ok(exit)
    }

    async fn login(&self, credentials: &Credentials) -> Result<()> {
        tracing::info!(username = %credentials.username, "logging in");
        self.channel
            .login(credentials)
            .await
            .map_err(RuntimeError::Login)?;
        if !self.channel.is_authenticated() {
            return Err(RuntimeError::NotAuthenticated);
        }
        self.handle.set_name(&credentials.username);

        if !self.config.vpn && self.config.proxy_url.is_none() {
            tracing::warn!("no proxy or VPN configured, polling over a direct connection");
        }
        Ok(())
    }

    async fn poll_loop(&mut self) -> LoopExit {
        tracing::info!(
            bot = %self.handle.name(),
            commands = self.dispatcher.registry().len(),
            interval_secs = self.config.poll_interval_secs,
            "polling started"
        );

        loop {
            if self.handle.is_force_abort_requested() {
                return LoopExit::AbortedByCommand;
            }
            if self.handle.is_abort_requested() {
                return LoopExit::Requested;
            }

            if self.poll_once().await == PollSignal::ForceAbort {
                return LoopExit::AbortedByCommand;
            }

            tokio::select! {
                () = tokio::time::sleep(self.config.poll_interval()) => {}
                () = self.handle.abort_signalled() => {}
            }
        }
    }

    /// Run one iteration: fetch the newest page and handle unseen messages
    /// in feed order.
    pub async fn poll_once(&mut self) -> PollSignal {
        let page = match self.channel.fetch_latest_page().await {
            Ok(page) => page,
            Err(error @ ChannelError::Transient(_)) => {
                tracing::warn!(error = %error, "fetch failed, retrying next iteration");
                self.hooks
                    .fire(&self.handle, LifecycleEvent::DeadProxy { error })
                    .await;
                return PollSignal::Retry;
            }
            Err(error) => {
                tracing::error!(error = %error, "fetch refused, skipping iteration");
                return PollSignal::Continue;
            }
        };

        tracing::trace!(messages = page.len(), "page fetched");
        for message in page {
            if !self.dedup.insert(message.id) {
                continue;
            }
            self.handle_message(&message).await;
            if self.handle.is_force_abort_requested() {
                return PollSignal::ForceAbort;
            }
        }
        PollSignal::Continue
    }

    async fn handle_message(&mut self, message: &Message) {
        tracing::info!(
            message_id = message.id,
            sender = %message.sender.display_name,
            text = %message.text,
            "new message"
        );

        if message.sender.role.is_authority() {
            self.hooks
                .fire(
                    &self.handle,
                    LifecycleEvent::Authority {
                        message: message.clone(),
                    },
                )
                .await;
        }

        if self.handle.is_banned(message.sender.id) {
            tracing::debug!(sender = message.sender.id, "ignoring banned sender");
            return;
        }

        let outcome = self
            .dispatcher
            .dispatch(&self.handle, message, &message.text)
            .await;
        match outcome {
            DispatchOutcome::NoMatch => {}
            DispatchOutcome::Completed {
                command,
                reply: None,
            } => {
                tracing::debug!(command = %command, "command completed without reply");
            }
            DispatchOutcome::Completed {
                command,
                reply: Some(text),
            } => {
                tracing::debug!(command = %command, "command completed");
                if let SendOutcome::Failed { reason, attempts } = self.send(message, &text).await {
                    tracing::error!(
                        message_id = message.id,
                        reason = ?reason,
                        attempts,
                        "reply could not be delivered"
                    );
                    self.hooks
                        .fire(
                            &self.handle,
                            LifecycleEvent::SendFailed {
                                target: message.id,
                                reason,
                                attempts,
                            },
                        )
                        .await;
                }
            }
            DispatchOutcome::Failed { command, error } => {
                self.hooks
                    .fire(
                        &self.handle,
                        LifecycleEvent::CommandFailed {
                            command,
                            sender: message.sender.clone(),
                            error: error.to_string(),
                        },
                    )
                    .await;
            }
        }
    }

    /// Deliver `text` in reply to `target` using the session's current
    /// route.
    pub async fn send(&mut self, target: &Message, text: &str) -> SendOutcome {
        let courier = Courier {
            channel: &*self.channel,
            hooks: &self.hooks,
            handle: &self.handle,
            policy: &self.policy,
        };
        courier.send(&mut self.session, target, text).await
    }
}

impl<Ch: ?Sized> std::fmt::Debug for Bot<Ch> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("handle", &self.handle)
            .field("session", &self.session)
            .field("resident_ids", &self.dedup.len())
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}
