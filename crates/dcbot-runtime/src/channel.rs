//! Upstream comment channel.
//!
//! The bot talks to its comment service only through the [`CommentChannel`]
//! trait: fetch the newest page of messages, reply in-thread, or fall back
//! to a direct message.  Transport details (HTTP client, rotating proxies)
//! stay behind the implementation; the runtime only sees whether a call
//! succeeded or failed with a [`ChannelError`].

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Message model
// ---------------------------------------------------------------------------

/// Unique id of a message in the feed.
pub type MessageId = u64;

/// Stable account id of a sender.
pub type SenderId = u64;

/// Privilege level of a sender.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Member,
    Moderator,
    ElderModerator,
}

impl Role {
    /// Whether messages from this role fire the `authority` hook.
    pub fn is_authority(self) -> bool {
        matches!(self, Self::ElderModerator)
    }
}

/// The author of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub id: SenderId,
    pub display_name: String,
    #[serde(default)]
    pub role: Role,
}

/// One message from the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender: Sender,
    pub text: String,
    #[serde(default = "Utc::now")]
    pub posted_at: DateTime<Utc>,
}

impl Message {
    pub fn new(id: MessageId, sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id,
            sender,
            text: text.into(),
            posted_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure reported by a [`CommentChannel`] call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// Network or proxy trouble; the same call may succeed on another route.
    #[error("transient channel error: {0}")]
    Transient(String),

    /// The account may no longer post replies.
    #[error("comment banned: {0}")]
    Banned(String),

    /// The recipient or resource refuses access outright.
    #[error("access denied: {0}")]
    AccessDenied(String),
}

impl ChannelError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Login credentials for the upstream service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Core trait
// ---------------------------------------------------------------------------

/// The upstream comment service as seen by the bot.
///
/// Methods take `&self`; implementations that rotate routes or hold session
/// state use interior mutability so a hook can share the channel with the
/// running bot.
#[async_trait]
pub trait CommentChannel: Send + Sync {
    /// Establish an authenticated session.
    async fn login(&self, credentials: &Credentials) -> Result<(), ChannelError>;

    /// Whether a session is currently established.
    fn is_authenticated(&self) -> bool;

    /// Fetch the newest page of messages, oldest first.
    async fn fetch_latest_page(&self) -> Result<Vec<Message>, ChannelError>;

    /// Post `text` as a public reply to `target`.
    async fn post_reply(&self, target: &Message, text: &str) -> Result<(), ChannelError>;

    /// Send `text` privately to `recipient` under `subject`.
    async fn post_direct_message(
        &self,
        recipient: &Sender,
        subject: &str,
        text: &str,
    ) -> Result<(), ChannelError>;
}
