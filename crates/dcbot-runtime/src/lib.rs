//! Polling runtime for dcbot.
//!
//! Drives the command kernel against an upstream comment feed: fetch a
//! page, skip messages already handled, dispatch the rest, and deliver any
//! reply with bounded retries and a direct-message fallback.  The upstream
//! service itself sits behind the [`CommentChannel`] trait.

pub mod bot;
pub mod channel;
pub mod config;
pub mod dedup;
pub mod error;
pub mod handle;
pub mod hooks;
pub mod scripted;
pub mod send;

pub use bot::{Bot, BotBuilder, BotDispatcher, BotRegistry, LoopExit, PollSignal};
pub use channel::{
    ChannelError, CommentChannel, Credentials, Message, MessageId, Role, Sender, SenderId,
};
pub use config::{BotConfig, DEFAULT_CONFIG_PATH};
pub use dedup::DedupCache;
pub use error::{Result, RuntimeError};
pub use handle::{BotHandle, SessionState};
pub use hooks::{HookKind, Hooks, LifecycleEvent};
pub use scripted::{DirectMessage, PostedReply, ScriptedChannel};
pub use send::{Courier, Route, SendFailure, SendOutcome, SendPolicy, obfuscate_text};
