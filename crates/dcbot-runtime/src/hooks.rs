//! Lifecycle hooks.
//!
//! The polling loop reports notable events (a dead proxy, losing the reply
//! route, an elevated sender, shutdown, failed commands and sends) to user
//! supplied async handlers.  Several handlers may be registered per event;
//! they run one after another in registration order.
//!
//! ```rust
//! # use dcbot_runtime::{Hooks, HookKind, LifecycleEvent};
//! let mut hooks = Hooks::new();
//! hooks.on(HookKind::DeadProxy, |_bot, event| async move {
//!     tracing::warn!(?event, "rotating proxy");
//! });
//! hooks.on_named("abort", |_bot, _event| async move {}).unwrap();
//! assert_eq!(hooks.count(HookKind::Abort), 1);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::bot::LoopExit;
use crate::channel::{ChannelError, Message, MessageId, Sender};
use crate::error::RuntimeError;
use crate::handle::BotHandle;
use crate::send::SendFailure;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Which lifecycle event a hook listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// A channel call failed transiently; rotate the route.
    DeadProxy,
    /// The primary reply route was lost for the rest of the run.
    CommentBanned,
    /// A message arrived from an elevated sender.
    Authority,
    /// The polling loop is shutting down.
    Abort,
    /// A command could not be bound or its handler failed.
    CommandFailed,
    /// A reply could not be delivered on any route.
    SendFailed,
}

impl HookKind {
    pub const ALL: [HookKind; 6] = [
        Self::DeadProxy,
        Self::CommentBanned,
        Self::Authority,
        Self::Abort,
        Self::CommandFailed,
        Self::SendFailed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeadProxy => "dead_proxy",
            Self::CommentBanned => "comment_banned",
            Self::Authority => "authority",
            Self::Abort => "abort",
            Self::CommandFailed => "command_failed",
            Self::SendFailed => "send_failed",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookKind {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| RuntimeError::UnknownHook(s.to_string()))
    }
}

/// Payload delivered to hooks.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    DeadProxy {
        error: ChannelError,
    },
    CommentBanned {
        reason: String,
    },
    Authority {
        message: Message,
    },
    Abort {
        exit: LoopExit,
    },
    CommandFailed {
        command: String,
        sender: Sender,
        error: String,
    },
    SendFailed {
        target: MessageId,
        reason: SendFailure,
        attempts: u32,
    },
}

impl LifecycleEvent {
    pub fn kind(&self) -> HookKind {
        match self {
            Self::DeadProxy { .. } => HookKind::DeadProxy,
            Self::CommentBanned { .. } => HookKind::CommentBanned,
            Self::Authority { .. } => HookKind::Authority,
            Self::Abort { .. } => HookKind::Abort,
            Self::CommandFailed { .. } => HookKind::CommandFailed,
            Self::SendFailed { .. } => HookKind::SendFailed,
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

type HookFn = Arc<dyn Fn(BotHandle, LifecycleEvent) -> BoxFuture<'static, ()> + Send + Sync>;

/// Registered hook handlers, keyed by [`HookKind`].
#[derive(Clone, Default)]
pub struct Hooks {
    handlers: HashMap<HookKind, Vec<HookFn>>,
}

impl Hooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`.
    pub fn on<F, Fut>(&mut self, kind: HookKind, handler: F) -> &mut Self
    where
        F: Fn(BotHandle, LifecycleEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: HookFn = Arc::new(move |bot, event| handler(bot, event).boxed());
        self.handlers.entry(kind).or_default().push(handler);
        tracing::debug!(hook = %kind, "lifecycle hook registered");
        self
    }

    /// Register `handler` by event name (`dead_proxy`, `comment_banned`,
    /// `authority`, `abort`, `command_failed`, `send_failed`).
    pub fn on_named<F, Fut>(&mut self, name: &str, handler: F) -> Result<&mut Self, RuntimeError>
    where
        F: Fn(BotHandle, LifecycleEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let kind: HookKind = name.parse()?;
        Ok(self.on(kind, handler))
    }

    /// Number of handlers registered for `kind`.
    pub fn count(&self, kind: HookKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Run every handler registered for the event's kind.
    pub async fn fire(&self, bot: &BotHandle, event: LifecycleEvent) {
        let kind = event.kind();
        let Some(handlers) = self.handlers.get(&kind) else {
            tracing::trace!(hook = %kind, "no hook registered");
            return;
        };

        tracing::debug!(hook = %kind, handlers = handlers.len(), "firing lifecycle hook");
        for handler in handlers {
            handler(bot.clone(), event.clone()).await;
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for kind in HookKind::ALL {
            let n = self.count(kind);
            if n > 0 {
                map.entry(&kind.as_str(), &n);
            }
        }
        map.finish()
    }
}
