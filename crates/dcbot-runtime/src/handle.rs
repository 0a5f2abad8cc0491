//! Bot handle and session state.
//!
//! [`BotHandle`] is the cloneable control surface handed to every command
//! as its context: abort requests, the banned-senders set, and the bot's
//! own name.  [`SessionState`] is the loop-owned part of the session that
//! only the polling loop may mutate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashSet;
use tokio::sync::Notify;

use crate::channel::SenderId;

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Loop-owned session flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    banned: bool,
}

impl SessionState {
    /// Whether the primary reply route has been lost for this run.
    pub fn is_banned(&self) -> bool {
        self.banned
    }

    /// Latch the banned flag.  Returns `true` only on the first call.
    pub(crate) fn latch_banned(&mut self) -> bool {
        !std::mem::replace(&mut self.banned, true)
    }
}

// ---------------------------------------------------------------------------
// BotHandle
// ---------------------------------------------------------------------------

/// Cloneable control surface of a running bot.
///
/// The handle is `Arc`-backed; every clone controls the same bot.
#[derive(Clone, Default)]
pub struct BotHandle {
    inner: Arc<HandleInner>,
}

#[derive(Default)]
struct HandleInner {
    name: OnceLock<String>,
    banned_senders: DashSet<SenderId>,
    abort_requested: AtomicBool,
    force_abort: AtomicBool,
    wake: Notify,
}

impl BotHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The bot account's username, empty until login.
    pub fn name(&self) -> &str {
        self.inner.name.get().map(String::as_str).unwrap_or("")
    }

    pub(crate) fn set_name(&self, name: &str) {
        // A second run keeps the first name.
        let _ = self.inner.name.set(name.to_string());
    }

    /// Stop after the current iteration finishes.
    pub fn request_abort(&self) {
        tracing::info!("graceful abort requested");
        self.inner.abort_requested.store(true, Ordering::Release);
        self.inner.wake.notify_waiters();
    }

    /// Stop as soon as the current message has been handled.
    pub fn force_abort(&self) {
        tracing::warn!("forced abort requested");
        self.inner.force_abort.store(true, Ordering::Release);
        self.inner.wake.notify_waiters();
    }

    pub fn is_abort_requested(&self) -> bool {
        self.inner.abort_requested.load(Ordering::Acquire)
    }

    pub fn is_force_abort_requested(&self) -> bool {
        self.inner.force_abort.load(Ordering::Acquire)
    }

    /// Resolve once either kind of abort has been requested.
    pub(crate) async fn abort_signalled(&self) {
        loop {
            let notified = self.inner.wake.notified();
            if self.is_abort_requested() || self.is_force_abort_requested() {
                return;
            }
            notified.await;
        }
    }

    /// Deny command execution to `sender`.  Returns `false` if already
    /// banned.
    pub fn ban(&self, sender: SenderId) -> bool {
        let added = self.inner.banned_senders.insert(sender);
        if added {
            tracing::info!(sender, "sender banned");
        }
        added
    }

    /// Allow `sender` to run commands again.  Returns `false` if the sender
    /// was not banned.
    pub fn unban(&self, sender: SenderId) -> bool {
        let removed = self.inner.banned_senders.remove(&sender).is_some();
        if removed {
            tracing::info!(sender, "sender unbanned");
        }
        removed
    }

    pub fn is_banned(&self, sender: SenderId) -> bool {
        self.inner.banned_senders.contains(&sender)
    }

    /// Snapshot of banned sender ids, sorted.
    pub fn banned_senders(&self) -> Vec<SenderId> {
        let mut ids: Vec<_> = self.inner.banned_senders.iter().map(|id| *id).collect();
        ids.sort_unstable();
        ids
    }
}

impl std::fmt::Debug for BotHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotHandle")
            .field("name", &self.name())
            .field("abort_requested", &self.is_abort_requested())
            .field("force_abort", &self.is_force_abort_requested())
            .field("banned_senders", &self.banned_senders())
            .finish()
    }
}
