//! Reply delivery.
//!
//! A reply first goes out as a public `@sender` comment.  If the account is
//! comment-banned, the session latches that fact for the rest of the run and
//! every reply from then on is sent as a direct message instead, under a
//! subject padded with random tokens.  Transient failures fire `dead_proxy`
//! and retry; each call is bounded by a fixed number of attempts.

use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::channel::{ChannelError, CommentChannel, Message};
use crate::handle::{BotHandle, SessionState};
use crate::hooks::{Hooks, LifecycleEvent};

/// Default attempt budget per reply.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default direct-message subject used on the backup route.
pub const DEFAULT_BACKUP_SUBJECT: &str = "No Reply Response To Command";

/// Pad `text` with random alphanumeric tokens: `left` characters before and
/// `right` characters after, each separated by a space.  A zero length
/// skips that side.
pub fn obfuscate_text(text: &str, left: usize, right: usize) -> String {
    let mut rng = rand::thread_rng();
    let mut noise = |len: usize| -> String {
        (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    };

    let mut out = text.to_string();
    if right > 0 {
        out = format!("{out} {}", noise(right));
    }
    if left > 0 {
        out = format!("{} {out}", noise(left));
    }
    out
}

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// Which route delivered a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Public reply in the comment thread.
    Primary,
    /// Direct message to the sender.
    Backup,
}

/// Why a reply was not delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    /// Every attempt failed transiently.
    Exhausted,
    /// The backup route refused access; retrying is pointless.
    AccessDenied,
}

/// Result of one [`Courier::send`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered { route: Route, attempts: u32 },
    Failed { reason: SendFailure, attempts: u32 },
}

impl SendOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Tunables for reply delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendPolicy {
    pub max_attempts: u32,
    pub backup_subject: String,
    pub pad_left: usize,
    pub pad_right: usize,
}

impl Default for SendPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backup_subject: DEFAULT_BACKUP_SUBJECT.to_string(),
            pad_left: 4,
            pad_right: 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Courier
// ---------------------------------------------------------------------------

/// Delivers replies over a [`CommentChannel`], firing hooks along the way.
pub struct Courier<'a, Ch: ?Sized> {
    pub channel: &'a Ch,
    pub hooks: &'a Hooks,
    pub handle: &'a BotHandle,
    pub policy: &'a SendPolicy,
}

impl<Ch> Courier<'_, Ch>
where
    Ch: CommentChannel + ?Sized,
{
    /// Deliver `text` in reply to `target`.
    pub async fn send(
        &self,
        session: &mut SessionState,
        target: &Message,
        text: &str,
    ) -> SendOutcome {
        let max = self.policy.max_attempts.max(1);

        for attempt in 1..=max {
            if !session.is_banned() {
                let public = format!("@{} {text}", target.sender.display_name);
                match self.channel.post_reply(target, &public).await {
                    Ok(()) => {
                        tracing::debug!(message_id = target.id, attempt, "reply posted");
                        return SendOutcome::Delivered {
                            route: Route::Primary,
                            attempts: attempt,
                        };
                    }
                    Err(ChannelError::Banned(reason)) => {
                        if session.latch_banned() {
                            tracing::error!(reason = %reason, "comment banned, switching to direct messages");
                            self.hooks
                                .fire(self.handle, LifecycleEvent::CommentBanned { reason })
                                .await;
                        }
                    }
                    Err(error @ ChannelError::Transient(_)) => {
                        tracing::warn!(attempt, error = %error, "reply failed, retrying");
                        self.hooks
                            .fire(self.handle, LifecycleEvent::DeadProxy { error })
                            .await;
                        continue;
                    }
                    Err(ChannelError::AccessDenied(reason)) => {
                        tracing::warn!(
                            message_id = target.id,
                            reason = %reason,
                            "public reply refused, trying direct message"
                        );
                    }
                }
            }

            let subject = obfuscate_text(
                &self.policy.backup_subject,
                self.policy.pad_left,
                self.policy.pad_right,
            );
            match self
                .channel
                .post_direct_message(&target.sender, &subject, text)
                .await
            {
                Ok(()) => {
                    tracing::debug!(recipient = target.sender.id, attempt, "direct message sent");
                    return SendOutcome::Delivered {
                        route: Route::Backup,
                        attempts: attempt,
                    };
                }
                Err(error @ ChannelError::Transient(_)) => {
                    tracing::warn!(attempt, error = %error, "direct message failed, retrying");
                    self.hooks
                        .fire(self.handle, LifecycleEvent::DeadProxy { error })
                        .await;
                }
                Err(error) => {
                    tracing::warn!(
                        recipient = target.sender.id,
                        error = %error,
                        "direct message refused"
                    );
                    return SendOutcome::Failed {
                        reason: SendFailure::AccessDenied,
                        attempts: attempt,
                    };
                }
            }
        }

        SendOutcome::Failed {
            reason: SendFailure::Exhausted,
            attempts: max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obfuscation_pads_both_sides() {
        let out = obfuscate_text("No Reply", 4, 6);
        let parts: Vec<&str> = out.split(' ').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0].len(), 4);
        assert_eq!(parts[1..3], ["No", "Reply"]);
        assert_eq!(parts[3].len(), 6);
        assert!(parts[0].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn obfuscation_zero_lengths() {
        assert_eq!(obfuscate_text("plain", 0, 0), "plain");
        assert!(obfuscate_text("x", 0, 3).starts_with("x "));
        assert!(obfuscate_text("x", 3, 0).ends_with(" x"));
    }

    #[test]
    fn default_policy() {
        let policy = SendPolicy::default();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.backup_subject, DEFAULT_BACKUP_SUBJECT);
    }
}
