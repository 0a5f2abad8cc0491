//! Message dispatcher.
//!
//! Splits an incoming message into a command key and the remaining text,
//! looks the key up in the [`CommandRegistry`], binds the remainder, and
//! invokes the handler.  Every failure past the lookup is caught here and
//! reported as [`DispatchOutcome::Failed`]; nothing escapes to the caller's
//! polling loop.

use std::sync::Arc;

use crate::binder::bind;
use crate::error::{KernelError, Result};
use crate::registry::{Command, CommandRegistry};
use crate::tokenizer::tokenize;
use crate::value::Arguments;

/// What happened to one message.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The head of the message is not a registered command key.
    NoMatch,
    /// The handler ran to completion.
    Completed {
        command: String,
        /// Text to post back to the sender, if any.
        reply: Option<String>,
    },
    /// Tokenizing, binding, or the handler itself failed.
    Failed { command: String, error: KernelError },
}

impl DispatchOutcome {
    pub fn is_match(&self) -> bool {
        !matches!(self, Self::NoMatch)
    }
}

/// Split `raw` at the first run of whitespace into `(head, rest)`.
///
/// With no whitespace the whole message is the head and `rest` is empty.
pub fn split_command(raw: &str) -> (&str, &str) {
    match raw.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest),
        None => (raw, ""),
    }
}

/// Routes raw messages to registered commands.
pub struct Dispatcher<C, S> {
    registry: Arc<CommandRegistry<C, S>>,
}

impl<C, S> Clone for Dispatcher<C, S> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<C, S> Dispatcher<C, S>
where
    C: Send + Sync + 'static,
    S: Send + Sync + 'static,
{
    pub fn new(registry: CommandRegistry<C, S>) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &CommandRegistry<C, S> {
        &self.registry
    }

    /// Resolve and bind `raw` without invoking anything.
    ///
    /// Returns `None` when the head is not a registered key.
    pub fn prepare(&self, raw: &str) -> Option<(Arc<Command<C, S>>, Result<Arguments>)> {
        let (head, rest) = split_command(raw);
        let command = Arc::clone(self.registry.lookup(head)?);
        let args = tokenize(rest)
            .map_err(KernelError::from)
            .and_then(|tokens| bind(command.descriptor(), &tokens).map_err(KernelError::from));
        Some((command, args))
    }

    /// Dispatch one message on behalf of `sender`.
    pub async fn dispatch(&self, ctx: &C, sender: &S, raw: &str) -> DispatchOutcome {
        let Some((command, args)) = self.prepare(raw) else {
            return DispatchOutcome::NoMatch;
        };
        let name = command.name().to_string();

        let args = match args {
            Ok(args) => args,
            Err(error) => {
                tracing::warn!(command = %name, error = %error, "command arguments rejected");
                return DispatchOutcome::Failed {
                    command: name,
                    error,
                };
            }
        };

        tracing::debug!(command = %name, args = args.len(), "invoking command");

        match command.handler().call(ctx, sender, args).await {
            Ok(reply) => DispatchOutcome::Completed {
                command: name,
                reply,
            },
            Err(source) => {
                tracing::warn!(command = %name, error = %source, "command failed");
                DispatchOutcome::Failed {
                    command: name.clone(),
                    error: KernelError::InvocationFailed {
                        command: name,
                        source: source.into(),
                    },
                }
            }
        }
    }
}
