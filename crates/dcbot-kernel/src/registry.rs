//! Command registry.
//!
//! Maps every `prefix + name` key to a registered [`Command`].  The registry
//! is filled once at startup and is read-only afterwards; a key collision is
//! a configuration error surfaced by [`CommandRegistry::register`].
//!
//! # Example
//!
//! ```rust
//! # use dcbot_kernel::{command, CommandRegistry, DeclaredType, RegistryConfig};
//! let mut registry: CommandRegistry<(), String> = CommandRegistry::new(RegistryConfig::default());
//! let ping = command("ping").handler(|_ctx: (), _sender: String, _args| async move {
//!     Ok(Some("pong".to_string()))
//! });
//! registry.register(&["/", "!"], ping).unwrap();
//!
//! assert!(registry.lookup("/ping").is_some());
//! assert!(registry.lookup("!ping").is_some());
//! assert!(registry.lookup("ping").is_none());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::command::CommandHandler;
use crate::descriptor::{Descriptor, describe};
use crate::error::{KernelError, Result};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Registry-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Parameter names supplied by the runtime rather than by user input.
    /// They are removed from every command's descriptor.
    pub contextual: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            contextual: vec!["ctx".to_string(), "comment".to_string()],
        }
    }
}

/// A registered command: its handler plus the descriptor computed once at
/// registration.
pub struct Command<C, S> {
    name: String,
    descriptor: Descriptor,
    handler: Arc<dyn CommandHandler<C, S>>,
}

impl<C, S> Command<C, S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn description(&self) -> &str {
        self.handler.description()
    }

    pub fn handler(&self) -> &Arc<dyn CommandHandler<C, S>> {
        &self.handler
    }
}

impl<C, S> std::fmt::Debug for Command<C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Lookup table from prefixed command key to [`Command`].
pub struct CommandRegistry<C, S> {
    config: RegistryConfig,
    commands: HashMap<String, Arc<Command<C, S>>>,
    /// Distinct commands in registration order, for help listings.
    order: Vec<Arc<Command<C, S>>>,
}

impl<C, S> CommandRegistry<C, S>
where
    C: Send + Sync + 'static,
    S: Send + Sync + 'static,
{
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            commands: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register `handler` under every prefix.
    ///
    /// Registration is all-or-nothing: if any composed key is already taken
    /// the registry is left untouched and [`KernelError::DuplicateCommand`]
    /// is returned.  An empty prefix list registers the bare name.
    pub fn register<P, H>(&mut self, prefixes: &[P], handler: H) -> Result<Arc<Command<C, S>>>
    where
        P: AsRef<str>,
        H: CommandHandler<C, S> + 'static,
    {
        let name = handler.name().to_string();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(KernelError::InvalidCommandName { name });
        }

        let descriptor = describe(&name, &handler.parameters(), &self.config.contextual)?;

        let mut keys: Vec<String> = prefixes
            .iter()
            .map(|p| format!("{}{name}", p.as_ref()))
            .collect();
        if keys.is_empty() {
            keys.push(name.clone());
        }

        for (i, key) in keys.iter().enumerate() {
            if self.commands.contains_key(key) || keys[..i].contains(key) {
                return Err(KernelError::DuplicateCommand { key: key.clone() });
            }
        }

        let command = Arc::new(Command {
            name,
            descriptor,
            handler: Arc::new(handler),
        });

        for key in keys {
            tracing::debug!(key = %key, usage = %command.descriptor.usage(), "command registered");
            self.commands.insert(key, Arc::clone(&command));
        }
        self.order.push(Arc::clone(&command));

        Ok(command)
    }

    /// Look up a command by its full prefixed key.
    pub fn lookup(&self, key: &str) -> Option<&Arc<Command<C, S>>> {
        self.commands.get(key)
    }

    /// All registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.commands.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Distinct commands in registration order.
    pub fn commands(&self) -> &[Arc<Command<C, S>>] {
        &self.order
    }

    /// Number of registered keys (one command under two prefixes counts
    /// twice).
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl<C, S> Default for CommandRegistry<C, S>
where
    C: Send + Sync + 'static,
    S: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
