//! Runtime error types.
//!
//! Only startup can fail with a [`RuntimeError`]: bad configuration,
//! duplicate command registration, or a failed login.  Once the polling
//! loop is running, channel and command failures are handled in place and
//! reported through hooks and logs instead.

use std::path::PathBuf;

use dcbot_kernel::KernelError;

use crate::channel::ChannelError;

/// Unified error type for the dcbot runtime.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Command registration failed (duplicate key, bad declaration).
    #[error(transparent)]
    Kernel(#[from] KernelError),

    /// The upstream service rejected the login.
    #[error("login failed: {0}")]
    Login(#[source] ChannelError),

    /// Login returned success but the session is still anonymous.
    #[error("session is not authenticated after login")]
    NotAuthenticated,

    /// A hook was registered under a name no lifecycle event uses.
    #[error("unknown lifecycle hook `{0}`")]
    UnknownHook(String),

    /// The configuration file could not be read.
    #[error("failed to read config `{}`: {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`crate::BotConfig`].
    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The configuration parsed but holds an unusable value.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience alias used throughout the runtime crate.
pub type Result<T> = std::result::Result<T, RuntimeError>;
