//! Shared helper functions used across CLI subcommands.

use dcbot_runtime::Credentials;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber with the given default log level.
///
/// `RUST_LOG` takes precedence when set.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Read an environment variable, treating empty values as unset.
pub fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Credentials from `DCBOT_USERNAME` / `DCBOT_PASSWORD`, with `fallback_user`
/// and an empty password when unset.
pub fn credentials_from_env(fallback_user: &str) -> Credentials {
    let username = env_non_empty("DCBOT_USERNAME").unwrap_or_else(|| fallback_user.to_string());
    let password = env_non_empty("DCBOT_PASSWORD").unwrap_or_default();
    Credentials::new(username, password)
}
