//! Bot configuration.
//!
//! Reads the `[bot]` section from `config/default.toml`.  Every field has a
//! default, so a missing file, a missing `[bot]` table, or a partial table
//! all produce a usable configuration.

use std::path::Path;
use std::time::Duration;

use dcbot_kernel::RegistryConfig;
use serde::{Deserialize, Serialize};

use crate::dedup::{DEFAULT_CAPACITY, DEFAULT_EVICT};
use crate::error::{Result, RuntimeError};
use crate::send::{DEFAULT_BACKUP_SUBJECT, DEFAULT_MAX_ATTEMPTS, SendPolicy};

/// Default location of the configuration file, relative to the working
/// directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Settings loaded from the `[bot]` section of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Prefixes every command is registered under (`"/"` gives `/ping`).
    pub prefixes: Vec<String>,
    /// Seconds to sleep between polling iterations.
    pub poll_interval_secs: u64,
    /// Attempt budget for one reply.
    pub max_send_attempts: u32,
    /// Resident ids that trigger dedup eviction.
    pub dedup_capacity: usize,
    /// Oldest ids dropped per eviction.
    pub dedup_evict: usize,
    /// Handler parameter names supplied by the runtime.
    pub contextual_params: Vec<String>,
    /// Subject line for direct-message replies.
    pub backup_subject: String,
    /// Random characters before the subject.
    pub obfuscation_left: usize,
    /// Random characters after the subject.
    pub obfuscation_right: usize,
    /// The host routes traffic through a VPN.
    pub vpn: bool,
    /// Outbound proxy handed to the channel implementation.
    pub proxy_url: Option<String>,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefixes: vec!["/".to_string()],
            poll_interval_secs: 10,
            max_send_attempts: DEFAULT_MAX_ATTEMPTS,
            dedup_capacity: DEFAULT_CAPACITY,
            dedup_evict: DEFAULT_EVICT,
            contextual_params: RegistryConfig::default().contextual,
            backup_subject: DEFAULT_BACKUP_SUBJECT.to_string(),
            obfuscation_left: 4,
            obfuscation_right: 4,
            vpn: false,
            proxy_url: None,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default)]
    bot: BotConfig,
}

impl BotConfig {
    /// Parse the `[bot]` table out of a TOML document.  Other tables are
    /// ignored.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        file.bot.validate()?;
        Ok(file.bot)
    }

    /// Load from `path`.  A missing file yields the defaults; an unreadable
    /// or malformed file is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let config = Self::from_toml_str(&content)?;
                tracing::debug!(path = %path.display(), "bot config loaded");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(RuntimeError::ConfigIo {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Load from `path`, logging and falling back to defaults on any error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring bad config file");
            Self::default()
        })
    }

    /// Reject values the loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_send_attempts == 0 {
            return Err(RuntimeError::Config(
                "max_send_attempts must be at least 1".into(),
            ));
        }
        if self.dedup_capacity == 0 {
            return Err(RuntimeError::Config(
                "dedup_capacity must be at least 1".into(),
            ));
        }
        if self.dedup_evict == 0 || self.dedup_evict > self.dedup_capacity {
            return Err(RuntimeError::Config(format!(
                "dedup_evict must be between 1 and dedup_capacity ({})",
                self.dedup_capacity
            )));
        }
        if let Some(p) = self
            .prefixes
            .iter()
            .find(|p| p.chars().any(char::is_whitespace))
        {
            return Err(RuntimeError::Config(format!(
                "command prefix {p:?} contains whitespace"
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            contextual: self.contextual_params.clone(),
        }
    }

    pub fn send_policy(&self) -> SendPolicy {
        SendPolicy {
            max_attempts: self.max_send_attempts,
            backup_subject: self.backup_subject.clone(),
            pad_left: self.obfuscation_left,
            pad_right: self.obfuscation_right,
        }
    }
}
