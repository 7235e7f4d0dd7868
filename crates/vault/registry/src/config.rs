//! Configuration for Script Vault hosts

use crate::policy::InputPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix; nested keys use `__`, e.g.
/// `SCRIPT_VAULT_POLICY__MAX_TITLE_LEN=64`.
pub const ENV_PREFIX: &str = "SCRIPT_VAULT";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Input length bounds
    #[serde(default)]
    pub policy: InputPolicy,

    /// Journal persistence
    #[serde(default)]
    pub journal: JournalConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Journal configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JournalConfig {
    /// JSON Lines file; the journal stays in memory when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl VaultConfig {
    /// Load configuration: defaults, then the optional file, then environment.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&VaultConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
