//! Configuration module for Solera.
//!
//! Settings are read once at startup from a TOML file, with environment
//! variable overrides for the security knobs. Nothing is hot-reloadable.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, SoleraError};

/// Security and session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Password hashing method: "auto", "argon2", "bcrypt" or "pbkdf2".
    #[serde(default = "default_hash_method")]
    pub hash_method: String,
    /// Session timeout in seconds.
    #[serde(default = "default_session_timeout")]
    pub session_timeout_secs: u64,
    /// Minimum password length enforced by the strength policy.
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
    /// Failed login attempts allowed before lockout.
    #[serde(default = "default_max_login_attempts")]
    pub max_login_attempts: u32,
    /// Lockout duration in seconds after too many failures.
    #[serde(default = "default_lockout_secs")]
    pub lockout_secs: u64,
}

fn default_hash_method() -> String {
    "auto".to_string()
}

fn default_session_timeout() -> u64 {
    3600
}

fn default_min_password_length() -> usize {
    8
}

fn default_max_login_attempts() -> u32 {
    3
}

fn default_lockout_secs() -> u64 {
    300
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            hash_method: default_hash_method(),
            session_timeout_secs: default_session_timeout(),
            min_password_length: default_min_password_length(),
            max_login_attempts: default_max_login_attempts(),
            lockout_secs: default_lockout_secs(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/solera.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional path to a log file. Console-only when absent.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Security and session settings.
    #[serde(default)]
    pub security: SecurityConfig,
    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config: Config = toml::from_str(&content)
            .map_err(|e| SoleraError::Config(format!("failed to parse config: {e}")))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Build a configuration from defaults and environment overrides only.
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Apply `SOLERA_*` environment variable overrides for the security knobs.
    fn apply_env_overrides(&mut self) {
        if let Ok(method) = std::env::var("SOLERA_HASH_METHOD") {
            self.security.hash_method = method;
        }
        if let Ok(timeout) = std::env::var("SOLERA_SESSION_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.security.session_timeout_secs = secs;
            }
        }
        if let Ok(min_len) = std::env::var("SOLERA_MIN_PASSWORD_LENGTH") {
            if let Ok(len) = min_len.parse() {
                self.security.min_password_length = len;
            }
        }
    }
}
