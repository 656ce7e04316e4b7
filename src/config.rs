//! # Service Configuration
//!
//! Loaded once at startup from a TOML file.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:8081"
//!
//! [auth]
//! secret = "change-me-to-a-long-random-string"
//! token_ttl_secs = 7200
//! revocation_purge_secs = 300
//!
//! [[auth.users]]
//! id = 1
//! email = "admin@example.com"
//! password = "password"
//! ```
//!
//! The signing secret may also be supplied through `TASK_APP_JWT_SECRET`, which
//! takes precedence over the file. There is no built-in fallback secret: a
//! missing secret stops the process at startup.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Environment variable that overrides `auth.secret`.
pub const SECRET_ENV_VAR: &str = "TASK_APP_JWT_SECRET";

const MIN_RECOMMENDED_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("no signing secret configured (set auth.secret or TASK_APP_JWT_SECRET)")]
    MissingSecret,
    #[error("token lifetime must be greater than zero")]
    InvalidTtl,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

/// Settings for token issuance and revocation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// HMAC signing secret. Never logged.
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    /// How often expired revocation entries are dropped.
    #[serde(default = "default_revocation_purge_secs")]
    pub revocation_purge_secs: u64,
    /// Accounts accepted by the in-memory credential check.
    #[serde(default)]
    pub users: Vec<UserEntry>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            token_ttl_secs: default_token_ttl_secs(),
            revocation_purge_secs: default_revocation_purge_secs(),
            users: Vec::new(),
        }
    }
}

impl AuthConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    pub fn revocation_purge_interval(&self) -> Duration {
        // tokio intervals panic on a zero period
        Duration::from_secs(self.revocation_purge_secs.max(1))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if self.token_ttl_secs == 0 {
            return Err(ConfigError::InvalidTtl);
        }
        if self.secret.len() < MIN_RECOMMENDED_SECRET_LEN {
            tracing::warn!(
                "Signing secret is shorter than {} bytes; use a longer random value",
                MIN_RECOMMENDED_SECRET_LEN
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserEntry {
    pub id: i64,
    pub email: String,
    pub password: String,
}

fn default_bind() -> String {
    "0.0.0.0:8081".to_string()
}
fn default_token_ttl_secs() -> u64 {
    2 * 60 * 60
}
fn default_revocation_purge_secs() -> u64 {
    300
}

pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                Err(ConfigError::Toml(e))
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            Err(ConfigError::Io(e))
        }
    }
}

/// Applies environment overrides to a loaded config.
pub fn apply_env(config: &mut Config) {
    apply_secret_override(config, std::env::var(SECRET_ENV_VAR).ok());
}

fn apply_secret_override(config: &mut Config, secret: Option<String>) {
    if let Some(secret) = secret.filter(|s| !s.is_empty()) {
        tracing::info!("Using signing secret from {}", SECRET_ENV_VAR);
        config.auth.secret = secret;
    }
}
