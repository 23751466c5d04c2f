//! # Configuration Settings
//!
//! Defines the configuration structure for a secret synchronisation run.

use crate::errors::{Result, SyncError};
use crate::secrets::SecretString;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;
use validator::Validate;

pub const ENV_KEYCLOAK_URL: &str = "KEYCLOAK_URL";
pub const ENV_KEYCLOAK_REALM: &str = "KEYCLOAK_REALM";
pub const ENV_KEYCLOAK_ADMIN: &str = "KEYCLOAK_ADMIN";
pub const ENV_KEYCLOAK_ADMIN_PASSWORD: &str = "KEYCLOAK_ADMIN_PASSWORD";
pub const ENV_ADMIN_CLIENT_ID: &str = "SECRET_SYNC_ADMIN_CLIENT_ID";
pub const ENV_HTTP_TIMEOUT_SECONDS: &str = "SECRET_SYNC_HTTP_TIMEOUT_SECONDS";
pub const ENV_CLIENT_ID: &str = "OAUTH2_PROXY_CLIENT_ID";
pub const ENV_ENV_FILE: &str = "SECRET_SYNC_ENV_FILE";
pub const ENV_SECRET_KEY: &str = "SECRET_SYNC_SECRET_KEY";
pub const ENV_WRITE_MODE: &str = "SECRET_SYNC_WRITE_MODE";
pub const ENV_MAX_ATTEMPTS: &str = "SECRET_SYNC_MAX_ATTEMPTS";
pub const ENV_RETRY_BACKOFF_SECONDS: &str = "SECRET_SYNC_RETRY_BACKOFF_SECONDS";
pub const ENV_LOG_LEVEL: &str = "SECRET_SYNC_LOG_LEVEL";
pub const ENV_LOG_JSON: &str = "SECRET_SYNC_LOG_JSON";

/// Complete configuration for one run, built once at process start
#[derive(Debug, Clone, Validate, Default)]
pub struct SyncConfig {
    /// Identity provider connection and admin credentials
    #[validate(nested)]
    pub provider: ProviderConfig,

    /// Which client to rotate and where to write its secret
    #[validate(nested)]
    pub target: TargetConfig,

    /// Attempt budget and fixed backoff
    #[validate(nested)]
    pub retry: RetrySettings,

    /// Log level and format
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl SyncConfig {
    /// Create configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    ///
    /// Unset variables fall back to their defaults. Set variables that cannot
    /// be parsed are reported as configuration errors naming the variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider_defaults = ProviderConfig::default();
        let target_defaults = TargetConfig::default();
        let retry_defaults = RetrySettings::default();
        let observability_defaults = ObservabilityConfig::default();

        let provider = ProviderConfig {
            base_url: lookup(ENV_KEYCLOAK_URL).unwrap_or(provider_defaults.base_url),
            realm: lookup(ENV_KEYCLOAK_REALM).unwrap_or(provider_defaults.realm),
            admin_username: lookup(ENV_KEYCLOAK_ADMIN).unwrap_or(provider_defaults.admin_username),
            admin_password: lookup(ENV_KEYCLOAK_ADMIN_PASSWORD)
                .map(SecretString::from)
                .unwrap_or(provider_defaults.admin_password),
            admin_client_id: lookup(ENV_ADMIN_CLIENT_ID)
                .unwrap_or(provider_defaults.admin_client_id),
            timeout_seconds: parse_var(&lookup, ENV_HTTP_TIMEOUT_SECONDS)?
                .unwrap_or(provider_defaults.timeout_seconds),
        };

        let target = TargetConfig {
            client_id: lookup(ENV_CLIENT_ID).unwrap_or(target_defaults.client_id),
            env_file: lookup(ENV_ENV_FILE).map(PathBuf::from).unwrap_or(target_defaults.env_file),
            secret_key: lookup(ENV_SECRET_KEY).unwrap_or(target_defaults.secret_key),
            write_mode: parse_var(&lookup, ENV_WRITE_MODE)?.unwrap_or(target_defaults.write_mode),
        };

        let retry = RetrySettings {
            max_attempts: parse_var(&lookup, ENV_MAX_ATTEMPTS)?
                .unwrap_or(retry_defaults.max_attempts),
            backoff_seconds: parse_var(&lookup, ENV_RETRY_BACKOFF_SECONDS)?
                .unwrap_or(retry_defaults.backoff_seconds),
        };

        let observability = ObservabilityConfig {
            log_level: lookup(ENV_LOG_LEVEL).unwrap_or(observability_defaults.log_level),
            json_logging: parse_flag(&lookup, ENV_LOG_JSON)?
                .unwrap_or(observability_defaults.json_logging),
        };

        Ok(Self { provider, target, retry, observability })
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(SyncError::from)?;
        self.validate_custom()
    }

    /// Checks the validator derive cannot express
    fn validate_custom(&self) -> Result<()> {
        if self.provider.admin_password.is_empty() {
            return Err(SyncError::config(format!(
                "{} cannot be empty",
                ENV_KEYCLOAK_ADMIN_PASSWORD
            )));
        }

        let url = Url::parse(&self.provider.base_url).map_err(|e| {
            SyncError::config(format!(
                "Invalid identity provider URL '{}': {}",
                self.provider.base_url, e
            ))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SyncError::config(format!(
                "Identity provider URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        let key = &self.target.secret_key;
        if key.contains('=') || key.chars().any(char::is_whitespace) {
            return Err(SyncError::config(format!(
                "Secret key '{}' must not contain '=' or whitespace",
                key
            )));
        }

        if self.target.env_file.as_os_str().is_empty() {
            return Err(SyncError::config("Env file path cannot be empty"));
        }

        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| SyncError::config(format!("Invalid value '{}' for {}: {}", raw, key, e))),
    }
}

/// Boolean variables accept `true`/`false` or `1`/`0`, case-insensitively
fn parse_flag<F>(lookup: &F, key: &str) -> Result<Option<bool>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            _ => Err(SyncError::config(format!(
                "Invalid value '{}' for {}: expected true, false, 1 or 0",
                raw, key
            ))),
        },
    }
}

/// Identity provider connection settings
#[derive(Debug, Clone, Validate)]
pub struct ProviderConfig {
    /// Base address, e.g. `http://keycloak:8180`
    #[validate(length(min = 1, message = "Identity provider URL cannot be empty"))]
    pub base_url: String,

    #[validate(length(min = 1, message = "Realm cannot be empty"))]
    pub realm: String,

    #[validate(length(min = 1, message = "Admin username cannot be empty"))]
    pub admin_username: String,

    pub admin_password: SecretString,

    /// Public client used for the password grant
    #[validate(length(min = 1, message = "Admin client id cannot be empty"))]
    pub admin_client_id: String,

    /// Per-request timeout in seconds
    #[validate(range(min = 1, max = 300, message = "Timeout must be between 1 and 300 seconds"))]
    pub timeout_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://keycloak:8180".to_string(),
            realm: "infoCompanies".to_string(),
            admin_username: "admin".to_string(),
            admin_password: SecretString::new("password"),
            admin_client_id: "admin-cli".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// How the env file is rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum WriteMode {
    /// Temporary file in the same directory, renamed over the target
    #[default]
    Atomic,
    /// Direct overwrite; required for single-file bind mounts
    InPlace,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteMode::Atomic => write!(f, "atomic"),
            WriteMode::InPlace => write!(f, "in-place"),
        }
    }
}

impl FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "atomic" => Ok(WriteMode::Atomic),
            "in-place" | "in_place" | "inplace" => Ok(WriteMode::InPlace),
            other => Err(format!("expected 'atomic' or 'in-place', got '{}'", other)),
        }
    }
}

/// Target client and output file
#[derive(Debug, Clone, Validate)]
pub struct TargetConfig {
    /// Human-readable client name (`clientId`), not the internal id
    #[validate(length(min = 1, message = "Client id cannot be empty"))]
    pub client_id: String,

    pub env_file: PathBuf,

    /// Key written as `KEY=<secret>`
    #[validate(length(min = 1, message = "Secret key cannot be empty"))]
    pub secret_key: String,

    pub write_mode: WriteMode,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            client_id: "spring-ba-infocompanies".to_string(),
            env_file: PathBuf::from("/app/.env"),
            secret_key: "OAUTH2_PROXY_CLIENT_SECRET".to_string(),
            write_mode: WriteMode::Atomic,
        }
    }
}

/// Attempt budget for the whole authenticate/resolve/persist sequence
#[derive(Debug, Clone, Validate)]
pub struct RetrySettings {
    #[validate(range(min = 1, max = 100, message = "Max attempts must be between 1 and 100"))]
    pub max_attempts: u32,

    /// Fixed wait between attempts, no jitter
    pub backoff_seconds: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { max_attempts: 2, backoff_seconds: 10 }
    }
}

impl RetrySettings {
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_seconds)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Validate)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins when set
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logging: false }
    }
}
