//! # Configuration Management
//!
//! A single [`SyncConfig`] is built at process start from environment
//! variables, overridden by command-line flags, validated, and then passed by
//! reference into each component. Nothing reads the environment after that.

pub mod settings;

pub use settings::{
    ObservabilityConfig, ProviderConfig, RetrySettings, SyncConfig, TargetConfig, WriteMode,
    ENV_ADMIN_CLIENT_ID, ENV_CLIENT_ID, ENV_ENV_FILE, ENV_HTTP_TIMEOUT_SECONDS,
    ENV_KEYCLOAK_ADMIN, ENV_KEYCLOAK_ADMIN_PASSWORD, ENV_KEYCLOAK_REALM, ENV_KEYCLOAK_URL,
    ENV_LOG_JSON, ENV_LOG_LEVEL, ENV_MAX_ATTEMPTS, ENV_RETRY_BACKOFF_SECONDS, ENV_SECRET_KEY,
    ENV_WRITE_MODE,
};
