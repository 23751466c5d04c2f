//! # Structured Logging
//!
//! Span macros and startup logging for a secret sync run. Secret values never
//! appear in fields; only key names, client ids and file paths do.

/// Create the root span of one sync run.
///
/// Every run gets a fresh `run_id` so that the lines of overlapping container
/// restarts can be told apart.
///
/// ```rust,ignore
/// let span = run_span!("oauth2-proxy", sink = "/app/.env");
/// ```
#[macro_export]
macro_rules! run_span {
    ($client_id:expr) => {
        tracing::info_span!(
            "secret_sync",
            client_id = %$client_id,
            run_id = %uuid::Uuid::new_v4()
        )
    };
    ($client_id:expr, $($field:tt)*) => {
        tracing::info_span!(
            "secret_sync",
            client_id = %$client_id,
            run_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Create the span of a single attempt within a run
#[macro_export]
macro_rules! attempt_span {
    ($attempt:expr, $max_attempts:expr) => {
        tracing::info_span!("attempt", attempt = $attempt, max_attempts = $max_attempts)
    };
}

/// Log the effective configuration at startup
pub fn log_config_info(config: &crate::config::SyncConfig) {
    tracing::info!(
        base_url = %config.provider.base_url,
        realm = %config.provider.realm,
        admin_username = %config.provider.admin_username,
        client_id = %config.target.client_id,
        env_file = %config.target.env_file.display(),
        secret_key = %config.target.secret_key,
        write_mode = %config.target.write_mode,
        max_attempts = config.retry.max_attempts,
        backoff_seconds = config.retry.backoff_seconds,
        "Secret sync configuration"
    );
}
