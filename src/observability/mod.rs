//! # Observability
//!
//! Process-wide `tracing` subscriber setup plus the span macros used by the
//! sync run.

pub mod logging;

pub use logging::log_config_info;

use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::ObservabilityConfig;
use crate::errors::{Result, SyncError};

/// Resolve the filter directive.
///
/// `RUST_LOG` wins when present, then `--verbose`, then the configured level.
pub fn filter_directive(
    rust_log: Option<String>,
    config: &ObservabilityConfig,
    verbose: bool,
) -> String {
    match rust_log {
        Some(directive) if !directive.trim().is_empty() => directive,
        _ if verbose => "debug".to_string(),
        _ => config.log_level.clone(),
    }
}

fn build_filter(directive: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directive)
        .map_err(|e| SyncError::config(format!("Invalid log filter '{}': {}", directive, e)))
}

/// Install the global subscriber.
///
/// An already installed subscriber (tests, embedding applications) is left in
/// place.
pub fn init_logging(config: &ObservabilityConfig, verbose: bool) -> Result<()> {
    let directive = filter_directive(std::env::var("RUST_LOG").ok(), config, verbose);
    let filter = build_filter(&directive)?;

    let installed = if config.json_logging {
        tracing::subscriber::set_global_default(
            FmtSubscriber::builder()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish(),
        )
    } else {
        tracing::subscriber::set_global_default(
            FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .finish(),
        )
    };

    if installed.is_err() {
        // Subscriber already set elsewhere; ignore.
    }
    Ok(())
}
