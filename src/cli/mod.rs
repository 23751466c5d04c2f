//! # Command Line Interface
//!
//! Single-shot entry point: read configuration, rotate the client secret once
//! and write it to the env file. Flags override environment variables; the
//! admin password is only ever read from the environment.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use crate::config::{SyncConfig, WriteMode};
use crate::errors::Result;
use crate::keycloak::KeycloakAdminClient;
use crate::observability::{init_logging, log_config_info};
use crate::secrets::EnvFile;
use crate::sync::{RetryPolicy, SecretSync, SyncReport};

#[derive(Parser, Debug, Default)]
#[command(name = "secret-sync")]
#[command(about = "Rotate a Keycloak client secret and write it to an env file")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Identity provider base URL (KEYCLOAK_URL)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Realm containing the target client (KEYCLOAK_REALM)
    #[arg(long)]
    pub realm: Option<String>,

    /// Human-readable client id whose secret is rotated (OAUTH2_PROXY_CLIENT_ID)
    #[arg(long)]
    pub client_id: Option<String>,

    /// Env file to update (SECRET_SYNC_ENV_FILE)
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Key written to the env file (SECRET_SYNC_SECRET_KEY)
    #[arg(long)]
    pub secret_key: Option<String>,

    /// Maximum number of attempts (SECRET_SYNC_MAX_ATTEMPTS)
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Seconds to wait between attempts (SECRET_SYNC_RETRY_BACKOFF_SECONDS)
    #[arg(long)]
    pub backoff_seconds: Option<u64>,

    /// Per-request timeout in seconds (SECRET_SYNC_HTTP_TIMEOUT_SECONDS)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// How the env file is rewritten (SECRET_SYNC_WRITE_MODE)
    #[arg(long, value_enum)]
    pub write_mode: Option<WriteMode>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON (SECRET_SYNC_LOG_JSON)
    #[arg(long)]
    pub json_logs: bool,
}

impl Cli {
    /// Overlay command line values on top of the environment configuration
    pub fn apply_overrides(&self, config: &mut SyncConfig) {
        if let Some(base_url) = &self.base_url {
            config.provider.base_url = base_url.clone();
        }
        if let Some(realm) = &self.realm {
            config.provider.realm = realm.clone();
        }
        if let Some(timeout) = self.timeout {
            config.provider.timeout_seconds = timeout;
        }
        if let Some(client_id) = &self.client_id {
            config.target.client_id = client_id.clone();
        }
        if let Some(env_file) = &self.env_file {
            config.target.env_file = env_file.clone();
        }
        if let Some(secret_key) = &self.secret_key {
            config.target.secret_key = secret_key.clone();
        }
        if let Some(write_mode) = self.write_mode {
            config.target.write_mode = write_mode;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.retry.max_attempts = max_attempts;
        }
        if let Some(backoff_seconds) = self.backoff_seconds {
            config.retry.backoff_seconds = backoff_seconds;
        }
        if self.json_logs {
            config.observability.json_logging = true;
        }
    }
}

/// Run the CLI
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = SyncConfig::from_env()?;
    cli.apply_overrides(&mut config);

    init_logging(&config.observability, cli.verbose)?;
    config.validate()?;
    log_config_info(&config);

    let report = execute(&config).await?;
    info!(
        client_id = %config.target.client_id,
        env_file = %config.target.env_file.display(),
        secret_key = %config.target.secret_key,
        attempts = report.attempts,
        outcome = %report.outcome,
        "Client secret written to env file"
    );

    Ok(())
}

/// Wire the Keycloak client and env file together and run one sync
pub async fn execute(config: &SyncConfig) -> Result<SyncReport> {
    let provider = KeycloakAdminClient::new(&config.provider)?;
    let sink = EnvFile::from_config(&config.target);
    let sync = SecretSync::new(
        provider,
        sink,
        config.target.client_id.clone(),
        RetryPolicy::from(&config.retry),
    );

    sync.run().await
}
