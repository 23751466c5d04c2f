//! # secret-sync
//!
//! One-shot credential provisioning for an OAuth2 reverse proxy. On start-up
//! the tool authenticates against a Keycloak admin API, regenerates the
//! secret of one confidential client and writes it into a `KEY=value` env
//! file, retrying the whole sequence on transient failures.
//!
//! ```text
//! Authenticate → Resolve (find client, regenerate secret) → Persist (.env)
//!        ▲                                                     │
//!        └──────────── retry on transient failure ─────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use secret_sync::{cli, Result, SyncConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<()> {
//!     let config = SyncConfig::from_env()?;
//!     config.validate()?;
//!     let report = cli::execute(&config).await?;
//!     println!("finished after {} attempt(s)", report.attempts);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod keycloak;
pub mod observability;
pub mod secrets;
pub mod sync;

pub use config::SyncConfig;
pub use errors::{Result, SyncError};
pub use secrets::SecretString;
pub use sync::{SecretSync, SyncReport};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
