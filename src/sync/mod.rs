//! # Retry Orchestrator
//!
//! Runs Authenticate → Resolve → Persist as one unit and retries the whole
//! unit on transient failures. The loop is an explicit state machine:
//!
//! ```text
//! Idle ──start──▶ Attempting(n) ──ok──────────────────────▶ Succeeded
//!                   │  ▲
//!                   │  └──transient, n < max (after backoff)
//!                   ├──transient, n = max ──────────────────▶ ExhaustedRetries
//!                   └──fatal ───────────────────────────────▶ error returned as-is
//! ```
//!
//! The components behind [`IdentityProvider`] and [`SecretSink`] never retry
//! on their own.

pub mod retry;

pub use retry::{RetryDecision, RetryPolicy};

use async_trait::async_trait;
use tracing::{debug, error, info, warn, Instrument};

use crate::errors::{Result, SyncError};
use crate::secrets::{SecretString, UpsertOutcome};

/// Source of the client secret: the Authenticator and Secret Resolver steps
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Realm the provider is bound to, for log context
    fn realm(&self) -> &str;

    /// Obtains a bearer token for the admin API
    async fn authenticate(&self) -> Result<SecretString>;

    /// Finds the client named `client_id` and returns its freshly rotated secret
    async fn resolve_client_secret(
        &self,
        token: &SecretString,
        client_id: &str,
    ) -> Result<SecretString>;
}

/// Destination of the client secret: the Persistor step
pub trait SecretSink: Send + Sync {
    fn write_secret(&self, secret: &SecretString) -> Result<UpsertOutcome>;

    /// Human-readable target for logs
    fn location(&self) -> String;
}

/// Orchestrator state. `Succeeded` and `ExhaustedRetries` are terminal.
#[derive(Debug)]
pub enum SyncState {
    Idle,
    Attempting { attempt: u32 },
    Succeeded { attempts: u32, outcome: UpsertOutcome },
    ExhaustedRetries { attempts: u32, last_error: SyncError },
}

/// Summary of a successful run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Attempts used, including the successful one
    pub attempts: u32,
    pub outcome: UpsertOutcome,
}

/// One secret synchronisation: rotate `client_id`'s secret and persist it
pub struct SecretSync<P, S> {
    provider: P,
    sink: S,
    client_id: String,
    policy: RetryPolicy,
}

impl<P, S> SecretSync<P, S>
where
    P: IdentityProvider,
    S: SecretSink,
{
    pub fn new(provider: P, sink: S, client_id: impl Into<String>, policy: RetryPolicy) -> Self {
        Self { provider, sink, client_id: client_id.into(), policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Drives the state machine to a terminal state
    pub async fn run(&self) -> Result<SyncReport> {
        let span = crate::run_span!(
            self.client_id,
            realm = %self.provider.realm(),
            sink = %self.sink.location()
        );
        self.drive().instrument(span).await
    }

    async fn drive(&self) -> Result<SyncReport> {
        let max_attempts = self.policy.max_attempts;
        let mut state = SyncState::Idle;

        loop {
            debug!(state = ?state, "Secret sync state");
            state = match state {
                SyncState::Idle => SyncState::Attempting { attempt: 1 },

                SyncState::Attempting { attempt } => {
                    let span = crate::attempt_span!(attempt, max_attempts);
                    let result = self.attempt().instrument(span).await;
                    match result {
                        Ok(outcome) => SyncState::Succeeded { attempts: attempt, outcome },
                        Err(err) => match self.policy.decide(attempt, &err) {
                            RetryDecision::Retry { backoff } => {
                                warn!(
                                    error = %err,
                                    attempt,
                                    max_attempts,
                                    backoff_ms = backoff.as_millis() as u64,
                                    "Error fetching client secret, attempt {} of {}; retrying",
                                    attempt,
                                    max_attempts
                                );
                                tokio::time::sleep(backoff).await;
                                SyncState::Attempting { attempt: attempt + 1 }
                            }
                            RetryDecision::Exhausted => {
                                error!(
                                    error = %err,
                                    attempt,
                                    max_attempts,
                                    "Error fetching client secret, attempt {} of {}",
                                    attempt,
                                    max_attempts
                                );
                                SyncState::ExhaustedRetries { attempts: attempt, last_error: err }
                            }
                            RetryDecision::Abort => {
                                error!(
                                    error = %err,
                                    attempt,
                                    "Non-transient failure; not retrying"
                                );
                                return Err(err);
                            }
                        },
                    }
                }

                SyncState::Succeeded { attempts, outcome } => {
                    info!(attempts, outcome = %outcome, "Client secret synchronised");
                    return Ok(SyncReport { attempts, outcome });
                }

                SyncState::ExhaustedRetries { attempts, last_error } => {
                    return Err(SyncError::retries_exhausted(attempts, last_error));
                }
            };
        }
    }

    async fn attempt(&self) -> Result<UpsertOutcome> {
        info!("Fetching access token");
        let token = self.provider.authenticate().await?;

        info!(client_id = %self.client_id, "Fetching client secret");
        let secret = self.provider.resolve_client_secret(&token, &self.client_id).await?;
        drop(token);

        self.sink.write_secret(&secret)
    }
}
