//! Secret handling: the redacting [`SecretString`] and the env file persistor.

pub mod env_file;
pub mod types;

pub use env_file::{upsert_entry, EnvFile, Upsert, UpsertOutcome};
pub use types::SecretString;
