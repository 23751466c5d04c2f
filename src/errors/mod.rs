//! # Error Handling
//!
//! Error types for the secret synchronisation run, built on `thiserror`.

pub mod types;

pub use types::{Result, SyncError};
