//! # Error Types
//!
//! Error taxonomy for a secret synchronisation run using `thiserror`.
//!
//! Every component returns [`SyncError`]; only the orchestrator in
//! [`crate::sync`] decides whether a failure is retried, using
//! [`SyncError::is_transient`].

use std::path::{Path, PathBuf};

/// Custom result type for secret-sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Main error type for a secret synchronisation run
#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    /// Invalid or missing configuration
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Token request failed at the transport level or was rejected
    #[error("Authentication error: {message}")]
    Authentication { message: String, status: Option<u16> },

    /// Network, timeout or non-success HTTP status on an administrative call
    #[error("Transport error during {operation}: {message}")]
    Transport { operation: String, message: String, status: Option<u16> },

    /// The configured client name is absent from the realm listing
    #[error("Client '{client_id}' not found in realm '{realm}'")]
    NotFound { client_id: String, realm: String },

    /// A response body was missing expected fields or was not valid JSON
    #[error("Unexpected response format during {operation}: {message}")]
    ResponseFormat { operation: String, message: String },

    /// The target file could not be read or written
    #[error("Persistence error: {context} ({})", .path.display())]
    Persistence {
        path: PathBuf,
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Every attempt failed with a transient error
    #[error("Failed to fetch client secret: all {attempts} attempts exhausted")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last_error: Box<SyncError>,
    },
}

impl SyncError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create an authentication error without an HTTP status
    pub fn authentication<S: Into<String>>(message: S) -> Self {
        Self::Authentication { message: message.into(), status: None }
    }

    /// Create an authentication error for a rejected token request
    pub fn authentication_status<S: Into<String>>(status: u16, message: S) -> Self {
        Self::Authentication { message: message.into(), status: Some(status) }
    }

    /// Create a transport error without an HTTP status
    pub fn transport<O: Into<String>, S: Into<String>>(operation: O, message: S) -> Self {
        Self::Transport { operation: operation.into(), message: message.into(), status: None }
    }

    /// Create a transport error for a non-success HTTP status
    pub fn transport_status<O: Into<String>, S: Into<String>>(
        operation: O,
        status: u16,
        message: S,
    ) -> Self {
        Self::Transport {
            operation: operation.into(),
            message: message.into(),
            status: Some(status),
        }
    }

    /// Create a not found error
    pub fn not_found<C: Into<String>, R: Into<String>>(client_id: C, realm: R) -> Self {
        Self::NotFound { client_id: client_id.into(), realm: realm.into() }
    }

    /// Create a response format error
    pub fn response_format<O: Into<String>, S: Into<String>>(operation: O, message: S) -> Self {
        Self::ResponseFormat { operation: operation.into(), message: message.into() }
    }

    /// Create a persistence error
    pub fn persistence<C: Into<String>>(path: &Path, context: C, source: std::io::Error) -> Self {
        Self::Persistence { path: path.to_path_buf(), context: context.into(), source }
    }

    /// Wrap the last transient failure once the attempt budget is spent
    pub fn retries_exhausted(attempts: u32, last_error: SyncError) -> Self {
        Self::RetriesExhausted { attempts, last_error: Box::new(last_error) }
    }

    /// Whether retrying the whole sequence could plausibly succeed.
    ///
    /// Only transport-class failures are transient. Missing clients,
    /// malformed bodies, file errors and bad configuration are fatal.
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Authentication { .. } | SyncError::Transport { .. })
    }

    /// HTTP status attached to the failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Authentication { status, .. } | SyncError::Transport { status, .. } => {
                *status
            }
            _ => None,
        }
    }
}

impl From<validator::ValidationErrors> for SyncError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = Vec::new();
        collect_validation_messages(&errors, "", &mut fields);
        fields.sort();

        Self::config(format!("Validation failed: {}", fields.join("; ")))
    }
}

/// Flattens nested `#[validate(nested)]` errors into `section.field: message` entries
fn collect_validation_messages(
    errors: &validator::ValidationErrors,
    prefix: &str,
    out: &mut Vec<String>,
) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let path =
            if prefix.is_empty() { field.to_string() } else { format!("{}.{}", prefix, field) };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                out.push(format!("{}: {}", path, error_messages.join(", ")));
            }
            ValidationErrorsKind::Struct(nested) => {
                collect_validation_messages(nested, &path, out);
            }
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_validation_messages(nested, &format!("{}[{}]", path, index), out);
                }
            }
        }
    }
}
