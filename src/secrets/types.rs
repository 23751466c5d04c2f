//! Redacting wrapper for credentials handled during a run.
//!
//! The admin password, the bearer token and the rotated client secret all
//! travel through this type so they never end up in log fields or error text.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A string whose contents are redacted in `Debug`, `Display` and serialization
/// and zeroed on drop.
///
/// The raw value is only reachable through [`SecretString::expose_secret`],
/// which should be called at the point the value leaves the process (an HTTP
/// form body, an `Authorization` header, the env file line).
///
/// ```rust
/// use secret_sync::SecretString;
///
/// let secret = SecretString::new("s3cr3t");
/// assert_eq!(format!("{:?}", secret), "SecretString([REDACTED])");
/// assert_eq!(secret.expose_secret(), "s3cr3t");
/// ```
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Returns the underlying value. Never log the result.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for SecretString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Provider responses carry real values; only the outbound direction redacts.
        String::deserialize(deserializer).map(SecretString)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_and_display_redact() {
        let secret = SecretString::new("rotated-client-secret");

        assert_eq!(format!("{:?}", secret), "SecretString([REDACTED])");
        assert_eq!(format!("{}", secret), "[REDACTED]");
    }

    #[test]
    fn test_expose_returns_raw_value() {
        let secret = SecretString::from("abc123");
        assert_eq!(secret.expose_secret(), "abc123");
        assert!(!secret.is_empty());
        assert!(SecretString::default().is_empty());
    }

    #[test]
    fn test_deserialize_keeps_value_serialize_redacts() {
        #[derive(Deserialize, Serialize)]
        struct Credential {
            value: SecretString,
        }

        let parsed: Credential = serde_json::from_str(r#"{"value":"k9-secret"}"#).unwrap();
        assert_eq!(parsed.value.expose_secret(), "k9-secret");

        let json = serde_json::to_string(&parsed).unwrap();
        assert_eq!(json, r#"{"value":"[REDACTED]"}"#);
    }

    #[test]
    fn test_debug_of_containing_struct_redacts() {
        #[derive(Debug)]
        #[allow(dead_code)]
        struct Login {
            username: String,
            password: SecretString,
        }

        let login = Login { username: "admin".into(), password: "hunter2".into() };
        let out = format!("{:?}", login);
        assert!(out.contains("admin"));
        assert!(!out.contains("hunter2"));
    }
}
