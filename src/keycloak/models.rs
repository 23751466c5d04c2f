//! Wire types for the identity provider's token and admin endpoints.
//!
//! Only the fields this crate reads are modelled; everything else in the
//! provider's payloads is ignored.

use serde::Deserialize;

use crate::secrets::SecretString;

/// Body of a successful password-grant token response
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: SecretString,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// One entry of the realm's client listing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRepresentation {
    /// Internal identifier used in admin URLs
    pub id: String,
    /// Human-readable client name
    pub client_id: String,
}

/// Body returned when a client secret is regenerated
#[derive(Debug, Deserialize)]
pub struct CredentialRepresentation {
    pub value: SecretString,
}
