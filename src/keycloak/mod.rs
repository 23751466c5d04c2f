//! # Identity Provider Client
//!
//! Talks to a Keycloak-compatible admin API: password-grant token request,
//! realm client listing, and client secret regeneration.

pub mod client;
pub mod models;

pub use client::{select_client, KeycloakAdminClient};
pub use models::{ClientRepresentation, CredentialRepresentation, TokenResponse};
