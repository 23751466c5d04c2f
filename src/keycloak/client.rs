//! HTTP client for the identity provider's token and admin endpoints.
//!
//! Each method performs exactly one request and never retries; retry policy
//! belongs to [`crate::sync::SecretSync`].

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use super::models::{ClientRepresentation, CredentialRepresentation, TokenResponse};
use crate::config::ProviderConfig;
use crate::errors::{Result, SyncError};
use crate::secrets::SecretString;
use crate::sync::IdentityProvider;

/// Upper bound on how much of an error body is echoed into error messages
const MAX_ERROR_BODY_CHARS: usize = 512;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Which call a failure belongs to; decides the error variant it maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    TokenRequest,
    ListClients,
    RegenerateSecret,
}

impl Operation {
    fn as_str(self) -> &'static str {
        match self {
            Operation::TokenRequest => "token request",
            Operation::ListClients => "client listing",
            Operation::RegenerateSecret => "secret regeneration",
        }
    }

    fn send_error(self, err: reqwest::Error) -> SyncError {
        let detail = if err.is_timeout() { format!("timed out: {}", err) } else { err.to_string() };
        match self {
            Operation::TokenRequest => {
                SyncError::authentication(format!("{} failed: {}", self.as_str(), detail))
            }
            _ => SyncError::transport(self.as_str(), detail),
        }
    }

    fn status_error(self, status: StatusCode, body: &str) -> SyncError {
        let message = format!("HTTP {}: {}", status, truncate(body.trim(), MAX_ERROR_BODY_CHARS));
        match self {
            Operation::TokenRequest => SyncError::authentication_status(status.as_u16(), message),
            _ => SyncError::transport_status(self.as_str(), status.as_u16(), message),
        }
    }
}

/// Admin API client bound to one realm and one set of admin credentials
#[derive(Debug, Clone)]
pub struct KeycloakAdminClient {
    http: Client,
    base_url: Url,
    realm: String,
    admin_username: String,
    admin_password: SecretString,
    admin_client_id: String,
}

impl KeycloakAdminClient {
    /// Create a client from validated provider settings
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            SyncError::config(format!(
                "Invalid identity provider URL '{}': {}",
                config.base_url, e
            ))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(SyncError::config(format!(
                "Identity provider URL '{}' cannot be used as a base",
                config.base_url
            )));
        }

        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SyncError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            realm: config.realm.clone(),
            admin_username: config.admin_username.clone(),
            admin_password: config.admin_password.clone(),
            admin_client_id: config.admin_client_id.clone(),
        })
    }

    /// Appends percent-encoded path segments to the base URL, tolerating a trailing slash
    fn build_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                SyncError::config(format!("Invalid identity provider URL '{}'", self.base_url))
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    /// Password-grant token request against the realm's token endpoint
    pub async fn fetch_access_token(&self) -> Result<SecretString> {
        let op = Operation::TokenRequest;
        let url = self.build_url(&["realms", &self.realm, "protocol", "openid-connect", "token"])?;
        debug!("POST {}", url);

        let form = [
            ("client_id", self.admin_client_id.as_str()),
            ("username", self.admin_username.as_str()),
            ("password", self.admin_password.expose_secret()),
            ("grant_type", "password"),
        ];
        let response =
            self.http.post(url).form(&form).send().await.map_err(|e| op.send_error(e))?;

        let token: TokenResponse = read_json(response, op).await?;
        if token.access_token.is_empty() {
            return Err(SyncError::response_format(op.as_str(), "access_token is empty"));
        }
        debug!(expires_in = ?token.expires_in, "Received access token");
        Ok(token.access_token)
    }

    /// Lists every client registration in the realm
    pub async fn list_clients(&self, token: &SecretString) -> Result<Vec<ClientRepresentation>> {
        let op = Operation::ListClients;
        let url = self.build_url(&["admin", "realms", &self.realm, "clients"])?;
        debug!("GET {}", url);

        let response = self
            .http
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|e| op.send_error(e))?;

        read_json(response, op).await
    }

    /// Rotates the secret of the client with internal id `id` and returns the new value
    pub async fn regenerate_client_secret(
        &self,
        token: &SecretString,
        id: &str,
    ) -> Result<SecretString> {
        let op = Operation::RegenerateSecret;
        let url =
            self.build_url(&["admin", "realms", &self.realm, "clients", id, "client-secret"])?;
        debug!("POST {}", url);

        let response = self
            .http
            .post(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|e| op.send_error(e))?;

        let credential: CredentialRepresentation = read_json(response, op).await?;
        if credential.value.is_empty() {
            return Err(SyncError::response_format(op.as_str(), "secret value is empty"));
        }
        Ok(credential.value)
    }

    /// Finds the client named `client_id` and rotates its secret
    pub async fn resolve_client_secret(
        &self,
        token: &SecretString,
        client_id: &str,
    ) -> Result<SecretString> {
        let clients = self.list_clients(token).await?;
        debug!(count = clients.len(), "Listed realm clients");

        let client = select_client(&clients, client_id)
            .ok_or_else(|| SyncError::not_found(client_id, &self.realm))?;

        self.regenerate_client_secret(token, &client.id).await
    }
}

#[async_trait]
impl IdentityProvider for KeycloakAdminClient {
    fn realm(&self) -> &str {
        &self.realm
    }

    async fn authenticate(&self) -> Result<SecretString> {
        self.fetch_access_token().await
    }

    async fn resolve_client_secret(
        &self,
        token: &SecretString,
        client_id: &str,
    ) -> Result<SecretString> {
        KeycloakAdminClient::resolve_client_secret(self, token, client_id).await
    }
}

/// Picks the registration whose `clientId` equals `client_id`.
///
/// When several registrations share the name, the first one in listing order
/// wins and a warning is logged.
pub fn select_client<'a>(
    clients: &'a [ClientRepresentation],
    client_id: &str,
) -> Option<&'a ClientRepresentation> {
    let mut matches = clients.iter().filter(|c| c.client_id == client_id);
    let first = matches.next()?;

    let extra = matches.count();
    if extra > 0 {
        warn!(
            client_id = %client_id,
            matches = extra + 1,
            selected_id = %first.id,
            "Multiple clients share this name; using the first in listing order"
        );
    }
    Some(first)
}

async fn read_json<T: DeserializeOwned>(response: Response, op: Operation) -> Result<T> {
    let status = response.status();
    debug!("Response status: {}", status);

    if !status.is_success() {
        let error_text =
            response.text().await.unwrap_or_else(|_| "<unable to read error>".to_string());
        return Err(op.status_error(status, &error_text));
    }

    let body = response.text().await.map_err(|e| op.send_error(e))?;

    // Success bodies may carry credentials, so only the parser's message is reported
    serde_json::from_str(&body).map_err(|e| SyncError::response_format(op.as_str(), e.to_string()))
}

fn truncate(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}
