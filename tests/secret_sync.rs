//! End-to-end runs against a mocked Keycloak admin API
//!
//! Each test stands up a wiremock server for the token, client listing and
//! secret regeneration endpoints and points a real env file at a temp dir.

use std::fs;
use std::path::{Path, PathBuf};

use secret_sync::cli::execute;
use secret_sync::config::{SyncConfig, WriteMode};
use secret_sync::secrets::UpsertOutcome;
use secret_sync::SyncError;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REALM: &str = "demo";
const CLIENT_ID: &str = "oauth2-proxy";
const INTERNAL_ID: &str = "5f0c2a4e-1111-4a4a-9c9c-000000000001";
const TOKEN_PATH: &str = "/realms/demo/protocol/openid-connect/token";
const CLIENTS_PATH: &str = "/admin/realms/demo/clients";
const SECRET_PATH: &str =
    "/admin/realms/demo/clients/5f0c2a4e-1111-4a4a-9c9c-000000000001/client-secret";

fn config_for(server: &MockServer, env_file: &Path, max_attempts: u32) -> SyncConfig {
    let mut config = SyncConfig::default();
    config.provider.base_url = server.uri();
    config.provider.realm = REALM.to_string();
    config.provider.admin_password = "admin-pass".into();
    config.provider.timeout_seconds = 5;
    config.target.client_id = CLIENT_ID.to_string();
    config.target.env_file = env_file.to_path_buf();
    config.retry.max_attempts = max_attempts;
    config.retry.backoff_seconds = 0;
    config
}

fn env_file(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join(".env");
    fs::write(&path, contents).unwrap();
    path
}

fn token_ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": "admin-token",
        "expires_in": 60,
        "token_type": "Bearer"
    }))
}

fn clients_ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!([
        { "id": "aaaa-0000", "clientId": "admin-cli" },
        { "id": INTERNAL_ID, "clientId": CLIENT_ID, "enabled": true },
        { "id": "bbbb-0000", "clientId": "account" }
    ]))
}

fn secret_ok(value: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "type": "secret", "value": value }))
}

async fn mount_token(server: &MockServer, expected: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("client_id=admin-cli"))
        .respond_with(token_ok())
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_clients(server: &MockServer, expected: u64) {
    Mock::given(method("GET"))
        .and(path(CLIENTS_PATH))
        .and(header("authorization", "Bearer admin-token"))
        .respond_with(clients_ok())
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_secret(server: &MockServer, value: &str, expected: u64) {
    Mock::given(method("POST"))
        .and(path(SECRET_PATH))
        .and(header("authorization", "Bearer admin-token"))
        .respond_with(secret_ok(value))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_replaces_existing_secret_and_keeps_other_lines() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    mount_clients(&server, 1).await;
    mount_secret(&server, "Zk2x9-new", 1).await;

    let dir = TempDir::new().unwrap();
    let path = env_file(
        &dir,
        "OAUTH2_PROXY_PROVIDER=keycloak-oidc\nOAUTH2_PROXY_CLIENT_SECRET=old\n# comment\nOTHER=1\n",
    );

    let report = execute(&config_for(&server, &path, 2)).await.unwrap();

    assert_eq!(report.attempts, 1);
    assert_eq!(report.outcome, UpsertOutcome::Replaced);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        concat!(
            "OAUTH2_PROXY_PROVIDER=keycloak-oidc\n",
            "OAUTH2_PROXY_CLIENT_SECRET=Zk2x9-new\n",
            "# comment\n",
            "OTHER=1\n"
        )
    );
    server.verify().await;
}

#[tokio::test]
async fn test_appends_when_key_missing() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    mount_clients(&server, 1).await;
    mount_secret(&server, "fresh", 1).await;

    let dir = TempDir::new().unwrap();
    let path = env_file(&dir, "OTHER=1");

    let report = execute(&config_for(&server, &path, 2)).await.unwrap();

    assert_eq!(report.outcome, UpsertOutcome::Appended);
    assert_eq!(fs::read_to_string(&path).unwrap(), "OTHER=1\nOAUTH2_PROXY_CLIENT_SECRET=fresh\n");
}

#[tokio::test]
async fn test_rerun_with_same_secret_leaves_file_alone() {
    let server = MockServer::start().await;
    mount_token(&server, 2).await;
    mount_clients(&server, 2).await;
    mount_secret(&server, "stable", 2).await;

    let dir = TempDir::new().unwrap();
    let path = env_file(&dir, "OAUTH2_PROXY_CLIENT_SECRET=old\n");
    let config = config_for(&server, &path, 1);

    assert_eq!(execute(&config).await.unwrap().outcome, UpsertOutcome::Replaced);
    let after_first = fs::read_to_string(&path).unwrap();
    assert_eq!(execute(&config).await.unwrap().outcome, UpsertOutcome::Unchanged);

    assert_eq!(fs::read_to_string(&path).unwrap(), after_first);
    assert_eq!(after_first.matches("OAUTH2_PROXY_CLIENT_SECRET=").count(), 1);
}

#[tokio::test]
async fn test_recovers_from_transient_listing_failures() {
    let server = MockServer::start().await;
    mount_token(&server, 3).await;
    Mock::given(method("GET"))
        .and(path(CLIENTS_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("starting up"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_clients(&server, 1).await;
    mount_secret(&server, "after-restart", 1).await;

    let dir = TempDir::new().unwrap();
    let path = env_file(&dir, "OAUTH2_PROXY_CLIENT_SECRET=old\n");

    let report = execute(&config_for(&server, &path, 3)).await.unwrap();

    assert_eq!(report.attempts, 3);
    assert_eq!(fs::read_to_string(&path).unwrap(), "OAUTH2_PROXY_CLIENT_SECRET=after-restart\n");
    server.verify().await;
}

#[tokio::test]
async fn test_exhausted_retries_leave_file_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;
    mount_clients(&server, 0).await;

    let dir = TempDir::new().unwrap();
    let original = "OAUTH2_PROXY_CLIENT_SECRET=old\nOTHER=1\n";
    let path = env_file(&dir, original);

    let err = execute(&config_for(&server, &path, 2)).await.unwrap_err();

    match &err {
        SyncError::RetriesExhausted { attempts, last_error } => {
            assert_eq!(*attempts, 2);
            assert!(matches!(**last_error, SyncError::Authentication { status: Some(503), .. }));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(fs::read_to_string(&path).unwrap(), original);
    server.verify().await;
}

#[tokio::test]
async fn test_rejected_credentials_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "error": "invalid_grant" })),
        )
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let path = env_file(&dir, "OTHER=1\n");

    let err = execute(&config_for(&server, &path, 2)).await.unwrap_err();

    assert!(matches!(err, SyncError::RetriesExhausted { attempts: 2, .. }));
    server.verify().await;
}

#[tokio::test]
async fn test_unknown_client_fails_without_retry() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path(CLIENTS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "id": "x", "clientId": "account" }])),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_secret(&server, "never", 0).await;

    let dir = TempDir::new().unwrap();
    let path = env_file(&dir, "OAUTH2_PROXY_CLIENT_SECRET=old\n");

    let err = execute(&config_for(&server, &path, 5)).await.unwrap_err();

    assert!(matches!(err, SyncError::NotFound { .. }));
    assert!(err.to_string().contains(CLIENT_ID));
    assert_eq!(fs::read_to_string(&path).unwrap(), "OAUTH2_PROXY_CLIENT_SECRET=old\n");
    server.verify().await;
}

#[tokio::test]
async fn test_malformed_token_body_fails_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let path = env_file(&dir, "OTHER=1\n");

    let err = execute(&config_for(&server, &path, 3)).await.unwrap_err();

    assert!(matches!(err, SyncError::ResponseFormat { .. }));
    server.verify().await;
}

#[tokio::test]
async fn test_missing_env_file_is_persistence_error() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    mount_clients(&server, 1).await;
    mount_secret(&server, "fresh", 1).await;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.env");

    let err = execute(&config_for(&server, &path, 3)).await.unwrap_err();

    assert!(matches!(err, SyncError::Persistence { .. }));
    assert!(!path.exists());
}

#[tokio::test]
async fn test_in_place_mode_and_trailing_slash_base_url() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    mount_clients(&server, 1).await;
    mount_secret(&server, "in-place", 1).await;

    let dir = TempDir::new().unwrap();
    let path = env_file(&dir, "OAUTH2_PROXY_CLIENT_SECRET=old\r\nOTHER=1\r\n");
    let mut config = config_for(&server, &path, 1);
    config.provider.base_url = format!("{}/", server.uri());
    config.target.write_mode = WriteMode::InPlace;

    execute(&config).await.unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "OAUTH2_PROXY_CLIENT_SECRET=in-place\r\nOTHER=1\r\n"
    );
}

#[tokio::test]
async fn test_duplicate_key_lines_collapse_to_first() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    mount_clients(&server, 1).await;
    mount_secret(&server, "one", 1).await;

    let dir = TempDir::new().unwrap();
    let path = env_file(
        &dir,
        "A=1\nOAUTH2_PROXY_CLIENT_SECRET=x\nB=2\nOAUTH2_PROXY_CLIENT_SECRET=y\n",
    );

    execute(&config_for(&server, &path, 1)).await.unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "A=1\nOAUTH2_PROXY_CLIENT_SECRET=one\nB=2\n");
}

/// Runs one sync where the regeneration endpoint answers with `body`
async fn run_with_regeneration_body(body: serde_json::Value) -> (SyncError, MockServer) {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    mount_clients(&server, 1).await;
    Mock::given(method("POST"))
        .and(path(SECRET_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let path = env_file(&dir, "OAUTH2_PROXY_CLIENT_SECRET=old\n");

    let err = execute(&config_for(&server, &path, 3)).await.unwrap_err();
    assert_eq!(fs::read_to_string(&path).unwrap(), "OAUTH2_PROXY_CLIENT_SECRET=old\n");
    (err, server)
}

/// Runs one sync where the client listing answers with `template`
async fn run_with_listing(template: ResponseTemplate) -> (SyncError, MockServer) {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path(CLIENTS_PATH))
        .respond_with(template)
        .expect(1)
        .mount(&server)
        .await;
    mount_secret(&server, "never", 0).await;

    let dir = TempDir::new().unwrap();
    let path = env_file(&dir, "OTHER=1\n");

    let err = execute(&config_for(&server, &path, 3)).await.unwrap_err();
    assert_eq!(fs::read_to_string(&path).unwrap(), "OTHER=1\n");
    (err, server)
}

#[tokio::test]
async fn test_regeneration_without_value_fails_without_retry() {
    let (err, server) = run_with_regeneration_body(json!({ "type": "secret" })).await;

    match &err {
        SyncError::ResponseFormat { operation, message } => {
            assert_eq!(operation, "secret regeneration");
            assert!(message.contains("value"));
        }
        other => panic!("unexpected error {:?}", other),
    }
    server.verify().await;
}

#[tokio::test]
async fn test_regeneration_with_empty_value_fails_without_retry() {
    let (err, server) = run_with_regeneration_body(json!({ "type": "secret", "value": "" })).await;

    assert!(matches!(err, SyncError::ResponseFormat { .. }));
    assert!(err.to_string().contains("empty"));
    server.verify().await;
}

#[tokio::test]
async fn test_listing_entry_without_id_fails_without_retry() {
    let listing = ResponseTemplate::new(200).set_body_json(json!([{ "clientId": CLIENT_ID }]));
    let (err, server) = run_with_listing(listing).await;

    match &err {
        SyncError::ResponseFormat { operation, .. } => assert_eq!(operation, "client listing"),
        other => panic!("unexpected error {:?}", other),
    }
    server.verify().await;
}

#[tokio::test]
async fn test_listing_that_is_not_an_array_fails_without_retry() {
    let listing = ResponseTemplate::new(200).set_body_json(json!({ "clients": [] }));
    let (err, server) = run_with_listing(listing).await;

    assert!(matches!(err, SyncError::ResponseFormat { .. }));
    assert!(!err.is_transient());
    server.verify().await;
}
