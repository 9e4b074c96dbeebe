// Integration tests for vk
//
// These tests run the login flow against a mock Vault server and verify the
// HTTP calls made, the resolved session and the cached token file.

use mockito::{Matcher, Server};
use serde_json::json;
use std::path::PathBuf;

use vk::{
    auth::{
        AuthMethod, AuthResolver, PasswordCredential, RenewalThreshold, RoleCredential, TokenStore,
    },
    config::Config,
    error::{AuthError, VaultError},
    vault::{VaultApi, VaultClient},
};

// ==================================================================================================
// Test Helpers
// ==================================================================================================

const LOOKUP_SELF: &str = "/v1/auth/token/lookup-self";
const RENEW_SELF: &str = "/v1/auth/token/renew-self";
const APPROLE_LOGIN: &str = "/v1/auth/approle/login";
const USERPASS_LOGIN: &str = "/v1/auth/userpass/login/alice";

/// Configuration with nothing set up except the server address
fn test_config(address: &str) -> Config {
    Config {
        address: address.to_string(),
        token: None,
        token_file: None,
        token_renewal_threshold: RenewalThreshold::default(),
        approle: RoleCredential::default(),
        userpass: PasswordCredential::default(),
        log_level: "debug".to_string(),
        http_timeout: 5,
    }
}

fn approle(role_id: &str, secret_id: &str) -> RoleCredential {
    RoleCredential {
        path: "auth/approle/login".to_string(),
        role_id: role_id.to_string(),
        secret_id: secret_id.to_string(),
    }
}

fn userpass(password: &str) -> PasswordCredential {
    PasswordCredential {
        path: "auth/userpass/login/alice".to_string(),
        password: password.to_string(),
    }
}

fn lookup_body(ttl: i64, creation_ttl: i64) -> String {
    json!({
        "request_id": "0b1c3f7e",
        "lease_id": "",
        "renewable": false,
        "lease_duration": 0,
        "data": {
            "accessor": "8609694a",
            "creation_ttl": creation_ttl,
            "display_name": "token",
            "policies": ["default"],
            "renewable": true,
            "ttl": ttl
        },
        "warnings": null,
        "auth": null
    })
    .to_string()
}

fn login_body(client_token: &str) -> String {
    json!({
        "request_id": "7a8b9c",
        "data": null,
        "warnings": null,
        "auth": {
            "client_token": client_token,
            "accessor": "acc",
            "policies": ["default"],
            "lease_duration": 3600,
            "renewable": true
        }
    })
    .to_string()
}

const PERMISSION_DENIED: &str = r#"{"errors":["permission denied"]}"#;

// ==================================================================================================
// Token Source Tests
// ==================================================================================================

#[tokio::test]
async fn test_literal_token_then_file_token() {
    let mut server = Server::new_async().await;

    let revoked = server
        .mock("GET", LOOKUP_SELF)
        .match_header("x-vault-token", "hvs.revoked")
        .with_status(403)
        .with_body(PERMISSION_DENIED)
        .expect(1)
        .create_async()
        .await;
    let cached = server
        .mock("GET", LOOKUP_SELF)
        .match_header("x-vault-token", "hvs.cached")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(lookup_body(2700, 3600))
        .expect(1)
        .create_async()
        .await;
    let login = server
        .mock("POST", APPROLE_LOGIN)
        .expect(0)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join(".vault-token");
    std::fs::write(&token_file, "hvs.cached\n").unwrap();

    let mut config = test_config(&server.url());
    config.token = Some("hvs.revoked".to_string());
    config.token_file = Some(token_file);
    config.approle = approle("role", "secret");

    let mut vault = VaultClient::new(&config.address, config.http_timeout).unwrap();
    let session = AuthResolver::from_config(&config)
        .resolve(&mut vault)
        .await
        .unwrap();

    assert_eq!(session.token, "hvs.cached");
    assert_eq!(session.method, AuthMethod::TokenFile);
    assert!(!session.renewed);

    revoked.assert_async().await;
    cached.assert_async().await;
    login.assert_async().await;
}

#[tokio::test]
async fn test_low_token_is_renewed() {
    let mut server = Server::new_async().await;

    let lookup = server
        .mock("GET", LOOKUP_SELF)
        .match_header("x-vault-token", "hvs.low")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(lookup_body(100, 1000))
        .expect(1)
        .create_async()
        .await;
    let renew = server
        .mock("POST", RENEW_SELF)
        .match_header("x-vault-token", "hvs.low")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(login_body("hvs.low"))
        .expect(1)
        .create_async()
        .await;

    let mut config = test_config(&server.url());
    config.token = Some("hvs.low".to_string());

    let mut vault = VaultClient::new(&config.address, config.http_timeout).unwrap();
    let session = AuthResolver::from_config(&config)
        .resolve(&mut vault)
        .await
        .unwrap();

    assert_eq!(session.method, AuthMethod::Token);
    assert!(session.renewed);

    lookup.assert_async().await;
    renew.assert_async().await;
}

#[tokio::test]
async fn test_failed_renewal_keeps_session() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", LOOKUP_SELF)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(lookup_body(100, 1000))
        .create_async()
        .await;
    let renew = server
        .mock("POST", RENEW_SELF)
        .with_status(403)
        .with_body(PERMISSION_DENIED)
        .expect(1)
        .create_async()
        .await;

    let mut config = test_config(&server.url());
    config.token = Some("hvs.low".to_string());

    let mut vault = VaultClient::new(&config.address, config.http_timeout).unwrap();
    let session = AuthResolver::from_config(&config)
        .resolve(&mut vault)
        .await
        .unwrap();

    assert_eq!(session.token, "hvs.low");
    assert!(!session.renewed);
    renew.assert_async().await;
}

// ==================================================================================================
// Login Method Tests
// ==================================================================================================

#[tokio::test]
async fn test_approle_login_and_save() {
    let mut server = Server::new_async().await;

    let lookup = server
        .mock("GET", LOOKUP_SELF)
        .with_status(403)
        .with_body(PERMISSION_DENIED)
        .expect(1)
        .create_async()
        .await;
    let login = server
        .mock("POST", APPROLE_LOGIN)
        .match_body(Matcher::Json(json!({
            "role_id": "deploy",
            "secret_id": "s3cr3t"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(login_body("hvs.approle"))
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join(".vault-token");

    let mut config = test_config(&server.url());
    config.token = Some("hvs.expired".to_string());
    config.token_file = Some(token_file.clone());
    config.approle = approle("deploy", "s3cr3t");

    let mut vault = VaultClient::new(&config.address, config.http_timeout).unwrap();
    let session = AuthResolver::from_config(&config)
        .resolve(&mut vault)
        .await
        .unwrap();

    assert_eq!(session.method, AuthMethod::AppRole);
    assert_eq!(vault.token(), Some("hvs.approle"));

    let store = TokenStore::new(config.token_file.clone());
    store.save(&session.token).unwrap();
    assert_eq!(std::fs::read_to_string(&token_file).unwrap(), "hvs.approle");
    assert_eq!(store.load().unwrap().as_deref(), Some("hvs.approle"));

    lookup.assert_async().await;
    login.assert_async().await;
}

#[tokio::test]
async fn test_incomplete_approle_skipped_for_userpass() {
    let mut server = Server::new_async().await;

    let approle_login = server
        .mock("POST", APPROLE_LOGIN)
        .expect(0)
        .create_async()
        .await;
    let userpass_login = server
        .mock("POST", USERPASS_LOGIN)
        .match_body(Matcher::Json(json!({"password": "hunter2"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(login_body("hvs.userpass"))
        .expect(1)
        .create_async()
        .await;

    let mut config = test_config(&server.url());
    config.approle = approle("deploy", "");
    config.userpass = userpass("hunter2");

    let mut vault = VaultClient::new(&config.address, config.http_timeout).unwrap();
    let session = AuthResolver::from_config(&config)
        .resolve(&mut vault)
        .await
        .unwrap();

    assert_eq!(session.token, "hvs.userpass");
    assert_eq!(session.method, AuthMethod::Userpass);

    approle_login.assert_async().await;
    userpass_login.assert_async().await;
}

#[tokio::test]
async fn test_all_methods_exhausted() {
    let mut server = Server::new_async().await;

    let lookup = server
        .mock("GET", LOOKUP_SELF)
        .with_status(403)
        .with_body(PERMISSION_DENIED)
        .expect(1)
        .create_async()
        .await;
    let approle_login = server
        .mock("POST", APPROLE_LOGIN)
        .with_status(400)
        .with_body(r#"{"errors":["invalid role or secret ID"]}"#)
        .expect(1)
        .create_async()
        .await;
    let userpass_login = server
        .mock("POST", USERPASS_LOGIN)
        .with_status(400)
        .with_body(r#"{"errors":["invalid username or password"]}"#)
        .expect(1)
        .create_async()
        .await;
    let renew = server
        .mock("POST", RENEW_SELF)
        .expect(0)
        .create_async()
        .await;

    let mut config = test_config(&server.url());
    config.token = Some("hvs.revoked".to_string());
    config.approle = approle("deploy", "used");
    config.userpass = userpass("wrong");

    let mut vault = VaultClient::new(&config.address, config.http_timeout).unwrap();
    let result = AuthResolver::from_config(&config).resolve(&mut vault).await;

    assert!(matches!(result, Err(AuthError::Exhausted)));
    assert_eq!(vault.token(), None);

    lookup.assert_async().await;
    approle_login.assert_async().await;
    userpass_login.assert_async().await;
    renew.assert_async().await;
}

#[tokio::test]
async fn test_nothing_configured_makes_no_calls() {
    let mut server = Server::new_async().await;
    let any = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let config = test_config(&server.url());
    let mut vault = VaultClient::new(&config.address, config.http_timeout).unwrap();
    let result = AuthResolver::from_config(&config).resolve(&mut vault).await;

    assert!(matches!(result, Err(AuthError::Exhausted)));
    any.assert_async().await;
}

// ==================================================================================================
// Vault Client Tests
// ==================================================================================================

#[tokio::test]
async fn test_client_decodes_error_body() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", APPROLE_LOGIN)
        .with_status(400)
        .with_body(r#"{"errors":["invalid role ID"]}"#)
        .create_async()
        .await;

    let vault = VaultClient::new(&server.url(), 5).unwrap();
    let err = vault
        .write("auth/approle/login", Some(json!({"role_id": "x"})))
        .await
        .unwrap_err();

    match err {
        VaultError::Api { status, errors } => {
            assert_eq!(status, 400);
            assert_eq!(errors, vec!["invalid role ID"]);
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_client_error_without_json_body() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", LOOKUP_SELF)
        .with_status(502)
        .with_body("Bad Gateway")
        .create_async()
        .await;

    let vault = VaultClient::new(&server.url(), 5).unwrap();
    let err = vault.lookup_self().await.unwrap_err();
    assert_eq!(err.status(), Some(502));
}

#[tokio::test]
async fn test_client_empty_response() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", RENEW_SELF)
        .with_status(204)
        .create_async()
        .await;

    let vault = VaultClient::new(&server.url(), 5).unwrap();
    let secret = vault.write("auth/token/renew-self", None).await.unwrap();
    assert!(secret.is_none());
}

#[tokio::test]
async fn test_client_invalid_json() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", LOOKUP_SELF)
        .with_status(200)
        .with_body("{not json")
        .create_async()
        .await;

    let vault = VaultClient::new(&server.url(), 5).unwrap();
    assert!(matches!(
        vault.lookup_self().await,
        Err(VaultError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn test_client_sends_token_header() {
    let mut server = Server::new_async().await;
    let lookup = server
        .mock("GET", LOOKUP_SELF)
        .match_header("x-vault-token", "hvs.abc")
        .match_header("x-vault-request", "true")
        .with_status(200)
        .with_body(lookup_body(10, 20))
        .expect(1)
        .create_async()
        .await;

    let mut vault = VaultClient::new(&server.url(), 5).unwrap();
    vault.set_token("hvs.abc");
    let secret = vault.lookup_self().await.unwrap().unwrap();

    // lookup-self answers with data and a null auth block
    assert!(secret.has_data());
    assert!(secret.auth.is_none());
    lookup.assert_async().await;
}

#[tokio::test]
async fn test_client_omits_token_header_when_cleared() {
    let mut server = Server::new_async().await;
    let login = server
        .mock("POST", APPROLE_LOGIN)
        .match_header("x-vault-token", Matcher::Missing)
        .with_status(200)
        .with_body(login_body("hvs.new"))
        .expect(1)
        .create_async()
        .await;

    let mut vault = VaultClient::new(&server.url(), 5).unwrap();
    vault.set_token("hvs.old");
    vault.clear_token();
    vault
        .write("auth/approle/login", Some(json!({"role_id": "r", "secret_id": "s"})))
        .await
        .unwrap();

    login.assert_async().await;
}

// ==================================================================================================
// Token File Tests
// ==================================================================================================

#[test]
fn test_token_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path: PathBuf = dir.path().join("cache/.vault-token");
    let store = TokenStore::new(Some(path.clone()));

    store.save("hvs.CAESIKj7\n").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "hvs.CAESIKj7");
    assert_eq!(store.load().unwrap().as_deref(), Some("hvs.CAESIKj7"));
}
