use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde_json::Value;
use std::time::Duration;

use super::types::{ErrorResponse, Secret};
use crate::error::{Result, VaultError};

/// Header carrying the active token
const TOKEN_HEADER: &str = "X-Vault-Token";

/// Token introspection endpoint
pub const LOOKUP_SELF_PATH: &str = "auth/token/lookup-self";

/// Token renewal endpoint
pub const RENEW_SELF_PATH: &str = "auth/token/renew-self";

/// Operations the login flow needs from Vault
///
/// The active token is held by the implementation and sent with every call.
/// Only one login flow may drive a client at a time, which `&mut self` on the
/// token setters enforces.
#[async_trait]
pub trait VaultApi: Send + Sync {
    /// Currently active token
    fn token(&self) -> Option<&str>;

    /// Replace the active token
    fn set_token(&mut self, token: &str);

    /// Drop the active token so following calls are unauthenticated
    fn clear_token(&mut self);

    /// Write `payload` to `path`; `None` sends an empty body
    async fn write(&self, path: &str, payload: Option<Value>) -> Result<Option<Secret>>;

    /// Look up the active token
    async fn lookup_self(&self) -> Result<Option<Secret>>;
}

/// HTTP client for the Vault API
pub struct VaultClient {
    /// Shared HTTP client
    client: Client,

    /// Base address, e.g. https://127.0.0.1:8200
    address: Url,

    /// Active token
    token: Option<String>,
}

impl VaultClient {
    /// Create a new client for `address`
    ///
    /// `timeout` bounds every request; the login flow itself has no deadline.
    pub fn new(address: &str, timeout: u64) -> Result<Self> {
        let address = Url::parse(address)
            .map_err(|e| VaultError::InvalidAddress(format!("{}: {}", address, e)))?;
        if !matches!(address.scheme(), "http" | "https") {
            return Err(VaultError::InvalidAddress(format!(
                "{}: scheme must be http or https",
                address
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()?;

        Ok(Self {
            client,
            address,
            token: None,
        })
    }

    /// Configured base address
    pub fn address(&self) -> &Url {
        &self.address
    }

    /// Build the full API URL for a logical path
    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/v1/{}",
            self.address.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Send a request and decode the Vault envelope
    async fn execute(&self, request: RequestBuilder) -> Result<Option<Secret>> {
        let request = request.header("X-Vault-Request", "true");
        let request = match self.token.as_deref() {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, "Received Vault response");

        if !status.is_success() {
            let errors = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.errors)
                .unwrap_or_default();
            return Err(VaultError::Api {
                status: status.as_u16(),
                errors,
            });
        }

        // 204 No Content and friends
        if body.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| VaultError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl VaultApi for VaultClient {
    fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn set_token(&mut self, token: &str) {
        self.token = Some(token.to_string());
    }

    fn clear_token(&mut self) {
        self.token = None;
    }

    async fn write(&self, path: &str, payload: Option<Value>) -> Result<Option<Secret>> {
        let url = self.url_for(path);
        tracing::debug!(method = "POST", path = %path, "Sending Vault request");

        let request = self.client.post(&url);
        let request = match payload {
            Some(body) => request.json(&body),
            None => request,
        };
        self.execute(request).await
    }

    async fn lookup_self(&self) -> Result<Option<Secret>> {
        let url = self.url_for(LOOKUP_SELF_PATH);
        tracing::debug!(method = "GET", path = LOOKUP_SELF_PATH, "Sending Vault request");

        self.execute(self.client.get(&url)).await
    }
}
