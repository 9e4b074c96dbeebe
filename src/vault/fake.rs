// In-memory Vault double for tests

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

use super::client::{VaultApi, LOOKUP_SELF_PATH};
use super::types::Secret;
use crate::error::{Result, VaultError};

/// A recorded request
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub path: String,
    pub payload: Option<Value>,
    /// Token that was active when the call was made
    pub token: Option<String>,
}

enum Reply {
    Body(Value),
    Error(u16),
}

/// Scripted Vault: known tokens answer lookup-self, writes answer from a
/// per-path table, everything else is a 403/404.
#[derive(Default)]
pub struct FakeVault {
    token: Option<String>,
    tokens: HashMap<String, Value>,
    replies: HashMap<String, Reply>,
    calls: Mutex<Vec<Call>>,
}

impl FakeVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` on lookup-self with the given TTLs
    pub fn with_token(self, token: &str, ttl: i64, creation_ttl: i64) -> Self {
        self.with_token_data(
            token,
            json!({"ttl": ttl, "creation_ttl": creation_ttl, "policies": ["default"]}),
        )
    }

    /// Accept `token` on lookup-self, answering with raw `data`
    pub fn with_token_data(mut self, token: &str, data: Value) -> Self {
        self.tokens.insert(token.to_string(), data);
        self
    }

    /// Answer writes to `path` with `body`
    pub fn with_reply(mut self, path: &str, body: Value) -> Self {
        self.replies.insert(path.to_string(), Reply::Body(body));
        self
    }

    /// Answer writes to `path` with an error status
    pub fn with_error(mut self, path: &str, status: u16) -> Self {
        self.replies.insert(path.to_string(), Reply::Error(status));
        self
    }

    /// Answer a login at `path` with a fresh client token
    pub fn with_login(self, path: &str, client_token: &str) -> Self {
        self.with_reply(path, json!({"auth": {"client_token": client_token}}))
    }

    /// All calls in order
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of calls made to `path`
    pub fn call_count(&self, path: &str) -> usize {
        self.calls().iter().filter(|c| c.path == path).count()
    }

    fn record(&self, path: &str, payload: Option<Value>) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(Call {
                path: path.to_string(),
                payload,
                token: self.token.clone(),
            });
        }
    }
}

fn decode(body: &Value) -> Result<Option<Secret>> {
    serde_json::from_value(body.clone())
        .map(Some)
        .map_err(|e| VaultError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl VaultApi for FakeVault {
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
        self.record(path, payload);
        match self.replies.get(path) {
            Some(Reply::Body(body)) => decode(body),
            Some(Reply::Error(status)) => Err(VaultError::Api {
                status: *status,
                errors: vec!["rejected".to_string()],
            }),
            None => Err(VaultError::Api {
                status: 404,
                errors: vec![format!("no handler for route \"{}\"", path)],
            }),
        }
    }

    async fn lookup_self(&self) -> Result<Option<Secret>> {
        self.record(LOOKUP_SELF_PATH, None);
        let data = self.token.as_ref().and_then(|t| self.tokens.get(t));
        match data {
            Some(data) => decode(&json!({"data": data, "auth": null})),
            None => Err(VaultError::Api {
                status: 403,
                errors: vec!["permission denied".to_string()],
            }),
        }
    }
}
