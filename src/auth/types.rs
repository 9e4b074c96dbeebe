// Authentication types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AuthError;
use crate::vault::Secret;

/// Default renewal threshold (renew once half the lifetime is gone)
pub const DEFAULT_RENEWAL_THRESHOLD: f64 = 0.5;

/// How a session was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Token from configuration or VAULT_TOKEN
    Token,

    /// Token read from the token file
    TokenFile,

    /// AppRole login
    AppRole,

    /// Userpass login
    Userpass,
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthMethod::Token => "token",
            AuthMethod::TokenFile => "token file",
            AuthMethod::AppRole => "AppRole",
            AuthMethod::Userpass => "userpass",
        };
        f.write_str(name)
    }
}

/// Authenticated session produced by the resolver
#[derive(Debug, Clone)]
pub struct Session {
    /// Bearer token
    pub token: String,

    /// Source that produced the token
    pub method: AuthMethod,

    /// Lookup metadata, only for token sources that decoded cleanly
    pub lookup: Option<TokenLookup>,

    /// Whether a renewal took effect during resolution
    pub renewed: bool,

    /// Warnings returned by Vault during login or renewal
    pub warnings: Vec<String>,
}

impl Session {
    pub fn new(token: impl Into<String>, method: AuthMethod) -> Self {
        Self {
            token: token.into(),
            method,
            lookup: None,
            renewed: false,
            warnings: Vec::new(),
        }
    }

    /// Build a session from a login response
    pub fn from_login(secret: &Secret, method: AuthMethod) -> Option<Self> {
        let token = secret.client_token()?;
        let mut session = Self::new(token, method);
        session.warnings = secret.warnings.clone();
        Some(session)
    }
}

/// Token metadata decoded from lookup-self `data`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenLookup {
    /// Remaining lifetime in seconds
    pub ttl: i64,

    /// Lifetime granted at creation in seconds (0 for non-expiring tokens)
    pub creation_ttl: i64,
}

impl TokenLookup {
    /// Decode the lookup metadata from a lookup-self response
    pub fn from_secret(secret: &Secret) -> Result<Self, serde_json::Error> {
        let data = secret.data.clone().unwrap_or_default();
        serde_json::from_value(serde_json::Value::Object(data))
    }

    /// Fraction of the original lifetime still left
    ///
    /// `None` when the creation TTL is unusable (zero or negative).
    pub fn lifespan(&self) -> Option<f64> {
        if self.creation_ttl <= 0 {
            return None;
        }
        Some(self.ttl as f64 / self.creation_ttl as f64)
    }
}

/// Lifespan fraction below which a token gets renewed, in (0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenewalThreshold(f64);

impl RenewalThreshold {
    pub fn new(value: f64) -> Result<Self, AuthError> {
        if value > 0.0 && value <= 1.0 {
            Ok(Self(value))
        } else {
            Err(AuthError::Config(format!(
                "token_renewal_threshold must be in (0, 1], got {}",
                value
            )))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for RenewalThreshold {
    fn default() -> Self {
        Self(DEFAULT_RENEWAL_THRESHOLD)
    }
}
