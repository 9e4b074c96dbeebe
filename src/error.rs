// Error handling module
// Defines error types for the Vault client and the login resolver

use thiserror::Error;

/// Errors returned by the Vault HTTP client
#[derive(Error, Debug)]
pub enum VaultError {
    /// Network or transport failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Vault answered with a non-success status
    #[error("Vault API error: {status} - {}", format_errors(.errors))]
    Api { status: u16, errors: Vec<String> },

    /// Vault answered with a body that could not be decoded
    #[error("Invalid response from Vault: {0}")]
    InvalidResponse(String),

    /// The configured Vault address is not a usable URL
    #[error("Invalid Vault address: {0}")]
    InvalidAddress(String),
}

impl VaultError {
    /// HTTP status of a backend rejection, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            VaultError::Api { status, .. } => Some(*status),
            VaultError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

fn format_errors(errors: &[String]) -> String {
    if errors.is_empty() {
        "no error details".to_string()
    } else {
        errors.join("; ")
    }
}

/// Errors returned by the login resolver
#[derive(Error, Debug)]
pub enum AuthError {
    /// Every configured credential source was tried and none produced a session
    #[error("unable to authenticate with Vault, exhausted all methods")]
    Exhausted,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for Vault client operations
pub type Result<T> = std::result::Result<T, VaultError>;
