// Vault response types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Generic Vault response envelope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Secret {
    #[serde(default)]
    pub request_id: String,

    #[serde(default)]
    pub lease_id: String,

    #[serde(default)]
    pub lease_duration: u64,

    #[serde(default)]
    pub renewable: bool,

    /// Endpoint specific payload (lookup-self metadata lives here)
    #[serde(default)]
    pub data: Option<Map<String, Value>>,

    /// Non-fatal messages attached by Vault
    #[serde(default, deserialize_with = "null_as_empty")]
    pub warnings: Vec<String>,

    /// Present on login and renew responses
    #[serde(default)]
    pub auth: Option<SecretAuth>,
}

impl Secret {
    /// True if the response carries a non-empty `data` object
    pub fn has_data(&self) -> bool {
        self.data.as_ref().is_some_and(|d| !d.is_empty())
    }

    /// Client token from the `auth` block, if one was issued
    pub fn client_token(&self) -> Option<&str> {
        self.auth
            .as_ref()
            .map(|a| a.client_token.as_str())
            .filter(|t| !t.is_empty())
    }
}

/// Auth block of a Vault response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretAuth {
    #[serde(default)]
    pub client_token: String,

    #[serde(default)]
    pub accessor: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub policies: Vec<String>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub token_policies: Vec<String>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub metadata: HashMap<String, String>,

    #[serde(default)]
    pub lease_duration: u64,

    #[serde(default)]
    pub renewable: bool,
}

/// Vault error body (`{"errors": [...]}`)
#[derive(Debug, Default, Deserialize)]
pub struct ErrorResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub errors: Vec<String>,
}

/// Vault sends `null` for empty lists and maps
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
