// Credential sources

use serde_json::json;
use std::io;
use std::path::{Path, PathBuf};

use super::store::TokenStore;
use super::types::{AuthMethod, Session};
use crate::error::{Result, VaultError};
use crate::vault::{Secret, VaultApi};

/// Default AppRole login path
pub const DEFAULT_APPROLE_PATH: &str = "auth/approle/login";

/// Token supplied directly (config file, VK_TOKEN or VAULT_TOKEN)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenCredential {
    pub token: String,
}

impl TokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn validate(&self) -> bool {
        !self.token.is_empty()
    }

    /// Make this token active and look it up
    ///
    /// Returns `Ok(None)` when Vault answers without lookup data; only a
    /// response with a non-empty `data` object counts as a live token.
    pub async fn check_self<V>(&self, vault: &mut V) -> Result<Option<Secret>>
    where
        V: VaultApi + ?Sized,
    {
        vault.set_token(&self.token);
        let secret = vault.lookup_self().await?;
        Ok(secret.filter(Secret::has_data))
    }
}

/// Token cached in a file, read when the resolver reaches it
#[derive(Debug, Clone, Default)]
pub struct FileTokenCredential {
    store: TokenStore,
}

impl FileTokenCredential {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            store: TokenStore::new(path),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.store.path()
    }

    pub fn validate(&self) -> bool {
        self.path().is_some_and(|p| !p.as_os_str().is_empty())
    }

    /// Read the cached token, `None` if the file is missing or blank
    pub fn read(&self) -> io::Result<Option<TokenCredential>> {
        Ok(self.store.load()?.map(TokenCredential::new))
    }
}

/// AppRole credentials
#[derive(Debug, Clone, PartialEq)]
pub struct RoleCredential {
    /// Full login path, e.g. auth/approle/login
    pub path: String,
    pub role_id: String,
    pub secret_id: String,
}

impl Default for RoleCredential {
    fn default() -> Self {
        Self {
            path: DEFAULT_APPROLE_PATH.to_string(),
            role_id: String::new(),
            secret_id: String::new(),
        }
    }
}

impl RoleCredential {
    pub fn validate(&self) -> bool {
        !self.path.is_empty() && !self.role_id.is_empty() && !self.secret_id.is_empty()
    }

    /// Log in with role_id and secret_id
    pub async fn login<V>(&self, vault: &mut V) -> Result<Session>
    where
        V: VaultApi + ?Sized,
    {
        let payload = json!({
            "role_id": self.role_id,
            "secret_id": self.secret_id,
        });
        let secret = vault.write(&self.path, Some(payload)).await?;
        accept_login(vault, secret, AuthMethod::AppRole)
    }
}

/// Userpass credentials
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PasswordCredential {
    /// Full login path, e.g. auth/userpass/login/alice
    pub path: String,
    pub password: String,
}

impl PasswordCredential {
    pub fn validate(&self) -> bool {
        !self.path.is_empty() && !self.password.is_empty()
    }

    /// Log in with the password
    pub async fn login<V>(&self, vault: &mut V) -> Result<Session>
    where
        V: VaultApi + ?Sized,
    {
        let payload = json!({ "password": self.password });
        let secret = vault.write(&self.path, Some(payload)).await?;
        accept_login(vault, secret, AuthMethod::Userpass)
    }
}

/// Turn a login response into a session and make its token active
fn accept_login<V>(vault: &mut V, secret: Option<Secret>, method: AuthMethod) -> Result<Session>
where
    V: VaultApi + ?Sized,
{
    let session = secret
        .as_ref()
        .and_then(|s| Session::from_login(s, method))
        .ok_or_else(|| {
            VaultError::InvalidResponse(format!("{} login response carried no client token", method))
        })?;
    vault.set_token(&session.token);
    Ok(session)
}

/// One way of obtaining a session
///
/// Variant order is precedence order; see [`CredentialSource::priority`].
#[derive(Debug, Clone)]
pub enum CredentialSource {
    Token(TokenCredential),
    TokenFile(FileTokenCredential),
    AppRole(RoleCredential),
    Userpass(PasswordCredential),
}

impl CredentialSource {
    /// Structural completeness check, no I/O
    pub fn validate(&self) -> bool {
        match self {
            CredentialSource::Token(c) => c.validate(),
            CredentialSource::TokenFile(c) => c.validate(),
            CredentialSource::AppRole(c) => c.validate(),
            CredentialSource::Userpass(c) => c.validate(),
        }
    }

    pub fn method(&self) -> AuthMethod {
        match self {
            CredentialSource::Token(_) => AuthMethod::Token,
            CredentialSource::TokenFile(_) => AuthMethod::TokenFile,
            CredentialSource::AppRole(_) => AuthMethod::AppRole,
            CredentialSource::Userpass(_) => AuthMethod::Userpass,
        }
    }

    /// Lower is tried first
    pub fn priority(&self) -> u8 {
        match self {
            CredentialSource::Token(_) => 0,
            CredentialSource::TokenFile(_) => 1,
            CredentialSource::AppRole(_) => 2,
            CredentialSource::Userpass(_) => 3,
        }
    }
}
