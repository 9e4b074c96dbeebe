// Command helpers shared by the vk subcommands

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};

use crate::auth::{TokenLookup, TokenStore};
use crate::config::Config;
use crate::vault::Secret;

/// Token used by `token`/`status` when automatic login is disabled
///
/// The configured token wins over the token file. Neither is validated
/// against Vault.
pub fn configured_token(config: &Config, store: &TokenStore) -> Result<String> {
    if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
        return Ok(token.to_string());
    }

    store
        .load()
        .context("Unable to read token file")?
        .context("No token configured and automatic login disabled (--no-login)")
}

/// Expiry instant for a token with `ttl` seconds left
///
/// `None` when the TTL does not fit a timestamp.
pub fn expires_at(ttl: i64, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    Duration::try_seconds(ttl).and_then(|d| now.checked_add_signed(d))
}

/// JSON document printed by `vk status`
pub fn status_report(address: &str, secret: &Secret, now: DateTime<Utc>) -> Value {
    let data = secret.data.clone().unwrap_or_default();
    let lookup = TokenLookup::from_secret(secret).ok();

    // Non-expiring tokens report creation_ttl 0
    let expires = lookup
        .filter(|l| l.creation_ttl > 0)
        .and_then(|l| expires_at(l.ttl, now))
        .map(|t| t.to_rfc3339());

    json!({
        "address": address,
        "display_name": data.get("display_name"),
        "accessor": data.get("accessor"),
        "policies": data.get("policies"),
        "renewable": data.get("renewable"),
        "ttl": lookup.map(|l| l.ttl),
        "creation_ttl": lookup.map(|l| l.creation_ttl),
        "lifespan": lookup.and_then(|l| l.lifespan()),
        "expires_at": expires,
    })
}
