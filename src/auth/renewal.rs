// Token renewal logic

use super::types::{RenewalThreshold, TokenLookup};
use crate::error::Result;
use crate::vault::{VaultApi, RENEW_SELF_PATH};

/// Result of a renew-self call that Vault answered
#[derive(Debug, Clone, PartialEq)]
pub enum RenewalOutcome {
    /// Lease extended
    Renewed,

    /// Vault answered with warnings, e.g. the TTL is capped by max_ttl
    NotRenewed(Vec<String>),
}

/// Decide whether a token should be renewed
///
/// Renews when the remaining fraction of the lifetime is below `threshold`.
/// Tokens with no usable creation TTL (non-expiring root tokens report 0) are
/// never renewed.
pub fn should_renew(lookup: &TokenLookup, threshold: RenewalThreshold) -> bool {
    match lookup.lifespan() {
        Some(lifespan) => lifespan < threshold.value(),
        None => false,
    }
}

/// Renew the active token
pub async fn renew<V>(vault: &V) -> Result<RenewalOutcome>
where
    V: VaultApi + ?Sized,
{
    tracing::debug!("Renewing token...");

    let secret = vault.write(RENEW_SELF_PATH, None).await?;
    let warnings = secret.map(|s| s.warnings).unwrap_or_default();

    if warnings.is_empty() {
        Ok(RenewalOutcome::Renewed)
    } else {
        Ok(RenewalOutcome::NotRenewed(warnings))
    }
}
