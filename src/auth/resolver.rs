use super::credentials::{
    CredentialSource, FileTokenCredential, PasswordCredential, RoleCredential, TokenCredential,
};
use super::renewal::{self, RenewalOutcome};
use super::types::{AuthMethod, RenewalThreshold, Session, TokenLookup};
use crate::config::Config;
use crate::error::AuthError;
use crate::vault::{Secret, VaultApi};

/// Stages of a login run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveState {
    Init,
    TryingTokenSources,
    TryingRoleCredential,
    TryingPasswordCredential,
    Resolved,
    Exhausted,
}

impl ResolveState {
    /// Stage a source is tried in
    pub fn for_source(source: &CredentialSource) -> Self {
        match source {
            CredentialSource::Token(_) | CredentialSource::TokenFile(_) => {
                ResolveState::TryingTokenSources
            }
            CredentialSource::AppRole(_) => ResolveState::TryingRoleCredential,
            CredentialSource::Userpass(_) => ResolveState::TryingPasswordCredential,
        }
    }
}

/// Login resolver
/// Tries credential sources in precedence order until one yields a session
pub struct AuthResolver {
    /// Sources sorted by priority
    sources: Vec<CredentialSource>,

    /// Lifespan fraction below which live tokens are renewed
    threshold: RenewalThreshold,
}

impl AuthResolver {
    /// Create a resolver over `sources`
    ///
    /// Sources are reordered by [`CredentialSource::priority`] so precedence
    /// never depends on the caller's ordering.
    pub fn new(mut sources: Vec<CredentialSource>, threshold: RenewalThreshold) -> Self {
        sources.sort_by_key(CredentialSource::priority);
        Self { sources, threshold }
    }

    /// Build the standard source list from configuration
    pub fn from_config(config: &Config) -> Self {
        let sources = vec![
            CredentialSource::Token(TokenCredential::new(
                config.token.clone().unwrap_or_default(),
            )),
            CredentialSource::TokenFile(FileTokenCredential::new(config.token_file.clone())),
            CredentialSource::AppRole(config.approle.clone()),
            CredentialSource::Userpass(config.userpass.clone()),
        ];
        Self::new(sources, config.token_renewal_threshold)
    }

    /// Run the login flow against `vault`
    ///
    /// On success the session's token is the client's active token. Every
    /// failure except exhaustion is logged and skipped.
    pub async fn resolve<V>(&self, vault: &mut V) -> Result<Session, AuthError>
    where
        V: VaultApi + ?Sized,
    {
        let mut state = ResolveState::Init;
        // Tokens that already failed lookup in this run
        let mut rejected: Vec<String> = Vec::new();

        for source in &self.sources {
            if !source.validate() {
                tracing::debug!(method = %source.method(), "Credential source not configured, skipping");
                continue;
            }

            let next = ResolveState::for_source(source);
            if next != state {
                tracing::trace!(from = ?state, to = ?next, "Login state transition");
                state = next;
            }

            let session = match source {
                CredentialSource::Token(cred) => {
                    tracing::debug!("Trying config or environment as token source.");
                    self.try_token(vault, cred, AuthMethod::Token, &mut rejected)
                        .await
                }
                CredentialSource::TokenFile(file) => {
                    let path = file.path().map(|p| p.display().to_string());
                    tracing::debug!(token_file = ?path, "Trying token file as token source.");
                    match file.read() {
                        Ok(Some(cred)) => {
                            self.try_token(vault, &cred, AuthMethod::TokenFile, &mut rejected)
                                .await
                        }
                        Ok(None) => {
                            tracing::debug!(token_file = ?path, "Token file missing or empty.");
                            None
                        }
                        Err(e) => {
                            tracing::debug!(token_file = ?path, error = %e, "Unable to read token file.");
                            None
                        }
                    }
                }
                CredentialSource::AppRole(role) => Self::try_approle(vault, role).await,
                CredentialSource::Userpass(userpass) => Self::try_userpass(vault, userpass).await,
            };

            if let Some(session) = session {
                tracing::trace!(from = ?state, to = ?ResolveState::Resolved, "Login state transition");
                return Ok(session);
            }
        }

        // Don't leave a rejected token active
        vault.clear_token();
        tracing::trace!(from = ?state, to = ?ResolveState::Exhausted, "Login state transition");
        Err(AuthError::Exhausted)
    }

    /// Look up a token candidate and renew it if it is running low
    async fn try_token<V>(
        &self,
        vault: &mut V,
        cred: &TokenCredential,
        method: AuthMethod,
        rejected: &mut Vec<String>,
    ) -> Option<Session>
    where
        V: VaultApi + ?Sized,
    {
        if rejected.contains(&cred.token) {
            tracing::debug!(method = %method, "Token already rejected in this run, skipping.");
            return None;
        }

        let secret = match cred.check_self(vault).await {
            Ok(Some(secret)) => secret,
            Ok(None) => {
                tracing::debug!(method = %method, "Token lookup returned no data.");
                rejected.push(cred.token.clone());
                return None;
            }
            Err(e) => {
                tracing::debug!(method = %method, error = %e, "Error looking up own token.");
                rejected.push(cred.token.clone());
                return None;
            }
        };

        tracing::info!("Authenticated with {}.", method);

        let mut session = Session::new(cred.token.clone(), method);
        self.maybe_renew(vault, &secret, &mut session).await;
        Some(session)
    }

    /// Best-effort renewal of a token that already passed lookup
    async fn maybe_renew<V>(&self, vault: &V, secret: &Secret, session: &mut Session)
    where
        V: VaultApi + ?Sized,
    {
        let lookup = match TokenLookup::from_secret(secret) {
            Ok(lookup) => lookup,
            Err(e) => {
                tracing::warn!(error = %e, "Unable to decode token lookup.");
                return;
            }
        };
        session.lookup = Some(lookup);

        let Some(lifespan) = lookup.lifespan() else {
            tracing::debug!("Token has no creation TTL, not attempting to renew token.");
            return;
        };

        if !renewal::should_renew(&lookup, self.threshold) {
            tracing::debug!(lifespan, "Not attempting to renew token.");
            return;
        }

        match renewal::renew(vault).await {
            Ok(RenewalOutcome::Renewed) => {
                tracing::debug!(lifespan, "Renewed token.");
                session.renewed = true;
            }
            Ok(RenewalOutcome::NotRenewed(warnings)) => {
                tracing::debug!(?warnings, "Unable to renew token.");
                session.warnings.extend(warnings);
            }
            Err(e) => {
                tracing::debug!(error = %e, "Error renewing token.");
            }
        }
    }

    async fn try_approle<V>(vault: &mut V, role: &RoleCredential) -> Option<Session>
    where
        V: VaultApi + ?Sized,
    {
        tracing::info!("Attempting AppRole authentication...");
        vault.clear_token();
        match role.login(vault).await {
            Ok(session) => {
                tracing::info!("Authenticated with AppRole.");
                Some(session)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Error signing in with AppRole.");
                None
            }
        }
    }

    async fn try_userpass<V>(vault: &mut V, userpass: &PasswordCredential) -> Option<Session>
    where
        V: VaultApi + ?Sized,
    {
        tracing::info!("Attempting userpass authentication...");
        vault.clear_token();
        match userpass.login(vault).await {
            Ok(session) => {
                tracing::info!("Authenticated with userpass.");
                Some(session)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Error signing in with userpass.");
                None
            }
        }
    }
}
