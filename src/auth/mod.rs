// Authentication module
// Resolves a Vault session from the configured credential sources

mod credentials;
mod renewal;
mod resolver;
mod store;
mod types;

pub use credentials::{
    CredentialSource, FileTokenCredential, PasswordCredential, RoleCredential, TokenCredential,
    DEFAULT_APPROLE_PATH,
};
pub use renewal::{renew, should_renew, RenewalOutcome};
pub use resolver::{AuthResolver, ResolveState};
pub use store::{normalize_token, TokenStore};
pub use types::{AuthMethod, RenewalThreshold, Session, TokenLookup, DEFAULT_RENEWAL_THRESHOLD};
