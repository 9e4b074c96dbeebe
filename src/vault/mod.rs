// Vault client module
// Thin HTTP layer over the handful of Vault endpoints used for login

mod client;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod fake;

pub use client::{VaultApi, VaultClient, LOOKUP_SELF_PATH, RENEW_SELF_PATH};
pub use types::{Secret, SecretAuth};
