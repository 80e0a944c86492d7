//! Environment-backed credential store.

use porter_core::CredentialRef;
use porter_interface::{AccessToken, CredentialStore};
use tracing::debug;

/// Resolves a credential reference by reading the environment variable of
/// the same name. Unset and empty variables do not resolve.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl EnvCredentials {
    /// Create the store.
    pub fn new() -> Self {
        Self
    }
}

impl CredentialStore for EnvCredentials {
    fn resolve(&self, credential: &CredentialRef) -> Option<AccessToken> {
        let value = std::env::var(credential.as_str()).ok()?;
        let value = value.trim();
        if value.is_empty() {
            debug!(credential = %credential, "Credential variable is empty");
            return None;
        }
        Some(AccessToken::new(value))
    }
}
