use keyring::Entry;
use tracing::{debug, warn};

use super::store::{CredentialPair, TokenKind, TokenStore};
use super::AuthError;

const SERVICE_NAME: &str = "storefront";

/// Token store backed by the OS keychain.
///
/// Entries are keyed `accessToken` / `refreshToken` under a service name
/// scoped to the backend origin, so sessions against different servers
/// never overwrite each other.
pub struct KeyringTokenStore {
    service: String,
}

impl KeyringTokenStore {
    /// Create a store scoped to `origin` (e.g. `https://localhost:7200`)
    pub fn new(origin: &str) -> Self {
        Self {
            service: format!("{}:{}", SERVICE_NAME, origin.trim_end_matches('/')),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, kind: TokenKind) -> keyring::Result<Entry> {
        Entry::new(&self.service, kind.key())
    }

    fn write(&self, kind: TokenKind, value: &str) -> keyring::Result<()> {
        self.entry(kind)?.set_password(value)
    }

    fn remove(&self, kind: TokenKind) -> keyring::Result<()> {
        match self.entry(kind)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl TokenStore for KeyringTokenStore {
    fn save(&self, pair: &CredentialPair) -> Result<(), AuthError> {
        if let Err(e) = self.write(TokenKind::Access, &pair.access_token) {
            warn!(error = %e, "Failed to store access token in keychain");
            return Err(AuthError::PersistenceError(e.to_string()));
        }
        if let Err(e) = self.write(TokenKind::Refresh, &pair.refresh_token) {
            warn!(error = %e, "Failed to store refresh token in keychain");
            // Roll back so the pair is never half-written
            if let Err(rollback) = self.remove(TokenKind::Access) {
                warn!(error = %rollback, "Failed to roll back access token");
            }
            return Err(AuthError::PersistenceError(e.to_string()));
        }
        debug!(service = %self.service, "Tokens saved to keychain");
        Ok(())
    }

    fn get(&self, kind: TokenKind) -> Option<String> {
        match self.entry(kind).and_then(|entry| entry.get_password()) {
            Ok(token) => Some(token),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                warn!(token = %kind, error = %e, "Failed to retrieve token from keychain");
                None
            }
        }
    }

    fn clear(&self) {
        for kind in [TokenKind::Access, TokenKind::Refresh] {
            if let Err(e) = self.remove(kind) {
                warn!(token = %kind, error = %e, "Failed to delete token from keychain");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_is_scoped_by_origin() {
        let a = KeyringTokenStore::new("https://localhost:7200/");
        let b = KeyringTokenStore::new("https://shop.example.com");
        assert_eq!(a.service(), "storefront:https://localhost:7200");
        assert_ne!(a.service(), b.service());
    }
}
