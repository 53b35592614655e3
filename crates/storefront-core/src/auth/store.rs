//! Persistent storage for the access/refresh credential pair.
//!
//! All stores share the same contract: `save` writes both tokens or fails
//! with `PersistenceError` leaving nothing half-written, `get` never fails
//! (read errors are logged and reported as "no token"), and `clear` never
//! fails observably.

use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::AuthError;

/// File name of the token document inside the cache directory
const TOKENS_FILE: &str = "tokens.json";

/// Which of the two credentials to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    /// Storage key, shared by every backend
    pub fn key(self) -> &'static str {
        match self {
            TokenKind::Access => "accessToken",
            TokenKind::Refresh => "refreshToken",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The two opaque credentials issued by the backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    pub fn get(&self, kind: TokenKind) -> &str {
        match kind {
            TokenKind::Access => &self.access_token,
            TokenKind::Refresh => &self.refresh_token,
        }
    }
}

// Tokens are bearer secrets; keep them out of logs.
impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Durable key-value storage for the credential pair.
pub trait TokenStore: Send + Sync {
    /// Persist both tokens. A failed save leaves no partial pair behind.
    fn save(&self, pair: &CredentialPair) -> Result<(), AuthError>;

    /// Read one token; `None` if absent or unreadable.
    fn get(&self, kind: TokenKind) -> Option<String>;

    /// Remove both tokens. Errors are logged and swallowed.
    fn clear(&self);
}

/// In-process token store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryTokenStore {
    entries: Mutex<HashMap<TokenKind, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store already holding `pair`
    pub fn with_pair(pair: &CredentialPair) -> Self {
        let store = Self::new();
        {
            let mut entries = store.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries.insert(TokenKind::Access, pair.access_token.clone());
            entries.insert(TokenKind::Refresh, pair.refresh_token.clone());
        }
        store
    }
}

impl TokenStore for MemoryTokenStore {
    fn save(&self, pair: &CredentialPair) -> Result<(), AuthError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(TokenKind::Access, pair.access_token.clone());
        entries.insert(TokenKind::Refresh, pair.refresh_token.clone());
        Ok(())
    }

    fn get(&self, kind: TokenKind) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
    }

    fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Token store backed by a single JSON document on disk.
///
/// Both tokens live in one file that is replaced via rename, so a crash
/// mid-save leaves either the old pair or the new one.
pub struct FileTokenStore {
    cache_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn path(&self) -> PathBuf {
        self.cache_dir.join(TOKENS_FILE)
    }

    fn load(&self) -> Option<CredentialPair> {
        let path = self.path();
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read token file");
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(pair) => Some(pair),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to parse token file");
                None
            }
        }
    }

    fn write(&self, pair: &CredentialPair) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.cache_dir)?;
        let contents = serde_json::to_string_pretty(pair)?;
        let tmp = self.cache_dir.join(format!("{}.tmp", TOKENS_FILE));
        std::fs::write(&tmp, contents)?;
        restrict_permissions(&tmp)?;
        std::fs::rename(&tmp, self.path())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

impl TokenStore for FileTokenStore {
    fn save(&self, pair: &CredentialPair) -> Result<(), AuthError> {
        self.write(pair).map_err(|e| {
            warn!(error = %e, "Failed to save tokens to disk");
            AuthError::PersistenceError(e.to_string())
        })?;
        debug!(path = %self.path().display(), "Tokens saved");
        Ok(())
    }

    fn get(&self, kind: TokenKind) -> Option<String> {
        self.load().map(|pair| pair.get(kind).to_string())
    }

    fn clear(&self) {
        match std::fs::remove_file(self.path()) {
            Ok(()) => debug!("Token file removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, "Failed to remove token file"),
        }
    }
}
