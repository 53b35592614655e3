//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `TokenStore`: durable storage for the access/refresh pair (keychain,
//!   file, or memory)
//! - `inspector`: unverified decoding of token expiry and identity claims
//! - `SessionManager`: login/register/logout and single-flight refresh
//!
//! Access tokens are treated as stale 5 minutes before they expire; refresh
//! calls are limited to one every 5 seconds.

pub mod backend;
pub mod credentials;
pub mod error;
pub mod inspector;
pub mod session;
pub mod store;

pub use backend::AuthBackend;
pub use credentials::KeyringTokenStore;
pub use error::AuthError;
pub use inspector::{Claims, TokenError};
pub use session::{RefreshOutcome, SessionConfig, SessionManager, SessionState};
pub use store::{CredentialPair, FileTokenStore, MemoryTokenStore, TokenKind, TokenStore};
