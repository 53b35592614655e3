use async_trait::async_trait;

use super::{AuthError, CredentialPair};
use crate::models::{AuthResponse, LoginRequest, RegisterRequest};

/// The account endpoints of the storefront backend.
///
/// `ApiClient` implements this over HTTP; tests substitute in-memory fakes.
/// Implementations map non-success statuses with [`AuthError::from_status`]
/// and transport failures to [`AuthError::NetworkError`].
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// `POST /login`
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, AuthError>;

    /// `POST /register`
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, AuthError>;

    /// `POST /refresh-token`
    async fn refresh(&self, refresh_token: &str) -> Result<CredentialPair, AuthError>;

    /// `POST /logout`
    async fn logout(&self, refresh_token: &str) -> Result<(), AuthError>;

    /// `POST /revoke-token`
    async fn revoke(&self, refresh_token: &str) -> Result<(), AuthError>;
}
