use thiserror::Error;

use crate::utils::truncate_body;

/// Errors surfaced by session operations.
///
/// Every variant carries owned strings so the outcome of a single refresh
/// can be cloned out to every request waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Too many refresh attempts - please wait before retrying")]
    RateLimited,

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    #[error("Failed to persist authentication tokens: {0}")]
    PersistenceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl AuthError {
    /// Map a non-success status from an auth endpoint to a typed error
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = truncate_body(body);
        match status.as_u16() {
            400 | 401 => AuthError::InvalidCredentials(if truncated.is_empty() {
                "Invalid credentials. Please try again.".to_string()
            } else {
                truncated
            }),
            code => AuthError::ServerError {
                status: code,
                message: truncated,
            },
        }
    }

    /// Convert a failure of the refresh backend call into the error reported
    /// to the refresh caller. Transport failures stay `NetworkError`.
    pub(crate) fn into_refresh_failure(self) -> Self {
        match self {
            AuthError::NetworkError(_) | AuthError::RefreshFailed(_) => self,
            other => AuthError::RefreshFailed(other.to_string()),
        }
    }

    /// Whether the user has to log in again before the session is usable
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            AuthError::NoRefreshToken | AuthError::RefreshFailed(_) | AuthError::InvalidCredentials(_)
        )
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AuthError::InvalidResponse(err.to_string())
        } else {
            AuthError::NetworkError(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_maps_credentials_errors() {
        assert_eq!(
            AuthError::from_status(StatusCode::UNAUTHORIZED, "bad password"),
            AuthError::InvalidCredentials("bad password".to_string())
        );
        assert!(matches!(
            AuthError::from_status(StatusCode::BAD_REQUEST, ""),
            AuthError::InvalidCredentials(_)
        ));
    }

    #[test]
    fn test_from_status_maps_server_errors() {
        assert_eq!(
            AuthError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            AuthError::ServerError {
                status: 500,
                message: "boom".to_string()
            }
        );
        assert!(matches!(
            AuthError::from_status(StatusCode::FORBIDDEN, ""),
            AuthError::ServerError { status: 403, .. }
        ));
    }

    #[test]
    fn test_requires_login() {
        assert!(AuthError::NoRefreshToken.requires_login());
        assert!(AuthError::RefreshFailed("expired".into()).requires_login());
        assert!(AuthError::InvalidCredentials("bad password".into()).requires_login());
        assert!(!AuthError::RateLimited.requires_login());
        assert!(!AuthError::NetworkError("connection refused".into()).requires_login());
        assert!(!AuthError::ServerError { status: 503, message: String::new() }.requires_login());
    }

    #[test]
    fn test_into_refresh_failure() {
        let err = AuthError::from_status(StatusCode::UNAUTHORIZED, "expired").into_refresh_failure();
        assert!(matches!(err, AuthError::RefreshFailed(_)));

        let net = AuthError::NetworkError("connection refused".into()).into_refresh_failure();
        assert_eq!(net, AuthError::NetworkError("connection refused".into()));
    }
}
