//! HTTP client for the storefront REST backend.
//!
//! `ApiClient` is both the [`Transport`] used by the request pipeline and the
//! [`AuthBackend`] used by the session manager.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Serialize;
use tracing::{debug, warn};

use super::{ApiError, ApiRequest, ApiResponse, Transport};
use crate::auth::{AuthBackend, AuthError, CredentialPair};
use crate::models::{AuthResponse, LoginRequest, RefreshTokenRequest, RegisterRequest};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// API client for the storefront backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth_path: String,
}

impl ApiClient {
    /// Create a client for `base_url` (e.g. `https://localhost:7200`) whose
    /// account endpoints live under `auth_path` (e.g. `/api/User`)
    pub fn new(base_url: &str, auth_path: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, auth_path, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, auth_path: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_path: format!("/{}", auth_path.trim_matches('/')),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn auth_url(&self, endpoint: &str) -> String {
        format!("{}{}/{}", self.base_url, self.auth_path, endpoint)
    }

    /// Check if response is successful, mapping the status to an auth error if not.
    async fn check_auth_response(response: reqwest::Response) -> Result<reqwest::Response, AuthError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(AuthError::from_status(status, &body))
        }
    }

    async fn post_auth<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<reqwest::Response, AuthError> {
        let url = self.auth_url(endpoint);
        debug!(url = %url, "POST auth endpoint");
        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;
        Self::check_auth_response(response).await
    }
}

#[async_trait]
impl Transport for ApiClient {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse, ApiError> {
        let url = self.url(&request.path);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut builder = self
                .client
                .request(request.method.clone(), &url)
                .header(header::ACCEPT, "application/json");
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            if let Some(ref body) = request.body {
                builder = builder.json(body);
            }
            if let Some(token) = bearer {
                builder = builder.bearer_auth(token);
            }

            let response = builder.send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS && retries < MAX_RATE_LIMIT_RETRIES {
                retries += 1;
                warn!(url = %url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2; // Exponential backoff
                continue;
            }

            let body = response.text().await?;
            return Ok(ApiResponse::new(status, body));
        }
    }
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, AuthError> {
        let response = self.post_auth("login", request).await?;
        Ok(response.json().await?)
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, AuthError> {
        let response = self.post_auth("register", request).await?;
        Ok(response.json().await?)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<CredentialPair, AuthError> {
        let response = self
            .post_auth("refresh-token", &RefreshTokenRequest { refresh_token })
            .await?;
        Ok(response.json().await?)
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.post_auth("logout", &RefreshTokenRequest { refresh_token })
            .await?;
        Ok(())
    }

    async fn revoke(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.post_auth("revoke-token", &RefreshTokenRequest { refresh_token })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_are_normalized() {
        let client = ApiClient::new("https://localhost:7200/", "api/User/").unwrap();
        assert_eq!(client.base_url(), "https://localhost:7200");
        assert_eq!(client.auth_url("login"), "https://localhost:7200/api/User/login");
        assert_eq!(client.url("/api/Products/1"), "https://localhost:7200/api/Products/1");
        assert_eq!(client.url("api/Products"), "https://localhost:7200/api/Products");
    }
}
