//! Transparent re-authentication of outbound API calls.
//!
//! Every request goes through [`RequestAuthenticator::dispatch`]:
//!
//! 1. Public endpoints are forwarded untouched.
//! 2. Otherwise the access token is attached when it is not about to expire.
//! 3. A 401 triggers recovery: join the in-flight refresh or start one, then
//!    replay the request once with the new token. If no refresh is possible
//!    the session is cleared and the caller is sent to the login page.

use std::sync::Arc;

use reqwest::StatusCode;
use tracing::{debug, info, warn};

use super::{ApiError, ApiRequest, ApiResponse, PublicEndpoints, Transport};
use crate::auth::{AuthError, SessionManager};

/// Route of the login page
pub const LOGIN_ROUTE: &str = "/login";

/// Query parameter carrying the page to return to after login
pub const RETURN_URL_PARAM: &str = "returnUrl";

/// Where to send the user after the session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRedirect {
    pub return_url: Option<String>,
}

impl LoginRedirect {
    /// Redirect preserving `target`, unless `target` is itself the login page
    pub fn to(target: &str) -> Self {
        let return_url = if target.is_empty() || target.contains(LOGIN_ROUTE) {
            None
        } else {
            Some(target.to_string())
        };
        Self { return_url }
    }

    /// Login route with the return target as query parameter
    pub fn location(&self) -> String {
        match self.return_url {
            Some(ref url) => {
                let query = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair(RETURN_URL_PARAM, url)
                    .finish();
                format!("{}?{}", LOGIN_ROUTE, query)
            }
            None => LOGIN_ROUTE.to_string(),
        }
    }
}

/// How a request was completed.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Sent once; the response is returned whatever its status
    Forwarded(ApiResponse),
    /// Replayed after a successful refresh
    Retried(ApiResponse),
    /// The session could not be recovered; the original call failed
    Redirected(LoginRedirect),
}

impl Dispatch {
    pub fn response(&self) -> Option<&ApiResponse> {
        match self {
            Dispatch::Forwarded(response) | Dispatch::Retried(response) => Some(response),
            Dispatch::Redirected(_) => None,
        }
    }

    /// The response, or `LoginRequired` when the session was lost
    pub fn into_response(self) -> Result<ApiResponse, ApiError> {
        match self {
            Dispatch::Forwarded(response) | Dispatch::Retried(response) => Ok(response),
            Dispatch::Redirected(redirect) => Err(ApiError::LoginRequired(redirect)),
        }
    }
}

pub struct RequestAuthenticator {
    session: Arc<SessionManager>,
    transport: Arc<dyn Transport>,
    public: PublicEndpoints,
}

impl RequestAuthenticator {
    pub fn new(
        session: Arc<SessionManager>,
        transport: Arc<dyn Transport>,
        public: PublicEndpoints,
    ) -> Self {
        Self {
            session,
            transport,
            public,
        }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn public_endpoints(&self) -> &PublicEndpoints {
        &self.public
    }

    /// Send `request`, attaching and renewing credentials as needed.
    ///
    /// `Err` is returned only for transport failures.
    pub async fn dispatch(&self, request: &ApiRequest) -> Result<Dispatch, ApiError> {
        if self.public.matches(&request.method, &request.path) {
            debug!(method = %request.method, path = %request.path, "Public endpoint, no credential");
            let response = self.transport.send(request, None).await?;
            return Ok(Dispatch::Forwarded(response));
        }

        let token = self.session.access_token_for_request();
        debug!(
            method = %request.method,
            path = %request.path,
            with_token = token.is_some(),
            "Sending request"
        );
        let response = self.transport.send(request, token.as_deref()).await?;

        if response.status == StatusCode::UNAUTHORIZED {
            return self.recover(request).await;
        }
        if !response.is_success() {
            log_error(request, &response);
        }
        Ok(Dispatch::Forwarded(response))
    }

    /// Dispatch and flatten into a response, failing on redirect
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.dispatch(request).await?.into_response()
    }

    async fn recover(&self, request: &ApiRequest) -> Result<Dispatch, ApiError> {
        if !self.session.has_refresh_token() {
            debug!(path = %request.path, "401 without refresh token");
            return Ok(self.redirect(request));
        }

        if let Some(outcome) = self.session.wait_for_refresh().await {
            debug!(ok = outcome.is_ok(), "Joined in-flight refresh");
            return match self.session.access_token_for_request() {
                Some(token) => self.replay(request, &token).await,
                None => Ok(self.redirect(request)),
            };
        }

        match self.session.refresh().await {
            Ok(pair) => self.replay(request, &pair.access_token).await,
            Err(AuthError::RateLimited) => {
                // Another task started or finished a refresh since the 401
                self.session.wait_for_refresh().await;
                match self.session.access_token_for_request() {
                    Some(token) => self.replay(request, &token).await,
                    None => Ok(self.redirect(request)),
                }
            }
            Err(e) => {
                warn!(path = %request.path, error = %e, "Could not refresh session");
                Ok(self.redirect(request))
            }
        }
    }

    async fn replay(&self, request: &ApiRequest, token: &str) -> Result<Dispatch, ApiError> {
        debug!(method = %request.method, path = %request.path, "Replaying request with new token");
        let response = self.transport.send(request, Some(token)).await?;
        if !response.is_success() {
            log_error(request, &response);
        }
        Ok(Dispatch::Retried(response))
    }

    fn redirect(&self, request: &ApiRequest) -> Dispatch {
        self.session.clear_session();
        let redirect = LoginRedirect::to(&request.path_and_query());
        info!(location = %redirect.location(), "Session ended, login required");
        Dispatch::Redirected(redirect)
    }
}

fn log_error(request: &ApiRequest, response: &ApiResponse) {
    warn!(
        method = %request.method,
        path = %request.path,
        status = response.status.as_u16(),
        body = %crate::utils::truncate_string(&response.body, 200),
        "HTTP error response"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_redirect_location() {
        assert_eq!(
            LoginRedirect::to("/api/Products/my-products?page=2").location(),
            "/login?returnUrl=%2Fapi%2FProducts%2Fmy-products%3Fpage%3D2"
        );
        assert_eq!(LoginRedirect::to("/login").location(), "/login");
        assert_eq!(LoginRedirect::to("/login?returnUrl=%2F").return_url, None);
        assert_eq!(LoginRedirect::to("").location(), "/login");
    }

    #[test]
    fn test_dispatch_into_response() {
        let ok = Dispatch::Retried(ApiResponse::new(StatusCode::OK, "{}"));
        assert!(ok.response().is_some());
        assert!(ok.into_response().is_ok());

        let redirected = Dispatch::Redirected(LoginRedirect::to("/x"));
        assert!(redirected.response().is_none());
        assert!(matches!(redirected.into_response(), Err(ApiError::LoginRequired(_))));
    }
}
