//! Shared fakes for the session and request pipeline tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use reqwest::StatusCode;
use serde_json::json;
use tokio::sync::Notify;

use storefront_core::api::{ApiError, ApiRequest, ApiResponse, Transport};
use storefront_core::auth::{
    AuthBackend, AuthError, CredentialPair, MemoryTokenStore, SessionConfig, SessionManager,
    TokenKind, TokenStore,
};
use storefront_core::models::{AuthResponse, LoginRequest, RegisterRequest, UserSummary};

/// Build an unsigned token expiring `exp_offset` seconds from now
pub fn token(subject: &str, exp_offset: i64) -> String {
    let now = Utc::now().timestamp();
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = json!({
        "sub": subject,
        "email": format!("{}@example.com", subject),
        "roles": ["seller"],
        "iat": now,
        "exp": now + exp_offset,
    });
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.sig", header, body)
}

pub fn fresh_pair(subject: &str) -> CredentialPair {
    CredentialPair::new(token(subject, 3600), token(&format!("{}-refresh", subject), 86_400))
}

/// Access token expired 10s ago, refresh token valid for an hour
pub fn stale_pair(subject: &str) -> CredentialPair {
    CredentialPair::new(token(subject, -10), token(&format!("{}-refresh", subject), 3600))
}

/// Scripted `AuthBackend` that counts calls.
#[derive(Default)]
pub struct FakeBackend {
    pub login_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub revoke_calls: AtomicUsize,
    pub login_result: Mutex<Option<Result<AuthResponse, AuthError>>>,
    pub refresh_results: Mutex<VecDeque<Result<CredentialPair, AuthError>>>,
    pub logout_error: Mutex<Option<AuthError>>,
    pub revoked: Mutex<Vec<String>>,
    /// Delay before a refresh answers
    pub refresh_delay: Mutex<Option<StdDuration>>,
    /// When set, refresh and login wait for a notification before answering
    pub gate: Option<Arc<Notify>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn with_login(self, result: Result<AuthResponse, AuthError>) -> Self {
        *self.login_result.lock().unwrap() = Some(result);
        self
    }

    pub fn push_refresh(&self, result: Result<CredentialPair, AuthError>) {
        self.refresh_results.lock().unwrap().push_back(result);
    }

    pub fn set_refresh_delay(&self, delay: StdDuration) {
        *self.refresh_delay.lock().unwrap() = Some(delay);
    }

    pub fn fail_logout(&self, error: AuthError) {
        *self.logout_error.lock().unwrap() = Some(error);
    }

    pub fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    async fn wait_gate(&self) {
        if let Some(ref gate) = self.gate {
            gate.notified().await;
        }
    }
}

pub fn auth_response(pair: &CredentialPair) -> AuthResponse {
    AuthResponse {
        access_token: pair.access_token.clone(),
        refresh_token: pair.refresh_token.clone(),
        user: Some(UserSummary {
            id: Some("1".to_string()),
            username: Some("ada".to_string()),
            email: Some("ada@example.com".to_string()),
        }),
    }
}

#[async_trait]
impl AuthBackend for FakeBackend {
    async fn login(&self, _request: &LoginRequest) -> Result<AuthResponse, AuthError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate().await;
        self.login_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(auth_response(&fresh_pair("ada"))))
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, AuthError> {
        Ok(auth_response(&fresh_pair(&request.username)))
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<CredentialPair, AuthError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate().await;
        let delay = *self.refresh_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.refresh_results.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(fresh_pair("refreshed")))
    }

    async fn logout(&self, _refresh_token: &str) -> Result<(), AuthError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        match self.logout_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn revoke(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.revoke_calls.fetch_add(1, Ordering::SeqCst);
        self.revoked.lock().unwrap().push(refresh_token.to_string());
        Ok(())
    }
}

/// Token store whose writes always fail
pub struct FailingStore;

impl TokenStore for FailingStore {
    fn save(&self, _pair: &CredentialPair) -> Result<(), AuthError> {
        Err(AuthError::PersistenceError("storage quota exceeded".to_string()))
    }

    fn get(&self, _kind: TokenKind) -> Option<String> {
        None
    }

    fn clear(&self) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentRequest {
    pub path: String,
    pub bearer: Option<String>,
}

type Responder = dyn Fn(&ApiRequest, Option<&str>) -> ApiResponse + Send + Sync;

/// `Transport` that answers from a closure and records what was sent
pub struct FakeTransport {
    responder: Box<Responder>,
    pub sent: Mutex<Vec<SentRequest>>,
}

impl FakeTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&ApiRequest, Option<&str>) -> ApiResponse + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// 200 when the bearer decodes to a live token, 401 otherwise
    pub fn requiring_live_token() -> Self {
        Self::new(|_, bearer| match bearer {
            Some(token)
                if !storefront_core::auth::inspector::is_expired(token, chrono::Duration::zero()) =>
            {
                ApiResponse::new(StatusCode::OK, "[]")
            }
            _ => ApiResponse::new(StatusCode::UNAUTHORIZED, "Unauthorized"),
        })
    }

    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse, ApiError> {
        self.sent.lock().unwrap().push(SentRequest {
            path: request.path.clone(),
            bearer: bearer.map(str::to_string),
        });
        tokio::task::yield_now().await;
        Ok((self.responder)(request, bearer))
    }
}

pub fn session_with(backend: Arc<FakeBackend>, pair: Option<CredentialPair>) -> (Arc<SessionManager>, Arc<MemoryTokenStore>) {
    let store = Arc::new(match pair {
        Some(ref pair) => MemoryTokenStore::with_pair(pair),
        None => MemoryTokenStore::new(),
    });
    let session = Arc::new(SessionManager::new(
        backend,
        store.clone(),
        SessionConfig::default(),
    ));
    (session, store)
}
