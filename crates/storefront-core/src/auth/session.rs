use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration as StdDuration;

use chrono::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::inspector::{self, Claims};
use super::{AuthBackend, AuthError, CredentialPair, TokenKind, TokenStore};
use crate::models::{AuthResponse, LoginRequest, RegisterRequest};

/// Buffer before expiry within which an access token is no longer attached
/// to requests (5 minutes)
const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;

/// Minimum time between two refresh calls to the backend
const REFRESH_COOLDOWN_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub refresh_cooldown: StdDuration,
    pub refresh_buffer: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_cooldown: StdDuration::from_secs(REFRESH_COOLDOWN_SECS),
            refresh_buffer: Duration::minutes(TOKEN_REFRESH_BUFFER_MINUTES),
        }
    }
}

/// Observable session lifecycle.
///
/// `Anonymous → Authenticating → Authenticated → RefreshPending →
/// Authenticated | Anonymous`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated,
    RefreshPending,
}

pub type RefreshOutcome = Result<CredentialPair, AuthError>;

enum RefreshState {
    Idle,
    Refreshing {
        waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    },
}

struct RefreshSlot {
    state: RefreshState,
    last_attempt: Option<Instant>,
}

/// Owns the credential pair and every backend call that changes it.
///
/// At most one `/refresh-token` call is outstanding per manager. Callers
/// that arrive while one is in flight are parked on a oneshot channel and
/// resolved with its outcome.
pub struct SessionManager {
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn TokenStore>,
    config: SessionConfig,
    refresh: Mutex<RefreshSlot>,
    authenticating: AtomicUsize,
}

impl SessionManager {
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        store: Arc<dyn TokenStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            backend,
            store,
            config,
            refresh: Mutex::new(RefreshSlot {
                state: RefreshState::Idle,
                last_attempt: None,
            }),
            authenticating: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn slot(&self) -> MutexGuard<'_, RefreshSlot> {
        self.refresh.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ===== Account operations =====

    /// Log in and persist the returned credentials
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, AuthError> {
        let _authenticating = AuthenticatingGuard::enter(&self.authenticating);
        let response = match self.backend.login(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(email = %request.email, error = %e, "Login failed");
                return Err(e);
            }
        };
        self.store.save(&response.credentials())?;
        info!(email = %request.email, "Logged in");
        Ok(response)
    }

    /// Create an account and persist the returned credentials
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, AuthError> {
        let _authenticating = AuthenticatingGuard::enter(&self.authenticating);
        let response = match self.backend.register(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(username = %request.username, error = %e, "Registration failed");
                return Err(e);
            }
        };
        self.store.save(&response.credentials())?;
        info!(username = %request.username, "Registered");
        Ok(response)
    }

    /// Exchange the stored refresh token for a new credential pair.
    ///
    /// Fails fast with `NoRefreshToken` or `RateLimited`. If another refresh
    /// is already in flight this call waits for it instead of issuing a
    /// second backend request. A failed refresh clears the stored tokens.
    pub async fn refresh(&self) -> RefreshOutcome {
        let refresh_token = self
            .store
            .get(TokenKind::Refresh)
            .ok_or(AuthError::NoRefreshToken)?;

        let waiter = {
            let mut guard = self.slot();
            let slot = &mut *guard;
            let now = Instant::now();
            if let Some(last) = slot.last_attempt {
                if now.duration_since(last) < self.config.refresh_cooldown {
                    warn!("Refresh attempted within cooldown window");
                    return Err(AuthError::RateLimited);
                }
            }
            match slot.state {
                RefreshState::Refreshing { ref mut waiters } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Some(rx)
                }
                RefreshState::Idle => {
                    slot.last_attempt = Some(now);
                    slot.state = RefreshState::Refreshing {
                        waiters: Vec::new(),
                    };
                    None
                }
            }
        };

        if let Some(rx) = waiter {
            debug!("Refresh already in flight, waiting for it");
            return Self::await_outcome(rx).await;
        }

        let guard = RefreshGuard {
            session: self,
            settled: false,
        };
        let outcome = self.exchange(&refresh_token).await;
        guard.settle(&outcome);
        outcome
    }

    async fn exchange(&self, refresh_token: &str) -> RefreshOutcome {
        debug!("Refreshing access token");
        match self.backend.refresh(refresh_token).await {
            Ok(pair) => {
                if let Err(e) = self.store.save(&pair) {
                    // The old refresh token may already be rotated out
                    self.store.clear();
                    return Err(e);
                }
                info!("Access token refreshed");
                Ok(pair)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, clearing session");
                self.store.clear();
                Err(e.into_refresh_failure())
            }
        }
    }

    async fn await_outcome(rx: oneshot::Receiver<RefreshOutcome>) -> RefreshOutcome {
        rx.await.unwrap_or_else(|_| {
            Err(AuthError::RefreshFailed(
                "refresh was abandoned before completing".to_string(),
            ))
        })
    }

    /// Wait for the in-flight refresh, if any, and return its outcome.
    /// Returns `None` immediately when no refresh is running.
    pub async fn wait_for_refresh(&self) -> Option<RefreshOutcome> {
        let rx = {
            let mut guard = self.slot();
            match guard.state {
                RefreshState::Refreshing { ref mut waiters } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    rx
                }
                RefreshState::Idle => return None,
            }
        };
        Some(Self::await_outcome(rx).await)
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(self.slot().state, RefreshState::Refreshing { .. })
    }

    /// End the session. The backend is told on a best-effort basis; the
    /// local tokens are always removed.
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.store.get(TokenKind::Refresh) {
            if let Err(e) = self.backend.logout(&refresh_token).await {
                warn!(error = %e, "Logout API call failed, but tokens cleared locally");
            }
        }
        self.store.clear();
        info!("Logged out");
    }

    /// Revoke a refresh token server-side. With `None` the stored token is
    /// revoked and the local session cleared on success.
    pub async fn revoke_refresh_token(&self, refresh_token: Option<&str>) -> Result<(), AuthError> {
        let (target, own_session) = match refresh_token {
            Some(token) => (token.to_string(), false),
            None => (
                self.store
                    .get(TokenKind::Refresh)
                    .ok_or(AuthError::NoRefreshToken)?,
                true,
            ),
        };

        if let Err(e) = self.backend.revoke(&target).await {
            warn!(error = %e, "Failed to revoke refresh token");
            return Err(e);
        }
        if own_session {
            self.store.clear();
        }
        info!(own_session, "Refresh token revoked");
        Ok(())
    }

    /// Drop the stored credentials without contacting the backend
    pub fn clear_session(&self) {
        self.store.clear();
    }

    // ===== State queries =====

    pub fn access_token(&self) -> Option<String> {
        self.store.get(TokenKind::Access)
    }

    pub fn has_refresh_token(&self) -> bool {
        self.store.get(TokenKind::Refresh).is_some()
    }

    /// True with a live access token, or with an expired access token backed
    /// by a live refresh token.
    pub fn is_authenticated(&self) -> bool {
        let Some(access) = self.store.get(TokenKind::Access) else {
            return false;
        };
        if !inspector::is_expired(&access, Duration::zero()) {
            return true;
        }
        self.store
            .get(TokenKind::Refresh)
            .map(|refresh| !inspector::is_expired(&refresh, Duration::zero()))
            .unwrap_or(false)
    }

    /// Claims of the access token, only while it has not expired
    pub fn claims(&self) -> Option<Claims> {
        let access = self.store.get(TokenKind::Access)?;
        match inspector::decode(&access) {
            Ok(claims) if !claims.is_expired_at(Duration::zero(), chrono::Utc::now()) => {
                Some(claims)
            }
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "Stored access token is not decodable");
                None
            }
        }
    }

    /// The access token to attach to an outbound request, if it is not
    /// about to expire
    pub fn access_token_for_request(&self) -> Option<String> {
        self.store
            .get(TokenKind::Access)
            .filter(|token| !inspector::is_expired(token, self.config.refresh_buffer))
    }

    pub fn state(&self) -> SessionState {
        if self.is_refreshing() {
            SessionState::RefreshPending
        } else if self.authenticating.load(Ordering::SeqCst) > 0 {
            SessionState::Authenticating
        } else if self.is_authenticated() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }
}

/// Marks the session as `Authenticating` for the lifetime of a login or
/// registration call.
struct AuthenticatingGuard<'a>(&'a AtomicUsize);

impl<'a> AuthenticatingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for AuthenticatingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Returns the refresh slot to `Idle` and resolves waiters. If the refreshing
/// future is dropped mid-flight the waiters' senders are dropped with it, so
/// they observe `RefreshFailed` instead of hanging.
struct RefreshGuard<'a> {
    session: &'a SessionManager,
    settled: bool,
}

impl RefreshGuard<'_> {
    fn take_waiters(&self) -> Vec<oneshot::Sender<RefreshOutcome>> {
        let mut slot = self.session.slot();
        match std::mem::replace(&mut slot.state, RefreshState::Idle) {
            RefreshState::Refreshing { waiters } => waiters,
            RefreshState::Idle => Vec::new(),
        }
    }

    fn settle(mut self, outcome: &RefreshOutcome) {
        self.settled = true;
        let waiters = self.take_waiters();
        debug!(waiters = waiters.len(), ok = outcome.is_ok(), "Refresh settled");
        for waiter in waiters {
            // A waiter that gave up has dropped its receiver; nothing to do
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Refresh abandoned before completing");
            drop(self.take_waiters());
        }
    }
}
