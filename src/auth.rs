//! Admin authentication gate.
//!
//! ```text
//! Unauthenticated --login ok--> Authenticated
//! Authenticated --logout | expiry detected--> Unauthenticated
//! ```
//!
//! Credential checks, lockout and session lifetime belong to the backend.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::backend::{AdminSession, AnalyticsBackend};
use crate::config::RequestConfig;
use crate::error::{AuthError, BackendError};

/// Dashboard access state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthState {
    /// No verified admin session.
    #[default]
    Unauthenticated,
    /// A valid admin session is held.
    Authenticated,
}

impl std::fmt::Display for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthState::Unauthenticated => write!(f, "unauthenticated"),
            AuthState::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// Session-based gate in front of the dashboard.
#[derive(Clone)]
pub struct AuthGate {
    backend: Arc<dyn AnalyticsBackend>,
    state: Arc<RwLock<AuthState>>,
    timeout: Duration,
}

impl AuthGate {
    /// Create a gate in the unauthenticated state
    pub fn new(backend: Arc<dyn AnalyticsBackend>, request_config: &RequestConfig) -> Self {
        Self {
            backend,
            state: Arc::new(RwLock::new(AuthState::Unauthenticated)),
            timeout: Duration::from_millis(request_config.timeout_ms),
        }
    }

    /// Current state
    pub async fn state(&self) -> AuthState {
        *self.state.read().await
    }

    /// Whether the dashboard is accessible
    pub async fn is_authenticated(&self) -> bool {
        self.state().await == AuthState::Authenticated
    }

    async fn set_state(&self, next: AuthState) {
        let mut state = self.state.write().await;
        if *state != next {
            info!(from = %*state, to = %next, "Admin auth state changed");
            *state = next;
        }
    }

    async fn active_session(&self) -> Result<Option<AdminSession>, BackendError> {
        match tokio::time::timeout(self.timeout, self.backend.get_session()).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    /// Ask the backend for an active admin session and update the state.
    ///
    /// A missing or expired session, or a failed check, leaves the gate
    /// unauthenticated.
    pub async fn check_session(&self) -> bool {
        let authenticated = match self.active_session().await {
            Ok(session) => session.is_some_and(|s| !s.is_expired()),
            Err(e) => {
                warn!(error = %e, "Admin session check failed");
                false
            }
        };

        self.set_state(if authenticated {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        })
        .await;
        authenticated
    }

    /// Sign in with email and password.
    ///
    /// On failure the state is unchanged and the error carries the backend's
    /// message for display.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthError> {
        if email.trim().is_empty() {
            return Err(AuthError::MissingField {
                field: "email".to_string(),
            });
        }
        if password.is_empty() {
            return Err(AuthError::MissingField {
                field: "password".to_string(),
            });
        }

        let result = tokio::time::timeout(
            self.timeout,
            self.backend.sign_in_with_password(email.trim(), password),
        )
        .await
        .unwrap_or_else(|_| {
            Err(BackendError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            })
        });

        match result {
            Ok(_) => {
                self.set_state(AuthState::Authenticated).await;
                Ok(())
            }
            Err(BackendError::Api { message, .. }) => {
                warn!(email = %email.trim(), "Admin login rejected");
                Err(AuthError::Rejected { message })
            }
            Err(e) => {
                warn!(error = %e, "Admin login failed");
                Err(AuthError::Backend(e))
            }
        }
    }

    /// Sign out. Local access is revoked even if the backend call fails.
    pub async fn logout(&self) {
        match tokio::time::timeout(self.timeout, self.backend.sign_out()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Backend sign-out failed"),
            Err(_) => warn!("Backend sign-out timed out"),
        }
        self.set_state(AuthState::Unauthenticated).await;
    }
}
