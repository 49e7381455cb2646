//! Session establishment and the startup session probe.
//!
//! The startup probe is bounded: if the auth provider does not answer
//! within [`SESSION_CHECK_TIMEOUT`] the probe resolves to
//! [`SessionStatus::Anonymous`] rather than hanging the splash path - a
//! bounded wait that fails open to the signed-out default.

use std::sync::Arc;
use std::time::Duration;

use tracing::{instrument, warn};

use crate::backend::{AuthApi, AuthUser, BackendError};
use crate::error::{AppError, Result};

/// Upper bound on the startup session probe.
pub const SESSION_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of the startup session probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// A session exists for this user.
    Active(AuthUser),
    /// No session (or the probe timed out); the sign-in screen is next.
    Anonymous,
}

/// Thin wrapper over the auth provider.
pub struct AuthService<B> {
    backend: Arc<B>,
}

impl<B: AuthApi> AuthService<B> {
    #[must_use]
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Probe for an existing session, bounded by
    /// [`SESSION_CHECK_TIMEOUT`].
    #[instrument(skip(self), level = "debug")]
    pub async fn check_session(&self) -> SessionStatus {
        match tokio::time::timeout(SESSION_CHECK_TIMEOUT, self.backend.current_user()).await {
            Ok(Ok(user)) => SessionStatus::Active(user),
            Ok(Err(e)) => {
                if !matches!(e, BackendError::Api { status: 401, .. }) {
                    warn!(error = %e, "session probe failed");
                }
                SessionStatus::Anonymous
            }
            Err(_) => {
                warn!("session probe timed out; treating as signed out");
                SessionStatus::Anonymous
            }
        }
    }

    /// The current user, unbounded.
    pub async fn current_user(&self) -> Result<AuthUser> {
        self.backend
            .current_user()
            .await
            .map_err(|_| AppError::NotAuthenticated)
    }

    /// Register an account and open its first session.
    #[instrument(skip(self, password), level = "debug")]
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser> {
        let user = self
            .backend
            .create_account(email, password)
            .await
            .map_err(AppError::RemoteWrite)?;
        self.backend
            .create_session(email, password)
            .await
            .map_err(AppError::RemoteWrite)?;
        Ok(user)
    }

    /// Open an email/password session.
    #[instrument(skip(self, password), level = "debug")]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        self.backend
            .create_session(email, password)
            .await
            .map_err(|_| AppError::NotAuthenticated)?;
        self.current_user().await
    }

    /// Close the current session.
    #[instrument(skip(self), level = "debug")]
    pub async fn sign_out(&self) -> Result<()> {
        self.backend
            .delete_session()
            .await
            .map_err(AppError::RemoteWrite)
    }

    /// Start a password recovery flow.
    #[instrument(skip(self), level = "debug")]
    pub async fn recover_password(&self, email: &str, redirect_url: &str) -> Result<()> {
        self.backend
            .create_recovery(email, redirect_url)
            .await
            .map_err(AppError::RemoteWrite)
    }
}
