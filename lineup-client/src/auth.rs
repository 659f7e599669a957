//! The authentication boundary.
//!
//! Exposes "current principal or none" plus a stream of session
//! transitions. The provider never offers synchronous password
//! verification; re-verifying identity before a sensitive change
//! replays the normal sign-in call and fails closed.

use async_trait::async_trait;
use lineup_core::{DataResult, PrincipalId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Session transition events consumed by the session lifecycle
/// controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthEvent {
    SignedIn { principal: PrincipalId },
    SignedOut,
    PasswordRecoveryRequested,
}

/// Credentials replayed through the normal sign-in path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Producer of session-transition events and the opaque caller
/// identity.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The currently authenticated principal, or `None` when signed
    /// out.
    fn current_principal(&self) -> Option<PrincipalId>;

    /// Authenticate, returning the principal on success.
    async fn sign_in(&self, credentials: &Credentials) -> DataResult<PrincipalId>;

    /// End the current session.
    async fn sign_out(&self) -> DataResult<()>;

    /// Subscribe to session transitions. Events arrive in the order the
    /// provider emits them.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Re-verify the caller's identity before a sensitive change by
/// replaying the normal sign-in call. Fails closed: any error means
/// "not verified".
pub async fn reverify(auth: &dyn AuthProvider, credentials: &Credentials) -> DataResult<()> {
    auth.sign_in(credentials).await.map(|_| ())
}
