//! Session lifecycle controller.
//!
//! Reacts to sign-in/sign-out transitions. Sign-in needs no action
//! here - identity and cache are populated lazily on demand. Sign-out
//! is mandatory cleanup: reset the identity memo and clear the envelope
//! store before the transition completes, so a second account signing
//! in on the same device never observes the first account's cached
//! rows.

use std::sync::Arc;

use lineup_cache::EnvelopeStore;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::auth::AuthEvent;
use crate::identity::IdentityMemo;

pub struct SessionController {
    memo: Arc<IdentityMemo>,
    store: Arc<EnvelopeStore>,
}

impl SessionController {
    pub fn new(memo: Arc<IdentityMemo>, store: Arc<EnvelopeStore>) -> Self {
        Self { memo, store }
    }

    /// Apply one session transition. Completes the sign-out cleanup
    /// before returning, so callers can sequence it ahead of navigating
    /// away from authenticated screens. Idempotent: repeated sign-outs
    /// are no-ops.
    pub async fn handle(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedOut => {
                self.memo.reset().await;
                let removed = self.store.clear_all().await;
                debug!(removed, "session ended, cache cleared");
            }
            AuthEvent::SignedIn { .. } | AuthEvent::PasswordRecoveryRequested => {}
        }
    }

    /// Drain an auth event stream in the background.
    ///
    /// A lagged receiver may have missed a sign-out, which would leak
    /// one account's rows into the next session; the controller clears
    /// state as if a sign-out had occurred.
    pub fn spawn(self: Arc<Self>, mut events: broadcast::Receiver<AuthEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => self.handle(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "auth events lagged, clearing session state");
                        self.handle(AuthEvent::SignedOut).await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
