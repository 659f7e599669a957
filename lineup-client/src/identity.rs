//! Per-session identity resolution with single-flight coalescing.
//!
//! The authentication provider hands us an opaque principal; the domain
//! wants the user record id behind it. That lookup happens at most once
//! per session: the first call resolves remotely and memoizes, every
//! later call answers from the memo, and concurrent first calls are
//! coalesced into one outstanding request. Only the session lifecycle
//! controller clears the memo.

use async_trait::async_trait;
use lineup_core::{
    Collection, DataError, DataResult, Filter, Predicate, PrincipalId, UserId,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::remote::RemoteDataService;

/// The remote lookup behind the memo. Must be idempotent: a failed
/// resolution is not memoized and will be retried on the next call.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn lookup(&self, principal: PrincipalId) -> DataResult<UserId>;
}

/// Single mapping from the device's one active principal to a resolved
/// domain user id, valid for the lifetime of one authenticated session.
///
/// The lookup runs while the slot's lock is held, so concurrent first
/// calls queue behind one remote request and all observe the identical
/// result. Once populated the memo is never silently refreshed; it is
/// only cleared through [`reset`](Self::reset).
#[derive(Default)]
pub struct IdentityMemo {
    resolved: Mutex<Option<UserId>>,
}

impl IdentityMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `principal` to a domain user id, hitting the network at
    /// most once per session.
    pub async fn resolve(
        &self,
        principal: PrincipalId,
        resolver: &dyn IdentityResolver,
    ) -> DataResult<UserId> {
        let mut slot = self.resolved.lock().await;
        if let Some(user_id) = *slot {
            return Ok(user_id);
        }
        let user_id = resolver.lookup(principal).await?;
        *slot = Some(user_id);
        Ok(user_id)
    }

    /// The memoized id, if resolution has happened this session.
    pub async fn peek(&self) -> Option<UserId> {
        *self.resolved.lock().await
    }

    /// Clear the memo. Called by the session lifecycle controller
    /// before this component is reused for another session.
    pub async fn reset(&self) {
        *self.resolved.lock().await = None;
    }
}

/// Resolver backed by the remote `profiles` collection: one profile row
/// per principal, carrying the domain user id.
pub struct ProfileResolver<R> {
    remote: Arc<R>,
}

impl<R> ProfileResolver<R> {
    pub fn new(remote: Arc<R>) -> Self {
        Self { remote }
    }
}

#[async_trait]
impl<R: RemoteDataService> IdentityResolver for ProfileResolver<R> {
    async fn lookup(&self, principal: PrincipalId) -> DataResult<UserId> {
        let filter = Filter::new()
            .with_predicate(Predicate::eq("auth_id", json!(principal)))
            .with_projection(["id"]);
        let rows = self.remote.select(Collection::Profiles, &filter).await?;
        let row = rows
            .first()
            .ok_or_else(|| DataError::validation("no profile for current principal"))?;
        row.get("id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| DataError::validation("profile id missing or malformed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingResolver {
        calls: AtomicUsize,
        result: UserId,
        fail_first: AtomicUsize,
    }

    impl CountingResolver {
        fn new(result: UserId) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                result,
                fail_first: AtomicUsize::new(0),
            }
        }

        fn failing_first(result: UserId, failures: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                result,
                fail_first: AtomicUsize::new(failures),
            }
        }
    }

    #[async_trait]
    impl IdentityResolver for CountingResolver {
        async fn lookup(&self, _principal: PrincipalId) -> DataResult<UserId> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Widen the race window so overlapping callers actually
            // overlap.
            tokio::time::sleep(Duration::from_millis(10)).await;
            if self
                .fail_first
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(DataError::connectivity("lookup offline"));
            }
            Ok(self.result)
        }
    }

    #[tokio::test]
    async fn test_concurrent_first_calls_coalesce() {
        let memo = IdentityMemo::new();
        let user_id = Uuid::now_v7();
        let resolver = CountingResolver::new(user_id);
        let principal = Uuid::now_v7();

        let (a, b) = tokio::join!(
            memo.resolve(principal, &resolver),
            memo.resolve(principal, &resolver),
        );

        assert_eq!(a.unwrap(), user_id);
        assert_eq!(b.unwrap(), user_id);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_memo_answers_without_network_after_first_call() {
        let memo = IdentityMemo::new();
        let user_id = Uuid::now_v7();
        let resolver = CountingResolver::new(user_id);
        let principal = Uuid::now_v7();

        memo.resolve(principal, &resolver).await.unwrap();
        memo.resolve(principal, &resolver).await.unwrap();
        memo.resolve(principal, &resolver).await.unwrap();
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_lookup_not_memoized() {
        let memo = IdentityMemo::new();
        let user_id = Uuid::now_v7();
        let resolver = CountingResolver::failing_first(user_id, 1);
        let principal = Uuid::now_v7();

        assert!(memo.resolve(principal, &resolver).await.is_err());
        assert_eq!(memo.peek().await, None);

        assert_eq!(memo.resolve(principal, &resolver).await.unwrap(), user_id);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reset_forces_fresh_resolution() {
        let memo = IdentityMemo::new();
        let user_id = Uuid::now_v7();
        let resolver = CountingResolver::new(user_id);
        let principal = Uuid::now_v7();

        memo.resolve(principal, &resolver).await.unwrap();
        memo.reset().await;
        assert_eq!(memo.peek().await, None);

        memo.resolve(principal, &resolver).await.unwrap();
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }
}
