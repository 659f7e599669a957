//! End-to-end behavior of the coordinator, cache, and session
//! lifecycle against a scriptable remote service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lineup_cache::{CacheKey, EnvelopeStore, MemoryBackend, StoreConfig};
use lineup_client::{
    AuthEvent, Coordinator, IdentityMemo, RemoteDataService, SessionController, Snapshot,
    Subscription,
};
use lineup_core::{Collection, DataError, DataResult, Filter, Record, Slice};
use serde_json::json;
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Clone, Copy, PartialEq)]
enum Mode {
    Online,
    Offline,
    Denied,
}

/// Scriptable stand-in for the remote data service.
struct MockRemote {
    rows: Mutex<Vec<Record>>,
    mode: Mutex<Mode>,
    select_calls: AtomicUsize,
    feed: Mutex<Option<watch::Sender<Option<Snapshot>>>>,
}

impl MockRemote {
    fn new(rows: Vec<Record>) -> Self {
        Self {
            rows: Mutex::new(rows),
            mode: Mutex::new(Mode::Online),
            select_calls: AtomicUsize::new(0),
            feed: Mutex::new(None),
        }
    }

    fn set_mode(&self, mode: Mode) {
        *self.mode.lock().unwrap() = mode;
    }

    fn push_snapshot(&self, rows: Vec<Record>) {
        let feed = self.feed.lock().unwrap();
        if let Some(tx) = feed.as_ref() {
            tx.send(Some(Snapshot {
                rows,
                observed_at: chrono::Utc::now(),
            }))
            .unwrap();
        }
    }

    fn gate(&self) -> DataResult<()> {
        match *self.mode.lock().unwrap() {
            Mode::Online => Ok(()),
            Mode::Offline => Err(DataError::connectivity("network unreachable")),
            Mode::Denied => Err(DataError::authorization("no longer a member of this team")),
        }
    }
}

#[async_trait]
impl RemoteDataService for MockRemote {
    async fn select(&self, _collection: Collection, filter: &Filter) -> DataResult<Vec<Record>> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        self.gate()?;
        let rows = self.rows.lock().unwrap().clone();
        if let Some(slice) = filter.slice {
            let from = slice.from as usize;
            let to = (slice.to as usize + 1).min(rows.len());
            return Ok(rows.get(from..to).map(<[Record]>::to_vec).unwrap_or_default());
        }
        Ok(rows)
    }

    async fn insert(&self, _collection: Collection, record: &Record) -> DataResult<Record> {
        self.gate()?;
        self.rows.lock().unwrap().push(record.clone());
        Ok(record.clone())
    }

    async fn update(
        &self,
        _collection: Collection,
        _filter: &Filter,
        patch: &Record,
    ) -> DataResult<Vec<Record>> {
        self.gate()?;
        Ok(vec![patch.clone()])
    }

    async fn delete(&self, _collection: Collection, _filter: &Filter) -> DataResult<()> {
        self.gate()?;
        self.rows.lock().unwrap().clear();
        Ok(())
    }

    async fn subscribe(
        &self,
        _collection: Collection,
        _filter: &Filter,
    ) -> DataResult<Subscription> {
        self.gate()?;
        let (tx, rx) = watch::channel(None);
        *self.feed.lock().unwrap() = Some(tx);
        Ok(Subscription::new(rx, None))
    }
}

fn roster(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| {
            Record::from_fields([
                ("id", json!(Uuid::now_v7())),
                ("team_id", json!("t1")),
                ("name", json!(format!("player {i}"))),
                ("number", json!(i)),
            ])
        })
        .collect()
}

fn store() -> Arc<EnvelopeStore> {
    Arc::new(EnvelopeStore::new(
        Arc::new(MemoryBackend::new()),
        StoreConfig::default(),
    ))
}

#[tokio::test]
async fn end_to_end_offline_fallback_then_sign_out() {
    let team = Uuid::now_v7();
    let remote = Arc::new(MockRemote::new(roster(12)));
    let store = store();
    let coordinator = Coordinator::players(remote.clone(), store.clone());

    // Online fetch succeeds and populates the cache.
    let fresh = coordinator.fetch(team).await.unwrap();
    assert!(!fresh.is_stale());
    assert_eq!(fresh.len(), 12);
    assert!(store
        .read(&CacheKey::new(Collection::Players, team), None)
        .await
        .is_some());

    // Network loss: the same 12 records come back from the cache,
    // marked stale.
    remote.set_mode(Mode::Offline);
    let cached = coordinator.fetch(team).await.unwrap();
    assert!(cached.is_stale());
    assert_eq!(cached.records(), fresh.records());
    // The fallback still tried the network first.
    assert_eq!(remote.select_calls.load(Ordering::SeqCst), 2);

    // Sign-out clears the cache; the key reads absent afterwards.
    let memo = Arc::new(IdentityMemo::new());
    let controller = SessionController::new(memo, store.clone());
    controller.handle(AuthEvent::SignedOut).await;
    assert_eq!(
        store
            .read(&CacheKey::new(Collection::Players, team), None)
            .await,
        None
    );

    // And with no cache left, the connectivity failure propagates.
    assert!(matches!(
        coordinator.fetch(team).await,
        Err(DataError::Connectivity { .. })
    ));
}

#[tokio::test]
async fn authorization_failure_is_never_masked_by_cache() {
    let team = Uuid::now_v7();
    let remote = Arc::new(MockRemote::new(roster(3)));
    let store = store();
    let coordinator = Coordinator::players(remote.clone(), store.clone());

    coordinator.fetch(team).await.unwrap();
    assert!(store
        .read(&CacheKey::new(Collection::Players, team), None)
        .await
        .is_some());

    remote.set_mode(Mode::Denied);
    let err = coordinator.fetch(team).await.unwrap_err();
    assert!(matches!(err, DataError::Authorization { .. }));

    // The cached entry is still there; it just must not be used to
    // answer an authorization failure.
    assert!(store
        .read(&CacheKey::new(Collection::Players, team), None)
        .await
        .is_some());
}

#[tokio::test]
async fn slice_fallback_only_for_offset_zero() {
    let team = Uuid::now_v7();
    let remote = Arc::new(MockRemote::new(roster(30)));
    let store = store();
    let coordinator = Coordinator::players(remote.clone(), store.clone());

    // First slice online: cached.
    let first = coordinator.fetch_slice(team, Slice::new(0, 9)).await.unwrap();
    assert_eq!(first.len(), 10);

    // Second slice online: served but never cached.
    let second = coordinator
        .fetch_slice(team, Slice::new(10, 19))
        .await
        .unwrap();
    assert_eq!(second.len(), 10);

    remote.set_mode(Mode::Offline);

    // First slice offline: falls back to the cached first page.
    let fallback = coordinator
        .fetch_slice(team, Slice::new(0, 9))
        .await
        .unwrap();
    assert!(fallback.is_stale());
    assert_eq!(fallback.records(), first.records());

    // Later slice offline: no fallback, error propagates.
    assert!(matches!(
        coordinator.fetch_slice(team, Slice::new(10, 19)).await,
        Err(DataError::Connectivity { .. })
    ));
}

#[tokio::test]
async fn mutation_invalidates_cached_scope() {
    let team = Uuid::now_v7();
    let remote = Arc::new(MockRemote::new(roster(2)));
    let store = store();
    let coordinator = Coordinator::players(remote.clone(), store.clone());
    let key = CacheKey::new(Collection::Players, team);

    coordinator.fetch(team).await.unwrap();
    assert!(store.read(&key, None).await.is_some());

    let newcomer = Record::from_fields([
        ("team_id", json!(team)),
        ("name", json!("new signing")),
        ("number", json!(99)),
    ]);
    coordinator.create(team, &newcomer).await.unwrap();

    // The pre-mutation entry is gone, not merely marked.
    assert_eq!(store.read(&key, None).await, None);

    // The next read goes remote-first and re-populates.
    let refetched = coordinator.fetch(team).await.unwrap();
    assert!(!refetched.is_stale());
    assert_eq!(refetched.len(), 3);
    assert!(store.read(&key, None).await.is_some());
}

#[tokio::test]
async fn mutation_failure_leaves_cache_untouched() {
    let team = Uuid::now_v7();
    let remote = Arc::new(MockRemote::new(roster(2)));
    let store = store();
    let coordinator = Coordinator::players(remote.clone(), store.clone());
    let key = CacheKey::new(Collection::Players, team);

    coordinator.fetch(team).await.unwrap();

    remote.set_mode(Mode::Offline);
    let newcomer = Record::from_fields([("name", json!("ghost"))]);
    assert!(coordinator.create(team, &newcomer).await.is_err());

    // Nothing changed remotely, so the cached view is still valid.
    assert!(store.read(&key, None).await.is_some());
}

#[tokio::test]
async fn realtime_snapshots_replace_the_view_in_order() {
    let team = Uuid::now_v7();
    let remote = Arc::new(MockRemote::new(roster(2)));
    let store = store();
    let coordinator = Coordinator::players(remote.clone(), store.clone());

    let mut subscription = coordinator.watch(team).await.unwrap();

    remote.push_snapshot(roster(5));
    let snapshot = subscription.next_snapshot().await.unwrap();
    assert_eq!(snapshot.rows.len(), 5);

    remote.push_snapshot(roster(4));
    let snapshot = subscription.next_snapshot().await.unwrap();
    assert_eq!(snapshot.rows.len(), 4);

    // The feed never writes to the cache; only fetch does.
    assert_eq!(
        store
            .read(&CacheKey::new(Collection::Players, team), None)
            .await,
        None
    );
}

#[tokio::test]
async fn independent_scopes_do_not_interfere() {
    let team_a = Uuid::now_v7();
    let team_b = Uuid::now_v7();
    let remote = Arc::new(MockRemote::new(roster(4)));
    let store = store();
    let coordinator = Coordinator::players(remote.clone(), store.clone());

    coordinator.fetch(team_a).await.unwrap();
    coordinator.fetch(team_b).await.unwrap();

    coordinator
        .remove(team_a, Uuid::now_v7())
        .await
        .unwrap();

    // Only team A's entry was invalidated.
    assert_eq!(
        store
            .read(&CacheKey::new(Collection::Players, team_a), None)
            .await,
        None
    );
    assert!(store
        .read(&CacheKey::new(Collection::Players, team_b), None)
        .await
        .is_some());
}
