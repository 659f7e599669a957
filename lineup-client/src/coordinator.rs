//! Per-collection data access coordinator.
//!
//! Remote-first reads with write-through caching, cache fallback on
//! connectivity loss only, online-only mutations that invalidate, and a
//! realtime view for screens that stay open.

use std::sync::Arc;

use lineup_cache::{CacheKey, EnvelopeStore};
use lineup_core::{
    Collection, DataResult, Filter, Order, Predicate, Record, RecordId, Slice,
};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::realtime::Subscription;
use crate::remote::RemoteDataService;

/// A fetch result carrying its provenance.
///
/// Callers that fell back to the cache are told so: stale-acceptable
/// data is an explicit state, not something hidden behind a "best
/// effort" abstraction.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    records: Vec<Record>,
    from_cache: bool,
}

impl Fetched {
    /// A result straight from the remote service.
    pub fn fresh(records: Vec<Record>) -> Self {
        Self {
            records,
            from_cache: false,
        }
    }

    /// A result served from the envelope cache after a connectivity
    /// failure.
    pub fn stale(records: Vec<Record>) -> Self {
        Self {
            records,
            from_cache: true,
        }
    }

    /// True when this data came from the cache fallback path.
    pub fn is_stale(&self) -> bool {
        self.from_cache
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Façade over one entity collection scoped by one field (e.g. players
/// of a team, scoped by `team_id`).
///
/// The remote service and envelope store are injected so tests can
/// substitute fakes; the coordinator owns no ambient global state.
pub struct Coordinator<R> {
    remote: Arc<R>,
    store: Arc<EnvelopeStore>,
    collection: Collection,
    scope_field: String,
    projection: Vec<String>,
    order: Vec<Order>,
}

impl<R: RemoteDataService> Coordinator<R> {
    pub fn new(
        remote: Arc<R>,
        store: Arc<EnvelopeStore>,
        collection: Collection,
        scope_field: impl Into<String>,
        projection: Vec<String>,
    ) -> Self {
        Self {
            remote,
            store,
            collection,
            scope_field: scope_field.into(),
            projection,
            order: Vec::new(),
        }
    }

    /// Coordinator for the players of a team.
    pub fn players(remote: Arc<R>, store: Arc<EnvelopeStore>) -> Self {
        Self::new(
            remote,
            store,
            Collection::Players,
            "team_id",
            ["id", "team_id", "name", "number", "position"]
                .into_iter()
                .map(String::from)
                .collect(),
        )
        .with_order(Order::asc("number"))
    }

    /// Coordinator for team-scoped events.
    pub fn events(remote: Arc<R>, store: Arc<EnvelopeStore>) -> Self {
        Self::new(
            remote,
            store,
            Collection::Events,
            "team_id",
            ["id", "team_id", "title", "starts_at", "location"]
                .into_iter()
                .map(String::from)
                .collect(),
        )
        .with_order(Order::asc("starts_at"))
    }

    /// Add a default ordering term to every read.
    pub fn with_order(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    fn key(&self, scope: Uuid) -> CacheKey {
        CacheKey::new(self.collection, scope)
    }

    fn scope_filter(&self, scope: Uuid) -> Filter {
        let mut filter = Filter::new()
            .with_predicate(Predicate::eq(self.scope_field.clone(), json!(scope)))
            .with_projection(self.projection.clone());
        for order in &self.order {
            filter = filter.with_order(order.clone());
        }
        filter
    }

    /// Fetch the collection for `scope`.
    ///
    /// Remote first; on success the result is written through the cache
    /// before it is returned, so no caller can observe "fresh data
    /// returned" without "cache updated". A connectivity failure falls
    /// back to the cache; a hit is returned marked stale, a miss
    /// propagates the original failure. Authorization and validation
    /// failures never consult the cache.
    pub async fn fetch(&self, scope: Uuid) -> DataResult<Fetched> {
        let filter = self.scope_filter(scope);
        match self.remote.select(self.collection, &filter).await {
            Ok(records) => {
                self.store.write(&self.key(scope), &records, None).await;
                Ok(Fetched::fresh(records))
            }
            Err(err) if err.is_connectivity() => {
                warn!(
                    collection = self.collection.wire_name(),
                    %scope,
                    %err,
                    "remote fetch failed, trying cache fallback"
                );
                match self.store.read(&self.key(scope), None).await {
                    Some(records) => {
                        debug!(
                            collection = self.collection.wire_name(),
                            %scope,
                            "serving cached records"
                        );
                        Ok(Fetched::stale(records))
                    }
                    None => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Fetch one bounded slice of the collection for `scope`.
    ///
    /// Same fetch/fallback logic as [`fetch`](Self::fetch), except only
    /// the first slice is written through or served from the cache:
    /// later slices have no meaningful client-side equivalent once the
    /// network is down.
    pub async fn fetch_slice(&self, scope: Uuid, slice: Slice) -> DataResult<Fetched> {
        let filter = self.scope_filter(scope).with_slice(slice);
        match self.remote.select(self.collection, &filter).await {
            Ok(records) => {
                if slice.is_first() {
                    self.store.write(&self.key(scope), &records, None).await;
                }
                Ok(Fetched::fresh(records))
            }
            Err(err) if err.is_connectivity() && slice.is_first() => {
                match self.store.read(&self.key(scope), None).await {
                    Some(records) => Ok(Fetched::stale(records)),
                    None => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Insert one record into `scope`'s collection. Online-only, never
    /// retried; on success the scope's cached entry is removed so the
    /// next read goes remote-first instead of returning pre-mutation
    /// data.
    pub async fn create(&self, scope: Uuid, record: &Record) -> DataResult<Record> {
        let created = self.remote.insert(self.collection, record).await?;
        self.store.invalidate(&self.key(scope)).await;
        Ok(created)
    }

    /// Patch one record by id within `scope`'s collection.
    pub async fn update(
        &self,
        scope: Uuid,
        record_id: RecordId,
        patch: &Record,
    ) -> DataResult<Vec<Record>> {
        let filter = Filter::new().with_predicate(Predicate::eq("id", json!(record_id)));
        let updated = self.remote.update(self.collection, &filter, patch).await?;
        self.store.invalidate(&self.key(scope)).await;
        Ok(updated)
    }

    /// Delete one record by id within `scope`'s collection.
    pub async fn remove(&self, scope: Uuid, record_id: RecordId) -> DataResult<()> {
        let filter = Filter::new().with_predicate(Predicate::eq("id", json!(record_id)));
        self.remote.delete(self.collection, &filter).await?;
        self.store.invalidate(&self.key(scope)).await;
        Ok(())
    }

    /// Delete every record in `scope` matching the extra predicates.
    pub async fn remove_where(
        &self,
        scope: Uuid,
        predicates: Vec<Predicate>,
    ) -> DataResult<()> {
        let mut filter =
            Filter::new().with_predicate(Predicate::eq(self.scope_field.clone(), json!(scope)));
        for predicate in predicates {
            filter = filter.with_predicate(predicate);
        }
        self.remote.delete(self.collection, &filter).await?;
        self.store.invalidate(&self.key(scope)).await;
        Ok(())
    }

    /// Open a realtime view of `scope`'s collection, scoped identically
    /// to [`fetch`](Self::fetch).
    ///
    /// Each snapshot fully replaces the view and arrives in emission
    /// order. No cache write happens on this path: the feed itself is
    /// the freshness source while it is alive, and it always wins over
    /// cached data. Point-in-time decisions (e.g. authorization checks
    /// before a destructive operation) still use an explicit fetch.
    pub async fn watch(&self, scope: Uuid) -> DataResult<Subscription> {
        self.remote
            .subscribe(self.collection, &self.scope_filter(scope))
            .await
    }
}
