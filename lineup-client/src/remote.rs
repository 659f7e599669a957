//! The remote data service boundary.
//!
//! Authoritative source of truth, reached through filtered reads,
//! single-row writes, and a realtime change-subscription keyed by the
//! same filter shape. Coordinators never assume this boundary is
//! reachable.

use async_trait::async_trait;
use lineup_core::{Collection, DataResult, Filter, Record};

use crate::realtime::Subscription;

/// Query/RPC boundary to the remote relational data service.
#[async_trait]
pub trait RemoteDataService: Send + Sync {
    /// Filtered read with projection, ordering, and optional slice.
    async fn select(&self, collection: Collection, filter: &Filter) -> DataResult<Vec<Record>>;

    /// Insert one row, returning the row as stored.
    async fn insert(&self, collection: Collection, record: &Record) -> DataResult<Record>;

    /// Apply `patch` to every row matching `filter`, returning the
    /// updated rows.
    async fn update(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: &Record,
    ) -> DataResult<Vec<Record>>;

    /// Delete every row matching `filter`.
    async fn delete(&self, collection: Collection, filter: &Filter) -> DataResult<()>;

    /// Open a realtime subscription covering exactly the rows `filter`
    /// would return.
    async fn subscribe(&self, collection: Collection, filter: &Filter)
        -> DataResult<Subscription>;
}
