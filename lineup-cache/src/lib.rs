//! Envelope cache store with explicit freshness and best-effort failure
//! semantics.
//!
//! Every cached value is wrapped in a [`CacheEnvelope`] that records when
//! it was written and how long it stays valid. Reads return `Option`:
//! "absent" is a normal value covering cache miss, expiry, and corrupt
//! entries alike, so callers cannot accidentally treat a miss as fatal.
//!
//! # Key namespacing
//!
//! The [`CacheKey`] type can only be constructed from a collection and a
//! scope id, so an unscoped or unprefixed key is unrepresentable. The
//! fixed prefix keeps this store's entries disjoint from unrelated data
//! sharing the same storage medium.
//!
//! # Failure policy
//!
//! Storage-medium errors are caught at the boundary of every operation
//! and downgraded to "no data". This store backs a best-effort
//! optimization, not a correctness-critical path; a cache miss is an
//! acceptable degraded state, never a fatal one.

pub mod backend;
pub mod envelope;
pub mod key;
pub mod store;

pub use backend::{BackendError, FileBackend, KeyValueBackend, MemoryBackend};
pub use envelope::CacheEnvelope;
pub use key::CacheKey;
pub use store::{EnvelopeStore, StoreConfig};
