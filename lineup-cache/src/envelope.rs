//! The timestamp + TTL + payload wrapper around every cached value.

use chrono::{DateTime, Utc};
use lineup_core::Record;
use serde::{Deserialize, Serialize};

/// Wrapper persisted under every cache key.
///
/// An envelope is immutable once written; a new write fully replaces the
/// prior envelope under the same key. There is no partial or merge
/// update.
///
/// # Persisted layout
///
/// This is the only on-disk format the cache defines: a JSON object with
/// `writtenAt` (ISO-8601 string), `ttlMinutes` (integer >= 0) and `data`
/// (ordered sequence of field mappings). Anything that fails to parse
/// into this shape is corrupt and gets deleted on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheEnvelope {
    /// When the envelope was written.
    #[serde(rename = "writtenAt")]
    pub written_at: DateTime<Utc>,
    /// Minutes the payload stays valid. `0` means "never expires".
    #[serde(rename = "ttlMinutes")]
    pub ttl_minutes: u32,
    /// The cached rows, in the order the remote service returned them.
    pub data: Vec<Record>,
}

impl CacheEnvelope {
    /// Wrap `data` with the current timestamp.
    pub fn new(data: Vec<Record>, ttl_minutes: u32) -> Self {
        Self {
            written_at: Utc::now(),
            ttl_minutes,
            data,
        }
    }

    /// Wrap `data` with an explicit write timestamp. Used by eviction
    /// tests and by callers replaying persisted state.
    pub fn written_at(data: Vec<Record>, ttl_minutes: u32, written_at: DateTime<Utc>) -> Self {
        Self {
            written_at,
            ttl_minutes,
            data,
        }
    }

    /// Freshness rule shared by `read` and `evict_expired`.
    ///
    /// The effective TTL is the caller's override if given, otherwise
    /// the TTL stored in this envelope. A TTL of `0` always satisfies
    /// freshness. Otherwise the envelope is fresh while
    /// `now - written_at` does not exceed the effective TTL.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age_minutes_override: Option<u32>) -> bool {
        let effective = max_age_minutes_override.unwrap_or(self.ttl_minutes);
        if effective == 0 {
            return true;
        }
        let age = now.signed_duration_since(self.written_at);
        age <= chrono::Duration::minutes(i64::from(effective))
    }
}
