//! The envelope store: best-effort TTL cache over a key/value backend.

use std::sync::Arc;

use chrono::Utc;
use lineup_core::Record;
use tracing::{debug, warn};

use crate::backend::KeyValueBackend;
use crate::envelope::CacheEnvelope;
use crate::key::CacheKey;

/// Configuration for the envelope store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// TTL applied when a write does not specify one.
    pub default_ttl_minutes: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_ttl_minutes: 60,
        }
    }
}

impl StoreConfig {
    /// Create a new store config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default TTL in minutes. `0` means entries written without
    /// an explicit TTL never expire.
    pub fn with_default_ttl(mut self, minutes: u32) -> Self {
        self.default_ttl_minutes = minutes;
        self
    }
}

/// TTL-aware key/value persistence with an on/off switch for platforms
/// lacking secure local storage.
///
/// Every operation catches storage-medium errors at its own boundary and
/// downgrades them to "no data": a failed write completes silently, a
/// failed read reports absent. Failures are recorded for diagnostics via
/// `tracing` and go no further.
///
/// Construct once per process and share by `Arc`; all mutation of cached
/// state goes through these methods.
pub struct EnvelopeStore {
    /// `None` when the platform has no secure persistence medium; every
    /// operation then degrades to "always fetch fresh" rather than
    /// persisting sensitive records insecurely.
    backend: Option<Arc<dyn KeyValueBackend>>,
    config: StoreConfig,
}

impl EnvelopeStore {
    /// Create a store over the given backend.
    pub fn new(backend: Arc<dyn KeyValueBackend>, config: StoreConfig) -> Self {
        Self {
            backend: Some(backend),
            config,
        }
    }

    /// Create a store whose every operation is a no-op / always-absent.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            config: StoreConfig::default(),
        }
    }

    /// True when a persistence medium is available.
    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Get the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Serialize an envelope with the current timestamp and store it
    /// under `key`, replacing any prior value.
    ///
    /// Best-effort: a storage failure is logged and the call completes.
    pub async fn write(&self, key: &CacheKey, records: &[Record], ttl_minutes: Option<u32>) {
        let Some(backend) = &self.backend else {
            return;
        };
        let ttl = ttl_minutes.unwrap_or(self.config.default_ttl_minutes);
        let envelope = CacheEnvelope::new(records.to_vec(), ttl);
        let raw = match serde_json::to_string(&envelope) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key = %key.encode(), %err, "failed to serialize cache envelope");
                return;
            }
        };
        if let Err(err) = backend.set(&key.encode(), &raw).await {
            warn!(key = %key.encode(), %err, "cache write failed");
        }
    }

    /// Return the records under `key`, or `None` when no entry exists,
    /// the entry is corrupt (deleted as a side effect), or its age
    /// exceeds the effective TTL (`max_age_minutes` override, else the
    /// TTL stored in the envelope). A TTL of `0` always satisfies
    /// freshness.
    pub async fn read(&self, key: &CacheKey, max_age_minutes: Option<u32>) -> Option<Vec<Record>> {
        let backend = self.backend.as_ref()?;
        let encoded = key.encode();
        let raw = match backend.get(&encoded).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(key = %encoded, %err, "cache read failed");
                return None;
            }
        };

        match serde_json::from_str::<CacheEnvelope>(&raw) {
            Ok(envelope) => {
                if envelope.is_fresh(Utc::now(), max_age_minutes) {
                    Some(envelope.data)
                } else {
                    debug!(key = %encoded, "cache entry expired");
                    None
                }
            }
            Err(err) => {
                warn!(key = %encoded, %err, "corrupt cache entry, deleting");
                if let Err(err) = backend.delete(&encoded).await {
                    warn!(key = %encoded, %err, "failed to delete corrupt cache entry");
                }
                None
            }
        }
    }

    /// Delete one entry. Absent keys are a no-op, not an error.
    pub async fn invalidate(&self, key: &CacheKey) {
        let Some(backend) = &self.backend else {
            return;
        };
        if let Err(err) = backend.delete(&key.encode()).await {
            warn!(key = %key.encode(), %err, "cache invalidation failed");
        }
    }

    /// Delete every entry under the namespace prefix. Used only at
    /// session boundaries. Returns the number of entries removed.
    pub async fn clear_all(&self) -> u64 {
        let Some(backend) = &self.backend else {
            return 0;
        };
        let keys = match backend.all_keys().await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(%err, "cache clear failed to enumerate keys");
                return 0;
            }
        };
        let mut removed = 0u64;
        for key in keys.iter().filter(|k| CacheKey::has_prefix(k)) {
            match backend.delete(key).await {
                Ok(()) => removed += 1,
                Err(err) => warn!(key = %key, %err, "cache clear failed to delete entry"),
            }
        }
        removed
    }

    /// Scan all prefixed entries and delete exactly those whose
    /// freshness check fails; malformed entries are deleted
    /// unconditionally. Intended to run once per process start, spawned
    /// so it never blocks startup. Returns the number of entries
    /// removed.
    pub async fn evict_expired(&self) -> u64 {
        let Some(backend) = &self.backend else {
            return 0;
        };
        let keys = match backend.all_keys().await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(%err, "eviction failed to enumerate keys");
                return 0;
            }
        };

        let now = Utc::now();
        let mut removed = 0u64;
        for key in keys.iter().filter(|k| CacheKey::has_prefix(k)) {
            let raw = match backend.get(key).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(err) => {
                    warn!(key = %key, %err, "eviction read failed");
                    continue;
                }
            };
            let expired = match serde_json::from_str::<CacheEnvelope>(&raw) {
                Ok(envelope) => !envelope.is_fresh(now, None),
                Err(_) => true,
            };
            if expired {
                match backend.delete(key).await {
                    Ok(()) => removed += 1,
                    Err(err) => warn!(key = %key, %err, "eviction delete failed"),
                }
            }
        }
        if removed > 0 {
            debug!(removed, "evicted expired cache entries");
        }
        removed
    }
}
