//! Namespaced, scope-bound cache keys.
//!
//! A `CacheKey` can only be constructed from a collection and a scope
//! id, so a key that crosses scopes, or that collides with unrelated
//! data in the shared storage medium, is unrepresentable rather than
//! merely discouraged.

use lineup_core::Collection;
use uuid::Uuid;

/// Fixed prefix guaranteeing no collision with unrelated persisted data
/// sharing the same underlying storage.
const KEY_PREFIX: &str = "lineup.cache:";

/// A cache key scoped to one collection and one scoping identifier.
///
/// # String format
///
/// `lineup.cache:<collection-wire-name>:<scope-uuid>`
///
/// The logical part is derived deterministically, so the same
/// (collection, scope) pair always maps to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    inner: KeyInner,
}

/// Private inner struct - prevents external construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct KeyInner {
    collection: Collection,
    scope: Uuid,
}

impl CacheKey {
    /// Create a key for one collection under one scope. This is the
    /// only way to construct a `CacheKey`.
    pub fn new(collection: Collection, scope: Uuid) -> Self {
        Self {
            inner: KeyInner { collection, scope },
        }
    }

    /// The collection this key covers.
    pub fn collection(&self) -> Collection {
        self.inner.collection
    }

    /// The scoping identifier this key covers.
    pub fn scope(&self) -> Uuid {
        self.inner.scope
    }

    /// Render the key for the storage medium.
    pub fn encode(&self) -> String {
        format!(
            "{KEY_PREFIX}{}:{}",
            self.inner.collection.wire_name(),
            self.inner.scope
        )
    }

    /// Parse a raw storage key back into a `CacheKey`.
    ///
    /// Returns `None` when the prefix is missing, the collection name is
    /// unknown, or the scope is not a UUID. Used by eviction scans to
    /// distinguish our entries from foreign ones.
    pub fn decode(raw: &str) -> Option<Self> {
        let logical = raw.strip_prefix(KEY_PREFIX)?;
        let (name, scope) = logical.split_once(':')?;
        let collection = Collection::from_wire_name(name)?;
        let scope = Uuid::parse_str(scope).ok()?;
        Some(Self::new(collection, scope))
    }

    /// True when a raw storage key belongs to this store's namespace.
    pub fn has_prefix(raw: &str) -> bool {
        raw.starts_with(KEY_PREFIX)
    }

    /// The namespace prefix itself, for bulk scans.
    pub fn prefix() -> &'static str {
        KEY_PREFIX
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_shape() {
        let scope = Uuid::now_v7();
        let key = CacheKey::new(Collection::Players, scope);
        assert_eq!(key.encode(), format!("lineup.cache:players:{scope}"));
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let scope = Uuid::now_v7();
        let key = CacheKey::new(Collection::Teams, scope);
        let decoded = CacheKey::decode(&key.encode()).expect("decode should succeed");
        assert_eq!(decoded, key);
        assert_eq!(decoded.collection(), Collection::Teams);
        assert_eq!(decoded.scope(), scope);
    }

    #[test]
    fn test_decode_rejects_foreign_keys() {
        assert!(CacheKey::decode("session.token").is_none());
        assert!(CacheKey::decode("lineup.cache:unknown:not-a-uuid").is_none());
        assert!(CacheKey::decode("lineup.cache:players:not-a-uuid").is_none());
        assert!(CacheKey::decode("lineup.cache:players").is_none());
    }

    #[test]
    fn test_has_prefix() {
        let key = CacheKey::new(Collection::Events, Uuid::now_v7());
        assert!(CacheKey::has_prefix(&key.encode()));
        assert!(!CacheKey::has_prefix("session.auth.token"));
    }

    #[test]
    fn test_different_scopes_different_keys() {
        let a = CacheKey::new(Collection::Players, Uuid::now_v7());
        let b = CacheKey::new(Collection::Players, Uuid::now_v7());
        assert_ne!(a.encode(), b.encode());
    }
}
