//! Opaque remote rows and the collections that hold them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One remote row: an ordered mapping from field name to scalar or
/// nested value. Semantically opaque to the data layer; only the remote
/// service and the UI assign meaning to fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self { fields: Map::new() }
    }

    /// Build a record from raw field pairs, preserving insertion order.
    pub fn from_fields<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            fields: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Get a field value by name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Set a field value, replacing any prior value under the same name.
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    /// Number of fields in this record.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the record carries no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over field name/value pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

/// Entity collections this client reads and writes.
///
/// The discriminant is used when a collection must round-trip through a
/// cache key; the wire name is what the remote service knows the
/// collection by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Players,
    Teams,
    Profiles,
    Events,
}

impl Collection {
    /// Stable name of this collection on the remote service.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Collection::Players => "players",
            Collection::Teams => "teams",
            Collection::Profiles => "profiles",
            Collection::Events => "events",
        }
    }

    /// Inverse of [`wire_name`](Self::wire_name). Returns `None` for
    /// unknown names so corrupt cache keys can be rejected.
    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "players" => Some(Collection::Players),
            "teams" => Some(Collection::Teams),
            "profiles" => Some(Collection::Profiles),
            "events" => Some(Collection::Events),
            _ => None,
        }
    }

    /// All collections, for eviction scans and tests.
    pub fn all() -> [Collection; 4] {
        [
            Collection::Players,
            Collection::Teams,
            Collection::Profiles,
            Collection::Events,
        ]
    }
}
