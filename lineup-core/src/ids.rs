//! Identifier and timestamp aliases.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Opaque identity handed to us by the authentication provider.
///
/// This is NOT a domain user id; it only becomes one after identity
/// resolution against the remote `profiles` collection.
pub type PrincipalId = Uuid;

/// Domain user record identifier, resolved from a [`PrincipalId`].
pub type UserId = Uuid;

/// Scoping identifier for team-scoped collections.
pub type TeamId = Uuid;

/// Identifier of a single remote row.
///
/// UUIDv7 embeds a Unix timestamp, making IDs naturally sortable by
/// creation time.
pub type RecordId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new UUIDv7 record id (timestamp-sortable).
pub fn new_record_id() -> RecordId {
    Uuid::now_v7()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_ids_are_sortable_by_creation() {
        let a = new_record_id();
        let b = new_record_id();
        assert!(a <= b);
    }
}
