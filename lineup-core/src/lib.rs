//! Lineup Core - Data Types
//!
//! Pure data structures with no behavior. All other crates depend on this.
//! This crate contains ONLY data types - no business logic.

pub mod error;
pub mod filter;
pub mod ids;
pub mod record;

pub use error::{DataError, DataResult};
pub use filter::{Filter, FilterOperator, Order, Predicate, Slice, SortDirection};
pub use ids::{new_record_id, PrincipalId, RecordId, TeamId, Timestamp, UserId};
pub use record::{Collection, Record};
