//! Filter model for the remote query boundary.
//!
//! The same filter shape is used for one-shot reads and for realtime
//! change subscriptions, so a subscription always covers exactly the
//! rows a read with the same filter would return.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Filter operator for field comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    /// Equal to
    Eq,
    /// Not equal to
    Neq,
    /// Greater than
    Gt,
    /// Less than
    Lt,
    /// Greater than or equal
    Gte,
    /// Less than or equal
    Lte,
}

impl FilterOperator {
    /// Wire token used in the query string (PostgREST convention).
    pub fn wire_token(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Lt => "lt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lte => "lte",
        }
    }
}

/// One field comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    /// Field to filter on
    pub field: String,
    /// Operator to apply
    pub operator: FilterOperator,
    /// Value to compare against (JSON value for flexibility)
    pub value: Value,
}

impl Predicate {
    /// Create a new predicate.
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Create an equality predicate.
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOperator::Eq, value)
    }
}

/// Sort direction for an [`Order`] term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One ordering term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub field: String,
    pub direction: SortDirection,
}

impl Order {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Bounded slice of a result set. Offsets are zero-based and `to` is
/// inclusive, matching the remote service's range convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slice {
    pub from: u32,
    pub to: u32,
}

impl Slice {
    pub fn new(from: u32, to: u32) -> Self {
        Self { from, to }
    }

    /// True when this slice starts at the beginning of the result set.
    ///
    /// Only the first slice has a meaningful client-side equivalent when
    /// the network is down, so cache fallback is restricted to it.
    pub fn is_first(&self) -> bool {
        self.from == 0
    }

    /// Number of rows the slice covers.
    pub fn len(&self) -> u32 {
        self.to.saturating_sub(self.from).saturating_add(1)
    }

    pub fn is_empty(&self) -> bool {
        self.to < self.from
    }
}

/// Complete filter for a read or a subscription: predicates, an explicit
/// minimal field projection, ordering, and an optional slice.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Filter {
    pub predicates: Vec<Predicate>,
    /// Fields to project. Empty means "all fields".
    pub projection: Vec<String>,
    pub order: Vec<Order>,
    pub slice: Option<Slice>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate.
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Set the field projection.
    pub fn with_projection<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Add an ordering term.
    pub fn with_order(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    /// Bound the result set to a slice.
    pub fn with_slice(mut self, slice: Slice) -> Self {
        self.slice = Some(slice);
        self
    }
}
