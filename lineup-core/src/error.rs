//! Error taxonomy for remote data access.
//!
//! Only three classes cross the data-layer boundary. Connectivity
//! failures are the single class eligible for cache fallback;
//! authorization and validation failures must reach the caller
//! unmasked. Corrupt-cache and storage-medium failures never appear
//! here - they are internal to the cache crate and self-heal into
//! "absent".

use thiserror::Error;

/// A failure surfaced by the remote data boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DataError {
    /// Network unreachable, timeout, DNS failure, or a gateway that
    /// cannot reach the service. Retryable; triggers cache fallback
    /// where a cached value exists.
    #[error("connectivity failure: {reason}")]
    Connectivity { reason: String },

    /// The caller is not allowed to see or change the requested rows.
    /// Never masked by cached data.
    #[error("authorization denied: {reason}")]
    Authorization { reason: String },

    /// Bad input, malformed query, or a server-side constraint
    /// violation. Caller-presentable; never retried automatically.
    #[error("validation failure: {reason}")]
    Validation { reason: String },
}

impl DataError {
    pub fn connectivity(reason: impl Into<String>) -> Self {
        Self::Connectivity {
            reason: reason.into(),
        }
    }

    pub fn authorization(reason: impl Into<String>) -> Self {
        Self::Authorization {
            reason: reason.into(),
        }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// True for the one class that may fall back to the cache.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }

    /// True when retrying the same call later could succeed.
    pub fn is_retryable(&self) -> bool {
        self.is_connectivity()
    }

    /// Classify an HTTP status into the taxonomy.
    ///
    /// 408/429/502/503/504 signal an unreachable or overloaded path and
    /// are treated as connectivity; 401/403 are authorization; every
    /// other non-success status is a validation failure.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::Authorization {
                reason: format!("HTTP {status}: {message}"),
            },
            408 | 429 | 502 | 503 | 504 => Self::Connectivity {
                reason: format!("HTTP {status}: {message}"),
            },
            _ => Self::Validation {
                reason: format!("HTTP {status}: {message}"),
            },
        }
    }
}

/// Result type alias for remote data access.
pub type DataResult<T> = Result<T, DataError>;
