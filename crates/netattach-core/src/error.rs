//! Error types for the reconciliation engine
//!
//! This module defines the full error taxonomy used throughout the crate.
//! Fatal errors always carry the failed operation, the entity key involved,
//! and the raw remote error text.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the reconciliation engine
#[derive(Error, Debug)]
pub enum Error {
    /// Caller supplied an invalid or immutable-field change; surfaced before
    /// planning and never retried
    #[error("validation error: {0}")]
    Validation(String),

    /// The diff yields an unsatisfiable constraint (e.g. duplicate keys in
    /// desired); no plan is generated
    #[error("planning error: {0}")]
    Planning(String),

    /// A remote failure classified as likely to succeed on retry
    #[error("transient API error: {0}")]
    TransientApi(String),

    /// Address already in use, or a required-present resource was absent.
    /// Fatal; aborts remaining plan execution.
    #[error("conflict during {operation} for {key}: {message}")]
    Conflict {
        /// The plan operation that hit the conflict
        operation: String,
        /// Entity key (network or address identifier) involved
        key: String,
        /// The conflicting remote identifier, when the platform reports one
        remote_id: Option<String>,
        /// Raw remote error text
        message: String,
    },

    /// A plan operation failed fatally (including transient errors escalated
    /// after the retry bound)
    #[error("{operation} failed for {key}: {message}")]
    OperationFailed {
        /// The plan operation that failed
        operation: String,
        /// Entity key involved
        key: String,
        /// Raw remote error text
        message: String,
    },

    /// Remote resource does not exist
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Status Waiter deadline exceeded
    #[error("wait for {resource_id} timed out after {waited:?}")]
    Timeout {
        /// Resource whose status was being polled
        resource_id: String,
        /// Total time waited before giving up
        waited: Duration,
    },

    /// Caller-initiated abort, distinct from Timeout
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Raw remote API error, not yet classified
    #[error("API error: {0}")]
    Api(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a planning error
    pub fn planning(msg: impl Into<String>) -> Self {
        Self::Planning(msg.into())
    }

    /// Create a transient API error
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::TransientApi(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(
        operation: impl Into<String>,
        key: impl Into<String>,
        remote_id: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            operation: operation.into(),
            key: key.into(),
            remote_id,
            message: message.into(),
        }
    }

    /// Create a fatal operation failure
    pub fn operation_failed(
        operation: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(resource_id: impl Into<String>, waited: Duration) -> Self {
        Self::Timeout {
            resource_id: resource_id.into(),
            waited,
        }
    }

    /// Create a cancellation error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Create a raw API error
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// True if this error represents caller-initiated cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Api(err.to_string())
    }
}
