//! # Storage Adapter Error Types
//!
//! ## Error Categories
//! ```text
//! Configuration  TenantNotBound, Misconfigured   fatal, raised immediately
//! Transport      Io, Backend, Bridge             surfaced to the caller
//! Data           Serialization                   value could not be encoded
//! ```
//!
//! A missing key is NOT an error anywhere in this crate: `get` returns
//! `Ok(None)`.

use thiserror::Error;

/// Result type alias for storage adapter operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage adapter errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write was attempted on the relational adapter with no tenant bound.
    /// This is a fatal configuration error, never a silent no-op.
    #[error("no tenant bound to the relational storage adapter")]
    TenantNotBound,

    /// The requested backend cannot be built from the given configuration.
    #[error("storage adapter misconfigured: {0}")]
    Misconfigured(String),

    /// Local filesystem I/O failed.
    #[error("storage I/O failed: {0}")]
    Io(String),

    /// The backend store rejected the operation.
    #[error("backend store error: {0}")]
    Backend(String),

    /// The desktop host bridge failed or returned an unexpected response.
    #[error("desktop host bridge error: {0}")]
    Bridge(String),

    /// A value could not be serialized or deserialized.
    #[error("value serialization failed: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Returns true for configuration errors, which are fatal and must not
    /// be retried.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            StoreError::TenantNotBound | StoreError::Misconfigured(_)
        )
    }

    /// Returns true for transport-level failures in the underlying I/O.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            StoreError::Io(_) | StoreError::Backend(_) | StoreError::Bridge(_)
        )
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<meridian_db::DbError> for StoreError {
    fn from(err: meridian_db::DbError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
