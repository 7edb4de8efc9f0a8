//! # Sync Error Types
//!
//! ## Error Handling Strategy
//! ```text
//! item-level    Validation, CategoryResolution, Database
//!               counted into the batch summary, batch continues
//!
//! request-level InvalidRequest, UnknownCollection
//!               the whole request is malformed → client error (4xx)
//!
//! engine-level  Store, Serialization, Internal, config errors
//!               unexpected fault → server error (5xx)
//! ```

use thiserror::Error;

use meridian_core::ValidationError;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering reconciliation, propagation, and configuration
/// failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Request Errors
    // =========================================================================
    /// The request itself is malformed (missing tenant id, wrong shape).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No entity kind matches the requested collection name.
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    // =========================================================================
    // Item Errors
    // =========================================================================
    /// A submitted item failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The fallback category could not be looked up or created.
    #[error("fallback category resolution failed: {0}")]
    CategoryResolution(String),

    /// The backend store rejected an item operation.
    #[error("backend store error: {0}")]
    Database(String),

    // =========================================================================
    // Engine Errors
    // =========================================================================
    /// The document store failed.
    #[error("document store error: {0}")]
    Store(String),

    /// Payload serialization failed.
    #[error("serialization failed: {0}")]
    Serialization(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load the config file.
    #[error("failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save the config file.
    #[error("failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal sync error.
    #[error("internal sync error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Returns true when this error is recovered locally by the engine:
    /// counted against the item, batch continues.
    pub fn is_item_level(&self) -> bool {
        matches!(
            self,
            SyncError::Validation(_) | SyncError::CategoryResolution(_) | SyncError::Database(_)
        )
    }

    /// Returns true when the whole request was malformed (client error).
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidRequest(_) | SyncError::UnknownCollection(_)
        )
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<meridian_db::DbError> for SyncError {
    fn from(err: meridian_db::DbError) -> Self {
        SyncError::Database(err.to_string())
    }
}

impl From<meridian_store::StoreError> for SyncError {
    fn from(err: meridian_store::StoreError) -> Self {
        SyncError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
