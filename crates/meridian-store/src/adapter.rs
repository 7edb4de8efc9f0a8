//! # StorageAdapter Contract
//!
//! The uniform interface every storage backend satisfies. All operations are
//! asynchronous and safe to call concurrently for different keys; writes to
//! the same key are last-write-wins with no concurrency token.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreResult;

/// Uniform get/set/remove/clear/keys access to a named document store.
///
/// ## Contract
/// - `get` on a missing key returns `Ok(None)`, never an error
/// - `set` is last-write-wins: concurrent writers to the same key race, and
///   the final value is whichever write's underlying I/O completes last
/// - `keys` enumerates every known key in the adapter's scope
/// - tenant scoping is each adapter's own concern; callers only see keys
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Reads the value stored under `key`.
    async fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Stores `value` under `key`, replacing any existing value.
    async fn set(&self, key: &str, value: Value) -> StoreResult<()>;

    /// Removes the value under `key`. Removing a missing key is a no-op.
    async fn remove(&self, key: &str) -> StoreResult<()>;

    /// Removes every value in this adapter's scope.
    async fn clear(&self) -> StoreResult<()>;

    /// Lists every known key in this adapter's scope.
    async fn keys(&self) -> StoreResult<Vec<String>>;

    /// Short backend name for logging and diagnostics.
    fn name(&self) -> &'static str;
}
