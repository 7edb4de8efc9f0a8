//! # Storage Context
//!
//! Resolves which concrete adapter to use and caches the result. The context
//! is an explicit, injectable object: components that need storage receive a
//! `StorageContext` (or an adapter resolved from one) rather than reaching
//! for process-wide state.
//!
//! Tenant identity is typically discovered only after login, which happens
//! after the first adapter may already have been resolved. `rebind` replaces
//! the cached adapter with one bound to the newly known tenant; in-flight
//! operations on the previous instance are allowed to complete.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use meridian_db::Database;

use crate::adapter::StorageAdapter;
use crate::desktop::{DesktopAdapter, HostBridge};
use crate::error::{StoreError, StoreResult};
use crate::local::LocalFileAdapter;
use crate::relational::RelationalAdapter;

// =============================================================================
// Backend Choice
// =============================================================================

/// Which adapter implementation the context builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendChoice {
    /// Detect: desktop host present → desktop, otherwise local-persistent.
    #[default]
    Auto,

    /// Local persistent file store.
    Local,

    /// Tenant-scoped rows in the relational backend store.
    Relational,

    /// Desktop host delegation (falls back to local when no host).
    Desktop,
}

// =============================================================================
// Settings
// =============================================================================

/// Configuration the context resolves adapters from.
#[derive(Debug, Clone)]
pub struct StorageSettings {
    /// Requested backend.
    pub backend: BackendChoice,

    /// Root directory for file-backed stores.
    pub root_dir: PathBuf,

    /// Tenant id, once known. Required for the relational backend.
    pub tenant_id: Option<String>,
}

impl StorageSettings {
    /// Creates settings with automatic backend detection.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        StorageSettings {
            backend: BackendChoice::Auto,
            root_dir: root_dir.into(),
            tenant_id: None,
        }
    }

    /// Sets an explicit backend.
    pub fn backend(mut self, backend: BackendChoice) -> Self {
        self.backend = backend;
        self
    }

    /// Sets the tenant id.
    pub fn tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }
}

// =============================================================================
// Storage Context
// =============================================================================

/// Adapter factory with an explicit cache and rebind operation.
pub struct StorageContext {
    settings: Mutex<StorageSettings>,
    database: Option<Database>,
    bridge: Option<Arc<dyn HostBridge>>,
    cached: Mutex<Option<Arc<dyn StorageAdapter>>>,
}

impl StorageContext {
    /// Creates a context.
    ///
    /// `database` is required only for the relational backend; `bridge` is
    /// the detected desktop host, if any (its presence drives `Auto`
    /// resolution).
    pub fn new(
        settings: StorageSettings,
        database: Option<Database>,
        bridge: Option<Arc<dyn HostBridge>>,
    ) -> Self {
        StorageContext {
            settings: Mutex::new(settings),
            database,
            bridge,
            cached: Mutex::new(None),
        }
    }

    /// Returns the resolved adapter, building and caching it on first use.
    pub async fn adapter(&self) -> StoreResult<Arc<dyn StorageAdapter>> {
        let mut cached = self.cached.lock().await;

        if let Some(adapter) = cached.as_ref() {
            return Ok(adapter.clone());
        }

        let settings = self.settings.lock().await.clone();
        let built = self.build(&settings).await?;
        info!(backend = built.name(), "Storage adapter resolved");

        *cached = Some(built.clone());
        Ok(built)
    }

    /// Rebinds the context to a tenant and replaces the cached adapter.
    ///
    /// In-flight operations against the previously resolved adapter run to
    /// completion on their own `Arc`; only new `adapter()` calls see the
    /// replacement.
    pub async fn rebind(&self, tenant_id: Option<String>) -> StoreResult<Arc<dyn StorageAdapter>> {
        let mut cached = self.cached.lock().await;

        let settings = {
            let mut settings = self.settings.lock().await;
            settings.tenant_id = tenant_id;
            settings.clone()
        };

        let built = self.build(&settings).await?;
        info!(
            backend = built.name(),
            tenant = settings.tenant_id.as_deref().unwrap_or("<none>"),
            "Storage adapter rebound"
        );

        *cached = Some(built.clone());
        Ok(built)
    }

    /// Builds a concrete adapter for the given settings.
    async fn build(&self, settings: &StorageSettings) -> StoreResult<Arc<dyn StorageAdapter>> {
        let backend = match settings.backend {
            BackendChoice::Auto => {
                if self.bridge.is_some() {
                    BackendChoice::Desktop
                } else {
                    BackendChoice::Local
                }
            }
            explicit => explicit,
        };

        match backend {
            BackendChoice::Local => {
                let adapter = LocalFileAdapter::open(&settings.root_dir).await?;
                Ok(Arc::new(adapter))
            }

            BackendChoice::Relational => {
                let database = self.database.as_ref().ok_or_else(|| {
                    StoreError::Misconfigured(
                        "relational backend requested but no database configured".into(),
                    )
                })?;
                Ok(Arc::new(RelationalAdapter::new(
                    database,
                    settings.tenant_id.clone(),
                )))
            }

            BackendChoice::Desktop => {
                let adapter =
                    DesktopAdapter::open(&settings.root_dir, self.bridge.clone()).await?;
                Ok(Arc::new(adapter))
            }

            BackendChoice::Auto => unreachable!("Auto resolved above"),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_db::DbConfig;
    use serde_json::json;

    #[tokio::test]
    async fn auto_without_host_resolves_to_local() {
        let dir = tempfile::tempdir().unwrap();
        let context = StorageContext::new(StorageSettings::new(dir.path()), None, None);

        let adapter = context.adapter().await.unwrap();
        assert_eq!(adapter.name(), "local");
    }

    #[tokio::test]
    async fn resolved_adapter_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let context = StorageContext::new(StorageSettings::new(dir.path()), None, None);

        let first = context.adapter().await.unwrap();
        let second = context.adapter().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn rebind_replaces_the_cached_adapter() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let settings = StorageSettings::new(dir.path()).backend(BackendChoice::Relational);
        let context = StorageContext::new(settings, Some(db), None);

        // Unbound: resolution succeeds, writes fail until a tenant is known.
        let unbound = context.adapter().await.unwrap();
        assert!(unbound.set("k", json!(1)).await.is_err());

        let bound = context.rebind(Some("t1".into())).await.unwrap();
        assert!(!Arc::ptr_eq(&unbound, &bound));

        bound.set("k", json!(1)).await.unwrap();
        assert_eq!(bound.get("k").await.unwrap(), Some(json!(1)));

        // Subsequent resolution returns the rebound instance.
        let resolved = context.adapter().await.unwrap();
        assert!(Arc::ptr_eq(&bound, &resolved));
    }

    #[tokio::test]
    async fn relational_without_database_is_misconfigured() {
        let dir = tempfile::tempdir().unwrap();
        let settings = StorageSettings::new(dir.path()).backend(BackendChoice::Relational);
        let context = StorageContext::new(settings, None, None);

        let err = match context.adapter().await {
            Ok(_) => panic!("expected misconfigured error"),
            Err(e) => e,
        };
        assert!(matches!(err, StoreError::Misconfigured(_)));
        assert!(err.is_configuration());
    }
}
