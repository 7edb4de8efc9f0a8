//! # Relational Adapter
//!
//! Stores documents as tenant-scoped rows in the backend store: every row
//! carries `(key, tenant_id)` as composite identity.
//!
//! A tenant id must be bound before any operation; the tenant is typically
//! discovered at login, after which the owning `StorageContext` rebinds the
//! adapter. Operating without one raises `StoreError::TenantNotBound` -
//! a fatal configuration error, never a silent no-op.

use async_trait::async_trait;
use serde_json::Value;

use meridian_db::{Database, DocumentRepository};

use crate::adapter::StorageAdapter;
use crate::error::{StoreError, StoreResult};

/// Tenant-scoped relational document adapter.
pub struct RelationalAdapter {
    documents: DocumentRepository,
    tenant_id: Option<String>,
}

impl RelationalAdapter {
    /// Creates an adapter over the backend store, optionally bound to a
    /// tenant. An unbound adapter fails every operation until rebound.
    pub fn new(database: &Database, tenant_id: Option<String>) -> Self {
        RelationalAdapter {
            documents: database.documents(),
            tenant_id,
        }
    }

    /// The tenant this adapter is bound to, if any.
    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    fn require_tenant(&self) -> StoreResult<&str> {
        self.tenant_id.as_deref().ok_or(StoreError::TenantNotBound)
    }
}

#[async_trait]
impl StorageAdapter for RelationalAdapter {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let tenant = self.require_tenant()?;
        Ok(self.documents.get(tenant, key).await?)
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        let tenant = self.require_tenant()?;
        Ok(self.documents.set(tenant, key, &value).await?)
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        let tenant = self.require_tenant()?;
        Ok(self.documents.remove(tenant, key).await?)
    }

    async fn clear(&self) -> StoreResult<()> {
        let tenant = self.require_tenant()?;
        Ok(self.documents.clear(tenant).await?)
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        let tenant = self.require_tenant()?;
        Ok(self.documents.keys(tenant).await?)
    }

    fn name(&self) -> &'static str {
        "relational"
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

    async fn database() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn unbound_adapter_is_a_configuration_error() {
        let db = database().await;
        let adapter = RelationalAdapter::new(&db, None);

        let err = adapter.set("k1", json!(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::TenantNotBound));
        assert!(err.is_configuration());

        assert!(matches!(
            adapter.get("k1").await.unwrap_err(),
            StoreError::TenantNotBound
        ));
    }

    #[tokio::test]
    async fn bound_adapter_round_trips() {
        let db = database().await;
        let adapter = RelationalAdapter::new(&db, Some("t1".into()));

        adapter.set("k1", json!({"a": 1})).await.unwrap();
        assert_eq!(adapter.get("k1").await.unwrap(), Some(json!({"a": 1})));

        adapter.remove("k1").await.unwrap();
        assert_eq!(adapter.get("k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn adapters_bound_to_different_tenants_are_isolated() {
        let db = database().await;
        let t1 = RelationalAdapter::new(&db, Some("t1".into()));
        let t2 = RelationalAdapter::new(&db, Some("t2".into()));

        t1.set("settings", json!({"theme": "dark"})).await.unwrap();
        t2.set("settings", json!({"theme": "light"})).await.unwrap();

        assert_eq!(
            t1.get("settings").await.unwrap(),
            Some(json!({"theme": "dark"}))
        );

        t1.clear().await.unwrap();
        assert_eq!(t1.keys().await.unwrap().len(), 0);
        assert_eq!(t2.keys().await.unwrap(), vec!["settings"]);
    }
}
