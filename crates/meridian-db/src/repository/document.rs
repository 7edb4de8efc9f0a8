//! # Document Repository
//!
//! Tenant-scoped key/value rows backing the relational storage adapter.
//!
//! Every row carries `(key, tenant_id)` as composite identity; `set` is
//! last-write-wins with no optimistic concurrency token, matching the
//! StorageAdapter contract.

use chrono::Utc;
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

/// Repository for tenant-scoped document operations.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    pool: SqlitePool,
}

impl DocumentRepository {
    /// Creates a new DocumentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DocumentRepository { pool }
    }

    /// Reads a document. Missing keys return `None`, never an error.
    pub async fn get(&self, tenant_id: &str, key: &str) -> DbResult<Option<Value>> {
        let row = sqlx::query("SELECT value FROM documents WHERE key = ?1 AND tenant_id = ?2")
            .bind(key)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw: String = row.try_get("value")?;
        let value = serde_json::from_str(&raw)
            .map_err(|e| DbError::invalid_payload("document", key, e.to_string()))?;

        Ok(Some(value))
    }

    /// Writes a document, replacing any existing value under the same key.
    pub async fn set(&self, tenant_id: &str, key: &str, value: &Value) -> DbResult<()> {
        debug!(tenant_id, key, "Writing document");

        let serialized = serde_json::to_string(value)
            .map_err(|e| DbError::invalid_payload("document", key, e.to_string()))?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO documents (key, tenant_id, value, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (key, tenant_id)
            DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(tenant_id)
        .bind(serialized)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Removes a document. Removing a missing key is a no-op.
    pub async fn remove(&self, tenant_id: &str, key: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM documents WHERE key = ?1 AND tenant_id = ?2")
            .bind(key)
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Removes every document belonging to a tenant.
    pub async fn clear(&self, tenant_id: &str) -> DbResult<()> {
        debug!(tenant_id, "Clearing tenant documents");

        sqlx::query("DELETE FROM documents WHERE tenant_id = ?1")
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Lists every document key belonging to a tenant, sorted.
    pub async fn keys(&self, tenant_id: &str) -> DbResult<Vec<String>> {
        let rows = sqlx::query("SELECT key FROM documents WHERE tenant_id = ?1 ORDER BY key")
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| row.try_get::<String, _>("key").map_err(DbError::from))
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use serde_json::json;

    async fn repo() -> DocumentRepository {
        Database::new(DbConfig::in_memory())
            .await
            .unwrap()
            .documents()
    }

    #[tokio::test]
    async fn set_get_remove_round_trip() {
        let repo = repo().await;

        repo.set("t1", "k1", &json!({"a": 1})).await.unwrap();
        assert_eq!(repo.get("t1", "k1").await.unwrap(), Some(json!({"a": 1})));

        repo.remove("t1", "k1").await.unwrap();
        assert_eq!(repo.get("t1", "k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_is_last_write_wins() {
        let repo = repo().await;

        repo.set("t1", "k1", &json!({"a": 1})).await.unwrap();
        repo.set("t1", "k1", &json!({"a": 2})).await.unwrap();

        assert_eq!(repo.get("t1", "k1").await.unwrap(), Some(json!({"a": 2})));
    }

    #[tokio::test]
    async fn documents_are_tenant_scoped() {
        let repo = repo().await;

        repo.set("t1", "settings", &json!({"theme": "dark"}))
            .await
            .unwrap();
        repo.set("t2", "settings", &json!({"theme": "light"}))
            .await
            .unwrap();

        assert_eq!(
            repo.get("t1", "settings").await.unwrap(),
            Some(json!({"theme": "dark"}))
        );
        assert_eq!(
            repo.get("t2", "settings").await.unwrap(),
            Some(json!({"theme": "light"}))
        );

        repo.clear("t1").await.unwrap();
        assert_eq!(repo.get("t1", "settings").await.unwrap(), None);
        assert!(repo.get("t2", "settings").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn keys_lists_only_the_tenants_documents() {
        let repo = repo().await;

        repo.set("t1", "b", &json!(1)).await.unwrap();
        repo.set("t1", "a", &json!(2)).await.unwrap();
        repo.set("t2", "c", &json!(3)).await.unwrap();

        assert_eq!(repo.keys("t1").await.unwrap(), vec!["a", "b"]);
        assert_eq!(repo.keys("t2").await.unwrap(), vec!["c"]);
        assert!(repo.keys("t3").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_missing_key_is_a_noop() {
        let repo = repo().await;
        repo.remove("t1", "ghost").await.unwrap();
    }
}
