//! # Entity Row Repository
//!
//! The authoritative backend store for reconciled business records.
//!
//! ## Storage Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  entity_rows                                                            │
//! │                                                                         │
//! │  tenant_id | collection | id   | payload (JSON)         | timestamps   │
//! │  ──────────┼────────────┼──────┼────────────────────────┼────────────  │
//! │  t1        │ products   │ p1   │ {"name":"Tea", ...}    │ ...          │
//! │  t1        │ categories │ c9   │ {"name":"General",...} │ ...          │
//! │  t2        │ branches   │ b1   │ {"name":"Downtown",...}│ ...          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One table holds every entity kind: records are schemaless JSON payloads
//! keyed by `(tenant_id, collection, id)`. The reconciliation engine owns
//! merge policy; this repository only does existence checks, inserts,
//! in-place payload replacement, and collection reads.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

/// A stored entity record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRow {
    pub tenant_id: String,
    pub collection: String,
    pub id: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository for entity-row operations.
#[derive(Debug, Clone)]
pub struct EntityRepository {
    pool: SqlitePool,
}

impl EntityRepository {
    /// Creates a new EntityRepository.
    pub fn new(pool: SqlitePool) -> Self {
        EntityRepository { pool }
    }

    /// Looks up a record by id.
    ///
    /// ## Returns
    /// * `Ok(Some(EntityRow))` - record exists
    /// * `Ok(None)` - no record under this id
    pub async fn get(
        &self,
        tenant_id: &str,
        collection: &str,
        id: &str,
    ) -> DbResult<Option<EntityRow>> {
        let row = sqlx::query(
            r#"
            SELECT tenant_id, collection, id, payload, created_at, updated_at
            FROM entity_rows
            WHERE tenant_id = ?1 AND collection = ?2 AND id = ?3
            "#,
        )
        .bind(tenant_id)
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_entity_row).transpose()
    }

    /// Inserts a new record.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - id already exists for this
    ///   tenant/collection
    pub async fn insert(
        &self,
        tenant_id: &str,
        collection: &str,
        id: &str,
        payload: &Value,
    ) -> DbResult<()> {
        debug!(tenant_id, collection, id, "Inserting entity row");

        let serialized = serde_json::to_string(payload)
            .map_err(|e| DbError::invalid_payload(collection, id, e.to_string()))?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO entity_rows (tenant_id, collection, id, payload, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(tenant_id)
        .bind(collection)
        .bind(id)
        .bind(serialized)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replaces an existing record's payload and bumps `updated_at`.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no record under this id
    pub async fn update(
        &self,
        tenant_id: &str,
        collection: &str,
        id: &str,
        payload: &Value,
    ) -> DbResult<()> {
        debug!(tenant_id, collection, id, "Updating entity row");

        let serialized = serde_json::to_string(payload)
            .map_err(|e| DbError::invalid_payload(collection, id, e.to_string()))?;
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE entity_rows
            SET payload = ?4, updated_at = ?5
            WHERE tenant_id = ?1 AND collection = ?2 AND id = ?3
            "#,
        )
        .bind(tenant_id)
        .bind(collection)
        .bind(id)
        .bind(serialized)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(collection, id));
        }

        Ok(())
    }

    /// Lists all records of a collection for a tenant, in creation order.
    pub async fn list(&self, tenant_id: &str, collection: &str) -> DbResult<Vec<EntityRow>> {
        let rows = sqlx::query(
            r#"
            SELECT tenant_id, collection, id, payload, created_at, updated_at
            FROM entity_rows
            WHERE tenant_id = ?1 AND collection = ?2
            ORDER BY created_at, id
            "#,
        )
        .bind(tenant_id)
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(map_entity_row).collect()
    }

    /// Finds records whose payload field equals a string value.
    ///
    /// Used for advisory business-key lookups (category name, account
    /// number). Comparison is exact; callers needing case-insensitive
    /// matching filter the returned rows.
    pub async fn find_by_field(
        &self,
        tenant_id: &str,
        collection: &str,
        field: &str,
        value: &str,
    ) -> DbResult<Vec<EntityRow>> {
        let rows = sqlx::query(
            r#"
            SELECT tenant_id, collection, id, payload, created_at, updated_at
            FROM entity_rows
            WHERE tenant_id = ?1 AND collection = ?2
              AND json_extract(payload, '$.' || ?3) = ?4
            ORDER BY created_at, id
            "#,
        )
        .bind(tenant_id)
        .bind(collection)
        .bind(field)
        .bind(value)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(map_entity_row).collect()
    }

    /// Counts records of a collection for a tenant.
    pub async fn count(&self, tenant_id: &str, collection: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM entity_rows WHERE tenant_id = ?1 AND collection = ?2",
        )
        .bind(tenant_id)
        .bind(collection)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Deletes a record. Deletion is a distinct operation from
    /// reconciliation - the engine itself never removes rows.
    ///
    /// ## Returns
    /// `true` when a row was removed.
    pub async fn delete(&self, tenant_id: &str, collection: &str, id: &str) -> DbResult<bool> {
        debug!(tenant_id, collection, id, "Deleting entity row");

        let result = sqlx::query(
            "DELETE FROM entity_rows WHERE tenant_id = ?1 AND collection = ?2 AND id = ?3",
        )
        .bind(tenant_id)
        .bind(collection)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Maps a database row to an EntityRow, parsing the JSON payload.
fn map_entity_row(row: SqliteRow) -> DbResult<EntityRow> {
    let collection: String = row.try_get("collection")?;
    let id: String = row.try_get("id")?;
    let raw_payload: String = row.try_get("payload")?;

    let payload = serde_json::from_str(&raw_payload)
        .map_err(|e| DbError::invalid_payload(&collection, &id, e.to_string()))?;

    Ok(EntityRow {
        tenant_id: row.try_get("tenant_id")?,
        collection,
        id,
        payload,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
