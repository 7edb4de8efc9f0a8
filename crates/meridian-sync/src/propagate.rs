//! # Cross-Store Propagation Job
//!
//! Reads the authoritative backend store for a tenant and republishes
//! denormalized projections into the document store, one document per
//! collection, keyed `{tenantId}_{collection}`.
//!
//! ## Behavior
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  propagate("t1")                                                        │
//! │                                                                         │
//! │  read branches ──┐                                                      │
//! │  read categories ├─► project rows ──► write documents CONCURRENTLY     │
//! │  read products   │   (renames,        t1_branches, t1_categories, ...  │
//! │  read employees  │    coalescing)                                       │
//! │  read sales ─────┘                                                      │
//! │                                                                         │
//! │  • master-data documents are always written, even when empty           │
//! │  • the sales document is written only when at least one sale exists    │
//! │  • a failed collection write is logged, the others still land          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use meridian_core::EntityKind;
use meridian_db::{Database, EntityRepository};
use meridian_store::StorageContext;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Summary
// =============================================================================

/// Per-collection row counts read from the backend store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropagateSummary {
    pub branches: u64,
    pub categories: u64,
    pub products: u64,
    pub employees: u64,
    pub sales: u64,
}

// =============================================================================
// Propagator
// =============================================================================

/// Republisher of backend rows into the document store.
pub struct Propagator {
    entities: EntityRepository,
    storage: Arc<StorageContext>,
}

impl Propagator {
    /// Creates a propagator. The storage context is resolved per run, so a
    /// rebind between runs takes effect on the next propagation.
    pub fn new(database: &Database, storage: Arc<StorageContext>) -> Self {
        Propagator {
            entities: database.entities(),
            storage,
        }
    }

    /// Propagates every collection of a tenant into the document store.
    pub async fn propagate(&self, tenant_id: &str) -> SyncResult<PropagateSummary> {
        if tenant_id.trim().is_empty() {
            return Err(SyncError::InvalidRequest("tenantId is required".into()));
        }

        let adapter = self.storage.adapter().await?;

        let branches = self.read(tenant_id, EntityKind::Branch).await;
        let categories = self.read(tenant_id, EntityKind::Category).await;
        let products = self.read(tenant_id, EntityKind::Product).await;
        let employees = self.read(tenant_id, EntityKind::Employee).await;
        let sales = self.read(tenant_id, EntityKind::Sale).await;

        let summary = PropagateSummary {
            branches: branches.len() as u64,
            categories: categories.len() as u64,
            products: products.len() as u64,
            employees: employees.len() as u64,
            sales: sales.len() as u64,
        };

        let mut writes: Vec<(String, Value)> = vec![
            (
                document_key(tenant_id, EntityKind::Branch),
                Value::Array(branches.iter().map(project_branch).collect()),
            ),
            (
                document_key(tenant_id, EntityKind::Category),
                Value::Array(categories.iter().map(project_category).collect()),
            ),
            (
                document_key(tenant_id, EntityKind::Product),
                Value::Array(products.iter().map(project_product).collect()),
            ),
            (
                document_key(tenant_id, EntityKind::Employee),
                Value::Array(employees.iter().map(project_employee).collect()),
            ),
        ];

        // Sales are append-heavy and read-path consumers only want them once
        // some exist; an empty tenant gets no sales document at all.
        if !sales.is_empty() {
            writes.push((
                document_key(tenant_id, EntityKind::Sale),
                Value::Array(sales.iter().map(project_sale).collect()),
            ));
        }

        // All collection writes run concurrently; one failing write is
        // logged and never blocks the others.
        let futures = writes.into_iter().map(|(key, doc)| {
            let adapter = adapter.clone();
            async move {
                if let Err(e) = adapter.set(&key, doc).await {
                    warn!(key = %key, error = %e, "Propagation write failed");
                }
            }
        });
        join_all(futures).await;

        info!(
            tenant_id,
            branches = summary.branches,
            categories = summary.categories,
            products = summary.products,
            employees = summary.employees,
            sales = summary.sales,
            "Propagation complete"
        );

        Ok(summary)
    }

    /// Reads one collection; a failed read is logged and propagates as an
    /// empty collection so the others still run.
    async fn read(&self, tenant_id: &str, kind: EntityKind) -> Vec<Value> {
        match self.entities.list(tenant_id, kind.collection()).await {
            Ok(rows) => rows.into_iter().map(|row| row.payload).collect(),
            Err(e) => {
                warn!(tenant_id, collection = kind.collection(), error = %e, "Propagation read failed");
                Vec::new()
            }
        }
    }
}

/// Document key convention: `{tenantId}_{collection}`.
fn document_key(tenant_id: &str, kind: EntityKind) -> String {
    format!("{}_{}", tenant_id, kind.collection())
}

// =============================================================================
// Projections
// =============================================================================
// Flattened shapes the document-store readers expect: stable field names,
// nullable coalescing, nothing else.

fn project_branch(payload: &Value) -> Value {
    json!({
        "id": payload["id"],
        "name": payload["name"],
        "code": coalesce_str(payload, "code"),
        "address": coalesce_str(payload, "address"),
        "phone": coalesce_str(payload, "phone"),
        "isActive": payload.get("isActive").and_then(Value::as_bool).unwrap_or(true),
    })
}

fn project_category(payload: &Value) -> Value {
    json!({
        "id": payload["id"],
        "name": payload["name"],
        "sortOrder": coalesce_num(payload, "sortOrder"),
        "showInPos": payload.get("showInPos").and_then(Value::as_bool).unwrap_or(true),
    })
}

fn project_product(payload: &Value) -> Value {
    json!({
        "id": payload["id"],
        "name": payload["name"],
        "sku": coalesce_str(payload, "sku"),
        "categoryId": coalesce_str(payload, "categoryId"),
        "price": coalesce_num(payload, "price"),
        // stockQuantity → stock: the read path uses the short name
        "stock": coalesce_num(payload, "stockQuantity"),
        "unit": coalesce_str(payload, "unit"),
        "isActive": payload.get("isActive").and_then(Value::as_bool).unwrap_or(true),
    })
}

fn project_employee(payload: &Value) -> Value {
    json!({
        "id": payload["id"],
        // fullName → name
        "name": coalesce_str(payload, "fullName"),
        "role": coalesce_str(payload, "role"),
        "isActive": payload.get("isActive").and_then(Value::as_bool).unwrap_or(true),
    })
}

fn project_sale(payload: &Value) -> Value {
    json!({
        "id": payload["id"],
        "saleNumber": coalesce_str(payload, "saleNumber"),
        "total": coalesce_num(payload, "total"),
        "paymentMethod": coalesce_str(payload, "paymentMethod"),
        "createdAt": coalesce_str(payload, "createdAt"),
    })
}

fn coalesce_str(payload: &Value, field: &str) -> Value {
    match payload.get(field) {
        Some(Value::String(s)) => Value::String(s.clone()),
        _ => Value::String(String::new()),
    }
}

fn coalesce_num(payload: &Value, field: &str) -> Value {
    match payload.get(field) {
        Some(Value::Number(n)) => Value::Number(n.clone()),
        _ => Value::from(0),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
