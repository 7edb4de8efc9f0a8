//! # Reconciliation Engine
//!
//! Idempotent merge of client-originated batches into the backend store.
//!
//! ## Per-Item Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for each item, independently (one bad item never aborts the batch):   │
//! │                                                                         │
//! │  1. validate     required fields per the entity descriptor             │
//! │  2. resolve      category fallback (lookup-or-create, memoized         │
//! │                  per tenant+branch within the batch)                   │
//! │  3. upsert       id exists? → update mutable fields in place           │
//! │                  id unseen? → apply creation defaults, insert          │
//! │                                                                         │
//! │  Sale only: create-or-skip (ingest) vs create-or-update (upsert),      │
//! │  chosen by entry point.                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes are immediately visible to subsequent reads within the same call;
//! there is no cross-item transaction. A crash mid-batch leaves prior items
//! durably committed and the batch safe to re-submit in full.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use meridian_core::entity::{EntityKind, ReconcileOutcome, ReconcileSummary, SalePolicy};
use meridian_core::validation::{self, JsonMap};
use meridian_core::{token, ValidationError, APP_SETTINGS_DOC_ID};
use meridian_db::{Database, EntityRepository};

use crate::config::SyncConfig;
use crate::descriptor::{
    descriptor, CategoryLink, EntityDescriptor, FieldDefault, TokenKind, UpdateStrategy,
};
use crate::error::{SyncError, SyncResult};

/// Attempts at generating an unused account number before giving up.
const ACCOUNT_NUMBER_ATTEMPTS: usize = 5;

// =============================================================================
// Engine
// =============================================================================

/// Descriptor-driven reconciliation engine.
///
/// One generic per-item routine serves every entity kind; everything
/// kind-specific comes from the [`descriptor`] strategy table. Conflicting
/// writers to the same record id resolve last-write-wins - the engine holds
/// no locks and no version vector.
pub struct ReconcileEngine {
    entities: EntityRepository,
    config: Arc<SyncConfig>,
}

impl ReconcileEngine {
    /// Creates an engine over the backend store.
    pub fn new(database: &Database, config: Arc<SyncConfig>) -> Self {
        ReconcileEngine {
            entities: database.entities(),
            config,
        }
    }

    // =========================================================================
    // Entry Points
    // =========================================================================

    /// Reconciles a batch of records of one entity kind.
    ///
    /// For `EntityKind::Sale` this entry point updates existing ids in
    /// place; callers wanting idempotent ingestion use [`ingest_sales`]
    /// (see [`SalePolicy`]).
    ///
    /// [`ingest_sales`]: ReconcileEngine::ingest_sales
    pub async fn reconcile(
        &self,
        kind: EntityKind,
        tenant_id: &str,
        items: Vec<Value>,
    ) -> SyncResult<ReconcileSummary> {
        self.run_batch(kind, tenant_id, items, SalePolicy::CreateOrUpdate)
            .await
    }

    /// Reconciles sales with the create-or-skip policy: an already-known
    /// sale id is counted as skipped and never overwritten.
    pub async fn ingest_sales(
        &self,
        tenant_id: &str,
        items: Vec<Value>,
    ) -> SyncResult<ReconcileSummary> {
        self.run_batch(EntityKind::Sale, tenant_id, items, SalePolicy::CreateOrSkip)
            .await
    }

    /// Reconciles sales with the create-or-update policy: re-submitting a
    /// known id overwrites its mutable fields.
    pub async fn upsert_sales(
        &self,
        tenant_id: &str,
        items: Vec<Value>,
    ) -> SyncResult<ReconcileSummary> {
        self.run_batch(EntityKind::Sale, tenant_id, items, SalePolicy::CreateOrUpdate)
            .await
    }

    /// Reconciles a singleton kind (AppSettings, CashRegister): one object
    /// per request instead of an array.
    pub async fn reconcile_singleton(
        &self,
        kind: EntityKind,
        tenant_id: &str,
        item: Value,
    ) -> SyncResult<ReconcileSummary> {
        self.run_batch(kind, tenant_id, vec![item], SalePolicy::CreateOrUpdate)
            .await
    }

    // =========================================================================
    // Batch Loop
    // =========================================================================

    async fn run_batch(
        &self,
        kind: EntityKind,
        tenant_id: &str,
        items: Vec<Value>,
        policy: SalePolicy,
    ) -> SyncResult<ReconcileSummary> {
        if tenant_id.trim().is_empty() {
            return Err(SyncError::InvalidRequest("tenantId is required".into()));
        }

        let desc = descriptor(kind);
        let mut summary = ReconcileSummary::default();

        // Fallback-category ids resolved so far in this batch, per branch.
        // Without the memo a batch of N category-less products would try N
        // lookup-or-creates.
        let mut fallback_memo: HashMap<String, String> = HashMap::new();

        for item in items {
            match self
                .reconcile_item(desc, tenant_id, item, policy, &mut fallback_memo)
                .await
            {
                Ok(outcome) => summary.record(outcome),
                Err(e) => {
                    warn!(kind = %kind, tenant_id, error = %e, "Item failed reconciliation");
                    summary.record_error();
                }
            }
        }

        info!(
            kind = %kind,
            tenant_id,
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            errors = summary.errors,
            "Reconcile batch complete"
        );

        Ok(summary)
    }

    // =========================================================================
    // Per-Item Routine
    // =========================================================================

    async fn reconcile_item(
        &self,
        desc: &EntityDescriptor,
        tenant_id: &str,
        item: Value,
        policy: SalePolicy,
        fallback_memo: &mut HashMap<String, String>,
    ) -> SyncResult<ReconcileOutcome> {
        // The tenant settings document is opaque and caller-owned; it gets
        // its own fixed-id path.
        if desc.kind == EntityKind::AppSettings {
            return self.reconcile_app_settings(tenant_id, item).await;
        }

        let mut map = validation::as_object(&item)?.clone();
        validation::require_fields(&map, desc.required)?;

        let id = validation::str_field(&map, "id")
            .ok_or_else(|| ValidationError::required("id"))?
            .to_string();

        if desc.kind == EntityKind::Sale
            && validation::count_valid_sale_lines(map.get("items")) == 0
        {
            return Err(ValidationError::EmptySale { id }.into());
        }

        let branch_id = if desc.branch_scoped {
            Some(
                validation::str_field(&map, "branchId")
                    .unwrap_or(&self.config.tenant.default_branch_id)
                    .to_string(),
            )
        } else {
            None
        };

        let collection = desc.kind.collection();
        let existing = self.entities.get(tenant_id, collection, &id).await?;

        match existing {
            Some(row) => {
                if desc.kind == EntityKind::Sale && policy == SalePolicy::CreateOrSkip {
                    debug!(collection, id = %id, "Sale already ingested, skipping");
                    return Ok(ReconcileOutcome::Skipped);
                }

                // No fallback stamping on update: the stored record already
                // resolved its category at creation, and a partial
                // re-submission without categoryId must not overwrite it.
                let merged = self.apply_update(desc, row.payload, map);
                self.entities
                    .update(tenant_id, collection, &id, &merged)
                    .await?;
                Ok(ReconcileOutcome::Updated)
            }
            None => {
                if desc.category_link == CategoryLink::FallbackToGeneral
                    && validation::is_absent(&map, "categoryId")
                {
                    let branch = branch_id
                        .as_deref()
                        .unwrap_or(&self.config.tenant.default_branch_id);
                    let category_id = self
                        .resolve_fallback_category(tenant_id, branch, fallback_memo)
                        .await?;
                    map.insert("categoryId".to_string(), Value::String(category_id));
                }

                let record = self
                    .build_record(desc, tenant_id, branch_id.as_deref(), map)
                    .await?;
                self.entities
                    .insert(tenant_id, collection, &id, &record)
                    .await?;
                Ok(ReconcileOutcome::Created)
            }
        }
    }

    /// Constructs a full record at creation: defaults for absent optional
    /// fields, tenant/branch assignment, generated business keys, derived
    /// flags, timestamps.
    async fn build_record(
        &self,
        desc: &EntityDescriptor,
        tenant_id: &str,
        branch_id: Option<&str>,
        mut map: JsonMap,
    ) -> SyncResult<Value> {
        for (field, default) in desc.defaults {
            if validation::is_absent(&map, field) {
                map.insert((*field).to_string(), self.resolve_default(default));
            }
        }

        map.insert("tenantId".to_string(), Value::String(tenant_id.to_string()));
        if let Some(branch) = branch_id {
            map.insert("branchId".to_string(), Value::String(branch.to_string()));
        }

        if desc.kind == EntityKind::CustomerAccount {
            if validation::is_absent(&map, "accountNumber") {
                let number = self.unique_account_number(tenant_id).await?;
                map.insert("accountNumber".to_string(), Value::String(number));
            }
            validation::derive_account_active(&mut map);
        }

        if desc.kind == EntityKind::Sale {
            complete_sale_lines(&mut map);
        }

        let now = Utc::now().to_rfc3339();
        map.insert("createdAt".to_string(), Value::String(now.clone()));
        map.insert("updatedAt".to_string(), Value::String(now));

        Ok(Value::Object(map))
    }

    /// Merges a re-submission into the stored record per the descriptor's
    /// update strategy. Creation defaults are NOT re-applied here.
    fn apply_update(&self, desc: &EntityDescriptor, stored: Value, incoming: JsonMap) -> Value {
        let stored_map = stored.as_object().cloned().unwrap_or_default();

        let mut merged = match desc.update {
            UpdateStrategy::MergeFields => {
                let mut out = stored_map;
                for (key, value) in incoming {
                    if !desc.immutable.contains(&key.as_str()) {
                        out.insert(key, value);
                    }
                }
                out.insert(
                    "updatedAt".to_string(),
                    Value::String(Utc::now().to_rfc3339()),
                );
                out
            }
            UpdateStrategy::ReplaceDocument => {
                let mut out = incoming;
                for key in desc.immutable {
                    if let Some(value) = stored_map.get(*key) {
                        out.insert((*key).to_string(), value.clone());
                    }
                }
                out
            }
        };

        if desc.kind == EntityKind::CustomerAccount {
            validation::derive_account_active(&mut merged);
        }
        if desc.kind == EntityKind::Sale {
            complete_sale_lines(&mut merged);
        }

        Value::Object(merged)
    }

    fn resolve_default(&self, default: &FieldDefault) -> Value {
        match default {
            FieldDefault::Bool(b) => Value::Bool(*b),
            FieldDefault::Zero => Value::from(0),
            FieldDefault::Int(i) => Value::from(*i),
            FieldDefault::Str(s) => Value::String((*s).to_string()),
            FieldDefault::StandardTaxRate => Value::from(self.config.tenant.standard_tax_rate),
            FieldDefault::Token(kind) => Value::String(match kind {
                TokenKind::Pin => token::generate_pin(),
                TokenKind::QrCode => token::generate_qr_code(),
                TokenKind::Sku => token::generate_sku(),
                TokenKind::SaleNumber => token::generate_sale_number(),
                TokenKind::BranchCode => token::generate_branch_code(),
            }),
        }
    }

    // =========================================================================
    // Foreign-Key Resolution
    // =========================================================================

    /// Looks up - or creates - the fallback category for a tenant/branch.
    ///
    /// Idempotent under repeated calls: the lookup matches the configured
    /// name case-insensitively, and the per-batch memo keeps one batch from
    /// creating the category more than once per branch.
    async fn resolve_fallback_category(
        &self,
        tenant_id: &str,
        branch_id: &str,
        memo: &mut HashMap<String, String>,
    ) -> SyncResult<String> {
        if let Some(id) = memo.get(branch_id) {
            return Ok(id.clone());
        }

        let name = self.config.tenant.fallback_category_name.clone();
        let collection = EntityKind::Category.collection();

        let categories = self
            .entities
            .list(tenant_id, collection)
            .await
            .map_err(|e| SyncError::CategoryResolution(e.to_string()))?;

        let existing = categories.iter().find(|row| {
            let Some(map) = row.payload.as_object() else {
                return false;
            };
            let name_matches = validation::str_field(map, "name")
                .is_some_and(|n| n.eq_ignore_ascii_case(&name));
            let branch_matches =
                validation::str_field(map, "branchId").map_or(true, |b| b == branch_id);
            name_matches && branch_matches
        });

        let category_id = match existing {
            Some(row) => row.id.clone(),
            None => {
                debug!(tenant_id, branch_id, name = %name, "Creating fallback category");

                let mut seed = JsonMap::new();
                seed.insert("id".to_string(), Value::String(token::new_id()));
                seed.insert("name".to_string(), Value::String(name));

                let record = self
                    .build_record(
                        descriptor(EntityKind::Category),
                        tenant_id,
                        Some(branch_id),
                        seed,
                    )
                    .await?;
                let id = record
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();

                self.entities
                    .insert(tenant_id, collection, &id, &record)
                    .await
                    .map_err(|e| SyncError::CategoryResolution(e.to_string()))?;
                id
            }
        };

        memo.insert(branch_id.to_string(), category_id.clone());
        Ok(category_id)
    }

    /// Generates an account number not yet in use for this tenant.
    async fn unique_account_number(&self, tenant_id: &str) -> SyncResult<String> {
        let collection = EntityKind::CustomerAccount.collection();

        for _ in 0..ACCOUNT_NUMBER_ATTEMPTS {
            let candidate = token::generate_account_number();
            let hits = self
                .entities
                .find_by_field(tenant_id, collection, "accountNumber", &candidate)
                .await?;
            if hits.is_empty() {
                return Ok(candidate);
            }
        }

        Err(SyncError::Internal(
            "could not generate an unused account number".into(),
        ))
    }

    // =========================================================================
    // App Settings
    // =========================================================================

    /// Stores the tenant's opaque settings document verbatim under a fixed
    /// id. A re-submission replaces the document wholesale.
    async fn reconcile_app_settings(
        &self,
        tenant_id: &str,
        item: Value,
    ) -> SyncResult<ReconcileOutcome> {
        validation::as_object(&item)?;

        let collection = EntityKind::AppSettings.collection();
        let existing = self
            .entities
            .get(tenant_id, collection, APP_SETTINGS_DOC_ID)
            .await?;

        match existing {
            Some(row) => {
                let desc = descriptor(EntityKind::AppSettings);
                let incoming = item.as_object().cloned().unwrap_or_default();
                let merged = self.apply_update(desc, row.payload, incoming);
                self.entities
                    .update(tenant_id, collection, APP_SETTINGS_DOC_ID, &merged)
                    .await?;
                Ok(ReconcileOutcome::Updated)
            }
            None => {
                self.entities
                    .insert(tenant_id, collection, APP_SETTINGS_DOC_ID, &item)
                    .await?;
                Ok(ReconcileOutcome::Created)
            }
        }
    }
}

/// Fills in computed line totals on a sale's `items` array.
fn complete_sale_lines(map: &mut JsonMap) {
    if let Some(Value::Array(lines)) = map.get_mut("items") {
        for line in lines {
            validation::complete_sale_line(line);
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

    async fn engine() -> (ReconcileEngine, Database) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let engine = ReconcileEngine::new(&db, Arc::new(SyncConfig::default()));
        (engine, db)
    }

    fn summary(created: u64, updated: u64, skipped: u64, errors: u64) -> ReconcileSummary {
        ReconcileSummary {
            created,
            updated,
            skipped,
            errors,
        }
    }

    #[tokio::test]
    async fn unseen_id_creates_then_known_id_updates() {
        let (engine, db) = engine().await;

        let first = engine
            .reconcile(
                EntityKind::Product,
                "t1",
                vec![json!({"id": "p1", "name": "Tea", "price": 25, "categoryId": "c1"})],
            )
            .await
            .unwrap();
        assert_eq!(first, summary(1, 0, 0, 0));

        let second = engine
            .reconcile(
                EntityKind::Product,
                "t1",
                vec![json!({"id": "p1", "name": "Tea", "price": 30, "categoryId": "c1"})],
            )
            .await
            .unwrap();
        assert_eq!(second, summary(0, 1, 0, 0));

        let stored = db
            .entities()
            .get("t1", "products", "p1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payload["price"], json!(30));
        assert_eq!(stored.payload["tenantId"], json!("t1"));
    }

    #[tokio::test]
    async fn update_preserves_identity_and_absent_fields() {
        let (engine, db) = engine().await;

        engine
            .reconcile(
                EntityKind::Product,
                "t1",
                vec![json!({
                    "id": "p1", "name": "Tea", "price": 25,
                    "categoryId": "c1", "branchId": "b1"
                })],
            )
            .await
            .unwrap();

        let before = db
            .entities()
            .get("t1", "products", "p1")
            .await
            .unwrap()
            .unwrap();

        // Partial re-submission: only the price changes.
        engine
            .reconcile(
                EntityKind::Product,
                "t1",
                vec![json!({"id": "p1", "name": "Tea", "price": 40, "tenantId": "evil"})],
            )
            .await
            .unwrap();

        let after = db
            .entities()
            .get("t1", "products", "p1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(after.payload["price"], json!(40));
        // Fields absent from the re-submission survive.
        assert_eq!(after.payload["branchId"], json!("b1"));
        assert_eq!(after.payload["categoryId"], json!("c1"));
        // Immutable fields cannot be overwritten.
        assert_eq!(after.payload["tenantId"], json!("t1"));
        assert_eq!(after.payload["createdAt"], before.payload["createdAt"]);
    }

    #[tokio::test]
    async fn invalid_items_are_counted_not_fatal() {
        let (engine, _db) = engine().await;

        let result = engine
            .reconcile(
                EntityKind::Branch,
                "t1",
                vec![
                    json!({"id": "b1", "name": "Downtown"}),
                    json!({"id": "b2"}),
                    json!("not an object"),
                    json!({"id": "b3", "name": "Airport"}),
                ],
            )
            .await
            .unwrap();

        assert_eq!(result, summary(2, 0, 0, 2));
        assert_eq!(result.total(), 4);
    }

    #[tokio::test]
    async fn product_without_category_gets_the_fallback() {
        let (engine, db) = engine().await;

        let result = engine
            .reconcile(
                EntityKind::Product,
                "t1",
                vec![json!({"id": "p1", "name": "Tea", "price": 25, "branchId": "b1"})],
            )
            .await
            .unwrap();
        assert_eq!(result, summary(1, 0, 0, 0));

        let categories = db.entities().list("t1", "categories").await.unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].payload["name"], json!("General"));
        assert_eq!(categories[0].payload["branchId"], json!("b1"));

        let product = db
            .entities()
            .get("t1", "products", "p1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            product.payload["categoryId"],
            json!(categories[0].id.clone())
        );
    }

    #[tokio::test]
    async fn fallback_category_is_created_exactly_once() {
        let (engine, db) = engine().await;

        // Two category-less products in one batch, then the batch again.
        let batch = vec![
            json!({"id": "p1", "name": "Tea", "branchId": "b1"}),
            json!({"id": "p2", "name": "Coffee", "branchId": "b1"}),
        ];

        engine
            .reconcile(EntityKind::Product, "t1", batch.clone())
            .await
            .unwrap();
        engine
            .reconcile(EntityKind::Product, "t1", batch)
            .await
            .unwrap();

        assert_eq!(db.entities().count("t1", "categories").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn fallback_reuses_a_renamed_lowercase_category() {
        let (engine, db) = engine().await;

        engine
            .reconcile(
                EntityKind::Category,
                "t1",
                vec![json!({"id": "c7", "name": "general", "branchId": "b1"})],
            )
            .await
            .unwrap();

        engine
            .reconcile(
                EntityKind::Product,
                "t1",
                vec![json!({"id": "p1", "name": "Tea", "branchId": "b1"})],
            )
            .await
            .unwrap();

        // Case-insensitive lookup found the existing category.
        assert_eq!(db.entities().count("t1", "categories").await.unwrap(), 1);
        let product = db
            .entities()
            .get("t1", "products", "p1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.payload["categoryId"], json!("c7"));
    }

    #[tokio::test]
    async fn menu_item_without_category_is_rejected() {
        let (engine, db) = engine().await;

        let result = engine
            .reconcile(
                EntityKind::MenuItem,
                "t1",
                vec![json!({"id": "m1", "name": "Latte"})],
            )
            .await
            .unwrap();

        assert_eq!(result, summary(0, 0, 0, 1));
        assert!(db
            .entities()
            .get("t1", "menu_items", "m1")
            .await
            .unwrap()
            .is_none());
        // No fallback category was materialized either.
        assert_eq!(db.entities().count("t1", "categories").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn creation_defaults_are_applied() {
        let (engine, db) = engine().await;

        engine
            .reconcile(
                EntityKind::Product,
                "t1",
                vec![json!({"id": "p1", "name": "Tea", "categoryId": "c1"})],
            )
            .await
            .unwrap();

        let product = db
            .entities()
            .get("t1", "products", "p1")
            .await
            .unwrap()
            .unwrap();
        let payload = &product.payload;

        assert_eq!(payload["price"], json!(0));
        assert_eq!(payload["stockQuantity"], json!(0));
        assert_eq!(payload["unit"], json!("pcs"));
        assert_eq!(payload["taxRate"], json!(10.0));
        assert_eq!(payload["isActive"], json!(true));
        assert_eq!(payload["branchId"], json!("default-branch"));
        assert!(payload["sku"].as_str().unwrap().starts_with("SKU-"));
        assert!(payload["createdAt"].is_string());
    }

    #[tokio::test]
    async fn customer_account_number_is_generated_and_kept() {
        let (engine, db) = engine().await;

        engine
            .reconcile(
                EntityKind::CustomerAccount,
                "t1",
                vec![json!({"id": "c1", "customerName": "Ayşe"})],
            )
            .await
            .unwrap();

        let account = db
            .entities()
            .get("t1", "customer_accounts", "c1")
            .await
            .unwrap()
            .unwrap();
        let number = account.payload["accountNumber"].as_str().unwrap();

        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ACC");
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert!(parts[2].chars().all(|c| c.is_ascii_alphanumeric()));

        assert_eq!(account.payload["isActive"], json!(true));

        // A re-submission never regenerates the account number, and the
        // active flag follows the status enumeration.
        engine
            .reconcile(
                EntityKind::CustomerAccount,
                "t1",
                vec![json!({
                    "id": "c1", "customerName": "Ayşe", "status": "frozen",
                    "accountNumber": "ACC-0-hack"
                })],
            )
            .await
            .unwrap();

        let updated = db
            .entities()
            .get("t1", "customer_accounts", "c1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.payload["accountNumber"], json!(number));
        assert_eq!(updated.payload["isActive"], json!(false));
    }

    #[tokio::test]
    async fn sale_with_no_valid_lines_is_rejected() {
        let (engine, _db) = engine().await;

        let result = engine
            .upsert_sales(
                "t1",
                vec![
                    json!({"id": "s1", "total": 50, "items": []}),
                    json!({"id": "s2", "total": 10, "items": [{"quantity": 2}]}),
                    json!({"id": "s3", "total": 10}),
                ],
            )
            .await
            .unwrap();

        assert_eq!(result, summary(0, 0, 0, 3));
    }

    #[tokio::test]
    async fn ingest_sales_skips_known_ids() {
        let (engine, db) = engine().await;

        let sale = json!({
            "id": "s1", "total": 50,
            "items": [{"productId": "p1", "quantity": 2, "unitPrice": 25}]
        });

        let first = engine.ingest_sales("t1", vec![sale.clone()]).await.unwrap();
        assert_eq!(first, summary(1, 0, 0, 0));

        let mut replay = sale.clone();
        replay["total"] = json!(999);
        let second = engine.ingest_sales("t1", vec![replay]).await.unwrap();
        assert_eq!(second, summary(0, 0, 1, 0));

        // The stored sale still carries the original total.
        let stored = db.entities().get("t1", "sales", "s1").await.unwrap().unwrap();
        assert_eq!(stored.payload["total"], json!(50));
    }

    #[tokio::test]
    async fn upsert_sales_updates_known_ids() {
        let (engine, db) = engine().await;

        let sale = json!({
            "id": "s1", "total": 50,
            "items": [{"productId": "p1", "quantity": 2, "unitPrice": 25}]
        });

        let first = engine.upsert_sales("t1", vec![sale.clone()]).await.unwrap();
        assert_eq!(first, summary(1, 0, 0, 0));

        let mut revised = sale;
        revised["total"] = json!(60);
        let second = engine.upsert_sales("t1", vec![revised]).await.unwrap();
        assert_eq!(second, summary(0, 1, 0, 0));

        let stored = db.entities().get("t1", "sales", "s1").await.unwrap().unwrap();
        assert_eq!(stored.payload["total"], json!(60));
    }

    #[tokio::test]
    async fn sale_line_totals_are_computed() {
        let (engine, db) = engine().await;

        engine
            .upsert_sales(
                "t1",
                vec![json!({
                    "id": "s1",
                    "items": [{"productId": "p1", "quantity": 3, "unitPrice": 2.5}]
                })],
            )
            .await
            .unwrap();

        let stored = db.entities().get("t1", "sales", "s1").await.unwrap().unwrap();
        assert_eq!(stored.payload["items"][0]["lineTotal"].as_f64(), Some(7.5));
        assert!(stored.payload["saleNumber"]
            .as_str()
            .unwrap()
            .starts_with("SALE-"));
    }

    #[tokio::test]
    async fn app_settings_are_stored_verbatim_and_replaced() {
        let (engine, db) = engine().await;

        let first = engine
            .reconcile_singleton(
                EntityKind::AppSettings,
                "t1",
                json!({"theme": "dark", "receipt": {"footer": "Thanks!"}}),
            )
            .await
            .unwrap();
        assert_eq!(first, summary(1, 0, 0, 0));

        let second = engine
            .reconcile_singleton(EntityKind::AppSettings, "t1", json!({"theme": "light"}))
            .await
            .unwrap();
        assert_eq!(second, summary(0, 1, 0, 0));

        let stored = db
            .entities()
            .get("t1", "app_settings", APP_SETTINGS_DOC_ID)
            .await
            .unwrap()
            .unwrap();
        // Replacement, not merge: the old receipt block is gone.
        assert_eq!(stored.payload, json!({"theme": "light"}));
    }

    #[tokio::test]
    async fn cash_register_singleton_upserts() {
        let (engine, db) = engine().await;

        engine
            .reconcile_singleton(
                EntityKind::CashRegister,
                "t1",
                json!({"id": "reg-b1-20260807", "openingBalance": 200, "branchId": "b1"}),
            )
            .await
            .unwrap();

        engine
            .reconcile_singleton(
                EntityKind::CashRegister,
                "t1",
                json!({"id": "reg-b1-20260807", "isOpen": false, "closingBalance": 450}),
            )
            .await
            .unwrap();

        let stored = db
            .entities()
            .get("t1", "cash_registers", "reg-b1-20260807")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payload["openingBalance"], json!(200));
        assert_eq!(stored.payload["closingBalance"], json!(450));
        assert_eq!(stored.payload["isOpen"], json!(false));
        assert_eq!(stored.payload["cashTotal"], json!(0));
    }

    #[tokio::test]
    async fn blank_tenant_is_an_invalid_request() {
        let (engine, _db) = engine().await;

        let err = engine
            .reconcile(EntityKind::Branch, "  ", vec![json!({"id": "b1", "name": "X"})])
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::InvalidRequest(_)));
    }
}
