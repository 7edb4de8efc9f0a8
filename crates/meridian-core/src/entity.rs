//! # Entity Kinds and Reconcile Results
//!
//! The reconciliation engine merges batches of schemaless JSON records, one
//! entity kind at a time. This module enumerates the kinds, the per-batch
//! result summary, and the two sale ingestion policies.
//!
//! ## Dual-Key Identity Pattern
//! Every reconciled record has:
//! - `id`: the merge key - immutable, assigned by the client or generated
//! - a business identifier (sku, accountNumber, saleNumber, ...) - human
//!   readable, generated when absent

use serde::{Deserialize, Serialize};

// =============================================================================
// Entity Kind
// =============================================================================

/// Every entity kind the reconciliation engine knows how to merge.
///
/// Collection kinds take an array of records per batch; singleton kinds
/// (`CashRegister`, `AppSettings`) take a single object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Branch,
    Category,
    Product,
    Employee,
    CustomerAccount,
    MenuItem,
    Sale,
    Table,
    TableSection,
    CashRegister,
    AppSettings,
}

impl EntityKind {
    /// All kinds, in reconciliation-friendly order (referenced collections
    /// before referencing ones).
    pub const ALL: [EntityKind; 11] = [
        EntityKind::Branch,
        EntityKind::Category,
        EntityKind::Product,
        EntityKind::Employee,
        EntityKind::CustomerAccount,
        EntityKind::MenuItem,
        EntityKind::Sale,
        EntityKind::Table,
        EntityKind::TableSection,
        EntityKind::CashRegister,
        EntityKind::AppSettings,
    ];

    /// Canonical collection name, used as the backend-store collection id and
    /// as the suffix of propagated document keys (`{tenantId}_{collection}`).
    pub const fn collection(&self) -> &'static str {
        match self {
            EntityKind::Branch => "branches",
            EntityKind::Category => "categories",
            EntityKind::Product => "products",
            EntityKind::Employee => "employees",
            EntityKind::CustomerAccount => "customer_accounts",
            EntityKind::MenuItem => "menu_items",
            EntityKind::Sale => "sales",
            EntityKind::Table => "tables",
            EntityKind::TableSection => "table_sections",
            EntityKind::CashRegister => "cash_registers",
            EntityKind::AppSettings => "app_settings",
        }
    }

    /// Parses a collection name (hyphenated route segments accepted).
    pub fn from_collection(name: &str) -> Option<EntityKind> {
        let normalized = name.trim().replace('-', "_");
        EntityKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.collection() == normalized)
    }

    /// Singleton kinds accept one object per request instead of an array.
    pub const fn is_singleton(&self) -> bool {
        matches!(self, EntityKind::CashRegister | EntityKind::AppSettings)
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.collection())
    }
}

// =============================================================================
// Sale Policy
// =============================================================================

/// How the engine treats a sale id that already exists in the backend store.
///
/// Both policies ship deliberately; the caller chooses by entry point.
/// `CreateOrSkip` is idempotent ingestion for immutable, client-finalized
/// sales; `CreateOrUpdate` lets an editing surface re-submit corrected
/// totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalePolicy {
    /// Existing id → count as skipped, never overwrite.
    CreateOrSkip,
    /// Existing id → update in place.
    CreateOrUpdate,
}

// =============================================================================
// Reconcile Summary
// =============================================================================

/// What happened to a single item within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Created,
    Updated,
    Skipped,
}

/// Per-batch result summary.
///
/// One bad item never aborts the batch: it increments `errors` and the
/// remaining items still run, so `created + updated + skipped + errors`
/// always equals the number of submitted items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
    pub errors: u64,
}

impl ReconcileSummary {
    /// Records one item outcome.
    pub fn record(&mut self, outcome: ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Created => self.created += 1,
            ReconcileOutcome::Updated => self.updated += 1,
            ReconcileOutcome::Skipped => self.skipped += 1,
        }
    }

    /// Records one failed item.
    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    /// Total number of items accounted for.
    pub fn total(&self) -> u64 {
        self.created + self.updated + self.skipped + self.errors
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_names_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_collection(kind.collection()), Some(kind));
        }
    }

    #[test]
    fn hyphenated_route_segments_parse() {
        assert_eq!(
            EntityKind::from_collection("customer-accounts"),
            Some(EntityKind::CustomerAccount)
        );
        assert_eq!(
            EntityKind::from_collection("table-sections"),
            Some(EntityKind::TableSection)
        );
        assert_eq!(EntityKind::from_collection("unknown"), None);
    }

    #[test]
    fn singleton_kinds() {
        assert!(EntityKind::CashRegister.is_singleton());
        assert!(EntityKind::AppSettings.is_singleton());
        assert!(!EntityKind::Product.is_singleton());
    }

    #[test]
    fn summary_accounting() {
        let mut summary = ReconcileSummary::default();
        summary.record(ReconcileOutcome::Created);
        summary.record(ReconcileOutcome::Created);
        summary.record(ReconcileOutcome::Updated);
        summary.record(ReconcileOutcome::Skipped);
        summary.record_error();

        assert_eq!(summary.created, 2);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.total(), 5);
    }
}
