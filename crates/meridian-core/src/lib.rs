//! # meridian-core: Pure Domain Logic for Meridian POS
//!
//! This crate is the foundation of the Meridian data-sync core. It knows the
//! shape of every reconciled entity (required fields, derived flags, token
//! formats) without performing any I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Meridian POS Architecture                          │
//! │                                                                         │
//! │  Client batch (JSON)                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  meridian-sync (reconciliation engine)                                 │
//! │       │            uses ──────────────────────────┐                    │
//! │       ▼                                           ▼                    │
//! │  meridian-db (backend store)          ★ meridian-core (THIS CRATE) ★   │
//! │                                                                         │
//! │  NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`entity`] - Entity kinds, reconcile summaries, sale policies
//! - [`error`] - Validation error types
//! - [`validation`] - Payload validation over JSON objects
//! - [`token`] - Generated business tokens (account numbers, PINs, SKUs)

// =============================================================================
// Module Declarations
// =============================================================================

pub mod entity;
pub mod error;
pub mod token;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use entity::{EntityKind, ReconcileOutcome, ReconcileSummary, SalePolicy};
pub use error::ValidationError;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Sentinel branch id assigned to records submitted without one.
///
/// Branch assignment is advisory at this layer; the sentinel keeps every
/// branch-scoped record queryable by branch without rejecting early batches
/// sent before the client knows its branch.
pub const DEFAULT_BRANCH_ID: &str = "default-branch";

/// Fixed document id under which a tenant's opaque settings blob is stored.
pub const APP_SETTINGS_DOC_ID: &str = "app-settings";

/// Display name given to the auto-created fallback category when a product
/// arrives without a category reference. Lookup is case-insensitive, so
/// tenants that renamed the category to "general" keep matching it.
pub const FALLBACK_CATEGORY_NAME: &str = "General";
