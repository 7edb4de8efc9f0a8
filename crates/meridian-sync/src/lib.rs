//! # meridian-sync: Reconciliation Engine for Meridian POS
//!
//! Client devices work offline against in-memory collections and push their
//! records in batches. This crate merges those batches into the backend
//! store idempotently, republishes denormalized projections into the
//! document store, and lazily write-through-syncs collections the client
//! mutates.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Meridian Sync Data Flow                             │
//! │                                                                         │
//! │  client mutation ──► in-memory state                                   │
//! │        │                                                                │
//! │        ├──► StorageAdapter persists the document-store representation  │
//! │        │                                                                │
//! │        └──► WriteThroughSync (debounced) ──► ReconcileEngine           │
//! │                                                  │                      │
//! │                                                  ▼                      │
//! │                                          backend store (entity rows)   │
//! │                                                  │                      │
//! │                     Propagator ◄─────────────────┘                      │
//! │                          │                                              │
//! │                          ▼                                              │
//! │            document store: {tenantId}_{collection} projections         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`engine`] - descriptor-driven idempotent upsert reconciliation
//! - [`descriptor`] - per-entity strategy table (required fields, defaults)
//! - [`propagate`] - backend rows → document-store projections
//! - [`push`] - debounced write-through with observable failure counters
//! - [`http`] - axum batch endpoints
//! - [`config`] - TOML-backed sync configuration

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod http;
pub mod propagate;
pub mod push;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::SyncConfig;
pub use engine::ReconcileEngine;
pub use error::{SyncError, SyncResult};
pub use propagate::{PropagateSummary, Propagator};
pub use push::{PushTarget, WriteThroughSync};
