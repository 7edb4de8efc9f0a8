//! # meridian-db: Backend Store for Meridian POS
//!
//! SQLite-backed authoritative store. The reconciliation engine merges
//! client batches into [`repository::entity::EntityRepository`]; the
//! relational storage adapter reads and writes tenant-scoped documents
//! through [`repository::document::DocumentRepository`].
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Meridian Data Flow                               │
//! │                                                                         │
//! │  meridian-sync (reconcile / propagate)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    meridian-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌──────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │   │   Repositories   │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │◄──│ entity/document  │   │  (embedded)  │  │   │
//! │  │   └───────────────┘   └──────────────────┘   └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL mode, foreign keys on)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meridian_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("meridian.db")).await?;
//! let row = db.entities().get("t1", "products", "p1").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::document::DocumentRepository;
pub use repository::entity::{EntityRepository, EntityRow};
