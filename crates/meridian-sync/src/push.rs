//! # Debounced Write-Through Sync
//!
//! Watches client collections and lazily pushes changed records to the
//! reconciliation target without blocking state updates.
//!
//! ## Debounce Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  observe(products, v1) ──► timer armed (quiet period)                  │
//! │  observe(products, v2) ──► v1's timer cancelled, new timer armed       │
//! │  observe(products, v3) ──► v2's timer cancelled, new timer armed       │
//! │            ...quiet period elapses...                                   │
//! │  v3 pushed ──► each array element upserted individually                │
//! │                                                                         │
//! │  Only the newest value within a burst is ever pushed; one pending      │
//! │  timer per collection key exists at a time.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Per-element push failures are caught, logged, and counted in an
//! observable failure counter; they never surface to the caller and never
//! abort sibling element pushes.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use meridian_core::{token, validation, EntityKind};

use crate::config::SyncConfig;
use crate::engine::ReconcileEngine;
use crate::error::{SyncError, SyncResult};

// =============================================================================
// Push Target
// =============================================================================

/// Receiver of individual record pushes.
///
/// The production target is the reconciliation engine; tests substitute a
/// recording implementation.
#[async_trait]
pub trait PushTarget: Send + Sync {
    /// Upserts one record of the given kind.
    async fn push(&self, kind: EntityKind, tenant_id: &str, item: Value) -> SyncResult<()>;
}

#[async_trait]
impl PushTarget for ReconcileEngine {
    async fn push(&self, kind: EntityKind, tenant_id: &str, item: Value) -> SyncResult<()> {
        let summary = match kind {
            // Lazy client pushes are idempotent ingestion: a sale the
            // backend already knows is skipped, never overwritten.
            EntityKind::Sale => self.ingest_sales(tenant_id, vec![item]).await?,
            kind if kind.is_singleton() => {
                self.reconcile_singleton(kind, tenant_id, item).await?
            }
            kind => self.reconcile(kind, tenant_id, vec![item]).await?,
        };

        if summary.errors > 0 {
            return Err(SyncError::Internal(format!(
                "item rejected by {kind} reconciliation"
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Write-Through Sync
// =============================================================================

/// Debounced write-through scheduler.
pub struct WriteThroughSync {
    target: Arc<dyn PushTarget>,
    quiet_period: Duration,
    allow_list: HashSet<String>,
    pending: Mutex<HashMap<String, JoinHandle<()>>>,
    pushed: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl WriteThroughSync {
    /// Creates a scheduler with the configured quiet period and allow-list.
    pub fn new(target: Arc<dyn PushTarget>, config: &SyncConfig) -> Self {
        WriteThroughSync {
            target,
            quiet_period: Duration::from_millis(config.push.quiet_period_ms),
            allow_list: config.push.allow_list.iter().cloned().collect(),
            pending: Mutex::new(HashMap::new()),
            pushed: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Observes a new value for a collection key.
    ///
    /// Keys outside the allow-list are ignored. A pending push for the same
    /// key is superseded: its timer is cancelled and a fresh quiet period
    /// starts for this value.
    pub fn observe(&self, collection: &str, tenant_id: &str, branch_id: &str, value: Value) {
        if !self.allow_list.contains(collection) {
            debug!(collection, "Collection not sync-eligible, ignoring");
            return;
        }

        let Some(kind) = EntityKind::from_collection(collection) else {
            warn!(collection, "Allow-listed collection has no entity kind");
            return;
        };

        let target = self.target.clone();
        let quiet = self.quiet_period;
        let tenant = tenant_id.to_string();
        let branch = branch_id.to_string();
        let pushed = self.pushed.clone();
        let failed = self.failed.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            push_value(target, kind, &tenant, &branch, value, pushed, failed).await;
        });

        let mut pending = self.pending.lock().expect("pending lock poisoned");
        if let Some(previous) = pending.insert(collection.to_string(), handle) {
            previous.abort();
        }
    }

    /// Number of pushes that completed successfully.
    pub fn pushed_count(&self) -> u64 {
        self.pushed.load(Ordering::Relaxed)
    }

    /// Number of per-element pushes that failed. Failures are never
    /// surfaced to the observer; this counter is how they stay observable.
    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Number of collections with a push still pending.
    pub fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .expect("pending lock poisoned")
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Awaits every currently pending push (fired or cancelled). For
    /// shutdown and tests.
    pub async fn flush(&self) {
        let drained: Vec<JoinHandle<()>> = {
            let mut pending = self.pending.lock().expect("pending lock poisoned");
            pending.drain().map(|(_, handle)| handle).collect()
        };

        for handle in drained {
            // Cancelled timers resolve as JoinError; that is expected.
            let _ = handle.await;
        }
    }
}

/// Pushes a fired value: arrays element by element, anything else as one
/// record. Elements without an id get a generated one (create vs. update is
/// the target's concern; presence of an id is the caller's signal).
async fn push_value(
    target: Arc<dyn PushTarget>,
    kind: EntityKind,
    tenant_id: &str,
    branch_id: &str,
    value: Value,
    pushed: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
) {
    let items = match value {
        Value::Array(items) => items,
        other => vec![other],
    };

    for mut item in items {
        if let Some(map) = item.as_object_mut() {
            if validation::is_absent(map, "id") {
                map.insert("id".to_string(), Value::String(token::new_id()));
            }
            if validation::is_absent(map, "branchId") && !branch_id.is_empty() {
                map.insert("branchId".to_string(), Value::String(branch_id.to_string()));
            }
        }

        match target.push(kind, tenant_id, item).await {
            Ok(()) => {
                pushed.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                warn!(kind = %kind, tenant_id, error = %e, "Write-through push failed");
                failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Records every pushed item; optionally fails each push.
    struct RecordingTarget {
        items: Mutex<Vec<(EntityKind, String, Value)>>,
        fail: bool,
    }

    impl RecordingTarget {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(RecordingTarget {
                items: Mutex::new(Vec::new()),
                fail,
            })
        }

        fn recorded(&self) -> Vec<(EntityKind, String, Value)> {
            self.items.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PushTarget for RecordingTarget {
        async fn push(&self, kind: EntityKind, tenant_id: &str, item: Value) -> SyncResult<()> {
            self.items
                .lock()
                .unwrap()
                .push((kind, tenant_id.to_string(), item));
            if self.fail {
                return Err(SyncError::Internal("simulated push failure".into()));
            }
            Ok(())
        }
    }

    fn sync(target: Arc<RecordingTarget>) -> WriteThroughSync {
        WriteThroughSync::new(target, &SyncConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_latest_value_in_a_burst_is_pushed() {
        let target = RecordingTarget::new(false);
        let sync = sync(target.clone());

        sync.observe("products", "t1", "b1", json!([{"id": "p1", "name": "v1"}]));
        sync.observe("products", "t1", "b1", json!([{"id": "p1", "name": "v2"}]));
        sync.observe("products", "t1", "b1", json!([{"id": "p1", "name": "v3"}]));

        sync.flush().await;

        let recorded = target.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].2["name"], json!("v3"));
        assert_eq!(sync.pushed_count(), 1);
        assert_eq!(sync.failed_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn a_change_after_the_quiet_period_pushes_again() {
        let target = RecordingTarget::new(false);
        let sync = sync(target.clone());

        sync.observe("products", "t1", "b1", json!([{"id": "p1", "name": "v1"}]));
        sync.flush().await;

        sync.observe("products", "t1", "b1", json!([{"id": "p1", "name": "v2"}]));
        sync.flush().await;

        assert_eq!(target.recorded().len(), 2);
        assert_eq!(sync.pushed_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn array_elements_are_pushed_individually() {
        let target = RecordingTarget::new(false);
        let sync = sync(target.clone());

        sync.observe(
            "products",
            "t1",
            "b1",
            json!([
                {"id": "p1", "name": "Tea"},
                {"name": "Coffee"},
            ]),
        );
        sync.flush().await;

        let recorded = target.recorded();
        assert_eq!(recorded.len(), 2);

        // The id-less element was assigned a generated id and the branch
        // context was stamped.
        assert!(recorded[1].2["id"].as_str().is_some());
        assert_eq!(recorded[1].2["branchId"], json!("b1"));
        assert_eq!(recorded[0].2["id"], json!("p1"));
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_counted_and_do_not_stop_siblings() {
        let target = RecordingTarget::new(true);
        let sync = sync(target.clone());

        sync.observe(
            "products",
            "t1",
            "b1",
            json!([{"id": "p1"}, {"id": "p2"}, {"id": "p3"}]),
        );
        sync.flush().await;

        // Every sibling was still attempted.
        assert_eq!(target.recorded().len(), 3);
        assert_eq!(sync.failed_count(), 3);
        assert_eq!(sync.pushed_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn non_allow_listed_collections_are_ignored() {
        let target = RecordingTarget::new(false);
        let sync = sync(target.clone());

        sync.observe("tables", "t1", "b1", json!([{"id": "tb1"}]));
        sync.flush().await;

        assert!(target.recorded().is_empty());
        assert_eq!(sync.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn independent_collections_debounce_independently() {
        let target = RecordingTarget::new(false);
        let sync = sync(target.clone());

        sync.observe("products", "t1", "b1", json!([{"id": "p1"}]));
        sync.observe("categories", "t1", "b1", json!([{"id": "c1"}]));
        sync.flush().await;

        let kinds: Vec<EntityKind> = target.recorded().iter().map(|(k, _, _)| *k).collect();
        assert!(kinds.contains(&EntityKind::Product));
        assert!(kinds.contains(&EntityKind::Category));
    }
}
