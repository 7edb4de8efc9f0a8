//! # Desktop-Local Adapter
//!
//! Delegates storage operations to an out-of-process desktop host via
//! message passing. When no host is available the adapter falls back to the
//! local persistent store; the fallback is invisible to callers.
//!
//! ## Message Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Desktop Delegation                                │
//! │                                                                         │
//! │  DesktopAdapter::get("k1")                                             │
//! │       │                                                                 │
//! │       ├── host bridge present ──► BridgeRequest::Get over channel      │
//! │       │                               │                                 │
//! │       │                               ▼                                 │
//! │       │                        host process answers with               │
//! │       │                        BridgeResponse::Value(...)              │
//! │       │                                                                 │
//! │       └── no host detected ──► LocalFileAdapter (same root dir)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::adapter::StorageAdapter;
use crate::error::{StoreError, StoreResult};
use crate::local::LocalFileAdapter;

// =============================================================================
// Bridge Protocol
// =============================================================================

/// A storage request forwarded to the desktop host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BridgeRequest {
    Get { key: String },
    Set { key: String, value: Value },
    Remove { key: String },
    Clear,
    Keys,
}

/// The host's answer to a [`BridgeRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BridgeResponse {
    Value { value: Option<Value> },
    Done,
    Keys { keys: Vec<String> },
}

/// Transport to the out-of-process host.
#[async_trait]
pub trait HostBridge: Send + Sync {
    /// Sends one request and awaits the host's response.
    async fn request(&self, request: BridgeRequest) -> StoreResult<BridgeResponse>;
}

/// A request envelope paired with its response channel.
pub struct BridgeEnvelope {
    pub request: BridgeRequest,
    pub respond: oneshot::Sender<StoreResult<BridgeResponse>>,
}

/// Channel-based [`HostBridge`]: requests are queued to a host task that
/// answers each envelope on its oneshot channel. The desktop shell owns the
/// receiving end.
#[derive(Clone)]
pub struct ChannelHostBridge {
    tx: mpsc::Sender<BridgeEnvelope>,
}

impl ChannelHostBridge {
    /// Creates a bridge and the receiver the host side serves.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<BridgeEnvelope>) {
        let (tx, rx) = mpsc::channel(capacity);
        (ChannelHostBridge { tx }, rx)
    }
}

#[async_trait]
impl HostBridge for ChannelHostBridge {
    async fn request(&self, request: BridgeRequest) -> StoreResult<BridgeResponse> {
        let (respond, response_rx) = oneshot::channel();

        self.tx
            .send(BridgeEnvelope { request, respond })
            .await
            .map_err(|_| StoreError::Bridge("host channel closed".into()))?;

        response_rx
            .await
            .map_err(|_| StoreError::Bridge("host dropped the request".into()))?
    }
}

// =============================================================================
// Desktop Adapter
// =============================================================================

enum DesktopInner {
    Bridge(Arc<dyn HostBridge>),
    Fallback(LocalFileAdapter),
}

/// Desktop-local storage adapter with transparent fallback.
pub struct DesktopAdapter {
    inner: DesktopInner,
}

impl DesktopAdapter {
    /// Opens the adapter. With a host bridge, every operation delegates to
    /// the host; without one, a [`LocalFileAdapter`] rooted at `root` takes
    /// over and callers cannot tell the difference.
    pub async fn open(
        root: impl Into<PathBuf>,
        bridge: Option<Arc<dyn HostBridge>>,
    ) -> StoreResult<Self> {
        let inner = match bridge {
            Some(bridge) => {
                debug!("Desktop host detected, delegating storage");
                DesktopInner::Bridge(bridge)
            }
            None => {
                debug!("No desktop host, falling back to local store");
                DesktopInner::Fallback(LocalFileAdapter::open(root).await?)
            }
        };

        Ok(DesktopAdapter { inner })
    }

    async fn delegate(&self, request: BridgeRequest) -> StoreResult<BridgeResponse> {
        match &self.inner {
            DesktopInner::Bridge(bridge) => bridge.request(request).await,
            DesktopInner::Fallback(_) => {
                // delegate() is only called on the bridge path
                Err(StoreError::Bridge("no host bridge attached".into()))
            }
        }
    }
}

#[async_trait]
impl StorageAdapter for DesktopAdapter {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        match &self.inner {
            DesktopInner::Fallback(local) => local.get(key).await,
            DesktopInner::Bridge(_) => {
                match self.delegate(BridgeRequest::Get { key: key.into() }).await? {
                    BridgeResponse::Value { value } => Ok(value),
                    other => Err(unexpected(&other)),
                }
            }
        }
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        match &self.inner {
            DesktopInner::Fallback(local) => local.set(key, value).await,
            DesktopInner::Bridge(_) => {
                let request = BridgeRequest::Set {
                    key: key.into(),
                    value,
                };
                match self.delegate(request).await? {
                    BridgeResponse::Done => Ok(()),
                    other => Err(unexpected(&other)),
                }
            }
        }
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        match &self.inner {
            DesktopInner::Fallback(local) => local.remove(key).await,
            DesktopInner::Bridge(_) => {
                match self
                    .delegate(BridgeRequest::Remove { key: key.into() })
                    .await?
                {
                    BridgeResponse::Done => Ok(()),
                    other => Err(unexpected(&other)),
                }
            }
        }
    }

    async fn clear(&self) -> StoreResult<()> {
        match &self.inner {
            DesktopInner::Fallback(local) => local.clear().await,
            DesktopInner::Bridge(_) => match self.delegate(BridgeRequest::Clear).await? {
                BridgeResponse::Done => Ok(()),
                other => Err(unexpected(&other)),
            },
        }
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        match &self.inner {
            DesktopInner::Fallback(local) => local.keys().await,
            DesktopInner::Bridge(_) => match self.delegate(BridgeRequest::Keys).await? {
                BridgeResponse::Keys { keys } => Ok(keys),
                other => Err(unexpected(&other)),
            },
        }
    }

    fn name(&self) -> &'static str {
        "desktop"
    }
}

fn unexpected(response: &BridgeResponse) -> StoreError {
    StoreError::Bridge(format!("unexpected host response: {response:?}"))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    /// In-process stand-in for the desktop host: serves bridge requests
    /// from a HashMap.
    fn spawn_host(mut rx: mpsc::Receiver<BridgeEnvelope>) {
        tokio::spawn(async move {
            let mut store: HashMap<String, Value> = HashMap::new();

            while let Some(envelope) = rx.recv().await {
                let response = match envelope.request {
                    BridgeRequest::Get { key } => BridgeResponse::Value {
                        value: store.get(&key).cloned(),
                    },
                    BridgeRequest::Set { key, value } => {
                        store.insert(key, value);
                        BridgeResponse::Done
                    }
                    BridgeRequest::Remove { key } => {
                        store.remove(&key);
                        BridgeResponse::Done
                    }
                    BridgeRequest::Clear => {
                        store.clear();
                        BridgeResponse::Done
                    }
                    BridgeRequest::Keys => {
                        let mut keys: Vec<String> = store.keys().cloned().collect();
                        keys.sort();
                        BridgeResponse::Keys { keys }
                    }
                };
                let _ = envelope.respond.send(Ok(response));
            }
        });
    }

    #[tokio::test]
    async fn delegates_to_host_when_bridge_present() {
        let (bridge, rx) = ChannelHostBridge::new(8);
        spawn_host(rx);

        let dir = tempfile::tempdir().unwrap();
        let adapter = DesktopAdapter::open(dir.path(), Some(Arc::new(bridge)))
            .await
            .unwrap();

        adapter.set("k1", json!({"a": 1})).await.unwrap();
        assert_eq!(adapter.get("k1").await.unwrap(), Some(json!({"a": 1})));
        assert_eq!(adapter.keys().await.unwrap(), vec!["k1"]);

        adapter.remove("k1").await.unwrap();
        assert_eq!(adapter.get("k1").await.unwrap(), None);

        // Nothing was written to the fallback directory.
        assert!(!dir.path().join("index.json").exists());
    }

    #[tokio::test]
    async fn falls_back_to_local_store_without_host() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = DesktopAdapter::open(dir.path(), None).await.unwrap();

        adapter.set("k1", json!(7)).await.unwrap();
        assert_eq!(adapter.get("k1").await.unwrap(), Some(json!(7)));
        assert_eq!(adapter.keys().await.unwrap(), vec!["k1"]);
    }

    #[tokio::test]
    async fn dead_host_surfaces_a_bridge_error() {
        let (bridge, rx) = ChannelHostBridge::new(1);
        drop(rx);

        let dir = tempfile::tempdir().unwrap();
        let adapter = DesktopAdapter::open(dir.path(), Some(Arc::new(bridge)))
            .await
            .unwrap();

        let err = adapter.get("k1").await.unwrap_err();
        assert!(matches!(err, StoreError::Bridge(_)));
        assert!(err.is_transport());
    }

    #[test]
    fn bridge_protocol_serializes() {
        let request = BridgeRequest::Set {
            key: "k1".into(),
            value: json!({"a": 1}),
        };
        let wire = serde_json::to_string(&request).unwrap();
        assert!(wire.contains("\"op\":\"set\""));

        let parsed: BridgeRequest = serde_json::from_str(&wire).unwrap();
        assert!(matches!(parsed, BridgeRequest::Set { .. }));
    }
}
