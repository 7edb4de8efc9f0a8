//! # HTTP Batch Endpoints
//!
//! Thin axum surface over the reconciliation engine and propagation job.
//!
//! ## Routes
//! ```text
//! POST /sync/sales          create-or-skip   idempotent sale ingestion
//! POST /sync/sales/upsert   create-or-update sale reconciliation
//! POST /sync/{collection}   generic batch reconciliation
//! POST /propagate           backend rows → document-store projections
//! ```
//!
//! ## Status Mapping
//! Batch endpoints answer 200 with embedded counts even when some items
//! failed; only total request malformation (missing tenant id, wrong body
//! shape, unknown collection) yields 4xx, and only an engine-wide
//! unexpected fault yields 5xx.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use meridian_core::{EntityKind, ReconcileSummary, SalePolicy};

use crate::engine::ReconcileEngine;
use crate::error::SyncError;
use crate::propagate::{PropagateSummary, Propagator};

// =============================================================================
// State & Router
// =============================================================================

/// Shared handler state.
#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<ReconcileEngine>,
    pub propagator: Arc<Propagator>,
}

/// Builds the sync router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/sync/sales", post(ingest_sales))
        .route("/sync/sales/upsert", post(upsert_sales))
        .route("/sync/{collection}", post(reconcile_collection))
        .route("/propagate", post(propagate))
        .with_state(state)
}

// =============================================================================
// Wire Shapes
// =============================================================================

/// Batch reconciliation request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    #[serde(default)]
    pub tenant_id: Option<String>,

    /// Array of records for collection kinds; a single object for
    /// singleton kinds.
    #[serde(default)]
    pub items: Option<Value>,
}

#[derive(Debug, Serialize)]
struct SyncResponse {
    success: bool,
    #[serde(flatten)]
    summary: ReconcileSummary,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PropagateRequest {
    #[serde(default)]
    tenant_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct PropagateResponse {
    success: bool,
    #[serde(flatten)]
    counts: PropagateSummary,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

// =============================================================================
// Request Normalization
// =============================================================================

/// Extracts a non-blank tenant id or the client-error message.
fn require_tenant(tenant_id: Option<&str>) -> Result<String, String> {
    match tenant_id.map(str::trim) {
        Some(t) if !t.is_empty() => Ok(t.to_string()),
        _ => Err("tenantId is required".to_string()),
    }
}

/// Normalizes the `items` field: an array for collection kinds, a single
/// object (wrapped) for singleton kinds.
fn batch_items(kind: EntityKind, items: Option<Value>) -> Result<Vec<Value>, String> {
    match (kind.is_singleton(), items) {
        (_, None) => Err("items is required".to_string()),
        (true, Some(item @ Value::Object(_))) => Ok(vec![item]),
        (true, Some(_)) => Err(format!("items must be a single object for {kind}")),
        (false, Some(Value::Array(items))) => Ok(items),
        (false, Some(_)) => Err(format!("items must be an array for {kind}")),
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn reconcile_collection(
    State(state): State<ApiState>,
    Path(collection): Path<String>,
    Json(request): Json<SyncRequest>,
) -> Response {
    let Some(kind) = EntityKind::from_collection(&collection) else {
        return client_error(format!("unknown collection: {collection}"));
    };

    run_reconcile(&state, kind, SalePolicy::CreateOrUpdate, request).await
}

async fn ingest_sales(
    State(state): State<ApiState>,
    Json(request): Json<SyncRequest>,
) -> Response {
    run_reconcile(&state, EntityKind::Sale, SalePolicy::CreateOrSkip, request).await
}

async fn upsert_sales(
    State(state): State<ApiState>,
    Json(request): Json<SyncRequest>,
) -> Response {
    run_reconcile(&state, EntityKind::Sale, SalePolicy::CreateOrUpdate, request).await
}

async fn run_reconcile(
    state: &ApiState,
    kind: EntityKind,
    policy: SalePolicy,
    request: SyncRequest,
) -> Response {
    let tenant_id = match require_tenant(request.tenant_id.as_deref()) {
        Ok(tenant) => tenant,
        Err(message) => return client_error(message),
    };

    let items = match batch_items(kind, request.items) {
        Ok(items) => items,
        Err(message) => return client_error(message),
    };

    let result = match (kind, policy) {
        (EntityKind::Sale, SalePolicy::CreateOrSkip) => {
            state.engine.ingest_sales(&tenant_id, items).await
        }
        (EntityKind::Sale, SalePolicy::CreateOrUpdate) => {
            state.engine.upsert_sales(&tenant_id, items).await
        }
        _ => state.engine.reconcile(kind, &tenant_id, items).await,
    };

    match result {
        Ok(summary) => (
            StatusCode::OK,
            Json(SyncResponse {
                success: true,
                summary,
            }),
        )
            .into_response(),
        Err(e) => engine_error(e),
    }
}

async fn propagate(
    State(state): State<ApiState>,
    Json(request): Json<PropagateRequest>,
) -> Response {
    let tenant_id = match require_tenant(request.tenant_id.as_deref()) {
        Ok(tenant) => tenant,
        Err(message) => return client_error(message),
    };

    match state.propagator.propagate(&tenant_id).await {
        Ok(counts) => (
            StatusCode::OK,
            Json(PropagateResponse {
                success: true,
                counts,
            }),
        )
            .into_response(),
        Err(e) => engine_error(e),
    }
}

// =============================================================================
// Error Mapping
// =============================================================================

fn client_error(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })).into_response()
}

fn engine_error(error: SyncError) -> Response {
    let status = if error.is_request_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

// =============================================================================
// Unit Tests
// =============================================================================
