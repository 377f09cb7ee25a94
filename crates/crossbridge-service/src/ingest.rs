// crates/crossbridge-service/src/ingest.rs
// ============================================================================
// Module: Ingest HTTP Service (C10)
// Description: The axum router fronting the pipeline: `POST /events`,
//              `POST /events/batch`, `GET /health`, `GET /stats`,
//              `POST /admin/reload`, `GET /rules/:framework` (§4.10, §6).
// Dependencies: axum, crossbridge-core, crossbridge-store
// ============================================================================

//! ## Overview
//! Handlers stay thin: parse, validate, hand off to [`crate::pipeline::Pipeline`],
//! respond. None of the §4.11 processing happens on the request path — a
//! `202`/`207` only means "queued", not "processed" (§4.10's async posture).

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::routing::get;
use axum::routing::post;
use bytes::Bytes;
use crossbridge_core::CoreError;
use crossbridge_core::ExecutionEvent;
use crossbridge_core::RawExecutionEvent;
use serde_json::Value;
use serde_json::json;
use tracing::warn;

use crate::error::ServiceError;
use crate::pipeline::Pipeline;

/// Request bodies larger than this are rejected with `413` before parsing (§4.10).
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared application state every handler closes over.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
    admin_token: Option<String>,
}

/// Builds the axum [`Router`] for the ingest service.
#[must_use]
pub fn router(pipeline: Arc<Pipeline>, admin_token: Option<String>) -> Router {
    let state = AppState { pipeline, admin_token };
    Router::new()
        .route("/events", post(post_event))
        .route("/events/batch", post(post_events_batch))
        .route("/health", get(get_health))
        .route("/stats", get(get_stats))
        .route("/admin/reload", post(post_admin_reload))
        .route("/rules/{framework}", get(get_rules_for_framework))
        .with_state(state)
}

/// `POST /events`: accepts one event, `202` on successful enqueue.
async fn post_event(State(state): State<AppState>, body: Bytes) -> (StatusCode, Json<Value>) {
    if body.len() > MAX_BODY_BYTES {
        return error_response(StatusCode::PAYLOAD_TOO_LARGE, "request body exceeds the 10 MB limit");
    }
    match accept_one(&state, &body) {
        Ok(event_id) => (StatusCode::ACCEPTED, Json(json!({ "status": "accepted", "event_id": event_id }))),
        Err(err) => service_error_response(err),
    }
}

/// `POST /events/batch`: accepts a JSON array of events; `202` if every
/// event was enqueued, `207` multi-status when some were rejected (§6).
async fn post_events_batch(State(state): State<AppState>, body: Bytes) -> (StatusCode, Json<Value>) {
    if body.len() > MAX_BODY_BYTES {
        return error_response(StatusCode::PAYLOAD_TOO_LARGE, "request body exceeds the 10 MB limit");
    }

    let raw_events: Vec<Value> = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, &format!("invalid json array: {err}")),
    };

    let mut results = Vec::with_capacity(raw_events.len());
    let mut any_rejected = false;
    for raw in raw_events {
        let encoded = serde_json::to_vec(&raw).unwrap_or_default();
        match accept_one(&state, &encoded) {
            Ok(event_id) => results.push(json!({ "status": "accepted", "event_id": event_id })),
            Err(err) => {
                any_rejected = true;
                results.push(json!({ "status": "rejected", "error": err.to_string() }));
            }
        }
    }

    let status = if any_rejected { StatusCode::MULTI_STATUS } else { StatusCode::ACCEPTED };
    (status, Json(json!({ "results": results })))
}

/// Parses, normalizes, and submits one event, recording accept/reject stats
/// either way.
fn accept_one(state: &AppState, bytes: &[u8]) -> Result<String, ServiceError> {
    let outcome = parse_and_submit(state, bytes);
    if outcome.is_err() {
        state.pipeline.record_rejected();
    }
    outcome
}

fn parse_and_submit(state: &AppState, bytes: &[u8]) -> Result<String, ServiceError> {
    let raw: RawExecutionEvent =
        serde_json::from_slice(bytes).map_err(|err| ServiceError::Validation(format!("invalid event json: {err}")))?;
    let event = ExecutionEvent::from_wire(raw).map_err(service_validation_error)?;
    let event_id = event.event_id.to_string();
    let framework = event.framework.as_str().to_string();
    let event_type = wire_event_type(&event);
    state.pipeline.submit(event)?;
    state.pipeline.record_accepted(&framework, &event_type);
    Ok(event_id)
}

fn wire_event_type(event: &ExecutionEvent) -> String {
    format!("{:?}", event.event_type).to_lowercase()
}

fn service_validation_error(err: CoreError) -> ServiceError {
    ServiceError::Validation(err.to_string())
}

/// `GET /health`: `healthy` requires queue depth under 80% of capacity and
/// the event store reachable (§4.10); either failing reports `degraded`.
async fn get_health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let depth = state.pipeline.queue_depth();
    let capacity = state.pipeline.queue_capacity().max(1);
    #[allow(clippy::cast_precision_loss, reason = "queue sizes are small")]
    let utilization = depth as f64 / capacity as f64;
    let queue_ok = utilization < 0.8;
    let storage_ok = state.pipeline.storage_reachable();
    let healthy = queue_ok && storage_ok;

    let body = json!({
        "status": if healthy { "healthy" } else { "degraded" },
        "queue_depth": depth,
        "storage": if storage_ok { "ok" } else { "degraded" },
    });
    let status = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(body))
}

/// `GET /stats`: ingest counts and latency percentiles (§6).
async fn get_stats(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.pipeline.stats();
    let spill_depth = state.pipeline.spill_depth().unwrap_or(0);
    Json(json!({
        "accepted": snapshot.accepted,
        "rejected": snapshot.rejected,
        "by_framework": snapshot.by_framework,
        "by_event_type": snapshot.by_event_type,
        "queue_depth": state.pipeline.queue_depth(),
        "queue_capacity": state.pipeline.queue_capacity(),
        "spill_log_depth": spill_depth,
        "latency_ms": {
            "p50": snapshot.p50_ms,
            "p95": snapshot.p95_ms,
            "p99": snapshot.p99_ms,
        },
    }))
}

/// `POST /admin/reload`: bearer-token gated hot reload of every cached rule pack.
async fn post_admin_reload(State(state): State<AppState>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if let Some(expected) = &state.admin_token {
        let provided = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        if provided != Some(expected.as_str()) {
            return error_response(StatusCode::UNAUTHORIZED, "admin endpoint requires a valid bearer token");
        }
    }
    state.pipeline.reload_rules();
    (StatusCode::OK, Json(json!({ "status": "reloaded" })))
}

/// `GET /rules/:framework`: introspection endpoint for the active rule pack.
async fn get_rules_for_framework(State(state): State<AppState>, Path(framework): Path<String>) -> Json<Value> {
    let pack = state.pipeline.rules_for(&framework);
    Json(serde_json::to_value(pack).unwrap_or_else(|_serialize_error| json!({})))
}

fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "status": "error", "error": message })))
}

fn service_error_response(err: ServiceError) -> (StatusCode, Json<Value>) {
    let status = match err {
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ServiceError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
        ServiceError::Config(_) | ServiceError::Store(_) | ServiceError::Bind { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    warn!(%err, "rejecting request");
    error_response(status, &err.to_string())
}
