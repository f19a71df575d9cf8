//! Request handlers.
//!
//! Handlers only translate between JSON and the orchestrator; all policy lives
//! in [`BatchOrchestrator`](crate::orchestrator::BatchOrchestrator).

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error};

use super::ApiState;
use crate::target::ScaleBatch;

/// Header carrying the inter-update delay, e.g. `250ms` or `2s`
pub const SLEEP_HEADER: &str = "sleep";

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (status, Json(serde_json::json!({ "message": msg })))
}

/// Delay requested by the caller; absent or unparsable means none.
pub fn parse_delay(headers: &HeaderMap) -> Duration {
    headers
        .get(SLEEP_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| humantime::parse_duration(v.trim()).ok())
        .unwrap_or(Duration::ZERO)
}

// ── Scaling ────────────────────────────────────────────────────

/// POST /scaleConfigs
pub async fn post_scale_configs(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(batch): Json<ScaleBatch>,
) -> impl IntoResponse {
    let delay = parse_delay(&headers);
    debug!(targets = batch.len(), delay = ?delay, "Received scale request");

    // Detached so a dropped request does not abandon the batch halfway.
    let orchestrator = state.orchestrator.clone();
    let task = tokio::spawn(async move { orchestrator.run(batch, delay).await });

    match task.await {
        Ok(report) => {
            let status = if report.fatal.is_some() {
                StatusCode::INTERNAL_SERVER_ERROR
            } else {
                StatusCode::OK
            };
            (status, Json(report)).into_response()
        }
        Err(e) => {
            error!(error = %e, "Scale batch task failed");
            error_response("scale batch task failed", StatusCode::INTERNAL_SERVER_ERROR)
                .into_response()
        }
    }
}

/// GET /scaleConfigs
///
/// The body names the workloads to look up; its values are ignored.
pub async fn get_scale_configs(
    State(state): State<ApiState>,
    Json(query): Json<BTreeMap<String, serde_json::Value>>,
) -> impl IntoResponse {
    match state.orchestrator.inspect(query.into_keys()).await {
        Ok(current) if current.is_empty() => {
            error_response("no autoscaler found", StatusCode::NOT_FOUND).into_response()
        }
        Ok(current) => (StatusCode::OK, Json(current)).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

// ── Health ─────────────────────────────────────────────────────

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
