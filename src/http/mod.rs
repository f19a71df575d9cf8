//! HTTP front door
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/scaleConfigs` | Apply a batch of bounds; `sleep` header sets the inter-update delay |
//! | GET | `/scaleConfigs` | Current bounds of the workloads named in the body |
//! | GET | `/healthz` | Liveness probe |

pub mod handlers;

use crate::orchestrator::BatchOrchestrator;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<BatchOrchestrator>,
}

/// Build the API router.
pub fn build_router(orchestrator: Arc<BatchOrchestrator>) -> Router {
    Router::new()
        .route(
            "/scaleConfigs",
            get(handlers::get_scale_configs).post(handlers::post_scale_configs),
        )
        .route("/healthz", get(handlers::healthz))
        .with_state(ApiState { orchestrator })
}
