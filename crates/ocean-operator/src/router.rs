//! Axum router construction for the operator API.
//!
//! Assembles all routes into a single [`Router`] with CORS and request
//! tracing middleware.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::settlement;
use crate::state::AppState;

/// Build the complete Axum router for the operator server.
///
/// CORS is configured to allow any origin; the server is expected to sit
/// behind the operator network boundary.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Ocean and creatures
        .route("/api/ocean", get(handlers::get_ocean))
        .route("/api/ocean/rollover", post(handlers::rollover))
        .route("/api/fish/{id}", get(handlers::get_fish))
        .route("/api/events", get(handlers::list_events))
        .route("/api/users/{id}/balance", get(handlers::get_balance))
        // Settlement
        .route("/api/alerts", get(settlement::list_alerts))
        .route(
            "/api/alerts/{id}/acknowledge",
            post(settlement::acknowledge_alert),
        )
        .route("/api/dead-letters", get(settlement::list_dead_letters))
        .route(
            "/api/dead-letters/{tx_hash}/replay",
            post(settlement::replay_dead_letter),
        )
        .route(
            "/api/inbound-transfers",
            post(settlement::push_inbound_transfer),
        )
        .route("/api/worker/cycle", post(settlement::run_worker_cycle))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
