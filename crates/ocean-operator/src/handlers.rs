//! Read endpoints and the operator rollover.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/ocean` | Current ocean singleton |
//! | `POST` | `/api/ocean/rollover` | Force a new cycle |
//! | `GET` | `/api/fish/{id}` | One creature |
//! | `GET` | `/api/events` | Recent events (by fish or user) |
//! | `GET` | `/api/users/{id}/balance` | Ledger and available balance |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use rand::Rng;

use ocean_types::{BPS_DENOMINATOR, FishId, UserId};

use crate::error::OperatorError;
use crate::state::AppState;

/// Default number of events returned.
const DEFAULT_EVENT_LIMIT: usize = 100;

/// Hard cap on events returned.
const MAX_EVENT_LIMIT: usize = 1_000;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/events`.
#[derive(Debug, serde::Deserialize)]
pub struct EventsQuery {
    /// Only events touching this creature.
    pub fish_id: Option<String>,
    /// Only events involving this user.
    pub user_id: Option<String>,
    /// Maximum number of events to return (default 100).
    pub limit: Option<usize>,
}

/// Request body for `POST /api/ocean/rollover`.
#[derive(Debug, Default, serde::Deserialize)]
pub struct RolloverRequest {
    /// Draw to use, in `[0, 10000)`. Drawn at random when absent.
    pub random_bps: Option<u32>,
}

// ---------------------------------------------------------------------------
// Ocean
// ---------------------------------------------------------------------------

/// Return the ocean singleton.
pub async fn get_ocean(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, OperatorError> {
    Ok(Json(state.ocean.get_ocean_state().await?))
}

/// Force a rollover now, regardless of `next_mode_change_time`.
pub async fn rollover(
    State(state): State<Arc<AppState>>,
    body: Option<Json<RolloverRequest>>,
) -> Result<impl IntoResponse, OperatorError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let random_bps = request
        .random_bps
        .unwrap_or_else(|| rand::rng().random_range(0..BPS_DENOMINATOR));
    let ocean = state.ocean.rollover(random_bps).await?;
    tracing::info!(random_bps, mode = ocean.mode.as_str(), "operator forced rollover");
    Ok(Json(ocean))
}

// ---------------------------------------------------------------------------
// Fish
// ---------------------------------------------------------------------------

/// Return one creature.
pub async fn get_fish(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, OperatorError> {
    let fish_id: FishId = parse_id(&id)?;
    Ok(Json(state.ocean.get_fish(fish_id).await?))
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Query the event log, newest first.
///
/// `fish_id` takes precedence over `user_id` when both are given.
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventsQuery>,
) -> Result<impl IntoResponse, OperatorError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .min(MAX_EVENT_LIMIT);

    let events = if let Some(fish_id) = params.fish_id.as_deref() {
        state.events.for_fish(parse_id(fish_id)?, limit).await
    } else if let Some(user_id) = params.user_id.as_deref() {
        state.events.for_user(parse_id(user_id)?, limit).await
    } else {
        state.events.recent(limit).await
    };

    Ok(Json(serde_json::json!({
        "count": events.len(),
        "events": events,
    })))
}

// ---------------------------------------------------------------------------
// Balances
// ---------------------------------------------------------------------------

/// Ledger balance and the part not reserved by pending withdrawals.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, OperatorError> {
    let user_id: UserId = parse_id(&id)?;
    let payments = state.payments();
    let balance = payments.get_balance(user_id).await?;
    let available = payments.available_balance(user_id).await?;

    Ok(Json(serde_json::json!({
        "user_id": user_id,
        "balance": balance,
        "available": available,
    })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a typed id from a path or query string.
pub(crate) fn parse_id<T>(raw: &str) -> Result<T, OperatorError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| OperatorError::Validation(format!("invalid id {raw}: {e}")))
}
