//! Settlement endpoints: alerts, dead letters, inbound transfers, and
//! on-demand worker cycles.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/alerts` | List alerts (filterable) |
//! | `POST` | `/api/alerts/{id}/acknowledge` | Acknowledge an alert |
//! | `GET` | `/api/dead-letters` | Unmatched inbound transfers |
//! | `POST` | `/api/dead-letters/{tx_hash}/replay` | Re-buffer a dead letter |
//! | `POST` | `/api/inbound-transfers` | Rail watcher ingestion hook |
//! | `POST` | `/api/worker/cycle` | Run one settlement cycle now |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use rust_decimal::Decimal;

use ocean_types::{AlertId, AlertType, Clock, WorkerAlert};

use crate::error::OperatorError;
use crate::handlers::parse_id;
use crate::state::AppState;

/// Default number of alerts returned.
const DEFAULT_ALERT_LIMIT: usize = 100;

/// Hard cap on alerts returned.
const MAX_ALERT_LIMIT: usize = 500;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/alerts`.
#[derive(Debug, serde::Deserialize)]
pub struct AlertsQuery {
    /// Filter by alert type (`deposit_unmatched`, `withdrawal_retry`,
    /// `withdrawal_failed`).
    #[serde(rename = "type")]
    pub alert_type: Option<String>,
    /// Filter by acknowledgement (`true` / `false`).
    pub acknowledged: Option<bool>,
    /// Maximum number of alerts to return (default 100).
    pub limit: Option<usize>,
}

/// Request body for `POST /api/inbound-transfers`.
#[derive(Debug, serde::Deserialize)]
pub struct InboundTransferRequest {
    /// Rail transaction hash.
    pub tx_hash: String,
    /// Amount in whole base units, as a decimal string.
    pub amount: Decimal,
    /// Memo attached by the sender.
    pub memo: Option<String>,
    /// Confirmations observed so far.
    #[serde(default)]
    pub confirmations: u32,
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

/// List alerts, newest first.
pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AlertsQuery>,
) -> Result<impl IntoResponse, OperatorError> {
    let type_filter: Option<AlertType> = params
        .alert_type
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(|e: ocean_types::UnknownVariant| OperatorError::Validation(e.to_string()))?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_ALERT_LIMIT)
        .min(MAX_ALERT_LIMIT);

    let store = state.alerts().read().await;
    let alerts: Vec<&WorkerAlert> = store
        .all()
        .iter()
        .filter(|a| type_filter.is_none_or(|t| a.alert_type == t))
        .filter(|a| params.acknowledged.is_none_or(|ack| a.acknowledged == ack))
        .take(limit)
        .collect();
    let unacknowledged = store.unacknowledged().len();

    Ok(Json(serde_json::json!({
        "count": alerts.len(),
        "unacknowledged": unacknowledged,
        "alerts": alerts,
    })))
}

/// Mark one alert as acknowledged.
pub async fn acknowledge_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, OperatorError> {
    let alert_id: AlertId = parse_id(&id)?;
    if state.alerts().write().await.acknowledge(alert_id) {
        Ok(Json(serde_json::json!({
            "ok": true,
            "message": format!("Alert {alert_id} acknowledged"),
        })))
    } else {
        Err(OperatorError::NotFound(format!("alert {alert_id}")))
    }
}

// ---------------------------------------------------------------------------
// Dead letters
// ---------------------------------------------------------------------------

/// List dead-lettered transfers, oldest first.
pub async fn list_dead_letters(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, OperatorError> {
    let letters = state.reconciler().dead_letters().await?;
    Ok(Json(serde_json::json!({
        "count": letters.len(),
        "dead_letters": letters,
    })))
}

/// Move a dead letter back into the inbound buffer.
pub async fn replay_dead_letter(
    State(state): State<Arc<AppState>>,
    Path(tx_hash): Path<String>,
) -> Result<impl IntoResponse, OperatorError> {
    let transfer = state
        .reconciler()
        .replay_dead_letter(&tx_hash)
        .await?
        .ok_or_else(|| OperatorError::NotFound(format!("dead letter {tx_hash}")))?;
    Ok(Json(transfer))
}

// ---------------------------------------------------------------------------
// Inbound transfers
// ---------------------------------------------------------------------------

/// Accept a transfer observed by the rail watcher.
pub async fn push_inbound_transfer(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InboundTransferRequest>,
) -> Result<impl IntoResponse, OperatorError> {
    let outcome = state
        .reconciler()
        .push_inbound_transfer(
            &request.tx_hash,
            request.amount,
            request.memo.as_deref(),
            request.confirmations,
        )
        .await?;
    Ok((StatusCode::ACCEPTED, Json(outcome)))
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Run one settlement cycle immediately.
pub async fn run_worker_cycle(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, OperatorError> {
    let report = state.worker.run_worker_cycle(state.clock.now()).await?;
    Ok(Json(report))
}
