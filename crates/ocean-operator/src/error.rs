//! Error types for the operator API.
//!
//! [`OperatorError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use ocean_core::{ErrorKind, FishError};
use ocean_settlement::{PaymentError, WorkerError};

/// Errors that can occur in the operator API layer.
#[derive(Debug, thiserror::Error)]
pub enum OperatorError {
    /// The request is malformed or breaks a rule the caller can fix.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request raced other state or is not allowed in the current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<FishError> for OperatorError {
    fn from(err: FishError) -> Self {
        let message = err.to_string();
        match (&err, err.kind()) {
            (FishError::FishNotFound(_), _) => Self::NotFound(message),
            (_, ErrorKind::Validation) => Self::Validation(message),
            (_, ErrorKind::Conflict) => Self::Conflict(message),
            (_, ErrorKind::Internal) => Self::Internal(message),
        }
    }
}

impl From<PaymentError> for OperatorError {
    fn from(err: PaymentError) -> Self {
        let message = err.to_string();
        match err {
            PaymentError::PaymentNotFound(_) => Self::NotFound(message),
            PaymentError::NotPending { .. } => Self::Conflict(message),
            ref e if e.is_validation() => Self::Validation(message),
            _ => Self::Internal(message),
        }
    }
}

impl From<WorkerError> for OperatorError {
    fn from(err: WorkerError) -> Self {
        match err {
            WorkerError::Payment(e) => e.into(),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for OperatorError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "operator request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use ocean_types::{FishId, PaymentId};
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn fish_errors_follow_their_kind() {
        assert!(matches!(
            OperatorError::from(FishError::FishNotFound(FishId::new())),
            OperatorError::NotFound(_)
        ));
        assert!(matches!(
            OperatorError::from(FishError::RolloverConflict),
            OperatorError::Conflict(_)
        ));
        assert!(matches!(
            OperatorError::from(FishError::Overflow("share")),
            OperatorError::Internal(_)
        ));
    }

    #[test]
    fn payment_errors_map_to_status_classes() {
        assert!(matches!(
            OperatorError::from(PaymentError::PaymentNotFound(PaymentId::new())),
            OperatorError::NotFound(_)
        ));
        assert!(matches!(
            OperatorError::from(PaymentError::InvalidAmount {
                amount: Decimal::ZERO
            }),
            OperatorError::Validation(_)
        ));
    }

    #[test]
    fn responses_carry_status_codes() {
        let response = OperatorError::Conflict("stale".to_owned()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let response = OperatorError::Validation("bad".to_owned()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
