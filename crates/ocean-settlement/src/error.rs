//! Error types for payments, the settlement store, the rail, and locks.

use rust_decimal::Decimal;

use ocean_ledger::LedgerError;
use ocean_types::{PaymentDirection, PaymentId, PaymentStatus, UserId};

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Errors returned by a [`SettlementStore`](crate::store::SettlementStore).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No payment with this id.
    #[error("payment not found: {0}")]
    PaymentNotFound(PaymentId),

    /// A payment with this id already exists.
    #[error("payment already exists: {0}")]
    DuplicatePayment(PaymentId),

    /// The user's unreserved balance does not cover a withdrawal.
    #[error("insufficient funds for user {user_id}: available {available}, requested {requested}")]
    InsufficientFunds {
        /// The user being debited.
        user_id: UserId,
        /// Ledger balance minus pending withdrawals.
        available: Decimal,
        /// The requested withdrawal.
        requested: Decimal,
    },

    /// The payment is in a status the operation cannot act on.
    #[error("payment {payment_id} is {status:?}")]
    InvalidStatus {
        /// The payment.
        payment_id: PaymentId,
        /// Its current status.
        status: PaymentStatus,
    },

    /// Stored rows disagree with each other.
    #[error("settlement invariant violated: {0}")]
    Invariant(String),

    /// The backend failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

/// Errors returned by [`PaymentService`](crate::payments::PaymentService).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    /// Amounts are strictly positive whole units.
    #[error("payment amount must be a positive whole number of units, got {amount}")]
    InvalidAmount {
        /// The rejected amount.
        amount: Decimal,
    },

    /// A deposit intent needs a memo to be matched against.
    #[error("deposit memo must not be empty")]
    EmptyMemo,

    /// An inbound transfer needs its rail transaction hash.
    #[error("transaction hash must not be empty")]
    EmptyTxHash,

    /// No payment with this id.
    #[error("payment not found: {0}")]
    PaymentNotFound(PaymentId),

    /// The operation expected the other direction.
    #[error("payment {payment_id} is not a {expected:?}")]
    WrongDirection {
        /// The payment.
        payment_id: PaymentId,
        /// The direction the operation requires.
        expected: PaymentDirection,
    },

    /// The payment already reached a terminal status other than the one
    /// the operation needs.
    #[error("payment {payment_id} is {status:?}")]
    NotPending {
        /// The payment.
        payment_id: PaymentId,
        /// Its current status.
        status: PaymentStatus,
    },

    /// Balance check failed.
    #[error("insufficient balance for user {user_id}: available {available}, requested {requested}")]
    InsufficientBalance {
        /// The user being debited.
        user_id: UserId,
        /// Balance available to withdraw.
        available: Decimal,
        /// The requested amount.
        requested: Decimal,
    },

    /// Ledger rule violation.
    #[error(transparent)]
    Ledger(LedgerError),

    /// Storage failure.
    #[error(transparent)]
    Store(StoreError),
}

impl PaymentError {
    /// Whether the caller can fix the request and try again.
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount { .. }
                | Self::EmptyMemo
                | Self::EmptyTxHash
                | Self::PaymentNotFound(_)
                | Self::WrongDirection { .. }
                | Self::InsufficientBalance { .. }
        )
    }
}

impl From<LedgerError> for PaymentError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientBalance {
                user_id,
                balance,
                requested,
            } => Self::InsufficientBalance {
                user_id,
                available: balance,
                requested,
            },
            other => Self::Ledger(other),
        }
    }
}

impl From<StoreError> for PaymentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::PaymentNotFound(id) => Self::PaymentNotFound(id),
            StoreError::InsufficientFunds {
                user_id,
                available,
                requested,
            } => Self::InsufficientBalance {
                user_id,
                available,
                requested,
            },
            StoreError::InvalidStatus { payment_id, status } => {
                Self::NotPending { payment_id, status }
            }
            other => Self::Store(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Rail and locks
// ---------------------------------------------------------------------------

/// A withdrawal dispatch did not go through.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RailError {
    /// The rail refused the transfer.
    #[error("rail rejected transfer: {0}")]
    Rejected(String),

    /// The rail could not be reached.
    #[error("rail unavailable: {0}")]
    Unavailable(String),

    /// No reply within the configured timeout.
    #[error("rail request timed out")]
    Timeout,

    /// The rail replied with something unreadable.
    #[error("malformed rail reply: {0}")]
    Malformed(String),
}

/// The dispatch lock backend failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("dispatch lock backend error: {0}")]
pub struct LockError(pub String);

/// A user notification could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// A worker cycle could not complete.
///
/// Per-withdrawal dispatch failures are not errors; they become queue
/// state and alerts. Only storage and lock failures abort a cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Lock backend failure.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// Payment rule failure while confirming.
    #[error(transparent)]
    Payment(#[from] PaymentError),
}
