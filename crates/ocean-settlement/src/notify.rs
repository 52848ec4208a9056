//! User notifications for settled payments.
//!
//! Notifications are fire-and-forget: the worker logs a delivery failure
//! and moves on, it never rolls back a settlement because a message was
//! lost. The NATS notifier lives in the worker binary.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ocean_types::{PaymentId, UserId};

use crate::error::NotifyError;

/// Something the user should hear about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// A deposit was credited.
    DepositConfirmed {
        /// Recipient.
        user_id: UserId,
        /// The deposit.
        payment_id: PaymentId,
        /// Credited amount.
        amount: Decimal,
    },
    /// A withdrawal was paid out.
    WithdrawalSent {
        /// Recipient.
        user_id: UserId,
        /// The withdrawal.
        payment_id: PaymentId,
        /// Paid amount.
        amount: Decimal,
        /// Rail transaction hash.
        tx_hash: String,
    },
    /// A withdrawal gave up after its last attempt.
    WithdrawalFailed {
        /// Recipient.
        user_id: UserId,
        /// The withdrawal.
        payment_id: PaymentId,
        /// Requested amount, now released.
        amount: Decimal,
        /// Last rail error.
        reason: String,
    },
}

impl Notification {
    /// The recipient.
    pub const fn user_id(&self) -> UserId {
        match self {
            Self::DepositConfirmed { user_id, .. }
            | Self::WithdrawalSent { user_id, .. }
            | Self::WithdrawalFailed { user_id, .. } => *user_id,
        }
    }

    /// Short machine-readable kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DepositConfirmed { .. } => "deposit_confirmed",
            Self::WithdrawalSent { .. } => "withdrawal_sent",
            Self::WithdrawalFailed { .. } => "withdrawal_failed",
        }
    }
}

/// Delivers notifications to users.
#[async_trait]
pub trait Notifier: Send + Sync + core::fmt::Debug {
    /// Send one notification.
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Notifier that only writes a log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            user_id = %notification.user_id(),
            kind = notification.kind(),
            "user notified"
        );
        Ok(())
    }
}
