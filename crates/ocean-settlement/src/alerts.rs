//! Operator-facing settlement alerts.
//!
//! Alerts are raised by the worker for conditions a person has to look at:
//!
//! - `deposit_unmatched` -- an inbound transfer matched no pending deposit
//!   and was moved to the dead-letter set
//! - `withdrawal_retry` -- a dispatch failed and was rescheduled
//! - `withdrawal_failed` -- a withdrawal exhausted its attempts
//!
//! The store is shared as `Arc<RwLock<AlertStore>>` between the worker and
//! the operator API.

use chrono::{DateTime, Utc};

use ocean_types::{AlertId, AlertType, PaymentId, WorkerAlert};

/// Maximum alerts to keep in memory.
pub const MAX_ALERTS: usize = 500;

/// In-memory alert store.
#[derive(Debug, Clone, Default)]
pub struct AlertStore {
    /// All alerts, newest first.
    alerts: Vec<WorkerAlert>,
}

impl AlertStore {
    /// Create a new empty alert store.
    pub const fn new() -> Self {
        Self { alerts: Vec::new() }
    }

    /// Add an alert to the store.
    ///
    /// If the store exceeds [`MAX_ALERTS`], the oldest alert is removed.
    pub fn push(&mut self, alert: WorkerAlert) {
        self.alerts.insert(0, alert);
        if self.alerts.len() > MAX_ALERTS {
            self.alerts.truncate(MAX_ALERTS);
        }
    }

    /// Get all alerts.
    pub fn all(&self) -> &[WorkerAlert] {
        &self.alerts
    }

    /// Acknowledge an alert by ID.
    ///
    /// Returns `true` if the alert was found and acknowledged, `false` if
    /// the ID was not found.
    pub fn acknowledge(&mut self, id: AlertId) -> bool {
        for alert in &mut self.alerts {
            if alert.id == id {
                alert.acknowledged = true;
                return true;
            }
        }
        false
    }

    /// Get alerts of one type.
    pub fn by_type(&self, alert_type: AlertType) -> Vec<&WorkerAlert> {
        self.alerts
            .iter()
            .filter(|a| a.alert_type == alert_type)
            .collect()
    }

    /// Get unacknowledged alerts.
    pub fn unacknowledged(&self) -> Vec<&WorkerAlert> {
        self.alerts.iter().filter(|a| !a.acknowledged).collect()
    }

    /// Create and push a new alert, returning a copy of it.
    pub fn raise(
        &mut self,
        alert_type: AlertType,
        message: String,
        payment_id: Option<PaymentId>,
        tx_hash: Option<String>,
        at: DateTime<Utc>,
    ) -> WorkerAlert {
        let alert = WorkerAlert {
            id: AlertId::new(),
            alert_type,
            message,
            payment_id,
            tx_hash,
            acknowledged: false,
            created_at: at,
        };
        tracing::warn!(
            alert_type = alert_type.as_str(),
            payment_id = ?alert.payment_id,
            tx_hash = ?alert.tx_hash,
            message = %alert.message,
            "settlement alert raised"
        );
        self.push(alert.clone());
        alert
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raise(store: &mut AlertStore, alert_type: AlertType) -> WorkerAlert {
        store.raise(alert_type, "test".to_owned(), None, None, Utc::now())
    }

    #[test]
    fn newest_first_and_capped() {
        let mut store = AlertStore::new();
        for _ in 0..MAX_ALERTS {
            raise(&mut store, AlertType::WithdrawalRetry);
        }
        let newest = raise(&mut store, AlertType::WithdrawalFailed);
        assert_eq!(store.all().len(), MAX_ALERTS);
        assert_eq!(store.all().first().map(|a| a.id), Some(newest.id));
    }

    #[test]
    fn acknowledge_marks_only_that_alert() {
        let mut store = AlertStore::new();
        let a = raise(&mut store, AlertType::DepositUnmatched);
        let _b = raise(&mut store, AlertType::DepositUnmatched);

        assert!(store.acknowledge(a.id));
        assert!(!store.acknowledge(AlertId::new()));
        assert_eq!(store.unacknowledged().len(), 1);
        assert_eq!(store.by_type(AlertType::DepositUnmatched).len(), 2);
    }
}
