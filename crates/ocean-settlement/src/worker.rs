//! The settlement worker cycle.
//!
//! One cycle:
//!
//! 1. Reconcile buffered inbound transfers against deposit intents.
//! 2. Pull withdrawal queue items whose `next_attempt_at` has elapsed.
//! 3. For each, take the per-payment dispatch lock and send it to the rail.
//!    Success confirms the withdrawal (debiting the ledger and dropping the
//!    queue item). Failure bumps `attempts` and reschedules with
//!    exponential backoff, or fails the payment once `attempts` reaches
//!    the ceiling.
//!
//! Dispatch failures never abort a cycle. Only storage and lock backend
//! failures do.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use ocean_events::narrate;
use ocean_types::{AlertType, PaymentId, PaymentStatus, WithdrawalQueueItem};

use crate::alerts::AlertStore;
use crate::config::SettlementConfig;
use crate::error::{StoreError, WorkerError};
use crate::lock::DispatchLock;
use crate::notify::{Notification, Notifier};
use crate::payments::PaymentService;
use crate::rail::{DispatchRequest, TransferRail};
use crate::reconcile::Reconciler;

/// Largest backoff exponent; keeps the delay representable.
const MAX_BACKOFF_EXPONENT: u32 = 20;

/// Counts from one worker cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Deposits confirmed by reconciliation.
    pub confirmed_deposits: usize,
    /// Withdrawals the rail accepted.
    pub processed_withdrawals: usize,
    /// Withdrawals rescheduled after a failed dispatch.
    pub retried_withdrawals: usize,
    /// Withdrawals that exhausted their attempts.
    pub failed_withdrawals: usize,
    /// Alerts raised during the cycle.
    pub alerts_raised: usize,
}

/// Delay before the next attempt after `attempts` failures:
/// `base * 2^(attempts - 1)`.
pub fn backoff_delay(base: TimeDelta, attempts: u32) -> TimeDelta {
    let exponent = attempts.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    2_i32
        .checked_pow(exponent)
        .and_then(|factor| base.checked_mul(factor))
        .unwrap_or(TimeDelta::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatched {
    Sent,
    Retried,
    Failed,
    Skipped,
}

/// Periodic settlement worker.
#[derive(Debug, Clone)]
pub struct SettlementWorker {
    payments: PaymentService,
    reconciler: Reconciler,
    rail: Arc<dyn TransferRail>,
    lock: Arc<dyn DispatchLock>,
    notifier: Arc<dyn Notifier>,
    alerts: Arc<RwLock<AlertStore>>,
    config: SettlementConfig,
}

impl SettlementWorker {
    /// Wire a worker over its collaborators.
    pub fn new(
        payments: PaymentService,
        rail: Arc<dyn TransferRail>,
        lock: Arc<dyn DispatchLock>,
        notifier: Arc<dyn Notifier>,
        alerts: Arc<RwLock<AlertStore>>,
        config: SettlementConfig,
    ) -> Self {
        let reconciler = Reconciler::new(
            payments.clone(),
            Arc::clone(&notifier),
            Arc::clone(&alerts),
            config.min_confirmations,
        );
        Self {
            payments,
            reconciler,
            rail,
            lock,
            notifier,
            alerts,
            config,
        }
    }

    /// The payment service this worker settles for.
    pub const fn payments(&self) -> &PaymentService {
        &self.payments
    }

    /// The inbound reconciler.
    pub const fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// The shared alert store.
    pub const fn alerts(&self) -> &Arc<RwLock<AlertStore>> {
        &self.alerts
    }

    /// Worker configuration.
    pub const fn config(&self) -> &SettlementConfig {
        &self.config
    }

    /// Run one cycle as of `now`.
    pub async fn run_worker_cycle(&self, now: DateTime<Utc>) -> Result<CycleReport, WorkerError> {
        let reconciled = self.reconciler.reconcile(now).await?;
        let mut report = CycleReport {
            confirmed_deposits: reconciled.confirmed.len(),
            alerts_raised: reconciled.unmatched.len(),
            ..CycleReport::default()
        };

        let due = self
            .payments
            .store()
            .due_withdrawals(now, self.config.batch_limit)
            .await?;
        for item in due {
            match self.process_withdrawal(item, now).await? {
                Dispatched::Sent => {
                    report.processed_withdrawals = report.processed_withdrawals.saturating_add(1);
                }
                Dispatched::Retried => {
                    report.retried_withdrawals = report.retried_withdrawals.saturating_add(1);
                    report.alerts_raised = report.alerts_raised.saturating_add(1);
                }
                Dispatched::Failed => {
                    report.failed_withdrawals = report.failed_withdrawals.saturating_add(1);
                    report.alerts_raised = report.alerts_raised.saturating_add(1);
                }
                Dispatched::Skipped => {}
            }
        }

        if report != CycleReport::default() || reconciled.held > 0 {
            tracing::info!(
                confirmed_deposits = report.confirmed_deposits,
                processed_withdrawals = report.processed_withdrawals,
                retried_withdrawals = report.retried_withdrawals,
                failed_withdrawals = report.failed_withdrawals,
                alerts_raised = report.alerts_raised,
                held_transfers = reconciled.held,
                "settlement cycle complete"
            );
        }
        Ok(report)
    }

    async fn process_withdrawal(
        &self,
        item: WithdrawalQueueItem,
        now: DateTime<Utc>,
    ) -> Result<Dispatched, WorkerError> {
        let Some(token) = self
            .lock
            .try_acquire(item.payment_id, self.config.dispatch_lock_ttl())
            .await?
        else {
            tracing::debug!(payment_id = %item.payment_id, "withdrawal locked elsewhere");
            return Ok(Dispatched::Skipped);
        };

        let result = self.dispatch_locked(item.payment_id, now).await;
        if let Err(e) = self.lock.release(&token).await {
            tracing::warn!(payment_id = %item.payment_id, error = %e, "dispatch lock release failed");
        }
        result
    }

    async fn dispatch_locked(
        &self,
        payment_id: PaymentId,
        now: DateTime<Utc>,
    ) -> Result<Dispatched, WorkerError> {
        let store = self.payments.store();

        // Re-read under the lock: another holder may have settled it.
        let Some(item) = store.queue_item(payment_id).await? else {
            return Ok(Dispatched::Skipped);
        };
        if item.next_attempt_at > now {
            return Ok(Dispatched::Skipped);
        }
        let payment = store
            .payment(payment_id)
            .await?
            .ok_or(StoreError::PaymentNotFound(payment_id))?;
        if payment.status != PaymentStatus::Pending {
            return Ok(Dispatched::Skipped);
        }

        let request = DispatchRequest {
            payment_id,
            user_id: payment.user_id,
            amount: payment.amount,
            idempotency_key: item.idempotency_key.clone(),
        };
        match self.rail.dispatch(&request).await {
            Ok(receipt) => {
                self.payments
                    .confirm_payment(payment_id, Some(&receipt.tx_hash), &item.idempotency_key)
                    .await?;
                self.notify(&Notification::WithdrawalSent {
                    user_id: payment.user_id,
                    payment_id,
                    amount: payment.amount,
                    tx_hash: receipt.tx_hash,
                })
                .await;
                Ok(Dispatched::Sent)
            }
            Err(rail_error) => {
                let attempts = item.attempts.saturating_add(1);
                let error = rail_error.to_string();
                if attempts >= self.config.max_attempts {
                    let failed = store.fail_payment(payment_id, &error, now).await?;
                    self.alerts.write().await.raise(
                        AlertType::WithdrawalFailed,
                        format!("Withdrawal failed after {attempts} attempts: {error}"),
                        Some(payment_id),
                        None,
                        now,
                    );
                    self.payments
                        .events()
                        .record(narrate::withdrawal_failed(&failed, attempts, now))
                        .await;
                    self.notify(&Notification::WithdrawalFailed {
                        user_id: failed.user_id,
                        payment_id,
                        amount: failed.amount,
                        reason: error,
                    })
                    .await;
                    return Ok(Dispatched::Failed);
                }

                let next_attempt_at = now
                    .checked_add_signed(backoff_delay(self.config.retry_base(), attempts))
                    .ok_or_else(|| StoreError::Invariant("retry time overflowed".to_owned()))?;
                let rescheduled = WithdrawalQueueItem {
                    attempts,
                    next_attempt_at,
                    last_error: Some(error.clone()),
                    ..item
                };
                store.update_queue_item(rescheduled.clone()).await?;
                self.alerts.write().await.raise(
                    AlertType::WithdrawalRetry,
                    format!("Withdrawal attempt {attempts} failed, retrying at {next_attempt_at}: {error}"),
                    Some(payment_id),
                    None,
                    now,
                );
                self.payments
                    .events()
                    .record(narrate::withdrawal_retried(&payment, &rescheduled, now))
                    .await;
                Ok(Dispatched::Retried)
            }
        }
    }

    async fn notify(&self, notification: &Notification) {
        if let Err(e) = self.notifier.notify(notification).await {
            tracing::warn!(error = %e, kind = notification.kind(), "notification dropped");
        }
    }
}
