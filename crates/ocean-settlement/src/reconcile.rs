//! Inbound transfer ingestion and deposit matching.
//!
//! The rail watcher pushes every transfer it sees into a buffer keyed by
//! transaction hash. Each reconciliation pass then walks the buffer:
//!
//! 1. Transfers below the confirmation threshold stay buffered.
//! 2. Transfers whose deposit key was already consumed are dropped.
//! 3. A transfer matching a pending deposit on both memo and amount
//!    confirms that deposit. The transfer leaves the buffer only once the
//!    deposit records its hash.
//! 4. Anything else moves to the dead-letter set and raises a
//!    `deposit_unmatched` alert. That includes a transfer whose matched
//!    deposit was settled by a different transfer in a concurrent pass.
//!    Dead letters are never retried automatically; an operator replays
//!    them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::RwLock;

use ocean_events::narrate;
use ocean_types::{AlertType, DeadLetter, InboundTransfer, Payment, is_positive_units};

use crate::alerts::AlertStore;
use crate::error::{PaymentError, WorkerError};
use crate::notify::{Notification, Notifier};
use crate::payments::{PaymentService, deposit_key};
use crate::store::ConfirmOutcome;

/// What happened to a pushed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PushOutcome {
    /// Buffered for the next reconciliation pass.
    Buffered {
        /// The transfer as buffered, after merging earlier pushes.
        transfer: InboundTransfer,
    },
    /// The hash is dead-lettered; only its confirmation count moved.
    DeadLettered,
    /// The hash already confirmed a deposit.
    AlreadySettled,
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Deposits confirmed in this pass.
    pub confirmed: Vec<Payment>,
    /// Transfers left buffered for lack of confirmations.
    pub held: usize,
    /// Transfers dropped because their hash already settled.
    pub duplicates: usize,
    /// Transfers moved to the dead-letter set.
    pub unmatched: Vec<DeadLetter>,
}

/// Matches inbound transfers to deposit intents.
#[derive(Debug, Clone)]
pub struct Reconciler {
    payments: PaymentService,
    notifier: Arc<dyn Notifier>,
    alerts: Arc<RwLock<AlertStore>>,
    min_confirmations: u32,
}

impl Reconciler {
    /// Wire a reconciler.
    pub fn new(
        payments: PaymentService,
        notifier: Arc<dyn Notifier>,
        alerts: Arc<RwLock<AlertStore>>,
        min_confirmations: u32,
    ) -> Self {
        Self {
            payments,
            notifier,
            alerts,
            min_confirmations,
        }
    }

    /// Ingestion hook for the rail watcher.
    ///
    /// Pushing the same hash again only raises its confirmation count.
    pub async fn push_inbound_transfer(
        &self,
        tx_hash: &str,
        amount: Decimal,
        memo: Option<&str>,
        confirmations: u32,
    ) -> Result<PushOutcome, PaymentError> {
        let tx_hash = tx_hash.trim();
        if tx_hash.is_empty() {
            return Err(PaymentError::EmptyTxHash);
        }
        if !is_positive_units(amount) {
            return Err(PaymentError::InvalidAmount { amount });
        }

        let store = self.payments.store();
        if store.is_key_consumed(&deposit_key(tx_hash)).await? {
            return Ok(PushOutcome::AlreadySettled);
        }

        let transfer = InboundTransfer {
            tx_hash: tx_hash.to_owned(),
            amount,
            memo: memo.map(str::trim).filter(|m| !m.is_empty()).map(str::to_owned),
            confirmations,
            received_at: self.payments.now(),
        };
        tracing::debug!(tx_hash, confirmations, amount = %amount, "inbound transfer pushed");
        Ok(match store.upsert_inbound(transfer).await? {
            Some(transfer) => PushOutcome::Buffered { transfer },
            None => PushOutcome::DeadLettered,
        })
    }

    /// Walk the inbound buffer once.
    pub async fn reconcile(&self, now: DateTime<Utc>) -> Result<ReconcileReport, WorkerError> {
        let store = self.payments.store();
        let mut report = ReconcileReport::default();

        for transfer in store.inbound_transfers().await? {
            if transfer.confirmations < self.min_confirmations {
                report.held = report.held.saturating_add(1);
                continue;
            }

            let key = deposit_key(&transfer.tx_hash);
            if store.is_key_consumed(&key).await? {
                store.remove_inbound(&transfer.tx_hash).await?;
                report.duplicates = report.duplicates.saturating_add(1);
                continue;
            }

            let matched = match transfer.memo.as_deref() {
                Some(memo) => store.find_pending_deposit(memo, transfer.amount).await?,
                None => None,
            };
            let Some(deposit) = matched else {
                let reason = unmatched_reason(&transfer);
                report
                    .unmatched
                    .push(self.dead_letter(transfer, reason, now).await?);
                continue;
            };

            let outcome = self
                .payments
                .confirm_payment(deposit.id, Some(&transfer.tx_hash), &key)
                .await?;
            match outcome {
                ConfirmOutcome::Applied(payment) => {
                    store.remove_inbound(&transfer.tx_hash).await?;
                    self.notify(&Notification::DepositConfirmed {
                        user_id: payment.user_id,
                        payment_id: payment.id,
                        amount: payment.amount,
                    })
                    .await;
                    report.confirmed.push(payment);
                }
                ConfirmOutcome::AlreadyConfirmed(payment) | ConfirmOutcome::Replayed(payment)
                    if payment.tx_hash.as_deref() == Some(transfer.tx_hash.as_str()) =>
                {
                    store.remove_inbound(&transfer.tx_hash).await?;
                    report.duplicates = report.duplicates.saturating_add(1);
                }
                // The intent was settled by a different transfer between the
                // lookup and the confirm.
                ConfirmOutcome::AlreadyConfirmed(payment) | ConfirmOutcome::Replayed(payment) => {
                    let reason = match payment.tx_hash.as_deref() {
                        Some(winner) => {
                            format!("deposit {} already settled by transfer {winner}", payment.id)
                        }
                        None => format!("deposit {} already settled", payment.id),
                    };
                    report
                        .unmatched
                        .push(self.dead_letter(transfer, reason, now).await?);
                }
            }
        }
        Ok(report)
    }

    /// Every dead-lettered transfer, oldest first.
    pub async fn dead_letters(&self) -> Result<Vec<DeadLetter>, PaymentError> {
        Ok(self.payments.store().dead_letters().await?)
    }

    /// Put a dead letter back into the inbound buffer so the next pass
    /// tries to match it again. `None` if no such dead letter exists.
    pub async fn replay_dead_letter(
        &self,
        tx_hash: &str,
    ) -> Result<Option<InboundTransfer>, PaymentError> {
        let replayed = self.payments.store().replay_dead_letter(tx_hash).await?;
        if replayed.is_some() {
            tracing::info!(tx_hash, "dead letter replayed");
        }
        Ok(replayed)
    }

    async fn dead_letter(
        &self,
        transfer: InboundTransfer,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<DeadLetter, WorkerError> {
        let letter = DeadLetter {
            transfer,
            reason,
            dead_lettered_at: now,
        };
        self.payments.store().dead_letter(letter.clone()).await?;

        self.alerts.write().await.raise(
            AlertType::DepositUnmatched,
            format!(
                "Inbound transfer {} ({} units) matched no deposit: {}",
                letter.transfer.tx_hash, letter.transfer.amount, letter.reason
            ),
            None,
            Some(letter.transfer.tx_hash.clone()),
            now,
        );
        self.payments
            .events()
            .record(narrate::deposit_unmatched(&letter))
            .await;
        Ok(letter)
    }

    async fn notify(&self, notification: &Notification) {
        if let Err(e) = self.notifier.notify(notification).await {
            tracing::warn!(error = %e, kind = notification.kind(), "notification dropped");
        }
    }
}

fn unmatched_reason(transfer: &InboundTransfer) -> String {
    match &transfer.memo {
        Some(memo) => format!(
            "no pending deposit with memo {memo:?} and amount {}",
            transfer.amount
        ),
        None => "transfer carries no memo".to_owned(),
    }
}
