//! Deposit intents, withdrawal requests, confirmation, and balance reads.
//!
//! [`PaymentService`] is the ledger's only writer. A deposit intent has no
//! balance effect until it is confirmed; a withdrawal request reserves its
//! amount against the user's balance straight away and debits it on
//! confirmation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use ocean_events::{EventLog, narrate};
use ocean_ledger::{AuditResult, EntryBuilder, audit_user, ensure_sufficient, fold_balance};
use ocean_types::{
    Clock, LedgerEntry, LedgerReason, Payment, PaymentDirection, PaymentId, PaymentStatus, UserId,
    WithdrawalQueueItem, is_positive_units,
};

use crate::error::PaymentError;
use crate::store::{ConfirmOutcome, ConfirmRequest, SettlementStore};

/// Idempotency key for confirming the deposit that `tx_hash` paid.
pub fn deposit_key(tx_hash: &str) -> String {
    format!("deposit:{tx_hash}")
}

/// Idempotency key for dispatching and confirming a withdrawal.
pub fn withdraw_key(payment_id: PaymentId) -> String {
    format!("withdraw:{payment_id}")
}

/// Payment and balance operations over a [`SettlementStore`].
#[derive(Debug, Clone)]
pub struct PaymentService {
    store: Arc<dyn SettlementStore>,
    clock: Arc<dyn Clock>,
    events: Arc<EventLog>,
}

impl PaymentService {
    /// Wire a service over its collaborators.
    pub fn new(
        store: Arc<dyn SettlementStore>,
        clock: Arc<dyn Clock>,
        events: Arc<EventLog>,
    ) -> Self {
        Self {
            store,
            clock,
            events,
        }
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn SettlementStore> {
        &self.store
    }

    /// The shared event log.
    pub fn events(&self) -> &Arc<EventLog> {
        &self.events
    }

    /// Current time from the injected clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // -----------------------------------------------------------------------
    // Payments
    // -----------------------------------------------------------------------

    /// Record a pending deposit the user is about to send with `memo`.
    pub async fn create_deposit_intent(
        &self,
        user_id: UserId,
        amount: Decimal,
        memo: &str,
    ) -> Result<Payment, PaymentError> {
        check_amount(amount)?;
        let memo = memo.trim();
        if memo.is_empty() {
            return Err(PaymentError::EmptyMemo);
        }

        let now = self.clock.now();
        let payment = pending(user_id, PaymentDirection::Deposit, amount, Some(memo), now);
        self.store.insert_payment(payment.clone()).await?;

        tracing::info!(
            payment_id = %payment.id,
            user_id = %user_id,
            amount = %amount,
            "deposit intent created"
        );
        self.events
            .record(narrate::deposit_intent_created(&payment))
            .await;
        Ok(payment)
    }

    /// Request a withdrawal and queue it for dispatch.
    ///
    /// Fails unless the ledger balance minus already pending withdrawals
    /// covers `amount`.
    pub async fn create_withdraw_request(
        &self,
        user_id: UserId,
        amount: Decimal,
    ) -> Result<Payment, PaymentError> {
        check_amount(amount)?;
        self.ensure_sufficient_balance(user_id, amount).await?;

        let now = self.clock.now();
        let payment = pending(user_id, PaymentDirection::Withdraw, amount, None, now);
        let item = WithdrawalQueueItem {
            payment_id: payment.id,
            next_attempt_at: now,
            attempts: 0,
            idempotency_key: withdraw_key(payment.id),
            last_error: None,
        };
        self.store.reserve_withdrawal(payment.clone(), item).await?;

        tracing::info!(
            payment_id = %payment.id,
            user_id = %user_id,
            amount = %amount,
            "withdrawal requested"
        );
        self.events
            .record(narrate::withdrawal_requested(&payment))
            .await;
        Ok(payment)
    }

    /// Confirm a payment exactly once per idempotency key.
    ///
    /// A consumed key or an already confirmed payment returns the stored
    /// record and changes nothing. Otherwise the payment becomes confirmed
    /// and one ledger entry is appended: a credit for a deposit, a debit
    /// for a withdrawal.
    pub async fn confirm_payment(
        &self,
        payment_id: PaymentId,
        tx_hash: Option<&str>,
        idempotency_key: &str,
    ) -> Result<ConfirmOutcome, PaymentError> {
        let payment = self
            .store
            .payment(payment_id)
            .await?
            .ok_or(PaymentError::PaymentNotFound(payment_id))?;

        let now = self.clock.now();
        let (reason, delta) = match payment.direction {
            PaymentDirection::Deposit => (LedgerReason::Deposit, payment.amount),
            PaymentDirection::Withdraw => {
                let mut debit = payment.amount;
                debit.set_sign_negative(true);
                (LedgerReason::Withdrawal, debit)
            }
        };
        let entry = EntryBuilder::new(payment.user_id, reason)
            .delta(delta)
            .ref_id(payment.id)
            .at(now)
            .build()?;

        let outcome = self
            .store
            .confirm_payment(ConfirmRequest {
                payment_id,
                tx_hash: tx_hash.map(str::to_owned),
                idempotency_key: idempotency_key.to_owned(),
                entry,
                at: now,
            })
            .await?;

        if let ConfirmOutcome::Applied(confirmed) = &outcome {
            tracing::info!(
                payment_id = %confirmed.id,
                user_id = %confirmed.user_id,
                direction = confirmed.direction.as_str(),
                amount = %confirmed.amount,
                "payment confirmed"
            );
            self.events
                .record(narrate::payment_confirmed(confirmed, now))
                .await;
        } else {
            tracing::debug!(
                payment_id = %payment_id,
                key = idempotency_key,
                "confirmation replay ignored"
            );
        }
        Ok(outcome)
    }

    /// Read one payment.
    pub async fn get_payment(&self, payment_id: PaymentId) -> Result<Payment, PaymentError> {
        self.store
            .payment(payment_id)
            .await?
            .ok_or(PaymentError::PaymentNotFound(payment_id))
    }

    /// A user's payments, oldest first.
    pub async fn list_payments(&self, user_id: UserId) -> Result<Vec<Payment>, PaymentError> {
        Ok(self.store.payments_for_user(user_id).await?)
    }

    // -----------------------------------------------------------------------
    // Ledger
    // -----------------------------------------------------------------------

    /// Append a validated entry. Payment confirmations append their own
    /// entries; this path is for operator adjustments.
    pub async fn append_entry(&self, entry: LedgerEntry) -> Result<(), PaymentError> {
        tracing::info!(
            user_id = %entry.user_id,
            delta = %entry.delta,
            reason = entry.reason.as_str(),
            "ledger entry appended"
        );
        Ok(self.store.append_entry(entry).await?)
    }

    /// The signed sum of the user's ledger entries.
    pub async fn get_balance(&self, user_id: UserId) -> Result<Decimal, PaymentError> {
        let entries = self.store.ledger_entries(user_id).await?;
        Ok(fold_balance(user_id, &entries)?)
    }

    /// Balance not already promised to pending withdrawals.
    pub async fn available_balance(&self, user_id: UserId) -> Result<Decimal, PaymentError> {
        let balance = self.get_balance(user_id).await?;
        let pending = self.store.pending_withdrawal_total(user_id).await?;
        balance
            .checked_sub(pending)
            .ok_or(PaymentError::Ledger(ocean_ledger::LedgerError::Overflow))
    }

    /// Fail unless the user's ledger balance covers `amount`.
    pub async fn ensure_sufficient_balance(
        &self,
        user_id: UserId,
        amount: Decimal,
    ) -> Result<(), PaymentError> {
        let balance = self.get_balance(user_id).await?;
        Ok(ensure_sufficient(user_id, balance, amount)?)
    }

    /// Check the user's ledger history for integrity violations.
    pub async fn audit(&self, user_id: UserId) -> Result<AuditResult, PaymentError> {
        let entries = self.store.ledger_entries(user_id).await?;
        Ok(audit_user(user_id, &entries))
    }
}

fn check_amount(amount: Decimal) -> Result<(), PaymentError> {
    if is_positive_units(amount) {
        Ok(())
    } else {
        Err(PaymentError::InvalidAmount { amount })
    }
}

fn pending(
    user_id: UserId,
    direction: PaymentDirection,
    amount: Decimal,
    memo: Option<&str>,
    now: DateTime<Utc>,
) -> Payment {
    Payment {
        id: PaymentId::new(),
        user_id,
        direction,
        amount,
        status: PaymentStatus::Pending,
        memo: memo.map(str::to_owned),
        tx_hash: None,
        failure_reason: None,
        created_at: now,
        updated_at: now,
        confirmed_at: None,
    }
}
