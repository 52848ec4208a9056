//! Storage seam for payments, the ledger, and settlement buffers.
//!
//! The [`SettlementStore`] contract:
//!
//! - Ledger entries are append-only.
//! - [`SettlementStore::confirm_payment`] is exactly-once: consuming the
//!   idempotency key, flipping the payment to confirmed, and appending the
//!   ledger entry happen together or not at all.
//! - [`SettlementStore::reserve_withdrawal`] checks `balance - pending
//!   withdrawals` and inserts the payment plus its queue item in the same
//!   unit, so two concurrent requests cannot over-commit one balance.
//! - Inbound transfers are keyed by `tx_hash`; pushing the same hash again
//!   only raises its confirmation count.
//!
//! [`InMemorySettlementStore`] implements the contract behind one async
//! mutex. The `PostgreSQL` implementation lives in `ocean-db`.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use ocean_ledger::Ledger;
use ocean_types::{
    DeadLetter, InboundTransfer, LedgerEntry, Payment, PaymentDirection, PaymentId, PaymentStatus,
    UserId, WithdrawalQueueItem,
};

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Confirmation
// ---------------------------------------------------------------------------

/// Everything needed to confirm one payment atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    /// The payment to confirm.
    pub payment_id: PaymentId,
    /// Rail transaction hash, if known.
    pub tx_hash: Option<String>,
    /// Key that makes the confirmation exactly-once.
    pub idempotency_key: String,
    /// The ledger entry to append if the confirmation applies.
    pub entry: LedgerEntry,
    /// Confirmation time.
    pub at: DateTime<Utc>,
}

/// What a confirmation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The payment was confirmed and its ledger entry appended.
    Applied(Payment),
    /// The payment was already confirmed; nothing changed.
    AlreadyConfirmed(Payment),
    /// The idempotency key was already consumed; nothing changed. Carries
    /// the payment the key was consumed for.
    Replayed(Payment),
}

impl ConfirmOutcome {
    /// The payment record after the call.
    pub const fn payment(&self) -> &Payment {
        match self {
            Self::Applied(p) | Self::AlreadyConfirmed(p) | Self::Replayed(p) => p,
        }
    }

    /// Consume the outcome, returning the payment record.
    pub fn into_payment(self) -> Payment {
        match self {
            Self::Applied(p) | Self::AlreadyConfirmed(p) | Self::Replayed(p) => p,
        }
    }

    /// Whether this call changed anything.
    pub const fn applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Durable store for payments, ledger entries, the withdrawal queue, and
/// the inbound transfer buffers.
#[async_trait]
pub trait SettlementStore: Send + Sync + core::fmt::Debug {
    /// Insert a new payment.
    async fn insert_payment(&self, payment: Payment) -> Result<(), StoreError>;

    /// Read one payment.
    async fn payment(&self, id: PaymentId) -> Result<Option<Payment>, StoreError>;

    /// All payments of one user, oldest first.
    async fn payments_for_user(&self, user_id: UserId) -> Result<Vec<Payment>, StoreError>;

    /// The oldest pending deposit whose memo and amount both match.
    async fn find_pending_deposit(
        &self,
        memo: &str,
        amount: Decimal,
    ) -> Result<Option<Payment>, StoreError>;

    /// Sum of the user's pending withdrawals.
    async fn pending_withdrawal_total(&self, user_id: UserId) -> Result<Decimal, StoreError>;

    /// Insert a pending withdrawal and its queue item if the user's
    /// unreserved balance covers it.
    async fn reserve_withdrawal(
        &self,
        payment: Payment,
        item: WithdrawalQueueItem,
    ) -> Result<(), StoreError>;

    /// Apply an exactly-once confirmation. A confirmed withdrawal also
    /// leaves the queue.
    async fn confirm_payment(&self, request: ConfirmRequest)
    -> Result<ConfirmOutcome, StoreError>;

    /// Mark a pending payment failed and drop any queue item for it.
    async fn fail_payment(
        &self,
        id: PaymentId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<Payment, StoreError>;

    /// Whether an idempotency key has been consumed.
    async fn is_key_consumed(&self, key: &str) -> Result<bool, StoreError>;

    /// Append a ledger entry outside of a payment confirmation.
    async fn append_entry(&self, entry: LedgerEntry) -> Result<(), StoreError>;

    /// One user's ledger entries in append order.
    async fn ledger_entries(&self, user_id: UserId) -> Result<Vec<LedgerEntry>, StoreError>;

    /// Queue items due at `now`, earliest first, at most `limit`.
    async fn due_withdrawals(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<WithdrawalQueueItem>, StoreError>;

    /// Read one queue item.
    async fn queue_item(
        &self,
        payment_id: PaymentId,
    ) -> Result<Option<WithdrawalQueueItem>, StoreError>;

    /// Replace a queue item (after a failed attempt).
    async fn update_queue_item(&self, item: WithdrawalQueueItem) -> Result<(), StoreError>;

    /// Buffer an inbound transfer, merging with an earlier push of the
    /// same hash. Returns `None` if the hash is already dead-lettered (its
    /// confirmations are still raised there).
    async fn upsert_inbound(
        &self,
        transfer: InboundTransfer,
    ) -> Result<Option<InboundTransfer>, StoreError>;

    /// Every buffered inbound transfer, oldest first.
    async fn inbound_transfers(&self) -> Result<Vec<InboundTransfer>, StoreError>;

    /// Drop a buffered inbound transfer.
    async fn remove_inbound(&self, tx_hash: &str) -> Result<(), StoreError>;

    /// Move a buffered transfer into the dead-letter set.
    async fn dead_letter(&self, letter: DeadLetter) -> Result<(), StoreError>;

    /// Every dead letter, oldest first.
    async fn dead_letters(&self) -> Result<Vec<DeadLetter>, StoreError>;

    /// Move a dead letter back into the inbound buffer.
    async fn replay_dead_letter(
        &self,
        tx_hash: &str,
    ) -> Result<Option<InboundTransfer>, StoreError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SettlementState {
    payments: BTreeMap<PaymentId, Payment>,
    ledger: Ledger,
    consumed_keys: HashMap<String, PaymentId>,
    queue: BTreeMap<PaymentId, WithdrawalQueueItem>,
    inbound: BTreeMap<String, InboundTransfer>,
    dead_letters: BTreeMap<String, DeadLetter>,
}

impl SettlementState {
    fn pending_withdrawals(&self, user_id: UserId) -> Result<Decimal, StoreError> {
        self.payments
            .values()
            .filter(|p| {
                p.user_id == user_id
                    && p.direction == PaymentDirection::Withdraw
                    && p.status == PaymentStatus::Pending
            })
            .try_fold(Decimal::ZERO, |acc, p| acc.checked_add(p.amount))
            .ok_or_else(|| StoreError::Invariant("pending withdrawal total overflowed".to_owned()))
    }

    fn balance(&self, user_id: UserId) -> Result<Decimal, StoreError> {
        self.ledger
            .balance(user_id)
            .map_err(|e| StoreError::Invariant(e.to_string()))
    }
}

/// Process-local [`SettlementStore`].
#[derive(Debug, Default)]
pub struct InMemorySettlementStore {
    state: Mutex<SettlementState>,
}

impl InMemorySettlementStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn oldest_first<T, F>(mut items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    items.sort_by_key(|item| key(item));
    items
}

#[async_trait]
impl SettlementStore for InMemorySettlementStore {
    async fn insert_payment(&self, payment: Payment) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.payments.contains_key(&payment.id) {
            return Err(StoreError::DuplicatePayment(payment.id));
        }
        state.payments.insert(payment.id, payment);
        Ok(())
    }

    async fn payment(&self, id: PaymentId) -> Result<Option<Payment>, StoreError> {
        Ok(self.state.lock().await.payments.get(&id).cloned())
    }

    async fn payments_for_user(&self, user_id: UserId) -> Result<Vec<Payment>, StoreError> {
        let state = self.state.lock().await;
        let owned: Vec<Payment> = state
            .payments
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        Ok(oldest_first(owned, |p| p.created_at))
    }

    async fn find_pending_deposit(
        &self,
        memo: &str,
        amount: Decimal,
    ) -> Result<Option<Payment>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .payments
            .values()
            .filter(|p| {
                p.direction == PaymentDirection::Deposit
                    && p.status == PaymentStatus::Pending
                    && p.amount == amount
                    && p.memo.as_deref() == Some(memo)
            })
            .min_by_key(|p| (p.created_at, p.id))
            .cloned())
    }

    async fn pending_withdrawal_total(&self, user_id: UserId) -> Result<Decimal, StoreError> {
        self.state.lock().await.pending_withdrawals(user_id)
    }

    async fn reserve_withdrawal(
        &self,
        payment: Payment,
        item: WithdrawalQueueItem,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.payments.contains_key(&payment.id) {
            return Err(StoreError::DuplicatePayment(payment.id));
        }
        if item.payment_id != payment.id {
            return Err(StoreError::Invariant(format!(
                "queue item {} does not belong to payment {}",
                item.payment_id, payment.id
            )));
        }

        let balance = state.balance(payment.user_id)?;
        let pending = state.pending_withdrawals(payment.user_id)?;
        let available = balance
            .checked_sub(pending)
            .ok_or_else(|| StoreError::Invariant("available balance overflowed".to_owned()))?;
        if available < payment.amount {
            return Err(StoreError::InsufficientFunds {
                user_id: payment.user_id,
                available,
                requested: payment.amount,
            });
        }

        state.queue.insert(item.payment_id, item);
        state.payments.insert(payment.id, payment);
        Ok(())
    }

    async fn confirm_payment(
        &self,
        request: ConfirmRequest,
    ) -> Result<ConfirmOutcome, StoreError> {
        let mut state = self.state.lock().await;

        if let Some(owner) = state.consumed_keys.get(&request.idempotency_key) {
            let payment = state.payments.get(owner).cloned().ok_or_else(|| {
                StoreError::Invariant(format!("consumed key points at missing payment {owner}"))
            })?;
            return Ok(ConfirmOutcome::Replayed(payment));
        }

        let current = state
            .payments
            .get(&request.payment_id)
            .cloned()
            .ok_or(StoreError::PaymentNotFound(request.payment_id))?;
        match current.status {
            PaymentStatus::Confirmed => return Ok(ConfirmOutcome::AlreadyConfirmed(current)),
            PaymentStatus::Failed => {
                return Err(StoreError::InvalidStatus {
                    payment_id: current.id,
                    status: current.status,
                });
            }
            PaymentStatus::Pending => {}
        }
        if request.entry.ref_id != Some(current.id) || request.entry.user_id != current.user_id {
            return Err(StoreError::Invariant(format!(
                "ledger entry does not belong to payment {}",
                current.id
            )));
        }

        let mut confirmed = current;
        confirmed.status = PaymentStatus::Confirmed;
        confirmed.tx_hash = request.tx_hash.or(confirmed.tx_hash);
        confirmed.confirmed_at = Some(request.at);
        confirmed.updated_at = request.at;

        state
            .consumed_keys
            .insert(request.idempotency_key, confirmed.id);
        state.ledger.append_entry(request.entry);
        state.queue.remove(&confirmed.id);
        state.payments.insert(confirmed.id, confirmed.clone());
        Ok(ConfirmOutcome::Applied(confirmed))
    }

    async fn fail_payment(
        &self,
        id: PaymentId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<Payment, StoreError> {
        let mut state = self.state.lock().await;
        let mut payment = state
            .payments
            .get(&id)
            .cloned()
            .ok_or(StoreError::PaymentNotFound(id))?;
        if payment.status != PaymentStatus::Pending {
            return Err(StoreError::InvalidStatus {
                payment_id: id,
                status: payment.status,
            });
        }
        payment.status = PaymentStatus::Failed;
        payment.failure_reason = Some(reason.to_owned());
        payment.updated_at = at;
        state.queue.remove(&id);
        state.payments.insert(id, payment.clone());
        Ok(payment)
    }

    async fn is_key_consumed(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.state.lock().await.consumed_keys.contains_key(key))
    }

    async fn append_entry(&self, entry: LedgerEntry) -> Result<(), StoreError> {
        self.state.lock().await.ledger.append_entry(entry);
        Ok(())
    }

    async fn ledger_entries(&self, user_id: UserId) -> Result<Vec<LedgerEntry>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.ledger.entries_for_user(user_id).cloned().collect())
    }

    async fn due_withdrawals(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<WithdrawalQueueItem>, StoreError> {
        let state = self.state.lock().await;
        let mut due: Vec<WithdrawalQueueItem> = state
            .queue
            .values()
            .filter(|item| item.next_attempt_at <= now)
            .cloned()
            .collect();
        due.sort_by_key(|item| (item.next_attempt_at, item.payment_id));
        due.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(due)
    }

    async fn queue_item(
        &self,
        payment_id: PaymentId,
    ) -> Result<Option<WithdrawalQueueItem>, StoreError> {
        Ok(self.state.lock().await.queue.get(&payment_id).cloned())
    }

    async fn update_queue_item(&self, item: WithdrawalQueueItem) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        match state.queue.get_mut(&item.payment_id) {
            Some(slot) => {
                *slot = item;
                Ok(())
            }
            None => Err(StoreError::PaymentNotFound(item.payment_id)),
        }
    }

    async fn upsert_inbound(
        &self,
        transfer: InboundTransfer,
    ) -> Result<Option<InboundTransfer>, StoreError> {
        let mut state = self.state.lock().await;
        if let Some(letter) = state.dead_letters.get_mut(&transfer.tx_hash) {
            letter.transfer.confirmations =
                letter.transfer.confirmations.max(transfer.confirmations);
            return Ok(None);
        }
        let merged = match state.inbound.get(&transfer.tx_hash) {
            Some(existing) => InboundTransfer {
                confirmations: existing.confirmations.max(transfer.confirmations),
                ..existing.clone()
            },
            None => transfer,
        };
        state.inbound.insert(merged.tx_hash.clone(), merged.clone());
        Ok(Some(merged))
    }

    async fn inbound_transfers(&self) -> Result<Vec<InboundTransfer>, StoreError> {
        let state = self.state.lock().await;
        let buffered: Vec<InboundTransfer> = state.inbound.values().cloned().collect();
        Ok(oldest_first(buffered, |t| t.received_at))
    }

    async fn remove_inbound(&self, tx_hash: &str) -> Result<(), StoreError> {
        self.state.lock().await.inbound.remove(tx_hash);
        Ok(())
    }

    async fn dead_letter(&self, letter: DeadLetter) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.inbound.remove(&letter.transfer.tx_hash);
        state
            .dead_letters
            .insert(letter.transfer.tx_hash.clone(), letter);
        Ok(())
    }

    async fn dead_letters(&self) -> Result<Vec<DeadLetter>, StoreError> {
        let state = self.state.lock().await;
        let letters: Vec<DeadLetter> = state.dead_letters.values().cloned().collect();
        Ok(oldest_first(letters, |l| l.dead_lettered_at))
    }

    async fn replay_dead_letter(
        &self,
        tx_hash: &str,
    ) -> Result<Option<InboundTransfer>, StoreError> {
        let mut state = self.state.lock().await;
        let Some(letter) = state.dead_letters.remove(tx_hash) else {
            return Ok(None);
        };
        state
            .inbound
            .insert(letter.transfer.tx_hash.clone(), letter.transfer.clone());
        Ok(Some(letter.transfer))
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use chrono::TimeDelta;
    use ocean_ledger::EntryBuilder;
    use ocean_types::LedgerReason;

    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
    }

    fn payment(user_id: UserId, direction: PaymentDirection, amount: i64) -> Payment {
        Payment {
            id: PaymentId::new(),
            user_id,
            direction,
            amount: Decimal::new(amount, 0),
            status: PaymentStatus::Pending,
            memo: Some("memo-1".to_owned()),
            tx_hash: None,
            failure_reason: None,
            created_at: now(),
            updated_at: now(),
            confirmed_at: None,
        }
    }

    fn queue_item(payment: &Payment) -> WithdrawalQueueItem {
        WithdrawalQueueItem {
            payment_id: payment.id,
            next_attempt_at: now(),
            attempts: 0,
            idempotency_key: format!("withdraw:{}", payment.id),
            last_error: None,
        }
    }

    fn credit(user_id: UserId, amount: i64) -> LedgerEntry {
        EntryBuilder::new(user_id, LedgerReason::Adjustment)
            .delta(Decimal::new(amount, 0))
            .at(now())
            .build()
            .unwrap_or_else(|e| panic!("{e}"))
    }

    fn confirm_request(payment: &Payment, key: &str) -> ConfirmRequest {
        ConfirmRequest {
            payment_id: payment.id,
            tx_hash: Some("0xabc".to_owned()),
            idempotency_key: key.to_owned(),
            entry: EntryBuilder::new(payment.user_id, LedgerReason::Deposit)
                .delta(payment.amount)
                .ref_id(payment.id)
                .at(now())
                .build()
                .unwrap_or_else(|e| panic!("{e}")),
            at: now(),
        }
    }

    #[tokio::test]
    async fn confirm_is_exactly_once_per_key() {
        let store = InMemorySettlementStore::new();
        let user = UserId::new();
        let deposit = payment(user, PaymentDirection::Deposit, 500);
        assert!(store.insert_payment(deposit.clone()).await.is_ok());

        let first = store
            .confirm_payment(confirm_request(&deposit, "deposit:0xabc"))
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        let second = store
            .confirm_payment(confirm_request(&deposit, "deposit:0xabc"))
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        let third = store
            .confirm_payment(confirm_request(&deposit, "deposit:other"))
            .await
            .unwrap_or_else(|e| panic!("{e}"));

        assert!(first.applied());
        assert!(matches!(second, ConfirmOutcome::Replayed(_)));
        assert!(matches!(third, ConfirmOutcome::AlreadyConfirmed(_)));
        assert_eq!(store.ledger_entries(user).await.map(|e| e.len()), Ok(1));
        assert_eq!(first.payment().status, PaymentStatus::Confirmed);
    }

    #[tokio::test]
    async fn reservation_counts_pending_withdrawals() {
        let store = InMemorySettlementStore::new();
        let user = UserId::new();
        assert!(store.append_entry(credit(user, 100)).await.is_ok());

        let first = payment(user, PaymentDirection::Withdraw, 70);
        let item = queue_item(&first);
        assert!(store.reserve_withdrawal(first, item).await.is_ok());

        let second = payment(user, PaymentDirection::Withdraw, 40);
        let item = queue_item(&second);
        let result = store.reserve_withdrawal(second, item).await;
        assert_eq!(
            result,
            Err(StoreError::InsufficientFunds {
                user_id: user,
                available: Decimal::new(30, 0),
                requested: Decimal::new(40, 0),
            })
        );
        assert_eq!(
            store.pending_withdrawal_total(user).await,
            Ok(Decimal::new(70, 0))
        );
    }

    #[tokio::test]
    async fn failing_releases_reservation_and_queue() {
        let store = InMemorySettlementStore::new();
        let user = UserId::new();
        assert!(store.append_entry(credit(user, 100)).await.is_ok());
        let withdrawal = payment(user, PaymentDirection::Withdraw, 100);
        let item = queue_item(&withdrawal);
        assert!(store.reserve_withdrawal(withdrawal.clone(), item).await.is_ok());

        let failed = store
            .fail_payment(withdrawal.id, "rail down", now())
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(failed.status, PaymentStatus::Failed);
        assert_eq!(store.queue_item(withdrawal.id).await, Ok(None));
        assert_eq!(store.pending_withdrawal_total(user).await, Ok(Decimal::ZERO));

        let again = store.fail_payment(withdrawal.id, "again", now()).await;
        assert!(matches!(again, Err(StoreError::InvalidStatus { .. })));
    }

    #[tokio::test]
    async fn due_withdrawals_respect_time_and_limit() {
        let store = InMemorySettlementStore::new();
        let user = UserId::new();
        assert!(store.append_entry(credit(user, 1_000)).await.is_ok());

        for offset in [0, 10, 20] {
            let p = payment(user, PaymentDirection::Withdraw, 10);
            let mut item = queue_item(&p);
            item.next_attempt_at = now() + TimeDelta::seconds(offset);
            assert!(store.reserve_withdrawal(p, item).await.is_ok());
        }

        let due = store
            .due_withdrawals(now() + TimeDelta::seconds(15), 10)
            .await
            .unwrap_or_default();
        assert_eq!(due.len(), 2);

        let capped = store
            .due_withdrawals(now() + TimeDelta::seconds(30), 1)
            .await
            .unwrap_or_default();
        assert_eq!(capped.len(), 1);
        assert_eq!(capped.first().map(|i| i.next_attempt_at), Some(now()));
    }

    #[tokio::test]
    async fn inbound_upsert_keeps_highest_confirmations() {
        let store = InMemorySettlementStore::new();
        let transfer = InboundTransfer {
            tx_hash: "0xfeed".to_owned(),
            amount: Decimal::new(500, 0),
            memo: Some("memo-1".to_owned()),
            confirmations: 2,
            received_at: now(),
        };
        let _ = store.upsert_inbound(transfer.clone()).await;
        let lower = InboundTransfer {
            confirmations: 1,
            received_at: now() + TimeDelta::seconds(5),
            ..transfer.clone()
        };
        let merged = store
            .upsert_inbound(lower)
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(merged.map(|t| (t.confirmations, t.received_at)), Some((2, now())));
        assert_eq!(store.inbound_transfers().await.map(|t| t.len()), Ok(1));
    }

    #[tokio::test]
    async fn dead_letter_round_trip() {
        let store = InMemorySettlementStore::new();
        let transfer = InboundTransfer {
            tx_hash: "0xdead".to_owned(),
            amount: Decimal::new(500, 0),
            memo: None,
            confirmations: 3,
            received_at: now(),
        };
        let _ = store.upsert_inbound(transfer.clone()).await;
        let letter = DeadLetter {
            transfer: transfer.clone(),
            reason: "no match".to_owned(),
            dead_lettered_at: now(),
        };
        assert!(store.dead_letter(letter).await.is_ok());
        assert_eq!(store.inbound_transfers().await.map(|t| t.len()), Ok(0));

        // Further pushes land on the dead letter, not the buffer.
        let bumped = InboundTransfer {
            confirmations: 9,
            ..transfer.clone()
        };
        assert_eq!(store.upsert_inbound(bumped).await, Ok(None));

        let replayed = store
            .replay_dead_letter("0xdead")
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(replayed.map(|t| t.confirmations), Some(9));
        assert_eq!(store.dead_letters().await.map(|l| l.len()), Ok(0));
        assert_eq!(store.replay_dead_letter("0xdead").await, Ok(None));
    }
}
