//! `PostgreSQL` implementation of [`SettlementStore`].
//!
//! Withdrawal reservations take a transaction-scoped advisory lock on the
//! user, so two concurrent requests cannot both pass the available-balance
//! check. Confirmations lock the payment row and consume the idempotency
//! key in the same transaction that appends the ledger entry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use ocean_settlement::{ConfirmOutcome, ConfirmRequest, SettlementStore, StoreError};
use ocean_types::{
    DeadLetter, InboundTransfer, LedgerEntry, LedgerEntryId, Payment, PaymentDirection, PaymentId,
    PaymentStatus, UserId, WithdrawalQueueItem,
};

use crate::error::{DbError, narrow, parse_enum};

const PAYMENT_COLUMNS: &str = "id, user_id, direction, amount, status, memo, tx_hash, \
    failure_reason, created_at, updated_at, confirmed_at";

const LEDGER_COLUMNS: &str = "id, user_id, delta, reason, ref_id, created_at";

const QUEUE_COLUMNS: &str = "payment_id, next_attempt_at, attempts, idempotency_key, last_error";

const INBOUND_COLUMNS: &str = "tx_hash, amount, memo, confirmations, received_at";

const DEAD_LETTER_COLUMNS: &str =
    "tx_hash, amount, memo, confirmations, received_at, reason, dead_lettered_at";

fn backend(err: sqlx::Error) -> StoreError {
    DbError::from(err).into()
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `payments` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentRow {
    /// Payment UUID.
    pub id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    /// Direction name.
    pub direction: String,
    /// Amount in base units.
    pub amount: Decimal,
    /// Status name.
    pub status: String,
    /// Matching memo.
    pub memo: Option<String>,
    /// Settling transfer hash.
    pub tx_hash: Option<String>,
    /// Last dispatch error.
    pub failure_reason: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
    /// Confirmation time.
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DbError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: PaymentId::from(row.id),
            user_id: UserId::from(row.user_id),
            direction: parse_enum(&row.direction)?,
            amount: row.amount,
            status: parse_enum(&row.status)?,
            memo: row.memo,
            tx_hash: row.tx_hash,
            failure_reason: row.failure_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
            confirmed_at: row.confirmed_at,
        })
    }
}

/// A row from the `ledger_entries` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LedgerRow {
    /// Entry UUID.
    pub id: Uuid,
    /// Whose balance moved.
    pub user_id: Uuid,
    /// Signed movement.
    pub delta: Decimal,
    /// Reason name.
    pub reason: String,
    /// Settled payment.
    pub ref_id: Option<Uuid>,
    /// Append time.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<LedgerRow> for LedgerEntry {
    type Error = DbError;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: LedgerEntryId::from(row.id),
            user_id: UserId::from(row.user_id),
            delta: row.delta,
            reason: parse_enum(&row.reason)?,
            ref_id: row.ref_id.map(PaymentId::from),
            created_at: row.created_at,
        })
    }
}

/// A row from the `withdrawal_queue` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QueueRow {
    /// Queued withdrawal.
    pub payment_id: Uuid,
    /// Earliest next attempt.
    pub next_attempt_at: DateTime<Utc>,
    /// Failed attempts so far.
    pub attempts: i32,
    /// Rail idempotency key.
    pub idempotency_key: String,
    /// Last dispatch error.
    pub last_error: Option<String>,
}

impl TryFrom<QueueRow> for WithdrawalQueueItem {
    type Error = DbError;

    fn try_from(row: QueueRow) -> Result<Self, Self::Error> {
        Ok(Self {
            payment_id: PaymentId::from(row.payment_id),
            next_attempt_at: row.next_attempt_at,
            attempts: narrow(row.attempts, "attempts")?,
            idempotency_key: row.idempotency_key,
            last_error: row.last_error,
        })
    }
}

/// A row from the `inbound_transfers` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InboundRow {
    /// Rail transaction hash.
    pub tx_hash: String,
    /// Amount received.
    pub amount: Decimal,
    /// Sender memo.
    pub memo: Option<String>,
    /// Confirmations seen.
    pub confirmations: i32,
    /// First report time.
    pub received_at: DateTime<Utc>,
}

impl TryFrom<InboundRow> for InboundTransfer {
    type Error = DbError;

    fn try_from(row: InboundRow) -> Result<Self, Self::Error> {
        Ok(Self {
            tx_hash: row.tx_hash,
            amount: row.amount,
            memo: row.memo,
            confirmations: narrow(row.confirmations, "confirmations")?,
            received_at: row.received_at,
        })
    }
}

/// A row from the `dead_letters` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DeadLetterRow {
    /// Rail transaction hash.
    pub tx_hash: String,
    /// Amount received.
    pub amount: Decimal,
    /// Sender memo.
    pub memo: Option<String>,
    /// Confirmations seen.
    pub confirmations: i32,
    /// First report time.
    pub received_at: DateTime<Utc>,
    /// Why it was parked.
    pub reason: String,
    /// When it was parked.
    pub dead_lettered_at: DateTime<Utc>,
}

impl TryFrom<DeadLetterRow> for DeadLetter {
    type Error = DbError;

    fn try_from(row: DeadLetterRow) -> Result<Self, Self::Error> {
        Ok(Self {
            transfer: InboundTransfer {
                tx_hash: row.tx_hash,
                amount: row.amount,
                memo: row.memo,
                confirmations: narrow(row.confirmations, "confirmations")?,
                received_at: row.received_at,
            },
            reason: row.reason,
            dead_lettered_at: row.dead_lettered_at,
        })
    }
}

fn decode_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = DbError>,
{
    rows.into_iter()
        .map(|row| T::try_from(row).map_err(StoreError::from))
        .collect()
}

// ---------------------------------------------------------------------------
// Shared statements
// ---------------------------------------------------------------------------

async fn select_payment(
    conn: &mut PgConnection,
    id: PaymentId,
    for_update: bool,
) -> Result<Option<Payment>, StoreError> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    let row = sqlx::query_as::<_, PaymentRow>(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1{lock}"
    ))
    .bind(id.into_inner())
    .fetch_optional(conn)
    .await
    .map_err(backend)?;
    Ok(row.map(Payment::try_from).transpose()?)
}

async fn insert_payment_row(conn: &mut PgConnection, payment: &Payment) -> Result<(), StoreError> {
    let inserted = sqlx::query(&format!(
        "INSERT INTO payments ({PAYMENT_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         ON CONFLICT (id) DO NOTHING"
    ))
    .bind(payment.id.into_inner())
    .bind(payment.user_id.into_inner())
    .bind(payment.direction.as_str())
    .bind(payment.amount)
    .bind(payment.status.as_str())
    .bind(&payment.memo)
    .bind(&payment.tx_hash)
    .bind(&payment.failure_reason)
    .bind(payment.created_at)
    .bind(payment.updated_at)
    .bind(payment.confirmed_at)
    .execute(conn)
    .await
    .map_err(backend)?
    .rows_affected();
    if inserted == 0 {
        return Err(StoreError::DuplicatePayment(payment.id));
    }
    Ok(())
}

async fn insert_entry_row(conn: &mut PgConnection, entry: &LedgerEntry) -> Result<(), StoreError> {
    sqlx::query(&format!(
        "INSERT INTO ledger_entries ({LEDGER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)"
    ))
    .bind(entry.id.into_inner())
    .bind(entry.user_id.into_inner())
    .bind(entry.delta)
    .bind(entry.reason.as_str())
    .bind(entry.ref_id.map(PaymentId::into_inner))
    .bind(entry.created_at)
    .execute(conn)
    .await
    .map_err(backend)?;
    Ok(())
}

async fn consumed_by(conn: &mut PgConnection, key: &str) -> Result<Option<PaymentId>, StoreError> {
    let owner: Option<Uuid> =
        sqlx::query_scalar("SELECT payment_id FROM idempotency_keys WHERE key = $1")
            .bind(key)
            .fetch_optional(conn)
            .await
            .map_err(backend)?;
    Ok(owner.map(PaymentId::from))
}

async fn balance_of(conn: &mut PgConnection, user_id: UserId) -> Result<Decimal, StoreError> {
    sqlx::query_scalar("SELECT COALESCE(SUM(delta), 0) FROM ledger_entries WHERE user_id = $1")
        .bind(user_id.into_inner())
        .fetch_one(conn)
        .await
        .map_err(backend)
}

async fn pending_withdrawals_of(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Decimal, StoreError> {
    sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0) FROM payments \
         WHERE user_id = $1 AND direction = $2 AND status = $3",
    )
    .bind(user_id.into_inner())
    .bind(PaymentDirection::Withdraw.as_str())
    .bind(PaymentStatus::Pending.as_str())
    .fetch_one(conn)
    .await
    .map_err(backend)
}

async fn buffer_inbound(
    conn: &mut PgConnection,
    transfer: &InboundTransfer,
) -> Result<InboundTransfer, StoreError> {
    let row = sqlx::query_as::<_, InboundRow>(&format!(
        "INSERT INTO inbound_transfers ({INBOUND_COLUMNS}) VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (tx_hash) DO UPDATE \
         SET confirmations = GREATEST(inbound_transfers.confirmations, EXCLUDED.confirmations) \
         RETURNING {INBOUND_COLUMNS}"
    ))
    .bind(&transfer.tx_hash)
    .bind(transfer.amount)
    .bind(&transfer.memo)
    .bind(narrow::<u32, i32>(transfer.confirmations, "confirmations")?)
    .bind(transfer.received_at)
    .fetch_one(conn)
    .await
    .map_err(backend)?;
    Ok(InboundTransfer::try_from(row)?)
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// [`SettlementStore`] over a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgSettlementStore {
    pool: PgPool,
}

impl PgSettlementStore {
    /// Wrap an existing pool. Migrations must already have run.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn replayed(&self, owner: PaymentId) -> Result<ConfirmOutcome, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        let payment = select_payment(&mut conn, owner, false)
            .await?
            .ok_or_else(|| {
                StoreError::Invariant(format!("consumed key points at missing payment {owner}"))
            })?;
        Ok(ConfirmOutcome::Replayed(payment))
    }
}

#[async_trait]
impl SettlementStore for PgSettlementStore {
    async fn insert_payment(&self, payment: Payment) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        insert_payment_row(&mut conn, &payment).await
    }

    async fn payment(&self, id: PaymentId) -> Result<Option<Payment>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        select_payment(&mut conn, id, false).await
    }

    async fn payments_for_user(&self, user_id: UserId) -> Result<Vec<Payment>, StoreError> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE user_id = $1 ORDER BY created_at, id"
        ))
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        decode_all(rows)
    }

    async fn find_pending_deposit(
        &self,
        memo: &str,
        amount: Decimal,
    ) -> Result<Option<Payment>, StoreError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments \
             WHERE direction = $1 AND status = $2 AND memo = $3 AND amount = $4 \
             ORDER BY created_at, id LIMIT 1"
        ))
        .bind(PaymentDirection::Deposit.as_str())
        .bind(PaymentStatus::Pending.as_str())
        .bind(memo)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.map(Payment::try_from).transpose()?)
    }

    async fn pending_withdrawal_total(&self, user_id: UserId) -> Result<Decimal, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        pending_withdrawals_of(&mut conn, user_id).await
    }

    async fn reserve_withdrawal(
        &self,
        payment: Payment,
        item: WithdrawalQueueItem,
    ) -> Result<(), StoreError> {
        if item.payment_id != payment.id {
            return Err(StoreError::Invariant(format!(
                "queue item {} does not belong to payment {}",
                item.payment_id, payment.id
            )));
        }

        let mut tx = self.pool.begin().await.map_err(backend)?;
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(payment.user_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        let balance = balance_of(&mut tx, payment.user_id).await?;
        let pending = pending_withdrawals_of(&mut tx, payment.user_id).await?;
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

        insert_payment_row(&mut tx, &payment).await?;
        sqlx::query(&format!(
            "INSERT INTO withdrawal_queue ({QUEUE_COLUMNS}) VALUES ($1, $2, $3, $4, $5)"
        ))
        .bind(item.payment_id.into_inner())
        .bind(item.next_attempt_at)
        .bind(narrow::<u32, i32>(item.attempts, "attempts")?)
        .bind(&item.idempotency_key)
        .bind(&item.last_error)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn confirm_payment(
        &self,
        request: ConfirmRequest,
    ) -> Result<ConfirmOutcome, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        if let Some(owner) = consumed_by(&mut tx, &request.idempotency_key).await? {
            drop(tx);
            return self.replayed(owner).await;
        }
        let current = select_payment(&mut tx, request.payment_id, true)
            .await?
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

        let claimed = sqlx::query(
            "INSERT INTO idempotency_keys (key, payment_id, consumed_at) VALUES ($1, $2, $3) \
             ON CONFLICT (key) DO NOTHING",
        )
        .bind(&request.idempotency_key)
        .bind(current.id.into_inner())
        .bind(request.at)
        .execute(&mut *tx)
        .await
        .map_err(backend)?
        .rows_affected();
        if claimed == 0 {
            // Another payment consumed the key between the check and the insert.
            drop(tx);
            let mut conn = self.pool.acquire().await.map_err(backend)?;
            let owner = consumed_by(&mut conn, &request.idempotency_key)
                .await?
                .ok_or_else(|| StoreError::Invariant("idempotency key vanished".to_owned()))?;
            drop(conn);
            return self.replayed(owner).await;
        }

        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "UPDATE payments \
             SET status = $2, tx_hash = COALESCE($3, tx_hash), confirmed_at = $4, updated_at = $4 \
             WHERE id = $1 \
             RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(current.id.into_inner())
        .bind(PaymentStatus::Confirmed.as_str())
        .bind(&request.tx_hash)
        .bind(request.at)
        .fetch_one(&mut *tx)
        .await
        .map_err(backend)?;
        let confirmed = Payment::try_from(row)?;

        insert_entry_row(&mut tx, &request.entry).await?;
        sqlx::query("DELETE FROM withdrawal_queue WHERE payment_id = $1")
            .bind(confirmed.id.into_inner())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(ConfirmOutcome::Applied(confirmed))
    }

    async fn fail_payment(
        &self,
        id: PaymentId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<Payment, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let current = select_payment(&mut tx, id, true)
            .await?
            .ok_or(StoreError::PaymentNotFound(id))?;
        if current.status != PaymentStatus::Pending {
            return Err(StoreError::InvalidStatus {
                payment_id: id,
                status: current.status,
            });
        }

        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "UPDATE payments SET status = $2, failure_reason = $3, updated_at = $4 \
             WHERE id = $1 \
             RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(id.into_inner())
        .bind(PaymentStatus::Failed.as_str())
        .bind(reason)
        .bind(at)
        .fetch_one(&mut *tx)
        .await
        .map_err(backend)?;
        let failed = Payment::try_from(row)?;

        sqlx::query("DELETE FROM withdrawal_queue WHERE payment_id = $1")
            .bind(id.into_inner())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(failed)
    }

    async fn is_key_consumed(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        Ok(consumed_by(&mut conn, key).await?.is_some())
    }

    async fn append_entry(&self, entry: LedgerEntry) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        insert_entry_row(&mut conn, &entry).await
    }

    async fn ledger_entries(&self, user_id: UserId) -> Result<Vec<LedgerEntry>, StoreError> {
        let rows = sqlx::query_as::<_, LedgerRow>(&format!(
            "SELECT {LEDGER_COLUMNS} FROM ledger_entries WHERE user_id = $1 ORDER BY seq"
        ))
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        decode_all(rows)
    }

    async fn due_withdrawals(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<WithdrawalQueueItem>, StoreError> {
        let rows = sqlx::query_as::<_, QueueRow>(&format!(
            "SELECT {QUEUE_COLUMNS} FROM withdrawal_queue \
             WHERE next_attempt_at <= $1 \
             ORDER BY next_attempt_at, payment_id \
             LIMIT $2"
        ))
        .bind(now)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        decode_all(rows)
    }

    async fn queue_item(
        &self,
        payment_id: PaymentId,
    ) -> Result<Option<WithdrawalQueueItem>, StoreError> {
        let row = sqlx::query_as::<_, QueueRow>(&format!(
            "SELECT {QUEUE_COLUMNS} FROM withdrawal_queue WHERE payment_id = $1"
        ))
        .bind(payment_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.map(WithdrawalQueueItem::try_from).transpose()?)
    }

    async fn update_queue_item(&self, item: WithdrawalQueueItem) -> Result<(), StoreError> {
        let updated = sqlx::query(
            "UPDATE withdrawal_queue \
             SET next_attempt_at = $2, attempts = $3, idempotency_key = $4, last_error = $5 \
             WHERE payment_id = $1",
        )
        .bind(item.payment_id.into_inner())
        .bind(item.next_attempt_at)
        .bind(narrow::<u32, i32>(item.attempts, "attempts")?)
        .bind(&item.idempotency_key)
        .bind(&item.last_error)
        .execute(&self.pool)
        .await
        .map_err(backend)?
        .rows_affected();
        if updated == 0 {
            return Err(StoreError::PaymentNotFound(item.payment_id));
        }
        Ok(())
    }

    async fn upsert_inbound(
        &self,
        transfer: InboundTransfer,
    ) -> Result<Option<InboundTransfer>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let parked = sqlx::query(
            "UPDATE dead_letters SET confirmations = GREATEST(confirmations, $2) \
             WHERE tx_hash = $1",
        )
        .bind(&transfer.tx_hash)
        .bind(narrow::<u32, i32>(transfer.confirmations, "confirmations")?)
        .execute(&mut *tx)
        .await
        .map_err(backend)?
        .rows_affected();

        let merged = if parked > 0 {
            None
        } else {
            Some(buffer_inbound(&mut tx, &transfer).await?)
        };
        tx.commit().await.map_err(backend)?;
        Ok(merged)
    }

    async fn inbound_transfers(&self) -> Result<Vec<InboundTransfer>, StoreError> {
        let rows = sqlx::query_as::<_, InboundRow>(&format!(
            "SELECT {INBOUND_COLUMNS} FROM inbound_transfers ORDER BY received_at, tx_hash"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        decode_all(rows)
    }

    async fn remove_inbound(&self, tx_hash: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM inbound_transfers WHERE tx_hash = $1")
            .bind(tx_hash)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn dead_letter(&self, letter: DeadLetter) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        sqlx::query("DELETE FROM inbound_transfers WHERE tx_hash = $1")
            .bind(&letter.transfer.tx_hash)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        sqlx::query(&format!(
            "INSERT INTO dead_letters ({DEAD_LETTER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (tx_hash) DO UPDATE \
             SET confirmations = EXCLUDED.confirmations, reason = EXCLUDED.reason, \
                 dead_lettered_at = EXCLUDED.dead_lettered_at"
        ))
        .bind(&letter.transfer.tx_hash)
        .bind(letter.transfer.amount)
        .bind(&letter.transfer.memo)
        .bind(narrow::<u32, i32>(letter.transfer.confirmations, "confirmations")?)
        .bind(letter.transfer.received_at)
        .bind(&letter.reason)
        .bind(letter.dead_lettered_at)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;
        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn dead_letters(&self) -> Result<Vec<DeadLetter>, StoreError> {
        let rows = sqlx::query_as::<_, DeadLetterRow>(&format!(
            "SELECT {DEAD_LETTER_COLUMNS} FROM dead_letters ORDER BY dead_lettered_at, tx_hash"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        decode_all(rows)
    }

    async fn replay_dead_letter(
        &self,
        tx_hash: &str,
    ) -> Result<Option<InboundTransfer>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let row = sqlx::query_as::<_, DeadLetterRow>(&format!(
            "DELETE FROM dead_letters WHERE tx_hash = $1 RETURNING {DEAD_LETTER_COLUMNS}"
        ))
        .bind(tx_hash)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let letter = DeadLetter::try_from(row)?;
        let transfer = buffer_inbound(&mut tx, &letter.transfer).await?;
        tx.commit().await.map_err(backend)?;
        Ok(Some(transfer))
    }
}
