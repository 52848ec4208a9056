//! Core entity structs for the Ocean economy.
//!
//! Covers the shared pool ([`OceanState`]), creatures ([`Fish`]), the
//! balance ledger ([`LedgerEntry`]), settlement records ([`Payment`],
//! [`WithdrawalQueueItem`], [`InboundTransfer`], [`DeadLetter`]), and the
//! observational records ([`WorkerAlert`], [`Event`]).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{
    AlertType, EventKind, FishStatus, LedgerReason, OceanMode, PaymentDirection, PaymentStatus,
};
use crate::ids::{AlertId, EventId, FishId, LedgerEntryId, PaymentId, UserId};

// ---------------------------------------------------------------------------
// Ocean (shared pool)
// ---------------------------------------------------------------------------

/// The singleton shared pool.
///
/// `total_shares` always equals the sum of every non-exited creature's
/// `share`. `balance_units` tracks the payable pool; it drifts above
/// `total_shares` because exit fees and forfeited shares stay behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct OceanState {
    /// Number of creatures currently holding a claim on the pool.
    pub total_count: u64,
    /// Sum of all live claims.
    #[ts(as = "String")]
    pub total_shares: Decimal,
    /// Units the pool can pay out.
    #[ts(as = "String")]
    pub balance_units: Decimal,
    /// Mode for the current cycle.
    pub mode: OceanMode,
    /// Feeding percentage for the current mode, in basis points.
    pub feeding_percentage_bps: u32,
    /// Chance of drawing storm at the next rollover, in basis points.
    pub storm_probability_bps: u32,
    /// Start of the current cycle.
    pub cycle_start_time: DateTime<Utc>,
    /// When the next rollover is due.
    pub next_mode_change_time: DateTime<Utc>,
    /// Last time any field changed.
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Fish
// ---------------------------------------------------------------------------

/// A user-owned creature holding a proportional claim on the pool.
///
/// Every mutation produces a new value with `version` incremented by one;
/// stores only accept it when the stored version still equals the
/// version the caller read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Fish {
    /// Unique creature identifier.
    pub id: FishId,
    /// Current owner.
    pub owner_user_id: UserId,
    /// Display name chosen at creation.
    pub name: String,
    /// Currency-denominated claim on the pool.
    #[ts(as = "String")]
    pub share: Decimal,
    /// When the creature was first created.
    pub created_at: DateTime<Utc>,
    /// Last successful feeding (or creation/resurrection).
    pub last_fed_at: DateTime<Utc>,
    /// Last successful hunt performed by this creature.
    pub last_hunt_at: Option<DateTime<Utc>>,
    /// The creature may not hunt before this instant.
    pub can_hunt_after: Option<DateTime<Utc>>,
    /// Set after being hunted; see `protection_ends_at`.
    pub is_protected: bool,
    /// The creature cannot be hunted before this instant.
    pub protection_ends_at: Option<DateTime<Utc>>,
    /// The hunter currently holding an exclusive mark on this creature.
    pub marked_by_fish_id: Option<FishId>,
    /// When the current mark lapses.
    pub mark_expires_at: Option<DateTime<Utc>>,
    /// Lifecycle status.
    pub status: FishStatus,
    /// Optimistic-concurrency counter.
    pub version: u64,
}

impl Fish {
    /// Whether the creature is alive.
    pub fn is_alive(&self) -> bool {
        self.status == FishStatus::Alive
    }

    /// Whether the hunting cooldown is still running at `now`.
    pub fn is_on_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.can_hunt_after.is_some_and(|t| t > now)
    }

    /// Whether the post-hunt protection window is still running at `now`.
    ///
    /// Only `protection_ends_at` decides; `is_protected` stays set as a
    /// record that the creature has been hunted.
    pub fn is_protected_at(&self, now: DateTime<Utc>) -> bool {
        self.protection_ends_at.is_some_and(|t| t > now)
    }

    /// Whether `hunter` holds an unexpired mark on this creature at `now`.
    pub fn is_marked_by(&self, hunter: FishId, now: DateTime<Utc>) -> bool {
        self.marked_by_fish_id == Some(hunter) && self.mark_expires_at.is_some_and(|t| t > now)
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// One signed balance movement for one user.
///
/// Entries are append-only; a user's balance is the fold of all their
/// entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LedgerEntry {
    /// Unique entry identifier.
    pub id: LedgerEntryId,
    /// Whose balance moved.
    pub user_id: UserId,
    /// Signed movement in whole base units.
    #[ts(as = "String")]
    pub delta: Decimal,
    /// Why the balance moved.
    pub reason: LedgerReason,
    /// The payment this entry settles, if any.
    pub ref_id: Option<PaymentId>,
    /// When the entry was appended.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

/// A deposit intent or a withdrawal request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Payment {
    /// Unique payment identifier.
    pub id: PaymentId,
    /// The user whose balance this payment moves.
    pub user_id: UserId,
    /// Deposit or withdrawal.
    pub direction: PaymentDirection,
    /// Amount in whole base units.
    #[ts(as = "String")]
    pub amount: Decimal,
    /// Settlement status.
    pub status: PaymentStatus,
    /// Free-form reference the sender attaches to the external transfer.
    pub memo: Option<String>,
    /// Hash of the external transfer that settled this payment.
    pub tx_hash: Option<String>,
    /// Last dispatch error for a failed withdrawal.
    pub failure_reason: Option<String>,
    /// When the payment was created.
    pub created_at: DateTime<Utc>,
    /// When the payment last changed.
    pub updated_at: DateTime<Utc>,
    /// When the payment was confirmed.
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// A withdrawal waiting for (another) dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WithdrawalQueueItem {
    /// The withdrawal payment being dispatched.
    pub payment_id: PaymentId,
    /// Earliest instant the next attempt may run.
    pub next_attempt_at: DateTime<Utc>,
    /// Number of failed attempts so far.
    pub attempts: u32,
    /// Key sent to the rail and used to confirm exactly once.
    pub idempotency_key: String,
    /// Error from the most recent failed attempt.
    pub last_error: Option<String>,
}

/// A transfer observed on the external rail, awaiting reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct InboundTransfer {
    /// Rail transaction hash (unique per transfer).
    pub tx_hash: String,
    /// Amount received in whole base units.
    #[ts(as = "String")]
    pub amount: Decimal,
    /// Memo attached by the sender.
    pub memo: Option<String>,
    /// Confirmations observed so far.
    pub confirmations: u32,
    /// When the watcher first reported the transfer.
    pub received_at: DateTime<Utc>,
}

/// An inbound transfer that matched no deposit intent.
///
/// Parked for manual replay instead of being dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DeadLetter {
    /// The unmatched transfer.
    pub transfer: InboundTransfer,
    /// Why it was parked.
    pub reason: String,
    /// When it was parked.
    pub dead_lettered_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

/// An operator-facing alert raised by the settlement worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorkerAlert {
    /// Unique alert identifier.
    pub id: AlertId,
    /// Alert category.
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    /// Human-readable description.
    pub message: String,
    /// The payment involved, if any.
    pub payment_id: Option<PaymentId>,
    /// The external transfer involved, if any.
    pub tx_hash: Option<String>,
    /// Whether an operator has acknowledged the alert.
    pub acknowledged: bool,
    /// When the alert was raised.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Event log
// ---------------------------------------------------------------------------

/// A human-readable record of one lifecycle or payment transition.
///
/// Derived from successful operations; never read back as state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Event {
    /// Unique event identifier.
    pub id: EventId,
    /// Which transition happened.
    pub kind: EventKind,
    /// The creature acted upon, if any.
    pub fish_id: Option<FishId>,
    /// The other creature involved (prey for hunts and marks).
    pub counterpart_fish_id: Option<FishId>,
    /// The user involved, if any.
    pub user_id: Option<UserId>,
    /// The payment involved, if any.
    pub payment_id: Option<PaymentId>,
    /// The main amount moved, if any.
    #[ts(as = "Option<String>")]
    pub amount: Option<Decimal>,
    /// One-line narration.
    pub message: String,
    /// Structured payload for the transition.
    pub details: serde_json::Value,
    /// When the transition was committed.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn fish_at(now: DateTime<Utc>) -> Fish {
        Fish {
            id: FishId::new(),
            owner_user_id: UserId::new(),
            name: "Nemo".to_owned(),
            share: Decimal::new(18_000_000, 0),
            created_at: now,
            last_fed_at: now,
            last_hunt_at: None,
            can_hunt_after: None,
            is_protected: false,
            protection_ends_at: None,
            marked_by_fish_id: None,
            mark_expires_at: None,
            status: FishStatus::Alive,
            version: 1,
        }
    }

    #[test]
    fn cooldown_and_protection_are_time_bounded() {
        let now = Utc::now();
        let mut fish = fish_at(now);
        assert!(!fish.is_on_cooldown(now));

        fish.can_hunt_after = Some(now + TimeDelta::minutes(5));
        assert!(fish.is_on_cooldown(now));
        assert!(!fish.is_on_cooldown(now + TimeDelta::minutes(5)));

        fish.is_protected = true;
        fish.protection_ends_at = Some(now + TimeDelta::minutes(5));
        assert!(fish.is_protected_at(now));
        assert!(!fish.is_protected_at(now + TimeDelta::minutes(6)));
    }

    #[test]
    fn mark_must_belong_to_hunter_and_be_unexpired() {
        let now = Utc::now();
        let hunter = FishId::new();
        let mut prey = fish_at(now);
        prey.marked_by_fish_id = Some(hunter);
        prey.mark_expires_at = Some(now + TimeDelta::minutes(15));

        assert!(prey.is_marked_by(hunter, now));
        assert!(!prey.is_marked_by(FishId::new(), now));
        assert!(!prey.is_marked_by(hunter, now + TimeDelta::minutes(15)));
    }

    #[test]
    fn currency_serializes_as_string() {
        let fish = fish_at(Utc::now());
        let json = serde_json::to_value(&fish).unwrap_or_default();
        assert_eq!(json["share"], "18000000");
        assert_eq!(json["status"], "alive");
    }
}
