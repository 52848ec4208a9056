//! Event constructors, one per transition.
//!
//! Each function takes the committed result of an operation and returns
//! the [`Event`] describing it. None of them fail.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use ocean_types::{
    DeadLetter, Event, EventId, EventKind, Fish, FishId, InboundTransfer, OceanState, Payment,
    PaymentId, UserId, WithdrawalQueueItem,
};

struct Draft {
    kind: EventKind,
    fish_id: Option<FishId>,
    counterpart_fish_id: Option<FishId>,
    user_id: Option<UserId>,
    payment_id: Option<PaymentId>,
    amount: Option<Decimal>,
}

impl Draft {
    const fn new(kind: EventKind) -> Self {
        Self {
            kind,
            fish_id: None,
            counterpart_fish_id: None,
            user_id: None,
            payment_id: None,
            amount: None,
        }
    }

    const fn fish(mut self, fish: &Fish) -> Self {
        self.fish_id = Some(fish.id);
        self.user_id = Some(fish.owner_user_id);
        self
    }

    const fn counterpart(mut self, fish: &Fish) -> Self {
        self.counterpart_fish_id = Some(fish.id);
        self
    }

    const fn payment(mut self, payment: &Payment) -> Self {
        self.payment_id = Some(payment.id);
        self.user_id = Some(payment.user_id);
        self.amount = Some(payment.amount);
        self
    }

    const fn amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    fn finish(self, message: String, details: serde_json::Value, at: DateTime<Utc>) -> Event {
        Event {
            id: EventId::new(),
            kind: self.kind,
            fish_id: self.fish_id,
            counterpart_fish_id: self.counterpart_fish_id,
            user_id: self.user_id,
            payment_id: self.payment_id,
            amount: self.amount,
            message,
            details,
            created_at: at,
        }
    }
}

// ---------------------------------------------------------------------------
// Creature lifecycle
// ---------------------------------------------------------------------------

/// A creature was created from a deposit.
pub fn fish_created(fish: &Fish, deposit: Decimal, fee: Decimal) -> Event {
    Draft::new(EventKind::FishCreated)
        .fish(fish)
        .amount(deposit)
        .finish(
            format!("{} entered the ocean with a share of {}", fish.name, fish.share),
            json!({ "deposit": deposit, "creation_fee": fee, "share": fish.share }),
            fish.created_at,
        )
}

/// A creature was fed.
pub fn fish_fed(fish: &Fish, amount: Decimal, commission: Decimal, reward: Decimal) -> Event {
    Draft::new(EventKind::FishFed)
        .fish(fish)
        .amount(amount)
        .finish(
            format!("{} was fed {amount} and grew by {reward}", fish.name),
            json!({
                "amount": amount,
                "commission": commission,
                "reward": reward,
                "share": fish.share,
                "version": fish.version,
            }),
            fish.last_fed_at,
        )
}

/// A hunter placed a mark on its prey.
pub fn mark_placed(hunter: &Fish, prey: &Fish, at: DateTime<Utc>) -> Event {
    Draft::new(EventKind::MarkPlaced)
        .fish(hunter)
        .counterpart(prey)
        .finish(
            format!("{} marked {} for the hunt", hunter.name, prey.name),
            json!({ "mark_expires_at": prey.mark_expires_at }),
            at,
        )
}

/// A hunter took part of its prey's share.
pub fn fish_hunted(hunter: &Fish, prey: &Fish, stolen: Decimal, at: DateTime<Utc>) -> Event {
    Draft::new(EventKind::FishHunted)
        .fish(hunter)
        .counterpart(prey)
        .amount(stolen)
        .finish(
            format!("{} hunted {} and took {stolen}", hunter.name, prey.name),
            json!({
                "stolen_share": stolen,
                "hunter_share": hunter.share,
                "prey_share": prey.share,
                "protection_ends_at": prey.protection_ends_at,
                "can_hunt_after": hunter.can_hunt_after,
            }),
            at,
        )
}

/// Ownership of a creature changed hands.
pub fn fish_transferred(fish: &Fish, previous_owner: UserId, at: DateTime<Utc>) -> Event {
    Draft::new(EventKind::FishTransferred).fish(fish).finish(
        format!("{} changed owner", fish.name),
        json!({ "from": previous_owner, "to": fish.owner_user_id }),
        at,
    )
}

/// A creature was liquidated.
pub fn fish_exited(fish: &Fish, payout: Decimal, fee: Decimal, at: DateTime<Utc>) -> Event {
    Draft::new(EventKind::FishExited)
        .fish(fish)
        .amount(payout)
        .finish(
            format!("{} left the ocean with {payout}", fish.name),
            json!({ "payout": payout, "exit_fee": fee }),
            at,
        )
}

/// A dead or exited creature came back.
pub fn fish_resurrected(fish: &Fish, deposit: Decimal, fee: Decimal) -> Event {
    Draft::new(EventKind::FishResurrected)
        .fish(fish)
        .amount(deposit)
        .finish(
            format!("{} returned with a share of {}", fish.name, fish.share),
            json!({ "deposit": deposit, "creation_fee": fee, "share": fish.share }),
            fish.last_fed_at,
        )
}

/// A creature starved and forfeited its share to the pool.
pub fn fish_starved(fish: &Fish, forfeited: Decimal, at: DateTime<Utc>) -> Event {
    Draft::new(EventKind::FishStarved)
        .fish(fish)
        .amount(forfeited)
        .finish(
            format!("{} starved", fish.name),
            json!({ "forfeited_share": forfeited, "last_fed_at": fish.last_fed_at }),
            at,
        )
}

// ---------------------------------------------------------------------------
// Ocean
// ---------------------------------------------------------------------------

/// The daily cycle rolled over.
pub fn ocean_rollover(ocean: &OceanState, at: DateTime<Utc>) -> Event {
    Draft::new(EventKind::OceanRollover).finish(
        format!(
            "The ocean turned {} (feeding {} bps)",
            ocean.mode.as_str(),
            ocean.feeding_percentage_bps
        ),
        json!({
            "mode": ocean.mode,
            "feeding_percentage_bps": ocean.feeding_percentage_bps,
            "cycle_start_time": ocean.cycle_start_time,
            "next_mode_change_time": ocean.next_mode_change_time,
        }),
        at,
    )
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

/// A deposit intent was stored.
pub fn deposit_intent_created(payment: &Payment) -> Event {
    Draft::new(EventKind::DepositIntentCreated)
        .payment(payment)
        .finish(
            format!("Deposit of {} announced", payment.amount),
            json!({ "memo": payment.memo }),
            payment.created_at,
        )
}

/// A withdrawal request was stored and queued.
pub fn withdrawal_requested(payment: &Payment) -> Event {
    Draft::new(EventKind::WithdrawalRequested)
        .payment(payment)
        .finish(
            format!("Withdrawal of {} requested", payment.amount),
            json!({}),
            payment.created_at,
        )
}

/// A payment was confirmed and booked.
pub fn payment_confirmed(payment: &Payment, at: DateTime<Utc>) -> Event {
    Draft::new(EventKind::PaymentConfirmed)
        .payment(payment)
        .finish(
            format!(
                "{} of {} confirmed",
                payment.direction.as_str(),
                payment.amount
            ),
            json!({ "direction": payment.direction, "tx_hash": payment.tx_hash }),
            at,
        )
}

/// A withdrawal dispatch failed and was rescheduled.
pub fn withdrawal_retried(payment: &Payment, item: &WithdrawalQueueItem, at: DateTime<Utc>) -> Event {
    Draft::new(EventKind::WithdrawalRetried)
        .payment(payment)
        .finish(
            format!(
                "Withdrawal dispatch failed (attempt {}), retrying",
                item.attempts
            ),
            json!({
                "attempts": item.attempts,
                "next_attempt_at": item.next_attempt_at,
                "error": item.last_error,
            }),
            at,
        )
}

/// A withdrawal gave up after its last attempt.
pub fn withdrawal_failed(payment: &Payment, attempts: u32, at: DateTime<Utc>) -> Event {
    Draft::new(EventKind::WithdrawalFailed)
        .payment(payment)
        .finish(
            format!("Withdrawal failed after {attempts} attempts"),
            json!({ "attempts": attempts, "error": payment.failure_reason }),
            at,
        )
}

/// An inbound transfer matched no deposit intent.
pub fn deposit_unmatched(letter: &DeadLetter) -> Event {
    let InboundTransfer {
        tx_hash,
        amount,
        memo,
        confirmations,
        ..
    } = &letter.transfer;
    Draft::new(EventKind::DepositUnmatched)
        .amount(*amount)
        .finish(
            format!("Inbound transfer {tx_hash} matched no deposit"),
            json!({
                "tx_hash": tx_hash,
                "memo": memo,
                "confirmations": confirmations,
                "reason": letter.reason,
            }),
            letter.dead_lettered_at,
        )
}

#[cfg(test)]
mod tests {
    use ocean_types::{FishStatus, PaymentDirection, PaymentStatus};

    use super::*;

    fn fish(name: &str, share: i64) -> Fish {
        let now = Utc::now();
        Fish {
            id: FishId::new(),
            owner_user_id: UserId::new(),
            name: name.to_owned(),
            share: Decimal::new(share, 0),
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
    fn hunt_event_links_both_fish() {
        let hunter = fish("Shark", 20_250_000);
        let prey = fish("Minnow", 20_250_000);
        let event = fish_hunted(&hunter, &prey, Decimal::new(2_250_000, 0), Utc::now());

        assert_eq!(event.kind, EventKind::FishHunted);
        assert_eq!(event.fish_id, Some(hunter.id));
        assert_eq!(event.counterpart_fish_id, Some(prey.id));
        assert_eq!(event.user_id, Some(hunter.owner_user_id));
        assert_eq!(event.details["stolen_share"], "2250000");
    }

    #[test]
    fn payment_event_carries_payment_fields() {
        let now = Utc::now();
        let payment = Payment {
            id: PaymentId::new(),
            user_id: UserId::new(),
            direction: PaymentDirection::Deposit,
            amount: Decimal::new(5_000, 0),
            status: PaymentStatus::Confirmed,
            memo: Some("abc".to_owned()),
            tx_hash: Some("0xfeed".to_owned()),
            failure_reason: None,
            created_at: now,
            updated_at: now,
            confirmed_at: Some(now),
        };
        let event = payment_confirmed(&payment, now);
        assert_eq!(event.payment_id, Some(payment.id));
        assert_eq!(event.user_id, Some(payment.user_id));
        assert_eq!(event.amount, Some(payment.amount));
        assert_eq!(event.message, "deposit of 5000 confirmed");
    }
}
