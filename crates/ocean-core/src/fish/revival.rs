//! Death by starvation and resurrection.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use ocean_types::{Fish, FishStatus, UserId};

use super::{bump, check_alive, check_owner, check_version, clear_mark, negate, split_deposit};
use crate::config::EconomyConfig;
use crate::error::FishError;
use crate::ocean::OceanDelta;

/// Result of [`resurrect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resurrected {
    /// The creature, alive again.
    pub fish: Fish,
    /// Creation fee withheld from the new deposit.
    pub fee: Decimal,
    /// Pool change, identical to a creation.
    pub delta: OceanDelta,
}

/// Result of [`starve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Starved {
    /// The creature, now dead with a zero share.
    pub fish: Fish,
    /// Share forfeited to the pool.
    pub forfeited: Decimal,
    /// Pool change: one fewer creature, `forfeited` fewer shares. The
    /// balance keeps the forfeited units.
    pub delta: OceanDelta,
}

/// Bring a dead or exited creature back with a fresh deposit.
///
/// The deposit is split exactly as in creation. Cooldown, protection, and
/// mark state are reset and the feeding clock restarts at `now`.
pub fn resurrect(
    fish: &Fish,
    actor: UserId,
    deposit: Decimal,
    expected_version: u64,
    config: &EconomyConfig,
    now: DateTime<Utc>,
) -> Result<Resurrected, FishError> {
    check_version(fish, expected_version)?;
    check_owner(fish, actor)?;
    if fish.status == FishStatus::Alive {
        return Err(FishError::AlreadyAlive(fish.id));
    }
    let (fee, share) = split_deposit(deposit, config)?;

    let mut next = fish.clone();
    next.status = FishStatus::Alive;
    next.share = share;
    next.last_fed_at = now;
    next.can_hunt_after = None;
    next.is_protected = false;
    next.protection_ends_at = None;
    clear_mark(&mut next);
    bump(&mut next)?;

    Ok(Resurrected {
        fish: next,
        fee,
        delta: OceanDelta {
            count: 1,
            shares: share,
            balance: share,
        },
    })
}

/// Kill a creature that missed its feeding deadline.
///
/// Only valid once `last_fed_at + feeding_deadline` is strictly in the
/// past.
pub fn starve(
    fish: &Fish,
    expected_version: u64,
    config: &EconomyConfig,
    now: DateTime<Utc>,
) -> Result<Starved, FishError> {
    check_version(fish, expected_version)?;
    check_alive(fish)?;
    let deadline = fish
        .last_fed_at
        .checked_add_signed(config.feeding_deadline())
        .ok_or(FishError::Overflow("feeding deadline"))?;
    if deadline >= now {
        return Err(FishError::NotStarving(fish.id));
    }

    let forfeited = fish.share;
    let mut next = fish.clone();
    next.status = FishStatus::Dead;
    next.share = Decimal::ZERO;
    clear_mark(&mut next);
    bump(&mut next)?;

    Ok(Starved {
        fish: next,
        forfeited,
        delta: OceanDelta {
            count: -1,
            shares: negate(forfeited),
            balance: Decimal::ZERO,
        },
    })
}
