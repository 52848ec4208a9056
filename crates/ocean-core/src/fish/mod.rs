//! Creature lifecycle state machine.
//!
//! Each submodule holds one family of transitions as pure functions: they
//! take the current creature(s), the caller's expected version(s), the
//! economy rules, and "now", and return the next creature value(s) plus the
//! [`OceanDelta`] the store must apply in the same unit. Nothing is mutated
//! in place and nothing is applied on error.
//!
//! ```text
//! alive --feed/mark/hunt/transfer--> alive
//! alive --exit--> exited
//! alive --starve--> dead
//! dead | exited --resurrect--> alive
//! ```
//!
//! [`OceanDelta`]: crate::ocean::OceanDelta

pub mod create;
pub mod exit;
pub mod feed;
pub mod hunt;
pub mod revival;
pub mod transfer;

pub use create::{Created, create};
pub use exit::{Exited, exit};
pub use feed::{Fed, feed};
pub use hunt::{HuntRequest, Hunted, Marked, hunt, place_mark};
pub use revival::{Resurrected, Starved, resurrect, starve};
pub use transfer::transfer;

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;

use ocean_types::{Fish, FishStatus, UserId, div_floor, is_whole_units, units};

use crate::config::EconomyConfig;
use crate::error::FishError;

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

pub(crate) fn check_version(fish: &Fish, expected: u64) -> Result<(), FishError> {
    if fish.version != expected {
        return Err(FishError::VersionConflict {
            fish_id: fish.id,
            expected,
            actual: fish.version,
        });
    }
    Ok(())
}

pub(crate) fn check_owner(fish: &Fish, actor: UserId) -> Result<(), FishError> {
    if fish.owner_user_id != actor {
        return Err(FishError::NotOwner {
            fish_id: fish.id,
            actor,
        });
    }
    Ok(())
}

pub(crate) fn check_alive(fish: &Fish) -> Result<(), FishError> {
    if fish.status != FishStatus::Alive {
        return Err(FishError::NotAlive {
            fish_id: fish.id,
            status: fish.status,
        });
    }
    Ok(())
}

pub(crate) fn check_units(amount: Decimal) -> Result<(), FishError> {
    if !is_whole_units(amount) {
        return Err(FishError::InvalidAmount { amount });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Shared arithmetic
// ---------------------------------------------------------------------------

/// Next version number.
pub(crate) fn bump(fish: &mut Fish) -> Result<(), FishError> {
    fish.version = fish
        .version
        .checked_add(1)
        .ok_or(FishError::Overflow("fish version"))?;
    Ok(())
}

/// `now + window`.
pub(crate) fn window_end(now: DateTime<Utc>, window: TimeDelta) -> Result<DateTime<Utc>, FishError> {
    now.checked_add_signed(window)
        .ok_or(FishError::Overflow("window end"))
}

pub(crate) fn add(a: Decimal, b: Decimal, what: &'static str) -> Result<Decimal, FishError> {
    a.checked_add(b).ok_or(FishError::Overflow(what))
}

pub(crate) fn sub(a: Decimal, b: Decimal, what: &'static str) -> Result<Decimal, FishError> {
    a.checked_sub(b).ok_or(FishError::Overflow(what))
}

pub(crate) fn negate(v: Decimal) -> Decimal {
    Decimal::ZERO.saturating_sub(v)
}

/// Split a deposit into `(creation_fee, share)`.
///
/// Shared by create and resurrect.
pub(crate) fn split_deposit(
    deposit: Decimal,
    config: &EconomyConfig,
) -> Result<(Decimal, Decimal), FishError> {
    check_units(deposit)?;
    let minimum = units(config.min_deposit_units);
    if deposit < minimum {
        return Err(FishError::DepositBelowMinimum { deposit, minimum });
    }
    let fee = div_floor(deposit, config.creation_fee_divisor)
        .ok_or(FishError::Overflow("creation fee"))?;
    let share = sub(deposit, fee, "initial share")?;
    Ok((fee, share))
}

/// Drop any mark held on `fish`.
pub(crate) fn clear_mark(fish: &mut Fish) {
    fish.marked_by_fish_id = None;
    fish.mark_expires_at = None;
}


#[cfg(test)]
mod tests {
    use super::test_support::{spawn, units};
    use super::*;

    #[test]
    fn deposit_split_withholds_one_tenth() {
        let config = EconomyConfig::default();
        let split = split_deposit(units(20_000_000), &config).ok();
        assert_eq!(split, Some((units(2_000_000), units(18_000_000))));
    }

    #[test]
    fn deposit_split_floors_fee() {
        let config = EconomyConfig::default();
        let split = split_deposit(units(10_000_005), &config).ok();
        assert_eq!(split, Some((units(1_000_000), units(9_000_005))));
    }

    #[test]
    fn guards_report_the_right_error() {
        let owner = UserId::new();
        let fish = spawn(owner, "Nemo", 20_000_000);
        assert!(check_version(&fish, 1).is_ok());
        assert!(matches!(
            check_version(&fish, 2),
            Err(FishError::VersionConflict { expected: 2, actual: 1, .. })
        ));
        assert!(check_owner(&fish, owner).is_ok());
        assert!(matches!(
            check_owner(&fish, UserId::new()),
            Err(FishError::NotOwner { .. })
        ));
        assert!(check_alive(&fish).is_ok());
    }
}
