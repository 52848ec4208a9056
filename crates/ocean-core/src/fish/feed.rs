//! Feeding.
//!
//! ```text
//! commission = floor(amount * feed_commission_bps / 10000)
//! reward     = floor((amount - commission) * feeding_percentage_bps / 10000)
//! share     += reward
//! ```
//!
//! The commission leaves the economy; only the reward enters the pool.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use ocean_types::{Fish, UserId, apply_bps, units};

use super::{add, bump, check_alive, check_owner, check_units, check_version, sub};
use crate::config::EconomyConfig;
use crate::error::FishError;
use crate::ocean::OceanDelta;

/// Result of [`feed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fed {
    /// The creature after feeding.
    pub fish: Fish,
    /// Commission withheld from the feed amount.
    pub commission: Decimal,
    /// Share growth credited to the creature.
    pub reward: Decimal,
    /// Pool change: `reward` more shares and balance.
    pub delta: OceanDelta,
}

/// Feed `fish` with `amount` at the ocean's current feeding percentage.
pub fn feed(
    fish: &Fish,
    actor: UserId,
    amount: Decimal,
    expected_version: u64,
    feeding_percentage_bps: u32,
    config: &EconomyConfig,
    now: DateTime<Utc>,
) -> Result<Fed, FishError> {
    check_version(fish, expected_version)?;
    check_owner(fish, actor)?;
    check_alive(fish)?;
    check_units(amount)?;
    let minimum = units(config.min_feed_units);
    if amount < minimum {
        return Err(FishError::FeedBelowMinimum { amount, minimum });
    }

    let commission = apply_bps(amount, config.feed_commission_bps)
        .ok_or(FishError::Overflow("feed commission"))?;
    let net = sub(amount, commission, "net feed")?;
    let reward =
        apply_bps(net, feeding_percentage_bps).ok_or(FishError::Overflow("feed reward"))?;

    let mut next = fish.clone();
    next.share = add(next.share, reward, "fed share")?;
    next.last_fed_at = now;
    bump(&mut next)?;

    Ok(Fed {
        fish: next,
        commission,
        reward,
        delta: OceanDelta {
            count: 0,
            shares: reward,
            balance: reward,
        },
    })
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use chrono::TimeDelta;
    use ocean_types::FishStatus;

    use super::super::test_support::{now, spawn, units};
    use super::*;

    #[test]
    fn feed_at_ten_percent_grows_share_by_net_reward() {
        let owner = UserId::new();
        let fish = spawn(owner, "Nemo", 20_000_000);
        let later = now() + TimeDelta::hours(1);

        let fed = feed(
            &fish,
            owner,
            units(10_000_000),
            1,
            1_000,
            &EconomyConfig::default(),
            later,
        )
        .unwrap_or_else(|e| panic!("{e}"));

        // 10,000,000 - 1,000,000 commission = 9,000,000; 10% = 900,000
        assert_eq!(fed.commission, units(1_000_000));
        assert_eq!(fed.reward, units(900_000));
        assert_eq!(fed.fish.share, units(18_900_000));
        assert_eq!(fed.fish.version, 2);
        assert_eq!(fed.fish.last_fed_at, later);
        assert_eq!(fed.delta.shares, units(900_000));
        assert_eq!(fed.delta.count, 0);
    }

    #[test]
    fn stale_version_is_a_conflict() {
        let owner = UserId::new();
        let fish = spawn(owner, "Nemo", 20_000_000);
        let result = feed(
            &fish,
            owner,
            units(10_000_000),
            0,
            1_000,
            &EconomyConfig::default(),
            now(),
        );
        assert!(matches!(result, Err(FishError::VersionConflict { .. })));
    }

    #[test]
    fn only_owner_can_feed_a_live_fish() {
        let owner = UserId::new();
        let mut fish = spawn(owner, "Nemo", 20_000_000);
        let config = EconomyConfig::default();

        let stranger = feed(&fish, UserId::new(), units(1_000_000), 1, 1_000, &config, now());
        assert!(matches!(stranger, Err(FishError::NotOwner { .. })));

        fish.status = FishStatus::Dead;
        let dead = feed(&fish, owner, units(1_000_000), 1, 1_000, &config, now());
        assert!(matches!(dead, Err(FishError::NotAlive { .. })));
    }

    #[test]
    fn feed_below_minimum_is_rejected() {
        let owner = UserId::new();
        let fish = spawn(owner, "Nemo", 20_000_000);
        let result = feed(
            &fish,
            owner,
            units(999_999),
            1,
            1_000,
            &EconomyConfig::default(),
            now(),
        );
        assert!(matches!(result, Err(FishError::FeedBelowMinimum { .. })));
    }
}
