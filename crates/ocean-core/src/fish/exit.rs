//! Liquidation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use ocean_types::{Fish, FishStatus, UserId, apply_bps};

use super::{bump, check_alive, check_owner, check_version, clear_mark, negate, sub};
use crate::config::EconomyConfig;
use crate::error::FishError;
use crate::ocean::OceanDelta;

/// Result of [`exit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exited {
    /// The creature, now exited with a zero share.
    pub fish: Fish,
    /// Units paid out to the owner.
    pub payout: Decimal,
    /// Exit fee kept in the pool.
    pub fee: Decimal,
    /// Pool change: one fewer creature, `share` fewer shares, `payout` less
    /// balance.
    pub delta: OceanDelta,
}

/// Liquidate `fish`. `payout + fee` always equals the pre-exit share.
pub fn exit(
    fish: &Fish,
    actor: UserId,
    expected_version: u64,
    config: &EconomyConfig,
    now: DateTime<Utc>,
) -> Result<Exited, FishError> {
    check_version(fish, expected_version)?;
    check_owner(fish, actor)?;
    check_alive(fish)?;

    let share = fish.share;
    let fee = apply_bps(share, config.exit_fee_bps).ok_or(FishError::Overflow("exit fee"))?;
    let payout = sub(share, fee, "exit payout")?;

    let mut next = fish.clone();
    next.status = FishStatus::Exited;
    next.share = Decimal::ZERO;
    clear_mark(&mut next);
    bump(&mut next)?;

    tracing::debug!(fish_id = %fish.id, %payout, %fee, at = %now, "exit computed");

    Ok(Exited {
        fish: next,
        payout,
        fee,
        delta: OceanDelta {
            count: -1,
            shares: negate(share),
            balance: negate(payout),
        },
    })
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::super::test_support::{now, spawn, units};
    use super::*;

    #[test]
    fn payout_plus_fee_equals_share() {
        let owner = UserId::new();
        let fish = spawn(owner, "Nemo", 20_000_000);
        let exited = exit(&fish, owner, 1, &EconomyConfig::default(), now())
            .unwrap_or_else(|e| panic!("{e}"));

        // 5% of 18,000,000
        assert_eq!(exited.fee, units(900_000));
        assert_eq!(exited.payout, units(17_100_000));
        assert_eq!(exited.payout + exited.fee, fish.share);
        assert_eq!(exited.fish.share, Decimal::ZERO);
        assert_eq!(exited.fish.status, FishStatus::Exited);
        assert_eq!(exited.fish.version, 2);
        assert_eq!(
            exited.delta,
            OceanDelta {
                count: -1,
                shares: units(-18_000_000),
                balance: units(-17_100_000),
            }
        );
    }

    #[test]
    fn exit_is_terminal() {
        let owner = UserId::new();
        let fish = spawn(owner, "Nemo", 20_000_000);
        let config = EconomyConfig::default();
        let exited = exit(&fish, owner, 1, &config, now()).unwrap_or_else(|e| panic!("{e}"));
        let again = exit(&exited.fish, owner, 2, &config, now());
        assert!(matches!(again, Err(FishError::NotAlive { .. })));
    }
}
