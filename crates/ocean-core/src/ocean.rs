//! The shared-pool aggregate.
//!
//! [`initialize`] and [`rollover`] are pure: the caller supplies "now" and
//! the random draw, so the aggregate has no hidden randomness. Creature
//! operations never overwrite the ocean; they describe their effect as an
//! [`OceanDelta`] which the store applies atomically with the creature
//! update.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ocean_types::{BPS_DENOMINATOR, OceanMode, OceanState};

use crate::config::PoolConfig;
use crate::error::FishError;

/// Fresh ocean: empty, calm, configured storm probability.
pub fn initialize(config: &PoolConfig, now: DateTime<Utc>) -> OceanState {
    OceanState {
        total_count: 0,
        total_shares: Decimal::ZERO,
        balance_units: Decimal::ZERO,
        mode: OceanMode::Calm,
        feeding_percentage_bps: config.calm_feeding_bps,
        storm_probability_bps: config.initial_storm_probability_bps,
        cycle_start_time: now,
        next_mode_change_time: now
            .checked_add_signed(config.day_length())
            .unwrap_or(now),
        updated_at: now,
    }
}

/// Redraw the mode for a new cycle.
///
/// Storm when `random_bps < storm_probability_bps`, calm otherwise. The new
/// cycle starts at `now` and lasts one day length. Counts and balances are
/// untouched.
pub fn rollover(
    current: &OceanState,
    random_bps: u32,
    config: &PoolConfig,
    now: DateTime<Utc>,
) -> Result<OceanState, FishError> {
    if random_bps >= BPS_DENOMINATOR {
        return Err(FishError::InvalidRandomBps { value: random_bps });
    }

    let mode = if random_bps < current.storm_probability_bps {
        OceanMode::Storm
    } else {
        OceanMode::Calm
    };
    let feeding_percentage_bps = match mode {
        OceanMode::Calm => config.calm_feeding_bps,
        OceanMode::Storm => config.storm_feeding_bps,
    };
    let next_mode_change_time = now
        .checked_add_signed(config.day_length())
        .ok_or(FishError::Overflow("next mode change time"))?;

    Ok(OceanState {
        mode,
        feeding_percentage_bps,
        cycle_start_time: now,
        next_mode_change_time,
        updated_at: now,
        ..current.clone()
    })
}

/// Whether the current cycle has ended at `now`.
pub fn rollover_due(ocean: &OceanState, now: DateTime<Utc>) -> bool {
    ocean.next_mode_change_time <= now
}

// ---------------------------------------------------------------------------
// Deltas
// ---------------------------------------------------------------------------

/// Signed change a creature operation makes to the ocean totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OceanDelta {
    /// Change to `total_count`.
    pub count: i64,
    /// Change to `total_shares`.
    pub shares: Decimal,
    /// Change to `balance_units`.
    pub balance: Decimal,
}

impl OceanDelta {
    /// No change.
    pub const ZERO: Self = Self {
        count: 0,
        shares: Decimal::ZERO,
        balance: Decimal::ZERO,
    };

    /// Whether this delta changes nothing.
    pub fn is_zero(&self) -> bool {
        self.count == 0 && self.shares.is_zero() && self.balance.is_zero()
    }

    /// Apply the delta, rejecting results that break the pool invariants.
    ///
    /// Returns `None` when the count or shares would go negative or a sum
    /// overflows.
    pub fn apply(&self, ocean: &OceanState, now: DateTime<Utc>) -> Option<OceanState> {
        let total_count = ocean.total_count.checked_add_signed(self.count)?;
        let total_shares = ocean.total_shares.checked_add(self.shares)?;
        let balance_units = ocean.balance_units.checked_add(self.balance)?;
        if total_shares.is_sign_negative() && !total_shares.is_zero() {
            return None;
        }
        if balance_units.is_sign_negative() && !balance_units.is_zero() {
            return None;
        }
        Some(OceanState {
            total_count,
            total_shares,
            balance_units,
            updated_at: now,
            ..ocean.clone()
        })
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
    }

    #[test]
    fn initialize_is_empty_and_calm() {
        let config = PoolConfig::default();
        let ocean = initialize(&config, start());
        assert_eq!(ocean.total_count, 0);
        assert_eq!(ocean.total_shares, Decimal::ZERO);
        assert_eq!(ocean.mode, OceanMode::Calm);
        assert_eq!(ocean.feeding_percentage_bps, config.calm_feeding_bps);
        assert_eq!(ocean.storm_probability_bps, config.initial_storm_probability_bps);
        assert_eq!(ocean.next_mode_change_time, start() + TimeDelta::days(1));
    }

    #[test]
    fn rollover_draw_below_probability_is_storm() {
        let config = PoolConfig::default();
        let ocean = initialize(&config, start());
        let later = start() + TimeDelta::days(1);

        let storm = rollover(&ocean, 1_999, &config, later).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(storm.mode, OceanMode::Storm);
        assert_eq!(storm.feeding_percentage_bps, config.storm_feeding_bps);
        assert_eq!(storm.cycle_start_time, later);
        assert_eq!(storm.next_mode_change_time, later + TimeDelta::days(1));

        let calm = rollover(&ocean, 2_000, &config, later).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(calm.mode, OceanMode::Calm);
        assert_eq!(calm.feeding_percentage_bps, config.calm_feeding_bps);
    }

    #[test]
    fn rollover_rejects_out_of_range_draw() {
        let config = PoolConfig::default();
        let ocean = initialize(&config, start());
        assert!(matches!(
            rollover(&ocean, 10_000, &config, start()),
            Err(FishError::InvalidRandomBps { value: 10_000 })
        ));
        assert!(rollover(&ocean, 0, &config, start()).is_ok());
    }

    #[test]
    fn rollover_keeps_totals() {
        let config = PoolConfig::default();
        let mut ocean = initialize(&config, start());
        ocean.total_count = 3;
        ocean.total_shares = Decimal::new(100, 0);
        let next = rollover(&ocean, 9_999, &config, start()).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(next.total_count, 3);
        assert_eq!(next.total_shares, Decimal::new(100, 0));
    }

    #[test]
    fn delta_rejects_negative_totals() {
        let ocean = initialize(&PoolConfig::default(), start());
        let delta = OceanDelta {
            count: -1,
            ..OceanDelta::ZERO
        };
        assert!(delta.apply(&ocean, start()).is_none());

        let grow = OceanDelta {
            count: 1,
            shares: Decimal::new(18, 0),
            balance: Decimal::new(18, 0),
        };
        let grown = grow.apply(&ocean, start());
        assert_eq!(grown.map(|o| o.total_shares), Some(Decimal::new(18, 0)));
    }
}
