//! Creature creation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use ocean_types::{Fish, FishId, FishStatus, UserId};

use super::split_deposit;
use crate::config::EconomyConfig;
use crate::error::FishError;
use crate::ocean::OceanDelta;

/// Result of [`create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    /// The new creature at version 1.
    pub fish: Fish,
    /// Creation fee withheld from the deposit.
    pub fee: Decimal,
    /// Pool change: one more creature, `share` more shares and balance.
    pub delta: OceanDelta,
}

/// Create a new alive creature from a deposit.
///
/// The fee is `deposit / creation_fee_divisor` rounded down; the rest
/// becomes the initial share.
pub fn create(
    owner: UserId,
    name: &str,
    deposit: Decimal,
    config: &EconomyConfig,
    now: DateTime<Utc>,
) -> Result<Created, FishError> {
    let name = validate_name(name, config.max_name_len)?;
    let (fee, share) = split_deposit(deposit, config)?;

    let fish = Fish {
        id: FishId::new(),
        owner_user_id: owner,
        name,
        share,
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
    };

    Ok(Created {
        fish,
        fee,
        delta: OceanDelta {
            count: 1,
            shares: share,
            balance: share,
        },
    })
}

fn validate_name(name: &str, max_len: usize) -> Result<String, FishError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(FishError::InvalidName {
            reason: "name is empty".to_owned(),
        });
    }
    let len = trimmed.chars().count();
    if len > max_len {
        return Err(FishError::InvalidName {
            reason: format!("name has {len} characters, maximum is {max_len}"),
        });
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{now, units};
    use super::*;

    #[test]
    fn create_withholds_fee_and_starts_at_version_one() {
        let created = create(
            UserId::new(),
            "Nemo",
            units(20_000_000),
            &EconomyConfig::default(),
            now(),
        )
        .unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(created.fee, units(2_000_000));
        assert_eq!(created.fish.share, units(18_000_000));
        assert_eq!(created.fish.version, 1);
        assert_eq!(created.fish.status, FishStatus::Alive);
        assert!(!created.fish.is_on_cooldown(now()));
        assert_eq!(
            created.delta,
            OceanDelta {
                count: 1,
                shares: units(18_000_000),
                balance: units(18_000_000),
            }
        );
    }

    #[test]
    fn create_rejects_small_deposit() {
        let result = create(
            UserId::new(),
            "Nemo",
            units(9_999_999),
            &EconomyConfig::default(),
            now(),
        );
        assert!(matches!(result, Err(FishError::DepositBelowMinimum { .. })));
    }

    #[test]
    fn create_rejects_fractional_deposit() {
        let result = create(
            UserId::new(),
            "Nemo",
            Decimal::new(200_000_005, 1),
            &EconomyConfig::default(),
            now(),
        );
        assert!(matches!(result, Err(FishError::InvalidAmount { .. })));
    }

    #[test]
    fn create_validates_name() {
        let config = EconomyConfig::default();
        let blank = create(UserId::new(), "   ", units(20_000_000), &config, now());
        assert!(matches!(blank, Err(FishError::InvalidName { .. })));

        let long = "x".repeat(33);
        let too_long = create(UserId::new(), &long, units(20_000_000), &config, now());
        assert!(matches!(too_long, Err(FishError::InvalidName { .. })));

        let trimmed = create(UserId::new(), "  Dory ", units(20_000_000), &config, now());
        assert_eq!(trimmed.map(|c| c.fish.name).ok(), Some("Dory".to_owned()));
    }
}
