//! Hunting: exclusive marks and the hunt itself.
//!
//! The resolution flow for a hunt:
//! 1. Both versions match and both creatures are alive
//! 2. The actor owns the hunter, and hunter and prey differ
//! 3. The hunter is off cooldown
//! 4. The prey is out of its protection window
//! 5. The prey carries an unexpired mark from this hunter
//! 6. Move `floor(prey.share * hunt_steal_bps / 10000)` to the hunter
//!
//! Shares only move between creatures, so the pool totals do not change.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use ocean_types::{Fish, UserId, apply_bps};

use super::{add, bump, check_alive, check_owner, check_version, clear_mark, sub, window_end};
use crate::config::EconomyConfig;
use crate::error::FishError;

/// The two creatures and versions a mark or hunt acts on.
#[derive(Debug, Clone, Copy)]
pub struct HuntRequest<'a> {
    /// The acting creature.
    pub hunter: &'a Fish,
    /// The targeted creature.
    pub prey: &'a Fish,
    /// The user issuing the request; must own the hunter.
    pub actor: UserId,
    /// Version of the hunter the caller read.
    pub expected_hunter_version: u64,
    /// Version of the prey the caller read.
    pub expected_prey_version: u64,
}

/// Result of [`place_mark`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marked {
    /// The hunter, version incremented.
    pub hunter: Fish,
    /// The prey, now carrying the hunter's mark.
    pub prey: Fish,
}

/// Result of [`hunt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunted {
    /// The hunter after gaining the stolen share and starting its cooldown.
    pub hunter: Fish,
    /// The prey after losing the share and entering protection.
    pub prey: Fish,
    /// Share moved from prey to hunter.
    pub stolen: Decimal,
}

fn check_pair(req: &HuntRequest<'_>) -> Result<(), FishError> {
    check_version(req.hunter, req.expected_hunter_version)?;
    check_version(req.prey, req.expected_prey_version)?;
    if req.hunter.id == req.prey.id {
        return Err(FishError::SelfTarget(req.hunter.id));
    }
    check_owner(req.hunter, req.actor)?;
    check_alive(req.hunter)?;
    check_alive(req.prey)
}

/// Place an exclusive mark from the hunter on the prey.
///
/// Overwrites any existing mark; callers serialize competing marks on one
/// prey through the prey's version.
pub fn place_mark(
    req: &HuntRequest<'_>,
    config: &EconomyConfig,
    now: DateTime<Utc>,
) -> Result<Marked, FishError> {
    check_pair(req)?;

    let mut hunter = req.hunter.clone();
    let mut prey = req.prey.clone();
    prey.marked_by_fish_id = Some(hunter.id);
    prey.mark_expires_at = Some(window_end(now, config.mark_window())?);
    bump(&mut hunter)?;
    bump(&mut prey)?;

    Ok(Marked { hunter, prey })
}

/// Hunt the prey.
pub fn hunt(
    req: &HuntRequest<'_>,
    config: &EconomyConfig,
    now: DateTime<Utc>,
) -> Result<Hunted, FishError> {
    check_pair(req)?;

    if let Some(until) = req.hunter.can_hunt_after
        && until > now
    {
        return Err(FishError::OnCooldown {
            fish_id: req.hunter.id,
            until,
        });
    }
    if let Some(until) = req.prey.protection_ends_at
        && until > now
    {
        return Err(FishError::PreyProtected {
            fish_id: req.prey.id,
            until,
        });
    }
    if !req.prey.is_marked_by(req.hunter.id, now) {
        return Err(FishError::NotMarkedByHunter {
            hunter: req.hunter.id,
            prey: req.prey.id,
        });
    }

    let stolen = apply_bps(req.prey.share, config.hunt_steal_bps)
        .ok_or(FishError::Overflow("stolen share"))?;
    let cooldown_end = window_end(now, config.hunt_cooldown())?;

    let mut hunter = req.hunter.clone();
    hunter.share = add(hunter.share, stolen, "hunter share")?;
    hunter.can_hunt_after = Some(cooldown_end);
    hunter.last_hunt_at = Some(now);
    bump(&mut hunter)?;

    let mut prey = req.prey.clone();
    prey.share = sub(prey.share, stolen, "prey share")?;
    prey.is_protected = true;
    prey.protection_ends_at = Some(cooldown_end);
    clear_mark(&mut prey);
    bump(&mut prey)?;

    Ok(Hunted {
        hunter,
        prey,
        stolen,
    })
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use chrono::TimeDelta;
    use ocean_types::FishStatus;

    use super::super::test_support::{now, spawn, units};
    use super::*;

    fn pair() -> (UserId, Fish, Fish) {
        let owner = UserId::new();
        let hunter = spawn(owner, "Shark", 20_000_000);
        let prey = spawn(UserId::new(), "Minnow", 25_000_000);
        (owner, hunter, prey)
    }

    fn req<'a>(actor: UserId, hunter: &'a Fish, prey: &'a Fish) -> HuntRequest<'a> {
        HuntRequest {
            hunter,
            prey,
            actor,
            expected_hunter_version: hunter.version,
            expected_prey_version: prey.version,
        }
    }

    fn marked() -> (UserId, Fish, Fish) {
        let (owner, hunter, prey) = pair();
        let config = EconomyConfig::default();
        let m = place_mark(&req(owner, &hunter, &prey), &config, now())
            .unwrap_or_else(|e| panic!("{e}"));
        (owner, m.hunter, m.prey)
    }

    #[test]
    fn mark_sets_window_and_bumps_both() {
        let (_, hunter, prey) = marked();
        assert_eq!(hunter.version, 2);
        assert_eq!(prey.version, 2);
        assert_eq!(prey.marked_by_fish_id, Some(hunter.id));
        assert_eq!(prey.mark_expires_at, Some(now() + TimeDelta::seconds(900)));
    }

    #[test]
    fn mark_requires_live_distinct_fish_owned_by_actor() {
        let (owner, hunter, mut prey) = pair();
        let config = EconomyConfig::default();

        let stranger = place_mark(&req(UserId::new(), &hunter, &prey), &config, now());
        assert!(matches!(stranger, Err(FishError::NotOwner { .. })));

        let itself = place_mark(&req(owner, &hunter, &hunter), &config, now());
        assert!(matches!(itself, Err(FishError::SelfTarget(_))));

        prey.status = FishStatus::Exited;
        let exited = place_mark(&req(owner, &hunter, &prey), &config, now());
        assert!(matches!(exited, Err(FishError::NotAlive { .. })));
    }

    #[test]
    fn hunt_steals_one_tenth_of_prey_share() {
        let (owner, hunter, prey) = marked();
        let config = EconomyConfig::default();
        let at = now() + TimeDelta::minutes(1);

        let hunted = hunt(&req(owner, &hunter, &prey), &config, at)
            .unwrap_or_else(|e| panic!("{e}"));

        // prey share 22,500,000 -> 2,250,000 stolen
        assert_eq!(hunted.stolen, units(2_250_000));
        assert_eq!(hunted.hunter.share, units(20_250_000));
        assert_eq!(hunted.prey.share, units(20_250_000));
        assert_eq!(hunted.hunter.version, 3);
        assert_eq!(hunted.prey.version, 3);
        assert!(hunted.prey.is_protected);
        assert!(hunted.prey.is_protected_at(at));
        assert_eq!(hunted.prey.marked_by_fish_id, None);
        assert!(hunted.hunter.is_on_cooldown(at));
        assert_eq!(hunted.hunter.last_hunt_at, Some(at));
    }

    #[test]
    fn cooldown_blocks_hunt_even_when_marked() {
        let (owner, mut hunter, prey) = marked();
        hunter.can_hunt_after = Some(now() + TimeDelta::hours(1));

        let result = hunt(&req(owner, &hunter, &prey), &EconomyConfig::default(), now());
        assert!(matches!(result, Err(FishError::OnCooldown { .. })));
    }

    #[test]
    fn only_the_marking_hunter_may_hunt() {
        let (_, _, prey) = marked();
        let other_owner = UserId::new();
        let other = spawn(other_owner, "Barracuda", 30_000_000);

        let result = hunt(&req(other_owner, &other, &prey), &EconomyConfig::default(), now());
        assert!(matches!(result, Err(FishError::NotMarkedByHunter { .. })));
    }

    #[test]
    fn expired_mark_does_not_count() {
        let (owner, hunter, prey) = marked();
        let late = now() + TimeDelta::seconds(900);
        let result = hunt(&req(owner, &hunter, &prey), &EconomyConfig::default(), late);
        assert!(matches!(result, Err(FishError::NotMarkedByHunter { .. })));
    }

    #[test]
    fn protected_prey_cannot_be_hunted_again() {
        let (owner, hunter, prey) = marked();
        let config = EconomyConfig::default();
        let hunted = hunt(&req(owner, &hunter, &prey), &config, now())
            .unwrap_or_else(|e| panic!("{e}"));

        // A second hunter marks the protected prey and tries.
        let second_owner = UserId::new();
        let second = spawn(second_owner, "Orca", 40_000_000);
        let remarked = place_mark(&req(second_owner, &second, &hunted.prey), &config, now())
            .unwrap_or_else(|e| panic!("{e}"));
        let result = hunt(
            &req(second_owner, &remarked.hunter, &remarked.prey),
            &config,
            now() + TimeDelta::minutes(5),
        );
        assert!(matches!(result, Err(FishError::PreyProtected { .. })));
    }

    #[test]
    fn stale_versions_conflict() {
        let (owner, hunter, prey) = marked();
        let request = HuntRequest {
            expected_prey_version: 1,
            ..req(owner, &hunter, &prey)
        };
        let result = hunt(&request, &EconomyConfig::default(), now());
        assert!(matches!(result, Err(FishError::VersionConflict { .. })));
    }
}
