//! End-to-end lifecycle tests through `OceanService`.
//!
//! Each test wires the service over an `InMemoryGameStore` and a
//! `ManualClock` so time-gated rules (marks, cooldowns, starvation) are
//! deterministic.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use ocean_core::ocean::initialize;
use ocean_core::{
    EconomyConfig, ErrorKind, FishCommit, FishError, FishUpdate, GameStore, InMemoryGameStore,
    OceanDelta, OceanService, PoolConfig,
};
use ocean_events::EventLog;
use ocean_types::{EventKind, FishStatus, ManualClock, OceanMode, UserId};
use rust_decimal::Decimal;

struct Harness {
    service: OceanService,
    store: Arc<InMemoryGameStore>,
    clock: Arc<ManualClock>,
}

fn start() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

fn units(v: i64) -> Decimal {
    Decimal::new(v, 0)
}

fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(start()));
    let store = Arc::new(InMemoryGameStore::new(initialize(
        &PoolConfig::default(),
        start(),
    )));
    let service = OceanService::new(
        store.clone(),
        clock.clone(),
        Arc::new(EventLog::default()),
        EconomyConfig::default(),
        PoolConfig::default(),
    );
    Harness {
        service,
        store,
        clock,
    }
}

#[tokio::test]
async fn create_grows_pool_by_net_share() {
    let h = harness();
    let before = h.service.get_ocean_state().await.unwrap();

    let fish = h
        .service
        .create_fish(UserId::new(), "Nemo", units(20_000_000))
        .await
        .unwrap();

    let after = h.service.get_ocean_state().await.unwrap();
    assert_eq!(fish.version, 1);
    assert_eq!(after.total_shares, before.total_shares + units(18_000_000));
    assert_eq!(after.balance_units, before.balance_units + units(18_000_000));
    assert_eq!(after.total_count, before.total_count + 1);
}

#[tokio::test]
async fn feed_scenario_bumps_version_and_rejects_stale_retry() {
    let h = harness();
    let owner = UserId::new();
    let fish = h
        .service
        .create_fish(owner, "Nemo", units(20_000_000))
        .await
        .unwrap();

    let fed = h
        .service
        .feed_fish(fish.id, owner, units(10_000_000), 1)
        .await
        .unwrap();
    assert_eq!(fed.version, 2);
    // net of 10% commission is 9,000,000; 10% pool rate gives 900,000
    assert_eq!(fed.share, fish.share + units(900_000));

    let ocean_before = h.service.get_ocean_state().await.unwrap();
    let stale = h
        .service
        .feed_fish(fish.id, owner, units(10_000_000), 1)
        .await;
    assert!(matches!(stale, Err(FishError::VersionConflict { .. })));
    assert_eq!(stale.unwrap_err().kind(), ErrorKind::Conflict);

    assert_eq!(h.service.get_fish(fish.id).await.unwrap(), fed);
    assert_eq!(h.service.get_ocean_state().await.unwrap(), ocean_before);
}

#[tokio::test]
async fn hunt_scenario_cooldown_then_success() {
    let h = harness();
    let hunter_owner = UserId::new();
    let hunter = h
        .service
        .create_fish(hunter_owner, "Shark", units(20_000_000))
        .await
        .unwrap();
    let prey = h
        .service
        .create_fish(UserId::new(), "Minnow", units(25_000_000))
        .await
        .unwrap();

    let marked = h
        .service
        .place_mark(hunter.id, prey.id, hunter_owner, 1, 1)
        .await
        .unwrap();
    assert_eq!(marked.prey.marked_by_fish_id, Some(hunter.id));

    // Force the hunter onto cooldown.
    let mut cooling = marked.hunter.clone();
    cooling.can_hunt_after = Some(start() + TimeDelta::hours(1));
    cooling.version = 3;
    h.store
        .commit(FishCommit {
            updates: vec![FishUpdate {
                fish: cooling,
                expected_version: 2,
            }],
            delta: OceanDelta::ZERO,
            at: start(),
        })
        .await
        .unwrap();

    let blocked = h
        .service
        .hunt_fish(hunter.id, prey.id, hunter_owner, 3, 2)
        .await;
    assert!(matches!(blocked, Err(FishError::OnCooldown { .. })));

    // Clear the cooldown and hunt again.
    let mut ready = h.service.get_fish(hunter.id).await.unwrap();
    ready.can_hunt_after = None;
    ready.version = 4;
    h.store
        .commit(FishCommit {
            updates: vec![FishUpdate {
                fish: ready,
                expected_version: 3,
            }],
            delta: OceanDelta::ZERO,
            at: start(),
        })
        .await
        .unwrap();

    let prey_before = h.service.get_fish(prey.id).await.unwrap();
    let shares_before = h.service.get_ocean_state().await.unwrap().total_shares;
    let hunted = h
        .service
        .hunt_fish(hunter.id, prey.id, hunter_owner, 4, 2)
        .await
        .unwrap();

    assert_eq!(hunted.stolen_share, prey_before.share / units(10));
    assert_eq!(hunted.stolen_share, units(2_250_000));
    assert_eq!(hunted.prey.share, units(20_250_000));
    assert_eq!(hunted.hunter.share, units(20_250_000));
    assert!(hunted.prey.is_protected);
    assert!(hunted.prey.protection_ends_at.unwrap() > start());
    assert_eq!(
        h.service.get_ocean_state().await.unwrap().total_shares,
        shares_before
    );
}

#[tokio::test]
async fn protected_prey_survives_second_hunt_until_window_lapses() {
    let h = harness();
    let a_owner = UserId::new();
    let b_owner = UserId::new();
    let a = h
        .service
        .create_fish(a_owner, "Shark", units(20_000_000))
        .await
        .unwrap();
    let b = h
        .service
        .create_fish(b_owner, "Orca", units(20_000_000))
        .await
        .unwrap();
    let prey = h
        .service
        .create_fish(UserId::new(), "Minnow", units(30_000_000))
        .await
        .unwrap();

    h.service
        .place_mark(a.id, prey.id, a_owner, 1, 1)
        .await
        .unwrap();
    let first = h
        .service
        .hunt_fish(a.id, prey.id, a_owner, 2, 2)
        .await
        .unwrap();

    h.service
        .place_mark(b.id, prey.id, b_owner, 1, first.prey.version)
        .await
        .unwrap();
    let blocked = h.service.hunt_fish(b.id, prey.id, b_owner, 2, 4).await;
    assert!(matches!(blocked, Err(FishError::PreyProtected { .. })));

    // Protection lasts one cooldown; the mark lasts fifteen minutes, so
    // re-mark after the window.
    h.clock.advance(TimeDelta::hours(1) + TimeDelta::seconds(1));
    h.service
        .place_mark(b.id, prey.id, b_owner, 2, 4)
        .await
        .unwrap();
    let second = h.service.hunt_fish(b.id, prey.id, b_owner, 3, 5).await;
    assert!(second.is_ok());
}

#[tokio::test]
async fn exit_then_resurrect_round_trip_keeps_pool_consistent() {
    let h = harness();
    let owner = UserId::new();
    let fish = h
        .service
        .create_fish(owner, "Nemo", units(20_000_000))
        .await
        .unwrap();

    let exited = h.service.exit_fish(fish.id, owner, 1).await.unwrap();
    assert_eq!(exited.payout_units + exited.fee_units, fish.share);
    assert_eq!(exited.fish.share, Decimal::ZERO);
    assert_eq!(exited.fish.status, FishStatus::Exited);

    let ocean = h.service.get_ocean_state().await.unwrap();
    assert_eq!(ocean.total_count, 0);
    assert_eq!(ocean.total_shares, Decimal::ZERO);
    // the fee stays in the pool
    assert_eq!(ocean.balance_units, exited.fee_units);

    let alive = h
        .service
        .resurrect_fish(fish.id, owner, 2, units(20_000_000))
        .await;
    let back = alive.unwrap();
    assert_eq!(back.status, FishStatus::Alive);
    assert_eq!(back.version, 3);

    let again = h
        .service
        .resurrect_fish(fish.id, owner, 3, units(20_000_000))
        .await;
    assert!(matches!(again, Err(FishError::AlreadyAlive(_))));
}

#[tokio::test]
async fn transfer_requires_owner_and_new_user() {
    let h = harness();
    let owner = UserId::new();
    let buyer = UserId::new();
    let fish = h
        .service
        .create_fish(owner, "Nemo", units(20_000_000))
        .await
        .unwrap();

    let self_transfer = h.service.transfer_fish(fish.id, owner, 1, owner).await;
    assert_eq!(self_transfer.unwrap_err().kind(), ErrorKind::Validation);

    let moved = h.service.transfer_fish(fish.id, owner, 1, buyer).await.unwrap();
    assert_eq!(moved.owner_user_id, buyer);
    assert_eq!(h.service.list_fish(buyer).await.unwrap().len(), 1);
    assert!(h.service.list_fish(owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn sweep_kills_overdue_fish_only() {
    let h = harness();
    let owner = UserId::new();
    let hungry = h
        .service
        .create_fish(owner, "Hungry", units(20_000_000))
        .await
        .unwrap();

    h.clock.advance(TimeDelta::hours(12));
    let fed_later = h
        .service
        .create_fish(owner, "Fresh", units(20_000_000))
        .await
        .unwrap();

    h.clock.advance(TimeDelta::hours(12) + TimeDelta::seconds(1));
    let dead = h.service.sweep_starved().await.unwrap();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead.first().map(|f| f.id), Some(hungry.id));

    let ocean = h.service.get_ocean_state().await.unwrap();
    assert_eq!(ocean.total_count, 1);
    assert_eq!(ocean.total_shares, fed_later.share);
    // the forfeited share stays in the balance
    assert_eq!(ocean.balance_units, units(36_000_000));

    let events = h.service.events().recent(1).await;
    assert_eq!(events.first().map(|e| e.kind), Some(EventKind::FishStarved));
}

#[tokio::test]
async fn rollover_only_when_due() {
    let h = harness();
    assert_eq!(h.service.rollover_if_due(0).await.unwrap(), None);

    h.clock.advance(TimeDelta::days(1));
    let rolled = h.service.rollover_if_due(0).await.unwrap().unwrap();
    assert_eq!(rolled.mode, OceanMode::Storm);
    assert_eq!(rolled.cycle_start_time, start() + TimeDelta::days(1));

    let invalid = h.service.rollover(10_000).await;
    assert!(matches!(invalid, Err(FishError::InvalidRandomBps { .. })));
}
