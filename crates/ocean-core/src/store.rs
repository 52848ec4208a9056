//! Storage seam for the game state.
//!
//! The [`GameStore`] contract:
//!
//! - Creature writes are compare-and-swap on `version`: an update is only
//!   applied if the stored version still equals the caller's expected one.
//! - A [`FishCommit`] (one or two creatures plus an [`OceanDelta`]) is
//!   all-or-nothing.
//! - Ocean totals are adjusted by delta, never overwritten, so operations
//!   on different creatures never lose each other's pool updates.
//! - A rollover is compare-and-swap on `cycle_start_time`, so two
//!   concurrent rollovers cannot both apply.
//!
//! [`InMemoryGameStore`] implements the contract behind one async mutex.
//! The `PostgreSQL` implementation lives in `ocean-db`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use ocean_types::{Fish, FishId, FishStatus, OceanState, UserId};

use crate::ocean::OceanDelta;

/// Errors returned by a [`GameStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No creature with this id.
    #[error("fish not found: {0}")]
    FishNotFound(FishId),

    /// A creature with this id already exists.
    #[error("fish already exists: {0}")]
    DuplicateFish(FishId),

    /// The stored version moved since the caller read it.
    #[error("version conflict on fish {fish_id}: expected {expected}, found {actual}")]
    VersionConflict {
        /// The creature whose version moved.
        fish_id: FishId,
        /// Version the caller expected.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },

    /// The ocean cycle moved since the caller read it.
    #[error("ocean cycle already advanced")]
    CycleConflict,

    /// Applying the delta would break a pool invariant.
    #[error("ocean invariant violated: {0}")]
    Invariant(String),

    /// The backend failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// One creature write inside a [`FishCommit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FishUpdate {
    /// The full next value of the creature.
    pub fish: Fish,
    /// The version the stored creature must still have.
    pub expected_version: u64,
}

/// An atomic unit of creature updates plus their pool effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FishCommit {
    /// Creature writes, each version-checked.
    pub updates: Vec<FishUpdate>,
    /// Change to the ocean totals.
    pub delta: OceanDelta,
    /// Commit timestamp, stamped on the ocean's `updated_at`.
    pub at: DateTime<Utc>,
}

/// Durable store for the ocean singleton and all creatures.
#[async_trait]
pub trait GameStore: Send + Sync + core::fmt::Debug {
    /// Read the ocean singleton.
    async fn ocean(&self) -> Result<OceanState, StoreError>;

    /// Read one creature.
    async fn fish(&self, id: FishId) -> Result<Option<Fish>, StoreError>;

    /// All creatures currently owned by `owner`, oldest first.
    async fn fish_by_owner(&self, owner: UserId) -> Result<Vec<Fish>, StoreError>;

    /// Alive creatures whose `last_fed_at` is strictly before `cutoff`.
    async fn starving_fish(&self, cutoff: DateTime<Utc>) -> Result<Vec<Fish>, StoreError>;

    /// Insert a new creature and apply `delta` in one unit.
    async fn insert_fish(
        &self,
        fish: Fish,
        delta: OceanDelta,
        at: DateTime<Utc>,
    ) -> Result<OceanState, StoreError>;

    /// Apply a version-checked commit.
    async fn commit(&self, commit: FishCommit) -> Result<OceanState, StoreError>;

    /// Replace the ocean's mode and cycle fields if the stored
    /// `cycle_start_time` still equals `expected_cycle_start`.
    async fn apply_rollover(
        &self,
        next: OceanState,
        expected_cycle_start: DateTime<Utc>,
    ) -> Result<OceanState, StoreError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct GameState {
    ocean: OceanState,
    fish: BTreeMap<FishId, Fish>,
}

/// Process-local [`GameStore`].
#[derive(Debug)]
pub struct InMemoryGameStore {
    state: Mutex<GameState>,
}

impl InMemoryGameStore {
    /// Create a store holding `ocean` and no creatures.
    pub fn new(ocean: OceanState) -> Self {
        Self {
            state: Mutex::new(GameState {
                ocean,
                fish: BTreeMap::new(),
            }),
        }
    }
}

fn apply_delta(
    ocean: &OceanState,
    delta: &OceanDelta,
    at: DateTime<Utc>,
) -> Result<OceanState, StoreError> {
    delta
        .apply(ocean, at)
        .ok_or_else(|| StoreError::Invariant(format!("cannot apply {delta:?} to ocean")))
}

#[async_trait]
impl GameStore for InMemoryGameStore {
    async fn ocean(&self) -> Result<OceanState, StoreError> {
        Ok(self.state.lock().await.ocean.clone())
    }

    async fn fish(&self, id: FishId) -> Result<Option<Fish>, StoreError> {
        Ok(self.state.lock().await.fish.get(&id).cloned())
    }

    async fn fish_by_owner(&self, owner: UserId) -> Result<Vec<Fish>, StoreError> {
        let state = self.state.lock().await;
        let mut owned: Vec<Fish> = state
            .fish
            .values()
            .filter(|f| f.owner_user_id == owner)
            .cloned()
            .collect();
        owned.sort_by_key(|f| f.created_at);
        Ok(owned)
    }

    async fn starving_fish(&self, cutoff: DateTime<Utc>) -> Result<Vec<Fish>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .fish
            .values()
            .filter(|f| f.status == FishStatus::Alive && f.last_fed_at < cutoff)
            .cloned()
            .collect())
    }

    async fn insert_fish(
        &self,
        fish: Fish,
        delta: OceanDelta,
        at: DateTime<Utc>,
    ) -> Result<OceanState, StoreError> {
        let mut state = self.state.lock().await;
        if state.fish.contains_key(&fish.id) {
            return Err(StoreError::DuplicateFish(fish.id));
        }
        let ocean = apply_delta(&state.ocean, &delta, at)?;
        state.fish.insert(fish.id, fish);
        state.ocean = ocean.clone();
        Ok(ocean)
    }

    async fn commit(&self, commit: FishCommit) -> Result<OceanState, StoreError> {
        let mut state = self.state.lock().await;

        // Validate everything before touching anything.
        for update in &commit.updates {
            let stored = state
                .fish
                .get(&update.fish.id)
                .ok_or(StoreError::FishNotFound(update.fish.id))?;
            if stored.version != update.expected_version {
                return Err(StoreError::VersionConflict {
                    fish_id: update.fish.id,
                    expected: update.expected_version,
                    actual: stored.version,
                });
            }
        }
        let ocean = apply_delta(&state.ocean, &commit.delta, commit.at)?;

        for update in commit.updates {
            state.fish.insert(update.fish.id, update.fish);
        }
        state.ocean = ocean.clone();
        Ok(ocean)
    }

    async fn apply_rollover(
        &self,
        next: OceanState,
        expected_cycle_start: DateTime<Utc>,
    ) -> Result<OceanState, StoreError> {
        let mut state = self.state.lock().await;
        if state.ocean.cycle_start_time != expected_cycle_start {
            return Err(StoreError::CycleConflict);
        }
        let current = &state.ocean;
        let merged = OceanState {
            mode: next.mode,
            feeding_percentage_bps: next.feeding_percentage_bps,
            storm_probability_bps: next.storm_probability_bps,
            cycle_start_time: next.cycle_start_time,
            next_mode_change_time: next.next_mode_change_time,
            updated_at: next.updated_at,
            ..current.clone()
        };
        state.ocean = merged.clone();
        Ok(merged)
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use chrono::TimeDelta;
    use rust_decimal::Decimal;

    use super::*;
    use crate::config::{EconomyConfig, PoolConfig};
    use crate::fish::create;
    use crate::ocean::initialize;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
    }

    async fn seeded() -> (InMemoryGameStore, Fish) {
        let store = InMemoryGameStore::new(initialize(&PoolConfig::default(), now()));
        let created = create(
            UserId::new(),
            "Nemo",
            Decimal::new(20_000_000, 0),
            &EconomyConfig::default(),
            now(),
        )
        .unwrap_or_else(|e| panic!("{e}"));
        let fish = created.fish.clone();
        let inserted = store.insert_fish(created.fish, created.delta, now()).await;
        assert!(inserted.is_ok());
        (store, fish)
    }

    #[tokio::test]
    async fn insert_applies_delta() {
        let (store, fish) = seeded().await;
        let ocean = store.ocean().await.unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(ocean.total_count, 1);
        assert_eq!(ocean.total_shares, fish.share);
        assert_eq!(ocean.balance_units, fish.share);
    }

    #[tokio::test]
    async fn stale_commit_changes_nothing() {
        let (store, fish) = seeded().await;
        let before = store.ocean().await.unwrap_or_else(|e| panic!("{e}"));

        let mut next = fish.clone();
        next.version = 3;
        let result = store
            .commit(FishCommit {
                updates: vec![FishUpdate {
                    fish: next,
                    expected_version: 2,
                }],
                delta: OceanDelta {
                    count: 0,
                    shares: Decimal::ONE,
                    balance: Decimal::ONE,
                },
                at: now(),
            })
            .await;

        assert!(matches!(result, Err(StoreError::VersionConflict { .. })));
        assert_eq!(store.ocean().await.ok(), Some(before));
        assert_eq!(store.fish(fish.id).await.ok().flatten(), Some(fish));
    }

    #[tokio::test]
    async fn rollover_is_compare_and_swap() {
        let (store, _) = seeded().await;
        let ocean = store.ocean().await.unwrap_or_else(|e| panic!("{e}"));
        let later = now() + TimeDelta::days(1);
        let next = crate::ocean::rollover(&ocean, 0, &PoolConfig::default(), later)
            .unwrap_or_else(|e| panic!("{e}"));

        let first = store.apply_rollover(next.clone(), ocean.cycle_start_time).await;
        assert!(first.is_ok());
        let second = store.apply_rollover(next, ocean.cycle_start_time).await;
        assert_eq!(second, Err(StoreError::CycleConflict));

        let after = store.ocean().await.unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(after.total_count, 1);
    }

    #[tokio::test]
    async fn starving_query_uses_cutoff() {
        let (store, fish) = seeded().await;
        assert!(store.starving_fish(now()).await.unwrap_or_default().is_empty());
        let overdue = store
            .starving_fish(now() + TimeDelta::seconds(1))
            .await
            .unwrap_or_default();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue.first().map(|f| f.id), Some(fish.id));
    }
}
