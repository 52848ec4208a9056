//! The operation-shaped entry points the outer API layer calls.
//!
//! [`OceanService`] reads current state from the [`GameStore`], runs the
//! pure transition from [`crate::fish`] or [`crate::ocean`], commits the
//! result with a version check, and narrates the committed transition into
//! the [`EventLog`]. A failed check or a lost race returns an error and
//! leaves the store untouched; the core never retries on the caller's
//! behalf.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use ocean_events::{EventLog, narrate};
use ocean_types::{Clock, Fish, FishId, OceanState, UserId};

use crate::config::{EconomyConfig, PoolConfig};
use crate::error::FishError;
use crate::fish::{self, HuntRequest};
use crate::ocean::{self, OceanDelta};
use crate::store::{FishCommit, FishUpdate, GameStore};

/// Result of [`OceanService::place_mark`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkOutcome {
    /// The hunter after the mark.
    pub hunter: Fish,
    /// The prey carrying the mark.
    pub prey: Fish,
}

/// Result of [`OceanService::hunt_fish`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HuntOutcome {
    /// The hunter after the hunt.
    pub hunter: Fish,
    /// The prey after the hunt.
    pub prey: Fish,
    /// Share moved from prey to hunter.
    pub stolen_share: Decimal,
}

/// Result of [`OceanService::exit_fish`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExitOutcome {
    /// The exited creature.
    pub fish: Fish,
    /// Units paid out to the owner.
    pub payout_units: Decimal,
    /// Exit fee kept in the pool.
    pub fee_units: Decimal,
}

/// Creature lifecycle and ocean operations over a [`GameStore`].
#[derive(Debug, Clone)]
pub struct OceanService {
    store: Arc<dyn GameStore>,
    clock: Arc<dyn Clock>,
    events: Arc<EventLog>,
    economy: EconomyConfig,
    pool: PoolConfig,
}

impl OceanService {
    /// Wire a service over its collaborators.
    pub fn new(
        store: Arc<dyn GameStore>,
        clock: Arc<dyn Clock>,
        events: Arc<EventLog>,
        economy: EconomyConfig,
        pool: PoolConfig,
    ) -> Self {
        Self {
            store,
            clock,
            events,
            economy,
            pool,
        }
    }

    /// The event log this service narrates into.
    pub const fn events(&self) -> &Arc<EventLog> {
        &self.events
    }

    /// The economy rules in force.
    pub const fn economy(&self) -> &EconomyConfig {
        &self.economy
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Current ocean singleton.
    pub async fn get_ocean_state(&self) -> Result<OceanState, FishError> {
        Ok(self.store.ocean().await?)
    }

    /// One creature.
    pub async fn get_fish(&self, id: FishId) -> Result<Fish, FishError> {
        self.store.fish(id).await?.ok_or(FishError::FishNotFound(id))
    }

    /// Creatures owned by `owner`.
    pub async fn list_fish(&self, owner: UserId) -> Result<Vec<Fish>, FishError> {
        Ok(self.store.fish_by_owner(owner).await?)
    }

    // -----------------------------------------------------------------------
    // Creature lifecycle
    // -----------------------------------------------------------------------

    /// Create a creature from a deposit.
    pub async fn create_fish(
        &self,
        owner: UserId,
        name: &str,
        deposit_units: Decimal,
    ) -> Result<Fish, FishError> {
        let now = self.clock.now();
        let created = fish::create(owner, name, deposit_units, &self.economy, now)?;
        self.store
            .insert_fish(created.fish.clone(), created.delta, now)
            .await?;

        tracing::info!(
            fish_id = %created.fish.id,
            owner = %owner,
            share = %created.fish.share,
            fee = %created.fee,
            "fish created"
        );
        self.events
            .record(narrate::fish_created(&created.fish, deposit_units, created.fee))
            .await;
        Ok(created.fish)
    }

    /// Feed a creature at the ocean's current feeding percentage.
    pub async fn feed_fish(
        &self,
        fish_id: FishId,
        actor: UserId,
        amount_units: Decimal,
        expected_version: u64,
    ) -> Result<Fish, FishError> {
        let now = self.clock.now();
        let ocean = self.store.ocean().await?;
        let current = self.get_fish(fish_id).await?;
        let fed = fish::feed(
            &current,
            actor,
            amount_units,
            expected_version,
            ocean.feeding_percentage_bps,
            &self.economy,
            now,
        )?;
        self.commit(vec![(fed.fish.clone(), expected_version)], fed.delta, now)
            .await?;

        tracing::info!(
            %fish_id,
            amount = %amount_units,
            reward = %fed.reward,
            version = fed.fish.version,
            "fish fed"
        );
        self.events
            .record(narrate::fish_fed(&fed.fish, amount_units, fed.commission, fed.reward))
            .await;
        Ok(fed.fish)
    }

    /// Place the hunter's exclusive mark on the prey.
    pub async fn place_mark(
        &self,
        hunter_id: FishId,
        prey_id: FishId,
        actor: UserId,
        expected_hunter_version: u64,
        expected_prey_version: u64,
    ) -> Result<MarkOutcome, FishError> {
        let now = self.clock.now();
        let hunter = self.get_fish(hunter_id).await?;
        let prey = self.get_fish(prey_id).await?;
        let req = HuntRequest {
            hunter: &hunter,
            prey: &prey,
            actor,
            expected_hunter_version,
            expected_prey_version,
        };
        let marked = fish::place_mark(&req, &self.economy, now)?;
        self.commit(
            vec![
                (marked.hunter.clone(), expected_hunter_version),
                (marked.prey.clone(), expected_prey_version),
            ],
            OceanDelta::ZERO,
            now,
        )
        .await?;

        tracing::info!(%hunter_id, %prey_id, "mark placed");
        self.events
            .record(narrate::mark_placed(&marked.hunter, &marked.prey, now))
            .await;
        Ok(MarkOutcome {
            hunter: marked.hunter,
            prey: marked.prey,
        })
    }

    /// Hunt a marked prey.
    pub async fn hunt_fish(
        &self,
        hunter_id: FishId,
        prey_id: FishId,
        actor: UserId,
        expected_hunter_version: u64,
        expected_prey_version: u64,
    ) -> Result<HuntOutcome, FishError> {
        let now = self.clock.now();
        let hunter = self.get_fish(hunter_id).await?;
        let prey = self.get_fish(prey_id).await?;
        let req = HuntRequest {
            hunter: &hunter,
            prey: &prey,
            actor,
            expected_hunter_version,
            expected_prey_version,
        };
        let hunted = fish::hunt(&req, &self.economy, now)?;
        self.commit(
            vec![
                (hunted.hunter.clone(), expected_hunter_version),
                (hunted.prey.clone(), expected_prey_version),
            ],
            OceanDelta::ZERO,
            now,
        )
        .await?;

        tracing::info!(%hunter_id, %prey_id, stolen = %hunted.stolen, "fish hunted");
        self.events
            .record(narrate::fish_hunted(
                &hunted.hunter,
                &hunted.prey,
                hunted.stolen,
                now,
            ))
            .await;
        Ok(HuntOutcome {
            hunter: hunted.hunter,
            prey: hunted.prey,
            stolen_share: hunted.stolen,
        })
    }

    /// Hand a creature to another user.
    pub async fn transfer_fish(
        &self,
        fish_id: FishId,
        actor: UserId,
        expected_version: u64,
        new_owner: UserId,
    ) -> Result<Fish, FishError> {
        let now = self.clock.now();
        let current = self.get_fish(fish_id).await?;
        let moved = fish::transfer(&current, actor, new_owner, expected_version)?;
        self.commit(vec![(moved.clone(), expected_version)], OceanDelta::ZERO, now)
            .await?;

        tracing::info!(%fish_id, from = %actor, to = %new_owner, "fish transferred");
        self.events
            .record(narrate::fish_transferred(&moved, actor, now))
            .await;
        Ok(moved)
    }

    /// Liquidate a creature.
    pub async fn exit_fish(
        &self,
        fish_id: FishId,
        actor: UserId,
        expected_version: u64,
    ) -> Result<ExitOutcome, FishError> {
        let now = self.clock.now();
        let current = self.get_fish(fish_id).await?;
        let exited = fish::exit(&current, actor, expected_version, &self.economy, now)?;
        self.commit(
            vec![(exited.fish.clone(), expected_version)],
            exited.delta,
            now,
        )
        .await?;

        tracing::info!(%fish_id, payout = %exited.payout, fee = %exited.fee, "fish exited");
        self.events
            .record(narrate::fish_exited(&exited.fish, exited.payout, exited.fee, now))
            .await;
        Ok(ExitOutcome {
            fish: exited.fish,
            payout_units: exited.payout,
            fee_units: exited.fee,
        })
    }

    /// Bring a dead or exited creature back.
    pub async fn resurrect_fish(
        &self,
        fish_id: FishId,
        actor: UserId,
        expected_version: u64,
        deposit_units: Decimal,
    ) -> Result<Fish, FishError> {
        let now = self.clock.now();
        let current = self.get_fish(fish_id).await?;
        let back = fish::resurrect(
            &current,
            actor,
            deposit_units,
            expected_version,
            &self.economy,
            now,
        )?;
        self.commit(vec![(back.fish.clone(), expected_version)], back.delta, now)
            .await?;

        tracing::info!(%fish_id, share = %back.fish.share, "fish resurrected");
        self.events
            .record(narrate::fish_resurrected(&back.fish, deposit_units, back.fee))
            .await;
        Ok(back.fish)
    }

    /// Kill every alive creature past its feeding deadline.
    ///
    /// A creature that changed since it was listed is skipped; the next
    /// sweep picks it up if it is still overdue.
    pub async fn sweep_starved(&self) -> Result<Vec<Fish>, FishError> {
        let now = self.clock.now();
        let cutoff = now
            .checked_sub_signed(self.economy.feeding_deadline())
            .ok_or(FishError::Overflow("starvation cutoff"))?;
        let overdue = self.store.starving_fish(cutoff).await?;

        let mut dead = Vec::with_capacity(overdue.len());
        for candidate in overdue {
            let starved = match fish::starve(&candidate, candidate.version, &self.economy, now) {
                Ok(s) => s,
                Err(e) => {
                    tracing::debug!(fish_id = %candidate.id, error = %e, "skipping starvation");
                    continue;
                }
            };
            match self
                .commit(
                    vec![(starved.fish.clone(), candidate.version)],
                    starved.delta,
                    now,
                )
                .await
            {
                Ok(_) => {
                    tracing::info!(fish_id = %candidate.id, forfeited = %starved.forfeited, "fish starved");
                    self.events
                        .record(narrate::fish_starved(&starved.fish, starved.forfeited, now))
                        .await;
                    dead.push(starved.fish);
                }
                Err(FishError::VersionConflict { .. }) => {
                    tracing::debug!(fish_id = %candidate.id, "fish changed during sweep");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(dead)
    }

    // -----------------------------------------------------------------------
    // Ocean
    // -----------------------------------------------------------------------

    /// Roll the ocean into a new cycle using a caller-supplied draw.
    pub async fn rollover(&self, random_bps: u32) -> Result<OceanState, FishError> {
        let now = self.clock.now();
        let current = self.store.ocean().await?;
        let next = ocean::rollover(&current, random_bps, &self.pool, now)?;
        let applied = self
            .store
            .apply_rollover(next, current.cycle_start_time)
            .await?;

        tracing::info!(
            mode = applied.mode.as_str(),
            feeding_bps = applied.feeding_percentage_bps,
            random_bps,
            "ocean rolled over"
        );
        self.events
            .record(narrate::ocean_rollover(&applied, now))
            .await;
        Ok(applied)
    }

    /// Roll over only if the current cycle has ended.
    pub async fn rollover_if_due(&self, random_bps: u32) -> Result<Option<OceanState>, FishError> {
        let current = self.store.ocean().await?;
        if !ocean::rollover_due(&current, self.clock.now()) {
            return Ok(None);
        }
        match self.rollover(random_bps).await {
            Ok(next) => Ok(Some(next)),
            Err(FishError::RolloverConflict) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn commit(
        &self,
        updates: Vec<(Fish, u64)>,
        delta: OceanDelta,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<OceanState, FishError> {
        let commit = FishCommit {
            updates: updates
                .into_iter()
                .map(|(fish, expected_version)| FishUpdate {
                    fish,
                    expected_version,
                })
                .collect(),
            delta,
            at,
        };
        Ok(self.store.commit(commit).await?)
    }
}
