//! `PostgreSQL` implementation of [`GameStore`].
//!
//! Every write runs in one transaction. The ocean row is locked with
//! `SELECT ... FOR UPDATE` before a delta is applied, so concurrent
//! commits on different creatures serialize on the pool totals instead of
//! overwriting each other. Creature updates are guarded by
//! `WHERE version = $expected`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use ocean_core::{FishCommit, GameStore, OceanDelta, StoreError};
use ocean_types::{Fish, FishId, FishStatus, OceanState, UserId};

use crate::error::{DbError, narrow, parse_enum};

const OCEAN_COLUMNS: &str = "total_count, total_shares, balance_units, mode, \
    feeding_percentage_bps, storm_probability_bps, cycle_start_time, \
    next_mode_change_time, updated_at";

const FISH_COLUMNS: &str = "id, owner_user_id, name, share, created_at, last_fed_at, \
    last_hunt_at, can_hunt_after, is_protected, protection_ends_at, \
    marked_by_fish_id, mark_expires_at, status, version";

fn backend(err: sqlx::Error) -> StoreError {
    DbError::from(err).into()
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `ocean_state` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OceanRow {
    /// Live creature count.
    pub total_count: i64,
    /// Sum of live shares.
    pub total_shares: Decimal,
    /// Payable pool balance.
    pub balance_units: Decimal,
    /// Mode name.
    pub mode: String,
    /// Feeding percentage in basis points.
    pub feeding_percentage_bps: i32,
    /// Storm chance in basis points.
    pub storm_probability_bps: i32,
    /// Start of the current cycle.
    pub cycle_start_time: DateTime<Utc>,
    /// Next scheduled rollover.
    pub next_mode_change_time: DateTime<Utc>,
    /// Last write.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<OceanRow> for OceanState {
    type Error = DbError;

    fn try_from(row: OceanRow) -> Result<Self, Self::Error> {
        Ok(Self {
            total_count: narrow(row.total_count, "total_count")?,
            total_shares: row.total_shares,
            balance_units: row.balance_units,
            mode: parse_enum(&row.mode)?,
            feeding_percentage_bps: narrow(row.feeding_percentage_bps, "feeding_percentage_bps")?,
            storm_probability_bps: narrow(row.storm_probability_bps, "storm_probability_bps")?,
            cycle_start_time: row.cycle_start_time,
            next_mode_change_time: row.next_mode_change_time,
            updated_at: row.updated_at,
        })
    }
}

/// A row from the `fish` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FishRow {
    /// Creature UUID.
    pub id: Uuid,
    /// Owner UUID.
    pub owner_user_id: Uuid,
    /// Display name.
    pub name: String,
    /// Claim on the pool.
    pub share: Decimal,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last feeding.
    pub last_fed_at: DateTime<Utc>,
    /// Last hunt.
    pub last_hunt_at: Option<DateTime<Utc>>,
    /// Hunt cooldown end.
    pub can_hunt_after: Option<DateTime<Utc>>,
    /// Hunted-before flag.
    pub is_protected: bool,
    /// Protection window end.
    pub protection_ends_at: Option<DateTime<Utc>>,
    /// Hunter holding the mark.
    pub marked_by_fish_id: Option<Uuid>,
    /// Mark expiry.
    pub mark_expires_at: Option<DateTime<Utc>>,
    /// Status name.
    pub status: String,
    /// Optimistic-concurrency counter.
    pub version: i64,
}

impl TryFrom<FishRow> for Fish {
    type Error = DbError;

    fn try_from(row: FishRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: FishId::from(row.id),
            owner_user_id: UserId::from(row.owner_user_id),
            name: row.name,
            share: row.share,
            created_at: row.created_at,
            last_fed_at: row.last_fed_at,
            last_hunt_at: row.last_hunt_at,
            can_hunt_after: row.can_hunt_after,
            is_protected: row.is_protected,
            protection_ends_at: row.protection_ends_at,
            marked_by_fish_id: row.marked_by_fish_id.map(FishId::from),
            mark_expires_at: row.mark_expires_at,
            status: parse_enum(&row.status)?,
            version: narrow(row.version, "version")?,
        })
    }
}

fn fish_rows(rows: Vec<FishRow>) -> Result<Vec<Fish>, StoreError> {
    rows.into_iter()
        .map(|row| Fish::try_from(row).map_err(StoreError::from))
        .collect()
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// [`GameStore`] over a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgGameStore {
    pool: PgPool,
}

impl PgGameStore {
    /// Wrap an existing pool. Migrations must already have run.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Seed the ocean singleton unless it already exists.
    ///
    /// Returns the stored ocean, which is `ocean` only on first start.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the insert or read fails.
    pub async fn initialize(&self, ocean: &OceanState) -> Result<OceanState, DbError> {
        let inserted = sqlx::query(&format!(
            "INSERT INTO ocean_state (id, {OCEAN_COLUMNS}) \
             VALUES (1, $1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (id) DO NOTHING"
        ))
        .bind(narrow::<u64, i64>(ocean.total_count, "total_count")?)
        .bind(ocean.total_shares)
        .bind(ocean.balance_units)
        .bind(ocean.mode.as_str())
        .bind(narrow::<u32, i32>(ocean.feeding_percentage_bps, "feeding_percentage_bps")?)
        .bind(narrow::<u32, i32>(ocean.storm_probability_bps, "storm_probability_bps")?)
        .bind(ocean.cycle_start_time)
        .bind(ocean.next_mode_change_time)
        .bind(ocean.updated_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted > 0 {
            tracing::info!(mode = ocean.mode.as_str(), "Ocean state seeded");
        }
        let row = sqlx::query_as::<_, OceanRow>(&format!(
            "SELECT {OCEAN_COLUMNS} FROM ocean_state WHERE id = 1"
        ))
        .fetch_one(&self.pool)
        .await?;
        OceanState::try_from(row)
    }

    async fn lock_ocean(tx: &mut Transaction<'_, Postgres>) -> Result<OceanState, StoreError> {
        let row = sqlx::query_as::<_, OceanRow>(&format!(
            "SELECT {OCEAN_COLUMNS} FROM ocean_state WHERE id = 1 FOR UPDATE"
        ))
        .fetch_optional(&mut **tx)
        .await
        .map_err(backend)?
        .ok_or_else(|| StoreError::Invariant("ocean state not initialized".to_owned()))?;
        Ok(OceanState::try_from(row)?)
    }

    async fn write_totals(
        tx: &mut Transaction<'_, Postgres>,
        current: &OceanState,
        delta: &OceanDelta,
        at: DateTime<Utc>,
    ) -> Result<OceanState, StoreError> {
        let next = delta
            .apply(current, at)
            .ok_or_else(|| StoreError::Invariant(format!("cannot apply {delta:?} to ocean")))?;
        sqlx::query(
            "UPDATE ocean_state \
             SET total_count = $1, total_shares = $2, balance_units = $3, updated_at = $4 \
             WHERE id = 1",
        )
        .bind(narrow::<u64, i64>(next.total_count, "total_count")?)
        .bind(next.total_shares)
        .bind(next.balance_units)
        .bind(next.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(backend)?;
        Ok(next)
    }

    async fn update_fish(
        tx: &mut Transaction<'_, Postgres>,
        fish: &Fish,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        let updated = sqlx::query(
            "UPDATE fish SET owner_user_id = $2, name = $3, share = $4, last_fed_at = $5, \
             last_hunt_at = $6, can_hunt_after = $7, is_protected = $8, \
             protection_ends_at = $9, marked_by_fish_id = $10, mark_expires_at = $11, \
             status = $12, version = $13 \
             WHERE id = $1 AND version = $14",
        )
        .bind(fish.id.into_inner())
        .bind(fish.owner_user_id.into_inner())
        .bind(&fish.name)
        .bind(fish.share)
        .bind(fish.last_fed_at)
        .bind(fish.last_hunt_at)
        .bind(fish.can_hunt_after)
        .bind(fish.is_protected)
        .bind(fish.protection_ends_at)
        .bind(fish.marked_by_fish_id.map(FishId::into_inner))
        .bind(fish.mark_expires_at)
        .bind(fish.status.as_str())
        .bind(narrow::<u64, i64>(fish.version, "version")?)
        .bind(narrow::<u64, i64>(expected_version, "version")?)
        .execute(&mut **tx)
        .await
        .map_err(backend)?
        .rows_affected();
        if updated > 0 {
            return Ok(());
        }

        let stored: Option<i64> = sqlx::query_scalar("SELECT version FROM fish WHERE id = $1")
            .bind(fish.id.into_inner())
            .fetch_optional(&mut **tx)
            .await
            .map_err(backend)?;
        match stored {
            None => Err(StoreError::FishNotFound(fish.id)),
            Some(actual) => Err(StoreError::VersionConflict {
                fish_id: fish.id,
                expected: expected_version,
                actual: narrow(actual, "version")?,
            }),
        }
    }
}

#[async_trait]
impl GameStore for PgGameStore {
    async fn ocean(&self) -> Result<OceanState, StoreError> {
        let row = sqlx::query_as::<_, OceanRow>(&format!(
            "SELECT {OCEAN_COLUMNS} FROM ocean_state WHERE id = 1"
        ))
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .ok_or_else(|| StoreError::Invariant("ocean state not initialized".to_owned()))?;
        Ok(OceanState::try_from(row)?)
    }

    async fn fish(&self, id: FishId) -> Result<Option<Fish>, StoreError> {
        let row = sqlx::query_as::<_, FishRow>(&format!(
            "SELECT {FISH_COLUMNS} FROM fish WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.map(Fish::try_from).transpose()?)
    }

    async fn fish_by_owner(&self, owner: UserId) -> Result<Vec<Fish>, StoreError> {
        let rows = sqlx::query_as::<_, FishRow>(&format!(
            "SELECT {FISH_COLUMNS} FROM fish WHERE owner_user_id = $1 ORDER BY created_at, id"
        ))
        .bind(owner.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        fish_rows(rows)
    }

    async fn starving_fish(&self, cutoff: DateTime<Utc>) -> Result<Vec<Fish>, StoreError> {
        let rows = sqlx::query_as::<_, FishRow>(&format!(
            "SELECT {FISH_COLUMNS} FROM fish \
             WHERE status = $1 AND last_fed_at < $2 ORDER BY last_fed_at, id"
        ))
        .bind(FishStatus::Alive.as_str())
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        fish_rows(rows)
    }

    async fn insert_fish(
        &self,
        fish: Fish,
        delta: OceanDelta,
        at: DateTime<Utc>,
    ) -> Result<OceanState, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let current = Self::lock_ocean(&mut tx).await?;

        let inserted = sqlx::query(&format!(
            "INSERT INTO fish ({FISH_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             ON CONFLICT (id) DO NOTHING"
        ))
        .bind(fish.id.into_inner())
        .bind(fish.owner_user_id.into_inner())
        .bind(&fish.name)
        .bind(fish.share)
        .bind(fish.created_at)
        .bind(fish.last_fed_at)
        .bind(fish.last_hunt_at)
        .bind(fish.can_hunt_after)
        .bind(fish.is_protected)
        .bind(fish.protection_ends_at)
        .bind(fish.marked_by_fish_id.map(FishId::into_inner))
        .bind(fish.mark_expires_at)
        .bind(fish.status.as_str())
        .bind(narrow::<u64, i64>(fish.version, "version")?)
        .execute(&mut *tx)
        .await
        .map_err(backend)?
        .rows_affected();
        if inserted == 0 {
            return Err(StoreError::DuplicateFish(fish.id));
        }

        let ocean = Self::write_totals(&mut tx, &current, &delta, at).await?;
        tx.commit().await.map_err(backend)?;
        Ok(ocean)
    }

    async fn commit(&self, commit: FishCommit) -> Result<OceanState, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let current = Self::lock_ocean(&mut tx).await?;

        for update in &commit.updates {
            Self::update_fish(&mut tx, &update.fish, update.expected_version).await?;
        }
        let ocean = Self::write_totals(&mut tx, &current, &commit.delta, commit.at).await?;

        tx.commit().await.map_err(backend)?;
        Ok(ocean)
    }

    async fn apply_rollover(
        &self,
        next: OceanState,
        expected_cycle_start: DateTime<Utc>,
    ) -> Result<OceanState, StoreError> {
        let row = sqlx::query_as::<_, OceanRow>(&format!(
            "UPDATE ocean_state \
             SET mode = $1, feeding_percentage_bps = $2, storm_probability_bps = $3, \
                 cycle_start_time = $4, next_mode_change_time = $5, updated_at = $6 \
             WHERE id = 1 AND cycle_start_time = $7 \
             RETURNING {OCEAN_COLUMNS}"
        ))
        .bind(next.mode.as_str())
        .bind(narrow::<u32, i32>(next.feeding_percentage_bps, "feeding_percentage_bps")?)
        .bind(narrow::<u32, i32>(next.storm_probability_bps, "storm_probability_bps")?)
        .bind(next.cycle_start_time)
        .bind(next.next_mode_change_time)
        .bind(next.updated_at)
        .bind(expected_cycle_start)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .ok_or(StoreError::CycleConflict)?;
        Ok(OceanState::try_from(row)?)
    }
}
