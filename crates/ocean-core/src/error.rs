//! Error types for the ocean-core crate.
//!
//! Every lifecycle operation either commits completely or returns one of
//! these errors with nothing applied. [`FishError::kind`] sorts them into
//! the three classes the outer API layer reacts to.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use ocean_types::{FishId, FishStatus, UserId};

use crate::store::StoreError;

/// How the caller should react to a [`FishError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input. Fix the request and retry.
    Validation,
    /// Stale or disallowed state. Re-read and decide whether to retry.
    Conflict,
    /// Storage or arithmetic failure.
    Internal,
}

/// Errors returned by creature and ocean operations.
#[derive(Debug, thiserror::Error)]
pub enum FishError {
    /// Deposit is below the configured minimum.
    #[error("deposit {deposit} is below the minimum of {minimum}")]
    DepositBelowMinimum {
        /// The offered deposit.
        deposit: Decimal,
        /// The configured minimum.
        minimum: Decimal,
    },

    /// Feed amount is below the configured minimum.
    #[error("feed amount {amount} is below the minimum of {minimum}")]
    FeedBelowMinimum {
        /// The offered amount.
        amount: Decimal,
        /// The configured minimum.
        minimum: Decimal,
    },

    /// Amount is not a whole, non-negative number of units.
    #[error("amount {amount} is not a whole number of units")]
    InvalidAmount {
        /// The rejected amount.
        amount: Decimal,
    },

    /// Creature name is empty or too long.
    #[error("invalid fish name: {reason}")]
    InvalidName {
        /// Why the name was rejected.
        reason: String,
    },

    /// Transfer target already owns the creature.
    #[error("fish {0} already belongs to that user")]
    SelfTransfer(FishId),

    /// A creature cannot mark or hunt itself.
    #[error("fish {0} cannot target itself")]
    SelfTarget(FishId),

    /// Random draw outside `[0, 10000)`.
    #[error("random draw {value} is outside [0, 10000)")]
    InvalidRandomBps {
        /// The rejected draw.
        value: u32,
    },

    /// No creature with this id.
    #[error("fish not found: {0}")]
    FishNotFound(FishId),

    /// Stored version differs from the caller's expected version.
    #[error("version conflict on fish {fish_id}: expected {expected}, found {actual}")]
    VersionConflict {
        /// The creature whose version moved.
        fish_id: FishId,
        /// Version the caller read.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },

    /// The acting user does not own the creature.
    #[error("user {actor} does not own fish {fish_id}")]
    NotOwner {
        /// The creature acted upon.
        fish_id: FishId,
        /// The acting user.
        actor: UserId,
    },

    /// The operation requires a live creature.
    #[error("fish {fish_id} is {status}, not alive")]
    NotAlive {
        /// The creature acted upon.
        fish_id: FishId,
        /// Its current status.
        status: FishStatus,
    },

    /// Resurrection requires a dead or exited creature.
    #[error("fish {0} is alive and cannot be resurrected")]
    AlreadyAlive(FishId),

    /// The hunter is still cooling down.
    #[error("fish {fish_id} cannot hunt until {until}")]
    OnCooldown {
        /// The hunter.
        fish_id: FishId,
        /// When the cooldown ends.
        until: DateTime<Utc>,
    },

    /// The prey is still protected after an earlier hunt.
    #[error("fish {fish_id} is protected until {until}")]
    PreyProtected {
        /// The prey.
        fish_id: FishId,
        /// When protection lapses.
        until: DateTime<Utc>,
    },

    /// The prey carries no unexpired mark from this hunter.
    #[error("fish {prey} is not marked by hunter {hunter}")]
    NotMarkedByHunter {
        /// The would-be hunter.
        hunter: FishId,
        /// The prey.
        prey: FishId,
    },

    /// The creature is still within its feeding deadline.
    #[error("fish {0} is not overdue for feeding")]
    NotStarving(FishId),

    /// Another rollover already advanced the cycle.
    #[error("ocean cycle already advanced by a concurrent rollover")]
    RolloverConflict,

    /// A currency computation overflowed.
    #[error("arithmetic overflow computing {0}")]
    Overflow(&'static str),

    /// The game store failed.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl FishError {
    /// Classify the error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::DepositBelowMinimum { .. }
            | Self::FeedBelowMinimum { .. }
            | Self::InvalidAmount { .. }
            | Self::InvalidName { .. }
            | Self::SelfTransfer(_)
            | Self::SelfTarget(_)
            | Self::InvalidRandomBps { .. }
            | Self::FishNotFound(_) => ErrorKind::Validation,
            Self::VersionConflict { .. }
            | Self::NotOwner { .. }
            | Self::NotAlive { .. }
            | Self::AlreadyAlive(_)
            | Self::OnCooldown { .. }
            | Self::PreyProtected { .. }
            | Self::NotMarkedByHunter { .. }
            | Self::NotStarving(_)
            | Self::RolloverConflict => ErrorKind::Conflict,
            Self::Overflow(_) | Self::Store(_) => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for FishError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict {
                fish_id,
                expected,
                actual,
            } => Self::VersionConflict {
                fish_id,
                expected,
                actual,
            },
            StoreError::FishNotFound(id) => Self::FishNotFound(id),
            StoreError::CycleConflict => Self::RolloverConflict,
            other => Self::Store(other),
        }
    }
}
