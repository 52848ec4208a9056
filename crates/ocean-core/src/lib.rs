//! Ocean aggregate, creature lifecycle, and the game store seam.
//!
//! # Architecture
//!
//! - [`config`] -- Economy rules and ocean cycle parameters.
//! - [`ocean`] -- Pure ocean initialization, rollover, and [`OceanDelta`].
//! - [`fish`] -- Pure creature transitions with version checks.
//! - [`store`] -- The [`GameStore`] trait and [`InMemoryGameStore`].
//! - [`service`] -- [`OceanService`], the entry points the API layer calls.
//! - [`error`] -- [`FishError`] and its [`ErrorKind`] classification.
//!
//! The creature book is independent of the user balance ledger: creating or
//! exiting a creature never writes a ledger entry here. Moving money
//! between the two books is the outer layer's job.

pub mod config;
pub mod error;
pub mod fish;
pub mod ocean;
pub mod service;
pub mod store;

pub use config::{ConfigError, EconomyConfig, PoolConfig};
pub use error::{ErrorKind, FishError};
pub use ocean::OceanDelta;
pub use service::{ExitOutcome, HuntOutcome, MarkOutcome, OceanService};
pub use store::{FishCommit, FishUpdate, GameStore, InMemoryGameStore, StoreError};
