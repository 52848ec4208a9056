//! Data layer for the Ocean economy (`PostgreSQL` + `Dragonfly`).
//!
//! `PostgreSQL` is the durable store behind both storage seams: the game
//! state ([`PgGameStore`]) and the settlement state ([`PgSettlementStore`]).
//! `Dragonfly` holds short-lived dispatch leases so several worker
//! processes can share one withdrawal queue.
//!
//! ```text
//! OceanService ------> GameStore -------> PgGameStore --------+
//!                                                             +--> PostgreSQL
//! SettlementWorker --> SettlementStore -> PgSettlementStore --+
//!                  \
//!                   -> DispatchLock ----> DragonflyDispatchLock --> Dragonfly
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool, configuration, migrations
//! - [`game_store`] -- ocean singleton and creatures
//! - [`settlement_store`] -- payments, ledger, queue, and inbound buffers
//! - [`dragonfly`] -- `Dragonfly` connection and dispatch leases
//! - [`error`] -- Shared error types

pub mod dragonfly;
pub mod error;
pub mod game_store;
pub mod postgres;
pub mod settlement_store;

// Re-export primary types for convenience.
pub use dragonfly::{DragonflyDispatchLock, DragonflyPool};
pub use error::DbError;
pub use game_store::{FishRow, OceanRow, PgGameStore};
pub use postgres::{PoolSettings, PostgresPool};
pub use settlement_store::{
    DeadLetterRow, InboundRow, LedgerRow, PaymentRow, PgSettlementStore, QueueRow,
};
