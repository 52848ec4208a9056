//! Operator API server for the Ocean economy.
//!
//! An Axum HTTP server that exposes the ocean and creature state, the
//! event log, user balances, and the settlement controls operators need:
//! alerts, dead-lettered deposits, the inbound-transfer hook, and
//! on-demand worker cycles.
//!
//! All routes act on the same [`OceanService`](ocean_core::OceanService)
//! and [`SettlementWorker`](ocean_settlement::SettlementWorker) the
//! background loops use. Errors are rendered as
//! `{"error": ..., "status": ...}` with 400, 404, 409, or 500.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod settlement;
pub mod state;

// Re-export primary types for convenience.
pub use error::OperatorError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
