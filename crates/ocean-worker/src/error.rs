//! Error types for the worker binary.
//!
//! [`WorkerError`] is the top-level error type for startup and shutdown.
//! Errors inside a running loop are logged and the loop continues.

/// Top-level error for the worker binary.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ocean_core::ConfigError,
    },

    /// A database or lock backend failed during startup.
    #[error("database error: {source}")]
    Db {
        /// The underlying database error.
        #[from]
        source: ocean_db::DbError,
    },

    /// NATS connection or subscription failed.
    #[error("NATS error: {message}")]
    Nats {
        /// Description of the NATS failure.
        message: String,
    },

    /// The operator API server failed.
    #[error("operator error: {source}")]
    Operator {
        /// The underlying server error.
        #[from]
        source: ocean_operator::ServerError,
    },
}
