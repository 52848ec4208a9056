//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`sqlx`] and [`fred`] errors. At the store seams they are flattened into
//! the `Backend` variant of each crate's `StoreError`.

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row does not map back onto a domain value.
    #[error("Row decode error: {0}")]
    Decode(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<DbError> for ocean_core::StoreError {
    fn from(err: DbError) -> Self {
        Self::Backend(err.to_string())
    }
}

impl From<DbError> for ocean_settlement::StoreError {
    fn from(err: DbError) -> Self {
        Self::Backend(err.to_string())
    }
}

impl From<DbError> for ocean_settlement::LockError {
    fn from(err: DbError) -> Self {
        Self(err.to_string())
    }
}

/// Convert a stored integer into a narrower domain integer.
pub(crate) fn narrow<T, U>(value: T, column: &'static str) -> Result<U, DbError>
where
    U: TryFrom<T>,
    U::Error: core::fmt::Display,
    T: Copy + core::fmt::Display,
{
    U::try_from(value).map_err(|e| DbError::Decode(format!("{column} out of range: {value} ({e})")))
}

/// Parse a stored enum column.
pub(crate) fn parse_enum<E>(value: &str) -> Result<E, DbError>
where
    E: core::str::FromStr<Err = ocean_types::UnknownVariant>,
{
    value.parse().map_err(|e: ocean_types::UnknownVariant| DbError::Decode(e.to_string()))
}
