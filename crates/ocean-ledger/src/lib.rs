//! Append-only user balance ledger for the Ocean economy.
//!
//! Every deposit and withdrawal that settles against the external rail
//! becomes exactly one signed [`LedgerEntry`]. Entries are never updated or
//! deleted; a user's balance is the fold of all of their entries.
//!
//! The ledger is a separate book from the ocean pool: creature shares never
//! appear here.
//!
//! # Modules
//!
//! - [`ledger`] -- The [`Ledger`] struct plus the [`fold_balance`] and
//!   [`ensure_sufficient`] helpers shared with durable stores.
//! - [`entry`] -- The [`EntryBuilder`] for validated entry construction.
//! - [`audit`] -- Per-user integrity checks over a stored entry history.
//!
//! # Usage
//!
//! ```
//! use chrono::Utc;
//! use ocean_ledger::{EntryBuilder, Ledger};
//! use ocean_types::{LedgerReason, PaymentId, UserId};
//! use rust_decimal::Decimal;
//!
//! let mut ledger = Ledger::new();
//! let user = UserId::new();
//!
//! if let Ok(entry) = EntryBuilder::new(user, LedgerReason::Deposit)
//!     .delta(Decimal::new(5_000, 0))
//!     .ref_id(PaymentId::new())
//!     .at(Utc::now())
//!     .build()
//! {
//!     ledger.append_entry(entry);
//! }
//!
//! assert_eq!(ledger.balance(user).ok(), Some(Decimal::new(5_000, 0)));
//! assert!(ledger.ensure_sufficient_balance(user, Decimal::new(6_000, 0)).is_err());
//! ```
//!
//! [`LedgerEntry`]: ocean_types::LedgerEntry

pub mod audit;
pub mod entry;
pub mod ledger;

pub use audit::{AuditResult, LedgerAnomaly, audit_user};
pub use entry::EntryBuilder;
pub use ledger::{Ledger, ensure_sufficient, fold_balance};

use rust_decimal::Decimal;

use ocean_types::{LedgerReason, UserId};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when recording or checking ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// A ledger entry must move a balance.
    #[error("ledger entry delta must be non-zero")]
    ZeroDelta,

    /// Deltas are whole base units.
    #[error("ledger entry delta must be a whole number of units, got {delta}")]
    FractionalDelta {
        /// The rejected delta.
        delta: Decimal,
    },

    /// The sign of the delta contradicts its reason.
    #[error("{reason:?} entries cannot carry a delta of {delta}")]
    SignMismatch {
        /// The entry reason.
        reason: LedgerReason,
        /// The rejected delta.
        delta: Decimal,
    },

    /// A required field was not set on the builder.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The folded balance does not cover the requested amount.
    #[error("insufficient balance for user {user_id}: have {balance}, need {requested}")]
    InsufficientBalance {
        /// The user being checked.
        user_id: UserId,
        /// The folded balance.
        balance: Decimal,
        /// The amount that was requested.
        requested: Decimal,
    },

    /// Summing entries overflowed the decimal range.
    #[error("arithmetic overflow while folding ledger entries")]
    Overflow,
}
