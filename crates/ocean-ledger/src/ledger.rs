//! The user balance ledger: an append-only log of signed movements.
//!
//! [`Ledger`] is the in-memory book. Durable stores keep their own entry
//! tables and reuse [`fold_balance`] and [`ensure_sufficient`] so every
//! backend computes balances the same way.
//!
//! # Design
//!
//! - **Append-only**: [`Ledger::append_entry`] is the only write path.
//! - **Folded balances**: a balance is the signed sum of a user's entries.
//! - **No holds**: a balance check and a later debit are separate calls.
//! - **Precision**: all amounts use [`Decimal`]; no floating point.

use rust_decimal::Decimal;

use ocean_types::{LedgerEntry, PaymentId, UserId};

use crate::LedgerError;

// ---------------------------------------------------------------------------
// Shared fold helpers
// ---------------------------------------------------------------------------

/// Sum the deltas of `entries` belonging to `user_id`.
///
/// # Errors
///
/// Returns [`LedgerError::Overflow`] if the sum leaves the decimal range.
pub fn fold_balance<'a, I>(user_id: UserId, entries: I) -> Result<Decimal, LedgerError>
where
    I: IntoIterator<Item = &'a LedgerEntry>,
{
    entries
        .into_iter()
        .filter(|e| e.user_id == user_id)
        .try_fold(Decimal::ZERO, |acc, e| {
            acc.checked_add(e.delta).ok_or(LedgerError::Overflow)
        })
}

/// Fail unless `balance` covers `requested`.
///
/// # Errors
///
/// Returns [`LedgerError::InsufficientBalance`] when `balance < requested`.
pub fn ensure_sufficient(
    user_id: UserId,
    balance: Decimal,
    requested: Decimal,
) -> Result<(), LedgerError> {
    if balance < requested {
        return Err(LedgerError::InsufficientBalance {
            user_id,
            balance,
            requested,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// The in-memory user balance ledger.
#[derive(Debug, Default, Clone)]
pub struct Ledger {
    /// All entries, in append order.
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// Create a new empty ledger.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Return the number of entries in the ledger.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return whether the ledger has no entries.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in append order.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Entries for one user, in append order.
    pub fn entries_for_user(&self, user_id: UserId) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter().filter(move |e| e.user_id == user_id)
    }

    /// Whether an entry already references `payment_id`.
    pub fn has_entry_for(&self, payment_id: PaymentId) -> bool {
        self.entries.iter().any(|e| e.ref_id == Some(payment_id))
    }

    /// Append a pre-built entry. This is the only write path.
    pub fn append_entry(&mut self, entry: LedgerEntry) {
        tracing::debug!(
            user_id = %entry.user_id,
            delta = %entry.delta,
            reason = entry.reason.as_str(),
            "ledger entry appended"
        );
        self.entries.push(entry);
    }

    /// The user's balance: the signed sum of their entries.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Overflow`] if the fold overflows.
    pub fn balance(&self, user_id: UserId) -> Result<Decimal, LedgerError> {
        fold_balance(user_id, &self.entries)
    }

    /// Fail unless the user's balance covers `amount`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientBalance`] when it does not.
    pub fn ensure_sufficient_balance(
        &self,
        user_id: UserId,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        let balance = self.balance(user_id)?;
        ensure_sufficient(user_id, balance, amount)
    }
}
