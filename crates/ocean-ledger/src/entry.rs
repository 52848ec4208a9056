//! Entry builder and validation for the ledger.
//!
//! Provides an [`EntryBuilder`] that enforces the entry contract: every
//! entry moves a whole, non-zero number of units, and its sign agrees with
//! its reason (deposits credit, withdrawals debit, adjustments go either
//! way).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use ocean_types::{LedgerEntry, LedgerEntryId, LedgerReason, PaymentId, UserId};

use crate::LedgerError;

// ---------------------------------------------------------------------------
// Entry builder
// ---------------------------------------------------------------------------

/// Builder for constructing validated [`LedgerEntry`] values.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use ocean_ledger::EntryBuilder;
/// use ocean_types::{LedgerReason, PaymentId, UserId};
/// use rust_decimal::Decimal;
///
/// let entry = EntryBuilder::new(UserId::new(), LedgerReason::Withdrawal)
///     .delta(Decimal::new(-2_500, 0))
///     .ref_id(PaymentId::new())
///     .at(Utc::now())
///     .build();
///
/// assert!(entry.is_ok());
/// ```
#[derive(Debug)]
pub struct EntryBuilder {
    user_id: UserId,
    reason: LedgerReason,
    delta: Option<Decimal>,
    ref_id: Option<PaymentId>,
    created_at: Option<DateTime<Utc>>,
}

impl EntryBuilder {
    /// Start building an entry for `user_id` with the given reason.
    pub const fn new(user_id: UserId, reason: LedgerReason) -> Self {
        Self {
            user_id,
            reason,
            delta: None,
            ref_id: None,
            created_at: None,
        }
    }

    /// Set the signed balance movement.
    #[must_use]
    pub const fn delta(mut self, delta: Decimal) -> Self {
        self.delta = Some(delta);
        self
    }

    /// Link the entry to the payment it settles.
    #[must_use]
    pub const fn ref_id(mut self, id: PaymentId) -> Self {
        self.ref_id = Some(id);
        self
    }

    /// Set the append timestamp.
    #[must_use]
    pub const fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Validate inputs and produce a [`LedgerEntry`].
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::MissingField`] if the delta or timestamp is
    /// not set, [`LedgerError::ZeroDelta`] or
    /// [`LedgerError::FractionalDelta`] for malformed amounts, and
    /// [`LedgerError::SignMismatch`] when the sign contradicts the reason.
    pub fn build(self) -> Result<LedgerEntry, LedgerError> {
        let delta = self.delta.ok_or(LedgerError::MissingField("delta"))?;
        let created_at = self.created_at.ok_or(LedgerError::MissingField("created_at"))?;

        if delta.is_zero() {
            return Err(LedgerError::ZeroDelta);
        }
        if !delta.fract().is_zero() {
            return Err(LedgerError::FractionalDelta { delta });
        }

        let sign_ok = match self.reason {
            LedgerReason::Deposit => delta.is_sign_positive(),
            LedgerReason::Withdrawal => delta.is_sign_negative(),
            LedgerReason::Adjustment => true,
        };
        if !sign_ok {
            return Err(LedgerError::SignMismatch {
                reason: self.reason,
                delta,
            });
        }

        Ok(LedgerEntry {
            id: LedgerEntryId::new(),
            user_id: self.user_id,
            delta,
            reason: self.reason,
            ref_id: self.ref_id,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposit_must_be_positive() {
        let result = EntryBuilder::new(UserId::new(), LedgerReason::Deposit)
            .delta(Decimal::new(-10, 0))
            .at(Utc::now())
            .build();
        assert!(matches!(result, Err(LedgerError::SignMismatch { .. })));
    }

    #[test]
    fn withdrawal_must_be_negative() {
        let result = EntryBuilder::new(UserId::new(), LedgerReason::Withdrawal)
            .delta(Decimal::new(10, 0))
            .at(Utc::now())
            .build();
        assert!(matches!(result, Err(LedgerError::SignMismatch { .. })));
    }

    #[test]
    fn adjustment_accepts_either_sign() {
        let user = UserId::new();
        for delta in [Decimal::new(7, 0), Decimal::new(-7, 0)] {
            let result = EntryBuilder::new(user, LedgerReason::Adjustment)
                .delta(delta)
                .at(Utc::now())
                .build();
            assert!(result.is_ok());
        }
    }

    #[test]
    fn zero_and_fractional_deltas_rejected() {
        let user = UserId::new();
        let zero = EntryBuilder::new(user, LedgerReason::Deposit)
            .delta(Decimal::ZERO)
            .at(Utc::now())
            .build();
        assert_eq!(zero, Err(LedgerError::ZeroDelta));

        let fractional = EntryBuilder::new(user, LedgerReason::Deposit)
            .delta(Decimal::new(15, 1))
            .at(Utc::now())
            .build();
        assert!(matches!(
            fractional,
            Err(LedgerError::FractionalDelta { .. })
        ));
    }

    #[test]
    fn missing_fields_rejected() {
        let no_delta = EntryBuilder::new(UserId::new(), LedgerReason::Deposit)
            .at(Utc::now())
            .build();
        assert_eq!(no_delta, Err(LedgerError::MissingField("delta")));

        let no_time = EntryBuilder::new(UserId::new(), LedgerReason::Deposit)
            .delta(Decimal::ONE)
            .build();
        assert_eq!(no_time, Err(LedgerError::MissingField("created_at")));
    }
}
