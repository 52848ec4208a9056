//! Integrity audit over a user's stored ledger history.
//!
//! Two properties must hold for every user:
//!
//! ```text
//! running balance after each entry >= 0
//! each (payment, reason) pair appears at most once
//! ```
//!
//! The first is the "confirmed withdrawals never exceed balance" rule; the
//! second is the exactly-once guarantee of payment confirmation. A
//! violation produces a [`LedgerAnomaly`] for operators. The audit never
//! panics; overflow is itself reported as an anomaly.

use std::collections::BTreeSet;

use rust_decimal::Decimal;

use ocean_types::{LedgerEntry, LedgerEntryId, LedgerReason, PaymentId, UserId};

/// Outcome of auditing one user's entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditResult {
    /// History is consistent.
    Clean,
    /// At least one rule was violated.
    Anomaly(LedgerAnomaly),
}

/// A detected ledger integrity violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAnomaly {
    /// The user whose history is inconsistent.
    pub user_id: UserId,
    /// Entry at which the running balance first went negative.
    pub first_negative_entry: Option<LedgerEntryId>,
    /// Payments that were booked more than once.
    pub duplicate_refs: Vec<PaymentId>,
    /// Human-readable description.
    pub message: String,
}

impl core::fmt::Display for LedgerAnomaly {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Audit `entries` (in append order) for `user_id`.
///
/// Entries belonging to other users are ignored.
pub fn audit_user(user_id: UserId, entries: &[LedgerEntry]) -> AuditResult {
    let mut running = Decimal::ZERO;
    let mut first_negative_entry = None;
    let mut seen: BTreeSet<(PaymentId, LedgerReason)> = BTreeSet::new();
    let mut duplicate_refs = Vec::new();

    for entry in entries.iter().filter(|e| e.user_id == user_id) {
        running = match running.checked_add(entry.delta) {
            Some(v) => v,
            None => {
                return AuditResult::Anomaly(LedgerAnomaly {
                    user_id,
                    first_negative_entry,
                    duplicate_refs,
                    message: format!("LEDGER_ANOMALY for user {user_id}: balance overflow"),
                });
            }
        };

        if running.is_sign_negative() && !running.is_zero() && first_negative_entry.is_none() {
            first_negative_entry = Some(entry.id);
        }

        if let Some(ref_id) = entry.ref_id
            && !seen.insert((ref_id, entry.reason))
        {
            duplicate_refs.push(ref_id);
        }
    }

    if first_negative_entry.is_none() && duplicate_refs.is_empty() {
        return AuditResult::Clean;
    }

    let mut problems = Vec::new();
    if first_negative_entry.is_some() {
        problems.push("balance went negative".to_owned());
    }
    if !duplicate_refs.is_empty() {
        problems.push(format!("{} payment(s) booked twice", duplicate_refs.len()));
    }

    tracing::warn!(%user_id, problems = ?problems, "ledger audit found an anomaly");

    AuditResult::Anomaly(LedgerAnomaly {
        user_id,
        first_negative_entry,
        duplicate_refs,
        message: format!("LEDGER_ANOMALY for user {user_id}: {}", problems.join(", ")),
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::EntryBuilder;

    fn entry(user: UserId, reason: LedgerReason, delta: i64, payment: PaymentId) -> LedgerEntry {
        EntryBuilder::new(user, reason)
            .delta(Decimal::new(delta, 0))
            .ref_id(payment)
            .at(Utc::now())
            .build()
            .unwrap_or_else(|e| panic!("valid test entry: {e}"))
    }

    #[test]
    fn consistent_history_is_clean() {
        let user = UserId::new();
        let entries = vec![
            entry(user, LedgerReason::Deposit, 100, PaymentId::new()),
            entry(user, LedgerReason::Withdrawal, -100, PaymentId::new()),
        ];
        assert_eq!(audit_user(user, &entries), AuditResult::Clean);
    }

    #[test]
    fn negative_running_balance_is_flagged() {
        let user = UserId::new();
        let overdraw = entry(user, LedgerReason::Withdrawal, -50, PaymentId::new());
        let overdraw_id = overdraw.id;
        let entries = vec![
            overdraw,
            entry(user, LedgerReason::Deposit, 100, PaymentId::new()),
        ];

        match audit_user(user, &entries) {
            AuditResult::Anomaly(a) => {
                assert_eq!(a.first_negative_entry, Some(overdraw_id));
                assert!(a.duplicate_refs.is_empty());
            }
            AuditResult::Clean => panic!("expected anomaly"),
        }
    }

    #[test]
    fn double_booked_payment_is_flagged() {
        let user = UserId::new();
        let payment = PaymentId::new();
        let entries = vec![
            entry(user, LedgerReason::Deposit, 100, payment),
            entry(user, LedgerReason::Deposit, 100, payment),
        ];

        match audit_user(user, &entries) {
            AuditResult::Anomaly(a) => assert_eq!(a.duplicate_refs, vec![payment]),
            AuditResult::Clean => panic!("expected anomaly"),
        }
    }

    #[test]
    fn other_users_are_ignored() {
        let user = UserId::new();
        let other = UserId::new();
        let entries = vec![entry(other, LedgerReason::Withdrawal, -10, PaymentId::new())];
        assert_eq!(audit_user(user, &entries), AuditResult::Clean);
    }
}
