//! Shared type definitions for the Ocean economy.
//!
//! This crate is the single source of truth for the entities used across
//! the Ocean workspace. Types defined here flow downstream to `TypeScript`
//! via `ts-rs` for the operator dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all entity identifiers
//! - [`enums`] -- Enumeration types (modes, statuses, reasons, alerts, events)
//! - [`structs`] -- Core entity structs (ocean, fish, ledger, payments)
//! - [`units`] -- Whole-unit currency arithmetic with floor rounding
//! - [`clock`] -- Injectable source of "now"

pub mod clock;
pub mod enums;
pub mod ids;
pub mod structs;
pub mod units;

// Re-export all public types at crate root for convenience.
pub use clock::{Clock, ManualClock, SystemClock};
pub use enums::{
    AlertType, EventKind, FishStatus, LedgerReason, OceanMode, PaymentDirection, PaymentStatus,
    UnknownVariant,
};
pub use ids::{AlertId, EventId, FishId, LedgerEntryId, PaymentId, UserId};
pub use structs::{
    DeadLetter, Event, Fish, InboundTransfer, LedgerEntry, OceanState, Payment,
    WithdrawalQueueItem, WorkerAlert,
};
pub use units::{BPS_DENOMINATOR, apply_bps, div_floor, is_positive_units, is_whole_units, units};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // Files land in `bindings/` relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::FishId::export_all();
        let _ = crate::ids::UserId::export_all();
        let _ = crate::ids::PaymentId::export_all();
        let _ = crate::ids::LedgerEntryId::export_all();
        let _ = crate::ids::EventId::export_all();
        let _ = crate::ids::AlertId::export_all();

        // Enums
        let _ = crate::enums::OceanMode::export_all();
        let _ = crate::enums::FishStatus::export_all();
        let _ = crate::enums::PaymentDirection::export_all();
        let _ = crate::enums::PaymentStatus::export_all();
        let _ = crate::enums::LedgerReason::export_all();
        let _ = crate::enums::AlertType::export_all();
        let _ = crate::enums::EventKind::export_all();

        // Structs
        let _ = crate::structs::OceanState::export_all();
        let _ = crate::structs::Fish::export_all();
        let _ = crate::structs::LedgerEntry::export_all();
        let _ = crate::structs::Payment::export_all();
        let _ = crate::structs::WithdrawalQueueItem::export_all();
        let _ = crate::structs::InboundTransfer::export_all();
        let _ = crate::structs::DeadLetter::export_all();
        let _ = crate::structs::WorkerAlert::export_all();
        let _ = crate::structs::Event::export_all();
    }
}
