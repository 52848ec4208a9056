//! Enumeration types for the Ocean economy.
//!
//! Every enum serializes in `snake_case` so the wire names match the
//! vocabulary the outer API layer already speaks (`calm`, `storm`,
//! `alive`, `deposit_unmatched`, ...).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Ocean mode
// ---------------------------------------------------------------------------

/// The economic mode of the ocean for the current daily cycle.
///
/// Each mode carries its own feeding percentage. The mode is redrawn
/// once per cycle by comparing a random draw against the storm
/// probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum OceanMode {
    /// Normal conditions.
    Calm,
    /// Turbulent conditions with a higher feeding percentage.
    Storm,
}

impl OceanMode {
    /// Wire name of the mode.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Calm => "calm",
            Self::Storm => "storm",
        }
    }
}

impl core::str::FromStr for OceanMode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "calm" => Ok(Self::Calm),
            "storm" => Ok(Self::Storm),
            other => Err(UnknownVariant::new("OceanMode", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Fish status
// ---------------------------------------------------------------------------

/// Lifecycle status of a creature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum FishStatus {
    /// Swimming; all lifecycle operations are available.
    Alive,
    /// Missed its feeding deadline. Only resurrection is possible.
    Dead,
    /// Liquidated by its owner. Only resurrection is possible.
    Exited,
}

impl FishStatus {
    /// Wire name of the status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alive => "alive",
            Self::Dead => "dead",
            Self::Exited => "exited",
        }
    }
}

impl core::fmt::Display for FishStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for FishStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alive" => Ok(Self::Alive),
            "dead" => Ok(Self::Dead),
            "exited" => Ok(Self::Exited),
            other => Err(UnknownVariant::new("FishStatus", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

/// Direction of a payment relative to the user's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum PaymentDirection {
    /// Funds arriving from the external rail.
    Deposit,
    /// Funds leaving through the external rail.
    Withdraw,
}

impl PaymentDirection {
    /// Wire name of the direction.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
        }
    }
}

impl core::str::FromStr for PaymentDirection {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Self::Deposit),
            "withdraw" => Ok(Self::Withdraw),
            other => Err(UnknownVariant::new("PaymentDirection", other)),
        }
    }
}

/// Settlement status of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum PaymentStatus {
    /// Awaiting a matching transfer (deposit) or a successful dispatch (withdrawal).
    Pending,
    /// Settled; exactly one ledger entry exists for it.
    Confirmed,
    /// Withdrawal gave up after exhausting its retries.
    Failed,
}

impl PaymentStatus {
    /// Wire name of the status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }
}

impl core::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for PaymentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "failed" => Ok(Self::Failed),
            other => Err(UnknownVariant::new("PaymentStatus", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger reasons
// ---------------------------------------------------------------------------

/// Why a ledger entry moved a user's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum LedgerReason {
    /// A confirmed deposit (positive delta).
    Deposit,
    /// A confirmed withdrawal (negative delta).
    Withdrawal,
    /// A manual operator correction (either sign).
    Adjustment,
}

impl LedgerReason {
    /// Wire name of the reason.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Adjustment => "adjustment",
        }
    }
}

impl core::str::FromStr for LedgerReason {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Self::Deposit),
            "withdrawal" => Ok(Self::Withdrawal),
            "adjustment" => Ok(Self::Adjustment),
            other => Err(UnknownVariant::new("LedgerReason", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

/// Category of an operator-facing settlement alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum AlertType {
    /// An inbound transfer matched no pending deposit intent.
    DepositUnmatched,
    /// A withdrawal dispatch failed and was rescheduled.
    WithdrawalRetry,
    /// A withdrawal exhausted its retries and was marked failed.
    WithdrawalFailed,
}

impl AlertType {
    /// Wire name of the alert type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DepositUnmatched => "deposit_unmatched",
            Self::WithdrawalRetry => "withdrawal_retry",
            Self::WithdrawalFailed => "withdrawal_failed",
        }
    }
}

impl core::str::FromStr for AlertType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit_unmatched" => Ok(Self::DepositUnmatched),
            "withdrawal_retry" => Ok(Self::WithdrawalRetry),
            "withdrawal_failed" => Ok(Self::WithdrawalFailed),
            other => Err(UnknownVariant::new("AlertType", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

/// The transition an [`Event`](crate::structs::Event) narrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EventKind {
    /// A new creature entered the ocean.
    FishCreated,
    /// A creature was fed.
    FishFed,
    /// A hunter placed an exclusive mark on a prey.
    MarkPlaced,
    /// A hunter took a share from its prey.
    FishHunted,
    /// Ownership of a creature moved to another user.
    FishTransferred,
    /// A creature was liquidated by its owner.
    FishExited,
    /// A dead or exited creature returned to life.
    FishResurrected,
    /// A creature missed its feeding deadline and died.
    FishStarved,
    /// The daily cycle rolled over and the mode was redrawn.
    OceanRollover,
    /// A user announced an incoming deposit.
    DepositIntentCreated,
    /// A user requested a withdrawal.
    WithdrawalRequested,
    /// A payment was confirmed and booked on the ledger.
    PaymentConfirmed,
    /// A withdrawal dispatch failed and was rescheduled.
    WithdrawalRetried,
    /// A withdrawal was abandoned after its final retry.
    WithdrawalFailed,
    /// An inbound transfer could not be matched.
    DepositUnmatched,
}

// ---------------------------------------------------------------------------
// Parse error
// ---------------------------------------------------------------------------

/// Returned when a stored or wire string names no known enum variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    /// The enum that was being parsed.
    pub type_name: &'static str,
    /// The rejected input.
    pub value: String,
}

impl UnknownVariant {
    fn new(type_name: &'static str, value: &str) -> Self {
        Self {
            type_name,
            value: value.to_owned(),
        }
    }
}

impl core::fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown {} variant: {}", self.type_name, self.value)
    }
}

impl std::error::Error for UnknownVariant {}
