//! Payments, inbound reconciliation, and withdrawal settlement.
//!
//! # Architecture
//!
//! - [`payments`] -- [`PaymentService`]: deposit intents, withdrawal
//!   requests, idempotent confirmation, and ledger balance reads.
//! - [`reconcile`] -- [`Reconciler`]: inbound transfer buffer, memo and
//!   amount matching, dead letters.
//! - [`worker`] -- [`SettlementWorker`]: one cycle of reconciliation plus
//!   withdrawal dispatch with backoff.
//! - [`store`] -- The [`SettlementStore`] seam and its in-memory
//!   implementation.
//! - [`rail`], [`lock`], [`notify`] -- Seams for the external rail, the
//!   per-payment dispatch lock, and user notifications.
//! - [`alerts`] -- Operator-facing [`AlertStore`].
//! - [`config`] -- `settlement:` and `rail:` config sections.
//!
//! Settlement failures never reach the user who requested the withdrawal.
//! They surface as queue state, a failed payment, and alerts.

pub mod alerts;
pub mod config;
pub mod error;
pub mod lock;
pub mod notify;
pub mod payments;
pub mod rail;
pub mod reconcile;
pub mod store;
pub mod worker;

pub use alerts::AlertStore;
pub use config::{InvalidConfig, RailConfig, RailMode, SettlementConfig};
pub use error::{LockError, NotifyError, PaymentError, RailError, StoreError, WorkerError};
pub use lock::{DispatchLock, InMemoryDispatchLock, LockToken};
pub use notify::{LogNotifier, Notification, Notifier};
pub use payments::{PaymentService, deposit_key, withdraw_key};
pub use rail::{DispatchReceipt, DispatchRequest, FailureMode, SimulatedRail, TransferRail};
pub use reconcile::{PushOutcome, ReconcileReport, Reconciler};
pub use store::{ConfirmOutcome, ConfirmRequest, InMemorySettlementStore, SettlementStore};
pub use worker::{CycleReport, SettlementWorker, backoff_delay};
