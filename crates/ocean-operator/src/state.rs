//! Shared application state for the operator API.
//!
//! [`AppState`] holds the same service handles the worker loops use, so
//! every route acts on live state rather than a snapshot.

use std::sync::Arc;

use tokio::sync::RwLock;

use ocean_core::OceanService;
use ocean_events::EventLog;
use ocean_settlement::{AlertStore, PaymentService, Reconciler, SettlementWorker};
use ocean_types::Clock;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Creature and ocean operations.
    pub ocean: OceanService,
    /// The settlement worker (payments, reconciler, alerts).
    pub worker: SettlementWorker,
    /// The shared event log.
    pub events: Arc<EventLog>,
    /// Time source for operator-triggered cycles.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Bundle the services.
    pub const fn new(
        ocean: OceanService,
        worker: SettlementWorker,
        events: Arc<EventLog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ocean,
            worker,
            events,
            clock,
        }
    }

    /// Payment operations.
    pub const fn payments(&self) -> &PaymentService {
        self.worker.payments()
    }

    /// Inbound reconciliation.
    pub const fn reconciler(&self) -> &Reconciler {
        self.worker.reconciler()
    }

    /// The alert store shared with the worker.
    pub const fn alerts(&self) -> &Arc<RwLock<AlertStore>> {
        self.worker.alerts()
    }
}
