//! Ocean worker binary.
//!
//! Loads `ocean-config.yaml` (or the path in `OCEAN_CONFIG`), wires the
//! stores and seams the configuration selects, then runs:
//!
//! - the settlement loop (reconciliation and withdrawal dispatch),
//! - the economy loop (daily rollover and starvation sweep),
//! - the NATS inbound-transfer subscription, when NATS is enabled,
//! - the operator API server.
//!
//! Ctrl-C stops the server and signals every loop to finish its current
//! pass and exit.

mod config;
mod error;
mod nats;
mod schedule;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{RwLock, watch};
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ocean_core::{GameStore, InMemoryGameStore, OceanService};
use ocean_db::{DragonflyDispatchLock, DragonflyPool, PgGameStore, PgSettlementStore, PostgresPool};
use ocean_events::EventLog;
use ocean_operator::{AppState, ServerConfig};
use ocean_settlement::{
    AlertStore, DispatchLock, InMemoryDispatchLock, InMemorySettlementStore, LogNotifier,
    Notifier, PaymentService, RailMode, SettlementStore, SettlementWorker, SimulatedRail,
    TransferRail,
};
use ocean_types::{Clock, SystemClock};

use crate::config::{LockBackend, LoggingConfig, OceanConfig, StorageBackend};
use crate::error::WorkerError;
use crate::nats::{NatsNotifier, NatsRail};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = std::env::var("OCEAN_CONFIG")
        .map_or_else(|_| PathBuf::from("ocean-config.yaml"), PathBuf::from);
    let config = OceanConfig::load(&config_path)?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!(
        config_path = %config_path.display(),
        storage = ?config.storage.backend,
        dispatch_lock = ?config.storage.dispatch_lock,
        rail = ?config.rail.mode,
        "ocean-worker starting"
    );

    // 3. Build the game and settlement stores.
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let stores = build_stores(&config, clock.as_ref()).await?;

    // 4. Choose the dispatch lock.
    let lock: Arc<dyn DispatchLock> = match config.storage.dispatch_lock {
        LockBackend::Memory => Arc::new(InMemoryDispatchLock::new()),
        LockBackend::Dragonfly => {
            let pool = DragonflyPool::connect(&config.infrastructure.dragonfly_url).await?;
            info!("Dragonfly dispatch lock connected");
            Arc::new(DragonflyDispatchLock::new(pool))
        }
    };

    // 5. Connect to NATS when the rail or the inbound feed needs it.
    let nats_client = if config.infrastructure.nats_enabled || config.rail.mode == RailMode::Nats {
        let client = nats::connect(&config.infrastructure.nats_url).await?;
        info!(nats_url = %config.infrastructure.nats_url, "NATS connected");
        Some(client)
    } else {
        None
    };

    let rail: Arc<dyn TransferRail> = match &nats_client {
        Some(client) if config.rail.mode == RailMode::Nats => Arc::new(NatsRail::new(
            client.clone(),
            config.rail.nats_subject.clone(),
            config.rail.request_timeout(),
        )),
        _ => Arc::new(SimulatedRail::from_config(&config.rail)),
    };
    let notifier: Arc<dyn Notifier> = match &nats_client {
        Some(client) if config.infrastructure.nats_enabled => Arc::new(NatsNotifier::new(
            client.clone(),
            config.infrastructure.notification_prefix.clone(),
        )),
        _ => Arc::new(LogNotifier),
    };

    // 6. Assemble the services.
    let events = Arc::new(EventLog::default());
    let ocean = OceanService::new(
        stores.game,
        Arc::clone(&clock),
        Arc::clone(&events),
        config.economy.clone(),
        config.ocean.clone(),
    );
    let payments = PaymentService::new(stores.settlement, Arc::clone(&clock), Arc::clone(&events));
    let worker = SettlementWorker::new(
        payments,
        rail,
        lock,
        notifier,
        Arc::new(RwLock::new(AlertStore::new())),
        config.settlement.clone(),
    );

    // 7. Spawn the background loops.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = JoinSet::new();
    tasks.spawn(schedule::run_settlement_loop(
        worker.clone(),
        Arc::clone(&clock),
        shutdown_rx.clone(),
    ));
    tasks.spawn(schedule::run_economy_loop(
        ocean.clone(),
        config.schedule.economy_interval(),
        shutdown_rx.clone(),
    ));
    if let Some(client) = nats_client.filter(|_| config.infrastructure.nats_enabled) {
        let reconciler = worker.reconciler().clone();
        let subject = config.infrastructure.inbound_subject.clone();
        let rx = shutdown_rx.clone();
        tasks.spawn(async move {
            if let Err(e) = nats::run_inbound_subscriber(client, subject, reconciler, rx).await {
                warn!(error = %e, "inbound transfer subscription failed");
            }
        });
    }

    // 8. Serve the operator API until Ctrl-C.
    let server_config = ServerConfig {
        port: config.infrastructure.operator_port,
        ..ServerConfig::default()
    };
    let state = Arc::new(AppState::new(ocean, worker, events, clock));
    let served = ocean_operator::start_server(&server_config, state, shutdown_signal()).await;

    // 9. Stop the loops and release connections.
    if shutdown_tx.send(true).is_err() {
        warn!("no background loop was listening for shutdown");
    }
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "background task ended abnormally");
        }
    }
    if let Some(pg) = stores.postgres {
        pg.close().await;
    }

    served.map_err(WorkerError::from)?;
    info!("ocean-worker shutdown complete");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Resolves on the first Ctrl-C.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "failed to listen for Ctrl-C, running until killed");
            core::future::pending::<()>().await;
        }
    }
}

/// The two storage seams plus the pool to close on shutdown.
struct Stores {
    game: Arc<dyn GameStore>,
    settlement: Arc<dyn SettlementStore>,
    postgres: Option<PostgresPool>,
}

async fn build_stores(config: &OceanConfig, clock: &dyn Clock) -> Result<Stores, WorkerError> {
    let genesis = ocean_core::ocean::initialize(&config.ocean, clock.now());
    match config.storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory storage");
            Ok(Stores {
                game: Arc::new(InMemoryGameStore::new(genesis)),
                settlement: Arc::new(InMemorySettlementStore::new()),
                postgres: None,
            })
        }
        StorageBackend::Postgres => {
            let pg = PostgresPool::connect(
                &config.infrastructure.postgres_url,
                config.storage.postgres.settings(),
            )
            .await?;
            pg.run_migrations().await?;
            let game = PgGameStore::new(pg.pool().clone());
            let ocean = game.initialize(&genesis).await?;
            info!(
                mode = ocean.mode.as_str(),
                total_count = ocean.total_count,
                next_mode_change_time = %ocean.next_mode_change_time,
                "Ocean state loaded from PostgreSQL"
            );
            let settlement = PgSettlementStore::new(pg.pool().clone());
            Ok(Stores {
                game: Arc::new(game),
                settlement: Arc::new(settlement),
                postgres: Some(pg),
            })
        }
    }
}
