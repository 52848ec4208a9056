//! Periodic loops driven by the worker binary.
//!
//! - The settlement loop runs one [`SettlementWorker`] cycle every
//!   `settlement.poll_interval_secs`.
//! - The economy loop rolls the ocean over once its cycle has ended and
//!   sweeps starved creatures, every `schedule.economy_interval_secs`.
//!
//! A failed pass is logged and the loop carries on with the next tick.
//! Both loops exit when the shutdown channel flips.

use core::time::Duration;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use ocean_core::{FishError, OceanService};
use ocean_settlement::SettlementWorker;
use ocean_types::{BPS_DENOMINATOR, Clock, OceanState};

/// Result of one economy pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EconomyReport {
    /// The new cycle, if the ocean rolled over.
    pub rolled_over: Option<OceanState>,
    /// Creatures killed by the starvation sweep.
    pub starved: usize,
}

/// Uniform draw in `[0, 10_000)` for the daily mode roll.
pub fn draw_bps() -> u32 {
    rand::rng().random_range(0..BPS_DENOMINATOR)
}

/// Run one economy pass with the given mode draw.
pub async fn economy_tick(
    ocean: &OceanService,
    random_bps: u32,
) -> Result<EconomyReport, FishError> {
    let rolled_over = ocean.rollover_if_due(random_bps).await?;
    let starved = ocean.sweep_starved().await?.len();
    Ok(EconomyReport {
        rolled_over,
        starved,
    })
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Run settlement cycles until shutdown.
pub async fn run_settlement_loop(
    worker: SettlementWorker,
    clock: Arc<dyn Clock>,
    mut shutdown: watch::Receiver<bool>,
) {
    let period = worker.config().poll_interval();
    info!(interval_secs = period.as_secs(), "Settlement loop started");
    let mut interval = ticker(period);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = worker.run_worker_cycle(clock.now()).await {
                    warn!(error = %e, "settlement cycle failed");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    info!("Settlement loop stopped");
}

/// Run economy passes until shutdown.
pub async fn run_economy_loop(
    ocean: OceanService,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(interval_secs = period.as_secs(), "Economy loop started");
    let mut interval = ticker(period);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                match economy_tick(&ocean, draw_bps()).await {
                    Ok(report) => {
                        if let Some(next) = &report.rolled_over {
                            info!(
                                mode = next.mode.as_str(),
                                next_mode_change_time = %next.next_mode_change_time,
                                "new ocean cycle"
                            );
                        }
                        if report.starved > 0 {
                            info!(starved = report.starved, "starvation sweep complete");
                        }
                    }
                    Err(e) => warn!(error = %e, "economy pass failed"),
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    info!("Economy loop stopped");
}
