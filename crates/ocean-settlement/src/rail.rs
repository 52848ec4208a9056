//! Outbound transfer rail seam.
//!
//! A [`TransferRail`] sends one withdrawal to the external payment rail.
//! Every dispatch carries the queue item's idempotency key; a rail must
//! return the original receipt when it sees a key twice instead of paying
//! out again.
//!
//! [`SimulatedRail`] is the in-process rail used in development and tests.
//! The NATS request/reply rail lives in the worker binary.

use std::collections::HashMap;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use ocean_types::{BPS_DENOMINATOR, PaymentId, UserId};

use crate::config::RailConfig;
use crate::error::RailError;

/// One withdrawal handed to the rail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRequest {
    /// The withdrawal payment.
    pub payment_id: PaymentId,
    /// The user being paid.
    pub user_id: UserId,
    /// Amount in base units.
    pub amount: Decimal,
    /// Dedupe key the rail must honor.
    pub idempotency_key: String,
}

/// The rail accepted a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReceipt {
    /// Rail transaction hash.
    pub tx_hash: String,
}

/// Sends withdrawals to the external rail.
#[async_trait]
pub trait TransferRail: Send + Sync + core::fmt::Debug {
    /// Dispatch one withdrawal.
    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchReceipt, RailError>;
}

// ---------------------------------------------------------------------------
// Simulated rail
// ---------------------------------------------------------------------------

/// When the simulated rail refuses a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Every dispatch succeeds.
    Never,
    /// Every dispatch fails.
    Always,
    /// The next `n` dispatches fail, then all succeed.
    FailNext(u32),
    /// Each dispatch fails with probability `bps / 10_000`, drawn from a
    /// generator seeded with `seed`.
    Rate {
        /// Failure chance in basis points.
        bps: u32,
        /// Seed for the draw.
        seed: u64,
    },
}

#[derive(Debug)]
struct SimulatedState {
    mode: FailureMode,
    rng: StdRng,
    receipts: HashMap<String, DispatchReceipt>,
    dispatched: u64,
}

/// In-process rail with failure injection.
#[derive(Debug)]
pub struct SimulatedRail {
    state: Mutex<SimulatedState>,
}

impl SimulatedRail {
    /// Create a rail with the given failure behavior.
    pub fn new(mode: FailureMode) -> Self {
        let seed = match mode {
            FailureMode::Rate { seed, .. } => seed,
            _ => 0,
        };
        Self {
            state: Mutex::new(SimulatedState {
                mode,
                rng: StdRng::seed_from_u64(seed),
                receipts: HashMap::new(),
                dispatched: 0,
            }),
        }
    }

    /// A rail that never fails.
    pub fn reliable() -> Self {
        Self::new(FailureMode::Never)
    }

    /// Build from the `rail:` config section.
    pub fn from_config(config: &RailConfig) -> Self {
        if config.failure_rate_bps == 0 {
            Self::reliable()
        } else {
            Self::new(FailureMode::Rate {
                bps: config.failure_rate_bps,
                seed: config.seed,
            })
        }
    }

    /// Change the failure behavior from now on.
    pub async fn set_mode(&self, mode: FailureMode) {
        self.state.lock().await.mode = mode;
    }

    /// Number of distinct transfers actually paid out.
    pub async fn dispatched(&self) -> u64 {
        self.state.lock().await.dispatched
    }
}

impl SimulatedState {
    fn should_fail(&mut self) -> bool {
        match self.mode {
            FailureMode::Never => false,
            FailureMode::Always => true,
            FailureMode::FailNext(0) => false,
            FailureMode::FailNext(n) => {
                self.mode = FailureMode::FailNext(n.saturating_sub(1));
                true
            }
            FailureMode::Rate { bps, .. } => self.rng.random_range(0..BPS_DENOMINATOR) < bps,
        }
    }
}

#[async_trait]
impl TransferRail for SimulatedRail {
    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchReceipt, RailError> {
        let mut state = self.state.lock().await;
        if let Some(receipt) = state.receipts.get(&request.idempotency_key) {
            return Ok(receipt.clone());
        }
        if state.should_fail() {
            return Err(RailError::Unavailable("simulated rail failure".to_owned()));
        }
        let receipt = DispatchReceipt {
            tx_hash: format!("sim-{}", uuid::Uuid::now_v7().simple()),
        };
        state.dispatched = state.dispatched.saturating_add(1);
        state
            .receipts
            .insert(request.idempotency_key.clone(), receipt.clone());
        tracing::debug!(
            payment_id = %request.payment_id,
            amount = %request.amount,
            tx_hash = %receipt.tx_hash,
            "simulated rail dispatched withdrawal"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(key: &str) -> DispatchRequest {
        DispatchRequest {
            payment_id: PaymentId::new(),
            user_id: UserId::new(),
            amount: Decimal::new(1_000, 0),
            idempotency_key: key.to_owned(),
        }
    }

    #[tokio::test]
    async fn same_key_returns_original_receipt() {
        let rail = SimulatedRail::reliable();
        let first = rail.dispatch(&request("withdraw:1")).await;
        let second = rail.dispatch(&request("withdraw:1")).await;
        assert!(first.is_ok());
        assert_eq!(first, second);
        assert_eq!(rail.dispatched().await, 1);
    }

    #[tokio::test]
    async fn fail_next_then_recover() {
        let rail = SimulatedRail::new(FailureMode::FailNext(2));
        assert!(rail.dispatch(&request("a")).await.is_err());
        assert!(rail.dispatch(&request("a")).await.is_err());
        assert!(rail.dispatch(&request("a")).await.is_ok());
    }

    #[tokio::test]
    async fn always_fails() {
        let rail = SimulatedRail::new(FailureMode::Always);
        for key in ["a", "b", "c"] {
            assert!(matches!(
                rail.dispatch(&request(key)).await,
                Err(RailError::Unavailable(_))
            ));
        }
        assert_eq!(rail.dispatched().await, 0);
    }

    #[tokio::test]
    async fn seeded_rate_is_reproducible() {
        let mode = FailureMode::Rate {
            bps: 5_000,
            seed: 7,
        };
        let a = SimulatedRail::new(mode);
        let b = SimulatedRail::new(mode);
        for i in 0..20 {
            let key = format!("k{i}");
            assert_eq!(
                a.dispatch(&request(&key)).await.is_ok(),
                b.dispatch(&request(&key)).await.is_ok()
            );
        }
    }
}
