//! Settlement worker and transfer rail configuration.
//!
//! Embedded in the deployment file under `settlement:` and `rail:`.

use core::time::Duration;

use chrono::TimeDelta;
use serde::Deserialize;

use ocean_types::BPS_DENOMINATOR;

/// A configuration value parsed but is outside its allowed range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid config value for {field}: {reason}")]
pub struct InvalidConfig {
    /// Dotted path of the offending field.
    pub field: &'static str,
    /// Why the value was rejected.
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Settlement worker
// ---------------------------------------------------------------------------

/// Polling, confirmation, and retry parameters for the settlement worker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SettlementConfig {
    /// Seconds between worker cycles.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Inbound transfers with fewer confirmations are held.
    #[serde(default = "default_min_confirmations")]
    pub min_confirmations: u32,

    /// Base of the exponential retry backoff.
    #[serde(default = "default_retry_base_secs")]
    pub retry_base_secs: u32,

    /// Attempt count at which a withdrawal is marked failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Lease length of a per-payment dispatch lock.
    #[serde(default = "default_dispatch_lock_ttl_secs")]
    pub dispatch_lock_ttl_secs: u64,

    /// Maximum queue items pulled per cycle.
    #[serde(default = "default_batch_limit")]
    pub batch_limit: u32,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            min_confirmations: default_min_confirmations(),
            retry_base_secs: default_retry_base_secs(),
            max_attempts: default_max_attempts(),
            dispatch_lock_ttl_secs: default_dispatch_lock_ttl_secs(),
            batch_limit: default_batch_limit(),
        }
    }
}

impl SettlementConfig {
    /// Interval between worker cycles.
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Lease length of a dispatch lock.
    pub const fn dispatch_lock_ttl(&self) -> Duration {
        Duration::from_secs(self.dispatch_lock_ttl_secs)
    }

    /// Base retry delay.
    pub fn retry_base(&self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.retry_base_secs))
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if self.poll_interval_secs == 0 {
            return Err(at_least_one("settlement.poll_interval_secs"));
        }
        if self.max_attempts == 0 {
            return Err(at_least_one("settlement.max_attempts"));
        }
        if self.retry_base_secs == 0 {
            return Err(at_least_one("settlement.retry_base_secs"));
        }
        if self.dispatch_lock_ttl_secs == 0 {
            return Err(at_least_one("settlement.dispatch_lock_ttl_secs"));
        }
        if self.batch_limit == 0 {
            return Err(at_least_one("settlement.batch_limit"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Transfer rail
// ---------------------------------------------------------------------------

/// Which rail implementation dispatches withdrawals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RailMode {
    /// In-process rail with optional failure injection.
    #[default]
    Simulated,
    /// Request/reply over NATS to an external rail bridge.
    Nats,
}

/// Transfer rail selection and its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RailConfig {
    /// Which rail to use.
    #[serde(default)]
    pub mode: RailMode,

    /// Simulated rail: chance a dispatch fails, in basis points.
    #[serde(default)]
    pub failure_rate_bps: u32,

    /// Simulated rail: seed for the failure draw.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// NATS rail: request subject.
    #[serde(default = "default_nats_subject")]
    pub nats_subject: String,

    /// NATS rail: how long to wait for a reply.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for RailConfig {
    fn default() -> Self {
        Self {
            mode: RailMode::default(),
            failure_rate_bps: 0,
            seed: default_seed(),
            nats_subject: default_nats_subject(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl RailConfig {
    /// Reply timeout for the NATS rail.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if self.failure_rate_bps > BPS_DENOMINATOR {
            return Err(InvalidConfig {
                field: "rail.failure_rate_bps",
                reason: format!("must be at most {BPS_DENOMINATOR}"),
            });
        }
        if self.mode == RailMode::Nats && self.nats_subject.trim().is_empty() {
            return Err(InvalidConfig {
                field: "rail.nats_subject",
                reason: "must not be empty".to_owned(),
            });
        }
        Ok(())
    }
}

fn at_least_one(field: &'static str) -> InvalidConfig {
    InvalidConfig {
        field,
        reason: "must be at least 1".to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_poll_interval_secs() -> u64 {
    15
}

const fn default_min_confirmations() -> u32 {
    3
}

const fn default_retry_base_secs() -> u32 {
    30
}

const fn default_max_attempts() -> u32 {
    5
}

const fn default_dispatch_lock_ttl_secs() -> u64 {
    60
}

const fn default_batch_limit() -> u32 {
    100
}

const fn default_seed() -> u64 {
    42
}

fn default_nats_subject() -> String {
    "rail.withdrawals.dispatch".to_owned()
}

const fn default_request_timeout_ms() -> u64 {
    5_000
}
