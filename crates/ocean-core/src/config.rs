//! Typed configuration for the economy rules and the ocean cycle.
//!
//! These sections are embedded in the deployment file (`ocean-config.yaml`)
//! under `economy:` and `ocean:`. Every field has a default so a partial or
//! empty file still yields a playable economy.

use std::path::Path;

use chrono::TimeDelta;
use serde::Deserialize;

use ocean_types::BPS_DENOMINATOR;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is outside its allowed range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

// ---------------------------------------------------------------------------
// Economy rules
// ---------------------------------------------------------------------------

/// Fees, minimums, and time windows for creature operations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EconomyConfig {
    /// Smallest deposit accepted by create and resurrect.
    #[serde(default = "default_min_deposit_units")]
    pub min_deposit_units: u64,

    /// The creation fee is `deposit / creation_fee_divisor`, rounded down.
    #[serde(default = "default_creation_fee_divisor")]
    pub creation_fee_divisor: u32,

    /// Smallest feed amount accepted.
    #[serde(default = "default_min_feed_units")]
    pub min_feed_units: u64,

    /// Commission withheld from every feed, in basis points.
    #[serde(default = "default_feed_commission_bps")]
    pub feed_commission_bps: u32,

    /// Fraction of the prey's share a successful hunt moves, in basis points.
    #[serde(default = "default_hunt_steal_bps")]
    pub hunt_steal_bps: u32,

    /// How long a hunting mark stays exclusive.
    #[serde(default = "default_mark_window_secs")]
    pub mark_window_secs: u32,

    /// Hunter cooldown and prey protection length after a hunt.
    #[serde(default = "default_hunt_cooldown_secs")]
    pub hunt_cooldown_secs: u32,

    /// Fee charged against the share on exit, in basis points.
    #[serde(default = "default_exit_fee_bps")]
    pub exit_fee_bps: u32,

    /// A creature not fed within this window starves.
    #[serde(default = "default_feeding_deadline_secs")]
    pub feeding_deadline_secs: u32,

    /// Maximum creature name length in characters.
    #[serde(default = "default_max_name_len")]
    pub max_name_len: usize,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            min_deposit_units: default_min_deposit_units(),
            creation_fee_divisor: default_creation_fee_divisor(),
            min_feed_units: default_min_feed_units(),
            feed_commission_bps: default_feed_commission_bps(),
            hunt_steal_bps: default_hunt_steal_bps(),
            mark_window_secs: default_mark_window_secs(),
            hunt_cooldown_secs: default_hunt_cooldown_secs(),
            exit_fee_bps: default_exit_fee_bps(),
            feeding_deadline_secs: default_feeding_deadline_secs(),
            max_name_len: default_max_name_len(),
        }
    }
}

impl EconomyConfig {
    /// Length of a hunting mark.
    pub fn mark_window(&self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.mark_window_secs))
    }

    /// Length of the hunter cooldown and the prey protection window.
    pub fn hunt_cooldown(&self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.hunt_cooldown_secs))
    }

    /// Maximum time between feedings.
    pub fn feeding_deadline(&self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.feeding_deadline_secs))
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.creation_fee_divisor == 0 {
            return Err(ConfigError::Invalid {
                field: "economy.creation_fee_divisor",
                reason: "must be at least 1".to_owned(),
            });
        }
        check_bps("economy.feed_commission_bps", self.feed_commission_bps)?;
        check_bps("economy.hunt_steal_bps", self.hunt_steal_bps)?;
        check_bps("economy.exit_fee_bps", self.exit_fee_bps)?;
        if self.max_name_len == 0 {
            return Err(ConfigError::Invalid {
                field: "economy.max_name_len",
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(())
    }

    /// Load only the economy section from a standalone YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_yml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Ocean cycle
// ---------------------------------------------------------------------------

/// Mode parameters and cycle length for the daily rollover.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PoolConfig {
    /// Feeding percentage in calm mode, in basis points.
    #[serde(default = "default_calm_feeding_bps")]
    pub calm_feeding_bps: u32,

    /// Feeding percentage in storm mode, in basis points.
    #[serde(default = "default_storm_feeding_bps")]
    pub storm_feeding_bps: u32,

    /// Storm probability the ocean starts with, in basis points.
    #[serde(default = "default_initial_storm_probability_bps")]
    pub initial_storm_probability_bps: u32,

    /// Length of one cycle.
    #[serde(default = "default_day_length_secs")]
    pub day_length_secs: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            calm_feeding_bps: default_calm_feeding_bps(),
            storm_feeding_bps: default_storm_feeding_bps(),
            initial_storm_probability_bps: default_initial_storm_probability_bps(),
            day_length_secs: default_day_length_secs(),
        }
    }
}

impl PoolConfig {
    /// Length of one cycle.
    pub fn day_length(&self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.day_length_secs))
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_bps("ocean.calm_feeding_bps", self.calm_feeding_bps)?;
        check_bps("ocean.storm_feeding_bps", self.storm_feeding_bps)?;
        check_bps(
            "ocean.initial_storm_probability_bps",
            self.initial_storm_probability_bps,
        )?;
        if self.day_length_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "ocean.day_length_secs",
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

fn check_bps(field: &'static str, value: u32) -> Result<(), ConfigError> {
    if value > BPS_DENOMINATOR {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("{value} exceeds {BPS_DENOMINATOR} bps"),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_min_deposit_units() -> u64 {
    10_000_000
}

const fn default_creation_fee_divisor() -> u32 {
    10
}

const fn default_min_feed_units() -> u64 {
    1_000_000
}

const fn default_feed_commission_bps() -> u32 {
    1_000
}

const fn default_hunt_steal_bps() -> u32 {
    1_000
}

const fn default_mark_window_secs() -> u32 {
    900
}

const fn default_hunt_cooldown_secs() -> u32 {
    3_600
}

const fn default_exit_fee_bps() -> u32 {
    500
}

const fn default_feeding_deadline_secs() -> u32 {
    86_400
}

const fn default_max_name_len() -> usize {
    32
}

const fn default_calm_feeding_bps() -> u32 {
    1_000
}

const fn default_storm_feeding_bps() -> u32 {
    2_500
}

const fn default_initial_storm_probability_bps() -> u32 {
    2_000
}

const fn default_day_length_secs() -> u32 {
    86_400
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let parsed: Result<EconomyConfig, _> = serde_yml::from_str("{}");
        assert_eq!(parsed.ok(), Some(EconomyConfig::default()));
    }

    #[test]
    fn partial_yaml_overrides_named_fields() {
        let yaml = "hunt_steal_bps: 2000\nmark_window_secs: 60\n";
        let parsed: EconomyConfig =
            serde_yml::from_str(yaml).unwrap_or_else(|e| panic!("parse: {e}"));
        assert_eq!(parsed.hunt_steal_bps, 2_000);
        assert_eq!(parsed.mark_window(), TimeDelta::seconds(60));
        assert_eq!(parsed.min_deposit_units, 10_000_000);
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let config = EconomyConfig {
            creation_fee_divisor: 0,
            ..EconomyConfig::default()
        };
        assert!(config.validate().is_err());

        let pool = PoolConfig {
            storm_feeding_bps: 10_001,
            ..PoolConfig::default()
        };
        assert!(pool.validate().is_err());
        assert!(PoolConfig::default().validate().is_ok());
    }
}
