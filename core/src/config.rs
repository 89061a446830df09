//! Scoring configuration: signal weights, thresholds, windows and
//! risk-level boundaries.
//!
//! `ScoringConfig::default()` carries the production constants.
//! A JSON file may override any subset of them.

use anyhow::{bail, Context};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One year. Longer look-back windows are treated as configuration mistakes.
pub const MAX_WINDOW_HOURS: i64 = 24 * 366;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SignalWeights {
    pub ip_velocity:        u32,
    pub rapid_tier_upgrade: u32,
    pub bin_decline_rate:   u32,
    pub geo_mismatch:       u32,
    pub repeated_failures:  u32,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            ip_velocity:        40,
            rapid_tier_upgrade: 30,
            bin_decline_rate:   25,
            geo_mismatch:       20,
            repeated_failures:  25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IpVelocityConfig {
    pub window_hours: i64,
    /// Flag when distinct card keys in the window exceed this.
    pub max_distinct_cards: usize,
}

impl Default for IpVelocityConfig {
    fn default() -> Self {
        Self { window_hours: 24, max_distinct_cards: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RapidUpgradeConfig {
    pub window_hours: i64,
}

impl Default for RapidUpgradeConfig {
    fn default() -> Self {
        Self { window_hours: 24 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BinDeclineConfig {
    pub min_transactions: usize,
    /// Flag when declines / total is strictly greater than this.
    pub max_decline_rate: f64,
}

impl Default for BinDeclineConfig {
    fn default() -> Self {
        Self { min_transactions: 3, max_decline_rate: 0.40 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeoMismatchConfig {
    /// Exact, case-sensitive string prefixes.
    pub foreign_ip_prefixes: Vec<String>,
}

impl Default for GeoMismatchConfig {
    fn default() -> Self {
        Self {
            foreign_ip_prefixes: ["5.188.", "185.220.", "193.32.", "45.142.", "91.108."]
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RepeatedFailuresConfig {
    /// Minimum consecutive declines before an approval to flag the run.
    pub min_consecutive_declines: usize,
}

impl Default for RepeatedFailuresConfig {
    fn default() -> Self {
        Self { min_consecutive_declines: 3 }
    }
}

/// Inclusive upper bounds of the LOW, MEDIUM and HIGH bands.
/// Anything above `high_max` is CRITICAL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskLevelBounds {
    pub low_max:    u32,
    pub medium_max: u32,
    pub high_max:   u32,
}

impl Default for RiskLevelBounds {
    fn default() -> Self {
        Self { low_max: 20, medium_max: 40, high_max: 65 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights:           SignalWeights,
    pub ip_velocity:       IpVelocityConfig,
    pub rapid_upgrade:     RapidUpgradeConfig,
    pub bin_decline:       BinDeclineConfig,
    pub geo_mismatch:      GeoMismatchConfig,
    pub repeated_failures: RepeatedFailuresConfig,
    pub risk_levels:       RiskLevelBounds,
    /// Run evaluators on scoped worker threads. Output is identical either way.
    pub parallel:          bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights:           SignalWeights::default(),
            ip_velocity:       IpVelocityConfig::default(),
            rapid_upgrade:     RapidUpgradeConfig::default(),
            bin_decline:       BinDeclineConfig::default(),
            geo_mismatch:      GeoMismatchConfig::default(),
            repeated_failures: RepeatedFailuresConfig::default(),
            risk_levels:       RiskLevelBounds::default(),
            parallel:          true,
        }
    }
}

impl ScoringConfig {
    /// Load from a JSON file. Absent keys keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Cannot parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let b = &self.risk_levels;
        if !(b.low_max < b.medium_max && b.medium_max < b.high_max) {
            bail!(
                "risk level bounds must be strictly increasing: {} / {} / {}",
                b.low_max, b.medium_max, b.high_max
            );
        }
        for (name, hours) in [
            ("ip_velocity", self.ip_velocity.window_hours),
            ("rapid_upgrade", self.rapid_upgrade.window_hours),
        ] {
            if hours <= 0 || hours > MAX_WINDOW_HOURS || Duration::try_hours(hours).is_none() {
                bail!("{name} window of {hours}h outside 1..={MAX_WINDOW_HOURS}");
            }
        }
        let w = &self.weights;
        let total = [
            w.ip_velocity,
            w.rapid_tier_upgrade,
            w.bin_decline_rate,
            w.geo_mismatch,
            w.repeated_failures,
        ]
        .iter()
        .try_fold(0u32, |acc, &weight| acc.checked_add(weight));
        if total.is_none() {
            bail!("signal weights overflow when summed");
        }
        let rate = self.bin_decline.max_decline_rate;
        if !(0.0..=1.0).contains(&rate) {
            bail!("bin decline rate threshold {rate} outside [0, 1]");
        }
        Ok(())
    }
}
