//! Signal trait and canonical signal catalogue.
//!
//! RULE: Every evaluator implements SignalEvaluator.
//! Evaluators are pure: they read one RecordSet and return a fresh
//! FlagVector aligned 1:1 with it by position. They never see each
//! other's output.

use crate::{config::SignalWeights, error::ScoreResult, record_set::RecordSet};
use serde::{Deserialize, Serialize};

/// One boolean per record, indexed by canonical position.
pub type FlagVector = Vec<bool>;

/// The five fraud signals, in fixed evaluation order.
/// NEVER reorder: `signals_triggered` output depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    IpVelocity,
    RapidTierUpgrade,
    BinDeclineRate,
    GeoMismatch,
    RepeatedFailures,
}

impl Signal {
    pub const ALL: [Signal; 5] = [
        Signal::IpVelocity,
        Signal::RapidTierUpgrade,
        Signal::BinDeclineRate,
        Signal::GeoMismatch,
        Signal::RepeatedFailures,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::IpVelocity       => "ip_velocity",
            Self::RapidTierUpgrade => "rapid_tier_upgrade",
            Self::BinDeclineRate   => "bin_decline_rate",
            Self::GeoMismatch      => "geo_mismatch",
            Self::RepeatedFailures => "repeated_failures",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.name() == name)
    }

    pub fn weight(&self, weights: &SignalWeights) -> u32 {
        match self {
            Self::IpVelocity       => weights.ip_velocity,
            Self::RapidTierUpgrade => weights.rapid_tier_upgrade,
            Self::BinDeclineRate   => weights.bin_decline_rate,
            Self::GeoMismatch      => weights.geo_mismatch,
            Self::RepeatedFailures => weights.repeated_failures,
        }
    }
}

/// The contract every signal evaluator must fulfill.
pub trait SignalEvaluator: Send + Sync {
    fn signal(&self) -> Signal;

    /// Evaluate the whole record set. The result must have exactly
    /// `records.len()` entries; the engine rejects anything else.
    fn evaluate(&self, records: &RecordSet) -> ScoreResult<FlagVector>;
}
