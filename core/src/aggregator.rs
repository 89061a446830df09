//! Score aggregation: five flag vectors in, enriched records out.
//!
//! `risk_score` is exactly the sum of the weights of the signals that
//! fired. No caps, no other contributions.

use crate::{
    config::{RiskLevelBounds, ScoringConfig, SignalWeights},
    error::{ScoreError, ScoreResult},
    record_set::RecordSet,
    signal::{FlagVector, Signal},
    transaction::TransactionRecord,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// Total, monotone step function of the score.
    pub fn from_score(score: u32, bounds: &RiskLevelBounds) -> Self {
        if score <= bounds.low_max {
            Self::Low
        } else if score <= bounds.medium_max {
            Self::Medium
        } else if score <= bounds.high_max {
            Self::High
        } else {
            Self::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low      => "LOW",
            Self::Medium   => "MEDIUM",
            Self::High     => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|l| l.as_str() == s)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub record:            TransactionRecord,
    pub risk_score:        u32,
    pub risk_level:        RiskLevel,
    /// Fired signals, in fixed evaluation order.
    pub signals_triggered: Vec<Signal>,
}

impl EnrichedRecord {
    /// `signals_triggered` as the JSON array string used in flat files.
    pub fn signals_json(&self) -> String {
        let names: Vec<&str> = self.signals_triggered.iter().map(|s| s.name()).collect();
        serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn has_signal(&self, signal: Signal) -> bool {
        self.signals_triggered.contains(&signal)
    }
}

/// Flag vectors for one run, one per signal in `Signal::ALL` order.
#[derive(Debug, Clone, Default)]
pub struct SignalFlags {
    flags: Vec<(Signal, FlagVector)>,
}

impl SignalFlags {
    pub fn insert(&mut self, signal: Signal, flags: FlagVector) {
        self.flags.retain(|(s, _)| *s != signal);
        self.flags.push((signal, flags));
        self.flags.sort_by_key(|(s, _)| *s);
    }

    pub fn get(&self, signal: Signal) -> Option<&FlagVector> {
        self.flags.iter().find(|(s, _)| *s == signal).map(|(_, f)| f)
    }

    pub fn count(&self, signal: Signal) -> usize {
        self.get(signal)
            .map(|f| f.iter().filter(|b| **b).count())
            .unwrap_or(0)
    }
}

pub struct ScoreAggregator {
    weights: SignalWeights,
    bounds:  RiskLevelBounds,
}

impl ScoreAggregator {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            weights: config.weights.clone(),
            bounds:  config.risk_levels.clone(),
        }
    }

    pub fn score(&self, fired: &[Signal]) -> u32 {
        fired.iter().map(|s| s.weight(&self.weights)).sum()
    }

    pub fn level(&self, score: u32) -> RiskLevel {
        RiskLevel::from_score(score, &self.bounds)
    }

    /// Build one enriched record per input record. The input set is not
    /// touched; every record is cloned into its enriched counterpart.
    pub fn aggregate(
        &self,
        records: &RecordSet,
        flags: &SignalFlags,
    ) -> ScoreResult<Vec<EnrichedRecord>> {
        let expected = records.len();
        let mut vectors = Vec::with_capacity(Signal::ALL.len());
        for signal in Signal::ALL {
            let v = flags.get(signal).ok_or(ScoreError::FlagLengthMismatch {
                signal: signal.name(),
                expected,
                actual: 0,
            })?;
            if v.len() != expected {
                return Err(ScoreError::FlagLengthMismatch {
                    signal: signal.name(),
                    expected,
                    actual: v.len(),
                });
            }
            vectors.push((signal, v));
        }

        let enriched = records
            .records()
            .iter()
            .enumerate()
            .map(|(pos, record)| {
                let fired: Vec<Signal> = vectors
                    .iter()
                    .filter(|(_, v)| v[pos])
                    .map(|(s, _)| *s)
                    .collect();
                let risk_score = self.score(&fired);
                EnrichedRecord {
                    record:            record.clone(),
                    risk_score,
                    risk_level:        self.level(risk_score),
                    signals_triggered: fired,
                }
            })
            .collect();

        Ok(enriched)
    }
}
