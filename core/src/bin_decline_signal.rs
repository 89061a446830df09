//! BIN Decline Rate signal: issuer ranges with a high decline share.
//!
//! Statistics are taken over the ENTIRE record set, future records
//! included. This is a retrospective batch statistic: a decline that
//! arrives later can flag an earlier approval on the same BIN.
//! Do not restrict it to a causal window; that changes which records
//! are flagged.

use crate::{
    config::BinDeclineConfig,
    error::ScoreResult,
    record_set::RecordSet,
    signal::{FlagVector, Signal, SignalEvaluator},
};

pub struct BinDeclineSignal {
    min_transactions: usize,
    max_decline_rate: f64,
}

/// Per-BIN totals over the whole record set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinDeclineStats {
    pub total:    usize,
    pub declines: usize,
}

impl BinDeclineStats {
    pub fn decline_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.declines as f64 / self.total as f64
        }
    }
}

impl BinDeclineSignal {
    pub fn new(config: &BinDeclineConfig) -> Self {
        Self {
            min_transactions: config.min_transactions,
            max_decline_rate: config.max_decline_rate,
        }
    }

    /// Below `min_transactions` a BIN is never bad, whatever its rate.
    pub fn is_bad(&self, stats: &BinDeclineStats) -> bool {
        stats.total >= self.min_transactions && stats.decline_rate() > self.max_decline_rate
    }
}

impl SignalEvaluator for BinDeclineSignal {
    fn signal(&self) -> Signal {
        Signal::BinDeclineRate
    }

    fn evaluate(&self, records: &RecordSet) -> ScoreResult<FlagVector> {
        let mut flags = vec![false; records.len()];

        for group in records.groupings().by_bin.values() {
            let stats = BinDeclineStats {
                total:    group.len(),
                declines: group
                    .iter()
                    .filter(|&&pos| records.get(pos).status.is_decline())
                    .count(),
            };
            if self.is_bad(&stats) {
                for &pos in group {
                    flags[pos] = true;
                }
            }
        }

        Ok(flags)
    }
}
