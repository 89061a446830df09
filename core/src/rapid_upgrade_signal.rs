//! Rapid Tier Upgrade signal: monthly charge followed by an annual one.
//!
//! For every annual record A, every monthly record M of the same
//! customer email with `M.ts ∈ [A.ts - window, A.ts)` is a match.
//! A and all of its matches are flagged. This is a set-membership
//! join: one monthly record may be matched by several annuals.

use crate::{
    config::RapidUpgradeConfig,
    error::ScoreResult,
    record_set::RecordSet,
    signal::{FlagVector, Signal, SignalEvaluator},
    transaction::SubscriptionTier,
    types::{Position, Timestamp},
};
use chrono::Duration;

pub struct RapidUpgradeSignal {
    window: Duration,
}

impl RapidUpgradeSignal {
    pub fn new(config: &RapidUpgradeConfig) -> Self {
        Self { window: Duration::hours(config.window_hours) }
    }
}

impl SignalEvaluator for RapidUpgradeSignal {
    fn signal(&self) -> Signal {
        Signal::RapidTierUpgrade
    }

    fn evaluate(&self, records: &RecordSet) -> ScoreResult<FlagVector> {
        let mut flags = vec![false; records.len()];

        for group in records.groupings().by_email.values() {
            let monthly: Vec<(Timestamp, Position)> = group
                .iter()
                .map(|&pos| (records.get(pos), pos))
                .filter(|(r, _)| r.subscription_tier == SubscriptionTier::Monthly)
                .map(|(r, pos)| (r.timestamp, pos))
                .collect();
            if monthly.is_empty() {
                continue;
            }

            for &pos in group {
                let annual = records.get(pos);
                if annual.subscription_tier != SubscriptionTier::Annual {
                    continue;
                }
                let window_start = annual.timestamp - self.window;
                let lo = monthly.partition_point(|(ts, _)| *ts < window_start);
                let hi = monthly.partition_point(|(ts, _)| *ts < annual.timestamp);
                if lo < hi {
                    flags[pos] = true;
                    for &(_, m) in &monthly[lo..hi] {
                        flags[m] = true;
                    }
                }
            }
        }

        Ok(flags)
    }
}
