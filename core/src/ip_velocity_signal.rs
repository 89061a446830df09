//! IP Velocity signal: card testing from a single network origin.
//!
//! A record is flagged when its IP address was used with more than
//! `max_distinct_cards` distinct card keys inside the causal window
//! `[ts - window, ts]`. Records later than `ts` never contribute;
//! records at exactly `ts` always do.
//!
//! Execution: one pass per IP group with a two-pointer window and a
//! card-key frequency multiset, so each record enters and leaves the
//! window once.

use crate::{
    config::IpVelocityConfig,
    error::ScoreResult,
    record_set::RecordSet,
    signal::{FlagVector, Signal, SignalEvaluator},
    transaction::CardKey,
};
use chrono::Duration;
use std::collections::HashMap;

pub struct IpVelocitySignal {
    window:             Duration,
    max_distinct_cards: usize,
}

impl IpVelocitySignal {
    pub fn new(config: &IpVelocityConfig) -> Self {
        Self {
            window:             Duration::hours(config.window_hours),
            max_distinct_cards: config.max_distinct_cards,
        }
    }
}

impl SignalEvaluator for IpVelocitySignal {
    fn signal(&self) -> Signal {
        Signal::IpVelocity
    }

    fn evaluate(&self, records: &RecordSet) -> ScoreResult<FlagVector> {
        let mut flags = vec![false; records.len()];

        for group in records.groupings().by_ip.values() {
            let mut cards: HashMap<CardKey, usize> = HashMap::new();
            let (mut left, mut right, mut i) = (0usize, 0usize, 0usize);

            while i < group.len() {
                let ts = records.get(group[i]).timestamp;

                // Admit everything at or before ts, ties included.
                while right < group.len() && records.get(group[right]).timestamp <= ts {
                    *cards.entry(records.get(group[right]).card_key()).or_insert(0) += 1;
                    right += 1;
                }

                // Evict everything older than the window start.
                let window_start = ts - self.window;
                while left < right && records.get(group[left]).timestamp < window_start {
                    let key = records.get(group[left]).card_key();
                    if let Some(count) = cards.get_mut(&key) {
                        *count -= 1;
                        if *count == 0 {
                            cards.remove(&key);
                        }
                    }
                    left += 1;
                }

                // group[i..right] all share timestamp ts.
                let flagged = cards.len() > self.max_distinct_cards;
                for &pos in &group[i..right] {
                    flags[pos] = flagged;
                }
                i = right;
            }
        }

        Ok(flags)
    }
}
