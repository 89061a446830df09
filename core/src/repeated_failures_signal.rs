//! Repeated Failures signal: a card that is declined again and again
//! and then finally goes through.
//!
//! Per card key, in canonical order, a small state machine tracks the
//! current run of consecutive declines. An approval closes the run:
//! if the run reached `min_consecutive_declines`, the approval and
//! every decline in the run are flagged. Either way the run resets.
//! Chargebacks and unclassified statuses neither extend nor break a run.

use crate::{
    config::RepeatedFailuresConfig,
    error::ScoreResult,
    record_set::RecordSet,
    signal::{FlagVector, Signal, SignalEvaluator},
    types::Position,
};

pub struct RepeatedFailuresSignal {
    min_consecutive_declines: usize,
}

#[derive(Debug, Default)]
enum RunState {
    #[default]
    Idle,
    CountingDeclines(Vec<Position>),
}

impl RepeatedFailuresSignal {
    pub fn new(config: &RepeatedFailuresConfig) -> Self {
        Self { min_consecutive_declines: config.min_consecutive_declines }
    }
}

impl SignalEvaluator for RepeatedFailuresSignal {
    fn signal(&self) -> Signal {
        Signal::RepeatedFailures
    }

    fn evaluate(&self, records: &RecordSet) -> ScoreResult<FlagVector> {
        let mut flags = vec![false; records.len()];

        for group in records.groupings().by_card_key.values() {
            let mut state = RunState::Idle;

            for &pos in group {
                let status = &records.get(pos).status;
                if status.is_decline() {
                    match &mut state {
                        RunState::Idle => state = RunState::CountingDeclines(vec![pos]),
                        RunState::CountingDeclines(run) => run.push(pos),
                    }
                } else if status.is_approved() {
                    if let RunState::CountingDeclines(run) = std::mem::take(&mut state) {
                        if run.len() >= self.min_consecutive_declines {
                            flags[pos] = true;
                            for d in run {
                                flags[d] = true;
                            }
                        }
                    }
                }
            }
        }

        Ok(flags)
    }
}
