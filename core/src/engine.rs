//! The scoring engine: fan-out over the evaluators, fan-in to the
//! aggregator.
//!
//! EVALUATION ORDER (fixed, documented, never reordered):
//!   1. IP Velocity
//!   2. Rapid Tier Upgrade
//!   3. BIN Decline Rate
//!   4. Geo Mismatch
//!   5. Repeated Failures
//!
//! RULES:
//!   - Every evaluator reads the same immutable RecordSet.
//!   - No evaluator sees another evaluator's flags.
//!   - All five flag vectors are collected before aggregation starts.
//!   - A run either returns a fully enriched set or an error. Never partial.

use crate::{
    aggregator::{EnrichedRecord, RiskLevel, ScoreAggregator, SignalFlags},
    bin_decline_signal::BinDeclineSignal,
    config::ScoringConfig,
    error::{ScoreError, ScoreResult},
    geo_mismatch_signal::GeoMismatchSignal,
    ip_velocity_signal::IpVelocitySignal,
    rapid_upgrade_signal::RapidUpgradeSignal,
    record_set::RecordSet,
    repeated_failures_signal::RepeatedFailuresSignal,
    signal::{FlagVector, Signal, SignalEvaluator},
    types::RunId,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

pub struct ScoringEngine {
    evaluators: Vec<Box<dyn SignalEvaluator>>,
    aggregator: ScoreAggregator,
    parallel:   bool,
}

impl ScoringEngine {
    /// Build a fully wired engine with all five evaluators registered.
    pub fn new(config: &ScoringConfig) -> Self {
        let evaluators: Vec<Box<dyn SignalEvaluator>> = vec![
            Box::new(IpVelocitySignal::new(&config.ip_velocity)),
            Box::new(RapidUpgradeSignal::new(&config.rapid_upgrade)),
            Box::new(BinDeclineSignal::new(&config.bin_decline)),
            Box::new(GeoMismatchSignal::new(&config.geo_mismatch)),
            Box::new(RepeatedFailuresSignal::new(&config.repeated_failures)),
        ];
        Self {
            evaluators,
            aggregator: ScoreAggregator::new(config),
            parallel:   config.parallel,
        }
    }

    /// Score a whole record set in one batch pass.
    pub fn score(&self, records: &RecordSet) -> ScoreResult<EnrichedSet> {
        let run_id: RunId = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();
        log::info!(
            "run={run_id} scoring {} records ({})",
            records.len(),
            if self.parallel { "parallel" } else { "sequential" }
        );

        let results = if self.parallel {
            self.evaluate_parallel(records)
        } else {
            self.evaluate_sequential(records)
        };

        let mut flags = SignalFlags::default();
        for (signal, result) in results {
            let vector = result?;
            if vector.len() != records.len() {
                return Err(ScoreError::FlagLengthMismatch {
                    signal:   signal.name(),
                    expected: records.len(),
                    actual:   vector.len(),
                });
            }
            flags.insert(signal, vector);
            log::debug!(
                "run={run_id} signal={} flagged={}",
                signal.name(),
                flags.count(signal)
            );
        }

        let enriched = self.aggregator.aggregate(records, &flags)?;
        let set = EnrichedSet::new(run_id, enriched);

        let summary = set.summary();
        log::info!(
            "run={} scored {} records in {}ms: flagged={} low={} medium={} high={} critical={}",
            set.run_id(),
            summary.total,
            started.elapsed().as_millis(),
            summary.flagged,
            summary.count_for(RiskLevel::Low),
            summary.count_for(RiskLevel::Medium),
            summary.count_for(RiskLevel::High),
            summary.count_for(RiskLevel::Critical),
        );
        Ok(set)
    }

    fn evaluate_sequential(&self, records: &RecordSet) -> Vec<(Signal, ScoreResult<FlagVector>)> {
        self.evaluators
            .iter()
            .map(|e| (e.signal(), e.evaluate(records)))
            .collect()
    }

    /// One scoped worker per evaluator, joined in registration order.
    fn evaluate_parallel(&self, records: &RecordSet) -> Vec<(Signal, ScoreResult<FlagVector>)> {
        std::thread::scope(|scope| {
            let handles: Vec<_> = self
                .evaluators
                .iter()
                .map(|e| (e.signal(), scope.spawn(move || e.evaluate(records))))
                .collect();

            handles
                .into_iter()
                .map(|(signal, handle)| {
                    let result = handle
                        .join()
                        .unwrap_or_else(|_| Err(ScoreError::EvaluatorFailed { signal: signal.name() }));
                    (signal, result)
                })
                .collect()
        })
    }
}

/// The output of one run: enriched records in canonical order.
#[derive(Debug, Clone)]
pub struct EnrichedSet {
    run_id:    RunId,
    records:   Vec<EnrichedRecord>,
    positions: HashMap<String, usize>,
}

impl EnrichedSet {
    fn new(run_id: RunId, records: Vec<EnrichedRecord>) -> Self {
        let positions = records
            .iter()
            .enumerate()
            .map(|(pos, r)| (r.record.id.clone(), pos))
            .collect();
        Self { run_id, records, positions }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn records(&self) -> &[EnrichedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&EnrichedRecord> {
        self.positions.get(id).map(|&pos| &self.records[pos])
    }

    pub fn with_level(&self, level: RiskLevel) -> impl Iterator<Item = &EnrichedRecord> {
        self.records.iter().filter(move |r| r.risk_level == level)
    }

    pub fn summary(&self) -> ScoringSummary {
        let mut by_level: BTreeMap<RiskLevel, usize> =
            RiskLevel::ALL.iter().map(|l| (*l, 0)).collect();
        let mut by_signal: BTreeMap<Signal, usize> =
            Signal::ALL.iter().map(|s| (*s, 0)).collect();
        let mut flagged = 0;

        for r in &self.records {
            *by_level.entry(r.risk_level).or_insert(0) += 1;
            for s in &r.signals_triggered {
                *by_signal.entry(*s).or_insert(0) += 1;
            }
            if r.risk_score > 0 {
                flagged += 1;
            }
        }

        ScoringSummary { total: self.records.len(), flagged, by_level, by_signal }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringSummary {
    pub total:     usize,
    /// Records with a non-zero score.
    pub flagged:   usize,
    pub by_level:  BTreeMap<RiskLevel, usize>,
    pub by_signal: BTreeMap<Signal, usize>,
}

impl ScoringSummary {
    pub fn count_for(&self, level: RiskLevel) -> usize {
        self.by_level.get(&level).copied().unwrap_or(0)
    }

    pub fn signal_count(&self, signal: Signal) -> usize {
        self.by_signal.get(&signal).copied().unwrap_or(0)
    }
}
