//! Geo Mismatch signal: row-local, no cross-record state.
//!
//! Flags a record whose IP starts with a known foreign prefix, or
//! whose card-issuer country differs from the billing country.

use crate::{
    config::GeoMismatchConfig,
    error::ScoreResult,
    record_set::RecordSet,
    signal::{FlagVector, Signal, SignalEvaluator},
    transaction::TransactionRecord,
};

pub struct GeoMismatchSignal {
    foreign_ip_prefixes: Vec<String>,
}

impl GeoMismatchSignal {
    pub fn new(config: &GeoMismatchConfig) -> Self {
        Self { foreign_ip_prefixes: config.foreign_ip_prefixes.clone() }
    }

    pub fn is_foreign_ip(&self, ip: &str) -> bool {
        self.foreign_ip_prefixes
            .iter()
            .any(|prefix| ip.starts_with(prefix.as_str()))
    }

    pub fn matches(&self, record: &TransactionRecord) -> bool {
        self.is_foreign_ip(&record.ip_address) || record.bin_country != record.country
    }
}

impl SignalEvaluator for GeoMismatchSignal {
    fn signal(&self) -> Signal {
        Signal::GeoMismatch
    }

    fn evaluate(&self, records: &RecordSet) -> ScoreResult<FlagVector> {
        Ok(records.records().iter().map(|r| self.matches(r)).collect())
    }
}
