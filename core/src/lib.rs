//! Batch fraud risk scoring for subscription payments.
//!
//! Five independent signal evaluators scan one immutable, time-ordered
//! transaction log; the aggregator turns their flags into a score, a
//! risk level and the list of signals that fired.

pub mod aggregator;
pub mod bin_decline_signal;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod geo_mismatch_signal;
pub mod ip_velocity_signal;
pub mod loader;
pub mod rapid_upgrade_signal;
pub mod record_set;
pub mod repeated_failures_signal;
pub mod signal;
pub mod store;
pub mod transaction;
pub mod types;

pub use aggregator::{EnrichedRecord, RiskLevel};
pub use config::ScoringConfig;
pub use engine::{EnrichedSet, ScoringEngine, ScoringSummary};
pub use error::{ScoreError, ScoreResult};
pub use record_set::RecordSet;
pub use signal::Signal;
pub use transaction::{SubscriptionTier, TransactionRecord, TxnStatus};
