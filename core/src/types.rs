//! Shared primitive types used across the scoring engine.

use chrono::NaiveDateTime;

/// Point in time of a transaction. Always interpreted as UTC.
pub type Timestamp = NaiveDateTime;

/// A stable, unique transaction identifier.
pub type RecordId = String;

/// The canonical scoring-run identifier.
pub type RunId = String;

/// Position of a record in the canonical (timestamp, id) order.
pub type Position = usize;
