//! Immutable, canonically ordered snapshot of a transaction log.
//!
//! RULE: Evaluators never see raw input. They receive a RecordSet,
//! whose records are sorted ascending by (timestamp, id), whose ids
//! are unique, and whose groupings are computed exactly once.

use crate::{
    error::{ScoreError, ScoreResult},
    transaction::{CardKey, TransactionRecord},
    types::Position,
};
use std::collections::{BTreeMap, HashMap};

/// Key → positions, each list ascending in canonical order.
pub type Grouping<K> = BTreeMap<K, Vec<Position>>;

#[derive(Debug, Clone, Default)]
pub struct Groupings {
    pub by_ip:       Grouping<String>,
    pub by_email:    Grouping<String>,
    pub by_card_key: Grouping<CardKey>,
    pub by_bin:      Grouping<String>,
}

impl Groupings {
    fn build(records: &[TransactionRecord]) -> Self {
        let mut g = Groupings::default();
        for (pos, r) in records.iter().enumerate() {
            g.by_ip.entry(r.ip_address.clone()).or_default().push(pos);
            g.by_email.entry(r.customer_email.clone()).or_default().push(pos);
            g.by_card_key.entry(r.card_key()).or_default().push(pos);
            g.by_bin.entry(r.card_bin.clone()).or_default().push(pos);
        }
        g
    }
}

#[derive(Debug, Clone)]
pub struct RecordSet {
    records:   Vec<TransactionRecord>,
    positions: HashMap<String, Position>,
    groupings: Groupings,
}

impl RecordSet {
    /// Sort into canonical order, then validate.
    pub fn new(mut records: Vec<TransactionRecord>) -> ScoreResult<Self> {
        records.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.id.cmp(&b.id))
        });
        Self::from_ordered(records)
    }

    /// Accept records the caller already ordered by timestamp.
    /// Fails with `NotSorted` at the first record earlier than its predecessor.
    /// Equal timestamps are reordered by id.
    pub fn from_ordered(mut records: Vec<TransactionRecord>) -> ScoreResult<Self> {
        if let Some(i) = records
            .windows(2)
            .position(|w| w[1].timestamp < w[0].timestamp)
        {
            return Err(ScoreError::NotSorted {
                index: i + 1,
                id:    records[i + 1].id.clone(),
            });
        }
        // Stable sort on an already time-ordered slice only permutes ties.
        records.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut positions = HashMap::with_capacity(records.len());
        for (pos, r) in records.iter().enumerate() {
            if r.id.is_empty() {
                return Err(ScoreError::MissingField { index: pos, field: "transaction_id" });
            }
            if positions.insert(r.id.clone(), pos).is_some() {
                return Err(ScoreError::DuplicateId { index: pos, id: r.id.clone() });
            }
        }

        let groupings = Groupings::build(&records);
        Ok(Self { records, positions, groupings })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn get(&self, pos: Position) -> &TransactionRecord {
        &self.records[pos]
    }

    pub fn position_of(&self, id: &str) -> Option<Position> {
        self.positions.get(id).copied()
    }

    pub fn groupings(&self) -> &Groupings {
        &self.groupings
    }
}
