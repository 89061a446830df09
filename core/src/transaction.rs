//! Transaction records: the immutable input to every scoring run.

use crate::types::{RecordId, Timestamp};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Timestamp formats accepted on input, tried in order.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Output format. `%.f` prints nothing when the fraction is zero.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    Monthly,
    Annual,
}

impl SubscriptionTier {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "monthly" => Some(Self::Monthly),
            "annual"  => Some(Self::Annual),
            _         => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Annual  => "annual",
        }
    }
}

/// Settlement outcome of a charge attempt.
///
/// Any token outside the four known statuses is kept verbatim as
/// `Unclassified`; such records never count as declines and never
/// break a decline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TxnStatus {
    Approved,
    DeclinedFraud,
    DeclinedInsufficientFunds,
    Chargeback,
    Unclassified(String),
}

impl TxnStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "approved"                    => Self::Approved,
            "declined_fraud"              => Self::DeclinedFraud,
            "declined_insufficient_funds" => Self::DeclinedInsufficientFunds,
            "chargeback"                  => Self::Chargeback,
            other                         => Self::Unclassified(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Approved                  => "approved",
            Self::DeclinedFraud             => "declined_fraud",
            Self::DeclinedInsufficientFunds => "declined_insufficient_funds",
            Self::Chargeback                => "chargeback",
            Self::Unclassified(s)           => s,
        }
    }

    /// Membership in the decline set.
    pub fn is_decline(&self) -> bool {
        matches!(self, Self::DeclinedFraud | Self::DeclinedInsufficientFunds)
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// Pseudo-identifier for "the same card": BIN plus last four digits.
/// No full PAN is ever available.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardKey(String);

impl CardKey {
    pub fn new(card_bin: &str, card_last4: &str) -> Self {
        Self(format!("{card_bin}-{card_last4}"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    pub id:                RecordId,
    pub timestamp:         Timestamp,
    pub customer_email:    String,
    pub subscription_tier: SubscriptionTier,
    #[serde(default)]
    pub subscription_plan: Option<String>,
    pub amount:            f64,
    pub currency:          String,
    pub country:           String,
    pub ip_address:        String,
    pub card_bin:          String,
    pub card_last4:        String,
    pub bin_country:       String,
    pub status:            TxnStatus,
}

impl TransactionRecord {
    pub fn card_key(&self) -> CardKey {
        CardKey::new(&self.card_bin, &self.card_last4)
    }
}

/// Parse an ISO-8601-like timestamp. Offsets are normalised to UTC.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}
