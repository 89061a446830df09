//! Shared fixtures for integration tests.

#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use riskscore_core::{
    transaction::CardKey, types::Timestamp, EnrichedSet, RecordSet, ScoringConfig,
    ScoringEngine, SubscriptionTier, TransactionRecord, TxnStatus,
};

pub fn base_time() -> Timestamp {
    NaiveDate::from_ymd_opt(2026, 1, 20)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn at_minute(minute: i64) -> Timestamp {
    base_time() + Duration::minutes(minute)
}

/// Builder with defaults that trip no signal on their own: unique IP and
/// email per id, matching countries, approved status.
pub struct TxnBuilder {
    record: TransactionRecord,
}

pub fn txn(id: &str, minute: i64) -> TxnBuilder {
    TxnBuilder {
        record: TransactionRecord {
            id:                id.to_string(),
            timestamp:         at_minute(minute),
            customer_email:    format!("{id}@example.com"),
            subscription_tier: SubscriptionTier::Monthly,
            subscription_plan: Some("Monthly Basic".into()),
            amount:            9.99,
            currency:          "BRL".into(),
            country:           "BR".into(),
            ip_address:        format!("187.10.{id}"),
            card_bin:          "411111".into(),
            card_last4:        "0000".into(),
            bin_country:       "BR".into(),
            status:            TxnStatus::Approved,
        },
    }
}

impl TxnBuilder {
    pub fn ip(mut self, ip: &str) -> Self {
        self.record.ip_address = ip.into();
        self
    }

    pub fn card(mut self, bin: &str, last4: &str) -> Self {
        self.record.card_bin = bin.into();
        self.record.card_last4 = last4.into();
        self
    }

    pub fn email(mut self, email: &str) -> Self {
        self.record.customer_email = email.into();
        self
    }

    pub fn annual(mut self) -> Self {
        self.record.subscription_tier = SubscriptionTier::Annual;
        self.record.subscription_plan = Some("Annual Basic".into());
        self.record.amount = 49.99;
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.record.status = TxnStatus::parse(status);
        self
    }

    pub fn countries(mut self, country: &str, bin_country: &str) -> Self {
        self.record.country = country.into();
        self.record.bin_country = bin_country.into();
        self
    }

    pub fn build(self) -> TransactionRecord {
        self.record
    }
}

pub fn score(records: Vec<TransactionRecord>) -> EnrichedSet {
    score_with(records, &ScoringConfig::default())
}

pub fn score_with(records: Vec<TransactionRecord>, config: &ScoringConfig) -> EnrichedSet {
    let set = RecordSet::new(records).expect("valid record set");
    ScoringEngine::new(config).score(&set).expect("scoring run")
}

/// Deterministic pseudo-random log with small key pools, so every
/// signal fires somewhere.
pub fn random_log(seed: u64, n: usize) -> Vec<TransactionRecord> {
    let mut rng = Pcg64Mcg::seed_from_u64(seed);
    let ips = ["187.1.1.1", "187.2.2.2", "185.220.101.34", "189.3.3.3"];
    let bins = ["411111", "424242", "999001"];
    let last4s = ["1001", "1002", "1003", "1004", "1005", "1006"];
    let statuses = [
        "approved",
        "approved",
        "approved",
        "declined_fraud",
        "declined_insufficient_funds",
        "chargeback",
    ];
    // 999001 is a card-testing BIN: two declines for every approval.
    let bad_bin_statuses = ["approved", "declined_fraud", "declined_insufficient_funds"];
    let countries = ["BR", "MX", "CO"];

    (0..n)
        .map(|i| {
            let country = countries[rng.gen_range(0..countries.len())];
            let bin_country = if rng.gen_bool(0.9) {
                country
            } else {
                countries[rng.gen_range(0..countries.len())]
            };
            let bin = bins[rng.gen_range(0..bins.len())];
            let status = if bin == "999001" {
                bad_bin_statuses[rng.gen_range(0..bad_bin_statuses.len())]
            } else {
                statuses[rng.gen_range(0..statuses.len())]
            };
            let mut b = txn(&format!("txn_{i:05}"), rng.gen_range(0..3 * 24 * 60))
                .ip(ips[rng.gen_range(0..ips.len())])
                .card(bin, last4s[rng.gen_range(0..last4s.len())])
                .email(&format!("user{}@example.com", rng.gen_range(0..8)))
                .status(status)
                .countries(country, bin_country);
            if rng.gen_bool(0.3) {
                b = b.annual();
            }
            b.build()
        })
        .collect()
}

/// Brute-force IP velocity: rescan the window for every record.
pub fn naive_ip_velocity(records: &[TransactionRecord]) -> Vec<bool> {
    records
        .iter()
        .map(|r| {
            let start = r.timestamp - Duration::hours(24);
            let mut cards: Vec<CardKey> = records
                .iter()
                .filter(|o| {
                    o.ip_address == r.ip_address && o.timestamp >= start && o.timestamp <= r.timestamp
                })
                .map(|o| o.card_key())
                .collect();
            cards.sort();
            cards.dedup();
            cards.len() > 3
        })
        .collect()
}
