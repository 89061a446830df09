//! CSV loader tests: header mapping, quoting, precondition failures,
//! and the enriched CSV written back out.

mod common;

use riskscore_core::{
    export::write_enriched,
    loader::{load_csv, load_record_set},
    ScoreError, ScoringConfig, ScoringEngine, SubscriptionTier, TxnStatus,
};
use std::path::PathBuf;

const HEADER: &str = "transaction_id,timestamp,customer_email,subscription_tier,subscription_plan,amount,currency,country,ip_address,card_bin,card_last4,bin_country,status";

fn write_temp(contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("riskscore-{}.csv", uuid::Uuid::new_v4()));
    std::fs::write(&path, contents).expect("write temp csv");
    path
}

#[test]
fn loads_rows_by_header_name() {
    let path = write_temp(&format!(
        "{HEADER}\n\
         txn_00002,2026-01-20T10:00:00,b@example.com,annual,\"Annual Premium, Plus\",69.99,BRL,BR,187.1.1.1,012345,0042,BR,declined_fraud\n\
         txn_00001,2026-01-20T09:00:00,a@example.com,monthly,,9.99,BRL,BR,187.1.1.2,411111,1234,MX,approved\n"
    ));
    let records = load_csv(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(records.len(), 2);
    let first = &records[0];
    assert_eq!(first.id, "txn_00002");
    assert_eq!(first.subscription_tier, SubscriptionTier::Annual);
    assert_eq!(first.subscription_plan.as_deref(), Some("Annual Premium, Plus"));
    assert_eq!(first.card_bin, "012345", "leading zeros must survive");
    assert_eq!(first.status, TxnStatus::DeclinedFraud);
    assert_eq!(records[1].subscription_plan, None);
}

#[test]
fn reordered_columns_load_the_same() {
    let path = write_temp(
        "status,card_last4,card_bin,bin_country,ip_address,country,currency,amount,subscription_tier,customer_email,timestamp,transaction_id\n\
         approved,1234,411111,BR,187.1.1.1,BR,BRL,9.99,monthly,a@example.com,2026-01-20 09:00:00,t1\n",
    );
    let set = load_record_set(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let r = set.get(0);
    assert_eq!(r.id, "t1");
    assert_eq!(r.card_last4, "1234");
    assert_eq!(r.amount, 9.99);
}

#[test]
fn missing_column_is_reported() {
    let path = write_temp("transaction_id,timestamp\nt1,2026-01-20T09:00:00\n");
    let result = load_csv(&path);
    std::fs::remove_file(&path).ok();
    assert!(matches!(result, Err(ScoreError::MissingColumn { column: "customer_email" })));
}

#[test]
fn empty_field_in_first_row_is_not_a_missing_column() {
    let path = write_temp(&format!(
        "{HEADER}
         t1,2026-01-20T09:00:00,,monthly,,9.99,BRL,BR,1.1.1.1,411111,1234,BR,approved
"
    ));
    let result = load_csv(&path);
    std::fs::remove_file(&path).ok();
    assert!(matches!(
        result,
        Err(ScoreError::MissingField { index: 0, field: "customer_email" })
    ));
}

#[test]
fn path_with_single_quote_is_rejected() {
    let dir = std::env::temp_dir().join(format!("riskscore-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join("o'brien.csv");
    std::fs::write(&path, format!("{HEADER}\n")).expect("write temp csv");

    let result = load_csv(&path);
    std::fs::remove_dir_all(&dir).ok();
    match result {
        Err(ScoreError::UnsupportedPath { path }) => assert!(path.ends_with("o'brien.csv")),
        other => panic!("expected UnsupportedPath, got {other:?}"),
    }
}

#[test]
fn bad_values_name_the_record() {
    let path = write_temp(&format!(
        "{HEADER}\n\
         t1,2026-01-20T09:00:00,a@example.com,monthly,,9.99,BRL,BR,1.1.1.1,411111,1234,BR,approved\n\
         t2,not-a-time,a@example.com,monthly,,9.99,BRL,BR,1.1.1.1,411111,1234,BR,approved\n"
    ));
    let result = load_csv(&path);
    std::fs::remove_file(&path).ok();
    match result {
        Err(ScoreError::InvalidTimestamp { index, value }) => {
            assert_eq!(index, 1);
            assert_eq!(value, "not-a-time");
        }
        other => panic!("expected InvalidTimestamp, got {other:?}"),
    }

    let path = write_temp(&format!(
        "{HEADER}\nt1,2026-01-20T09:00:00,a@example.com,weekly,,9.99,BRL,BR,1.1.1.1,411111,1234,BR,approved\n"
    ));
    let result = load_csv(&path);
    std::fs::remove_file(&path).ok();
    assert!(matches!(
        result,
        Err(ScoreError::InvalidField { index: 0, field: "subscription_tier", .. })
    ));

    let path = write_temp(&format!(
        "{HEADER}\nt1,2026-01-20T09:00:00,,monthly,,9.99,BRL,BR,1.1.1.1,411111,1234,BR,approved\n"
    ));
    let result = load_csv(&path);
    std::fs::remove_file(&path).ok();
    assert!(matches!(
        result,
        Err(ScoreError::MissingField { index: 0, field: "customer_email" })
    ));
}

#[test]
fn enriched_csv_appends_score_columns() {
    let set = riskscore_core::RecordSet::new(vec![
        common::txn("t1", 0).ip("5.188.9.9").build(),
        common::txn("t2", 5).build(),
    ])
    .unwrap();
    let enriched = ScoringEngine::new(&ScoringConfig::default()).score(&set).unwrap();

    let mut out = Vec::new();
    write_enriched(&mut out, enriched.records()).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with(",risk_score,risk_level,signals_triggered"));
    assert!(
        lines[1].starts_with("t1,2026-01-20T00:00:00,"),
        "unexpected row: {}",
        lines[1]
    );
    assert!(lines[1].ends_with(r#",20,LOW,"[""geo_mismatch""]""#), "unexpected row: {}", lines[1]);
    assert!(lines[2].ends_with(",0,LOW,[]"), "unexpected row: {}", lines[2]);
}

#[test]
fn written_csv_loads_back() {
    let set = riskscore_core::RecordSet::new(common::random_log(12, 50)).unwrap();
    let enriched = ScoringEngine::new(&ScoringConfig::default()).score(&set).unwrap();

    let path = std::env::temp_dir().join(format!("riskscore-{}.csv", uuid::Uuid::new_v4()));
    riskscore_core::export::write_enriched_csv(&path, enriched.records()).unwrap();
    let reloaded = load_record_set(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(reloaded.records(), set.records());
}
