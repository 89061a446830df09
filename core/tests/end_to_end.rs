//! End-to-end scenario: every signal once, plus one record hit by
//! three signals at the same time.

mod common;

use common::{score, txn};
use riskscore_core::{RiskLevel, Signal};

fn scenario() -> Vec<riskscore_core::TransactionRecord> {
    let mut log = vec![
        // Card testing from a foreign IP on a bad BIN.
        txn("x1", 0).ip("5.188.1.1").card("999001", "2001").status("declined_fraud").build(),
        txn("x2", 10).ip("5.188.1.1").card("999001", "2002").status("declined_fraud").build(),
        txn("x3", 20).ip("5.188.1.1").card("999001", "2003").status("declined_fraud").build(),
        txn("x4", 30).ip("5.188.1.1").card("999001", "2004").build(),
        // Monthly at T, annual at T+2h.
        txn("m", 1000).email("sub@example.com").build(),
        txn("a", 1120).email("sub@example.com").annual().build(),
        // Issuer country differs from billing country.
        txn("g", 1500).countries("MX", "BR").build(),
        // Three declines then an approval on one card.
        txn("d1", 2000).card("531313", "7777").status("declined_fraud").build(),
        txn("d2", 2010).card("531313", "7777").status("declined_insufficient_funds").build(),
        txn("d3", 2020).card("531313", "7777").status("declined_fraud").build(),
        txn("ok", 2030).card("531313", "7777").build(),
        txn("clean", 3000).build(),
    ];
    // Healthy traffic keeps BIN 531313 under the decline threshold (3/8).
    for i in 0..4 {
        log.push(txn(&format!("p{i}"), 2100 + i * 10).card("531313", &format!("800{i}")).build());
    }
    log
}

#[test]
fn scenario_scores_and_levels() {
    let set = score(scenario());
    assert_eq!(set.len(), 16);

    let expected: &[(&str, u32, RiskLevel)] = &[
        ("x1", 45, RiskLevel::High),
        ("x2", 45, RiskLevel::High),
        ("x3", 45, RiskLevel::High),
        ("x4", 85, RiskLevel::Critical),
        ("m", 30, RiskLevel::Medium),
        ("a", 30, RiskLevel::Medium),
        ("g", 20, RiskLevel::Low),
        ("d1", 25, RiskLevel::Medium),
        ("d2", 25, RiskLevel::Medium),
        ("d3", 25, RiskLevel::Medium),
        ("ok", 25, RiskLevel::Medium),
        ("p0", 0, RiskLevel::Low),
        ("clean", 0, RiskLevel::Low),
    ];
    for (id, score, level) in expected {
        let r = set.get(id).unwrap();
        assert_eq!(r.risk_score, *score, "{id}: signals {:?}", r.signals_triggered);
        assert_eq!(r.risk_level, *level, "{id}");
    }

    assert_eq!(
        set.get("x4").unwrap().signals_triggered,
        [Signal::IpVelocity, Signal::BinDeclineRate, Signal::GeoMismatch]
    );
    assert_eq!(
        set.get("x4").unwrap().signals_json(),
        r#"["ip_velocity","bin_decline_rate","geo_mismatch"]"#
    );
    assert_eq!(set.get("clean").unwrap().signals_json(), "[]");
}

#[test]
fn scenario_summary() {
    let summary = score(scenario()).summary();
    assert_eq!(summary.total, 16);
    assert_eq!(summary.flagged, 11);
    assert_eq!(summary.count_for(RiskLevel::Critical), 1);
    assert_eq!(summary.count_for(RiskLevel::High), 3);
    assert_eq!(summary.count_for(RiskLevel::Medium), 6);
    assert_eq!(summary.count_for(RiskLevel::Low), 6);
    assert_eq!(summary.signal_count(Signal::IpVelocity), 1);
    assert_eq!(summary.signal_count(Signal::RapidTierUpgrade), 2);
    assert_eq!(summary.signal_count(Signal::BinDeclineRate), 4);
    assert_eq!(summary.signal_count(Signal::GeoMismatch), 5);
    assert_eq!(summary.signal_count(Signal::RepeatedFailures), 4);
}

/// Cycling the same four cards through one IP inside three hours:
/// once four distinct cards are in the window, every later use is flagged.
#[test]
fn card_cycling_flags_every_use_after_the_fourth_card() {
    let cards = ["3001", "3002", "3003", "3004"];
    let mut log = Vec::new();
    for round in 0..2 {
        for (i, last4) in cards.iter().enumerate() {
            let minute = round * 90 + i as i64 * 15;
            log.push(
                txn(&format!("r{round}c{i}"), minute)
                    .ip("190.1.1.1")
                    .card("424242", last4)
                    .build(),
            );
        }
    }
    let set = score(log);

    let flagged: Vec<&str> = set
        .records()
        .iter()
        .filter(|r| r.has_signal(Signal::IpVelocity))
        .map(|r| r.record.id.as_str())
        .collect();
    assert_eq!(flagged, ["r0c3", "r1c0", "r1c1", "r1c2", "r1c3"]);
    assert!(set
        .records()
        .iter()
        .filter(|r| r.has_signal(Signal::IpVelocity))
        .all(|r| r.risk_score == 40));
}
