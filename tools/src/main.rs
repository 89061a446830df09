//! score-runner: headless batch scorer.
//!
//! Usage:
//!   score-runner --input data/transactions.csv --output data/enriched_transactions.csv
//!   score-runner --input txns.csv --output out.csv --db scores.db --config data/scoring.json --top 10
//!   score-runner --input txns.csv --output out.csv --report reports/fraud_pattern_report.json

use anyhow::{Context, Result};
use riskscore_core::{
    export::write_enriched_csv,
    loader::load_record_set,
    store::ScoreStore,
    RiskLevel, ScoringConfig, ScoringEngine,
};
use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};

const SUSPICIOUS_IP_LIMIT: usize = 20;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let input = str_arg(&args, "--input").unwrap_or("data/transactions.csv");
    let output = str_arg(&args, "--output").unwrap_or("data/enriched_transactions.csv");
    let db = str_arg(&args, "--db").unwrap_or(":memory:");
    let top = parse_arg(&args, "--top", 5usize);
    let report_path = str_arg(&args, "--report");

    let config = match str_arg(&args, "--config") {
        Some(path) => ScoringConfig::load(path)?,
        None => ScoringConfig::default(),
    };

    println!("Risk scoring: score-runner");
    println!("  input:   {input}");
    println!("  output:  {output}");
    println!("  db:      {db}");
    println!();

    let records = load_record_set(input).with_context(|| format!("Cannot load {input}"))?;
    println!("Loaded {} transactions", records.len());

    let engine = ScoringEngine::new(&config);
    let enriched = engine.score(&records)?;

    let store = ScoreStore::open(db)?;
    store.migrate()?;
    store.save_run(&enriched, env!("CARGO_PKG_VERSION"))?;
    let run_id = enriched.run_id();
    log::info!("Saved run {run_id} to {db}");

    let bin_stats = store.bin_stats(run_id, config.bin_decline.min_transactions)?;
    let bad_bins: Vec<&str> = bin_stats
        .iter()
        .filter(|b| b.decline_rate_pct > config.bin_decline.max_decline_rate * 100.0)
        .map(|b| b.card_bin.as_str())
        .collect();
    println!("{} BINs analysed", bin_stats.len());
    println!("  Bad BINs (>{:.0}% decline): {bad_bins:?}", config.bin_decline.max_decline_rate * 100.0);

    let ip_stats = store.ip_stats(run_id, SUSPICIOUS_IP_LIMIT)?;
    let suspicious = ip_stats
        .iter()
        .filter(|ip| ip.unique_cards > config.ip_velocity.max_distinct_cards as i64)
        .count();
    println!("  Suspicious IPs (>{} unique cards): {suspicious} found", config.ip_velocity.max_distinct_cards);

    println!();
    println!("=== RISK LEVEL DISTRIBUTION ===");
    for row in store.risk_distribution(run_id)? {
        println!("  {:10}: {:4}  ({:.1}%)", row.risk_level, row.count, row.pct);
    }

    let critical_total = enriched.with_level(RiskLevel::Critical).count();
    println!();
    println!("=== CRITICAL TRANSACTIONS ({critical_total}) ===");
    for row in store.top_by_level(run_id, RiskLevel::Critical, top)? {
        println!(
            "  {} | {} | score={} | signals={}",
            row.transaction_id, row.customer_email, row.risk_score, row.signals_triggered
        );
    }

    write_enriched_csv(output, enriched.records())?;

    let report = store.fraud_pattern_report(run_id, &config.geo_mismatch)?;
    println!();
    println!("=== FRAUD PATTERN REPORT ===");
    println!("  Fraud rate     : {:.2}%", report.summary.fraud_rate_pct);
    println!("  Chargebacks    : {}", report.summary.chargeback_count);
    println!("  Avg risk score : {:.1}", report.summary.avg_risk_score);
    if let Some(bin) = report.top_bins.first() {
        println!("  Riskiest BIN   : {} (avg {:.1})", bin.card_bin, bin.avg_risk_score);
    }
    let known_fraud_ips = report.top_ips_card_testing.iter().filter(|ip| ip.is_known_fraud_ip).count();
    println!("  Known fraud IPs among top card-testing IPs: {known_fraud_ips}");
    if let Some(path) = report_path {
        let file = File::create(path).with_context(|| format!("Cannot create {path}"))?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, &report)?;
        out.flush()?;
        println!("  JSON report -> {path}");
    }

    println!();
    println!("=== SIGNAL SUMMARY ===");
    println!("{}", serde_json::to_string_pretty(&enriched.summary())?);
    println!();
    println!("Done! Enriched dataset saved to {output}");
    Ok(())
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
