//! Enriched-record flattening for flat text files.
//!
//! Output schema = input schema + risk_score, risk_level,
//! signals_triggered (a JSON array string). Fields are quoted only
//! when they contain a delimiter, a quote or a line break.

use crate::{
    aggregator::EnrichedRecord,
    error::ScoreResult,
    transaction::format_timestamp,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const ENRICHED_COLUMNS: &[&str] = &[
    "transaction_id",
    "timestamp",
    "customer_email",
    "subscription_tier",
    "subscription_plan",
    "amount",
    "currency",
    "country",
    "ip_address",
    "card_bin",
    "card_last4",
    "bin_country",
    "status",
    "risk_score",
    "risk_level",
    "signals_triggered",
];

/// Flatten one enriched record into column order.
pub fn to_row(e: &EnrichedRecord) -> Vec<String> {
    let r = &e.record;
    vec![
        r.id.clone(),
        format_timestamp(&r.timestamp),
        r.customer_email.clone(),
        r.subscription_tier.as_str().to_string(),
        r.subscription_plan.clone().unwrap_or_default(),
        r.amount.to_string(),
        r.currency.clone(),
        r.country.clone(),
        r.ip_address.clone(),
        r.card_bin.clone(),
        r.card_last4.clone(),
        r.bin_country.clone(),
        r.status.as_str().to_string(),
        e.risk_score.to_string(),
        e.risk_level.as_str().to_string(),
        e.signals_json(),
    ]
}

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn write_enriched<W: Write>(out: &mut W, records: &[EnrichedRecord]) -> ScoreResult<()> {
    writeln!(out, "{}", ENRICHED_COLUMNS.join(","))?;
    for e in records {
        let line: Vec<String> = to_row(e).iter().map(|f| quote(f)).collect();
        writeln!(out, "{}", line.join(","))?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_enriched_csv<P: AsRef<Path>>(path: P, records: &[EnrichedRecord]) -> ScoreResult<()> {
    let mut out = BufWriter::new(File::create(path.as_ref())?);
    write_enriched(&mut out, records)?;
    log::info!("Wrote {} enriched records to {}", records.len(), path.as_ref().display());
    Ok(())
}
