//! CSV loader: header-row transaction files into TransactionRecords.
//!
//! The file is mounted as a SQLite `csv` virtual table and read with a
//! plain SELECT, so quoting and embedded delimiters are handled by the
//! csvtab module rather than here. Columns are matched by header name;
//! their order in the file does not matter.

use crate::{
    error::{ScoreError, ScoreResult},
    record_set::RecordSet,
    transaction::{parse_timestamp, SubscriptionTier, TransactionRecord, TxnStatus},
};
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::Path;

const REQUIRED_COLUMNS: &[&str] = &[
    "transaction_id",
    "timestamp",
    "customer_email",
    "subscription_tier",
    "amount",
    "currency",
    "country",
    "ip_address",
    "card_bin",
    "card_last4",
    "bin_country",
    "status",
];

/// Load a CSV file in file order.
pub fn load_csv<P: AsRef<Path>>(path: P) -> ScoreResult<Vec<TransactionRecord>> {
    let path = path.as_ref();
    let conn = Connection::open_in_memory()?;
    rusqlite::vtab::csvtab::load_module(&conn)?;

    // csvtab strips the surrounding quotes but does not unescape doubled ones.
    let filename = path.to_string_lossy();
    if filename.contains('\'') {
        return Err(ScoreError::UnsupportedPath { path: filename.into_owned() });
    }
    conn.execute_batch(&format!(
        "CREATE VIRTUAL TABLE temp.raw_txn USING csv(filename='{filename}', header=yes);"
    ))?;

    let mut stmt = conn.prepare("SELECT * FROM temp.raw_txn")?;
    let columns: HashMap<String, usize> = stmt
        .column_names()
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim().to_string(), i))
        .collect();

    for &required in REQUIRED_COLUMNS {
        if !columns.contains_key(required) {
            return Err(ScoreError::MissingColumn { column: required });
        }
    }
    let plan_column = columns.get("subscription_plan").copied();

    let mut rows = stmt.query([])?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let index = records.len();
        let mut fields: HashMap<&'static str, String> = HashMap::new();
        for &name in REQUIRED_COLUMNS {
            let value: Option<String> = row.get(columns[name])?;
            fields.insert(name, value.unwrap_or_default());
        }
        let plan = match plan_column {
            Some(i) => row.get::<_, Option<String>>(i)?.filter(|p| !p.is_empty()),
            None => None,
        };
        records.push(record_from_fields(index, &fields, plan)?);
    }

    log::info!("Loaded {} transactions from {}", records.len(), path.display());
    Ok(records)
}

/// Load a CSV file straight into canonical order.
pub fn load_record_set<P: AsRef<Path>>(path: P) -> ScoreResult<RecordSet> {
    RecordSet::new(load_csv(path)?)
}

/// Build one record from its named raw fields. `index` is the data-row
/// number, used in every error.
pub fn record_from_fields(
    index: usize,
    fields: &HashMap<&'static str, String>,
    subscription_plan: Option<String>,
) -> ScoreResult<TransactionRecord> {
    let get = |field: &'static str| -> ScoreResult<String> {
        match fields.get(field).map(|v| v.trim()) {
            Some(v) if !v.is_empty() => Ok(v.to_string()),
            _ => Err(ScoreError::MissingField { index, field }),
        }
    };

    let raw_ts = get("timestamp")?;
    let timestamp = parse_timestamp(&raw_ts)
        .ok_or(ScoreError::InvalidTimestamp { index, value: raw_ts })?;

    let raw_tier = get("subscription_tier")?;
    let subscription_tier = SubscriptionTier::parse(&raw_tier).ok_or(ScoreError::InvalidField {
        index,
        field: "subscription_tier",
        value: raw_tier,
    })?;

    let raw_amount = get("amount")?;
    let amount = raw_amount.parse::<f64>().map_err(|_| ScoreError::InvalidField {
        index,
        field: "amount",
        value: raw_amount.clone(),
    })?;

    let id = get("transaction_id")?;
    let status = TxnStatus::parse(&get("status")?);
    if let TxnStatus::Unclassified(other) = &status {
        log::warn!("Record {index} ('{id}') has unclassified status '{other}'");
    }

    Ok(TransactionRecord {
        id,
        timestamp,
        customer_email: get("customer_email")?,
        subscription_tier,
        subscription_plan,
        amount,
        currency: get("currency")?,
        country: get("country")?,
        ip_address: get("ip_address")?,
        card_bin: get("card_bin")?,
        card_last4: get("card_last4")?,
        bin_country: get("bin_country")?,
        status,
    })
}
