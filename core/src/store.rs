//! SQLite persistence layer for scoring runs.
//!
//! RULE: Only store.rs talks to the database.
//! The engine never executes SQL; callers persist an EnrichedSet
//! after a run has completed, and the pipeline analytics are plain
//! queries over what was persisted.

use crate::{
    aggregator::RiskLevel,
    config::GeoMismatchConfig,
    engine::EnrichedSet,
    error::ScoreResult,
    export::to_row,
    geo_mismatch_signal::GeoMismatchSignal,
};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

pub struct ScoreStore {
    conn: Connection,
}

/// Per-BIN decline statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinStatsRow {
    pub card_bin:          String,
    pub total_txns:        i64,
    pub total_declines:    i64,
    pub total_chargebacks: i64,
    pub decline_rate_pct:  f64,
    pub avg_amount:        f64,
}

/// Per-IP card diversity, the card-testing indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IpStatsRow {
    pub ip_address:       String,
    pub total_txns:       i64,
    pub unique_cards:     i64,
    pub unique_bins:      i64,
    pub total_declines:   i64,
    pub decline_rate_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskLevelRow {
    pub risk_level: String,
    pub count:      i64,
    pub avg_score:  f64,
    pub pct:        f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggedTxnRow {
    pub transaction_id:    String,
    pub customer_email:    String,
    pub risk_score:        i64,
    pub signals_triggered: String,
}

/// Fraud-pattern report over one persisted run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FraudPatternReport {
    pub meta:                 ReportMeta,
    pub summary:              ReportSummary,
    pub top_bins:             Vec<BinRiskRow>,
    pub top_ips_card_testing: Vec<IpCardTestingRow>,
    pub time_patterns:        Vec<HourlyRiskRow>,
    pub geo_anomalies:        Vec<GeoAnomalyRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMeta {
    pub run_id:             String,
    pub generated_at:       String,
    pub total_transactions: i64,
    pub date_from:          Option<String>,
    pub date_to:            Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total_transactions: i64,
    pub critical_count:     i64,
    pub high_count:         i64,
    pub medium_count:       i64,
    pub low_count:          i64,
    /// Share of declined_fraud and chargeback records, rounded to 0.01.
    pub fraud_rate_pct:     f64,
    pub chargeback_count:   i64,
    pub avg_risk_score:     f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinRiskRow {
    pub card_bin:         String,
    pub total_txns:       i64,
    pub avg_risk_score:   f64,
    pub declines:         i64,
    pub chargebacks:      i64,
    pub approvals:        i64,
    pub decline_rate_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IpCardTestingRow {
    pub ip_address:        String,
    pub unique_cards:      i64,
    pub unique_bins:       i64,
    pub total_txns:        i64,
    pub avg_risk_score:    f64,
    pub declines:          i64,
    pub is_known_fraud_ip: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyRiskRow {
    pub hour:           u32,
    pub count:          i64,
    pub avg_risk:       f64,
    pub critical_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoAnomalyRow {
    pub country:     String,
    pub bin_country: String,
    pub count:       i64,
    pub avg_risk:    f64,
}

const REPORT_TOP_BINS: usize = 10;
const REPORT_TOP_IPS: usize = 15;

const DECLINE_SUM: &str =
    "SUM(CASE WHEN status IN ('declined_fraud', 'declined_insufficient_funds') THEN 1 ELSE 0 END)";

impl ScoreStore {
    /// Open (or create) the results database at `path`.
    pub fn open(path: &str) -> ScoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> ScoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> ScoreResult<()> {
        self.conn.execute_batch(include_str!("../../migrations/001_scoring.sql"))?;
        Ok(())
    }

    // ── Runs ───────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, version: &str, record_count: usize) -> ScoreResult<()> {
        self.conn.execute(
            "INSERT INTO scoring_run (run_id, version, record_count, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                run_id,
                version,
                record_count as i64,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn run_record_count(&self, run_id: &str) -> ScoreResult<Option<i64>> {
        let count = self
            .conn
            .query_row(
                "SELECT record_count FROM scoring_run WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count)
    }

    // ── Enriched records ───────────────────────────────────────

    /// Persist a whole run atomically: the run row plus every record,
    /// or nothing.
    pub fn save_run(&self, set: &EnrichedSet, version: &str) -> ScoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        self.insert_run(set.run_id(), version, set.len())?;
        {
            let mut stmt = self.conn.prepare_cached(
                "INSERT INTO enriched_transaction (
                    run_id, position, transaction_id, timestamp, customer_email,
                    subscription_tier, subscription_plan, amount, currency, country,
                    ip_address, card_bin, card_last4, bin_country, status,
                    risk_score, risk_level, signals_triggered
                ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18)",
            )?;
            for (pos, e) in set.records().iter().enumerate() {
                let row = to_row(e);
                stmt.execute(params![
                    set.run_id(),
                    pos as i64,
                    row[0],
                    row[1],
                    row[2],
                    row[3],
                    e.record.subscription_plan,
                    e.record.amount,
                    row[6],
                    row[7],
                    row[8],
                    row[9],
                    row[10],
                    row[11],
                    row[12],
                    e.risk_score as i64,
                    row[14],
                    row[15],
                ])?;
            }
        }
        tx.commit()?;
        log::debug!("Persisted run {} ({} records)", set.run_id(), set.len());
        Ok(())
    }

    pub fn enriched_count(&self, run_id: &str) -> ScoreResult<i64> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM enriched_transaction WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    pub fn total_score(&self, run_id: &str) -> ScoreResult<i64> {
        let n = self.conn.query_row(
            "SELECT COALESCE(SUM(risk_score), 0) FROM enriched_transaction WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    // ── Pipeline analytics ─────────────────────────────────────

    /// BINs with at least `min_txns` transactions, worst decline rate first.
    pub fn bin_stats(&self, run_id: &str, min_txns: usize) -> ScoreResult<Vec<BinStatsRow>> {
        let sql = format!(
            "SELECT card_bin,
                    COUNT(*),
                    {DECLINE_SUM},
                    SUM(CASE WHEN status = 'chargeback' THEN 1 ELSE 0 END),
                    ROUND(CAST({DECLINE_SUM} AS REAL) / COUNT(*) * 100, 1) AS decline_rate_pct,
                    ROUND(AVG(amount), 2)
             FROM enriched_transaction
             WHERE run_id = ?1
             GROUP BY card_bin
             HAVING COUNT(*) >= ?2
             ORDER BY decline_rate_pct DESC, card_bin ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![run_id, min_txns as i64], |row| {
                Ok(BinStatsRow {
                    card_bin:          row.get(0)?,
                    total_txns:        row.get(1)?,
                    total_declines:    row.get(2)?,
                    total_chargebacks: row.get(3)?,
                    decline_rate_pct:  row.get(4)?,
                    avg_amount:        row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// IPs ranked by card diversity, most diverse first.
    pub fn ip_stats(&self, run_id: &str, limit: usize) -> ScoreResult<Vec<IpStatsRow>> {
        let sql = format!(
            "SELECT ip_address,
                    COUNT(*),
                    COUNT(DISTINCT card_last4) AS unique_cards,
                    COUNT(DISTINCT card_bin),
                    {DECLINE_SUM},
                    ROUND(CAST({DECLINE_SUM} AS REAL) / COUNT(*) * 100, 1)
             FROM enriched_transaction
             WHERE run_id = ?1
             GROUP BY ip_address
             ORDER BY unique_cards DESC, ip_address ASC
             LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![run_id, limit as i64], |row| {
                Ok(IpStatsRow {
                    ip_address:       row.get(0)?,
                    total_txns:       row.get(1)?,
                    unique_cards:     row.get(2)?,
                    unique_bins:      row.get(3)?,
                    total_declines:   row.get(4)?,
                    decline_rate_pct: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn risk_distribution(&self, run_id: &str) -> ScoreResult<Vec<RiskLevelRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT risk_level,
                    COUNT(*),
                    ROUND(AVG(risk_score), 1) AS avg_score,
                    COUNT(*) * 100.0 /
                        (SELECT COUNT(*) FROM enriched_transaction WHERE run_id = ?1)
             FROM enriched_transaction
             WHERE run_id = ?1
             GROUP BY risk_level
             ORDER BY avg_score DESC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(RiskLevelRow {
                    risk_level: row.get(0)?,
                    count:      row.get(1)?,
                    avg_score:  row.get(2)?,
                    pct:        row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// First `limit` records of one risk level, in canonical order.
    pub fn top_by_level(
        &self,
        run_id: &str,
        level: RiskLevel,
        limit: usize,
    ) -> ScoreResult<Vec<FlaggedTxnRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT transaction_id, customer_email, risk_score, signals_triggered
             FROM enriched_transaction
             WHERE run_id = ?1 AND risk_level = ?2
             ORDER BY position ASC
             LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(params![run_id, level.as_str(), limit as i64], |row| {
                Ok(FlaggedTxnRow {
                    transaction_id:    row.get(0)?,
                    customer_email:    row.get(1)?,
                    risk_score:        row.get(2)?,
                    signals_triggered: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Fraud-pattern report ───────────────────────────────────

    /// Build the fraud-pattern report for a persisted run. Known fraud
    /// IPs are those matching the configured foreign prefixes.
    pub fn fraud_pattern_report(
        &self,
        run_id: &str,
        geo: &GeoMismatchConfig,
    ) -> ScoreResult<FraudPatternReport> {
        let summary = self.report_summary(run_id)?;
        let (date_from, date_to): (Option<String>, Option<String>) = self.conn.query_row(
            "SELECT MIN(timestamp), MAX(timestamp)
             FROM enriched_transaction WHERE run_id = ?1",
            params![run_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let meta = ReportMeta {
            run_id: run_id.to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            total_transactions: summary.total_transactions,
            date_from,
            date_to,
        };

        let report = FraudPatternReport {
            meta,
            summary,
            top_bins: self.report_top_bins(run_id)?,
            top_ips_card_testing: self.report_top_ips(run_id, geo)?,
            time_patterns: self.report_time_patterns(run_id)?,
            geo_anomalies: self.report_geo_anomalies(run_id)?,
        };
        log::debug!(
            "run={run_id} report: {} bins, {} ips, {} hours, {} geo groups",
            report.top_bins.len(),
            report.top_ips_card_testing.len(),
            report.time_patterns.len(),
            report.geo_anomalies.len()
        );
        Ok(report)
    }

    fn report_summary(&self, run_id: &str) -> ScoreResult<ReportSummary> {
        let summary = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN risk_level = 'CRITICAL' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN risk_level = 'HIGH' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN risk_level = 'MEDIUM' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN risk_level = 'LOW' THEN 1 ELSE 0 END), 0),
                    COALESCE(ROUND(
                        SUM(CASE WHEN status IN ('declined_fraud', 'chargeback') THEN 1 ELSE 0 END)
                            * 100.0 / COUNT(*), 2), 0.0),
                    COALESCE(SUM(CASE WHEN status = 'chargeback' THEN 1 ELSE 0 END), 0),
                    COALESCE(ROUND(AVG(risk_score), 1), 0.0)
             FROM enriched_transaction
             WHERE run_id = ?1",
            params![run_id],
            |row| {
                Ok(ReportSummary {
                    total_transactions: row.get(0)?,
                    critical_count:     row.get(1)?,
                    high_count:         row.get(2)?,
                    medium_count:       row.get(3)?,
                    low_count:          row.get(4)?,
                    fraud_rate_pct:     row.get(5)?,
                    chargeback_count:   row.get(6)?,
                    avg_risk_score:     row.get(7)?,
                })
            },
        )?;
        Ok(summary)
    }

    /// BINs with the highest average risk score.
    fn report_top_bins(&self, run_id: &str) -> ScoreResult<Vec<BinRiskRow>> {
        let sql = format!(
            "SELECT card_bin,
                    COUNT(*),
                    ROUND(AVG(risk_score), 1),
                    {DECLINE_SUM},
                    SUM(CASE WHEN status = 'chargeback' THEN 1 ELSE 0 END),
                    SUM(CASE WHEN status = 'approved' THEN 1 ELSE 0 END),
                    ROUND(CAST({DECLINE_SUM} AS REAL) / COUNT(*) * 100, 1)
             FROM enriched_transaction
             WHERE run_id = ?1
             GROUP BY card_bin
             ORDER BY AVG(risk_score) DESC, card_bin ASC
             LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![run_id, REPORT_TOP_BINS as i64], |row| {
                Ok(BinRiskRow {
                    card_bin:         row.get(0)?,
                    total_txns:       row.get(1)?,
                    avg_risk_score:   row.get(2)?,
                    declines:         row.get(3)?,
                    chargebacks:      row.get(4)?,
                    approvals:        row.get(5)?,
                    decline_rate_pct: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// IPs by card diversity, tagged when they match a known fraud prefix.
    fn report_top_ips(
        &self,
        run_id: &str,
        geo: &GeoMismatchConfig,
    ) -> ScoreResult<Vec<IpCardTestingRow>> {
        let known = GeoMismatchSignal::new(geo);
        let sql = format!(
            "SELECT ip_address,
                    COUNT(DISTINCT card_last4) AS unique_cards,
                    COUNT(DISTINCT card_bin),
                    COUNT(*),
                    ROUND(AVG(risk_score), 1),
                    {DECLINE_SUM}
             FROM enriched_transaction
             WHERE run_id = ?1
             GROUP BY ip_address
             ORDER BY unique_cards DESC, ip_address ASC
             LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![run_id, REPORT_TOP_IPS as i64], |row| {
                let ip_address: String = row.get(0)?;
                Ok(IpCardTestingRow {
                    is_known_fraud_ip: known.is_foreign_ip(&ip_address),
                    ip_address,
                    unique_cards:      row.get(1)?,
                    unique_bins:       row.get(2)?,
                    total_txns:        row.get(3)?,
                    avg_risk_score:    row.get(4)?,
                    declines:          row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Volume and risk per hour of day. Hours with no records are omitted.
    fn report_time_patterns(&self, run_id: &str) -> ScoreResult<Vec<HourlyRiskRow>> {
        // Stored timestamps are "YYYY-MM-DDTHH:MM:SS[.f]".
        let mut stmt = self.conn.prepare(
            "SELECT CAST(substr(timestamp, 12, 2) AS INTEGER) AS hour,
                    COUNT(*),
                    ROUND(AVG(risk_score), 1),
                    SUM(CASE WHEN risk_level = 'CRITICAL' THEN 1 ELSE 0 END)
             FROM enriched_transaction
             WHERE run_id = ?1
             GROUP BY hour
             ORDER BY hour ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(HourlyRiskRow {
                    hour:           row.get(0)?,
                    count:          row.get(1)?,
                    avg_risk:       row.get(2)?,
                    critical_count: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Geo-mismatched records grouped by billing and issuer country.
    fn report_geo_anomalies(&self, run_id: &str) -> ScoreResult<Vec<GeoAnomalyRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT country, bin_country, COUNT(*) AS n, ROUND(AVG(risk_score), 1)
             FROM enriched_transaction
             WHERE run_id = ?1 AND signals_triggered LIKE '%\"geo_mismatch\"%'
             GROUP BY country, bin_country
             ORDER BY n DESC, country ASC, bin_country ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(GeoAnomalyRow {
                    country:     row.get(0)?,
                    bin_country: row.get(1)?,
                    count:       row.get(2)?,
                    avg_risk:    row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
