//! Durable storage for decision job outcomes.
//!
//! One append-only SQLite table holds the final analysis per completed job.
//! Writes acquire the connection per call and each row is inserted in a
//! single statement, so concurrent jobs never interleave partial records.
//! A persistence failure is the caller's tolerated degradation: the report
//! stays available in memory either way.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

// ============================================================================
// Database Schema
// ============================================================================

const CREATE_TABLES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS trade_analysis (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    ticker TEXT NOT NULL,
    decision TEXT NOT NULL,
    full_report TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_trade_analysis_ticker
ON trade_analysis(ticker);
"#;

// ============================================================================
// Record Types
// ============================================================================

/// Trading decision extracted from a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeDecision {
    Buy,
    Sell,
    Hold,
}

impl TradeDecision {
    /// Best-effort extraction from an unstructured report.
    ///
    /// Scans for the literal `DECISION: BUY` / `DECISION: SELL` markers;
    /// anything else, including reports with no marker at all, resolves to
    /// `Hold`. This is substring containment, not a grammar.
    pub fn extract(report: &str) -> Self {
        if report.contains("DECISION: BUY") {
            Self::Buy
        } else if report.contains("DECISION: SELL") {
            Self::Sell
        } else {
            Self::Hold
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Hold => "HOLD",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "BUY" => Self::Buy,
            "SELL" => Self::Sell,
            _ => Self::Hold,
        }
    }
}

impl std::fmt::Display for TradeDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One persisted analysis outcome. Append-only; never updated or deleted by
/// the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub ticker: String,
    pub decision: TradeDecision,
    pub full_report: String,
}

// ============================================================================
// Result Store
// ============================================================================

/// SQLite-backed result store.
pub struct ResultStore {
    /// Connection is Send but not Sync; the mutex makes the store shareable
    /// across jobs with one writer at a time.
    db: Arc<Mutex<Connection>>,
}

impl ResultStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open result store at {}", path.display()))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .context("Failed to set database pragmas")?;

        info!(db_path = %path.display(), "Opened result store");

        let store = Self {
            db: Arc::new(Mutex::new(conn)),
        };
        Ok(store)
    }

    /// In-memory store for tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory store")?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create the schema. Idempotent; safe to call on every startup.
    pub async fn init(&self) -> Result<()> {
        let db = self.db.lock().await;
        db.execute_batch(CREATE_TABLES_SQL)
            .context("Failed to create result store schema")?;
        Ok(())
    }

    /// Persist one completed analysis, returning the stored record.
    ///
    /// Extracts the decision marker from the report text and appends exactly
    /// one row.
    pub async fn persist(&self, ticker: &str, report_text: &str) -> Result<AnalysisRecord> {
        let decision = TradeDecision::extract(report_text);
        let timestamp = Utc::now();

        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO trade_analysis (timestamp, ticker, decision, full_report)
             VALUES (?1, ?2, ?3, ?4)",
            params![timestamp.to_rfc3339(), ticker, decision.as_str(), report_text],
        )
        .with_context(|| format!("Failed to persist analysis for {}", ticker))?;

        let id = db.last_insert_rowid();
        debug!(ticker = %ticker, id, decision = %decision, "Persisted analysis record");

        Ok(AnalysisRecord {
            id,
            timestamp,
            ticker: ticker.to_string(),
            decision,
            full_report: report_text.to_string(),
        })
    }

    /// Latest records, newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<AnalysisRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT id, timestamp, ticker, decision, full_report
             FROM trade_analysis ORDER BY id DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            let timestamp: String = row.get(1)?;
            let decision: String = row.get(3)?;
            Ok(AnalysisRecord {
                id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| DateTime::<Utc>::UNIX_EPOCH),
                ticker: row.get(2)?,
                decision: TradeDecision::from_str(&decision),
                full_report: row.get(4)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.context("Failed to read analysis record")?);
        }
        Ok(records)
    }

    /// Number of persisted records.
    pub async fn count(&self) -> Result<usize> {
        let db = self.db.lock().await;
        let count: i64 = db.query_row("SELECT COUNT(*) FROM trade_analysis", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> ResultStore {
        let store = ResultStore::in_memory().unwrap();
        store.init().await.unwrap();
        store
    }

    #[test]
    fn test_decision_extraction() {
        assert_eq!(
            TradeDecision::extract("analysis...\nDECISION: BUY\nrationale"),
            TradeDecision::Buy
        );
        assert_eq!(
            TradeDecision::extract("...DECISION: SELL..."),
            TradeDecision::Sell
        );
        assert_eq!(TradeDecision::extract("no marker present"), TradeDecision::Hold);
        // Lowercase markers do not match; the contract is the literal string
        assert_eq!(TradeDecision::extract("decision: buy"), TradeDecision::Hold);
    }

    #[tokio::test]
    async fn test_persist_extracts_sell() {
        let store = store().await;
        let record = store
            .persist("AAPL", "summary...DECISION: SELL...details")
            .await
            .unwrap();

        assert_eq!(record.decision, TradeDecision::Sell);
        assert_eq!(record.ticker, "AAPL");
        assert!(record.id > 0);
    }

    #[tokio::test]
    async fn test_persist_defaults_to_hold() {
        let store = store().await;
        let record = store.persist("AAPL", "no marker present").await.unwrap();
        assert_eq!(record.decision, TradeDecision::Hold);
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let store = store().await;
        store.init().await.unwrap();
        store.init().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_records_are_appended_and_readable() {
        let store = store().await;
        store.persist("AAPL", "DECISION: BUY").await.unwrap();
        store.persist("TSLA", "DECISION: SELL").await.unwrap();
        store.persist("NVDA", "thinking...").await.unwrap();

        assert_eq!(store.count().await.unwrap(), 3);

        let recent = store.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        // Newest first
        assert_eq!(recent[0].ticker, "NVDA");
        assert_eq!(recent[0].decision, TradeDecision::Hold);
        assert_eq!(recent[1].ticker, "TSLA");
    }

    #[tokio::test]
    async fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pulse.db");

        let store = ResultStore::open(&path).unwrap();
        store.init().await.unwrap();
        store.persist("AAPL", "DECISION: BUY").await.unwrap();

        assert!(path.exists());
    }
}
