//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Engine stages call store methods, they never execute SQL directly.
//!
//! Source tables hold the raw snapshot exactly as ingested, anomalies
//! included. Result tables are rewritten by save_report on every run.

use crate::error::AnalyticsResult;
use chrono::NaiveDateTime;
use rusqlite::Connection;

mod orders;
mod results;

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct MetricsStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl MetricsStore {
    pub fn open(path: &str) -> AnalyticsResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> AnalyticsResult<Self> {
        let conn = Connection::open(":memory:")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases, this returns a new in-memory database (isolated).
    /// For file-based databases, this opens the same file.
    pub fn reopen(&self) -> AnalyticsResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> AnalyticsResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_orders.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_results.sql"))?;
        Ok(())
    }
}

// ── Timestamp mapping ──────────────────────────────────────────

fn ts_to_sql(ts: Option<NaiveDateTime>) -> Option<String> {
    ts.map(|t| t.format(TS_FORMAT).to_string())
}

fn ts_from_sql(idx: usize, value: Option<String>) -> rusqlite::Result<Option<NaiveDateTime>> {
    match value {
        None => Ok(None),
        Some(s) => NaiveDateTime::parse_from_str(&s, TS_FORMAT)
            .map(Some)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            }),
    }
}

fn ts_required(idx: usize, value: String) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&value, TS_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
