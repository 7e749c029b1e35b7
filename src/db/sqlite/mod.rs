//! SQLite database module

pub mod models;
mod bars;
mod migrations;
mod signals;

use crate::config::DbConfig;
use crate::error::Result;
use models::{Bar, JoinedBarRow, NewBar, SignalRecord};
use parking_lot::Mutex;
use rusqlite::Connection;

/// SQLite database wrapper
///
/// The connection is acquired per operation and released when the guard
/// drops, so no caller can hold the database across an await point.
pub struct SqliteDb {
    conn: Mutex<Connection>,
}

impl SqliteDb {
    /// Open (or create) the database described by the configuration.
    pub fn new(config: &DbConfig) -> Result<Self> {
        let conn = Connection::open(&config.path)?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.busy_timeout(config.busy_timeout())?;

        let db = Self {
            conn: Mutex::new(conn),
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// In-memory database, used by tests and ephemeral tooling.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;

        let db = Self {
            conn: Mutex::new(conn),
        };

        db.run_migrations()?;

        Ok(db)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock();
        migrations::run_migrations(&conn)
    }

    // ========== Bar Methods ==========

    /// Most recent distinct trading dates, newest first
    pub fn latest_trading_dates(&self, limit: usize) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        bars::latest_trading_dates(&conn, limit)
    }

    /// Total number of distinct symbols
    pub fn count_symbols(&self) -> Result<i64> {
        let conn = self.conn.lock();
        bars::count_symbols(&conn)
    }

    /// Every distinct symbol
    pub fn list_symbols(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        bars::list_symbols(&conn)
    }

    /// Symbols that traded on or after the cutoff
    pub fn list_active_symbols(&self, since: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        bars::list_active_symbols(&conn, since)
    }

    /// Distinct symbol/name pairs active since the cutoff
    pub fn active_stocks(&self, since: &str) -> Result<Vec<(String, String)>> {
        let conn = self.conn.lock();
        bars::active_stocks(&conn, since)
    }

    /// All bars for a symbol batch since the cutoff, ordered by symbol then date
    pub fn fetch_bars(&self, symbols: &[String], since: &str) -> Result<Vec<Bar>> {
        let conn = self.conn.lock();
        bars::fetch_bars(&conn, symbols, since)
    }

    /// Ingest bars (seed path; bar rows are otherwise externally owned)
    pub fn insert_bars(&self, new_bars: &[NewBar]) -> Result<usize> {
        let mut conn = self.conn.lock();
        bars::insert_bars(&mut conn, new_bars)
    }

    // ========== Signal Methods ==========

    /// Fetch the signal row for a bar, if present
    pub fn signal_for_bar(&self, bar_id: i64) -> Result<Option<SignalRecord>> {
        let conn = self.conn.lock();
        signals::signal_for_bar(&conn, bar_id)
    }

    /// Insert or overwrite a single signal row
    pub fn upsert_signal(&self, record: &SignalRecord) -> Result<()> {
        let conn = self.conn.lock();
        signals::upsert_signal(&conn, record)
    }

    /// Commit one security's signal rows as a unit
    pub fn upsert_signals(&self, records: &[SignalRecord]) -> Result<()> {
        let mut conn = self.conn.lock();
        signals::upsert_signals(&mut conn, records)
    }

    /// Symbols with at least one in-window buy or sell signal
    pub fn symbols_with_signals(&self, since: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        signals::symbols_with_signals(&conn, since)
    }

    /// One symbol's bars left-joined to signal rows
    pub fn joined_rows(&self, symbol: &str, since: &str) -> Result<Vec<JoinedBarRow>> {
        let conn = self.conn.lock();
        signals::joined_rows(&conn, symbol, since)
    }

    /// Signal count and average earnings rate for one symbol
    pub fn signal_stats(&self, symbol: &str, since: &str) -> Result<(i64, f64)> {
        let conn = self.conn.lock();
        signals::signal_stats(&conn, symbol, since)
    }

    /// Raw SQL escape hatch for test fixtures (triggers, fault setup)
    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(sql)?;
        Ok(())
    }
}
