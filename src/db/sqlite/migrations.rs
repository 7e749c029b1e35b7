//! SQLite database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Run all database migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    // Create migrations table
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    // Run each migration
    run_migration(conn, "001_daily_bars", CREATE_DAILY_BARS_TABLE)?;
    run_migration(conn, "002_bar_signals", CREATE_BAR_SIGNALS_TABLE)?;
    run_migration(conn, "003_indexes", CREATE_INDEXES)?;

    tracing::info!("Database migrations completed");
    Ok(())
}

fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
    // Check if migration already applied
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM migrations WHERE name = ?)",
        [name],
        |row| row.get(0),
    )?;

    if !exists {
        tracing::info!("Running migration: {}", name);
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO migrations (name) VALUES (?)", [name])?;
    }

    Ok(())
}

const CREATE_DAILY_BARS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS daily_bars (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol TEXT NOT NULL,
    trade_date TEXT NOT NULL,
    open REAL,
    high REAL,
    low REAL,
    close REAL,
    prev_close REAL,
    pct_change REAL,
    volume REAL,
    ma120 REAL,
    ma250 REAL,
    name TEXT NOT NULL DEFAULT '',
    UNIQUE (symbol, trade_date)
);
"#;

const CREATE_BAR_SIGNALS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS bar_signals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    bar_id INTEGER NOT NULL UNIQUE REFERENCES daily_bars(id),
    buy_price REAL NOT NULL DEFAULT 0,
    sell_price REAL NOT NULL DEFAULT 0,
    earnings_rate REAL NOT NULL DEFAULT 0
);
"#;

const CREATE_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_daily_bars_symbol ON daily_bars (symbol);
CREATE INDEX IF NOT EXISTS idx_daily_bars_trade_date ON daily_bars (trade_date);
CREATE INDEX IF NOT EXISTS idx_daily_bars_symbol_trade_date ON daily_bars (symbol, trade_date);
CREATE INDEX IF NOT EXISTS idx_bar_signals_bar_id ON bar_signals (bar_id);
CREATE INDEX IF NOT EXISTS idx_bar_signals_prices ON bar_signals (buy_price, sell_price);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, 3);
    }

    #[test]
    fn test_bar_signals_unique_bar_id() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO daily_bars (symbol, trade_date, name) VALUES ('000001.SZ', '2024-01-02', 'PAB')",
            [],
        )
        .unwrap();
        let bar_id = conn.last_insert_rowid();

        conn.execute(
            "INSERT INTO bar_signals (bar_id, buy_price) VALUES (?1, 10.0)",
            [bar_id],
        )
        .unwrap();

        let dup = conn.execute(
            "INSERT INTO bar_signals (bar_id, buy_price) VALUES (?1, 11.0)",
            [bar_id],
        );
        assert!(dup.is_err());
    }
}
