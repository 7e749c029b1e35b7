//! Daily bar queries
//!
//! Bars are owned by the ingesting system; this pipeline reads them and only
//! writes through the seed/ingest path.

use crate::db::sqlite::models::{Bar, NewBar};
use crate::error::Result;
use rusqlite::{params, params_from_iter, Connection};

/// Most recent distinct trading dates, newest first.
pub fn latest_trading_dates(conn: &Connection, limit: usize) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT trade_date FROM daily_bars ORDER BY trade_date DESC LIMIT ?1",
    )?;

    let dates = stmt
        .query_map(params![limit], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;

    Ok(dates)
}

/// Total number of distinct symbols in the bar table.
pub fn count_symbols(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(DISTINCT symbol) FROM daily_bars", [], |row| {
        row.get(0)
    })?;
    Ok(count)
}

/// Every distinct symbol, regardless of recent activity.
pub fn list_symbols(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT DISTINCT symbol FROM daily_bars ORDER BY symbol")?;

    let symbols = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;

    Ok(symbols)
}

/// Symbols that traded on or after the cutoff date.
pub fn list_active_symbols(conn: &Connection, since: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT symbol FROM daily_bars WHERE trade_date >= ?1 ORDER BY symbol",
    )?;

    let symbols = stmt
        .query_map(params![since], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;

    Ok(symbols)
}

/// Distinct symbol and display name of every security active since the cutoff.
pub fn active_stocks(conn: &Connection, since: &str) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT symbol, name FROM daily_bars WHERE trade_date >= ?1 ORDER BY symbol",
    )?;

    let stocks = stmt
        .query_map(params![since], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<(String, String)>, _>>()?;

    Ok(stocks)
}

/// Fetch all bars for a set of symbols since the cutoff date in one pass,
/// ordered by symbol then trade date.
pub fn fetch_bars(conn: &Connection, symbols: &[String], since: &str) -> Result<Vec<Bar>> {
    if symbols.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; symbols.len()].join(", ");
    let sql = format!(
        "SELECT id, symbol, trade_date, open, high, low, close, prev_close, pct_change,
                volume, ma120, ma250, name
         FROM daily_bars
         WHERE trade_date >= ? AND symbol IN ({placeholders})
         ORDER BY symbol, trade_date"
    );

    let mut stmt = conn.prepare(&sql)?;

    let params_iter = std::iter::once(since.to_string()).chain(symbols.iter().cloned());
    let bars = stmt
        .query_map(params_from_iter(params_iter), |row| {
            Ok(Bar {
                id: row.get(0)?,
                symbol: row.get(1)?,
                trade_date: row.get(2)?,
                open: row.get(3)?,
                high: row.get(4)?,
                low: row.get(5)?,
                close: row.get(6)?,
                prev_close: row.get(7)?,
                pct_change: row.get(8)?,
                volume: row.get(9)?,
                ma120: row.get(10)?,
                ma250: row.get(11)?,
                name: row.get(12)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(bars)
}

/// Insert or replace bars keyed by (symbol, trade_date).
///
/// Returns the number of rows written.
pub fn insert_bars(conn: &mut Connection, bars: &[NewBar]) -> Result<usize> {
    let tx = conn.transaction()?;

    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO daily_bars
                 (symbol, trade_date, open, high, low, close, prev_close, pct_change,
                  volume, ma120, ma250, name)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT (symbol, trade_date) DO UPDATE SET
                 open = excluded.open, high = excluded.high, low = excluded.low,
                 close = excluded.close, prev_close = excluded.prev_close,
                 pct_change = excluded.pct_change, volume = excluded.volume,
                 ma120 = excluded.ma120, ma250 = excluded.ma250, name = excluded.name",
        )?;

        for bar in bars {
            stmt.execute(params![
                bar.symbol,
                bar.trade_date,
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.prev_close,
                bar.pct_change,
                bar.volume,
                bar.ma120,
                bar.ma250,
                bar.name,
            ])?;
            count += 1;
        }
    }

    tx.commit()?;

    Ok(count)
}
