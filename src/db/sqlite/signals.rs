//! Signal record persistence and joined report queries
//!
//! Signal rows are keyed by the bar row id. The upsert is a single atomic
//! `ON CONFLICT` statement, so concurrent writers never race on id
//! assignment and recomputation can never duplicate a row.

use crate::db::sqlite::models::{JoinedBarRow, SignalRecord};
use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};

/// Fetch the signal row for a bar, if one exists.
pub fn signal_for_bar(conn: &Connection, bar_id: i64) -> Result<Option<SignalRecord>> {
    let record = conn
        .query_row(
            "SELECT bar_id, buy_price, sell_price, earnings_rate
             FROM bar_signals WHERE bar_id = ?1",
            params![bar_id],
            |row| {
                Ok(SignalRecord {
                    bar_id: row.get(0)?,
                    buy_price: row.get(1)?,
                    sell_price: row.get(2)?,
                    earnings_rate: row.get(3)?,
                })
            },
        )
        .optional()?;

    Ok(record)
}

/// Insert or overwrite a single signal row.
pub fn upsert_signal(conn: &Connection, record: &SignalRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO bar_signals (bar_id, buy_price, sell_price, earnings_rate)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (bar_id) DO UPDATE SET
             buy_price = excluded.buy_price,
             sell_price = excluded.sell_price,
             earnings_rate = excluded.earnings_rate",
        params![
            record.bar_id,
            record.buy_price,
            record.sell_price,
            record.earnings_rate
        ],
    )?;

    Ok(())
}

/// Upsert all signal rows for one security in a single transaction.
///
/// Commit granularity is per security: either every row lands or none do.
pub fn upsert_signals(conn: &mut Connection, records: &[SignalRecord]) -> Result<()> {
    let tx = conn.transaction()?;

    {
        let mut stmt = tx.prepare(
            "INSERT INTO bar_signals (bar_id, buy_price, sell_price, earnings_rate)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (bar_id) DO UPDATE SET
                 buy_price = excluded.buy_price,
                 sell_price = excluded.sell_price,
                 earnings_rate = excluded.earnings_rate",
        )?;

        for record in records {
            stmt.execute(params![
                record.bar_id,
                record.buy_price,
                record.sell_price,
                record.earnings_rate
            ])?;
        }
    }

    tx.commit()?;

    Ok(())
}

/// Symbols with at least one in-window bar carrying a buy or sell signal.
pub fn symbols_with_signals(conn: &Connection, since: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT a.symbol
         FROM daily_bars a
         JOIN bar_signals s ON a.id = s.bar_id
         WHERE a.trade_date >= ?1 AND (s.buy_price > 0 OR s.sell_price > 0)
         ORDER BY a.symbol",
    )?;

    let symbols = stmt
        .query_map(params![since], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;

    Ok(symbols)
}

/// One symbol's bars left-joined to their signal rows, in date order.
pub fn joined_rows(conn: &Connection, symbol: &str, since: &str) -> Result<Vec<JoinedBarRow>> {
    let mut stmt = conn.prepare(
        "SELECT a.symbol, a.trade_date, a.open, a.high, a.low, a.close, a.prev_close,
                a.pct_change, a.volume, s.buy_price, a.ma120, a.ma250, a.name, s.sell_price
         FROM daily_bars a
         LEFT JOIN bar_signals s ON a.id = s.bar_id
         WHERE a.symbol = ?1 AND a.trade_date >= ?2
         ORDER BY a.trade_date",
    )?;

    let rows = stmt
        .query_map(params![symbol, since], |row| {
            Ok(JoinedBarRow {
                symbol: row.get(0)?,
                trade_date: row.get(1)?,
                open: row.get(2)?,
                high: row.get(3)?,
                low: row.get(4)?,
                close: row.get(5)?,
                prev_close: row.get(6)?,
                pct_change: row.get(7)?,
                volume: row.get(8)?,
                buy_price: row.get(9)?,
                ma120: row.get(10)?,
                ma250: row.get(11)?,
                name: row.get(12)?,
                sell_price: row.get(13)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Signal count and average earnings rate for one symbol, scoped to
/// in-window bars that actually carry a signal.
pub fn signal_stats(conn: &Connection, symbol: &str, since: &str) -> Result<(i64, f64)> {
    let (count, avg): (i64, Option<f64>) = conn.query_row(
        "SELECT COUNT(s.id), AVG(s.earnings_rate)
         FROM bar_signals s
         JOIN daily_bars a ON s.bar_id = a.id
         WHERE a.symbol = ?1 AND a.trade_date >= ?2
           AND (s.buy_price > 0 OR s.sell_price > 0)",
        params![symbol, since],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok((count, avg.unwrap_or(0.0)))
}
