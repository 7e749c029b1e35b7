//! Report Service
//!
//! Reduces persisted signal rows into per-security summaries and the plain
//! payload structures the presentation layer serializes. Nothing here is
//! persisted; every call recomputes from current bar + signal state.

use crate::db::sqlite::models::JoinedBarRow;
use crate::error::{AppError, Result};
use crate::state::AppState;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::info;

/// Column order of report rows, kept for presentation parity.
pub const COLUMN_NAMES: [&str; 14] = [
    "symbol",
    "trade_date",
    "open",
    "high",
    "low",
    "close",
    "prev_close",
    "pct_change",
    "volume",
    "buy_price",
    "ma120",
    "ma250",
    "name",
    "sell_price",
];

/// Covered trading-date span
#[derive(Debug, Clone, Serialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
    pub days: usize,
}

/// One bar joined with its signal values, NULLs normalized to 0.0.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub symbol: String,
    pub trade_date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub prev_close: f64,
    pub pct_change: f64,
    pub volume: f64,
    pub buy_price: f64,
    pub ma120: f64,
    pub ma250: f64,
    pub name: String,
    pub sell_price: f64,
}

impl From<JoinedBarRow> for ReportRow {
    fn from(row: JoinedBarRow) -> Self {
        Self {
            symbol: row.symbol,
            trade_date: row.trade_date,
            open: row.open.unwrap_or(0.0),
            high: row.high.unwrap_or(0.0),
            low: row.low.unwrap_or(0.0),
            close: row.close.unwrap_or(0.0),
            prev_close: row.prev_close.unwrap_or(0.0),
            pct_change: row.pct_change.unwrap_or(0.0),
            volume: row.volume.unwrap_or(0.0),
            buy_price: row.buy_price.unwrap_or(0.0),
            ma120: row.ma120.unwrap_or(0.0),
            ma250: row.ma250.unwrap_or(0.0),
            name: row.name,
            sell_price: row.sell_price.unwrap_or(0.0),
        }
    }
}

/// Per-security return summary
#[derive(Debug, Clone, Serialize)]
pub struct StockReturnSummary {
    pub symbol: String,
    pub name: String,
    /// In-window bars carrying a buy or sell signal
    pub signal_count: i64,
    /// Mean earnings rate over exactly those bars
    pub avg_return_rate: f64,
}

/// Listing payload for all stocks with in-window signals
#[derive(Debug, Clone, Serialize)]
pub struct StocksReport {
    pub column_names: Vec<String>,
    /// Per-stock row sequences, symbol ascending
    pub data: Vec<Vec<ReportRow>>,
    pub stock_count: usize,
    pub total_stocks: i64,
    pub date_range: DateRange,
    /// Ranked descending by average return rate
    pub stock_returns: Vec<StockReturnSummary>,
}

/// Payload for a single security
#[derive(Debug, Clone, Serialize)]
pub struct SingleStockReport {
    pub column_names: Vec<String>,
    pub data: Vec<ReportRow>,
    pub has_signal: bool,
    pub date_range: DateRange,
    pub return_info: StockReturnSummary,
}

/// Basic stock identity
#[derive(Debug, Clone, Serialize)]
pub struct StockInfo {
    pub symbol: String,
    pub name: String,
}

/// Full universe listing, not restricted to signal-bearing stocks
#[derive(Debug, Clone, Serialize)]
pub struct StockListing {
    pub stocks: Vec<StockInfo>,
    pub total_count: usize,
    pub database_total: i64,
    pub date_range: DateRange,
}

/// Report service for business logic
pub struct ReportService;

impl ReportService {
    /// Build the ranked report of all stocks with in-window signals.
    pub async fn signals_report(state: &AppState, lookback_days: usize) -> Result<StocksReport> {
        let (dates, range) = resolve_window(state, lookback_days)?;
        let cutoff = &dates[dates.len() - 1];

        let total_stocks = state.sqlite.count_symbols()?;
        let symbols = state.sqlite.symbols_with_signals(cutoff)?;
        if symbols.is_empty() {
            return Err(AppError::NoSignals);
        }
        info!(
            "{} of {} stocks carry signals in the last {} trading dates",
            symbols.len(),
            total_stocks,
            dates.len()
        );

        let mut data = Vec::with_capacity(symbols.len());
        let mut stock_returns = Vec::with_capacity(symbols.len());

        for symbol in &symbols {
            let rows = state.sqlite.joined_rows(symbol, cutoff)?;
            if rows.is_empty() {
                continue;
            }

            let name = rows[0].name.clone();
            let (signal_count, avg_return_rate) = state.sqlite.signal_stats(symbol, cutoff)?;

            stock_returns.push(StockReturnSummary {
                symbol: symbol.clone(),
                name,
                signal_count,
                avg_return_rate,
            });
            data.push(rows.into_iter().map(ReportRow::from).collect());
        }

        rank_by_return(&mut stock_returns);

        Ok(StocksReport {
            column_names: column_names(),
            stock_count: data.len(),
            data,
            total_stocks,
            date_range: range,
            stock_returns,
        })
    }

    /// Build the payload for one security.
    pub async fn single_stock(
        state: &AppState,
        symbol: &str,
        lookback_days: usize,
    ) -> Result<SingleStockReport> {
        let (dates, range) = resolve_window(state, lookback_days)?;
        let cutoff = &dates[dates.len() - 1];

        let rows = state.sqlite.joined_rows(symbol, cutoff)?;
        if rows.is_empty() {
            return Err(AppError::NotFound(symbol.to_string()));
        }

        let name = rows[0].name.clone();
        let data: Vec<ReportRow> = rows.into_iter().map(ReportRow::from).collect();
        let has_signal = data.iter().any(|r| r.buy_price > 0.0 || r.sell_price > 0.0);

        let (signal_count, avg_return_rate) = state.sqlite.signal_stats(symbol, cutoff)?;

        Ok(SingleStockReport {
            column_names: column_names(),
            data,
            has_signal,
            date_range: range,
            return_info: StockReturnSummary {
                symbol: symbol.to_string(),
                name,
                signal_count,
                avg_return_rate,
            },
        })
    }

    /// Ranked return summaries only, without the row payloads.
    pub async fn stock_returns(
        state: &AppState,
        lookback_days: usize,
    ) -> Result<Vec<StockReturnSummary>> {
        let (dates, _) = resolve_window(state, lookback_days)?;
        let cutoff = &dates[dates.len() - 1];

        let symbols = state.sqlite.symbols_with_signals(cutoff)?;
        if symbols.is_empty() {
            return Err(AppError::NoSignals);
        }

        let mut summaries = Vec::with_capacity(symbols.len());
        for symbol in &symbols {
            let (signal_count, avg_return_rate) = state.sqlite.signal_stats(symbol, cutoff)?;
            let name = state
                .sqlite
                .joined_rows(symbol, cutoff)?
                .first()
                .map(|r| r.name.clone())
                .unwrap_or_default();

            summaries.push(StockReturnSummary {
                symbol: symbol.clone(),
                name,
                signal_count,
                avg_return_rate,
            });
        }

        rank_by_return(&mut summaries);

        Ok(summaries)
    }

    /// Every stock active in the window, signal or not.
    pub async fn all_stocks(state: &AppState, lookback_days: usize) -> Result<StockListing> {
        let (dates, range) = resolve_window(state, lookback_days)?;
        let cutoff = &dates[dates.len() - 1];

        let database_total = state.sqlite.count_symbols()?;
        let stocks: Vec<StockInfo> = state
            .sqlite
            .active_stocks(cutoff)?
            .into_iter()
            .map(|(symbol, name)| StockInfo { symbol, name })
            .collect();

        Ok(StockListing {
            total_count: stocks.len(),
            stocks,
            database_total,
            date_range: range,
        })
    }
}

fn column_names() -> Vec<String> {
    COLUMN_NAMES.iter().map(|s| s.to_string()).collect()
}

fn resolve_window(state: &AppState, lookback_days: usize) -> Result<(Vec<String>, DateRange)> {
    let dates = state.sqlite.latest_trading_dates(lookback_days)?;
    if dates.is_empty() {
        return Err(AppError::NoTradingDates);
    }

    let range = DateRange {
        start: dates[dates.len() - 1].clone(),
        end: dates[0].clone(),
        days: dates.len(),
    };

    Ok((dates, range))
}

/// Descending by average return rate; ties broken by symbol ascending so the
/// ordering is stable across runs.
fn rank_by_return(summaries: &mut [StockReturnSummary]) {
    summaries.sort_by(|a, b| {
        b.avg_return_rate
            .partial_cmp(&a.avg_return_rate)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::models::{NewBar, SignalRecord};

    fn new_bar(symbol: &str, date: &str, close: f64) -> NewBar {
        NewBar {
            symbol: symbol.to_string(),
            trade_date: date.to_string(),
            open: Some(close),
            high: Some(close),
            low: Some(close),
            close: Some(close),
            prev_close: Some(close),
            pct_change: Some(0.0),
            volume: Some(1000.0),
            ma120: None,
            ma250: None,
            name: format!("{symbol} Co"),
        }
    }

    fn bar_id(state: &AppState, symbol: &str, date: &str) -> i64 {
        let bars = state
            .sqlite
            .fetch_bars(&[symbol.to_string()], "1970-01-01")
            .unwrap();
        bars.iter()
            .find(|b| b.trade_date == date)
            .map(|b| b.id)
            .unwrap()
    }

    fn seed_signal(state: &AppState, symbol: &str, date: &str, buy: f64, sell: f64, rate: f64) {
        let id = bar_id(state, symbol, date);
        state
            .sqlite
            .upsert_signal(&SignalRecord {
                bar_id: id,
                buy_price: buy,
                sell_price: sell,
                earnings_rate: rate,
            })
            .unwrap();
    }

    /// Two signal-bearing stocks plus one without signals.
    fn seed_report_fixture(state: &AppState) {
        for date in ["2024-01-02", "2024-01-03", "2024-01-04"] {
            state.sqlite.insert_bars(&[new_bar("000001.SZ", date, 12.0)]).unwrap();
            state.sqlite.insert_bars(&[new_bar("000002.SZ", date, 30.0)]).unwrap();
            state.sqlite.insert_bars(&[new_bar("600000.SH", date, 8.0)]).unwrap();
        }

        // 000001.SZ: two sells averaging 20.0
        seed_signal(state, "000001.SZ", "2024-01-02", 0.0, 12.0, 25.0);
        seed_signal(state, "000001.SZ", "2024-01-03", 0.0, 12.0, 15.0);
        // 000002.SZ: one buy, no earnings
        seed_signal(state, "000002.SZ", "2024-01-03", 30.0, 0.0, 0.0);
    }

    #[tokio::test]
    async fn test_report_requires_trading_dates() {
        let state = AppState::in_memory().unwrap();
        let err = ReportService::signals_report(&state, 20).await.unwrap_err();
        assert!(matches!(err, AppError::NoTradingDates));
    }

    #[tokio::test]
    async fn test_report_without_signals_is_no_signals() {
        let state = AppState::in_memory().unwrap();
        state.sqlite.insert_bars(&[new_bar("000001.SZ", "2024-01-02", 10.0)]).unwrap();

        let err = ReportService::signals_report(&state, 20).await.unwrap_err();
        assert!(matches!(err, AppError::NoSignals));
    }

    #[tokio::test]
    async fn test_report_scope_and_ranking() {
        let state = AppState::in_memory().unwrap();
        seed_report_fixture(&state);

        let report = ReportService::signals_report(&state, 20).await.unwrap();

        // The signal-free stock is excluded from the listing but counted in
        // the universe total
        assert_eq!(report.stock_count, 2);
        assert_eq!(report.total_stocks, 3);
        assert_eq!(report.date_range.days, 3);
        assert_eq!(report.date_range.start, "2024-01-02");
        assert_eq!(report.date_range.end, "2024-01-04");

        // Ranked descending by average return rate
        assert_eq!(report.stock_returns[0].symbol, "000001.SZ");
        assert!((report.stock_returns[0].avg_return_rate - 20.0).abs() < 1e-9);
        assert_eq!(report.stock_returns[0].signal_count, 2);
        assert_eq!(report.stock_returns[1].symbol, "000002.SZ");
        assert_eq!(report.stock_returns[1].avg_return_rate, 0.0);

        for pair in report.stock_returns.windows(2) {
            assert!(pair[0].avg_return_rate >= pair[1].avg_return_rate);
        }
    }

    #[tokio::test]
    async fn test_signal_free_bars_excluded_from_average() {
        let state = AppState::in_memory().unwrap();
        seed_report_fixture(&state);

        // 2024-01-04 has no signal row for 000001.SZ; if it were zero-filled
        // into the mean, the average would drop below 20.0
        let report = ReportService::signals_report(&state, 20).await.unwrap();
        assert!((report.stock_returns[0].avg_return_rate - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_report_rows_normalize_nulls() {
        let state = AppState::in_memory().unwrap();
        let mut sparse = new_bar("000001.SZ", "2024-01-02", 10.0);
        sparse.volume = None;
        sparse.pct_change = None;
        state.sqlite.insert_bars(&[sparse]).unwrap();
        seed_signal(&state, "000001.SZ", "2024-01-02", 10.0, 0.0, 0.0);

        let report = ReportService::signals_report(&state, 20).await.unwrap();
        let row = &report.data[0][0];
        assert_eq!(row.volume, 0.0);
        assert_eq!(row.pct_change, 0.0);
        assert_eq!(row.buy_price, 10.0);
        assert_eq!(row.sell_price, 0.0);
        assert_eq!(row.ma120, 0.0);
    }

    #[tokio::test]
    async fn test_ranking_tie_broken_by_symbol() {
        let state = AppState::in_memory().unwrap();
        for symbol in ["000002.SZ", "000001.SZ"] {
            state.sqlite.insert_bars(&[new_bar(symbol, "2024-01-02", 10.0)]).unwrap();
            seed_signal(&state, symbol, "2024-01-02", 10.0, 0.0, 0.0);
        }

        let summaries = ReportService::stock_returns(&state, 20).await.unwrap();
        assert_eq!(summaries[0].symbol, "000001.SZ");
        assert_eq!(summaries[1].symbol, "000002.SZ");
    }

    #[tokio::test]
    async fn test_single_stock_report() {
        let state = AppState::in_memory().unwrap();
        seed_report_fixture(&state);

        let report = ReportService::single_stock(&state, "000001.SZ", 20).await.unwrap();
        assert!(report.has_signal);
        assert_eq!(report.data.len(), 3);
        assert_eq!(report.return_info.signal_count, 2);
        assert!((report.return_info.avg_return_rate - 20.0).abs() < 1e-9);
        assert_eq!(report.return_info.name, "000001.SZ Co");

        let quiet = ReportService::single_stock(&state, "600000.SH", 20).await.unwrap();
        assert!(!quiet.has_signal);
        assert_eq!(quiet.return_info.signal_count, 0);
    }

    #[tokio::test]
    async fn test_single_stock_unknown_symbol() {
        let state = AppState::in_memory().unwrap();
        seed_report_fixture(&state);

        let err = ReportService::single_stock(&state, "999999.SZ", 20).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_all_stocks_listing() {
        let state = AppState::in_memory().unwrap();
        seed_report_fixture(&state);

        let listing = ReportService::all_stocks(&state, 20).await.unwrap();
        assert_eq!(listing.total_count, 3);
        assert_eq!(listing.database_total, 3);
        assert_eq!(listing.stocks[0].symbol, "000001.SZ");
        assert_eq!(listing.stocks[0].name, "000001.SZ Co");
    }

    #[tokio::test]
    async fn test_report_serializes_for_presentation() {
        let state = AppState::in_memory().unwrap();
        seed_report_fixture(&state);

        let report = ReportService::signals_report(&state, 20).await.unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["column_names"].as_array().unwrap().len(), 14);
        assert_eq!(json["stock_count"], 2);
        assert_eq!(json["stock_returns"][0]["symbol"], "000001.SZ");
        assert_eq!(json["date_range"]["days"], 3);
    }
}
