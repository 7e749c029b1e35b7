//! SQLite database models

use serde::{Deserialize, Serialize};

/// One security's OHLCV record for one trading day.
///
/// Numeric fields are nullable because illiquid days can be ingested with
/// gaps; the detector refuses any window containing such a bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    /// Storage row id; the key signal records attach to
    pub id: i64,
    pub symbol: String,
    /// ISO `YYYY-MM-DD`; lexical order equals date order
    pub trade_date: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub prev_close: Option<f64>,
    pub pct_change: Option<f64>,
    pub volume: Option<f64>,
    /// Precomputed moving averages, informational only
    pub ma120: Option<f64>,
    pub ma250: Option<f64>,
    pub name: String,
}

/// Bar payload for ingestion; the storage layer assigns the row id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBar {
    pub symbol: String,
    pub trade_date: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub prev_close: Option<f64>,
    pub pct_change: Option<f64>,
    pub volume: Option<f64>,
    pub ma120: Option<f64>,
    pub ma250: Option<f64>,
    pub name: String,
}

/// Derived signal row, one-to-one with a bar.
///
/// A price of 0 means "no signal on that side"; `earnings_rate` is only
/// meaningful when `sell_price > 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub bar_id: i64,
    pub buy_price: f64,
    pub sell_price: f64,
    pub earnings_rate: f64,
}

/// Bar left-joined to its signal row; signal columns are NULL when no
/// signal record exists for the bar.
#[derive(Debug, Clone)]
pub struct JoinedBarRow {
    pub symbol: String,
    pub trade_date: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub prev_close: Option<f64>,
    pub pct_change: Option<f64>,
    pub volume: Option<f64>,
    pub buy_price: Option<f64>,
    pub ma120: Option<f64>,
    pub ma250: Option<f64>,
    pub name: String,
    pub sell_price: Option<f64>,
}
