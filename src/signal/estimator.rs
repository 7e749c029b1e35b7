//! Forward-looking return estimate for sell signals
//!
//! Measures the move a seller at the signal close could have captured
//! against the lowest subsequent close in the fetched sequence. The horizon
//! is whatever the caller fetched; there is no separate holding period.

use crate::db::sqlite::models::Bar;

/// Estimated percentage gain for a sell at index `i`.
///
/// Scans closes strictly after `i`; bars with a missing close are skipped.
/// Returns 0.0 when `i` is the last bar or when no later close undercuts
/// the signal close.
pub fn estimate_sell_return(bars: &[Bar], i: usize) -> f64 {
    let sell_price = match bars.get(i).and_then(|b| b.close) {
        Some(close) if close > 0.0 => close,
        _ => return 0.0,
    };

    let min_close = bars[i + 1..]
        .iter()
        .filter_map(|b| b.close)
        .fold(f64::INFINITY, f64::min);

    if min_close >= sell_price {
        return 0.0;
    }

    (sell_price - min_close) / sell_price * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(close: Option<f64>) -> Bar {
        Bar {
            id: 0,
            symbol: "000001.SZ".to_string(),
            trade_date: "2024-01-02".to_string(),
            open: close,
            high: close,
            low: close,
            close,
            prev_close: close,
            pct_change: Some(0.0),
            volume: Some(1000.0),
            ma120: None,
            ma250: None,
            name: "Test Co".to_string(),
        }
    }

    fn series(closes: &[f64]) -> Vec<Bar> {
        closes.iter().map(|&c| bar(Some(c))).collect()
    }

    #[test]
    fn test_estimate_against_minimum_subsequent_close() {
        // Sell at 12, later closes [10, 9, 11] -> (12 - 9) / 12 * 100 = 25.0
        let bars = series(&[12.0, 10.0, 9.0, 11.0]);
        assert_eq!(estimate_sell_return(&bars, 0), 25.0);
    }

    #[test]
    fn test_last_bar_yields_zero() {
        let bars = series(&[10.0, 12.0]);
        assert_eq!(estimate_sell_return(&bars, 1), 0.0);
    }

    #[test]
    fn test_no_favorable_move_yields_zero() {
        let bars = series(&[12.0, 12.5, 13.0, 14.0]);
        assert_eq!(estimate_sell_return(&bars, 0), 0.0);
    }

    #[test]
    fn test_missing_closes_are_skipped() {
        let mut bars = series(&[12.0, 10.0, 9.0, 11.0]);
        bars[2].close = None;
        // Minimum is taken over the remaining closes [10, 11]
        let rate = estimate_sell_return(&bars, 0);
        assert!((rate - (12.0 - 10.0) / 12.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_signal_close_yields_zero() {
        let bars = vec![bar(None), bar(Some(9.0))];
        assert_eq!(estimate_sell_return(&bars, 0), 0.0);
    }
}
