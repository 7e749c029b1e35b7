//! Trailing-window buy/sell detection
//!
//! Pure functions over an ordered bar sequence. The caller is responsible
//! for date ordering; the detector never resorts its input.

use crate::db::sqlite::models::Bar;

/// Look-back width of the moving-average window, in trading days.
pub const DEFAULT_WINDOW: usize = 5;

/// Detection outcome for a single bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Detection {
    pub buy: bool,
    pub sell: bool,
}

impl Detection {
    pub fn fired(&self) -> bool {
        self.buy || self.sell
    }
}

/// Evaluate the buy and sell conditions at index `i`.
///
/// Requires `window` bars of history ending at `i` (inclusive); earlier
/// indices never fire. A window containing any bar with a missing close or
/// volume is rejected outright rather than evaluated on partial data.
///
/// Buy: close below 95% of the window average, volume up more than 10% on
/// the previous day, and price up on the day.
///
/// Sell ("high fund outflow"): close above the window average, volume up
/// more than 10%, and price down on the day.
///
/// The price-direction conditions are opposites, so the two signals are
/// mutually exclusive; a flat day fires neither.
pub fn detect(bars: &[Bar], i: usize, window: usize) -> Detection {
    if window == 0 || i < window || i >= bars.len() {
        return Detection::default();
    }

    let mut closes = Vec::with_capacity(window);
    for bar in &bars[i - window + 1..=i] {
        match (bar.close, bar.volume) {
            (Some(close), Some(_)) => closes.push(close),
            _ => return Detection::default(),
        }
    }

    let ma = closes.iter().sum::<f64>() / closes.len() as f64;

    let (cp, cv) = match (bars[i].close, bars[i].volume) {
        (Some(c), Some(v)) => (c, v),
        _ => return Detection::default(),
    };
    let (pp, pv) = match (bars[i - 1].close, bars[i - 1].volume) {
        (Some(c), Some(v)) => (c, v),
        _ => return Detection::default(),
    };

    let volume_spike = cv > pv * 1.1;

    Detection {
        buy: cp < ma * 0.95 && volume_spike && cp > pp,
        sell: cp > ma && volume_spike && cp < pp,
    }
}
