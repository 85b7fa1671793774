//! OHLCV bar representation.

use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub amount: Option<f64>,
}

impl Bar {
    /// Returns the first violated bar invariant, or `None` for a well-formed bar.
    pub fn invariant_violation(&self) -> Option<&'static str> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite()) {
            return Some("non-finite price");
        }
        if !self.volume.is_finite() {
            return Some("non-finite volume");
        }
        if self.volume < 0.0 {
            return Some("negative volume");
        }
        if self.high < self.open.max(self.close) {
            return Some("high below open/close");
        }
        if self.low > self.open.min(self.close) {
            return Some("low above open/close");
        }
        None
    }

    /// Percentage change of this bar's close against a previous close.
    pub fn change_pct(&self, prev_close: f64) -> f64 {
        if prev_close == 0.0 {
            0.0
        } else {
            (self.close - prev_close) / prev_close * 100.0
        }
    }
}
