//! Validated, immutable price series for one instrument.

use crate::domain::error::StockscreenError;
use crate::domain::ohlcv::Bar;

/// Time-ordered OHLCV history for a single instrument code.
///
/// Construction validates every bar and the date ordering; once built the
/// series cannot be mutated, so downstream indicator code never re-checks.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    code: String,
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Build a series, rejecting malformed bars and non-increasing dates.
    pub fn new(code: impl Into<String>, bars: Vec<Bar>) -> Result<Self, StockscreenError> {
        let code = code.into();
        for (i, bar) in bars.iter().enumerate() {
            if let Some(reason) = bar.invariant_violation() {
                return Err(StockscreenError::MalformedBar {
                    code,
                    date: bar.date,
                    reason: reason.to_string(),
                });
            }
            if i > 0 && bar.date <= bars[i - 1].date {
                return Err(StockscreenError::MalformedBar {
                    code,
                    date: bar.date,
                    reason: "dates not strictly increasing".to_string(),
                });
            }
        }
        Ok(Self { code, bars })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Close of the latest bar relative to the bar before it, as a percentage.
    /// `None` for series shorter than two bars.
    pub fn latest_change_pct(&self) -> Option<f64> {
        let n = self.bars.len();
        if n < 2 {
            return None;
        }
        Some(self.bars[n - 1].change_pct(self.bars[n - 2].close))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bar(day: u32, close: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 1000.0,
            amount: None,
        }
    }

    #[test]
    fn valid_series_constructs() {
        let series =
            PriceSeries::new("600000", vec![make_bar(1, 10.0), make_bar(2, 10.5)]).unwrap();
        assert_eq!(series.code(), "600000");
        assert_eq!(series.len(), 2);
        assert!(!series.is_empty());
        assert!((series.last().unwrap().close - 10.5).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_series_is_allowed() {
        let series = PriceSeries::new("600000", Vec::new()).unwrap();
        assert!(series.is_empty());
        assert!(series.last().is_none());
    }

    #[test]
    fn malformed_bar_rejected() {
        let mut bad = make_bar(2, 10.0);
        bad.high = 5.0;
        let err = PriceSeries::new("600000", vec![make_bar(1, 10.0), bad]).unwrap_err();
        assert!(matches!(
            err,
            StockscreenError::MalformedBar { code, .. } if code == "600000"
        ));
    }

    #[test]
    fn duplicate_date_rejected() {
        let err =
            PriceSeries::new("600000", vec![make_bar(5, 10.0), make_bar(5, 11.0)]).unwrap_err();
        assert!(matches!(
            err,
            StockscreenError::MalformedBar { reason, .. } if reason.contains("strictly increasing")
        ));
    }

    #[test]
    fn out_of_order_dates_rejected() {
        let err =
            PriceSeries::new("600000", vec![make_bar(5, 10.0), make_bar(3, 11.0)]).unwrap_err();
        assert!(matches!(err, StockscreenError::MalformedBar { .. }));
    }

    #[test]
    fn latest_change_pct_from_last_two_closes() {
        let series =
            PriceSeries::new("600000", vec![make_bar(1, 100.0), make_bar(2, 104.0)]).unwrap();
        assert!((series.latest_change_pct().unwrap() - 4.0).abs() < 1e-10);
    }

    #[test]
    fn latest_change_pct_needs_two_bars() {
        let series = PriceSeries::new("600000", vec![make_bar(1, 100.0)]).unwrap();
        assert!(series.latest_change_pct().is_none());
    }
}
