//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9. All EMAs are seeded from
//! their first input value, so every point is valid from bar 0; early values
//! are simply dominated by the seed.

use crate::domain::error::StockscreenError;
use crate::domain::indicator::ema::smooth;
use crate::domain::indicator::{IndicatorKind, IndicatorPoint, IndicatorSeries, IndicatorValue};
use crate::domain::series::PriceSeries;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    series: &PriceSeries,
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> Result<IndicatorSeries, StockscreenError> {
    for (name, period) in [("MACD fast", fast), ("MACD slow", slow), ("MACD signal", signal_period)]
    {
        if period == 0 {
            return Err(StockscreenError::InvalidPeriod {
                indicator: name.to_string(),
                period,
            });
        }
    }
    if series.is_empty() {
        return Err(StockscreenError::InsufficientData {
            code: series.code().to_string(),
            bars: 0,
            minimum: 1,
        });
    }

    let closes: Vec<f64> = series.bars().iter().map(|b| b.close).collect();
    let ema_fast = smooth(&closes, fast);
    let ema_slow = smooth(&closes, slow);

    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = smooth(&macd_line, signal_period);

    let points = series
        .bars()
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let line = macd_line[i];
            let signal = signal_line[i];
            IndicatorPoint {
                date: bar.date,
                valid: true,
                value: IndicatorValue::Macd {
                    line,
                    signal,
                    histogram: line - signal,
                },
            }
        })
        .collect();

    Ok(IndicatorSeries {
        kind: IndicatorKind::Macd {
            fast,
            slow,
            signal: signal_period,
        },
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::Bar;
    use chrono::NaiveDate;

    fn make_series(closes: &[f64]) -> PriceSeries {
        let bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
                amount: None,
            })
            .collect();
        PriceSeries::new("TEST", bars).unwrap()
    }

    fn ramp(n: usize) -> PriceSeries {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        make_series(&closes)
    }

    #[test]
    fn macd_all_points_valid() {
        let macd = calculate_macd(&ramp(40), DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL).unwrap();
        assert_eq!(macd.len(), 40);
        assert!(macd.points.iter().all(|p| p.valid));
    }

    #[test]
    fn macd_first_point_is_zero() {
        // Fast and slow EMA share the same seed (the first close), so the
        // line and histogram both start at zero.
        let macd = calculate_macd(&ramp(40), 12, 26, 9).unwrap();
        if let IndicatorValue::Macd {
            line,
            signal,
            histogram,
        } = macd.points[0].value
        {
            assert!(line.abs() < f64::EPSILON);
            assert!(signal.abs() < f64::EPSILON);
            assert!(histogram.abs() < f64::EPSILON);
        } else {
            panic!("expected Macd value");
        }
    }

    #[test]
    fn macd_histogram_equals_line_minus_signal() {
        let macd = calculate_macd(&ramp(40), 12, 26, 9).unwrap();
        for point in &macd.points {
            if let IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } = point.value
            {
                assert!((histogram - (line - signal)).abs() < f64::EPSILON);
            }
        }
    }

    #[test]
    fn macd_line_is_ema_fast_minus_ema_slow() {
        let series = ramp(20);
        let closes: Vec<f64> = series.bars().iter().map(|b| b.close).collect();
        let ema_fast = smooth(&closes, 3);
        let ema_slow = smooth(&closes, 5);

        let macd = calculate_macd(&series, 3, 5, 2).unwrap();
        for (i, point) in macd.points.iter().enumerate() {
            if let IndicatorValue::Macd { line, .. } = point.value {
                let want = ema_fast[i] - ema_slow[i];
                assert!((line - want).abs() < f64::EPSILON, "line mismatch at {}", i);
            }
        }
    }

    #[test]
    fn macd_positive_in_uptrend() {
        // A steady ramp keeps the fast EMA above the slow EMA.
        let macd = calculate_macd(&ramp(60), 12, 26, 9).unwrap();
        if let IndicatorValue::Macd { line, .. } = macd.points.last().unwrap().value {
            assert!(line > 0.0);
        }
    }

    #[test]
    fn macd_constant_series_is_flat_zero() {
        let series = make_series(&[50.0; 30]);
        let macd = calculate_macd(&series, 12, 26, 9).unwrap();
        for point in &macd.points {
            if let IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } = point.value
            {
                assert!(line.abs() < 1e-10);
                assert!(signal.abs() < 1e-10);
                assert!(histogram.abs() < 1e-10);
            }
        }
    }

    #[test]
    fn macd_zero_period_rejected() {
        let series = make_series(&[100.0, 101.0, 102.0]);
        assert!(calculate_macd(&series, 0, 26, 9).is_err());
        assert!(calculate_macd(&series, 12, 0, 9).is_err());
        assert!(calculate_macd(&series, 12, 26, 0).is_err());
    }

    #[test]
    fn macd_empty_series_rejected() {
        let series = PriceSeries::new("TEST", Vec::new()).unwrap();
        let err = calculate_macd(&series, 12, 26, 9).unwrap_err();
        assert!(matches!(err, StockscreenError::InsufficientData { .. }));
    }

    #[test]
    fn macd_indicator_kind() {
        let macd = calculate_macd(&make_series(&[1.0, 2.0]), 5, 10, 3).unwrap();
        assert_eq!(
            macd.kind,
            IndicatorKind::Macd {
                fast: 5,
                slow: 10,
                signal: 3
            }
        );
    }
}
