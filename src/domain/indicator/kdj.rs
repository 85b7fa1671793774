//! KDJ stochastic oscillator.
//!
//! RSV[i] = (close - lowest low) / (highest high - lowest low) * 100 over the
//! last n bars; a flat window reads as neutral 50. K and D are exponentially
//! smoothed with factors m1 and m2:
//!
//!   K[i] = m1/(m1+1) * K[i-1] + 1/(m1+1) * RSV[i]
//!   D[i] = m2/(m2+1) * D[i-1] + 1/(m2+1) * K[i]
//!   J[i] = 3*K[i] - 2*D[i]
//!
//! Both are seeded with the first valid RSV, so the first n-1 bars are
//! invalid. Window extrema come from monotonic deques, keeping the whole
//! pass O(n).

use crate::domain::error::StockscreenError;
use crate::domain::indicator::{IndicatorKind, IndicatorPoint, IndicatorSeries, IndicatorValue};
use crate::domain::series::PriceSeries;
use std::collections::VecDeque;

pub fn calculate_kdj(
    series: &PriceSeries,
    period: usize,
    k_smooth: usize,
    d_smooth: usize,
) -> Result<IndicatorSeries, StockscreenError> {
    for (name, value) in [
        ("KDJ period", period),
        ("KDJ K smoothing", k_smooth),
        ("KDJ D smoothing", d_smooth),
    ] {
        if value == 0 {
            return Err(StockscreenError::InvalidPeriod {
                indicator: name.to_string(),
                period: value,
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

    let bars = series.bars();
    let alpha_k = 1.0 / (k_smooth as f64 + 1.0);
    let alpha_d = 1.0 / (d_smooth as f64 + 1.0);

    // Indices of window maxima (highs, descending) and minima (lows, ascending).
    let mut max_deque: VecDeque<usize> = VecDeque::new();
    let mut min_deque: VecDeque<usize> = VecDeque::new();

    let mut points = Vec::with_capacity(bars.len());
    let mut k = 0.0;
    let mut d = 0.0;
    let mut seeded = false;

    for (i, bar) in bars.iter().enumerate() {
        while max_deque
            .back()
            .is_some_and(|&j| bars[j].high <= bar.high)
        {
            max_deque.pop_back();
        }
        max_deque.push_back(i);
        while min_deque.back().is_some_and(|&j| bars[j].low >= bar.low) {
            min_deque.pop_back();
        }
        min_deque.push_back(i);

        while max_deque.front().is_some_and(|&j| j + period <= i) {
            max_deque.pop_front();
        }
        while min_deque.front().is_some_and(|&j| j + period <= i) {
            min_deque.pop_front();
        }

        if i + 1 < period {
            points.push(IndicatorPoint {
                date: bar.date,
                valid: false,
                value: IndicatorValue::Kdj {
                    k: 0.0,
                    d: 0.0,
                    j: 0.0,
                },
            });
            continue;
        }

        let high_max = bars[max_deque[0]].high;
        let low_min = bars[min_deque[0]].low;
        let range = high_max - low_min;
        let rsv = if range == 0.0 {
            50.0
        } else {
            (bar.close - low_min) / range * 100.0
        };

        if seeded {
            k = (1.0 - alpha_k) * k + alpha_k * rsv;
            d = (1.0 - alpha_d) * d + alpha_d * k;
        } else {
            k = rsv;
            d = rsv;
            seeded = true;
        }

        points.push(IndicatorPoint {
            date: bar.date,
            valid: true,
            value: IndicatorValue::Kdj {
                k,
                d,
                j: 3.0 * k - 2.0 * d,
            },
        });
    }

    Ok(IndicatorSeries {
        kind: IndicatorKind::Kdj {
            period,
            k_smooth,
            d_smooth,
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

    fn kdj_at(series: &IndicatorSeries, i: usize) -> (f64, f64, f64) {
        match series.points[i].value {
            IndicatorValue::Kdj { k, d, j } => (k, d, j),
            _ => panic!("expected Kdj value"),
        }
    }

    #[test]
    fn kdj_warmup_period() {
        let closes: Vec<f64> = (0..12).map(|i| 100.0 + i as f64).collect();
        let kdj = calculate_kdj(&make_series(&closes), 9, 3, 3).unwrap();

        assert_eq!(kdj.len(), 12);
        for i in 0..8 {
            assert!(!kdj.points[i].valid, "bar {} should be invalid", i);
        }
        assert!(kdj.points[8].valid);
    }

    #[test]
    fn kdj_seed_equals_rsv() {
        // Window [10, 20]: RSV = 100, so K = D = 100 and J = 100 on seed.
        let kdj = calculate_kdj(&make_series(&[10.0, 20.0]), 2, 3, 3).unwrap();
        let (k, d, j) = kdj_at(&kdj, 1);
        assert!((k - 100.0).abs() < f64::EPSILON);
        assert!((d - 100.0).abs() < f64::EPSILON);
        assert!((j - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn kdj_recurrence_after_seed() {
        // Seed at bar 1: RSV = 100 -> K = D = 100.
        // Bar 2 window [20, 15]: RSV = 0.
        //   K = 3/4 * 100 + 1/4 * 0 = 75
        //   D = 3/4 * 100 + 1/4 * 75 = 93.75
        //   J = 3*75 - 2*93.75 = 37.5
        let kdj = calculate_kdj(&make_series(&[10.0, 20.0, 15.0]), 2, 3, 3).unwrap();
        let (k, d, j) = kdj_at(&kdj, 2);
        assert!((k - 75.0).abs() < 1e-10);
        assert!((d - 93.75).abs() < 1e-10);
        assert!((j - 37.5).abs() < 1e-10);
    }

    #[test]
    fn kdj_flat_window_is_neutral() {
        let kdj = calculate_kdj(&make_series(&[100.0; 12]), 9, 3, 3).unwrap();
        let (k, d, j) = kdj_at(&kdj, 11);
        assert!((k - 50.0).abs() < f64::EPSILON);
        assert!((d - 50.0).abs() < f64::EPSILON);
        assert!((j - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn kdj_k_and_d_stay_in_range() {
        let closes: Vec<f64> = (0..40)
            .map(|i| 100.0 + ((i * 7) % 13) as f64 - 6.0)
            .collect();
        let kdj = calculate_kdj(&make_series(&closes), 9, 3, 3).unwrap();
        for point in &kdj.points {
            if point.valid {
                if let IndicatorValue::Kdj { k, d, .. } = point.value {
                    assert!((0.0..=100.0).contains(&k), "K {} out of range", k);
                    assert!((0.0..=100.0).contains(&d), "D {} out of range", d);
                }
            }
        }
    }

    #[test]
    fn kdj_j_formula_holds() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + ((i * 3) % 7) as f64).collect();
        let kdj = calculate_kdj(&make_series(&closes), 9, 3, 3).unwrap();
        for point in &kdj.points {
            if point.valid {
                if let IndicatorValue::Kdj { k, d, j } = point.value {
                    assert!((j - (3.0 * k - 2.0 * d)).abs() < 1e-10);
                }
            }
        }
    }

    #[test]
    fn kdj_window_extrema_slide() {
        // The peak at bar 0 leaves the 2-bar window by bar 2, so RSV there
        // only sees bars 1 and 2.
        let kdj = calculate_kdj(&make_series(&[100.0, 10.0, 11.0]), 2, 3, 3).unwrap();
        let (k, _, _) = kdj_at(&kdj, 2);
        // Seed at bar 1: RSV = 0. Bar 2: window [10, 11], RSV = 100.
        // K = 3/4 * 0 + 1/4 * 100 = 25.
        assert!((k - 25.0).abs() < 1e-10);
    }

    #[test]
    fn kdj_zero_parameters_rejected() {
        let series = make_series(&[1.0, 2.0]);
        assert!(calculate_kdj(&series, 0, 3, 3).is_err());
        assert!(calculate_kdj(&series, 9, 0, 3).is_err());
        assert!(calculate_kdj(&series, 9, 3, 0).is_err());
    }

    #[test]
    fn kdj_empty_series_rejected() {
        let series = PriceSeries::new("TEST", Vec::new()).unwrap();
        let err = calculate_kdj(&series, 9, 3, 3).unwrap_err();
        assert!(matches!(err, StockscreenError::InsufficientData { .. }));
    }

    #[test]
    fn kdj_indicator_kind() {
        let kdj = calculate_kdj(&make_series(&[1.0, 2.0]), 9, 3, 3).unwrap();
        assert_eq!(
            kdj.kind,
            IndicatorKind::Kdj {
                period: 9,
                k_smooth: 3,
                d_smooth: 3
            }
        );
    }
}
