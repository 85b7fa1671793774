//! Bollinger Bands.
//!
//! - Middle: simple moving average over n bars
//! - Upper: middle + (multiplier * stddev)
//! - Lower: middle - (multiplier * stddev)
//!
//! StdDev is the sample standard deviation (divides by n-1), so the period
//! must be at least 2. The multiplier is carried as an integer scaled by 100
//! so the band parameters stay hashable.
//!
//! Default parameters: period=20, multiplier=2.0.
//! Warmup: first (period-1) bars are invalid. Runs in O(n) with rolling
//! sums of the close and its square.

use crate::domain::error::StockscreenError;
use crate::domain::indicator::{IndicatorKind, IndicatorPoint, IndicatorSeries, IndicatorValue};
use crate::domain::series::PriceSeries;

pub fn calculate_bollinger(
    series: &PriceSeries,
    period: usize,
    width_x100: u32,
) -> Result<IndicatorSeries, StockscreenError> {
    if period < 2 {
        return Err(StockscreenError::InvalidPeriod {
            indicator: "BOLL".to_string(),
            period,
        });
    }
    if series.is_empty() {
        return Err(StockscreenError::InsufficientData {
            code: series.code().to_string(),
            bars: 0,
            minimum: 1,
        });
    }

    let bars = series.bars();
    let mult = width_x100 as f64 / 100.0;
    let p = period as f64;

    let mut points = Vec::with_capacity(bars.len());
    let mut sum = 0.0;
    let mut sum_sq = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        sum += bar.close;
        sum_sq += bar.close * bar.close;
        if i >= period {
            let gone = bars[i - period].close;
            sum -= gone;
            sum_sq -= gone * gone;
        }

        if i + 1 < period {
            points.push(IndicatorPoint {
                date: bar.date,
                valid: false,
                value: IndicatorValue::Bollinger {
                    upper: 0.0,
                    middle: 0.0,
                    lower: 0.0,
                },
            });
            continue;
        }

        let middle = sum / p;
        let variance = ((sum_sq - sum * sum / p) / (p - 1.0)).max(0.0);
        let band = mult * variance.sqrt();

        points.push(IndicatorPoint {
            date: bar.date,
            valid: true,
            value: IndicatorValue::Bollinger {
                upper: middle + band,
                middle,
                lower: middle - band,
            },
        });
    }

    Ok(IndicatorSeries {
        kind: IndicatorKind::Bollinger { period, width_x100 },
        points,
    })
}
