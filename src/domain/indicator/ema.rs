//! Exponential moving average of the close.
//!
//! k = 2/(n+1), seed with the first close, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! No warmup: every point is valid from bar 0.

use crate::domain::error::StockscreenError;
use crate::domain::indicator::{IndicatorKind, IndicatorPoint, IndicatorSeries, IndicatorValue};
use crate::domain::series::PriceSeries;

/// Exponential smoothing with `alpha = 2 / (period + 1)`, seeded from the
/// first input value. Output length equals input length.
pub fn smooth(values: &[f64], period: usize) -> Vec<f64> {
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev = match values.first() {
        Some(&first) => first,
        None => return out,
    };
    out.push(prev);
    for &value in &values[1..] {
        prev = alpha * value + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

pub fn calculate_ema(
    series: &PriceSeries,
    period: usize,
) -> Result<IndicatorSeries, StockscreenError> {
    if period == 0 {
        return Err(StockscreenError::InvalidPeriod {
            indicator: "EMA".to_string(),
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

    let closes: Vec<f64> = series.bars().iter().map(|b| b.close).collect();
    let smoothed = smooth(&closes, period);

    let points = series
        .bars()
        .iter()
        .zip(smoothed)
        .map(|(bar, value)| IndicatorPoint {
            date: bar.date,
            valid: true,
            value: IndicatorValue::Simple(value),
        })
        .collect();

    Ok(IndicatorSeries {
        kind: IndicatorKind::Ema(period),
        points,
    })
}
