//! RSI (Relative Strength Index).
//!
//! Average gain/loss are simple rolling means over the last n close-to-close
//! changes, so bar i needs changes i-n+1..=i and the first n bars are invalid.
//!
//! RSI = 100 * avg_gain / (avg_gain + avg_loss)
//! A window with no movement at all (both averages zero) reads as neutral 50.

use crate::domain::error::StockscreenError;
use crate::domain::indicator::{IndicatorKind, IndicatorPoint, IndicatorSeries, IndicatorValue};
use crate::domain::series::PriceSeries;

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    let total = avg_gain + avg_loss;
    if total == 0.0 {
        50.0
    } else {
        100.0 * avg_gain / total
    }
}

pub fn calculate_rsi(
    series: &PriceSeries,
    period: usize,
) -> Result<IndicatorSeries, StockscreenError> {
    if period == 0 {
        return Err(StockscreenError::InvalidPeriod {
            indicator: "RSI".to_string(),
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
    let mut gains: Vec<f64> = Vec::with_capacity(bars.len().saturating_sub(1));
    let mut losses: Vec<f64> = Vec::with_capacity(bars.len().saturating_sub(1));
    for window in bars.windows(2) {
        let change = window[1].close - window[0].close;
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let mut points = Vec::with_capacity(bars.len());
    points.push(IndicatorPoint {
        date: bars[0].date,
        valid: false,
        value: IndicatorValue::Simple(0.0),
    });

    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;

    for (i, bar) in bars.iter().enumerate().skip(1) {
        // Change i-1 in the delta vectors belongs to bar i.
        gain_sum += gains[i - 1];
        loss_sum += losses[i - 1];
        if i > period {
            gain_sum -= gains[i - 1 - period];
            loss_sum -= losses[i - 1 - period];
        }

        if i >= period {
            let rsi = rsi_value(gain_sum / period as f64, loss_sum / period as f64);
            points.push(IndicatorPoint {
                date: bar.date,
                valid: true,
                value: IndicatorValue::Simple(rsi),
            });
        } else {
            points.push(IndicatorPoint {
                date: bar.date,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            });
        }
    }

    Ok(IndicatorSeries {
        kind: IndicatorKind::Rsi(period),
        points,
    })
}
