//! Simple moving average of the close.

use crate::domain::error::StockscreenError;
use crate::domain::indicator::{IndicatorKind, IndicatorPoint, IndicatorSeries, IndicatorValue};
use crate::domain::series::PriceSeries;

/// Rolling mean of the close over `period` bars.
///
/// The first `period - 1` points are invalid; each later point averages
/// exactly `period` closes. Runs in O(n) with a sliding sum.
pub fn calculate_ma(
    series: &PriceSeries,
    period: usize,
) -> Result<IndicatorSeries, StockscreenError> {
    if period == 0 {
        return Err(StockscreenError::InvalidPeriod {
            indicator: "MA".to_string(),
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
    let mut points = Vec::with_capacity(bars.len());
    let mut sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        sum += bar.close;
        if i >= period {
            sum -= bars[i - period].close;
        }
        if i + 1 >= period {
            points.push(IndicatorPoint {
                date: bar.date,
                valid: true,
                value: IndicatorValue::Simple(sum / period as f64),
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
        kind: IndicatorKind::Ma(period),
        points,
    })
}
