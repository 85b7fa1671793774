//! OBV (On-Balance Volume).

use crate::domain::error::StockscreenError;
use crate::domain::indicator::{IndicatorKind, IndicatorPoint, IndicatorSeries, IndicatorValue};
use crate::domain::series::PriceSeries;

/// Cumulative signed volume.
///
/// OBV[0] = 0
/// If close[i] > close[i-1]: OBV[i] = OBV[i-1] + volume[i]
/// If close[i] < close[i-1]: OBV[i] = OBV[i-1] - volume[i]
/// If close[i] == close[i-1]: OBV[i] = OBV[i-1]
///
/// No warmup; all bars are valid.
pub fn calculate_obv(series: &PriceSeries) -> Result<IndicatorSeries, StockscreenError> {
    if series.is_empty() {
        return Err(StockscreenError::InsufficientData {
            code: series.code().to_string(),
            bars: 0,
            minimum: 1,
        });
    }

    let bars = series.bars();
    let mut points = Vec::with_capacity(bars.len());
    let mut obv = 0.0;
    let mut prev_close = bars[0].close;

    for (i, bar) in bars.iter().enumerate() {
        if i > 0 {
            if bar.close > prev_close {
                obv += bar.volume;
            } else if bar.close < prev_close {
                obv -= bar.volume;
            }
        }
        prev_close = bar.close;

        points.push(IndicatorPoint {
            date: bar.date,
            valid: true,
            value: IndicatorValue::Simple(obv),
        });
    }

    Ok(IndicatorSeries {
        kind: IndicatorKind::Obv,
        points,
    })
}
