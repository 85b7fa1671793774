//! ROC (Rate of Change).
//!
//! ROC(n)[i] = ((C[i] - C[i-n]) / C[i-n]) * 100
//! If C[i-n] == 0: ROC = 0
//! Warmup: first n bars invalid.

use crate::domain::error::StockscreenError;
use crate::domain::indicator::{IndicatorKind, IndicatorPoint, IndicatorSeries, IndicatorValue};
use crate::domain::series::PriceSeries;

pub fn calculate_roc(
    series: &PriceSeries,
    period: usize,
) -> Result<IndicatorSeries, StockscreenError> {
    if period == 0 {
        return Err(StockscreenError::InvalidPeriod {
            indicator: "ROC".to_string(),
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

    for (i, bar) in bars.iter().enumerate() {
        let valid = i >= period;
        let value = if valid {
            let prev_close = bars[i - period].close;
            if prev_close == 0.0 {
                0.0
            } else {
                (bar.close - prev_close) / prev_close * 100.0
            }
        } else {
            0.0
        };

        points.push(IndicatorPoint {
            date: bar.date,
            valid,
            value: IndicatorValue::Simple(value),
        });
    }

    Ok(IndicatorSeries {
        kind: IndicatorKind::Roc(period),
        points,
    })
}
