//! Moving average of traded volume.

use crate::domain::error::StockscreenError;
use crate::domain::indicator::{IndicatorKind, IndicatorPoint, IndicatorSeries, IndicatorValue};
use crate::domain::series::PriceSeries;

/// Rolling mean of volume over `period` bars, same warmup rule as the
/// close-price MA.
pub fn calculate_volume_ma(
    series: &PriceSeries,
    period: usize,
) -> Result<IndicatorSeries, StockscreenError> {
    if period == 0 {
        return Err(StockscreenError::InvalidPeriod {
            indicator: "VOL_MA".to_string(),
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
        sum += bar.volume;
        if i >= period {
            sum -= bars[i - period].volume;
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
        kind: IndicatorKind::VolumeMa(period),
        points,
    })
}
