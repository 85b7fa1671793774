//! Latest-bar signal snapshot.
//!
//! `build_snapshot` condenses a price series plus its computed indicators
//! into one flat record of the most recent signal state. Strategies read
//! from this record only; they never touch raw indicator series.
//!
//! Each indicator field carries a staleness flag: when the final bar has no
//! valid value, the snapshot walks back to the most recent valid one and
//! marks it stale. A field with no valid value anywhere stays `None`.

use crate::domain::error::StockscreenError;
use crate::domain::indicator::{
    IndicatorConfig, IndicatorKind, IndicatorPoint, IndicatorSeries, IndicatorSet, IndicatorValue,
};
use crate::domain::series::PriceSeries;
use chrono::NaiveDate;
use std::collections::HashMap;

/// One indicator reading, flagged when it did not come from the final bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalField {
    pub value: f64,
    pub stale: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

/// Line cross state over the last two bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cross {
    Golden,
    Dead,
    None,
}

#[derive(Debug, Clone)]
pub struct SignalSnapshot {
    pub code: String,
    pub date: NaiveDate,
    pub close: f64,
    pub volume: f64,
    /// Close-to-close change of the final bar, percent.
    pub pct_change: Option<f64>,

    /// Latest MA value per period.
    pub ma: HashMap<usize, SignalField>,
    /// MA value on the second-to-last bar, per period. Only present when
    /// that exact bar had a valid value; crosses need true adjacency.
    pub ma_prev: HashMap<usize, f64>,

    pub macd_line: Option<SignalField>,
    pub macd_signal: Option<SignalField>,
    pub macd_histogram: Option<SignalField>,
    pub macd_cross: Cross,

    pub rsi: Option<SignalField>,

    pub kdj_k: Option<SignalField>,
    pub kdj_d: Option<SignalField>,
    pub kdj_j: Option<SignalField>,
    pub kdj_cross: Cross,

    pub boll_upper: Option<SignalField>,
    pub boll_middle: Option<SignalField>,
    pub boll_lower: Option<SignalField>,
    /// Position of the close within the band: (close - lower) / (upper - lower).
    /// A zero-width band reads as the midpoint 0.5.
    pub boll_pct: Option<SignalField>,

    pub volume_ma: Option<SignalField>,
    /// Final-bar volume over the mean of the preceding lookback window.
    /// Defined only when the window is complete and its mean is positive.
    pub volume_ratio: Option<f64>,

    pub obv: Option<SignalField>,
    pub roc: Option<SignalField>,

    pub trend: Trend,
}

fn field_from(series: &IndicatorSeries) -> Option<SignalField> {
    let (point, stale) = series.latest_valid()?;
    let value = point.value.as_simple()?;
    Some(SignalField { value, stale })
}

fn simple_field(set: &IndicatorSet, kind: &IndicatorKind) -> Option<SignalField> {
    set.get(kind).and_then(field_from)
}

/// Last two consecutive valid points, newest second.
fn last_valid_pair(series: &IndicatorSeries) -> Option<(&IndicatorPoint, &IndicatorPoint)> {
    let i = series.points.iter().rposition(|p| p.valid)?;
    if i == 0 {
        return None;
    }
    let prev = &series.points[i - 1];
    if !prev.valid {
        return None;
    }
    Some((prev, &series.points[i]))
}

fn cross_from(prev_delta: f64, last_delta: f64) -> Cross {
    if last_delta > 0.0 && prev_delta <= 0.0 {
        Cross::Golden
    } else if last_delta < 0.0 && prev_delta >= 0.0 {
        Cross::Dead
    } else {
        Cross::None
    }
}

pub fn build_snapshot(
    series: &PriceSeries,
    indicators: &IndicatorSet,
    config: &IndicatorConfig,
) -> Result<SignalSnapshot, StockscreenError> {
    let last = series
        .last()
        .ok_or_else(|| StockscreenError::InsufficientData {
            code: series.code().to_string(),
            bars: 0,
            minimum: 1,
        })?;
    let bars = series.bars();
    let n = bars.len();

    let mut ma = HashMap::new();
    let mut ma_prev = HashMap::new();
    for period in config.all_ma_periods() {
        if let Some(ma_series) = indicators.get(&IndicatorKind::Ma(period)) {
            if let Some(field) = field_from(ma_series) {
                ma.insert(period, field);
            }
            if n >= 2 {
                if let Some(value) = ma_series.valid_at(n - 2).and_then(|p| p.value.as_simple()) {
                    ma_prev.insert(period, value);
                }
            }
        }
    }

    let macd_kind = IndicatorKind::Macd {
        fast: config.macd_fast,
        slow: config.macd_slow,
        signal: config.macd_signal,
    };
    let mut macd_line = None;
    let mut macd_signal = None;
    let mut macd_histogram = None;
    let mut macd_cross = Cross::None;
    if let Some(macd_series) = indicators.get(&macd_kind) {
        if let Some((point, stale)) = macd_series.latest_valid() {
            if let IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } = point.value
            {
                macd_line = Some(SignalField { value: line, stale });
                macd_signal = Some(SignalField {
                    value: signal,
                    stale,
                });
                macd_histogram = Some(SignalField {
                    value: histogram,
                    stale,
                });
            }
        }
        if let Some((prev, latest)) = last_valid_pair(macd_series) {
            if let (
                IndicatorValue::Macd {
                    line: prev_line,
                    signal: prev_signal,
                    ..
                },
                IndicatorValue::Macd {
                    line: last_line,
                    signal: last_signal,
                    ..
                },
            ) = (&prev.value, &latest.value)
            {
                macd_cross = cross_from(prev_line - prev_signal, last_line - last_signal);
            }
        }
    }

    let rsi = simple_field(indicators, &IndicatorKind::Rsi(config.rsi_period));

    let kdj_kind = IndicatorKind::Kdj {
        period: config.kdj_period,
        k_smooth: config.kdj_k_smooth,
        d_smooth: config.kdj_d_smooth,
    };
    let mut kdj_k = None;
    let mut kdj_d = None;
    let mut kdj_j = None;
    let mut kdj_cross = Cross::None;
    if let Some(kdj_series) = indicators.get(&kdj_kind) {
        if let Some((point, stale)) = kdj_series.latest_valid() {
            if let IndicatorValue::Kdj { k, d, j } = point.value {
                kdj_k = Some(SignalField { value: k, stale });
                kdj_d = Some(SignalField { value: d, stale });
                kdj_j = Some(SignalField { value: j, stale });
            }
        }
        if let Some((prev, latest)) = last_valid_pair(kdj_series) {
            if let (
                IndicatorValue::Kdj {
                    k: prev_k,
                    d: prev_d,
                    ..
                },
                IndicatorValue::Kdj {
                    k: last_k,
                    d: last_d,
                    ..
                },
            ) = (&prev.value, &latest.value)
            {
                kdj_cross = cross_from(prev_k - prev_d, last_k - last_d);
            }
        }
    }

    let boll_kind = IndicatorKind::Bollinger {
        period: config.boll_period,
        width_x100: config.boll_width_x100,
    };
    let mut boll_upper = None;
    let mut boll_middle = None;
    let mut boll_lower = None;
    let mut boll_pct = None;
    if let Some(boll_series) = indicators.get(&boll_kind) {
        if let Some((point, stale)) = boll_series.latest_valid() {
            if let IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            } = point.value
            {
                boll_upper = Some(SignalField {
                    value: upper,
                    stale,
                });
                boll_middle = Some(SignalField {
                    value: middle,
                    stale,
                });
                boll_lower = Some(SignalField {
                    value: lower,
                    stale,
                });
                let width = upper - lower;
                let pct = if width == 0.0 {
                    0.5
                } else {
                    (last.close - lower) / width
                };
                boll_pct = Some(SignalField { value: pct, stale });
            }
        }
    }

    let volume_ma = simple_field(indicators, &IndicatorKind::VolumeMa(config.volume_ma_period));

    let lookback = config.volume_ma_period;
    let volume_ratio = if lookback > 0 && n > lookback {
        let window = &bars[n - 1 - lookback..n - 1];
        let mean = window.iter().map(|b| b.volume).sum::<f64>() / lookback as f64;
        (mean > 0.0).then(|| last.volume / mean)
    } else {
        None
    };

    let obv = simple_field(indicators, &IndicatorKind::Obv);
    let roc = simple_field(indicators, &IndicatorKind::Roc(config.roc_period));

    let trend = classify_trend(
        last.close,
        ma.get(&config.trend_short_ma),
        ma.get(&config.trend_long_ma),
        macd_histogram.as_ref(),
    );

    Ok(SignalSnapshot {
        code: series.code().to_string(),
        date: last.date,
        close: last.close,
        volume: last.volume,
        pct_change: series.latest_change_pct(),
        ma,
        ma_prev,
        macd_line,
        macd_signal,
        macd_histogram,
        macd_cross,
        rsi,
        kdj_k,
        kdj_d,
        kdj_j,
        kdj_cross,
        boll_upper,
        boll_middle,
        boll_lower,
        boll_pct,
        volume_ma,
        volume_ratio,
        obv,
        roc,
        trend,
    })
}

/// Bullish when close > short MA > long MA with a positive MACD histogram,
/// bearish on the mirrored condition, neutral otherwise or when any input
/// is missing.
fn classify_trend(
    close: f64,
    short: Option<&SignalField>,
    long: Option<&SignalField>,
    histogram: Option<&SignalField>,
) -> Trend {
    let (Some(short), Some(long), Some(hist)) = (short, long, histogram) else {
        return Trend::Neutral;
    };
    if close > short.value && short.value > long.value && hist.value > 0.0 {
        Trend::Bullish
    } else if close < short.value && short.value < long.value && hist.value < 0.0 {
        Trend::Bearish
    } else {
        Trend::Neutral
    }
}
