//! Technical indicator library.
//!
//! Shared types for indicator output:
//! - `IndicatorPoint`: a single point in an indicator time series
//! - `IndicatorValue`: enum for the different indicator output shapes
//! - `IndicatorKind`: indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: a time series of indicator values, aligned 1:1 with
//!   the price series it was computed from
//!
//! Every `calculate_*` function returns a series of the same length as the
//! input, with leading warmup points marked `valid: false`. The numeric
//! payload of an invalid point must never be read. Errors are reserved for
//! an empty series (`InsufficientData`) and zero periods (`InvalidPeriod`);
//! a short-but-nonempty series simply yields more invalid points.

pub mod bollinger;
pub mod ema;
pub mod kdj;
pub mod ma;
pub mod macd;
pub mod obv;
pub mod roc;
pub mod rsi;
pub mod volume;

pub use bollinger::calculate_bollinger;
pub use ema::calculate_ema;
pub use kdj::calculate_kdj;
pub use ma::calculate_ma;
pub use macd::calculate_macd;
pub use obv::calculate_obv;
pub use roc::calculate_roc;
pub use rsi::calculate_rsi;
pub use volume::calculate_volume_ma;

use crate::domain::error::StockscreenError;
use crate::domain::series::PriceSeries;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Kdj {
        k: f64,
        d: f64,
        j: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

impl IndicatorValue {
    pub fn as_simple(&self) -> Option<f64> {
        match self {
            IndicatorValue::Simple(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    Ma(usize),
    Ema(usize),
    VolumeMa(usize),
    Rsi(usize),
    Roc(usize),
    Obv,
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Kdj {
        period: usize,
        k_smooth: usize,
        d_smooth: usize,
    },
    Bollinger {
        period: usize,
        width_x100: u32,
    },
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::Ma(period) => write!(f, "MA({})", period),
            IndicatorKind::Ema(period) => write!(f, "EMA({})", period),
            IndicatorKind::VolumeMa(period) => write!(f, "VOL_MA({})", period),
            IndicatorKind::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorKind::Roc(period) => write!(f, "ROC({})", period),
            IndicatorKind::Obv => write!(f, "OBV"),
            IndicatorKind::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorKind::Kdj {
                period,
                k_smooth,
                d_smooth,
            } => write!(f, "KDJ({},{},{})", period, k_smooth, d_smooth),
            IndicatorKind::Bollinger { period, width_x100 } => {
                let width = *width_x100 as f64 / 100.0;
                write!(f, "BOLL({},{})", period, width)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub kind: IndicatorKind,
    pub points: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Most recent valid point, with a flag set when the final bar itself
    /// was invalid and the walk-back landed on an earlier bar.
    pub fn latest_valid(&self) -> Option<(&IndicatorPoint, bool)> {
        for (offset, point) in self.points.iter().rev().enumerate() {
            if point.valid {
                return Some((point, offset > 0));
            }
        }
        None
    }

    /// The point at `index` if it exists and is valid.
    pub fn valid_at(&self, index: usize) -> Option<&IndicatorPoint> {
        self.points.get(index).filter(|p| p.valid)
    }
}

pub type IndicatorSet = HashMap<IndicatorKind, IndicatorSeries>;

/// Which indicators `compute_indicators` produces, and with what parameters.
///
/// Defaults mirror the standard daily-bar signal table: MA 5/10/20/60,
/// MACD(12,26,9), RSI(14), KDJ(9,3,3), BOLL(20,2), volume MA(20).
#[derive(Debug, Clone)]
pub struct IndicatorConfig {
    pub ma_periods: Vec<usize>,
    pub ema_periods: Vec<usize>,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub rsi_period: usize,
    pub kdj_period: usize,
    pub kdj_k_smooth: usize,
    pub kdj_d_smooth: usize,
    pub boll_period: usize,
    pub boll_width_x100: u32,
    pub volume_ma_period: usize,
    pub trend_short_ma: usize,
    pub trend_long_ma: usize,
    pub include_obv: bool,
    pub include_roc: bool,
    pub roc_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ma_periods: vec![5, 10, 20, 60],
            ema_periods: Vec::new(),
            macd_fast: macd::DEFAULT_FAST,
            macd_slow: macd::DEFAULT_SLOW,
            macd_signal: macd::DEFAULT_SIGNAL,
            rsi_period: 14,
            kdj_period: 9,
            kdj_k_smooth: 3,
            kdj_d_smooth: 3,
            boll_period: 20,
            boll_width_x100: 200,
            volume_ma_period: 20,
            trend_short_ma: 5,
            trend_long_ma: 20,
            include_obv: false,
            include_roc: false,
            roc_period: 12,
        }
    }
}

impl IndicatorConfig {
    /// Add an MA period if it is not already configured.
    pub fn ensure_ma(&mut self, period: usize) {
        if !self.ma_periods.contains(&period) {
            self.ma_periods.push(period);
        }
    }

    /// Configured MA periods plus the trend classification pair, deduplicated.
    pub fn all_ma_periods(&self) -> Vec<usize> {
        let mut periods = self.ma_periods.clone();
        for p in [self.trend_short_ma, self.trend_long_ma] {
            if !periods.contains(&p) {
                periods.push(p);
            }
        }
        periods
    }
}

/// Compute the configured indicator set for one series.
///
/// Fails with `InsufficientData` on an empty series and `InvalidPeriod` on
/// any zero period; everything else produces equal-length series with
/// explicit invalid warmup points.
pub fn compute_indicators(
    series: &PriceSeries,
    config: &IndicatorConfig,
) -> Result<IndicatorSet, StockscreenError> {
    if series.is_empty() {
        return Err(StockscreenError::InsufficientData {
            code: series.code().to_string(),
            bars: 0,
            minimum: 1,
        });
    }

    let mut set = IndicatorSet::new();

    for period in config.all_ma_periods() {
        let s = calculate_ma(series, period)?;
        set.insert(s.kind.clone(), s);
    }
    for &period in &config.ema_periods {
        let s = calculate_ema(series, period)?;
        set.insert(s.kind.clone(), s);
    }

    let macd = calculate_macd(series, config.macd_fast, config.macd_slow, config.macd_signal)?;
    set.insert(macd.kind.clone(), macd);

    let rsi = calculate_rsi(series, config.rsi_period)?;
    set.insert(rsi.kind.clone(), rsi);

    let kdj = calculate_kdj(
        series,
        config.kdj_period,
        config.kdj_k_smooth,
        config.kdj_d_smooth,
    )?;
    set.insert(kdj.kind.clone(), kdj);

    let boll = calculate_bollinger(series, config.boll_period, config.boll_width_x100)?;
    set.insert(boll.kind.clone(), boll);

    let vol_ma = calculate_volume_ma(series, config.volume_ma_period)?;
    set.insert(vol_ma.kind.clone(), vol_ma);

    if config.include_obv {
        let obv = calculate_obv(series)?;
        set.insert(obv.kind.clone(), obv);
    }
    if config.include_roc {
        let roc = calculate_roc(series, config.roc_period)?;
        set.insert(roc.kind.clone(), roc);
    }

    Ok(set)
}
