//! Strategy evaluation over signal snapshots.
//!
//! A strategy turns one `(Instrument, SignalSnapshot)` pair into a pass/fail
//! verdict plus a 0-100 score used for ranking. `filter` applies a strategy
//! to a whole batch, keeps the passing rows, and ranks them by descending
//! score with ascending code as the tie-break, so the same batch always
//! yields the same order.
//!
//! An instrument whose snapshot lacks a field the strategy needs is reported
//! as skipped rather than aborting the batch.

use crate::domain::error::StockscreenError;
use crate::domain::instrument::Instrument;
use crate::domain::scan::{SkipReason, SkippedInstrument};
use crate::domain::snapshot::{Cross, SignalSnapshot};
use std::collections::HashSet;
use std::fmt;

/// Pass threshold for the multi-indicator composite.
const MULTI_PASS_THRESHOLD: f64 = 60.0;

/// Tunable thresholds shared by the strategy constructors.
#[derive(Debug, Clone)]
pub struct StrategyParams {
    pub rsi_oversold: f64,
    pub ma_short: usize,
    pub ma_long: usize,
    pub volume_ratio: f64,
    pub volume_min_pct: f64,
    pub boll_tolerance: f64,
    pub max_pe: f64,
    pub max_pb: f64,
    pub min_market_cap: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            rsi_oversold: 30.0,
            ma_short: 5,
            ma_long: 20,
            volume_ratio: 2.0,
            volume_min_pct: 3.0,
            boll_tolerance: 1.02,
            max_pe: 30.0,
            max_pb: 3.0,
            min_market_cap: 1e10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    /// MACD line crossed above its signal line on the latest bar.
    MacdCross,
    /// RSI below the oversold threshold.
    RsiOversold { threshold: f64 },
    /// Short MA crossed above long MA between the last two bars.
    MaCross { short: usize, long: usize },
    /// Volume at least `ratio` times its recent average on a strong up day.
    VolumeBreakout { ratio: f64, min_pct_change: f64 },
    /// Close at or below the lower Bollinger band (within tolerance).
    BollLowerTouch { tolerance: f64 },
    /// Weighted composite of MACD, RSI, band position, volume and MA layout.
    MultiIndicator,
    /// Valuation screen on PE, PB and market cap.
    Fundamental {
        max_pe: f64,
        max_pb: f64,
        min_market_cap: f64,
    },
}

/// Outcome of evaluating one instrument.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub passes: bool,
    pub score: f64,
    pub details: Vec<(String, f64)>,
}

/// One ranked output row.
#[derive(Debug, Clone)]
pub struct StrategyResult {
    pub code: String,
    pub name: String,
    pub score: f64,
    pub details: Vec<(String, f64)>,
}

/// Passing rows (ranked) plus the instruments that could not be evaluated.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub rows: Vec<StrategyResult>,
    pub skipped: Vec<SkippedInstrument>,
}

impl Strategy {
    pub const KNOWN_IDS: [&'static str; 7] = [
        "macd",
        "rsi",
        "golden_cross",
        "volume",
        "boll",
        "multi",
        "fundamental",
    ];

    pub fn from_id(id: &str, params: &StrategyParams) -> Result<Self, StockscreenError> {
        match id {
            "macd" => Ok(Strategy::MacdCross),
            "rsi" => Ok(Strategy::RsiOversold {
                threshold: params.rsi_oversold,
            }),
            "golden_cross" => Ok(Strategy::MaCross {
                short: params.ma_short,
                long: params.ma_long,
            }),
            "volume" => Ok(Strategy::VolumeBreakout {
                ratio: params.volume_ratio,
                min_pct_change: params.volume_min_pct,
            }),
            "boll" => Ok(Strategy::BollLowerTouch {
                tolerance: params.boll_tolerance,
            }),
            "multi" => Ok(Strategy::MultiIndicator),
            "fundamental" => Ok(Strategy::Fundamental {
                max_pe: params.max_pe,
                max_pb: params.max_pb,
                min_market_cap: params.min_market_cap,
            }),
            other => Err(StockscreenError::UnknownStrategy {
                id: other.to_string(),
            }),
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Strategy::MacdCross => "macd",
            Strategy::RsiOversold { .. } => "rsi",
            Strategy::MaCross { .. } => "golden_cross",
            Strategy::VolumeBreakout { .. } => "volume",
            Strategy::BollLowerTouch { .. } => "boll",
            Strategy::MultiIndicator => "multi",
            Strategy::Fundamental { .. } => "fundamental",
        }
    }

    /// MA periods the snapshot must carry for this strategy to evaluate.
    pub fn required_ma_periods(&self) -> Vec<usize> {
        match self {
            Strategy::MaCross { short, long } => vec![*short, *long],
            Strategy::MultiIndicator => vec![5, 10, 20],
            _ => Vec::new(),
        }
    }

    pub fn evaluate(
        &self,
        instrument: &Instrument,
        snapshot: &SignalSnapshot,
    ) -> Result<Evaluation, StockscreenError> {
        match self {
            Strategy::MacdCross => evaluate_macd_cross(snapshot),
            Strategy::RsiOversold { threshold } => evaluate_rsi_oversold(snapshot, *threshold),
            Strategy::MaCross { short, long } => evaluate_ma_cross(snapshot, *short, *long),
            Strategy::VolumeBreakout {
                ratio,
                min_pct_change,
            } => evaluate_volume_breakout(snapshot, *ratio, *min_pct_change),
            Strategy::BollLowerTouch { tolerance } => {
                evaluate_boll_lower_touch(snapshot, *tolerance)
            }
            Strategy::MultiIndicator => Ok(evaluate_multi_indicator(snapshot)),
            Strategy::Fundamental {
                max_pe,
                max_pb,
                min_market_cap,
            } => evaluate_fundamental(instrument, *max_pe, *max_pb, *min_market_cap),
        }
    }

    /// Evaluate a whole batch; keep the passing rows ranked, record the rest
    /// that could not be evaluated. Duplicate codes keep their first entry.
    pub fn filter(&self, batch: &[(Instrument, SignalSnapshot)]) -> FilterOutcome {
        let mut rows = Vec::new();
        let mut skipped = Vec::new();
        let mut seen = HashSet::new();

        for (instrument, snapshot) in batch {
            if !seen.insert(snapshot.code.clone()) {
                continue;
            }
            match self.evaluate(instrument, snapshot) {
                Ok(eval) if eval.passes => rows.push(StrategyResult {
                    code: snapshot.code.clone(),
                    name: instrument.name.clone(),
                    score: eval.score,
                    details: eval.details,
                }),
                Ok(_) => {}
                Err(err) => skipped.push(SkippedInstrument {
                    code: snapshot.code.clone(),
                    reason: SkipReason::from_error(&err),
                }),
            }
        }

        rank_results(&mut rows);
        FilterOutcome { rows, skipped }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::MacdCross => "MACD Golden Cross",
            Strategy::RsiOversold { .. } => "RSI Oversold",
            Strategy::MaCross { .. } => "MA Golden Cross",
            Strategy::VolumeBreakout { .. } => "Volume Breakout",
            Strategy::BollLowerTouch { .. } => "Bollinger Lower Touch",
            Strategy::MultiIndicator => "Multi-Indicator Composite",
            Strategy::Fundamental { .. } => "Fundamental Screen",
        };
        write!(f, "{}", name)
    }
}

/// Sort by descending score, then ascending code. Total order, so ranking
/// the same rows twice gives the same sequence.
pub fn rank_results(rows: &mut [StrategyResult]) {
    rows.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.code.cmp(&b.code)));
}

fn missing(code: &str, field: &str) -> StockscreenError {
    StockscreenError::StrategyFieldMissing {
        code: code.to_string(),
        field: field.to_string(),
    }
}

fn evaluate_macd_cross(snapshot: &SignalSnapshot) -> Result<Evaluation, StockscreenError> {
    let line = snapshot
        .macd_line
        .ok_or_else(|| missing(&snapshot.code, "macd_line"))?;
    let signal = snapshot
        .macd_signal
        .ok_or_else(|| missing(&snapshot.code, "macd_signal"))?;

    let passes = snapshot.macd_cross == Cross::Golden;
    Ok(Evaluation {
        passes,
        score: if passes { 100.0 } else { 0.0 },
        details: vec![
            ("macd".to_string(), line.value),
            ("macd_signal".to_string(), signal.value),
        ],
    })
}

fn evaluate_rsi_oversold(
    snapshot: &SignalSnapshot,
    threshold: f64,
) -> Result<Evaluation, StockscreenError> {
    let rsi = snapshot
        .rsi
        .ok_or_else(|| missing(&snapshot.code, "rsi"))?;

    Ok(Evaluation {
        passes: rsi.value < threshold,
        score: (100.0 - rsi.value).clamp(0.0, 100.0),
        details: vec![("rsi".to_string(), rsi.value)],
    })
}

fn evaluate_ma_cross(
    snapshot: &SignalSnapshot,
    short: usize,
    long: usize,
) -> Result<Evaluation, StockscreenError> {
    let last_short = snapshot
        .ma
        .get(&short)
        .ok_or_else(|| missing(&snapshot.code, &format!("ma{}", short)))?;
    let last_long = snapshot
        .ma
        .get(&long)
        .ok_or_else(|| missing(&snapshot.code, &format!("ma{}", long)))?;
    let prev_short = snapshot
        .ma_prev
        .get(&short)
        .ok_or_else(|| missing(&snapshot.code, &format!("ma{}_prev", short)))?;
    let prev_long = snapshot
        .ma_prev
        .get(&long)
        .ok_or_else(|| missing(&snapshot.code, &format!("ma{}_prev", long)))?;

    let passes = last_short.value > last_long.value && prev_short <= prev_long;
    Ok(Evaluation {
        passes,
        score: if passes { 100.0 } else { 0.0 },
        details: vec![
            (format!("ma{}", short), last_short.value),
            (format!("ma{}", long), last_long.value),
        ],
    })
}

fn evaluate_volume_breakout(
    snapshot: &SignalSnapshot,
    ratio: f64,
    min_pct_change: f64,
) -> Result<Evaluation, StockscreenError> {
    let volume_ratio = snapshot
        .volume_ratio
        .ok_or_else(|| missing(&snapshot.code, "volume_ratio"))?;
    let pct_change = snapshot
        .pct_change
        .ok_or_else(|| missing(&snapshot.code, "pct_change"))?;

    let passes = volume_ratio >= ratio && pct_change > min_pct_change;
    // Volume saturates at twice the required ratio, the day's move at +10%.
    let score = 60.0 * (volume_ratio / (2.0 * ratio)).clamp(0.0, 1.0)
        + 40.0 * (pct_change / 10.0).clamp(0.0, 1.0);

    Ok(Evaluation {
        passes,
        score,
        details: vec![
            ("volume_ratio".to_string(), volume_ratio),
            ("pct_change".to_string(), pct_change),
        ],
    })
}

fn evaluate_boll_lower_touch(
    snapshot: &SignalSnapshot,
    tolerance: f64,
) -> Result<Evaluation, StockscreenError> {
    let lower = snapshot
        .boll_lower
        .ok_or_else(|| missing(&snapshot.code, "boll_lower"))?;
    let pct_b = snapshot
        .boll_pct
        .ok_or_else(|| missing(&snapshot.code, "boll_pct"))?;

    let passes = snapshot.close <= lower.value * tolerance;
    Ok(Evaluation {
        passes,
        score: (100.0 * (1.0 - pct_b.value)).clamp(0.0, 100.0),
        details: vec![
            ("close".to_string(), snapshot.close),
            ("boll_lower".to_string(), lower.value),
            ("pct_b".to_string(), pct_b.value),
        ],
    })
}

/// Composite score. Sub-signals missing from the snapshot contribute zero
/// points instead of failing the evaluation.
fn evaluate_multi_indicator(snapshot: &SignalSnapshot) -> Evaluation {
    let macd_points: f64 = match (snapshot.macd_line, snapshot.macd_signal) {
        (Some(line), Some(signal)) if line.value > signal.value => {
            if snapshot.macd_cross == Cross::Golden {
                35.0
            } else {
                25.0
            }
        }
        _ => 0.0,
    };

    let rsi_points = match snapshot.rsi {
        Some(rsi) if rsi.value < 30.0 => 15.0,
        Some(rsi) if rsi.value <= 70.0 => 25.0,
        _ => 0.0,
    };

    let boll_points = match snapshot.boll_pct {
        Some(pct) if pct.value >= 0.4 && pct.value <= 0.8 => 25.0,
        Some(pct) if pct.value > 0.8 => 15.0,
        _ => 0.0,
    };

    let volume_points = match snapshot.volume_ratio {
        Some(ratio) if ratio > 1.5 => 25.0,
        Some(ratio) if ratio > 1.0 => 15.0,
        _ => 0.0,
    };

    let ma_points = match (
        snapshot.ma.get(&5),
        snapshot.ma.get(&10),
        snapshot.ma.get(&20),
    ) {
        (Some(ma5), Some(ma10), Some(ma20))
            if ma5.value > ma10.value && ma10.value > ma20.value =>
        {
            15.0
        }
        (Some(ma5), Some(ma10), _) if ma5.value > ma10.value => 5.0,
        _ => 0.0,
    };

    let total =
        (macd_points + rsi_points + boll_points + volume_points + ma_points).clamp(0.0, 100.0);

    Evaluation {
        passes: total >= MULTI_PASS_THRESHOLD,
        score: total,
        details: vec![
            ("macd".to_string(), macd_points),
            ("rsi".to_string(), rsi_points),
            ("boll".to_string(), boll_points),
            ("volume".to_string(), volume_points),
            ("ma".to_string(), ma_points),
        ],
    }
}

fn evaluate_fundamental(
    instrument: &Instrument,
    max_pe: f64,
    max_pb: f64,
    min_market_cap: f64,
) -> Result<Evaluation, StockscreenError> {
    let pe = instrument
        .pe
        .ok_or_else(|| missing(&instrument.code, "pe"))?;
    let pb = instrument
        .pb
        .ok_or_else(|| missing(&instrument.code, "pb"))?;
    let market_cap = instrument
        .market_cap
        .ok_or_else(|| missing(&instrument.code, "market_cap"))?;

    let passes = pe < max_pe && pb < max_pb && market_cap > min_market_cap;
    Ok(Evaluation {
        passes,
        score: if passes { 100.0 } else { 0.0 },
        details: vec![
            ("pe".to_string(), pe),
            ("pb".to_string(), pb),
            ("market_cap".to_string(), market_cap),
        ],
    })
}
