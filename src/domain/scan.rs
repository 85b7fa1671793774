//! Batch scan pipeline.
//!
//! `scan` takes a batch of instruments with their raw bars, reduces each one
//! to a signal snapshot, evaluates the strategy, and returns the passing rows
//! ranked. Instruments are independent, so evaluation fans out across the
//! rayon thread pool; collection preserves input order, which keeps the
//! final ranking deterministic.
//!
//! Per-instrument failures never abort the batch: each is recorded with a
//! `SkipReason` and the scan completes with partial results. The same
//! applies to the deadline and the instrument budget, which drop work but
//! still report what was dropped.

use crate::domain::error::StockscreenError;
use crate::domain::indicator::{IndicatorConfig, compute_indicators};
use crate::domain::instrument::Instrument;
use crate::domain::ohlcv::Bar;
use crate::domain::series::PriceSeries;
use crate::domain::snapshot::build_snapshot;
use crate::domain::strategy::{Strategy, StrategyResult, rank_results};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fmt;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Maximum rows in the output, applied after ranking the full batch.
    pub limit: usize,
    /// Hard cap on instruments processed; the rest are reported as skipped.
    pub max_instruments: Option<usize>,
    /// Instruments not yet started by this point are dropped, not awaited.
    pub deadline: Option<Instant>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            limit: 50,
            max_instruments: None,
            deadline: None,
        }
    }
}

/// Why one instrument produced no result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoData,
    InsufficientData { bars: usize, minimum: usize },
    MalformedBar(String),
    MissingField(String),
    DeadlineExpired,
    BudgetExceeded,
    Other(String),
}

impl SkipReason {
    pub fn from_error(err: &StockscreenError) -> Self {
        match err {
            StockscreenError::NoData { .. } => SkipReason::NoData,
            StockscreenError::InsufficientData { bars, minimum, .. } => {
                SkipReason::InsufficientData {
                    bars: *bars,
                    minimum: *minimum,
                }
            }
            StockscreenError::MalformedBar { reason, .. } => {
                SkipReason::MalformedBar(reason.to_string())
            }
            StockscreenError::StrategyFieldMissing { field, .. } => {
                SkipReason::MissingField(field.clone())
            }
            other => SkipReason::Other(other.to_string()),
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoData => write!(f, "no data"),
            SkipReason::InsufficientData { bars, minimum } => {
                write!(f, "insufficient data: {} bars, need {}", bars, minimum)
            }
            SkipReason::MalformedBar(reason) => write!(f, "malformed bar: {}", reason),
            SkipReason::MissingField(field) => write!(f, "missing field: {}", field),
            SkipReason::DeadlineExpired => write!(f, "deadline expired"),
            SkipReason::BudgetExceeded => write!(f, "instrument budget exceeded"),
            SkipReason::Other(reason) => write!(f, "{}", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SkippedInstrument {
    pub code: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub struct ScanReport {
    /// Passing rows, ranked and capped at `limit`.
    pub rows: Vec<StrategyResult>,
    pub skipped: Vec<SkippedInstrument>,
    /// Instruments that were fully evaluated, passing or not.
    pub evaluated: usize,
}

enum Outcome {
    Row(StrategyResult),
    NonPassing,
    Skipped(SkippedInstrument),
}

pub fn scan(
    batch: Vec<(Instrument, Vec<Bar>)>,
    strategy: &Strategy,
    config: &IndicatorConfig,
    options: &ScanOptions,
) -> ScanReport {
    let mut config = config.clone();
    for period in strategy.required_ma_periods() {
        config.ensure_ma(period);
    }

    let mut batch = batch;
    let mut seen = HashSet::new();
    batch.retain(|(instrument, _)| seen.insert(instrument.code.clone()));

    let over_budget = match options.max_instruments {
        Some(max) if batch.len() > max => batch.split_off(max),
        _ => Vec::new(),
    };

    let outcomes: Vec<Outcome> = batch
        .into_par_iter()
        .map(|(instrument, bars)| {
            if options.deadline.is_some_and(|d| Instant::now() >= d) {
                return Outcome::Skipped(SkippedInstrument {
                    code: instrument.code,
                    reason: SkipReason::DeadlineExpired,
                });
            }
            match evaluate_instrument(&instrument, bars, strategy, &config) {
                Ok(Some(row)) => Outcome::Row(row),
                Ok(None) => Outcome::NonPassing,
                Err(err) => {
                    let reason = SkipReason::from_error(&err);
                    Outcome::Skipped(SkippedInstrument {
                        code: instrument.code,
                        reason,
                    })
                }
            }
        })
        .collect();

    let mut rows = Vec::new();
    let mut skipped = Vec::new();
    let mut evaluated = 0;
    for outcome in outcomes {
        match outcome {
            Outcome::Row(row) => {
                evaluated += 1;
                rows.push(row);
            }
            Outcome::NonPassing => evaluated += 1,
            Outcome::Skipped(skip) => skipped.push(skip),
        }
    }
    for (instrument, _) in over_budget {
        skipped.push(SkippedInstrument {
            code: instrument.code,
            reason: SkipReason::BudgetExceeded,
        });
    }

    rank_results(&mut rows);
    rows.truncate(options.limit);

    ScanReport {
        rows,
        skipped,
        evaluated,
    }
}

fn evaluate_instrument(
    instrument: &Instrument,
    bars: Vec<Bar>,
    strategy: &Strategy,
    config: &IndicatorConfig,
) -> Result<Option<StrategyResult>, StockscreenError> {
    if bars.is_empty() {
        return Err(StockscreenError::NoData {
            code: instrument.code.clone(),
            market: instrument.market.clone(),
        });
    }

    let series = PriceSeries::new(instrument.code.clone(), bars)?;
    let indicators = compute_indicators(&series, config)?;
    let snapshot = build_snapshot(&series, &indicators, config)?;
    let eval = strategy.evaluate(instrument, &snapshot)?;

    Ok(eval.passes.then(|| StrategyResult {
        code: snapshot.code,
        name: instrument.name.clone(),
        score: eval.score,
        details: eval.details,
    }))
}
