//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::validate_config;
use crate::domain::error::StockscreenError;
use crate::domain::indicator::{compute_indicators, IndicatorConfig};
use crate::domain::instrument::{parse_codes, Instrument};
use crate::domain::ohlcv::Bar;
use crate::domain::scan::{scan, ScanOptions, ScanReport, SkipReason, SkippedInstrument};
use crate::domain::series::PriceSeries;
use crate::domain::snapshot::{build_snapshot, SignalField, SignalSnapshot};
use crate::domain::strategy::{Strategy, StrategyParams};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::MarketDataPort;

#[derive(Parser, Debug)]
#[command(name = "stockscreen", about = "Technical signal scanner for daily OHLCV bars")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan the universe and rank instruments against a strategy
    Scan {
        #[arg(short, long)]
        config: PathBuf,
        /// Strategy id: macd, rsi, golden_cross, volume, boll, multi, fundamental
        #[arg(short, long)]
        strategy: Option<String>,
        /// Maximum number of ranked rows to print
        #[arg(short, long)]
        limit: Option<usize>,
        /// Comma-separated codes (defaults to the configured universe)
        #[arg(long)]
        codes: Option<String>,
        #[arg(long)]
        market: Option<String>,
        /// Evaluate at most this many instruments
        #[arg(long)]
        max_instruments: Option<usize>,
        /// Wall-clock budget for the scan
        #[arg(long)]
        deadline_secs: Option<u64>,
    },
    /// Print the latest signal snapshot for one instrument
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: String,
        #[arg(long)]
        market: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List the instrument universe
    ListUniverse {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for instrument(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        market: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Scan {
            config,
            strategy,
            limit,
            codes,
            market,
            max_instruments,
            deadline_secs,
        } => run_scan(
            &config,
            strategy.as_deref(),
            limit,
            codes.as_deref(),
            market.as_deref(),
            max_instruments,
            deadline_secs,
        ),
        Command::Analyze {
            config,
            code,
            market,
        } => run_analyze(&config, &code, market.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::ListUniverse { config } => run_list_universe(&config),
        Command::Info {
            config,
            code,
            market,
        } => run_info(&config, code.as_deref(), market.as_deref()),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        eprintln!("error: {e}");
        (&e).into()
    })
}

fn run_scan(
    config_path: &PathBuf,
    strategy_override: Option<&str>,
    limit_override: Option<usize>,
    codes_override: Option<&str>,
    market_override: Option<&str>,
    max_instruments_override: Option<usize>,
    deadline_override: Option<u64>,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_config(&config) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    // Stage 2: Build indicator config and strategy
    let indicator_config = match build_indicator_config(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let params = build_strategy_params(&config);
    let strategy_id = resolve_strategy_id(strategy_override, &config);
    let strategy = match Strategy::from_id(&strategy_id, &params) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!("Strategy: {}", strategy);

    // Stage 3: Date range and data adapter
    let (start_date, end_date) = match build_date_range(&config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let adapter = match build_data_adapter(&config) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 4: Resolve the instrument set
    let instruments = match resolve_instruments(codes_override, market_override, &config, &adapter)
    {
        Ok(i) => i,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if instruments.is_empty() {
        eprintln!("error: no instruments to scan");
        return ExitCode::from(5);
    }

    // Stage 5: Fetch bars; fetch failures become recorded skips
    eprintln!(
        "Fetching bars for {} instruments ({} to {})",
        instruments.len(),
        start_date,
        end_date
    );
    let mut batch: Vec<(Instrument, Vec<Bar>)> = Vec::new();
    let mut fetch_skips: Vec<SkippedInstrument> = Vec::new();
    for instrument in instruments {
        match adapter.fetch_series(&instrument.code, &instrument.market, start_date, end_date) {
            Ok(bars) => batch.push((instrument, bars)),
            Err(e) => fetch_skips.push(SkippedInstrument {
                code: instrument.code.clone(),
                reason: SkipReason::from_error(&e),
            }),
        }
    }

    // Stage 6: Run the scan
    let options = build_scan_options(
        &config,
        limit_override,
        max_instruments_override,
        deadline_override,
    );
    eprintln!("Scanning {} instruments...", batch.len());
    let mut report = scan(batch, &strategy, &indicator_config, &options);
    report.skipped.extend(fetch_skips);

    // Stage 7: Print ranked rows on stdout, skips and summary on stderr
    print_scan_report(&report, &strategy);
    ExitCode::SUCCESS
}

fn print_scan_report(report: &ScanReport, strategy: &Strategy) {
    for skip in &report.skipped {
        eprintln!("warning: skipped {} ({})", skip.code, skip.reason);
    }

    if report.rows.is_empty() {
        eprintln!("No instruments passed: {}", strategy);
    } else {
        println!(
            "{:<5} {:<10} {:<20} {:>7}  {}",
            "rank", "code", "name", "score", "signals"
        );
        for (i, row) in report.rows.iter().enumerate() {
            let details: Vec<String> = row
                .details
                .iter()
                .map(|(field, value)| format!("{}={:.2}", field, value))
                .collect();
            println!(
                "{:<5} {:<10} {:<20} {:>7.1}  {}",
                i + 1,
                row.code,
                row.name,
                row.score,
                details.join(" ")
            );
        }
    }

    eprintln!(
        "\n{} evaluated, {} passed shown, {} skipped",
        report.evaluated,
        report.rows.len(),
        report.skipped.len()
    );
}

fn run_analyze(config_path: &PathBuf, code: &str, market_override: Option<&str>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_config(&config) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let mut indicator_config = match build_indicator_config(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    // The analyze view always shows the full indicator panel.
    indicator_config.include_obv = true;
    indicator_config.include_roc = true;

    let (start_date, end_date) = match build_date_range(&config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let adapter = match build_data_adapter(&config) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let market = resolve_market(market_override, &config);
    let code = code.trim().to_uppercase();

    let snapshot = match analyze_instrument(
        &adapter,
        &code,
        &market,
        start_date,
        end_date,
        &indicator_config,
    ) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    print_snapshot(&snapshot, &market);
    ExitCode::SUCCESS
}

fn analyze_instrument(
    adapter: &dyn MarketDataPort,
    code: &str,
    market: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    indicator_config: &IndicatorConfig,
) -> Result<SignalSnapshot, StockscreenError> {
    let bars = adapter.fetch_series(code, market, start_date, end_date)?;
    let series = PriceSeries::new(code, bars)?;
    let indicators = compute_indicators(&series, indicator_config)?;
    build_snapshot(&series, &indicators, indicator_config)
}

fn fmt_field(field: Option<SignalField>) -> String {
    match field {
        Some(f) if f.stale => format!("{:.2}*", f.value),
        Some(f) => format!("{:.2}", f.value),
        None => "-".to_string(),
    }
}

fn print_snapshot(snapshot: &SignalSnapshot, market: &str) {
    println!("{} ({})  {}", snapshot.code, market, snapshot.date);

    let change = match snapshot.pct_change {
        Some(pct) => format!("{:+.2}%", pct),
        None => "-".to_string(),
    };
    println!(
        "close {:.2}  change {}  volume {:.0}",
        snapshot.close, change, snapshot.volume
    );
    println!("trend {:?}", snapshot.trend);
    println!();

    let mut periods: Vec<usize> = snapshot.ma.keys().copied().collect();
    periods.sort_unstable();
    for period in periods {
        println!(
            "MA({:<2})  {}",
            period,
            fmt_field(snapshot.ma.get(&period).copied())
        );
    }

    println!(
        "MACD    line {}  signal {}  histogram {}  cross {:?}",
        fmt_field(snapshot.macd_line),
        fmt_field(snapshot.macd_signal),
        fmt_field(snapshot.macd_histogram),
        snapshot.macd_cross
    );
    println!(
        "KDJ     K {}  D {}  J {}  cross {:?}",
        fmt_field(snapshot.kdj_k),
        fmt_field(snapshot.kdj_d),
        fmt_field(snapshot.kdj_j),
        snapshot.kdj_cross
    );
    println!("RSI     {}", fmt_field(snapshot.rsi));
    println!(
        "BOLL    upper {}  middle {}  lower {}  %B {}",
        fmt_field(snapshot.boll_upper),
        fmt_field(snapshot.boll_middle),
        fmt_field(snapshot.boll_lower),
        fmt_field(snapshot.boll_pct)
    );

    let ratio = match snapshot.volume_ratio {
        Some(r) => format!("{:.2}", r),
        None => "-".to_string(),
    };
    println!(
        "VOLUME  ma {}  ratio {}",
        fmt_field(snapshot.volume_ma),
        ratio
    );
    println!("OBV     {}", fmt_field(snapshot.obv));
    println!("ROC     {}", fmt_field(snapshot.roc));
}

pub fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    if let Err(e) = validate_config(&config) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    eprintln!("Configuration is valid.");
    ExitCode::SUCCESS
}

fn run_list_universe(config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let adapter = match build_data_adapter(&config) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let universe = match adapter.fetch_universe() {
        Ok(u) => u,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if universe.is_empty() {
        eprintln!("Universe is empty");
        return ExitCode::SUCCESS;
    }

    println!(
        "{:<10} {:<24} {:<6} {:>8} {:>8} {:>16}",
        "code", "name", "market", "pe", "pb", "market_cap"
    );
    for instrument in &universe {
        println!(
            "{:<10} {:<24} {:<6} {:>8} {:>8} {:>16}",
            instrument.code,
            instrument.name,
            instrument.market,
            fmt_fundamental(instrument.pe),
            fmt_fundamental(instrument.pb),
            fmt_fundamental(instrument.market_cap)
        );
    }
    eprintln!("{} instruments in universe", universe.len());
    ExitCode::SUCCESS
}

fn fmt_fundamental(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}

fn run_info(config_path: &PathBuf, code: Option<&str>, market_override: Option<&str>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let adapter = match build_data_adapter(&config) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let market = resolve_market(market_override, &config);
    let codes: Vec<String> = match code {
        Some(c) => vec![c.trim().to_uppercase()],
        None => match resolve_codes(None, &config) {
            Ok(Some(codes)) => codes,
            Ok(None) => match adapter.fetch_universe() {
                Ok(universe) => universe.into_iter().map(|i| i.code).collect(),
                Err(e) => {
                    eprintln!("error: {e}");
                    return (&e).into();
                }
            },
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        },
    };

    if codes.is_empty() {
        eprintln!("error: no codes configured");
        return ExitCode::from(2);
    }

    for c in &codes {
        match adapter.data_range(c, &market) {
            Ok(Some((first, last, count))) => {
                println!("{}.{}: {} bars, {} to {}", c, market, count, first, last);
            }
            Ok(None) => {
                eprintln!("{}.{}: no data found", c, market);
            }
            Err(e) => {
                eprintln!("error querying {}.{}: {}", c, market, e);
            }
        }
    }
    ExitCode::SUCCESS
}

pub fn build_date_range(
    config: &dyn ConfigPort,
) -> Result<(NaiveDate, NaiveDate), StockscreenError> {
    let start_str =
        config
            .get_string("data", "start_date")
            .ok_or_else(|| StockscreenError::ConfigMissing {
                section: "data".into(),
                key: "start_date".into(),
            })?;
    let end_str =
        config
            .get_string("data", "end_date")
            .ok_or_else(|| StockscreenError::ConfigMissing {
                section: "data".into(),
                key: "end_date".into(),
            })?;

    let start_date = NaiveDate::parse_from_str(&start_str, "%Y-%m-%d").map_err(|_| {
        StockscreenError::ConfigInvalid {
            section: "data".into(),
            key: "start_date".into(),
            reason: "invalid date format (expected YYYY-MM-DD)".into(),
        }
    })?;
    let end_date = NaiveDate::parse_from_str(&end_str, "%Y-%m-%d").map_err(|_| {
        StockscreenError::ConfigInvalid {
            section: "data".into(),
            key: "end_date".into(),
            reason: "invalid date format (expected YYYY-MM-DD)".into(),
        }
    })?;

    Ok((start_date, end_date))
}

pub fn build_data_adapter(config: &dyn ConfigPort) -> Result<CsvAdapter, StockscreenError> {
    let path = config
        .get_string("data", "path")
        .ok_or_else(|| StockscreenError::ConfigMissing {
            section: "data".into(),
            key: "path".into(),
        })?;
    Ok(CsvAdapter::new(PathBuf::from(path)))
}

pub fn build_indicator_config(
    config: &dyn ConfigPort,
) -> Result<IndicatorConfig, StockscreenError> {
    let mut ic = IndicatorConfig::default();

    if let Some(tokens) = config.get_list("indicators", "ma_periods") {
        ic.ma_periods = parse_period_list(&tokens, "ma_periods")?;
    }
    if let Some(tokens) = config.get_list("indicators", "ema_periods") {
        ic.ema_periods = parse_period_list(&tokens, "ema_periods")?;
    }

    ic.macd_fast = config.get_int("indicators", "macd_fast", ic.macd_fast as i64) as usize;
    ic.macd_slow = config.get_int("indicators", "macd_slow", ic.macd_slow as i64) as usize;
    ic.macd_signal = config.get_int("indicators", "macd_signal", ic.macd_signal as i64) as usize;
    ic.rsi_period = config.get_int("indicators", "rsi_period", ic.rsi_period as i64) as usize;
    ic.kdj_period = config.get_int("indicators", "kdj_period", ic.kdj_period as i64) as usize;
    ic.kdj_k_smooth =
        config.get_int("indicators", "kdj_k_smooth", ic.kdj_k_smooth as i64) as usize;
    ic.kdj_d_smooth =
        config.get_int("indicators", "kdj_d_smooth", ic.kdj_d_smooth as i64) as usize;
    ic.boll_period = config.get_int("indicators", "boll_period", ic.boll_period as i64) as usize;

    let default_width = f64::from(ic.boll_width_x100) / 100.0;
    let width = config.get_double("indicators", "boll_width", default_width);
    ic.boll_width_x100 = (width * 100.0).round() as u32;

    ic.volume_ma_period =
        config.get_int("indicators", "volume_ma_period", ic.volume_ma_period as i64) as usize;
    ic.trend_short_ma =
        config.get_int("indicators", "trend_short_ma", ic.trend_short_ma as i64) as usize;
    ic.trend_long_ma =
        config.get_int("indicators", "trend_long_ma", ic.trend_long_ma as i64) as usize;

    ic.include_obv = config.get_bool("indicators", "include_obv", ic.include_obv);
    ic.include_roc = config.get_bool("indicators", "include_roc", ic.include_roc);
    ic.roc_period = config.get_int("indicators", "roc_period", ic.roc_period as i64) as usize;

    Ok(ic)
}

fn parse_period_list(tokens: &[String], key: &str) -> Result<Vec<usize>, StockscreenError> {
    let mut periods = Vec::with_capacity(tokens.len());
    for token in tokens {
        let period = token
            .parse::<usize>()
            .map_err(|_| StockscreenError::ConfigInvalid {
                section: "indicators".into(),
                key: key.into(),
                reason: format!("invalid period '{}'", token),
            })?;
        periods.push(period);
    }
    Ok(periods)
}

pub fn build_strategy_params(config: &dyn ConfigPort) -> StrategyParams {
    let d = StrategyParams::default();
    StrategyParams {
        rsi_oversold: config.get_double("strategy", "rsi_oversold", d.rsi_oversold),
        ma_short: config.get_int("strategy", "ma_short", d.ma_short as i64) as usize,
        ma_long: config.get_int("strategy", "ma_long", d.ma_long as i64) as usize,
        volume_ratio: config.get_double("strategy", "volume_ratio", d.volume_ratio),
        volume_min_pct: config.get_double("strategy", "volume_min_pct", d.volume_min_pct),
        boll_tolerance: config.get_double("strategy", "boll_tolerance", d.boll_tolerance),
        max_pe: config.get_double("strategy", "max_pe", d.max_pe),
        max_pb: config.get_double("strategy", "max_pb", d.max_pb),
        min_market_cap: config.get_double("strategy", "min_market_cap", d.min_market_cap),
    }
}

pub fn build_scan_options(
    config: &dyn ConfigPort,
    limit_override: Option<usize>,
    max_instruments_override: Option<usize>,
    deadline_override: Option<u64>,
) -> ScanOptions {
    let defaults = ScanOptions::default();

    let limit = limit_override
        .unwrap_or_else(|| config.get_int("scan", "limit", defaults.limit as i64) as usize);

    let max_instruments = max_instruments_override.or_else(|| {
        config
            .get_string("scan", "max_instruments")
            .and_then(|s| s.trim().parse().ok())
    });

    let deadline_secs: Option<u64> = deadline_override.or_else(|| {
        config
            .get_string("scan", "deadline_secs")
            .and_then(|s| s.trim().parse().ok())
    });

    ScanOptions {
        limit,
        max_instruments,
        // A deadline too far out to represent as an Instant is no deadline.
        deadline: deadline_secs
            .and_then(|secs| Instant::now().checked_add(Duration::from_secs(secs))),
    }
}

pub fn resolve_strategy_id(strategy_override: Option<&str>, config: &dyn ConfigPort) -> String {
    if let Some(id) = strategy_override {
        return id.trim().to_string();
    }
    config
        .get_string("scan", "strategy")
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "multi".to_string())
}

pub fn resolve_market(market_override: Option<&str>, config: &dyn ConfigPort) -> String {
    if let Some(m) = market_override {
        return m.trim().to_uppercase();
    }
    config
        .get_string("scan", "market")
        .map(|m| m.trim().to_uppercase())
        .unwrap_or_else(|| "SH".to_string())
}

/// Explicit code list from the CLI flag or the `[scan]` section.
/// `Ok(None)` means no explicit list: scan the whole universe.
pub fn resolve_codes(
    codes_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Option<Vec<String>>, StockscreenError> {
    let raw = match codes_override {
        Some(c) => Some(c.to_string()),
        None => config
            .get_string("scan", "codes")
            .or_else(|| config.get_string("scan", "code")),
    };

    match raw {
        None => Ok(None),
        Some(raw) => parse_codes(&raw).map(Some).map_err(|e| {
            StockscreenError::ConfigInvalid {
                section: "scan".into(),
                key: "codes".into(),
                reason: e.to_string(),
            }
        }),
    }
}

fn resolve_instruments(
    codes_override: Option<&str>,
    market_override: Option<&str>,
    config: &dyn ConfigPort,
    adapter: &dyn MarketDataPort,
) -> Result<Vec<Instrument>, StockscreenError> {
    match resolve_codes(codes_override, config)? {
        None => adapter.fetch_universe(),
        Some(codes) => {
            let market = resolve_market(market_override, config);
            // Pick up names and fundamentals for codes the universe knows.
            let by_code: HashMap<String, Instrument> = adapter
                .fetch_universe()
                .map(|universe| {
                    universe
                        .into_iter()
                        .map(|i| (i.code.clone(), i))
                        .collect()
                })
                .unwrap_or_default();

            Ok(codes
                .into_iter()
                .map(|code| match by_code.get(&code) {
                    Some(known) => known.clone(),
                    None => Instrument::new(code.clone(), code, market.clone()),
                })
                .collect())
        }
    }
}
