//! Configuration validation.
//!
//! Validates all config fields before a scan runs, so bad values surface as
//! config errors up front instead of mid-pipeline.

use crate::domain::error::StockscreenError;
use crate::domain::strategy::Strategy;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), StockscreenError> {
    validate_scan_config(config)?;
    validate_indicator_config(config)?;
    validate_strategy_params(config)?;
    Ok(())
}

pub fn validate_scan_config(config: &dyn ConfigPort) -> Result<(), StockscreenError> {
    validate_data_path(config)?;
    validate_dates(config)?;
    validate_limit(config)?;
    validate_max_instruments(config)?;
    validate_deadline(config)?;
    validate_strategy_id(config)?;
    Ok(())
}

pub fn validate_indicator_config(config: &dyn ConfigPort) -> Result<(), StockscreenError> {
    validate_ma_periods(config)?;
    validate_positive_period(config, "macd_fast", 12)?;
    validate_positive_period(config, "macd_slow", 26)?;
    validate_positive_period(config, "macd_signal", 9)?;
    validate_macd_ordering(config)?;
    validate_positive_period(config, "rsi_period", 14)?;
    validate_positive_period(config, "kdj_period", 9)?;
    validate_positive_period(config, "kdj_k_smooth", 3)?;
    validate_positive_period(config, "kdj_d_smooth", 3)?;
    validate_boll(config)?;
    validate_positive_period(config, "volume_ma_period", 20)?;
    validate_positive_period(config, "roc_period", 12)?;
    validate_trend_pair(config)?;
    Ok(())
}

pub fn validate_strategy_params(config: &dyn ConfigPort) -> Result<(), StockscreenError> {
    validate_rsi_oversold(config)?;
    validate_ma_pair(config)?;
    validate_volume_thresholds(config)?;
    validate_boll_tolerance(config)?;
    validate_fundamental_bounds(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> StockscreenError {
    StockscreenError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> StockscreenError {
    StockscreenError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn validate_data_path(config: &dyn ConfigPort) -> Result<(), StockscreenError> {
    match config.get_string("data", "path") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(missing("data", "path")),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), StockscreenError> {
    let start = parse_date(config.get_string("data", "start_date").as_deref(), "start_date")?;
    let end = parse_date(config.get_string("data", "end_date").as_deref(), "end_date")?;

    if start >= end {
        return Err(invalid(
            "data",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

fn parse_date(value: Option<&str>, key: &str) -> Result<NaiveDate, StockscreenError> {
    match value {
        None => Err(missing("data", key)),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| invalid("data", key, format!("invalid {} format, expected YYYY-MM-DD", key))),
    }
}

fn validate_limit(config: &dyn ConfigPort) -> Result<(), StockscreenError> {
    let value = config.get_int("scan", "limit", 50);
    if value < 1 {
        return Err(invalid("scan", "limit", "limit must be at least 1"));
    }
    Ok(())
}

fn validate_max_instruments(config: &dyn ConfigPort) -> Result<(), StockscreenError> {
    if let Some(s) = config.get_string("scan", "max_instruments") {
        match s.trim().parse::<i64>() {
            Ok(value) if value >= 1 => {}
            _ => {
                return Err(invalid(
                    "scan",
                    "max_instruments",
                    "max_instruments must be a positive integer",
                ));
            }
        }
    }
    Ok(())
}

fn validate_deadline(config: &dyn ConfigPort) -> Result<(), StockscreenError> {
    if let Some(s) = config.get_string("scan", "deadline_secs") {
        match s.trim().parse::<i64>() {
            Ok(value) if value >= 1 => {}
            _ => {
                return Err(invalid(
                    "scan",
                    "deadline_secs",
                    "deadline_secs must be a positive integer",
                ));
            }
        }
    }
    Ok(())
}

fn validate_strategy_id(config: &dyn ConfigPort) -> Result<(), StockscreenError> {
    if let Some(id) = config.get_string("scan", "strategy") {
        let id = id.trim();
        if !Strategy::KNOWN_IDS.contains(&id) {
            return Err(invalid(
                "scan",
                "strategy",
                format!("unknown strategy '{}', known: {}", id, Strategy::KNOWN_IDS.join(", ")),
            ));
        }
    }
    Ok(())
}

fn validate_ma_periods(config: &dyn ConfigPort) -> Result<(), StockscreenError> {
    if let Some(list) = config.get_string("indicators", "ma_periods") {
        for token in list.split(',') {
            match token.trim().parse::<usize>() {
                Ok(p) if p >= 1 => {}
                _ => {
                    return Err(invalid(
                        "indicators",
                        "ma_periods",
                        format!("invalid MA period '{}'", token.trim()),
                    ));
                }
            }
        }
    }
    Ok(())
}

fn validate_positive_period(
    config: &dyn ConfigPort,
    key: &str,
    default: i64,
) -> Result<(), StockscreenError> {
    let value = config.get_int("indicators", key, default);
    if value < 1 {
        return Err(invalid(
            "indicators",
            key,
            format!("{} must be at least 1", key),
        ));
    }
    Ok(())
}

fn validate_macd_ordering(config: &dyn ConfigPort) -> Result<(), StockscreenError> {
    let fast = config.get_int("indicators", "macd_fast", 12);
    let slow = config.get_int("indicators", "macd_slow", 26);
    if fast >= slow {
        return Err(invalid(
            "indicators",
            "macd_fast",
            "macd_fast must be less than macd_slow",
        ));
    }
    Ok(())
}

fn validate_boll(config: &dyn ConfigPort) -> Result<(), StockscreenError> {
    let period = config.get_int("indicators", "boll_period", 20);
    if period < 2 {
        return Err(invalid(
            "indicators",
            "boll_period",
            "boll_period must be at least 2",
        ));
    }
    let width = config.get_double("indicators", "boll_width", 2.0);
    if width <= 0.0 {
        return Err(invalid(
            "indicators",
            "boll_width",
            "boll_width must be positive",
        ));
    }
    Ok(())
}

fn validate_trend_pair(config: &dyn ConfigPort) -> Result<(), StockscreenError> {
    let short = config.get_int("indicators", "trend_short_ma", 5);
    let long = config.get_int("indicators", "trend_long_ma", 20);
    if short < 1 || long < 1 {
        return Err(invalid(
            "indicators",
            "trend_short_ma",
            "trend MA periods must be at least 1",
        ));
    }
    if short >= long {
        return Err(invalid(
            "indicators",
            "trend_short_ma",
            "trend_short_ma must be less than trend_long_ma",
        ));
    }
    Ok(())
}

fn validate_rsi_oversold(config: &dyn ConfigPort) -> Result<(), StockscreenError> {
    let value = config.get_double("strategy", "rsi_oversold", 30.0);
    if value <= 0.0 || value >= 100.0 {
        return Err(invalid(
            "strategy",
            "rsi_oversold",
            "rsi_oversold must be between 0 and 100",
        ));
    }
    Ok(())
}

fn validate_ma_pair(config: &dyn ConfigPort) -> Result<(), StockscreenError> {
    let short = config.get_int("strategy", "ma_short", 5);
    let long = config.get_int("strategy", "ma_long", 20);
    if short < 1 || long < 1 {
        return Err(invalid(
            "strategy",
            "ma_short",
            "MA periods must be at least 1",
        ));
    }
    if short >= long {
        return Err(invalid(
            "strategy",
            "ma_short",
            "ma_short must be less than ma_long",
        ));
    }
    Ok(())
}

fn validate_volume_thresholds(config: &dyn ConfigPort) -> Result<(), StockscreenError> {
    let ratio = config.get_double("strategy", "volume_ratio", 2.0);
    if ratio <= 0.0 {
        return Err(invalid(
            "strategy",
            "volume_ratio",
            "volume_ratio must be positive",
        ));
    }
    let min_pct = config.get_double("strategy", "volume_min_pct", 3.0);
    if min_pct < 0.0 {
        return Err(invalid(
            "strategy",
            "volume_min_pct",
            "volume_min_pct must be non-negative",
        ));
    }
    Ok(())
}

fn validate_boll_tolerance(config: &dyn ConfigPort) -> Result<(), StockscreenError> {
    let value = config.get_double("strategy", "boll_tolerance", 1.02);
    if value <= 0.0 {
        return Err(invalid(
            "strategy",
            "boll_tolerance",
            "boll_tolerance must be positive",
        ));
    }
    Ok(())
}

fn validate_fundamental_bounds(config: &dyn ConfigPort) -> Result<(), StockscreenError> {
    let max_pe = config.get_double("strategy", "max_pe", 30.0);
    if max_pe <= 0.0 {
        return Err(invalid("strategy", "max_pe", "max_pe must be positive"));
    }
    let max_pb = config.get_double("strategy", "max_pb", 3.0);
    if max_pb <= 0.0 {
        return Err(invalid("strategy", "max_pb", "max_pb must be positive"));
    }
    let min_cap = config.get_double("strategy", "min_market_cap", 1e10);
    if min_cap < 0.0 {
        return Err(invalid(
            "strategy",
            "min_market_cap",
            "min_market_cap must be non-negative",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const VALID: &str = r#"
[data]
path = /tmp/data
start_date = 2024-01-01
end_date = 2024-12-31

[scan]
strategy = multi
limit = 50
max_instruments = 500
deadline_secs = 30

[indicators]
ma_periods = 5,10,20,60
rsi_period = 14
boll_period = 20
boll_width = 2.0

[strategy]
rsi_oversold = 30
ma_short = 5
ma_long = 20
volume_ratio = 2.0
"#;

    #[test]
    fn valid_config_passes() {
        let config = make_config(VALID);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn defaults_alone_pass() {
        let config = make_config(
            "[data]\npath = /tmp/data\nstart_date = 2024-01-01\nend_date = 2024-12-31\n",
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn missing_data_path_fails() {
        let config = make_config("[data]\nstart_date = 2024-01-01\nend_date = 2024-12-31\n");
        let err = validate_scan_config(&config).unwrap_err();
        assert!(matches!(err, StockscreenError::ConfigMissing { key, .. } if key == "path"));
    }

    #[test]
    fn missing_end_date_fails() {
        let config = make_config("[data]\npath = /tmp\nstart_date = 2024-01-01\n");
        let err = validate_scan_config(&config).unwrap_err();
        assert!(matches!(err, StockscreenError::ConfigMissing { key, .. } if key == "end_date"));
    }

    #[test]
    fn bad_date_format_fails() {
        let config =
            make_config("[data]\npath = /tmp\nstart_date = 2024/01/01\nend_date = 2024-12-31\n");
        let err = validate_scan_config(&config).unwrap_err();
        assert!(matches!(err, StockscreenError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn start_after_end_fails() {
        let config =
            make_config("[data]\npath = /tmp\nstart_date = 2024-12-31\nend_date = 2024-01-01\n");
        let err = validate_scan_config(&config).unwrap_err();
        assert!(matches!(err, StockscreenError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn zero_limit_fails() {
        let config = make_config(
            "[data]\npath = /tmp\nstart_date = 2024-01-01\nend_date = 2024-12-31\n[scan]\nlimit = 0\n",
        );
        let err = validate_scan_config(&config).unwrap_err();
        assert!(matches!(err, StockscreenError::ConfigInvalid { key, .. } if key == "limit"));
    }

    #[test]
    fn non_numeric_max_instruments_fails() {
        let config = make_config(
            "[data]\npath = /tmp\nstart_date = 2024-01-01\nend_date = 2024-12-31\n[scan]\nmax_instruments = many\n",
        );
        let err = validate_scan_config(&config).unwrap_err();
        assert!(
            matches!(err, StockscreenError::ConfigInvalid { key, .. } if key == "max_instruments")
        );
    }

    #[test]
    fn zero_deadline_fails() {
        let config = make_config(
            "[data]\npath = /tmp\nstart_date = 2024-01-01\nend_date = 2024-12-31\n[scan]\ndeadline_secs = 0\n",
        );
        let err = validate_scan_config(&config).unwrap_err();
        assert!(
            matches!(err, StockscreenError::ConfigInvalid { key, .. } if key == "deadline_secs")
        );
    }

    #[test]
    fn unknown_strategy_id_fails() {
        let config = make_config(
            "[data]\npath = /tmp\nstart_date = 2024-01-01\nend_date = 2024-12-31\n[scan]\nstrategy = momentum\n",
        );
        let err = validate_scan_config(&config).unwrap_err();
        assert!(matches!(err, StockscreenError::ConfigInvalid { key, .. } if key == "strategy"));
    }

    #[test]
    fn bad_ma_period_list_fails() {
        let config = make_config("[indicators]\nma_periods = 5,abc,20\n");
        let err = validate_indicator_config(&config).unwrap_err();
        assert!(matches!(err, StockscreenError::ConfigInvalid { key, .. } if key == "ma_periods"));
    }

    #[test]
    fn zero_rsi_period_fails() {
        let config = make_config("[indicators]\nrsi_period = 0\n");
        let err = validate_indicator_config(&config).unwrap_err();
        assert!(matches!(err, StockscreenError::ConfigInvalid { key, .. } if key == "rsi_period"));
    }

    #[test]
    fn macd_fast_not_below_slow_fails() {
        let config = make_config("[indicators]\nmacd_fast = 26\nmacd_slow = 26\n");
        let err = validate_indicator_config(&config).unwrap_err();
        assert!(matches!(err, StockscreenError::ConfigInvalid { key, .. } if key == "macd_fast"));
    }

    #[test]
    fn boll_period_one_fails() {
        let config = make_config("[indicators]\nboll_period = 1\n");
        let err = validate_indicator_config(&config).unwrap_err();
        assert!(matches!(err, StockscreenError::ConfigInvalid { key, .. } if key == "boll_period"));
    }

    #[test]
    fn trend_pair_must_be_ordered() {
        let config = make_config("[indicators]\ntrend_short_ma = 20\ntrend_long_ma = 5\n");
        let err = validate_indicator_config(&config).unwrap_err();
        assert!(
            matches!(err, StockscreenError::ConfigInvalid { key, .. } if key == "trend_short_ma")
        );
    }

    #[test]
    fn rsi_oversold_out_of_range_fails() {
        let config = make_config("[strategy]\nrsi_oversold = 100\n");
        let err = validate_strategy_params(&config).unwrap_err();
        assert!(
            matches!(err, StockscreenError::ConfigInvalid { key, .. } if key == "rsi_oversold")
        );
    }

    #[test]
    fn ma_short_not_below_long_fails() {
        let config = make_config("[strategy]\nma_short = 20\nma_long = 20\n");
        let err = validate_strategy_params(&config).unwrap_err();
        assert!(matches!(err, StockscreenError::ConfigInvalid { key, .. } if key == "ma_short"));
    }

    #[test]
    fn zero_volume_ratio_fails() {
        let config = make_config("[strategy]\nvolume_ratio = 0\n");
        let err = validate_strategy_params(&config).unwrap_err();
        assert!(
            matches!(err, StockscreenError::ConfigInvalid { key, .. } if key == "volume_ratio")
        );
    }

    #[test]
    fn negative_market_cap_floor_fails() {
        let config = make_config("[strategy]\nmin_market_cap = -1\n");
        let err = validate_strategy_params(&config).unwrap_err();
        assert!(
            matches!(err, StockscreenError::ConfigInvalid { key, .. } if key == "min_market_cap")
        );
    }
}
