//! INI file configuration adapter.

use crate::domain::error::StockscreenError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StockscreenError> {
        let mut config = Ini::new();
        config
            .load(path.as_ref())
            .map_err(|reason| StockscreenError::ConfigParse {
                file: path.as_ref().display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[data]
path = /var/data/bars
start_date = 2024-01-01

[scan]
strategy = multi
limit = 20

[strategy]
rsi_oversold = 25.0
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("data", "path"),
            Some("/var/data/bars".to_string())
        );
        assert_eq!(
            adapter.get_string("scan", "strategy"),
            Some("multi".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[scan]\nlimit = 20\n").unwrap();
        assert_eq!(adapter.get_string("scan", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_value() {
        let adapter = FileConfigAdapter::from_string("[scan]\nlimit = 20\n").unwrap();
        assert_eq!(adapter.get_int("scan", "limit", 50), 20);
    }

    #[test]
    fn get_int_returns_default_for_missing() {
        let adapter = FileConfigAdapter::from_string("[scan]\n").unwrap();
        assert_eq!(adapter.get_int("scan", "limit", 50), 50);
    }

    #[test]
    fn get_int_returns_default_for_non_numeric() {
        let adapter = FileConfigAdapter::from_string("[scan]\nlimit = abc\n").unwrap();
        assert_eq!(adapter.get_int("scan", "limit", 50), 50);
    }

    #[test]
    fn get_double_returns_value() {
        let adapter =
            FileConfigAdapter::from_string("[strategy]\nrsi_oversold = 25.5\n").unwrap();
        assert_eq!(adapter.get_double("strategy", "rsi_oversold", 30.0), 25.5);
    }

    #[test]
    fn get_double_returns_default_for_missing() {
        let adapter = FileConfigAdapter::from_string("[strategy]\n").unwrap();
        assert_eq!(adapter.get_double("strategy", "rsi_oversold", 30.0), 30.0);
    }

    #[test]
    fn get_double_returns_default_for_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[strategy]\nrsi_oversold = low\n").unwrap();
        assert_eq!(adapter.get_double("strategy", "rsi_oversold", 30.0), 30.0);
    }

    #[test]
    fn get_bool_returns_true_values() {
        let adapter =
            FileConfigAdapter::from_string("[indicators]\na = true\nb = yes\nc = 1\n").unwrap();
        assert!(adapter.get_bool("indicators", "a", false));
        assert!(adapter.get_bool("indicators", "b", false));
        assert!(adapter.get_bool("indicators", "c", false));
    }

    #[test]
    fn get_bool_returns_false_values() {
        let adapter =
            FileConfigAdapter::from_string("[indicators]\na = false\nb = no\nc = 0\n").unwrap();
        assert!(!adapter.get_bool("indicators", "a", true));
        assert!(!adapter.get_bool("indicators", "b", true));
        assert!(!adapter.get_bool("indicators", "c", true));
    }

    #[test]
    fn get_bool_returns_default_for_missing() {
        let adapter = FileConfigAdapter::from_string("[indicators]\n").unwrap();
        assert!(adapter.get_bool("indicators", "include_obv", true));
        assert!(!adapter.get_bool("indicators", "include_obv", false));
    }

    #[test]
    fn get_list_splits_and_trims() {
        let adapter =
            FileConfigAdapter::from_string("[indicators]\nma_periods = 5, 10 ,20,,60\n").unwrap();
        assert_eq!(
            adapter.get_list("indicators", "ma_periods"),
            Some(vec![
                "5".to_string(),
                "10".to_string(),
                "20".to_string(),
                "60".to_string()
            ])
        );
        assert_eq!(adapter.get_list("indicators", "missing"), None);
    }

    #[test]
    fn from_file_reads_config() {
        let content = "[data]\npath = /var/data/bars\n";
        let file = create_temp_config(content);
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("data", "path"),
            Some("/var/data/bars".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(matches!(
            result,
            Err(StockscreenError::ConfigParse { .. })
        ));
    }

    #[test]
    fn handles_all_config_sections() {
        let content = r#"
[data]
path = /var/data/bars
start_date = 2024-01-01
end_date = 2024-12-31

[scan]
strategy = macd
limit = 10
market = SH

[indicators]
rsi_period = 14
include_obv = true

[strategy]
rsi_oversold = 30.0
volume_ratio = 2.0
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();

        assert_eq!(
            adapter.get_string("data", "start_date"),
            Some("2024-01-01".to_string())
        );
        assert_eq!(adapter.get_string("scan", "market"), Some("SH".to_string()));
        assert_eq!(adapter.get_int("scan", "limit", 50), 10);
        assert_eq!(adapter.get_int("indicators", "rsi_period", 14), 14);
        assert!(adapter.get_bool("indicators", "include_obv", false));
        assert_eq!(adapter.get_double("strategy", "volume_ratio", 0.0), 2.0);
    }
}
