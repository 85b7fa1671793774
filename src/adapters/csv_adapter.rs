//! CSV file market data adapter.
//!
//! Bars live in one file per instrument named `{code}_{market}.csv` with
//! columns `date,open,high,low,close,volume[,amount]`. The instrument
//! universe lives in `universe.csv` with columns
//! `code,name,market[,pe,pb,market_cap]`; the fundamental columns may be
//! empty for instruments without published figures.

use crate::domain::error::StockscreenError;
use crate::domain::instrument::Instrument;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::MarketDataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn series_path(&self, code: &str, market: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", code, market))
    }

    fn universe_path(&self) -> PathBuf {
        self.base_path.join("universe.csv")
    }

    fn read_bars(&self, code: &str, market: &str) -> Result<Vec<Bar>, StockscreenError> {
        let path = self.series_path(code, market);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StockscreenError::NoData {
                    code: code.to_string(),
                    market: market.to_string(),
                });
            }
            Err(e) => {
                return Err(StockscreenError::DataSource {
                    reason: format!("failed to read {}: {}", path.display(), e),
                });
            }
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| StockscreenError::DataSource {
                reason: format!("{}: CSV parse error: {}", path.display(), e),
            })?;

            let date_str = required_field(&record, 0, "date", &path)?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                StockscreenError::DataSource {
                    reason: format!("{}: invalid date '{}': {}", path.display(), date_str, e),
                }
            })?;

            let open = parse_number(&record, 1, "open", &path)?;
            let high = parse_number(&record, 2, "high", &path)?;
            let low = parse_number(&record, 3, "low", &path)?;
            let close = parse_number(&record, 4, "close", &path)?;
            let volume = parse_number(&record, 5, "volume", &path)?;
            let amount = parse_optional_number(&record, 6, "amount", &path)?;

            bars.push(Bar {
                date,
                open,
                high,
                low,
                close,
                volume,
                amount,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

fn required_field<'r>(
    record: &'r csv::StringRecord,
    index: usize,
    name: &str,
    path: &PathBuf,
) -> Result<&'r str, StockscreenError> {
    record
        .get(index)
        .ok_or_else(|| StockscreenError::DataSource {
            reason: format!("{}: missing {} column", path.display(), name),
        })
}

fn parse_number(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    path: &PathBuf,
) -> Result<f64, StockscreenError> {
    let raw = required_field(record, index, name, path)?;
    raw.trim()
        .parse()
        .map_err(|e| StockscreenError::DataSource {
            reason: format!("{}: invalid {} value '{}': {}", path.display(), name, raw, e),
        })
}

fn parse_optional_number(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    path: &PathBuf,
) -> Result<Option<f64>, StockscreenError> {
    match record.get(index) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| StockscreenError::DataSource {
                reason: format!("{}: invalid {} value '{}': {}", path.display(), name, raw, e),
            }),
    }
}

impl MarketDataPort for CsvAdapter {
    fn fetch_series(
        &self,
        code: &str,
        market: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, StockscreenError> {
        let mut bars = self.read_bars(code, market)?;
        bars.retain(|b| b.date >= start_date && b.date <= end_date);

        if bars.is_empty() {
            return Err(StockscreenError::NoData {
                code: code.to_string(),
                market: market.to_string(),
            });
        }
        Ok(bars)
    }

    fn fetch_universe(&self) -> Result<Vec<Instrument>, StockscreenError> {
        let path = self.universe_path();
        let content =
            fs::read_to_string(&path).map_err(|e| StockscreenError::DataSource {
                reason: format!("failed to read {}: {}", path.display(), e),
            })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut instruments = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| StockscreenError::DataSource {
                reason: format!("{}: CSV parse error: {}", path.display(), e),
            })?;

            let code = required_field(&record, 0, "code", &path)?.trim().to_string();
            let name = required_field(&record, 1, "name", &path)?.trim().to_string();
            let market = required_field(&record, 2, "market", &path)?
                .trim()
                .to_string();

            let mut instrument = Instrument::new(code, name, market);
            instrument.pe = parse_optional_number(&record, 3, "pe", &path)?;
            instrument.pb = parse_optional_number(&record, 4, "pb", &path)?;
            instrument.market_cap = parse_optional_number(&record, 5, "market_cap", &path)?;
            instruments.push(instrument);
        }

        Ok(instruments)
    }

    fn data_range(
        &self,
        code: &str,
        market: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StockscreenError> {
        let bars = match self.read_bars(code, market) {
            Ok(bars) => bars,
            Err(StockscreenError::NoData { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Ok(Some((first.date, last.date, bars.len()))),
            _ => Ok(None),
        }
    }
}
