#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashMap;
use stockscreen::domain::error::StockscreenError;
use stockscreen::domain::instrument::Instrument;
pub use stockscreen::domain::ohlcv::Bar;
use stockscreen::ports::data_port::MarketDataPort;

pub struct MockDataPort {
    pub bars: HashMap<String, Vec<Bar>>,
    pub universe: Vec<Instrument>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            bars: HashMap::new(),
            universe: Vec::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<Bar>) -> Self {
        self.universe.push(make_instrument(code));
        self.bars.insert(code.to_string(), bars);
        self
    }

    pub fn with_instrument(mut self, instrument: Instrument, bars: Vec<Bar>) -> Self {
        self.bars.insert(instrument.code.clone(), bars);
        self.universe.push(instrument);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.universe.push(make_instrument(code));
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl MarketDataPort for MockDataPort {
    fn fetch_series(
        &self,
        code: &str,
        market: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, StockscreenError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(StockscreenError::DataSource {
                reason: reason.clone(),
            });
        }
        let bars: Vec<Bar> = self
            .bars
            .get(code)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if bars.is_empty() {
            return Err(StockscreenError::NoData {
                code: code.to_string(),
                market: market.to_string(),
            });
        }
        Ok(bars)
    }

    fn fetch_universe(&self) -> Result<Vec<Instrument>, StockscreenError> {
        Ok(self.universe.clone())
    }

    fn data_range(
        &self,
        code: &str,
        _market: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StockscreenError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(StockscreenError::DataSource {
                reason: reason.clone(),
            });
        }
        match self.bars.get(code) {
            Some(bars) if !bars.is_empty() => {
                let first = bars.iter().map(|b| b.date).min().unwrap();
                let last = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((first, last, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(date_str: &str, close: f64) -> Bar {
    make_bar_with_volume(date_str, close, 1000.0)
}

pub fn make_bar_with_volume(date_str: &str, close: f64, volume: f64) -> Bar {
    Bar {
        date: NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap(),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume,
        amount: None,
    }
}

pub fn make_instrument(code: &str) -> Instrument {
    Instrument::new(code, format!("{} Co", code), "SH")
}

pub fn make_instrument_with_fundamentals(
    code: &str,
    pe: f64,
    pb: f64,
    market_cap: f64,
) -> Instrument {
    let mut instrument = make_instrument(code);
    instrument.pe = Some(pe);
    instrument.pb = Some(pb);
    instrument.market_cap = Some(market_cap);
    instrument
}

/// Bars climbing one unit per day from `start_price`, constant volume.
pub fn generate_bars(start_date: &str, count: usize, start_price: f64) -> Vec<Bar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    (0..count)
        .map(|i| {
            let close = start_price + i as f64;
            Bar {
                date: start + chrono::Duration::days(i as i64),
                open: close - 1.0,
                high: close + 1.0,
                low: close - 2.0,
                close,
                volume: 1000.0,
                amount: None,
            }
        })
        .collect()
}

/// Bars from explicit closes, one trading day apart, constant volume.
pub fn bars_from_closes(start_date: &str, closes: &[f64]) -> Vec<Bar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
            amount: None,
        })
        .collect()
}
