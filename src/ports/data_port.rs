//! Market data access port trait.

use crate::domain::error::StockscreenError;
use crate::domain::instrument::Instrument;
use crate::domain::ohlcv::Bar;
use chrono::NaiveDate;

pub trait MarketDataPort {
    /// Daily bars for one instrument, ascending by date, filtered to
    /// `[start_date, end_date]` inclusive.
    fn fetch_series(
        &self,
        code: &str,
        market: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, StockscreenError>;

    /// Every instrument the source knows about, with fundamentals where
    /// the source carries them.
    fn fetch_universe(&self) -> Result<Vec<Instrument>, StockscreenError>;

    /// `(first_date, last_date, bar_count)` for an instrument, or `None`
    /// when the source has no rows for it.
    fn data_range(
        &self,
        code: &str,
        market: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StockscreenError>;
}
