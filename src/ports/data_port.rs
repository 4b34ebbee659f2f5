//! Price data access port trait.

use crate::domain::error::LevtraderError;
use crate::domain::ohlcv::PriceBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `symbol` sorted by date with unique dates, restricted to the
    /// inclusive range when bounds are given.
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, LevtraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, LevtraderError>;

    /// First date, last date and bar count, or `None` when there are no bars.
    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, LevtraderError>;
}
