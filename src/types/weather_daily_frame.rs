//! Contains the `WeatherDailyFrame` structure for lazy queries over the daily station weather table.

use crate::types::columns::{COL_DATE, COL_STATION_ID};
use chrono::NaiveDate;
use polars::prelude::{col, lit, DataFrame, Expr, IntoLazy, LazyFrame, PolarsResult};

/// A wrapper around a Polars `LazyFrame` holding daily station weather
/// (`station_id`, `date`, `TA`, `TMN`, `TMX`, `RN`).
///
/// Filters are applied lazily; nothing is computed until [`WeatherDailyFrame::collect`].
#[derive(Clone)]
pub struct WeatherDailyFrame {
    /// The underlying Polars LazyFrame containing the daily data.
    pub frame: LazyFrame,
}

impl WeatherDailyFrame {
    pub fn new(frame: LazyFrame) -> Self {
        Self { frame }
    }

    /// Filters the daily data based on a Polars predicate expression.
    ///
    /// Returns a *new* `WeatherDailyFrame`; `self` is left unchanged.
    pub fn filter(&self, predicate: Expr) -> WeatherDailyFrame {
        WeatherDailyFrame::new(self.frame.clone().filter(predicate))
    }

    /// Restricts the data to one station.
    pub fn for_station(&self, station_id: i64) -> WeatherDailyFrame {
        self.filter(col(COL_STATION_ID).eq(lit(station_id)))
    }

    /// Filters the daily data to dates within `start..=end`.
    ///
    /// An inverted range selects nothing.
    pub fn get_range(&self, start: NaiveDate, end: NaiveDate) -> WeatherDailyFrame {
        self.filter(
            col(COL_DATE)
                .gt_eq(lit(start))
                .and(col(COL_DATE).lt_eq(lit(end))),
        )
    }

    /// Filters the daily data to a single day. Collecting yields at most one row per station.
    pub fn get_at(&self, date: NaiveDate) -> WeatherDailyFrame {
        self.filter(col(COL_DATE).eq(lit(date)))
    }

    pub fn collect(self) -> PolarsResult<DataFrame> {
        self.frame.collect()
    }
}

impl From<DataFrame> for WeatherDailyFrame {
    fn from(frame: DataFrame) -> Self {
        WeatherDailyFrame::new(frame.lazy())
    }
}
