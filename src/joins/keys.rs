//! Join-key normalization shared by the fire-weather merger and the label builder.

use crate::joins::error::JoinError;
use crate::types::columns::{COL_DATE, COL_STATION_ID};
use crate::utils::{date_to_epoch_days, integral_f64_to_i64, parse_station_id};
use crate::weather_data::daily::parse_obs_date;
use log::warn;
use polars::prelude::*;
use std::collections::HashSet;

/// Coerces `station_id` to `Int64` and `date_column` to `Date`, renaming the
/// latter to `date`.
///
/// Strings are parsed, integral floats are accepted and datetimes are
/// truncated to their day. Anything that cannot be coerced becomes null, and
/// null keys never match in a join.
pub fn normalize_join_keys(mut frame: DataFrame, date_column: &str) -> Result<DataFrame, JoinError> {
    let station = frame
        .column(COL_STATION_ID)
        .map_err(|_| JoinError::MissingKeyColumn(COL_STATION_ID.to_string()))?;
    let station = station_id_as_i64(station)?;

    let date = frame
        .column(date_column)
        .map_err(|_| JoinError::MissingKeyColumn(date_column.to_string()))?;
    let date = date_as_date(date)?;

    frame.with_column(station)?;
    frame.with_column(date)?;
    if date_column != COL_DATE {
        frame.rename(date_column, COL_DATE.into())?;
    }
    Ok(frame)
}

fn station_id_as_i64(column: &Column) -> PolarsResult<Column> {
    let name = column.name().clone();
    let converted = match column.dtype() {
        DataType::Int64 => column.clone(),
        DataType::String => Column::new(
            name,
            column
                .as_materialized_series()
                .str()?
                .into_iter()
                .map(|v| v.and_then(parse_station_id))
                .collect::<Vec<_>>(),
        ),
        DataType::Float32 | DataType::Float64 => Column::new(
            name,
            column
                .cast(&DataType::Float64)?
                .as_materialized_series()
                .f64()?
                .into_iter()
                .map(|v| v.and_then(integral_f64_to_i64))
                .collect::<Vec<_>>(),
        ),
        dtype if dtype.is_integer() => column.cast(&DataType::Int64)?,
        other => {
            warn!("Station id column has type {}; treating every key as missing", other);
            Column::full_null(name, column.len(), &DataType::Int64)
        }
    };
    Ok(converted)
}

fn date_as_date(column: &Column) -> PolarsResult<Column> {
    let name = column.name().clone();
    let converted = match column.dtype() {
        DataType::Date => column.clone(),
        DataType::Datetime(_, _) => column.cast(&DataType::Date)?,
        DataType::String => Column::new(
            name,
            column
                .as_materialized_series()
                .str()?
                .into_iter()
                .map(|v| v.and_then(parse_obs_date).map(date_to_epoch_days))
                .collect::<Vec<_>>(),
        )
        .cast(&DataType::Date)?,
        other => {
            warn!("Date column has type {}; treating every key as missing", other);
            Column::full_null(name, column.len(), &DataType::Date)
        }
    };
    Ok(converted)
}

/// Keeps the first row of each `(station_id, date)` key. Expects normalized keys.
pub(crate) fn first_per_key(frame: &DataFrame) -> Result<DataFrame, JoinError> {
    let ids = frame.column(COL_STATION_ID)?.as_materialized_series().i64()?.clone();
    let dates = frame.column(COL_DATE)?.as_materialized_series().date()?.clone();

    let mut seen = HashSet::with_capacity(frame.height());
    let mask: Vec<bool> = (0..frame.height())
        .map(|i| seen.insert((ids.get(i), dates.get(i))))
        .collect();
    let duplicates = mask.iter().filter(|keep| !**keep).count();
    if duplicates == 0 {
        return Ok(frame.clone());
    }
    warn!("Dropping {} duplicate weather rows before joining", duplicates);
    Ok(frame.filter(&BooleanChunked::from_slice("mask".into(), &mask))?)
}
