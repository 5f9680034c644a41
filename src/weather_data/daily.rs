//! Aggregation of raw weather rows into one record per station per day.

use crate::types::columns::{COL_DATE, COL_RN, COL_STATION_ID, WEATHER_FEATURES};
use crate::utils::{date_to_epoch_days, parse_datetime_generic, parse_measure, parse_station_id};
use crate::weather_data::error::WeatherDataError;
use crate::weather_data::schema::{ResolvedColumns, SchemaMapping, WeatherField};
use chrono::NaiveDate;
use log::{info, warn};
use polars::prelude::*;

/// Parses an observation date.
///
/// When the first eight characters are digits they are read as `YYYYMMDD`
/// (so `202103051400` and `20210305` both give 2021-03-05). Anything else goes
/// through the generic date/time parser. Failures give `None`.
pub fn parse_obs_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if let Some(prefix) = s.get(..8) {
        if prefix.bytes().all(|b| b.is_ascii_digit()) {
            return NaiveDate::parse_from_str(prefix, "%Y%m%d").ok();
        }
    }
    parse_datetime_generic(s).map(|dt| dt.date())
}

/// Reads one logical field row by row, taking the first parsable value across
/// its resolved raw columns.
fn coalesce_field<T>(
    raw: &DataFrame,
    resolved: &ResolvedColumns,
    field: WeatherField,
    parse: impl Fn(&str) -> Option<T>,
) -> PolarsResult<Vec<Option<T>>> {
    let columns = resolved
        .columns(field)
        .iter()
        .map(|name| raw.column(name)?.cast(&DataType::String))
        .collect::<PolarsResult<Vec<_>>>()?;
    let texts = columns
        .iter()
        .map(|c| c.as_materialized_series().str().cloned())
        .collect::<PolarsResult<Vec<_>>>()?;

    Ok((0..raw.height())
        .map(|row| {
            texts
                .iter()
                .find_map(|text| text.get(row).and_then(&parse))
        })
        .collect())
}

/// Builds the daily weather table: `station_id (Int64), date (Date), TA, TMN,
/// TMX, RN (Float64)`, one row per station and day, sorted by both.
///
/// Rows for stations outside `targets` or with an unparsable date are dropped.
/// Duplicate readings for a station-day are averaged. Missing precipitation is
/// reported as `0.0`; missing temperatures stay null. All four measurement
/// columns are present even when the source has no column for them.
pub fn aggregate_daily(
    raw: &DataFrame,
    mapping: &SchemaMapping,
    targets: &[i64],
) -> Result<DataFrame, WeatherDataError> {
    let names: Vec<&str> = raw.get_column_names().iter().map(|n| n.as_str()).collect();
    let resolved = mapping.resolve(&names)?;
    info!("Resolved weather columns: {}", resolved);

    let station_ids = coalesce_field(raw, &resolved, WeatherField::StationId, parse_station_id)?;
    let dates = coalesce_field(raw, &resolved, WeatherField::ObsDate, parse_obs_date)?;

    let unparsed_dates = dates.iter().filter(|d| d.is_none()).count();
    if unparsed_dates > 0 {
        warn!(
            "{} of {} weather rows have an unparsable date and are dropped",
            unparsed_dates,
            dates.len()
        );
    }

    let keep: Vec<bool> = station_ids
        .iter()
        .zip(&dates)
        .map(|(id, date)| date.is_some() && id.is_some_and(|id| targets.contains(&id)))
        .collect();

    let pick = |values: Vec<Option<f64>>| -> Vec<Option<f64>> {
        values
            .into_iter()
            .zip(&keep)
            .filter(|(_, k)| **k)
            .map(|(v, _)| v)
            .collect()
    };

    let mut columns = vec![
        Column::new(
            COL_STATION_ID.into(),
            station_ids
                .iter()
                .zip(&keep)
                .filter(|(_, k)| **k)
                .map(|(v, _)| *v)
                .collect::<Vec<_>>(),
        ),
        Column::new(
            COL_DATE.into(),
            dates
                .iter()
                .zip(&keep)
                .filter(|(_, k)| **k)
                .map(|(d, _)| d.map(date_to_epoch_days))
                .collect::<Vec<_>>(),
        )
        .cast(&DataType::Date)?,
    ];
    for field in [
        WeatherField::MeanTemperature,
        WeatherField::MinTemperature,
        WeatherField::MaxTemperature,
        WeatherField::Precipitation,
    ] {
        let values = coalesce_field(raw, &resolved, field, parse_measure)?;
        columns.push(Column::new(field.output_column().into(), pick(values)));
    }
    let filtered = DataFrame::new(columns)?;
    info!(
        "{} of {} weather rows belong to target stations {:?}",
        filtered.height(),
        raw.height(),
        targets
    );

    let keys = [col(COL_STATION_ID), col(COL_DATE)];
    let aggregations: Vec<Expr> = WEATHER_FEATURES.iter().map(|c| col(*c).mean()).collect();
    let mut output: Vec<Expr> = keys.to_vec();
    output.extend(WEATHER_FEATURES.iter().map(|c| col(*c)));

    let daily = filtered
        .lazy()
        .group_by(keys.clone())
        .agg(aggregations)
        .with_column(col(COL_RN).fill_null(lit(0.0)))
        .select(output)
        .sort(
            [COL_STATION_ID, COL_DATE],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;

    info!("Daily weather table: {} station-days", daily.height());
    Ok(daily)
}
