use crate::joins::error::JoinError;
use crate::joins::keys::{first_per_key, normalize_join_keys};
use crate::types::columns::{COL_DATE, COL_FIRE_DATE, COL_STATION_ID, WEATHER_SUFFIX};
use log::info;
use polars::prelude::*;

const FIRE_ROW: &str = "__fire_row";

/// Attaches daily weather to every fire event (fire grain).
///
/// Fires are left-joined to weather on `(station_id, fire_date)`; `fire_date`
/// becomes the `date` key column. Weather is reduced to one row per key first,
/// so the output always has exactly one row per fire. Fires without a weather
/// record keep null weather columns, and weather columns that collide with fire
/// columns get a `_w` suffix. Rows come back in the order of `fires`.
pub fn merge_fire_weather(fires: &DataFrame, weather: &DataFrame) -> Result<DataFrame, JoinError> {
    let fires = normalize_join_keys(fires.clone(), COL_FIRE_DATE)?;
    let weather = first_per_key(&normalize_join_keys(weather.clone(), COL_DATE)?)?;

    let fire_rows = fires.height();

    let keys = [col(COL_STATION_ID), col(COL_DATE)];
    let merged = fires
        .lazy()
        .with_row_index(FIRE_ROW, None)
        .join(
            weather.lazy(),
            keys.clone(),
            keys,
            JoinArgs::new(JoinType::Left).with_suffix(Some(WEATHER_SUFFIX.into())),
        )
        .sort([FIRE_ROW], SortMultipleOptions::default())
        .drop([FIRE_ROW])
        .collect()?;

    info!(
        "Merged {} fires with daily weather into {} rows",
        fire_rows,
        merged.height()
    );
    Ok(merged)
}
