use crate::joins::error::JoinError;
use crate::joins::keys::normalize_join_keys;
use crate::types::columns::{COL_DATE, COL_FIRE_DATE, COL_FIRE_LABEL, COL_STATION_ID};
use log::info;
use polars::prelude::*;

/// Labels every station-day of the weather table (station-day grain).
///
/// Fires collapse to one indicator per `(station_id, date)`, which is
/// left-joined onto the weather rows. `fire_label` is `1` when at least one fire
/// was assigned to that station on that day and `0` otherwise. The output has
/// the same rows as `weather`, sorted by station and date.
pub fn build_labels(fires: &DataFrame, weather: &DataFrame) -> Result<DataFrame, JoinError> {
    let fires = normalize_join_keys(fires.clone(), COL_FIRE_DATE)?;
    let weather = normalize_join_keys(weather.clone(), COL_DATE)?;
    let keys = [col(COL_STATION_ID), col(COL_DATE)];

    let indicators = fires
        .lazy()
        .select(keys.clone())
        .filter(col(COL_STATION_ID).is_not_null().and(col(COL_DATE).is_not_null()))
        .with_column(lit(1i32).alias(COL_FIRE_LABEL))
        .group_by(keys.clone())
        .agg([col(COL_FIRE_LABEL).max()]);

    let labeled = weather
        .lazy()
        .join(
            indicators,
            keys.clone(),
            keys,
            JoinArgs::new(JoinType::Left),
        )
        .with_column(
            col(COL_FIRE_LABEL)
                .fill_null(lit(0i32))
                .cast(DataType::Int32),
        )
        .sort(
            [COL_STATION_ID, COL_DATE],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;

    let positives = labeled
        .column(COL_FIRE_LABEL)?
        .as_materialized_series()
        .i32()?
        .into_iter()
        .filter(|v| *v == Some(1))
        .count();
    info!(
        "Labeled {} station-days, {} with at least one fire",
        labeled.height(),
        positives
    );
    Ok(labeled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::date_to_epoch_days;
    use chrono::NaiveDate;

    fn day(d: u32) -> i32 {
        date_to_epoch_days(NaiveDate::from_ymd_opt(2021, 3, d).unwrap())
    }

    fn date_column(name: &str, days: &[u32]) -> Column {
        Column::new(name.into(), days.iter().map(|d| day(*d)).collect::<Vec<_>>())
            .cast(&DataType::Date)
            .unwrap()
    }

    fn label_for(labeled: &DataFrame, station: i64, d: u32) -> Option<i32> {
        let ids = labeled.column(COL_STATION_ID).unwrap().as_materialized_series().i64().unwrap().clone();
        let dates = labeled.column(COL_DATE).unwrap().as_materialized_series().date().unwrap().clone();
        let labels = labeled.column(COL_FIRE_LABEL).unwrap().as_materialized_series().i32().unwrap().clone();
        (0..labeled.height())
            .find(|i| ids.get(*i) == Some(station) && dates.get(*i) == Some(day(d)))
            .and_then(|i| labels.get(i))
    }

    #[test]
    fn two_fires_at_104_and_none_at_105() {
        let fires = DataFrame::new(vec![
            Column::new("fire_id".into(), [1i64, 2]),
            date_column(COL_FIRE_DATE, &[5, 5]),
            Column::new(COL_STATION_ID.into(), [104i64, 104]),
        ])
        .unwrap();
        let weather = DataFrame::new(vec![
            Column::new(COL_STATION_ID.into(), [104i64, 105, 104]),
            date_column(COL_DATE, &[5, 5, 6]),
            Column::new("TA".into(), [5.0, 6.0, 7.0]),
        ])
        .unwrap();

        let labeled = build_labels(&fires, &weather).unwrap();

        assert_eq!(labeled.height(), weather.height());
        assert_eq!(labeled.column(COL_FIRE_LABEL).unwrap().dtype(), &DataType::Int32);
        assert_eq!(label_for(&labeled, 104, 5), Some(1));
        assert_eq!(label_for(&labeled, 105, 5), Some(0));
        assert_eq!(label_for(&labeled, 104, 6), Some(0));
    }

    #[test]
    fn fires_without_weather_rows_add_no_station_days() {
        let fires = DataFrame::new(vec![
            date_column(COL_FIRE_DATE, &[20]),
            Column::new(COL_STATION_ID.into(), [105i64]),
        ])
        .unwrap();
        let weather = DataFrame::new(vec![
            Column::new(COL_STATION_ID.into(), [105i64]),
            date_column(COL_DATE, &[5]),
        ])
        .unwrap();
        let labeled = build_labels(&fires, &weather).unwrap();
        assert_eq!(labeled.height(), 1);
        assert_eq!(label_for(&labeled, 105, 5), Some(0));
    }
}
