use crate::types::columns::{COL_DATE, COL_STATION_ID};
use crate::weather_data::error::WeatherDataError;
use log::info;
use polars::prelude::*;

/// Widens a daily station series with past-day copies of every feature.
///
/// For each `k` in `1..=n_days` and each non-key column `c`, the output gains
/// `{c}_minus{k}d` holding the value the same station recorded on `date - k`.
/// Rows are the `(station_id, date)` keys of `daily`; a day missing from the
/// source yields nulls in the lags that would have come from it. Nothing is
/// interpolated.
pub fn build_past_n_days_features(
    daily: &DataFrame,
    n_days: u32,
) -> Result<DataFrame, WeatherDataError> {
    let features: Vec<String> = daily
        .get_column_names()
        .into_iter()
        .filter(|name| name.as_str() != COL_STATION_ID && name.as_str() != COL_DATE)
        .map(|name| name.to_string())
        .collect();
    let keys = [col(COL_STATION_ID), col(COL_DATE)];

    let source = daily.clone().lazy();
    let mut wide = source.clone().select(keys.clone());

    for k in 1..=n_days {
        let lagged_names: Vec<String> = features
            .iter()
            .map(|name| format!("{}_minus{}d", name, k))
            .collect();

        let mut projection = keys.to_vec();
        projection.extend(features.iter().map(|name| col(name.as_str())));

        let shifted = source
            .clone()
            .with_column(
                (col(COL_DATE).cast(DataType::Int32) + lit(k as i32))
                    .cast(DataType::Date)
                    .alias(COL_DATE),
            )
            .select(projection)
            .rename(&features, &lagged_names, true);

        wide = wide.join(
            shifted,
            keys.clone(),
            keys.clone(),
            JoinArgs::new(JoinType::Left),
        );
    }

    let wide = wide
        .sort(
            [COL_STATION_ID, COL_DATE],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;
    info!(
        "Built {}-day lag features: {} rows x {} columns",
        n_days,
        wide.height(),
        wide.width()
    );
    Ok(wide)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::date_to_epoch_days;
    use chrono::NaiveDate;

    fn day(d: u32) -> i32 {
        date_to_epoch_days(NaiveDate::from_ymd_opt(2021, 3, d).unwrap())
    }

    fn daily(days: &[u32], ta: &[Option<f64>]) -> DataFrame {
        let dates = Column::new(
            COL_DATE.into(),
            days.iter().map(|d| day(*d)).collect::<Vec<_>>(),
        )
        .cast(&DataType::Date)
        .unwrap();
        DataFrame::new(vec![
            Column::new(COL_STATION_ID.into(), vec![104i64; days.len()]),
            dates,
            Column::new("TA".into(), ta.to_vec()),
        ])
        .unwrap()
    }

    fn lag(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn lag_at_day_d_is_value_at_d_minus_k() {
        // Ten days, the value for day 5 is missing.
        let days: Vec<u32> = (1..=10).collect();
        let ta: Vec<Option<f64>> = days
            .iter()
            .map(|d| if *d == 5 { None } else { Some(*d as f64 * 10.0) })
            .collect();
        let wide = build_past_n_days_features(&daily(&days, &ta), 3).unwrap();

        assert_eq!(wide.height(), 10);
        let names: Vec<&str> = wide.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(
            names,
            ["station_id", "date", "TA_minus1d", "TA_minus2d", "TA_minus3d"]
        );

        let minus1 = lag(&wide, "TA_minus1d");
        let minus3 = lag(&wide, "TA_minus3d");
        // Rows are days 1..=10, index = day - 1.
        assert_eq!(minus1[5], None, "lag-1 at day 6 comes from missing day 5");
        assert_eq!(minus1[4], Some(40.0), "lag-1 at day 5 is day 4");
        assert_eq!(minus1[0], None, "nothing precedes day 1");
        assert_eq!(minus3[9], Some(70.0));
        assert_eq!(minus3[2], None);
        assert_eq!(minus3[3], Some(10.0));
    }

    #[test]
    fn absent_days_leave_gaps() {
        let wide = build_past_n_days_features(
            &daily(&[1, 2, 4], &[Some(1.0), Some(2.0), Some(4.0)]),
            2,
        )
        .unwrap();
        assert_eq!(wide.height(), 3);
        assert_eq!(lag(&wide, "TA_minus1d"), vec![None, Some(1.0), None]);
        assert_eq!(lag(&wide, "TA_minus2d"), vec![None, None, Some(2.0)]);
    }

    #[test]
    fn stations_do_not_leak_into_each_other() {
        let mut a = daily(&[1, 2], &[Some(1.0), Some(2.0)]);
        let b = DataFrame::new(vec![
            Column::new(COL_STATION_ID.into(), vec![105i64, 105]),
            Column::new(COL_DATE.into(), vec![day(1), day(2)])
                .cast(&DataType::Date)
                .unwrap(),
            Column::new("TA".into(), vec![Some(100.0), Some(200.0)]),
        ])
        .unwrap();
        a.vstack_mut(&b).unwrap();

        let wide = build_past_n_days_features(&a, 1).unwrap();
        assert_eq!(lag(&wide, "TA_minus1d"), vec![None, Some(1.0), None, Some(100.0)]);
    }

    #[test]
    fn zero_horizon_keeps_only_keys() {
        let wide = build_past_n_days_features(&daily(&[1, 2], &[Some(1.0), None]), 0).unwrap();
        assert_eq!(wide.width(), 2);
        assert_eq!(wide.height(), 2);
    }
}
