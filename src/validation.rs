//! Post-merge sanity figures for the fire-weather table.

use crate::joins::error::JoinError;
use crate::types::columns::{COL_STATION_ID, WEATHER_FEATURES};
use log::{info, warn};
use polars::prelude::*;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    pub fire_rows: usize,
    pub merged_rows: usize,
    pub row_count_matches: bool,
    /// Share of null values per weather column present in the merged table.
    pub weather_null_ratio: Vec<(String, f64)>,
    /// Merged rows per station; `None` counts fires without a station.
    pub station_counts: BTreeMap<Option<i64>, usize>,
}

impl MergeReport {
    pub fn from_frames(fires: &DataFrame, merged: &DataFrame) -> Result<Self, JoinError> {
        let fire_rows = fires.height();
        let merged_rows = merged.height();

        let weather_null_ratio = WEATHER_FEATURES
            .iter()
            .filter_map(|name| merged.column(name).ok())
            .map(|column| {
                let ratio = if merged_rows == 0 {
                    0.0
                } else {
                    column.null_count() as f64 / merged_rows as f64
                };
                (column.name().to_string(), ratio)
            })
            .collect();

        let mut station_counts = BTreeMap::new();
        if let Ok(stations) = merged.column(COL_STATION_ID) {
            let stations = stations.cast(&DataType::Int64)?;
            for id in stations.as_materialized_series().i64()?.into_iter() {
                *station_counts.entry(id).or_insert(0) += 1;
            }
        }

        Ok(Self {
            fire_rows,
            merged_rows,
            row_count_matches: fire_rows == merged_rows,
            weather_null_ratio,
            station_counts,
        })
    }

    pub fn log(&self) {
        info!("fires rows: {}, merged rows: {}", self.fire_rows, self.merged_rows);
        if self.row_count_matches {
            info!("Merged row count matches fire row count");
        } else {
            warn!(
                "Merged row count {} differs from fire row count {}",
                self.merged_rows, self.fire_rows
            );
        }
        for (column, ratio) in &self.weather_null_ratio {
            info!("Null ratio {}: {:.3}", column, ratio);
        }
        for (station, count) in &self.station_counts {
            match station {
                Some(id) => info!("Station {}: {} rows", id, count),
                None => info!("No station: {} rows", count),
            }
        }
    }
}
