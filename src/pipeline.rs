//! The end-to-end fire-weather run.
//!
//! [`Firecast`] exposes every stage on its own so callers can inspect
//! intermediate tables, and [`Firecast::run`] chains them and writes each
//! derived table to the output directory.

use crate::config::error::ConfigError;
use crate::config::{PipelineConfig, ResolvedSettings};
use crate::error::FirecastError;
use crate::fires::events::normalize_fire_events;
use crate::fires::layer::FireLayer;
use crate::fires::matcher::attach_nearest_station;
use crate::fires::source::load_fire_layer;
use crate::joins::labeling::build_labels;
use crate::joins::merge::merge_fire_weather;
use crate::persist::error::OutputError;
use crate::persist::{write_csv, write_json, write_parquet};
use crate::types::weather_daily_frame::WeatherDailyFrame;
use crate::utils::ensure_dir_exists;
use crate::validation::MergeReport;
use crate::weather_data::daily::aggregate_daily;
use crate::weather_data::data_loader::{SkippedFile, WeatherDataLoader};
use crate::weather_data::lag::build_past_n_days_features;
use log::info;
use polars::prelude::DataFrame;

pub const FIRES_WITH_STATION_PARQUET: &str = "fires_with_station.parquet";
pub const FIRES_WITH_STATION_GEOJSON: &str = "fires_with_station.geojson";
pub const FIRE_EVENTS_PARQUET: &str = "fire_events.parquet";
pub const WEATHER_DAILY_PARQUET: &str = "weather_daily.parquet";
pub const MERGED_PARQUET: &str = "fire_weather_merged.parquet";
pub const MERGED_CSV: &str = "fire_weather_merged.csv";
pub const LABELED_PARQUET: &str = "weather_labeled.parquet";

/// File name of the lag feature table for an `n_days` horizon.
pub fn features_file_name(n_days: u32) -> String {
    format!("weather_features_{}d.parquet", n_days)
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutputs {
    pub fires_with_station: FireLayer,
    pub fire_events: DataFrame,
    pub weather_daily: DataFrame,
    pub merged: DataFrame,
    pub labeled: DataFrame,
    pub features: DataFrame,
    /// Weather files left out of the run.
    pub skipped: Vec<SkippedFile>,
    pub merge_report: MergeReport,
}

impl PipelineOutputs {
    /// The daily weather table wrapped for per-station and date-range queries.
    pub fn weather_daily_frame(&self) -> WeatherDailyFrame {
        WeatherDailyFrame::from(self.weather_daily.clone())
    }
}

pub struct Firecast {
    config: PipelineConfig,
    settings: ResolvedSettings,
    loader: WeatherDataLoader,
}

impl Firecast {
    /// Validates `config` and prepares a run.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a CRS identifier cannot be parsed, the
    /// distance CRS is geographic, or the station registry is empty or has
    /// duplicate ids.
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        let settings = config.resolve()?;
        info!(
            "Pipeline configured: {} stations, distances in {}, {}-day lags",
            config.stations.len(),
            settings.projected_crs,
            config.lag_days
        );
        Ok(Self {
            config,
            settings,
            loader: WeatherDataLoader::new(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Loads the fire layer, applies the optional year filter and attaches the
    /// nearest station to every fire.
    pub async fn match_fires(&self) -> Result<FireLayer, FirecastError> {
        let mut layer =
            load_fire_layer(&self.config.fire_source, self.settings.fire_crs.clone()).await?;

        if let Some(years) = &self.config.fire_years {
            let before = layer.len();
            layer = layer.retain_years(&self.config.fire_schema.datetime_code, years)?;
            info!(
                "Year filter {:?} kept {} of {} fires",
                years,
                layer.len(),
                before
            );
        }

        let matched =
            attach_nearest_station(layer, &self.config.stations, &self.settings.projected_crs)?;
        info!("Matched {} fires to stations", matched.len());
        Ok(matched)
    }

    /// Builds the canonical fire-event table from a matched layer.
    pub fn normalize_fires(&self, layer: &FireLayer) -> Result<DataFrame, FirecastError> {
        Ok(normalize_fire_events(layer, &self.config.fire_schema)?)
    }

    /// Reads the weather directory and aggregates it to one row per station-day.
    pub async fn normalize_weather(
        &self,
    ) -> Result<(DataFrame, Vec<SkippedFile>), FirecastError> {
        let raw = self.loader.load_dir(&self.config.weather_dir).await?;
        let daily = aggregate_daily(
            &raw.frame,
            &self.config.weather_schema,
            &self.settings.target_stations,
        )?;
        Ok((daily, raw.skipped))
    }

    /// Attaches weather to every fire and checks the result.
    pub fn merge(
        &self,
        fire_events: &DataFrame,
        weather_daily: &DataFrame,
    ) -> Result<(DataFrame, MergeReport), FirecastError> {
        let merged = merge_fire_weather(fire_events, weather_daily)?;
        let report = MergeReport::from_frames(fire_events, &merged)?;
        report.log();
        Ok((merged, report))
    }

    pub fn label(
        &self,
        fire_events: &DataFrame,
        weather_daily: &DataFrame,
    ) -> Result<DataFrame, FirecastError> {
        Ok(build_labels(fire_events, weather_daily)?)
    }

    pub fn lag_features(&self, weather_daily: &DataFrame) -> Result<DataFrame, FirecastError> {
        Ok(build_past_n_days_features(
            weather_daily,
            self.config.lag_days,
        )?)
    }

    /// Runs every stage and writes the derived tables to the output directory.
    pub async fn run(&self) -> Result<PipelineOutputs, FirecastError> {
        let out = &self.config.output_dir;
        ensure_dir_exists(out)
            .await
            .map_err(|e| OutputError::DirCreation(out.clone(), e))?;

        let (fires_with_station, (weather_daily, skipped)) =
            tokio::try_join!(self.match_fires(), self.normalize_weather())?;

        let fire_events = self.normalize_fires(&fires_with_station)?;
        let (merged, merge_report) = self.merge(&fire_events, &weather_daily)?;
        let labeled = self.label(&fire_events, &weather_daily)?;
        let features = self.lag_features(&weather_daily)?;

        let fires_frame = fires_with_station.to_frame_with_geometry()?;
        let fires_geojson = fires_with_station.to_geojson()?;
        let fires_parquet_path = out.join(FIRES_WITH_STATION_PARQUET);
        let fires_geojson_path = out.join(FIRES_WITH_STATION_GEOJSON);
        let events_path = out.join(FIRE_EVENTS_PARQUET);
        let daily_path = out.join(WEATHER_DAILY_PARQUET);
        let merged_path = out.join(MERGED_PARQUET);
        let merged_csv_path = out.join(MERGED_CSV);
        let labeled_path = out.join(LABELED_PARQUET);
        let features_path = out.join(features_file_name(self.config.lag_days));
        tokio::try_join!(
            write_parquet(fires_frame, &fires_parquet_path),
            write_json(fires_geojson, &fires_geojson_path),
            write_parquet(fire_events.clone(), &events_path),
            write_parquet(weather_daily.clone(), &daily_path),
            write_parquet(merged.clone(), &merged_path),
            write_csv(merged.clone(), &merged_csv_path),
            write_parquet(labeled.clone(), &labeled_path),
            write_parquet(features.clone(), &features_path),
        )?;
        info!("Wrote derived tables to {:?}", out);

        Ok(PipelineOutputs {
            fires_with_station,
            fire_events,
            weather_daily,
            merged,
            labeled,
            features,
            skipped,
            merge_report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::columns::{COL_DATE, COL_FIRE_LABEL, COL_STATION_ID};
    use chrono::NaiveDate;
    use polars::prelude::*;
    use std::fs;
    use std::path::Path;

    fn write_fixtures(root: &Path) -> PipelineConfig {
        let fire_source = root.join("fires.geojson");
        let fires = serde_json::json!({
            "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::4326" } },
            "features": [
                {
                    "type": "Feature",
                    "properties": { "OCCRR_DTM": "202103051400", "CTPRV_NM": "강원", "SGNG_NM": "강릉시" },
                    "geometry": { "type": "Point", "coordinates": [128.86, 37.81] }
                },
                {
                    "type": "Feature",
                    "properties": { "OCCRR_DTM": "202103050930", "CTPRV_NM": "강원", "SGNG_NM": "강릉시" },
                    "geometry": { "type": "Point", "coordinates": [128.89, 37.75] }
                },
                {
                    "type": "Feature",
                    "properties": { "OCCRR_DTM": "202003061200", "CTPRV_NM": "강원", "SGNG_NM": "강릉시" },
                    "geometry": { "type": "Point", "coordinates": [128.87, 37.78] }
                }
            ]
        });
        fs::write(&fire_source, fires.to_string()).unwrap();

        let weather_dir = root.join("weather");
        fs::create_dir(&weather_dir).unwrap();
        fs::write(
            weather_dir.join("a_asos.csv"),
            "STN,TM,TA,TMN,TMX,RN\n\
             104,20210303,4.0,1.0,8.0,0.0\n\
             104,20210304,5.0,2.0,9.0,\n\
             104,20210305,6.0,3.0,10.0,1.5\n",
        )
        .unwrap();
        let (korean, _, _) = encoding_rs::EUC_KR.encode(
            "지점,일시,평균기온,일강수량(mm)\n\
             105,20210304,5.5,0.0\n\
             105,20210305,6.5,\n",
        );
        fs::write(weather_dir.join("b_legacy.csv"), korean).unwrap();
        fs::write(weather_dir.join("c_broken.csv"), [0xFFu8, 0xFF, 0x0A]).unwrap();

        PipelineConfig::builder()
            .fire_source(fire_source)
            .weather_dir(weather_dir)
            .output_dir(root.join("out"))
            .fire_years(vec![2021])
            .lag_days(2)
            .build()
    }

    #[tokio::test]
    async fn run_writes_every_table() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_fixtures(dir.path());
        let out = config.output_dir.clone();

        let outputs = Firecast::new(config).unwrap().run().await.unwrap();

        // The 2020 fire is dropped by the year filter.
        assert_eq!(outputs.fires_with_station.len(), 2);
        let stations: Vec<Option<i64>> = outputs
            .fire_events
            .column(COL_STATION_ID)
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(stations, vec![Some(104), Some(105)]);

        assert_eq!(outputs.skipped.len(), 1);
        assert!(outputs.skipped[0].path.ends_with("c_broken.csv"));
        assert_eq!(outputs.weather_daily.height(), 5);

        assert_eq!(outputs.merged.height(), 2);
        assert!(outputs.merge_report.row_count_matches);

        let labels = outputs
            .labeled
            .column(COL_FIRE_LABEL)
            .unwrap()
            .as_materialized_series()
            .i32()
            .unwrap()
            .sum();
        assert_eq!(labels, Some(2));
        assert_eq!(outputs.labeled.height(), outputs.weather_daily.height());

        assert!(outputs.features.column("TA_minus2d").is_ok());
        assert_eq!(outputs.features.height(), outputs.weather_daily.height());

        let day = NaiveDate::from_ymd_opt(2021, 3, 5).unwrap();
        let on_day = outputs.weather_daily_frame().get_at(day).collect().unwrap();
        assert_eq!(on_day.height(), 2);

        for name in [
            FIRES_WITH_STATION_PARQUET,
            FIRES_WITH_STATION_GEOJSON,
            FIRE_EVENTS_PARQUET,
            WEATHER_DAILY_PARQUET,
            MERGED_PARQUET,
            MERGED_CSV,
            LABELED_PARQUET,
            "weather_features_2d.parquet",
        ] {
            assert!(out.join(name).is_file(), "{} was not written", name);
        }

        let daily_on_disk = ParquetReader::new(fs::File::open(out.join(WEATHER_DAILY_PARQUET)).unwrap())
            .finish()
            .unwrap();
        assert_eq!(daily_on_disk.height(), 5);
        assert!(daily_on_disk.column(COL_DATE).is_ok());
    }

    #[tokio::test]
    async fn missing_weather_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            weather_dir: dir.path().join("nowhere"),
            ..write_fixtures(dir.path())
        };
        let result = Firecast::new(config).unwrap().run().await;
        assert!(matches!(result, Err(FirecastError::WeatherData(_))));
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = PipelineConfig::builder()
            .fire_source("f.geojson")
            .weather_dir("w")
            .output_dir("o")
            .projected_crs("EPSG:999999")
            .build();
        assert!(matches!(Firecast::new(config), Err(ConfigError::Crs(_))));
    }
}
