//! Run configuration for the fire-weather pipeline.
//!
//! A [`PipelineConfig`] can be built in code with its builder or loaded from a
//! JSON document. Only the three paths are required; everything else falls
//! back to the Gangneung defaults.

pub mod error;

use crate::config::error::ConfigError;
use crate::crs::error::CrsError;
use crate::crs::Crs;
use crate::fires::events::FireSchema;
use crate::stations::registry::StationRegistry;
use crate::weather_data::schema::SchemaMapping;
use bon::Builder;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const DEFAULT_PROJECTED_CRS: &str = "EPSG:5179";
pub const DEFAULT_LAG_DAYS: u32 = 3;

/// Everything a pipeline run needs to know.
///
/// # Examples
///
/// ```
/// use firecast::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .fire_source("data/fires.geojson")
///     .weather_dir("data/weather")
///     .output_dir("out")
///     .lag_days(5)
///     .build();
/// assert_eq!(config.projected_crs, "EPSG:5179");
/// assert_eq!(config.lag_days, 5);
/// ```
#[derive(Debug, Clone, Deserialize, Builder)]
pub struct PipelineConfig {
    /// GeoJSON FeatureCollection of fire incident points.
    #[builder(into)]
    pub fire_source: PathBuf,
    /// Directory holding the weather CSV exports.
    #[builder(into)]
    pub weather_dir: PathBuf,
    /// Directory all derived tables are written to. Created when missing.
    #[builder(into)]
    pub output_dir: PathBuf,
    /// CRS of the fire layer. Overrides the layer's own declaration.
    #[serde(default)]
    #[builder(into)]
    pub fire_crs: Option<String>,
    /// Planar CRS in which fire-to-station distances are measured.
    #[serde(default = "default_projected_crs")]
    #[builder(into, default = DEFAULT_PROJECTED_CRS.to_string())]
    pub projected_crs: String,
    #[serde(default)]
    #[builder(default)]
    pub stations: StationRegistry,
    /// Stations kept in the weather table. Defaults to every registry station.
    #[serde(default)]
    pub target_stations: Option<Vec<i64>>,
    /// Keep only fires whose date-time code falls in one of these years.
    #[serde(default)]
    pub fire_years: Option<Vec<i32>>,
    #[serde(default = "default_lag_days")]
    #[builder(default = DEFAULT_LAG_DAYS)]
    pub lag_days: u32,
    #[serde(default)]
    #[builder(default)]
    pub weather_schema: SchemaMapping,
    #[serde(default)]
    #[builder(default)]
    pub fire_schema: FireSchema,
}

fn default_projected_crs() -> String {
    DEFAULT_PROJECTED_CRS.to_string()
}

fn default_lag_days() -> u32 {
    DEFAULT_LAG_DAYS
}

/// The parts of a [`PipelineConfig`] that need parsing before a run.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub fire_crs: Option<Crs>,
    pub projected_crs: Crs,
    pub target_stations: Vec<i64>,
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// Parses the CRS identifiers and checks the station registry.
    pub fn resolve(&self) -> Result<ResolvedSettings, ConfigError> {
        let fire_crs = self.fire_crs.as_deref().map(Crs::parse).transpose()?;

        let projected_crs = Crs::parse(&self.projected_crs)?;
        if !projected_crs.is_projected() {
            return Err(CrsError::NotProjected(projected_crs.to_string()).into());
        }

        if self.stations.is_empty() {
            return Err(ConfigError::EmptyRegistry);
        }
        let mut seen = HashSet::new();
        for id in self.stations.ids() {
            if !seen.insert(id) {
                return Err(ConfigError::DuplicateStation(id));
            }
        }

        let target_stations = match &self.target_stations {
            Some(targets) => {
                if let Some(unknown) = targets.iter().find(|id| !seen.contains(id)) {
                    return Err(ConfigError::UnknownTargetStation(*unknown));
                }
                targets.clone()
            }
            None => self.stations.ids(),
        };

        Ok(ResolvedSettings {
            fire_crs,
            projected_crs,
            target_stations,
        })
    }
}
