pub mod config;
pub mod crs;
mod error;
pub mod fires;
pub mod joins;
pub mod persist;
pub mod pipeline;
pub mod stations;
pub mod types;
mod utils;
pub mod validation;
pub mod weather_data;

pub use error::FirecastError;
pub use pipeline::*;

pub use config::error::ConfigError;
pub use config::PipelineConfig;
pub use crs::error::CrsError;
pub use crs::Crs;

pub use fires::error::FireDataError;
pub use fires::events::{normalize_fire_events, FireSchema};
pub use fires::layer::FireLayer;
pub use fires::matcher::attach_nearest_station;
pub use fires::source::{load_fire_layer, read_vector_layer};

pub use stations::error::LocateStationError;
pub use stations::locate_station::{StationLocator, StationMatch};
pub use stations::registry::StationRegistry;
pub use types::station::WeatherStation;
pub use types::weather_daily_frame::WeatherDailyFrame;

pub use joins::error::JoinError;
pub use joins::keys::normalize_join_keys;
pub use joins::labeling::build_labels;
pub use joins::merge::merge_fire_weather;

pub use persist::error::OutputError;
pub use validation::MergeReport;

pub use weather_data::daily::{aggregate_daily, parse_obs_date};
pub use weather_data::data_loader::{RawWeather, SkippedFile, WeatherDataLoader};
pub use weather_data::error::WeatherDataError;
pub use weather_data::lag::build_past_n_days_features;
pub use weather_data::schema::{ResolvedColumns, SchemaMapping, WeatherField};
