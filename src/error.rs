use crate::config::error::ConfigError;
use crate::crs::error::CrsError;
use crate::fires::error::FireDataError;
use crate::joins::error::JoinError;
use crate::persist::error::OutputError;
use crate::stations::error::LocateStationError;
use crate::weather_data::error::WeatherDataError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FirecastError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Crs(#[from] CrsError),

    #[error(transparent)]
    LocateStation(#[from] LocateStationError),

    #[error(transparent)]
    FireData(#[from] FireDataError),

    #[error(transparent)]
    WeatherData(#[from] WeatherDataError),

    #[error(transparent)]
    Join(#[from] JoinError),

    #[error(transparent)]
    Output(#[from] OutputError),
}
