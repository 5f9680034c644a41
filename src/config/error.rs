use crate::crs::error::CrsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse configuration file '{0}'")]
    Parse(PathBuf, #[source] serde_json::Error),

    #[error("Invalid coordinate reference system in configuration")]
    Crs(#[from] CrsError),

    #[error("Station registry is empty")]
    EmptyRegistry,

    #[error("Station {0} appears more than once in the registry")]
    DuplicateStation(i64),

    #[error("Target station {0} is not in the registry")]
    UnknownTargetStation(i64),
}
