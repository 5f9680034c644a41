use crate::crs::error::CrsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocateStationError {
    #[error("Station registry is empty; at least one station is required for matching")]
    EmptyRegistry,

    #[error("Failed to project stations into {crs}")]
    StationProjection {
        crs: String,
        #[source]
        source: CrsError,
    },

    #[error(transparent)]
    Crs(#[from] CrsError),
}
