use crate::crs::error::CrsError;
use crate::stations::error::LocateStationError;
use gdal::errors::GdalError;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FireDataError {
    #[error("Fire layer '{0}' declares no CRS and none was configured")]
    MissingCrs(PathBuf),

    #[error("Failed to read fire layer '{0}'")]
    SourceRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse fire layer '{0}' as GeoJSON")]
    GeoJsonParse(PathBuf, #[source] serde_json::Error),

    #[error("Failed to open fire layer '{0}' as a vector dataset")]
    VectorRead(PathBuf, #[source] GdalError),

    #[error("Vector dataset '{0}' contains no layers")]
    EmptyDataset(PathBuf),

    #[error("Fire layer '{0}' is not a GeoJSON FeatureCollection")]
    NotFeatureCollection(PathBuf),

    #[error("Fire layer has {rows} attribute rows but {points} geometries")]
    GeometryLengthMismatch { rows: usize, points: usize },

    #[error("None of the date columns ({candidates}) are present in the fire layer")]
    MissingDateColumn { candidates: String },

    #[error("Failed to reproject fire points into {target}")]
    Reprojection {
        target: String,
        #[source]
        source: CrsError,
    },

    #[error(transparent)]
    Crs(#[from] CrsError),

    #[error(transparent)]
    LocateStation(#[from] LocateStationError),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Failed processing fire DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),
}
