use crate::weather_data::schema::WeatherField;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherDataError {
    #[error("Failed to read weather directory '{0}'")]
    DirRead(PathBuf, #[source] std::io::Error),

    #[error("No CSV files found in weather directory '{0}'")]
    NoInputFiles(PathBuf),

    #[error("None of the {skipped} weather files in '{dir}' could be read")]
    NoReadableFiles { dir: PathBuf, skipped: usize },

    #[error("Could not resolve the {field} column; tried aliases: {aliases}")]
    MissingRequiredColumn {
        field: WeatherField,
        aliases: String,
    },

    #[error("Weather file '{file}' is neither UTF-8 nor {fallback}")]
    Undecodable {
        file: PathBuf,
        fallback: &'static str,
    },

    // Errors during CSV reading (inside blocking task)
    #[error("I/O error processing weather file '{file}'")]
    CsvReadIo {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Parsing error processing weather file '{file}'")]
    CsvReadPolars {
        file: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),
}
