use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JoinError {
    #[error("Join key column '{0}' not found")]
    MissingKeyColumn(String),

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),
}
