//! Writes derived tables to disk.
//!
//! Each file is written to a temporary file in the destination directory and
//! renamed into place once complete, so a failed run never leaves a truncated
//! table behind under the final name.

pub mod error;

use crate::persist::error::OutputError;
use polars::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::task;

/// Writes `df` as Snappy-compressed Parquet.
pub async fn write_parquet(mut df: DataFrame, path: &Path) -> Result<(), OutputError> {
    let path_buf = path.to_path_buf();
    task::spawn_blocking(move || {
        write_atomically(&path_buf, |file| {
            ParquetWriter::new(file)
                .with_compression(ParquetCompression::Snappy)
                .finish(&mut df)
                .map_err(|e| OutputError::WritePolars(path_buf.clone(), e))?;
            Ok(())
        })
    })
    .await?
}

/// Writes `df` as a headered, comma-separated text file.
pub async fn write_csv(mut df: DataFrame, path: &Path) -> Result<(), OutputError> {
    let path_buf = path.to_path_buf();
    task::spawn_blocking(move || {
        write_atomically(&path_buf, |file| {
            CsvWriter::new(file)
                .include_header(true)
                .finish(&mut df)
                .map_err(|e| OutputError::WritePolars(path_buf.clone(), e))
        })
    })
    .await?
}

/// Writes a JSON document (used for the GeoJSON fire layer).
pub async fn write_json(value: serde_json::Value, path: &Path) -> Result<(), OutputError> {
    let path_buf = path.to_path_buf();
    task::spawn_blocking(move || {
        write_atomically(&path_buf, |file| {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, &value)
                .map_err(|e| OutputError::WriteJson(path_buf.clone(), e))?;
            writer
                .flush()
                .map_err(|e| OutputError::WriteIo(path_buf.clone(), e))
        })
    })
    .await?
}

fn write_atomically(
    path: &Path,
    write: impl FnOnce(&mut File) -> Result<(), OutputError>,
) -> Result<(), OutputError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut temp_file =
        NamedTempFile::new_in(&dir).map_err(|e| OutputError::WriteIo(path.to_path_buf(), e))?;
    write(temp_file.as_file_mut())?;
    temp_file
        .as_file_mut()
        .sync_all()
        .map_err(|e| OutputError::WriteIo(path.to_path_buf(), e))?;
    temp_file
        .persist(path)
        .map_err(|e| OutputError::Persist(path.to_path_buf(), e.error))?;
    Ok(())
}
