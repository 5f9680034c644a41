use crate::types::columns::COL_SOURCE_FILE;
use crate::weather_data::error::WeatherDataError;
use encoding_rs::{Encoding, EUC_KR};
use futures_util::future::join_all;
use log::{debug, info, warn};
use polars::frame::DataFrame;
use polars::prelude::*;
use std::borrow::Cow;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::{fs, task};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A weather file that was left out of the batch, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Every readable weather file concatenated into one all-text table.
///
/// Columns are the union of the files' headers; a file lacking a column
/// contributes nulls. Each row carries its file name in `__source_file`.
#[derive(Debug, Clone)]
pub struct RawWeather {
    pub frame: DataFrame,
    pub loaded: Vec<PathBuf>,
    pub skipped: Vec<SkippedFile>,
}

pub struct WeatherDataLoader {
    fallback: &'static Encoding,
}

impl Default for WeatherDataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherDataLoader {
    /// A loader that falls back to CP949 (EUC-KR) when a file is not valid UTF-8.
    pub fn new() -> WeatherDataLoader {
        WeatherDataLoader { fallback: EUC_KR }
    }

    pub fn with_fallback_encoding(fallback: &'static Encoding) -> WeatherDataLoader {
        WeatherDataLoader { fallback }
    }

    /// Reads every `*.csv` file in `dir`, in file-name order.
    ///
    /// Files are decoded and parsed concurrently. A file that cannot be decoded
    /// or parsed is reported in [`RawWeather::skipped`] and the rest proceed.
    /// Fails only when the directory has no CSV files or none of them are readable.
    pub async fn load_dir(&self, dir: &Path) -> Result<RawWeather, WeatherDataError> {
        let paths = Self::list_csv_files(dir).await?;
        if paths.is_empty() {
            return Err(WeatherDataError::NoInputFiles(dir.to_path_buf()));
        }
        info!("Reading {} weather files from {:?}", paths.len(), dir);

        let fallback = self.fallback;
        let tasks = paths.iter().cloned().map(|path| {
            task::spawn_blocking(move || Self::read_file(&path, fallback))
        });
        let results = join_all(tasks).await;

        let mut frames = Vec::with_capacity(paths.len());
        let mut loaded = Vec::with_capacity(paths.len());
        let mut skipped = Vec::new();
        for (path, result) in paths.into_iter().zip(results) {
            match result? {
                Ok(df) => {
                    debug!("Read {} rows from {:?}", df.height(), path);
                    frames.push(df.lazy());
                    loaded.push(path);
                }
                Err(e) => {
                    warn!("Skipping weather file {:?}: {}", path, e);
                    skipped.push(SkippedFile {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if frames.is_empty() {
            return Err(WeatherDataError::NoReadableFiles {
                dir: dir.to_path_buf(),
                skipped: skipped.len(),
            });
        }

        let frame = concat_lf_diagonal(frames, UnionArgs::default())?.collect()?;
        info!(
            "Raw weather table: {} rows x {} columns from {} files ({} skipped)",
            frame.height(),
            frame.width(),
            loaded.len(),
            skipped.len()
        );
        Ok(RawWeather {
            frame,
            loaded,
            skipped,
        })
    }

    async fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>, WeatherDataError> {
        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|e| WeatherDataError::DirRead(dir.to_path_buf(), e))?;
        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| WeatherDataError::DirRead(dir.to_path_buf(), e))?
        {
            let path = entry.path();
            let is_csv = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if is_csv && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Decodes one file and parses it as a headered CSV with every column read as text.
    fn read_file(path: &Path, fallback: &'static Encoding) -> Result<DataFrame, WeatherDataError> {
        let io_err = |e| WeatherDataError::CsvReadIo {
            file: path.to_path_buf(),
            source: e,
        };
        let polars_err = |e| WeatherDataError::CsvReadPolars {
            file: path.to_path_buf(),
            source: e,
        };

        let bytes = std::fs::read(path).map_err(io_err)?;
        let (text, encoding) =
            decode_text(&bytes, fallback).ok_or_else(|| WeatherDataError::Undecodable {
                file: path.to_path_buf(),
                fallback: fallback.name(),
            })?;
        if encoding != encoding_rs::UTF_8 {
            debug!("Decoded {:?} as {}", path, encoding.name());
        }

        let mut temp_file = NamedTempFile::new().map_err(io_err)?;
        temp_file.write_all(text.as_bytes()).map_err(io_err)?;
        temp_file.flush().map_err(io_err)?;

        let mut df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(temp_file.path().to_path_buf()))
            .map_err(polars_err)?
            .finish()
            .map_err(polars_err)?;

        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let height = df.height();
        df.with_column(Column::new(COL_SOURCE_FILE.into(), vec![source; height]))
            .map_err(polars_err)?;
        Ok(df)
    }
}

/// Decodes `bytes` as UTF-8 (a leading BOM is dropped), falling back to `fallback`.
///
/// Returns `None` when the bytes are malformed in both encodings.
pub fn decode_text<'a>(
    bytes: &'a [u8],
    fallback: &'static Encoding,
) -> Option<(Cow<'a, str>, &'static Encoding)> {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(body) {
        return Some((Cow::Borrowed(text), encoding_rs::UTF_8));
    }
    fallback
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| (text, fallback))
}
