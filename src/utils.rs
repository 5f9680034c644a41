use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::info;
use polars::prelude::*;
use std::io;
use std::path::Path;

const DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%Y.%m.%d %H:%M",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y%m%d"];

/// Creates `path` (and its parents) if it does not exist yet.
pub async fn ensure_dir_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("Path exists but is not a directory: {}", path.display()),
                ));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("Creating output directory: {}", path.display());
            tokio::fs::create_dir_all(path).await
        }
        Err(e) => Err(e),
    }
}

/// Reads `name` from `frame` as text, whatever its physical type.
pub fn column_as_strings(frame: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let column = frame.column(name)?.cast(&DataType::String)?;
    let values = column
        .as_materialized_series()
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

/// Lenient timestamp parsing for free-form date/time text.
///
/// Accepts RFC 3339 and the usual `Y-m-d`, `Y/m/d`, `Y.m.d` shapes with or
/// without a time part. A bare date parses as midnight.
pub fn parse_datetime_generic(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Parses a station identifier written as an integer or an integral float (`"104"`, `"104.0"`).
pub fn parse_station_id(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if let Ok(id) = s.parse::<i64>() {
        return Some(id);
    }
    let value = s.parse::<f64>().ok()?;
    integral_f64_to_i64(value)
}

pub fn integral_f64_to_i64(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

/// Parses a numeric measurement; blanks and non-numeric markers become missing.
pub fn parse_measure(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Days since the Unix epoch, the physical representation of a polars `Date`.
pub fn date_to_epoch_days(date: NaiveDate) -> i32 {
    (date - NaiveDate::default()).num_days() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_datetimes() {
        let expected = NaiveDate::from_ymd_opt(2021, 3, 5)
            .unwrap()
            .and_hms_opt(14, 20, 0)
            .unwrap();
        assert_eq!(parse_datetime_generic("2021-03-05 14:20:00"), Some(expected));
        assert_eq!(parse_datetime_generic("2021-03-05T14:20"), Some(expected));
        assert_eq!(parse_datetime_generic("2021/03/05 14:20"), Some(expected));
        assert_eq!(parse_datetime_generic("2021-03-05T14:20:00+09:00"), Some(expected));
        assert_eq!(
            parse_datetime_generic(" 2021.03.05 "),
            NaiveDate::from_ymd_opt(2021, 3, 5).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_datetime_generic("yesterday"), None);
        assert_eq!(parse_datetime_generic(""), None);
    }

    #[test]
    fn station_ids() {
        assert_eq!(parse_station_id("104"), Some(104));
        assert_eq!(parse_station_id(" 105.0 "), Some(105));
        assert_eq!(parse_station_id("104.5"), None);
        assert_eq!(parse_station_id("북강릉"), None);
    }

    #[test]
    fn measures() {
        assert_eq!(parse_measure("12.5"), Some(12.5));
        assert_eq!(parse_measure(" -3 "), Some(-3.0));
        assert_eq!(parse_measure(""), None);
        assert_eq!(parse_measure("NaN"), None);
    }

    #[test]
    fn epoch_days() {
        assert_eq!(date_to_epoch_days(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()), 1);
        assert_eq!(
            date_to_epoch_days(NaiveDate::from_ymd_opt(2021, 3, 5).unwrap()),
            18691
        );
    }

    #[tokio::test]
    async fn creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_dir_exists(&nested).await.unwrap();
        assert!(nested.is_dir());
        ensure_dir_exists(&nested).await.unwrap();

        let file = dir.path().join("file");
        std::fs::write(&file, b"x").unwrap();
        assert!(ensure_dir_exists(&file).await.is_err());
    }
}
