//! Canonical fire events: one row per matched fire with parsed timestamps,
//! calendar fields, geographic coordinates and a stable identifier.

use crate::crs::Crs;
use crate::fires::error::FireDataError;
use crate::fires::layer::FireLayer;
use crate::types::columns::*;
use crate::utils::{column_as_strings, date_to_epoch_days, parse_datetime_generic};
use chrono::{Datelike, NaiveDateTime};
use geo::Point;
use log::{info, warn};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Length of the `YYYYMMDDHHMM` prefix of a date-time code.
const DATETIME_CODE_LEN: usize = 12;

/// Raw attribute names of the fire incident layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireSchema {
    /// Full-precision occurrence date/time. Preferred when present.
    pub full_date: String,
    /// Combined `YYYYMMDDHHMM...` occurrence code.
    pub datetime_code: String,
    pub province: String,
    pub county: String,
    /// Natural fire identifier, used verbatim when the layer carries it.
    pub id: String,
}

impl Default for FireSchema {
    fn default() -> Self {
        Self {
            full_date: "OCCRR_DATE".to_string(),
            datetime_code: "OCCRR_DTM".to_string(),
            province: "CTPRV_NM".to_string(),
            county: "SGNG_NM".to_string(),
            id: COL_FIRE_ID.to_string(),
        }
    }
}

/// Converts a matched fire layer into the canonical fire-event table.
///
/// Output columns, in order: `fire_id, fire_datetime, fire_date, year, month,
/// province, county, station_id, dist_m, lon, lat, geometry`. Province, county,
/// station and distance columns are omitted when the layer lacks them.
/// Unparsable timestamps become null; the row is kept.
pub fn normalize_fire_events(
    layer: &FireLayer,
    schema: &FireSchema,
) -> Result<DataFrame, FireDataError> {
    let frame = layer.frame();
    let has = |name: &str| frame.get_column_index(name).is_some();

    let (raw, datetimes): (Vec<Option<String>>, Vec<Option<NaiveDateTime>>) =
        if has(&schema.full_date) {
            let raw = column_as_strings(frame, &schema.full_date)?;
            let parsed = raw
                .iter()
                .map(|v| v.as_deref().and_then(parse_datetime_generic))
                .collect();
            (raw, parsed)
        } else if has(&schema.datetime_code) {
            let raw = column_as_strings(frame, &schema.datetime_code)?;
            let parsed = raw
                .iter()
                .map(|v| v.as_deref().and_then(parse_datetime_code))
                .collect();
            (raw, parsed)
        } else {
            return Err(FireDataError::MissingDateColumn {
                candidates: format!("{}, {}", schema.full_date, schema.datetime_code),
            });
        };

    let unparsed = datetimes.iter().filter(|d| d.is_none()).count();
    if unparsed > 0 {
        warn!("{} fire timestamps could not be parsed and are left null", unparsed);
    }

    let mut columns = Vec::with_capacity(12);

    let natural_ids = if has(&schema.id) {
        match frame.column(&schema.id)?.strict_cast(&DataType::Int64) {
            Ok(ids) => Some(ids.with_name(COL_FIRE_ID.into())),
            Err(e) => {
                warn!(
                    "Fire id column '{}' is not integral ({}); deriving ids from content",
                    schema.id, e
                );
                None
            }
        }
    } else {
        None
    };
    let fire_id = natural_ids.unwrap_or_else(|| {
        Column::new(COL_FIRE_ID.into(), content_ids(&raw, layer.points()))
    });
    columns.push(fire_id);

    let millis: Vec<Option<i64>> = datetimes
        .iter()
        .map(|d| d.map(|d| d.and_utc().timestamp_millis()))
        .collect();
    columns.push(
        Column::new(COL_FIRE_DATETIME.into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?,
    );
    let days: Vec<Option<i32>> = datetimes
        .iter()
        .map(|d| d.map(|d| date_to_epoch_days(d.date())))
        .collect();
    columns.push(Column::new(COL_FIRE_DATE.into(), days).cast(&DataType::Date)?);
    columns.push(Column::new(
        COL_YEAR.into(),
        datetimes.iter().map(|d| d.map(|d| d.year())).collect::<Vec<_>>(),
    ));
    columns.push(Column::new(
        COL_MONTH.into(),
        datetimes
            .iter()
            .map(|d| d.map(|d| d.month() as i32))
            .collect::<Vec<_>>(),
    ));

    for (source, target) in [(&schema.province, COL_PROVINCE), (&schema.county, COL_COUNTY)] {
        if has(source) {
            columns.push(Column::new(target.into(), column_as_strings(frame, source)?));
        }
    }
    if has(COL_STATION_ID) {
        columns.push(frame.column(COL_STATION_ID)?.cast(&DataType::Int64)?);
    }
    if has(COL_DIST_M) {
        columns.push(frame.column(COL_DIST_M)?.cast(&DataType::Float64)?);
    }

    let wgs84 = Crs::wgs84();
    let geographic = layer
        .crs()
        .transform_points(layer.points(), &wgs84)
        .map_err(|e| FireDataError::Reprojection {
            target: wgs84.to_string(),
            source: e,
        })?;
    columns.push(Column::new(
        COL_LON.into(),
        geographic.iter().map(|p| p.x()).collect::<Vec<_>>(),
    ));
    columns.push(Column::new(
        COL_LAT.into(),
        geographic.iter().map(|p| p.y()).collect::<Vec<_>>(),
    ));
    columns.push(Column::new(COL_GEOMETRY.into(), layer.geometry_wkt()));

    let events = DataFrame::new(columns)?;
    info!("Normalized {} fire events", events.height());
    Ok(events)
}

/// Parses the `YYYYMMDDHHMM` prefix of a date-time code.
pub fn parse_datetime_code(raw: &str) -> Option<NaiveDateTime> {
    let prefix = raw.trim().get(..DATETIME_CODE_LEN)?;
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDateTime::parse_from_str(prefix, "%Y%m%d%H%M").ok()
}

/// Identifiers derived from each fire's raw timestamp text and its native
/// coordinates rounded to the millimetre. Identical records are told apart by
/// their occurrence ordinal, so ids do not depend on row position.
fn content_ids(raw: &[Option<String>], points: &[Point<f64>]) -> Vec<i64> {
    let mut occurrences: HashMap<(String, i64, i64), u32> = HashMap::new();
    raw.iter()
        .zip(points)
        .map(|(text, point)| {
            let key = (
                text.as_deref().unwrap_or_default().trim().to_string(),
                (point.x() * 1000.0).round() as i64,
                (point.y() * 1000.0).round() as i64,
            );
            let ordinal = occurrences.entry(key.clone()).or_insert(0);
            let this = *ordinal;
            *ordinal += 1;

            let mut hasher = Sha256::new();
            hasher.update(key.0.as_bytes());
            hasher.update([0u8]);
            hasher.update(key.1.to_be_bytes());
            hasher.update(key.2.to_be_bytes());
            hasher.update(this.to_be_bytes());
            let digest = hasher.finalize();

            let mut head = [0u8; 8];
            head.copy_from_slice(&digest[..8]);
            (u64::from_be_bytes(head) & i64::MAX as u64) as i64
        })
        .collect()
}
