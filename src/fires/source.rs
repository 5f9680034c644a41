//! Reads the fire incident layer.
//!
//! GeoJSON FeatureCollections are parsed directly; any other path (an ESRI
//! Shapefile with its `.prj`, a GeoPackage, ...) is opened through GDAL. The
//! layer must declare its CRS unless the caller supplies one explicitly.
//! Coordinates are never assumed to be WGS 84.

use crate::crs::Crs;
use crate::fires::error::FireDataError;
use crate::fires::layer::FireLayer;
use gdal::vector::{FieldValue, LayerAccess};
use gdal::Dataset;
use geo::Point;
use log::{info, warn};
use polars::prelude::*;
use serde_json::Value;
use std::path::Path;
use tokio::{fs, task};

/// Reads and parses the fire layer at `path`.
///
/// `crs_override` replaces whatever the file declares.
pub async fn load_fire_layer(
    path: &Path,
    crs_override: Option<Crs>,
) -> Result<FireLayer, FireDataError> {
    let path_buf = path.to_path_buf();
    let layer = if is_geojson(path) {
        let bytes = fs::read(path)
            .await
            .map_err(|e| FireDataError::SourceRead(path.to_path_buf(), e))?;
        task::spawn_blocking(move || parse_feature_collection(&bytes, &path_buf, crs_override))
            .await??
    } else {
        task::spawn_blocking(move || read_vector_layer(&path_buf, crs_override)).await??
    };
    info!(
        "Loaded {} fire points from {:?} in {}",
        layer.len(),
        path,
        layer.crs()
    );
    Ok(layer)
}

/// Parses GeoJSON bytes into a [`FireLayer`]. `path` is only used for error reporting.
pub fn parse_feature_collection(
    bytes: &[u8],
    path: &Path,
    crs_override: Option<Crs>,
) -> Result<FireLayer, FireDataError> {
    let root: Value = serde_json::from_slice(bytes)
        .map_err(|e| FireDataError::GeoJsonParse(path.to_path_buf(), e))?;
    if root.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
        return Err(FireDataError::NotFeatureCollection(path.to_path_buf()));
    }

    let crs = choose_crs(path, crs_override, declared_crs(&root))?;

    let features = root
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| FireDataError::NotFeatureCollection(path.to_path_buf()))?;

    let empty = serde_json::Map::new();
    let mut points = Vec::with_capacity(features.len());
    let mut rows: Vec<&serde_json::Map<String, Value>> = Vec::with_capacity(features.len());
    let mut skipped = 0usize;

    for (index, feature) in features.iter().enumerate() {
        match point_coordinates(feature) {
            Some(point) => {
                points.push(point);
                rows.push(
                    feature
                        .get("properties")
                        .and_then(Value::as_object)
                        .unwrap_or(&empty),
                );
            }
            None => {
                skipped += 1;
                warn!(
                    "Skipping fire feature {} in {:?}: geometry is not a point",
                    index, path
                );
            }
        }
    }
    if skipped > 0 {
        warn!("Skipped {} non-point fire features in {:?}", skipped, path);
    }

    let frame = properties_frame(&rows)?;
    FireLayer::new(frame, points, crs)
}

fn is_geojson(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("geojson") || ext.eq_ignore_ascii_case("json"))
}

/// Picks the configured CRS over the declared one, warning when they differ.
fn choose_crs(
    path: &Path,
    crs_override: Option<Crs>,
    declared: Option<Result<Crs, FireDataError>>,
) -> Result<Crs, FireDataError> {
    match (crs_override, declared) {
        (Some(over), Some(Ok(declared))) => {
            if over != declared {
                warn!(
                    "Fire layer {:?} declares {} but {} is configured; using {}",
                    path, declared, over, over
                );
            }
            Ok(over)
        }
        (Some(over), _) => Ok(over),
        (None, Some(declared)) => declared,
        (None, None) => Err(FireDataError::MissingCrs(path.to_path_buf())),
    }
}

/// Reads the first layer of a GDAL vector dataset, e.g. an ESRI Shapefile.
///
/// The CRS comes from the layer's spatial reference (the `.prj` sidecar for
/// Shapefiles). Non-point features are skipped.
pub fn read_vector_layer(path: &Path, crs_override: Option<Crs>) -> Result<FireLayer, FireDataError> {
    let dataset =
        Dataset::open(path).map_err(|e| FireDataError::VectorRead(path.to_path_buf(), e))?;
    let mut layer = dataset
        .layers()
        .next()
        .ok_or_else(|| FireDataError::EmptyDataset(path.to_path_buf()))?;

    let declared = layer
        .spatial_ref()
        .map(|srs| Crs::from_spatial_ref(&srs).map_err(FireDataError::from));
    let crs = choose_crs(path, crs_override, declared)?;

    let mut points = Vec::new();
    let mut rows: Vec<serde_json::Map<String, Value>> = Vec::new();
    let mut skipped = 0usize;
    for feature in layer.features() {
        let point = feature
            .geometry()
            .filter(|geometry| geometry.geometry_name() == "POINT" && geometry.point_count() > 0)
            .map(|geometry| {
                let (x, y, _) = geometry.get_point(0);
                Point::new(x, y)
            });
        match point {
            Some(point) => {
                points.push(point);
                rows.push(
                    feature
                        .fields()
                        .map(|(name, value)| (name, field_json(value)))
                        .collect(),
                );
            }
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("Skipped {} non-point fire features in {:?}", skipped, path);
    }

    let rows: Vec<&serde_json::Map<String, Value>> = rows.iter().collect();
    let frame = properties_frame(&rows)?;
    FireLayer::new(frame, points, crs)
}

fn field_json(value: Option<FieldValue>) -> Value {
    match value {
        None => Value::Null,
        Some(FieldValue::IntegerValue(v)) => Value::from(v),
        Some(FieldValue::Integer64Value(v)) => Value::from(v),
        Some(FieldValue::RealValue(v)) => Value::from(v),
        Some(FieldValue::StringValue(v)) => Value::String(v),
        Some(other) => other.into_string().map_or(Value::Null, Value::String),
    }
}

/// The CRS named by the collection's `crs` member, if it has one.
fn declared_crs(root: &Value) -> Option<Result<Crs, FireDataError>> {
    let member = root.get("crs")?;
    let properties = member.get("properties")?;
    match member.get("type").and_then(Value::as_str) {
        Some("name") => {
            let name = properties.get("name")?.as_str()?;
            Some(Crs::parse(name).map_err(FireDataError::from))
        }
        Some("EPSG") => {
            let code = properties.get("code")?.as_u64()?;
            Some(Crs::parse(&format!("EPSG:{}", code)).map_err(FireDataError::from))
        }
        _ => None,
    }
}

fn point_coordinates(feature: &Value) -> Option<Point<f64>> {
    let geometry = feature.get("geometry")?;
    if geometry.get("type")?.as_str()? != "Point" {
        return None;
    }
    let coords = geometry.get("coordinates")?.as_array()?;
    let x = coords.first()?.as_f64()?;
    let y = coords.get(1)?.as_f64()?;
    Some(Point::new(x, y))
}

static NULL: Value = Value::Null;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InferredType {
    Boolean,
    Int64,
    Float64,
    String,
}

fn infer_type<'a>(values: impl Iterator<Item = &'a Value>) -> InferredType {
    let mut inferred: Option<InferredType> = None;
    for value in values {
        let this = match value {
            Value::Null => continue,
            Value::Bool(_) => InferredType::Boolean,
            Value::Number(n) if n.is_i64() => InferredType::Int64,
            Value::Number(_) => InferredType::Float64,
            _ => InferredType::String,
        };
        inferred = Some(match (inferred, this) {
            (None, t) => t,
            (Some(a), b) if a == b => a,
            (Some(InferredType::Int64), InferredType::Float64)
            | (Some(InferredType::Float64), InferredType::Int64) => InferredType::Float64,
            _ => InferredType::String,
        });
        if inferred == Some(InferredType::String) {
            break;
        }
    }
    inferred.unwrap_or(InferredType::String)
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Builds one typed column per property key, in first-seen key order.
fn properties_frame(rows: &[&serde_json::Map<String, Value>]) -> PolarsResult<DataFrame> {
    let mut keys: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !keys.contains(&key.as_str()) {
                keys.push(key.as_str());
            }
        }
    }

    let columns = keys
        .into_iter()
        .map(|key| {
            let values = || rows.iter().map(move |row| row.get(key).unwrap_or(&NULL));
            let name = PlSmallStr::from(key);
            match infer_type(values()) {
                InferredType::Boolean => {
                    Column::new(name, values().map(Value::as_bool).collect::<Vec<_>>())
                }
                InferredType::Int64 => {
                    Column::new(name, values().map(Value::as_i64).collect::<Vec<_>>())
                }
                InferredType::Float64 => {
                    Column::new(name, values().map(Value::as_f64).collect::<Vec<_>>())
                }
                InferredType::String => {
                    Column::new(name, values().map(value_as_text).collect::<Vec<_>>())
                }
            }
        })
        .collect::<Vec<_>>();

    DataFrame::new(columns)
}
