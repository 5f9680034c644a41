use crate::crs::Crs;
use crate::fires::error::FireDataError;
use crate::types::columns::COL_GEOMETRY;
use crate::utils::column_as_strings;
use geo::Point;
use polars::prelude::*;
use serde_json::{json, Map, Value};

/// Fire incident points together with their attribute table.
///
/// `points[i]` is the geometry of row `i` of `frame`, expressed in `crs`.
/// The frame may have no columns at all when the source features carry no
/// properties; the layer length is then given by the points alone.
#[derive(Debug, Clone)]
pub struct FireLayer {
    frame: DataFrame,
    points: Vec<Point<f64>>,
    crs: Crs,
}

impl FireLayer {
    pub fn new(frame: DataFrame, points: Vec<Point<f64>>, crs: Crs) -> Result<Self, FireDataError> {
        if frame.width() > 0 && frame.height() != points.len() {
            return Err(FireDataError::GeometryLengthMismatch {
                rows: frame.height(),
                points: points.len(),
            });
        }
        Ok(Self { frame, points, crs })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn points(&self) -> &[Point<f64>] {
        &self.points
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Adds `column` to the attribute table, replacing any column of the same name.
    pub fn with_column(mut self, column: Column) -> Result<Self, FireDataError> {
        self.frame.with_column(column)?;
        Ok(self)
    }

    /// Keeps the rows for which `mask` is true.
    pub fn filter(&self, mask: &[bool]) -> Result<Self, FireDataError> {
        let frame = if self.frame.width() > 0 {
            self.frame
                .filter(&BooleanChunked::from_slice("mask".into(), mask))?
        } else {
            self.frame.clone()
        };
        let points = self
            .points
            .iter()
            .zip(mask)
            .filter(|(_, keep)| **keep)
            .map(|(p, _)| *p)
            .collect();
        Self::new(frame, points, self.crs.clone())
    }

    /// Keeps fires whose `column` value starts with one of `years`.
    ///
    /// The column holds `YYYYMMDD...` style codes; rows whose first four
    /// characters are not a year in the set are dropped.
    pub fn retain_years(&self, column: &str, years: &[i32]) -> Result<Self, FireDataError> {
        if self.frame.column(column).is_err() {
            return Err(FireDataError::MissingDateColumn {
                candidates: column.to_string(),
            });
        }
        let mask: Vec<bool> = column_as_strings(&self.frame, column)?
            .iter()
            .map(|raw| {
                raw.as_deref()
                    .and_then(|s| s.trim().get(..4))
                    .and_then(|y| y.parse::<i32>().ok())
                    .is_some_and(|y| years.contains(&y))
            })
            .collect();
        self.filter(&mask)
    }

    /// Geometries rendered as WKT in the layer's own CRS.
    pub fn geometry_wkt(&self) -> Vec<String> {
        self.points.iter().map(|p| point_wkt(*p)).collect()
    }

    /// The attribute table with a WKT `geometry` column appended.
    pub fn to_frame_with_geometry(&self) -> Result<DataFrame, FireDataError> {
        let geometry = Column::new(COL_GEOMETRY.into(), self.geometry_wkt());
        if self.frame.width() == 0 {
            return Ok(DataFrame::new(vec![geometry])?);
        }
        let mut frame = self.frame.clone();
        frame.with_column(geometry)?;
        Ok(frame)
    }

    /// Renders the layer as a GeoJSON FeatureCollection with a named `crs` member.
    pub fn to_geojson(&self) -> Result<Value, FireDataError> {
        let columns = self.frame.get_columns();
        let mut features = Vec::with_capacity(self.len());
        for (i, point) in self.points.iter().enumerate() {
            let mut properties = Map::new();
            for column in columns {
                properties.insert(column.name().to_string(), any_value_to_json(column.get(i)?));
            }
            features.push(json!({
                "type": "Feature",
                "properties": properties,
                "geometry": {
                    "type": "Point",
                    "coordinates": [point.x(), point.y()],
                },
            }));
        }

        Ok(json!({
            "type": "FeatureCollection",
            "crs": {
                "type": "name",
                "properties": { "name": self.crs.urn() },
            },
            "features": features,
        }))
    }
}

pub fn point_wkt(point: Point<f64>) -> String {
    format!("POINT ({} {})", point.x(), point.y())
}

fn any_value_to_json(value: AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::Int8(v) => json!(v),
        AnyValue::Int16(v) => json!(v),
        AnyValue::Int32(v) => json!(v),
        AnyValue::Int64(v) => json!(v),
        AnyValue::UInt8(v) => json!(v),
        AnyValue::UInt16(v) => json!(v),
        AnyValue::UInt32(v) => json!(v),
        AnyValue::UInt64(v) => json!(v),
        AnyValue::Float32(v) => json!(v),
        AnyValue::Float64(v) => json!(v),
        other => match other.get_str() {
            Some(s) => Value::String(s.to_string()),
            None => Value::String(other.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer() -> FireLayer {
        let frame = df!(
            "OCCRR_DTM" => ["202003011200", "202104051530", "201912312359"],
            "SGNG_NM" => ["강릉시", "동해시", "강릉시"],
        )
        .unwrap();
        let points = vec![
            Point::new(1_119_500.0, 1_978_300.0),
            Point::new(1_122_100.0, 1_972_400.0),
            Point::new(1_080_000.0, 2_010_000.0),
        ];
        FireLayer::new(frame, points, Crs::from_epsg(5179).unwrap()).unwrap()
    }

    #[test]
    fn retain_years_filters_rows_and_points_together() {
        let filtered = layer().retain_years("OCCRR_DTM", &[2020, 2021]).unwrap();
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.frame().height(), 2);
        assert_eq!(filtered.points()[1], Point::new(1_122_100.0, 1_972_400.0));
    }

    #[test]
    fn retain_years_requires_the_column() {
        assert!(matches!(
            layer().retain_years("NOPE", &[2020]),
            Err(FireDataError::MissingDateColumn { .. })
        ));
    }

    #[test]
    fn mismatched_geometry_count_is_rejected() {
        let frame = df!("a" => [1i64, 2]).unwrap();
        let result = FireLayer::new(frame, vec![Point::new(0.0, 0.0)], Crs::wgs84());
        assert!(matches!(
            result,
            Err(FireDataError::GeometryLengthMismatch { rows: 2, points: 1 })
        ));
    }

    #[test]
    fn geojson_carries_crs_and_properties() {
        let value = layer().to_geojson().unwrap();
        assert_eq!(value["crs"]["properties"]["name"], "urn:ogc:def:crs:EPSG::5179");
        assert_eq!(value["features"].as_array().unwrap().len(), 3);
        assert_eq!(value["features"][1]["properties"]["SGNG_NM"], "동해시");
        assert_eq!(value["features"][0]["geometry"]["coordinates"][0], 1_119_500.0);
    }

    #[test]
    fn frame_with_geometry_appends_wkt() {
        let frame = layer().to_frame_with_geometry().unwrap();
        let wkt = frame
            .column(COL_GEOMETRY)
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap().get(0).unwrap().to_string();
        assert_eq!(wkt, "POINT (1119500 1978300)");
    }
}
