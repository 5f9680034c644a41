//! Coordinate reference systems understood by the pipeline.
//!
//! Definitions are resolved by GDAL (and PROJ underneath it), so any EPSG code,
//! OGC URN/URL or WKT/ESRI `.prj` text is accepted, including the Bessel-based
//! Korean grids that need a datum shift. Points are always handled in `(x, y)`
//! order: `(lon, lat)` for geographic systems, `(easting, northing)` for
//! projected ones.

pub mod error;

use crate::crs::error::CrsError;
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use geo::Point;
use log::debug;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

const WGS84_EPSG: u32 = 4326;

/// A coordinate reference system.
///
/// Only the resolved definition is stored; a GDAL spatial reference is
/// rebuilt from it whenever points are transformed.
#[derive(Debug, Clone)]
pub struct Crs {
    definition: String,
    epsg: Option<u32>,
    name: String,
    projected: bool,
}

impl PartialEq for Crs {
    fn eq(&self, other: &Self) -> bool {
        self.definition == other.definition
    }
}

impl Crs {
    /// WGS 84 geographic coordinates (EPSG:4326).
    pub fn wgs84() -> Crs {
        Crs {
            definition: format!("EPSG:{}", WGS84_EPSG),
            epsg: Some(WGS84_EPSG),
            name: "WGS 84".to_string(),
            projected: false,
        }
    }

    pub fn from_epsg(code: u32) -> Result<Self, CrsError> {
        let mut srs = SpatialRef::from_epsg(code).map_err(|e| CrsError::UnknownEpsg(code, e))?;
        Self::describe(&mut srs, format!("EPSG:{}", code))
    }

    /// Parses an identifier such as `EPSG:5179`, `urn:ogc:def:crs:EPSG::5179`,
    /// `http://www.opengis.net/def/crs/EPSG/0/5179`, `urn:ogc:def:crs:OGC:1.3:CRS84`
    /// or a WKT string.
    pub fn parse(identifier: &str) -> Result<Self, CrsError> {
        let trimmed = identifier.trim();
        let mut srs = SpatialRef::from_definition(trimmed)
            .map_err(|e| CrsError::Unrecognised(identifier.to_string(), e))?;
        Self::describe(&mut srs, trimmed.to_string())
    }

    /// Builds a CRS from WKT, as found in a Shapefile `.prj` (OGC or ESRI dialect).
    pub fn from_wkt(wkt: &str) -> Result<Self, CrsError> {
        Self::parse(wkt)
    }

    /// Wraps a spatial reference read from a dataset.
    pub fn from_spatial_ref(srs: &SpatialRef) -> Result<Self, CrsError> {
        let wkt = srs.to_wkt().map_err(|e| CrsError::SpatialRef {
            definition: "<dataset layer>".to_string(),
            source: e,
        })?;
        Self::parse(&wkt)
    }

    fn describe(srs: &mut SpatialRef, requested: String) -> Result<Self, CrsError> {
        if srs.auth_name().is_err() && srs.auto_identify_epsg().is_err() {
            debug!("No EPSG code identified for '{}'", shorten(&requested));
        }
        let epsg = epsg_code(srs);
        let wkt = srs.to_wkt().map_err(|e| CrsError::SpatialRef {
            definition: requested.clone(),
            source: e,
        })?;
        let name = wkt_name(&wkt).unwrap_or_else(|| shorten(&requested));
        let definition = match epsg {
            Some(code) => format!("EPSG:{}", code),
            None => requested,
        };
        Ok(Crs {
            definition,
            epsg,
            name,
            projected: srs.is_projected(),
        })
    }

    /// The EPSG code, when the definition maps to one.
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_projected(&self) -> bool {
        self.projected
    }

    /// The OGC URN form used in GeoJSON `crs` members.
    pub fn urn(&self) -> String {
        match self.epsg {
            Some(code) => format!("urn:ogc:def:crs:EPSG::{}", code),
            None if self.definition.to_ascii_uppercase().ends_with("CRS84") => {
                "urn:ogc:def:crs:OGC:1.3:CRS84".to_string()
            }
            None => self.name.clone(),
        }
    }

    fn spatial_ref(&self) -> Result<SpatialRef, CrsError> {
        let mut srs =
            SpatialRef::from_definition(&self.definition).map_err(|e| CrsError::SpatialRef {
                definition: shorten(&self.definition),
                source: e,
            })?;
        srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
        Ok(srs)
    }

    /// Reprojects every point from this CRS into `target` with a single transformation.
    pub fn transform_points(
        &self,
        points: &[Point<f64>],
        target: &Crs,
    ) -> Result<Vec<Point<f64>>, CrsError> {
        for point in points {
            check_finite(*point)?;
        }
        if self == target || points.is_empty() {
            return Ok(points.to_vec());
        }

        let transform_err = |e| CrsError::Transform {
            from: self.to_string(),
            to: target.to_string(),
            source: e,
        };
        let transform =
            CoordTransform::new(&self.spatial_ref()?, &target.spatial_ref()?).map_err(transform_err)?;

        let mut xs: Vec<f64> = points.iter().map(|p| p.x()).collect();
        let mut ys: Vec<f64> = points.iter().map(|p| p.y()).collect();
        let mut zs = vec![0.0; points.len()];
        transform
            .transform_coords(&mut xs, &mut ys, &mut zs)
            .map_err(transform_err)?;

        xs.into_iter()
            .zip(ys)
            .map(|(x, y)| {
                let point = Point::new(x, y);
                check_finite(point)?;
                Ok(point)
            })
            .collect()
    }

    /// Reprojects a point from this CRS into `target`.
    pub fn transform(&self, point: Point<f64>, target: &Crs) -> Result<Point<f64>, CrsError> {
        let mut out = self.transform_points(&[point], target)?;
        out.pop().ok_or(CrsError::NonFiniteCoordinate {
            x: point.x(),
            y: point.y(),
        })
    }

    /// Converts a point in this CRS to WGS 84 `(lon, lat)` degrees.
    pub fn to_geographic(&self, point: Point<f64>) -> Result<Point<f64>, CrsError> {
        self.transform(point, &Crs::wgs84())
    }

    /// Converts WGS 84 `(lon, lat)` degrees into this CRS.
    pub fn from_geographic(&self, point: Point<f64>) -> Result<Point<f64>, CrsError> {
        Crs::wgs84().transform(point, self)
    }
}

fn epsg_code(srs: &SpatialRef) -> Option<u32> {
    match srs.auth_name() {
        Ok(authority) if authority.eq_ignore_ascii_case("EPSG") => srs
            .auth_code()
            .ok()
            .and_then(|code| u32::try_from(code).ok()),
        _ => None,
    }
}

/// The name of the outermost WKT node, e.g. `Korea 2000 / Central Belt 2010`.
fn wkt_name(wkt: &str) -> Option<String> {
    let re = Regex::new(r#"^\s*[A-Z_0-9]+\[\s*"([^"]*)""#).ok()?;
    re.captures(wkt)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn shorten(definition: &str) -> String {
    match definition.char_indices().nth(60) {
        Some((end, _)) => format!("{}...", &definition[..end]),
        None => definition.to_string(),
    }
}

fn check_finite(point: Point<f64>) -> Result<(), CrsError> {
    if point.x().is_finite() && point.y().is_finite() {
        Ok(())
    } else {
        Err(CrsError::NonFiniteCoordinate {
            x: point.x(),
            y: point.y(),
        })
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg {
            Some(code) => write!(f, "EPSG:{}", code),
            None => write!(f, "{}", self.name),
        }
    }
}

impl FromStr for Crs {
    type Err = CrsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Crs::parse(s)
    }
}
