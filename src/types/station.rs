//! Defines the weather station reference records used for spatial matching,
//! together with the `rstar` implementations that let projected stations be
//! indexed and searched by planar distance.

use geo::Point;
use rstar::{PointDistance, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

/// A single weather station from the curated reference set.
///
/// Coordinates are WGS 84 degrees. Station metadata is taken as given; nothing
/// in the pipeline corrects or second-guesses it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherStation {
    /// Numeric station identifier (e.g. KMA ASOS `104`).
    pub station_id: i64,
    /// Station name in the local script (e.g. "북강릉").
    pub name_kr: String,
    /// Romanised / reference name (e.g. "Bukgangneung").
    pub name_en: String,
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
}

impl WeatherStation {
    /// The station location as a geographic `(lon, lat)` point.
    pub fn location(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

/// A station placed in a planar (projected) CRS, ready for R-tree indexing.
#[derive(Debug, Clone)]
pub struct ProjectedStation {
    pub station: WeatherStation,
    /// `[easting, northing]` in metres.
    pub position: [f64; 2],
}

/// Stations are points, so the envelope is the degenerate box around the projected position.
impl RTreeObject for ProjectedStation {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

/// Squared planar distance in metres². Valid as ground distance because the
/// positions live in a projected CRS rather than in degrees.
impl PointDistance for ProjectedStation {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}
