use crate::crs::error::CrsError;
use crate::crs::Crs;
use crate::stations::error::LocateStationError;
use crate::stations::registry::StationRegistry;
use crate::types::station::{ProjectedStation, WeatherStation};
use geo::Point;
use rstar::RTree;

/// Distances closer than this to the minimum are treated as ties.
const TIE_TOLERANCE_M: f64 = 1e-6;

/// Nearest-station search over a registry projected into a planar CRS.
#[derive(Debug, Clone)]
pub struct StationLocator {
    rtree: RTree<ProjectedStation>,
    crs: Crs,
}

/// The result of a nearest-station lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationMatch<'a> {
    pub station: &'a WeatherStation,
    /// Planar distance in metres.
    pub dist_m: f64,
}

impl StationLocator {
    /// Projects every station into `planar` and bulk-loads them into an R-tree.
    pub fn new(registry: &StationRegistry, planar: &Crs) -> Result<Self, LocateStationError> {
        if registry.is_empty() {
            return Err(LocateStationError::EmptyRegistry);
        }
        if !planar.is_projected() {
            return Err(CrsError::NotProjected(planar.to_string()).into());
        }

        let locations: Vec<Point<f64>> =
            registry.stations().iter().map(|s| s.location()).collect();
        let projected = Crs::wgs84()
            .transform_points(&locations, planar)
            .map_err(|e| LocateStationError::StationProjection {
                crs: planar.to_string(),
                source: e,
            })?;
        let stations: Vec<ProjectedStation> = registry
            .stations()
            .iter()
            .zip(projected)
            .map(|(station, position)| ProjectedStation {
                station: station.clone(),
                position: [position.x(), position.y()],
            })
            .collect();

        Ok(StationLocator {
            rtree: RTree::bulk_load(stations),
            crs: planar.clone(),
        })
    }

    /// The planar CRS the stations were projected into.
    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    /// Finds the station closest to `point`, which must be expressed in [`StationLocator::crs`].
    ///
    /// When several stations lie at the same distance the one with the lowest
    /// `station_id` is returned, so results never depend on R-tree layout.
    pub fn nearest(&self, point: Point<f64>) -> Option<StationMatch<'_>> {
        let query = [point.x(), point.y()];
        let mut candidates = self.rtree.nearest_neighbor_iter_with_distance_2(&query);

        let (first, first_d2) = candidates.next()?;
        let min_dist = first_d2.sqrt();
        let mut best = first;

        for (candidate, d2) in candidates {
            if d2.sqrt() - min_dist > TIE_TOLERANCE_M {
                break;
            }
            if candidate.station.station_id < best.station.station_id {
                best = candidate;
            }
        }

        Some(StationMatch {
            station: &best.station,
            dist_m: min_dist,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unified() -> Crs {
        Crs::from_epsg(5179).unwrap()
    }

    fn brute_force(registry: &StationRegistry, crs: &Crs, point: Point<f64>) -> (i64, f64) {
        registry
            .stations()
            .iter()
            .map(|s| {
                let p = crs.from_geographic(s.location()).unwrap();
                let d = ((p.x() - point.x()).powi(2) + (p.y() - point.y()).powi(2)).sqrt();
                (s.station_id, d)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
            .unwrap()
    }

    #[test]
    fn nearest_agrees_with_brute_force() {
        let registry = StationRegistry::default_kma_gangneung();
        let crs = unified();
        let locator = StationLocator::new(&registry, &crs).unwrap();

        let fires = [
            (128.80, 37.85),
            (128.95, 37.70),
            (128.87, 37.78),
            (128.60, 37.60),
            (129.10, 38.10),
        ];
        for (lon, lat) in fires {
            let planar = crs.from_geographic(Point::new(lon, lat)).unwrap();
            let found = locator.nearest(planar).unwrap();
            let (expected_id, expected_d) = brute_force(&registry, &crs, planar);
            assert_eq!(found.station.station_id, expected_id, "fire at {lon},{lat}");
            assert!((found.dist_m - expected_d).abs() < 1e-3);
            assert!(found.dist_m >= 0.0);
        }
    }

    #[test]
    fn fire_on_top_of_station_has_zero_distance() {
        let registry = StationRegistry::default_kma_gangneung();
        let crs = unified();
        let locator = StationLocator::new(&registry, &crs).unwrap();
        let at_105 = crs.from_geographic(Point::new(128.89098, 37.75146)).unwrap();
        let found = locator.nearest(at_105).unwrap();
        assert_eq!(found.station.station_id, 105);
        assert!(found.dist_m < 1e-6);
    }

    #[test]
    fn equidistant_stations_resolve_to_lowest_id() {
        let crs = unified();
        // Two stations mirrored about the 127.5° central meridian on the same parallel.
        let registry = StationRegistry::new(vec![
            WeatherStation {
                station_id: 300,
                name_kr: "동".to_string(),
                name_en: "East".to_string(),
                lat: 37.5,
                lon: 127.6,
            },
            WeatherStation {
                station_id: 200,
                name_kr: "서".to_string(),
                name_en: "West".to_string(),
                lat: 37.5,
                lon: 127.4,
            },
        ]);
        let locator = StationLocator::new(&registry, &crs).unwrap();
        let midpoint = crs.from_geographic(Point::new(127.5, 37.5)).unwrap();
        let found = locator.nearest(midpoint).unwrap();
        assert_eq!(found.station.station_id, 200);
    }

    #[test]
    fn rejects_empty_registry_and_geographic_crs() {
        assert!(matches!(
            StationLocator::new(&StationRegistry::new(vec![]), &unified()),
            Err(LocateStationError::EmptyRegistry)
        ));
        assert!(matches!(
            StationLocator::new(&StationRegistry::default(), &Crs::wgs84()),
            Err(LocateStationError::Crs(CrsError::NotProjected(_)))
        ));
    }
}
