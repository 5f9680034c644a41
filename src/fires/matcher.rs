use crate::crs::Crs;
use crate::fires::error::FireDataError;
use crate::fires::layer::FireLayer;
use crate::stations::locate_station::StationLocator;
use crate::stations::registry::StationRegistry;
use crate::types::columns::{COL_DIST_M, COL_STATION_ID, COL_STATION_NAME_EN, COL_STATION_NAME_KR};
use log::info;
use polars::prelude::*;

/// Attaches the nearest registry station to every fire.
///
/// Fires and stations are compared in `projected` so that `dist_m` is a planar
/// distance in metres. The returned layer keeps the original geometry and CRS;
/// only `station_id`, `name_kr`, `name_en` and `dist_m` columns are added.
pub fn attach_nearest_station(
    layer: FireLayer,
    registry: &StationRegistry,
    projected: &Crs,
) -> Result<FireLayer, FireDataError> {
    let locator = StationLocator::new(registry, projected)?;

    let mut station_ids = Vec::with_capacity(layer.len());
    let mut names_kr = Vec::with_capacity(layer.len());
    let mut names_en = Vec::with_capacity(layer.len());
    let mut distances = Vec::with_capacity(layer.len());

    let planar = layer
        .crs()
        .transform_points(layer.points(), locator.crs())
        .map_err(|e| FireDataError::Reprojection {
            target: locator.crs().to_string(),
            source: e,
        })?;
    for point in planar {
        let nearest = locator.nearest(point);
        station_ids.push(nearest.map(|m| m.station.station_id));
        names_kr.push(nearest.map(|m| m.station.name_kr.clone()));
        names_en.push(nearest.map(|m| m.station.name_en.clone()));
        distances.push(nearest.map(|m| m.dist_m));
    }

    info!(
        "Matched {} fires to {} stations in {}",
        layer.len(),
        registry.len(),
        projected
    );

    layer
        .with_column(Column::new(COL_STATION_ID.into(), station_ids))?
        .with_column(Column::new(COL_STATION_NAME_KR.into(), names_kr))?
        .with_column(Column::new(COL_STATION_NAME_EN.into(), names_en))?
        .with_column(Column::new(COL_DIST_M.into(), distances))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Point;

    fn fires_in(crs: Crs, geographic: &[(f64, f64)]) -> FireLayer {
        let points: Vec<_> = geographic
            .iter()
            .map(|(lon, lat)| crs.from_geographic(Point::new(*lon, *lat)).unwrap())
            .collect();
        let frame = df!("OCCRR_DTM" => vec!["202103051420"; points.len()]).unwrap();
        FireLayer::new(frame, points, crs).unwrap()
    }

    #[test]
    fn assigns_minimum_planar_distance_station() {
        let registry = StationRegistry::default_kma_gangneung();
        let projected = Crs::from_epsg(5179).unwrap();
        let native = Crs::from_epsg(5186).unwrap();
        let fires = fires_in(native.clone(), &[(128.84, 37.83), (128.90, 37.74), (128.80, 37.70)]);
        let original_points = fires.points().to_vec();

        let matched = attach_nearest_station(fires, &registry, &projected).unwrap();

        // Geometry stays in the native CRS.
        assert_eq!(matched.crs(), &native);
        assert_eq!(matched.points(), original_points.as_slice());

        let ids = matched.frame().column(COL_STATION_ID).unwrap().as_materialized_series().i64().unwrap().clone();
        let dists = matched.frame().column(COL_DIST_M).unwrap().as_materialized_series().f64().unwrap().clone();

        for (i, point) in matched.points().iter().enumerate() {
            let planar = native.transform(*point, &projected).unwrap();
            let (best_id, best_d) = registry
                .stations()
                .iter()
                .map(|s| {
                    let p = projected.from_geographic(s.location()).unwrap();
                    (s.station_id, ((p.x() - planar.x()).powi(2) + (p.y() - planar.y()).powi(2)).sqrt())
                })
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .unwrap();
            assert_eq!(ids.get(i), Some(best_id));
            assert!((dists.get(i).unwrap() - best_d).abs() < 0.5);
        }
        assert_eq!(ids.get(0), Some(104));
        assert_eq!(ids.get(1), Some(105));
    }

    #[test]
    fn rejects_geographic_matching_crs() {
        let fires = fires_in(Crs::wgs84(), &[(128.9, 37.7)]);
        let result = attach_nearest_station(fires, &StationRegistry::default(), &Crs::wgs84());
        assert!(matches!(result, Err(FireDataError::LocateStation(_))));
    }
}
