use gdal::errors::GdalError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrsError {
    #[error("Unrecognised coordinate reference system '{0}'")]
    Unrecognised(String, #[source] GdalError),

    #[error("EPSG:{0} is not a known coordinate reference system")]
    UnknownEpsg(u32, #[source] GdalError),

    #[error("Coordinate reference system {0} is geographic; a projected (planar) system is required")]
    NotProjected(String),

    #[error("Failed to build spatial reference for '{definition}'")]
    SpatialRef {
        definition: String,
        #[source]
        source: GdalError,
    },

    #[error("Failed to transform coordinates from {from} to {to}")]
    Transform {
        from: String,
        to: String,
        #[source]
        source: GdalError,
    },

    #[error("Coordinate ({x}, {y}) cannot be transformed")]
    NonFiniteCoordinate { x: f64, y: f64 },
}
