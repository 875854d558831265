mod buffer;

pub use buffer::*;

use geo::{
    BoundingRect, Geometry, GeometryCollection, Intersects, LineString, MultiLineString,
    MultiPolygon, Polygon, Rect,
};
use std::path::Path;

use crate::{BoundingBox, NaipTilesError, Result};

/// A shape that can be tiled: it has a bounding envelope and can be tested
/// against grid cells.
pub trait TileGeometry {
    /// Minimal axis-aligned rectangle containing the shape, `None` when empty
    fn envelope(&self) -> Option<Rect<f64>>;

    /// Whether the shape touches or overlaps `rect`
    fn intersects_rect(&self, rect: &Rect<f64>) -> bool;
}

macro_rules! impl_tile_geometry {
    ($($ty:ty),* $(,)?) => {
        $(
            impl TileGeometry for $ty {
                fn envelope(&self) -> Option<Rect<f64>> {
                    self.bounding_rect()
                }

                fn intersects_rect(&self, rect: &Rect<f64>) -> bool {
                    self.intersects(rect)
                }
            }
        )*
    };
}

impl_tile_geometry!(
    Geometry<f64>,
    GeometryCollection<f64>,
    Polygon<f64>,
    MultiPolygon<f64>,
    LineString<f64>,
    MultiLineString<f64>,
);

impl TileGeometry for Rect<f64> {
    fn envelope(&self) -> Option<Rect<f64>> {
        Some(*self)
    }

    fn intersects_rect(&self, rect: &Rect<f64>) -> bool {
        self.intersects(rect)
    }
}

impl TileGeometry for BoundingBox {
    fn envelope(&self) -> Option<Rect<f64>> {
        Some(self.to_rect())
    }

    fn intersects_rect(&self, rect: &Rect<f64>) -> bool {
        self.to_rect().intersects(rect)
    }
}

/// Parse GeoJSON text (a FeatureCollection, a Feature or a bare Geometry)
/// into a single geometry collection.
pub fn parse_geojson(text: &str) -> Result<Geometry<f64>> {
    let geojson: geojson::GeoJson = text
        .parse()
        .map_err(|e| NaipTilesError::Parse(format!("Invalid GeoJSON: {}", e)))?;

    let collection = GeometryCollection::<f64>::try_from(&geojson)
        .map_err(|e| NaipTilesError::Parse(format!("Unsupported GeoJSON geometry: {}", e)))?;

    if collection.0.is_empty() {
        return Err(NaipTilesError::Geographic(
            "GeoJSON contains no geometries".to_string(),
        ));
    }

    tracing::debug!("Parsed {} geometries from GeoJSON", collection.0.len());
    Ok(Geometry::GeometryCollection(collection))
}

/// Load the geometry of a GeoJSON file (coordinates in lon/lat degrees)
pub fn load_geometry_file(path: impl AsRef<Path>) -> Result<Geometry<f64>> {
    let path = path.as_ref();
    tracing::info!("Loading area of interest from {}", path.display());

    let text = std::fs::read_to_string(path).map_err(|e| {
        NaipTilesError::Config(format!("Failed to read file '{}': {}", path.display(), e))
    })?;

    parse_geojson(&text)
}
