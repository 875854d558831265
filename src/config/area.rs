use geo::{Distance, Haversine, Point, Rect, coord};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::{BufferSpec, NaipTilesError};

/// Axis-aligned geographic rectangle in lon/lat degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary
    pub min_x: f64,
    /// Southern latitude boundary
    pub min_y: f64,
    /// Eastern longitude boundary
    pub max_x: f64,
    /// Northern latitude boundary
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from west, south, east, north
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Get the center point of the bounding box as (lon, lat)
    pub fn center(&self) -> (f64, f64) {
        let x = (self.min_x + self.max_x) / 2.0;
        let y = (self.min_y + self.max_y) / 2.0;
        (x, y)
    }

    /// Get the width of the bounding box in degrees longitude
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Get the height of the bounding box in degrees latitude
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Whether the box has a positive extent on both axes
    pub fn is_valid(&self) -> bool {
        [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite())
            && self.min_x < self.max_x
            && self.min_y < self.max_y
    }

    /// Get the approximate area in square kilometers using geographic calculations
    pub fn area_km2(&self) -> f64 {
        let (center_x, center_y) = self.center();

        let width_km = {
            let west_point = Point::new(self.min_x, center_y);
            let east_point = Point::new(self.max_x, center_y);
            Haversine.distance(west_point, east_point) / 1000.0
        };

        let height_km = {
            let south_point = Point::new(center_x, self.min_y);
            let north_point = Point::new(center_x, self.max_y);
            Haversine.distance(south_point, north_point) / 1000.0
        };

        width_km * height_km
    }

    /// Check if this bounding box contains a point (edges included)
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Whether the interiors of the two boxes share a positive area
    pub fn overlaps_area(&self, other: &BoundingBox) -> bool {
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }

    /// Convert to a `geo` rectangle
    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.min_x, y: self.min_y },
            coord! { x: self.max_x, y: self.max_y },
        )
    }

    /// Format as the `west,south,east,north` string catalogs expect
    pub fn to_query_string(&self) -> String {
        format!("{},{},{},{}", self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

impl From<Rect<f64>> for BoundingBox {
    fn from(rect: Rect<f64>) -> Self {
        let min = rect.min();
        let max = rect.max();
        Self::new(min.x, min.y, max.x, max.y)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_query_string())
    }
}

impl FromStr for BoundingBox {
    type Err = NaipTilesError;

    /// Parse `west,south,east,north` (whitespace around values is ignored)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|part| {
                part.trim().parse::<f64>().map_err(|_| {
                    NaipTilesError::Config(format!("Invalid bounding box coordinate '{}'", part))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if values.len() != 4 {
            return Err(NaipTilesError::Config(format!(
                "Bounding box must have 4 values (west,south,east,north), got {}",
                values.len()
            )));
        }

        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }
}

/// The area imagery should be fetched for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AreaOfInterest {
    /// A single bounding box, queried as-is
    BoundingBox(BoundingBox),
    /// A GeoJSON file whose geometry is (optionally buffered and) tiled
    GeometryFile {
        path: PathBuf,
        buffer: Option<BufferSpec>,
    },
}

impl AreaOfInterest {
    /// Create an area from a bounding box
    pub fn bbox(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::BoundingBox(BoundingBox::new(min_x, min_y, max_x, max_y))
    }

    /// Create an area from a geometry file without a buffer
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::GeometryFile {
            path: path.into(),
            buffer: None,
        }
    }

    /// Create an area from a geometry file buffered by `buffer`
    pub fn buffered_file(path: impl Into<PathBuf>, buffer: BufferSpec) -> Self {
        Self::GeometryFile {
            path: path.into(),
            buffer: Some(buffer),
        }
    }
}
