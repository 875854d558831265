use geo::{BoundingRect, Buffer, Coord, Distance, Geometry, Haversine, MapCoords, Point};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uom::si::f64::Length;
use uom::si::length::{kilometer, meter, mile};

use crate::{NaipTilesError, Result};

/// Unit a buffer distance is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LengthUnit {
    Mile,
    Meter,
    Kilometer,
}

impl LengthUnit {
    /// All supported units, in the order they are listed to users
    pub const ALL: [LengthUnit; 3] = [Self::Mile, Self::Meter, Self::Kilometer];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mile => "mile",
            Self::Meter => "meter",
            Self::Kilometer => "kilometer",
        }
    }

    /// Build a `uom` length of `value` in this unit
    pub fn length(&self, value: f64) -> Length {
        match self {
            Self::Mile => Length::new::<mile>(value),
            Self::Meter => Length::new::<meter>(value),
            Self::Kilometer => Length::new::<kilometer>(value),
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LengthUnit {
    type Err = NaipTilesError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|unit| unit.name() == lower)
            .ok_or_else(|| {
                NaipTilesError::Config(format!(
                    "Unknown buffer unit '{}'. Must be one of: mile, meter, kilometer",
                    s
                ))
            })
    }
}

/// Distance to grow an area of interest by before tiling it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BufferSpec {
    pub distance: f64,
    pub unit: LengthUnit,
}

impl BufferSpec {
    pub fn new(distance: f64, unit: LengthUnit) -> Self {
        Self { distance, unit }
    }

    /// Buffer distance converted to meters
    pub fn distance_meters(&self) -> f64 {
        self.unit.length(self.distance).get::<meter>()
    }
}

/// Grow `geometry` (lon/lat degrees) by the buffer distance.
///
/// The geometry is projected onto a local equirectangular plane in meters
/// centred on its envelope, buffered there, and projected back. Accuracy
/// degrades for areas spanning many degrees of latitude.
pub fn buffer_geometry(geometry: &Geometry<f64>, spec: &BufferSpec) -> Result<Geometry<f64>> {
    let distance = spec.distance_meters();
    if !(distance.is_finite() && distance > 0.0) {
        return Err(NaipTilesError::Geographic(format!(
            "Buffer distance must be positive, got {} {}",
            spec.distance, spec.unit
        )));
    }

    let envelope = geometry.bounding_rect().ok_or_else(|| {
        NaipTilesError::Geographic("Cannot buffer an empty geometry".to_string())
    })?;
    let origin = envelope.center();

    // Meters per degree at the envelope center
    let origin_point = Point::from(origin);
    let meters_per_lon = Haversine.distance(origin_point, Point::new(origin.x + 1.0, origin.y));
    let meters_per_lat = Haversine.distance(origin_point, Point::new(origin.x, origin.y + 1.0));
    if meters_per_lon <= f64::EPSILON {
        return Err(NaipTilesError::Geographic(format!(
            "Cannot buffer a geometry centred at latitude {}",
            origin.y
        )));
    }

    tracing::debug!(
        "Buffering geometry by {:.1} m around ({:.4}, {:.4})",
        distance,
        origin.x,
        origin.y
    );

    let projected = geometry.map_coords(|c| Coord {
        x: (c.x - origin.x) * meters_per_lon,
        y: (c.y - origin.y) * meters_per_lat,
    });

    let buffered = projected.buffer(distance);

    let unprojected = buffered.map_coords(|c| Coord {
        x: c.x / meters_per_lon + origin.x,
        y: c.y / meters_per_lat + origin.y,
    });

    Ok(Geometry::MultiPolygon(unprojected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Intersects, line_string};

    #[test]
    fn test_unit_conversion() {
        let mile_m = BufferSpec::new(1.0, LengthUnit::Mile).distance_meters();
        assert!((mile_m - 1609.344).abs() < 1e-6, "got {}", mile_m);

        let km = BufferSpec::new(2.5, LengthUnit::Kilometer).distance_meters();
        assert!((km - 2500.0).abs() < 1e-9);

        let m = BufferSpec::new(42.0, LengthUnit::Meter).distance_meters();
        assert!((m - 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_unit_parse() {
        assert_eq!("mile".parse::<LengthUnit>().unwrap(), LengthUnit::Mile);
        assert_eq!("METER".parse::<LengthUnit>().unwrap(), LengthUnit::Meter);
        assert_eq!(" Kilometer ".parse::<LengthUnit>().unwrap(), LengthUnit::Kilometer);
        assert!("furlong".parse::<LengthUnit>().is_err());
    }

    #[test]
    fn test_buffer_grows_line() {
        // Short east-west segment near Denver
        let line = Geometry::LineString(line_string![
            (x: -105.0, y: 40.0),
            (x: -104.99, y: 40.0),
        ]);
        let buffered = buffer_geometry(&line, &BufferSpec::new(1.0, LengthUnit::Kilometer)).unwrap();

        let envelope = buffered.bounding_rect().unwrap();
        // 1 km is ~0.009 degrees of latitude
        assert!(envelope.max().y > 40.008 && envelope.max().y < 40.01);
        assert!(envelope.min().y < 39.992 && envelope.min().y > 39.99);
        assert!(envelope.min().x < -105.0);
        assert!(envelope.max().x > -104.99);

        // A point 500 m north of the line is inside the buffer, one 2 km north is not
        let near = Point::new(-104.995, 40.0045);
        let far = Point::new(-104.995, 40.018);
        assert!(buffered.intersects(&near));
        assert!(!buffered.intersects(&far));
    }

    #[test]
    fn test_buffer_rejects_non_positive_distance() {
        let line = Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)]);
        let result = buffer_geometry(&line, &BufferSpec::new(-1.0, LengthUnit::Meter));
        assert!(matches!(result, Err(NaipTilesError::Geographic(_))));
    }
}
