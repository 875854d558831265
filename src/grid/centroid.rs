use geo::Point;

use crate::BoundingBox;

/// Maps grid cells to their center points, optionally rounded.
///
/// Used when downstream data is keyed by coarse cell centers (for example
/// point-based label grids) rather than by the cell rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CentroidExtractor {
    digits: Option<u32>,
}

impl CentroidExtractor {
    /// Extractor returning exact centers
    pub fn new() -> Self {
        Self { digits: None }
    }

    /// Extractor rounding both coordinates to `digits` decimal places
    pub fn with_digits(digits: u32) -> Self {
        Self {
            digits: Some(digits),
        }
    }

    /// Center of a single cell
    pub fn centroid(&self, cell: &BoundingBox) -> Point<f64> {
        let (x, y) = cell.center();
        match self.digits {
            Some(digits) => Point::new(round_to(x, digits), round_to(y, digits)),
            None => Point::new(x, y),
        }
    }

    /// Centers of `cells`, in input order
    pub fn extract<I>(self, cells: I) -> impl Iterator<Item = Point<f64>>
    where
        I: IntoIterator<Item = BoundingBox>,
    {
        cells.into_iter().map(move |cell| self.centroid(&cell))
    }
}

/// Centers of `cells` rounded to `digits` decimal places when given
pub fn centroids<I>(cells: I, digits: Option<u32>) -> impl Iterator<Item = Point<f64>>
where
    I: IntoIterator<Item = BoundingBox>,
{
    CentroidExtractor { digits }.extract(cells)
}

/// Round `value` to `digits` decimal places
pub fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}
