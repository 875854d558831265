use geo::{Rect, coord};
use std::iter::FusedIterator;

use crate::{BoundingBox, GridSpec, NaipTilesError, Result, TileGeometry};

/// Relative tolerance used when counting grid steps across a span
const STEP_EPSILON: f64 = 1e-9;

/// Enumerates the cells of a regular, degree-aligned grid that intersect a
/// geometry.
///
/// The grid has square cells of `cell_size` degrees whose edges sit at
/// `k * cell_size - offset` from whole-degree boundaries. A non-zero offset
/// is used when cell *centers*, rather than cell edges, should land on round
/// values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridTiler {
    cell_size: f64,
    offset: f64,
}

impl GridTiler {
    /// Create a tiler with cells of `cell_size` degrees and no offset
    pub fn new(cell_size: f64) -> Result<Self> {
        Self::with_offset(cell_size, 0.0)
    }

    /// Create a tiler whose grid origin is shifted by `offset` degrees
    pub fn with_offset(cell_size: f64, offset: f64) -> Result<Self> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(NaipTilesError::InvalidParameter(format!(
                "Cell size must be a positive number of degrees, got {}",
                cell_size
            )));
        }
        if !offset.is_finite() {
            return Err(NaipTilesError::InvalidParameter(format!(
                "Grid offset must be finite, got {}",
                offset
            )));
        }

        Ok(Self { cell_size, offset })
    }

    /// Create a tiler from grid configuration
    pub fn from_spec(spec: &GridSpec) -> Result<Self> {
        Self::with_offset(spec.cell_size, spec.offset)
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Lazily enumerate every grid cell that touches or overlaps `geometry`.
    ///
    /// Candidates cover the geometry's envelope expanded outward to whole
    /// degrees. Cells are produced in row-major order: every Y for one X
    /// before advancing X.
    pub fn tile<'g, G>(&self, geometry: &'g G) -> Result<GridCells<'g, G>>
    where
        G: TileGeometry + ?Sized,
    {
        let envelope = geometry.envelope().ok_or_else(|| {
            NaipTilesError::InvalidParameter("Geometry has no bounding envelope".to_string())
        })?;

        let (min, max) = (envelope.min(), envelope.max());
        if ![min.x, min.y, max.x, max.y].iter().all(|v| v.is_finite()) {
            return Err(NaipTilesError::InvalidParameter(format!(
                "Geometry envelope is not finite: {:?}",
                envelope
            )));
        }

        let (min_x, max_x) = whole_degree_span(min.x, max.x);
        let (min_y, max_y) = whole_degree_span(min.y, max.y);

        let start_x = min_x - self.offset;
        let start_y = min_y - self.offset;
        let columns = step_count(start_x, max_x + self.offset, self.cell_size);
        let rows = step_count(start_y, max_y + self.offset, self.cell_size);

        tracing::debug!(
            "Tiling envelope [{}, {}, {}, {}] with {}° cells: {} x {} candidates",
            min_x,
            min_y,
            max_x,
            max_y,
            self.cell_size,
            columns,
            rows
        );

        Ok(GridCells {
            geometry,
            cell_size: self.cell_size,
            start_x,
            start_y,
            columns: if rows == 0 { 0 } else { columns },
            rows,
            column: 0,
            row: 0,
        })
    }
}

impl TryFrom<&GridSpec> for GridTiler {
    type Error = NaipTilesError;

    fn try_from(spec: &GridSpec) -> Result<Self> {
        Self::from_spec(spec)
    }
}

/// Tile `geometry` with cells of `cell_size` degrees shifted by `offset`
pub fn tile<G>(geometry: &G, cell_size: f64, offset: f64) -> Result<GridCells<'_, G>>
where
    G: TileGeometry + ?Sized,
{
    GridTiler::with_offset(cell_size, offset)?.tile(geometry)
}

/// Expand `[min, max]` outward to whole degrees, never collapsing to zero width
fn whole_degree_span(min: f64, max: f64) -> (f64, f64) {
    let low = min.floor();
    let high = max.ceil();
    if high > low { (low, high) } else { (low, low + 1.0) }
}

/// Number of anchors `start + i * step` lying in `[start, stop)`.
///
/// Quotients within a relative epsilon of an integer are treated as that
/// integer so rounding error never adds or drops the last step.
fn step_count(start: f64, stop: f64, step: f64) -> usize {
    let steps = (stop - start) / step;
    if steps <= 0.0 {
        return 0;
    }

    let nearest = steps.round();
    if (steps - nearest).abs() <= STEP_EPSILON * nearest.max(1.0) {
        nearest as usize
    } else {
        steps.ceil() as usize
    }
}

/// Lazy iterator over the grid cells intersecting a geometry.
///
/// Cloning yields an independent iterator from the same position, so a fresh
/// clone taken before iteration restarts the sequence.
#[derive(Debug)]
pub struct GridCells<'g, G: ?Sized> {
    geometry: &'g G,
    cell_size: f64,
    start_x: f64,
    start_y: f64,
    columns: usize,
    rows: usize,
    column: usize,
    row: usize,
}

impl<G: ?Sized> Clone for GridCells<'_, G> {
    fn clone(&self) -> Self {
        Self {
            geometry: self.geometry,
            cell_size: self.cell_size,
            start_x: self.start_x,
            start_y: self.start_y,
            columns: self.columns,
            rows: self.rows,
            column: self.column,
            row: self.row,
        }
    }
}

impl<G: ?Sized> GridCells<'_, G> {
    /// Total number of candidate cells, intersecting or not
    pub fn candidate_count(&self) -> usize {
        self.columns.saturating_mul(self.rows)
    }

    /// Candidate cells not yet visited
    fn remaining(&self) -> usize {
        let visited = self.column.saturating_mul(self.rows).saturating_add(self.row);
        self.candidate_count().saturating_sub(visited)
    }
}

impl<G> Iterator for GridCells<'_, G>
where
    G: TileGeometry + ?Sized,
{
    type Item = BoundingBox;

    fn next(&mut self) -> Option<Self::Item> {
        while self.column < self.columns {
            let x = self.start_x + self.column as f64 * self.cell_size;
            let y = self.start_y + self.row as f64 * self.cell_size;

            self.row += 1;
            if self.row == self.rows {
                self.row = 0;
                self.column += 1;
            }

            let cell = Rect::new(
                coord! { x: x, y: y },
                coord! { x: x + self.cell_size, y: y + self.cell_size },
            );
            if self.geometry.intersects_rect(&cell) {
                return Some(BoundingBox::from(cell));
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining()))
    }
}

impl<G> FusedIterator for GridCells<'_, G> where G: TileGeometry + ?Sized {}
