use std::path::PathBuf;

use super::{AreaOfInterest, BoundingBox, CatalogQuery, FetchConfig, GridSpec};
use crate::BufferSpec;

/// Builder for creating fetch configurations with a fluent API
#[derive(Debug, Clone)]
pub struct FetchConfigBuilder {
    area: Option<AreaOfInterest>,
    cell_size: Option<f64>,
    offset: Option<f64>,
    query: Option<CatalogQuery>,
    download_dir: Option<PathBuf>,
    paths_file: Option<PathBuf>,
    overwrite: bool,
    timeout_seconds: Option<u64>,
}

impl FetchConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            area: None,
            cell_size: None,
            offset: None,
            query: None,
            download_dir: None,
            paths_file: None,
            overwrite: false,
            timeout_seconds: None,
        }
    }

    /// Set the area of interest
    pub fn area(mut self, area: AreaOfInterest) -> Self {
        self.area = Some(area);
        self
    }

    /// Set the area to a bounding box (west, south, east, north)
    pub fn bbox(mut self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        self.area = Some(AreaOfInterest::bbox(min_x, min_y, max_x, max_y));
        self
    }

    /// Set the area to a geometry file
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.area = Some(AreaOfInterest::file(path));
        self
    }

    /// Set the area to a geometry file buffered by `buffer`
    pub fn buffered_file(mut self, path: impl Into<PathBuf>, buffer: BufferSpec) -> Self {
        self.area = Some(AreaOfInterest::buffered_file(path, buffer));
        self
    }

    /// Set the grid cell size in degrees
    pub fn cell_size(mut self, cell_size: f64) -> Self {
        self.cell_size = Some(cell_size);
        self
    }

    /// Set the grid offset in degrees
    pub fn offset(mut self, offset: f64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Set the catalog product filter
    pub fn query(mut self, query: CatalogQuery) -> Self {
        self.query = Some(query);
        self
    }

    /// Set the download directory
    pub fn download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    /// Set the file downloaded paths are written to
    pub fn paths_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths_file = Some(path.into());
        self
    }

    /// Re-download and overwrite existing files
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set the timeout
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Build the final configuration
    pub fn build(self) -> FetchConfig {
        let defaults = FetchConfig::default();
        let grid = GridSpec {
            cell_size: self.cell_size.unwrap_or(defaults.grid.cell_size),
            offset: self.offset.unwrap_or(defaults.grid.offset),
        };

        FetchConfig {
            area: self.area.unwrap_or(defaults.area),
            grid,
            query: self.query.unwrap_or(defaults.query),
            download_dir: self.download_dir.unwrap_or(defaults.download_dir),
            paths_file: self.paths_file.unwrap_or(defaults.paths_file),
            overwrite: self.overwrite,
            timeout_seconds: self.timeout_seconds.unwrap_or(defaults.timeout_seconds),
        }
    }
}

impl Default for FetchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl From<BoundingBox> for FetchConfigBuilder {
    fn from(bbox: BoundingBox) -> Self {
        Self::new().area(AreaOfInterest::BoundingBox(bbox))
    }
}
