mod area;
mod builder;
mod query;

pub use area::*;
pub use builder::*;
pub use query::*;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{NaipTilesError, Result};

/// Default grid cell size in degrees (one NAIP quarter quad is 3.75 arc minutes)
pub const DEFAULT_CELL_SIZE: f64 = 0.0625;

/// Parameters of the regular grid an area of interest is tiled with
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Cell edge length in degrees
    pub cell_size: f64,
    /// Shift of the grid origin away from whole-degree boundaries
    pub offset: f64,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
            offset: 0.0,
        }
    }
}

/// Configuration for tiling an area and downloading its imagery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// The area to download imagery for
    pub area: AreaOfInterest,
    /// Grid used when the area comes from a geometry file
    pub grid: GridSpec,
    /// Product filter sent to the catalog
    pub query: CatalogQuery,
    /// Directory downloaded files are written to
    pub download_dir: PathBuf,
    /// File the local paths of all downloads are listed in
    pub paths_file: PathBuf,
    /// Re-download and overwrite existing files
    pub overwrite: bool,
    /// Maximum timeout for catalog and download requests (in seconds)
    pub timeout_seconds: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            area: AreaOfInterest::bbox(-105.02, 39.98, -104.97, 40.03),
            grid: GridSpec::default(),
            query: CatalogQuery::naip(),
            download_dir: PathBuf::from("data/raw"),
            paths_file: PathBuf::from("paths.txt"),
            overwrite: false,
            timeout_seconds: 60,
        }
    }
}

impl FetchConfig {
    /// Create a configuration for a bounding box
    pub fn for_bbox(bbox: BoundingBox) -> Self {
        Self {
            area: AreaOfInterest::BoundingBox(bbox),
            ..Default::default()
        }
    }

    /// Create a configuration for a geometry file
    pub fn for_file(path: impl Into<PathBuf>) -> Self {
        Self {
            area: AreaOfInterest::file(path),
            ..Default::default()
        }
    }

    /// Set the grid cell size in degrees
    pub fn with_cell_size(mut self, cell_size: f64) -> Self {
        self.grid.cell_size = cell_size;
        self
    }

    /// Set the download directory
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Force re-download of existing files
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Set the catalog product filter
    pub fn with_query(mut self, query: CatalogQuery) -> Self {
        self.query = query;
        self
    }

    /// Create a builder for more complex configuration
    pub fn builder() -> FetchConfigBuilder {
        FetchConfigBuilder::new()
    }

    /// Check the configuration for values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(self.grid.cell_size.is_finite() && self.grid.cell_size > 0.0) {
            return Err(NaipTilesError::Config(format!(
                "Cell size must be positive, got {}",
                self.grid.cell_size
            )));
        }

        if !self.grid.offset.is_finite() {
            return Err(NaipTilesError::Config("Grid offset must be finite".to_string()));
        }

        match &self.area {
            AreaOfInterest::BoundingBox(bbox) if !bbox.is_valid() => {
                Err(NaipTilesError::Config(format!(
                    "Bounding box must have west < east and south < north, got {}",
                    bbox
                )))
            }
            AreaOfInterest::GeometryFile {
                buffer: Some(buffer),
                ..
            } if !(buffer.distance.is_finite() && buffer.distance > 0.0) => {
                Err(NaipTilesError::Config(format!(
                    "Buffer distance must be positive, got {}",
                    buffer.distance
                )))
            }
            _ => Ok(()),
        }
    }
}
