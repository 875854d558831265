//! Tile an area of interest into a degree-aligned grid, query an imagery
//! catalog for each cell, keep the most recent usable product per quarter
//! quad and download the selected NAIP files.
//!
//! The grid tiler and candidate selector are pure and synchronous. Catalog
//! access and file retrieval sit behind async traits so they can be swapped
//! for in-memory mocks; the HTTP implementations need the `reqwest-client`
//! feature.

pub mod catalog;
pub mod config;
pub mod download;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod retrieval;
pub mod selection;

pub use catalog::*;
pub use config::*;
pub use download::*;
pub use error::*;
pub use geometry::*;
pub use grid::*;
pub use retrieval::*;
pub use selection::*;
