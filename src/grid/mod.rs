mod centroid;
mod tiler;

pub use centroid::*;
pub use tiler::*;
