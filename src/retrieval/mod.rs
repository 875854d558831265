#[cfg(feature = "reqwest-client")]
mod http;
mod mock;

#[cfg(feature = "reqwest-client")]
pub use http::*;
pub use mock::*;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use url::Url;

use crate::Result;

/// Destination for selected imagery files
///
/// `retrieve` returns the local path of the file, or `None` when the file
/// could not be found or downloaded. Errors are reserved for local failures
/// such as an unwritable directory.
#[async_trait]
pub trait RetrievalSink: Send + Sync {
    /// Get the sink type identifier (e.g., "http", "mock")
    fn sink_type(&self) -> &'static str;

    /// Make the file at `url` available under `directory`.
    ///
    /// An existing local file is reused unless `overwrite` is set.
    async fn retrieve(&self, url: &str, directory: &Path, overwrite: bool)
    -> Result<Option<PathBuf>>;
}

/// Last path segment of an absolute `url`, ignoring any query string or fragment
pub fn filename_from_url(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let name = url.path_segments()?.next_back()?;
    let name = urlencoding::decode(name).ok()?;

    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return None;
    }
    Some(name.into_owned())
}

/// Where the file at `url` is stored under `directory`
pub fn local_path(url: &str, directory: &Path) -> Option<PathBuf> {
    filename_from_url(url).map(|name| directory.join(name))
}
