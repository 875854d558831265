use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{RetrievalSink, local_path};
use crate::Result;

/// A retrieval recorded by a [`MockRetriever`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalRequest {
    pub url: String,
    pub directory: PathBuf,
    pub overwrite: bool,
}

/// In-memory sink for testing
///
/// Never touches the file system: every URL resolves to its would-be local
/// path unless it was marked missing.
#[derive(Default)]
pub struct MockRetriever {
    missing: HashSet<String>,
    requests: Mutex<Vec<RetrievalRequest>>,
}

impl MockRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat `url` as not found
    pub fn with_missing(mut self, url: impl Into<String>) -> Self {
        self.missing.insert(url.into());
        self
    }

    /// Retrievals requested so far, in order
    pub fn requests(&self) -> Vec<RetrievalRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// URLs requested so far, in order
    pub fn requested_urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }
}

#[async_trait]
impl RetrievalSink for MockRetriever {
    fn sink_type(&self) -> &'static str {
        "mock"
    }

    async fn retrieve(
        &self,
        url: &str,
        directory: &Path,
        overwrite: bool,
    ) -> Result<Option<PathBuf>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RetrievalRequest {
                url: url.to_string(),
                directory: directory.to_path_buf(),
                overwrite,
            });
        }

        if self.missing.contains(url) {
            tracing::debug!("Mock retriever has no file for {}", url);
            return Ok(None);
        }

        Ok(local_path(url, directory))
    }
}
