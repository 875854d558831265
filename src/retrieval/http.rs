use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use super::{RetrievalSink, local_path};
use crate::{FetchConfig, NetworkError, Result};

/// Downloads files over HTTP into the target directory
///
/// Bodies are streamed to a `.part` file that is renamed once complete, so
/// an interrupted download never leaves a file that looks finished.
pub struct HttpRetriever {
    client: reqwest::Client,
    user_agent: String,
    timeout: Duration,
}

impl HttpRetriever {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            user_agent: format!("naip-tiles/{}", env!("CARGO_PKG_VERSION")),
            // NAIP quarter quads run to a few hundred megabytes
            timeout: Duration::from_secs(600),
        }
    }

    /// Create a retriever using the timeout of `config`
    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new().with_timeout(Duration::from_secs(config.timeout_seconds))
    }

    /// Set a custom timeout for each download
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    fn convert_error(&self, err: reqwest::Error) -> NetworkError {
        if err.is_timeout() {
            NetworkError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else if let Some(status) = err.status() {
            NetworkError::HttpError {
                status: status.as_u16(),
            }
        } else {
            NetworkError::Connection {
                message: err.to_string(),
            }
        }
    }

    /// Stream `url` into `partial`, returning the number of bytes written
    async fn download_to(
        &self,
        url: &str,
        partial: &Path,
    ) -> std::result::Result<u64, DownloadFailure> {
        let mut response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| DownloadFailure::Network(self.convert_error(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadFailure::Network(NetworkError::HttpError {
                status: status.as_u16(),
            }));
        }

        let mut file = tokio::fs::File::create(partial)
            .await
            .map_err(DownloadFailure::Io)?;
        let mut written = 0u64;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| DownloadFailure::Network(self.convert_error(e)))?
        {
            file.write_all(&chunk).await.map_err(DownloadFailure::Io)?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(DownloadFailure::Io)?;
        Ok(written)
    }
}

enum DownloadFailure {
    Network(NetworkError),
    Io(std::io::Error),
}

#[async_trait]
impl RetrievalSink for HttpRetriever {
    fn sink_type(&self) -> &'static str {
        "http"
    }

    async fn retrieve(
        &self,
        url: &str,
        directory: &Path,
        overwrite: bool,
    ) -> Result<Option<PathBuf>> {
        let Some(path) = local_path(url, directory) else {
            tracing::warn!("No file name in URL, skipping: {}", url);
            return Ok(None);
        };

        if !overwrite && tokio::fs::try_exists(&path).await? {
            tracing::debug!("Using existing file {}", path.display());
            return Ok(Some(path));
        }

        tokio::fs::create_dir_all(directory).await?;

        let mut partial = path.clone().into_os_string();
        partial.push(".part");
        let partial = PathBuf::from(partial);

        match self.download_to(url, &partial).await {
            Ok(bytes) => {
                tokio::fs::rename(&partial, &path).await?;
                tracing::debug!(
                    "Saved {:.2} MB to {}",
                    bytes as f64 / (1024.0 * 1024.0),
                    path.display()
                );
                Ok(Some(path))
            }
            Err(failure) => {
                let _ = tokio::fs::remove_file(&partial).await;
                match failure {
                    DownloadFailure::Network(e) => {
                        tracing::warn!("File could not be downloaded: {} ({})", url, e);
                        Ok(None)
                    }
                    DownloadFailure::Io(e) => Err(e.into()),
                }
            }
        }
    }
}

impl Default for HttpRetriever {
    fn default() -> Self {
        Self::new()
    }
}
