use async_trait::async_trait;
use std::time::{Duration, Instant};

use super::{CatalogCapabilities, CatalogClient, CatalogPage};
use crate::{BoundingBox, CatalogQuery, FetchConfig, NaipTilesError, NetworkError, Result};

/// Products endpoint of The National Map access API
pub const TNM_PRODUCTS_URL: &str = "https://tnmaccess.nationalmap.gov/api/v1/products";

/// Catalog client for The National Map (USGS) products API
///
/// Queries are sent as GET requests with the dataset and product filters of
/// a [`CatalogQuery`]; NAIP quarter quads in JPEG2000 by default.
pub struct TnmCatalog {
    /// Base URL for the products endpoint
    pub base_url: String,
    client: reqwest::Client,
    query: CatalogQuery,
    user_agent: String,
    timeout: Duration,
}

impl TnmCatalog {
    /// Create a client for the public TNM endpoint querying NAIP imagery
    pub fn new() -> Self {
        Self::with_base_url(TNM_PRODUCTS_URL)
    }

    /// Create a client for a custom products endpoint
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
            query: CatalogQuery::naip(),
            user_agent: format!("naip-tiles/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(60),
        }
    }

    /// Create a client using the query and timeout of `config`
    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new()
            .with_query(config.query.clone())
            .with_timeout(Duration::from_secs(config.timeout_seconds))
    }

    /// Set the product filter
    pub fn with_query(mut self, query: CatalogQuery) -> Self {
        self.query = query;
        self
    }

    /// Set a custom timeout for requests
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn query(&self) -> &CatalogQuery {
        &self.query
    }

    /// Request URL for one page of a bounding box query
    pub fn page_url(&self, bbox: &BoundingBox, offset: usize) -> String {
        self.query.to_url(&self.base_url, bbox, offset)
    }

    fn map_request_error(&self, e: reqwest::Error) -> NetworkError {
        if e.is_timeout() {
            NetworkError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else if e.is_connect() {
            NetworkError::Connection {
                message: format!("Failed to connect to TNM API: {}", e),
            }
        } else if e.is_builder() {
            NetworkError::InvalidUrl {
                url: self.base_url.clone(),
            }
        } else {
            NetworkError::Connection {
                message: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl CatalogClient for TnmCatalog {
    fn provider_type(&self) -> &'static str {
        "tnm"
    }

    async fn query_page(&self, bbox: &BoundingBox, offset: usize) -> Result<CatalogPage> {
        let start_time = Instant::now();
        let url = self.page_url(bbox, offset);
        tracing::debug!("TNM query: {}", url);

        let response = self
            .client
            .get(&url)
            .header("User-Agent", &self.user_agent)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NaipTilesError::Network(NetworkError::HttpError {
                status: status.as_u16(),
            }));
        }

        let body = response
            .text()
            .await
            .map_err(|e| NetworkError::Connection {
                message: format!("Failed to read response: {}", e),
            })?;

        let page: CatalogPage = serde_json::from_str(&body).map_err(|e| {
            NaipTilesError::Parse(format!("Failed to parse TNM response: {}", e))
        })?;

        tracing::info!(
            "Fetched {} of {} products at offset {} in {:.1}s",
            page.items.len(),
            page.total,
            offset,
            start_time.elapsed().as_secs_f64()
        );

        Ok(page)
    }

    async fn test_availability(&self) -> Result<()> {
        tracing::debug!("Testing TNM API availability");

        // A tiny box keeps the probe cheap
        let probe = BoundingBox::new(-105.0, 40.0, -104.999, 40.001);
        let response = self
            .client
            .get(self.page_url(&probe, 0))
            .header("User-Agent", &self.user_agent)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| NetworkError::Connection {
                message: format!("TNM API test failed: {}", e),
            })?;

        if response.status().is_success() {
            tracing::debug!("TNM API is available");
            Ok(())
        } else {
            Err(NaipTilesError::Network(NetworkError::HttpError {
                status: response.status().as_u16(),
            }))
        }
    }

    fn capabilities(&self) -> CatalogCapabilities {
        CatalogCapabilities {
            requires_network: true,
            page_size: None,
            rate_limit_rpm: None,
            notes: Some("USGS The National Map products API.".to_string()),
        }
    }
}

impl Default for TnmCatalog {
    fn default() -> Self {
        Self::new()
    }
}
