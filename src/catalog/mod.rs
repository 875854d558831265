mod mock;
#[cfg(feature = "reqwest-client")]
mod tnm;

pub use mock::*;
#[cfg(feature = "reqwest-client")]
pub use tnm::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{BoundingBox, CatalogRecord, NaipTilesError, NetworkError, Result};

/// One page of catalog results for a bounding box query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogPage {
    /// Records on this page
    #[serde(default)]
    pub items: Vec<CatalogRecord>,
    /// Total number of records matching the query across all pages
    #[serde(default)]
    pub total: usize,
}

impl CatalogPage {
    pub fn new(items: Vec<CatalogRecord>, total: usize) -> Self {
        Self { items, total }
    }
}

/// Trait for querying an imagery product catalog
///
/// Implementations return one page of records per call; [`fetch_all_records`]
/// drives the paging.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Get the client type identifier (e.g., "tnm", "mock")
    fn provider_type(&self) -> &'static str;

    /// Fetch the page of records starting at `offset` for `bbox`
    async fn query_page(&self, bbox: &BoundingBox, offset: usize) -> Result<CatalogPage>;

    /// Test connectivity/availability of the catalog
    async fn test_availability(&self) -> Result<()>;

    /// Get client-specific capabilities and limitations
    fn capabilities(&self) -> CatalogCapabilities;
}

/// Describes the capabilities and limitations of a catalog client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogCapabilities {
    /// Whether this client requires internet connectivity
    pub requires_network: bool,
    /// Records returned per page, when fixed
    pub page_size: Option<usize>,
    /// Rate limiting information (requests per minute)
    pub rate_limit_rpm: Option<u32>,
    /// Additional notes about the client
    pub notes: Option<String>,
}

impl Default for CatalogCapabilities {
    fn default() -> Self {
        Self {
            requires_network: false,
            page_size: None,
            rate_limit_rpm: None,
            notes: None,
        }
    }
}

/// Fetch every record the catalog holds for `bbox`.
///
/// Pages are requested until the number of records received reaches the
/// total the catalog reports. A page that comes back empty before then is
/// reported as [`NetworkError::IncompletePaging`] rather than retried.
pub async fn fetch_all_records<C>(client: &C, bbox: &BoundingBox) -> Result<Vec<CatalogRecord>>
where
    C: CatalogClient + ?Sized,
{
    let first = client.query_page(bbox, 0).await?;
    let total = first.total;
    let mut records = first.items;

    tracing::debug!(
        "Catalog '{}' reports {} records for {}",
        client.provider_type(),
        total,
        bbox
    );

    while records.len() < total {
        let offset = records.len();
        let page = client.query_page(bbox, offset).await?;

        if page.items.is_empty() {
            return Err(NaipTilesError::Network(NetworkError::IncompletePaging {
                offset,
                total,
            }));
        }

        tracing::debug!("Fetched {} records at offset {}", page.items.len(), offset);
        records.extend(page.items);
    }

    Ok(records)
}

/// Factory for creating catalog clients
pub struct CatalogFactory;

impl CatalogFactory {
    /// Create a client for The National Map products API with default settings
    #[cfg(feature = "reqwest-client")]
    pub fn tnm() -> TnmCatalog {
        TnmCatalog::new()
    }

    /// Create a TNM client with a custom endpoint
    #[cfg(feature = "reqwest-client")]
    pub fn tnm_with_url(url: impl Into<String>) -> TnmCatalog {
        TnmCatalog::with_base_url(url)
    }

    /// Create an empty mock catalog for testing
    pub fn mock() -> MockCatalog {
        MockCatalog::new()
    }

    /// Create a mock catalog holding `records`
    pub fn mock_with_records(records: Vec<CatalogRecord>) -> MockCatalog {
        MockCatalog::with_records(records)
    }

    /// Get a list of all available client types
    pub fn available_providers() -> Vec<&'static str> {
        let mut providers = Vec::new();
        if cfg!(feature = "reqwest-client") {
            providers.push("tnm");
        }
        providers.push("mock");
        providers
    }

    /// Create a client by name with default settings
    pub fn create_client(name: &str) -> Result<Box<dyn CatalogClient>> {
        match name {
            #[cfg(feature = "reqwest-client")]
            "tnm" => Ok(Box::new(Self::tnm())),
            "mock" => Ok(Box::new(Self::mock())),
            _ => Err(NaipTilesError::Config(format!(
                "Unknown catalog: '{}'. Available catalogs: {:?}",
                name,
                Self::available_providers()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordExtent;

    fn record(bbox: BoundingBox, url: &str) -> CatalogRecord {
        CatalogRecord::new(
            RecordExtent::from_bounding_box(&bbox).unwrap(),
            1.0,
            "2020-01-01",
            url,
        )
    }

    #[test]
    fn test_capabilities_default() {
        let capabilities = CatalogCapabilities::default();

        assert!(!capabilities.requires_network);
        assert!(capabilities.page_size.is_none());
        assert!(capabilities.rate_limit_rpm.is_none());
        assert!(capabilities.notes.is_none());
    }

    #[test]
    fn test_page_deserialization() {
        let json = r#"{
            "total": 2,
            "items": [
                {"title": "a", "downloadURL": "https://example.com/a.jp2"},
                {"title": "b", "downloadURL": "https://example.com/b.jp2"}
            ],
            "errors": [],
            "messages": ["ok"]
        }"#;

        let page: CatalogPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[1].download_url.as_deref(), Some("https://example.com/b.jp2"));
    }

    #[test]
    fn test_page_deserialization_without_items() {
        let page: CatalogPage = serde_json::from_str(r#"{"total": 0}"#).unwrap();
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_factory_available_providers() {
        let providers = CatalogFactory::available_providers();
        assert!(providers.contains(&"mock"));
        assert_eq!(providers.contains(&"tnm"), cfg!(feature = "reqwest-client"));
    }

    #[test]
    fn test_factory_create_client_by_name() {
        let mock = CatalogFactory::create_client("mock").unwrap();
        assert_eq!(mock.provider_type(), "mock");

        let result = CatalogFactory::create_client("invalid");
        if let Err(NaipTilesError::Config(msg)) = result {
            assert!(msg.contains("Unknown catalog: 'invalid'"));
            assert!(msg.contains("Available catalogs:"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[tokio::test]
    async fn test_fetch_all_records_follows_pages() {
        let bbox = BoundingBox::new(-105.1, 39.9, -104.9, 40.1);
        let records: Vec<_> = (0..7)
            .map(|i| record(bbox, &format!("https://example.com/{}.jp2", i)))
            .collect();
        let catalog = CatalogFactory::mock_with_records(records).with_page_size(3);

        let fetched = fetch_all_records(&catalog, &bbox).await.unwrap();

        assert_eq!(fetched.len(), 7);
        assert_eq!(
            fetched[6].download_url.as_deref(),
            Some("https://example.com/6.jp2")
        );
        let offsets: Vec<_> = catalog.requests().iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![0, 3, 6]);
    }

    #[tokio::test]
    async fn test_fetch_all_records_empty_result() {
        let catalog = CatalogFactory::mock();
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);

        let fetched = fetch_all_records(&catalog, &bbox).await.unwrap();
        assert!(fetched.is_empty());
        assert_eq!(catalog.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_all_records_stops_on_empty_page() {
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let catalog = CatalogFactory::mock_with_records(vec![record(bbox, "a"), record(bbox, "b")])
            .with_page_size(2)
            .with_reported_total(5);

        let result = fetch_all_records(&catalog, &bbox).await;
        assert!(matches!(
            result,
            Err(NaipTilesError::Network(NetworkError::IncompletePaging {
                offset: 2,
                total: 5
            }))
        ));
    }

    #[tokio::test]
    async fn test_fetch_all_records_through_trait_object() {
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let client: Box<dyn CatalogClient> =
            Box::new(CatalogFactory::mock_with_records(vec![record(bbox, "a")]));

        let fetched = fetch_all_records(client.as_ref(), &bbox).await.unwrap();
        assert_eq!(fetched.len(), 1);
    }
}
