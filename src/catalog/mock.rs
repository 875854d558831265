use async_trait::async_trait;
use std::sync::Mutex;

use super::{CatalogCapabilities, CatalogClient, CatalogPage};
use crate::{BoundingBox, CatalogRecord, NaipTilesError, NetworkError, Result};

const DEFAULT_PAGE_SIZE: usize = 50;

/// A page request received by a [`MockCatalog`]
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub bbox: BoundingBox,
    pub offset: usize,
}

/// In-memory catalog for testing and development
///
/// Holds a fixed list of records and answers bounding box queries with the
/// records whose declared extent overlaps the query. Records without a usable
/// extent match every query.
pub struct MockCatalog {
    records: Vec<CatalogRecord>,
    page_size: usize,
    /// Total to report instead of the real match count
    reported_total: Option<usize>,
    /// Whether every request fails
    simulate_failure: bool,
    /// Queries overlapping any of these boxes fail
    failing_areas: Vec<BoundingBox>,
    requests: Mutex<Vec<PageRequest>>,
}

impl MockCatalog {
    /// Create an empty mock catalog
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    /// Create a mock catalog holding `records`
    pub fn with_records(records: Vec<CatalogRecord>) -> Self {
        Self {
            records,
            page_size: DEFAULT_PAGE_SIZE,
            reported_total: None,
            simulate_failure: false,
            failing_areas: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Add a record to the catalog
    pub fn with_record(mut self, record: CatalogRecord) -> Self {
        self.records.push(record);
        self
    }

    /// Set how many records are returned per page (at least one)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Report `total` matches regardless of how many records exist
    pub fn with_reported_total(mut self, total: usize) -> Self {
        self.reported_total = Some(total);
        self
    }

    /// Configure the catalog to fail every request
    pub fn with_failure(mut self) -> Self {
        self.simulate_failure = true;
        self
    }

    /// Fail requests whose bounding box overlaps `area`
    pub fn with_failing_area(mut self, area: BoundingBox) -> Self {
        self.failing_areas.push(area);
        self
    }

    /// Page requests received so far, in order
    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn record_request(&self, bbox: &BoundingBox, offset: usize) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(PageRequest {
                bbox: *bbox,
                offset,
            });
        }
    }

    fn matches(record: &CatalogRecord, bbox: &BoundingBox) -> bool {
        record
            .bounding_box
            .as_ref()
            .and_then(|extent| extent.to_bounding_box())
            .is_none_or(|extent| extent.overlaps_area(bbox))
    }
}

#[async_trait]
impl CatalogClient for MockCatalog {
    fn provider_type(&self) -> &'static str {
        "mock"
    }

    async fn query_page(&self, bbox: &BoundingBox, offset: usize) -> Result<CatalogPage> {
        self.record_request(bbox, offset);

        if self.simulate_failure || self.failing_areas.iter().any(|a| a.overlaps_area(bbox)) {
            return Err(NaipTilesError::Network(NetworkError::Connection {
                message: "Simulated network failure".to_string(),
            }));
        }

        let matching: Vec<&CatalogRecord> = self
            .records
            .iter()
            .filter(|record| Self::matches(record, bbox))
            .collect();

        let items: Vec<CatalogRecord> = matching
            .iter()
            .skip(offset)
            .take(self.page_size)
            .map(|record| (*record).clone())
            .collect();

        tracing::debug!(
            "Mock catalog returning {} of {} records at offset {}",
            items.len(),
            matching.len(),
            offset
        );

        Ok(CatalogPage {
            items,
            total: self.reported_total.unwrap_or(matching.len()),
        })
    }

    async fn test_availability(&self) -> Result<()> {
        if self.simulate_failure {
            Err(NaipTilesError::Network(NetworkError::Connection {
                message: "Mock failure enabled".to_string(),
            }))
        } else {
            tracing::debug!("Mock catalog is always available");
            Ok(())
        }
    }

    fn capabilities(&self) -> CatalogCapabilities {
        CatalogCapabilities {
            requires_network: false,
            page_size: Some(self.page_size),
            rate_limit_rpm: None,
            notes: Some("In-memory catalog for testing.".to_string()),
        }
    }
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}
