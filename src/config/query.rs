use serde::{Deserialize, Serialize};

use super::BoundingBox;

/// Dataset name of the USDA National Agriculture Imagery Program in the TNM catalog
pub const NAIP_DATASET: &str = "USDA National Agriculture Imagery Program (NAIP)";

/// Product extent of a single NAIP quarter quad
pub const NAIP_QUARTER_QUAD_EXTENT: &str = "3.75 x 3.75 minute";

/// Product format NAIP quarter quads are published in
pub const NAIP_FORMAT: &str = "JPEG2000";

/// Product filter sent to the imagery catalog with every bounding box query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogQuery {
    /// Dataset name (TNM `datasets` parameter)
    pub dataset: String,
    /// Product extent filter (TNM `prodExtents` parameter)
    pub product_extent: Option<String>,
    /// Product format filter (TNM `prodFormats` parameter)
    pub product_format: Option<String>,
    /// Response format requested from the catalog
    pub output_format: String,
    /// API version parameter
    pub version: u32,
    /// Additional raw query parameters
    pub extra_params: Vec<(String, String)>,
}

impl CatalogQuery {
    /// Create a query for an arbitrary dataset with no extent or format filter
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            product_extent: None,
            product_format: None,
            output_format: "JSON".to_string(),
            version: 1,
            extra_params: Vec::new(),
        }
    }

    /// NAIP quarter quads in JPEG2000
    pub fn naip() -> Self {
        Self::new(NAIP_DATASET)
            .with_product_extent(NAIP_QUARTER_QUAD_EXTENT)
            .with_product_format(NAIP_FORMAT)
    }

    /// Restrict results to a product extent
    pub fn with_product_extent(mut self, extent: impl Into<String>) -> Self {
        self.product_extent = Some(extent.into());
        self
    }

    /// Restrict results to a product format
    pub fn with_product_format(mut self, format: impl Into<String>) -> Self {
        self.product_format = Some(format.into());
        self
    }

    /// Add a raw query parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_params.push((key.into(), value.into()));
        self
    }

    /// Build the query parameters for one page of a bounding box query
    pub fn to_query_params(&self, bbox: &BoundingBox, offset: usize) -> Vec<(String, String)> {
        let mut params = vec![
            ("datasets".to_string(), self.dataset.clone()),
            ("bbox".to_string(), bbox.to_query_string()),
            ("outputFormat".to_string(), self.output_format.clone()),
            ("version".to_string(), self.version.to_string()),
        ];

        if let Some(extent) = &self.product_extent {
            params.push(("prodExtents".to_string(), extent.clone()));
        }
        if let Some(format) = &self.product_format {
            params.push(("prodFormats".to_string(), format.clone()));
        }

        params.extend(self.extra_params.iter().cloned());

        // The first page is requested without an offset
        if offset > 0 {
            params.push(("offset".to_string(), offset.to_string()));
        }

        params
    }

    /// Build the full request URL for one page of a bounding box query
    pub fn to_url(&self, base_url: &str, bbox: &BoundingBox, offset: usize) -> String {
        let query = self
            .to_query_params(bbox, offset)
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(key),
                    urlencoding::encode(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{}", base_url, query)
    }
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self::naip()
    }
}
