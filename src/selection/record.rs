use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::borrow::Borrow;
use std::fmt;

use crate::BoundingBox;

/// Formats accepted for naive (offset-less) creation timestamps, read as UTC
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Extent a catalog record claims to cover.
///
/// Values are kept as the JSON numbers the catalog sent so the dedup key
/// reproduces the source precision exactly.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordExtent {
    #[serde(default)]
    pub min_x: Option<Number>,
    #[serde(default)]
    pub min_y: Option<Number>,
    #[serde(default)]
    pub max_x: Option<Number>,
    #[serde(default)]
    pub max_y: Option<Number>,
}

impl RecordExtent {
    pub fn new(min_x: Number, min_y: Number, max_x: Number, max_y: Number) -> Self {
        Self {
            min_x: Some(min_x),
            min_y: Some(min_y),
            max_x: Some(max_x),
            max_y: Some(max_y),
        }
    }

    /// Extent of a bounding box; `None` when a coordinate is not finite
    pub fn from_bounding_box(bbox: &BoundingBox) -> Option<Self> {
        Some(Self::new(
            Number::from_f64(bbox.min_x)?,
            Number::from_f64(bbox.min_y)?,
            Number::from_f64(bbox.max_x)?,
            Number::from_f64(bbox.max_y)?,
        ))
    }

    /// Dedup key `minX,minY,maxX,maxY`, `None` if any extent is missing
    pub fn key(&self) -> Option<BoundingBoxKey> {
        match (&self.min_x, &self.min_y, &self.max_x, &self.max_y) {
            (Some(min_x), Some(min_y), Some(max_x), Some(max_y)) => Some(BoundingBoxKey(
                format!("{},{},{},{}", min_x, min_y, max_x, max_y),
            )),
            _ => None,
        }
    }

    /// Extent as a bounding box, `None` if any extent is missing
    pub fn to_bounding_box(&self) -> Option<BoundingBox> {
        Some(BoundingBox::new(
            self.min_x.as_ref()?.as_f64()?,
            self.min_y.as_ref()?.as_f64()?,
            self.max_x.as_ref()?.as_f64()?,
            self.max_y.as_ref()?.as_f64()?,
        ))
    }
}

/// Identity of a spatial cell in a catalog result set: the declared extent
/// formatted as `minX,minY,maxX,maxY`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BoundingBoxKey(String);

impl BoundingBoxKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BoundingBoxKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for BoundingBoxKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<BoundingBoxKey> for String {
    fn from(key: BoundingBoxKey) -> Self {
        key.0
    }
}

/// One product returned by the imagery catalog for a bounding box query
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    /// Human-readable product title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Extent the product claims to cover
    #[serde(default)]
    pub bounding_box: Option<RecordExtent>,
    /// How well the product matches the queried extent; non-positive is unusable
    #[serde(default)]
    pub best_fit_index: Option<f64>,
    /// Creation timestamp, ISO-8601
    #[serde(default)]
    pub date_created: Option<String>,
    /// Where the product can be downloaded from
    #[serde(default, rename = "downloadURL")]
    pub download_url: Option<String>,
}

impl CatalogRecord {
    /// Create a fully populated record
    pub fn new(
        bounding_box: RecordExtent,
        best_fit_index: f64,
        date_created: impl Into<String>,
        download_url: impl Into<String>,
    ) -> Self {
        Self {
            title: None,
            bounding_box: Some(bounding_box),
            best_fit_index: Some(best_fit_index),
            date_created: Some(date_created.into()),
            download_url: Some(download_url.into()),
        }
    }

    /// Set the product title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Dedup key of the declared extent
    pub fn key(&self) -> Option<BoundingBoxKey> {
        self.bounding_box.as_ref().and_then(RecordExtent::key)
    }

    /// Parsed creation timestamp
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.date_created.as_deref().and_then(parse_timestamp)
    }
}

/// Parse an ISO-8601 style timestamp.
///
/// Accepts RFC 3339 (with offset), naive date-times and bare dates. Values
/// without an offset are read as UTC; bare dates as midnight UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
