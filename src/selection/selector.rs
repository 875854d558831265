use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use super::record::{BoundingBoxKey, CatalogRecord};
use crate::{NaipTilesError, Result};

/// The record chosen for one bounding box key
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedCandidate {
    pub key: BoundingBoxKey,
    pub download_url: String,
    pub date_created: DateTime<Utc>,
    /// Position of the winning record in the input list
    pub index: usize,
    pub record: CatalogRecord,
}

/// Counters describing how a selection was reached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionStats {
    /// Records seen
    pub considered: usize,
    /// Records dropped for a non-positive fit index
    pub filtered: usize,
    /// Times a later record displaced the current holder of a key
    pub replaced: usize,
    /// Eligible records that lost to an existing holder
    pub superseded: usize,
}

/// One winning candidate per bounding box key, ordered by key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    winners: BTreeMap<BoundingBoxKey, SelectedCandidate>,
    stats: SelectionStats,
}

impl Selection {
    pub fn len(&self) -> usize {
        self.winners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.winners.is_empty()
    }

    /// Download URL selected for `key` (`minX,minY,maxX,maxY`)
    pub fn get(&self, key: &str) -> Option<&str> {
        self.winners.get(key).map(|c| c.download_url.as_str())
    }

    /// Full candidate selected for `key`
    pub fn candidate(&self, key: &str) -> Option<&SelectedCandidate> {
        self.winners.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectedCandidate> {
        self.winners.values()
    }

    /// Selected download URLs, in key order
    pub fn download_urls(&self) -> Vec<String> {
        self.winners
            .values()
            .map(|c| c.download_url.clone())
            .collect()
    }

    /// Key to download URL mapping
    pub fn to_url_map(&self) -> BTreeMap<String, String> {
        self.winners
            .iter()
            .map(|(key, c)| (key.to_string(), c.download_url.clone()))
            .collect()
    }

    /// Winning records, in key order
    pub fn into_records(self) -> Vec<CatalogRecord> {
        self.winners.into_values().map(|c| c.record).collect()
    }

    pub fn stats(&self) -> SelectionStats {
        self.stats
    }
}

impl<'a> IntoIterator for &'a Selection {
    type Item = &'a SelectedCandidate;
    type IntoIter = std::collections::btree_map::Values<'a, BoundingBoxKey, SelectedCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.winners.values()
    }
}

/// Reduces a catalog result set to one candidate per declared extent.
///
/// Records with a fit index at or below `min_fit_index` are dropped. Among the
/// rest, the most recently created record wins each key; on equal timestamps
/// the record seen first is kept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateSelector {
    min_fit_index: f64,
}

impl Default for CandidateSelector {
    fn default() -> Self {
        Self { min_fit_index: 0.0 }
    }
}

impl CandidateSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only records whose fit index is strictly greater than `threshold`
    pub fn with_min_fit_index(mut self, threshold: f64) -> Self {
        self.min_fit_index = threshold;
        self
    }

    pub fn min_fit_index(&self) -> f64 {
        self.min_fit_index
    }

    /// Select one candidate per bounding box key.
    ///
    /// `records` must be the complete, concatenated result set of one query.
    /// Any eligible record without a bounding box, creation date or download
    /// URL aborts the whole selection with [`NaipTilesError::MalformedRecord`].
    pub fn select(&self, records: &[CatalogRecord]) -> Result<Selection> {
        let mut winners: BTreeMap<BoundingBoxKey, SelectedCandidate> = BTreeMap::new();
        let mut stats = SelectionStats {
            considered: records.len(),
            ..SelectionStats::default()
        };

        for (index, record) in records.iter().enumerate() {
            let score = record
                .best_fit_index
                .ok_or_else(|| malformed(index, "missing bestFitIndex"))?;

            // NaN compares false and is dropped along with non-positive scores
            if !(score > self.min_fit_index) {
                stats.filtered += 1;
                continue;
            }

            let candidate = eligible_candidate(index, record)?;

            match winners.entry(candidate.key.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(candidate);
                }
                Entry::Occupied(mut slot) => {
                    if candidate.date_created > slot.get().date_created {
                        tracing::trace!(
                            "Record {} replaces record {} for {}",
                            index,
                            slot.get().index,
                            candidate.key
                        );
                        slot.insert(candidate);
                        stats.replaced += 1;
                    } else {
                        stats.superseded += 1;
                    }
                }
            }
        }

        tracing::debug!(
            "Selected {} of {} records ({} filtered, {} replaced, {} superseded)",
            winners.len(),
            stats.considered,
            stats.filtered,
            stats.replaced,
            stats.superseded
        );

        Ok(Selection { winners, stats })
    }
}

/// Select one candidate per bounding box key with the default fit threshold
pub fn select(records: &[CatalogRecord]) -> Result<Selection> {
    CandidateSelector::default().select(records)
}

fn eligible_candidate(index: usize, record: &CatalogRecord) -> Result<SelectedCandidate> {
    let key = record
        .key()
        .ok_or_else(|| malformed(index, "missing or incomplete boundingBox"))?;

    let raw_date = record
        .date_created
        .as_deref()
        .ok_or_else(|| malformed(index, "missing dateCreated"))?;
    let date_created = record
        .created_at()
        .ok_or_else(|| malformed(index, format!("unparseable dateCreated '{}'", raw_date)))?;

    let download_url = record
        .download_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| malformed(index, "missing downloadURL"))?;

    Ok(SelectedCandidate {
        key,
        download_url: download_url.to_string(),
        date_created,
        index,
        record: record.clone(),
    })
}

fn malformed(index: usize, reason: impl Into<String>) -> NaipTilesError {
    NaipTilesError::MalformedRecord {
        index,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn records(value: Value) -> Vec<CatalogRecord> {
        serde_json::from_value(value).unwrap()
    }

    fn unit_box(x: i64, y: i64) -> Value {
        json!({"minX": x, "minY": y, "maxX": x + 1, "maxY": y + 1})
    }

    #[test]
    fn test_most_recent_positive_candidate_wins() {
        let input = records(json!([
            {"boundingBox": unit_box(0, 0), "bestFitIndex": 5, "dateCreated": "2020-01-01", "downloadURL": "A"},
            {"boundingBox": unit_box(0, 0), "bestFitIndex": 3, "dateCreated": "2021-01-01", "downloadURL": "B"},
            {"boundingBox": unit_box(2, 2), "bestFitIndex": 0, "dateCreated": "2022-01-01", "downloadURL": "C"},
        ]));

        let selection = select(&input).unwrap();
        let expected: BTreeMap<String, String> =
            [("0,0,1,1".to_string(), "B".to_string())].into_iter().collect();

        assert_eq!(selection.to_url_map(), expected);
        assert_eq!(selection.get("0,0,1,1"), Some("B"));
        assert_eq!(selection.get("2,2,3,3"), None);
        assert_eq!(
            selection.stats(),
            SelectionStats {
                considered: 3,
                filtered: 1,
                replaced: 1,
                superseded: 0,
            }
        );
    }

    #[test]
    fn test_recency_beats_score() {
        let input = records(json!([
            {"boundingBox": unit_box(0, 0), "bestFitIndex": 0.1, "dateCreated": "2023-06-01T00:00:00Z", "downloadURL": "new"},
            {"boundingBox": unit_box(0, 0), "bestFitIndex": 9.0, "dateCreated": "2019-06-01T00:00:00Z", "downloadURL": "old"},
        ]));

        let selection = select(&input).unwrap();
        assert_eq!(selection.get("0,0,1,1"), Some("new"));
        assert_eq!(selection.stats().superseded, 1);
    }

    #[test]
    fn test_equal_timestamps_keep_first() {
        let input = records(json!([
            {"boundingBox": unit_box(0, 0), "bestFitIndex": 1, "dateCreated": "2020-01-01", "downloadURL": "first"},
            {"boundingBox": unit_box(0, 0), "bestFitIndex": 2, "dateCreated": "2020-01-01T00:00:00Z", "downloadURL": "second"},
        ]));

        let selection = select(&input).unwrap();
        assert_eq!(selection.get("0,0,1,1"), Some("first"));
        assert_eq!(selection.candidate("0,0,1,1").unwrap().index, 0);
    }

    #[test]
    fn test_non_positive_scores_dropped() {
        let input = records(json!([
            {"boundingBox": unit_box(0, 0), "bestFitIndex": -1.5, "dateCreated": "2020-01-01", "downloadURL": "neg"},
            {"boundingBox": unit_box(1, 1), "bestFitIndex": 0.0, "dateCreated": "2020-01-01", "downloadURL": "zero"},
            {"boundingBox": unit_box(2, 2), "bestFitIndex": 0.001, "dateCreated": "2020-01-01", "downloadURL": "tiny"},
        ]));

        let selection = select(&input).unwrap();
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.download_urls(), vec!["tiny".to_string()]);
    }

    #[test]
    fn test_empty_input() {
        let selection = select(&[]).unwrap();
        assert!(selection.is_empty());
        assert!(selection.download_urls().is_empty());
    }

    #[test]
    fn test_one_winner_per_key_in_key_order() {
        let input = records(json!([
            {"boundingBox": unit_box(5, 5), "bestFitIndex": 1, "dateCreated": "2020-01-01", "downloadURL": "e"},
            {"boundingBox": unit_box(1, 1), "bestFitIndex": 1, "dateCreated": "2020-01-01", "downloadURL": "b"},
            {"boundingBox": unit_box(5, 5), "bestFitIndex": 1, "dateCreated": "2018-01-01", "downloadURL": "e-old"},
            {"boundingBox": unit_box(3, 3), "bestFitIndex": 1, "dateCreated": "2020-01-01", "downloadURL": "c"},
        ]));

        let selection = select(&input).unwrap();
        let keys: Vec<_> = selection.iter().map(|c| c.key.to_string()).collect();
        assert_eq!(keys, vec!["1,1,2,2", "3,3,4,4", "5,5,6,6"]);
        assert_eq!(selection.download_urls(), vec!["b", "c", "e"]);
    }

    #[test]
    fn test_idempotent_over_own_output() {
        let input = records(json!([
            {"boundingBox": unit_box(0, 0), "bestFitIndex": 5, "dateCreated": "2020-01-01", "downloadURL": "A"},
            {"boundingBox": unit_box(0, 0), "bestFitIndex": 3, "dateCreated": "2021-01-01", "downloadURL": "B"},
            {"boundingBox": unit_box(4, 0), "bestFitIndex": 2, "dateCreated": "2017-05-01", "downloadURL": "D"},
        ]));

        let first = select(&input).unwrap();
        let second = select(&first.clone().into_records()).unwrap();
        assert_eq!(first.to_url_map(), second.to_url_map());
    }

    #[test]
    fn test_duplicate_pages_do_not_change_result() {
        let page = json!([
            {"boundingBox": unit_box(0, 0), "bestFitIndex": 5, "dateCreated": "2020-01-01", "downloadURL": "A"},
            {"boundingBox": unit_box(0, 0), "bestFitIndex": 3, "dateCreated": "2021-01-01", "downloadURL": "B"},
        ]);
        let once = records(page.clone());
        let mut twice = records(page.clone());
        twice.extend(records(page));

        assert_eq!(
            select(&once).unwrap().to_url_map(),
            select(&twice).unwrap().to_url_map()
        );
    }

    #[test]
    fn test_missing_date_is_malformed() {
        let input = records(json!([
            {"boundingBox": unit_box(0, 0), "bestFitIndex": 1, "dateCreated": "2020-01-01", "downloadURL": "A"},
            {"boundingBox": unit_box(1, 1), "bestFitIndex": 1, "downloadURL": "B"},
        ]));

        match select(&input) {
            Err(NaipTilesError::MalformedRecord { index, reason }) => {
                assert_eq!(index, 1);
                assert!(reason.contains("dateCreated"));
            }
            other => panic!("expected MalformedRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_date_is_malformed() {
        let input = records(json!([
            {"boundingBox": unit_box(0, 0), "bestFitIndex": 1, "dateCreated": "last spring", "downloadURL": "A"},
        ]));
        assert!(matches!(
            select(&input),
            Err(NaipTilesError::MalformedRecord { index: 0, .. })
        ));
    }

    #[test]
    fn test_missing_bbox_or_url_is_malformed() {
        let no_bbox = records(json!([
            {"bestFitIndex": 1, "dateCreated": "2020-01-01", "downloadURL": "A"},
        ]));
        assert!(matches!(
            select(&no_bbox),
            Err(NaipTilesError::MalformedRecord { index: 0, .. })
        ));

        let partial_bbox = records(json!([
            {"boundingBox": {"minX": 0, "minY": 0}, "bestFitIndex": 1, "dateCreated": "2020-01-01", "downloadURL": "A"},
        ]));
        assert!(select(&partial_bbox).is_err());

        let no_url = records(json!([
            {"boundingBox": unit_box(0, 0), "bestFitIndex": 1, "dateCreated": "2020-01-01"},
        ]));
        assert!(matches!(
            select(&no_url),
            Err(NaipTilesError::MalformedRecord { index: 0, .. })
        ));

        let empty_url = records(json!([
            {"boundingBox": unit_box(0, 0), "bestFitIndex": 1, "dateCreated": "2020-01-01", "downloadURL": ""},
        ]));
        assert!(select(&empty_url).is_err());
    }

    #[test]
    fn test_missing_score_is_malformed() {
        let input = records(json!([
            {"boundingBox": unit_box(0, 0), "dateCreated": "2020-01-01", "downloadURL": "A"},
        ]));
        assert!(matches!(
            select(&input),
            Err(NaipTilesError::MalformedRecord { index: 0, .. })
        ));
    }

    #[test]
    fn test_filtered_records_are_not_validated() {
        let input = records(json!([
            {"bestFitIndex": 0},
            {"boundingBox": unit_box(0, 0), "bestFitIndex": 1, "dateCreated": "2020-01-01", "downloadURL": "A"},
        ]));

        let selection = select(&input).unwrap();
        assert_eq!(selection.get("0,0,1,1"), Some("A"));
    }

    #[test]
    fn test_custom_threshold() {
        let input = records(json!([
            {"boundingBox": unit_box(0, 0), "bestFitIndex": 0.4, "dateCreated": "2021-01-01", "downloadURL": "low"},
            {"boundingBox": unit_box(0, 0), "bestFitIndex": 0.6, "dateCreated": "2020-01-01", "downloadURL": "high"},
        ]));

        let selector = CandidateSelector::new().with_min_fit_index(0.5);
        assert_eq!(selector.min_fit_index(), 0.5);
        assert_eq!(selector.select(&input).unwrap().get("0,0,1,1"), Some("high"));
    }
}
