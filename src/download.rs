use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{
    AreaOfInterest, BoundingBox, CandidateSelector, CatalogClient, FetchConfig, GridSpec,
    GridTiler, Result, RetrievalSink, Selection, buffer_geometry, fetch_all_records,
    load_geometry_file,
};

/// A query geometry that produced no candidates because its catalog query or
/// selection failed
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedGeometry {
    pub bbox: BoundingBox,
    pub reason: String,
}

/// Outcome of a download run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadReport {
    /// Number of query geometries the area resolved to
    pub geometries: usize,
    /// Selected download URLs, without duplicates, in retrieval order
    pub urls: Vec<String>,
    /// Local paths of retrieved files
    pub paths: Vec<PathBuf>,
    /// URLs the sink could not retrieve
    pub missing: Vec<String>,
    /// Geometries skipped after a catalog or selection error
    pub skipped: Vec<SkippedGeometry>,
}

impl DownloadReport {
    /// Whether every geometry was queried and every file retrieved
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.skipped.is_empty()
    }
}

/// Turns an area of interest into the bounding boxes the catalog is queried
/// with.
///
/// A bounding box is used as-is. A geometry file is loaded, buffered when
/// requested and tiled with `grid`; every intersecting cell becomes one query.
pub fn resolve_geometries(area: &AreaOfInterest, grid: &GridSpec) -> Result<Vec<BoundingBox>> {
    match area {
        AreaOfInterest::BoundingBox(bbox) => {
            tracing::debug!("Bounding box {} covers {:.1} km²", bbox, bbox.area_km2());
            Ok(vec![*bbox])
        }
        AreaOfInterest::GeometryFile { path, buffer } => {
            let mut geometry = load_geometry_file(path)?;
            if let Some(buffer) = buffer {
                tracing::info!("Buffering geometry by {} {}", buffer.distance, buffer.unit);
                geometry = buffer_geometry(&geometry, buffer)?;
            }

            let cells: Vec<BoundingBox> = GridTiler::from_spec(grid)?.tile(&geometry)?.collect();
            tracing::info!(
                "Geometry from {} covers {} grid cells",
                path.display(),
                cells.len()
            );
            Ok(cells)
        }
    }
}

/// Write one absolute path per line to `file`
pub fn write_paths_file(paths: &[PathBuf], file: &Path) -> Result<()> {
    if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut out = std::io::BufWriter::new(std::fs::File::create(file)?);
    for path in paths {
        writeln!(out, "{}", std::path::absolute(path)?.display())?;
    }
    out.flush()?;

    tracing::info!("Wrote {} paths to {}", paths.len(), file.display());
    Ok(())
}

/// Runs the whole pipeline: resolve the area, query the catalog per
/// geometry, select one candidate per quad and retrieve the selected files.
pub struct NaipDownloader {
    catalog: Arc<dyn CatalogClient>,
    sink: Arc<dyn RetrievalSink>,
    selector: CandidateSelector,
}

impl NaipDownloader {
    pub fn new(catalog: Arc<dyn CatalogClient>, sink: Arc<dyn RetrievalSink>) -> Self {
        Self {
            catalog,
            sink,
            selector: CandidateSelector::default(),
        }
    }

    /// Downloader using The National Map catalog and HTTP retrieval
    #[cfg(feature = "reqwest-client")]
    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(
            Arc::new(crate::TnmCatalog::from_config(config)),
            Arc::new(crate::HttpRetriever::from_config(config)),
        )
    }

    /// Use a custom candidate selector
    pub fn with_selector(mut self, selector: CandidateSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Query every page for `bbox` and select one candidate per quad
    pub async fn select_for(&self, bbox: &BoundingBox) -> Result<Selection> {
        let records = fetch_all_records(self.catalog.as_ref(), bbox).await?;
        self.selector.select(&records)
    }

    /// Selected URLs for every geometry, in geometry order.
    ///
    /// A geometry whose query or selection fails is skipped; the others are
    /// still processed.
    pub async fn collect_urls(
        &self,
        geometries: &[BoundingBox],
    ) -> (Vec<String>, Vec<SkippedGeometry>) {
        let mut urls = Vec::new();
        let mut seen = HashSet::new();
        let mut skipped = Vec::new();

        for bbox in geometries {
            match self.select_for(bbox).await {
                Ok(selection) => {
                    tracing::debug!("{} candidates for {}", selection.len(), bbox);
                    for url in selection.download_urls() {
                        if seen.insert(url.clone()) {
                            urls.push(url);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Skipping geometry {}: {}", bbox, e);
                    skipped.push(SkippedGeometry {
                        bbox: *bbox,
                        reason: e.to_string(),
                    });
                }
            }
        }

        (urls, skipped)
    }

    /// Retrieve `urls` into `directory`, returning the local paths found and
    /// the URLs that could not be retrieved
    pub async fn retrieve_all(
        &self,
        urls: &[String],
        directory: &Path,
        overwrite: bool,
    ) -> Result<(Vec<PathBuf>, Vec<String>)> {
        let mut paths = Vec::new();
        let mut missing = Vec::new();

        for (i, url) in urls.iter().enumerate() {
            tracing::info!("Downloading file {} of {}", i + 1, urls.len());
            match self.sink.retrieve(url, directory, overwrite).await? {
                Some(path) => paths.push(path),
                None => {
                    tracing::warn!("File could not be downloaded: {}", url);
                    missing.push(url.clone());
                }
            }
        }

        Ok((paths, missing))
    }

    /// Run the pipeline for `config`
    pub async fn run(&self, config: &FetchConfig) -> Result<DownloadReport> {
        config.validate()?;

        let geometries = resolve_geometries(&config.area, &config.grid)?;
        tracing::info!(
            "Downloading NAIP imagery for {} geometries via '{}' into {}",
            geometries.len(),
            self.catalog.provider_type(),
            config.download_dir.display()
        );
        for bbox in &geometries {
            tracing::debug!("Query geometry: {}", bbox);
        }

        let (urls, skipped) = self.collect_urls(&geometries).await;
        let (paths, missing) = self
            .retrieve_all(&urls, &config.download_dir, config.overwrite)
            .await?;

        tracing::info!(
            "Retrieved {} of {} files ({} geometries skipped)",
            paths.len(),
            urls.len(),
            skipped.len()
        );

        Ok(DownloadReport {
            geometries: geometries.len(),
            urls,
            paths,
            missing,
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CatalogRecord, MockCatalog, MockRetriever, NaipTilesError, RecordExtent};

    fn record(bbox: BoundingBox, date: &str, url: &str) -> CatalogRecord {
        CatalogRecord::new(RecordExtent::from_bounding_box(&bbox).unwrap(), 0.8, date, url)
    }

    #[test]
    fn test_resolve_bbox_is_used_directly() {
        let bbox = BoundingBox::new(-105.02, 39.98, -104.97, 40.03);
        let geometries =
            resolve_geometries(&AreaOfInterest::BoundingBox(bbox), &GridSpec::default()).unwrap();
        assert_eq!(geometries, vec![bbox]);
    }

    #[test]
    fn test_resolve_geometry_file_is_tiled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("area.geojson");
        std::fs::write(
            &path,
            r#"{"type": "Polygon", "coordinates": [[[-105.02, 39.98], [-104.97, 39.98], [-104.97, 40.03], [-105.02, 40.03], [-105.02, 39.98]]]}"#,
        )
        .unwrap();

        let geometries = resolve_geometries(&AreaOfInterest::file(&path), &GridSpec::default()).unwrap();

        assert_eq!(
            geometries,
            vec![
                BoundingBox::new(-105.0625, 39.9375, -105.0, 40.0),
                BoundingBox::new(-105.0625, 40.0, -105.0, 40.0625),
                BoundingBox::new(-105.0, 39.9375, -104.9375, 40.0),
                BoundingBox::new(-105.0, 40.0, -104.9375, 40.0625),
            ]
        );
    }

    #[test]
    fn test_resolve_missing_file() {
        let result = resolve_geometries(
            &AreaOfInterest::file("/definitely/not/here.geojson"),
            &GridSpec::default(),
        );
        assert!(matches!(result, Err(NaipTilesError::Config(_))));
    }

    #[test]
    fn test_write_paths_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("paths.txt");
        let paths = vec![PathBuf::from("data/raw/a.jp2"), PathBuf::from("/abs/b.jp2")];

        write_paths_file(&paths, &file).unwrap();
        let contents = std::fs::read_to_string(&file).unwrap();

        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(Path::new(lines[0]).is_absolute());
        assert!(lines[0].ends_with("a.jp2"));
        assert_eq!(lines[1], "/abs/b.jp2");
    }

    #[tokio::test]
    async fn test_run_bbox_selects_and_retrieves() {
        let quad = BoundingBox::new(-105.0625, 39.9375, -105.0, 40.0);
        let catalog = Arc::new(MockCatalog::with_records(vec![
            record(quad, "2017-07-01", "https://example.com/old.jp2"),
            record(quad, "2019-07-01", "https://example.com/new.jp2"),
        ]));
        let sink = Arc::new(MockRetriever::new());
        let downloader = NaipDownloader::new(catalog.clone(), sink.clone());

        let config = FetchConfig::for_bbox(BoundingBox::new(-105.02, 39.98, -104.97, 40.03))
            .with_download_dir("out")
            .with_overwrite(true);
        let report = downloader.run(&config).await.unwrap();

        assert_eq!(report.geometries, 1);
        assert_eq!(report.urls, vec!["https://example.com/new.jp2"]);
        assert_eq!(report.paths, vec![PathBuf::from("out/new.jp2")]);
        assert!(report.is_complete());
        assert!(sink.requests()[0].overwrite);
        assert_eq!(catalog.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_geometry_is_skipped() {
        let good = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let bad = BoundingBox::new(5.0, 5.0, 6.0, 6.0);
        let catalog = Arc::new(
            MockCatalog::new()
                .with_record(record(good, "2020-01-01", "https://example.com/good.jp2"))
                .with_failing_area(bad),
        );
        let downloader = NaipDownloader::new(catalog, Arc::new(MockRetriever::new()));

        let (urls, skipped) = downloader.collect_urls(&[bad, good]).await;
        assert_eq!(urls, vec!["https://example.com/good.jp2"]);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].bbox, bad);
    }

    #[tokio::test]
    async fn test_malformed_geometry_is_skipped() {
        let area = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let mut broken = record(area, "2020-01-01", "https://example.com/broken.jp2");
        broken.date_created = None;
        let catalog = Arc::new(MockCatalog::new().with_record(broken));
        let downloader = NaipDownloader::new(catalog, Arc::new(MockRetriever::new()));

        let report = downloader.run(&FetchConfig::for_bbox(area)).await.unwrap();
        assert!(report.urls.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].reason.contains("Malformed"));
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn test_shared_quads_downloaded_once() {
        let quad = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let catalog = Arc::new(MockCatalog::new().with_record(record(
            quad,
            "2020-01-01",
            "https://example.com/shared.jp2",
        )));
        let sink = Arc::new(MockRetriever::new());
        let downloader = NaipDownloader::new(catalog, sink.clone());

        let (urls, _) = downloader
            .collect_urls(&[
                BoundingBox::new(0.0, 0.0, 0.5, 0.5),
                BoundingBox::new(0.5, 0.5, 1.0, 1.0),
            ])
            .await;
        let (paths, missing) = downloader
            .retrieve_all(&urls, Path::new("out"), false)
            .await
            .unwrap();

        assert_eq!(paths, vec![PathBuf::from("out/shared.jp2")]);
        assert!(missing.is_empty());
        assert_eq!(sink.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_files_are_reported() {
        let sink = Arc::new(MockRetriever::new().with_missing("https://example.com/b.jp2"));
        let downloader = NaipDownloader::new(Arc::new(MockCatalog::new()), sink);

        let urls = vec![
            "https://example.com/a.jp2".to_string(),
            "https://example.com/b.jp2".to_string(),
        ];
        let (paths, missing) = downloader
            .retrieve_all(&urls, Path::new("out"), false)
            .await
            .unwrap();

        assert_eq!(paths, vec![PathBuf::from("out/a.jp2")]);
        assert_eq!(missing, vec!["https://example.com/b.jp2"]);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let downloader =
            NaipDownloader::new(Arc::new(MockCatalog::new()), Arc::new(MockRetriever::new()));
        let config = FetchConfig::for_bbox(BoundingBox::new(1.0, 1.0, 0.0, 0.0));

        let result = downloader.run(&config).await;
        assert!(matches!(result, Err(NaipTilesError::Config(_))));
    }

    #[cfg(feature = "reqwest-client")]
    #[test]
    fn test_from_config_uses_tnm_and_http() {
        let config = FetchConfig::default().with_timeout(7);
        let downloader = NaipDownloader::from_config(&config);

        assert_eq!(downloader.catalog.provider_type(), "tnm");
        assert_eq!(downloader.sink.sink_type(), "http");
    }
}
