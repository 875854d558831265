use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use naip_tiles::{
    AreaOfInterest, BoundingBox, BufferSpec, CatalogClient, CatalogFactory, DEFAULT_CELL_SIZE,
    FetchConfig, HttpRetriever, LengthUnit, NaipDownloader, TnmCatalog, write_paths_file,
};

#[derive(Parser)]
#[command(name = "naip-download")]
#[command(about = "Download raw NAIP imagery for a bounding box or a geometry file")]
struct Args {
    /// Bounding box to download data for: west,south,east,north
    #[arg(long, allow_hyphen_values = true, conflicts_with = "file")]
    bbox: Option<BoundingBox>,

    /// GeoJSON file with the geometry to download data for. Every image tile
    /// intersecting the geometry is downloaded.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Buffer to use around the provided geometry (only used with --file)
    #[arg(short = 'b', long)]
    buffer_dist: Option<f64>,

    /// Unit of the buffer distance: mile, meter, kilometer
    #[arg(long, default_value = "mile")]
    buffer_unit: LengthUnit,

    /// Grid cell size in degrees used to split the geometry into queries
    #[arg(long, default_value_t = DEFAULT_CELL_SIZE)]
    cell_size: f64,

    /// Re-download and overwrite existing files
    #[arg(long)]
    overwrite: bool,

    /// Directory files are downloaded to
    #[arg(long, default_value = "data/raw")]
    out_dir: PathBuf,

    /// File the local paths of all downloads are written to
    #[arg(long, default_value = "paths.txt")]
    paths_file: PathBuf,

    /// Catalog to query: tnm, mock
    #[arg(long, default_value = "tnm")]
    catalog: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Test catalog availability only
    #[arg(short, long)]
    test: bool,
}

impl Args {
    fn area(&self) -> Result<AreaOfInterest, String> {
        match (&self.bbox, &self.file) {
            (Some(bbox), None) => {
                if self.buffer_dist.is_some() {
                    warn!("--buffer-dist is only used with --file, ignoring it");
                }
                Ok(AreaOfInterest::BoundingBox(*bbox))
            }
            (None, Some(path)) => Ok(AreaOfInterest::GeometryFile {
                path: path.clone(),
                buffer: self
                    .buffer_dist
                    .map(|distance| BufferSpec::new(distance, self.buffer_unit)),
            }),
            _ => Err("Exactly one of --bbox or --file must be provided".to_string()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(level).init();

    let catalog: Arc<dyn CatalogClient> = match args.catalog.as_str() {
        "tnm" => Arc::new(
            TnmCatalog::new().with_timeout(std::time::Duration::from_secs(args.timeout)),
        ),
        "mock" => Arc::new(CatalogFactory::mock()),
        _ => {
            error!(
                "Unknown catalog: {}. Available catalogs: {:?}",
                args.catalog,
                CatalogFactory::available_providers()
            );
            return Err("Invalid catalog".to_string());
        }
    };

    let capabilities = catalog.capabilities();
    info!("🔌 Catalog: {}", catalog.provider_type());
    info!("  - Requires network: {}", capabilities.requires_network);
    if let Some(notes) = &capabilities.notes {
        info!("  - Notes: {}", notes);
    }

    if args.test {
        info!("🔍 Testing catalog availability...");
        return match catalog.test_availability().await {
            Ok(()) => {
                info!("✅ Catalog is available!");
                Ok(())
            }
            Err(e) => {
                error!("❌ Catalog test failed: {}", e);
                Err(e.to_string())
            }
        };
    }

    let config = FetchConfig::builder()
        .area(args.area()?)
        .cell_size(args.cell_size)
        .download_dir(&args.out_dir)
        .paths_file(&args.paths_file)
        .overwrite(args.overwrite)
        .timeout(args.timeout)
        .build();

    if let Err(e) = config.validate() {
        error!("❌ {}", e);
        return Err(e.to_string());
    }

    let downloader = NaipDownloader::new(catalog, Arc::new(HttpRetriever::from_config(&config)));
    let report = downloader.run(&config).await.map_err(|e| {
        error!("❌ Download failed: {}", e);
        e.to_string()
    })?;

    for skipped in &report.skipped {
        warn!("⚠️  Skipped {}: {}", skipped.bbox, skipped.reason);
    }
    for url in &report.missing {
        warn!("⚠️  Not downloaded: {}", url);
    }

    write_paths_file(&report.paths, &config.paths_file).map_err(|e| e.to_string())?;

    info!(
        "💾 {} files in {}, paths listed in {}",
        report.paths.len(),
        config.download_dir.display(),
        config.paths_file.display()
    );

    Ok(())
}
