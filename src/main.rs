use anyhow::{bail, Context};
use clap::Parser;
use soilmatch_api::{ExplainerConfig, GeminiExplainer, RestApi};
use soilmatch_core::FeatureCatalog;
use soilmatch_matcher::{MatchConfig, MatchEngine};
use soilmatch_storage::ReferenceLoader;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Match soil characteristics to microbial taxa observed in similar soils
#[derive(Parser, Debug)]
#[command(name = "soilmatch")]
#[command(about = "Soil profile to microbial taxon matching service", long_about = None)]
struct Args {
    /// Soil polygons as a GeoJSON FeatureCollection (optionally .gz)
    #[arg(long)]
    soil_path: PathBuf,

    /// GBIF occurrence export (tab-separated, optionally .gz)
    #[arg(long)]
    occurrence_path: PathBuf,

    /// Keep only occurrences from this country; empty disables the filter
    #[arg(long, default_value = "PL")]
    country_code: String,

    /// Region name used in explanations
    #[arg(long, default_value = "Poland")]
    region_name: String,

    /// HTTP API port
    #[arg(long, default_value_t = 5000)]
    http_port: u16,

    /// Directory served at `/` for the page front end
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Soil polygons retrieved per query
    #[arg(long, default_value_t = 5)]
    neighbors: usize,

    /// Maximum number of taxa returned
    #[arg(long, default_value_t = 5)]
    max_results: usize,

    /// Occurrences used when none fall inside a polygon
    #[arg(long, default_value_t = 3)]
    fallback_nearest: usize,

    /// Distinct taxa emitted per polygon
    #[arg(long, default_value_t = 3)]
    max_taxa_per_polygon: usize,

    /// Gemini model used for taxon explanations
    #[arg(long, default_value = "gemini-1.5-pro-latest")]
    gemini_model: String,

    /// Timeout for explanation requests, in seconds
    #[arg(long, default_value_t = 30)]
    explain_timeout_secs: u64,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting SoilMatch v{}", env!("CARGO_PKG_VERSION"));
    info!("Soil data: {:?}", args.soil_path);
    info!("Occurrence data: {:?}", args.occurrence_path);

    let catalog = FeatureCatalog::soil_defaults();
    for feature in &catalog {
        info!(
            "{} ({}): {} [range {:.2}..{:.2}, mean {:.2}]",
            feature.name, feature.key, feature.description, feature.min, feature.max, feature.mean
        );
    }

    let store = ReferenceLoader::new(&args.soil_path, &args.occurrence_path)
        .with_country(args.country_code.clone())
        .load(catalog)
        .context("Failed to load reference data")?;
    info!(
        "Reference data loaded: {} soil polygons ({} complete), {} occurrences",
        store.len(),
        store.complete_polygon_count(),
        store.occurrences().len()
    );

    let config = MatchConfig {
        neighbors: args.neighbors,
        max_results: args.max_results,
        fallback_nearest: args.fallback_nearest,
        max_taxa_per_polygon: args.max_taxa_per_polygon,
        region_name: args.region_name.clone(),
    };
    let engine = Arc::new(MatchEngine::build(store, config).context("Failed to build match engine")?);
    info!("Match engine initialized");

    let explainer_config = ExplainerConfig {
        model: args.gemini_model.clone(),
        timeout_secs: args.explain_timeout_secs,
        ..ExplainerConfig::from_env()
    };
    if explainer_config.api_key.is_none() {
        warn!("GEMINI_API_KEY not set; taxon explanations are disabled");
    }
    let explainer = Arc::new(GeminiExplainer::new(explainer_config)?);

    let http_port = args.http_port;
    let static_dir = args.static_dir.clone();
    let (bound_tx, bound_rx) = oneshot::channel::<std::io::Result<()>>();
    let http_handle = std::thread::spawn(move || -> std::io::Result<()> {
        info!("Starting HTTP server on port {}", http_port);
        let sys = actix_web::rt::System::new();
        sys.block_on(async move {
            let server = match RestApi::bind(engine, explainer, http_port, static_dir) {
                Ok(server) => server,
                Err(e) => {
                    // Reported to the main thread through the channel
                    let _ = bound_tx.send(Err(e));
                    return Ok(());
                }
            };
            let _ = bound_tx.send(Ok(()));
            server.await
        })
    });

    match bound_rx.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!("Failed to bind HTTP port {}: {}", http_port, e);
            return Err(e).with_context(|| format!("Failed to bind HTTP port {}", http_port));
        }
        Err(_) => bail!("HTTP server thread exited before binding"),
    }

    info!("SoilMatch started successfully");
    info!("HTTP API: http://localhost:{}/", http_port);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        joined = tokio::task::spawn_blocking(move || http_handle.join()) => {
            match joined {
                Ok(Ok(Ok(()))) => info!("HTTP server stopped"),
                Ok(Ok(Err(e))) => {
                    error!("HTTP server error: {}", e);
                    return Err(e).context("HTTP server failed");
                }
                _ => bail!("HTTP server thread panicked"),
            }
        }
    }

    info!("Shutting down...");
    Ok(())
}
