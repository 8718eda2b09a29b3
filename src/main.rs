//! US Atlas - HTTP server entry point.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use us_atlas::config::Settings;
use us_atlas::data::{load_datacenter_table, PollutionLoader};
use us_atlas::epa::AqsClient;
use us_atlas::geo::Geocoder;
use us_atlas::server::{build_router, AppState};

#[derive(Parser, Debug)]
#[command(name = "us_atlas", version, about = "EPA pollution and data-center dashboard service")]
struct Args {
    /// Address to bind (overrides US_ATLAS_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Cache directory; "off" disables the disk cache
    #[arg(long)]
    cache_dir: Option<String>,

    /// Extra data centers to geocode and add to the catalogue
    #[arg(long)]
    datacenters_csv: Option<PathBuf>,

    /// Load the pollution table before accepting traffic
    #[arg(long)]
    warm: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("us_atlas=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();
    let settings = Arc::new(apply_args(
        Settings::from_env().context("Invalid configuration")?,
        args.host,
        args.port,
        args.cache_dir,
        args.datacenters_csv,
    ));

    if settings.credentials().is_err() {
        warn!("EPA_EMAIL / EPA_API_KEY not set; pollution endpoints need a fresh cache to respond");
    }

    let client = AqsClient::from_settings(&settings).context("Failed to build EPA client")?;
    let loader = PollutionLoader::new(Arc::clone(&settings), Arc::new(client));

    let geocoder = Geocoder::new(true);
    let datacenters = load_datacenter_table(settings.datacenters_csv.as_deref(), &geocoder)
        .await
        .context("Failed to load data-center table")?;
    info!("Data-center table ready: {} facilities", datacenters.len());

    let state = AppState::new(loader, datacenters);

    if args.warm {
        match state.pollution.table().await {
            Ok(table) => info!("Warm load complete: {} observations", table.observations.len()),
            Err(e) => warn!("Warm load failed, will retry on first request: {}", e),
        }
    }

    let app = build_router(state);

    let addr = format!("{}:{}", settings.host, settings.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn apply_args(
    mut settings: Settings,
    host: Option<String>,
    port: Option<u16>,
    cache_dir: Option<String>,
    datacenters_csv: Option<PathBuf>,
) -> Settings {
    if let Some(host) = host {
        settings.host = host;
    }
    if let Some(port) = port {
        settings.port = port;
    }
    if let Some(dir) = cache_dir {
        settings.cache_dir = match dir.as_str() {
            "off" | "none" => None,
            _ => Some(PathBuf::from(dir)),
        };
    }
    if datacenters_csv.is_some() {
        settings.datacenters_csv = datacenters_csv;
    }
    settings
}
