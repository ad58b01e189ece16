use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use parkride_server::domain::Coordinate;
use parkride_server::parking::{DetailCacheConfig, ParkingDetailCache, ParkingDirectory};
use parkride_server::planner::PlannerConfig;
use parkride_server::providers::RetryPolicy;
use parkride_server::providers::mapbox::{MapboxClient, MapboxConfig};
use parkride_server::providers::monotch::{MonotchClient, MonotchConfig};
use parkride_server::providers::nl9292::{Nl9292Client, Nl9292Config};
use parkride_server::web::{AppState, create_router};

#[derive(Debug, Parser)]
#[command(name = "parkride-server")]
#[command(about = "Park-and-ride journey planner")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the journey planning API
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,
    },

    /// Fetch detail records for every parking around a point
    CacheParkings {
        #[arg(long, default_value_t = 4.37212, allow_hyphen_values = true)]
        lon: f64,

        #[arg(long, default_value_t = 52.00234, allow_hyphen_values = true)]
        lat: f64,

        /// Search radius in metres
        #[arg(long, default_value_t = 30_000.0)]
        radius: f64,

        /// Also write the raw parking listing to this file
        #[arg(long)]
        listing_out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let cache_config = match std::env::var("PARKRIDE_CACHE_PATH") {
        Ok(path) => DetailCacheConfig::new(path),
        Err(_) => DetailCacheConfig::default(),
    };
    let cache = Arc::new(ParkingDetailCache::load(cache_config));

    let monotch = MonotchClient::new(MonotchConfig::new(env_or_empty("MONOTCH_API_KEY")))?;
    let directory = ParkingDirectory::new(monotch, Arc::clone(&cache), RetryPolicy::default());

    match cli.command {
        Command::Serve { addr } => serve(addr, directory, &cache).await,
        Command::CacheParkings {
            lon,
            lat,
            radius,
            listing_out,
        } => {
            let center = Coordinate::new(lon, lat);
            if !center.is_valid() {
                return Err(format!("invalid coordinate {lon},{lat}").into());
            }

            let directory = match listing_out {
                Some(path) => directory.with_listing_snapshot(path),
                None => directory,
            };
            let report = directory.warm_cache(center, radius, ctrl_c()).await?;
            println!(
                "Cached {} new parkings ({} already known, {} failed){}",
                report.fetched,
                report.skipped,
                report.failed,
                if report.interrupted { ", interrupted" } else { "" }
            );
            println!("Detail cache: {}", cache.path().display());
            Ok(())
        }
    }
}

async fn serve(
    addr: SocketAddr,
    directory: ParkingDirectory<MonotchClient>,
    cache: &ParkingDetailCache,
) -> Result<(), Box<dyn Error>> {
    let mapbox = Arc::new(MapboxClient::new(MapboxConfig::new(env_or_empty(
        "MAPBOX_ACCESS_TOKEN",
    )))?);
    let transit = Arc::new(Nl9292Client::new(Nl9292Config::default())?);

    let state = AppState::new(
        Arc::clone(&mapbox),
        transit,
        Arc::new(directory),
        mapbox,
        PlannerConfig::default(),
    );
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "park-and-ride planner listening");
    info!("  GET  /health                   - Health check");
    info!("  POST /journey/plan             - Plan between coordinates");
    info!("  POST /journey/plan-by-address  - Plan between addresses");

    axum::serve(listener, app)
        .with_graceful_shutdown(ctrl_c())
        .await?;

    cache.flush()?;
    info!(entries = cache.len(), "detail cache flushed, bye");
    Ok(())
}

/// Reads a credential; clients reject an empty one with a clear error.
fn env_or_empty(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| {
        warn!("{name} not set");
        String::new()
    })
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Ctrl-C received, stopping");
}
