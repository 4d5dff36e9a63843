//! Firetrend - wildfire clustering and trend reporting from satellite hotspots.
//!
//! # Configuration
//!
//! - `FIRETREND_PORT` - listen port (default 3000)
//! - `FIRETREND_FIRMS_MAP_KEY` - NASA FIRMS MAP_KEY (required)
//! - `FIRETREND_FIRMS_SOURCE` - FIRMS product (default `VIIRS_SNPP_NRT`)
//! - `FIRETREND_FIRMS_BASE_URL` - override the FIRMS endpoint
//! - `FIRETREND_BOUNDARIES_FILE` - JSON region table; Nominatim is used when unset
//! - `FIRETREND_NATIONAL_REGION` - boundary for the national overview (default `Canada`)
//! - `FIRETREND_BATCH_TIMEOUT_SECS` - per-batch fetch deadline, `0` disables (default 60)
//! - `FIRETREND_MAX_CONCURRENT_FETCHES` - batch fetches in flight at once (default 4)
//! - `FIRETREND_MAX_COMPARE_RANGE` - largest `range` accepted by `/trend/compare` (default 366)
//!
//! # API Endpoints
//!
//! - `GET /fires` - Fires for one period and region
//! - `GET /trend/national` - Yearly national hotspot counts
//! - `GET /trend/compare` - Daily hotspot counts per region
//! - `GET /health` - Health check

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use firetrend::api::{
    AppState, get_fires, get_national_trend, get_region_comparison, health_check,
};
use firetrend::data_sources::firms::DEFAULT_FIRMS_SOURCE;
use firetrend::data_sources::{
    BoundaryProvider, FireDataSource, FirmsClient, NominatimBoundaryProvider,
    StaticBoundaryProvider,
};
use firetrend::orchestrator::{FireTrendOrchestrator, OrchestratorConfig};

/// Default port if not specified via environment variable.
const DEFAULT_PORT: u16 = 3000;

/// User agent sent to Nominatim.
const USER_AGENT: &str = concat!("firetrend/", env!("CARGO_PKG_VERSION"));

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("firetrend=info".parse()?))
        .init();

    // Load configuration from environment
    let port: u16 = env::var("FIRETREND_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let map_key =
        env::var("FIRETREND_FIRMS_MAP_KEY").context("FIRETREND_FIRMS_MAP_KEY must be set")?;
    let firms_source =
        env::var("FIRETREND_FIRMS_SOURCE").unwrap_or_else(|_| DEFAULT_FIRMS_SOURCE.to_string());
    let source: Arc<dyn FireDataSource> = match env::var("FIRETREND_FIRMS_BASE_URL") {
        Ok(base_url) => Arc::new(FirmsClient::with_base_url(&base_url, &map_key, &firms_source)),
        Err(_) => Arc::new(FirmsClient::new(&map_key, &firms_source)),
    };

    let boundaries: Arc<dyn BoundaryProvider> = match env::var("FIRETREND_BOUNDARIES_FILE") {
        Ok(path) => {
            let provider = StaticBoundaryProvider::from_json_file(&path)
                .with_context(|| format!("failed to load boundaries from {path}"))?;
            info!(path = %path, regions = provider.len(), "Loaded region boundaries");
            Arc::new(provider)
        }
        Err(_) => {
            info!("Using Nominatim for region boundaries");
            Arc::new(NominatimBoundaryProvider::new(USER_AGENT))
        }
    };

    let mut config = OrchestratorConfig::default();
    if let Ok(region) = env::var("FIRETREND_NATIONAL_REGION") {
        config.national_region = region;
    }
    if let Some(secs) = env::var("FIRETREND_BATCH_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
    {
        config.batch_timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }
    if let Some(limit) = env::var("FIRETREND_MAX_CONCURRENT_FETCHES")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
    {
        config.max_concurrent_fetches = limit.max(1);
    }
    if let Some(range) = env::var("FIRETREND_MAX_COMPARE_RANGE")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
    {
        config.max_comparison_range = range;
    }

    info!(
        port,
        firms_source = %firms_source,
        national_region = %config.national_region,
        batch_timeout = ?config.batch_timeout,
        max_concurrent_fetches = config.max_concurrent_fetches,
        "Starting Firetrend server"
    );

    let state = AppState {
        orchestrator: FireTrendOrchestrator::new(source, boundaries, config),
    };

    let app = Router::new()
        .route("/fires", get(get_fires))
        .route("/trend/national", get(get_national_trend))
        .route("/trend/compare", get(get_region_comparison))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Firetrend is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
