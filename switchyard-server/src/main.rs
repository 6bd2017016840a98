// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Switchyard - a gateway that unifies multiple AI model providers.
//!
//! # Examples
//!
//! ```bash
//! # Run with the default configuration paths
//! switchyard
//!
//! # Run with an explicit config file
//! switchyard --config ./config.yaml
//!
//! # Override the bind address
//! switchyard --host 127.0.0.1 --port 9000
//! ```

mod error;
mod routes;
mod state;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use switchyard_gateway::{Dispatcher, ModelCatalog};
use switchyard_providers::build_adapters;
use switchyard_store::{
    GatewayConfig, KeyRotationManager, ModelCache, StatisticsStore, default_config_path,
};

use state::AppState;

/// How often expired rate-limit lockouts are swept, independent of traffic.
const SWEEP_INTERVAL_SECS: u64 = 300;

/// Switchyard gateway server.
#[derive(Parser)]
#[command(name = "switchyard")]
#[command(about = "A gateway that unifies multiple AI model providers behind one API")]
#[command(version)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Override the configured bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the configured bind port.
    #[arg(long, short)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = GatewayConfig::load_from(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;

    // Construct every component once and pass handles down; nothing is
    // ambient.
    let keys = Arc::new(
        KeyRotationManager::load(&config.credentials)
            .await
            .context("loading credential pools")?,
    );
    let cache = Arc::new(ModelCache::load(&config.models_cache).await);
    let stats = Arc::new(StatisticsStore::open(&config.statistics).context("opening statistics store")?);
    let adapters = build_adapters(&config, &keys).context("building provider adapters")?;
    let catalog = ModelCatalog::from_config(&config.model_filters);
    let dispatcher = Arc::new(Dispatcher::new(
        adapters,
        Arc::clone(&cache),
        Arc::clone(&stats),
        catalog,
    ));

    for info in dispatcher.provider_infos().await {
        if info.available {
            info!(provider = %info.id, "Provider ready");
        } else {
            warn!(provider = %info.id, "Provider has no usable credential");
        }
    }

    spawn_lockout_sweep(Arc::clone(&keys));

    let state = AppState {
        dispatcher,
        keys,
        cache,
        stats,
    };
    let cors = build_cors(&config.server.cors_origins);
    let app = routes::router(state, cors);

    let host = cli.host.unwrap_or(config.server.host);
    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(addr = %addr, "Switchyard listening");

    axum::serve(listener, app).await.context("serving")?;
    Ok(())
}

/// Periodically reclaims rate-limited credentials whose reset time has
/// elapsed, so pools heal even without acquisition traffic.
fn spawn_lockout_sweep(keys: Arc<KeyRotationManager>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            let reclaimed = keys.sweep_expired_lockouts().await;
            if reclaimed > 0 {
                info!(reclaimed, "Reclaimed rate-limited credentials");
            }
        }
    });
}

fn build_cors(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(Any)
        .allow_headers(Any)
}
