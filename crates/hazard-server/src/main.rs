//! Hazard Server - route hazard analysis and enrichment service

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hazard_server::analysis::RouteAnalyzer;
use hazard_server::config::Config;
use hazard_server::providers::Providers;
use hazard_server::state::AppState;
use hazard_server::{api, loops, persistence};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();

    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("hazard_server=debug".parse()?);
    if config.json_logs() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting Hazard Server...");

    // Storage is the only hard dependency; fail startup without it.
    let db = persistence::init_database(&config.database_path, config.database_max_connections)
        .await?;

    let providers = Providers::from_config(&config);
    let analyzer = RouteAnalyzer::from_config(providers, &config);
    if config.traffic_api_key.is_none() {
        tracing::warn!("TRAFFIC_API_KEY not set; enhanced analyses will report traffic as unavailable");
    }

    let port = config.server_port;
    let state = Arc::new(AppState::new(db, config, analyzer));

    tokio::spawn(loops::cache_prune_loop::run_cache_prune_loop(state.clone()));

    let app = api::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
