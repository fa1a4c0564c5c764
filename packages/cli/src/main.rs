// ABOUTME: Labstock server binary
// ABOUTME: Wires config, database, routers, CORS, and the overdue sweep task

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use axum::http::Method;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use labstock_api::{
    create_chat_router, create_components_router, create_dashboard_router, create_kiosk_router,
    create_transactions_router, DbState,
};

mod config;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    info!("Starting Labstock server on port {}", config.port);

    let pool = labstock_storage::connect(Path::new(&config.database_path)).await?;
    let state = DbState::new(pool);

    spawn_overdue_sweep(state.clone(), config.sweep_interval_secs);

    let cors = CorsLayer::new()
        .allow_origin(config.cors_origin.parse::<axum::http::HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api/components", create_components_router())
        .nest("/api/transactions", create_transactions_router())
        .nest("/api/kiosk", create_kiosk_router())
        .nest("/api/dashboard", create_dashboard_router())
        .nest("/api/chat", create_chat_router())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Periodically persist overdue status for issued loans past their due date.
/// The sweep is idempotent, so restarts and overlapping runs are harmless.
fn spawn_overdue_sweep(state: DbState, interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            match state.lending.sweep_overdue(chrono::Utc::now()).await {
                Ok(0) => {}
                Ok(swept) => warn!("Marked {} transaction(s) overdue", swept),
                Err(err) => error!("Overdue sweep failed: {}", err),
            }
        }
    });
}
