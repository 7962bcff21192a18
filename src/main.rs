use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::signal;
use tracing::{error, info};

use mentor_market::{
    app::create_router,
    app_state::AppState,
    config,
    db::init_store,
    session::SessionStore,
    telemetry::{init_telemetry, TelemetryConfig},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = config::init().context("Failed to load configuration")?;
    let telemetry = init_telemetry(TelemetryConfig::for_app(&config.app))
        .await
        .context("Failed to initialize telemetry")?;

    let store = init_store(&config.store).await?;

    let sessions = SessionStore::new(config.session.ttl);
    if let Some(path) = &config.session.snapshot_path {
        if let Err(e) = sessions.load_from(path).await {
            error!("Ignoring unreadable session snapshot: {:#}", e);
        }
    }

    let state = AppState::new(store, Arc::new(config.clone()), sessions.clone());
    let app = create_router(state);

    let addr = config.server_addr();
    info!("{} listening on {}", config.app.name, addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Failed to serve application")?;

    if let Some(path) = &config.session.snapshot_path {
        if let Err(e) = sessions.persist_to(path).await {
            error!("Failed to persist sessions: {:#}", e);
        }
    }
    telemetry.shutdown().await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
