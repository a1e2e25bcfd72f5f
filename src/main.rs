use anyhow::Context;
use tracing_subscriber::EnvFilter;

use log_gateway::{app, config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, APP_ENV, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting log gateway in {:?} mode", config.environment);

    let state = app::AppState::from_config(config.clone())
        .await
        .context("failed to initialize stores")?;
    tracing::info!("{} views routed", state.routes.routes().len());

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("log gateway listening on http://{}", bind_addr);

    axum::serve(listener, app::router(state)).await.context("server")?;
    Ok(())
}
