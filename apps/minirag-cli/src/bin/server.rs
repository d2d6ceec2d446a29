use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use minirag_cli::init_tracing;
use minirag_cli::server::{create_router, AppState};
use minirag_core::config::Config;
use minirag_pipeline::RagPipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    let pipeline = RagPipeline::from_settings(&settings).await.context("failed to initialise pipeline")?;

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "minirag server listening");
    axum::serve(listener, create_router(AppState { engine: Arc::new(pipeline) })).await?;
    Ok(())
}
