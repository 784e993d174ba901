// Crime Forecast Dashboard - Web Server
// Serves the dashboard page, SVG charts and a JSON API with Axum

use anyhow::{Context, Result};
use clap::Parser;
use crime_forecast::config::{init_tracing, LogTarget, ServerConfig};
use crime_forecast::server::{router, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();
    init_tracing("crime_forecast=info,crime_server=info,tower_http=info", LogTarget::Stderr);

    let dataset = config.data.load_dataset()?;
    let forecast = config.data.forecast_config()?;
    info!(
        rows = dataset.len(),
        periods = forecast.periods,
        "dataset ready"
    );

    let app = router(AppState::new(dataset, forecast));

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("crime-server v{} listening on http://{}", crime_forecast::VERSION, addr);
    info!("API: http://{}/api/dashboard", addr);

    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}
