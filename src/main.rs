mod analysis;
mod api;
mod aqi;
mod config;
mod error;
mod fetcher;
mod forecast;
mod types;

use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::error::Result;
use crate::fetcher::OpenWeatherClient;

#[tokio::main]
async fn main() {
    // A missing .env is fine; the environment may already be populated.
    let _ = dotenvy::dotenv();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    info!(
        "Forecast settings: history={}d forecast={}d | compare concurrency={} | default cities: {}",
        cfg.settings.history_days(),
        cfg.settings.forecast_days(),
        cfg.compare_concurrency,
        cfg.default_cities.join(", "),
    );

    let latency = Arc::new(LatencyStats::new()?);
    let client = Arc::new(OpenWeatherClient::new(&cfg, Arc::clone(&latency))?);
    let health = Arc::new(HealthState::new());

    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let api_state = ApiState {
        cfg: Arc::new(cfg),
        client,
        health,
        latency,
    };
    let app = router(api_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
