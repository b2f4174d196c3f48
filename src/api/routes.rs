use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{analyze_city, compare_cities, parse_city_list, CityAnalysis, CityOutcome};
use crate::api::health::{HealthResponse, HealthState};
use crate::api::latency::{LatencySnapshot, LatencyStats};
use crate::config::{Config, ForecastSettings};
use crate::error::AppError;
use crate::fetcher::OpenWeatherClient;

#[derive(Clone)]
pub struct ApiState {
    pub cfg: Arc<Config>,
    pub client: Arc<OpenWeatherClient>,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/cities/:name", get(get_city))
        .route("/compare", get(get_compare))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct AnalysisQuery {
    pub history_days: Option<usize>,
    pub forecast_days: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompareQuery {
    /// Comma- or newline-separated city names.
    pub cities: Option<String>,
    pub history_days: Option<usize>,
    pub forecast_days: Option<usize>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub history_days: usize,
    pub forecast_days: usize,
    pub cities: Vec<CityOutcome>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(state.health.snapshot())
}

async fn get_city(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Query(params): Query<AnalysisQuery>,
) -> Result<Json<CityAnalysis>, AppError> {
    let settings = resolve_settings(&state.cfg.settings, params.history_days, params.forecast_days)?;
    let today = Local::now().date_naive();

    let result = analyze_city(
        state.client.as_ref(),
        state.client.as_ref(),
        name.trim(),
        settings,
        today,
    )
    .await;

    match result {
        Ok(analysis) => {
            state.health.record_success(now_secs());
            Ok(Json(analysis))
        }
        Err(e) => {
            state.health.record_failure(e.is_upstream());
            Err(e)
        }
    }
}

async fn get_compare(
    State(state): State<ApiState>,
    Query(params): Query<CompareQuery>,
) -> Result<Json<CompareResponse>, AppError> {
    let settings = resolve_settings(&state.cfg.settings, params.history_days, params.forecast_days)?;
    let cities = requested_cities(params.cities.as_deref(), &state.cfg.default_cities);
    let today = Local::now().date_naive();

    let outcomes = compare_cities(
        state.client.as_ref(),
        state.client.as_ref(),
        &cities,
        settings,
        today,
        state.cfg.compare_concurrency,
    )
    .await;

    record_outcomes(&state.health, &outcomes, now_secs());

    Ok(Json(CompareResponse {
        history_days: settings.history_days(),
        forecast_days: settings.forecast_days(),
        cities: outcomes,
    }))
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencySnapshot> {
    Json(state.latency.snapshot())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Validate per-request overrides against the configured boundary.
pub fn resolve_settings(
    base: &ForecastSettings,
    history_days: Option<usize>,
    forecast_days: Option<usize>,
) -> Result<ForecastSettings, AppError> {
    base.with_overrides(history_days, forecast_days)
}

/// Cities named in the query, or the configured defaults when none are given.
pub fn requested_cities(raw: Option<&str>, defaults: &[String]) -> Vec<String> {
    let parsed = raw.map(parse_city_list).unwrap_or_default();
    if parsed.is_empty() {
        defaults.to_vec()
    } else {
        parsed
    }
}

/// Count each compared city against the health counters.
pub fn record_outcomes(health: &HealthState, outcomes: &[CityOutcome], at_secs: u64) {
    for outcome in outcomes {
        if outcome.summary.is_some() {
            health.record_success(at_secs);
        } else {
            health.record_failure(outcome.upstream);
        }
    }
}

fn now_secs() -> u64 {
    Utc::now().timestamp().max(0) as u64
}
