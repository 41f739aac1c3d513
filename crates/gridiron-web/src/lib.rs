//! Axum HTTP surface for Gridiron: batch and single scrapes, stored stats and job history.

mod auth;
mod error;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::{get, post},
    Json, Router,
};
use gridiron_adapters::StatHandler;
use gridiron_core::{validate_season, GridironError, JobStatus, ScrapeJob};
use gridiron_storage::{JobStore, SessionFactory};
use gridiron_sync::BatchOrchestrator;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::info;

pub use auth::API_KEY_HEADER;
pub use error::ApiError;

pub const CRATE_NAME: &str = "gridiron-web";

const DEFAULT_JOB_LIMIT: i64 = 20;
const MAX_JOB_LIMIT: i64 = 100;

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub port: u16,
    /// Non-empty key required on scrape and job routes.
    pub api_key: Option<String>,
}

impl WebConfig {
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("GRIDIRON_WEB_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
            api_key: std::env::var("API_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionFactory,
    pub orchestrator: BatchOrchestrator,
    pub api_key: Option<String>,
}

impl AppState {
    pub fn new(
        sessions: SessionFactory,
        orchestrator: BatchOrchestrator,
        api_key: Option<String>,
    ) -> Self {
        Self {
            sessions,
            orchestrator,
            api_key,
        }
    }
}

pub fn app(state: AppState) -> Router {
    let state = Arc::new(state);
    let guarded = Router::new()
        .route("/scrape/batch/{season}", post(batch_handler))
        .route("/scrape/jobs", get(list_jobs_handler))
        .route("/scrape/jobs/{id}", get(job_handler))
        .route("/scrape/{stat}/{season}", get(scrape_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));
    Router::new()
        .route("/health", get(health_handler))
        .route("/stats/{stat}/{season}", get(stats_handler))
        .merge(guarded)
        .with_state(state)
}

pub async fn serve(config: &WebConfig, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("binding port {}", config.port))?;
    info!(port = config.port, auth = state.api_key.is_some(), "listening");
    axum::serve(listener, app(state))
        .await
        .context("serving http")?;
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
struct BatchRequest {
    #[serde(default)]
    stats: Vec<String>,
    #[serde(default)]
    dry_run: bool,
}

#[derive(Debug, Default, Deserialize)]
struct StatsQuery {
    week: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct JobsQuery {
    status: Option<String>,
    limit: Option<i64>,
}

fn parse_season(raw: &str) -> Result<i32, GridironError> {
    let season = raw
        .parse()
        .map_err(|_| GridironError::Validation(format!("season must be a year, got {raw:?}")))?;
    validate_season(season)
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Always 200 once the season is valid; item failures live in `results`.
async fn batch_handler(
    State(state): State<Arc<AppState>>,
    Path(season): Path<String>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<Value>, ApiError> {
    let season = parse_season(&season)?;
    let mut session = state.sessions.open();
    let job = state
        .orchestrator
        .run_batch(&mut session, season, request.stats, request.dry_run)
        .await;
    Ok(Json(json!({ "season": season, "results": job.results })))
}

async fn scrape_handler(
    State(state): State<Arc<AppState>>,
    Path((stat, season)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let season = parse_season(&season)?;
    let mut session = state.sessions.open();
    let records = state
        .orchestrator
        .scrape_one(&mut session, &stat, season)
        .await?;
    Ok(Json(json!({
        "stat": stat,
        "season": season,
        "status": "success",
        "records": records,
    })))
}

async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Path((stat, season)): Path<(String, String)>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Value>, ApiError> {
    let season = parse_season(&season)?;
    let handler = state
        .orchestrator
        .registry()
        .resolve(&stat)
        .ok_or_else(|| GridironError::UnknownStat(stat.clone()))?;
    let mut session = state.sessions.open();
    let records = handler.stored(&mut session, season, query.week).await?;
    Ok(Json(json!({
        "stat": stat,
        "season": season,
        "count": records.len(),
        "records": records,
    })))
}

async fn list_jobs_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JobsQuery>,
) -> Result<Json<Value>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            JobStatus::parse(s)
                .ok_or_else(|| GridironError::Validation(format!("unknown job status {s:?}")))
        })
        .transpose()?;
    let limit = query.limit.unwrap_or(DEFAULT_JOB_LIMIT).clamp(1, MAX_JOB_LIMIT);
    let mut session = state.sessions.open();
    let jobs = JobStore::new(&mut session).list(status, limit).await?;
    Ok(Json(json!({ "jobs": jobs })))
}

async fn job_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ScrapeJob>, ApiError> {
    let mut session = state.sessions.open();
    match JobStore::new(&mut session).get(id).await? {
        Some(job) => Ok(Json(job)),
        None => Err(ApiError::not_found(format!("job {id} not found"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seasons_must_be_years_in_range() {
        assert_eq!(parse_season("2024"), Ok(2024));
        assert_eq!(parse_season("1919").unwrap_err().kind(), "validation_error");
        assert_eq!(parse_season("twenty").unwrap_err().kind(), "validation_error");
    }
}
