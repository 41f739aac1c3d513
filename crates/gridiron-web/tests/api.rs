use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use gridiron_adapters::{ScrapeContext, StatRegistry};
use gridiron_storage::{
    open_migrated, BackendFetchError, FetchOptions, RawPayload, ScrapeBackend,
};
use gridiron_sync::{BatchOrchestrator, BlockingBridge};
use gridiron_web::{app, AppState, API_KEY_HEADER};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

/// Answers season index urls with the saved 2024 index page; every other
/// page is a 503.
struct IndexOnlyBackend;

impl ScrapeBackend for IndexOnlyBackend {
    fn name(&self) -> &'static str {
        "index-only"
    }

    fn fetch(&self, url: &str, _: &FetchOptions) -> Result<RawPayload, BackendFetchError> {
        if !url.ends_with('/') {
            return Err(BackendFetchError::new(url, "http status 503"));
        }
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/pfr/2024/index.html");
        let body = std::fs::read_to_string(path).map_err(|err| BackendFetchError::new(url, err))?;
        Ok(RawPayload {
            url: url.to_string(),
            final_url: url.to_string(),
            body,
            fetched_at: Utc::now(),
            backend: "index-only",
        })
    }
}

async fn test_app(api_key: Option<&str>) -> (TempDir, Router) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("gridiron.db").display());
    let sessions = open_migrated(&url).await.expect("store");
    let context = ScrapeContext::new(Arc::new(IndexOnlyBackend), FetchOptions::default())
        .with_base_url("https://fixtures.test");
    let orchestrator = BatchOrchestrator::new(
        Arc::new(StatRegistry::baseline().expect("registry")),
        BlockingBridge::new(2),
        context,
    );
    let state = AppState::new(sessions, orchestrator, api_key.map(str::to_string));
    (dir, app(state))
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let (_dir, app) = test_app(Some("s3cret")).await;
    let (status, body) = call(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy"}));
}

#[tokio::test]
async fn dry_run_batch_reports_skips() {
    let (_dir, app) = test_app(None).await;
    let (status, body) = call(
        &app,
        post_json(
            "/scrape/batch/2024",
            json!({"stats": ["team_offense"], "dry_run": true}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"season": 2024, "results": [{"stat": "team_offense", "status": "skipped (dry_run)"}]})
    );
}

#[tokio::test]
async fn batch_with_an_unknown_stat_is_still_a_200() {
    let (_dir, app) = test_app(None).await;
    let (status, body) = call(
        &app,
        post_json(
            "/scrape/batch/2024",
            json!({"stats": ["team_offense", "bogus_stat"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "season": 2024,
            "results": [
                {"stat": "team_offense", "status": "success", "records": 32},
                {"stat": "bogus_stat", "status": "failed", "error": "unknown stat type"}
            ]
        })
    );

    let (status, stored) = call(&app, get("/stats/team_offense/2024")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["count"], 32);
    assert_eq!(stored["records"][0]["team"], "Buffalo Bills");
}

#[tokio::test]
async fn omitted_stats_default_to_the_whole_registry() {
    let (_dir, app) = test_app(None).await;
    let (status, body) = call(&app, post_json("/scrape/batch/2024", json!({"dry_run": true}))).await;
    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 17);
    assert_eq!(results[0]["stat"], "team_offense");
    assert_eq!(results[14]["stat"], "games");
    assert_eq!(results[16]["stat"], "weather");
}

#[tokio::test]
async fn guarded_routes_need_the_configured_key() {
    let (_dir, app) = test_app(Some("s3cret")).await;
    let body = json!({"stats": ["team_offense"], "dry_run": true});

    let (status, denied) = call(&app, post_json("/scrape/batch/2024", body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(denied, json!({"error": "forbidden"}));

    let mut wrong = post_json("/scrape/batch/2024", body.clone());
    wrong.headers_mut().insert(API_KEY_HEADER, "nope".parse().unwrap());
    assert_eq!(call(&app, wrong).await.0, StatusCode::FORBIDDEN);

    let mut right = post_json("/scrape/batch/2024", body);
    right.headers_mut().insert(API_KEY_HEADER, "s3cret".parse().unwrap());
    assert_eq!(call(&app, right).await.0, StatusCode::OK);

    assert_eq!(call(&app, get("/scrape/jobs")).await.0, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn single_scrape_maps_errors_onto_status_codes() {
    let (_dir, app) = test_app(None).await;

    let (status, body) = call(&app, get("/scrape/standings/2024")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"stat": "standings", "season": 2024, "status": "success", "records": 32})
    );

    let (status, body) = call(&app, get("/scrape/bogus_stat/2024")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "unknown_stat");

    let (status, body) = call(&app, get("/scrape/passing/2024")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "backend_fetch_error");
    assert!(body["detail"].as_str().unwrap().contains("http status 503"));

    let (status, body) = call(&app, get("/scrape/standings/1850")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn week_filter_only_applies_to_weekly_stats() {
    let (_dir, app) = test_app(None).await;
    let (status, body) = call(&app, get("/stats/games/2024?week=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);

    let (status, body) = call(&app, get("/stats/team_offense/2024?week=1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn finished_batches_are_listed_and_fetchable() {
    let (_dir, app) = test_app(None).await;
    call(
        &app,
        post_json("/scrape/batch/2024", json!({"stats": ["team_offense", "passing"]})),
    )
    .await;

    let (status, listing) = call(&app, get("/scrape/jobs?status=completed_with_errors")).await;
    assert_eq!(status, StatusCode::OK);
    let jobs = listing["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    let id = jobs[0]["id"].as_i64().unwrap();

    let (status, job) = call(&app, get(&format!("/scrape/jobs/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["status"], "completed_with_errors");
    assert_eq!(job["requested_stats"], json!(["team_offense", "passing"]));
    assert_eq!(job["results"][1]["status"], "failed");

    let (status, _) = call(&app, get("/scrape/jobs?status=completed")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = call(&app, get("/scrape/jobs?status=exploded")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = call(&app, get("/scrape/jobs/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}
