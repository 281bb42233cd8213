#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use duoledger_classifier::{Classifier, ClassifierError, DynClassifier};
use duoledger_core::types::DbId;
use duoledger_db::repositories::{CategoryRepo, UserRepo};
use duoledger_worker::{JobProcessor, JobQueue, SubmissionService, WorkerPool};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use duoledger_api::config::ServerConfig;
use duoledger_api::router::build_app_router;
use duoledger_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
    }
}

// ---------------------------------------------------------------------------
// App builders
// ---------------------------------------------------------------------------

/// Full app whose submissions go into `queue`. Nothing consumes the queue
/// unless the caller does.
pub fn build_app_with_queue(pool: PgPool, queue: JobQueue) -> Router {
    let config = test_config();
    let submissions = Arc::new(SubmissionService::new(
        pool.clone(),
        queue,
        Duration::from_millis(50),
    ));
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        submissions,
    };
    build_app_router(state, &config)
}

/// Full app with a running worker pool behind `classifier`.
pub fn build_pipeline_app(pool: PgPool, classifier: DynClassifier) -> Router {
    let (queue, receiver) = JobQueue::bounded(16);
    let processor = Arc::new(JobProcessor::new(
        pool.clone(),
        classifier,
        Duration::from_secs(5),
    ));
    // Workers live as long as the test runtime.
    let _workers = WorkerPool::start(processor, receiver, 2, CancellationToken::new());
    build_app_with_queue(pool, queue)
}

/// Full app whose classifier finds no line items.
pub fn build_test_app(pool: PgPool) -> Router {
    build_pipeline_app(pool, Arc::new(StaticClassifier(json!({"items": []}))))
}

// ---------------------------------------------------------------------------
// Fakes and fixtures
// ---------------------------------------------------------------------------

/// Answers every prompt with the same payload.
pub struct StaticClassifier(pub Value);

#[async_trait]
impl Classifier for StaticClassifier {
    async fn classify(&self, _prompt: &str) -> Result<Value, ClassifierError> {
        Ok(self.0.clone())
    }
}

pub fn groceries_and_bus() -> Value {
    json!({
        "is_ambiguous": false,
        "items": [
            {"apportion_mode": "shared", "category": "Groceries", "amount": 60.0, "description": "Weekly groceries"},
            {"apportion_mode": "alone", "category": "Transport", "amount": 15.0, "description": "Bus ticket"}
        ]
    })
}

pub async fn seed_categories(pool: &PgPool) {
    for name in ["Groceries", "Transport"] {
        CategoryRepo::create(pool, name).await.unwrap();
    }
}

pub async fn create_user(pool: &PgPool, name: &str) -> DbId {
    UserRepo::create(pool, name).await.unwrap().id
}

/// Two paired users: `(buyer, partner)`.
pub async fn create_household(pool: &PgPool) -> (DbId, DbId) {
    let buyer = create_user(pool, "alice").await;
    let partner = create_user(pool, "bob").await;
    UserRepo::pair(pool, buyer, partner).await.unwrap();
    (buyer, partner)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_as(app: Router, uri: &str, user_id: DbId) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("x-user-id", user_id.to_string())
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json_as(app: Router, uri: &str, user_id: DbId, body: Value) -> Response<Body> {
    post_raw_as(app, uri, user_id, body.to_string()).await
}

pub async fn post_raw_as(app: Router, uri: &str, user_id: DbId, body: String) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-user-id", user_id.to_string())
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Poll a job until it is finished and return its `data` object.
pub async fn wait_until_finished(app: &Router, job_id: DbId, user_id: DbId) -> Value {
    let uri = format!("/api/v1/spend-jobs/{job_id}");
    for _ in 0..100 {
        let json = body_json(get_as(app.clone(), &uri, user_id).await).await;
        if json["data"]["is_finished"] == true {
            return json["data"].clone();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("job {job_id} did not finish in time");
}
