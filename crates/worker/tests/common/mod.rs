//! Shared harness for worker integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use duoledger_classifier::{Classifier, ClassifierError, DynClassifier};
use duoledger_core::types::{DbId, Money};
use duoledger_db::models::spend_job::SubmitSpendJob;
use duoledger_db::repositories::{CategoryRepo, SpendJobRepo, UserRepo};
use duoledger_worker::reconcile::INTERRUPTED_MESSAGE;
use duoledger_worker::JobProcessor;
use serde_json::{json, Value};
use sqlx::PgPool;

pub const CLASSIFY_DEADLINE: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Fake classifiers
// ---------------------------------------------------------------------------

/// Returns the same payload for every prompt and records the prompts seen.
pub struct FixedClassifier {
    payload: Value,
    calls: AtomicUsize,
    last_prompt: std::sync::Mutex<Option<String>>,
}

impl FixedClassifier {
    pub fn new(payload: Value) -> Arc<Self> {
        Arc::new(Self {
            payload,
            calls: AtomicUsize::new(0),
            last_prompt: std::sync::Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl Classifier for FixedClassifier {
    async fn classify(&self, prompt: &str) -> Result<Value, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        Ok(self.payload.clone())
    }
}

/// Always fails with a 503 from the service.
pub struct UnavailableClassifier;

#[async_trait]
impl Classifier for UnavailableClassifier {
    async fn classify(&self, _prompt: &str) -> Result<Value, ClassifierError> {
        Err(ClassifierError::Status {
            status: 503,
            body: "upstream overloaded".into(),
        })
    }
}

/// Never answers.
pub struct HangingClassifier;

#[async_trait]
impl Classifier for HangingClassifier {
    async fn classify(&self, _prompt: &str) -> Result<Value, ClassifierError> {
        std::future::pending().await
    }
}

/// Panics on every call.
pub struct PanickingClassifier;

#[async_trait]
impl Classifier for PanickingClassifier {
    async fn classify(&self, _prompt: &str) -> Result<Value, ClassifierError> {
        panic!("classifier exploded");
    }
}

/// Answers with `payload`, but first fails every `processing` job the way
/// the reconciliation sweep does, so the worker loses its claim mid-flight.
pub struct InterruptingClassifier {
    pub pool: PgPool,
    pub payload: Value,
}

#[async_trait]
impl Classifier for InterruptingClassifier {
    async fn classify(&self, _prompt: &str) -> Result<Value, ClassifierError> {
        let cutoff = chrono::Utc::now() + chrono::Duration::minutes(1);
        SpendJobRepo::fail_stale_processing(&self.pool, cutoff, INTERRUPTED_MESSAGE)
            .await
            .unwrap();
        Ok(self.payload.clone())
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

pub fn groceries_and_bus(grocery_mode: &str) -> Value {
    json!({
        "is_ambiguous": false,
        "items": [
            {
                "apportion_mode": grocery_mode,
                "category": "Groceries",
                "amount": 60.0,
                "description": "Weekly groceries"
            },
            {
                "apportion_mode": "alone",
                "category": "Transport",
                "amount": 15.0,
                "description": "Bus ticket"
            }
        ]
    })
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

pub struct Household {
    pub buyer: DbId,
    pub partner: DbId,
}

/// Seed the default catalog used by the payload helpers.
pub async fn seed_categories(pool: &PgPool) {
    for name in ["Groceries", "Transport", "Dining"] {
        CategoryRepo::create(pool, name).await.unwrap();
    }
}

pub async fn single_buyer(pool: &PgPool) -> DbId {
    UserRepo::create(pool, "solo").await.unwrap().id
}

pub async fn household(pool: &PgPool) -> Household {
    let buyer = UserRepo::create(pool, "alice").await.unwrap().id;
    let partner = UserRepo::create(pool, "bob").await.unwrap().id;
    UserRepo::pair(pool, buyer, partner).await.unwrap();
    Household { buyer, partner }
}

pub fn submission(cents: i64, prompt: &str) -> SubmitSpendJob {
    SubmitSpendJob {
        amount: Money::new(cents, 2),
        prompt: prompt.to_string(),
        pre_settled: false,
        transaction_date: None,
    }
}

pub fn processor(pool: &PgPool, classifier: DynClassifier) -> JobProcessor {
    JobProcessor::new(pool.clone(), classifier, CLASSIFY_DEADLINE)
}

/// Count of spendings linked to a job.
pub async fn linked_spendings(pool: &PgPool, job_id: DbId) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM spend_job_spendings WHERE spend_job_id = $1")
        .bind(job_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Count of all user_spendings rows.
pub async fn total_user_spendings(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM user_spendings")
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Count of all spendings, linked or not.
pub async fn total_spendings(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM spendings")
        .fetch_one(pool)
        .await
        .unwrap()
}
