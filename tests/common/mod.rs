//! Shared fixtures: recording test doubles and request helpers.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use pocket_ml_api::artifacts::ModelContext;
use pocket_ml_api::config::ApiVariant;
use pocket_ml_api::features::{FeatureRow, FeatureValue, TAG_COLUMN};
use pocket_ml_api::handlers::AppState;
use pocket_ml_api::inference::{LabelEncoder, Predictor};
use pocket_ml_api::orchestrator::InferenceOrchestrator;
use pocket_ml_api::routes::build_router;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const CLASSES: [&str; 5] = [
    "Average Saver",
    "Balanced",
    "Big Spender",
    "Overspender",
    "Top Saver",
];

/// One model invocation as seen by a test double.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Classifier,
    /// The value of the `tag` column the regressor received.
    Regressor(Option<FeatureValue>),
    Reward(String),
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(log: &CallLog) -> Vec<Call> {
    log.lock().unwrap().clone()
}

pub struct StubClassifier {
    pub class_id: u32,
    pub log: CallLog,
}

impl Predictor<FeatureRow> for StubClassifier {
    type Output = u32;

    fn predict(&self, _row: &FeatureRow) -> anyhow::Result<u32> {
        self.log.lock().unwrap().push(Call::Classifier);
        Ok(self.class_id)
    }

    fn name(&self) -> &str {
        "stub_classifier"
    }
}

pub struct StubRegressor {
    pub score: f64,
    pub fail_with: Option<String>,
    pub log: CallLog,
}

impl Predictor<FeatureRow> for StubRegressor {
    type Output = f64;

    fn predict(&self, row: &FeatureRow) -> anyhow::Result<f64> {
        self.log
            .lock()
            .unwrap()
            .push(Call::Regressor(row.get(TAG_COLUMN).cloned()));
        match &self.fail_with {
            Some(message) => Err(anyhow::anyhow!("{}", message)),
            None => Ok(self.score),
        }
    }

    fn name(&self) -> &str {
        "stub_regressor"
    }
}

pub struct StubReward {
    pub value: f64,
    pub log: CallLog,
}

impl Predictor<str> for StubReward {
    type Output = f64;

    fn predict(&self, text: &str) -> anyhow::Result<f64> {
        self.log.lock().unwrap().push(Call::Reward(text.to_string()));
        Ok(self.value)
    }

    fn name(&self) -> &str {
        "stub_reward"
    }
}

/// Knobs for building a context out of test doubles.
pub struct Doubles {
    pub variant: ApiVariant,
    pub class_id: u32,
    pub score: f64,
    pub regressor_error: Option<String>,
    pub reward: f64,
}

impl Default for Doubles {
    fn default() -> Self {
        Self {
            variant: ApiVariant::Full,
            class_id: 1,
            score: 71.23456,
            regressor_error: None,
            reward: 8.765,
        }
    }
}

impl Doubles {
    pub fn build(self, log: &CallLog) -> InferenceOrchestrator {
        let encoder =
            LabelEncoder::new(CLASSES.iter().map(|c| c.to_string()).collect()).unwrap();
        let mut builder = ModelContext::builder(
            self.variant,
            Box::new(StubClassifier {
                class_id: self.class_id,
                log: log.clone(),
            }),
            encoder,
        );
        if self.variant.needs_regressor() {
            builder = builder.regressor(Box::new(StubRegressor {
                score: self.score,
                fail_with: self.regressor_error,
                log: log.clone(),
            }));
        }
        if self.variant.needs_reward_model() {
            builder = builder.reward_model(Box::new(StubReward {
                value: self.reward,
                log: log.clone(),
            }));
        }
        InferenceOrchestrator::new(Arc::new(builder.build().unwrap()))
    }

    pub fn router(self, log: &CallLog) -> Router {
        let orchestrator = self.build(log);
        build_router(Arc::new(AppState::new(orchestrator)), 1024 * 1024)
    }
}

/// A well-formed `/predict` body.
pub fn sample_payload() -> Value {
    json!({
        "totalIncome": 500.0,
        "totalExpense": 320.5,
        "savings": 179.5,
        "noOfTransactions": 12,
        "avgTransactionAmount": 26.71,
        "donatedAmount": 20.0,
        "foodSpend": 120.0,
        "educationSpend": 60.0,
        "entertainmentSpend": 80.5,
        "luxurySpend": 10.0,
        "otherSpend": 30.0,
        "topCategory": "food"
    })
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Sends one request and returns the status with the raw body.
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

pub async fn send_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}
