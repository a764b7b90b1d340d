use crate::errors::AppError;
use crate::models::*;
use crate::orchestrator::InferenceOrchestrator;
use crate::summary::{summarize, SummaryRequest};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

pub const WELCOME_MESSAGE: &str = "Welcome to the pocket money inference server!";

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Sequences model calls over the process-wide model context.
    pub orchestrator: InferenceOrchestrator,
    /// When the models finished loading.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(orchestrator: InferenceOrchestrator) -> Self {
        Self {
            orchestrator,
            started_at: Utc::now(),
        }
    }
}

/// Body parse failures are not missing-field errors; they surface as 500.
fn unparsable(rejection: JsonRejection) -> AppError {
    AppError::Inference(rejection.body_text())
}

/// GET /
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Plain-text welcome message", body = String)),
    tag = "service"
)]
pub async fn home() -> &'static str {
    WELCOME_MESSAGE
}

/// Health check endpoint.
///
/// Reports the served variant and the fingerprint of every loaded artifact.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "service"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let models = state.orchestrator.models();
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            variant: models.variant().to_string(),
            started_at: state.started_at.to_rfc3339(),
            artifacts: models.artifacts().to_vec(),
        }),
    )
}

/// POST /predict
///
/// Classifies the spending tag and, outside the tag-only variant, predicts the
/// credit score from the same features plus the encoded tag.
#[utoipa::path(
    post,
    path = "/predict",
    request_body = PredictionRequest,
    responses(
        (status = 200, description = "Predicted tag, plus credit score for the credit and full variants", body = PredictResponse),
        (status = 400, description = "One or more required fields missing", body = crate::errors::ErrorBody),
        (status = 500, description = "Adaptation or model failure", body = crate::errors::ErrorBody)
    ),
    tag = "inference"
)]
pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictResponse>, AppError> {
    let request_id = Uuid::new_v4();
    tracing::info!(%request_id, "POST /predict");

    let Json(payload) = body.map_err(unparsable)?;
    let response = state.orchestrator.predict(&payload)?;

    tracing::info!(
        %request_id,
        tag = %response.predicted_tag,
        credit_score = ?response.predicted_credit_score,
        "Prediction served"
    );

    Ok(Json(response))
}

/// POST /reward
///
/// Runs the transformer on a blocking thread; the computation finishes even if
/// the client goes away.
#[utoipa::path(
    post,
    path = "/reward",
    request_body = RewardRequest,
    responses(
        (status = 200, description = "Predicted reward", body = RewardResponse),
        (status = 400, description = "Missing or empty activity", body = crate::errors::ErrorBody),
        (status = 500, description = "Tokenization or model failure", body = crate::errors::ErrorBody)
    ),
    tag = "inference"
)]
pub async fn reward(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<RewardResponse>, AppError> {
    let request_id = Uuid::new_v4();
    tracing::info!(%request_id, "POST /reward");

    let Json(payload) = body.map_err(unparsable)?;
    let orchestrator = state.orchestrator.clone();
    let response = tokio::task::spawn_blocking(move || orchestrator.reward_score(&payload))
        .await
        .map_err(|e| AppError::Inference(format!("reward task failed: {}", e)))??;

    tracing::info!(%request_id, reward = response.predicted_reward, "Reward served");

    Ok(Json(response))
}

/// POST /summary
///
/// Builds the `/predict` body from a week of pocket money and transactions.
#[utoipa::path(
    post,
    path = "/summary",
    request_body = SummaryRequest,
    responses(
        (status = 200, description = "Weekly feature summary", body = PredictionRequest),
        (status = 400, description = "Malformed transaction list", body = crate::errors::ErrorBody)
    ),
    tag = "service"
)]
pub async fn summary(
    body: Result<Json<SummaryRequest>, JsonRejection>,
) -> Result<Json<PredictionRequest>, AppError> {
    let Json(request) = body.map_err(|e| AppError::Validation(e.body_text()))?;
    tracing::debug!(
        "POST /summary - {} transactions, {} pocket money entries",
        request.transactions.len(),
        request.pocket_money.len()
    );
    Ok(Json(summarize(&request)))
}
