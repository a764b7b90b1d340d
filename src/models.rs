use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============ Request Models ============

/// Weekly household activity summary, in the column names the models were fit on.
///
/// `/predict` reads its body as a raw JSON object so that presence can be
/// checked key by key; this struct documents that body and is what
/// `/summary` produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest {
    pub total_income: f64,
    pub total_expense: f64,
    pub savings: f64,
    pub no_of_transactions: f64,
    pub avg_transaction_amount: f64,
    pub donated_amount: f64,
    pub food_spend: f64,
    pub education_spend: f64,
    pub entertainment_spend: f64,
    pub luxury_spend: f64,
    pub other_spend: f64,
    /// Spending category with the largest amount.
    #[schema(example = "food")]
    pub top_category: String,
}

/// Body of `POST /reward`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RewardRequest {
    /// Free-text description of what the child did.
    #[schema(example = "Helped grandma clean the garden")]
    pub activity: String,
}

// ============ Prediction Values ============

/// Classifier output for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPrediction {
    /// Raw class id as produced by the classifier; fed to the regressor.
    pub class_id: u32,
    /// Human readable label from the label encoder.
    pub label: String,
}

/// Regressor output for one request, already rounded for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreditScorePrediction {
    pub raw: f64,
    pub rounded: f64,
}

impl CreditScorePrediction {
    pub fn new(raw: f64) -> Self {
        Self {
            raw,
            rounded: round2(raw),
        }
    }
}

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============ Response Models ============

/// `/predict` result. The credit score is present for the credit and full variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PredictResponse {
    #[schema(example = "Average Saver")]
    pub predicted_tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 72.35)]
    pub predicted_credit_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RewardResponse {
    pub activity: String,
    #[schema(example = 12.5)]
    pub predicted_reward: f64,
}

/// Fingerprint of one loaded artifact, reported by `/health`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ArtifactInfo {
    /// `classifier`, `regressor`, `label_encoder` or `reward_model`.
    pub kind: String,
    pub path: String,
    /// Hex SHA-256 of the file (for directories, of the weights file).
    pub sha256: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    /// `tag`, `credit` or `full`.
    pub variant: String,
    /// RFC 3339 timestamp of when the models finished loading.
    pub started_at: String,
    pub artifacts: Vec<ArtifactInfo>,
}
