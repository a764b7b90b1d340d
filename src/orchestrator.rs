//! Per-request sequencing of model calls.

use crate::artifacts::ModelContext;
use crate::config::ApiVariant;
use crate::errors::{AppError, ResultExt};
use crate::features::{self, FeatureRow};
use crate::models::{round2, CreditScorePrediction, PredictResponse, RewardResponse, TagPrediction};
use serde_json::Value;
use std::sync::Arc;

/// Runs the ordered model invocations for each route.
///
/// Holds only a shared handle to the read-only [`ModelContext`]; every call is
/// independent of every other call.
#[derive(Clone)]
pub struct InferenceOrchestrator {
    models: Arc<ModelContext>,
}

impl InferenceOrchestrator {
    pub fn new(models: Arc<ModelContext>) -> Self {
        Self { models }
    }

    pub fn models(&self) -> &ModelContext {
        &self.models
    }

    pub fn variant(&self) -> ApiVariant {
        self.models.variant()
    }

    /// `/predict` for whichever variant this process serves.
    pub fn predict(&self, payload: &Value) -> Result<PredictResponse, AppError> {
        match self.variant() {
            ApiVariant::Tag => self.classify_only(payload),
            ApiVariant::Credit | ApiVariant::Full => self.classify_then_score(payload),
        }
    }

    /// Tag only.
    pub fn classify_only(&self, payload: &Value) -> Result<PredictResponse, AppError> {
        let row = features::adapt(payload)?;
        let tag = self.classify(&row)?;

        Ok(PredictResponse {
            predicted_tag: tag.label,
            predicted_credit_score: None,
        })
    }

    /// Tag, then credit score with the encoded tag as an extra feature.
    pub fn classify_then_score(&self, payload: &Value) -> Result<PredictResponse, AppError> {
        let row = features::adapt(payload)?;
        let tag = self.classify(&row)?;
        let score = self.score(&row, &tag)?;

        tracing::debug!(
            tag = %tag.label,
            class_id = tag.class_id,
            raw_score = score.raw,
            "Credit score computed"
        );

        Ok(PredictResponse {
            predicted_tag: tag.label,
            predicted_credit_score: Some(score.rounded),
        })
    }

    /// Scores a free-text activity with the transformer model.
    ///
    /// Blocking; callers on an async runtime should move this off the reactor.
    pub fn reward_score(&self, payload: &Value) -> Result<RewardResponse, AppError> {
        let activity = match payload.get("activity") {
            None | Some(Value::Null) => return Err(AppError::missing_activity()),
            Some(Value::String(s)) if s.is_empty() => return Err(AppError::missing_activity()),
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(AppError::Inference(format!(
                    "'activity' must be a string, got {}",
                    other
                )))
            }
        };

        let model = self.models.reward_model().ok_or_else(|| {
            AppError::Inference("reward model is not loaded".to_string())
        })?;

        let raw = model.predict(&activity).context("reward model")?;
        if !raw.is_finite() {
            return Err(AppError::Inference(format!(
                "{} produced a non-finite reward",
                model.name()
            )));
        }

        Ok(RewardResponse {
            activity,
            predicted_reward: round2(raw),
        })
    }

    fn classify(&self, row: &FeatureRow) -> Result<TagPrediction, AppError> {
        let classifier = self.models.classifier();
        let class_id = classifier
            .predict(row)
            .with_context(|| format!("{} inference", classifier.name()))?;
        let label = self
            .models
            .label_encoder()
            .inverse_transform(class_id)
            .context("label decoding")?
            .to_string();

        Ok(TagPrediction { class_id, label })
    }

    fn score(&self, row: &FeatureRow, tag: &TagPrediction) -> Result<CreditScorePrediction, AppError> {
        let regressor = self.models.regressor().ok_or_else(|| {
            AppError::Inference("credit score regressor is not loaded".to_string())
        })?;

        // The regressor sees the encoded id, never the label.
        let augmented = row.with_tag(tag.class_id);
        let raw = regressor
            .predict(&augmented)
            .with_context(|| format!("{} inference", regressor.name()))?;
        if !raw.is_finite() {
            return Err(AppError::Inference(format!(
                "{} produced a non-finite credit score",
                regressor.name()
            )));
        }

        Ok(CreditScorePrediction::new(raw))
    }
}
