//! Artifact store: loads every model once at startup into an immutable context.

use crate::config::{ApiVariant, Config};
use crate::errors::StartupError;
use crate::inference::{
    DynClassifier, DynRegressor, DynTextRegressor, ForestClassifier, ForestEstimator,
    LabelEncoder, LinearEstimator, LinearRegressor, PipelineArtifact,
};
use crate::models::ArtifactInfo;
use crate::reward::{select_device, BertRegressor, RewardModelFiles};
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::path::Path;

pub const CLASSIFIER: &str = "classifier";
pub const REGRESSOR: &str = "regressor";
pub const LABEL_ENCODER: &str = "label_encoder";
pub const REWARD_MODEL: &str = "reward_model";

/// Every loaded model for one process.
///
/// Built once, shared behind an `Arc`, never mutated afterwards.
pub struct ModelContext {
    variant: ApiVariant,
    classifier: Box<DynClassifier>,
    label_encoder: LabelEncoder,
    regressor: Option<Box<DynRegressor>>,
    reward_model: Option<Box<DynTextRegressor>>,
    artifacts: Vec<ArtifactInfo>,
}

impl ModelContext {
    pub fn builder(
        variant: ApiVariant,
        classifier: Box<DynClassifier>,
        label_encoder: LabelEncoder,
    ) -> ModelContextBuilder {
        ModelContextBuilder {
            variant,
            classifier,
            label_encoder,
            regressor: None,
            reward_model: None,
            artifacts: Vec::new(),
        }
    }

    /// Loads the artifacts the configured variant needs.
    ///
    /// Any missing or unreadable artifact aborts startup.
    pub fn load(config: &Config) -> Result<Self, StartupError> {
        let variant = config.variant;

        let (label_encoder, encoder_info) =
            load_json::<LabelEncoder>(LABEL_ENCODER, &config.label_encoder_path)?;
        label_encoder
            .validate()
            .map_err(|e| invalid(LABEL_ENCODER, &config.label_encoder_path, e))?;
        tracing::info!(
            "Label encoder loaded: {} classes ({})",
            label_encoder.classes().len(),
            short_digest(&encoder_info)
        );

        let (classifier, classifier_info) =
            load_json::<PipelineArtifact<ForestEstimator>>(CLASSIFIER, &config.classifier_path)?;
        classifier
            .preprocessor
            .validate()
            .map_err(|e| invalid(CLASSIFIER, &config.classifier_path, e))?;
        tracing::info!(
            "Classifier loaded: {} input features ({})",
            classifier.preprocessor.output_width(),
            short_digest(&classifier_info)
        );

        let mut builder = ModelContext::builder(
            variant,
            Box::new(ForestClassifier::new(classifier)),
            label_encoder,
        )
        .artifact(encoder_info)
        .artifact(classifier_info);

        if variant.needs_regressor() {
            let (regressor, regressor_info) =
                load_json::<PipelineArtifact<LinearEstimator>>(REGRESSOR, &config.regressor_path)?;
            regressor
                .preprocessor
                .validate()
                .map_err(|e| invalid(REGRESSOR, &config.regressor_path, e))?;
            if !regressor
                .preprocessor
                .input_columns()
                .any(|c| c == crate::features::TAG_COLUMN)
            {
                tracing::warn!(
                    "Regressor preprocessing does not read the '{}' column; the predicted tag will not influence the credit score",
                    crate::features::TAG_COLUMN
                );
            }
            tracing::info!(
                "Regressor loaded: {} input features ({})",
                regressor.preprocessor.output_width(),
                short_digest(&regressor_info)
            );
            builder = builder
                .regressor(Box::new(LinearRegressor::new(regressor)))
                .artifact(regressor_info);
        }

        if variant.needs_reward_model() {
            let files = RewardModelFiles::in_dir(&config.reward_model_dir);
            for path in files.iter() {
                require_file(REWARD_MODEL, path)?;
            }
            let weights_info = fingerprint(REWARD_MODEL, &files.weights)?;
            let device =
                select_device(config.device).map_err(|e| StartupError::Device(format!("{:#}", e)))?;
            tracing::info!("Loading reward model on {:?}", device);
            let model = BertRegressor::load(&files, device).map_err(|e| {
                invalid(REWARD_MODEL, &config.reward_model_dir, e)
            })?;
            tracing::info!("Reward model loaded ({})", short_digest(&weights_info));
            builder = builder.reward_model(Box::new(model)).artifact(weights_info);
        }

        builder.build()
    }

    pub fn variant(&self) -> ApiVariant {
        self.variant
    }

    pub fn classifier(&self) -> &DynClassifier {
        self.classifier.as_ref()
    }

    pub fn label_encoder(&self) -> &LabelEncoder {
        &self.label_encoder
    }

    pub fn regressor(&self) -> Option<&DynRegressor> {
        self.regressor.as_deref()
    }

    pub fn reward_model(&self) -> Option<&DynTextRegressor> {
        self.reward_model.as_deref()
    }

    pub fn artifacts(&self) -> &[ArtifactInfo] {
        &self.artifacts
    }
}

/// Assembles a [`ModelContext`] and checks it against the variant.
pub struct ModelContextBuilder {
    variant: ApiVariant,
    classifier: Box<DynClassifier>,
    label_encoder: LabelEncoder,
    regressor: Option<Box<DynRegressor>>,
    reward_model: Option<Box<DynTextRegressor>>,
    artifacts: Vec<ArtifactInfo>,
}

impl ModelContextBuilder {
    pub fn regressor(mut self, regressor: Box<DynRegressor>) -> Self {
        self.regressor = Some(regressor);
        self
    }

    pub fn reward_model(mut self, model: Box<DynTextRegressor>) -> Self {
        self.reward_model = Some(model);
        self
    }

    pub fn artifact(mut self, info: ArtifactInfo) -> Self {
        self.artifacts.push(info);
        self
    }

    pub fn build(self) -> Result<ModelContext, StartupError> {
        if self.variant.needs_regressor() && self.regressor.is_none() {
            return Err(StartupError::IncompleteContext(format!(
                "variant '{}' requires a credit score regressor",
                self.variant
            )));
        }
        if self.variant.needs_reward_model() && self.reward_model.is_none() {
            return Err(StartupError::IncompleteContext(format!(
                "variant '{}' requires a reward model",
                self.variant
            )));
        }

        Ok(ModelContext {
            variant: self.variant,
            classifier: self.classifier,
            label_encoder: self.label_encoder,
            regressor: self.regressor,
            reward_model: self.reward_model,
            artifacts: self.artifacts,
        })
    }
}

fn invalid(kind: &'static str, path: &Path, reason: impl std::fmt::Display) -> StartupError {
    StartupError::InvalidArtifact {
        kind,
        path: path.to_path_buf(),
        reason: format!("{:#}", reason),
    }
}

fn require_file(kind: &'static str, path: &Path) -> Result<(), StartupError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(StartupError::MissingArtifact {
            kind,
            path: path.to_path_buf(),
        })
    }
}

/// SHA-256 of a file, streamed so large weight files are not held in memory.
pub fn fingerprint(kind: &'static str, path: &Path) -> Result<ArtifactInfo, StartupError> {
    require_file(kind, path)?;
    let mut file = File::open(path).map_err(|e| invalid(kind, path, e))?;
    let mut hasher = Sha256::new();
    let bytes = std::io::copy(&mut file, &mut hasher).map_err(|e| invalid(kind, path, e))?;

    Ok(ArtifactInfo {
        kind: kind.to_string(),
        path: path.display().to_string(),
        sha256: hex::encode(hasher.finalize()),
        bytes,
    })
}

/// Reads and parses a JSON artifact, returning it with its fingerprint.
pub fn load_json<T: DeserializeOwned>(
    kind: &'static str,
    path: &Path,
) -> Result<(T, ArtifactInfo), StartupError> {
    require_file(kind, path)?;
    let raw = std::fs::read(path).map_err(|e| invalid(kind, path, e))?;
    let value = serde_json::from_slice(&raw).map_err(|e| invalid(kind, path, e))?;

    let mut hasher = Sha256::new();
    hasher.update(&raw);
    let info = ArtifactInfo {
        kind: kind.to_string(),
        path: path.display().to_string(),
        sha256: hex::encode(hasher.finalize()),
        bytes: raw.len() as u64,
    };

    Ok((value, info))
}

fn short_digest(info: &ArtifactInfo) -> String {
    format!("sha256:{}", &info.sha256[..12.min(info.sha256.len())])
}
