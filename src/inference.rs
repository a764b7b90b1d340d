//! Model families behind one prediction interface.

use crate::features::FeatureRow;
use crate::preprocessing::ColumnTransformer;
use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_classifier::RandomForestClassifier;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::LinearRegression;

/// Anything that turns an input into a prediction.
///
/// Implementations hold only immutable, fitted state, so one instance can be
/// shared by every request.
pub trait Predictor<I: ?Sized>: Send + Sync {
    type Output;

    fn predict(&self, input: &I) -> Result<Self::Output>;

    /// Short human readable model name for logs.
    fn name(&self) -> &str;
}

/// Tag classifier slot.
pub type DynClassifier = dyn Predictor<FeatureRow, Output = u32>;
/// Credit score regressor slot.
pub type DynRegressor = dyn Predictor<FeatureRow, Output = f64>;
/// Reward model slot.
pub type DynTextRegressor = dyn Predictor<str, Output = f64>;

/// On-disk shape of a tabular model: fitted preprocessing plus the estimator.
#[derive(Serialize, Deserialize)]
pub struct PipelineArtifact<E> {
    pub preprocessor: ColumnTransformer,
    pub estimator: E,
}

pub type ForestEstimator = RandomForestClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>>;
pub type LinearEstimator = LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>;

fn single_row_matrix(x: Vec<f64>) -> DenseMatrix<f64> {
    DenseMatrix::from_2d_vec(&vec![x])
}

/// Random forest tag classifier.
pub struct ForestClassifier {
    preprocessor: ColumnTransformer,
    forest: ForestEstimator,
}

impl ForestClassifier {
    pub fn new(artifact: PipelineArtifact<ForestEstimator>) -> Self {
        Self {
            preprocessor: artifact.preprocessor,
            forest: artifact.estimator,
        }
    }

    pub fn preprocessor(&self) -> &ColumnTransformer {
        &self.preprocessor
    }
}

impl Predictor<FeatureRow> for ForestClassifier {
    type Output = u32;

    fn predict(&self, row: &FeatureRow) -> Result<u32> {
        let x = self.preprocessor.transform(row)?;
        let predictions = self
            .forest
            .predict(&single_row_matrix(x))
            .map_err(|e| anyhow!("random forest prediction failed: {}", e))?;
        predictions
            .first()
            .copied()
            .ok_or_else(|| anyhow!("random forest returned no prediction"))
    }

    fn name(&self) -> &str {
        "random_forest_classifier"
    }
}

/// Linear credit score regressor.
pub struct LinearRegressor {
    preprocessor: ColumnTransformer,
    linear: LinearEstimator,
}

impl LinearRegressor {
    pub fn new(artifact: PipelineArtifact<LinearEstimator>) -> Self {
        Self {
            preprocessor: artifact.preprocessor,
            linear: artifact.estimator,
        }
    }

    pub fn preprocessor(&self) -> &ColumnTransformer {
        &self.preprocessor
    }
}

impl Predictor<FeatureRow> for LinearRegressor {
    type Output = f64;

    fn predict(&self, row: &FeatureRow) -> Result<f64> {
        let x = self.preprocessor.transform(row)?;
        let predictions = self
            .linear
            .predict(&single_row_matrix(x))
            .map_err(|e| anyhow!("linear regression prediction failed: {}", e))?;
        predictions
            .first()
            .copied()
            .ok_or_else(|| anyhow!("linear regression returned no prediction"))
    }

    fn name(&self) -> &str {
        "linear_regression"
    }
}

/// Bijection between tag labels and class ids.
///
/// Ids are positions in the sorted class list, matching how the classifier's
/// training targets were encoded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new(mut classes: Vec<String>) -> Result<Self> {
        classes.sort();
        let encoder = Self { classes };
        encoder.validate()?;
        Ok(encoder)
    }

    /// Rejects empty, duplicated or unsorted class lists.
    ///
    /// Ids are indices into the sorted list.
    pub fn validate(&self) -> Result<()> {
        if self.classes.is_empty() {
            bail!("label encoder has no classes");
        }
        if let Some(pair) = self.classes.windows(2).find(|w| w[0] == w[1]) {
            bail!("label encoder classes are not unique: '{}'", pair[0]);
        }
        if let Some(pair) = self.classes.windows(2).find(|w| w[0] > w[1]) {
            bail!(
                "label encoder classes are not sorted: '{}' comes before '{}'",
                pair[0],
                pair[1]
            );
        }
        Ok(())
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn inverse_transform(&self, class_id: u32) -> Result<&str> {
        self.classes
            .get(class_id as usize)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("y contains previously unseen labels: [{}]", class_id))
    }

    pub fn transform(&self, label: &str) -> Result<u32> {
        self.classes
            .iter()
            .position(|c| c == label)
            .map(|i| i as u32)
            .ok_or_else(|| anyhow!("y contains previously unseen labels: ['{}']", label))
    }
}
