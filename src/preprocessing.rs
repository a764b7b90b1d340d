//! Fitted preprocessing that sits in front of every tabular estimator.
//!
//! Numeric columns are standardized with the stored mean/scale and categorical
//! columns are one-hot encoded against the stored category list. Columns the
//! transformer does not name are ignored, so callers may pass extra columns.

use crate::features::{FeatureRow, FeatureValue};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Standardization parameters for one numeric column.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NumericColumn {
    pub column: String,
    pub mean: f64,
    pub scale: f64,
}

/// One-hot categories for one categorical column.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub column: String,
    pub categories: Vec<String>,
}

/// Numeric block first, then one block per categorical column.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ColumnTransformer {
    #[serde(default)]
    pub numeric: Vec<NumericColumn>,
    #[serde(default)]
    pub categorical: Vec<CategoricalColumn>,
}

impl ColumnTransformer {
    /// Scale values below this are treated as a constant column.
    const MIN_SCALE: f64 = 1e-12;

    /// Number of values `transform` produces.
    pub fn output_width(&self) -> usize {
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(|c| c.categories.len())
                .sum::<usize>()
    }

    /// Every input column this transformer reads.
    pub fn input_columns(&self) -> impl Iterator<Item = &str> {
        self.numeric
            .iter()
            .map(|c| c.column.as_str())
            .chain(self.categorical.iter().map(|c| c.column.as_str()))
    }

    /// Checks internal consistency after deserialization.
    pub fn validate(&self) -> Result<()> {
        if self.output_width() == 0 {
            bail!("preprocessor selects no columns");
        }
        for col in &self.numeric {
            if !col.mean.is_finite() || !col.scale.is_finite() {
                bail!("numeric column '{}' has non-finite mean/scale", col.column);
            }
        }
        for col in &self.categorical {
            if col.categories.is_empty() {
                bail!("categorical column '{}' has no categories", col.column);
            }
        }
        Ok(())
    }

    /// Transforms one row into the estimator's input vector.
    pub fn transform(&self, row: &FeatureRow) -> Result<Vec<f64>> {
        let mut out = Vec::with_capacity(self.output_width());

        for col in &self.numeric {
            let x = match row.get(&col.column) {
                Some(FeatureValue::Number(x)) => *x,
                Some(FeatureValue::Text(s)) => {
                    bail!("could not convert string to float: '{}' (column '{}')", s, col.column)
                }
                Some(FeatureValue::Missing) => {
                    bail!("column '{}' is null", col.column)
                }
                None => bail!("columns are missing: {{'{}'}}", col.column),
            };
            let scale = if col.scale.abs() < Self::MIN_SCALE {
                1.0
            } else {
                col.scale
            };
            out.push((x - col.mean) / scale);
        }

        for col in &self.categorical {
            let category = match row.get(&col.column) {
                Some(FeatureValue::Text(s)) => s.clone(),
                Some(FeatureValue::Number(n)) => n.to_string(),
                Some(FeatureValue::Missing) => {
                    bail!("column '{}' is null", col.column)
                }
                None => bail!("columns are missing: {{'{}'}}", col.column),
            };
            // Unknown categories encode as all zeros.
            out.extend(
                col.categories
                    .iter()
                    .map(|c| if *c == category { 1.0 } else { 0.0 }),
            );
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transformer() -> ColumnTransformer {
        ColumnTransformer {
            numeric: vec![
                NumericColumn {
                    column: "totalIncome".into(),
                    mean: 100.0,
                    scale: 50.0,
                },
                NumericColumn {
                    column: "savings".into(),
                    mean: 10.0,
                    scale: 0.0,
                },
            ],
            categorical: vec![CategoricalColumn {
                column: "topCategory".into(),
                categories: vec!["education".into(), "food".into(), "luxury".into()],
            }],
        }
    }

    fn row(category: &str) -> FeatureRow {
        let mut row = FeatureRow::new();
        row.push("totalIncome", FeatureValue::Number(200.0));
        row.push("savings", FeatureValue::Number(12.0));
        row.push("topCategory", FeatureValue::Text(category.into()));
        row.push("unused", FeatureValue::Text("ignored".into()));
        row
    }

    #[test]
    fn standardizes_and_one_hot_encodes() {
        let t = transformer();
        assert_eq!(t.output_width(), 5);
        let x = t.transform(&row("food")).unwrap();
        assert_eq!(x, vec![2.0, 2.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn unknown_category_is_all_zeros() {
        let x = transformer().transform(&row("donation")).unwrap();
        assert_eq!(&x[2..], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn text_in_numeric_column_fails() {
        let mut r = row("food");
        r.push("savings", FeatureValue::Text("lots".into()));
        let err = transformer().transform(&r).unwrap_err();
        assert!(err.to_string().contains("could not convert string to float"));
    }

    #[test]
    fn missing_selected_column_fails() {
        let t = ColumnTransformer {
            numeric: vec![NumericColumn {
                column: "tag".into(),
                mean: 0.0,
                scale: 1.0,
            }],
            categorical: vec![],
        };
        let err = t.transform(&row("food")).unwrap_err();
        assert!(err.to_string().contains("tag"));
    }

    #[test]
    fn validate_rejects_empty_transformer() {
        assert!(ColumnTransformer::default().validate().is_err());
        assert!(transformer().validate().is_ok());
    }
}
