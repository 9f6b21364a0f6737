//! Feature schema resolution.
//!
//! Given a [`Dataset`] and a target column, [`resolve`] partitions every other
//! column into numeric and categorical features and derives the values a
//! user is offered when filling in a prediction form:
//!
//! - numeric features default to the arithmetic mean of their observed values
//! - categorical features offer their distinct observed values, in the order
//!   they first appear
//!
//! Resolution is pure and deterministic, so it can be rerun every time the
//! target or the excluded columns change. A schema's [`SchemaFingerprint`] is
//! what ties a trained model to the schema it was trained under.

use polars::prelude::{DataType, Series};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

use crate::dataset::{ColumnKind, Dataset};
use crate::error::SchemaError;

/// How a feature is presented and what value it defaults to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureKind {
    Numeric { mean: f64 },
    Categorical { candidates: Vec<String> },
}

impl FeatureKind {
    #[must_use]
    pub fn column_kind(&self) -> ColumnKind {
        match self {
            FeatureKind::Numeric { .. } => ColumnKind::Numeric,
            FeatureKind::Categorical { .. } => ColumnKind::Categorical,
        }
    }
}

/// One non-target column of the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    /// Polars dtype the column had in the dataset.
    pub dtype: String,
    #[serde(flatten)]
    pub kind: FeatureKind,
}

impl FeatureSpec {
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, FeatureKind::Numeric { .. })
    }

    /// The mean for numeric features.
    #[must_use]
    pub fn default_number(&self) -> Option<f64> {
        match self.kind {
            FeatureKind::Numeric { mean } => Some(mean),
            FeatureKind::Categorical { .. } => None,
        }
    }

    /// Observed values for categorical features.
    #[must_use]
    pub fn candidates(&self) -> Option<&[String]> {
        match &self.kind {
            FeatureKind::Categorical { candidates } => Some(candidates),
            FeatureKind::Numeric { .. } => None,
        }
    }
}

/// The features of a dataset relative to a chosen target, in dataset order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    target: String,
    excluded: Vec<String>,
    features: Vec<FeatureSpec>,
}

impl FeatureSchema {
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Columns dropped by the user before resolution.
    #[must_use]
    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    #[must_use]
    pub fn features(&self) -> &[FeatureSpec] {
        &self.features
    }

    #[must_use]
    pub fn feature(&self, name: &str) -> Option<&FeatureSpec> {
        self.features.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn feature_names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn numeric_features(&self) -> impl Iterator<Item = &FeatureSpec> {
        self.features.iter().filter(|f| f.is_numeric())
    }

    pub fn categorical_features(&self) -> impl Iterator<Item = &FeatureSpec> {
        self.features.iter().filter(|f| !f.is_numeric())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// SHA-256 over the schema's canonical JSON encoding.
    #[must_use]
    pub fn fingerprint(&self) -> SchemaFingerprint {
        // Serializing plain strings, floats and vectors cannot fail.
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let digest = Sha256::digest(&canonical);
        SchemaFingerprint(digest.iter().map(|b| format!("{:02x}", b)).collect())
    }
}

/// Structural digest of a [`FeatureSchema`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaFingerprint(String);

impl SchemaFingerprint {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex digits, enough to tell schemas apart in logs.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for SchemaFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}

/// Resolve the feature schema for `target` over every other column.
pub fn resolve(dataset: &Dataset, target: &str) -> Result<FeatureSchema, SchemaError> {
    resolve_excluding(dataset, target, &[])
}

/// Resolve the feature schema, ignoring the `excluded` columns.
pub fn resolve_excluding(
    dataset: &Dataset,
    target: &str,
    excluded: &[String],
) -> Result<FeatureSchema, SchemaError> {
    let target_series = dataset.series(target)?;
    if ColumnKind::of(target_series.dtype()) != ColumnKind::Numeric {
        return Err(SchemaError::NonNumericTarget {
            column: target.to_string(),
            dtype: target_series.dtype().to_string(),
        });
    }

    for name in excluded {
        if name == target {
            return Err(SchemaError::ExcludedTarget(name.clone()));
        }
        if !dataset.has_column(name) {
            return Err(SchemaError::UnknownColumn(name.clone()));
        }
    }

    let mut features = Vec::with_capacity(dataset.width().saturating_sub(1));
    for name in dataset.column_names() {
        if name == target || excluded.contains(&name) {
            continue;
        }

        let series = dataset.series(&name)?;
        let kind = match ColumnKind::of(series.dtype()) {
            ColumnKind::Numeric => FeatureKind::Numeric {
                mean: observed_mean(series, &name)?,
            },
            ColumnKind::Categorical => FeatureKind::Categorical {
                candidates: observed_values(series, &name)?,
            },
        };

        features.push(FeatureSpec {
            dtype: series.dtype().to_string(),
            name,
            kind,
        });
    }

    debug!(
        "Resolved schema for target '{}': {} numeric, {} categorical, {} excluded",
        target,
        features.iter().filter(|f| f.is_numeric()).count(),
        features.iter().filter(|f| !f.is_numeric()).count(),
        excluded.len()
    );

    // Sorted so the fingerprint does not depend on the order columns were picked.
    let mut excluded = excluded.to_vec();
    excluded.sort();
    excluded.dedup();

    Ok(FeatureSchema {
        target: target.to_string(),
        excluded,
        features,
    })
}

/// Mean of the non-null, non-NaN values of a numeric series.
fn observed_mean(series: &Series, name: &str) -> Result<f64, SchemaError> {
    let floats = series
        .cast(&DataType::Float64)
        .map_err(|e| column_read_error(name, e))?;
    let values = floats.f64().map_err(|e| column_read_error(name, e))?;

    let (sum, count) = values
        .into_iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .fold((0.0_f64, 0_usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        return Err(SchemaError::EmptyNumericColumn(name.to_string()));
    }
    Ok(sum / count as f64)
}

/// Distinct non-null values of a series as text, in first-seen order.
fn observed_values(series: &Series, name: &str) -> Result<Vec<String>, SchemaError> {
    let text = series
        .cast(&DataType::String)
        .map_err(|e| column_read_error(name, e))?;
    let values = text.str().map_err(|e| column_read_error(name, e))?;

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for value in values.into_iter().flatten() {
        if seen.insert(value) {
            candidates.push(value.to_string());
        }
    }

    if candidates.is_empty() {
        return Err(SchemaError::EmptyCategoricalColumn(name.to_string()));
    }
    Ok(candidates)
}

fn column_read_error(name: &str, err: impl fmt::Display) -> SchemaError {
    SchemaError::ColumnRead {
        column: name.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use pretty_assertions::assert_eq;

    fn sales() -> Dataset {
        let df = df! {
            "age" => &[30i64, 40, 35, 36, 35],
            "city" => &["NY", "LA", "NY", "LA", "NY"],
            "revenue" => &[100.0f64, 200.0, 150.0, 175.0, 160.0],
        }
        .unwrap();
        Dataset::new(df)
    }

    #[test]
    fn test_resolve_numeric_and_categorical() {
        let schema = resolve(&sales(), "revenue").unwrap();

        assert_eq!(schema.target(), "revenue");
        assert_eq!(schema.feature_names(), vec!["age", "city"]);
        assert_eq!(
            schema.feature("age").unwrap().kind,
            FeatureKind::Numeric { mean: 35.2 }
        );
        assert_eq!(
            schema.feature("city").unwrap().kind,
            FeatureKind::Categorical {
                candidates: vec!["NY".to_string(), "LA".to_string()]
            }
        );
    }

    #[test]
    fn test_non_numeric_target_rejected() {
        let err = resolve(&sales(), "city").unwrap_err();
        assert!(matches!(err, SchemaError::NonNumericTarget { ref column, .. } if column == "city"));
    }

    #[test]
    fn test_unknown_target_rejected() {
        let err = resolve(&sales(), "profit").unwrap_err();
        assert_eq!(err, SchemaError::UnknownColumn("profit".to_string()));
    }

    #[test]
    fn test_mean_ignores_nulls() {
        let df = df! {
            "x" => &[Some(1.0f64), None, Some(3.0)],
            "y" => &[1i32, 2, 3],
        }
        .unwrap();
        let schema = resolve(&Dataset::new(df), "y").unwrap();
        assert_eq!(schema.feature("x").unwrap().default_number(), Some(2.0));
    }

    #[test]
    fn test_all_null_numeric_column_rejected() {
        let df = df! {
            "x" => &[None::<f64>, None],
            "y" => &[1i32, 2],
        }
        .unwrap();
        let err = resolve(&Dataset::new(df), "y").unwrap_err();
        assert_eq!(err, SchemaError::EmptyNumericColumn("x".to_string()));
    }

    #[test]
    fn test_all_null_categorical_column_rejected() {
        let df = df! {
            "label" => &[None::<&str>, None],
            "y" => &[1i32, 2],
        }
        .unwrap();
        let err = resolve(&Dataset::new(df), "y").unwrap_err();
        assert_eq!(err, SchemaError::EmptyCategoricalColumn("label".to_string()));
    }

    #[test]
    fn test_empty_dataset_rejects_features() {
        let df = df! {
            "x" => Vec::<f64>::new(),
            "y" => Vec::<f64>::new(),
        }
        .unwrap();
        let err = resolve(&Dataset::new(df), "y").unwrap_err();
        assert_eq!(err, SchemaError::EmptyNumericColumn("x".to_string()));
    }

    #[test]
    fn test_boolean_column_is_categorical() {
        let df = df! {
            "flag" => &[true, false, true],
            "y" => &[1.0f64, 2.0, 3.0],
        }
        .unwrap();
        let schema = resolve(&Dataset::new(df), "y").unwrap();
        assert_eq!(
            schema.feature("flag").unwrap().candidates(),
            Some(&["true".to_string(), "false".to_string()][..])
        );
    }

    #[test]
    fn test_excluded_columns_are_dropped() {
        let schema = resolve_excluding(&sales(), "revenue", &["city".to_string()]).unwrap();
        assert_eq!(schema.feature_names(), vec!["age"]);
        assert_eq!(schema.excluded(), &["city".to_string()]);
    }

    #[test]
    fn test_fingerprint_ignores_exclusion_order() {
        let df = df! {
            "store_id" => &[1i64, 2, 3],
            "age" => &[30i64, 40, 35],
            "city" => &["NY", "LA", "NY"],
            "revenue" => &[100.0f64, 200.0, 150.0],
        }
        .unwrap();
        let dataset = Dataset::new(df);

        let a = resolve_excluding(&dataset, "revenue", &["store_id".to_string(), "city".to_string()])
            .unwrap();
        let b = resolve_excluding(
            &dataset,
            "revenue",
            &["city".to_string(), "store_id".to_string(), "city".to_string()],
        )
        .unwrap();

        assert_eq!(a.excluded(), &["city".to_string(), "store_id".to_string()]);
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_excluding_target_rejected() {
        let err = resolve_excluding(&sales(), "revenue", &["revenue".to_string()]).unwrap_err();
        assert_eq!(err, SchemaError::ExcludedTarget("revenue".to_string()));

        let err = resolve_excluding(&sales(), "revenue", &["zip".to_string()]).unwrap_err();
        assert_eq!(err, SchemaError::UnknownColumn("zip".to_string()));
    }

    #[test]
    fn test_target_only_dataset_has_empty_schema() {
        let df = df! { "y" => &[1.0f64, 2.0] }.unwrap();
        let schema = resolve(&Dataset::new(df), "y").unwrap();
        assert!(schema.is_empty());
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = resolve(&sales(), "revenue").unwrap().fingerprint();
        let b = resolve(&sales(), "revenue").unwrap().fingerprint();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert_eq!(a.to_string().len(), 12);
    }

    #[test]
    fn test_fingerprint_changes_with_schema() {
        let full = resolve(&sales(), "revenue").unwrap().fingerprint();
        let reduced = resolve_excluding(&sales(), "revenue", &["city".to_string()])
            .unwrap()
            .fingerprint();
        let by_age = resolve(&sales(), "age").unwrap().fingerprint();
        assert_ne!(full, reduced);
        assert_ne!(full, by_age);
    }

    #[test]
    fn test_schema_serializes_with_kind_tag() {
        let schema = resolve(&sales(), "revenue").unwrap();
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["features"][0]["kind"], "numeric");
        assert_eq!(json["features"][0]["mean"], 35.2);
        assert_eq!(json["features"][1]["candidates"][1], "LA");
    }
}
