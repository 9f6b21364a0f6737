//! Single-row prediction requests.
//!
//! User input arrives as an untyped bag of `name -> value` pairs (a form, a
//! JSON object, `name=value` command-line arguments). [`PredictionRow::build`]
//! checks it against the live [`FeatureSchema`] and produces one value per
//! feature, in schema order, before anything reaches the engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

use crate::engine::{AutoMlEngine, PredictionValue};
use crate::error::{ForecastError, Result};
use crate::schema::{FeatureKind, FeatureSchema, FeatureSpec};

/// A user-supplied value for one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
}

impl FeatureValue {
    /// Convert a JSON scalar. Numbers and strings are accepted; anything
    /// else has no feature value.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_f64().map(FeatureValue::Number),
            serde_json::Value::String(s) => Some(FeatureValue::Text(s.clone())),
            _ => None,
        }
    }

    /// Parse raw text the way `spec` expects it.
    pub fn parse_for(spec: &FeatureSpec, raw: &str) -> Result<Self> {
        match spec.kind {
            FeatureKind::Numeric { .. } => raw
                .trim()
                .parse::<f64>()
                .map(FeatureValue::Number)
                .map_err(|_| predict_error(&spec.name, format!("'{raw}' is not a number"))),
            FeatureKind::Categorical { .. } => Ok(FeatureValue::Text(raw.to_string())),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            FeatureValue::Number(_) => "a number",
            FeatureValue::Text(_) => "text",
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Number(value) => write!(f, "{value}"),
            FeatureValue::Text(text) => write!(f, "{text:?}"),
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Number(value)
    }
}

impl From<i64> for FeatureValue {
    fn from(value: i64) -> Self {
        FeatureValue::Number(value as f64)
    }
}

impl From<i32> for FeatureValue {
    fn from(value: i32) -> Self {
        FeatureValue::Number(f64::from(value))
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Text(value.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        FeatureValue::Text(value)
    }
}

/// Untyped user input keyed by feature name.
pub type UserValues = HashMap<String, FeatureValue>;

/// The values a prediction form starts with: the mean for numeric features
/// and the first observed value for categorical ones.
#[must_use]
pub fn default_values(schema: &FeatureSchema) -> UserValues {
    schema
        .features()
        .iter()
        .filter_map(|spec| {
            let value = match &spec.kind {
                FeatureKind::Numeric { mean } => FeatureValue::Number(*mean),
                FeatureKind::Categorical { candidates } => {
                    FeatureValue::Text(candidates.first()?.clone())
                }
            };
            Some((spec.name.clone(), value))
        })
        .collect()
}

/// Parse `name=value` pairs against a schema.
pub fn parse_assignments<S: AsRef<str>>(schema: &FeatureSchema, pairs: &[S]) -> Result<UserValues> {
    let mut values = UserValues::with_capacity(pairs.len());
    for pair in pairs {
        let pair = pair.as_ref();
        let (name, raw) = pair.split_once('=').ok_or_else(|| ForecastError::Predict {
            column: None,
            message: format!("expected name=value, got '{pair}'"),
        })?;
        let name = name.trim();
        let spec = schema
            .feature(name)
            .ok_or_else(|| predict_error(name, "unknown feature"))?;
        values.insert(name.to_string(), FeatureValue::parse_for(spec, raw)?);
    }
    Ok(values)
}

/// A validated feature row, one value per schema entry in schema order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRow {
    columns: Vec<String>,
    values: Vec<FeatureValue>,
    #[serde(skip)]
    warnings: Vec<String>,
}

impl PredictionRow {
    /// Validate `values` against `schema`.
    ///
    /// Rejects unknown keys, missing keys, values of the wrong kind and
    /// non-finite numbers. Categorical values outside the observed
    /// candidates are accepted with a warning.
    pub fn build(schema: &FeatureSchema, values: &UserValues) -> Result<Self> {
        let mut unknown: Vec<&String> = values
            .keys()
            .filter(|name| schema.feature(name).is_none())
            .collect();
        unknown.sort();
        if let Some(name) = unknown.first() {
            return Err(predict_error(name, "unknown feature"));
        }

        let mut row = Self {
            columns: Vec::with_capacity(schema.len()),
            values: Vec::with_capacity(schema.len()),
            warnings: Vec::new(),
        };

        for spec in schema.features() {
            let value = values
                .get(&spec.name)
                .ok_or_else(|| predict_error(&spec.name, "missing value"))?;

            match (&spec.kind, value) {
                (FeatureKind::Numeric { .. }, FeatureValue::Number(n)) => {
                    if !n.is_finite() {
                        return Err(predict_error(&spec.name, format!("{n} is not a finite number")));
                    }
                }
                (FeatureKind::Categorical { candidates }, FeatureValue::Text(text)) => {
                    if !candidates.iter().any(|c| c == text) {
                        let message = format!(
                            "'{}' was not observed in column '{}' during training",
                            text, spec.name
                        );
                        warn!("{}", message);
                        row.warnings.push(message);
                    }
                }
                (kind, other) => {
                    let expected = match kind {
                        FeatureKind::Numeric { .. } => "a number",
                        FeatureKind::Categorical { .. } => "text",
                    };
                    return Err(predict_error(
                        &spec.name,
                        format!("expected {expected}, got {}", other.type_name()),
                    ));
                }
            }

            row.columns.push(spec.name.clone());
            row.values.push(value.clone());
        }

        debug!("Built prediction row: {}", row);
        Ok(row)
    }

    /// Validate a JSON object of feature values.
    pub fn from_json(schema: &FeatureSchema, input: &serde_json::Value) -> Result<Self> {
        let object = input.as_object().ok_or_else(|| ForecastError::Predict {
            column: None,
            message: "input must be a JSON object".to_string(),
        })?;

        let mut values = UserValues::with_capacity(object.len());
        for (name, value) in object {
            let value = FeatureValue::from_json(value)
                .ok_or_else(|| predict_error(name, format!("unsupported value {value}")))?;
            values.insert(name.clone(), value);
        }
        Self::build(schema, &values)
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn values(&self) -> &[FeatureValue] {
        &self.values
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&FeatureValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Advisory notes collected while validating.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

impl fmt::Display for PredictionRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str("]")
    }
}

/// The outcome of a prediction, labelled with the target it predicts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub target: String,
    pub value: PredictionValue,
    pub warnings: Vec<String>,
}

impl fmt::Display for PredictionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Predicted {}: {}", self.target, self.value)
    }
}

/// Validate `values`, score them with `model` and label the result.
pub fn predict<E: AutoMlEngine>(
    engine: &E,
    model: &E::Model,
    schema: &FeatureSchema,
    values: &UserValues,
) -> Result<PredictionResult> {
    let row = PredictionRow::build(schema, values)?;
    score(engine, model, schema.target(), row)
}

/// Score a row that [`PredictionRow::build`] already validated.
pub fn score<E: AutoMlEngine>(
    engine: &E,
    model: &E::Model,
    target: &str,
    row: PredictionRow,
) -> Result<PredictionResult> {
    let value = engine
        .predict(model, &row)
        .map_err(|e| e.into_predict_error())?;

    Ok(PredictionResult {
        target: target.to_string(),
        value,
        warnings: row.warnings,
    })
}

fn predict_error(column: &str, message: impl Into<String>) -> ForecastError {
    ForecastError::Predict {
        column: Some(column.to_string()),
        message: message.into(),
    }
}
