//! Error types for the forecasting session.
//!
//! [`ForecastError`] is the error every controller action returns. Its
//! variants follow the lifecycle: schema problems are caught before the
//! engine is involved, engine failures are split by phase (configure,
//! search, predict), and misuse of the state machine is reported as
//! [`ForecastError::ConcurrentAction`] or [`ForecastError::InvalidTransition`].
//!
//! Errors are serializable as `{ code, message }` so a presentation layer
//! can display them without knowing the Rust types.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

use crate::schema::SchemaFingerprint;
use crate::state::{Action, WorkflowState};

/// A dataset/target combination that cannot produce a feature schema.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SchemaError {
    /// The named column does not exist in the dataset.
    #[error("Column '{0}' not found in dataset")]
    UnknownColumn(String),

    /// The target column is not numeric.
    #[error("Target column '{column}' must be numeric for regression (found {dtype})")]
    NonNumericTarget { column: String, dtype: String },

    /// A numeric feature has no non-null values to average.
    #[error("Numeric column '{0}' has no observed values")]
    EmptyNumericColumn(String),

    /// A categorical feature has no non-null values to offer as candidates.
    #[error("Categorical column '{0}' has no observed values")]
    EmptyCategoricalColumn(String),

    /// The target was also listed among the excluded columns.
    #[error("Column '{0}' is the target and cannot be excluded")]
    ExcludedTarget(String),

    /// Reading a column's values failed.
    #[error("Failed to read column '{column}': {reason}")]
    ColumnRead { column: String, reason: String },
}

/// Failure reported by an [`AutoMlEngine`](crate::AutoMlEngine) implementation.
///
/// The controller maps these onto [`ForecastError`] according to the phase
/// in which they occurred.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EngineError {
    /// The engine rejected the experiment configuration.
    #[error("{0}")]
    Configure(String),

    /// Model search or fitting failed.
    #[error("{0}")]
    Search(String),

    /// The engine rejected a prediction row.
    #[error("{message}")]
    Predict {
        column: Option<String>,
        message: String,
    },

    /// The engine's runtime itself is unavailable or broken.
    #[error("engine runtime error: {0}")]
    Runtime(String),
}

impl EngineError {
    pub(crate) fn into_config_error(self) -> ForecastError {
        ForecastError::Config(self.to_string())
    }

    pub(crate) fn into_search_error(self) -> ForecastError {
        match self {
            EngineError::Configure(message) => ForecastError::Config(message),
            other => ForecastError::Search(other.to_string()),
        }
    }

    pub(crate) fn into_predict_error(self) -> ForecastError {
        match self {
            EngineError::Predict { column, message } => ForecastError::Predict { column, message },
            other => ForecastError::Predict {
                column: None,
                message: other.to_string(),
            },
        }
    }
}

/// The main error type for forecasting sessions.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ForecastError {
    /// An action needs a dataset but none has been loaded.
    #[error("No dataset loaded")]
    NoDataset,

    /// The dataset could not be loaded or reshaped.
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Feature schema resolution failed.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Invalid experiment options, or the engine rejected its configuration.
    #[error("Configuration rejected: {0}")]
    Config(String),

    /// Model search failed.
    #[error("Model search failed: {0}")]
    Search(String),

    /// A prediction request was malformed or rejected by the engine.
    #[error("Prediction failed{}: {message}", for_column(.column))]
    Predict {
        column: Option<String>,
        message: String,
    },

    /// The cached model was trained under a different feature schema.
    #[error("Model was trained on schema {trained} but the live schema is {}; retrain before predicting", fingerprint_or_unset(.live))]
    StaleModel {
        trained: SchemaFingerprint,
        live: Option<SchemaFingerprint>,
    },

    /// Prediction was requested before any model was trained.
    #[error("No trained model available")]
    NoModel,

    /// The action overlaps a training or prediction already in progress.
    #[error("Cannot {action} while session is {state}")]
    ConcurrentAction {
        action: Action,
        state: WorkflowState,
    },

    /// The action is not valid from the current state.
    #[error("Cannot {action} from state {state}")]
    InvalidTransition {
        action: Action,
        state: WorkflowState,
    },

    /// A training result arrived after the session moved on to another dataset.
    #[error("Training result discarded: the dataset was replaced while training")]
    SupersededTraining,

    /// Internal error (e.g., worker join failure).
    #[error("Internal error: {0}")]
    Internal(String),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

impl ForecastError {
    /// Stable error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoDataset => "NO_DATASET",
            Self::Dataset(_) => "DATASET_ERROR",
            Self::Schema(_) => "SCHEMA_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Search(_) => "SEARCH_ERROR",
            Self::Predict { .. } => "PREDICT_ERROR",
            Self::StaleModel { .. } => "STALE_MODEL",
            Self::NoModel => "NO_MODEL",
            Self::ConcurrentAction { .. } => "CONCURRENT_ACTION",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::SupersededTraining => "SUPERSEDED_TRAINING",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
        }
    }

    /// Whether the user can fix this by changing input or retrying.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Internal(_) | Self::Polars(_))
    }

    /// The column this error is about, when there is one.
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::Predict { column, .. } => column.as_deref(),
            Self::Schema(
                SchemaError::UnknownColumn(column)
                | SchemaError::EmptyNumericColumn(column)
                | SchemaError::EmptyCategoricalColumn(column)
                | SchemaError::ExcludedTarget(column),
            ) => Some(column),
            Self::Schema(
                SchemaError::NonNumericTarget { column, .. } | SchemaError::ColumnRead { column, .. },
            ) => Some(column),
            _ => None,
        }
    }
}

impl Serialize for ForecastError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ForecastError", 3)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.serialize_field("column", &self.column())?;
        state.end()
    }
}

fn for_column(column: &Option<String>) -> String {
    column
        .as_ref()
        .map(|c| format!(" for column '{c}'"))
        .unwrap_or_default()
}

fn fingerprint_or_unset(fingerprint: &Option<SchemaFingerprint>) -> String {
    fingerprint
        .as_ref()
        .map_or_else(|| "unset".to_string(), ToString::to_string)
}

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(ForecastError::NoDataset.error_code(), "NO_DATASET");
        assert_eq!(
            ForecastError::Schema(SchemaError::UnknownColumn("x".to_string())).error_code(),
            "SCHEMA_ERROR"
        );
        assert_eq!(
            ForecastError::ConcurrentAction {
                action: Action::Start,
                state: WorkflowState::Training,
            }
            .error_code(),
            "CONCURRENT_ACTION"
        );
    }

    #[test]
    fn test_is_recoverable() {
        assert!(ForecastError::NoModel.is_recoverable());
        assert!(ForecastError::Search("boom".to_string()).is_recoverable());
        assert!(!ForecastError::Internal("join".to_string()).is_recoverable());
    }

    #[test]
    fn test_predict_error_message_names_column() {
        let err = ForecastError::Predict {
            column: Some("city".to_string()),
            message: "expected text".to_string(),
        };
        assert_eq!(err.to_string(), "Prediction failed for column 'city': expected text");

        let err = ForecastError::Predict {
            column: None,
            message: "engine refused".to_string(),
        };
        assert_eq!(err.to_string(), "Prediction failed: engine refused");
    }

    #[test]
    fn test_concurrent_action_message() {
        let err = ForecastError::ConcurrentAction {
            action: Action::Retrain,
            state: WorkflowState::Training,
        };
        assert_eq!(err.to_string(), "Cannot retrain while session is training");
    }

    #[test]
    fn test_engine_error_mapping_by_phase() {
        let err = EngineError::Runtime("no python".to_string()).into_config_error();
        assert!(matches!(err, ForecastError::Config(_)));

        let err = EngineError::Search("all models failed".to_string()).into_search_error();
        assert!(matches!(err, ForecastError::Search(ref m) if m == "all models failed"));

        let err = EngineError::Predict {
            column: Some("age".to_string()),
            message: "not a float".to_string(),
        }
        .into_predict_error();
        assert_eq!(err.column(), Some("age"));

        let err = EngineError::Runtime("gone".to_string()).into_predict_error();
        assert!(matches!(err, ForecastError::Predict { column: None, .. }));
    }

    #[test]
    fn test_error_serialization() {
        let err = ForecastError::Schema(SchemaError::NonNumericTarget {
            column: "city".to_string(),
            dtype: "str".to_string(),
        });
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "SCHEMA_ERROR");
        assert_eq!(json["column"], "city");
        assert!(json["message"].as_str().unwrap().contains("must be numeric"));
    }
}
