//! The contract between the session and an AutoML engine.
//!
//! The session never fits models itself. It hands a dataset and a target to
//! an [`AutoMlEngine`], which configures an experiment, searches candidate
//! models and later scores single rows. The experiment and model are opaque
//! to the session; it only stores them and passes them back.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::config::{ExperimentOptions, SortMetric};
use crate::dataset::Dataset;
use crate::error::EngineError;
use crate::predict::PredictionRow;

/// An AutoML backend.
///
/// Implementations must be shareable across threads: the session runs
/// [`configure`](Self::configure) and [`search`](Self::search) on a blocking
/// worker while the interactive side keeps serving status requests.
pub trait AutoMlEngine: Send + Sync + 'static {
    /// Configured experiment state returned by [`configure`](Self::configure).
    type Experiment: Send + Sync + 'static;

    /// Trained artifact returned by [`search`](Self::search).
    type Model: Send + Sync + 'static;

    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Prepare an experiment for `dataset`, predicting `target`.
    ///
    /// `dataset` contains the features and the target only; excluded
    /// columns have already been removed.
    fn configure(
        &self,
        dataset: &Dataset,
        target: &str,
        options: &ExperimentOptions,
    ) -> Result<Self::Experiment, EngineError>;

    /// Compare candidate models and return the best one with its results row.
    fn search(&self, experiment: &Self::Experiment)
    -> Result<(Self::Model, Leaderboard), EngineError>;

    /// Score a single row. Row values are in training column order.
    fn predict(&self, model: &Self::Model, row: &PredictionRow)
    -> Result<PredictionValue, EngineError>;
}

/// Summary of the best model found by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    /// Engine-specific model id (e.g. "lr", "rf"), if the engine has one.
    pub model_id: Option<String>,
    /// Human-readable model name.
    pub model_name: String,
    /// Metric the search was ranked by.
    pub sort_metric: SortMetric,
    /// Cross-validated metrics of the best model, keyed by engine column name.
    pub metrics: BTreeMap<String, f64>,
}

impl Leaderboard {
    #[must_use]
    pub fn new(model_name: impl Into<String>, sort_metric: SortMetric) -> Self {
        Self {
            model_id: None,
            model_name: model_name.into(),
            sort_metric,
            metrics: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_model_id(mut self, id: impl Into<String>) -> Self {
        self.model_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    /// Value of the metric the search was ranked by.
    #[must_use]
    pub fn score(&self) -> Option<f64> {
        self.metric(self.sort_metric.as_str())
    }
}

impl fmt::Display for Leaderboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.model_name)?;
        if let Some(id) = &self.model_id {
            write!(f, " ({id})")?;
        }
        match self.score() {
            Some(score) => write!(f, ": {} = {:.4}", self.sort_metric, score),
            None => Ok(()),
        }
    }
}

/// A scalar prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionValue {
    Number(f64),
    Label(String),
}

impl PredictionValue {
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PredictionValue::Number(value) => Some(*value),
            PredictionValue::Label(_) => None,
        }
    }
}

impl fmt::Display for PredictionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionValue::Number(value) => write!(f, "{value:.2}"),
            PredictionValue::Label(label) => f.write_str(label),
        }
    }
}
