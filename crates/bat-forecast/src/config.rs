//! Experiment options handed to the AutoML engine.
//!
//! [`ExperimentOptions`] controls how an experiment is configured
//! (normalization, power transformation, multicollinearity removal) and how
//! the model search ranks candidates ([`SortMetric`]).
//!
//! # Example
//!
//! ```
//! use bat_forecast::{ExperimentOptions, SortMetric};
//!
//! let options = ExperimentOptions::builder()
//!     .normalize(true)
//!     .multicollinearity_threshold(0.9)
//!     .sort_metric(SortMetric::Mae)
//!     .build()
//!     .expect("valid options");
//! assert_eq!(options.session_id, 42);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ForecastError;

/// The kind of model the search looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemType {
    /// Predict a continuous target.
    #[default]
    Regression,
    /// Predict a discrete class encoded in a numeric target.
    Classification,
}

impl ProblemType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemType::Regression => "regression",
            ProblemType::Classification => "classification",
        }
    }

    /// The metric searches are ranked by unless told otherwise.
    #[must_use]
    pub fn default_sort_metric(&self) -> SortMetric {
        match self {
            ProblemType::Regression => SortMetric::Rmse,
            ProblemType::Classification => SortMetric::Accuracy,
        }
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric used to rank candidate models during the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMetric {
    // Regression
    Mae,
    Mse,
    Rmse,
    R2,
    Rmsle,
    Mape,
    // Classification
    Accuracy,
    Auc,
    Recall,
    Precision,
    F1,
    Kappa,
    Mcc,
}

impl SortMetric {
    /// The column name the engine uses for this metric in its results table.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMetric::Mae => "MAE",
            SortMetric::Mse => "MSE",
            SortMetric::Rmse => "RMSE",
            SortMetric::R2 => "R2",
            SortMetric::Rmsle => "RMSLE",
            SortMetric::Mape => "MAPE",
            SortMetric::Accuracy => "Accuracy",
            SortMetric::Auc => "AUC",
            SortMetric::Recall => "Recall",
            SortMetric::Precision => "Prec.",
            SortMetric::F1 => "F1",
            SortMetric::Kappa => "Kappa",
            SortMetric::Mcc => "MCC",
        }
    }

    #[must_use]
    pub fn problem_type(&self) -> ProblemType {
        match self {
            SortMetric::Mae
            | SortMetric::Mse
            | SortMetric::Rmse
            | SortMetric::R2
            | SortMetric::Rmsle
            | SortMetric::Mape => ProblemType::Regression,
            _ => ProblemType::Classification,
        }
    }

    /// Whether larger values rank better.
    #[must_use]
    pub fn higher_is_better(&self) -> bool {
        !matches!(
            self,
            SortMetric::Mae | SortMetric::Mse | SortMetric::Rmse | SortMetric::Rmsle | SortMetric::Mape
        )
    }
}

impl fmt::Display for SortMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an invalid string into a [`SortMetric`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSortMetricError {
    invalid_value: String,
}

impl ParseSortMetricError {
    #[must_use]
    pub fn invalid_value(&self) -> &str {
        &self.invalid_value
    }
}

impl fmt::Display for ParseSortMetricError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid sort metric: '{}'. Valid values are: MAE, MSE, RMSE, R2, RMSLE, MAPE, \
             Accuracy, AUC, Recall, Prec., F1, Kappa, MCC",
            self.invalid_value
        )
    }
}

impl std::error::Error for ParseSortMetricError {}

impl FromStr for SortMetric {
    type Err = ParseSortMetricError;

    /// Case-insensitive; accepts the engine's column names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mae" => Ok(SortMetric::Mae),
            "mse" => Ok(SortMetric::Mse),
            "rmse" => Ok(SortMetric::Rmse),
            "r2" => Ok(SortMetric::R2),
            "rmsle" => Ok(SortMetric::Rmsle),
            "mape" => Ok(SortMetric::Mape),
            "accuracy" => Ok(SortMetric::Accuracy),
            "auc" => Ok(SortMetric::Auc),
            "recall" => Ok(SortMetric::Recall),
            "prec." | "precision" => Ok(SortMetric::Precision),
            "f1" => Ok(SortMetric::F1),
            "kappa" => Ok(SortMetric::Kappa),
            "mcc" => Ok(SortMetric::Mcc),
            _ => Err(ParseSortMetricError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

/// Options for configuring an experiment and running the model search.
///
/// Use [`ExperimentOptions::builder()`] for validated construction.
///
/// # Validation Rules
///
/// - `multicollinearity_threshold` must be within `[0.0, 1.0]`
/// - `fold`, when set, must be at least 2
/// - `sort_metric` must belong to `problem_type`
/// - `experiment_name` must not be empty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentOptions {
    pub problem_type: ProblemType,

    /// Scale numeric features before fitting (default: true).
    pub normalize: bool,

    /// Apply a power transformation to make features more Gaussian (default: true).
    pub transformation: bool,

    /// Drop one of each pair of highly correlated features (default: true).
    pub remove_multicollinearity: bool,

    /// Correlation above which features count as collinear (default: 0.95).
    pub multicollinearity_threshold: f64,

    /// Ranking metric for the search (default: RMSE).
    pub sort_metric: SortMetric,

    /// Seed for reproducible splits and model initialisation (default: 42).
    pub session_id: u64,

    /// Cross-validation folds; `None` keeps the engine's default.
    pub fold: Option<u32>,

    /// Restrict the search to these engine model ids; empty means all.
    pub include_models: Vec<String>,

    /// Name the engine files the experiment under (default: "bat_forecast").
    pub experiment_name: String,
}

impl Default for ExperimentOptions {
    fn default() -> Self {
        Self {
            problem_type: ProblemType::Regression,
            normalize: true,
            transformation: true,
            remove_multicollinearity: true,
            multicollinearity_threshold: 0.95,
            sort_metric: SortMetric::Rmse,
            session_id: 42,
            fold: None,
            include_models: Vec::new(),
            experiment_name: "bat_forecast".to_string(),
        }
    }
}

impl ExperimentOptions {
    #[must_use]
    pub fn builder() -> ExperimentOptionsBuilder {
        ExperimentOptionsBuilder::default()
    }

    /// Check the validation rules listed on the type.
    pub fn validate(&self) -> Result<(), ForecastError> {
        if !(0.0..=1.0).contains(&self.multicollinearity_threshold) {
            return Err(ForecastError::Config(
                "multicollinearity_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        if matches!(self.fold, Some(fold) if fold < 2) {
            return Err(ForecastError::Config("fold must be at least 2".to_string()));
        }

        if self.sort_metric.problem_type() != self.problem_type {
            return Err(ForecastError::Config(format!(
                "sort_metric {} is not a {} metric",
                self.sort_metric, self.problem_type
            )));
        }

        if self.experiment_name.trim().is_empty() {
            return Err(ForecastError::Config(
                "experiment_name must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for [`ExperimentOptions`].
#[derive(Debug, Clone, Default)]
pub struct ExperimentOptionsBuilder {
    options: ExperimentOptions,
    sort_metric_set: bool,
}

impl ExperimentOptionsBuilder {
    /// Set the problem type. Unless a sort metric is set explicitly, the
    /// problem type's default metric is used.
    #[must_use]
    pub fn problem_type(mut self, problem_type: ProblemType) -> Self {
        self.options.problem_type = problem_type;
        if !self.sort_metric_set {
            self.options.sort_metric = problem_type.default_sort_metric();
        }
        self
    }

    #[must_use]
    pub fn normalize(mut self, normalize: bool) -> Self {
        self.options.normalize = normalize;
        self
    }

    #[must_use]
    pub fn transformation(mut self, transformation: bool) -> Self {
        self.options.transformation = transformation;
        self
    }

    #[must_use]
    pub fn remove_multicollinearity(mut self, remove: bool) -> Self {
        self.options.remove_multicollinearity = remove;
        self
    }

    /// Set the correlation threshold (default: 0.95).
    ///
    /// [`build()`](Self::build) returns an error if it lies outside `[0.0, 1.0]`.
    #[must_use]
    pub fn multicollinearity_threshold(mut self, threshold: f64) -> Self {
        self.options.multicollinearity_threshold = threshold;
        self
    }

    #[must_use]
    pub fn sort_metric(mut self, metric: SortMetric) -> Self {
        self.options.sort_metric = metric;
        self.sort_metric_set = true;
        self
    }

    #[must_use]
    pub fn session_id(mut self, seed: u64) -> Self {
        self.options.session_id = seed;
        self
    }

    #[must_use]
    pub fn fold(mut self, fold: u32) -> Self {
        self.options.fold = Some(fold);
        self
    }

    /// Restrict the search to the given model ids (e.g. "lr", "rf", "xgboost").
    #[must_use]
    pub fn include_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.include_models = models.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn experiment_name(mut self, name: impl Into<String>) -> Self {
        self.options.experiment_name = name.into();
        self
    }

    /// Build the options, validating all values.
    pub fn build(self) -> Result<ExperimentOptions, ForecastError> {
        self.options.validate()?;
        Ok(self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ExperimentOptions::default();
        assert_eq!(options.problem_type, ProblemType::Regression);
        assert!(options.normalize);
        assert!(options.transformation);
        assert!(options.remove_multicollinearity);
        assert_eq!(options.multicollinearity_threshold, 0.95);
        assert_eq!(options.sort_metric, SortMetric::Rmse);
        assert_eq!(options.session_id, 42);
        assert_eq!(options.fold, None);
        assert_eq!(options.experiment_name, "bat_forecast");
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_threshold_bounds() {
        assert!(ExperimentOptions::builder().multicollinearity_threshold(0.0).build().is_ok());
        assert!(ExperimentOptions::builder().multicollinearity_threshold(1.0).build().is_ok());

        let err = ExperimentOptions::builder()
            .multicollinearity_threshold(1.2)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("multicollinearity_threshold"));

        assert!(ExperimentOptions::builder()
            .multicollinearity_threshold(f64::NAN)
            .build()
            .is_err());
    }

    #[test]
    fn test_fold_must_be_at_least_two() {
        assert!(ExperimentOptions::builder().fold(1).build().is_err());
        assert_eq!(ExperimentOptions::builder().fold(5).build().unwrap().fold, Some(5));
    }

    #[test]
    fn test_metric_must_match_problem_type() {
        let err = ExperimentOptions::builder()
            .sort_metric(SortMetric::Accuracy)
            .build()
            .unwrap_err();
        assert!(matches!(err, ForecastError::Config(_)));

        let options = ExperimentOptions::builder()
            .problem_type(ProblemType::Classification)
            .build()
            .unwrap();
        assert_eq!(options.sort_metric, SortMetric::Accuracy);
    }

    #[test]
    fn test_explicit_metric_survives_problem_type() {
        let err = ExperimentOptions::builder()
            .sort_metric(SortMetric::Mae)
            .problem_type(ProblemType::Classification)
            .build();
        assert!(err.is_err());
    }

    #[test]
    fn test_empty_experiment_name_rejected() {
        assert!(ExperimentOptions::builder().experiment_name("  ").build().is_err());
    }

    #[test]
    fn test_sort_metric_parse() {
        assert_eq!("RMSE".parse::<SortMetric>(), Ok(SortMetric::Rmse));
        assert_eq!("r2".parse::<SortMetric>(), Ok(SortMetric::R2));
        assert_eq!("Prec.".parse::<SortMetric>(), Ok(SortMetric::Precision));
        let err = "rmsd".parse::<SortMetric>().unwrap_err();
        assert_eq!(err.invalid_value(), "rmsd");
    }

    #[test]
    fn test_sort_metric_direction() {
        assert!(!SortMetric::Rmse.higher_is_better());
        assert!(SortMetric::R2.higher_is_better());
        assert!(SortMetric::Auc.higher_is_better());
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: ExperimentOptions =
            serde_json::from_str(r#"{"normalize": false, "sort_metric": "mae"}"#).unwrap();
        assert!(!options.normalize);
        assert_eq!(options.sort_metric, SortMetric::Mae);
        assert_eq!(options.session_id, 42);
    }
}
