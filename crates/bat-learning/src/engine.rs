//! [`PyCaretEngine`]: the session's AutoML engine, backed by PyCaret.
//!
//! Each call acquires the GIL with `Python::attach`; the experiment and the
//! fitted estimator live in Python and are held here as [`Py<PyAny>`].

use bat_forecast::{
    AutoMlEngine, Dataset, EngineError, ExperimentOptions, Leaderboard, PredictionRow,
    PredictionValue, ProblemType, SortMetric,
};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use std::fmt;
use tracing::{debug, info};

use crate::error::LearningError;
use crate::python::conversion::{self, map_python_error};
use crate::python::runtime;

/// PyCaret module for a problem type.
pub fn experiment_module(problem_type: ProblemType) -> &'static str {
    match problem_type {
        ProblemType::Regression => "pycaret.regression",
        ProblemType::Classification => "pycaret.classification",
    }
}

/// Experiment class inside [`experiment_module`].
pub fn experiment_class(problem_type: ProblemType) -> &'static str {
    match problem_type {
        ProblemType::Regression => "RegressionExperiment",
        ProblemType::Classification => "ClassificationExperiment",
    }
}

/// AutoML engine that drives PyCaret's experiment API.
#[derive(Debug, Clone, Copy)]
pub struct PyCaretEngine {
    _private: (),
}

impl PyCaretEngine {
    /// Initialize the Python runtime and return the engine.
    pub fn new() -> Result<Self, LearningError> {
        runtime::initialize()?;
        Ok(Self { _private: () })
    }
}

/// A configured PyCaret experiment (`setup` has run).
pub struct PyCaretExperiment {
    experiment: Py<PyAny>,
    problem_type: ProblemType,
    sort_metric: SortMetric,
    include_models: Vec<String>,
    fold: Option<u32>,
    feature_names: Vec<String>,
}

impl PyCaretExperiment {
    pub fn problem_type(&self) -> ProblemType {
        self.problem_type
    }

    /// Feature columns in training order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

impl fmt::Debug for PyCaretExperiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PyCaretExperiment")
            .field("problem_type", &self.problem_type)
            .field("sort_metric", &self.sort_metric)
            .field("features", &self.feature_names.len())
            .finish()
    }
}

/// The best estimator from `compare_models`, with the experiment that
/// owns its preprocessing pipeline.
pub struct PyCaretModel {
    experiment: Py<PyAny>,
    estimator: Py<PyAny>,
    feature_names: Vec<String>,
}

impl PyCaretModel {
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

impl fmt::Debug for PyCaretModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PyCaretModel")
            .field("feature_names", &self.feature_names)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(PyCaretEngine: Send, Sync);
static_assertions::assert_impl_all!(PyCaretExperiment: Send, Sync);
static_assertions::assert_impl_all!(PyCaretModel: Send, Sync);

impl AutoMlEngine for PyCaretEngine {
    type Experiment = PyCaretExperiment;
    type Model = PyCaretModel;

    fn name(&self) -> &str {
        "pycaret"
    }

    fn configure(
        &self,
        dataset: &Dataset,
        target: &str,
        options: &ExperimentOptions,
    ) -> Result<PyCaretExperiment, EngineError> {
        configure_experiment(dataset, target, options).map_err(LearningError::into_configure_error)
    }

    fn search(
        &self,
        experiment: &PyCaretExperiment,
    ) -> Result<(PyCaretModel, Leaderboard), EngineError> {
        compare_models(experiment).map_err(LearningError::into_search_error)
    }

    fn predict(
        &self,
        model: &PyCaretModel,
        row: &PredictionRow,
    ) -> Result<PredictionValue, EngineError> {
        predict_row(model, row).map_err(|e| e.into_predict_error(&model.feature_names))
    }
}

fn configure_experiment(
    dataset: &Dataset,
    target: &str,
    options: &ExperimentOptions,
) -> Result<PyCaretExperiment, LearningError> {
    let feature_names: Vec<String> = dataset
        .column_names()
        .into_iter()
        .filter(|name| name != target)
        .collect();

    Python::attach(|py| {
        let class = py
            .import(experiment_module(options.problem_type))
            .and_then(|m| m.getattr(experiment_class(options.problem_type)))
            .map_err(|e| map_python_error(py, e))?;
        let experiment = class.call0()?;
        let data = conversion::dataframe_to_python(py, dataset.frame())?;

        let kwargs = PyDict::new(py);
        kwargs.set_item("data", data)?;
        kwargs.set_item("target", target)?;
        kwargs.set_item("session_id", options.session_id)?;
        kwargs.set_item("normalize", options.normalize)?;
        kwargs.set_item("transformation", options.transformation)?;
        kwargs.set_item("remove_multicollinearity", options.remove_multicollinearity)?;
        kwargs.set_item("multicollinearity_threshold", options.multicollinearity_threshold)?;
        kwargs.set_item("log_experiment", false)?;
        kwargs.set_item("experiment_name", options.experiment_name.as_str())?;
        kwargs.set_item("verbose", false)?;

        debug!(
            "Calling {}.setup on {} rows",
            experiment_class(options.problem_type),
            dataset.height()
        );
        experiment
            .call_method("setup", (), Some(&kwargs))
            .map_err(|e| map_python_error(py, e))?;

        Ok(PyCaretExperiment {
            experiment: experiment.unbind(),
            problem_type: options.problem_type,
            sort_metric: options.sort_metric,
            include_models: options.include_models.clone(),
            fold: options.fold,
            feature_names,
        })
    })
}

fn compare_models(
    experiment: &PyCaretExperiment,
) -> Result<(PyCaretModel, Leaderboard), LearningError> {
    Python::attach(|py| {
        let exp = experiment.experiment.bind(py);

        let kwargs = PyDict::new(py);
        kwargs.set_item("sort", experiment.sort_metric.as_str())?;
        if !experiment.include_models.is_empty() {
            kwargs.set_item("include", experiment.include_models.clone())?;
        }
        if let Some(fold) = experiment.fold {
            kwargs.set_item("fold", fold)?;
        }
        kwargs.set_item("verbose", false)?;

        let best = exp
            .call_method("compare_models", (), Some(&kwargs))
            .map_err(|e| map_python_error(py, e))?;

        // compare_models returns an empty list when every candidate failed.
        if best.is_instance_of::<pyo3::types::PyList>() {
            return Err(LearningError::SearchFailed(
                "no candidate model could be fitted".to_string(),
            ));
        }

        let results = exp.call_method0("pull").map_err(|e| map_python_error(py, e))?;
        let board = conversion::extract_leaderboard(&results, experiment.sort_metric)?;
        info!("PyCaret selected {}", board);

        Ok((
            PyCaretModel {
                experiment: experiment.experiment.clone_ref(py),
                estimator: best.unbind(),
                feature_names: experiment.feature_names.clone(),
            },
            board,
        ))
    })
}

fn predict_row(model: &PyCaretModel, row: &PredictionRow) -> Result<PredictionValue, LearningError> {
    Python::attach(|py| {
        let frame = conversion::row_to_python(py, row)?;

        let kwargs = PyDict::new(py);
        kwargs.set_item("data", frame)?;
        kwargs.set_item("verbose", false)?;

        let scored = model
            .experiment
            .bind(py)
            .call_method("predict_model", (model.estimator.bind(py),), Some(&kwargs))
            .map_err(|e| map_python_error(py, e))?;

        conversion::extract_prediction(&scored)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bat_forecast::{FeatureValue, UserValues, WorkflowController, WorkflowState};
    use polars::prelude::*;

    #[test]
    fn test_experiment_names() {
        assert_eq!(experiment_module(ProblemType::Regression), "pycaret.regression");
        assert_eq!(
            experiment_class(ProblemType::Classification),
            "ClassificationExperiment"
        );
    }

    fn sales() -> Dataset {
        let n = 60;
        let age: Vec<i64> = (0..n).map(|i| 20 + (i % 40)).collect();
        let city: Vec<&str> = (0..n).map(|i| if i % 2 == 0 { "NY" } else { "LA" }).collect();
        let revenue: Vec<f64> = age
            .iter()
            .zip(&city)
            .map(|(a, c)| *a as f64 * 3.0 + if *c == "NY" { 50.0 } else { 0.0 })
            .collect();
        Dataset::new(
            df! {
                "age" => age,
                "city" => city,
                "revenue" => revenue,
            }
            .unwrap(),
        )
    }

    #[test]
    #[ignore = "Requires Python runtime with PyCaret"]
    fn test_full_session_with_pycaret() {
        let engine = PyCaretEngine::new().expect("Failed to initialize Python runtime");
        let options = ExperimentOptions::builder()
            .include_models(["lr", "ridge"])
            .fold(3)
            .build()
            .unwrap();
        let mut controller = WorkflowController::builder(engine)
            .options(options)
            .build()
            .unwrap();

        controller.load_dataset(sales());
        controller.select_target("revenue").unwrap();
        let board = controller.start().unwrap().into_leaderboard();
        assert!(board.score().is_some());
        assert_eq!(controller.state(), WorkflowState::Ready);

        let values: UserValues = [
            ("age".to_string(), FeatureValue::from(40i64)),
            ("city".to_string(), FeatureValue::from("NY")),
        ]
        .into_iter()
        .collect();
        let result = controller.predict(&values).unwrap();
        assert_eq!(result.target, "revenue");
        assert!(result.value.as_f64().is_some());
    }
}
