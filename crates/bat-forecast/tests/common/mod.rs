//! Shared fixtures for the integration tests: a scripted in-memory engine and
//! small sales datasets.

#![allow(dead_code)]

use bat_forecast::{
    AutoMlEngine, Dataset, EngineError, ExperimentOptions, Leaderboard, PredictionRow,
    PredictionValue, SortMetric, WorkflowController,
};
use parking_lot::Mutex;
use polars::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};

// ============================================================================
// Scripted Engine
// ============================================================================

/// An engine that records every call and answers from a script.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    configure_calls: AtomicUsize,
    search_calls: AtomicUsize,
    predict_calls: AtomicUsize,
    prediction: f64,
    fail_next_configure: Mutex<Option<String>>,
    fail_next_search: Mutex<Option<String>>,
    reject_column: Option<String>,
    configured_columns: Mutex<Vec<Vec<String>>>,
    rows: Mutex<Vec<PredictionRow>>,
    gate: Mutex<Option<Receiver<()>>>,
    predict_gate: Mutex<Option<Receiver<()>>>,
    panic_on_predict: bool,
}

#[derive(Debug)]
pub struct ScriptedExperiment {
    pub target: String,
    pub columns: Vec<String>,
    pub sort_metric: SortMetric,
}

#[derive(Debug)]
pub struct ScriptedModel {
    pub target: String,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            prediction: 181.25,
            ..Self::default()
        }
    }

    /// The first search blocks until the returned sender fires (or is dropped).
    pub fn gated() -> (Self, Sender<()>) {
        let (tx, rx) = channel();
        let engine = Self::new();
        *engine.gate.lock() = Some(rx);
        (engine, tx)
    }

    /// The first prediction blocks until the returned sender fires (or is
    /// dropped).
    pub fn gated_predict() -> (Self, Sender<()>) {
        let (tx, rx) = channel();
        let engine = Self::new();
        *engine.predict_gate.lock() = Some(rx);
        (engine, tx)
    }

    /// Every prediction panics inside the engine.
    pub fn panicking() -> Self {
        Self {
            panic_on_predict: true,
            ..Self::new()
        }
    }

    /// Every prediction is rejected by the engine, blaming `column`.
    pub fn rejecting(column: &str) -> Self {
        Self {
            reject_column: Some(column.to_string()),
            ..Self::new()
        }
    }

    /// Make the next `configure` fail with `message`.
    pub fn fail_next_configure(&self, message: &str) {
        *self.fail_next_configure.lock() = Some(message.to_string());
    }

    /// Make the next search fail with `message`.
    pub fn fail_next_search(&self, message: &str) {
        *self.fail_next_search.lock() = Some(message.to_string());
    }

    pub fn configure_calls(&self) -> usize {
        self.configure_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn predict_calls(&self) -> usize {
        self.predict_calls.load(Ordering::SeqCst)
    }

    /// Column lists of every dataset handed to `configure`.
    pub fn configured_columns(&self) -> Vec<Vec<String>> {
        self.configured_columns.lock().clone()
    }

    /// Every row handed to `predict`.
    pub fn rows(&self) -> Vec<PredictionRow> {
        self.rows.lock().clone()
    }
}

impl AutoMlEngine for ScriptedEngine {
    type Experiment = ScriptedExperiment;
    type Model = ScriptedModel;

    fn name(&self) -> &str {
        "scripted"
    }

    fn configure(
        &self,
        dataset: &Dataset,
        target: &str,
        options: &ExperimentOptions,
    ) -> Result<Self::Experiment, EngineError> {
        self.configure_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.fail_next_configure.lock().take() {
            return Err(EngineError::Configure(message));
        }
        let columns = dataset.column_names();
        self.configured_columns.lock().push(columns.clone());
        Ok(ScriptedExperiment {
            target: target.to_string(),
            columns,
            sort_metric: options.sort_metric,
        })
    }

    fn search(
        &self,
        experiment: &Self::Experiment,
    ) -> Result<(Self::Model, Leaderboard), EngineError> {
        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            let _ = gate.recv();
        }

        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.fail_next_search.lock().take() {
            return Err(EngineError::Search(message));
        }

        let board = Leaderboard::new("Linear Regression", experiment.sort_metric)
            .with_model_id("lr")
            .with_metric("RMSE", 12.5)
            .with_metric("R2", 0.87);
        let model = ScriptedModel {
            target: experiment.target.clone(),
        };
        Ok((model, board))
    }

    fn predict(
        &self,
        _model: &Self::Model,
        row: &PredictionRow,
    ) -> Result<PredictionValue, EngineError> {
        let gate = self.predict_gate.lock().take();
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        if self.panic_on_predict {
            panic!("scripted engine crashed while scoring");
        }

        self.predict_calls.fetch_add(1, Ordering::SeqCst);
        self.rows.lock().push(row.clone());
        if let Some(column) = &self.reject_column {
            return Err(EngineError::Predict {
                column: Some(column.clone()),
                message: "value could not be encoded".to_string(),
            });
        }
        Ok(PredictionValue::Number(self.prediction))
    }
}

// ============================================================================
// Datasets
// ============================================================================

/// `[age:int, city:text, revenue:float]`; age averages 35.2.
pub fn sales_dataset() -> Dataset {
    Dataset::new(
        df! {
            "age" => &[30i64, 40, 35, 36, 35],
            "city" => &["NY", "LA", "NY", "LA", "NY"],
            "revenue" => &[100.0f64, 200.0, 150.0, 175.0, 160.0],
        }
        .unwrap(),
    )
}

/// Same columns as [`sales_dataset`] plus a `store_id` and `units` column.
pub fn wide_sales_dataset() -> Dataset {
    Dataset::new(
        df! {
            "store_id" => &[1i64, 2, 3, 4],
            "age" => &[22i64, 48, 51, 33],
            "city" => &["SF", "NY", "SF", "LA"],
            "units" => &[3i64, 9, 4, 7],
            "revenue" => &[90.0f64, 310.0, 120.0, 205.0],
        }
        .unwrap(),
    )
}

/// A controller with the sales dataset loaded and `revenue` selected.
pub fn configured(engine: ScriptedEngine) -> WorkflowController<ScriptedEngine> {
    let mut controller = WorkflowController::new(engine);
    controller.load_dataset(sales_dataset());
    controller.select_target("revenue").unwrap();
    controller
}

/// A configured controller that has finished one training run.
pub fn ready(engine: ScriptedEngine) -> WorkflowController<ScriptedEngine> {
    let mut controller = configured(engine);
    controller.start().unwrap();
    controller
}
