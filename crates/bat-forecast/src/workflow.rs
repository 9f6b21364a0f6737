//! The workflow controller: one session's state machine.
//!
//! Every user action goes through [`WorkflowController`], which checks it
//! against the current [`WorkflowState`], updates the dataset/schema/model
//! it owns and reports the transition. Nothing is queued: an action that
//! overlaps a training run is rejected with
//! [`ForecastError::ConcurrentAction`].
//!
//! # Training
//!
//! Training is split in two so the search can run on another thread:
//!
//! 1. [`begin_training`](WorkflowController::begin_training) moves the session
//!    to `Training` and returns a self-contained [`TrainingJob`].
//! 2. [`TrainingJob::run`] calls the engine (configure, then search) and
//!    produces a [`TrainingReport`]. It does not touch the controller.
//! 3. [`finish_training`](WorkflowController::finish_training) applies the
//!    report: `Ready` with a cached model, or `Failed`.
//!
//! [`start`](WorkflowController::start) runs all three inline. Loading a new
//! dataset while a job is running bumps the session generation, and the
//! job's report is discarded when it arrives.
//!
//! # Prediction
//!
//! Prediction is split the same way. [`begin_predict`](WorkflowController::begin_predict)
//! validates the row and moves to `Predicting`, [`PredictionJob::run`] calls
//! the engine, and [`finish_predict`](WorkflowController::finish_predict)
//! returns to `Ready`. A caller holding the controller behind a lock can
//! release it while the engine scores the row, so overlapping actions see
//! `Predicting` and are rejected.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::cache::{CachedModel, ModelCache};
use crate::config::ExperimentOptions;
use crate::dataset::Dataset;
use crate::engine::{AutoMlEngine, Leaderboard};
use crate::error::{EngineError, ForecastError, Result, SchemaError};
use crate::predict::{self, PredictionResult, PredictionRow, UserValues};
use crate::schema::{FeatureSchema, SchemaFingerprint, resolve_excluding};
use crate::session::SessionStatus;
use crate::state::{Action, Transition, TransitionCallback, WorkflowState};

/// Result of asking the controller to start training.
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    /// A search ran and produced this leaderboard.
    Trained(Leaderboard),
    /// A model was already cached; nothing ran.
    AlreadyTrained(Leaderboard),
}

impl StartOutcome {
    #[must_use]
    pub fn leaderboard(&self) -> &Leaderboard {
        match self {
            StartOutcome::Trained(board) | StartOutcome::AlreadyTrained(board) => board,
        }
    }

    #[must_use]
    pub fn into_leaderboard(self) -> Leaderboard {
        match self {
            StartOutcome::Trained(board) | StartOutcome::AlreadyTrained(board) => board,
        }
    }
}

/// What [`begin_training`](WorkflowController::begin_training) hands back.
pub enum TrainingStart<E: AutoMlEngine> {
    /// Run this job, then pass its report to `finish_training`.
    Job(TrainingJob<E>),
    /// The session is already `Ready`; this is the cached leaderboard.
    AlreadyTrained(Leaderboard),
}

/// Everything a worker needs to train, detached from the controller.
pub struct TrainingJob<E: AutoMlEngine> {
    engine: Arc<E>,
    generation: u64,
    dataset: Dataset,
    schema: FeatureSchema,
    options: ExperimentOptions,
}

impl<E: AutoMlEngine> TrainingJob<E> {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn target(&self) -> &str {
        self.schema.target()
    }

    /// The data handed to the engine: features plus target.
    #[must_use]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Configure an experiment and run the model search.
    #[must_use]
    pub fn run(self) -> TrainingReport<E> {
        info!(
            "Training with {} on {} rows, {} features, target '{}' (sort by {})",
            self.engine.name(),
            self.dataset.height(),
            self.schema.len(),
            self.schema.target(),
            self.options.sort_metric
        );

        let outcome = self.execute();
        TrainingReport {
            generation: self.generation,
            schema: self.schema,
            outcome,
        }
    }

    fn execute(&self) -> Result<TrainedArtifacts<E>> {
        let experiment = self
            .engine
            .configure(&self.dataset, self.schema.target(), &self.options)
            .map_err(EngineError::into_config_error)?;
        debug!("Experiment configured");

        let (model, leaderboard) = self
            .engine
            .search(&experiment)
            .map_err(EngineError::into_search_error)?;

        Ok(TrainedArtifacts {
            experiment,
            model,
            leaderboard,
        })
    }
}

impl<E: AutoMlEngine> fmt::Debug for TrainingJob<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainingJob")
            .field("engine", &self.engine.name())
            .field("generation", &self.generation)
            .field("target", &self.schema.target())
            .field("rows", &self.dataset.height())
            .finish()
    }
}

impl<E: AutoMlEngine> fmt::Debug for TrainingStart<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingStart::Job(job) => f.debug_tuple("Job").field(job).finish(),
            TrainingStart::AlreadyTrained(board) => {
                f.debug_tuple("AlreadyTrained").field(board).finish()
            }
        }
    }
}

struct TrainedArtifacts<E: AutoMlEngine> {
    experiment: E::Experiment,
    model: E::Model,
    leaderboard: Leaderboard,
}

/// The result of running a [`TrainingJob`].
pub struct TrainingReport<E: AutoMlEngine> {
    generation: u64,
    schema: FeatureSchema,
    outcome: Result<TrainedArtifacts<E>>,
}

impl<E: AutoMlEngine> TrainingReport<E> {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

impl<E: AutoMlEngine> fmt::Debug for TrainingReport<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainingReport")
            .field("generation", &self.generation)
            .field("target", &self.schema.target())
            .field("success", &self.outcome.is_ok())
            .finish()
    }
}

/// A validated row and the model to score it with, detached from the
/// controller.
pub struct PredictionJob<E: AutoMlEngine> {
    engine: Arc<E>,
    model: Arc<E::Model>,
    generation: u64,
    fingerprint: SchemaFingerprint,
    target: String,
    row: PredictionRow,
}

impl<E: AutoMlEngine> PredictionJob<E> {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn row(&self) -> &PredictionRow {
        &self.row
    }

    /// Score the row with the engine.
    #[must_use]
    pub fn run(self) -> PredictionReport {
        let result = predict::score(self.engine.as_ref(), &self.model, &self.target, self.row);
        PredictionReport {
            generation: self.generation,
            fingerprint: self.fingerprint,
            result,
        }
    }
}

impl<E: AutoMlEngine> fmt::Debug for PredictionJob<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredictionJob")
            .field("engine", &self.engine.name())
            .field("generation", &self.generation)
            .field("target", &self.target)
            .field("row", &self.row)
            .finish()
    }
}

/// The result of running a [`PredictionJob`].
#[derive(Debug)]
pub struct PredictionReport {
    generation: u64,
    fingerprint: SchemaFingerprint,
    result: Result<PredictionResult>,
}

impl PredictionReport {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Drives one session through Idle → Configured → Training → Ready.
pub struct WorkflowController<E: AutoMlEngine> {
    engine: Arc<E>,
    options: ExperimentOptions,
    state: WorkflowState,
    dataset: Option<Dataset>,
    target: Option<String>,
    excluded: Vec<String>,
    schema: Option<FeatureSchema>,
    experiment: Option<E::Experiment>,
    cache: ModelCache<E::Model>,
    last_failure: Option<String>,
    generation: u64,
    in_flight: Option<u64>,
    on_transition: Option<TransitionCallback>,
}

impl<E: AutoMlEngine> WorkflowController<E> {
    /// A controller with default options and no observer.
    pub fn new(engine: E) -> Self {
        Self::with_engine(Arc::new(engine))
    }

    pub fn builder(engine: E) -> WorkflowControllerBuilder<E> {
        WorkflowControllerBuilder {
            engine: Arc::new(engine),
            options: ExperimentOptions::default(),
            on_transition: None,
        }
    }

    fn with_engine(engine: Arc<E>) -> Self {
        Self {
            engine,
            options: ExperimentOptions::default(),
            state: WorkflowState::Idle,
            dataset: None,
            target: None,
            excluded: Vec::new(),
            schema: None,
            experiment: None,
            cache: ModelCache::new(),
            last_failure: None,
            generation: 0,
            in_flight: None,
            on_transition: None,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> WorkflowState {
        self.state
    }

    #[must_use]
    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    #[must_use]
    pub fn options(&self) -> &ExperimentOptions {
        &self.options
    }

    #[must_use]
    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    #[must_use]
    pub fn excluded_columns(&self) -> &[String] {
        &self.excluded
    }

    /// The live feature schema.
    #[must_use]
    pub fn schema(&self) -> Option<&FeatureSchema> {
        self.schema.as_ref()
    }

    #[must_use]
    pub fn experiment(&self) -> Option<&E::Experiment> {
        self.experiment.as_ref()
    }

    #[must_use]
    pub fn cached_model(&self) -> Option<&CachedModel<E::Model>> {
        self.cache.get()
    }

    #[must_use]
    pub fn leaderboard(&self) -> Option<&Leaderboard> {
        self.cache.leaderboard()
    }

    /// Message of the most recent training failure.
    #[must_use]
    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }

    /// Bumped on every dataset load.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a cached or retired model no longer matches the live schema.
    #[must_use]
    pub fn is_model_stale(&self) -> bool {
        let live = self.schema.as_ref().map(FeatureSchema::fingerprint);
        self.cache.is_stale(live.as_ref())
    }

    /// Snapshot for the presentation layer.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            generation: self.generation,
            dataset: self.dataset.as_ref().map(Dataset::summary),
            target: self.target.clone(),
            excluded_columns: self.excluded.clone(),
            schema: self.schema.clone(),
            leaderboard: self.cache.leaderboard().cloned(),
            trained_at: self.cache.get().map(CachedModel::trained_at),
            model_stale: self.is_model_stale(),
            last_failure: self.last_failure.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Replace the dataset. Allowed from every state.
    ///
    /// Clears the target, excluded columns, schema, experiment and model,
    /// and returns the session to `Idle`. A training run still in flight
    /// finishes in the background and its result is discarded.
    pub fn load_dataset(&mut self, dataset: Dataset) {
        if self.state == WorkflowState::Training {
            warn!("Dataset replaced while training; the running search will be discarded");
        }

        info!(
            "Loaded dataset '{}' ({} rows x {} columns)",
            dataset.name(),
            dataset.height(),
            dataset.width()
        );

        self.generation += 1;
        self.dataset = Some(dataset);
        self.target = None;
        self.excluded.clear();
        self.schema = None;
        self.experiment = None;
        self.cache.retire();
        self.last_failure = None;
        self.transition(WorkflowState::Idle, Action::LoadDataset);
    }

    /// Choose the target column and resolve the feature schema.
    ///
    /// From `Idle`, `Configured` or `Failed` this moves to `Configured`.
    /// From `Ready` the live schema changes but the cached model stays; if
    /// the schema differs, predictions fail as stale until a retrain.
    /// On error the previous configuration is kept.
    pub fn select_target(&mut self, target: &str) -> Result<&FeatureSchema> {
        self.ensure_not_busy(Action::SelectTarget)?;
        let dataset = self.dataset.as_ref().ok_or(ForecastError::NoDataset)?;

        let schema = resolve_excluding(dataset, target, &self.excluded)?;
        info!(
            "Target '{}' selected: {} features (schema {})",
            target,
            schema.len(),
            schema.fingerprint()
        );

        self.target = Some(target.to_string());
        Ok(self.apply_schema(schema, Action::SelectTarget))
    }

    /// Drop columns from modelling.
    ///
    /// Every name must exist in the dataset and must not be the target.
    /// The list is kept sorted. Without a target this only records it.
    pub fn exclude_columns(&mut self, mut columns: Vec<String>) -> Result<()> {
        self.ensure_not_busy(Action::ExcludeColumns)?;
        columns.sort();
        columns.dedup();
        let dataset = self.dataset.as_ref().ok_or(ForecastError::NoDataset)?;

        for name in &columns {
            if !dataset.has_column(name) {
                return Err(SchemaError::UnknownColumn(name.clone()).into());
            }
        }

        let schema = match self.target.as_deref() {
            Some(target) => Some(resolve_excluding(dataset, target, &columns)?),
            None => None,
        };

        debug!("Excluding columns: {:?}", columns);
        self.excluded = columns;
        if let Some(schema) = schema {
            self.apply_schema(schema, Action::ExcludeColumns);
        }
        Ok(())
    }

    /// Replace the experiment options used by the next training run.
    pub fn set_options(&mut self, options: ExperimentOptions) -> Result<()> {
        self.ensure_not_busy(Action::SetOptions)?;
        options.validate()?;
        debug!("Experiment options updated: {:?}", options);
        self.options = options;
        Ok(())
    }

    /// Install `schema` as the live schema and move the state machine on.
    fn apply_schema(&mut self, schema: FeatureSchema, action: Action) -> &FeatureSchema {
        match self.state {
            WorkflowState::Idle | WorkflowState::Configured => {
                self.transition(WorkflowState::Configured, action);
            }
            WorkflowState::Failed => {
                self.acknowledge_failure();
            }
            WorkflowState::Ready => {
                if self.cache.is_stale(Some(&schema.fingerprint())) {
                    info!("Live schema changed; cached model is stale until retrained");
                }
            }
            WorkflowState::Training | WorkflowState::Predicting => {}
        }
        self.schema.insert(schema)
    }

    // ------------------------------------------------------------------
    // Training
    // ------------------------------------------------------------------

    /// Run a full training cycle on the current thread.
    ///
    /// A failure is returned to the caller and acknowledged, leaving the
    /// session `Configured` so it can be retried.
    pub fn start(&mut self) -> Result<StartOutcome> {
        let job = match self.begin_training()? {
            TrainingStart::AlreadyTrained(board) => return Ok(StartOutcome::AlreadyTrained(board)),
            TrainingStart::Job(job) => job,
        };

        let report = job.run();
        match self.finish_training(report) {
            Ok(board) => Ok(StartOutcome::Trained(board)),
            Err(err) => {
                self.acknowledge_failure();
                Err(err)
            }
        }
    }

    /// Move to `Training` and hand out the job to run.
    ///
    /// From `Ready` nothing runs and the cached leaderboard is returned.
    pub fn begin_training(&mut self) -> Result<TrainingStart<E>> {
        match self.state {
            WorkflowState::Ready => {
                let board = self.cache.leaderboard().cloned().ok_or(ForecastError::NoModel)?;
                debug!("Model already trained; start is a no-op");
                return Ok(TrainingStart::AlreadyTrained(board));
            }
            WorkflowState::Training | WorkflowState::Predicting => {
                return Err(ForecastError::ConcurrentAction {
                    action: Action::Start,
                    state: self.state,
                });
            }
            WorkflowState::Idle => {
                return Err(match self.dataset {
                    None => ForecastError::NoDataset,
                    Some(_) => ForecastError::InvalidTransition {
                        action: Action::Start,
                        state: self.state,
                    },
                });
            }
            WorkflowState::Configured | WorkflowState::Failed => {}
        }

        // A superseded search may still be running against an old dataset.
        if self.in_flight.is_some() {
            return Err(ForecastError::ConcurrentAction {
                action: Action::Start,
                state: WorkflowState::Training,
            });
        }

        let dataset = self.dataset.as_ref().ok_or(ForecastError::NoDataset)?;
        let schema = self.schema.clone().ok_or(ForecastError::InvalidTransition {
            action: Action::Start,
            state: self.state,
        })?;
        let training_data = dataset.without_columns(&self.excluded)?;

        self.acknowledge_failure();
        self.last_failure = None;
        self.experiment = None;
        self.in_flight = Some(self.generation);
        self.transition(WorkflowState::Training, Action::Start);

        Ok(TrainingStart::Job(TrainingJob {
            engine: Arc::clone(&self.engine),
            generation: self.generation,
            dataset: training_data,
            schema,
            options: self.options.clone(),
        }))
    }

    /// Apply a finished job's report.
    ///
    /// Reports from before the latest dataset load are dropped with
    /// [`ForecastError::SupersededTraining`] and change nothing.
    pub fn finish_training(&mut self, report: TrainingReport<E>) -> Result<Leaderboard> {
        if self.in_flight == Some(report.generation) {
            self.in_flight = None;
        }

        if report.generation != self.generation || self.state != WorkflowState::Training {
            warn!(
                "Discarding training result from generation {} (session is at generation {}, {})",
                report.generation, self.generation, self.state
            );
            return Err(ForecastError::SupersededTraining);
        }

        match report.outcome {
            Ok(trained) => {
                let board = trained.leaderboard.clone();
                info!("Training complete: {}", board);
                self.experiment = Some(trained.experiment);
                self.cache.store(trained.model, trained.leaderboard, report.schema);
                self.transition(WorkflowState::Ready, Action::FinishTraining);
                Ok(board)
            }
            Err(err) => {
                error!("Training failed: {}", err);
                self.record_failure(err.to_string());
                Err(err)
            }
        }
    }

    /// Mark the job of `generation` as dead without a report.
    ///
    /// Used when the worker running it panicked or was torn down.
    pub fn abort_training(&mut self, generation: u64, reason: impl Into<String>) -> ForecastError {
        let reason = reason.into();
        if self.in_flight == Some(generation) {
            self.in_flight = None;
        }
        if generation == self.generation && self.state == WorkflowState::Training {
            error!("Training worker failed: {}", reason);
            self.record_failure(reason.clone());
        }
        ForecastError::Internal(reason)
    }

    fn record_failure(&mut self, message: String) {
        self.last_failure = Some(message);
        self.experiment = None;
        self.cache.clear();
        self.transition(WorkflowState::Failed, Action::FinishTraining);
    }

    /// Leave `Failed` for `Configured`. Returns whether anything changed.
    pub fn acknowledge_failure(&mut self) -> bool {
        if self.state != WorkflowState::Failed {
            return false;
        }
        self.transition(WorkflowState::Configured, Action::Acknowledge);
        true
    }

    /// Discard the model, leaderboard and experiment so the next start
    /// trains from scratch.
    pub fn retrain(&mut self) -> Result<()> {
        match self.state {
            WorkflowState::Training | WorkflowState::Predicting => {
                Err(ForecastError::ConcurrentAction {
                    action: Action::Retrain,
                    state: self.state,
                })
            }
            WorkflowState::Ready => {
                info!("Discarding trained model for retraining");
                self.cache.clear();
                self.experiment = None;
                self.transition(WorkflowState::Configured, Action::Retrain);
                Ok(())
            }
            WorkflowState::Failed => {
                self.cache.clear();
                self.acknowledge_failure();
                Ok(())
            }
            WorkflowState::Configured | WorkflowState::Idle => {
                debug!("Nothing to retrain in state {}", self.state);
                self.cache.clear();
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Prediction
    // ------------------------------------------------------------------

    /// Score one row of user values with the cached model.
    ///
    /// The model must have been trained under the live schema. Malformed
    /// input and engine rejections leave the session `Ready`.
    pub fn predict(&mut self, values: &UserValues) -> Result<PredictionResult> {
        let job = self.begin_predict(values)?;
        let report = job.run();
        self.finish_predict(report)
    }

    /// Validate `values` and move to `Predicting`.
    ///
    /// Invalid input is rejected here and the session stays `Ready`.
    pub fn begin_predict(&mut self, values: &UserValues) -> Result<PredictionJob<E>> {
        let live = self.schema.as_ref().map(FeatureSchema::fingerprint);

        match self.state {
            WorkflowState::Ready => {}
            WorkflowState::Training | WorkflowState::Predicting => {
                return Err(ForecastError::ConcurrentAction {
                    action: Action::Predict,
                    state: self.state,
                });
            }
            state => {
                return Err(match self.cache.model_for(live.as_ref()) {
                    Err(err) => err,
                    Ok(_) => ForecastError::InvalidTransition {
                        action: Action::Predict,
                        state,
                    },
                });
            }
        }

        let cached = self.cache.model_for(live.as_ref())?;
        let row = PredictionRow::build(cached.schema(), values).inspect_err(|err| {
            warn!("Prediction rejected: {}", err);
        })?;

        let job = PredictionJob {
            engine: Arc::clone(&self.engine),
            model: cached.shared_model(),
            generation: self.generation,
            fingerprint: cached.fingerprint().clone(),
            target: cached.schema().target().to_string(),
            row,
        };
        self.transition(WorkflowState::Predicting, Action::Predict);
        Ok(job)
    }

    /// Apply a finished prediction and return to `Ready`.
    ///
    /// If the dataset was replaced while the engine was scoring, the model
    /// that produced the value is gone and the result is reported as stale.
    pub fn finish_predict(&mut self, report: PredictionReport) -> Result<PredictionResult> {
        if report.generation != self.generation {
            warn!(
                "Discarding prediction from generation {} (session is at generation {})",
                report.generation, self.generation
            );
            return Err(ForecastError::StaleModel {
                trained: report.fingerprint,
                live: self.schema.as_ref().map(FeatureSchema::fingerprint),
            });
        }

        if self.state == WorkflowState::Predicting {
            self.transition(WorkflowState::Ready, Action::Predict);
        }
        match &report.result {
            Ok(prediction) => info!("{}", prediction),
            Err(err) => warn!("Prediction rejected: {}", err),
        }
        report.result
    }

    /// Return to `Ready` after the prediction of `generation` died without
    /// a report.
    pub fn abort_predict(&mut self, generation: u64, reason: impl Into<String>) -> ForecastError {
        let reason = reason.into();
        if generation == self.generation && self.state == WorkflowState::Predicting {
            error!("Prediction failed: {}", reason);
            self.transition(WorkflowState::Ready, Action::Predict);
        }
        ForecastError::Internal(reason)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn ensure_not_busy(&self, action: Action) -> Result<()> {
        if self.state.is_busy() {
            return Err(ForecastError::ConcurrentAction {
                action,
                state: self.state,
            });
        }
        Ok(())
    }

    /// Set the state and tell the observer, if the state actually changed.
    fn transition(&mut self, to: WorkflowState, action: Action) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        debug!("Session {} -> {} ({})", from, to, action);
        if let Some(observer) = &self.on_transition {
            observer(&Transition { from, to, action });
        }
    }
}

impl<E: AutoMlEngine> fmt::Debug for WorkflowController<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowController")
            .field("engine", &self.engine.name())
            .field("state", &self.state)
            .field("target", &self.target)
            .field("excluded", &self.excluded)
            .field("generation", &self.generation)
            .field("has_model", &!self.cache.is_empty())
            .field("on_transition", &self.on_transition.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

/// Builder for [`WorkflowController`].
pub struct WorkflowControllerBuilder<E: AutoMlEngine> {
    engine: Arc<E>,
    options: ExperimentOptions,
    on_transition: Option<TransitionCallback>,
}

impl<E: AutoMlEngine> WorkflowControllerBuilder<E> {
    #[must_use]
    pub fn options(mut self, options: ExperimentOptions) -> Self {
        self.options = options;
        self
    }

    /// Register a callback fired after every state change.
    #[must_use]
    pub fn on_transition<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Transition) + Send + Sync + 'static,
    {
        self.on_transition = Some(Arc::new(callback));
        self
    }

    /// Build the controller, validating the options.
    pub fn build(self) -> Result<WorkflowController<E>> {
        self.options.validate()?;
        let mut controller = WorkflowController::with_engine(self.engine);
        controller.options = self.options;
        controller.on_transition = self.on_transition;
        Ok(controller)
    }
}

impl<E: AutoMlEngine> fmt::Debug for WorkflowControllerBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowControllerBuilder")
            .field("engine", &self.engine.name())
            .field("options", &self.options)
            .field("on_transition", &self.on_transition.as_ref().map(|_| "<callback>"))
            .finish()
    }
}
