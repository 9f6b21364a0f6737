//! Thread-safe session handle.
//!
//! [`SessionHandle`] wraps a [`WorkflowController`] in
//! `Arc<parking_lot::RwLock<_>>` so a UI thread can keep reading status
//! while a model search runs on a Tokio blocking worker. The lock is never
//! held during the search itself; the controller's `Training` state is what
//! rejects overlapping actions. Predictions follow the same rule: the lock
//! is dropped while the engine scores the row.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::ExperimentOptions;
use crate::dataset::{Dataset, DatasetSummary};
use crate::engine::{AutoMlEngine, Leaderboard};
use crate::error::{ForecastError, Result};
use crate::predict::{PredictionResult, UserValues};
use crate::schema::FeatureSchema;
use crate::state::WorkflowState;
use crate::workflow::{StartOutcome, TrainingStart, WorkflowController};

/// Everything the presentation layer needs to render the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub state: WorkflowState,
    pub generation: u64,
    pub dataset: Option<DatasetSummary>,
    pub target: Option<String>,
    pub excluded_columns: Vec<String>,
    pub schema: Option<FeatureSchema>,
    pub leaderboard: Option<Leaderboard>,
    pub trained_at: Option<DateTime<Utc>>,
    /// The cached model was trained under a different schema.
    pub model_stale: bool,
    pub last_failure: Option<String>,
}

/// Cloneable handle to one session's controller.
pub struct SessionHandle<E: AutoMlEngine> {
    inner: Arc<RwLock<WorkflowController<E>>>,
}

impl<E: AutoMlEngine> Clone for SessionHandle<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: AutoMlEngine> SessionHandle<E> {
    #[must_use]
    pub fn new(controller: WorkflowController<E>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(controller)),
        }
    }

    /// Run `f` with shared access to the controller.
    pub fn read<R>(&self, f: impl FnOnce(&WorkflowController<E>) -> R) -> R {
        f(&self.inner.read())
    }

    #[must_use]
    pub fn state(&self) -> WorkflowState {
        self.inner.read().state()
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.inner.read().status()
    }

    pub fn load_dataset(&self, dataset: Dataset) {
        self.inner.write().load_dataset(dataset);
    }

    pub fn select_target(&self, target: &str) -> Result<FeatureSchema> {
        self.inner.write().select_target(target).cloned()
    }

    pub fn exclude_columns(&self, columns: Vec<String>) -> Result<()> {
        self.inner.write().exclude_columns(columns)
    }

    pub fn set_options(&self, options: ExperimentOptions) -> Result<()> {
        self.inner.write().set_options(options)
    }

    pub fn retrain(&self) -> Result<()> {
        self.inner.write().retrain()
    }

    pub fn acknowledge_failure(&self) -> bool {
        self.inner.write().acknowledge_failure()
    }

    /// Score one row on the calling thread.
    ///
    /// The lock is released while the engine runs, so status reads see
    /// `Predicting` and overlapping actions are rejected.
    pub fn predict(&self, values: &UserValues) -> Result<PredictionResult> {
        let job = self.inner.write().begin_predict(values)?;
        let generation = job.generation();

        let report = panic::catch_unwind(AssertUnwindSafe(|| job.run()));
        let mut controller = self.inner.write();
        match report {
            Ok(report) => controller.finish_predict(report),
            Err(_) => Err(controller.abort_predict(generation, "prediction panicked in the engine")),
        }
    }

    /// Train on a blocking worker and wait for the result.
    ///
    /// Like [`WorkflowController::start`], a failure is returned and
    /// acknowledged, leaving the session `Configured`.
    pub async fn start_training(&self) -> Result<StartOutcome> {
        let task = match self.spawn_training()? {
            SpawnedTraining::AlreadyTrained(board) => {
                return Ok(StartOutcome::AlreadyTrained(board));
            }
            SpawnedTraining::Running(task) => task,
        };

        let result = task
            .await
            .map_err(|e| ForecastError::Internal(format!("Training task failed: {e}")))?;

        match result {
            Ok(board) => Ok(StartOutcome::Trained(board)),
            Err(err) => {
                self.inner.write().acknowledge_failure();
                Err(err)
            }
        }
    }

    /// Start training on a blocking worker and return immediately.
    ///
    /// The returned task applies the outcome to the session when the search
    /// ends. A failure leaves the session `Failed` until
    /// [`acknowledge_failure`](Self::acknowledge_failure) is called.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn_training(&self) -> Result<SpawnedTraining> {
        let job = match self.inner.write().begin_training()? {
            TrainingStart::AlreadyTrained(board) => {
                return Ok(SpawnedTraining::AlreadyTrained(board));
            }
            TrainingStart::Job(job) => job,
        };

        let generation = job.generation();
        let inner = Arc::clone(&self.inner);
        debug!("Spawning training worker for generation {}", generation);

        let task = tokio::spawn(async move {
            let joined = tokio::task::spawn_blocking(move || job.run()).await;
            let mut controller = inner.write();
            match joined {
                Ok(report) => controller.finish_training(report),
                Err(e) => Err(controller.abort_training(generation, format!("training worker failed: {e}"))),
            }
        });

        Ok(SpawnedTraining::Running(task))
    }
}

/// Result of [`SessionHandle::spawn_training`].
#[derive(Debug)]
pub enum SpawnedTraining {
    /// The search is running; await the task for its leaderboard.
    Running(JoinHandle<Result<Leaderboard>>),
    /// A model was already cached; nothing was spawned.
    AlreadyTrained(Leaderboard),
}

impl<E: AutoMlEngine> std::fmt::Debug for SessionHandle<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("controller", &*self.inner.read())
            .finish()
    }
}
