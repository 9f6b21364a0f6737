//! Session-scoped AutoML model lifecycle.
//!
//! A user uploads a table, picks a numeric target column, trains a model once
//! and then asks for single-row predictions. This crate owns the lifecycle
//! around that flow; fitting models is delegated to an [`AutoMlEngine`].
//!
//! # Overview
//!
//! - **Dataset Store** ([`Dataset`]): the active table, backed by Polars
//! - **Feature Schema Resolver** ([`schema::resolve`]): numeric features with
//!   their means, categorical features with their observed values
//! - **Engine Adapter** ([`AutoMlEngine`]): configure / search / predict
//! - **Model Session Cache** ([`ModelCache`]): at most one model per session,
//!   tied to the schema it was trained under
//! - **Prediction Requester** ([`PredictionRow`], [`predict::predict`])
//! - **Workflow Controller** ([`WorkflowController`]): the state machine
//! - **Session Handle** ([`SessionHandle`]): thread-safe wrapper that trains
//!   on a Tokio blocking worker
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use bat_forecast::{Dataset, SessionHandle, WorkflowController};
//! use std::collections::HashMap;
//!
//! let controller = WorkflowController::builder(engine)
//!     .on_transition(|t| println!("{} -> {}", t.from, t.to))
//!     .build()?;
//! let session = SessionHandle::new(controller);
//!
//! session.load_dataset(Dataset::from_path("sales.csv")?);
//! let schema = session.select_target("revenue")?;
//!
//! let board = session.start_training().await?;
//! println!("Best model: {}", board.leaderboard());
//!
//! let values = bat_forecast::predict::default_values(&schema);
//! let result = session.predict(&values)?;
//! println!("{}", result);
//! ```
//!
//! # States
//!
//! `Idle` → `Configured` → `Training` → `Ready` ⇄ `Predicting`, with
//! `Failed` on a search error and `Ready` → `Configured` on retrain. Loading
//! a dataset returns to `Idle` from anywhere. See [`WorkflowState`].

pub mod cache;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod predict;
pub mod schema;
pub mod session;
pub mod state;
pub mod workflow;

pub use cache::{CachedModel, ModelCache};
pub use config::{ExperimentOptions, ExperimentOptionsBuilder, ParseSortMetricError, ProblemType, SortMetric};
pub use dataset::{ColumnKind, ColumnSummary, Dataset, DatasetSummary, FileFormat};
pub use engine::{AutoMlEngine, Leaderboard, PredictionValue};
pub use error::{EngineError, ForecastError, Result, SchemaError};
pub use predict::{FeatureValue, PredictionResult, PredictionRow, UserValues};
pub use schema::{FeatureKind, FeatureSchema, FeatureSpec, SchemaFingerprint};
pub use session::{SessionHandle, SessionStatus, SpawnedTraining};
pub use state::{Action, ParseWorkflowStateError, Transition, TransitionCallback, WorkflowState};
pub use workflow::{
    PredictionJob, PredictionReport, StartOutcome, TrainingJob, TrainingReport, TrainingStart,
    WorkflowController, WorkflowControllerBuilder,
};
