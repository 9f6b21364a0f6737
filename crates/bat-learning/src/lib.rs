//! bat-learning: a PyCaret-backed engine for `bat-forecast` sessions.
//!
//! [`PyCaretEngine`] implements [`bat_forecast::AutoMlEngine`] on top of
//! PyCaret's experiment API, running in the Python interpreter PyO3 links
//! against.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use bat_forecast::{Dataset, WorkflowController};
//! use bat_learning::PyCaretEngine;
//!
//! let engine = PyCaretEngine::new()?;
//! let mut controller = WorkflowController::new(engine);
//! controller.load_dataset(Dataset::from_path("sales.csv")?);
//! controller.select_target("revenue")?;
//! let board = controller.start()?;
//! ```
//!
//! # Engine Calls
//!
//! | Session step | PyCaret call |
//! |--------------|--------------|
//! | configure | `RegressionExperiment().setup(data, target, ...)` |
//! | search | `compare_models(sort, include, fold)` then `pull()` |
//! | predict | `predict_model(best, data)["prediction_label"]` |
//!
//! # Environment
//!
//! `BAT_PYTHONPATH` lists extra directories (separated like `PATH`) to put
//! on `sys.path` before PyCaret is imported.

pub mod engine;
pub mod error;
pub mod python;

pub use engine::{PyCaretEngine, PyCaretExperiment, PyCaretModel};
pub use error::{ArrowConversionKind, LearningError};
pub use python::runtime::{PYTHONPATH_VAR, initialize, is_initialized};
