//! Error types for the bat-learning crate.
//!
//! [`LearningError`] describes what went wrong on the Python side. The engine
//! converts it into a [`bat_forecast::EngineError`] for the phase it occurred
//! in, so the session can tell configure, search and predict failures apart.

use bat_forecast::EngineError;
use thiserror::Error;

/// Specific kinds of Arrow conversion errors.
///
/// Used when handing DataFrames from Polars to pandas via Arrow IPC.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum ArrowConversionKind {
    /// Failed to serialize a Polars DataFrame to Arrow IPC bytes.
    #[error("serialization failed: {0}")]
    Serialize(String),

    /// A Python value could not be mapped to the expected Rust type.
    #[error("type conversion failed: {0}")]
    TypeConversion(String),
}

/// The main error type for PyCaret operations.
///
/// Python exceptions are converted by type name:
/// - `ValueError` / `KeyError` / `TypeError` → [`InvalidData`](Self::InvalidData)
/// - `ImportError` / `ModuleNotFoundError` → [`RuntimeInit`](Self::RuntimeInit)
/// - Other Python exceptions → [`Python`](Self::Python)
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LearningError {
    /// Failed to initialize the Python runtime or import PyCaret.
    ///
    /// Check that pycaret, pandas and pyarrow are installed for the Python
    /// interpreter PyO3 links against, or point `BAT_PYTHONPATH` at them.
    #[error("Runtime initialization failed: {0}")]
    RuntimeInit(String),

    /// PyCaret rejected the data it was given.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The model comparison finished without a usable model.
    #[error("Model comparison failed: {0}")]
    SearchFailed(String),

    /// An error raised in the Python runtime.
    #[error("Python error: {message}")]
    Python {
        /// The Python exception message.
        message: String,
    },

    /// Failed to convert data between Rust and Python via Arrow.
    #[error("Arrow conversion error: {0}")]
    ArrowConversion(#[from] ArrowConversionKind),
}

impl From<pyo3::PyErr> for LearningError {
    fn from(err: pyo3::PyErr) -> Self {
        LearningError::Python {
            message: err.to_string(),
        }
    }
}

impl LearningError {
    fn runtime_or(self, phase: impl FnOnce(String) -> EngineError) -> EngineError {
        match self {
            LearningError::RuntimeInit(message) => EngineError::Runtime(message),
            other => phase(other.to_string()),
        }
    }

    pub(crate) fn into_configure_error(self) -> EngineError {
        self.runtime_or(EngineError::Configure)
    }

    pub(crate) fn into_search_error(self) -> EngineError {
        self.runtime_or(EngineError::Search)
    }

    /// Predict failures name the feature column the message mentions, if any.
    pub(crate) fn into_predict_error(self, feature_names: &[String]) -> EngineError {
        self.runtime_or(|message| EngineError::Predict {
            column: column_from_message(&message, feature_names),
            message,
        })
    }
}

/// The first feature whose quoted name appears in `message`.
///
/// pandas and scikit-learn quote offending column names in their messages,
/// e.g. `could not convert string to float: 'abc'` or `column 'city' ...`.
pub fn column_from_message(message: &str, feature_names: &[String]) -> Option<String> {
    feature_names
        .iter()
        .find(|name| {
            message.contains(&format!("'{name}'")) || message.contains(&format!("\"{name}\""))
        })
        .cloned()
}
