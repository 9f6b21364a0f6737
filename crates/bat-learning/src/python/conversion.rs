//! Data interchange between Rust and PyCaret.
//!
//! - **Training data**: Polars DataFrame → Arrow IPC bytes → pyarrow Table →
//!   pandas DataFrame. Arrow keeps the column dtypes intact, so PyCaret sees
//!   the same numeric/categorical split the session resolved.
//! - **Prediction rows**: a validated [`PredictionRow`] becomes a one-row
//!   pandas DataFrame with the columns in training order.
//! - **Results**: the first row of `pull()` becomes a [`Leaderboard`], and the
//!   `prediction_label` column of `predict_model` a [`PredictionValue`].
//! - **Errors**: Python exceptions are mapped to [`LearningError`] by type name.
//!
//! # Data Flow: Rust → Python
//!
//! ```text
//! Polars DataFrame
//!       │
//!       ▼ IpcWriter::new(Cursor<Vec<u8>>).finish()
//! Arrow IPC bytes
//!       │
//!       ▼ io.BytesIO(bytes) → pyarrow.ipc.open_file(buffer).read_all()
//! PyArrow Table
//!       │
//!       ▼ table.to_pandas()
//! pandas DataFrame
//! ```

use bat_forecast::{FeatureValue, Leaderboard, PredictionRow, PredictionValue, SortMetric};
use polars::prelude::*;
use pyo3::prelude::*;
use pyo3::types::{PyBytes, PyDict, PyFloat, PyList, PyString};
use std::io::Cursor;

use crate::error::{ArrowConversionKind, LearningError};

/// Column PyCaret writes predictions to.
pub const PREDICTION_COLUMN: &str = "prediction_label";

/// Column of `pull()` holding the human-readable model name.
const MODEL_NAME_COLUMN: &str = "Model";

/// Convert a Polars DataFrame to a pandas DataFrame via Arrow IPC.
///
/// The frame is cloned because `IpcWriter::finish` needs `&mut DataFrame`.
#[must_use = "the converted pandas DataFrame should be used"]
pub fn dataframe_to_python<'py>(
    py: Python<'py>,
    df: &DataFrame,
) -> Result<Bound<'py, PyAny>, LearningError> {
    let mut df = df.clone();

    let mut cursor = Cursor::new(Vec::new());
    IpcWriter::new(&mut cursor)
        .finish(&mut df)
        .map_err(|e| ArrowConversionKind::Serialize(e.to_string()))?;
    let py_bytes = PyBytes::new(py, &cursor.into_inner());

    let buffer = py.import("io")?.call_method1("BytesIO", (py_bytes,))?;
    let reader = py.import("pyarrow.ipc")?.call_method1("open_file", (buffer,))?;
    let table = reader.call_method0("read_all")?;
    let pandas_df = table.call_method0("to_pandas")?;

    Ok(pandas_df)
}

/// Build a one-row pandas DataFrame from a validated prediction row.
#[must_use = "the converted pandas DataFrame should be used"]
pub fn row_to_python<'py>(
    py: Python<'py>,
    row: &PredictionRow,
) -> Result<Bound<'py, PyAny>, LearningError> {
    let values: Vec<Bound<'py, PyAny>> = row
        .values()
        .iter()
        .map(|value| match value {
            FeatureValue::Number(n) => PyFloat::new(py, *n).into_any(),
            FeatureValue::Text(text) => PyString::new(py, text).into_any(),
        })
        .collect();
    let data = PyList::new(py, [PyList::new(py, values)?])?;

    let kwargs = PyDict::new(py);
    kwargs.set_item("columns", row.columns().to_vec())?;

    let frame = py
        .import("pandas")?
        .call_method("DataFrame", (data,), Some(&kwargs))?;
    Ok(frame)
}

/// The best model's row from the comparison grid returned by `pull()`.
///
/// PyCaret sorts the grid by the requested metric, so the first row is the
/// winner; its index label is the model id (e.g. `lr`).
pub fn extract_leaderboard(
    results: &Bound<'_, PyAny>,
    sort_metric: SortMetric,
) -> Result<Leaderboard, LearningError> {
    if results.len()? == 0 {
        return Err(LearningError::SearchFailed(
            "the comparison grid is empty".to_string(),
        ));
    }

    let best = results.getattr("iloc")?.get_item(0)?;
    let model_name: String = best.get_item(MODEL_NAME_COLUMN)?.extract().map_err(|e| {
        ArrowConversionKind::TypeConversion(format!("model name is not text: {e}"))
    })?;
    let model_id: Option<String> = best.getattr("name").and_then(|n| n.extract()).ok();

    let mut metrics = Vec::new();
    let items = best.call_method0("to_dict")?.call_method0("items")?;
    for item in items.try_iter()? {
        let item = item?;
        let key: String = item.get_item(0)?.extract()?;
        if let Ok(value) = item.get_item(1)?.extract::<f64>() {
            metrics.push((key, value));
        }
    }

    Ok(build_leaderboard(model_name, model_id, metrics, sort_metric))
}

/// Assemble a [`Leaderboard`] from one row of the comparison grid.
///
/// The model name column and non-finite values are skipped.
pub fn build_leaderboard(
    model_name: String,
    model_id: Option<String>,
    metrics: impl IntoIterator<Item = (String, f64)>,
    sort_metric: SortMetric,
) -> Leaderboard {
    let mut board = Leaderboard::new(model_name, sort_metric);
    if let Some(id) = model_id {
        board = board.with_model_id(id);
    }
    for (name, value) in metrics {
        if name != MODEL_NAME_COLUMN && value.is_finite() {
            board = board.with_metric(name, value);
        }
    }
    board
}

/// Read the single prediction out of a `predict_model` result frame.
pub fn extract_prediction(scored: &Bound<'_, PyAny>) -> Result<PredictionValue, LearningError> {
    let value = scored
        .get_item(PREDICTION_COLUMN)
        .map_err(|e| {
            ArrowConversionKind::TypeConversion(format!(
                "result has no '{PREDICTION_COLUMN}' column: {e}"
            ))
        })?
        .getattr("iloc")?
        .get_item(0)?;

    // Labels may be numpy bools; keep those as text rather than 0/1.
    if value.is_instance_of::<pyo3::types::PyBool>() || is_numpy_bool(&value) {
        return Ok(PredictionValue::Label(value.str()?.to_string()));
    }
    if let Ok(number) = value.extract::<f64>() {
        return Ok(PredictionValue::Number(number));
    }
    Ok(PredictionValue::Label(value.str()?.to_string()))
}

fn is_numpy_bool(value: &Bound<'_, PyAny>) -> bool {
    value
        .get_type()
        .name()
        .map(|name| name.to_string() == "bool_")
        .unwrap_or(false)
}

/// Map Python exceptions to [`LearningError`] variants by type name.
pub fn map_python_error(py: Python<'_>, err: PyErr) -> LearningError {
    let error_type = err
        .get_type(py)
        .qualname()
        .map(|s| s.to_string())
        .unwrap_or_default();
    let message = err.value(py).to_string();

    match error_type.as_str() {
        "ValueError" | "KeyError" | "TypeError" => LearningError::InvalidData(message),
        "ImportError" | "ModuleNotFoundError" => LearningError::RuntimeInit(message),
        _ => LearningError::Python {
            message: format!("{error_type}: {message}"),
        },
    }
}
