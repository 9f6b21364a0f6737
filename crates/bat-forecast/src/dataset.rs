//! The session's active dataset.
//!
//! A [`Dataset`] wraps a Polars [`DataFrame`] together with a description of
//! where it came from. Polars already guarantees that every column has the
//! same length, so a `Dataset` is always rectangular. Replacing the dataset
//! is done wholesale through the controller; the frame itself is never
//! mutated in place.

use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ForecastError, Result, SchemaError};

/// Format of the file a dataset was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    Csv,
    Excel,
    /// Built directly from a DataFrame.
    InMemory,
}

impl FileFormat {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Excel => "excel",
            FileFormat::InMemory => "in_memory",
        }
    }

    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Ok(FileFormat::Csv),
            "xlsx" | "xls" => Ok(FileFormat::Excel),
            other => Err(ForecastError::Dataset(format!(
                "Unsupported file type '{}' for {}. Upload a .csv, .xlsx or .xls file",
                other,
                path.display()
            ))),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a column is fed to the model as a number or as a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

impl ColumnKind {
    /// Classify a Polars dtype. Integers and floats are numeric; everything
    /// else (text, booleans, dates, categoricals) is categorical.
    #[must_use]
    pub fn of(dtype: &DataType) -> Self {
        if is_numeric_dtype(dtype) {
            ColumnKind::Numeric
        } else {
            ColumnKind::Categorical
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Check if a Polars dtype is numeric.
fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// A tabular dataset plus its provenance.
#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
    name: String,
    format: FileFormat,
}

impl Dataset {
    /// Wrap an in-memory DataFrame.
    #[must_use]
    pub fn new(frame: DataFrame) -> Self {
        Self::with_source(frame, "dataset", FileFormat::InMemory)
    }

    /// Wrap a DataFrame that was parsed from a named file.
    #[must_use]
    pub fn with_source(frame: DataFrame, name: impl Into<String>, format: FileFormat) -> Self {
        Self {
            frame,
            name: name.into(),
            format,
        }
    }

    /// Load a dataset from disk.
    ///
    /// CSV files are parsed with Polars. Excel files are recognised but not
    /// parsed here; the caller must convert them first.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ForecastError::Dataset(format!(
                "Input file not found: {}",
                path.display()
            )));
        }

        let format = FileFormat::from_path(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let frame = match format {
            FileFormat::Csv => read_csv(path)?,
            FileFormat::Excel | FileFormat::InMemory => {
                return Err(ForecastError::Dataset(format!(
                    "Cannot parse {} files directly; convert '{}' to CSV first",
                    format, name
                )));
            }
        };

        info!(
            "Loaded dataset '{}': {} rows x {} columns",
            name,
            frame.height(),
            frame.width()
        );
        Ok(Self::with_source(frame, name, format))
    }

    #[must_use]
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn format(&self) -> FileFormat {
        self.format
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.frame.width()
    }

    /// Column names in dataset order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }

    /// Look up a column as a materialized series.
    pub fn series(&self, name: &str) -> std::result::Result<&Series, SchemaError> {
        self.frame
            .column(name)
            .map(|column| column.as_materialized_series())
            .map_err(|_| SchemaError::UnknownColumn(name.to_string()))
    }

    /// A copy of this dataset without the given columns.
    ///
    /// Every excluded name must exist. Polars frames share column buffers,
    /// so the copy does not duplicate data.
    pub fn without_columns(&self, excluded: &[String]) -> Result<Dataset> {
        if excluded.is_empty() {
            return Ok(self.clone());
        }

        for name in excluded {
            if !self.has_column(name) {
                return Err(SchemaError::UnknownColumn(name.clone()).into());
            }
        }

        let kept: Vec<String> = self
            .column_names()
            .into_iter()
            .filter(|name| !excluded.contains(name))
            .collect();
        debug!("Keeping {} of {} columns", kept.len(), self.width());

        let frame = self.frame.select(kept)?;
        Ok(Self::with_source(frame, self.name.clone(), self.format))
    }

    /// Row/column counts, missing values and memory use, per column and overall.
    #[must_use]
    pub fn summary(&self) -> DatasetSummary {
        let columns: Vec<ColumnSummary> = self
            .frame
            .get_columns()
            .iter()
            .map(|column| {
                let dtype = column.dtype();
                ColumnSummary {
                    name: column.name().to_string(),
                    dtype: dtype.to_string(),
                    kind: ColumnKind::of(dtype),
                    missing: column.null_count(),
                }
            })
            .collect();

        DatasetSummary {
            name: self.name.clone(),
            format: self.format,
            rows: self.frame.height(),
            columns: self.frame.width(),
            missing_values: columns.iter().map(|c| c.missing).sum(),
            memory_bytes: self.frame.estimated_size(),
            column_summaries: columns,
        }
    }
}

fn read_csv(path: &Path) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
        .map_err(|e| ForecastError::Dataset(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Description of a dataset for display before modelling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub name: String,
    pub format: FileFormat,
    pub rows: usize,
    pub columns: usize,
    /// Total null cells across all columns.
    pub missing_values: usize,
    /// Estimated in-memory size of the frame.
    pub memory_bytes: usize,
    pub column_summaries: Vec<ColumnSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub dtype: String,
    pub kind: ColumnKind,
    pub missing: usize,
}
