//! Python runtime initialization.
//!
//! PyCaret runs in the interpreter PyO3 links against. [`initialize`] starts
//! it once, adds the directories listed in `BAT_PYTHONPATH` to `sys.path`
//! and checks that the packages the engine needs can be imported.
//!
//! # Thread Safety
//!
//! [`initialize`] may be called from any thread. Only the first call does
//! the work; later calls return the cached result.

use crate::error::LearningError;
use pyo3::prelude::*;
use std::env;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Result of the one-time initialization, error message on failure.
static INIT_RESULT: OnceLock<Result<(), String>> = OnceLock::new();

/// Environment variable holding extra `sys.path` entries.
pub const PYTHONPATH_VAR: &str = "BAT_PYTHONPATH";

/// Modules that must import for the engine to work.
const REQUIRED_MODULES: &[&str] = &[
    "pandas",
    "pyarrow",
    "pycaret.regression",
    "pycaret.classification",
];

/// Start the interpreter and verify the PyCaret stack.
///
/// # Errors
///
/// Returns [`LearningError::RuntimeInit`] if a required module is missing.
#[must_use = "initialization may fail; check the Result"]
pub fn initialize() -> Result<(), LearningError> {
    match INIT_RESULT.get_or_init(do_initialize) {
        Ok(()) => Ok(()),
        Err(msg) => Err(LearningError::RuntimeInit(msg.clone())),
    }
}

/// Whether [`initialize`] has completed successfully.
pub fn is_initialized() -> bool {
    INIT_RESULT.get().is_some_and(|r| r.is_ok())
}

fn do_initialize() -> Result<(), String> {
    Python::initialize();

    let extra = env::var_os(PYTHONPATH_VAR)
        .map(|value| parse_python_paths(&value))
        .unwrap_or_default();

    Python::attach(|py| {
        extend_sys_path(py, &extra).map_err(|e| format!("Failed to extend sys.path: {e}"))?;
        verify_python_setup(py)?;

        let version: String = py
            .import("pycaret")
            .and_then(|m| m.getattr("__version__"))
            .and_then(|v| v.extract())
            .unwrap_or_else(|_| "<unknown>".to_string());
        info!("Python runtime ready (pycaret {})", version);
        Ok(())
    })
}

/// Split a path list the way the platform separates `PATH` entries.
pub fn parse_python_paths(value: &OsStr) -> Vec<PathBuf> {
    env::split_paths(value)
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}

fn extend_sys_path(py: Python<'_>, dirs: &[PathBuf]) -> PyResult<()> {
    if dirs.is_empty() {
        return Ok(());
    }

    let sys_path = py.import("sys")?.getattr("path")?;
    for dir in dirs.iter().rev() {
        debug!("Adding {} to sys.path", dir.display());
        sys_path.call_method1("insert", (0, dir.to_string_lossy().into_owned()))?;
    }
    Ok(())
}

fn verify_python_setup(py: Python<'_>) -> Result<(), String> {
    for module in REQUIRED_MODULES {
        py.import(*module)
            .map_err(|e| format!("Failed to import {module}: {e}"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    #[test]
    fn test_parse_python_paths() {
        let joined = env::join_paths(["/opt/venv/site-packages", "/srv/models"]).unwrap();
        assert_eq!(
            parse_python_paths(&joined),
            vec![
                PathBuf::from("/opt/venv/site-packages"),
                PathBuf::from("/srv/models")
            ]
        );
    }

    #[test]
    fn test_parse_python_paths_skips_empty_entries() {
        assert!(parse_python_paths(&OsString::new()).is_empty());
    }

    #[test]
    #[ignore = "Requires Python runtime with PyCaret"]
    fn test_initialize() {
        initialize().expect("Failed to initialize Python runtime");
        assert!(is_initialized());
        // A second call returns the cached result.
        assert!(initialize().is_ok());
    }
}
