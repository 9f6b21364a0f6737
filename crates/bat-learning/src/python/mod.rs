//! Python interop module.
//!
//! This module handles the embedded interpreter and the data handed to and
//! from PyCaret.

pub mod conversion;
pub mod runtime;
