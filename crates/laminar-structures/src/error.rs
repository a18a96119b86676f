// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

/// Errors raised by the laminar data model.
///
/// Every variant names the offending subject, region, index or file so the
/// caller can report it without extra context.
///
/// # Examples
/// ```
/// use laminar_structures::LaminarError;
///
/// fn check_classes(n: usize) -> Result<(), LaminarError> {
///     if n != 6 {
///         return Err(LaminarError::Shape { expected: 6, actual: n });
///     }
///     Ok(())
/// }
///
/// assert!(check_classes(5).is_err());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum LaminarError {
    /// Class axis of a region probability matrix has the wrong length
    #[error("Shape error: expected {expected} classes along axis 1, got {actual}")]
    Shape { expected: usize, actual: usize },

    /// A subject matrix differs in shape from the rest of the cohort
    #[error("Inconsistent shape for subject {subject}: expected {expected:?}, got {actual:?}")]
    InconsistentShape {
        subject: String,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// Input failed a validation rule (e.g. malformed subject id)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or unreadable atlas/data source
    #[error("Configuration error for {path}: {reason}")]
    Configuration { path: PathBuf, reason: String },

    /// Artifact could not be encoded or decoded
    #[error("Persistence error for {path}: {reason}")]
    Persistence { path: PathBuf, reason: String },

    /// Out-of-range index or unknown identifier
    #[error("Bad parameters: {0}")]
    BadParameters(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for data model operations
pub type LaminarResult<T> = Result<T, LaminarError>;

impl LaminarError {
    pub(crate) fn configuration(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        LaminarError::Configuration {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn persistence(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        LaminarError::Persistence {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
