// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use laminar_structures::LaminarError;

/// Errors raised by aggregation and the statistical sweeps
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Data(#[from] LaminarError),

    /// Sweep stopped through its cancellation flag
    #[error("Sweep cancelled after {completed} of {total} regions")]
    Cancelled { completed: usize, total: usize },
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
