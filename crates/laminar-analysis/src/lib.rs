// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# Laminar Analysis

Cohort-level computations over subject region probability matrices:

- [`CohortAggregator`]: stack, mean, std and the probability maps derived from them
- [`StatisticsEngine`]: per-region regression and one-way ANOVA sweeps
- [`ResultsAccess`]: the read side used by visualisation front ends
*/

pub mod access;
pub mod aggregator;
pub mod cache;
pub mod error;
pub mod stats;

pub use access::ResultsAccess;
pub use aggregator::{CohortAggregator, CohortSubjects};
pub use cache::GenerationCache;
pub use error::{AnalysisError, AnalysisResult};
pub use stats::{
    AnovaRow, AnovaSummary, AnovaTable, RegressionRow, RegressionTable, StatisticsEngine,
    SweepOptions,
};
