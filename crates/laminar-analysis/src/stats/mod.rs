// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Per-region statistical engine.

Each region is fitted independently from its own rows of the cohort
matrices, so sweeps can run on the rayon pool (see [`sweep`]). Missing
scores and labels are handled per subject: a subject without one is simply
not an observation.
*/

pub mod anova;
pub mod regression;
pub mod sweep;
pub mod tables;

pub use anova::{one_way_anova, AnovaRow};
pub use regression::{fit_ols_no_intercept, RegressionRow};
pub use sweep::{sweep_regions, SweepOptions};
pub use tables::{AnovaSummary, AnovaTable, RegressionTable};

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ndarray::ArrayView2;
use rayon::{ThreadPool, ThreadPoolBuilder};

use laminar_config::{ExecutionMode, LaminarConfig};
use laminar_structures::{LaminarError, RegionProbabilityMatrix, SubjectId};

use crate::error::AnalysisResult;

pub struct StatisticsEngine {
    options: SweepOptions,
    pool: Option<ThreadPool>,
    cancel: Arc<AtomicBool>,
}

impl std::fmt::Debug for StatisticsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatisticsEngine")
            .field("options", &self.options)
            .field("dedicated_pool", &self.pool.is_some())
            .finish()
    }
}

impl Default for StatisticsEngine {
    fn default() -> Self {
        Self::new(SweepOptions::default())
    }
}

impl StatisticsEngine {
    /// Engine using the global rayon pool
    pub fn new(options: SweepOptions) -> Self {
        Self {
            options,
            pool: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Execution mode and chunk size from `[analysis]`; a dedicated pool of
    /// `system.max_cores` threads when that is non-zero.
    pub fn from_config(config: &LaminarConfig) -> Self {
        let mut engine = Self::new(SweepOptions {
            mode: config.analysis.execution,
            chunk_size: config.analysis.chunk_size,
        });
        let max_cores = config.system.max_cores;
        if max_cores > 0 && config.analysis.execution == ExecutionMode::Parallel {
            match ThreadPoolBuilder::new().num_threads(max_cores).build() {
                Ok(pool) => engine.pool = Some(pool),
                Err(e) => tracing::warn!(
                    "Could not build a {}-thread pool, using the global pool: {}",
                    max_cores,
                    e
                ),
            }
        }
        engine
    }

    pub fn options(&self) -> SweepOptions {
        self.options
    }

    /// Flag that stops running sweeps at the next chunk boundary
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn reset_cancel(&self) {
        self.cancel.store(false, Ordering::Relaxed);
    }

    fn sweep<T, F>(&self, n_regions: usize, fit: F) -> AnalysisResult<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match &self.pool {
            Some(pool) => {
                pool.install(|| sweep_regions(n_regions, self.options, &self.cancel, fit))
            }
            None => sweep_regions(n_regions, self.options, &self.cancel, fit),
        }
    }

    /// Regress `scores` on each region's class probabilities.
    pub fn regression(
        &self,
        measurement: &str,
        cohort: &[(SubjectId, RegionProbabilityMatrix)],
        scores: &BTreeMap<SubjectId, f64>,
    ) -> AnalysisResult<RegressionTable> {
        let (n_regions, n_classes) = cohort_shape(cohort)?;
        let observations: Vec<(ArrayView2<'_, f64>, f64)> = cohort
            .iter()
            .filter_map(|(id, pbr)| Some((pbr.data().view(), *scores.get(id)?)))
            .collect();
        tracing::info!(
            "Regression of {} over {} regions with {} scored subjects",
            measurement,
            n_regions,
            observations.len()
        );

        let rows = self.sweep(n_regions, |region| {
            regression::regress_region(region, &observations, n_classes)
        })?;
        Ok(RegressionTable {
            measurement: measurement.to_string(),
            n_classes,
            rows,
        })
    }

    /// One-way ANOVA of class `class_idx` against `labels` for each region.
    pub fn anova(
        &self,
        attribute: &str,
        class_idx: usize,
        cohort: &[(SubjectId, RegionProbabilityMatrix)],
        labels: &BTreeMap<SubjectId, String>,
    ) -> AnalysisResult<AnovaTable> {
        let (n_regions, n_classes) = cohort_shape(cohort)?;
        if class_idx >= n_classes {
            return Err(LaminarError::BadParameters(format!(
                "Class index {} out of range (0..{})",
                class_idx, n_classes
            ))
            .into());
        }

        let observations: Vec<(ArrayView2<'_, f64>, &str)> = cohort
            .iter()
            .filter_map(|(id, pbr)| Some((pbr.data().view(), labels.get(id)?.as_str())))
            .collect();
        tracing::info!(
            "ANOVA of class {} by {} over {} regions with {} labelled subjects",
            class_idx,
            attribute,
            n_regions,
            observations.len()
        );

        let rows = self.sweep(n_regions, |region| {
            anova::anova_region(region, class_idx, &observations)
        })?;
        Ok(AnovaTable {
            attribute: attribute.to_string(),
            class_idx,
            rows,
        })
    }

    /// ANOVA for every class of one attribute
    pub fn anova_summary(
        &self,
        attribute: &str,
        cohort: &[(SubjectId, RegionProbabilityMatrix)],
        labels: &BTreeMap<SubjectId, String>,
        significance: f64,
    ) -> AnalysisResult<AnovaSummary> {
        let (_, n_classes) = cohort_shape(cohort)?;
        let tables = (0..n_classes)
            .map(|class_idx| self.anova(attribute, class_idx, cohort, labels))
            .collect::<AnalysisResult<Vec<_>>>()?;
        Ok(AnovaSummary {
            attribute: attribute.to_string(),
            significance,
            tables,
        })
    }
}

/// Shared `(n_regions, n_classes)` of the cohort
fn cohort_shape(cohort: &[(SubjectId, RegionProbabilityMatrix)]) -> AnalysisResult<(usize, usize)> {
    let (_, first) = cohort
        .first()
        .ok_or_else(|| LaminarError::BadParameters("Cohort is empty".to_string()))?;
    let expected = first.shape();
    for (id, pbr) in cohort {
        if pbr.shape() != expected {
            return Err(LaminarError::InconsistentShape {
                subject: id.to_string(),
                expected,
                actual: pbr.shape(),
            }
            .into());
        }
    }
    Ok(expected)
}
