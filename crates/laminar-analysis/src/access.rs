// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Read side consumed by visualisation front ends.

[`ResultsAccess`] owns the atlas, registry, aggregator and engine built at
start-up and serves probability maps, slices and result tables. Result tables
are persisted under `results_dir` and reused until [`ResultsAccess::bust_cache`]
removes them.
*/

use std::fs;
use std::str::FromStr;

use ndarray::Array2;
use parking_lot::RwLock;

use laminar_config::LaminarConfig;
use laminar_structures::{
    BrainAtlas, LaminarError, NeoFfiTrait, ProbabilityMap, SlicePlane, SliceSummary,
    SubjectAttribute, SubjectId, SubjectRegistry,
};

use crate::aggregator::{CohortAggregator, MEAN_IDENTIFIER, STD_IDENTIFIER};
use crate::error::AnalysisResult;
use crate::stats::tables::{ANOVA_DIR, REGRESSION_DIR};
use crate::stats::{AnovaSummary, AnovaTable, RegressionTable, StatisticsEngine};

/// Maps of the results set currently shown
#[derive(Debug, Clone)]
struct ResultsSet {
    identifier: String,
    maps: Vec<ProbabilityMap>,
}

#[derive(Debug)]
pub struct ResultsAccess {
    config: LaminarConfig,
    atlas: BrainAtlas,
    registry: SubjectRegistry,
    aggregator: CohortAggregator,
    engine: StatisticsEngine,
    current: RwLock<Option<ResultsSet>>,
}

impl ResultsAccess {
    /// Cohort is every registered subject that has a matrix.
    ///
    /// Fails with `Shape` when a matrix does not have the configured class
    /// count.
    pub fn new(
        config: LaminarConfig,
        atlas: BrainAtlas,
        registry: SubjectRegistry,
    ) -> AnalysisResult<Self> {
        let aggregator = CohortAggregator::from_registry(
            &registry,
            config.atlas.n_classes,
            config.paths.results_dir.clone(),
        )?;
        let engine = StatisticsEngine::from_config(&config);
        Ok(Self {
            config,
            atlas,
            registry,
            aggregator,
            engine,
            current: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &LaminarConfig {
        &self.config
    }

    pub fn atlas(&self) -> &BrainAtlas {
        &self.atlas
    }

    pub fn registry(&self) -> &SubjectRegistry {
        &self.registry
    }

    pub fn aggregator(&self) -> &CohortAggregator {
        &self.aggregator
    }

    pub fn engine(&self) -> &StatisticsEngine {
        &self.engine
    }

    /// `n_classes` maps for `"mean"`, `"std"` or a cohort subject id
    pub fn get_results_set(&self, identifier: &str) -> AnalysisResult<Vec<ProbabilityMap>> {
        let maps = match identifier {
            MEAN_IDENTIFIER => self.aggregator.mean_probability_maps(&self.atlas)?,
            STD_IDENTIFIER => self.aggregator.std_probability_maps(&self.atlas)?,
            other => {
                let id = SubjectId::from_str(other).map_err(|_| {
                    LaminarError::BadParameters(format!("Unknown results set '{}'", other))
                })?;
                self.aggregator.subject_probability_maps(&id, &self.atlas)?
            }
        };
        Ok(maps)
    }

    /// Make `identifier` the set served by [`get_slice`](Self::get_slice).
    pub fn set_results_set(&self, identifier: &str) -> AnalysisResult<()> {
        let maps = self.get_results_set(identifier)?;
        *self.current.write() = Some(ResultsSet {
            identifier: identifier.to_string(),
            maps,
        });
        tracing::debug!("Current results set is {}", identifier);
        Ok(())
    }

    pub fn current_identifier(&self) -> Option<String> {
        self.current.read().as_ref().map(|set| set.identifier.clone())
    }

    /// Slice of the current set, the mean set when none was chosen
    pub fn get_slice(
        &self,
        plane: SlicePlane,
        class_idx: usize,
        slice_idx: usize,
    ) -> AnalysisResult<Array2<f64>> {
        if self.current.read().is_none() {
            self.set_results_set(MEAN_IDENTIFIER)?;
        }
        let guard = self.current.read();
        let maps = guard.as_ref().map(|set| set.maps.as_slice()).unwrap_or_default();
        let map = maps.get(class_idx).ok_or_else(|| {
            LaminarError::BadParameters(format!(
                "Class index {} out of range (0..{})",
                class_idx,
                maps.len()
            ))
        })?;
        Ok(map.slice(plane, slice_idx)?)
    }

    /// Slice plus its rounded summary statistics
    pub fn get_slice_with_summary(
        &self,
        plane: SlicePlane,
        class_idx: usize,
        slice_idx: usize,
    ) -> AnalysisResult<(Array2<f64>, Option<SliceSummary>)> {
        let slice = self.get_slice(plane, class_idx, slice_idx)?;
        let summary = SliceSummary::of(&slice).map(|s| s.rounded());
        Ok((slice, summary))
    }

    /// Scores for `name`: a NEO-FFI trait, else a measurement, else a CANTAB measure.
    pub fn scores_for(&self, name: &str) -> std::collections::BTreeMap<SubjectId, f64> {
        if let Ok(neo_trait) = NeoFfiTrait::from_str(name) {
            return self.registry.neo_ffi_scores(neo_trait);
        }
        let measurements = self.registry.measurement_scores(name);
        if !measurements.is_empty() {
            return measurements;
        }
        self.registry.cantab_scores(name)
    }

    /// Persisted table if present, otherwise computed and persisted.
    ///
    /// A name no subject has a score for is `BadParameters`; nothing is
    /// fitted or written for it.
    pub fn get_regression_table(&self, measurement: &str) -> AnalysisResult<RegressionTable> {
        let results_dir = self.aggregator.results_dir();
        if let Some(table) = RegressionTable::load(results_dir, measurement)? {
            tracing::debug!("Loaded regression table for {}", measurement);
            return Ok(table);
        }
        let scores = self.scores_for(measurement);
        if scores.is_empty() {
            return Err(LaminarError::BadParameters(format!(
                "Unknown measurement '{}': no NEO-FFI trait, measurement or CANTAB score has this name",
                measurement
            ))
            .into());
        }
        let table = self
            .engine
            .regression(measurement, self.aggregator.subjects(), &scores)?;
        table.save(results_dir)?;
        Ok(table)
    }

    pub fn get_anova_table(&self, attribute: &str, class_idx: usize) -> AnalysisResult<AnovaTable> {
        let attribute = SubjectAttribute::from_str(attribute)?;
        let results_dir = self.aggregator.results_dir();
        if let Some(table) = AnovaTable::load(results_dir, attribute.name(), class_idx)? {
            tracing::debug!("Loaded ANOVA table for {} class {}", attribute, class_idx);
            return Ok(table);
        }
        let labels = self.registry.categorical(attribute);
        let table = self.engine.anova(
            attribute.name(),
            class_idx,
            self.aggregator.subjects(),
            &labels,
        )?;
        table.save(results_dir)?;
        Ok(table)
    }

    /// Every class of `attribute`, thresholded at the configured significance
    pub fn get_anova_summary(&self, attribute: &str) -> AnalysisResult<AnovaSummary> {
        let tables = (0..self.aggregator.n_classes())
            .map(|class_idx| self.get_anova_table(attribute, class_idx))
            .collect::<AnalysisResult<Vec<_>>>()?;
        Ok(AnovaSummary {
            attribute: attribute.to_string(),
            significance: self.config.analysis.significance,
            tables,
        })
    }

    /// Remove every persisted map and table and forget the current set.
    pub fn bust_cache(&self) -> AnalysisResult<()> {
        self.aggregator.remove_persisted_maps()?;
        let results_dir = self.aggregator.results_dir();
        let subject_dirs = self.aggregator.subjects().iter().map(|(id, _)| id.as_str());
        for name in [REGRESSION_DIR, ANOVA_DIR].into_iter().chain(subject_dirs) {
            let dir = results_dir.join(name);
            if dir.is_dir() {
                fs::remove_dir_all(&dir).map_err(LaminarError::from)?;
            }
        }
        *self.current.write() = None;
        tracing::info!("Cleared cached results in {}", results_dir.display());
        Ok(())
    }
}
