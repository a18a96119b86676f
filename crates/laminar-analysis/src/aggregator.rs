// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Cohort aggregation: stacking, mean and standard deviation, and the cached
probability maps derived from them.

In-memory results are tied to the subject-collection generation and are
recomputed after any mutation. Maps persisted under `results_dir` are keyed
only by `(atlas name, "mean" | "std")`; when the cohort changes, the caller
removes them with [`CohortAggregator::remove_persisted_maps`]. A set is only
reused when every class file is present; otherwise the whole set is
recomputed and every class file rewritten.

Every cohort matrix must have the aggregator's class count.
*/

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::{Array3, ArrayView2, Axis};

use laminar_structures::artifact::write_artifact;
use laminar_structures::{
    BrainAtlas, LaminarError, LaminarResult, MatrixLayout, ProbabilityMap,
    RegionProbabilityMatrix, SubjectId, SubjectRegistry,
};

use crate::cache::GenerationCache;

pub const SUMMARY_DIR: &str = "summary";
pub const MEAN_IDENTIFIER: &str = "mean";
pub const STD_IDENTIFIER: &str = "std";
pub const MEAN_PBR_FILE: &str = "mean_pbr_matrix.bin";
pub const STD_PBR_FILE: &str = "std_pbr_matrix.bin";

/// Axis of the stacked cohort array that runs over subjects
pub const SUBJECT_AXIS: usize = 2;

pub type CohortSubjects = Vec<(SubjectId, RegionProbabilityMatrix)>;

#[derive(Debug)]
pub struct CohortAggregator {
    subjects: CohortSubjects,
    generation: u64,
    n_classes: usize,
    results_dir: PathBuf,
    stacked: GenerationCache<Array3<f64>>,
    mean: GenerationCache<RegionProbabilityMatrix>,
    std: GenerationCache<RegionProbabilityMatrix>,
}

impl CohortAggregator {
    pub fn new(
        subjects: CohortSubjects,
        n_classes: usize,
        results_dir: impl Into<PathBuf>,
    ) -> LaminarResult<Self> {
        check_class_count(&subjects, n_classes)?;
        Ok(Self {
            subjects,
            generation: 0,
            n_classes,
            results_dir: results_dir.into(),
            stacked: GenerationCache::new(),
            mean: GenerationCache::new(),
            std: GenerationCache::new(),
        })
    }

    /// Cohort of every registered subject that has a matrix
    pub fn from_registry(
        registry: &SubjectRegistry,
        n_classes: usize,
        results_dir: impl Into<PathBuf>,
    ) -> LaminarResult<Self> {
        Self::new(registry.matrices(), n_classes, results_dir)
    }

    pub fn subjects(&self) -> &[(SubjectId, RegionProbabilityMatrix)] {
        &self.subjects
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Bumped by every mutation of the subject collection
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn contains(&self, id: &SubjectId) -> bool {
        self.subjects.iter().any(|(subject, _)| subject == id)
    }

    /// Replace the cohort; on error the current cohort is kept.
    pub fn set_subjects(&mut self, subjects: CohortSubjects) -> LaminarResult<()> {
        check_class_count(&subjects, self.n_classes)?;
        self.subjects = subjects;
        self.bump_generation();
        Ok(())
    }

    pub fn push(&mut self, id: SubjectId, pbr: RegionProbabilityMatrix) -> LaminarResult<()> {
        if pbr.n_classes() != self.n_classes {
            return Err(LaminarError::Shape {
                expected: self.n_classes,
                actual: pbr.n_classes(),
            });
        }
        self.subjects.push((id, pbr));
        self.bump_generation();
        Ok(())
    }

    fn bump_generation(&mut self) {
        self.generation += 1;
        tracing::debug!(
            "Cohort changed ({} subjects), generation {}",
            self.subjects.len(),
            self.generation
        );
    }

    /// Stack every subject matrix into a `[region, class, subject]` array.
    ///
    /// All-or-nothing: the first subject whose shape differs from the first
    /// subject's aborts the stack.
    pub fn stack(&self) -> LaminarResult<Arc<Array3<f64>>> {
        self.stacked
            .get_or_try_insert(self.generation, || stack_subjects(&self.subjects))
    }

    pub fn mean(&self) -> LaminarResult<Arc<RegionProbabilityMatrix>> {
        self.mean.get_or_try_insert(self.generation, || {
            let stacked = self.stack()?;
            let mean = stacked
                .mean_axis(Axis(SUBJECT_AXIS))
                .ok_or_else(|| LaminarError::BadParameters("Cohort is empty".to_string()))?;
            RegionProbabilityMatrix::try_new(mean, self.layout())
        })
    }

    /// Population standard deviation (no degrees-of-freedom correction)
    pub fn std(&self) -> LaminarResult<Arc<RegionProbabilityMatrix>> {
        self.std.get_or_try_insert(self.generation, || {
            let stacked = self.stack()?;
            RegionProbabilityMatrix::try_new(stacked.std_axis(Axis(SUBJECT_AXIS), 0.0), self.layout())
        })
    }

    fn layout(&self) -> MatrixLayout {
        match self.subjects.first() {
            Some((_, pbr)) => pbr.layout(),
            None => MatrixLayout::new(self.n_classes, 0),
        }
    }

    /// Persist mean and std matrices under `summary/`.
    pub fn save_summary(&self) -> LaminarResult<()> {
        let dir = self.results_dir.join(SUMMARY_DIR);
        self.mean()?.save(&dir.join(MEAN_PBR_FILE))?;
        self.std()?.save(&dir.join(STD_PBR_FILE))?;
        tracing::info!("Saved cohort summary to {}", dir.display());
        Ok(())
    }

    pub fn mean_probability_maps(&self, atlas: &BrainAtlas) -> LaminarResult<Vec<ProbabilityMap>> {
        self.cached_maps(MEAN_IDENTIFIER, atlas, || self.mean())
    }

    pub fn std_probability_maps(&self, atlas: &BrainAtlas) -> LaminarResult<Vec<ProbabilityMap>> {
        self.cached_maps(STD_IDENTIFIER, atlas, || self.std())
    }

    /// Maps of a single cohort member, persisted under `<results_dir>/<id>/`
    pub fn subject_probability_maps(
        &self,
        id: &SubjectId,
        atlas: &BrainAtlas,
    ) -> LaminarResult<Vec<ProbabilityMap>> {
        let (_, pbr) = self
            .subjects
            .iter()
            .find(|(subject, _)| subject == id)
            .ok_or_else(|| {
                LaminarError::BadParameters(format!("Subject {} is not in the cohort", id))
            })?;
        self.cached_maps(id.as_str(), atlas, || Ok(Arc::new(pbr.clone())))
    }

    fn cached_maps<F>(
        &self,
        identifier: &str,
        atlas: &BrainAtlas,
        source: F,
    ) -> LaminarResult<Vec<ProbabilityMap>>
    where
        F: FnOnce() -> LaminarResult<Arc<RegionProbabilityMatrix>>,
    {
        let dir = self.results_dir.join(identifier);
        if let Some(maps) = ProbabilityMap::load_set(&dir, self.n_classes, atlas.name())? {
            tracing::debug!("Loaded {} maps for {} from {}", maps.len(), identifier, dir.display());
            return Ok(maps);
        }

        let maps = source()?.project_all(atlas)?;
        for map in &maps {
            write_artifact(&map.path_in(&dir), map.data())?;
        }
        tracing::info!(
            "Projected {} {} maps onto {} into {}",
            maps.len(),
            identifier,
            atlas.name(),
            dir.display()
        );
        Ok(maps)
    }

    /// Delete persisted summary matrices and mean/std maps.
    pub fn remove_persisted_maps(&self) -> LaminarResult<()> {
        for name in [SUMMARY_DIR, MEAN_IDENTIFIER, STD_IDENTIFIER] {
            let dir = self.results_dir.join(name);
            if dir.is_dir() {
                fs::remove_dir_all(&dir)?;
                tracing::info!("Removed cached results in {}", dir.display());
            }
        }
        Ok(())
    }

    /// Write the stacked cohort array, for offline inspection
    pub fn save_stack(&self, path: &Path) -> LaminarResult<()> {
        write_artifact(path, &*self.stack()?)
    }
}

fn check_class_count(
    subjects: &[(SubjectId, RegionProbabilityMatrix)],
    n_classes: usize,
) -> LaminarResult<()> {
    match subjects.iter().find(|(_, pbr)| pbr.n_classes() != n_classes) {
        Some((id, pbr)) => {
            tracing::warn!(
                "Subject {} has {} classes, cohort expects {}",
                id,
                pbr.n_classes(),
                n_classes
            );
            Err(LaminarError::Shape {
                expected: n_classes,
                actual: pbr.n_classes(),
            })
        }
        None => Ok(()),
    }
}

fn stack_subjects(subjects: &[(SubjectId, RegionProbabilityMatrix)]) -> LaminarResult<Array3<f64>> {
    let (_, first) = subjects
        .first()
        .ok_or_else(|| LaminarError::BadParameters("Cohort is empty".to_string()))?;
    let expected = first.shape();

    for (id, pbr) in subjects {
        if pbr.shape() != expected {
            return Err(LaminarError::InconsistentShape {
                subject: id.to_string(),
                expected,
                actual: pbr.shape(),
            });
        }
    }

    let views: Vec<ArrayView2<f64>> = subjects.iter().map(|(_, pbr)| pbr.data().view()).collect();
    ndarray::stack(Axis(SUBJECT_AXIS), &views)
        .map_err(|e| LaminarError::BadParameters(format!("Failed to stack cohort: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn pbr(values: &[f64], rows: usize, cols: usize) -> RegionProbabilityMatrix {
        let data = Array2::from_shape_vec((rows, cols), values.to_vec()).unwrap();
        RegionProbabilityMatrix::try_new(data, MatrixLayout::new(cols, rows)).unwrap()
    }

    fn id(n: u64) -> SubjectId {
        SubjectId::from_numeric(n).unwrap()
    }

    #[test]
    fn test_stack_shape() {
        let subjects = (0..4).map(|n| (id(n), pbr(&[0.0; 6], 3, 2))).collect();
        let aggregator = CohortAggregator::new(subjects, 2, "unused").unwrap();
        assert_eq!(aggregator.stack().unwrap().dim(), (3, 2, 4));
    }

    #[test]
    fn test_inconsistent_shape_names_subject() {
        let subjects = vec![
            (id(1), pbr(&[0.0; 6], 3, 2)),
            (id(2), pbr(&[0.0; 4], 2, 2)),
        ];
        let aggregator = CohortAggregator::new(subjects, 2, "unused").unwrap();
        match aggregator.mean() {
            Err(LaminarError::InconsistentShape { subject, expected, actual }) => {
                assert_eq!(subject, "000000002");
                assert_eq!(expected, (3, 2));
                assert_eq!(actual, (2, 2));
            }
            other => panic!("expected InconsistentShape, got {:?}", other),
        }
    }

    #[test]
    fn test_repeated_subject_mean_and_std() {
        let values = [0.1, 0.9, 0.25, 0.75, 0.6, 0.4];
        let subjects = (0..5).map(|n| (id(n), pbr(&values, 3, 2))).collect();
        let aggregator = CohortAggregator::new(subjects, 2, "unused").unwrap();

        let mean = aggregator.mean().unwrap();
        for (m, v) in mean.data().iter().zip(values.iter()) {
            assert!((m - v).abs() < 1e-12);
        }
        assert!(aggregator.std().unwrap().data().iter().all(|s| s.abs() < 1e-12));
    }

    #[test]
    fn test_mutation_invalidates_mean() {
        let mut aggregator =
            CohortAggregator::new(vec![(id(1), pbr(&[1.0, 0.0], 1, 2))], 2, "unused").unwrap();
        assert_eq!(aggregator.mean().unwrap().data()[[0, 0]], 1.0);

        aggregator.push(id(2), pbr(&[0.0, 1.0], 1, 2)).unwrap();
        assert_eq!(aggregator.generation(), 1);
        assert_eq!(aggregator.mean().unwrap().data()[[0, 0]], 0.5);
        assert_eq!(aggregator.std().unwrap().data()[[0, 0]], 0.5);

        aggregator.set_subjects(Vec::new()).unwrap();
        assert!(aggregator.mean().is_err());
    }

    #[test]
    fn test_mean_maps_are_persisted_then_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let labels = Array3::from_shape_vec((1, 2, 2), vec![0, 1, 2, 1]).unwrap();
        let atlas = BrainAtlas::new("AAL", labels);

        let subjects = vec![
            (id(1), pbr(&[0.2, 0.8, 0.4, 0.6], 2, 2)),
            (id(2), pbr(&[0.4, 0.6, 0.8, 0.2], 2, 2)),
        ];
        let mut aggregator = CohortAggregator::new(subjects, 2, dir.path()).unwrap();
        let first = aggregator.mean_probability_maps(&atlas).unwrap();
        assert!(dir.path().join("mean").join("class_0_AAL.bin").is_file());

        // membership is not part of the persisted key
        aggregator.set_subjects(vec![(id(3), pbr(&[0.0; 4], 2, 2))]).unwrap();
        let second = aggregator.mean_probability_maps(&atlas).unwrap();
        assert_eq!(first, second);

        aggregator.remove_persisted_maps().unwrap();
        let third = aggregator.mean_probability_maps(&atlas).unwrap();
        assert!(third[0].data().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_subject_maps_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let atlas = BrainAtlas::new("AAL", Array3::from_elem((2, 1, 1), 1));
        let aggregator =
            CohortAggregator::new(vec![(id(4), pbr(&[0.3, 0.7], 1, 2))], 2, dir.path()).unwrap();

        let maps = aggregator.subject_probability_maps(&id(4), &atlas).unwrap();
        assert_eq!(maps[1].data()[[1, 0, 0]], 0.7);
        assert!(dir.path().join("000000004").join("class_1_AAL.bin").is_file());
        assert!(aggregator.subject_probability_maps(&id(5), &atlas).is_err());

        aggregator.save_summary().unwrap();
        assert!(dir.path().join(SUMMARY_DIR).join(MEAN_PBR_FILE).is_file());
        assert!(dir.path().join(SUMMARY_DIR).join(STD_PBR_FILE).is_file());
    }

    #[test]
    fn test_partial_map_set_is_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let atlas = BrainAtlas::new("AAL", Array3::from_elem((1, 1, 1), 1));

        // an earlier cohort left only its first class file behind
        let stale = CohortAggregator::new(vec![(id(1), pbr(&[0.9, 0.1], 1, 2))], 2, dir.path())
            .unwrap();
        stale.mean_probability_maps(&atlas).unwrap();
        fs::remove_file(dir.path().join("mean").join("class_1_AAL.bin")).unwrap();

        let aggregator =
            CohortAggregator::new(vec![(id(2), pbr(&[0.2, 0.8], 1, 2))], 2, dir.path()).unwrap();
        let first = aggregator.mean_probability_maps(&atlas).unwrap();
        let second = aggregator.mean_probability_maps(&atlas).unwrap();

        assert_eq!(first[0].data()[[0, 0, 0]], 0.2);
        assert_eq!(first[1].data()[[0, 0, 0]], 0.8);
        assert_eq!(first, second);
    }

    #[test]
    fn test_class_count_mismatch_is_rejected() {
        let three_classes = vec![(id(1), pbr(&[0.2, 0.3, 0.5], 1, 3))];
        assert!(matches!(
            CohortAggregator::new(three_classes.clone(), 2, "unused"),
            Err(LaminarError::Shape { expected: 2, actual: 3 })
        ));

        let mut aggregator =
            CohortAggregator::new(vec![(id(1), pbr(&[0.5, 0.5], 1, 2))], 2, "unused").unwrap();
        assert!(aggregator.push(id(2), pbr(&[0.2, 0.3, 0.5], 1, 3)).is_err());
        assert!(aggregator.set_subjects(three_classes).is_err());
        assert_eq!(aggregator.len(), 1);
        assert_eq!(aggregator.generation(), 0);
    }
}
