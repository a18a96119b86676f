// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Region probability matrix (PBR): one subject's region x class probabilities.

Axis 0 is the region axis, axis 1 the class axis. The class count is a hard
requirement; the region count is only compared against the atlas and a
mismatch is logged, since region counts drift between atlas versions.
*/

use std::collections::BTreeMap;
use std::path::Path;

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::artifact::{read_artifact, write_artifact, write_artifact_once};
use crate::atlas::{region_id_for_row, BrainAtlas, RegionId};
use crate::error::{LaminarError, LaminarResult};
use crate::probability_map::ProbabilityMap;

pub const REGION_AXIS: usize = 0;
pub const CLASS_AXIS: usize = 1;

/// Expected matrix dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixLayout {
    pub n_classes: usize,
    pub n_regions: usize,
}

impl MatrixLayout {
    pub fn new(n_classes: usize, n_regions: usize) -> Self {
        Self {
            n_classes,
            n_regions,
        }
    }

    /// One region row per non-background atlas label
    pub fn for_atlas(atlas: &BrainAtlas, n_classes: usize) -> Self {
        Self::new(n_classes, atlas.n_labelled_regions())
    }

    /// Check `data` against this layout.
    ///
    /// Wrong class count is a `Shape` error; wrong region count is logged.
    pub fn validate(&self, data: &Array2<f64>) -> LaminarResult<()> {
        let n_data_classes = data.len_of(Axis(CLASS_AXIS));
        if n_data_classes != self.n_classes {
            return Err(LaminarError::Shape {
                expected: self.n_classes,
                actual: n_data_classes,
            });
        }

        let n_data_regions = data.len_of(Axis(REGION_AXIS));
        if n_data_regions != self.n_regions {
            tracing::warn!(
                "Matrix has {} regions but the atlas labels {}",
                n_data_regions,
                self.n_regions
            );
        }
        Ok(())
    }
}

/// Validated region x class probability matrix
#[derive(Debug, Clone, PartialEq)]
pub struct RegionProbabilityMatrix {
    data: Array2<f64>,
    layout: MatrixLayout,
}

impl RegionProbabilityMatrix {
    pub fn try_new(data: Array2<f64>, layout: MatrixLayout) -> LaminarResult<Self> {
        layout.validate(&data)?;
        Ok(Self { data, layout })
    }

    /// Swap in new data; the old data is kept if validation fails.
    pub fn replace_data(&mut self, data: Array2<f64>) -> LaminarResult<()> {
        self.layout.validate(&data)?;
        self.data = data;
        Ok(())
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn into_data(self) -> Array2<f64> {
        self.data
    }

    pub fn layout(&self) -> MatrixLayout {
        self.layout
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn n_regions(&self) -> usize {
        self.data.len_of(Axis(REGION_AXIS))
    }

    pub fn n_classes(&self) -> usize {
        self.data.len_of(Axis(CLASS_AXIS))
    }

    fn check_class(&self, class_idx: usize) -> LaminarResult<()> {
        if class_idx >= self.n_classes() {
            return Err(LaminarError::BadParameters(format!(
                "Class index {} out of range (0..{})",
                class_idx,
                self.n_classes()
            )));
        }
        Ok(())
    }

    /// Column `class_idx` keyed by region id
    pub fn region_vector(&self, class_idx: usize) -> LaminarResult<BTreeMap<RegionId, f64>> {
        self.check_class(class_idx)?;
        Ok(self
            .data
            .column(class_idx)
            .iter()
            .enumerate()
            .map(|(row, probability)| (region_id_for_row(row), *probability))
            .collect())
    }

    pub fn project(&self, class_idx: usize, atlas: &BrainAtlas) -> LaminarResult<ProbabilityMap> {
        let values = self.region_vector(class_idx)?;
        Ok(ProbabilityMap::new(
            atlas.convert(&values),
            class_idx,
            atlas.name(),
        ))
    }

    /// One map per class, in class order
    pub fn project_all(&self, atlas: &BrainAtlas) -> LaminarResult<Vec<ProbabilityMap>> {
        (0..self.n_classes())
            .map(|class_idx| self.project(class_idx, atlas))
            .collect()
    }

    pub fn save(&self, path: &Path) -> LaminarResult<()> {
        write_artifact(path, &self.data)
    }

    /// Read a matrix written by [`save`](Self::save) and validate it.
    pub fn load(path: &Path, layout: MatrixLayout) -> LaminarResult<Self> {
        let data: Array2<f64> = read_artifact(path)?;
        Self::try_new(data, layout)
    }

    /// Project every class into `dir`, leaving existing files untouched.
    ///
    /// Returns the number of files written.
    pub fn save_all_projections(&self, dir: &Path, atlas: &BrainAtlas) -> LaminarResult<usize> {
        let mut written = 0;
        for class_idx in 0..self.n_classes() {
            let path = dir.join(ProbabilityMap::file_name(class_idx, atlas.name()));
            if path.exists() {
                continue;
            }
            let map = self.project(class_idx, atlas)?;
            if write_artifact_once(&path, map.data())? {
                written += 1;
            }
        }
        tracing::debug!("Wrote {} projections to {}", written, dir.display());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn atlas() -> BrainAtlas {
        let labels = Array3::from_shape_vec((1, 2, 2), vec![0, 1, 2, 2]).unwrap();
        BrainAtlas::new("tiny", labels)
    }

    fn matrix() -> RegionProbabilityMatrix {
        let data = Array2::from_shape_vec((2, 3), vec![0.2, 0.3, 0.5, 0.6, 0.1, 0.3]).unwrap();
        RegionProbabilityMatrix::try_new(data, MatrixLayout::new(3, 3)).unwrap()
    }

    #[test]
    fn test_wrong_class_count_is_shape_error() {
        let data = Array2::zeros((1000, 5));
        let result = RegionProbabilityMatrix::try_new(data, MatrixLayout::new(6, 1000));
        assert!(matches!(
            result,
            Err(LaminarError::Shape {
                expected: 6,
                actual: 5
            })
        ));
    }

    #[test]
    fn test_region_mismatch_is_tolerated() {
        let data = Array2::zeros((10, 6));
        let pbr = RegionProbabilityMatrix::try_new(data, MatrixLayout::new(6, 1000)).unwrap();
        assert_eq!(pbr.n_regions(), 10);
    }

    #[test]
    fn test_layout_for_atlas_skips_background() {
        let atlas = atlas();
        assert!(atlas.region_ids().contains(&0));
        let layout = MatrixLayout::for_atlas(&atlas, 3);
        assert_eq!(layout.n_regions, atlas.n_regions() - 1);
        assert_eq!(layout.n_regions, matrix().n_regions());
    }

    #[test]
    fn test_replace_data_revalidates() {
        let mut pbr = matrix();
        assert!(pbr.replace_data(Array2::zeros((2, 4))).is_err());
        assert_eq!(pbr.n_classes(), 3);
        pbr.replace_data(Array2::ones((5, 3))).unwrap();
        assert_eq!(pbr.shape(), (5, 3));
    }

    #[test]
    fn test_region_vector_uses_region_ids() {
        let vector = matrix().region_vector(2).unwrap();
        assert_eq!(vector, BTreeMap::from([(1, 0.5), (2, 0.3)]));
        assert!(matrix().region_vector(3).is_err());
    }

    #[test]
    fn test_project_paints_rows_onto_labels() {
        let atlas = atlas();
        let map = matrix().project(0, &atlas).unwrap();
        assert_eq!(map.class_idx(), 0);
        assert_eq!(map.atlas_name(), "tiny");
        assert_eq!(map.data().iter().copied().collect::<Vec<_>>(), vec![0.0, 0.2, 0.6, 0.6]);
        assert_eq!(matrix().project_all(&atlas).unwrap().len(), 3);
    }

    #[test]
    fn test_save_all_projections_is_write_once() {
        let dir = tempfile::tempdir().unwrap();
        let atlas = atlas();
        let pbr = matrix();

        assert_eq!(pbr.save_all_projections(dir.path(), &atlas).unwrap(), 3);
        assert_eq!(pbr.save_all_projections(dir.path(), &atlas).unwrap(), 0);

        let loaded = ProbabilityMap::load(
            &dir.path().join(ProbabilityMap::file_name(1, "tiny")),
            1,
            "tiny",
        )
        .unwrap();
        assert_eq!(loaded.data()[[0, 0, 1]], 0.3);
    }

    #[test]
    fn test_save_load_revalidates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subject.pbr");
        matrix().save(&path).unwrap();

        assert_eq!(
            RegionProbabilityMatrix::load(&path, MatrixLayout::new(3, 2)).unwrap(),
            RegionProbabilityMatrix::try_new(matrix().into_data(), MatrixLayout::new(3, 2)).unwrap()
        );
        assert!(RegionProbabilityMatrix::load(&path, MatrixLayout::new(6, 2)).is_err());
    }
}
