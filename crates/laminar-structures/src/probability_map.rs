// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! One class's region probabilities painted onto an atlas.

use std::path::{Path, PathBuf};

use ndarray::{Array2, Array3};

use crate::artifact::{read_artifact, write_artifact, ARTIFACT_EXTENSION};
use crate::error::{LaminarError, LaminarResult};
use crate::slicing::SlicePlane;

/// Volume with the atlas's shape, tagged with its class and atlas
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityMap {
    data: Array3<f64>,
    class_idx: usize,
    atlas_name: String,
}

impl ProbabilityMap {
    pub fn new(data: Array3<f64>, class_idx: usize, atlas_name: impl Into<String>) -> Self {
        Self {
            data,
            class_idx,
            atlas_name: atlas_name.into(),
        }
    }

    /// `class_{class_idx}_{atlas_name}.bin`
    pub fn file_name(class_idx: usize, atlas_name: &str) -> String {
        format!("class_{}_{}.{}", class_idx, atlas_name, ARTIFACT_EXTENSION)
    }

    /// Where this map lives inside a results-set directory
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(Self::file_name(self.class_idx, &self.atlas_name))
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub fn class_idx(&self) -> usize {
        self.class_idx
    }

    pub fn atlas_name(&self) -> &str {
        &self.atlas_name
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Slice `slice_idx` along `plane`, in canonical viewing orientation
    pub fn slice(&self, plane: SlicePlane, slice_idx: usize) -> LaminarResult<Array2<f64>> {
        let extent = self.data.len_of(plane.axis());
        if slice_idx >= extent {
            return Err(LaminarError::BadParameters(format!(
                "{} slice {} out of range (0..{})",
                plane, slice_idx, extent
            )));
        }
        Ok(plane.extract(&self.data, slice_idx))
    }

    /// Sagittal, coronal and horizontal slices, in that order
    pub fn multi_planar(
        &self,
        i_sagittal: usize,
        i_coronal: usize,
        i_horizontal: usize,
    ) -> LaminarResult<[Array2<f64>; 3]> {
        Ok([
            self.slice(SlicePlane::Sagittal, i_sagittal)?,
            self.slice(SlicePlane::Coronal, i_coronal)?,
            self.slice(SlicePlane::Horizontal, i_horizontal)?,
        ])
    }

    pub fn save(&self, path: &Path) -> LaminarResult<()> {
        write_artifact(path, &self.data)
    }

    pub fn load(path: &Path, class_idx: usize, atlas_name: &str) -> LaminarResult<Self> {
        let data: Array3<f64> = read_artifact(path)?;
        Ok(Self::new(data, class_idx, atlas_name))
    }

    /// Load classes `0..n_classes` from `dir`; `Ok(None)` unless every file is present.
    pub fn load_set(
        dir: &Path,
        n_classes: usize,
        atlas_name: &str,
    ) -> LaminarResult<Option<Vec<ProbabilityMap>>> {
        let paths: Vec<PathBuf> = (0..n_classes)
            .map(|class_idx| dir.join(Self::file_name(class_idx, atlas_name)))
            .collect();
        if n_classes == 0 || !paths.iter().all(|path| path.is_file()) {
            return Ok(None);
        }
        paths
            .iter()
            .enumerate()
            .map(|(class_idx, path)| Self::load(path, class_idx, atlas_name))
            .collect::<LaminarResult<Vec<_>>>()
            .map(Some)
    }
}
