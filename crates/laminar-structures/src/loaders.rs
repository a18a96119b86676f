// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Contracts for the external collaborators that feed the data model.

Spreadsheet and imaging parsers live outside this workspace; they plug in by
implementing these traits. Two file-backed loaders over the workspace's own
artifact format and a set of in-memory loaders are provided.
*/

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::artifact::{read_artifact, write_artifact};
use crate::atlas::RegionId;
use crate::error::{LaminarError, LaminarResult};
use crate::subject::{CantabResults, NeoFfiResult, SubjectId, SubjectMeasurements, SubjectRecord};

/// Extension of raw subject matrix files read by [`MatrixDirectoryLoader`]
pub const MATRIX_EXTENSION: &str = "pbr";

/// Labeled template volume plus its name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtlasVolume {
    pub name: String,
    pub labels: Array3<RegionId>,
}

impl AtlasVolume {
    pub fn save(&self, path: &Path) -> LaminarResult<()> {
        write_artifact(path, self)
    }
}

pub trait AtlasVolumeLoader {
    /// Failures are reported as `LaminarError::Configuration`.
    fn load_volume(&self) -> LaminarResult<AtlasVolume>;
}

pub trait SubjectMatrixLoader {
    /// Raw region x class arrays keyed by subject id
    fn load_matrices(&self) -> LaminarResult<Vec<(SubjectId, Array2<f64>)>>;
}

pub trait SubjectAttributesLoader {
    fn load_subjects(&self) -> LaminarResult<Vec<SubjectRecord>>;
}

/// Psychometric and behavioral scores per subject.
///
/// Each table defaults to empty so a source only implements what it has.
pub trait ScoresLoader {
    fn measurements(&self) -> LaminarResult<BTreeMap<SubjectId, SubjectMeasurements>> {
        Ok(BTreeMap::new())
    }

    fn cantab(&self) -> LaminarResult<BTreeMap<SubjectId, CantabResults>> {
        Ok(BTreeMap::new())
    }

    fn neo_ffi(&self) -> LaminarResult<BTreeMap<SubjectId, NeoFfiResult>> {
        Ok(BTreeMap::new())
    }
}

/// Atlas stored as a bincode [`AtlasVolume`]; the stored name is replaced by `name`.
#[derive(Debug, Clone)]
pub struct BincodeAtlasLoader {
    pub name: String,
    pub path: PathBuf,
}

impl BincodeAtlasLoader {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

impl AtlasVolumeLoader for BincodeAtlasLoader {
    fn load_volume(&self) -> LaminarResult<AtlasVolume> {
        if !self.path.is_file() {
            return Err(LaminarError::configuration(
                &self.path,
                "atlas template not found",
            ));
        }
        let volume: AtlasVolume = read_artifact(&self.path).map_err(|e| match e {
            LaminarError::Persistence { path, reason } => LaminarError::Configuration { path, reason },
            other => other,
        })?;
        Ok(AtlasVolume {
            name: self.name.clone(),
            labels: volume.labels,
        })
    }
}

/// Every `<subject id>.pbr` file of a directory, in path order
#[derive(Debug, Clone)]
pub struct MatrixDirectoryLoader {
    pub dir: PathBuf,
}

impl MatrixDirectoryLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn matrix_paths(&self) -> LaminarResult<Vec<PathBuf>> {
        let entries =
            fs::read_dir(&self.dir).map_err(|e| LaminarError::configuration(&self.dir, e))?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some(MATRIX_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

impl SubjectMatrixLoader for MatrixDirectoryLoader {
    fn load_matrices(&self) -> LaminarResult<Vec<(SubjectId, Array2<f64>)>> {
        let paths = self.matrix_paths()?;
        let mut matrices = Vec::with_capacity(paths.len());
        for path in paths {
            let stem = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or_default();
            let id = SubjectId::new(stem).map_err(|e| {
                LaminarError::Validation(format!("{} ({})", e, path.display()))
            })?;
            matrices.push((id, read_artifact(&path)?));
        }
        tracing::info!(
            "Loaded {} subject matrices from {}",
            matrices.len(),
            self.dir.display()
        );
        Ok(matrices)
    }
}

#[derive(Debug, Clone)]
pub struct InMemoryAtlasLoader(pub AtlasVolume);

impl AtlasVolumeLoader for InMemoryAtlasLoader {
    fn load_volume(&self) -> LaminarResult<AtlasVolume> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryMatrixLoader(pub Vec<(SubjectId, Array2<f64>)>);

impl SubjectMatrixLoader for InMemoryMatrixLoader {
    fn load_matrices(&self) -> LaminarResult<Vec<(SubjectId, Array2<f64>)>> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryAttributesLoader(pub Vec<SubjectRecord>);

impl SubjectAttributesLoader for InMemoryAttributesLoader {
    fn load_subjects(&self) -> LaminarResult<Vec<SubjectRecord>> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryScoresLoader {
    pub measurements: BTreeMap<SubjectId, SubjectMeasurements>,
    pub cantab: BTreeMap<SubjectId, CantabResults>,
    pub neo_ffi: BTreeMap<SubjectId, NeoFfiResult>,
}

impl ScoresLoader for InMemoryScoresLoader {
    fn measurements(&self) -> LaminarResult<BTreeMap<SubjectId, SubjectMeasurements>> {
        Ok(self.measurements.clone())
    }

    fn cantab(&self) -> LaminarResult<BTreeMap<SubjectId, CantabResults>> {
        Ok(self.cantab.clone())
    }

    fn neo_ffi(&self) -> LaminarResult<BTreeMap<SubjectId, NeoFfiResult>> {
        Ok(self.neo_ffi.clone())
    }
}
