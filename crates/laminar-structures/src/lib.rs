// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# Laminar Structures

Core data model for cortical-layer cohort analysis:

- [`BrainAtlas`]: labeled template volume and region-id conversion
- [`RegionProbabilityMatrix`]: one subject's region x class probabilities
- [`ProbabilityMap`]: a class projected onto the atlas, sliceable by [`SlicePlane`]
- [`SubjectRegistry`]: validated subjects and their side data
- [`loaders`]: contracts for the external parsers
- [`artifact`]: atomic bincode persistence
*/

pub mod artifact;
pub mod atlas;
pub mod error;
pub mod loaders;
pub mod pbr;
pub mod probability_map;
pub mod slicing;
pub mod subject;

pub use atlas::{region_id_for_row, row_for_region_id, BrainAtlas, RegionId, BACKGROUND_LABEL};
pub use error::{LaminarError, LaminarResult};
pub use loaders::{
    AtlasVolume, AtlasVolumeLoader, BincodeAtlasLoader, InMemoryAtlasLoader,
    InMemoryAttributesLoader, InMemoryMatrixLoader, InMemoryScoresLoader, MatrixDirectoryLoader,
    ScoresLoader, SubjectAttributesLoader, SubjectMatrixLoader,
};
pub use pbr::{MatrixLayout, RegionProbabilityMatrix, CLASS_AXIS, REGION_AXIS};
pub use probability_map::ProbabilityMap;
pub use slicing::{SlicePlane, SliceSummary};
pub use subject::{
    CantabResults, DataSlot, MeasurementRecord, NeoFfiResult, NeoFfiTrait, Subject,
    SubjectAttribute, SubjectAttributes, SubjectData, SubjectId, SubjectMeasurements,
    SubjectRecord, SubjectRegistry,
};
