// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Laminar - cortical-layer cohort analysis
//!
//! Aggregates per-subject region probability matrices (probability of each
//! cortical tissue class within each atlas region) into cohort statistics,
//! projects region values onto a labeled atlas for viewing, and fits
//! per-region regression and ANOVA models.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use laminar::prelude::*;
//!
//! let config = load_config(None, None)?;
//! let atlas = BrainAtlas::from_loader(&BincodeAtlasLoader::new(
//!     config.atlas.name.clone(),
//!     config.paths.atlas_path.clone(),
//! ))?;
//!
//! let mut registry = SubjectRegistry::new();
//! // ... register subjects, then attach their matrices
//! let layout = MatrixLayout::for_atlas(&atlas, config.atlas.n_classes);
//! registry.attach_matrices(&MatrixDirectoryLoader::new(config.paths.data_dir.clone()), layout)?;
//!
//! let access = ResultsAccess::new(config, atlas, registry)?;
//! let coronal = access.get_slice(SlicePlane::Coronal, 0, 45)?;
//! let table = access.get_regression_table("neuroticism")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: laminar-config, laminar-structures         │
//! │  (configuration, atlas, matrices, subjects, artifacts)  │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Algorithms: laminar-analysis                           │
//! │  (aggregation, regression, ANOVA, results access)       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

// Re-export foundation
pub use laminar_config as config;
pub use laminar_structures as structures;

// Re-export algorithms
pub use laminar_analysis as analysis;

// Re-export infrastructure
pub use laminar_observability as observability;

/// Prelude - commonly used types and functions
pub mod prelude {
    pub use laminar_analysis::{
        AnalysisError, AnalysisResult, AnovaRow, AnovaSummary, AnovaTable, CohortAggregator,
        RegressionRow, RegressionTable, ResultsAccess, StatisticsEngine, SweepOptions,
    };
    pub use laminar_config::{load_config, validate_config, ExecutionMode, LaminarConfig};
    pub use laminar_structures::{
        BincodeAtlasLoader, BrainAtlas, LaminarError, LaminarResult, MatrixDirectoryLoader,
        MatrixLayout, ProbabilityMap, RegionProbabilityMatrix, SlicePlane, SliceSummary,
        Subject, SubjectAttribute, SubjectData, SubjectId, SubjectRegistry,
    };
}
