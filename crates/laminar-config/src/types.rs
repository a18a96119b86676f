// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! Each struct maps to a section of `laminar_configuration.toml`. Every
//! section is `#[serde(default)]`, so a partial file only overrides what it
//! names.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::ConfigError;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LaminarConfig {
    pub system: SystemConfig,
    pub paths: PathsConfig,
    pub atlas: AtlasConfig,
    pub analysis: AnalysisConfig,
}

/// System-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Worker threads for parallel sweeps (0 = auto-detect)
    pub max_cores: usize,
    pub log_level: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            max_cores: 0,
            log_level: "info".to_string(),
        }
    }
}

/// Input and output locations
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding one persisted matrix file per subject
    pub data_dir: PathBuf,
    /// Root of every cached artifact (summaries, probability maps, tables)
    pub results_dir: PathBuf,
    /// Persisted atlas template volume
    pub atlas_path: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            results_dir: PathBuf::from("results"),
            atlas_path: PathBuf::from("templates/AAL1000.atlas"),
        }
    }
}

/// Atlas identity and matrix layout
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AtlasConfig {
    pub name: String,
    /// Number of cortical tissue classes (class axis length)
    pub n_classes: usize,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            name: "AAL".to_string(),
            n_classes: 6,
        }
    }
}

/// How per-region sweeps are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Sequential,
    #[default]
    Parallel,
}

impl FromStr for ExecutionMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "sequential" => Ok(ExecutionMode::Sequential),
            "parallel" => Ok(ExecutionMode::Parallel),
            other => Err(ConfigError::InvalidValue(format!(
                "execution must be 'sequential' or 'parallel', got '{}'",
                other
            ))),
        }
    }
}

/// Statistical engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub execution: ExecutionMode,
    /// Regions evaluated between cancellation checks
    pub chunk_size: usize,
    /// Threshold used when summarising significant regions
    pub significance: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            execution: ExecutionMode::Parallel,
            chunk_size: 100,
            significance: 0.05,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_mode_parsing() {
        assert_eq!("Parallel".parse::<ExecutionMode>().unwrap(), ExecutionMode::Parallel);
        assert_eq!(
            "sequential".parse::<ExecutionMode>().unwrap(),
            ExecutionMode::Sequential
        );
        assert!("threaded".parse::<ExecutionMode>().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: LaminarConfig = toml::from_str("[atlas]\nname = \"Schaefer\"\n").unwrap();
        assert_eq!(config.atlas.name, "Schaefer");
        assert_eq!(config.atlas.n_classes, 6);
        assert_eq!(config.analysis.execution, ExecutionMode::Parallel);
    }

    #[test]
    fn test_execution_mode_from_toml() {
        let config: LaminarConfig =
            toml::from_str("[analysis]\nexecution = \"sequential\"\nchunk_size = 10\n").unwrap();
        assert_eq!(config.analysis.execution, ExecutionMode::Sequential);
        assert_eq!(config.analysis.chunk_size, 10);
    }
}
