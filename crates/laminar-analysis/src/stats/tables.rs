// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Region-indexed result tables and their persisted form.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use laminar_structures::artifact::{read_artifact_if_exists, write_artifact, ARTIFACT_EXTENSION};
use laminar_structures::{region_id_for_row, LaminarResult, RegionId};

use super::anova::AnovaRow;
use super::regression::RegressionRow;

pub const REGRESSION_DIR: &str = "regression";
pub const ANOVA_DIR: &str = "anova";

/// File-name form of a measurement or attribute name: anything outside
/// `[A-Za-z0-9_-]` becomes `_`, so names cannot leave the table directory.
pub fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Regression of one measurement, row `r` describing region row `r`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTable {
    pub measurement: String,
    pub n_classes: usize,
    pub rows: Vec<RegressionRow>,
}

impl RegressionTable {
    /// `<results_dir>/regression/<measurement>.bin`
    pub fn path(results_dir: &Path, measurement: &str) -> PathBuf {
        results_dir
            .join(REGRESSION_DIR)
            .join(format!("{}.{}", file_stem(measurement), ARTIFACT_EXTENSION))
    }

    pub fn n_regions(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, region: usize) -> Option<&RegressionRow> {
        self.rows.get(region)
    }

    /// `(region id, row)` pairs in region order
    pub fn iter_regions(&self) -> impl Iterator<Item = (RegionId, &RegressionRow)> {
        self.rows
            .iter()
            .enumerate()
            .map(|(row, r)| (region_id_for_row(row), r))
    }

    /// Rows with at least one class p-value below `alpha`
    pub fn significant_regions(&self, alpha: f64) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.min_pvalue() < alpha)
            .map(|(region, _)| region)
            .collect()
    }

    pub fn save(&self, results_dir: &Path) -> LaminarResult<()> {
        write_artifact(&Self::path(results_dir, &self.measurement), self)
    }

    pub fn load(results_dir: &Path, measurement: &str) -> LaminarResult<Option<Self>> {
        read_artifact_if_exists(&Self::path(results_dir, measurement))
    }
}

/// ANOVA of one attribute for one class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnovaTable {
    pub attribute: String,
    pub class_idx: usize,
    pub rows: Vec<AnovaRow>,
}

impl AnovaTable {
    /// `<results_dir>/anova/<attribute>_class_<class_idx>.bin`
    pub fn path(results_dir: &Path, attribute: &str, class_idx: usize) -> PathBuf {
        results_dir.join(ANOVA_DIR).join(format!(
            "{}_class_{}.{}",
            file_stem(attribute),
            class_idx,
            ARTIFACT_EXTENSION
        ))
    }

    pub fn n_regions(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, region: usize) -> Option<&AnovaRow> {
        self.rows.get(region)
    }

    pub fn significant_regions(&self, alpha: f64) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.p < alpha)
            .map(|(region, _)| region)
            .collect()
    }

    pub fn save(&self, results_dir: &Path) -> LaminarResult<()> {
        write_artifact(
            &Self::path(results_dir, &self.attribute, self.class_idx),
            self,
        )
    }

    pub fn load(results_dir: &Path, attribute: &str, class_idx: usize) -> LaminarResult<Option<Self>> {
        read_artifact_if_exists(&Self::path(results_dir, attribute, class_idx))
    }
}

/// ANOVA of one attribute across every class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnovaSummary {
    pub attribute: String,
    pub significance: f64,
    /// One table per class, in class order
    pub tables: Vec<AnovaTable>,
}

impl AnovaSummary {
    /// Regions below the significance threshold, per class
    pub fn significant_by_class(&self) -> Vec<Vec<usize>> {
        self.tables
            .iter()
            .map(|table| table.significant_regions(self.significance))
            .collect()
    }
}
