// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! One-way ANOVA of a region's class probability against a group label.

use std::collections::BTreeMap;

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnovaRow {
    pub f: f64,
    pub p: f64,
    pub n_obs: usize,
    pub n_groups: usize,
}

impl AnovaRow {
    pub fn degenerate(n_obs: usize, n_groups: usize) -> Self {
        Self {
            f: f64::NAN,
            p: f64::NAN,
            n_obs,
            n_groups,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.f.is_nan()
    }
}

/// F test of the group effect.
///
/// NaN when there are fewer than two groups or no within-group degrees of
/// freedom.
pub fn one_way_anova(groups: &BTreeMap<&str, Vec<f64>>) -> AnovaRow {
    let groups: Vec<&Vec<f64>> = groups.values().filter(|g| !g.is_empty()).collect();
    let n_groups = groups.len();
    let n_obs: usize = groups.iter().map(|g| g.len()).sum();
    if n_groups < 2 || n_obs <= n_groups {
        return AnovaRow::degenerate(n_obs, n_groups);
    }

    let grand_mean = groups.iter().flat_map(|g| g.iter()).sum::<f64>() / n_obs as f64;
    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for group in &groups {
        let mean = group.iter().sum::<f64>() / group.len() as f64;
        ss_between += group.len() as f64 * (mean - grand_mean).powi(2);
        ss_within += group.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    }

    let df_between = (n_groups - 1) as f64;
    let df_within = (n_obs - n_groups) as f64;

    if ss_within == 0.0 {
        return if ss_between == 0.0 {
            AnovaRow::degenerate(n_obs, n_groups)
        } else {
            AnovaRow {
                f: f64::INFINITY,
                p: 0.0,
                n_obs,
                n_groups,
            }
        };
    }

    let f = (ss_between / df_between) / (ss_within / df_within);
    let p = match FisherSnedecor::new(df_between, df_within) {
        Ok(dist) => dist.sf(f),
        Err(e) => {
            tracing::debug!("No F distribution for ({}, {}): {}", df_between, df_within, e);
            f64::NAN
        }
    };
    AnovaRow {
        f,
        p,
        n_obs,
        n_groups,
    }
}

/// ANOVA of class `class_idx` at region `region` across labelled observations.
///
/// Observations with a NaN probability are left out.
pub(crate) fn anova_region(
    region: usize,
    class_idx: usize,
    observations: &[(ArrayView2<'_, f64>, &str)],
) -> AnovaRow {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for (matrix, label) in observations {
        let value = matrix[[region, class_idx]];
        if !value.is_nan() {
            groups.entry(*label).or_default().push(value);
        }
    }
    one_way_anova(&groups)
}
