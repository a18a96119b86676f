// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Canonical 2-D views of a volume.
//!
//! The viewer expects every slice in a fixed orientation:
//! - sagittal: `fliplr(rot90_cw(volume[i, :, :]))`
//! - coronal: `rot90_cw(volume[:, i, :])`
//! - horizontal: `rot90_cw(volume[:, :, i])`
//!
//! where `rot90_cw` is a quarter turn clockwise.

use std::fmt::Display;
use std::str::FromStr;

use ndarray::{Array2, Array3, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::LaminarError;

type Slicer = fn(&Array3<f64>, usize) -> Array2<f64>;

/// Anatomical viewing plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlicePlane {
    Sagittal,
    Coronal,
    Horizontal,
}

/// Indexed by `SlicePlane as usize`
const SLICERS: [Slicer; 3] = [sagittal_slice, coronal_slice, horizontal_slice];

impl SlicePlane {
    pub const ALL: [SlicePlane; 3] = [
        SlicePlane::Sagittal,
        SlicePlane::Coronal,
        SlicePlane::Horizontal,
    ];

    /// Volume axis the slice index runs along
    pub fn axis(self) -> Axis {
        Axis(self as usize)
    }

    pub fn name(self) -> &'static str {
        match self {
            SlicePlane::Sagittal => "sagittal",
            SlicePlane::Coronal => "coronal",
            SlicePlane::Horizontal => "horizontal",
        }
    }

    /// Extract slice `index` in canonical orientation; caller checks bounds.
    pub(crate) fn extract(self, volume: &Array3<f64>, index: usize) -> Array2<f64> {
        SLICERS[self as usize](volume, index)
    }
}

impl Display for SlicePlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SlicePlane {
    type Err = LaminarError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SlicePlane::ALL
            .into_iter()
            .find(|plane| plane.name().eq_ignore_ascii_case(value))
            .ok_or_else(|| {
                LaminarError::BadParameters(format!(
                    "Unknown slice plane '{}', expected sagittal, coronal or horizontal",
                    value
                ))
            })
    }
}

fn rot90_cw(plane: ArrayView2<f64>) -> Array2<f64> {
    let mut rotated = plane.reversed_axes();
    rotated.invert_axis(Axis(1));
    rotated.as_standard_layout().into_owned()
}

fn sagittal_slice(volume: &Array3<f64>, index: usize) -> Array2<f64> {
    let mut slice = rot90_cw(volume.index_axis(Axis(0), index));
    slice.invert_axis(Axis(1));
    slice.as_standard_layout().into_owned()
}

fn coronal_slice(volume: &Array3<f64>, index: usize) -> Array2<f64> {
    rot90_cw(volume.index_axis(Axis(1), index))
}

fn horizontal_slice(volume: &Array3<f64>, index: usize) -> Array2<f64> {
    rot90_cw(volume.index_axis(Axis(2), index))
}

/// Min/max/mean/std of a slice, shown next to each view
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SliceSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
}

impl SliceSummary {
    /// `None` for an empty slice
    pub fn of(slice: &Array2<f64>) -> Option<Self> {
        let mean = slice.mean()?;
        let min = slice.iter().copied().fold(f64::INFINITY, f64::min);
        let max = slice.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Self {
            min,
            max,
            mean,
            std: slice.std(0.0),
        })
    }

    /// Every field rounded to two decimals
    pub fn rounded(&self) -> Self {
        let round2 = |v: f64| (v * 100.0).round() / 100.0;
        Self {
            min: round2(self.min),
            max: round2(self.max),
            mean: round2(self.mean),
            std: round2(self.std),
        }
    }
}
