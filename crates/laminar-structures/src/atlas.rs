// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Labeled reference volume and the region-id <-> matrix-row convention.

## Indexing convention

Row `r` of a region probability matrix describes the atlas region labeled
`r + 1`. Label `0` is background and never receives a value from a matrix.
[`region_id_for_row`] and [`row_for_region_id`] are the only places this
offset is applied.
*/

use std::collections::BTreeMap;

use ndarray::Array3;

use crate::error::LaminarResult;
use crate::loaders::AtlasVolumeLoader;

/// Integer label of an atlas region
pub type RegionId = u32;

/// Label used for voxels outside every region
pub const BACKGROUND_LABEL: RegionId = 0;

/// Atlas label described by matrix row `row`
#[inline]
pub fn region_id_for_row(row: usize) -> RegionId {
    row as RegionId + 1
}

/// Matrix row describing atlas label `region_id`, `None` for background
#[inline]
pub fn row_for_region_id(region_id: RegionId) -> Option<usize> {
    region_id.checked_sub(1).map(|row| row as usize)
}

/// Immutable labeled template volume
#[derive(Debug, Clone)]
pub struct BrainAtlas {
    name: String,
    template: Array3<RegionId>,
    region_ids: Vec<RegionId>,
}

impl BrainAtlas {
    /// Build an atlas from a labeled volume; `region_ids` are the sorted
    /// distinct labels, background included.
    pub fn new(name: impl Into<String>, template: Array3<RegionId>) -> Self {
        let mut region_ids: Vec<RegionId> = template.iter().copied().collect();
        region_ids.sort_unstable();
        region_ids.dedup();
        Self {
            name: name.into(),
            template,
            region_ids,
        }
    }

    /// Load the template through the external volume loader.
    ///
    /// Loader failures surface as `LaminarError::Configuration`.
    pub fn from_loader(loader: &dyn AtlasVolumeLoader) -> LaminarResult<Self> {
        let volume = loader.load_volume()?;
        let atlas = Self::new(volume.name, volume.labels);
        tracing::info!(
            "Loaded atlas {} with {} labels, shape {:?}",
            atlas.name,
            atlas.n_regions(),
            atlas.shape()
        );
        Ok(atlas)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &Array3<RegionId> {
        &self.template
    }

    /// Sorted distinct labels, including background
    pub fn region_ids(&self) -> &[RegionId] {
        &self.region_ids
    }

    pub fn n_regions(&self) -> usize {
        self.region_ids.len()
    }

    /// Labels other than background, i.e. the rows a matrix needs
    pub fn n_labelled_regions(&self) -> usize {
        self.region_ids
            .iter()
            .filter(|&&id| id != BACKGROUND_LABEL)
            .count()
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.template.dim()
    }

    /// Paint every voxel with the value mapped to its label.
    ///
    /// Labels missing from `value_map` (background included) become `0.0`.
    /// Keys that are not labels of this atlas have no voxels and are ignored.
    pub fn convert(&self, value_map: &BTreeMap<RegionId, f64>) -> Array3<f64> {
        self.template
            .mapv(|label| value_map.get(&label).copied().unwrap_or(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn four_label_atlas() -> BrainAtlas {
        let labels = Array3::from_shape_vec((2, 2, 2), vec![0, 1, 2, 3, 3, 2, 1, 0]).unwrap();
        BrainAtlas::new("test", labels)
    }

    #[test]
    fn test_region_ids_sorted_with_background() {
        let atlas = four_label_atlas();
        assert_eq!(atlas.region_ids(), &[0, 1, 2, 3]);
        assert_eq!(atlas.n_regions(), 4);
        assert_eq!(atlas.shape(), (2, 2, 2));
    }

    #[test]
    fn test_convert_maps_known_labels_only() {
        let atlas = four_label_atlas();
        let value_map = BTreeMap::from([(1, 0.5), (3, 0.9), (42, 7.0)]);

        let volume = atlas.convert(&value_map);

        for (label, value) in atlas.template().iter().zip(volume.iter()) {
            let expected = match label {
                1 => 0.5,
                3 => 0.9,
                _ => 0.0,
            };
            assert_eq!(*value, expected, "label {}", label);
        }
    }

    #[test]
    fn test_row_convention_is_one_based() {
        assert_eq!(region_id_for_row(0), 1);
        assert_eq!(region_id_for_row(999), 1000);
        assert_eq!(row_for_region_id(1), Some(0));
        assert_eq!(row_for_region_id(BACKGROUND_LABEL), None);
    }
}
