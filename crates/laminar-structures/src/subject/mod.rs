// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Subjects: validated identity plus optional typed side data.

A [`Subject`] compares and hashes by id only. Side data is attached through
[`Subject::add_data`], which silently ignores a value offered for the wrong
slot.
*/

mod id;
mod registry;
mod side_data;

pub use id::SubjectId;
pub use registry::SubjectRegistry;
pub use side_data::{
    CantabResults, DataSlot, MeasurementRecord, NeoFfiResult, NeoFfiTrait, SubjectData,
    SubjectMeasurements,
};

use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{LaminarError, LaminarResult};
use crate::pbr::RegionProbabilityMatrix;

/// Descriptive attributes from the subject sheet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectAttributes {
    pub name_id: Option<String>,
    pub sex: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub dominant_hand: Option<String>,
    pub gender: Option<String>,
}

/// One row of the subject sheet, id not yet validated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub id: String,
    pub attributes: SubjectAttributes,
}

/// Categorical attribute usable as an ANOVA grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectAttribute {
    Sex,
    DominantHand,
    Gender,
}

impl SubjectAttribute {
    pub const ALL: [SubjectAttribute; 3] = [
        SubjectAttribute::Sex,
        SubjectAttribute::DominantHand,
        SubjectAttribute::Gender,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SubjectAttribute::Sex => "sex",
            SubjectAttribute::DominantHand => "dominant_hand",
            SubjectAttribute::Gender => "gender",
        }
    }
}

impl Display for SubjectAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SubjectAttribute {
    type Err = LaminarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubjectAttribute::ALL
            .into_iter()
            .find(|attribute| attribute.name() == s)
            .ok_or_else(|| {
                LaminarError::BadParameters(format!("Unknown categorical attribute '{}'", s))
            })
    }
}

#[derive(Debug, Clone)]
pub struct Subject {
    id: SubjectId,
    attributes: SubjectAttributes,
    measurements: Option<SubjectMeasurements>,
    pbr: Option<RegionProbabilityMatrix>,
    cantab: Option<CantabResults>,
    neo_ffi: Option<NeoFfiResult>,
}

impl Subject {
    pub fn new(id: SubjectId, attributes: SubjectAttributes) -> Self {
        Self {
            id,
            attributes,
            measurements: None,
            pbr: None,
            cantab: None,
            neo_ffi: None,
        }
    }

    /// Validate the raw id, then build the subject.
    pub fn from_record(record: SubjectRecord) -> LaminarResult<Self> {
        let id = SubjectId::new(record.id)?;
        Ok(Self::new(id, record.attributes))
    }

    pub fn id(&self) -> &SubjectId {
        &self.id
    }

    /// Reassign the id; an invalid value leaves the subject unchanged.
    pub fn set_id(&mut self, value: &str) -> LaminarResult<()> {
        self.id = SubjectId::new(value)?;
        Ok(())
    }

    pub fn attributes(&self) -> &SubjectAttributes {
        &self.attributes
    }

    pub fn categorical(&self, attribute: SubjectAttribute) -> Option<&str> {
        match attribute {
            SubjectAttribute::Sex => self.attributes.sex.as_deref(),
            SubjectAttribute::DominantHand => self.attributes.dominant_hand.as_deref(),
            SubjectAttribute::Gender => self.attributes.gender.as_deref(),
        }
    }

    pub fn to_record(&self) -> SubjectRecord {
        SubjectRecord {
            id: self.id.to_string(),
            attributes: self.attributes.clone(),
        }
    }

    /// Store `value` in slot `key` if it is of that slot's type.
    ///
    /// Unknown keys and mismatched values are ignored. Returns whether the
    /// slot was set.
    pub fn add_data(&mut self, key: &str, value: SubjectData) -> bool {
        let Some(slot) = DataSlot::from_key(key) else {
            return false;
        };
        match (slot, value) {
            (DataSlot::Measurements, SubjectData::Measurements(m)) => self.measurements = Some(m),
            (DataSlot::Pbr, SubjectData::Pbr(pbr)) => self.pbr = Some(pbr),
            (DataSlot::Cantab, SubjectData::Cantab(c)) => self.cantab = Some(c),
            (DataSlot::NeoFfi, SubjectData::NeoFfi(n)) => self.neo_ffi = Some(n),
            _ => return false,
        }
        true
    }

    pub fn has_data(&self, slot: DataSlot) -> bool {
        match slot {
            DataSlot::Measurements => self.measurements.is_some(),
            DataSlot::Pbr => self.pbr.is_some(),
            DataSlot::Cantab => self.cantab.is_some(),
            DataSlot::NeoFfi => self.neo_ffi.is_some(),
        }
    }

    pub fn measurements(&self) -> Option<&SubjectMeasurements> {
        self.measurements.as_ref()
    }

    pub fn pbr(&self) -> Option<&RegionProbabilityMatrix> {
        self.pbr.as_ref()
    }

    pub fn cantab(&self) -> Option<&CantabResults> {
        self.cantab.as_ref()
    }

    pub fn neo_ffi(&self) -> Option<&NeoFfiResult> {
        self.neo_ffi.as_ref()
    }
}

impl PartialEq for Subject {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Subject {}

impl Hash for Subject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.attributes.name_id {
            Some(name_id) => write!(f, "{}/{}", name_id, self.id),
            None => write!(f, "{}", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pbr::MatrixLayout;
    use ndarray::Array2;

    fn subject(id: &str) -> Subject {
        Subject::new(SubjectId::new(id).unwrap(), SubjectAttributes::default())
    }

    #[test]
    fn test_add_data_wrong_type_is_silent_noop() {
        let mut s = subject("123456789");
        let cantab = SubjectData::Cantab(CantabResults::default());

        assert!(!s.add_data("pbr", cantab));
        assert!(s.pbr().is_none());
        assert!(!s.has_data(DataSlot::Pbr));
        assert!(!s.has_data(DataSlot::Cantab));
    }

    #[test]
    fn test_add_data_unknown_key_is_silent_noop() {
        let mut s = subject("123456789");
        assert!(!s.add_data("results", SubjectData::Cantab(CantabResults::default())));
        assert!(DataSlot::ALL.iter().all(|slot| !s.has_data(*slot)));
    }

    #[test]
    fn test_add_data_matching_type() {
        let mut s = subject("123456789");
        let pbr = RegionProbabilityMatrix::try_new(Array2::zeros((3, 2)), MatrixLayout::new(2, 3))
            .unwrap();
        assert!(s.add_data("pbr", SubjectData::Pbr(pbr)));
        assert_eq!(s.pbr().map(|p| p.shape()), Some((3, 2)));
    }

    #[test]
    fn test_equality_by_id_only() {
        let mut a = subject("000000001");
        let b = Subject::new(
            SubjectId::new("000000001").unwrap(),
            SubjectAttributes {
                sex: Some("F".into()),
                ..Default::default()
            },
        );
        a.add_data("cantab", SubjectData::Cantab(CantabResults::default()));
        assert_eq!(a, b);
        assert_ne!(a, subject("000000002"));
    }

    #[test]
    fn test_invalid_id_aborts_construction_and_assignment() {
        let record = SubjectRecord {
            id: "12AB".into(),
            attributes: SubjectAttributes::default(),
        };
        assert!(matches!(
            Subject::from_record(record),
            Err(LaminarError::Validation(_))
        ));

        let mut s = subject("123456789");
        assert!(s.set_id("oops").is_err());
        assert_eq!(s.id().as_str(), "123456789");
    }

    #[test]
    fn test_display_and_categorical() {
        let s = Subject::new(
            SubjectId::new("123456789").unwrap(),
            SubjectAttributes {
                name_id: Some("Sub01".into()),
                dominant_hand: Some("Right".into()),
                ..Default::default()
            },
        );
        assert_eq!(s.to_string(), "Sub01/123456789");
        assert_eq!(s.categorical(SubjectAttribute::DominantHand), Some("Right"));
        assert_eq!(s.categorical(SubjectAttribute::Sex), None);
        assert_eq!(s.to_record().id, "123456789");
    }
}
