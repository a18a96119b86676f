// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Typed side data that can be attached to a subject.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::LaminarError;
use crate::pbr::RegionProbabilityMatrix;

/// One dated value of a named measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub name: String,
    pub date: Option<NaiveDate>,
    pub value: f64,
}

/// Every measurement taken for one subject
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectMeasurements {
    records: Vec<MeasurementRecord>,
}

impl SubjectMeasurements {
    pub fn new(records: Vec<MeasurementRecord>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, record: MeasurementRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[MeasurementRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct measurement names, sorted
    pub fn measurement_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.records.iter().map(|r| r.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn measurement_values(&self, name: &str) -> Vec<&MeasurementRecord> {
        self.records.iter().filter(|r| r.name == name).collect()
    }

    /// Most recent value of `name`.
    ///
    /// Dated records beat undated ones; among equal dates the one inserted
    /// last wins.
    pub fn last_measurement_value(&self, name: &str) -> Option<f64> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.name == name)
            .max_by_key(|(position, r)| (r.date, *position))
            .map(|(_, r)| r.value)
    }
}

/// Cognitive battery scores keyed by measure name (`"PALTEA28"`, `"SWMBE4"`, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CantabResults {
    measures: BTreeMap<String, f64>,
}

impl CantabResults {
    pub fn new(measures: BTreeMap<String, f64>) -> Self {
        Self { measures }
    }

    pub fn measure(&self, name: &str) -> Option<f64> {
        self.measures.get(name).copied()
    }

    /// Measures belonging to `task`: names that start with the task prefix
    /// and contain no space (spaced names are session metadata).
    pub fn task_measures(&self, task: &str) -> BTreeMap<&str, f64> {
        self.measures
            .iter()
            .filter(|(name, _)| name.starts_with(task) && !name.contains(' '))
            .map(|(name, score)| (name.as_str(), *score))
            .collect()
    }

    pub fn measures(&self) -> &BTreeMap<String, f64> {
        &self.measures
    }
}

/// Big Five personality trait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeoFfiTrait {
    Neuroticism,
    Extraversion,
    Openness,
    Agreeableness,
    Conscientiousness,
}

impl NeoFfiTrait {
    pub const ALL: [NeoFfiTrait; 5] = [
        NeoFfiTrait::Neuroticism,
        NeoFfiTrait::Extraversion,
        NeoFfiTrait::Openness,
        NeoFfiTrait::Agreeableness,
        NeoFfiTrait::Conscientiousness,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NeoFfiTrait::Neuroticism => "neuroticism",
            NeoFfiTrait::Extraversion => "extraversion",
            NeoFfiTrait::Openness => "openness",
            NeoFfiTrait::Agreeableness => "agreeableness",
            NeoFfiTrait::Conscientiousness => "conscientiousness",
        }
    }
}

impl Display for NeoFfiTrait {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NeoFfiTrait {
    type Err = LaminarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NeoFfiTrait::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| LaminarError::BadParameters(format!("Unknown NEO-FFI trait '{}'", s)))
    }
}

/// NEO-FFI questionnaire result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeoFfiResult {
    pub neuroticism: f64,
    pub extraversion: f64,
    pub openness: f64,
    pub agreeableness: f64,
    pub conscientiousness: f64,
}

impl NeoFfiResult {
    pub fn trait_score(&self, neo_trait: NeoFfiTrait) -> f64 {
        match neo_trait {
            NeoFfiTrait::Neuroticism => self.neuroticism,
            NeoFfiTrait::Extraversion => self.extraversion,
            NeoFfiTrait::Openness => self.openness,
            NeoFfiTrait::Agreeableness => self.agreeableness,
            NeoFfiTrait::Conscientiousness => self.conscientiousness,
        }
    }
}

/// Named side-data slots of a subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSlot {
    Measurements,
    Pbr,
    Cantab,
    NeoFfi,
}

impl DataSlot {
    pub const ALL: [DataSlot; 4] = [
        DataSlot::Measurements,
        DataSlot::Pbr,
        DataSlot::Cantab,
        DataSlot::NeoFfi,
    ];

    pub fn key(self) -> &'static str {
        match self {
            DataSlot::Measurements => "measurements",
            DataSlot::Pbr => "pbr",
            DataSlot::Cantab => "cantab",
            DataSlot::NeoFfi => "neo_ffi",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        DataSlot::ALL.into_iter().find(|slot| slot.key() == key)
    }
}

/// A value offered to [`Subject::add_data`](super::Subject::add_data)
#[derive(Debug, Clone)]
pub enum SubjectData {
    Measurements(SubjectMeasurements),
    Pbr(RegionProbabilityMatrix),
    Cantab(CantabResults),
    NeoFfi(NeoFfiResult),
}

impl SubjectData {
    /// The slot this value fits
    pub fn slot(&self) -> DataSlot {
        match self {
            SubjectData::Measurements(_) => DataSlot::Measurements,
            SubjectData::Pbr(_) => DataSlot::Pbr,
            SubjectData::Cantab(_) => DataSlot::Cantab,
            SubjectData::NeoFfi(_) => DataSlot::NeoFfi,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, date: Option<(i32, u32, u32)>, value: f64) -> MeasurementRecord {
        MeasurementRecord {
            name: name.to_string(),
            date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            value,
        }
    }

    #[test]
    fn test_last_measurement_prefers_latest_date() {
        let measurements = SubjectMeasurements::new(vec![
            record("weight", Some((2020, 5, 1)), 70.0),
            record("weight", Some((2019, 1, 1)), 65.0),
            record("height", Some((2021, 1, 1)), 180.0),
            record("weight", None, 99.0),
        ]);
        assert_eq!(measurements.last_measurement_value("weight"), Some(70.0));
        assert_eq!(measurements.last_measurement_value("height"), Some(180.0));
        assert_eq!(measurements.last_measurement_value("age"), None);
        assert_eq!(measurements.measurement_names(), vec!["height", "weight"]);
        assert_eq!(measurements.measurement_values("weight").len(), 3);
    }

    #[test]
    fn test_undated_measurements_use_insertion_order() {
        let measurements = SubjectMeasurements::new(vec![
            record("grip", None, 1.0),
            record("grip", None, 2.0),
        ]);
        assert_eq!(measurements.last_measurement_value("grip"), Some(2.0));
    }

    #[test]
    fn test_cantab_task_measures() {
        let cantab = CantabResults::new(BTreeMap::from([
            ("PALTEA28".to_string(), 12.0),
            ("PALFAMS28".to_string(), 5.0),
            ("PAL Session Date".to_string(), 0.0),
            ("SWMBE4".to_string(), 3.0),
        ]));
        let pal = cantab.task_measures("PAL");
        assert_eq!(pal.len(), 2);
        assert_eq!(pal["PALTEA28"], 12.0);
        assert_eq!(cantab.measure("SWMBE4"), Some(3.0));
    }

    #[test]
    fn test_neo_ffi_traits() {
        let result = NeoFfiResult {
            neuroticism: 1.0,
            extraversion: 2.0,
            openness: 3.0,
            agreeableness: 4.0,
            conscientiousness: 5.0,
        };
        let scores: Vec<f64> = NeoFfiTrait::ALL.iter().map(|t| result.trait_score(*t)).collect();
        assert_eq!(scores, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!("Openness".parse::<NeoFfiTrait>().unwrap(), NeoFfiTrait::Openness);
    }

    #[test]
    fn test_slot_keys() {
        assert_eq!(DataSlot::from_key("neo_ffi"), Some(DataSlot::NeoFfi));
        assert_eq!(DataSlot::from_key("results"), None);
    }
}
