// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use crate::error::{LaminarError, LaminarResult};
use crate::loaders::{ScoresLoader, SubjectAttributesLoader, SubjectMatrixLoader};
use crate::pbr::{MatrixLayout, RegionProbabilityMatrix};

use super::{
    DataSlot, NeoFfiTrait, Subject, SubjectAttribute, SubjectData, SubjectId, SubjectRecord,
};

/// Subjects keyed by id, iterated in id order.
///
/// Supplies the join key that aligns external scores with subject matrices.
#[derive(Debug, Clone, Default)]
pub struct SubjectRegistry {
    subjects: BTreeMap<SubjectId, Subject>,
}

impl SubjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the attribute sheet; any malformed id aborts the load.
    pub fn from_attributes(loader: &dyn SubjectAttributesLoader) -> LaminarResult<Self> {
        let mut registry = Self::new();
        for record in loader.load_subjects()? {
            registry.insert(Subject::from_record(record)?);
        }
        tracing::info!("Registered {} subjects", registry.len());
        Ok(registry)
    }

    /// Add `subject`; returns `false` and keeps the existing entry on a duplicate id.
    pub fn insert(&mut self, subject: Subject) -> bool {
        if self.subjects.contains_key(subject.id()) {
            tracing::warn!("Subject {} already registered, keeping the first entry", subject);
            return false;
        }
        self.subjects.insert(subject.id().clone(), subject);
        true
    }

    pub fn get(&self, id: &SubjectId) -> Option<&Subject> {
        self.subjects.get(id)
    }

    pub fn get_mut(&mut self, id: &SubjectId) -> Option<&mut Subject> {
        self.subjects.get_mut(id)
    }

    pub fn contains(&self, id: &SubjectId) -> bool {
        self.subjects.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subject> {
        self.subjects.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &SubjectId> {
        self.subjects.keys()
    }

    /// Validate and attach every loaded matrix.
    ///
    /// A matrix for an unregistered subject is a `Validation` error; a shape
    /// error names the subject. Returns the number of matrices attached.
    pub fn attach_matrices(
        &mut self,
        loader: &dyn SubjectMatrixLoader,
        layout: MatrixLayout,
    ) -> LaminarResult<usize> {
        let loaded = loader.load_matrices()?;
        let mut validated = Vec::with_capacity(loaded.len());
        for (id, data) in loaded {
            if !self.contains(&id) {
                return Err(LaminarError::Validation(format!(
                    "Matrix supplied for unregistered subject {}",
                    id
                )));
            }
            let pbr = RegionProbabilityMatrix::try_new(data, layout).map_err(|e| {
                tracing::error!("Rejected matrix for subject {}: {}", id, e);
                e
            })?;
            validated.push((id, pbr));
        }

        let attached = validated.len();
        for (id, pbr) in validated {
            if let Some(subject) = self.subjects.get_mut(&id) {
                subject.add_data(DataSlot::Pbr.key(), SubjectData::Pbr(pbr));
            }
        }
        tracing::info!("Attached {} subject matrices", attached);
        Ok(attached)
    }

    /// Attach measurement, CANTAB and NEO-FFI tables; unknown ids are skipped.
    pub fn attach_scores(&mut self, loader: &dyn ScoresLoader) -> LaminarResult<usize> {
        let mut offered: Vec<(SubjectId, DataSlot, SubjectData)> = Vec::new();
        for (id, value) in loader.measurements()? {
            offered.push((id, DataSlot::Measurements, SubjectData::Measurements(value)));
        }
        for (id, value) in loader.cantab()? {
            offered.push((id, DataSlot::Cantab, SubjectData::Cantab(value)));
        }
        for (id, value) in loader.neo_ffi()? {
            offered.push((id, DataSlot::NeoFfi, SubjectData::NeoFfi(value)));
        }

        let mut attached = 0;
        for (id, slot, value) in offered {
            match self.subjects.get_mut(&id) {
                Some(subject) => {
                    if subject.add_data(slot.key(), value) {
                        attached += 1;
                    }
                }
                None => tracing::debug!("Skipping {} for unregistered subject {}", slot.key(), id),
            }
        }
        Ok(attached)
    }

    /// `(id, matrix)` for every subject that has one, in id order
    pub fn matrices(&self) -> Vec<(SubjectId, RegionProbabilityMatrix)> {
        self.subjects
            .values()
            .filter_map(|s| s.pbr().map(|pbr| (s.id().clone(), pbr.clone())))
            .collect()
    }

    /// Latest value of measurement `name` per subject
    pub fn measurement_scores(&self, name: &str) -> BTreeMap<SubjectId, f64> {
        self.collect_scores(|s| s.measurements()?.last_measurement_value(name))
    }

    pub fn neo_ffi_scores(&self, neo_trait: NeoFfiTrait) -> BTreeMap<SubjectId, f64> {
        self.collect_scores(|s| s.neo_ffi().map(|result| result.trait_score(neo_trait)))
    }

    pub fn cantab_scores(&self, measure: &str) -> BTreeMap<SubjectId, f64> {
        self.collect_scores(|s| s.cantab()?.measure(measure))
    }

    /// Group labels for ANOVA; subjects without a value are left out.
    pub fn categorical(&self, attribute: SubjectAttribute) -> BTreeMap<SubjectId, String> {
        self.subjects
            .values()
            .filter_map(|s| Some((s.id().clone(), s.categorical(attribute)?.to_string())))
            .collect()
    }

    pub fn attribute_records(&self) -> Vec<SubjectRecord> {
        self.subjects.values().map(Subject::to_record).collect()
    }

    fn collect_scores<F>(&self, score: F) -> BTreeMap<SubjectId, f64>
    where
        F: Fn(&Subject) -> Option<f64>,
    {
        self.subjects
            .values()
            .filter_map(|s| Some((s.id().clone(), score(s)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::{InMemoryAttributesLoader, InMemoryMatrixLoader, InMemoryScoresLoader};
    use crate::subject::{
        MeasurementRecord, NeoFfiResult, SubjectAttributes, SubjectMeasurements,
    };
    use ndarray::Array2;

    fn record(id: &str, sex: Option<&str>) -> SubjectRecord {
        SubjectRecord {
            id: id.to_string(),
            attributes: SubjectAttributes {
                sex: sex.map(str::to_string),
                ..Default::default()
            },
        }
    }

    fn id(value: &str) -> SubjectId {
        SubjectId::new(value).unwrap()
    }

    fn registry() -> SubjectRegistry {
        SubjectRegistry::from_attributes(&InMemoryAttributesLoader(vec![
            record("000000002", Some("M")),
            record("000000001", Some("F")),
            record("000000003", None),
        ]))
        .unwrap()
    }

    #[test]
    fn test_from_attributes_rejects_bad_id() {
        let loader = InMemoryAttributesLoader(vec![record("000000001", None), record("1", None)]);
        assert!(matches!(
            SubjectRegistry::from_attributes(&loader),
            Err(LaminarError::Validation(_))
        ));
    }

    #[test]
    fn test_insert_deduplicates() {
        let mut registry = registry();
        let duplicate = Subject::from_record(record("000000001", Some("X"))).unwrap();
        assert!(!registry.insert(duplicate));
        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.get(&id("000000001")).unwrap().attributes().sex.as_deref(),
            Some("F")
        );
    }

    #[test]
    fn test_attach_matrices_in_id_order() {
        let mut registry = registry();
        let loader = InMemoryMatrixLoader(vec![
            (id("000000002"), Array2::from_elem((4, 2), 0.5)),
            (id("000000001"), Array2::from_elem((4, 2), 0.25)),
        ]);
        assert_eq!(registry.attach_matrices(&loader, MatrixLayout::new(2, 4)).unwrap(), 2);

        let matrices = registry.matrices();
        assert_eq!(matrices.len(), 2);
        assert_eq!(matrices[0].0, id("000000001"));
        assert_eq!(matrices[0].1.data()[[0, 0]], 0.25);
    }

    #[test]
    fn test_attach_matrices_unknown_subject() {
        let mut registry = registry();
        let loader = InMemoryMatrixLoader(vec![(id("999999999"), Array2::zeros((4, 2)))]);
        assert!(matches!(
            registry.attach_matrices(&loader, MatrixLayout::new(2, 4)),
            Err(LaminarError::Validation(_))
        ));
    }

    #[test]
    fn test_attach_matrices_is_all_or_nothing() {
        let mut registry = registry();
        let loader = InMemoryMatrixLoader(vec![
            (id("000000001"), Array2::zeros((4, 2))),
            (id("000000002"), Array2::zeros((4, 3))),
        ]);
        assert!(matches!(
            registry.attach_matrices(&loader, MatrixLayout::new(2, 4)),
            Err(LaminarError::Shape { .. })
        ));
        assert!(registry.matrices().is_empty());
    }

    #[test]
    fn test_scores_and_categories() {
        let mut registry = registry();
        let mut scores = InMemoryScoresLoader::default();
        scores.measurements.insert(
            id("000000001"),
            SubjectMeasurements::new(vec![MeasurementRecord {
                name: "weight".into(),
                date: None,
                value: 61.0,
            }]),
        );
        scores.neo_ffi.insert(
            id("000000002"),
            NeoFfiResult {
                neuroticism: 10.0,
                extraversion: 20.0,
                openness: 30.0,
                agreeableness: 40.0,
                conscientiousness: 50.0,
            },
        );
        scores.neo_ffi.insert(
            id("555555555"),
            NeoFfiResult {
                neuroticism: 0.0,
                extraversion: 0.0,
                openness: 0.0,
                agreeableness: 0.0,
                conscientiousness: 0.0,
            },
        );

        assert_eq!(registry.attach_scores(&scores).unwrap(), 2);
        assert_eq!(
            registry.measurement_scores("weight"),
            BTreeMap::from([(id("000000001"), 61.0)])
        );
        assert_eq!(
            registry.neo_ffi_scores(NeoFfiTrait::Openness),
            BTreeMap::from([(id("000000002"), 30.0)])
        );
        assert!(registry.cantab_scores("PALTEA28").is_empty());

        let sex = registry.categorical(SubjectAttribute::Sex);
        assert_eq!(sex.len(), 2);
        assert_eq!(sex[&id("000000002")], "M");
        assert_eq!(registry.attribute_records().len(), 3);
    }
}
