use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::SampleRecord;
use crate::error::PrepError;
use crate::vocabulary::{
    Age, Gender, Race, is_known_race, normalize_age, normalize_gender, normalize_race,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantRecord {
    pub participant_id: String,
    pub age: Age,
    pub race: Race,
    pub gender: Gender,
}

/// One normalized record per participant, taken from the participant's
/// reference-source (and, for time series, baseline) specimen. Iteration order
/// is the donor numbering order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantSet {
    records: Vec<ParticipantRecord>,
    index: HashMap<String, usize>,
}

impl ParticipantSet {
    pub fn build(
        samples: &[SampleRecord],
        reference_source: &str,
        time_series: bool,
    ) -> Result<Self, PrepError> {
        let mut set = Self::default();
        let anchors = samples
            .iter()
            .filter(|sample| sample.source == reference_source)
            .filter(|sample| !time_series || sample.is_baseline());
        for sample in anchors {
            if set.index.contains_key(&sample.participant_id) {
                return Err(PrepError::DuplicateParticipant(
                    sample.participant_id.clone(),
                ));
            }
            let record = normalize(sample);
            set.index
                .insert(record.participant_id.clone(), set.records.len());
            set.records.push(record);
        }
        info!(participants = set.records.len(), "derived participants");
        Ok(set)
    }

    pub fn records(&self) -> &[ParticipantRecord] {
        &self.records
    }

    pub fn get(&self, participant_id: &str) -> Option<&ParticipantRecord> {
        self.index
            .get(participant_id)
            .map(|&position| &self.records[position])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<ParticipantRecord> {
        self.records
    }
}

fn normalize(sample: &SampleRecord) -> ParticipantRecord {
    let id = &sample.participant_id;
    let race = normalize_race(Some(&sample.race));
    if race == Race::Multiracial && !is_known_race(sample.race.trim()) {
        warn!(participant = %id, raw = %sample.race, "unrecognized race, using Multiracial");
    }
    let gender = normalize_gender(Some(&sample.gender));
    if gender == Gender::Missing {
        warn!(participant = %id, "gender missing");
    }
    let age = normalize_age(Some(&sample.age));
    if age == Age::Missing {
        warn!(participant = %id, raw = %sample.age, "age missing or outside 0-130");
    }
    ParticipantRecord {
        participant_id: id.clone(),
        age,
        race,
        gender,
    }
}
