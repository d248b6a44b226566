use std::collections::HashMap;

use tracing::debug;

use crate::domain::{DonorId, ExperimentId, SampleRecord, StudyId};
use crate::error::PrepError;
use crate::participants::ParticipantSet;
use crate::partition::Partition;
use crate::records::{BiosampleRecord, DonorRecord, EXPERIMENTAL_SUBJECT, HEALTHY_SUBJECT};

/// Donors in participant order, each numbered exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonorRoster {
    donors: Vec<DonorRecord>,
    by_participant: HashMap<String, usize>,
}

impl DonorRoster {
    pub fn donors(&self) -> &[DonorRecord] {
        &self.donors
    }

    pub fn len(&self) -> usize {
        self.donors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.donors.is_empty()
    }

    pub fn get(&self, participant_id: &str) -> Option<&DonorRecord> {
        self.by_participant
            .get(participant_id)
            .map(|&position| &self.donors[position])
    }
}

pub struct CrossReferenceBinder<'a> {
    study_id: &'a StudyId,
    time_series: bool,
}

impl<'a> CrossReferenceBinder<'a> {
    pub fn new(study_id: &'a StudyId, time_series: bool) -> Self {
        Self {
            study_id,
            time_series,
        }
    }

    /// Numbers donors 1..=n following the participant set's order.
    pub fn assign_donor_ids(&self, participants: ParticipantSet) -> DonorRoster {
        let donor_type = if self.time_series {
            EXPERIMENTAL_SUBJECT
        } else {
            HEALTHY_SUBJECT
        };
        let mut by_participant = HashMap::new();
        let donors = participants
            .into_records()
            .into_iter()
            .enumerate()
            .map(|(position, participant)| {
                let donor_id = self.study_id.donor_id(position + 1);
                debug!(participant = %participant.participant_id, donor = %donor_id, "assigned donor id");
                by_participant.insert(participant.participant_id.clone(), position);
                DonorRecord {
                    donor_id,
                    participant_id: participant.participant_id,
                    sex: participant.gender,
                    race: participant.race,
                    age: participant.age,
                    donor_type,
                }
            })
            .collect();
        DonorRoster {
            donors,
            by_participant,
        }
    }

    pub fn donor_biosample_link<'r>(
        &self,
        sample: &SampleRecord,
        roster: &'r DonorRoster,
    ) -> Result<&'r DonorId, PrepError> {
        roster
            .get(&sample.participant_id)
            .map(|donor| &donor.donor_id)
            .ok_or_else(|| PrepError::UnknownDonor {
                specimen: sample.specimen_id.to_string(),
                participant: sample.participant_id.clone(),
            })
    }

    /// Biosample ids restart at 1 in every partition.
    pub fn bind_biosamples(
        &self,
        partition: &Partition,
        experiment_id: &ExperimentId,
        roster: &DonorRoster,
    ) -> Result<Vec<BiosampleRecord>, PrepError> {
        partition
            .samples
            .iter()
            .enumerate()
            .map(|(position, sample)| {
                let donor_id = self.donor_biosample_link(sample, roster)?.clone();
                Ok(BiosampleRecord {
                    biosample_id: self.study_id.biosample_id(position + 1),
                    specimen_id: sample.specimen_id,
                    donor_id,
                    source: sample.source.clone(),
                    experiment_id: experiment_id.clone(),
                    custom: self.custom_metadata(sample),
                })
            })
            .collect()
    }

    fn custom_metadata(&self, sample: &SampleRecord) -> Vec<(String, String)> {
        let mut custom = vec![("Participant.ID".to_string(), sample.participant_id.clone())];
        if self.time_series {
            if let Some(timepoint) = &sample.timepoint {
                custom.push(("timepoint".to_string(), timepoint.clone()));
            }
            if let Some(timestep) = &sample.timestep {
                custom.push(("timestep".to_string(), timestep.clone()));
            }
        }
        custom
    }
}
