use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::{SampleRecord, SpecimenId};

/// Specimens sharing one specimen source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub source: String,
    /// File-name infix; empty when the submission has a single source.
    pub label: String,
    pub samples: Vec<SampleRecord>,
}

impl Partition {
    pub fn contains(&self, specimen_id: SpecimenId) -> bool {
        self.samples
            .iter()
            .any(|sample| sample.specimen_id == specimen_id)
    }
}

/// Partitions sorted by source name; each keeps the incoming sample order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partitions {
    parts: Vec<Partition>,
}

impl Partitions {
    pub fn iter(&self) -> impl Iterator<Item = &Partition> {
        self.parts.iter()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn is_split(&self) -> bool {
        self.parts.len() > 1
    }

    /// Position (0-based) and partition holding `specimen_id`.
    pub fn locate(&self, specimen_id: SpecimenId) -> Option<(usize, &Partition)> {
        self.parts
            .iter()
            .enumerate()
            .find(|(_, part)| part.contains(specimen_id))
    }
}

pub struct SourcePartitioner;

impl SourcePartitioner {
    pub fn partition(samples: &[SampleRecord]) -> Partitions {
        let mut groups = BTreeMap::<&str, Vec<SampleRecord>>::new();
        for sample in samples {
            groups
                .entry(sample.source.as_str())
                .or_default()
                .push(sample.clone());
        }

        let split = groups.len() > 1;
        let parts = groups
            .into_iter()
            .map(|(source, samples)| Partition {
                source: source.to_string(),
                label: if split { source.to_string() } else { String::new() },
                samples,
            })
            .collect();
        Partitions { parts }
    }
}
