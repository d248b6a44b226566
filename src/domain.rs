use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PrepError;

/// Reserved marker for an explicitly unknown value in submitted metadata.
pub const MISSING: &str = "#MISSING#";

pub const BASELINE_TIMEPOINT: &str = "T0";
pub const UNKNOWN_TIMESTEP: &str = "NA";

/// Numeric specimen identifier (`MT.Unique.ID` in the sample sheet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpecimenId(u64);

impl SpecimenId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn sample_name(&self) -> String {
        format!("MT.Unique.ID_{}", self.0)
    }
}

impl fmt::Display for SpecimenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SpecimenId {
    type Err = PrepError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if let Ok(id) = trimmed.parse::<u64>() {
            return Ok(Self(id));
        }
        // spreadsheets exported with a float column write "1234.0"
        match trimmed.parse::<f64>() {
            Ok(float) if float >= 0.0 && float.fract() == 0.0 && float <= u64::MAX as f64 => {
                Ok(Self(float as u64))
            }
            _ => Err(PrepError::InvalidSpecimenId(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudyId(String);

impl StudyId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn donor_id(&self, sequence: usize) -> DonorId {
        DonorId(format!("{}{sequence}-DO", self.0))
    }

    pub fn biosample_id(&self, sequence: usize) -> BiosampleId {
        BiosampleId(format!("{}{sequence}-BS", self.0))
    }

    pub fn experiment_id(&self, sequence: usize) -> ExperimentId {
        ExperimentId(format!("{}{sequence}-EX", self.0))
    }

    /// `<studyId>-<code>[-<infix>].metadata.tsv`
    pub fn metadata_file_name(&self, code: &str, infix: &str) -> String {
        if infix.is_empty() {
            format!("{}-{code}.metadata.tsv", self.0)
        } else {
            format!("{}-{code}-{infix}.metadata.tsv", self.0)
        }
    }

    pub fn manifest_file_name(&self) -> String {
        format!("{}.manifest.json", self.0)
    }
}

impl fmt::Display for StudyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StudyId {
    type Err = PrepError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(PrepError::InvalidConfig("study_id must not be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

macro_rules! document_id {
    ($name:ident, $collection:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Relative document path used by cross references.
            pub fn doc_url(&self) -> String {
                format!(concat!("coll/", $collection, "/doc/{}"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

document_id!(DonorId, "Donors");
document_id!(BiosampleId, "Biosamples");
document_id!(ExperimentId, "Experiments");

/// One filtered row of the sample sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleRecord {
    pub specimen_id: SpecimenId,
    pub sample_id: String,
    pub participant_id: String,
    pub source: String,
    pub study: String,
    pub age: String,
    pub gender: String,
    pub race: String,
    pub timepoint: Option<String>,
    pub timestep: Option<String>,
}

impl SampleRecord {
    pub fn is_baseline(&self) -> bool {
        self.timepoint
            .as_deref()
            .map(|timepoint| timepoint == BASELINE_TIMEPOINT)
            .unwrap_or(true)
    }
}
