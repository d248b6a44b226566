use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PrepError {
    #[error("missing config file dmrr-prep.yaml in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse YAML config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{file} is missing required column {column}")]
    #[diagnostic(help("the sample sheet and templates must carry every required column"))]
    MissingColumn { file: String, column: String },

    #[error("{kind} template has no property {property}")]
    UnknownProperty { kind: String, property: String },

    #[error("data file name without a numeric specimen prefix: {0}")]
    InvalidDataFileName(String),

    #[error("invalid specimen id: {0}")]
    InvalidSpecimenId(String),

    #[error("specimen {specimen} has source {name:?}, which cannot name a metadata file")]
    #[diagnostic(help("Source must be non-empty and free of path separators"))]
    InvalidSource { specimen: String, name: String },

    #[error("specimen {specimen} belongs to participant {participant}, which has no donor")]
    #[diagnostic(help("sample and participant filters diverged; check the reference source rows"))]
    UnknownDonor {
        specimen: String,
        participant: String,
    },

    #[error("no raw data file listed for specimen {0}")]
    MissingDataFile(String),

    #[error("participant {0} has more than one reference-source row")]
    DuplicateParticipant(String),

    #[error("specimen {0} appears more than once in the sample sheet")]
    DuplicateSpecimen(String),

    #[error("expected output file was not written: {0}")]
    MissingOutput(String),

    #[error("delimited file error: {0}")]
    Csv(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl PrepError {
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            PrepError::UnknownDonor { .. }
                | PrepError::MissingDataFile(_)
                | PrepError::DuplicateParticipant(_)
                | PrepError::DuplicateSpecimen(_)
        )
    }
}
