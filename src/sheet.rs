use std::collections::HashSet;
use std::path::Path;

use csv::StringRecord;
use tracing::info;

use crate::domain::{BASELINE_TIMEPOINT, SampleRecord, SpecimenId, UNKNOWN_TIMESTEP};
use crate::error::PrepError;

pub const QC_PASS: &str = "PASS";
const SERIES_DELIMITER: char = '-';

pub const COL_PARTICIPANT: &str = "Participant.ID";
pub const COL_SAMPLE: &str = "Sample.ID";
pub const COL_SPECIMEN: &str = "MT.Unique.ID";
pub const COL_AGE: &str = "Age";
pub const COL_GENDER: &str = "Gender";
pub const COL_RACE: &str = "Race";
pub const COL_SOURCE: &str = "Source";
pub const COL_STUDY: &str = "Study";
pub const COL_QC: &str = "MISEQ.QC.PASS";

const REQUIRED_COLUMNS: [&str; 9] = [
    COL_PARTICIPANT,
    COL_SAMPLE,
    COL_SPECIMEN,
    COL_AGE,
    COL_GENDER,
    COL_RACE,
    COL_SOURCE,
    COL_STUDY,
    COL_QC,
];

/// A sample sheet row restricted to the columns the pipeline reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSampleRow {
    pub participant_id: String,
    pub sample_id: String,
    pub specimen_id: String,
    pub age: String,
    pub gender: String,
    pub race: String,
    pub source: String,
    pub study: String,
    pub qc: String,
}

pub fn read_sample_sheet(path: &Path) -> Result<Vec<RawSampleRow>, PrepError> {
    let delimiter = match path.extension().and_then(|ext| ext.to_str()) {
        Some("tsv") | Some("txt") => b'\t',
        _ => b',',
    };
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|err| PrepError::Csv(format!("open {}: {err}", path.display())))?;
    let headers = reader
        .headers()
        .map_err(|err| PrepError::Csv(err.to_string()))?
        .clone();
    let file = path.display().to_string();
    let columns = REQUIRED_COLUMNS
        .iter()
        .map(|name| column_index(&headers, name, &file))
        .collect::<Result<Vec<_>, PrepError>>()?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| PrepError::Csv(err.to_string()))?;
        let field = |slot: usize| record.get(columns[slot]).unwrap_or("").to_string();
        rows.push(RawSampleRow {
            participant_id: field(0).trim().to_string(),
            sample_id: field(1).trim().to_string(),
            specimen_id: field(2),
            age: field(3),
            gender: field(4).trim().to_string(),
            race: field(5).trim().to_string(),
            source: field(6).trim().to_string(),
            study: field(7),
            qc: field(8),
        });
    }
    Ok(rows)
}

fn column_index(headers: &StringRecord, name: &str, file: &str) -> Result<usize, PrepError> {
    headers
        .iter()
        .position(|header| header.trim() == name)
        .ok_or_else(|| PrepError::MissingColumn {
            file: file.to_string(),
            column: name.to_string(),
        })
}

/// Specimens that passed QC in the studies being submitted, ordered by
/// participant id (ties keep sheet order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSet {
    records: Vec<SampleRecord>,
    time_series: bool,
}

impl SampleSet {
    pub fn build(
        rows: &[RawSampleRow],
        allowed_studies: &[String],
        time_series: bool,
    ) -> Result<Self, PrepError> {
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        for row in rows {
            if row.qc != QC_PASS || !allowed_studies.iter().any(|study| *study == row.study) {
                continue;
            }
            let specimen_id: SpecimenId = row.specimen_id.parse()?;
            if !seen.insert(specimen_id) {
                return Err(PrepError::DuplicateSpecimen(specimen_id.to_string()));
            }
            if !is_file_safe_source(&row.source) {
                return Err(PrepError::InvalidSource {
                    specimen: specimen_id.to_string(),
                    name: row.source.clone(),
                });
            }
            let (timepoint, timestep) = if time_series {
                (
                    Some(series_segment(&row.sample_id, BASELINE_TIMEPOINT)),
                    Some(series_segment(&row.study, UNKNOWN_TIMESTEP)),
                )
            } else {
                (None, None)
            };
            records.push(SampleRecord {
                specimen_id,
                sample_id: row.sample_id.clone(),
                participant_id: row.participant_id.clone(),
                source: row.source.clone(),
                study: row.study.clone(),
                age: row.age.clone(),
                gender: row.gender.clone(),
                race: row.race.clone(),
                timepoint,
                timestep,
            });
        }
        records.sort_by(|a, b| a.participant_id.cmp(&b.participant_id));

        info!(
            total = rows.len(),
            kept = records.len(),
            "filtered sample sheet"
        );
        Ok(Self {
            records,
            time_series,
        })
    }

    pub fn from_path(
        path: &Path,
        allowed_studies: &[String],
        time_series: bool,
    ) -> Result<Self, PrepError> {
        let rows = read_sample_sheet(path)?;
        Self::build(&rows, allowed_studies, time_series)
    }

    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_time_series(&self) -> bool {
        self.time_series
    }
}

/// A source must be usable as one file-name component.
fn is_file_safe_source(source: &str) -> bool {
    !source.is_empty()
        && source != "."
        && source != ".."
        && !source
            .chars()
            .any(|ch| matches!(ch, '/' | '\\') || ch.is_control())
}

fn series_segment(value: &str, default: &str) -> String {
    value
        .split(SERIES_DELIMITER)
        .nth(1)
        .map(|segment| segment.trim().to_string())
        .unwrap_or_else(|| default.to_string())
}
