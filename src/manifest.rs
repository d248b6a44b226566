use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::ResolvedConfig;
use crate::domain::{SampleRecord, SpecimenId, StudyId};
use crate::error::PrepError;
use crate::partition::{Partition, Partitions};

const MANIFEST_KEY: &str = "manifest";
const SETTINGS_KEY: &str = "settings";
const ANALYSIS_NAME_KEY: &str = "analysisName";
const EXPERIMENT_FILE_KEY: &str = "experimentMetadataFileName";
const BIOSAMPLE_FILE_KEY: &str = "biosampleMetadataFileName";
const METADATA_FILE_MARKER: &str = "MetadataFileName";

static DATA_FILE_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)_").unwrap());

/// Raw data file names keyed by their numeric specimen prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataFileIndex {
    files: HashMap<SpecimenId, String>,
}

impl DataFileIndex {
    pub fn from_path(path: &Path) -> Result<Self, PrepError> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| PrepError::Filesystem(format!("read {}: {err}", path.display())))?;
        Self::parse(&content)
    }

    /// Blank lines are skipped; a later duplicate prefix replaces an earlier one.
    pub fn parse(content: &str) -> Result<Self, PrepError> {
        let mut files = HashMap::new();
        for line in content.lines() {
            let name = line.trim();
            if name.is_empty() {
                continue;
            }
            let prefix = DATA_FILE_PREFIX
                .captures(name)
                .and_then(|captures| captures.get(1))
                .ok_or_else(|| PrepError::InvalidDataFileName(name.to_string()))?;
            let specimen = prefix
                .as_str()
                .parse::<u64>()
                .map_err(|_| PrepError::InvalidDataFileName(name.to_string()))?;
            files.insert(SpecimenId::new(specimen), name.to_string());
        }
        Ok(Self { files })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn lookup(&self, specimen_id: SpecimenId) -> Result<&str, PrepError> {
        self.files
            .get(&specimen_id)
            .map(String::as_str)
            .ok_or_else(|| PrepError::MissingDataFile(specimen_id.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestTemplate(Map<String, Value>);

impl ManifestTemplate {
    pub fn from_path(path: &Path) -> Result<Self, PrepError> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| PrepError::Filesystem(format!("read {}: {err}", path.display())))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, PrepError> {
        match serde_json::from_str(content).map_err(|err| PrepError::Json(err.to_string()))? {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(PrepError::Json(
                "manifest template must be a JSON object".to_string(),
            )),
        }
    }
}

impl Default for ManifestTemplate {
    fn default() -> Self {
        Self(Map::new())
    }
}

/// Metadata file names for one biosample partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionFiles {
    pub source: String,
    pub experiment: String,
    pub biosample: String,
}

impl PartitionFiles {
    pub fn new(study_id: &StudyId, partition: &Partition) -> Self {
        Self {
            source: partition.source.clone(),
            experiment: study_id.metadata_file_name("EX", &partition.label),
            biosample: study_id.metadata_file_name("BS", &partition.label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionFiles {
    pub run: String,
    pub submission: String,
    pub study: String,
    pub donor: String,
    pub manifest: String,
    pub partitions: Vec<PartitionFiles>,
}

impl SubmissionFiles {
    pub fn new(study_id: &StudyId, partitions: &Partitions) -> Self {
        Self {
            run: study_id.metadata_file_name("RU", ""),
            submission: study_id.metadata_file_name("SU", ""),
            study: study_id.metadata_file_name("ST", ""),
            donor: study_id.metadata_file_name("DO", ""),
            manifest: study_id.manifest_file_name(),
            partitions: partitions
                .iter()
                .map(|partition| PartitionFiles::new(study_id, partition))
                .collect(),
        }
    }

    /// Files this tool writes, manifest excluded.
    pub fn generated(&self) -> BTreeSet<String> {
        std::iter::once(self.donor.clone())
            .chain(self.partitions.iter().map(|files| files.biosample.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub sample_name: String,
    pub data_file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biosample_metadata_file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experiment_metadata_file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    document: Map<String, Value>,
    entries: Vec<ManifestEntry>,
    generated: BTreeSet<String>,
}

impl Manifest {
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.document.get(key)
    }

    pub fn to_json(&self) -> Result<Value, PrepError> {
        let mut document = self.document.clone();
        let entries =
            serde_json::to_value(&self.entries).map_err(|err| PrepError::Json(err.to_string()))?;
        document.insert(MANIFEST_KEY.to_string(), entries);
        Ok(Value::Object(document))
    }

    /// Four-space indented JSON followed by a newline.
    pub fn to_pretty_bytes(&self) -> Result<Vec<u8>, PrepError> {
        let value = self.to_json()?;
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        value
            .serialize(&mut serializer)
            .map_err(|err| PrepError::Json(err.to_string()))?;
        out.push(b'\n');
        Ok(out)
    }

    /// Every `...MetadataFileName` value in the top level and the entries.
    pub fn metadata_file_names(&self) -> BTreeSet<String> {
        let top = self
            .document
            .iter()
            .filter(|(key, _)| key.contains(METADATA_FILE_MARKER))
            .filter_map(|(_, value)| value.as_str().map(str::to_string));
        let per_entry = self.entries.iter().flat_map(|entry| {
            entry
                .biosample_metadata_file_name
                .iter()
                .chain(entry.experiment_metadata_file_name.iter())
                .cloned()
        });
        top.chain(per_entry).collect()
    }

    pub fn generated_files(&self) -> &BTreeSet<String> {
        &self.generated
    }

    /// Metadata files referenced by the manifest that must be authored by hand.
    pub fn manual_checklist(&self) -> BTreeSet<String> {
        self.metadata_file_names()
            .difference(&self.generated)
            .cloned()
            .collect()
    }
}

pub struct ManifestBuilder;

impl ManifestBuilder {
    pub fn build(
        config: &ResolvedConfig,
        template: ManifestTemplate,
        samples: &[SampleRecord],
        partitions: &Partitions,
        data_files: &DataFileIndex,
        analysis_date: NaiveDate,
    ) -> Result<Manifest, PrepError> {
        let files = SubmissionFiles::new(&config.study_id, partitions);
        let mut document = template.0;
        document.remove(MANIFEST_KEY);

        let analysis_name = format!(
            "{}_{}",
            config.analysis_name_prefix,
            analysis_date.format("%Y-%m-%d")
        );
        match document.get_mut(SETTINGS_KEY) {
            Some(Value::Object(settings)) => {
                settings.insert(ANALYSIS_NAME_KEY.to_string(), Value::from(analysis_name));
            }
            _ => {
                let mut settings = Map::new();
                settings.insert(ANALYSIS_NAME_KEY.to_string(), Value::from(analysis_name));
                document.insert(SETTINGS_KEY.to_string(), Value::Object(settings));
            }
        }

        let mut set = |key: &str, value: &str| {
            document.insert(key.to_string(), Value::from(value));
        };
        set("studyName", &config.study_name);
        set("userLogin", &config.user_login);
        set("md5CheckSum", &config.md5_checksum);
        set("group", &config.group);
        set("db", &config.database);
        set("runMetadataFileName", &files.run);
        set("submissionMetadataFileName", &files.submission);
        set("studyMetadataFileName", &files.study);

        let split = partitions.is_split();
        if let (false, Some(single)) = (split, files.partitions.first()) {
            set(EXPERIMENT_FILE_KEY, &single.experiment);
            set(BIOSAMPLE_FILE_KEY, &single.biosample);
        }
        set("donorMetadataFileName", &files.donor);
        if split {
            document.remove(EXPERIMENT_FILE_KEY);
            document.remove(BIOSAMPLE_FILE_KEY);
        }

        let mut ordered = samples.iter().collect::<Vec<_>>();
        ordered.sort_by_key(|sample| sample.specimen_id);
        let mut entries = Vec::with_capacity(ordered.len());
        for sample in ordered {
            let data_file_name = data_files.lookup(sample.specimen_id)?.to_string();
            let (biosample, experiment) = if split {
                let (position, _) = partitions.locate(sample.specimen_id).ok_or_else(|| {
                    PrepError::InvalidConfig(format!(
                        "specimen {} is in no partition",
                        sample.specimen_id
                    ))
                })?;
                let part_files = &files.partitions[position];
                (
                    Some(part_files.biosample.clone()),
                    Some(part_files.experiment.clone()),
                )
            } else {
                (None, None)
            };
            entries.push(ManifestEntry {
                sample_name: sample.specimen_id.sample_name(),
                data_file_name,
                biosample_metadata_file_name: biosample,
                experiment_metadata_file_name: experiment,
            });
        }

        Ok(Manifest {
            document,
            entries,
            generated: files.generated(),
        })
    }
}
