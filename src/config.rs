use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::StudyId;
use crate::error::PrepError;

pub const DEFAULT_CONFIG_FILE: &str = "dmrr-prep.yaml";
pub const DEFAULT_REFERENCE_SOURCE: &str = "Plasma";
pub const DONOR_TEMPLATE_FILE: &str = "Donors.template.tsv";
pub const BIOSAMPLE_TEMPLATE_FILE: &str = "Biosamples.template.tsv";
pub const MANIFEST_TEMPLATE_FILE: &str = "manifest_template.manifest.json";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub group: String,
    pub user_login: String,
    pub study_name: String,
    pub study_id: String,
    pub sample_sheet: PathBuf,
    pub study_names: Vec<String>,
    pub working_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub md5_checksum: String,
    pub data_file_names: PathBuf,
    #[serde(default)]
    pub time_series: bool,
    pub database: String,
    #[serde(default)]
    pub analysis_name_prefix: Option<String>,
    #[serde(default)]
    pub reference_source: Option<String>,
    #[serde(default)]
    pub manifest_template: Option<PathBuf>,
    #[serde(default)]
    pub donor: TemplateOptions,
    #[serde(default)]
    pub biosample: TemplateOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TemplateOptions {
    #[serde(default)]
    pub drop_properties: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub group: String,
    pub user_login: String,
    pub study_name: String,
    pub study_id: StudyId,
    pub sample_sheet: PathBuf,
    pub study_names: Vec<String>,
    pub working_dir: PathBuf,
    pub donor_template: PathBuf,
    pub biosample_template: PathBuf,
    pub manifest_template: PathBuf,
    pub md5_checksum: String,
    pub data_file_names: PathBuf,
    pub time_series: bool,
    pub database: String,
    pub analysis_name_prefix: String,
    pub reference_source: String,
    pub donor: TemplateOptions,
    pub biosample: TemplateOptions,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, PrepError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Err(PrepError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| PrepError::ConfigRead(config_path.clone()))?;
        let config = Self::parse(&content)?;
        let base_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Self::resolve_config(config, &base_dir)
    }

    pub fn parse(content: &str) -> Result<Config, PrepError> {
        serde_yaml::from_str(content).map_err(|err| PrepError::ConfigParse(err.to_string()))
    }

    /// Validates `config` and anchors its relative paths at `base_dir`.
    pub fn resolve_config(config: Config, base_dir: &Path) -> Result<ResolvedConfig, PrepError> {
        let study_id: StudyId = config.study_id.parse()?;

        let study_names = config
            .study_names
            .into_iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>();
        if study_names.is_empty() {
            return Err(PrepError::InvalidConfig(
                "study_names must list at least one study".to_string(),
            ));
        }

        let md5_checksum = config.md5_checksum.trim().to_string();
        if md5_checksum.is_empty() {
            return Err(PrepError::InvalidConfig(
                "md5_checksum must not be empty".to_string(),
            ));
        }

        let templates_dir = anchor(base_dir, &config.templates_dir);
        let manifest_template = config
            .manifest_template
            .map(|path| anchor(base_dir, &path))
            .unwrap_or_else(|| templates_dir.join(MANIFEST_TEMPLATE_FILE));
        let analysis_name_prefix = config
            .analysis_name_prefix
            .filter(|prefix| !prefix.trim().is_empty())
            .unwrap_or_else(|| study_id.as_str().to_string());
        let reference_source = config
            .reference_source
            .map(|source| source.trim().to_string())
            .filter(|source| !source.is_empty())
            .unwrap_or_else(|| DEFAULT_REFERENCE_SOURCE.to_string());

        Ok(ResolvedConfig {
            group: config.group,
            user_login: config.user_login,
            study_name: config.study_name,
            study_id,
            sample_sheet: anchor(base_dir, &config.sample_sheet),
            study_names,
            working_dir: anchor(base_dir, &config.working_dir),
            donor_template: templates_dir.join(DONOR_TEMPLATE_FILE),
            biosample_template: templates_dir.join(BIOSAMPLE_TEMPLATE_FILE),
            manifest_template,
            md5_checksum,
            data_file_names: anchor(base_dir, &config.data_file_names),
            time_series: config.time_series,
            database: config.database,
            analysis_name_prefix,
            reference_source,
            donor: config.donor,
            biosample: config.biosample,
        })
    }
}

fn anchor(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

impl ResolvedConfig {
    pub fn to_yaml(&self) -> Result<String, PrepError> {
        serde_yaml::to_string(self).map_err(|err| PrepError::ConfigParse(err.to_string()))
    }
}
