use std::fs;
use std::path::{Path, PathBuf};

use assert_matches::assert_matches;

use dmrr_prep::config::ConfigLoader;
use dmrr_prep::error::PrepError;

const FEEDING: &str = r#"
group: exrna-mtewa1
user_login: sovacool
study_name: U01 Feeding Study
study_id: EXR-MTEWA1Feeding
sample_sheet: sheets/feeding.tsv
study_names:
  - Feeding Study-30 min
  - Feeding Study-1 hr
working_dir: /srv/dmrr/feeding
templates_dir: templates
manifest_template: custom/manifest.json
md5_checksum: " daec25d670e3bb6b3ab3bbf5733df68c "
data_file_names: fastq_file.names.txt
time_series: true
database: hg19_exRNA
analysis_name_prefix: MTEWA1_Feeding
reference_source: Serum
donor:
  drop_properties: ["- Ethnic Group"]
"#;

#[test]
fn resolve_from_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("feeding.yaml");
    fs::write(&path, FEEDING).unwrap();

    let resolved = ConfigLoader::resolve(Some(path.to_str().unwrap())).unwrap();
    assert_eq!(resolved.study_id.as_str(), "EXR-MTEWA1Feeding");
    assert!(resolved.time_series);
    assert_eq!(resolved.study_names.len(), 2);
    assert_eq!(resolved.md5_checksum, "daec25d670e3bb6b3ab3bbf5733df68c");
    assert_eq!(resolved.reference_source, "Serum");
    assert_eq!(resolved.analysis_name_prefix, "MTEWA1_Feeding");
    assert_eq!(resolved.sample_sheet, temp.path().join("sheets/feeding.tsv"));
    assert_eq!(resolved.working_dir, PathBuf::from("/srv/dmrr/feeding"));
    assert_eq!(
        resolved.biosample_template,
        temp.path().join("templates/Biosamples.template.tsv")
    );
    assert_eq!(
        resolved.manifest_template,
        temp.path().join("custom/manifest.json")
    );
    assert_eq!(resolved.donor.drop_properties, ["- Ethnic Group"]);
    assert!(resolved.biosample.drop_properties.is_empty());

    let yaml = resolved.to_yaml().unwrap();
    assert!(yaml.contains("study_id: EXR-MTEWA1Feeding"));
}

#[test]
fn unreadable_config_path() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.yaml");
    let err = ConfigLoader::resolve(Some(path.to_str().unwrap())).unwrap_err();
    assert_matches!(err, PrepError::ConfigRead(_));
}

#[test]
fn missing_required_field() {
    let content = FEEDING.replace("md5_checksum: \" daec25d670e3bb6b3ab3bbf5733df68c \"\n", "");
    let err = ConfigLoader::parse(&content).unwrap_err();
    assert_matches!(err, PrepError::ConfigParse(message) if message.contains("md5_checksum"));
}

#[test]
fn blank_checksum_is_rejected() {
    let content = FEEDING.replace(" daec25d670e3bb6b3ab3bbf5733df68c ", "  ");
    let config = ConfigLoader::parse(&content).unwrap();
    let err = ConfigLoader::resolve_config(config, Path::new("/tmp")).unwrap_err();
    assert_matches!(err, PrepError::InvalidConfig(_));
}
