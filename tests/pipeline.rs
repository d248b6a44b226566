use std::fs;
use std::path::Path;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use serde_json::Value;

use dmrr_prep::app::{App, PrepareOptions, ProgressEvent, ProgressSink};
use dmrr_prep::config::ConfigLoader;
use dmrr_prep::error::PrepError;

struct NoopSink;

impl ProgressSink for NoopSink {
    fn event(&self, _event: ProgressEvent) {}
}

const DONORS_TEMPLATE: &str = "#property\tvalue\trequired\tdescription\n\
Donor\tEXR-DONOR-ID\tyes\tdonor document id\n\
- Status\tAdd\tyes\tAdd or Update\n\
- Sex\t\tno\tsex\n\
- Racial Category\t\tno\trace\n\
- Ethnic Group\t\tno\tethnicity\n\
- Donor Type\t\tyes\ttype\n\
- Age\t\tno\tage\n\
- Notes\t\tno\tfree text\n\
* Custom Metadata\t0\tno\tcount\n\
*- Property Name\t\tno\tname\n\
*-- Value\t\tno\tvalue\n";

const BIOSAMPLES_TEMPLATE: &str = "#property\tvalue\trequired\tdescription\n\
Biosample\t\tyes\tbiosample document id\n\
- Status\tAdd\tyes\tAdd or Update\n\
- Name\t\tyes\tname\n\
- Donor ID\t\tyes\tdonor\n\
-- DocURL\t\tyes\tdonor doc\n\
- Description\t\tno\tfree text\n\
--- Scientific Name\t\tyes\tspecies\n\
--- Common Name\t\tno\tcommon\n\
--- Taxon ID\t\tno\ttaxon\n\
-- Disease Type\t\tyes\tdisease\n\
-- Anatomical Location\t\tno\tanatomy\n\
--- Biofluid Name\t\tno\tbiofluid\n\
-- exRNA Source\t\tno\tfraction\n\
-- Fractionation\t\tno\tfractionated\n\
* Related Experiments\t\tno\tcount\n\
*- Related Experiment\t\tno\texperiment\n\
* Custom Metadata\t0\tno\tcount\n\
*- Property Name\t\tno\tname\n\
*-- Value\t\tno\tvalue\n\
* Aliases\t\tno\taliases\n\
*-- DocURL\t\tno\talias doc\n";

const SHEET: &str = "Participant.ID,Sample.ID,MT.Unique.ID,Age,Gender,Race,Source,Study,MISEQ.QC.PASS\n\
P2,P2-T0,2001,61,MALE,Pacific Islander,Plasma,Feeding Study-1 hr,PASS\n\
P1,P1-T0,1001,34,female,asian,Plasma,Feeding Study-30 min,PASS\n\
P1,P1-T1,1002,34,female,asian,Plasma,Feeding Study-30 min,PASS\n\
P1,P1-T1,1003,34,female,asian,Serum,Feeding Study-30 min,PASS\n\
P3,P3-T0,3001,45,female,White,Plasma,Feeding Study-30 min,FAIL\n\
P4,P4-T0,4001,50,male,White,Plasma,Healthy Controls,PASS\n";

const NAMES: &str = "1001_S1_L001_R1_001.fastq.gz\n\
1002_S2_L001_R1_001.fastq.gz\n\
1003_S3_L001_R1_001.fastq.gz\n\
2001_S4_L001_R1_001.fastq.gz\n\
4001_S5_L001_R1_001.fastq.gz\n";

const MANIFEST_TEMPLATE: &str = r#"{
    "settings": {"remoteStorageArea": "exRNA"},
    "studyName": "",
    "experimentMetadataFileName": "",
    "biosampleMetadataFileName": "",
    "manifest": []
}"#;

fn write_fixture(root: &Path, time_series: bool, studies: &[&str]) {
    fs::create_dir_all(root.join("templates")).unwrap();
    fs::write(root.join("templates/Donors.template.tsv"), DONORS_TEMPLATE).unwrap();
    fs::write(root.join("templates/Biosamples.template.tsv"), BIOSAMPLES_TEMPLATE).unwrap();
    fs::write(
        root.join("templates/manifest_template.manifest.json"),
        MANIFEST_TEMPLATE,
    )
    .unwrap();
    fs::write(root.join("sample_sheet.csv"), SHEET).unwrap();
    fs::write(root.join("fastq.names.txt"), NAMES).unwrap();

    let studies = studies
        .iter()
        .map(|study| format!("  - \"{study}\"\n"))
        .collect::<String>();
    let config = format!(
        "group: exrna-mtewa1\n\
user_login: tester\n\
study_name: Feeding Study\n\
study_id: EXR-FEED\n\
sample_sheet: sample_sheet.csv\n\
study_names:\n{studies}\
working_dir: out\n\
templates_dir: templates\n\
md5_checksum: daec25d670e3bb6b3ab3bbf5733df68c\n\
data_file_names: fastq.names.txt\n\
time_series: {time_series}\n\
database: hg19_exRNA\n\
analysis_name_prefix: MTEWA1_Feeding\n\
donor:\n  drop_properties: [\"- Ethnic Group\", \"- Notes\"]\n\
biosample:\n  drop_properties: [\"- Description\", \"* Aliases\", \"*-- DocURL\"]\n"
    );
    fs::write(root.join("dmrr-prep.yaml"), config).unwrap();
}

fn load_app(root: &Path) -> App {
    let path = root.join("dmrr-prep.yaml");
    let config = ConfigLoader::resolve(Some(path.to_str().unwrap())).unwrap();
    App::new(config)
}

fn read_table(path: &Path) -> Vec<Vec<String>> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| line.split('\t').map(str::to_string).collect())
        .collect()
}

fn row<'a>(table: &'a [Vec<String>], property: &str) -> &'a [String] {
    table
        .iter()
        .find(|row| row[0] == property)
        .map(|row| row.as_slice())
        .unwrap()
}

#[test]
fn time_series_submission_splits_by_source() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    write_fixture(root, true, &["Feeding Study-30 min", "Feeding Study-1 hr"]);

    let app = load_app(root);
    let result = app.prepare(PrepareOptions::default(), &NoopSink).unwrap();
    assert_eq!(result.specimens, 4);
    assert_eq!(result.donors, 2);
    let partitions = result
        .partitions
        .iter()
        .map(|part| (part.source.as_str(), part.biosamples))
        .collect::<Vec<_>>();
    assert_eq!(partitions, [("Plasma", 3), ("Serum", 1)]);
    assert_eq!(result.manifest_entries, 4);

    let out = root.join("out");
    let donors = read_table(&out.join("EXR-FEED-DO.metadata.tsv"));
    // participant ids lose their digits in the header
    assert_eq!(
        donors[0],
        ["#property", "valueP", "valueP", "required", "description"]
    );
    // P1 sorts first, so it becomes donor 1
    assert_eq!(row(&donors, "Donor")[1..3], ["EXR-FEED1-DO", "EXR-FEED2-DO"]);
    assert_eq!(row(&donors, "- Sex")[1..3], ["Female", "Male"]);
    assert_eq!(
        row(&donors, "- Racial Category")[1..3],
        ["Asian", "Native Hawaiian or Other Pacific Islander"]
    );
    assert_eq!(row(&donors, "- Donor Type")[1], "Experimental");
    assert_eq!(row(&donors, "- Age")[1..3], ["34 years", "61 years"]);
    assert!(donors.iter().all(|line| line[0] != "- Ethnic Group"));
    assert_eq!(row(&donors, "Donor")[3..], ["yes", "donor document id"]);

    let plasma = read_table(&out.join("EXR-FEED-BS-Plasma.metadata.tsv"));
    assert_eq!(
        plasma[0],
        ["#property", "value", "value", "value", "required", "description"]
    );
    assert_eq!(
        row(&plasma, "Biosample")[1..4],
        ["EXR-FEED1-BS", "EXR-FEED2-BS", "EXR-FEED3-BS"]
    );
    assert_eq!(
        row(&plasma, "- Name")[1..4],
        ["MT.Unique.ID_1001", "MT.Unique.ID_1002", "MT.Unique.ID_2001"]
    );
    assert_eq!(
        row(&plasma, "- Donor ID")[1..4],
        ["EXR-FEED1-DO", "EXR-FEED1-DO", "EXR-FEED2-DO"]
    );
    assert_eq!(row(&plasma, "-- DocURL")[3], "coll/Donors/doc/EXR-FEED2-DO");
    assert_eq!(row(&plasma, "*-- DocURL")[1], "coll/Experiments/doc/EXR-FEED1-EX");
    assert_eq!(row(&plasma, "* Custom Metadata")[1], "3");
    let names = plasma
        .iter()
        .filter(|line| line[0] == "*- Property Name")
        .map(|line| line[2].clone())
        .collect::<Vec<_>>();
    assert_eq!(names, ["Participant.ID", "timepoint", "timestep"]);
    let values = plasma
        .iter()
        .filter(|line| line[0] == "*-- Value")
        .map(|line| line[2].clone())
        .collect::<Vec<_>>();
    assert_eq!(values, ["P1", "T1", "30 min"]);

    let serum = read_table(&out.join("EXR-FEED-BS-Serum.metadata.tsv"));
    assert_eq!(row(&serum, "Biosample")[1], "EXR-FEED1-BS");
    assert_eq!(row(&serum, "--- Biofluid Name")[1], "Serum");
    assert_eq!(row(&serum, "*- Related Experiment")[1], "EXR-FEED2-EX");
    assert_eq!(plasma.len(), serum.len());

    let manifest: Value =
        serde_json::from_str(&fs::read_to_string(out.join("EXR-FEED.manifest.json")).unwrap())
            .unwrap();
    assert!(manifest.get("biosampleMetadataFileName").is_none());
    assert!(manifest.get("experimentMetadataFileName").is_none());
    assert_eq!(manifest["donorMetadataFileName"], "EXR-FEED-DO.metadata.tsv");
    assert_eq!(manifest["md5CheckSum"], "daec25d670e3bb6b3ab3bbf5733df68c");
    assert_eq!(manifest["settings"]["remoteStorageArea"], "exRNA");
    assert!(
        manifest["settings"]["analysisName"]
            .as_str()
            .unwrap()
            .starts_with("MTEWA1_Feeding_")
    );
    let entries = manifest["manifest"].as_array().unwrap();
    assert_eq!(entries.len(), 4);
    for entry in entries {
        assert!(entry.get("biosampleMetadataFileName").is_some());
        assert!(entry.get("experimentMetadataFileName").is_some());
    }
    assert_eq!(entries[2]["sampleName"], "MT.Unique.ID_1003");
    assert_eq!(entries[2]["dataFileName"], "1003_S3_L001_R1_001.fastq.gz");
    assert_eq!(
        entries[2]["biosampleMetadataFileName"],
        "EXR-FEED-BS-Serum.metadata.tsv"
    );
    assert_eq!(
        entries[3]["experimentMetadataFileName"],
        "EXR-FEED-EX-Plasma.metadata.tsv"
    );

    assert_eq!(
        result.manual_checklist,
        [
            "EXR-FEED-EX-Plasma.metadata.tsv",
            "EXR-FEED-EX-Serum.metadata.tsv",
            "EXR-FEED-RU.metadata.tsv",
            "EXR-FEED-ST.metadata.tsv",
            "EXR-FEED-SU.metadata.tsv"
        ]
    );
}

#[test]
fn single_source_submission_has_no_suffix() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    write_fixture(root, false, &["Healthy Controls"]);

    let app = load_app(root);
    let result = app.prepare(PrepareOptions::default(), &NoopSink).unwrap();
    assert_eq!(result.partitions.len(), 1);
    assert_eq!(result.partitions[0].file_name, "EXR-FEED-BS.metadata.tsv");
    assert_eq!(
        result.written,
        [
            "EXR-FEED-DO.metadata.tsv",
            "EXR-FEED-BS.metadata.tsv",
            "EXR-FEED.manifest.json"
        ]
    );

    let out = root.join("out");
    let biosamples = read_table(&out.join("EXR-FEED-BS.metadata.tsv"));
    assert_eq!(row(&biosamples, "* Custom Metadata")[1], "1");
    let donors = read_table(&out.join("EXR-FEED-DO.metadata.tsv"));
    assert_eq!(row(&donors, "- Donor Type")[1], "Healthy Subject");

    let manifest: Value =
        serde_json::from_str(&fs::read_to_string(out.join("EXR-FEED.manifest.json")).unwrap())
            .unwrap();
    assert_eq!(
        manifest["biosampleMetadataFileName"],
        "EXR-FEED-BS.metadata.tsv"
    );
    assert_eq!(
        manifest["experimentMetadataFileName"],
        "EXR-FEED-EX.metadata.tsv"
    );
    let entries = manifest["manifest"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].get("biosampleMetadataFileName").is_none());
    assert!(result.manual_checklist.contains(&"EXR-FEED-EX.metadata.tsv".to_string()));
}

#[test]
fn dry_run_writes_nothing() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    write_fixture(root, false, &["Healthy Controls"]);

    let app = load_app(root);
    let result = app
        .prepare(PrepareOptions { dry_run: true }, &NoopSink)
        .unwrap();
    assert!(result.written.is_empty());
    assert!(!root.join("out").exists());
}

#[test]
fn missing_raw_data_file_aborts() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    write_fixture(root, false, &["Healthy Controls"]);
    fs::write(root.join("fastq.names.txt"), "1001_S1.fastq.gz\n").unwrap();

    let app = load_app(root);
    let inputs = app.load_inputs(&NoopSink).unwrap();
    let date = NaiveDate::from_ymd_opt(2018, 7, 30).unwrap();
    let err = app.build(inputs, date, &NoopSink).unwrap_err();
    assert_matches!(err, PrepError::MissingDataFile(id) if id == "4001");
}

#[test]
fn serum_only_participant_has_no_donor() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    write_fixture(root, false, &["Healthy Controls"]);
    fs::write(
        root.join("sample_sheet.csv"),
        "Participant.ID,Sample.ID,MT.Unique.ID,Age,Gender,Race,Source,Study,MISEQ.QC.PASS\n\
P4,P4,4001,50,male,White,Serum,Healthy Controls,PASS\n",
    )
    .unwrap();

    let app = load_app(root);
    let err = app.prepare(PrepareOptions::default(), &NoopSink).unwrap_err();
    assert_matches!(err, PrepError::UnknownDonor { participant, .. } if participant == "P4");
    assert!(!root.join("out").exists());
}

#[test]
fn unknown_drop_property_is_a_config_error() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    write_fixture(root, false, &["Healthy Controls"]);
    let path = root.join("dmrr-prep.yaml");
    let config = fs::read_to_string(&path)
        .unwrap()
        .replace("\"- Notes\"", "\"- Shoe Size\"");
    fs::write(&path, config).unwrap();

    let app = load_app(root);
    let err = app.prepare(PrepareOptions::default(), &NoopSink).unwrap_err();
    assert_matches!(err, PrepError::UnknownProperty { property, .. } if property == "- Shoe Size");
}

#[test]
fn kept_alias_doc_url_does_not_take_the_experiment_link() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    write_fixture(root, false, &["Healthy Controls"]);
    let path = root.join("dmrr-prep.yaml");
    let config = fs::read_to_string(&path)
        .unwrap()
        .replace(", \"* Aliases\", \"*-- DocURL\"", "");
    fs::write(&path, config).unwrap();

    let app = load_app(root);
    app.prepare(PrepareOptions::default(), &NoopSink).unwrap();
    let table = read_table(&root.join("out/EXR-FEED-BS.metadata.tsv"));
    let related = table
        .iter()
        .position(|line| line[0] == "*- Related Experiment")
        .unwrap();
    assert_eq!(table[related + 1][0], "*-- DocURL");
    assert_eq!(table[related + 1][1], "coll/Experiments/doc/EXR-FEED1-EX");
    let alias_doc = table.last().unwrap();
    assert_eq!(alias_doc[0], "*-- DocURL");
    assert_eq!(alias_doc[1], "");
}

#[test]
fn blank_source_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    write_fixture(root, false, &["Healthy Controls"]);
    fs::write(
        root.join("sample_sheet.csv"),
        "Participant.ID,Sample.ID,MT.Unique.ID,Age,Gender,Race,Source,Study,MISEQ.QC.PASS\n\
P4,P4,4001,50,male,White,Plasma,Healthy Controls,PASS\n\
P4,P4-b,4002,50,male,White, ,Healthy Controls,PASS\n",
    )
    .unwrap();

    let app = load_app(root);
    let err = app.prepare(PrepareOptions::default(), &NoopSink).unwrap_err();
    assert_matches!(err, PrepError::InvalidSource { specimen, .. } if specimen == "4002");
    assert!(!root.join("out").exists());
}
