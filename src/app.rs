use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::binder::CrossReferenceBinder;
use crate::config::ResolvedConfig;
use crate::error::PrepError;
use crate::manifest::{DataFileIndex, Manifest, ManifestBuilder, ManifestTemplate, SubmissionFiles};
use crate::participants::ParticipantSet;
use crate::partition::SourcePartitioner;
use crate::records::{BIOSAMPLE_KIND, DONOR_KIND, prepare_biosample_schema, prepare_donor_schema};
use crate::sheet::{RawSampleRow, SampleSet, read_sample_sheet};
use crate::store::Workspace;
use crate::template::{TemplateExpander, TemplateSchema, WideTable};

#[derive(Debug, Clone, Copy, Default)]
pub struct PrepareOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Everything read from disk before the transformation starts.
#[derive(Debug, Clone)]
pub struct SubmissionInputs {
    pub rows: Vec<RawSampleRow>,
    pub donor_template: TemplateSchema,
    pub biosample_template: TemplateSchema,
    pub manifest_template: ManifestTemplate,
    pub data_files: DataFileIndex,
}

#[derive(Debug, Clone)]
pub struct BiosampleTable {
    pub source: String,
    pub file_name: String,
    pub table: WideTable,
}

/// Fully built, not yet written, submission.
#[derive(Debug, Clone)]
pub struct Submission {
    pub files: SubmissionFiles,
    pub specimens: usize,
    pub donors: WideTable,
    pub biosamples: Vec<BiosampleTable>,
    pub manifest: Manifest,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrepareResult {
    pub study_id: String,
    pub working_dir: String,
    pub specimens: usize,
    pub donors: usize,
    pub partitions: Vec<PartitionSummary>,
    pub manifest_entries: usize,
    pub dry_run: bool,
    pub written: Vec<String>,
    pub manual_checklist: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartitionSummary {
    pub source: String,
    pub biosamples: usize,
    pub file_name: String,
}

pub struct App {
    config: ResolvedConfig,
}

impl App {
    pub fn new(config: ResolvedConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn load_inputs(&self, sink: &dyn ProgressSink) -> Result<SubmissionInputs, PrepError> {
        let started = Instant::now();
        let config = &self.config;
        let inputs = SubmissionInputs {
            rows: read_sample_sheet(&config.sample_sheet)?,
            donor_template: TemplateSchema::from_path(DONOR_KIND, &config.donor_template)?,
            biosample_template: TemplateSchema::from_path(
                BIOSAMPLE_KIND,
                &config.biosample_template,
            )?,
            manifest_template: ManifestTemplate::from_path(&config.manifest_template)?,
            data_files: DataFileIndex::from_path(&config.data_file_names)?,
        };
        sink.event(ProgressEvent {
            message: format!(
                "phase=Load; {} sheet rows, {} data files",
                inputs.rows.len(),
                inputs.data_files.len()
            ),
            elapsed: Some(started.elapsed()),
        });
        Ok(inputs)
    }

    /// Runs the transformation over already loaded inputs; touches no files.
    pub fn build(
        &self,
        inputs: SubmissionInputs,
        analysis_date: NaiveDate,
        sink: &dyn ProgressSink,
    ) -> Result<Submission, PrepError> {
        let started = Instant::now();
        let config = &self.config;

        let samples = SampleSet::build(&inputs.rows, &config.study_names, config.time_series)?;
        if samples.is_empty() {
            return Err(PrepError::InvalidConfig(format!(
                "no specimen passed QC in studies {:?}",
                config.study_names
            )));
        }
        sink.event(ProgressEvent {
            message: format!("phase=Filter; {} specimens kept", samples.len()),
            elapsed: Some(started.elapsed()),
        });

        let participants =
            ParticipantSet::build(samples.records(), &config.reference_source, config.time_series)?;
        if participants.is_empty() {
            warn!(
                reference_source = %config.reference_source,
                "no participant has a reference-source specimen"
            );
        }
        let binder = CrossReferenceBinder::new(&config.study_id, config.time_series);
        let roster = binder.assign_donor_ids(participants);

        let donor_schema = prepare_donor_schema(inputs.donor_template, &config.donor)?;
        let donors = TemplateExpander::new(&donor_schema)
            .expand(roster.donors())?
            .canonicalize_labels();
        sink.event(ProgressEvent {
            message: format!("phase=Donors; {} donors", donors.width()),
            elapsed: Some(started.elapsed()),
        });

        let partitions = SourcePartitioner::partition(samples.records());
        let files = SubmissionFiles::new(&config.study_id, &partitions);
        let biosample_schema = prepare_biosample_schema(
            inputs.biosample_template,
            &config.biosample,
            config.time_series,
        )?;
        let expander = TemplateExpander::new(&biosample_schema);
        let mut biosamples = Vec::with_capacity(partitions.len());
        for ((position, partition), part_files) in
            partitions.iter().enumerate().zip(files.partitions.iter())
        {
            let experiment_id = config.study_id.experiment_id(position + 1);
            let records = binder.bind_biosamples(partition, &experiment_id, &roster)?;
            let table = expander.expand(&records)?.canonicalize_labels();
            info!(
                source = %partition.source,
                biosamples = table.width(),
                file = %part_files.biosample,
                "built biosample table"
            );
            biosamples.push(BiosampleTable {
                source: partition.source.clone(),
                file_name: part_files.biosample.clone(),
                table,
            });
        }
        sink.event(ProgressEvent {
            message: format!("phase=Biosamples; {} partition(s)", biosamples.len()),
            elapsed: Some(started.elapsed()),
        });

        let manifest = ManifestBuilder::build(
            config,
            inputs.manifest_template,
            samples.records(),
            &partitions,
            &inputs.data_files,
            analysis_date,
        )?;
        sink.event(ProgressEvent {
            message: format!("phase=Manifest; {} entries", manifest.entries().len()),
            elapsed: Some(started.elapsed()),
        });

        Ok(Submission {
            files,
            specimens: samples.len(),
            donors,
            biosamples,
            manifest,
        })
    }

    /// Writes every table and the manifest, then checks they all landed.
    pub fn write(
        &self,
        submission: &Submission,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<String>, PrepError> {
        let started = Instant::now();
        let workspace = Workspace::new(&self.config.working_dir)?;
        workspace.ensure_root()?;

        let mut written = Vec::new();
        workspace.write_file(&submission.files.donor, &submission.donors.to_tsv()?)?;
        written.push(submission.files.donor.clone());
        for biosample in &submission.biosamples {
            workspace.write_file(&biosample.file_name, &biosample.table.to_tsv()?)?;
            written.push(biosample.file_name.clone());
        }
        workspace.write_file(
            &submission.files.manifest,
            &submission.manifest.to_pretty_bytes()?,
        )?;
        written.push(submission.files.manifest.clone());

        workspace.verify_written(
            submission
                .manifest
                .generated_files()
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(submission.files.manifest.as_str())),
        )?;
        info!(files = written.len(), dir = %workspace.root(), "wrote submission");
        sink.event(ProgressEvent {
            message: format!("phase=Write; {} files in {}", written.len(), workspace.root()),
            elapsed: Some(started.elapsed()),
        });
        Ok(written)
    }

    pub fn prepare(
        &self,
        options: PrepareOptions,
        sink: &dyn ProgressSink,
    ) -> Result<PrepareResult, PrepError> {
        let inputs = self.load_inputs(sink)?;
        let submission = self.build(inputs, chrono::Local::now().date_naive(), sink)?;
        let written = if options.dry_run {
            Vec::new()
        } else {
            self.write(&submission, sink)?
        };
        Ok(self.summarize(&submission, options, written))
    }

    fn summarize(
        &self,
        submission: &Submission,
        options: PrepareOptions,
        written: Vec<String>,
    ) -> PrepareResult {
        PrepareResult {
            study_id: self.config.study_id.to_string(),
            working_dir: self.config.working_dir.display().to_string(),
            specimens: submission.specimens,
            donors: submission.donors.width(),
            partitions: submission
                .biosamples
                .iter()
                .map(|biosample| PartitionSummary {
                    source: biosample.source.clone(),
                    biosamples: biosample.table.width(),
                    file_name: biosample.file_name.clone(),
                })
                .collect(),
            manifest_entries: submission.manifest.entries().len(),
            dry_run: options.dry_run,
            written,
            manual_checklist: submission.manifest.manual_checklist().into_iter().collect(),
        }
    }
}
