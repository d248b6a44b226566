//! Typed donor and biosample records and the template rows they fill.

use serde::Serialize;

use crate::config::TemplateOptions;
use crate::domain::{BiosampleId, DonorId, ExperimentId, SpecimenId};
use crate::error::PrepError;
use crate::template::{ColumnFill, TemplateInstance, TemplateSchema};
use crate::vocabulary::{Age, Gender, Race};

pub const DONOR_KIND: &str = "Donors";
pub const BIOSAMPLE_KIND: &str = "Biosamples";

const STATUS: &str = "- Status";
const STATUS_ADD: &str = "Add";
const CUSTOM_METADATA: &str = "* Custom Metadata";
const PROPERTY_NAME: &str = "*- Property Name";
const PROPERTY_VALUE: &str = "*-- Value";

const DONOR: &str = "Donor";
const SEX: &str = "- Sex";
const RACIAL_CATEGORY: &str = "- Racial Category";
const DONOR_TYPE: &str = "- Donor Type";
const AGE: &str = "- Age";

const BIOSAMPLE: &str = "Biosample";
const NAME: &str = "- Name";
const DONOR_ID: &str = "- Donor ID";
const DONOR_DOC_URL: &str = "-- DocURL";
const SCIENTIFIC_NAME: &str = "--- Scientific Name";
const COMMON_NAME: &str = "--- Common Name";
const TAXON_ID: &str = "--- Taxon ID";
const DISEASE_TYPE: &str = "-- Disease Type";
const ANATOMICAL_LOCATION: &str = "-- Anatomical Location";
const BIOFLUID_NAME: &str = "--- Biofluid Name";
const EXRNA_SOURCE: &str = "-- exRNA Source";
const FRACTIONATION: &str = "-- Fractionation";
const RELATED_EXPERIMENTS: &str = "* Related Experiments";
const RELATED_EXPERIMENT: &str = "*- Related Experiment";
const EXPERIMENT_DOC_URL: &str = "*-- DocURL";

pub const HEALTHY_SUBJECT: &str = "Healthy Subject";
pub const EXPERIMENTAL_SUBJECT: &str = "Experimental";
const HOMO_SAPIENS: &str = "Homo sapiens";
const HUMAN: &str = "Human";
const HUMAN_TAXON: u32 = 9606;
const ANATOMY_PLASMA_CELL: &str = "Plasma cell";
const CELL_FREE_RNA: &str = "total cell-free biofluid RNA";

/// Custom metadata pairs carried by every time-series biosample.
pub const TIME_SERIES_PAIRS: usize = 3;

pub fn prepare_donor_schema(
    schema: TemplateSchema,
    options: &TemplateOptions,
) -> Result<TemplateSchema, PrepError> {
    schema.without_properties(options.drop_properties.as_slice())
}

/// Applies configured drops, makes sure a `*-- DocURL` row follows
/// `*- Related Experiment` and,
/// for time series, widens the custom metadata block.
pub fn prepare_biosample_schema(
    schema: TemplateSchema,
    options: &TemplateOptions,
    time_series: bool,
) -> Result<TemplateSchema, PrepError> {
    let mut schema = schema.without_properties(options.drop_properties.as_slice())?;
    if schema
        .position_after(RELATED_EXPERIMENT, EXPERIMENT_DOC_URL)
        .is_none()
    {
        schema = schema.with_row_after(RELATED_EXPERIMENT, EXPERIMENT_DOC_URL)?;
    }
    if time_series {
        schema = schema.with_repeated_group(&[PROPERTY_NAME, PROPERTY_VALUE], TIME_SERIES_PAIRS)?;
    }
    Ok(schema)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DonorRecord {
    pub donor_id: DonorId,
    pub participant_id: String,
    pub sex: Gender,
    pub race: Race,
    pub age: Age,
    pub donor_type: &'static str,
}

impl TemplateInstance for DonorRecord {
    fn column_label(&self) -> String {
        format!("value{}", self.participant_id)
    }

    fn fill(&self, column: &mut ColumnFill<'_>) -> Result<(), PrepError> {
        column.set(DONOR, &self.donor_id)?;
        column.set(STATUS, STATUS_ADD)?;
        column.set(SEX, &self.sex)?;
        column.set(RACIAL_CATEGORY, self.race)?;
        column.set(DONOR_TYPE, self.donor_type)?;
        column.set(AGE, self.age.render())?;
        column.set(CUSTOM_METADATA, 1)?;
        column.set(PROPERTY_NAME, "Participant.ID")?;
        column.set(PROPERTY_VALUE, &self.participant_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BiosampleRecord {
    pub biosample_id: BiosampleId,
    pub specimen_id: SpecimenId,
    pub donor_id: DonorId,
    pub source: String,
    pub experiment_id: ExperimentId,
    /// Custom metadata as (property name, value) pairs, in template order.
    pub custom: Vec<(String, String)>,
}

impl TemplateInstance for BiosampleRecord {
    fn column_label(&self) -> String {
        format!("value{}", self.specimen_id)
    }

    fn fill(&self, column: &mut ColumnFill<'_>) -> Result<(), PrepError> {
        column.set(BIOSAMPLE, &self.biosample_id)?;
        column.set(STATUS, STATUS_ADD)?;
        column.set(NAME, self.specimen_id.sample_name())?;
        column.set(DONOR_ID, &self.donor_id)?;
        column.set(DONOR_DOC_URL, self.donor_id.doc_url())?;
        column.set(SCIENTIFIC_NAME, HOMO_SAPIENS)?;
        column.set(COMMON_NAME, HUMAN)?;
        column.set(TAXON_ID, HUMAN_TAXON)?;
        column.set(DISEASE_TYPE, HEALTHY_SUBJECT)?;
        column.set(ANATOMICAL_LOCATION, ANATOMY_PLASMA_CELL)?;
        column.set(BIOFLUID_NAME, &self.source)?;
        column.set(EXRNA_SOURCE, CELL_FREE_RNA)?;
        column.set(FRACTIONATION, "Yes")?;
        column.set(RELATED_EXPERIMENTS, 1)?;
        column.set(RELATED_EXPERIMENT, &self.experiment_id)?;
        column.set_after(
            RELATED_EXPERIMENT,
            EXPERIMENT_DOC_URL,
            self.experiment_id.doc_url(),
        )?;
        column.set(CUSTOM_METADATA, self.custom.len())?;
        for (occurrence, (name, value)) in self.custom.iter().enumerate() {
            column.set_nth(PROPERTY_NAME, occurrence, name)?;
            column.set_nth(PROPERTY_VALUE, occurrence, value)?;
        }
        Ok(())
    }
}
