//! Narrow property templates and their expansion into wide tables.
//!
//! A [`TemplateSchema`] is the `#property` / `value` template the repository
//! publishes for an entity kind. Expanding it yields a [`WideTable`] with one
//! column per entity instance, each column starting as a copy of the
//! template's default values. The schema decides the row set; filling a
//! column may only overwrite rows the schema declares.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use crate::error::PrepError;

pub const KEY_COLUMN: &str = "#property";
pub const VALUE_COLUMN: &str = "value";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRow {
    pub property: String,
    /// Cells aligned with [`TemplateSchema::headers`]; the value slot holds
    /// the default.
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSchema {
    kind: String,
    headers: Vec<String>,
    value_slot: usize,
    rows: Vec<TemplateRow>,
}

impl TemplateSchema {
    pub fn from_path(kind: &str, path: &Path) -> Result<Self, PrepError> {
        let file = std::fs::File::open(path)
            .map_err(|err| PrepError::Filesystem(format!("open {}: {err}", path.display())))?;
        Self::from_reader(kind, &path.display().to_string(), file)
    }

    pub fn from_reader<R: Read>(kind: &str, origin: &str, reader: R) -> Result<Self, PrepError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_reader(reader);
        let raw_headers = reader
            .headers()
            .map_err(|err| PrepError::Csv(err.to_string()))?
            .clone();
        let missing = |column: &str| PrepError::MissingColumn {
            file: origin.to_string(),
            column: column.to_string(),
        };
        let key_index = raw_headers
            .iter()
            .position(|header| header == KEY_COLUMN)
            .ok_or_else(|| missing(KEY_COLUMN))?;

        let headers = raw_headers
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != key_index)
            .map(|(_, header)| header.to_string())
            .collect::<Vec<_>>();
        let value_slot = headers
            .iter()
            .position(|header| header == VALUE_COLUMN)
            .ok_or_else(|| missing(VALUE_COLUMN))?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|err| PrepError::Csv(err.to_string()))?;
            let property = record.get(key_index).unwrap_or("").to_string();
            if property.is_empty() {
                continue;
            }
            let cells = (0..raw_headers.len())
                .filter(|index| *index != key_index)
                .map(|index| record.get(index).unwrap_or("").to_string())
                .collect();
            rows.push(TemplateRow { property, cells });
        }

        Ok(Self {
            kind: kind.to_string(),
            headers,
            value_slot,
            rows,
        })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[TemplateRow] {
        &self.rows
    }

    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row.property.as_str())
    }

    pub fn defaults(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.cells[self.value_slot].clone())
            .collect()
    }

    /// Row index of the `occurrence`-th (0-based) row named `property`.
    pub fn position(&self, property: &str, occurrence: usize) -> Option<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.property == property)
            .nth(occurrence)
            .map(|(index, _)| index)
    }

    pub fn occurrences(&self, property: &str) -> usize {
        self.properties().filter(|name| *name == property).count()
    }

    fn unknown(&self, property: &str) -> PrepError {
        PrepError::UnknownProperty {
            kind: self.kind.clone(),
            property: property.to_string(),
        }
    }

    /// Removes every row named in `properties`. Names may repeat; only a name
    /// the template never declared is an error.
    pub fn without_properties<S: AsRef<str>>(mut self, properties: &[S]) -> Result<Self, PrepError> {
        let dropped = properties
            .iter()
            .map(|property| property.as_ref())
            .collect::<HashSet<&str>>();
        if let Some(unknown) = properties
            .iter()
            .map(|property| property.as_ref())
            .find(|property| self.position(property, 0).is_none())
        {
            return Err(self.unknown(unknown));
        }
        self.rows.retain(|row| !dropped.contains(row.property.as_str()));
        Ok(self)
    }

    /// Row index of `property` when it sits directly after the first `anchor` row.
    pub fn position_after(&self, anchor: &str, property: &str) -> Option<usize> {
        let next = self.position(anchor, 0)? + 1;
        self.rows
            .get(next)
            .filter(|row| row.property == property)
            .map(|_| next)
    }

    /// Inserts an empty row named `property` right after the first `anchor` row.
    pub fn with_row_after(mut self, anchor: &str, property: &str) -> Result<Self, PrepError> {
        let position = self.position(anchor, 0).ok_or_else(|| self.unknown(anchor))?;
        let row = TemplateRow {
            property: property.to_string(),
            cells: vec![String::new(); self.headers.len()],
        };
        self.rows.insert(position + 1, row);
        Ok(self)
    }

    /// Repeats the contiguous `group` rows until the template holds `total`
    /// copies, placing the new copies right after the first one.
    pub fn with_repeated_group(mut self, group: &[&str], total: usize) -> Result<Self, PrepError> {
        let Some(first) = group.first() else {
            return Ok(self);
        };
        let start = self.position(first, 0).ok_or_else(|| self.unknown(first))?;
        for (offset, property) in group.iter().enumerate() {
            let matches = self
                .rows
                .get(start + offset)
                .map(|row| row.property == *property)
                .unwrap_or(false);
            if !matches {
                return Err(self.unknown(property));
            }
        }
        let block = self.rows[start..start + group.len()].to_vec();
        let insert_at = start + group.len();
        for _ in 1..total {
            self.rows.splice(insert_at..insert_at, block.iter().cloned());
        }
        Ok(self)
    }
}

/// Write access to one column being filled, restricted to schema rows.
pub struct ColumnFill<'a> {
    schema: &'a TemplateSchema,
    values: &'a mut [String],
}

impl ColumnFill<'_> {
    pub fn set(&mut self, property: &str, value: impl ToString) -> Result<(), PrepError> {
        self.set_nth(property, 0, value)
    }

    pub fn set_nth(
        &mut self,
        property: &str,
        occurrence: usize,
        value: impl ToString,
    ) -> Result<(), PrepError> {
        let position = self
            .schema
            .position(property, occurrence)
            .ok_or_else(|| self.schema.unknown(property))?;
        self.values[position] = value.to_string();
        Ok(())
    }

    /// Sets the `property` row that directly follows the first `anchor` row.
    pub fn set_after(
        &mut self,
        anchor: &str,
        property: &str,
        value: impl ToString,
    ) -> Result<(), PrepError> {
        let position = self
            .schema
            .position_after(anchor, property)
            .ok_or_else(|| self.schema.unknown(property))?;
        self.values[position] = value.to_string();
        Ok(())
    }
}

/// One entity instance: a full copy of the template values with
/// instance-specific overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityColumn {
    pub label: String,
    pub values: Vec<String>,
}

/// Something that can be laid out as one column of a wide table.
pub trait TemplateInstance {
    fn column_label(&self) -> String;
    fn fill(&self, column: &mut ColumnFill<'_>) -> Result<(), PrepError>;
}

pub struct TemplateExpander<'a> {
    schema: &'a TemplateSchema,
}

impl<'a> TemplateExpander<'a> {
    pub fn new(schema: &'a TemplateSchema) -> Self {
        Self { schema }
    }

    pub fn expand<T: TemplateInstance>(&self, instances: &[T]) -> Result<WideTable, PrepError> {
        self.expand_with(instances, T::column_label, |instance, column| {
            instance.fill(column)
        })
    }

    /// Columns keep `instances` order left to right.
    pub fn expand_with<I, L, F>(
        &self,
        instances: &[I],
        label: L,
        mut fill: F,
    ) -> Result<WideTable, PrepError>
    where
        L: Fn(&I) -> String,
        F: FnMut(&I, &mut ColumnFill<'_>) -> Result<(), PrepError>,
    {
        let defaults = self.schema.defaults();
        let mut columns = Vec::with_capacity(instances.len());
        for instance in instances {
            let mut values = defaults.clone();
            let mut column = ColumnFill {
                schema: self.schema,
                values: &mut values,
            };
            fill(instance, &mut column)?;
            columns.push(EntityColumn {
                label: label(instance),
                values,
            });
        }
        Ok(WideTable {
            schema: self.schema.clone(),
            columns,
        })
    }
}

/// Template rows × entity columns. Every column has exactly one value per
/// schema row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WideTable {
    schema: TemplateSchema,
    columns: Vec<EntityColumn>,
}

impl WideTable {
    pub fn schema(&self) -> &TemplateSchema {
        &self.schema
    }

    pub fn columns(&self) -> &[EntityColumn] {
        &self.columns
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn value(&self, column: usize, property: &str) -> Option<&str> {
        self.value_nth(column, property, 0)
    }

    pub fn value_nth(&self, column: usize, property: &str, occurrence: usize) -> Option<&str> {
        let row = self.schema.position(property, occurrence)?;
        self.columns
            .get(column)
            .map(|column| column.values[row].as_str())
    }

    pub fn row_labels(&self) -> Vec<String> {
        self.schema.properties().map(str::to_string).collect()
    }

    pub fn column_labels(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.label.clone()).collect()
    }

    /// Strips bookkeeping ordinals from every row and column label.
    pub fn canonicalize_labels(mut self) -> Self {
        for row in &mut self.schema.rows {
            row.property = canonical_row_label(&row.property);
        }
        for column in &mut self.columns {
            column.label = canonical_column_label(&column.label);
        }
        self
    }

    /// Tab-separated rendering: `#property`, the instance columns in place of
    /// the template's value column, then the remaining template columns.
    pub fn to_tsv(&self) -> Result<Vec<u8>, PrepError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(Vec::new());

        let mut header = vec![KEY_COLUMN.to_string()];
        for (slot, name) in self.schema.headers.iter().enumerate() {
            if slot == self.schema.value_slot {
                header.extend(
                    self.columns
                        .iter()
                        .map(|column| canonical_column_label(&column.label)),
                );
            } else {
                header.push(name.clone());
            }
        }
        writer
            .write_record(&header)
            .map_err(|err| PrepError::Csv(err.to_string()))?;

        for (index, row) in self.schema.rows.iter().enumerate() {
            let mut record = vec![canonical_row_label(&row.property)];
            for (slot, cell) in row.cells.iter().enumerate() {
                if slot == self.schema.value_slot {
                    record.extend(self.columns.iter().map(|column| column.values[index].clone()));
                } else {
                    record.push(cell.clone());
                }
            }
            writer
                .write_record(&record)
                .map_err(|err| PrepError::Csv(err.to_string()))?;
        }

        writer
            .into_inner()
            .map_err(|err| PrepError::Csv(err.to_string()))
    }
}

pub fn canonical_row_label(label: &str) -> String {
    label.chars().filter(|ch| !ch.is_ascii_digit()).collect()
}

pub fn canonical_column_label(label: &str) -> String {
    label
        .chars()
        .filter(|ch| !ch.is_ascii_digit() && *ch != '*')
        .collect()
}
