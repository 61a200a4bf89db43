//! Record mapping: aligns raw data rows with the parsed schema.
//!
//! Two alignment strategies are supported:
//!
//! - [`Alignment::Index`]: a field's 1-based `order` is its data column. Short
//!   or ragged rows yield empty values rather than faults.
//! - [`Alignment::Header`]: the data sheet's own header row is searched
//!   (case-insensitively) for each field name. Fields with no matching column
//!   are left out of every record.
//!
//! Rows whose mapped values are all blank are dropped, which takes care of the
//! trailing empty rows spreadsheets tend to return.

use std::{fmt, str::FromStr};

use anyhow::anyhow;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    data::{Cell, Row, serialize_pairs},
    schema::FieldDescriptor,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    Index,
    Header,
}

impl FromStr for Alignment {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "index" | "order" => Ok(Alignment::Index),
            "header" | "headers" | "name" => Ok(Alignment::Header),
            other => Err(anyhow!(
                "Unknown alignment '{other}'. Supported alignments: index, header"
            )),
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alignment::Index => f.write_str("index"),
            Alignment::Header => f.write_str("header"),
        }
    }
}

/// One mapped data row: field name to raw text, in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Record {
    #[serde(serialize_with = "serialize_pairs")]
    values: Vec<(String, String)>,
}

impl Record {
    pub fn new(values: Vec<(String, String)>) -> Self {
        Self { values }
    }

    /// Raw value of `field`, or `""` when the record has no such field.
    pub fn get(&self, field: &str) -> &str {
        self.values
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
            .unwrap_or("")
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.iter().any(|(name, _)| name == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn is_blank(&self) -> bool {
        self.values.iter().all(|(_, value)| value.trim().is_empty())
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

/// Data column chosen for each field, in field order. `None` means the field
/// is present in records with an empty value.
fn resolve_columns<'a>(
    header: &[Cell],
    fields: &'a [FieldDescriptor],
    alignment: Alignment,
) -> Vec<(&'a str, Option<usize>)> {
    match alignment {
        Alignment::Index => fields
            .iter()
            .map(|field| (field.field_name.as_str(), field.column_index()))
            .collect(),
        Alignment::Header => {
            let headers = header
                .iter()
                .map(|cell| cell.as_text().trim().to_lowercase())
                .collect::<Vec<_>>();
            fields
                .iter()
                .filter_map(|field| {
                    let wanted = field.field_name.trim().to_lowercase();
                    match headers.iter().position(|header| *header == wanted) {
                        Some(idx) => Some((field.field_name.as_str(), Some(idx))),
                        None => {
                            debug!(
                                "Field '{}' has no matching data column; omitting it",
                                field.field_name
                            );
                            None
                        }
                    }
                })
                .collect()
        }
    }
}

/// Maps data rows (header first) into records.
pub fn map_records(rows: &[Row], fields: &[FieldDescriptor], alignment: Alignment) -> Vec<Record> {
    let Some((header, body)) = rows.split_first() else {
        return Vec::new();
    };
    let columns = resolve_columns(header, fields, alignment);

    let mut records = Vec::with_capacity(body.len());
    for (row_idx, row) in body.iter().enumerate() {
        let record = columns
            .iter()
            .map(|(name, column)| {
                let value = column
                    .and_then(|idx| row.get(idx))
                    .map(|cell| cell.as_text().into_owned())
                    .unwrap_or_default();
                (name.to_string(), value)
            })
            .collect::<Record>();
        if record.is_blank() {
            debug!("Skipping blank data row {}", row_idx + 2);
            continue;
        }
        records.push(record);
    }
    debug!(
        "Mapped {} record(s) from {} data row(s) using {alignment} alignment",
        records.len(),
        body.len()
    );
    records
}
