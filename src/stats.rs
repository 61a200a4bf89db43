//! KPI aggregates over numeric fields.
//!
//! Each aggregate covers the values of one field that parse as numbers and
//! are not considered absent. By default a literal zero counts as absent
//! (spreadsheets rarely distinguish "0" from "not filled in");
//! [`AbsencePolicy::None`] keeps zeros, and [`compute_aggregate_with`] takes
//! any predicate.

use std::str::FromStr;

use anyhow::anyhow;
use log::debug;
use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};

use crate::{data::parse_number, records::Record, schema::FieldDescriptor};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsencePolicy {
    /// Zero is treated like a missing value.
    #[default]
    Zero,
    /// Only blank or non-numeric cells are missing.
    None,
}

impl AbsencePolicy {
    pub fn is_absent(&self, value: f64) -> bool {
        match self {
            AbsencePolicy::Zero => value == 0.0,
            AbsencePolicy::None => false,
        }
    }
}

impl FromStr for AbsencePolicy {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "zero" => Ok(AbsencePolicy::Zero),
            "none" | "keep" => Ok(AbsencePolicy::None),
            other => Err(anyhow!(
                "Unknown absence policy '{other}'. Supported policies: zero, none"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub sum: f64,
    pub avg: f64,
    pub max: f64,
    pub min: f64,
    pub count: usize,
}

#[derive(Debug, Default)]
struct Accumulator {
    sum: f64,
    count: usize,
    min: Option<f64>,
    max: Option<f64>,
}

impl Accumulator {
    fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |current| current.min(value)));
        self.max = Some(self.max.map_or(value, |current| current.max(value)));
    }

    fn finish(self) -> AggregateResult {
        if self.count == 0 {
            return AggregateResult::default();
        }
        AggregateResult {
            sum: self.sum,
            avg: self.sum / self.count as f64,
            max: self.max.unwrap_or_default(),
            min: self.min.unwrap_or_default(),
            count: self.count,
        }
    }
}

/// Aggregates `number_field` using the default zero-as-absent policy.
pub fn compute_aggregate(records: &[Record], number_field: &str) -> AggregateResult {
    compute_aggregate_with(records, number_field, |value| {
        AbsencePolicy::Zero.is_absent(value)
    })
}

/// Aggregates `number_field`, skipping unparseable values and any value for
/// which `is_absent` returns true.
pub fn compute_aggregate_with<F>(records: &[Record], number_field: &str, is_absent: F) -> AggregateResult
where
    F: Fn(f64) -> bool,
{
    let mut acc = Accumulator::default();
    for value in records
        .iter()
        .filter_map(|record| parse_number(record.get(number_field)))
        .filter(|value| !is_absent(*value))
    {
        acc.add(value);
    }
    acc.finish()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldAggregate {
    pub field: String,
    pub label: String,
    #[serde(flatten)]
    pub result: AggregateResult,
}

/// One aggregate per numeric field, in schema order. Serializes as an object
/// keyed by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KpiSummary {
    pub entries: Vec<FieldAggregate>,
}

impl Serialize for KpiSummary {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.field, entry)?;
        }
        map.end()
    }
}

impl KpiSummary {
    pub fn get(&self, field: &str) -> Option<&AggregateResult> {
        self.entries
            .iter()
            .find(|entry| entry.field == field)
            .map(|entry| &entry.result)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn compute_aggregates(
    records: &[Record],
    number_fields: &[FieldDescriptor],
    policy: AbsencePolicy,
) -> KpiSummary {
    let entries = number_fields
        .iter()
        .map(|field| FieldAggregate {
            field: field.field_name.clone(),
            label: field.label.clone(),
            result: compute_aggregate_with(records, &field.field_name, |value| {
                policy.is_absent(value)
            }),
        })
        .collect::<Vec<_>>();
    debug!(
        "Computed {} aggregate(s) over {} record(s)",
        entries.len(),
        records.len()
    );
    KpiSummary { entries }
}
