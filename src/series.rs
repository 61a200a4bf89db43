use std::collections::HashMap;

use chrono::NaiveDate;
use log::debug;
use serde::Serialize;

use crate::{
    data::{number_or_zero, serialize_pairs},
    dates::DateNormalizer,
    records::Record,
};

/// Per-date totals for one time series bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    /// Raw date text shared by every record in the bucket.
    pub date: String,
    #[serde(serialize_with = "serialize_pairs")]
    pub totals: Vec<(String, f64)>,
}

impl TimeSeriesPoint {
    pub fn total(&self, field: &str) -> f64 {
        self.totals
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, total)| *total)
            .unwrap_or_default()
    }
}

/// Buckets records by their raw `date_field` text and sums each numeric field
/// per bucket. Non-numeric values count as zero.
///
/// Buckets that read as calendar dates come first, in chronological order;
/// the rest follow in lexical order. Records with a blank date are skipped.
pub fn group_by_date<S: AsRef<str>>(
    records: &[Record],
    date_field: &str,
    number_fields: &[S],
    normalizer: &DateNormalizer,
) -> Vec<TimeSeriesPoint> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut points: Vec<TimeSeriesPoint> = Vec::new();

    for record in records {
        let date = record.get(date_field).trim();
        if date.is_empty() {
            continue;
        }
        let slot = *slots.entry(date.to_string()).or_insert_with(|| {
            points.push(TimeSeriesPoint {
                date: date.to_string(),
                totals: number_fields
                    .iter()
                    .map(|field| (field.as_ref().to_string(), 0.0))
                    .collect(),
            });
            points.len() - 1
        });
        for (idx, field) in number_fields.iter().enumerate() {
            points[slot].totals[idx].1 += number_or_zero(record.get(field.as_ref()));
        }
    }

    let mut keyed = points
        .into_iter()
        .map(|point| (sort_key(&point.date, normalizer), point))
        .collect::<Vec<_>>();
    keyed.sort_by(|(a, _), (b, _)| a.cmp(b));
    debug!("Grouped {} record(s) into {} date bucket(s)", records.len(), keyed.len());
    keyed.into_iter().map(|(_, point)| point).collect()
}

/// Dated buckets first, then by date, then by raw text. Total over any set of
/// buckets.
fn sort_key(raw: &str, normalizer: &DateNormalizer) -> (bool, Option<NaiveDate>, String) {
    let parsed = normalizer.parse_calendar_date(raw);
    (parsed.is_none(), parsed, raw.to_string())
}
