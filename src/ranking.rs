use std::collections::HashMap;

use log::debug;
use serde::Serialize;

use crate::{
    data::{number_or_zero, serialize_pairs},
    records::Record,
};

pub const DEFAULT_TOP_N: usize = 10;

/// One leaderboard row: a grouping value and its summed numeric fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingRow {
    pub group: String,
    #[serde(serialize_with = "serialize_pairs")]
    pub totals: Vec<(String, f64)>,
}

impl RankingRow {
    pub fn total(&self, field: &str) -> f64 {
        self.totals
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, total)| *total)
            .unwrap_or_default()
    }

    fn primary(&self) -> f64 {
        self.totals.first().map(|(_, total)| *total).unwrap_or_default()
    }
}

struct RankingAccumulator<'a, S> {
    number_fields: &'a [S],
    slots: HashMap<String, usize>,
    rows: Vec<RankingRow>,
}

impl<'a, S: AsRef<str>> RankingAccumulator<'a, S> {
    fn new(number_fields: &'a [S]) -> Self {
        Self {
            number_fields,
            slots: HashMap::new(),
            rows: Vec::new(),
        }
    }

    fn ingest(&mut self, group: &str, record: &Record) {
        let number_fields = self.number_fields;
        let rows = &mut self.rows;
        let slot = *self.slots.entry(group.to_string()).or_insert_with(|| {
            rows.push(RankingRow {
                group: group.to_string(),
                totals: number_fields
                    .iter()
                    .map(|field| (field.as_ref().to_string(), 0.0))
                    .collect(),
            });
            rows.len() - 1
        });
        for (idx, field) in number_fields.iter().enumerate() {
            self.rows[slot].totals[idx].1 += number_or_zero(record.get(field.as_ref()));
        }
    }

    fn into_rows(self, top_n: usize) -> Vec<RankingRow> {
        let mut rows = self.rows;
        rows.sort_by(|a, b| b.primary().total_cmp(&a.primary()));
        if top_n > 0 && rows.len() > top_n {
            rows.truncate(top_n);
        }
        rows
    }
}

/// Sums `number_fields` per trimmed `group_field` value and keeps the `top_n`
/// groups with the largest first-field sum. Ties keep first-seen order;
/// `top_n == 0` keeps every group. Blank group values are skipped.
pub fn create_ranking<S: AsRef<str>>(
    records: &[Record],
    group_field: &str,
    number_fields: &[S],
    top_n: usize,
) -> Vec<RankingRow> {
    let mut acc = RankingAccumulator::new(number_fields);
    for record in records {
        let group = record.get(group_field).trim();
        if group.is_empty() {
            continue;
        }
        acc.ingest(group, record);
    }
    let groups = acc.rows.len();
    let rows = acc.into_rows(top_n);
    debug!(
        "Ranked {groups} '{group_field}' group(s), keeping {}",
        rows.len()
    );
    rows
}
