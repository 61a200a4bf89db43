use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    dates::{CanonicalDate, DateNormalizer},
    records::Record,
};

/// Inclusive bounds on a date field. Bounds are raw text and are normalized
/// with the same [`DateNormalizer`] as record values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

impl DateRange {
    pub fn new(start: Option<&str>, end: Option<&str>) -> Self {
        Self {
            start: start.map(str::to_string),
            end: end.map(str::to_string),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        bound_text(self.start.as_deref()).is_none() && bound_text(self.end.as_deref()).is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DateBounds {
    Exact(CanonicalDate),
    Between(CanonicalDate, CanonicalDate),
    From(CanonicalDate),
    Until(CanonicalDate),
    /// A bound was supplied but could not be read; nothing matches.
    Unmatchable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Bound {
    Open,
    At(CanonicalDate),
    Unreadable,
}

impl DateBounds {
    fn resolve(range: &DateRange, normalizer: &DateNormalizer) -> Option<Self> {
        let start = normalize_bound("start", range.start.as_deref(), normalizer);
        let end = normalize_bound("end", range.end.as_deref(), normalizer);
        match (start, end) {
            (Bound::Open, Bound::Open) => None,
            (Bound::Unreadable, _) | (_, Bound::Unreadable) => Some(DateBounds::Unmatchable),
            (Bound::At(start), Bound::At(end)) if start == end => Some(DateBounds::Exact(start)),
            (Bound::At(start), Bound::At(end)) => Some(DateBounds::Between(start, end)),
            (Bound::At(start), Bound::Open) => Some(DateBounds::From(start)),
            (Bound::Open, Bound::At(end)) => Some(DateBounds::Until(end)),
        }
    }

    fn contains(&self, value: &CanonicalDate) -> bool {
        match self {
            DateBounds::Exact(day) => value == day,
            DateBounds::Between(start, end) => start <= value && value <= end,
            DateBounds::From(start) => start <= value,
            DateBounds::Until(end) => value <= end,
            DateBounds::Unmatchable => false,
        }
    }
}

fn bound_text(bound: Option<&str>) -> Option<&str> {
    bound.map(str::trim).filter(|value| !value.is_empty())
}

fn normalize_bound(side: &str, bound: Option<&str>, normalizer: &DateNormalizer) -> Bound {
    let Some(raw) = bound_text(bound) else {
        return Bound::Open;
    };
    match normalizer.normalize(raw) {
        Some(date) => Bound::At(date),
        None => {
            warn!("Unparseable {side} date bound '{raw}'; no record can match");
            Bound::Unreadable
        }
    }
}

/// Keeps records whose `date_field` falls inside `range` (inclusive).
///
/// An unbounded range passes every record through untouched. Once a bound is
/// active, records with a blank or unreadable date are dropped. A bound that
/// cannot be read matches no record.
pub fn filter_by_date_range(
    records: Vec<Record>,
    date_field: &str,
    range: &DateRange,
    normalizer: &DateNormalizer,
) -> Vec<Record> {
    let Some(bounds) = DateBounds::resolve(range, normalizer) else {
        return records;
    };
    let before = records.len();
    let kept = records
        .into_iter()
        .filter(|record| {
            normalizer
                .normalize(record.get(date_field))
                .is_some_and(|value| bounds.contains(&value))
        })
        .collect::<Vec<_>>();
    debug!(
        "Date filter on '{date_field}' kept {} of {before} record(s)",
        kept.len()
    );
    kept
}

/// Keeps records whose trimmed `field` equals the trimmed `value`. A blank
/// `value` keeps everything.
pub fn filter_by_period(records: Vec<Record>, field: &str, value: &str) -> Vec<Record> {
    let wanted = value.trim();
    if wanted.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|record| record.get(field).trim() == wanted)
        .collect()
}

/// Period filter selection: which field and which value to keep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodFilter {
    pub field: String,
    pub value: String,
}

/// The filters applied before any aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    pub date_field: Option<String>,
    pub range: DateRange,
    pub period: Option<PeriodFilter>,
}

impl FilterSet {
    pub fn apply(&self, records: Vec<Record>, normalizer: &DateNormalizer) -> Vec<Record> {
        let records = match &self.date_field {
            Some(field) => filter_by_date_range(records, field, &self.range, normalizer),
            None => {
                if !self.range.is_unbounded() {
                    warn!("Date bounds supplied without a date field; ignoring them");
                }
                records
            }
        };
        match &self.period {
            Some(period) => filter_by_period(records, &period.field, &period.value),
            None => records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dated(values: &[&str]) -> Vec<Record> {
        values
            .iter()
            .map(|value| Record::from_iter([("d", *value)]))
            .collect()
    }

    fn days(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.get("d")).collect()
    }

    #[test]
    fn exact_day_matches_mixed_formats() {
        let records = dated(&["2024-01-01", "01/01/2024", "2024-01-02", ""]);
        let range = DateRange::new(Some("2024-01-01"), Some("1/1/2024"));
        let kept = filter_by_date_range(records, "d", &range, &DateNormalizer::default());
        assert_eq!(days(&kept), vec!["2024-01-01", "01/01/2024"]);
    }

    #[test]
    fn open_ended_bounds_are_inclusive() {
        let records = dated(&["2024-01-01", "2024-02-01", "2024-03-01", "garbage"]);
        let normalizer = DateNormalizer::default();
        let from = filter_by_date_range(
            records.clone(),
            "d",
            &DateRange::new(Some("2024-02-01"), None),
            &normalizer,
        );
        assert_eq!(days(&from), vec!["2024-02-01", "2024-03-01"]);
        let until = filter_by_date_range(
            records,
            "d",
            &DateRange::new(None, Some("2024-02-01")),
            &normalizer,
        );
        assert_eq!(days(&until), vec!["2024-01-01", "2024-02-01"]);
    }

    #[test]
    fn unbounded_range_is_identity() {
        let records = dated(&["junk", "", "2024-01-01"]);
        let kept = filter_by_date_range(
            records.clone(),
            "d",
            &DateRange::new(Some("  "), None),
            &DateNormalizer::default(),
        );
        assert_eq!(kept, records);
    }

    #[test]
    fn unreadable_bound_matches_nothing() {
        let records = dated(&["", "garbage", "2024-01-01"]);
        let kept = filter_by_date_range(
            records,
            "d",
            &DateRange::new(Some("not-a-date"), None),
            &DateNormalizer::default(),
        );
        assert!(kept.is_empty());
    }

    #[test]
    fn period_filter_trims_and_passes_through_blank() {
        let records = vec![
            Record::from_iter([("p", " Q1 ")]),
            Record::from_iter([("p", "Q2")]),
        ];
        assert_eq!(filter_by_period(records.clone(), "p", "Q1").len(), 1);
        assert_eq!(filter_by_period(records.clone(), "p", "").len(), 2);
        assert!(filter_by_period(records, "p", "Q3").is_empty());
    }

    #[test]
    fn filter_set_chains_date_and_period() {
        let records = vec![
            Record::from_iter([("d", "2024-01-05"), ("p", "A")]),
            Record::from_iter([("d", "2024-01-05"), ("p", "B")]),
            Record::from_iter([("d", "2023-12-31"), ("p", "A")]),
        ];
        let filters = FilterSet {
            date_field: Some("d".to_string()),
            range: DateRange::new(Some("2024-01-01"), Some("2024-01-31")),
            period: Some(PeriodFilter {
                field: "p".to_string(),
                value: "A".to_string(),
            }),
        };
        let kept = filters.apply(records, &DateNormalizer::default());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].get("p"), "A");
    }
}
