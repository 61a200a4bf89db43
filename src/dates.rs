//! Date normalization for hand-entered spreadsheet dates.
//!
//! Source sheets mix ISO dates, slash and dash separated day/month/year
//! triples with two or four digit years, and the odd long-form date. Every
//! value is reduced to a [`CanonicalDate`] (`YYYY-MM-DD`), whose lexical order
//! equals chronological order, or to `None` when it cannot be read with
//! confidence.
//!
//! Resolution order:
//!
//! 1. strict `YYYY-MM-DD` is returned as is
//! 2. three numeric parts split on `/` or `-`, disambiguated by magnitude;
//!    a triple where both day and month are `<= 12` is resolved by the
//!    caller's [`DateOrder`] (month first unless told otherwise)
//! 3. a handful of long-form and date-time layouts parsed with `chrono`

use std::{fmt, str::FromStr, sync::OnceLock};

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

const MIN_YEAR: u32 = 1900;
const TWO_DIGIT_PIVOT: u32 = 50;

const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%d.%m.%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%A, %B %d, %Y",
];

const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
];

fn iso_date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid ISO date pattern"))
}

/// A `YYYY-MM-DD` date string. Ordering is lexical, which for this layout is
/// chronological.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalDate(String);

impl CanonicalDate {
    fn from_parts(year: u32, month: u32, day: u32) -> Self {
        Self(format!("{year:04}-{month:02}-{day:02}"))
    }

    fn from_naive(date: NaiveDate) -> Self {
        Self(date.format("%Y-%m-%d").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The calendar date, when the canonical text names a real day.
    pub fn to_naive(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.0, "%Y-%m-%d").ok()
    }
}

impl fmt::Display for CanonicalDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalDate {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Reading applied to a triple where both leading parts could be a month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    #[default]
    MonthFirst,
    DayFirst,
}

impl FromStr for DateOrder {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "month_first" | "mdy" | "us" => Ok(DateOrder::MonthFirst),
            "day_first" | "dmy" | "eu" => Ok(DateOrder::DayFirst),
            other => Err(anyhow!(
                "Unknown date order '{other}'. Supported orders: month_first, day_first"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateNormalizer {
    order: DateOrder,
}

impl DateNormalizer {
    pub fn new(order: DateOrder) -> Self {
        Self { order }
    }

    pub fn order(&self) -> DateOrder {
        self.order
    }

    /// Normalizes one raw value. Never fails; unreadable input yields `None`.
    pub fn normalize(&self, raw: &str) -> Option<CanonicalDate> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if iso_date_pattern().is_match(trimmed) {
            return Some(CanonicalDate(trimmed.to_string()));
        }
        match split_numeric_triple(trimmed) {
            Some(parts) => self.resolve_triple(parts),
            None => parse_fallback(trimmed),
        }
    }

    /// Like [`normalize`](Self::normalize) but only accepts real calendar days.
    pub fn parse_calendar_date(&self, raw: &str) -> Option<NaiveDate> {
        self.normalize(raw).and_then(|date| date.to_naive())
    }

    fn resolve_triple(&self, [p1, p2, p3]: [u32; 3]) -> Option<CanonicalDate> {
        let (year, month, day) = if p3 > 99 {
            let (month, day) = self.day_month(p1, p2);
            (p3, month, day)
        } else if p1 > 99 {
            (p1, p2, p3)
        } else {
            let (month, day) = self.day_month(p1, p2);
            let year = if p3 > TWO_DIGIT_PIVOT {
                1900 + p3
            } else {
                2000 + p3
            };
            (year, month, day)
        };

        let valid = (1..=12).contains(&month) && (1..=31).contains(&day) && year >= MIN_YEAR;
        valid.then(|| CanonicalDate::from_parts(year, month, day))
    }

    /// Returns `(month, day)` for the two leading parts of a triple.
    fn day_month(&self, p1: u32, p2: u32) -> (u32, u32) {
        if p1 > 12 {
            (p2, p1)
        } else if p2 > 12 {
            (p1, p2)
        } else {
            match self.order {
                DateOrder::MonthFirst => (p1, p2),
                DateOrder::DayFirst => (p2, p1),
            }
        }
    }
}

/// Normalizes with the default month-first reading of ambiguous triples.
pub fn normalize(raw: &str) -> Option<CanonicalDate> {
    DateNormalizer::default().normalize(raw)
}

fn split_numeric_triple(value: &str) -> Option<[u32; 3]> {
    let parts = value.split(['/', '-']).collect::<Vec<_>>();
    let [p1, p2, p3] = parts.as_slice() else {
        return None;
    };
    let parse = |part: &str| {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        part.parse::<u32>().ok()
    };
    Some([parse(*p1)?, parse(*p2)?, parse(*p3)?])
}

fn parse_fallback(value: &str) -> Option<CanonicalDate> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(CanonicalDate::from_naive(parsed.date_naive()));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(CanonicalDate::from_naive(parsed.date_naive()));
    }
    for fmt in FALLBACK_DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(CanonicalDate::from_naive(parsed.date()));
        }
    }
    for fmt in FALLBACK_DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Some(CanonicalDate::from_naive(parsed));
        }
    }
    None
}
