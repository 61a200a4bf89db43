//! Schema classifier: turns config rows into typed field descriptors.
//!
//! The schema of a sheet is itself data. Each config row names one field, its
//! display label, a semantic [`FieldType`], and a display/column `order`. This
//! module owns:
//!
//! - [`FieldDescriptor`] and the [`FieldType`] tagged union every consumer
//!   matches on
//! - config column resolution, either by fixed position or by header synonyms
//!   ([`ConfigLayout`])
//! - [`parse_fields()`] and [`classify_by_type()`], plus the [`Schema`]
//!   convenience wrapper bundling both
//!
//! Parsing never fails on row content. Only a header-matched config sheet
//! missing one of the mandatory columns is rejected with
//! [`SchemaError::MalformedSchema`].

use std::{collections::HashSet, fmt, str::FromStr};

use anyhow::anyhow;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    data::{Cell, Row},
    error::SchemaError,
};

/// Order assigned to fields whose `order` cell is blank or unparseable, so
/// they sort after every explicitly ordered field.
pub const UNORDERED: i64 = i64::MAX;

const FIELD_NAME_SYNONYMS: &[&str] = &["fieldname", "field", "name", "campo", "nombrecampo", "key"];
const LABEL_SYNONYMS: &[&str] = &["label", "etiqueta", "display", "title", "titulo", "título"];
const TYPE_SYNONYMS: &[&str] = &["type", "tipo", "datatype"];
const ORDER_SYNONYMS: &[&str] = &["order", "orden", "position", "posicion", "posición"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Date,
    Number,
    Text,
    Period,
    Other,
}

impl FieldType {
    /// Maps a free-form type token onto the enum. Unknown tokens become
    /// [`FieldType::Other`]; this never fails.
    pub fn classify(token: &str) -> Self {
        match token.trim().to_lowercase().as_str() {
            "date" | "fecha" => FieldType::Date,
            "number" | "numero" | "número" | "numeric" => FieldType::Number,
            "text" | "texto" | "string" => FieldType::Text,
            "period" | "periodo" | "período" => FieldType::Period,
            _ => FieldType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Date => "date",
            FieldType::Number => "number",
            FieldType::Text => "text",
            FieldType::Period => "period",
            FieldType::Other => "other",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub field_name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub order: i64,
}

impl FieldDescriptor {
    pub fn new(field_name: &str, label: &str, field_type: FieldType, order: i64) -> Self {
        Self {
            field_name: field_name.to_string(),
            label: label.to_string(),
            field_type,
            order,
        }
    }

    pub fn has_order(&self) -> bool {
        self.order != UNORDERED
    }

    /// Zero-based data column implied by a 1-based `order`, if any.
    pub fn column_index(&self) -> Option<usize> {
        if !self.has_order() || self.order < 1 {
            return None;
        }
        usize::try_from(self.order - 1).ok()
    }
}

/// How the columns of the config sheet are located.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigLayout {
    /// Header row is matched against known synonyms for each attribute.
    #[default]
    Headers,
    /// Columns are fieldName, label, type, order in that order.
    Fixed,
}

impl FromStr for ConfigLayout {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "headers" | "header" => Ok(ConfigLayout::Headers),
            "fixed" | "index" => Ok(ConfigLayout::Fixed),
            other => Err(anyhow!(
                "Unknown config layout '{other}'. Supported layouts: headers, fixed"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ConfigColumns {
    field_name: usize,
    label: usize,
    field_type: usize,
    order: Option<usize>,
}

impl ConfigColumns {
    fn fixed() -> Self {
        Self {
            field_name: 0,
            label: 1,
            field_type: 2,
            order: Some(3),
        }
    }

    fn from_header(header: &[Cell]) -> Result<Self, SchemaError> {
        let normalized = header
            .iter()
            .map(|cell| normalize_header_token(&cell.as_text()))
            .collect::<Vec<_>>();
        let find = |synonyms: &[&str]| {
            normalized
                .iter()
                .position(|token| synonyms.contains(&token.as_str()))
        };

        let field_name = find(FIELD_NAME_SYNONYMS);
        let label = find(LABEL_SYNONYMS);
        let field_type = find(TYPE_SYNONYMS);
        let order = find(ORDER_SYNONYMS);

        match (field_name, label, field_type) {
            (Some(field_name), Some(label), Some(field_type)) => Ok(Self {
                field_name,
                label,
                field_type,
                order,
            }),
            _ => {
                let missing = [
                    ("fieldName", field_name),
                    ("label", label),
                    ("type", field_type),
                ]
                .into_iter()
                .filter(|(_, idx)| idx.is_none())
                .map(|(name, _)| name)
                .collect::<Vec<_>>();
                let headers = header
                    .iter()
                    .map(|cell| cell.as_text().into_owned())
                    .collect::<Vec<_>>();
                warn!("Config header is missing {missing:?}: {headers:?}");
                Err(SchemaError::MalformedSchema { missing, headers })
            }
        }
    }
}

fn normalize_header_token(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|ch| !matches!(ch, '_' | ' ' | '-'))
        .collect::<String>()
        .to_lowercase()
}

fn cell_text(row: &[Cell], idx: usize) -> String {
    row.get(idx)
        .map(|cell| cell.as_text().trim().to_string())
        .unwrap_or_default()
}

fn parse_order(value: &str) -> i64 {
    let trimmed = value.trim();
    if let Ok(parsed) = trimmed.parse::<i64>() {
        return parsed;
    }
    match trimmed.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() && parsed.fract() == 0.0 => parsed as i64,
        _ => UNORDERED,
    }
}

/// Parses config rows (header first) into descriptors sorted by `order`.
///
/// Rows without a field name are skipped, unknown types become
/// [`FieldType::Other`], and unparseable orders sort last in their original
/// row order. A repeated field name keeps its first occurrence.
pub fn parse_fields(rows: &[Row], layout: ConfigLayout) -> Result<Vec<FieldDescriptor>, SchemaError> {
    let columns = match layout {
        ConfigLayout::Fixed => ConfigColumns::fixed(),
        ConfigLayout::Headers => {
            let header = rows.first().map(Vec::as_slice).unwrap_or_default();
            ConfigColumns::from_header(header)?
        }
    };

    let mut seen = HashSet::new();
    let mut fields = Vec::new();
    for (row_idx, row) in rows.iter().enumerate().skip(1) {
        let field_name = cell_text(row, columns.field_name);
        if field_name.is_empty() {
            debug!("Skipping config row {} without a field name", row_idx + 1);
            continue;
        }
        if !seen.insert(field_name.clone()) {
            warn!(
                "Config row {} repeats field '{field_name}'; keeping the first definition",
                row_idx + 1
            );
            continue;
        }
        let label = match cell_text(row, columns.label) {
            label if label.is_empty() => field_name.clone(),
            label => label,
        };
        let field_type = FieldType::classify(&cell_text(row, columns.field_type));
        let order = columns
            .order
            .map(|idx| parse_order(&cell_text(row, idx)))
            .unwrap_or(UNORDERED);
        fields.push(FieldDescriptor {
            field_name,
            label,
            field_type,
            order,
        });
    }

    fields.sort_by_key(|field| field.order);
    debug!("Parsed {} field(s) from {} config row(s)", fields.len(), rows.len());
    Ok(fields)
}

/// Fields partitioned by semantic type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldGroups {
    pub date_fields: Vec<FieldDescriptor>,
    pub number_fields: Vec<FieldDescriptor>,
    pub text_fields: Vec<FieldDescriptor>,
    /// Only the first period-typed field is used.
    pub period_field: Option<FieldDescriptor>,
    pub other_fields: Vec<FieldDescriptor>,
}

pub fn classify_by_type(fields: &[FieldDescriptor]) -> FieldGroups {
    let mut groups = FieldGroups::default();
    for field in fields {
        match field.field_type {
            FieldType::Date => groups.date_fields.push(field.clone()),
            FieldType::Number => groups.number_fields.push(field.clone()),
            FieldType::Text => groups.text_fields.push(field.clone()),
            FieldType::Period => {
                if groups.period_field.is_none() {
                    groups.period_field = Some(field.clone());
                } else {
                    debug!(
                        "Ignoring additional period field '{}'",
                        field.field_name
                    );
                }
            }
            FieldType::Other => groups.other_fields.push(field.clone()),
        }
    }
    groups
}

/// Parsed, ordered field list for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
}

impl Schema {
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        Self { fields }
    }

    pub fn from_rows(rows: &[Row], layout: ConfigLayout) -> Result<Self, SchemaError> {
        parse_fields(rows, layout).map(Self::new)
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Looks a field up by exact name, falling back to a case-insensitive match.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        let name = name.trim();
        self.fields
            .iter()
            .find(|field| field.field_name == name)
            .or_else(|| {
                self.fields
                    .iter()
                    .find(|field| field.field_name.eq_ignore_ascii_case(name))
            })
    }

    pub fn groups(&self) -> FieldGroups {
        classify_by_type(&self.fields)
    }

    pub fn into_fields(self) -> Vec<FieldDescriptor> {
        self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::text_row;

    fn rows(values: &[&[&str]]) -> Vec<Row> {
        values.iter().map(|row| text_row(row.iter())).collect()
    }

    #[test]
    fn classify_falls_back_to_other() {
        assert_eq!(FieldType::classify(" DATE "), FieldType::Date);
        assert_eq!(FieldType::classify("Número"), FieldType::Number);
        assert_eq!(FieldType::classify("periodo"), FieldType::Period);
        assert_eq!(FieldType::classify("currency"), FieldType::Other);
        assert_eq!(FieldType::classify(""), FieldType::Other);
    }

    #[test]
    fn header_synonyms_resolve_reordered_columns() {
        let config = rows(&[
            &["Orden", "Tipo", "Etiqueta", "Field_Name"],
            &["2", "date", "Fecha", "d"],
            &["1", "number", "Ventas", "sales"],
        ]);
        let fields = parse_fields(&config, ConfigLayout::Headers).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].field_name, "sales");
        assert_eq!(fields[0].label, "Ventas");
        assert_eq!(fields[1].field_type, FieldType::Date);
    }

    #[test]
    fn missing_mandatory_columns_is_malformed() {
        let config = rows(&[&["field", "order"], &["sales", "1"]]);
        let err = parse_fields(&config, ConfigLayout::Headers).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MalformedSchema {
                missing: vec!["label", "type"],
                headers: vec!["field".to_string(), "order".to_string()],
            }
        );
    }

    #[test]
    fn unordered_fields_sort_last_and_stay_stable() {
        let config = rows(&[
            &["field", "label", "type", "order"],
            &["b", "B", "text", ""],
            &["a", "A", "text", "x"],
            &["c", "C", "number", "5"],
        ]);
        let fields = parse_fields(&config, ConfigLayout::Fixed).unwrap();
        let names = fields.iter().map(|f| f.field_name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["c", "b", "a"]);
        assert!(!fields[1].has_order());
        assert_eq!(fields[1].column_index(), None);
    }

    #[test]
    fn blank_and_duplicate_field_names_are_dropped() {
        let config = rows(&[
            &["field", "label", "type", "order"],
            &["", "Ghost", "text", "1"],
            &["amt", "Amount", "number", "2"],
            &["amt", "Amount again", "text", "3"],
        ]);
        let fields = parse_fields(&config, ConfigLayout::Headers).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].label, "Amount");
    }

    #[test]
    fn order_accepts_numeric_cells() {
        let config = vec![
            text_row(["field", "label", "type", "order"]),
            vec![
                Cell::from("amt"),
                Cell::from("Amount"),
                Cell::from("number"),
                Cell::Number(3.0),
            ],
        ];
        let fields = parse_fields(&config, ConfigLayout::Headers).unwrap();
        assert_eq!(fields[0].order, 3);
        assert_eq!(fields[0].column_index(), Some(2));
    }

    #[test]
    fn only_first_period_field_is_kept() {
        let fields = vec![
            FieldDescriptor::new("p1", "P1", FieldType::Period, 1),
            FieldDescriptor::new("p2", "P2", FieldType::Period, 2),
            FieldDescriptor::new("x", "X", FieldType::Other, 3),
        ];
        let groups = classify_by_type(&fields);
        assert_eq!(groups.period_field.map(|f| f.field_name), Some("p1".to_string()));
        assert_eq!(groups.other_fields.len(), 1);
        assert!(groups.date_fields.is_empty());
    }

    #[test]
    fn empty_config_with_fixed_layout_yields_no_fields() {
        let schema = Schema::from_rows(&[], ConfigLayout::Fixed).unwrap();
        assert!(schema.is_empty());
        assert!(Schema::from_rows(&[], ConfigLayout::Headers).is_err());
    }

    #[test]
    fn field_lookup_is_case_tolerant() {
        let schema = Schema::new(vec![FieldDescriptor::new("Sales", "Sales", FieldType::Number, 1)]);
        assert!(schema.field("sales").is_some());
        assert!(schema.field("revenue").is_none());
    }
}
