//! Local retrieval adapter: loads config and data row matrices from disk.
//!
//! The engine itself only consumes in-memory row matrices. This module
//! produces them from files exported by a spreadsheet store:
//!
//! - **CSV/TSV**: delimiter chosen by extension (`.tsv` → tab) unless
//!   overridden; ragged rows are accepted as-is; bytes are decoded with
//!   `encoding_rs`, defaulting to UTF-8.
//! - **JSON**: an array of arrays of strings, numbers, booleans, or nulls,
//!   which is the `values` shape spreadsheet APIs return.
//! - **stdin**: the `-` path reads CSV from standard input.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::data::{Cell, Row};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if is_dash(path) {
        Ok(Box::new(std::io::stdin().lock()))
    } else {
        Ok(Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        )))
    }
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Row> {
    record
        .iter()
        .map(|field| {
            let text = decode_bytes(field, encoding)?;
            Ok(if text.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(text)
            })
        })
        .collect()
}

/// Reads every CSV row, header included, as text cells.
pub fn read_csv_rows<R: Read>(
    reader: R,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<Vec<Row>> {
    let mut reader = open_csv_reader(reader, delimiter);
    let mut rows = Vec::new();
    for (idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", idx + 1))?;
        let decoded =
            decode_record(&record, encoding).with_context(|| format!("Decoding row {}", idx + 1))?;
        rows.push(decoded);
    }
    Ok(rows)
}

/// Reads a JSON array of row arrays.
pub fn read_json_rows<R: Read>(reader: R) -> Result<Vec<Row>> {
    serde_json::from_reader(reader).context("Parsing JSON row matrix")
}

/// Loads a row matrix from `path`, dispatching on the file extension.
pub fn read_rows(path: &Path, delimiter: Option<u8>, encoding: &'static Encoding) -> Result<Vec<Row>> {
    let input = open_input(path)?;
    let rows = if is_json(path) {
        read_json_rows(input).with_context(|| format!("Reading {path:?}"))?
    } else {
        let delimiter = resolve_input_delimiter(path, delimiter);
        read_csv_rows(input, delimiter, encoding).with_context(|| format!("Reading {path:?}"))?
    };
    debug!("Loaded {} row(s) from {:?}", rows.len(), path);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::WINDOWS_1252;

    #[test]
    fn csv_rows_may_be_ragged() {
        let input = "a,b,c\n1,2\n3,,5,6\n";
        let rows = read_csv_rows(input.as_bytes(), b',', UTF_8).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].len(), 2);
        assert_eq!(rows[2][1], Cell::Empty);
        assert_eq!(rows[2][3], Cell::Text("6".into()));
    }

    #[test]
    fn decodes_legacy_encodings() {
        let bytes = b"caf\xe9;1\n";
        let rows = read_csv_rows(&bytes[..], b';', WINDOWS_1252).unwrap();
        assert_eq!(rows[0][0], Cell::Text("café".into()));
    }

    #[test]
    fn json_rows_keep_primitive_types() {
        let rows = read_json_rows(r#"[["a","b"],[1,null]]"#.as_bytes()).unwrap();
        assert_eq!(rows[1], vec![Cell::Number(1.0), Cell::Empty]);
    }

    #[test]
    fn delimiter_follows_extension() {
        assert_eq!(resolve_input_delimiter(Path::new("x.tsv"), None), b'\t');
        assert_eq!(resolve_input_delimiter(Path::new("x.csv"), None), b',');
        assert_eq!(resolve_input_delimiter(Path::new("x.tsv"), Some(b'|')), b'|');
        assert!(resolve_encoding(Some("klingon")).is_err());
    }
}
