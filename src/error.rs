use thiserror::Error;

/// Failures surfaced to callers. Everything else degrades into the shape of
/// the output (fewer records, zero counts, empty groups).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error(
        "Config rows are missing required column(s) {}; found headers [{}]",
        .missing.join(", "),
        .headers.join(", ")
    )]
    MalformedSchema {
        missing: Vec<&'static str>,
        headers: Vec<String>,
    },
}
