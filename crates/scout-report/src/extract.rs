//! Tolerant extraction of reports from raw completion text.
//!
//! Generators wrap their payload in commentary, code fences or greetings even
//! when told not to. Templated output is located by its section delimiter;
//! structured output by scanning for the first balanced `{ ... }` span that
//! parses as a JSON object.

use serde_json::Value;
use thiserror::Error;

use crate::contract::{ExtractionContract, ListCaps, OutputShape};
use crate::report::Report;

/// Line separating report sections in templated output and rendered markdown.
pub const SECTION_DELIMITER: &str = "----------";

#[derive(Debug, Error, PartialEq, Eq)]
/// The completion text did not contain an extractable report.
pub enum ExtractError {
    #[error("completion text was empty")]
    Empty,
    #[error("completion did not contain a JSON object")]
    NoJsonObject,
    #[error("completion contained an unterminated JSON object")]
    Unbalanced,
    #[error("embedded JSON object did not parse: {0}")]
    InvalidJson(String),
    #[error("embedded JSON payload was not an object")]
    NotAnObject,
    #[error("field `{field}` {reason}")]
    InvalidField { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedReport {
    /// Templated markdown taken verbatim from the completion.
    Text(String),
    Structured(Report),
}

impl ExtractedReport {
    pub fn as_structured(&self) -> Option<&Report> {
        match self {
            Self::Structured(report) => Some(report),
            Self::Text(_) => None,
        }
    }
}

/// Extracts a report using the output shape promised by `contract`.
pub fn extract_report(
    raw: &str,
    contract: &ExtractionContract,
) -> Result<ExtractedReport, ExtractError> {
    match contract.shape() {
        OutputShape::Templated => extract_templated(raw).map(ExtractedReport::Text),
        OutputShape::Json => extract_structured(raw, contract.caps()).map(ExtractedReport::Structured),
    }
}

/// Returns everything from the first section delimiter onwards.
///
/// Text without any delimiter is returned unchanged.
pub fn extract_templated(raw: &str) -> Result<String, ExtractError> {
    if raw.trim().is_empty() {
        return Err(ExtractError::Empty);
    }
    match raw.find(SECTION_DELIMITER) {
        Some(start) => Ok(raw[start..].trim().to_string()),
        None => Ok(raw.to_string()),
    }
}

pub fn extract_structured(raw: &str, caps: &ListCaps) -> Result<Report, ExtractError> {
    let payload = extract_json_payload(raw)?;
    Report::from_value(&payload, caps)
}

/// Finds the first balanced `{ ... }` span in `raw` that parses as a JSON
/// object.
///
/// Balanced spans that fail to parse (prose such as `{placeholder}`) are
/// skipped as a whole, so objects nested inside a rejected span are never
/// picked up. An opening brace that is never closed ends the scan.
pub fn extract_json_payload(raw: &str) -> Result<Value, ExtractError> {
    if raw.trim().is_empty() {
        return Err(ExtractError::Empty);
    }

    let mut cursor = 0usize;
    let mut last_parse_error = None;
    while let Some(relative) = raw[cursor..].find('{') {
        let start = cursor + relative;
        let Some(end) = balanced_object_end(raw, start) else {
            return Err(ExtractError::Unbalanced);
        };

        match serde_json::from_str::<Value>(&raw[start..=end]) {
            Ok(value) if value.is_object() => return Ok(value),
            Ok(_) => {}
            Err(error) => last_parse_error = Some(error.to_string()),
        }
        cursor = end + 1;
    }

    match last_parse_error {
        Some(error) => Err(ExtractError::InvalidJson(error)),
        None => Err(ExtractError::NoJsonObject),
    }
}

// Byte index of the `}` closing the object opened at `start`, honouring JSON
// string literals and escapes.
fn balanced_object_end(raw: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}
