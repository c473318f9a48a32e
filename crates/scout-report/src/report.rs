//! Structured research report with a fixed schema.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::contract::ListCaps;
use crate::extract::ExtractError;

/// Marker for a field the generator could not establish.
pub const SENTINEL: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternative {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// A research report about one tool. Scalars hold [`SENTINEL`] when unknown,
/// lists are empty when unknown, the percentage is `0.0` when unknown.
pub struct Report {
    pub name: String,
    pub official_url: String,
    pub short_description: String,
    pub categories: Vec<String>,
    pub target_audience: Vec<String>,
    pub key_features: Vec<String>,
    pub pricing: String,
    pub alternatives: Vec<Alternative>,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub web_match_percentage: f64,
    pub methodology: String,
}

impl Default for Report {
    fn default() -> Self {
        Self {
            name: SENTINEL.to_string(),
            official_url: SENTINEL.to_string(),
            short_description: SENTINEL.to_string(),
            categories: Vec::new(),
            target_audience: Vec::new(),
            key_features: Vec::new(),
            pricing: SENTINEL.to_string(),
            alternatives: Vec::new(),
            pros: Vec::new(),
            cons: Vec::new(),
            web_match_percentage: 0.0,
            methodology: SENTINEL.to_string(),
        }
    }
}

impl Report {
    /// Builds a report from a parsed JSON object.
    ///
    /// Missing keys take their defaults, unknown keys are dropped, and a known
    /// key holding the wrong JSON type is rejected.
    pub fn from_value(value: &Value, caps: &ListCaps) -> Result<Self, ExtractError> {
        let Value::Object(map) = value else {
            return Err(ExtractError::NotAnObject);
        };

        Ok(Self {
            name: read_scalar(map, "name")?,
            official_url: read_scalar(map, "official_url")?,
            short_description: read_scalar(map, "short_description")?,
            categories: read_list(map, "categories", caps.categories)?,
            target_audience: read_list(map, "target_audience", caps.target_audience)?,
            key_features: read_list(map, "key_features", caps.key_features)?,
            pricing: read_scalar(map, "pricing")?,
            alternatives: read_alternatives(map, "alternatives", caps.alternatives)?,
            pros: read_list(map, "pros", caps.pros)?,
            cons: read_list(map, "cons", caps.cons)?,
            web_match_percentage: read_percentage(map, "web_match_percentage")?,
            methodology: read_scalar(map, "methodology")?,
        })
    }

    pub fn has_official_url(&self) -> bool {
        !is_sentinel(&self.official_url)
    }
}

pub fn is_sentinel(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(SENTINEL)
}

fn normalize_text(value: &str) -> String {
    if is_sentinel(value) {
        SENTINEL.to_string()
    } else {
        value.trim().to_string()
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ExtractError {
    ExtractError::InvalidField {
        field,
        reason: reason.into(),
    }
}

fn read_scalar(map: &Map<String, Value>, field: &'static str) -> Result<String, ExtractError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(SENTINEL.to_string()),
        Some(Value::String(text)) => Ok(normalize_text(text)),
        Some(Value::Number(number)) => Ok(number.to_string()),
        Some(other) => Err(invalid(
            field,
            format!("expected a string, found {}", json_type_name(other)),
        )),
    }
}

fn read_list(
    map: &Map<String, Value>,
    field: &'static str,
    cap: usize,
) -> Result<Vec<String>, ExtractError> {
    let items = match map.get(field) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::String(text)) if is_sentinel(text) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(invalid(
                field,
                format!("expected a list of strings, found {}", json_type_name(other)),
            ))
        }
    };

    let mut values = Vec::with_capacity(items.len().min(cap));
    for item in items {
        let Value::String(text) = item else {
            return Err(invalid(
                field,
                format!("expected string items, found {}", json_type_name(item)),
            ));
        };
        if is_sentinel(text) {
            continue;
        }
        if values.len() < cap {
            values.push(text.trim().to_string());
        }
    }
    Ok(values)
}

fn read_alternatives(
    map: &Map<String, Value>,
    field: &'static str,
    cap: usize,
) -> Result<Vec<Alternative>, ExtractError> {
    let items = match map.get(field) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::String(text)) if is_sentinel(text) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(invalid(
                field,
                format!(
                    "expected a list of {{name, url}} objects, found {}",
                    json_type_name(other)
                ),
            ))
        }
    };

    let mut alternatives = Vec::new();
    for item in items {
        let Value::Object(entry) = item else {
            return Err(invalid(
                field,
                format!("expected object items, found {}", json_type_name(item)),
            ));
        };
        let name = read_scalar(entry, "name").map_err(|_| invalid(field, "name must be a string"))?;
        if is_sentinel(&name) {
            continue;
        }
        let url = read_scalar(entry, "url").map_err(|_| invalid(field, "url must be a string"))?;
        if alternatives.len() < cap {
            alternatives.push(Alternative { name, url });
        }
    }
    Ok(alternatives)
}

fn read_percentage(map: &Map<String, Value>, field: &'static str) -> Result<f64, ExtractError> {
    let parsed = match map.get(field) {
        None | Some(Value::Null) => return Ok(0.0),
        Some(Value::Number(number)) => number
            .as_f64()
            .ok_or_else(|| invalid(field, "number is out of range"))?,
        Some(Value::String(text)) => {
            if is_sentinel(text) {
                return Ok(0.0);
            }
            let cleaned = text.trim().trim_end_matches('%').trim();
            cleaned
                .parse::<f64>()
                .map_err(|_| invalid(field, format!("'{text}' is not a number")))?
        }
        Some(other) => {
            return Err(invalid(
                field,
                format!("expected a number, found {}", json_type_name(other)),
            ))
        }
    };

    if !parsed.is_finite() {
        return Err(invalid(field, "number must be finite"));
    }
    Ok(parsed.clamp(0.0, 100.0))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
