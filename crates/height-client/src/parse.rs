use crate::FetchError;
use serde_json::Value;
use std::{
    fmt,
    str::FromStr,
};

/// Dot separated path into a JSON document, e.g. `result` or `result.number`.
///
/// Numeric segments index into arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPath {
    segments: Vec<String>,
}

impl ResultPath {
    pub fn lookup<'a>(&self, mut value: &'a Value) -> Option<&'a Value> {
        for segment in &self.segments {
            value = match value {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(value)
    }
}

impl FromStr for ResultPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<String> = s.split('.').map(str::to_owned).collect();
        if segments.iter().any(String::is_empty) {
            return Err(format!("invalid result path: {s:?}"));
        }
        Ok(Self { segments })
    }
}

impl fmt::Display for ResultPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// Reads a height out of a JSON number, a `0x` hex string or a decimal string.
pub fn parse_height(value: &Value) -> Result<u64, FetchError> {
    match value {
        Value::Number(number) => {
            number.as_u64().ok_or_else(|| {
                FetchError::Malformed(format!("height is not a non-negative integer: {number}"))
            })
        }
        Value::String(raw) => {
            let raw = raw.trim();
            let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
                Some(hex) => u64::from_str_radix(hex, 16),
                None => raw.parse::<u64>(),
            };
            parsed.map_err(|e| FetchError::Malformed(format!("height {raw:?}: {e}")))
        }
        other => Err(FetchError::Malformed(format!("unexpected height value: {other}"))),
    }
}
