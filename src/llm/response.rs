//! Normalization of model output into structured data.
//!
//! Models often wrap JSON in a markdown code fence. Everything here either
//! yields a complete JSON object or `Error::MalformedResponse`; partial data
//! never leaks out.

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Strip surrounding whitespace and one optional code fence (with or
/// without a language tag such as `json`).
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse model output as a JSON object.
pub fn normalize_json(raw: &str) -> Result<serde_json::Value> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(Error::MalformedResponse("empty response".to_string()));
    }
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| Error::MalformedResponse(format!("invalid JSON: {e}")))?;
    if !value.is_object() {
        return Err(Error::MalformedResponse(
            "expected a JSON object at the top level".to_string(),
        ));
    }
    Ok(value)
}

/// Parse model output into `T`. Shape mismatches are malformed responses too.
pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let value = normalize_json(raw)?;
    serde_json::from_value(value)
        .map_err(|e| Error::MalformedResponse(format!("unexpected JSON shape: {e}")))
}
