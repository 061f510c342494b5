//! Structured-output extraction from free-form completion text.
//!
//! Providers are instructed to answer with JSON only, but completions
//! routinely arrive wrapped in prose or markdown. The extractor takes the
//! first minimal brace-delimited span, parses it, and validates it against
//! the target payload type. One match attempt, no retry: a malformed span is
//! an extraction failure and the caller's fallback tier deals with it.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::ExtractionError;

/// Minimal non-greedy object span. Deliberately does not balance nested
/// braces — the payloads this service asks for are flat.
static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[\s\S]*?\}").expect("object span pattern is valid"));

/// A payload type that can be recovered from completion text.
pub trait Extractable: DeserializeOwned {
    /// Domain validation beyond what serde enforces structurally.
    fn validate(&self) -> Result<(), ExtractionError> {
        Ok(())
    }
}

/// Pull a single structured payload out of raw completion text.
///
/// Fails when no object-shaped substring exists, when the span is not valid
/// JSON, when required fields are absent or out of domain, or when the
/// payload's own validation rejects it.
pub fn extract<T: Extractable>(text: &str) -> Result<T, ExtractionError> {
    let span = JSON_OBJECT
        .find(text)
        .ok_or(ExtractionError::NoJsonObject)?;

    // Two stages so syntax errors and schema violations stay distinguishable.
    let value: serde_json::Value = serde_json::from_str(span.as_str())?;
    let payload: T =
        serde_json::from_value(value).map_err(|e| ExtractionError::SchemaMismatch {
            reason: e.to_string(),
        })?;

    payload.validate()?;
    Ok(payload)
}
