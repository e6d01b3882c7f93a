//! Tolerant extraction of a metadata JSON object from free-form model text.
//!
//! Models reliably produce *near*-valid JSON: wrapped in prose or code
//! fences, with trailing commas or unquoted property names. A single rigid
//! parse would discard recoverable results, so extraction is two-pass:
//! strict first, then a fixed repair sequence and one retry. Total failure
//! yields an all-defaults suggestion and a warning, never an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use scriba_core::MetadataSuggestion;

/// Trailing commas before a closing brace or bracket.
static TRAILING_COMMA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([}\]])").expect("valid regex"));

/// Property names missing quotes (also normalizes single-quoted names).
static BARE_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(['"])?([A-Za-z0-9_]+)(['"])?\s*:"#).expect("valid regex"));

/// Best-effort parse of model output into a [`MetadataSuggestion`].
///
/// Algorithm, first success wins:
/// 1. strip code-fence markers, take the first `{` through the last `}`
/// 2. strict JSON parse
/// 3. apply textual repairs (trailing commas, bare keys) and parse once more
/// 4. give up: return defaults
pub fn extract_suggestion(raw: &str) -> MetadataSuggestion {
    let stripped = raw.replace("```json", "").replace("```", "");

    let Some(candidate) = json_candidate(&stripped) else {
        warn!(
            response_len = raw.len(),
            "No JSON object found in model response"
        );
        return MetadataSuggestion::default();
    };

    match serde_json::from_str::<Value>(candidate) {
        Ok(value) => suggestion_from_value(&value),
        Err(first_err) => {
            debug!(error = %first_err, "Strict parse failed, attempting repair");
            let repaired = repair(candidate);
            match serde_json::from_str::<Value>(&repaired) {
                Ok(value) => suggestion_from_value(&value),
                Err(second_err) => {
                    warn!(
                        error = %second_err,
                        "Model response unparseable after repair, using empty defaults"
                    );
                    MetadataSuggestion::default()
                }
            }
        }
    }
}

/// Substring from the first `{` through the last `}`.
fn json_candidate(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end >= start).then(|| &text[start..=end])
}

/// Fixed repair sequence for near-valid JSON.
fn repair(candidate: &str) -> String {
    let without_commas = TRAILING_COMMA_RE.replace_all(candidate, "$1");
    BARE_KEY_RE.replace_all(&without_commas, "\"$2\":").into_owned()
}

fn suggestion_from_value(value: &Value) -> MetadataSuggestion {
    MetadataSuggestion {
        title: string_field(value, "title"),
        correspondent: string_field(value, "correspondent"),
        tags: value
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        document_type: string_field(value, "document_type"),
        document_date: string_field(value, "document_date"),
        language: string_field(value, "language"),
    }
}

/// A string field, with empty strings and non-strings treated as absent.
fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
