//! Recipe output schema and the sanitiser that maps untrusted model output
//! onto it.
//!
//! The model is asked for a bare JSON object but is not trusted to comply.
//! [`parse_model_json`] tries a strict parse first and then falls back to
//! the trailing `{ ... }` block of the text. [`RecipeSuggestion::from_model_value`]
//! then builds every field explicitly, so the response is always fully
//! formed no matter which keys the model produced.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const INGREDIENTS_MAX_CHARS: usize = 700;
pub const TITLE_MAX_CHARS: usize = 140;
pub const INTRO_MAX_CHARS: usize = 420;
pub const STEP_MAX_CHARS: usize = 220;
pub const NOTE_MAX_CHARS: usize = 260;
pub const MAX_STEPS: usize = 8;
pub const MAX_OPTIONAL: usize = 5;

/// Literal every optional suggestion must start with.
pub const OPTIONAL_PREFIX: &str = "Optional:";

/// First `{` through a `}` that ends the text.
static TRAILING_OBJECT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}$").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeSuggestion {
    pub title: String,
    pub intro: String,
    pub steps: Vec<String>,
    pub optional: Vec<String>,
    pub note: String,
}

impl RecipeSuggestion {
    /// Build a suggestion from whatever the model returned. Missing or
    /// mistyped fields become empty; every string is capped.
    pub fn from_model_value(value: &Value) -> Self {
        let title = sanitize(value.get("title"), TITLE_MAX_CHARS);
        let intro = sanitize(value.get("intro"), INTRO_MAX_CHARS);
        let steps = sequence(value.get("steps"))
            .iter()
            .take(MAX_STEPS)
            .map(|step| sanitize(Some(step), STEP_MAX_CHARS))
            .collect();
        let optional = sequence(value.get("optional"))
            .iter()
            .take(MAX_OPTIONAL)
            .map(|item| optional_entry(&sanitize(Some(item), STEP_MAX_CHARS)))
            .collect();
        let note = sanitize(value.get("note"), NOTE_MAX_CHARS);

        Self {
            title,
            intro,
            steps,
            optional,
            note,
        }
    }
}

/// Stringify `value` and keep at most `max_chars` characters.
///
/// Absent and `null` values become the empty string, strings are taken
/// as-is, and any other JSON value is rendered as compact JSON text. No
/// escaping happens here; the JSON encoder handles quoting on the way out.
pub fn sanitize(value: Option<&Value>, max_chars: usize) -> String {
    let text = match value {
        None | Some(Value::Null) => return String::new(),
        Some(Value::String(s)) => s.as_str(),
        Some(other) => return truncate_chars(&other.to_string(), max_chars),
    };
    truncate_chars(text, max_chars)
}

/// Keep at most `max_chars` Unicode scalar values of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

fn sequence(value: Option<&Value>) -> &[Value] {
    match value {
        Some(Value::Array(items)) => items.as_slice(),
        _ => &[],
    }
}

fn optional_entry(entry: &str) -> String {
    if entry.starts_with(OPTIONAL_PREFIX) {
        return entry.to_string();
    }
    // Cap after prefixing so a second pass is a no-op.
    truncate_chars(&format!("{} {}", OPTIONAL_PREFIX, entry), STEP_MAX_CHARS)
}

/// The model's text could not be read as a JSON object.
#[derive(Debug, thiserror::Error)]
#[error("model did not return JSON")]
pub struct NotJson;

/// Parse trimmed model output as JSON, falling back to the object that
/// closes the text.
///
/// The fallback only recovers an object that ends the text. A reply that
/// puts commentary after the JSON is rejected.
pub fn parse_model_json(text: &str) -> Result<Value, NotJson> {
    let text = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }
    let candidate = TRAILING_OBJECT_RE.find(text).ok_or(NotJson)?;
    serde_json::from_str::<Value>(candidate.as_str()).map_err(|_| NotJson)
}
