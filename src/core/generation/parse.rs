//! Best-effort recovery of JSON from model output.
//!
//! Models wrap JSON in markdown fences, add a sentence before or after it,
//! leave trailing commas, or emit raw newlines inside strings. Each pass
//! below handles one of those; the first pass that yields valid JSON wins.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("model returned an empty response")]
    Empty,
    #[error("no JSON value found in model response: {0}")]
    NoJson(String),
    #[error("model response is not valid JSON: {0}")]
    Invalid(String),
}

static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[a-zA-Z0-9_-]*[ \t]*\r?\n?(.*?)```").expect("fence regex")
});
static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([}\]])").expect("trailing comma regex"));

/// Parse a model response into JSON, trying progressively looser repairs.
pub fn parse_model_json(raw: &str) -> Result<Value, ParseError> {
    let unfenced = strip_code_fences(raw);
    let trimmed = unfenced.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let candidate = trim_to_json_bounds(trimmed);

    // Pass 1: as-is
    let first_err = match serde_json::from_str::<Value>(candidate) {
        Ok(v) => return Ok(v),
        Err(e) => e,
    };

    // Pass 2: drop trailing commas and raw control whitespace
    let cleaned = clean_json_text(candidate);
    if let Ok(v) = serde_json::from_str::<Value>(&cleaned) {
        return Ok(v);
    }

    // Pass 3: first balanced object/array anywhere in the text
    if let Some(block) = first_balanced_block(trimmed) {
        if let Ok(v) = serde_json::from_str::<Value>(block) {
            return Ok(v);
        }
        if let Ok(v) = serde_json::from_str::<Value>(&clean_json_text(block)) {
            return Ok(v);
        }
        return Err(ParseError::Invalid(first_err.to_string()));
    }

    if candidate.starts_with('{') || candidate.starts_with('[') {
        Err(ParseError::Invalid(first_err.to_string()))
    } else {
        Err(ParseError::NoJson(preview(trimmed)))
    }
}

/// Remove markdown code fences. If the text contains a fenced block, its
/// contents are returned; otherwise stray fence markers are dropped.
pub fn strip_code_fences(raw: &str) -> String {
    if let Some(cap) = FENCE.captures(raw)
        && let Some(inner) = cap.get(1)
    {
        return inner.as_str().to_string();
    }
    raw.replace("```json", "").replace("```", "")
}

/// Cut leading prose before the first `{`/`[` and trailing prose after the
/// last `}`/`]`.
fn trim_to_json_bounds(text: &str) -> &str {
    let start = text.find(['{', '[']);
    let end = text.rfind(['}', ']']);
    match (start, end) {
        (Some(s), Some(e)) if e >= s => &text[s..=e],
        _ => text,
    }
}

fn clean_json_text(text: &str) -> String {
    let flattened: String = text
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            other => other,
        })
        .collect();
    TRAILING_COMMA.replace_all(&flattened, "$1").into_owned()
}

/// Find the first balanced `{...}` or `[...]`, honouring string literals and
/// escapes.
pub fn first_balanced_block(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escape_next = false;

    for (offset, ch) in text[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        if in_string {
            match ch {
                '\\' => escape_next = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(ch) {
                    return None;
                }
                if stack.is_empty() {
                    let end = start + offset + ch.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }
    None
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(80).collect();
    if text.chars().count() > 80 {
        out.push('…');
    }
    out
}
