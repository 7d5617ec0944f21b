//! Pull a structured tool call out of free-form model output.
//!
//! The model is taught to answer with a JSON object of the form
//! `{"tool": "<name>", "parameters": {...}}`, ideally inside a fenced code
//! block. [`parse`] looks for, in order:
//!
//! 1. the first fenced block tagged `json` or untagged. When one exists it is
//!    the only candidate, so a malformed block yields `None`;
//! 2. otherwise the first balanced `{...}` in the prose that mentions a
//!    `"tool"` key and parses as a call, trying every opening brace.
//!
//! Anything else is a plain answer and yields `None`.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::{ParamValue, ToolCall};

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```([A-Za-z0-9_-]*)[ \t]*\r?\n(.*?)```").expect("valid fence regex")
});

/// Largest float that still converts to an exact integer.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

pub fn parse(output: &str) -> Option<ToolCall> {
    if let Some(block) = fenced_candidate(output) {
        let call = parse_candidate(block);
        if call.is_none() {
            tracing::debug!("fenced block present but not a valid tool call");
        }
        return call;
    }

    tool_objects(output).find_map(parse_candidate)
}

fn fenced_candidate(output: &str) -> Option<&str> {
    FENCED_BLOCK.captures_iter(output).find_map(|caps| {
        let tag = caps.get(1).map_or("", |m| m.as_str());
        if tag.is_empty() || tag.eq_ignore_ascii_case("json") {
            caps.get(2).map(|m| m.as_str().trim())
        } else {
            None
        }
    })
}

fn parse_candidate(candidate: &str) -> Option<ToolCall> {
    let value: Value = serde_json::from_str(candidate).ok()?;
    let object = value.as_object()?;

    let name = object.get("tool")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    let raw_params = object.get("parameters")?.as_object()?;

    let parameters: BTreeMap<String, ParamValue> = raw_params
        .iter()
        .filter_map(|(key, value)| to_param(value).map(|v| (key.clone(), v)))
        .collect();

    Some(ToolCall {
        name: name.to_string(),
        parameters,
    })
}

fn to_param(value: &Value) -> Option<ParamValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(ParamValue::Bool(*b)),
        Value::String(s) => Some(ParamValue::Text(s.clone())),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(ParamValue::Integer(i))
            } else {
                let f = n.as_f64()?;
                if f.fract() == 0.0 && f.abs() <= MAX_EXACT_INTEGER {
                    Some(ParamValue::Integer(f as i64))
                } else {
                    Some(ParamValue::Float(f))
                }
            }
        }
        nested => Some(ParamValue::Nested(nested.clone())),
    }
}

/// Balanced `{...}` spans that mention a `"tool"` key, one per opening brace
/// in text order. Each brace is tried on its own, so an unmatched `{` in prose
/// or a wrapper object around the call does not hide it.
fn tool_objects(text: &str) -> impl Iterator<Item = &str> {
    let last_key = text.rfind("\"tool\"").unwrap_or(0);
    text.match_indices('{')
        .map(|(i, _)| i)
        .take_while(move |&i| i < last_key)
        .filter_map(move |i| object_at(text, i))
        .filter(|candidate| candidate.contains("\"tool\""))
}

/// The balanced object opening at byte `start`, skipping braces inside JSON
/// string literals. `None` when it never closes.
fn object_at(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            match (escaped, c) {
                (true, _) => escaped = false,
                (false, '\\') => escaped = true,
                (false, '"') => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + i]);
                }
            }
            '"' => in_string = true,
            _ => {}
        }
    }
    None
}
