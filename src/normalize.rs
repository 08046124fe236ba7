use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn punctuation() -> &'static Regex {
    static PUNCT: OnceLock<Regex> = OnceLock::new();
    PUNCT.get_or_init(|| {
        Regex::new(r"[.,/#!$%^&*;:{}=\-_`~()]").expect("punctuation pattern is valid")
    })
}

fn whitespace() -> &'static Regex {
    static WS: OnceLock<Regex> = OnceLock::new();
    WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

/// Flattens a field value into one searchable, normalized string.
///
/// Leaf strings are joined depth-first with single spaces, then the result is
/// lowercased, punctuation becomes whitespace and whitespace runs collapse.
/// `null` yields an empty string; numbers and booleans are stringified.
pub fn normalize_value(value: &Value) -> String {
    let mut leaves = Vec::new();
    collect_leaves(value, &mut leaves);
    normalize_text(&leaves.join(" "))
}

pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let spaced = punctuation().replace_all(&lowered, " ");
    whitespace().replace_all(&spaced, " ").trim().to_string()
}

pub fn tokenize(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}

fn collect_leaves(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|item| collect_leaves(item, out)),
        // Insertion order (`preserve_order`).
        Value::Object(map) => map.values().for_each(|item| collect_leaves(item, out)),
        other => out.push(other.to_string()),
    }
}
