//! Recursive snake_case ⇄ camelCase key mapping for JSON values.
//!
//! The wire format is snake_case; everything in memory is camelCase. Known
//! fields get `#[serde(rename_all = "camelCase")]`, but entity `data`
//! payloads carry arbitrary AI-generated keys, so the whole tree is walked
//! at the fetch boundary instead.

use serde_json::{Map, Value};

/// Convert a snake_case key to camelCase. Characters after each underscore
/// are uppercased; the underscore is dropped. Leading underscores and
/// digits pass through unchanged.
pub fn camelize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for (i, ch) in key.chars().enumerate() {
        if ch == '_' && i > 0 {
            upper_next = true;
            continue;
        }
        if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    // Trailing underscore has nothing to uppercase; keep it.
    if upper_next {
        out.push('_');
    }
    out
}

/// Convert a camelCase key to snake_case. Each uppercase ASCII letter is
/// replaced by an underscore plus its lowercase form.
pub fn snakify_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Recursively rename every object key in `value` to camelCase.
/// Arrays map element-wise, scalars (including null) pass through, and the
/// input is never mutated.
pub fn keys_to_camel(value: &Value) -> Value {
    transform_keys(value, &camelize_key)
}

/// Recursively rename every object key in `value` to snake_case.
pub fn keys_to_snake(value: &Value) -> Value {
    transform_keys(value, &snakify_key)
}

fn transform_keys(value: &Value, rename: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, inner) in map {
                out.insert(rename(key), transform_keys(inner, rename));
            }
            Value::Object(out)
        }
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| transform_keys(v, rename)).collect())
        }
        other => other.clone(),
    }
}
