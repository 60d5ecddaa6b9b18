//! Deterministic payload truncation
//!
//! Size is the length of the compact JSON encoding. Oversized payloads are cut
//! in a fixed order so the same input and limit always give the same prefix:
//!
//! - arrays keep their longest fitting prefix
//! - objects shrink array fields (largest first, ties by key), then nested
//!   objects the same way, then string fields (longest first); trailing keys
//!   are dropped only when nothing is left to shrink
//! - strings are cut on a char boundary

use serde::Serialize;
use serde_json::{Map, Value};

/// Compact JSON length in bytes
pub fn encoded_len<T: Serialize + ?Sized>(value: &T) -> usize {
    serde_json::to_string(value).map(|s| s.len()).unwrap_or(0)
}

/// Bound a payload to `max_bytes`; the flag is true when anything was cut
pub fn shape(payload: Value, max_bytes: usize) -> (Value, bool) {
    if encoded_len(&payload) <= max_bytes {
        return (payload, false);
    }

    let shaped = match payload {
        Value::Array(mut items) => {
            fit_array(&mut items, max_bytes);
            Value::Array(items)
        }
        Value::Object(mut map) => {
            shrink_object(&mut map, max_bytes);
            Value::Object(map)
        }
        Value::String(mut text) => {
            fit_string(&mut text, max_bytes);
            Value::String(text)
        }
        // Oversized numbers and booleans only happen with absurd limits
        _ => Value::Null,
    };

    (shaped, true)
}

/// Keep the longest prefix whose encoding fits `budget`
fn fit_array(items: &mut Vec<Value>, budget: usize) {
    let mut used = 2; // []
    let mut keep = 0;
    for (i, item) in items.iter().enumerate() {
        let cost = encoded_len(item) + usize::from(i > 0);
        if used + cost > budget {
            break;
        }
        used += cost;
        keep = i + 1;
    }
    items.truncate(keep);
}

/// Bytes a char takes inside a JSON string literal
fn escaped_len(c: char) -> usize {
    match c {
        '"' | '\\' | '\n' | '\r' | '\t' | '\u{08}' | '\u{0c}' => 2,
        c if (c as u32) < 0x20 => 6,
        c => c.len_utf8(),
    }
}

/// Cut a string so its quoted encoding fits `budget`
fn fit_string(text: &mut String, budget: usize) {
    let mut used = 2; // quotes
    let mut cut = 0;
    for (idx, c) in text.char_indices() {
        let cost = escaped_len(c);
        if used + cost > budget {
            break;
        }
        used += cost;
        cut = idx + c.len_utf8();
    }
    text.truncate(cut);
}

/// Fields of one JSON type, largest encoding first, ties broken by key
fn fields_by_size(map: &Map<String, Value>, pick: fn(&Value) -> bool) -> Vec<String> {
    let mut fields: Vec<(usize, &String)> = map
        .iter()
        .filter(|(_, v)| pick(v))
        .map(|(k, v)| (encoded_len(v), k))
        .collect();
    fields.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    fields.into_iter().map(|(_, k)| k.clone()).collect()
}

/// Budget left for one field once the rest of the object is accounted for
fn field_budget(map: &Map<String, Value>, key: &str, max_bytes: usize) -> usize {
    let total = encoded_len(map);
    let field = map.get(key).map(encoded_len).unwrap_or(0);
    max_bytes.saturating_sub(total - field)
}

/// Shrink an object to `max_bytes`, dropping trailing keys only as a last resort
fn shrink_object(map: &mut Map<String, Value>, max_bytes: usize) {
    shrink_fields(map, max_bytes);

    for key in fields_by_size(map, Value::is_object) {
        if encoded_len(&*map) <= max_bytes {
            return;
        }
        let budget = field_budget(map, &key, max_bytes);
        if let Some(Value::Object(inner)) = map.get_mut(&key) {
            shrink_object(inner, budget);
        }
    }

    while encoded_len(&*map) > max_bytes {
        let Some(last) = map.keys().next_back().cloned() else {
            break;
        };
        map.remove(&last);
    }
}

/// Shrink without removing keys: arrays, then nested objects, then strings
fn shrink_fields(map: &mut Map<String, Value>, max_bytes: usize) {
    for key in fields_by_size(map, Value::is_array) {
        if encoded_len(&*map) <= max_bytes {
            return;
        }
        let budget = field_budget(map, &key, max_bytes);
        if let Some(Value::Array(items)) = map.get_mut(&key) {
            fit_array(items, budget);
        }
    }

    for key in fields_by_size(map, Value::is_object) {
        if encoded_len(&*map) <= max_bytes {
            return;
        }
        let budget = field_budget(map, &key, max_bytes);
        if let Some(Value::Object(inner)) = map.get_mut(&key) {
            shrink_fields(inner, budget);
        }
    }

    for key in fields_by_size(map, Value::is_string) {
        if encoded_len(&*map) <= max_bytes {
            return;
        }
        let budget = field_budget(map, &key, max_bytes);
        if let Some(Value::String(text)) = map.get_mut(&key) {
            fit_string(text, budget);
        }
    }
}
