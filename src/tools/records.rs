//! Record-list helpers for client-side filtering
//!
//! Upstream listings come back either as a bare array or as an object wrapping
//! the array (`{"data": [...]}`, `{"victims": [...]}`, ...). These helpers find
//! that array and edit it in place, leaving every other field untouched.

use serde_json::Value;

/// Wrapper fields known to hold record lists, checked in order
const RECORD_FIELDS: &[&str] = &["data", "victims", "results", "items", "groups", "iocs"];

/// Locate the record array inside a payload
pub fn records_mut(payload: &mut Value) -> Option<&mut Vec<Value>> {
    match payload {
        Value::Array(records) => Some(records),
        Value::Object(map) => {
            let field = RECORD_FIELDS
                .iter()
                .find(|f| map.get(**f).is_some_and(Value::is_array))
                .map(|f| f.to_string())
                .or_else(|| {
                    // A single array field is unambiguous whatever its name
                    let mut arrays = map.iter().filter(|(_, v)| v.is_array()).map(|(k, _)| k.clone());
                    match (arrays.next(), arrays.next()) {
                        (Some(only), None) => Some(only),
                        _ => None,
                    }
                })?;
            map.get_mut(&field).and_then(Value::as_array_mut)
        }
        _ => None,
    }
}

/// Keep records whose `field` equals `wanted`, ignoring case and surrounding whitespace
///
/// Returns false when the payload holds no recognizable record list.
pub fn filter_by_field(payload: &mut Value, field: &str, wanted: &str) -> bool {
    let wanted = wanted.trim().to_lowercase();
    match records_mut(payload) {
        Some(records) => {
            records.retain(|record| {
                record
                    .get(field)
                    .and_then(Value::as_str)
                    .is_some_and(|v| v.trim().to_lowercase() == wanted)
            });
            true
        }
        None => false,
    }
}

/// Keep at most `limit` records; false when there is no record list
pub fn limit_records(payload: &mut Value, limit: usize) -> bool {
    match records_mut(payload) {
        Some(records) => {
            records.truncate(limit);
            true
        }
        None => false,
    }
}
