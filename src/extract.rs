//! Optional nested field access on webhook replies.
//!
//! Every accessor returns `None` on a shape mismatch instead of failing:
//! a reply that is missing a field, or has it with an unexpected type,
//! degrades to an absent value in the record.

use serde_json::Value;

/// Walks `path` through nested objects.
pub fn field<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = value;
    for key in path {
        cur = cur.as_object()?.get(*key)?;
    }
    Some(cur)
}

/// Pass-through value; JSON `null` collapses to absent.
pub fn value_at(value: &Value, path: &[&str]) -> Option<Value> {
    match field(value, path)? {
        Value::Null => None,
        v => Some(v.clone()),
    }
}

/// Integers only; floats, strings and booleans are absent.
pub fn int_at(value: &Value, path: &[&str]) -> Option<i64> {
    match field(value, path)? {
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// Length of an array field. A non-object root has no count; a missing key
/// on an object counts as zero.
pub fn array_len_at(value: &Value, path: &[&str]) -> Option<u64> {
    value.as_object()?;
    match field(value, path) {
        None => Some(0),
        Some(Value::Array(items)) => Some(items.len() as u64),
        Some(_) => None,
    }
}
