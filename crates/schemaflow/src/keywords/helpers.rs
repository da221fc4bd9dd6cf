use serde_json::{Map, Number, Value};

/// Equality with JSON Schema semantics: `1`, `1.0`, and `1u64` are the same
/// value regardless of their serde representation.
pub(crate) fn equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::String(left), Value::String(right)) => left == right,
        (Value::Bool(left), Value::Bool(right)) => left == right,
        (Value::Null, Value::Null) => true,
        (Value::Number(left), Value::Number(right)) => equal_numbers(left, right),
        (Value::Array(left), Value::Array(right)) => equal_arrays(left, right),
        (Value::Object(left), Value::Object(right)) => equal_objects(left, right),
        (_, _) => false,
    }
}

pub(crate) fn equal_numbers(left: &Number, right: &Number) -> bool {
    if let (Some(left), Some(right)) = (left.as_u64(), right.as_u64()) {
        return left == right;
    }
    if let (Some(left), Some(right)) = (left.as_i64(), right.as_i64()) {
        return left == right;
    }
    match (left.as_f64(), right.as_f64()) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

fn equal_arrays(left: &[Value], right: &[Value]) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right.iter())
            .all(|(left, right)| equal(left, right))
}

fn equal_objects(left: &Map<String, Value>, right: &Map<String, Value>) -> bool {
    left.len() == right.len()
        && left.iter().all(|(key, left)| {
            right
                .get(key)
                .is_some_and(|right| equal(left, right))
        })
}

/// Quote a list of names the way error messages expect: `'a', 'b'`.
pub(crate) fn quoted_list(names: &[String]) -> String {
    let mut buffer = String::new();
    for (index, name) in names.iter().enumerate() {
        if index > 0 {
            buffer.push_str(", ");
        }
        buffer.push('\'');
        buffer.push_str(name);
        buffer.push('\'');
    }
    buffer
}
