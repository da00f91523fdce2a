//! Argument validation and coercion against a capability's declared
//! JSON schema.
//!
//! The planner's arguments come out of model text, so strings standing
//! in for integers and booleans are common. Validation checks required
//! fields and enum membership; coercion converts string-encoded numbers
//! and booleans in place. The subset of JSON schema understood here is
//! exactly what the built-in capabilities declare: `properties`,
//! `required`, per-property `type` and `enum`.

use serde_json::{Map, Value};

/// Validate `arguments` against `schema`, coercing where possible.
///
/// Returns the (possibly coerced) arguments, or a human-readable reason
/// the arguments were rejected.
pub fn validate_arguments(schema: &Value, arguments: &Value) -> Result<Value, String> {
    let mut args = match arguments {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => return Err(format!("arguments must be an object, got {other}")),
    };

    let properties = schema.get("properties").and_then(Value::as_object);

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            if !args.contains_key(field) {
                return Err(format!("missing required argument '{field}'"));
            }
        }
    }

    let Some(properties) = properties else {
        return Ok(Value::Object(args));
    };

    for (name, spec) in properties {
        let Some(value) = args.get(name) else { continue };

        if let Some(expected) = spec.get("type").and_then(Value::as_str) {
            match coerce(value, expected) {
                Some(coerced) => {
                    args.insert(name.clone(), coerced);
                }
                None => {
                    return Err(format!(
                        "argument '{name}' should be of type {expected}, got {value}"
                    ));
                }
            }
        }

        if let Some(allowed) = spec.get("enum").and_then(Value::as_array) {
            let current = &args[name];
            if !allowed.contains(current) {
                return Err(format!(
                    "argument '{name}' must be one of {allowed:?}, got {current}"
                ));
            }
        }
    }

    Ok(Value::Object(args))
}

/// Coerce a value to the expected schema type, if possible.
fn coerce(value: &Value, expected: &str) -> Option<Value> {
    match (expected, value) {
        ("string", Value::String(_)) => Some(value.clone()),
        ("integer", Value::Number(n)) if n.is_i64() || n.is_u64() => Some(value.clone()),
        ("integer", Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
        ("number", Value::Number(_)) => Some(value.clone()),
        ("number", Value::String(s)) => s.trim().parse::<f64>().ok().map(Value::from),
        ("boolean", Value::Bool(_)) => Some(value.clone()),
        ("boolean", Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        ("object", Value::Object(_)) => Some(value.clone()),
        ("array", Value::Array(_)) => Some(value.clone()),
        _ => None,
    }
}
