use serde_json::{Map, Value};

use crate::error::ApiError;

/// Borrow the body as a JSON object, rejecting arrays and scalars
pub fn json_object(body: &Value) -> Result<&Map<String, Value>, ApiError> {
    body.as_object()
        .ok_or_else(|| ApiError::bad_request("We only accept key value objects!"))
}

/// Check that every name in `required` is present in the body object.
/// Fails on the first missing name, in `required` order.
pub fn require_json_fields<'a>(
    body: &'a Value,
    required: &[&str],
) -> Result<&'a Map<String, Value>, ApiError> {
    let object = json_object(body)?;
    if let Some(missing) = required.iter().find(|name| !object.contains_key(**name)) {
        return Err(ApiError::bad_request(format!(
            "Required field '{}' is missing.",
            missing
        )));
    }
    Ok(object)
}

/// Turn an empty serialized result into a 404.
///
/// Null and empty arrays, objects and strings count as empty. `0` and
/// `false` are values.
pub fn not_found_if_empty(value: Value) -> Result<Value, ApiError> {
    let empty = match &value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    };

    if empty {
        Err(ApiError::not_found("Not Found"))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_field_is_named() {
        let err = require_json_fields(&json!({"a": 1}), &["a", "b", "c"]).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.message(), "Required field 'b' is missing.");
    }

    #[test]
    fn null_counts_as_present() {
        assert!(require_json_fields(&json!({"a": null}), &["a"]).is_ok());
    }

    #[test]
    fn non_object_bodies_are_rejected() {
        for body in [json!([1, 2]), json!("a"), json!(3)] {
            let err = require_json_fields(&body, &[]).unwrap_err();
            assert_eq!(err.message(), "We only accept key value objects!");
        }
    }

    #[test]
    fn empty_results_become_not_found() {
        for value in [json!(null), json!([]), json!({}), json!("")] {
            assert_eq!(not_found_if_empty(value).unwrap_err().status_code(), 404);
        }
        for value in [json!(0), json!(false), json!([null])] {
            assert_eq!(not_found_if_empty(value.clone()).unwrap(), value);
        }
    }
}
