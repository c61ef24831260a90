//! Helpers for extracting typed parameters from a `serde_json::Value` object.
//!
//! A missing key yields `None` so callers can fall back to built-in data. A
//! key that is present but has the wrong shape is an error rather than a
//! silent default.

use serde_json::Value;

use crate::error::RenderError;

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(name: &str, expected: &str, got: &str) -> RenderError {
    RenderError::ParamTypeMismatch {
        name: name.to_owned(),
        expected: expected.to_owned(),
        got: got.to_owned(),
    }
}

/// Extracts `params[name]` as a flat array of floats.
///
/// The value is either a flat array of numbers or an array of vertices,
/// each an array of exactly `components` numbers. `[[0, 1, 0], [1, -1, 0]]`
/// and `[0, 1, 0, 1, -1, 0]` are equivalent for `components == 3`.
///
/// # Errors
///
/// Returns [`RenderError::ParamTypeMismatch`] if the value is not an array,
/// mixes numbers and arrays, contains a non-number, or has a vertex whose
/// length is not `components`.
pub fn param_floats(
    params: &Value,
    name: &str,
    components: usize,
) -> Result<Option<Vec<f32>>, RenderError> {
    let Some(value) = params.get(name) else {
        return Ok(None);
    };
    let Value::Array(items) = value else {
        return Err(mismatch(name, "array of numbers", json_kind(value)));
    };

    let number = |v: &Value| {
        v.as_f64()
            .map(|n| n as f32)
            .ok_or_else(|| mismatch(name, "number", json_kind(v)))
    };

    if !items.iter().any(Value::is_array) {
        return items.iter().map(number).collect::<Result<_, _>>().map(Some);
    }

    let expected = format!("array of {components} numbers");
    let mut out = Vec::with_capacity(items.len() * components);
    for item in items {
        let Value::Array(vertex) = item else {
            return Err(mismatch(name, &expected, json_kind(item)));
        };
        if vertex.len() != components {
            let got = format!("array of {}", vertex.len());
            return Err(mismatch(name, &expected, &got));
        }
        for v in vertex {
            out.push(number(v)?);
        }
    }
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn param_floats_missing_key_is_none() {
        let params = json!({"other": [1.0]});
        assert_eq!(param_floats(&params, "positions", 3).unwrap(), None);
    }

    #[test]
    fn param_floats_reads_flat_array() {
        let params = json!({"positions": [0, 1, 0.5]});
        assert_eq!(
            param_floats(&params, "positions", 3).unwrap(),
            Some(vec![0.0, 1.0, 0.5])
        );
    }

    #[test]
    fn param_floats_flattens_nested_triples() {
        let nested = json!({"colors": [[1, 0, 0], [0, 1, 0]]});
        let flat = json!({"colors": [1, 0, 0, 0, 1, 0]});
        assert_eq!(
            param_floats(&nested, "colors", 3).unwrap(),
            param_floats(&flat, "colors", 3).unwrap()
        );
    }

    #[test]
    fn param_floats_rejects_ragged_vertices() {
        let params = json!({"positions": [[0, 1], [0, 1, -1], [-1, 0, 0, 1]]});
        let err = param_floats(&params, "positions", 3).unwrap_err();
        assert!(matches!(
            err,
            RenderError::ParamTypeMismatch { ref got, .. } if got == "array of 2"
        ));
    }

    #[test]
    fn param_floats_rejects_mixed_numbers_and_vertices() {
        let params = json!({"positions": [[0, 1, 0], 1, -1, 0]});
        assert!(param_floats(&params, "positions", 3).is_err());
    }

    #[test]
    fn param_floats_rejects_non_array() {
        let params = json!({"positions": "triangle"});
        let err = param_floats(&params, "positions", 3).unwrap_err();
        assert!(matches!(
            err,
            RenderError::ParamTypeMismatch { ref got, .. } if got == "string"
        ));
    }

    #[test]
    fn param_floats_rejects_non_number_elements() {
        let params = json!({"positions": [0, "1", 0]});
        assert!(param_floats(&params, "positions", 3).is_err());
        let params = json!({"positions": [[0, true, 0]]});
        assert!(param_floats(&params, "positions", 3).is_err());
        let params = json!({"positions": [0, null, 0]});
        assert!(param_floats(&params, "positions", 3).is_err());
    }

    #[test]
    fn param_floats_on_non_object_is_none() {
        assert_eq!(param_floats(&json!(42), "positions", 3).unwrap(), None);
    }
}
