//! Validated field access over a parsed value tree.
//!
//! Every typed field a normalizer reads goes through one of these helpers.
//! Required accessors fail with a `Parse` error naming the field path and
//! the raw input length; optional ones return `None` or an empty default.

use serde_json::{Map, Value};

use crate::error::RefineError;

/// Context shared by the accessors of one normalization pass.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldCtx {
    pub input_len: usize,
}

impl FieldCtx {
    pub fn new(input_len: usize) -> Self {
        Self { input_len }
    }

    pub fn invalid(&self, path: &str, expected: &str) -> RefineError {
        RefineError::parse(
            format!("Missing or invalid field '{}' (expected {})", path, expected),
            self.input_len,
        )
    }

    pub fn object<'a>(&self, value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, RefineError> {
        value.as_object().ok_or_else(|| self.invalid(path, "object"))
    }

    pub fn object_field<'a>(
        &self,
        obj: &'a Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Result<&'a Map<String, Value>, RefineError> {
        obj.get(key)
            .and_then(Value::as_object)
            .ok_or_else(|| self.invalid(&join(path, key), "object"))
    }

    pub fn array<'a>(
        &self,
        obj: &'a Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Result<&'a Vec<Value>, RefineError> {
        obj.get(key)
            .and_then(Value::as_array)
            .ok_or_else(|| self.invalid(&join(path, key), "array"))
    }

    pub fn string<'a>(
        &self,
        obj: &'a Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Result<&'a str, RefineError> {
        obj.get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| self.invalid(&join(path, key), "string"))
    }

    /// A string that is non-empty after trimming; returned trimmed.
    pub fn name<'a>(
        &self,
        obj: &'a Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Result<&'a str, RefineError> {
        let s = self.string(obj, key, path)?.trim();
        if s.is_empty() {
            return Err(self.invalid(&join(path, key), "non-empty string"));
        }
        Ok(s)
    }

    pub fn number(&self, obj: &Map<String, Value>, key: &str, path: &str) -> Result<f64, RefineError> {
        obj.get(key)
            .and_then(as_number)
            .ok_or_else(|| self.invalid(&join(path, key), "number"))
    }
}

/// A JSON number, or a string holding one (models quote numbers often).
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|v| v.is_finite())
}

pub(crate) fn optional_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

pub(crate) fn optional_number(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key).and_then(as_number)
}

/// String items of an optional array; anything else yields an empty list.
pub(crate) fn string_list(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    match obj.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

pub(crate) fn index(path: &str, i: usize) -> String {
    format!("{}[{}]", path, i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_field_error_names_path() {
        let ctx = FieldCtx::new(99);
        let v = json!({"score": {"overall": "high"}});
        let score = ctx.object_field(v.as_object().unwrap(), "score", "").unwrap();
        let err = ctx.number(score, "overall", "score").unwrap_err();
        match err {
            RefineError::Parse { message, input_len } => {
                assert!(message.contains("'score.overall'"), "{}", message);
                assert_eq!(input_len, 99);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_number_accepts_numeric_strings() {
        assert_eq!(as_number(&json!(85)), Some(85.0));
        assert_eq!(as_number(&json!(" 72.5 ")), Some(72.5));
        assert_eq!(as_number(&json!("NaN")), None);
        assert_eq!(as_number(&json!(true)), None);
    }

    #[test]
    fn test_name_is_trimmed_and_non_empty() {
        let ctx = FieldCtx::new(0);
        let v = json!({"name": "  topic ", "blank": "   "});
        let obj = v.as_object().unwrap();
        assert_eq!(ctx.name(obj, "name", "").unwrap(), "topic");
        assert!(ctx.name(obj, "blank", "").is_err());
        assert!(ctx.name(obj, "missing", "").is_err());
    }

    #[test]
    fn test_string_list_defaults() {
        let v = json!({"issues": ["a", 1, "b"], "improvements": "none"});
        let obj = v.as_object().unwrap();
        assert_eq!(string_list(obj, "issues"), vec!["a", "b"]);
        assert!(string_list(obj, "improvements").is_empty());
        assert!(string_list(obj, "absent").is_empty());
    }
}
