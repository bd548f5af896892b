use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::diagnostics::{DiagnosticCode, DiagnosticLog};
use super::fields::{index, optional_number, FieldCtx};
use super::Normalized;
use crate::error::RefineError;
use crate::extract::extract_value;

pub const GENERATION_DISCRIMINATOR: &str = "values";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedVariableValue {
    pub name: String,
    pub value: String,
    pub reason: String,
    /// In [0, 1] when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableValueResult {
    /// Exactly one entry per requested name, in request order.
    pub values: Vec<GeneratedVariableValue>,
    pub summary: String,
}

/// Trim requested names, rejecting an empty request or a blank name.
pub fn validate_requested_names(requested: &[String]) -> Result<Vec<String>, RefineError> {
    if requested.is_empty() {
        return Err(RefineError::Validation(
            "At least one variable must be requested".to_string(),
        ));
    }
    requested
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                Err(RefineError::Validation(format!(
                    "Requested variable #{} has a blank name",
                    i + 1
                )))
            } else {
                Ok(trimmed.to_string())
            }
        })
        .collect()
}

/// Interpret a value generation reply and align it with the request.
///
/// Values for unrequested names are dropped, a repeated name keeps its last
/// value, and requested names the model skipped are backfilled with an
/// empty value, `missing_reason` and confidence 0. The output always has
/// the request's length and order.
pub fn normalize_generation(
    raw: &str,
    requested: &[String],
    missing_reason: &str,
) -> Result<Normalized<VariableValueResult>, RefineError> {
    let requested = validate_requested_names(requested)?;
    let input_len = raw.len();
    let extracted = extract_value(raw, GENERATION_DISCRIMINATOR).ok_or_else(|| {
        RefineError::parse("No variable value object found in model output", input_len)
    })?;

    let ctx = FieldCtx::new(input_len);
    let root = ctx.object(&extracted.value, "")?;
    let items = ctx.array(root, "values", "")?;
    let summary = ctx.string(root, "summary", "")?.to_string();

    let wanted: HashSet<&str> = requested.iter().map(String::as_str).collect();
    let mut log = DiagnosticLog::default();
    let mut by_name: HashMap<String, GeneratedVariableValue> = HashMap::new();

    for (i, item) in items.iter().enumerate() {
        let path = index("values", i);
        let obj = ctx.object(item, &path)?;
        let value = GeneratedVariableValue {
            name: ctx.name(obj, "name", &path)?.to_string(),
            value: ctx.string(obj, "value", &path)?.to_string(),
            reason: ctx.string(obj, "reason", &path)?.to_string(),
            confidence: optional_number(obj, "confidence").map(|c| c.clamp(0.0, 1.0)),
        };

        if !wanted.contains(value.name.as_str()) {
            log.push(
                DiagnosticCode::UnrequestedValue,
                value.name.as_str(),
                "value for a variable that was not requested; dropped",
            );
            continue;
        }
        let name = value.name.clone();
        if by_name.insert(name.clone(), value).is_some() {
            log.push(
                DiagnosticCode::DuplicateValue,
                name,
                "variable returned more than once; kept the last",
            );
        }
    }

    let values: Vec<GeneratedVariableValue> = requested
        .iter()
        .map(|name| match by_name.get(name) {
            Some(v) => v.clone(),
            None => {
                log.push(
                    DiagnosticCode::MissingValue,
                    name.as_str(),
                    "no value generated; backfilled with an empty value",
                );
                GeneratedVariableValue {
                    name: name.clone(),
                    value: String::new(),
                    reason: missing_reason.to_string(),
                    confidence: Some(0.0),
                }
            }
        })
        .collect();

    debug!(
        "Variable values: {} requested, {} returned",
        requested.len(),
        items.len()
    );

    Ok(Normalized {
        value: VariableValueResult { values, summary },
        diagnostics: log.into_vec(),
        degraded: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const REASON: &str = "(model did not generate a value for this variable)";

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_backfills_missing_in_request_order() {
        let raw = r#"{"values":[
            {"name":"C","value":"c-val","reason":"rc","confidence":0.8},
            {"name":"A","value":"a-val","reason":"ra"}
        ],"summary":"two of three"}"#;
        let out = normalize_generation(raw, &names(&["A", "B", "C"]), REASON).unwrap();
        let values = &out.value.values;
        assert_eq!(values.len(), 3);
        let order: Vec<_> = values.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
        assert_eq!(values[0].value, "a-val");
        assert_eq!(values[0].confidence, None);
        assert_eq!(values[1].value, "");
        assert_eq!(values[1].reason, REASON);
        assert_eq!(values[1].confidence, Some(0.0));
        assert_eq!(values[2].confidence, Some(0.8));
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].code, DiagnosticCode::MissingValue);
        assert_eq!(out.diagnostics[0].name, "B");
    }

    #[test]
    fn test_unrequested_dropped_and_duplicate_last_wins() {
        let raw = r#"{"values":[
            {"name":"A","value":"first","reason":"r"},
            {"name":"Z","value":"extra","reason":"r"},
            {"name":" A ","value":"second","reason":"r"}
        ],"summary":"s"}"#;
        let out = normalize_generation(raw, &names(&[" A "]), REASON).unwrap();
        assert_eq!(out.value.values.len(), 1);
        assert_eq!(out.value.values[0].name, "A");
        assert_eq!(out.value.values[0].value, "second");
        let codes: Vec<_> = out.diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            vec![DiagnosticCode::UnrequestedValue, DiagnosticCode::DuplicateValue]
        );
    }

    #[test]
    fn test_confidence_clamped() {
        let raw = r#"{"values":[{"name":"A","value":"x","reason":"r","confidence":1.7},{"name":"B","value":"y","reason":"r","confidence":-2}],"summary":"s"}"#;
        let out = normalize_generation(raw, &names(&["A", "B"]), REASON).unwrap();
        assert_eq!(out.value.values[0].confidence, Some(1.0));
        assert_eq!(out.value.values[1].confidence, Some(0.0));
    }

    #[test]
    fn test_empty_reply_still_has_request_length() {
        let out = normalize_generation(r#"{"values":[],"summary":""}"#, &names(&["x", "y"]), REASON).unwrap();
        assert_eq!(out.value.values.len(), 2);
        assert!(out.value.values.iter().all(|v| v.value.is_empty()));
        assert_eq!(out.diagnostics.len(), 2);
    }

    #[test]
    fn test_request_validation() {
        let err = normalize_generation("{}", &[], REASON).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = normalize_generation("{}", &names(&["a", "  "]), REASON).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("#2"));
    }

    #[test]
    fn test_missing_required_field() {
        let raw = r#"{"values":[{"name":"A","value":"x"}],"summary":"s"}"#;
        let err = normalize_generation(raw, &names(&["A"]), REASON).unwrap_err();
        assert!(err.to_string().contains("values[0].reason"), "{}", err);
    }
}
