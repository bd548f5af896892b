use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::diagnostics::{DiagnosticCode, DiagnosticLog};
use super::fields::{index, optional_str, FieldCtx};
use super::Normalized;
use crate::error::RefineError;
use crate::extract::extract_value;

pub const EXTRACTION_DISCRIMINATOR: &str = "variables";

/// Where in the prompt the variable's value was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablePosition {
    pub original_text: String,
    /// 1-based; always at least 1.
    pub occurrence: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedVariable {
    pub name: String,
    pub value: String,
    pub position: VariablePosition,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableExtractionResult {
    pub variables: Vec<ExtractedVariable>,
    pub summary: String,
}

/// Interpret a variable extraction reply.
///
/// Every variable is validated before filtering. Names already known to the
/// caller (`existing_names`, compared trimmed and case-folded) are dropped,
/// as are repeats within the reply; the first occurrence wins.
pub fn normalize_extraction(
    raw: &str,
    existing_names: &[String],
) -> Result<Normalized<VariableExtractionResult>, RefineError> {
    let input_len = raw.len();
    let extracted = extract_value(raw, EXTRACTION_DISCRIMINATOR).ok_or_else(|| {
        RefineError::parse("No variable extraction object found in model output", input_len)
    })?;

    let ctx = FieldCtx::new(input_len);
    let root = ctx.object(&extracted.value, "")?;
    let items = ctx.array(root, "variables", "")?;
    let summary = ctx.string(root, "summary", "")?.to_string();

    let mut candidates = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        candidates.push(parse_variable(item, &index("variables", i), &ctx)?);
    }

    let existing: HashSet<String> = existing_names.iter().map(|n| fold(n)).collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut log = DiagnosticLog::default();
    let mut variables = Vec::with_capacity(candidates.len());

    for var in candidates {
        let key = fold(&var.name);
        if existing.contains(&key) {
            log.push(
                DiagnosticCode::ExistingName,
                var.name.as_str(),
                "variable already exists; dropped",
            );
            continue;
        }
        if !seen.insert(key) {
            log.push(
                DiagnosticCode::DuplicateName,
                var.name.as_str(),
                "duplicate variable in reply; kept the first",
            );
            continue;
        }
        variables.push(var);
    }

    debug!(
        "Variable extraction: {} kept, {} returned",
        variables.len(),
        items.len()
    );

    Ok(Normalized {
        value: VariableExtractionResult { variables, summary },
        diagnostics: log.into_vec(),
        degraded: false,
    })
}

fn parse_variable(item: &Value, path: &str, ctx: &FieldCtx) -> Result<ExtractedVariable, RefineError> {
    let obj = ctx.object(item, path)?;
    let position = ctx.object_field(obj, "position", path)?;
    let position_path = format!("{}.position", path);
    let occurrence = ctx.number(position, "occurrence", &position_path)?;

    Ok(ExtractedVariable {
        name: ctx.name(obj, "name", path)?.to_string(),
        value: ctx.string(obj, "value", path)?.to_string(),
        position: VariablePosition {
            original_text: ctx.string(position, "originalText", &position_path)?.to_string(),
            occurrence: occurrence.round().max(1.0) as u32,
        },
        reason: ctx.string(obj, "reason", path)?.to_string(),
        category: optional_str(obj, "category").map(str::to_string),
    })
}

fn fold(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn variable(name: &str) -> String {
        format!(
            r#"{{"name":"{}","value":"v","position":{{"originalText":"v","occurrence":1}},"reason":"r"}}"#,
            name
        )
    }

    fn reply(names: &[&str]) -> String {
        let vars: Vec<String> = names.iter().map(|n| variable(n)).collect();
        format!(r#"{{"variables":[{}],"summary":"done"}}"#, vars.join(","))
    }

    #[test]
    fn test_existing_name_case_insensitive() {
        let out = normalize_extraction(&reply(&["Season", "Topic"]), &["season".to_string()]).unwrap();
        let names: Vec<_> = out.value.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Topic"]);
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].code, DiagnosticCode::ExistingName);
        assert_eq!(out.diagnostics[0].name, "Season");
    }

    #[test]
    fn test_duplicates_first_wins() {
        let raw = r#"{"variables":[
            {"name":"tone","value":"formal","position":{"originalText":"formal","occurrence":1},"reason":"first"},
            {"name":" Tone ","value":"casual","position":{"originalText":"casual","occurrence":1},"reason":"second"}
        ],"summary":"s"}"#;
        let out = normalize_extraction(raw, &[]).unwrap();
        assert_eq!(out.value.variables.len(), 1);
        assert_eq!(out.value.variables[0].value, "formal");
        assert_eq!(out.diagnostics[0].code, DiagnosticCode::DuplicateName);
    }

    #[test]
    fn test_fields_and_category() {
        let raw = r#"```json
{"variables":[
  {"name":"city","value":"Paris","position":{"originalText":"in Paris","occurrence":"2"},"reason":"place","category":"location"},
  {"name":"year","value":"2024","position":{"originalText":"2024","occurrence":0},"reason":"time","category":5}
],"summary":"two found"}
```"#;
        let out = normalize_extraction(raw, &[]).unwrap();
        let vars = &out.value.variables;
        assert_eq!(vars[0].position.original_text, "in Paris");
        assert_eq!(vars[0].position.occurrence, 2);
        assert_eq!(vars[0].category.as_deref(), Some("location"));
        assert_eq!(vars[1].position.occurrence, 1);
        assert_eq!(vars[1].category, None);
        assert_eq!(out.value.summary, "two found");
    }

    #[test]
    fn test_missing_summary_is_hard_error() {
        let raw = format!(r#"{{"variables":[{}]}}"#, variable("a"));
        let err = normalize_extraction(&raw, &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.to_string().contains("'summary'"));
    }

    #[test]
    fn test_invalid_variable_is_hard_error() {
        let raw = r#"{"variables":[{"name":"","value":"v","position":{"originalText":"v","occurrence":1},"reason":"r"}],"summary":"s"}"#;
        let err = normalize_extraction(raw, &[]).unwrap_err();
        assert!(err.to_string().contains("variables[0].name"), "{}", err);

        let raw = r#"{"variables":[{"name":"a","value":"v","position":{"originalText":"v"},"reason":"r"}],"summary":"s"}"#;
        let err = normalize_extraction(raw, &[]).unwrap_err();
        assert!(err.to_string().contains("variables[0].position.occurrence"), "{}", err);
    }

    #[test]
    fn test_no_candidate() {
        let err = normalize_extraction("No variables here.", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_empty_variables_ok() {
        let out = normalize_extraction(r#"{"variables":[],"summary":"nothing"}"#, &[]).unwrap();
        assert!(out.value.variables.is_empty());
        assert!(out.diagnostics.is_empty());
    }
}
