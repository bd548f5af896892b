use std::fmt;

use serde::Serialize;
use tracing::warn;

/// What kind of anomaly a normalizer noticed and corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    /// Extracted variable dropped because the caller already has it.
    ExistingName,
    /// Extracted variable dropped because an earlier one had the same name.
    DuplicateName,
    /// Generated value dropped because its name was not requested.
    UnrequestedValue,
    /// Generated value replaced a previous one with the same name.
    DuplicateValue,
    /// Requested variable had no generated value and was backfilled.
    MissingValue,
    /// Patch plan entry could not be decoded and was dropped.
    InvalidPatchOperation,
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticCode::ExistingName => "existing_name",
            DiagnosticCode::DuplicateName => "duplicate_name",
            DiagnosticCode::UnrequestedValue => "unrequested_value",
            DiagnosticCode::DuplicateValue => "duplicate_value",
            DiagnosticCode::MissingValue => "missing_value",
            DiagnosticCode::InvalidPatchOperation => "invalid_patch_operation",
        };
        f.write_str(name)
    }
}

/// A reconciliation event returned alongside a normalized result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    /// The variable name or field path the event is about.
    pub name: String,
    pub message: String,
}

/// Collects diagnostics and mirrors each one to the log.
#[derive(Debug, Default)]
pub(crate) struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn push(&mut self, code: DiagnosticCode, name: impl Into<String>, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            code,
            name: name.into(),
            message: message.into(),
        };
        warn!(
            "[{}] {}: {}",
            diagnostic.code, diagnostic.name, diagnostic.message
        );
        self.entries.push(diagnostic);
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_keeps_order() {
        let mut log = DiagnosticLog::default();
        log.push(DiagnosticCode::MissingValue, "B", "backfilled");
        log.push(DiagnosticCode::UnrequestedValue, "Z", "dropped");
        let entries = log.into_vec();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].code, DiagnosticCode::MissingValue);
        assert_eq!(entries[1].name, "Z");
    }

    #[test]
    fn test_code_serializes_snake_case() {
        let json = serde_json::to_string(&DiagnosticCode::InvalidPatchOperation).unwrap();
        assert_eq!(json, "\"invalid_patch_operation\"");
        assert_eq!(DiagnosticCode::DuplicateName.to_string(), "duplicate_name");
    }

    #[test]
    fn test_display_matches_serialized_name() {
        use DiagnosticCode::*;
        for code in [
            ExistingName,
            DuplicateName,
            UnrequestedValue,
            DuplicateValue,
            MissingValue,
            InvalidPatchOperation,
        ] {
            // Adding a variant without listing it here fails to compile.
            match code {
                ExistingName | DuplicateName | UnrequestedValue | DuplicateValue
                | MissingValue | InvalidPatchOperation => {}
            }
            let serialized = serde_json::to_value(code).unwrap();
            assert_eq!(serialized.as_str(), Some(code.to_string().as_str()));
        }
    }
}
