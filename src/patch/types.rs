//! Patch operation and result types.
//!
//! Field names serialize in camelCase to match the wire shape models emit:
//! `{"op":"replace","oldText":..,"newText":..,"occurrence":1,"instruction":..}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of edit. All three use the same substitution primitive: an insert
/// is a `newText` that contains `oldText`, a delete is a `newText` that
/// drops part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Replace,
    Insert,
    Delete,
}

impl PatchOp {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "replace" => Some(PatchOp::Replace),
            "insert" => Some(PatchOp::Insert),
            "delete" => Some(PatchOp::Delete),
            _ => None,
        }
    }
}

/// One anchored edit. `old_text` is the anchor; an empty anchor is only
/// rejected when the operation is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchOperation {
    pub op: PatchOp,
    #[serde(default)]
    pub old_text: String,
    #[serde(default)]
    pub new_text: String,
    /// 1-based occurrence of `old_text` to target; absent means 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence: Option<u32>,
    #[serde(default)]
    pub instruction: String,
}

impl PatchOperation {
    pub fn replace(old_text: impl Into<String>, new_text: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Replace,
            old_text: old_text.into(),
            new_text: new_text.into(),
            occurrence: None,
            instruction: String::new(),
        }
    }

    pub fn with_occurrence(mut self, occurrence: u32) -> Self {
        self.occurrence = Some(occurrence);
        self
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// The occurrence actually targeted. Zero is treated as 1.
    pub fn target_occurrence(&self) -> usize {
        self.occurrence.unwrap_or(1).max(1) as usize
    }

    /// Decode one operation from model-authored JSON, tolerating the usual
    /// deviations: a missing `op` means replace, `occurrence` may be a
    /// numeric string, absent text fields are empty.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let obj = value
            .as_object()
            .ok_or_else(|| "patch operation must be an object".to_string())?;

        let op = match obj.get("op") {
            None | Some(Value::Null) => PatchOp::Replace,
            Some(Value::String(s)) => {
                PatchOp::parse(s).ok_or_else(|| format!("unknown patch op '{}'", s))?
            }
            Some(other) => return Err(format!("patch op must be a string, got {}", other)),
        };

        let text_field = |key: &str| -> Result<String, String> {
            match obj.get(key) {
                None | Some(Value::Null) => Ok(String::new()),
                Some(Value::String(s)) => Ok(s.clone()),
                Some(other) => Err(format!("'{}' must be a string, got {}", key, other)),
            }
        };

        let occurrence = match obj.get("occurrence") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => n.as_f64().filter(|v| *v >= 1.0).map(|v| v as u32),
            Some(Value::String(s)) => s.trim().parse::<u32>().ok().filter(|v| *v >= 1),
            Some(other) => return Err(format!("'occurrence' must be a number, got {}", other)),
        };

        Ok(Self {
            op,
            old_text: text_field("oldText")?,
            new_text: text_field("newText")?,
            occurrence,
            instruction: text_field("instruction")?,
        })
    }
}

/// Outcome of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchStatus {
    Applied,
    Skipped,
    /// Reserved for an overlapping-edit detector. Nothing in this crate
    /// produces it yet; consumers should treat it like `Skipped`.
    Conflict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchReport {
    pub op: PatchOp,
    pub status: PatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Result of applying a single operation. The input text is never mutated;
/// `text` is the new text when applied and a copy of the input otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchApplyResult {
    pub ok: bool,
    pub text: String,
    pub report: PatchReport,
}

/// Result of a sequential batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub text: String,
    pub reports: Vec<PatchReport>,
}

impl BatchOutcome {
    pub fn applied_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.status == PatchStatus::Applied)
            .count()
    }

    pub fn all_applied(&self) -> bool {
        self.applied_count() == self.reports.len()
    }
}
