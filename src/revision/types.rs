use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One immutable snapshot of a prompt within a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionVersion {
    pub id: String,
    pub chain_id: String,
    /// 1 for the root, previous + 1 for every append.
    pub version: u32,
    /// Head of the chain when this version was appended; `None` for the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_id: Option<String>,
    pub original_prompt: String,
    pub optimized_prompt: String,
    pub timestamp: DateTime<Utc>,
    pub model_key: String,
    pub template_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration_note: Option<String>,
}

/// A chain assembled from its stored versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionChain {
    pub chain_id: String,
    pub root_record: RevisionVersion,
    pub current_record: RevisionVersion,
    /// Ascending by version; first is the root, last is the current record.
    pub versions: Vec<RevisionVersion>,
}

impl RevisionChain {
    /// The text the next iteration should start from.
    pub fn current_prompt(&self) -> &str {
        &self.current_record.optimized_prompt
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// Caller-supplied content for a new version. Identity, numbering and
/// linkage are assigned by the chain service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDraft {
    pub original_prompt: String,
    pub optimized_prompt: String,
    pub model_key: String,
    pub template_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration_note: Option<String>,
    /// Defaults to the current time when the version is recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl VersionDraft {
    pub fn new(
        original_prompt: impl Into<String>,
        optimized_prompt: impl Into<String>,
        model_key: impl Into<String>,
        template_id: impl Into<String>,
    ) -> Self {
        Self {
            original_prompt: original_prompt.into(),
            optimized_prompt: optimized_prompt.into(),
            model_key: model_key.into(),
            template_id: template_id.into(),
            iteration_note: None,
            timestamp: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.iteration_note = Some(note.into());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}
