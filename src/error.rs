use std::fmt;

use thiserror::Error;

/// Closed classification of every failure the crate can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Model,
    Template,
    Parse,
    Execution,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Model => "model",
            ErrorKind::Template => "template",
            ErrorKind::Parse => "parse",
            ErrorKind::Execution => "execution",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RefineError {
    /// Caller-supplied input is malformed (empty prompt, blank model key, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The referenced model configuration does not exist.
    #[error("Model error: {0}")]
    Model(String),

    /// Template rendering failed; the renderer's message is passed through.
    #[error("Template error: {0}")]
    Template(String),

    /// Model output could not be interpreted after every fallback stage.
    #[error("Parse error: {message} (input length: {input_len})")]
    Parse { message: String, input_len: usize },

    /// The upstream LLM call itself failed.
    #[error("Execution error: {0}")]
    Execution(String),
}

impl RefineError {
    pub fn parse(message: impl Into<String>, input_len: usize) -> Self {
        RefineError::Parse {
            message: message.into(),
            input_len,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RefineError::Validation(_) => ErrorKind::Validation,
            RefineError::Model(_) => ErrorKind::Model,
            RefineError::Template(_) => ErrorKind::Template,
            RefineError::Parse { .. } => ErrorKind::Parse,
            RefineError::Execution(_) => ErrorKind::Execution,
        }
    }
}

impl From<RefineError> for String {
    fn from(err: RefineError) -> Self {
        err.to_string()
    }
}

/// Pipeline stage a service was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Render,
    Invoke,
    Interpret,
    Patch,
    Record,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validate => "validate",
            Stage::Render => "render",
            Stage::Invoke => "invoke",
            Stage::Interpret => "interpret",
            Stage::Patch => "patch",
            Stage::Record => "record",
        };
        f.write_str(name)
    }
}

/// The single error type surfaced by the services.
///
/// Carries the stage that failed and a truncated diagnostic, never the
/// full raw model output.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{stage} stage failed: {source}{}", diagnostic_suffix(.diagnostic))]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: RefineError,
    pub diagnostic: Option<String>,
}

fn diagnostic_suffix(diagnostic: &Option<String>) -> String {
    match diagnostic {
        Some(d) => format!(" [{}]", d),
        None => String::new(),
    }
}

impl StageError {
    pub fn new(stage: Stage, source: RefineError) -> Self {
        Self {
            stage,
            source,
            diagnostic: None,
        }
    }

    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = Some(diagnostic.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

impl From<StageError> for String {
    fn from(err: StageError) -> Self {
        err.to_string()
    }
}

/// Describe a raw model reply for error messages without echoing all of it.
///
/// Truncates on a char boundary so multi-byte text never panics.
pub fn snippet(raw: &str, max_chars: usize) -> String {
    let total = raw.chars().count();
    if total <= max_chars {
        format!("len={}: {}", raw.len(), raw)
    } else {
        let head: String = raw.chars().take(max_chars).collect();
        format!("len={}: {}...", raw.len(), head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(RefineError::Validation("x".into()).kind(), ErrorKind::Validation);
        assert_eq!(RefineError::Model("x".into()).kind(), ErrorKind::Model);
        assert_eq!(RefineError::Template("x".into()).kind(), ErrorKind::Template);
        assert_eq!(RefineError::parse("x", 3).kind(), ErrorKind::Parse);
        assert_eq!(RefineError::Execution("x".into()).kind(), ErrorKind::Execution);
    }

    #[test]
    fn test_parse_error_reports_length() {
        let err = RefineError::parse("no score found", 42);
        assert_eq!(
            err.to_string(),
            "Parse error: no score found (input length: 42)"
        );
    }

    #[test]
    fn test_stage_error_display() {
        let err = StageError::new(Stage::Interpret, RefineError::parse("bad", 10))
            .with_diagnostic("len=10");
        let msg: String = err.into();
        assert!(msg.starts_with("interpret stage failed: Parse error: bad"));
        assert!(msg.ends_with("[len=10]"));
    }

    #[test]
    fn test_snippet_truncates_on_char_boundary() {
        let raw = "评分很高评分很高";
        let s = snippet(raw, 3);
        assert!(s.starts_with(&format!("len={}", raw.len())));
        assert!(s.ends_with("评分很..."));
        assert_eq!(snippet("short", 10), "len=5: short");
    }
}
