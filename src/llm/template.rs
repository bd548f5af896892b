use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::Message;

/// Named values a template is rendered with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateContext {
    pub variables: BTreeMap<String, String>,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }
}

/// Turns a template id and context into the messages sent to the model.
/// The error string is surfaced unchanged as a template error.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template_id: &str, context: &TemplateContext) -> Result<Vec<Message>, String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builder() {
        let ctx = TemplateContext::new()
            .with("prompt", "Write a haiku")
            .with("prompt", "Write a sonnet");
        assert_eq!(ctx.get("prompt"), Some("Write a sonnet"));
        assert_eq!(ctx.get("missing"), None);
    }
}
