use tracing::info;

use super::{require_non_blank, ServiceContext};
use crate::error::{Stage, StageError};
use crate::llm::TemplateContext;
use crate::normalize::{validate_requested_names, Normalized, VariableExtractionResult, VariableValueResult};

#[derive(Debug, Clone)]
pub struct VariableExtractionRequest {
    pub prompt: String,
    /// Names the caller already defines; the model's suggestions for these
    /// are dropped.
    pub existing_variable_names: Vec<String>,
    pub model_key: String,
    pub template_id: String,
    pub context: TemplateContext,
}

impl VariableExtractionRequest {
    pub fn new(
        prompt: impl Into<String>,
        model_key: impl Into<String>,
        template_id: impl Into<String>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            existing_variable_names: Vec::new(),
            model_key: model_key.into(),
            template_id: template_id.into(),
            context: TemplateContext::new(),
        }
    }

    pub fn with_existing(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.existing_variable_names = names.into_iter().map(Into::into).collect();
        self
    }
}

/// Finds the parts of a prompt worth turning into variables.
#[derive(Clone)]
pub struct VariableExtractionService {
    ctx: ServiceContext,
}

impl VariableExtractionService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn extract(
        &self,
        request: &VariableExtractionRequest,
    ) -> Result<Normalized<VariableExtractionResult>, StageError> {
        require_non_blank(&request.prompt, "Prompt")?;
        require_non_blank(&request.model_key, "Model key")?;
        require_non_blank(&request.template_id, "Template id")?;
        info!("Extracting variables with model {}", request.model_key);

        let context = request
            .context
            .clone()
            .with("prompt", request.prompt.as_str())
            .with("existingVariableNames", request.existing_variable_names.join(", "));
        let messages = self.ctx.render(&request.template_id, &context)?;
        let raw = self.ctx.invoke(&messages, &request.model_key).await?;

        let normalized = self
            .ctx
            .normalizer
            .variable_extraction(&raw, &request.existing_variable_names)
            .map_err(|e| self.ctx.interpret_error(e, &raw))?;
        info!(
            "Extracted {} variables ({} dropped)",
            normalized.value.variables.len(),
            normalized.diagnostics.len()
        );
        Ok(normalized)
    }
}

#[derive(Debug, Clone)]
pub struct VariableValueRequest {
    pub prompt: String,
    /// Names to generate values for; the result follows this order.
    pub variable_names: Vec<String>,
    pub model_key: String,
    pub template_id: String,
    pub context: TemplateContext,
}

impl VariableValueRequest {
    pub fn new(
        prompt: impl Into<String>,
        variable_names: impl IntoIterator<Item = impl Into<String>>,
        model_key: impl Into<String>,
        template_id: impl Into<String>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            variable_names: variable_names.into_iter().map(Into::into).collect(),
            model_key: model_key.into(),
            template_id: template_id.into(),
            context: TemplateContext::new(),
        }
    }
}

/// Asks a model to fill in values for a prompt's variables.
#[derive(Clone)]
pub struct VariableValueService {
    ctx: ServiceContext,
}

impl VariableValueService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// The result always holds one value per requested name, in order.
    pub async fn generate(
        &self,
        request: &VariableValueRequest,
    ) -> Result<Normalized<VariableValueResult>, StageError> {
        require_non_blank(&request.model_key, "Model key")?;
        require_non_blank(&request.template_id, "Template id")?;
        let names = validate_requested_names(&request.variable_names)
            .map_err(|e| StageError::new(Stage::Validate, e))?;
        info!(
            "Generating {} variable values with model {}",
            names.len(),
            request.model_key
        );

        let context = request
            .context
            .clone()
            .with("prompt", request.prompt.as_str())
            .with("variableNames", names.join(", "));
        let messages = self.ctx.render(&request.template_id, &context)?;
        let raw = self.ctx.invoke(&messages, &request.model_key).await?;

        self.ctx
            .normalizer
            .variable_values(&raw, &names)
            .map_err(|e| self.ctx.interpret_error(e, &raw))
    }
}
