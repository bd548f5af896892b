use chrono::{DateTime, Utc};
use tracing::info;

use super::{require_non_blank, ServiceContext};
use crate::error::StageError;
use crate::llm::{StreamHandler, TemplateContext};
use crate::normalize::{EvaluationMetadata, EvaluationResult, EvaluationType, Normalized};

#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    pub evaluation_type: EvaluationType,
    pub original_prompt: String,
    /// Required for `Optimized` and `Compare`.
    pub optimized_prompt: Option<String>,
    pub model_key: String,
    pub template_id: String,
    /// Extra template variables passed through untouched.
    pub context: TemplateContext,
    /// Recorded in the result metadata; defaults to now.
    pub timestamp: Option<DateTime<Utc>>,
}

impl EvaluationRequest {
    pub fn new(
        evaluation_type: EvaluationType,
        original_prompt: impl Into<String>,
        model_key: impl Into<String>,
        template_id: impl Into<String>,
    ) -> Self {
        Self {
            evaluation_type,
            original_prompt: original_prompt.into(),
            optimized_prompt: None,
            model_key: model_key.into(),
            template_id: template_id.into(),
            context: TemplateContext::new(),
            timestamp: None,
        }
    }

    pub fn with_optimized(mut self, optimized_prompt: impl Into<String>) -> Self {
        self.optimized_prompt = Some(optimized_prompt.into());
        self
    }

    fn validate(&self) -> Result<(), StageError> {
        require_non_blank(&self.model_key, "Model key")?;
        require_non_blank(&self.template_id, "Template id")?;
        match self.evaluation_type {
            EvaluationType::Original => require_non_blank(&self.original_prompt, "Original prompt"),
            EvaluationType::Optimized => {
                require_non_blank(self.optimized_prompt.as_deref().unwrap_or(""), "Optimized prompt")
            }
            EvaluationType::Compare => {
                require_non_blank(&self.original_prompt, "Original prompt")?;
                require_non_blank(self.optimized_prompt.as_deref().unwrap_or(""), "Optimized prompt")
            }
        }
    }

    fn template_context(&self) -> TemplateContext {
        let mut ctx = self
            .context
            .clone()
            .with("originalPrompt", self.original_prompt.as_str());
        if let Some(optimized) = &self.optimized_prompt {
            ctx = ctx.with("optimizedPrompt", optimized.as_str());
        }
        ctx
    }
}

/// Asks a model to score a prompt (or compare two) and interprets the reply.
#[derive(Clone)]
pub struct EvaluationService {
    ctx: ServiceContext,
}

impl EvaluationService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn evaluate(
        &self,
        request: &EvaluationRequest,
    ) -> Result<Normalized<EvaluationResult>, StageError> {
        request.validate()?;
        info!(
            "Evaluating ({:?}) with model {}",
            request.evaluation_type, request.model_key
        );
        let messages = self
            .ctx
            .render(&request.template_id, &request.template_context())?;
        let raw = self.ctx.invoke(&messages, &request.model_key).await?;
        self.interpret(request, &raw)
    }

    /// Same as [`evaluate`](Self::evaluate) over a token stream. Parsing
    /// starts only after the stream completed; `observer` sees every token.
    pub async fn evaluate_streaming(
        &self,
        request: &EvaluationRequest,
        observer: Option<&mut (dyn StreamHandler + '_)>,
    ) -> Result<Normalized<EvaluationResult>, StageError> {
        request.validate()?;
        info!(
            "Evaluating ({:?}, streaming) with model {}",
            request.evaluation_type, request.model_key
        );
        let messages = self
            .ctx
            .render(&request.template_id, &request.template_context())?;
        let raw = self
            .ctx
            .invoke_streaming(&messages, &request.model_key, observer)
            .await?;
        self.interpret(request, &raw)
    }

    fn interpret(
        &self,
        request: &EvaluationRequest,
        raw: &str,
    ) -> Result<Normalized<EvaluationResult>, StageError> {
        let normalized = self
            .ctx
            .normalizer
            .evaluation(raw, request.evaluation_type)
            .map_err(|e| self.ctx.interpret_error(e, raw))?;

        let metadata = EvaluationMetadata {
            timestamp: request.timestamp.unwrap_or_else(Utc::now),
            model_key: request.model_key.clone(),
            input_length: raw.len(),
            degraded: normalized.degraded,
        };
        info!(
            "Evaluation scored {} ({} dimensions, degraded: {})",
            normalized.value.score.overall,
            normalized.value.score.dimensions.len(),
            normalized.degraded
        );

        Ok(Normalized {
            value: normalized.value.with_metadata(metadata),
            diagnostics: normalized.diagnostics,
            degraded: normalized.degraded,
        })
    }
}
