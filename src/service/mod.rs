//! Services that run the full round trip: render, invoke, interpret and,
//! for iterations, patch and record.
//!
//! Every failure leaves a service as a [`StageError`] naming the stage.

mod evaluation;
mod iteration;
mod variables;

pub use evaluation::{EvaluationRequest, EvaluationService};
pub use iteration::{IterationOutcome, IterationService};
pub use variables::{
    VariableExtractionRequest, VariableExtractionService, VariableValueRequest,
    VariableValueService,
};

use std::sync::Arc;

use tracing::{debug, error};

use crate::error::{snippet, RefineError, Stage, StageError};
use crate::llm::{BufferedStream, LlmTransport, Message, StreamHandler, TemplateContext, TemplateRenderer};
use crate::normalize::Normalizer;

/// Shared collaborators of the LLM-backed services.
#[derive(Clone)]
pub struct ServiceContext {
    pub transport: Arc<dyn LlmTransport>,
    pub renderer: Arc<dyn TemplateRenderer>,
    pub normalizer: Arc<Normalizer>,
}

impl ServiceContext {
    pub fn new(
        transport: Arc<dyn LlmTransport>,
        renderer: Arc<dyn TemplateRenderer>,
        normalizer: Arc<Normalizer>,
    ) -> Self {
        Self {
            transport,
            renderer,
            normalizer,
        }
    }

    fn render(&self, template_id: &str, context: &TemplateContext) -> Result<Vec<Message>, StageError> {
        let messages = self
            .renderer
            .render(template_id, context)
            .map_err(|e| StageError::new(Stage::Render, RefineError::Template(e)))?;
        debug!("Rendered template '{}' into {} messages", template_id, messages.len());
        Ok(messages)
    }

    async fn invoke(&self, messages: &[Message], model_key: &str) -> Result<String, StageError> {
        self.transport
            .send_message(messages, model_key)
            .await
            .map_err(|e| {
                error!("LLM call to '{}' failed: {}", model_key, e);
                StageError::new(Stage::Invoke, e.into())
            })
    }

    /// Stream a reply, optionally forwarding tokens, and return it only
    /// once the stream completed.
    async fn invoke_streaming(
        &self,
        messages: &[Message],
        model_key: &str,
        observer: Option<&mut (dyn StreamHandler + '_)>,
    ) -> Result<String, StageError> {
        let mut buffer = match observer {
            Some(observer) => BufferedStream::forwarding_to(observer),
            None => BufferedStream::new(),
        };
        let sent = self
            .transport
            .send_message_stream(messages, model_key, &mut buffer)
            .await;

        sent.and_then(|_| buffer.finish()).map_err(|e| {
            error!("LLM stream from '{}' failed: {}", model_key, e);
            StageError::new(Stage::Invoke, e.into())
        })
    }

    /// Wrap an interpretation failure with a bounded excerpt of the reply.
    fn interpret_error(&self, err: RefineError, raw: &str) -> StageError {
        let limit = self.normalizer.config().diagnostic_snippet_chars;
        StageError::new(Stage::Interpret, err).with_diagnostic(snippet(raw, limit))
    }
}

/// Reject blank identifiers before anything is rendered or sent.
fn require_non_blank(value: &str, what: &str) -> Result<(), StageError> {
    if value.trim().is_empty() {
        return Err(StageError::new(
            Stage::Validate,
            RefineError::Validation(format!("{} must not be empty", what)),
        ));
    }
    Ok(())
}
