use async_trait::async_trait;

use super::stream::StreamHandler;
use super::types::{Message, TransportError};

/// Sends messages to a configured model.
///
/// Implementations own networking, retries, timeouts and cancellation.
#[async_trait]
pub trait LlmTransport: Send + Sync {
    /// Send and wait for the full reply.
    async fn send_message(
        &self,
        messages: &[Message],
        model_key: &str,
    ) -> Result<String, TransportError>;

    /// Send and deliver the reply token by token to `handler`.
    ///
    /// Must end with exactly one `on_complete` or `on_error` call. The
    /// returned error, if any, is the same one passed to `on_error`.
    async fn send_message_stream(
        &self,
        messages: &[Message],
        model_key: &str,
        handler: &mut (dyn StreamHandler + '_),
    ) -> Result<(), TransportError>;
}
