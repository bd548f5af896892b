use tracing::{debug, warn};

use super::types::TransportError;

/// Receives streamed output from a transport.
///
/// A transport calls `on_token` zero or more times, then exactly one of
/// `on_complete` or `on_error`.
pub trait StreamHandler: Send {
    fn on_token(&mut self, token: &str);
    fn on_complete(&mut self);
    fn on_error(&mut self, error: &TransportError);
}

#[derive(Debug, Clone, PartialEq)]
enum StreamState {
    Open,
    Complete,
    Failed(TransportError),
}

/// Accumulates a token stream into one reply.
///
/// The text is only released after `on_complete`; an error discards
/// whatever was buffered. Tokens can be forwarded to another handler
/// (e.g. a UI) as they arrive.
pub struct BufferedStream<'a> {
    buffer: String,
    state: StreamState,
    tokens: usize,
    forward: Option<&'a mut (dyn StreamHandler + 'a)>,
}

impl Default for BufferedStream<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> BufferedStream<'a> {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            state: StreamState::Open,
            tokens: 0,
            forward: None,
        }
    }

    pub fn forwarding_to(forward: &'a mut (dyn StreamHandler + 'a)) -> Self {
        Self {
            buffer: String::new(),
            state: StreamState::Open,
            tokens: 0,
            forward: Some(forward),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state == StreamState::Complete
    }

    /// The assembled reply, or the error that ended the stream.
    ///
    /// A stream the transport never closed is reported as an API error.
    pub fn finish(self) -> Result<String, TransportError> {
        match self.state {
            StreamState::Complete => Ok(self.buffer),
            StreamState::Failed(err) => Err(err),
            StreamState::Open => Err(TransportError::Api(
                "stream ended without completion".to_string(),
            )),
        }
    }
}

impl StreamHandler for BufferedStream<'_> {
    fn on_token(&mut self, token: &str) {
        if self.state != StreamState::Open {
            return;
        }
        self.buffer.push_str(token);
        self.tokens += 1;
        if let Some(forward) = self.forward.as_mut() {
            forward.on_token(token);
        }
    }

    fn on_complete(&mut self) {
        if self.state != StreamState::Open {
            return;
        }
        debug!(
            "Stream complete: {} tokens, {} bytes",
            self.tokens,
            self.buffer.len()
        );
        self.state = StreamState::Complete;
        if let Some(forward) = self.forward.as_mut() {
            forward.on_complete();
        }
    }

    fn on_error(&mut self, error: &TransportError) {
        if self.state != StreamState::Open {
            return;
        }
        warn!(
            "Stream failed after {} bytes, discarding buffer: {}",
            self.buffer.len(),
            error
        );
        self.buffer.clear();
        self.state = StreamState::Failed(error.clone());
        if let Some(forward) = self.forward.as_mut() {
            forward.on_error(error);
        }
    }
}
