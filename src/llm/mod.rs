//! Interfaces of the LLM-side collaborators: the transport that talks to a
//! model and the renderer that builds the messages it is sent.

mod stream;
mod template;
mod transport;
mod types;

pub use stream::{BufferedStream, StreamHandler};
pub use template::{TemplateContext, TemplateRenderer};
pub use transport::LlmTransport;
pub use types::{Message, Role, TransportError};
