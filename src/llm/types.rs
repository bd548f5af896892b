use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::RefineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One chat message sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Failure reported by an LLM transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// No model configuration exists for the requested key.
    #[error("Model '{0}' not found")]
    ModelNotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    /// The provider answered with an error.
    #[error("API error: {0}")]
    Api(String),
}

impl From<TransportError> for RefineError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::ModelNotFound(_) => RefineError::Model(err.to_string()),
            other => RefineError::Execution(other.to_string()),
        }
    }
}
