use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from tool registration, validation, and execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("tool already registered: {0}")]
    Duplicate(String),
    #[error("invalid argument '{field}': {reason}")]
    InvalidArgument { field: String, reason: String },
    #[error("execution failed: {0}")]
    Execution(String),
}

impl ToolError {
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }
}
