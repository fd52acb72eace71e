//! Error types for code generation

use thiserror::Error;

/// Error type for code generation failures
#[derive(Debug, Clone, Error)]
#[error("Codegen error: {message}")]
pub struct CodegenError {
    pub message: String,
}

impl CodegenError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }

    /// Prefixes the message with the function being compiled.
    pub fn in_function(self, name: &str) -> Self {
        Self {
            message: format!("in function '{}': {}", name, self.message),
        }
    }
}
