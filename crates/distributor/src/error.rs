//! Distributor error types

use thiserror::Error;

/// Distributor-specific errors
#[derive(Debug, Error)]
pub enum DistributorError {
    /// Handler could not be built from its interface spec
    #[error("failed to create handler '{name}': {message}")]
    HandlerCreation { name: String, message: String },

    /// Handler error (from contract)
    #[error("handler error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DistributorError {
    /// Create a handler creation error
    pub fn handler_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HandlerCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
