use shared::{chain::ChainError, draft::DraftError};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Conflict,
    Network,
}

/// Failure of a single workflow action.
///
/// None of these leave the controller in a half-updated state: the action
/// that failed is abandoned and previously loaded data stays as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("{entity} {id} was not found")]
    NotFound { entity: &'static str, id: String },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("network error: {0}")]
    Network(String),
}

impl WorkflowError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Conflict(_) => ErrorCategory::Conflict,
            Self::Network(_) => ErrorCategory::Network,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

impl From<DraftError> for WorkflowError {
    fn from(value: DraftError) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<ChainError> for WorkflowError {
    fn from(value: ChainError) -> Self {
        Self::Network(format!("backend returned an inconsistent replacement chain: {value}"))
    }
}
