//! Provider error types

use thiserror::Error;

/// Provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("could not find a provider matching import {0}")]
    ImportNotFound(String),

    #[error("could not find a provider supporting {0}")]
    NotRegistered(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("invalid resource id '{id}': {reason}")]
    InvalidResourceId { id: String, reason: String },

    #[error("custom action '{action}' is not supported for {id}")]
    UnsupportedAction { id: String, action: String },

    #[error("operation failed: {0}")]
    OperationFailed(String),

    #[error("state file error: {0}")]
    StateError(String),

    #[error("lock acquisition failed: {0}")]
    LockError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProviderError {
    /// True when the error means the environment has no provider for a
    /// resource, as opposed to a provider call that failed
    pub fn is_routing(&self) -> bool {
        matches!(
            self,
            ProviderError::ImportNotFound(_) | ProviderError::NotRegistered(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
