//! ARM template error types

use radius_armexpr::ExprError;
use radius_providers::ProviderError;
use thiserror::Error;

/// Broad classification of an [`ArmError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Template JSON or expression syntax is invalid
    Parse,
    /// Template refers to something it does not define
    Validation,
    /// An expression failed while being evaluated
    Evaluation,
    /// The environment has no provider for a resource
    ProviderRouting,
    /// A provider call failed
    ProviderOperation,
    Cancelled,
}

#[derive(Error, Debug)]
pub enum ArmError {
    #[error("failed to parse template: {0}")]
    TemplateParse(#[from] serde_json::Error),

    #[error(transparent)]
    Expression(#[from] ExprError),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Evaluation(String),

    #[error("cyclic dependency detected: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    #[error(transparent)]
    ProviderRouting(ProviderError),

    #[error("failed to deploy {resource_type} '{name}': {source}")]
    ProviderOperation {
        resource_type: String,
        name: String,
        #[source]
        source: ProviderError,
    },

    #[error("deployment was cancelled")]
    Cancelled,
}

impl ArmError {
    pub fn validation(message: impl Into<String>) -> Self {
        ArmError::Validation(message.into())
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        ArmError::Evaluation(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ArmError::TemplateParse(_) | ArmError::Expression(_) => ErrorKind::Parse,
            ArmError::Validation(_) | ArmError::CyclicDependency(_) => ErrorKind::Validation,
            ArmError::Evaluation(_) => ErrorKind::Evaluation,
            ArmError::ProviderRouting(_) => ErrorKind::ProviderRouting,
            ArmError::ProviderOperation { .. } => ErrorKind::ProviderOperation,
            ArmError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Wrap a provider failure for the resource it happened on
    ///
    /// Routing failures keep their own classification.
    pub(crate) fn provider(
        resource_type: impl Into<String>,
        name: impl Into<String>,
        source: ProviderError,
    ) -> Self {
        if source.is_routing() {
            return ArmError::ProviderRouting(source);
        }

        ArmError::ProviderOperation {
            resource_type: resource_type.into(),
            name: name.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ArmError>;
