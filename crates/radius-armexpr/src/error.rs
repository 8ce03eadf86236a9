//! Expression parse errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    #[error("'{text}' is not an ARM expression")]
    NotAnExpression { text: String },

    #[error("unexpected end of expression '{text}', expected {expected}")]
    UnexpectedEnd { text: String, expected: String },

    #[error("unexpected character '{found}' at position {position} in '{text}', expected {expected}")]
    UnexpectedChar {
        text: String,
        position: usize,
        found: char,
        expected: String,
    },

    #[error("unterminated string literal starting at position {position} in '{text}'")]
    UnterminatedString { text: String, position: usize },

    #[error("invalid number literal at position {position} in '{text}'")]
    InvalidNumber { text: String, position: usize },
}

impl ExprError {
    /// Byte offset of the failure, if known
    pub fn position(&self) -> Option<usize> {
        match self {
            ExprError::NotAnExpression { .. } | ExprError::UnexpectedEnd { .. } => None,
            ExprError::UnexpectedChar { position, .. }
            | ExprError::UnterminatedString { position, .. }
            | ExprError::InvalidNumber { position, .. } => Some(*position),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExprError>;
