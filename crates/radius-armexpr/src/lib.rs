//! ARM template expression language
//!
//! String values inside an ARM deployment template may carry an embedded
//! expression, written between square brackets:
//!
//! ```text
//! "[reference(resourceId('Microsoft.CustomProviders/resourceProviders/Applications', 'radius', 'app')).status]"
//! ```
//!
//! This crate recognises such strings and parses them into a small spanned
//! syntax tree. Evaluation lives in `radius-armtemplate`; nothing here knows
//! what a function *means*.
//!
//! # Grammar
//!
//! ```text
//! tree     := '[' expr ']'
//! expr     := primary accessor*
//! primary  := string | number | identifier '(' (expr (',' expr)*)? ')'
//! accessor := '.' identifier | '[' expr ']'
//! string   := "'" (char | "\'" | "\\" | "''")* "'"
//! ```
//!
//! Whitespace is allowed between tokens. A value starting with `[[` is an
//! escaped literal, not an expression.

pub mod ast;
pub mod error;
mod cursor;
mod parser;

pub use ast::{
    Accessor, Expression, FunctionCall, Identifier, NumberLiteral, PropertyAccess, Span,
    StringLiteral, SyntaxTree,
};
pub use error::{ExprError, Result};
pub use parser::parse;

/// Returns true when `input` is written as an ARM expression.
///
/// This is a cheap syntactic check run before [`parse`]: the value must be
/// wrapped in `[` ... `]` and must not start with the `[[` escape.
pub fn is_standard_arm_expression(input: &str) -> bool {
    input.len() >= 2 && input.starts_with('[') && !input.starts_with("[[") && input.ends_with(']')
}

/// Strips the `[[` escape from a literal value.
///
/// `"[[not an expression]"` becomes `"[not an expression]"`; any other input
/// is returned unchanged.
pub fn unescape_literal(input: &str) -> &str {
    if input.starts_with("[[") {
        &input[1..]
    } else {
        input
    }
}
