//! Syntax tree for ARM expressions

use std::fmt;

/// Byte range of a node within the original expression string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub length: usize,
}

impl Span {
    pub fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }

    /// Span covering `start..end`
    pub fn between(start: usize, end: usize) -> Self {
        Self {
            start,
            length: end.saturating_sub(start),
        }
    }

    pub fn end(&self) -> usize {
        self.start + self.length
    }
}

/// A parsed `[...]` expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    pub span: Span,
    pub expression: Expression,
}

/// Expression node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    StringLiteral(StringLiteral),
    NumberLiteral(NumberLiteral),
    FunctionCall(FunctionCall),
    PropertyAccess(PropertyAccess),
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::StringLiteral(node) => node.span,
            Expression::NumberLiteral(node) => node.span,
            Expression::FunctionCall(node) => node.span,
            Expression::PropertyAccess(node) => node.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub span: Span,
    pub text: String,
}

/// Single-quoted string literal
///
/// `text` is the raw source including the quotes, use [`StringLiteral::value`]
/// for the unescaped contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteral {
    pub span: Span,
    pub text: String,
}

impl StringLiteral {
    /// Literal contents with quotes stripped and escapes resolved
    pub fn value(&self) -> String {
        let inner = self
            .text
            .strip_prefix('\'')
            .and_then(|s| s.strip_suffix('\''))
            .unwrap_or(&self.text);

        let mut value = String::with_capacity(inner.len());
        let mut chars = inner.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(next) = chars.next() {
                        value.push(next);
                    }
                }
                '\'' => {
                    // '' is an escaped quote
                    if chars.peek() == Some(&'\'') {
                        chars.next();
                    }
                    value.push('\'');
                }
                c => value.push(c),
            }
        }
        value
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberLiteral {
    pub span: Span,
    pub value: i64,
}

/// `name(arg, ...)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    pub span: Span,
    pub identifier: Identifier,
    pub args: Vec<Expression>,
}

/// `base.identifier` or `base[expr]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyAccess {
    pub span: Span,
    pub base: Box<Expression>,
    pub accessor: Accessor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accessor {
    Member(Identifier),
    Index(Box<Expression>),
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::StringLiteral(node) => write!(f, "{}", node.text),
            Expression::NumberLiteral(node) => write!(f, "{}", node.value),
            Expression::FunctionCall(node) => {
                write!(f, "{}(", node.identifier.text)?;
                for (i, arg) in node.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expression::PropertyAccess(node) => match &node.accessor {
                Accessor::Member(identifier) => write!(f, "{}.{}", node.base, identifier.text),
                Accessor::Index(index) => write!(f, "{}[{}]", node.base, index),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(text: &str) -> StringLiteral {
        StringLiteral {
            span: Span::new(0, text.len()),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_string_literal_value() {
        assert_eq!(literal("'foo'").value(), "foo");
        assert_eq!(literal("''").value(), "");
        assert_eq!(literal(r"'\''").value(), "'");
        assert_eq!(literal(r"'\\'").value(), "\\");
        assert_eq!(literal("'it''s'").value(), "it's");
    }

    #[test]
    fn test_span_between() {
        let span = Span::between(3, 10);
        assert_eq!(span, Span::new(3, 7));
        assert_eq!(span.end(), 10);
    }
}
