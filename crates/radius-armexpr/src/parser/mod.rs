//! Recursive-descent parser for ARM expressions
//!
//! Each `parse_*` function starts at the cursor and leaves it just
//! past the node it produced. Leading whitespace is skipped, trailing
//! whitespace is left for the caller so spans never include it.

use crate::ast::{
    Accessor, Expression, FunctionCall, Identifier, NumberLiteral, PropertyAccess, Span,
    StringLiteral, SyntaxTree,
};
use crate::error::{ExprError, Result};
use crate::is_standard_arm_expression;
use crate::cursor::Cursor;

/// Parse a complete `[...]` expression string
pub fn parse(input: &str) -> Result<SyntaxTree> {
    if !is_standard_arm_expression(input) {
        return Err(ExprError::NotAnExpression {
            text: input.to_string(),
        });
    }

    let mut cursor = Cursor::new(input);
    cursor.expect('[')?;

    let expression = parse_expression(&mut cursor)?;

    cursor.skip_whitespace();
    cursor.expect(']')?;

    if let Some(found) = cursor.peek() {
        return Err(cursor.unexpected(found, "end of expression"));
    }

    Ok(SyntaxTree {
        span: Span::new(0, input.len()),
        expression,
    })
}

pub(crate) fn parse_expression(cursor: &mut Cursor) -> Result<Expression> {
    cursor.skip_whitespace();

    let primary = match cursor.peek() {
        None => return Err(cursor.end("an expression")),
        Some('\'') => Expression::StringLiteral(parse_string(cursor)?),
        Some(c) if c == '-' || c.is_ascii_digit() => {
            Expression::NumberLiteral(parse_number(cursor)?)
        }
        Some(c) if is_identifier_start(c) => {
            let identifier = parse_identifier(cursor)?;
            Expression::FunctionCall(parse_function_call(cursor, identifier)?)
        }
        Some(found) => return Err(cursor.unexpected(found, "an expression")),
    };

    parse_accessors(cursor, primary)
}

/// Wrap `base` in as many `.name` / `[index]` accessors as follow it
fn parse_accessors(cursor: &mut Cursor, mut base: Expression) -> Result<Expression> {
    loop {
        let saved = cursor.current;
        cursor.skip_whitespace();

        match cursor.peek() {
            Some('.') | Some('[') => {
                cursor.current = saved;
                base = Expression::PropertyAccess(parse_property_access(cursor, base)?);
            }
            _ => {
                cursor.current = saved;
                return Ok(base);
            }
        }
    }
}

/// Parse exactly one accessor applied to `base`
pub(crate) fn parse_property_access(
    cursor: &mut Cursor,
    base: Expression,
) -> Result<PropertyAccess> {
    cursor.skip_whitespace();
    let start = base.span().start;

    match cursor.bump() {
        Some('.') => {
            let identifier = parse_identifier(cursor)?;
            Ok(PropertyAccess {
                span: Span::between(start, identifier.span.end()),
                base: Box::new(base),
                accessor: Accessor::Member(identifier),
            })
        }
        Some('[') => {
            let index = parse_expression(cursor)?;
            cursor.skip_whitespace();
            cursor.expect(']')?;
            Ok(PropertyAccess {
                span: Span::between(start, cursor.current),
                base: Box::new(base),
                accessor: Accessor::Index(Box::new(index)),
            })
        }
        Some(found) => {
            cursor.current -= found.len_utf8();
            Err(cursor.unexpected(found, "'.' or '['"))
        }
        None => Err(cursor.end("'.' or '['")),
    }
}

/// Parse the argument list of a call whose name has already been consumed
pub(crate) fn parse_function_call(
    cursor: &mut Cursor,
    identifier: Identifier,
) -> Result<FunctionCall> {
    cursor.skip_whitespace();
    cursor.expect('(')?;

    let mut args = Vec::new();

    cursor.skip_whitespace();
    if cursor.peek() == Some(')') {
        cursor.bump();
    } else {
        loop {
            args.push(parse_expression(cursor)?);
            cursor.skip_whitespace();

            match cursor.peek() {
                Some(',') => {
                    cursor.bump();
                }
                Some(')') => {
                    cursor.bump();
                    break;
                }
                Some(found) => return Err(cursor.unexpected(found, "',' or ')'")),
                None => return Err(cursor.end("',' or ')'")),
            }
        }
    }

    Ok(FunctionCall {
        span: Span::between(identifier.span.start, cursor.current),
        identifier,
        args,
    })
}

pub(crate) fn parse_identifier(cursor: &mut Cursor) -> Result<Identifier> {
    cursor.skip_whitespace();
    let start = cursor.current;

    match cursor.peek() {
        Some(c) if is_identifier_start(c) => {}
        Some(found) => return Err(cursor.unexpected(found, "an identifier")),
        None => return Err(cursor.end("an identifier")),
    }

    while let Some(c) = cursor.peek() {
        if !is_identifier_part(c) {
            break;
        }
        cursor.bump();
    }

    Ok(Identifier {
        span: Span::between(start, cursor.current),
        text: cursor.text[start..cursor.current].to_string(),
    })
}

pub(crate) fn parse_string(cursor: &mut Cursor) -> Result<StringLiteral> {
    let start = cursor.current;
    cursor.expect('\'')?;

    let text = cursor.text;
    let unterminated = || ExprError::UnterminatedString {
        text: text.to_string(),
        position: start,
    };

    loop {
        match cursor.bump() {
            None => return Err(unterminated()),
            Some('\\') => {
                if cursor.bump().is_none() {
                    return Err(unterminated());
                }
            }
            Some('\'') => {
                if cursor.peek() == Some('\'') {
                    cursor.bump();
                } else {
                    break;
                }
            }
            Some(_) => {}
        }
    }

    Ok(StringLiteral {
        span: Span::between(start, cursor.current),
        text: text[start..cursor.current].to_string(),
    })
}

pub(crate) fn parse_number(cursor: &mut Cursor) -> Result<NumberLiteral> {
    let start = cursor.current;
    let invalid = |cursor: &Cursor| ExprError::InvalidNumber {
        text: cursor.text.to_string(),
        position: start,
    };

    if cursor.peek() == Some('-') {
        cursor.bump();
    }

    if !cursor.peek().is_some_and(|c| c.is_ascii_digit()) {
        return Err(invalid(cursor));
    }

    while cursor.peek().is_some_and(|c| c.is_ascii_digit()) {
        cursor.bump();
    }

    let value = cursor.text[start..cursor.current]
        .parse::<i64>()
        .map_err(|_| invalid(cursor))?;

    Ok(NumberLiteral {
        span: Span::between(start, cursor.current),
        value,
    })
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_part(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests;
