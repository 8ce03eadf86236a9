//! Character cursor used by the parser

use crate::error::ExprError;

pub(crate) struct Cursor<'a> {
    pub(crate) text: &'a str,
    pub(crate) current: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self { text, current: 0 }
    }

    #[cfg(test)]
    pub(crate) fn at(text: &'a str, current: usize) -> Self {
        Self { text, current }
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.text[self.current..].chars().next()
    }

    pub(crate) fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.current += c.len_utf8();
        Some(c)
    }

    pub(crate) fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.current += c.len_utf8();
        }
    }

    /// Consume `expected` or fail
    pub(crate) fn expect(&mut self, expected: char) -> Result<(), ExprError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.current += c.len_utf8();
                Ok(())
            }
            Some(found) => Err(self.unexpected(found, format!("'{}'", expected))),
            None => Err(self.end(format!("'{}'", expected))),
        }
    }

    pub(crate) fn unexpected(&self, found: char, expected: impl Into<String>) -> ExprError {
        ExprError::UnexpectedChar {
            text: self.text.to_string(),
            position: self.current,
            found,
            expected: expected.into(),
        }
    }

    pub(crate) fn end(&self, expected: impl Into<String>) -> ExprError {
        ExprError::UnexpectedEnd {
            text: self.text.to_string(),
            expected: expected.into(),
        }
    }
}
