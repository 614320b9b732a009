//! Recursive-descent decoder for `<PRI>key=value key="quoted value" ...` lines.
//!
//! ```text
//! line       := ws* priority ws* assignment (ws+ assignment)* ws*
//! priority   := '<' DIGIT+ '>'
//! assignment := ALPHA+ '=' value
//! value      := quoted | token
//! quoted     := '"' (ESCAPE | '""' | [^"\r\n])* '"'
//!             | '\'' (ESCAPE | "''" | [^'\r\n])* '\''
//! token      := ALNUM+ (SEPARATOR+ ALNUM+)*
//! SEPARATOR  := any ASCII punctuation except '"'
//! ```
//!
//! The whole line must be consumed. Quoted values are stored without their
//! enclosing quotes; escape sequences inside, backslash or doubled quote,
//! are kept as written.

use std::collections::HashSet;

use super::model::{DecodeError, DecodeErrorKind, Fields, Record};

/// Decode one raw message. Failures are reported inside the returned
/// [`Record`], never as a panic or `Err`.
pub fn decode(raw: &str) -> Record {
    let mut grammar = Grammar::new(raw);
    match grammar.line() {
        Ok((priority, fields)) => Record::decoded(raw, priority, fields),
        Err(err) => Record::errored(raw, grammar.priority, err),
    }
}

fn is_separator(b: u8) -> bool {
    b.is_ascii_punctuation() && b != b'"'
}

struct Grammar<'a> {
    line: &'a str,
    bytes: &'a [u8],
    pos: usize,
    priority: Option<u32>,
}

impl<'a> Grammar<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            line,
            bytes: line.as_bytes(),
            pos: 0,
            priority: None,
        }
    }

    fn line(&mut self) -> Result<(u32, Fields), DecodeError> {
        self.skip_whitespace();
        if self.at_end() {
            return Err(self.fail(DecodeErrorKind::Empty));
        }

        let priority = self.priority()?;
        self.priority = Some(priority);
        self.skip_whitespace();

        let mut fields = Fields::default();
        let mut seen = HashSet::new();
        loop {
            let start = self.pos;
            let (key, value) = self.assignment()?;
            if !seen.insert(key) {
                return Err(DecodeError::at(
                    self.line,
                    start,
                    DecodeErrorKind::DuplicateKey(key.to_string()),
                ));
            }
            fields.push(key.to_string(), value.to_string());

            let gap = self.skip_whitespace();
            if self.at_end() {
                break;
            }
            if gap == 0 {
                return Err(self.fail(DecodeErrorKind::ExpectedWhitespace));
            }
        }

        Ok((priority, fields))
    }

    fn priority(&mut self) -> Result<u32, DecodeError> {
        if self.peek() != Some(b'<') {
            return Err(self.fail(DecodeErrorKind::MissingPriority));
        }
        self.pos += 1;

        let digits_at = self.pos;
        let digits = self.take_while(|b| b.is_ascii_digit());
        if digits.is_empty() {
            return Err(self.fail(DecodeErrorKind::InvalidPriority));
        }
        if self.peek() != Some(b'>') {
            return Err(self.fail(DecodeErrorKind::UnterminatedPriority));
        }
        let value = digits
            .parse::<u32>()
            .map_err(|_| DecodeError::at(self.line, digits_at, DecodeErrorKind::PriorityOutOfRange))?;
        self.pos += 1;
        Ok(value)
    }

    fn assignment(&mut self) -> Result<(&'a str, &'a str), DecodeError> {
        let key = self.take_while(|b| b.is_ascii_alphabetic());
        if key.is_empty() {
            return Err(self.fail(DecodeErrorKind::ExpectedKey));
        }
        if self.peek() != Some(b'=') {
            return Err(self.fail(DecodeErrorKind::ExpectedEquals));
        }
        self.pos += 1;

        let value = match self.peek() {
            Some(quote @ (b'"' | b'\'')) => self.quoted(quote)?,
            _ => self.token()?,
        };
        Ok((key, value))
    }

    fn quoted(&mut self, quote: u8) -> Result<&'a str, DecodeError> {
        let open = self.pos;
        self.pos += 1;
        let start = self.pos;

        while let Some(b) = self.peek() {
            match b {
                b'\\' => self.pos = (self.pos + 2).min(self.bytes.len()),
                b'\r' | b'\n' => break,
                _ if b == quote && self.bytes.get(self.pos + 1) == Some(&quote) => self.pos += 2,
                _ if b == quote => {
                    let inner = &self.line[start..self.pos];
                    self.pos += 1;
                    return Ok(inner);
                }
                _ => self.pos += 1,
            }
        }

        Err(DecodeError::at(self.line, open, DecodeErrorKind::UnterminatedQuote))
    }

    fn token(&mut self) -> Result<&'a str, DecodeError> {
        let start = self.pos;
        if self.take_while(|b| b.is_ascii_alphanumeric()).is_empty() {
            return Err(self.fail(DecodeErrorKind::ExpectedValue));
        }

        loop {
            let mark = self.pos;
            if self.take_while(is_separator).is_empty() {
                break;
            }
            // A separator run only belongs to the token if more alphanumerics follow.
            if self.take_while(|b| b.is_ascii_alphanumeric()).is_empty() {
                self.pos = mark;
                break;
            }
        }

        Ok(&self.line[start..self.pos])
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        &self.line[start..self.pos]
    }

    fn skip_whitespace(&mut self) -> usize {
        self.take_while(|b| b.is_ascii_whitespace()).len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn fail(&self, kind: DecodeErrorKind) -> DecodeError {
        DecodeError::at(self.line, self.pos, kind)
    }
}
