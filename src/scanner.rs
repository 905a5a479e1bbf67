// src/scanner.rs
use serde_json::Number;

use crate::value::number_from_f64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    pub offset: usize,
    pub message: String,
}

/// Character cursor shared by the path tokenizer and the query filter parser.
pub struct Scanner<'a> {
    s: &'a str,
    i: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    pub fn position(&self) -> usize {
        self.i
    }

    /// Rewind (or skip) to a position previously returned by `position`.
    pub fn reset(&mut self, position: usize) {
        self.i = position;
    }

    pub fn error(&self, message: impl Into<String>) -> ScanError {
        ScanError {
            offset: self.i,
            message: message.into(),
        }
    }

    /// `[A-Za-z_][A-Za-z0-9_]*`, or `None` without consuming anything.
    pub fn scan_identifier(&mut self) -> Option<&'a str> {
        let start = self.i;
        match self.peek_char() {
            Some(c) if c == '_' || c.is_ascii_alphabetic() => self.i += 1,
            _ => return None,
        }
        while let Some(c) = self.peek_char() {
            if c == '_' || c.is_ascii_alphanumeric() {
                self.i += 1;
            } else {
                break;
            }
        }
        Some(&self.s[start..self.i])
    }

    pub fn parse_identifier(&mut self) -> Result<String, ScanError> {
        self.scan_identifier()
            .map(str::to_string)
            .ok_or_else(|| self.error("identifier expected"))
    }

    /// `-?digits(.digits)?`; rewinds and returns `None` when no digit follows.
    pub fn scan_number(&mut self) -> Option<&'a str> {
        let start = self.i;
        self.consume_char('-');
        let digits = self.i;
        self.skip_digits();
        if self.i == digits {
            self.i = start;
            return None;
        }
        let rest = &self.s[self.i..];
        let mut chars = rest.chars();
        if chars.next() == Some('.') && chars.next().is_some_and(|c| c.is_ascii_digit()) {
            self.i += 1;
            self.skip_digits();
        }
        Some(&self.s[start..self.i])
    }

    fn skip_digits(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.i += 1;
            } else {
                break;
            }
        }
    }

    pub fn parse_int(&mut self) -> Result<i64, ScanError> {
        let raw = self
            .scan_number()
            .ok_or_else(|| self.error("expected integer"))?;
        raw.parse::<i64>()
            .map_err(|_| self.error(format!("bad integer `{raw}`")))
    }

    pub fn parse_number_literal(&mut self) -> Result<Number, ScanError> {
        let raw = self
            .scan_number()
            .ok_or_else(|| self.error("number expected"))?;
        let f: f64 = raw
            .parse()
            .map_err(|_| self.error(format!("bad number `{raw}`")))?;
        number_from_f64(f).ok_or_else(|| self.error(format!("bad number `{raw}`")))
    }

    /// Single or double quoted. A backslash makes the next character literal.
    pub fn parse_quoted_string(&mut self) -> Result<String, ScanError> {
        let quote = self.peek_char().ok_or_else(|| self.error("string"))?;
        if quote != '\'' && quote != '"' {
            return Err(self.error("expected quoted string"));
        }
        let start = self.i;
        self.i += 1;
        let mut out = String::new();
        let mut escape = false;
        while let Some(c) = self.peek_char() {
            self.i += c.len_utf8();
            if escape {
                escape = false;
                out.push(c);
            } else if c == '\\' {
                escape = true;
            } else if c == quote {
                return Ok(out);
            } else {
                out.push(c);
            }
        }
        Err(ScanError {
            offset: start,
            message: "unterminated string".into(),
        })
    }

    pub fn expect(&mut self, c: char) -> Result<(), ScanError> {
        if self.consume_char(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", c)))
        }
    }

    pub fn consume_char(&mut self, c: char) -> bool {
        if self.peek_char() == Some(c) {
            self.i += c.len_utf8();
            true
        } else {
            false
        }
    }

    pub fn consume_str(&mut self, lit: &str) -> bool {
        if self.peek_str(lit) {
            self.i += lit.len();
            true
        } else {
            false
        }
    }

    /// Like `consume_str`, but only when `word` is not the prefix of a longer identifier.
    pub fn consume_keyword(&mut self, word: &str) -> bool {
        if !self.peek_str(word) {
            return false;
        }
        let next = self.s[self.i + word.len()..].chars().next();
        if next.is_some_and(|c| c == '_' || c.is_ascii_alphanumeric()) {
            return false;
        }
        self.i += word.len();
        true
    }

    pub fn peek_char(&self) -> Option<char> {
        self.s[self.i..].chars().next()
    }

    pub fn peek_str(&self, lit: &str) -> bool {
        self.s[self.i..].starts_with(lit)
    }

    pub fn skip_ws(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.i += c.len_utf8();
            } else {
                break;
            }
        }
    }

    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }
}
