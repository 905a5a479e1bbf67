use crate::errors::{Result, StoreError};
use crate::scanner::Scanner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    Single,
    Double,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Identifier(String),
    Number { value: f64, raw: String },
    Quoted { value: String, quote: Quote },
    Operator(&'static str),
    Comparator(&'static str),
    Keyword(&'static str),
    Boolean(bool),
    Paren(char),
}

// Tried in this order; within a class longer symbols come first.
const OPERATORS: [&str; 5] = ["..", ".", ",", ":", "?"];
const COMPARATORS: [&str; 6] = [">=", ">", "<=", "<", "==", "!="];
const KEYWORDS: [&str; 2] = ["$", "@"];

/// Lex a path expression. Whitespace between tokens is ignored.
pub fn tokenize(path: &str) -> Result<Vec<Token>> {
    let mut scanner = Scanner::new(path);
    let mut tokens = Vec::new();

    loop {
        scanner.skip_ws();
        if scanner.eof() {
            break;
        }
        let offset = scanner.position();
        let token = if let Some(token) = tokenize_symbol(&mut scanner) {
            token
        } else if let Some(name) = scanner.scan_identifier() {
            Token::Identifier(name.to_string())
        } else if let Some(token) = tokenize_number(&mut scanner) {
            token
        } else if matches!(scanner.peek_char(), Some('\'') | Some('"')) {
            tokenize_quoted(&mut scanner).map_err(|e| StoreError::Tokenize {
                path: path.to_string(),
                offset: e.offset,
            })?
        } else {
            return Err(StoreError::Tokenize {
                path: path.to_string(),
                offset,
            });
        };
        tokens.push(token);
    }

    Ok(tokens)
}

fn tokenize_symbol(scanner: &mut Scanner) -> Option<Token> {
    if let Some(op) = OPERATORS.into_iter().find(|op| scanner.consume_str(op)) {
        return Some(Token::Operator(op));
    }
    if let Some(cmp) = COMPARATORS.into_iter().find(|cmp| scanner.consume_str(cmp)) {
        return Some(Token::Comparator(cmp));
    }
    if let Some(kw) = KEYWORDS.into_iter().find(|kw| scanner.consume_str(kw)) {
        return Some(Token::Keyword(kw));
    }
    if scanner.consume_keyword("true") {
        return Some(Token::Boolean(true));
    }
    if scanner.consume_keyword("false") {
        return Some(Token::Boolean(false));
    }
    ['[', ']']
        .into_iter()
        .find(|c| scanner.consume_char(*c))
        .map(Token::Paren)
}

fn tokenize_number(scanner: &mut Scanner) -> Option<Token> {
    let start = scanner.position();
    let raw = scanner.scan_number()?;
    match raw.parse::<f64>() {
        Ok(value) => Some(Token::Number {
            value,
            raw: raw.to_string(),
        }),
        Err(_) => {
            scanner.reset(start);
            None
        }
    }
}

fn tokenize_quoted(scanner: &mut Scanner) -> std::result::Result<Token, crate::scanner::ScanError> {
    let quote = match scanner.peek_char() {
        Some('"') => Quote::Double,
        _ => Quote::Single,
    };
    let value = scanner.parse_quoted_string()?;
    Ok(Token::Quoted { value, quote })
}
