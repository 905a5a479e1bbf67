use crate::errors::{Result, StoreError};
use crate::path::ast::{Constraint, ConstraintOp, PathNode};
use crate::path::tokenizer::{tokenize, Quote, Token};

/// Parse a path expression into a `PathNode::Path`.
pub fn parse(path: &str) -> Result<PathNode> {
    let mut parser = Parser {
        path,
        tokens: tokenize(path)?,
        i: 0,
    };
    let node = parser
        .parse_path()?
        .ok_or_else(|| StoreError::parse(path, "expected a path"))?;
    if let Some(token) = parser.peek() {
        return Err(StoreError::parse(
            path,
            format!("unexpected {token:?} after path"),
        ));
    }
    Ok(node)
}

/// Recursive descent over the token stream. Rules that may fail to match save
/// `i` up front and restore it before returning `None`.
struct Parser<'a> {
    path: &'a str,
    tokens: Vec<Token>,
    i: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: impl Into<String>) -> StoreError {
        StoreError::parse(self.path, message)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.i)
    }

    fn eof(&self) -> bool {
        self.i >= self.tokens.len()
    }

    /// Consume the next token if `pred` accepts it.
    fn next_if<T>(&mut self, pred: impl FnOnce(&Token) -> Option<T>) -> Option<T> {
        let out = self.peek().and_then(pred)?;
        self.i += 1;
        Some(out)
    }

    fn match_operator(&mut self, symbol: &str) -> bool {
        self.next_if(|t| matches!(t, Token::Operator(s) if *s == symbol).then_some(()))
            .is_some()
    }

    fn probe_paren(&self, c: char) -> bool {
        matches!(self.peek(), Some(Token::Paren(p)) if *p == c)
    }

    fn match_paren(&mut self, c: char) -> bool {
        if self.probe_paren(c) {
            self.i += 1;
            true
        } else {
            false
        }
    }

    fn parse_attribute(&mut self) -> Option<PathNode> {
        self.next_if(|t| match t {
            Token::Identifier(name) => Some(PathNode::Attribute(name.clone())),
            Token::Quoted {
                value,
                quote: Quote::Single,
            } => Some(PathNode::Attribute(value.clone())),
            _ => None,
        })
    }

    fn parse_alias(&mut self) -> Option<PathNode> {
        self.next_if(|t| matches!(t, Token::Keyword(_)).then_some(PathNode::Alias))
    }

    fn parse_number_value(&mut self) -> Option<f64> {
        self.next_if(|t| match t {
            Token::Number { value, .. } => Some(*value),
            _ => None,
        })
    }

    fn integral(&self, value: f64) -> Result<i64> {
        if value.fract() == 0.0 && value.is_finite() {
            Ok(value as i64)
        } else {
            Err(self.error(format!("expected an integer, found {value}")))
        }
    }

    fn parse_slice_selector(&mut self) -> Result<Option<PathNode>> {
        let start_at = self.i;
        let start = self.parse_number_value();

        if !self.match_operator(":") {
            return match start {
                Some(index) => Ok(Some(PathNode::Index(self.integral(index)?))),
                None => {
                    self.i = start_at;
                    Ok(None)
                }
            };
        }

        let end = self.parse_number_value();
        let step = if self.match_operator(":") {
            self.parse_number_value()
        } else {
            None
        };

        match (start, end) {
            (Some(start), Some(end)) => Ok(Some(PathNode::Range {
                start: self.integral(start)?,
                end: self.integral(end)?,
                step: step.map(|s| self.integral(s)).transpose()?,
            })),
            _ => {
                self.i = start_at;
                Ok(None)
            }
        }
    }

    fn parse_value_reference(&mut self) -> Result<Option<PathNode>> {
        match self.parse_attribute() {
            Some(attr) => Ok(Some(attr)),
            None => self.parse_slice_selector(),
        }
    }

    fn parse_literal_value(&mut self) -> Option<PathNode> {
        self.next_if(|t| match t {
            Token::Quoted {
                value,
                quote: Quote::Double,
            } => Some(PathNode::String(value.clone())),
            Token::Boolean(b) => Some(PathNode::Boolean(*b)),
            Token::Number { value, .. } => Some(PathNode::Number(*value)),
            _ => None,
        })
    }

    fn parse_filter_expression(&mut self) -> Result<Option<PathNode>> {
        let start_at = self.i;
        let Some(lhs) = self.parse_attribute().or_else(|| self.parse_alias()) else {
            return Ok(None);
        };

        if self.match_operator("?") {
            return Ok(Some(PathNode::Constraint(Constraint {
                operator: ConstraintOp::Exists,
                lhs: Box::new(lhs),
                rhs: None,
            })));
        }

        let operator = self.next_if(|t| match t {
            Token::Comparator(symbol) => ConstraintOp::from_symbol(symbol),
            _ => None,
        });
        let Some(operator) = operator else {
            self.i = start_at;
            return Ok(None);
        };

        let rhs = self.parse_literal_value().ok_or_else(|| {
            self.error(format!(
                "operator {} needs a literal value at the right hand side",
                operator.symbol()
            ))
        })?;

        Ok(Some(PathNode::Constraint(Constraint {
            operator,
            lhs: Box::new(lhs),
            rhs: Some(Box::new(rhs)),
        })))
    }

    fn parse_union_term(&mut self) -> Result<Option<PathNode>> {
        if let Some(constraint) = self.parse_filter_expression()? {
            return Ok(Some(constraint));
        }
        if let Some(path) = self.parse_path()? {
            return Ok(Some(path));
        }
        self.parse_value_reference()
    }

    fn parse_union(&mut self) -> Result<Option<PathNode>> {
        if !self.match_paren('[') {
            return Ok(None);
        }

        let mut terms = Vec::new();
        let first = self
            .parse_union_term()?
            .ok_or_else(|| self.error("expected expression following '['"))?;
        terms.push(first);

        loop {
            if self.match_paren(']') {
                break;
            }
            if !self.match_operator(",") {
                return Err(self.error("expected ]"));
            }
            let term = self
                .parse_union_term()?
                .ok_or_else(|| self.error("expected expression following ','"))?;
            terms.push(term);
        }

        Ok(Some(PathNode::Union(terms)))
    }

    fn parse_recursive(&mut self) -> Result<Option<PathNode>> {
        if !self.match_operator("..") {
            return Ok(None);
        }
        let subpath = self
            .parse_path()?
            .ok_or_else(|| self.error("expected path following '..' operator"))?;
        Ok(Some(PathNode::Recursive(Box::new(subpath))))
    }

    fn parse_path(&mut self) -> Result<Option<PathNode>> {
        let head = match self.parse_attribute() {
            Some(attr) => Some(attr),
            None => match self.parse_union()? {
                Some(union) => Some(union),
                None => self.parse_recursive()?,
            },
        };
        let Some(head) = head else {
            return Ok(None);
        };

        let mut nodes = vec![head];
        while !self.eof() {
            if self.match_operator(".") {
                let attr = self
                    .parse_attribute()
                    .ok_or_else(|| self.error("expected attribute name following '.'"))?;
                nodes.push(attr);
            } else if self.probe_paren('[') {
                let union = self
                    .parse_union()?
                    .ok_or_else(|| self.error("expected union following '['"))?;
                nodes.push(union);
            } else {
                if let Some(recursive) = self.parse_recursive()? {
                    nodes.push(recursive);
                }
                break;
            }
        }

        Ok(Some(PathNode::Path(nodes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn attr(name: &str) -> PathNode {
        PathNode::attribute(name)
    }

    #[test]
    fn parses_dotted_path() {
        assert_eq!(
            parse("a.b.c").unwrap(),
            PathNode::path(vec![attr("a"), attr("b"), attr("c")])
        );
    }

    #[test]
    fn lone_number_is_an_index() {
        assert_eq!(
            parse("a[-1]").unwrap(),
            PathNode::path(vec![attr("a"), PathNode::index(-1)])
        );
    }

    #[test]
    fn parses_ranges() {
        assert_eq!(
            parse("a[1:5:2]").unwrap().nodes()[1],
            PathNode::Union(vec![PathNode::Range {
                start: 1,
                end: 5,
                step: Some(2)
            }])
        );
        assert_eq!(
            parse("a[0:3]").unwrap().nodes()[1],
            PathNode::Union(vec![PathNode::Range {
                start: 0,
                end: 3,
                step: None
            }])
        );
    }

    #[test]
    fn parses_constraints() {
        assert_eq!(
            parse(r#"body[_key=="x"]"#).unwrap(),
            PathNode::path(vec![attr("body"), PathNode::equals("_key", "x")])
        );
        let exists = parse("a[b?]").unwrap();
        let constraint = exists.nodes()[1].single_constraint().unwrap();
        assert_eq!(constraint.operator, ConstraintOp::Exists);
        assert_eq!(constraint.rhs, None);

        let numeric = parse("a[@ >= 2]").unwrap();
        let constraint = numeric.nodes()[1].single_constraint().unwrap();
        assert_eq!(*constraint.lhs, PathNode::Alias);
        assert_eq!(constraint.rhs.as_deref(), Some(&PathNode::Number(2.0)));
    }

    #[test]
    fn single_quotes_are_attributes() {
        assert_eq!(
            parse("a['b c']").unwrap(),
            PathNode::path(vec![
                attr("a"),
                PathNode::Union(vec![PathNode::path(vec![attr("b c")])])
            ])
        );
    }

    #[test]
    fn multi_term_union() {
        let node = parse("a[0,2,b]").unwrap();
        assert_eq!(
            node.nodes()[1],
            PathNode::Union(vec![
                PathNode::Index(0),
                PathNode::Index(2),
                PathNode::path(vec![attr("b")])
            ])
        );
    }

    #[test]
    fn trailing_recursive() {
        assert_eq!(
            parse("a..b").unwrap(),
            PathNode::path(vec![
                attr("a"),
                PathNode::Recursive(Box::new(PathNode::path(vec![attr("b")])))
            ])
        );
    }

    #[test]
    fn rejects_malformed_paths() {
        for bad in ["", "a.", "a[", "a[]", "a[0", "a[b==]", "a[_key=='x']", "a b", "a[1.5]"] {
            assert!(
                matches!(parse(bad), Err(StoreError::Parse { .. })),
                "expected parse error for {bad:?}"
            );
        }
    }

    #[test]
    fn display_round_trips() {
        for source in [
            "a.b[0]",
            "a[-1]",
            r#"a[_key=="x"].b"#,
            "a[1:3]",
            "a[b?]",
            "'odd key'.b",
            "a..b",
        ] {
            let node = parse(source).unwrap();
            assert_eq!(parse(&node.to_string()).unwrap(), node, "{source}");
        }
    }
}
