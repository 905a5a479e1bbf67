//! Filter expressions for the built-in query evaluator: the part between the
//! brackets of `*[_type == "post" && count > $min]`.

use std::cmp::Ordering;

use crate::comparison::cmp_values;
use crate::scanner::{ScanError, Scanner};
use crate::value::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Eq(Operand, Operand),
    Ne(Operand, Operand),
    Lt(Operand, Operand),
    Lte(Operand, Operand),
    Gt(Operand, Operand),
    Gte(Operand, Operand),
    And(Box<FilterExpr>, Box<FilterExpr>),
    Or(Box<FilterExpr>, Box<FilterExpr>),
    Not(Box<FilterExpr>),
    Truthy(Operand),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Path(Vec<PathToken>), // _type, a.b, @.a['b'][0]
    Literal(Value),       // "abc", 123, true/false/null, resolved $param
    Lower(Box<Operand>),
    Upper(Box<Operand>),
    Length(Box<Operand>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathToken {
    Key(String),
    Index(i64),
}

const COMPARATORS: [&str; 6] = ["==", "!=", "<=", ">=", "<", ">"];

/// Parse `a || b`, the loosest binding level. `$name` parameters are looked up
/// in `params` while parsing.
pub fn parse_filter(scanner: &mut Scanner, params: &Map) -> Result<FilterExpr, ScanError> {
    let mut left = parse_filter_and(scanner, params)?;
    loop {
        scanner.skip_ws();
        if scanner.consume_str("||") {
            let right = parse_filter_and(scanner, params)?;
            left = FilterExpr::Or(Box::new(left), Box::new(right));
        } else {
            break;
        }
    }
    Ok(left)
}

fn parse_filter_and(scanner: &mut Scanner, params: &Map) -> Result<FilterExpr, ScanError> {
    let mut left = parse_filter_not(scanner, params)?;
    loop {
        scanner.skip_ws();
        if scanner.consume_str("&&") {
            let right = parse_filter_not(scanner, params)?;
            left = FilterExpr::And(Box::new(left), Box::new(right));
        } else {
            break;
        }
    }
    Ok(left)
}

fn parse_filter_not(scanner: &mut Scanner, params: &Map) -> Result<FilterExpr, ScanError> {
    scanner.skip_ws();
    // `!=` never starts an expression, so a leading `!` is negation.
    if scanner.consume_char('!') {
        let inner = parse_filter_not(scanner, params)?;
        Ok(FilterExpr::Not(Box::new(inner)))
    } else {
        parse_filter_compare(scanner, params)
    }
}

fn parse_filter_compare(scanner: &mut Scanner, params: &Map) -> Result<FilterExpr, ScanError> {
    scanner.skip_ws();
    if scanner.consume_char('(') {
        let inner = parse_filter(scanner, params)?;
        scanner.skip_ws();
        scanner.expect(')')?;
        return Ok(inner);
    }
    let left = parse_operand(scanner, params)?;
    scanner.skip_ws();
    let Some(op) = COMPARATORS.into_iter().find(|op| scanner.consume_str(op)) else {
        return Ok(FilterExpr::Truthy(left));
    };
    let right = parse_operand(scanner, params)?;
    Ok(match op {
        "==" => FilterExpr::Eq(left, right),
        "!=" => FilterExpr::Ne(left, right),
        "<" => FilterExpr::Lt(left, right),
        "<=" => FilterExpr::Lte(left, right),
        ">" => FilterExpr::Gt(left, right),
        _ => FilterExpr::Gte(left, right),
    })
}

fn parse_operand(scanner: &mut Scanner, params: &Map) -> Result<Operand, ScanError> {
    scanner.skip_ws();
    match scanner.peek_char() {
        Some('"') | Some('\'') => {
            return Ok(Operand::Literal(Value::String(scanner.parse_quoted_string()?)));
        }
        Some(c) if c == '-' || c.is_ascii_digit() => {
            return Ok(Operand::Literal(Value::Number(scanner.parse_number_literal()?)));
        }
        Some('$') => {
            scanner.consume_char('$');
            let name = scanner.parse_identifier()?;
            return params
                .get(&name)
                .cloned()
                .map(Operand::Literal)
                .ok_or_else(|| scanner.error(format!("param ${name} referenced, but not provided")));
        }
        Some('@') => {
            scanner.consume_char('@');
            return Ok(Operand::Path(parse_path_tail(scanner, Vec::new())?));
        }
        _ => {}
    }

    let start = scanner.position();
    let name = scanner
        .scan_identifier()
        .ok_or_else(|| scanner.error("invalid operand"))?;
    match name {
        "true" => return Ok(Operand::Literal(Value::Bool(true))),
        "false" => return Ok(Operand::Literal(Value::Bool(false))),
        "null" => return Ok(Operand::Literal(Value::Null)),
        _ => {}
    }

    scanner.skip_ws();
    if scanner.consume_char('(') {
        let wrap: fn(Box<Operand>) -> Operand = match name {
            "lower" => Operand::Lower,
            "upper" => Operand::Upper,
            "length" => Operand::Length,
            _ => {
                scanner.reset(start);
                return Err(scanner.error(format!("unknown function `{name}`")));
            }
        };
        let inner = parse_operand(scanner, params)?;
        scanner.skip_ws();
        scanner.expect(')')?;
        return Ok(wrap(Box::new(inner)));
    }

    parse_path_tail(scanner, vec![PathToken::Key(name.to_string())])
        .map(Operand::Path)
}

/// `.key`, `['key']` and `[index]` steps following a path head.
fn parse_path_tail(scanner: &mut Scanner, mut tokens: Vec<PathToken>) -> Result<Vec<PathToken>, ScanError> {
    loop {
        if scanner.consume_char('.') {
            tokens.push(PathToken::Key(scanner.parse_identifier()?));
        } else if scanner.consume_char('[') {
            scanner.skip_ws();
            if matches!(scanner.peek_char(), Some('"') | Some('\'')) {
                tokens.push(PathToken::Key(scanner.parse_quoted_string()?));
            } else {
                tokens.push(PathToken::Index(scanner.parse_int()?));
            }
            scanner.skip_ws();
            scanner.expect(']')?;
        } else {
            return Ok(tokens);
        }
    }
}

pub fn eval_filter(expr: &FilterExpr, current: &Value) -> bool {
    let compare = |a: &Operand, b: &Operand, pred: fn(Option<Ordering>) -> bool| {
        cmp_values(&eval_operand(a, current), &eval_operand(b, current), pred)
    };
    match expr {
        FilterExpr::Eq(a, b) => compare(a, b, |o| o == Some(Ordering::Equal)),
        FilterExpr::Ne(a, b) => compare(a, b, |o| o != Some(Ordering::Equal)),
        FilterExpr::Lt(a, b) => compare(a, b, |o| o == Some(Ordering::Less)),
        FilterExpr::Lte(a, b) => compare(a, b, |o| matches!(o, Some(Ordering::Less | Ordering::Equal))),
        FilterExpr::Gt(a, b) => compare(a, b, |o| o == Some(Ordering::Greater)),
        FilterExpr::Gte(a, b) => {
            compare(a, b, |o| matches!(o, Some(Ordering::Greater | Ordering::Equal)))
        }
        FilterExpr::And(l, r) => eval_filter(l, current) && eval_filter(r, current),
        FilterExpr::Or(l, r) => eval_filter(l, current) || eval_filter(r, current),
        FilterExpr::Not(i) => !eval_filter(i, current),
        FilterExpr::Truthy(op) => eval_operand(op, current).is_truthy(),
    }
}

fn eval_operand(op: &Operand, current: &Value) -> Value {
    match op {
        Operand::Literal(v) => v.clone(),
        Operand::Lower(inner) => match eval_operand(inner, current) {
            Value::String(s) => Value::String(s.to_lowercase()),
            other => other,
        },
        Operand::Upper(inner) => match eval_operand(inner, current) {
            Value::String(s) => Value::String(s.to_uppercase()),
            other => other,
        },
        Operand::Length(inner) => match eval_operand(inner, current) {
            Value::Array(a) => Value::from(a.len() as i64),
            Value::String(s) => Value::from(s.chars().count() as i64),
            _ => Value::Null,
        },
        Operand::Path(tokens) => {
            let mut node = current;
            for token in tokens {
                let next = match (token, node) {
                    (PathToken::Key(k), Value::Object(m)) => m.get(k),
                    (PathToken::Index(i), Value::Array(a)) => {
                        crate::path::eval::resolve_index(a.len(), *i).map(|i| &a[i])
                    }
                    _ => None,
                };
                match next {
                    Some(next) => node = next,
                    None => return Value::Null,
                }
            }
            node.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parse(src: &str) -> FilterExpr {
        parse_with(src, &Map::new())
    }

    fn parse_with(src: &str, params: &Map) -> FilterExpr {
        let mut scanner = Scanner::new(src);
        let expr = parse_filter(&mut scanner, params).unwrap();
        scanner.skip_ws();
        assert!(scanner.eof(), "trailing input in {src:?}");
        expr
    }

    fn matches(src: &str, doc: serde_json::Value) -> bool {
        eval_filter(&parse(src), &Value::from(doc))
    }

    #[test]
    fn parses_bare_paths_and_literals() {
        assert_eq!(
            parse(r#"_type == "post""#),
            FilterExpr::Eq(
                Operand::Path(vec![PathToken::Key("_type".into())]),
                Operand::Literal(Value::from("post"))
            )
        );
        assert_eq!(
            parse("@.a['b c'][0]"),
            FilterExpr::Truthy(Operand::Path(vec![
                PathToken::Key("a".into()),
                PathToken::Key("b c".into()),
                PathToken::Index(0)
            ]))
        );
    }

    #[test]
    fn resolves_params_while_parsing() {
        let mut params = Map::new();
        params.insert("id".into(), Value::from("t"));
        assert_eq!(
            parse_with("_id == $id", &params),
            FilterExpr::Eq(
                Operand::Path(vec![PathToken::Key("_id".into())]),
                Operand::Literal(Value::from("t"))
            )
        );
        let mut scanner = Scanner::new("_id == $missing");
        assert!(parse_filter(&mut scanner, &params).is_err());
    }

    #[test]
    fn evaluates_boolean_structure() {
        let doc = json!({"_type": "post", "count": 3, "tags": ["a", "b"], "title": "Hello"});
        assert!(matches(r#"_type == "post" && count > 2"#, doc.clone()));
        assert!(matches(r#"_type == "page" || count >= 3"#, doc.clone()));
        assert!(matches(r#"!(_type == "page")"#, doc.clone()));
        assert!(matches("length(tags) == 2", doc.clone()));
        assert!(matches(r#"lower(title) == "hello""#, doc.clone()));
        assert!(matches(r#"upper(@.title) != "hello""#, doc.clone()));
        assert!(matches("tags[-1] == 'b'", doc.clone()));
        assert!(!matches("missing", doc.clone()));
        assert!(!matches("count < 1", doc));
    }

    #[test]
    fn mismatched_kinds_do_not_compare() {
        let doc = json!({"count": 3});
        assert!(!matches(r#"count == "3""#, doc.clone()));
        assert!(!matches(r#"count > "1""#, doc.clone()));
        assert!(matches(r#"count != "3""#, doc));
    }

    #[test]
    fn rejects_unknown_functions() {
        let mut scanner = Scanner::new("explode(a)");
        assert!(parse_filter(&mut scanner, &Map::new()).is_err());
    }
}
