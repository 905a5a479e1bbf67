//! Path expression syntax tree.

use itertools::Itertools;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// Unary `?` existence test.
    Exists,
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Ne,
}

impl ConstraintOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "?" => ConstraintOp::Exists,
            ">" => ConstraintOp::Gt,
            ">=" => ConstraintOp::Gte,
            "<" => ConstraintOp::Lt,
            "<=" => ConstraintOp::Lte,
            "==" => ConstraintOp::Eq,
            "!=" => ConstraintOp::Ne,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ConstraintOp::Exists => "?",
            ConstraintOp::Gt => ">",
            ConstraintOp::Gte => ">=",
            ConstraintOp::Lt => "<",
            ConstraintOp::Lte => "<=",
            ConstraintOp::Eq => "==",
            ConstraintOp::Ne => "!=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub operator: ConstraintOp,
    pub lhs: Box<PathNode>,
    /// `None` only for `Exists`.
    pub rhs: Option<Box<PathNode>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathNode {
    /// `@` or `$`: the value being looked at.
    Alias,
    Attribute(String),
    Index(i64),
    Range {
        start: i64,
        end: i64,
        step: Option<i64>,
    },
    Union(Vec<PathNode>),
    Constraint(Constraint),
    Path(Vec<PathNode>),
    Recursive(Box<PathNode>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl PathNode {
    pub fn attribute(name: impl Into<String>) -> Self {
        PathNode::Attribute(name.into())
    }

    /// `[i]`, the canonical indexed access.
    pub fn index(i: i64) -> Self {
        PathNode::Union(vec![PathNode::Index(i)])
    }

    /// `[attr == "value"]`, the canonical equality lookup.
    pub fn equals(attr: impl Into<String>, value: impl Into<String>) -> Self {
        PathNode::Union(vec![PathNode::Constraint(Constraint {
            operator: ConstraintOp::Eq,
            lhs: Box::new(PathNode::attribute(attr)),
            rhs: Some(Box::new(PathNode::String(value.into()))),
        })])
    }

    pub fn path(nodes: Vec<PathNode>) -> Self {
        PathNode::Path(nodes)
    }

    /// Index of a union holding exactly one `Index` term.
    pub fn single_index(&self) -> Option<i64> {
        match self {
            PathNode::Union(nodes) => match nodes.as_slice() {
                [PathNode::Index(i)] => Some(*i),
                _ => None,
            },
            _ => None,
        }
    }

    /// Constraint of a union holding exactly one `Constraint` term.
    pub fn single_constraint(&self) -> Option<&Constraint> {
        match self {
            PathNode::Union(nodes) => match nodes.as_slice() {
                [PathNode::Constraint(c)] => Some(c),
                _ => None,
            },
            _ => None,
        }
    }

    /// Segments of a `Path`; any other node is its own single segment.
    pub fn nodes(&self) -> &[PathNode] {
        match self {
            PathNode::Path(nodes) => nodes,
            other => std::slice::from_ref(other),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        && name != "true"
        && name != "false"
}

fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str, quote: char) -> fmt::Result {
    write!(f, "{quote}")?;
    for c in text.chars() {
        if c == quote || c == '\\' {
            write!(f, "\\")?;
        }
        write!(f, "{c}")?;
    }
    write!(f, "{quote}")
}

impl fmt::Display for PathNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathNode::Alias => write!(f, "@"),
            PathNode::Attribute(name) if is_identifier(name) => write!(f, "{name}"),
            PathNode::Attribute(name) => write_quoted(f, name, '\''),
            PathNode::Index(i) => write!(f, "{i}"),
            PathNode::Range { start, end, step } => match step {
                Some(step) => write!(f, "{start}:{end}:{step}"),
                None => write!(f, "{start}:{end}"),
            },
            PathNode::Union(nodes) => write!(f, "[{}]", nodes.iter().join(",")),
            PathNode::Constraint(c) => match &c.rhs {
                Some(rhs) => write!(f, "{}{}{}", c.lhs, c.operator.symbol(), rhs),
                None => write!(f, "{}{}", c.lhs, c.operator.symbol()),
            },
            PathNode::Path(nodes) => {
                for (i, node) in nodes.iter().enumerate() {
                    if i > 0 && matches!(node, PathNode::Attribute(_)) {
                        write!(f, ".")?;
                    }
                    write!(f, "{node}")?;
                }
                Ok(())
            }
            PathNode::Recursive(term) => write!(f, "..{term}"),
            PathNode::String(s) => write_quoted(f, s, '"'),
            PathNode::Number(n) => write!(f, "{n}"),
            PathNode::Boolean(b) => write!(f, "{b}"),
        }
    }
}
