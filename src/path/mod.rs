//! Path expressions: `body[_key=="a"].children[-1].text` and friends.

pub mod ast;
pub mod eval;
pub mod parser;
pub mod tokenizer;

pub use ast::{Constraint, ConstraintOp, PathNode};
pub use eval::{get, set};
pub use parser::parse;
pub use tokenizer::{tokenize, Quote, Token};
