pub mod context;
pub mod dataset;
pub mod dmp;
pub mod errors;
pub mod listener;
pub mod mutation;
pub mod patch;
pub mod path;
pub mod query;
pub mod store;
pub mod value;
mod comparison;
mod filter;
mod scanner;

pub use context::{StoreConfig, Transaction};
pub use dataset::{reduce_dataset, ChangeKind, Dataset};
pub use errors::{Result, StoreError};
pub use listener::{ListenEvent, MutationEvent, Subscription, Transition};
pub use mutation::{decode_mutations, DeleteSelection, IdSelector, Mutation};
pub use patch::{reduce_document, InsertPatch, InsertPosition, Patch};
pub use path::PathNode;
pub use query::{FilterQuery, QueryEvaluator};
pub use store::{MutationResult, Store};
pub use value::{Document, Map, Value};

/// Parse `expr` and read it from `value`. `Ok(None)` when nothing is there.
pub fn get(value: &Value, expr: &str) -> Result<Option<Value>> {
    path::get(value, &path::parse(expr)?)
}
