use tracing::debug;

use crate::context::Transaction;
use crate::errors::{Result, StoreError};
use crate::patch::{operators, Operation, Patch};
use crate::value::{Document, Value};

/// Apply one patch to one document.
///
/// A patch addressed to another id leaves the document alone, as does a patch
/// with no operators. Otherwise the result is stamped with the transaction's
/// revision and timestamp once, however many operators ran.
pub fn reduce_document(doc: &Document, patch: &Patch, tx: &Transaction) -> Result<Document> {
    if doc.id() != patch.id {
        return Ok(doc.clone());
    }

    let mut root = doc.to_value();
    let mut executed = 0usize;
    for operation in patch.operations() {
        root = apply_operation(&root, &operation).map_err(|source| StoreError::Operator {
            operator: operation.name(),
            path: operation.path().to_string(),
            document_id: doc.id().to_string(),
            source: Box::new(source),
        })?;
        executed += 1;
    }

    if executed == 0 {
        return Ok(doc.clone());
    }

    match root.get("_id") {
        Some(Value::String(id)) if id == doc.id() => {}
        _ => return Err(StoreError::ImmutableId(doc.id().to_string())),
    }

    debug!(document_id = %doc.id(), operations = executed, rev = %tx.id, "patched document");
    Ok(Document::try_from(root)?.revised(tx))
}

pub fn apply_operation(root: &Value, operation: &Operation<'_>) -> Result<Value> {
    match *operation {
        Operation::Set { path, value } => operators::set(root, path, value),
        Operation::SetIfMissing { path, value } => operators::set_if_missing(root, path, value),
        Operation::Unset { path } => operators::unset(root, path),
        Operation::Dec { path, by } => operators::dec(root, path, by),
        Operation::Inc { path, by } => operators::inc(root, path, by),
        Operation::DiffMatchPatch { path, patch } => operators::diff_match_patch(root, path, patch),
        Operation::Insert(insert) => operators::insert(root, insert),
    }
}
