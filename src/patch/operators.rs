//! Patch operators.
//!
//! Every operator takes a document root and returns a new root. The path up to
//! the addressed parent is rebuilt as a spine of shallow clones, so unrelated
//! branches keep their identity. When nothing changes, including when an
//! intermediate segment is missing, the original root is returned as is.

use std::sync::Arc;

use serde_json::Number;
use tracing::{debug, warn};

use crate::dmp;
use crate::errors::{Result, StoreError};
use crate::patch::{InsertPatch, InsertPosition};
use crate::path::eval::{self, resolve_index};
use crate::path::{parse, PathNode};
use crate::value::{add_numbers, Value};

/// Rebuild the spine leading to the parent of `path`'s last segment and let
/// `leaf` edit that parent. `leaf` returns whether it changed anything.
fn update<F>(root: &Value, path: &str, leaf: F) -> Result<Value>
where
    F: FnOnce(&mut Value, &PathNode) -> Result<bool>,
{
    let node = parse(path)?;
    let Some((last, spine)) = node.nodes().split_last() else {
        return Ok(root.clone());
    };
    Ok(update_spine(root, spine, last, leaf, path)?.unwrap_or_else(|| root.clone()))
}

fn update_spine<F>(
    current: &Value,
    spine: &[PathNode],
    last: &PathNode,
    leaf: F,
    path: &str,
) -> Result<Option<Value>>
where
    F: FnOnce(&mut Value, &PathNode) -> Result<bool>,
{
    let Some((step, rest)) = spine.split_first() else {
        let mut parent = current.shallow_clone();
        return Ok(leaf(&mut parent, last)?.then_some(parent));
    };

    let child = match eval::get(current, step)? {
        Some(child) if child.is_truthy() => child,
        _ => {
            warn!(path = %path, segment = %step, "path segment not found, leaving value unchanged");
            return Ok(None);
        }
    };

    let Some(child) = update_spine(&child, rest, last, leaf, path)? else {
        return Ok(None);
    };
    let mut parent = current.shallow_clone();
    eval::set(&mut parent, step, child)?;
    Ok(Some(parent))
}

pub fn set(root: &Value, path: &str, value: &Value) -> Result<Value> {
    update(root, path, |parent, last| {
        eval::set(parent, last, value.clone())?;
        Ok(true)
    })
}

pub fn set_if_missing(root: &Value, path: &str, value: &Value) -> Result<Value> {
    update(root, path, |parent, last| {
        if eval::get(parent, last)?.is_some() {
            return Ok(false);
        }
        eval::set(parent, last, value.clone())?;
        Ok(true)
    })
}

pub fn unset(root: &Value, path: &str) -> Result<Value> {
    update(root, path, |parent, last| {
        let PathNode::Attribute(name) = last else {
            return Err(StoreError::UnsupportedExpression(format!(
                "unset needs an attribute as last segment, found `{last}`"
            )));
        };
        let Value::Object(map) = parent else {
            return Err(StoreError::NotARecord("unset"));
        };
        Ok(Arc::make_mut(map).shift_remove(name).is_some())
    })
}

pub fn inc(root: &Value, path: &str, by: &Number) -> Result<Value> {
    add(root, path, by, false)
}

pub fn dec(root: &Value, path: &str, by: &Number) -> Result<Value> {
    add(root, path, by, true)
}

fn add(root: &Value, path: &str, by: &Number, subtract: bool) -> Result<Value> {
    update(root, path, |parent, last| {
        let current = match eval::get(parent, last)? {
            Some(Value::Number(n)) => n,
            other => {
                return Err(StoreError::TypeMismatch {
                    expected: "number",
                    found: other.as_ref().map_or("missing", Value::kind_name),
                })
            }
        };
        let result = add_numbers(&current, by, subtract).ok_or(StoreError::TypeMismatch {
            expected: "finite number",
            found: "number",
        })?;
        eval::set(parent, last, Value::Number(result))?;
        Ok(true)
    })
}

pub fn diff_match_patch(root: &Value, path: &str, patch: &str) -> Result<Value> {
    update(root, path, |parent, last| {
        let previous = match eval::get(parent, last)? {
            Some(Value::String(s)) => s,
            other => {
                return Err(StoreError::TypeMismatch {
                    expected: "string",
                    found: other.as_ref().map_or("missing", Value::kind_name),
                })
            }
        };
        let patches = dmp::patch_from_text(patch)?;
        let (text, applied) = dmp::apply(&patches, &previous);
        if applied.contains(&false) {
            debug!(path = %last, ?applied, "some diff-match-patch hunks did not apply");
        }
        if text == previous {
            return Ok(false);
        }
        eval::set(parent, last, Value::String(text))?;
        Ok(true)
    })
}

pub fn insert(root: &Value, insert: &InsertPatch) -> Result<Value> {
    let anchor = insert.position.anchor();
    update(root, anchor, |parent, last| {
        let len = parent
            .as_array()
            .ok_or(StoreError::NotAnArray("insert"))?
            .len();

        // `None` appends.
        let position = match last.single_index() {
            Some(index) => resolve_index(len, index),
            None => {
                let found = match eval::get(parent, last)? {
                    Some(target) => parent
                        .as_array()
                        .and_then(|items| items.iter().position(|item| item.same(&target))),
                    None => None,
                };
                if found.is_none() {
                    warn!(anchor = %anchor, "insert anchor not found, leaving value unchanged");
                    return Ok(false);
                }
                found
            }
        };

        let Value::Array(items) = parent else {
            return Err(StoreError::NotAnArray("insert"));
        };
        let items = Arc::make_mut(items);
        let new_items = insert.items.iter().cloned();
        match (position, &insert.position) {
            (None, _) => items.extend(new_items),
            (Some(i), InsertPosition::After(_)) => {
                items.splice(i + 1..i + 1, new_items);
            }
            (Some(i), InsertPosition::Before(_)) => {
                items.splice(i..i, new_items);
            }
            (Some(i), InsertPosition::Replace(_)) => {
                items.splice(i..i + 1, new_items);
            }
        }
        Ok(true)
    })
}
