//! Reading and writing values addressed by a parsed path.

use std::sync::Arc;

use crate::errors::{Result, StoreError};
use crate::path::ast::{Constraint, ConstraintOp, PathNode};
use crate::value::{number_from_f64, Value};

/// Evaluate `node` against `value`. `Ok(None)` means the addressed value is missing.
pub fn get(value: &Value, node: &PathNode) -> Result<Option<Value>> {
    match node {
        PathNode::Attribute(name) => {
            let map = value.as_object().ok_or(StoreError::NotARecord("get"))?;
            Ok(map.get(name).cloned())
        }
        PathNode::Union(_) => {
            if let Some(index) = node.single_index() {
                let items = value.as_array().ok_or(StoreError::NotAnArray("get"))?;
                return Ok(resolve_index(items.len(), index).map(|i| items[i].clone()));
            }
            if let Some(constraint) = node.single_constraint() {
                let items = value.as_array().ok_or(StoreError::NotAnArray("get"))?;
                return Ok(find_match(items, constraint)?.map(|i| items[i].clone()));
            }
            Err(StoreError::UnsupportedExpression(node.to_string()))
        }
        PathNode::Path(nodes) => {
            let mut current = value.clone();
            for step in nodes {
                match get(&current, step)? {
                    Some(next) => current = next,
                    None => return Ok(None),
                }
            }
            Ok(Some(current))
        }
        PathNode::Alias => Ok(Some(value.clone())),
        PathNode::String(s) => Ok(Some(Value::String(s.clone()))),
        PathNode::Number(n) => Ok(Some(number_from_f64(*n).map_or(Value::Null, Value::Number))),
        PathNode::Boolean(b) => Ok(Some(Value::Bool(*b))),
        PathNode::Index(_)
        | PathNode::Range { .. }
        | PathNode::Constraint(_)
        | PathNode::Recursive(_) => Err(StoreError::UnsupportedExpression(node.to_string())),
    }
}

/// Write `value` at the single step `node` inside `target`.
///
/// Containers are copied on write when shared, so other holders of `target`'s
/// previous contents never observe the change.
pub fn set(target: &mut Value, node: &PathNode, value: Value) -> Result<()> {
    match node {
        PathNode::Attribute(name) => match target {
            Value::Object(map) => {
                Arc::make_mut(map).insert(name.clone(), value);
                Ok(())
            }
            _ => Err(StoreError::NotARecord("set")),
        },
        PathNode::Union(_) => {
            let Value::Array(items) = target else {
                return Err(StoreError::NotAnArray("set"));
            };
            if let Some(index) = node.single_index() {
                let len = items.len();
                let i = resolve_index(len, index)
                    .ok_or(StoreError::IndexOutOfRange { index, len })?;
                Arc::make_mut(items)[i] = value;
                return Ok(());
            }
            if let Some(constraint) = node.single_constraint() {
                if let Some(i) = find_match(items.as_slice(), constraint)? {
                    Arc::make_mut(items)[i] = value;
                }
                return Ok(());
            }
            Err(StoreError::UnsupportedExpression(node.to_string()))
        }
        _ => Err(StoreError::UnsupportedExpression(node.to_string())),
    }
}

/// Position addressed by `index` in an array of `len` elements; negative counts from the end.
pub fn resolve_index(len: usize, index: i64) -> Option<usize> {
    let resolved = if index < 0 {
        len as i64 + index
    } else {
        index
    };
    (0..len as i64).contains(&resolved).then_some(resolved as usize)
}

/// First element satisfying an `==` constraint.
fn find_match(items: &[Value], constraint: &Constraint) -> Result<Option<usize>> {
    if constraint.operator != ConstraintOp::Eq {
        return Err(StoreError::UnsupportedOperator(
            constraint.operator.symbol().to_string(),
        ));
    }
    let Some(rhs) = constraint.rhs.as_deref() else {
        return Err(StoreError::UnsupportedExpression(
            "equality constraint without a right hand side".into(),
        ));
    };
    for (i, item) in items.iter().enumerate() {
        let left = get(item, &constraint.lhs)?;
        let right = get(item, rhs)?;
        if left.is_some() && left == right {
            return Ok(Some(i));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::parser::parse;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc() -> Value {
        Value::from(json!({
            "title": "hello",
            "body": [
                {"_key": "foo", "text": "a"},
                {"_key": "bar", "text": "b"}
            ],
            "nested": {"inner": {"n": 1}}
        }))
    }

    fn lookup(value: &Value, path: &str) -> Option<Value> {
        get(value, &parse(path).unwrap()).unwrap()
    }

    #[test]
    fn reads_attributes_indices_and_constraints() {
        let d = doc();
        assert_eq!(lookup(&d, "title"), Some(Value::from("hello")));
        assert_eq!(lookup(&d, "nested.inner.n"), Some(Value::from(1)));
        assert_eq!(lookup(&d, "body[0].text"), Some(Value::from("a")));
        assert_eq!(lookup(&d, "body[-1].text"), Some(Value::from("b")));
        assert_eq!(lookup(&d, r#"body[_key=="bar"].text"#), Some(Value::from("b")));
    }

    #[test]
    fn missing_values_are_none() {
        let d = doc();
        assert_eq!(lookup(&d, "nope"), None);
        assert_eq!(lookup(&d, "nope.deeper"), None);
        assert_eq!(lookup(&d, "body[5]"), None);
        assert_eq!(lookup(&d, "body[-3]"), None);
        assert_eq!(lookup(&d, r#"body[_key=="baz"]"#), None);
    }

    #[test]
    fn shape_errors() {
        let d = doc();
        assert!(matches!(
            get(&d, &parse("title.x").unwrap()),
            Err(StoreError::NotARecord(_))
        ));
        assert!(matches!(
            get(&d, &parse("title[0]").unwrap()),
            Err(StoreError::NotAnArray(_))
        ));
        assert!(matches!(
            get(&d, &parse(r#"body[_key!="x"]"#).unwrap()),
            Err(StoreError::UnsupportedOperator(op)) if op == "!="
        ));
        assert!(matches!(
            get(&d, &parse("body[0:1]").unwrap()),
            Err(StoreError::UnsupportedExpression(_))
        ));
        assert!(matches!(
            get(&d, &parse("..title").unwrap()),
            Err(StoreError::UnsupportedExpression(_))
        ));
    }

    #[test]
    fn parsed_paths_resolve_like_hand_built_ones() {
        let d = doc();
        let hand_built = PathNode::path(vec![
            PathNode::attribute("body"),
            PathNode::equals("_key", "foo"),
            PathNode::attribute("text"),
        ]);
        assert_eq!(
            get(&d, &hand_built).unwrap(),
            lookup(&d, r#"body[_key=="foo"].text"#)
        );
    }

    #[test]
    fn set_copies_shared_containers() {
        let original = doc();
        let mut copy = original.clone();
        set(&mut copy, &PathNode::attribute("title"), Value::from("bye")).unwrap();
        assert_eq!(lookup(&original, "title"), Some(Value::from("hello")));
        assert_eq!(lookup(&copy, "title"), Some(Value::from("bye")));
        assert!(copy.get("body").unwrap().same(original.get("body").unwrap()));
    }

    #[test]
    fn set_into_arrays() {
        let mut body = doc().get("body").cloned().unwrap();

        // no match is a no-op
        let before = body.clone();
        set(&mut body, &PathNode::equals("_key", "zzz"), Value::Null).unwrap();
        assert!(body.same(&before));

        set(&mut body, &PathNode::equals("_key", "foo"), Value::from("first")).unwrap();
        assert_eq!(body.as_array().unwrap()[0], Value::from("first"));

        set(&mut body, &PathNode::index(-1), Value::from("last")).unwrap();
        assert_eq!(body.as_array().unwrap()[1], Value::from("last"));

        assert!(matches!(
            set(&mut body, &PathNode::index(2), Value::Null),
            Err(StoreError::IndexOutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn resolve_index_bounds() {
        assert_eq!(resolve_index(3, 0), Some(0));
        assert_eq!(resolve_index(3, -1), Some(2));
        assert_eq!(resolve_index(3, 3), None);
        assert_eq!(resolve_index(0, -1), None);
    }
}
