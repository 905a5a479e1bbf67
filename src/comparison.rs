use std::cmp::Ordering;

use crate::value::Value;

/// Order two values of the same kind. Values of different kinds, and
/// containers that are not equal, have no order.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::String(sa), Value::String(sb)) => Some(sa.cmp(sb)),
        (Value::Bool(ba), Value::Bool(bb)) => Some(ba.cmp(bb)),
        (Value::Number(na), Value::Number(nb)) => {
            if a == b {
                return Some(Ordering::Equal);
            }
            na.as_f64()?.partial_cmp(&nb.as_f64()?)
        }
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            (a == b).then_some(Ordering::Equal)
        }
        _ => None,
    }
}

/// Evaluate `pred_on_ord` against the order of `a` and `b`.
pub fn cmp_values<F>(a: &Value, b: &Value, pred_on_ord: F) -> bool
where
    F: Fn(Option<Ordering>) -> bool,
{
    pred_on_ord(compare(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn orders_same_kinds() {
        assert_eq!(compare(&v(json!(1)), &v(json!(2.5))), Some(Ordering::Less));
        assert_eq!(compare(&v(json!("b")), &v(json!("a"))), Some(Ordering::Greater));
        assert_eq!(compare(&v(json!(null)), &v(json!(null))), Some(Ordering::Equal));
        assert_eq!(compare(&v(json!([1])), &v(json!([1]))), Some(Ordering::Equal));
    }

    #[test]
    fn mismatched_kinds_only_differ() {
        let (a, b) = (v(json!(1)), v(json!("1")));
        assert!(!cmp_values(&a, &b, |o| o == Some(Ordering::Equal)));
        assert!(cmp_values(&a, &b, |o| o != Some(Ordering::Equal)));
        assert!(!cmp_values(&a, &b, |o| o == Some(Ordering::Less)));
    }
}
