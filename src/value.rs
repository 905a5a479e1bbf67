//! JSON-like values with shared containers.
//!
//! Arrays and objects live behind an [`Arc`], so cloning a [`Value`] is cheap
//! and two values can be compared by *reference identity* with
//! [`Value::same`]. Writers copy a container before changing it (see
//! [`Value::shallow_clone`]), which keeps every published snapshot intact.

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Number;
use std::fmt;
use std::sync::Arc;

use crate::context::Transaction;
use crate::errors::{Result, StoreError};

/// Ordered field map used for records.
pub type Map = IndexMap<String, Value>;

#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Arc<Vec<Value>>),
    Object(Arc<Map>),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Arc::new(items))
    }

    pub fn object(fields: Map) -> Self {
        Value::Object(Arc::new(fields))
    }

    /// Human-readable kind, used in type mismatch errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Containers are always truthy, even when empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Field lookup on records; `None` for anything else.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Reference identity: containers compare by pointer, primitives by value.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Array(_), _) | (Value::Object(_), _) => false,
            (a, b) => a == b,
        }
    }

    /// New container holding the same children. Primitives are plain copies.
    pub fn shallow_clone(&self) -> Value {
        match self {
            Value::Array(items) => Value::Array(Arc::new(Vec::clone(items))),
            Value::Object(map) => Value::Object(Arc::new(Map::clone(map))),
            other => other.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::from(self)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x == y,
        _ => match (a.as_u64(), b.as_u64()) {
            (Some(x), Some(y)) => x == y,
            _ => a.as_f64() == b.as_f64(),
        },
    }
}

/// Integral floats become integers so `1` in a path literal equals a stored `1`.
pub(crate) fn number_from_f64(f: f64) -> Option<Number> {
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(Number::from(f as i64))
    } else {
        Number::from_f64(f)
    }
}

/// `a + b` (or `a - b`), staying in integers while the result fits.
pub(crate) fn add_numbers(a: &Number, b: &Number, subtract: bool) -> Option<Number> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        let sum = if subtract {
            x.checked_sub(y)
        } else {
            x.checked_add(y)
        };
        if let Some(sum) = sum {
            return Some(Number::from(sum));
        }
    }
    let (x, y) = (a.as_f64()?, b.as_f64()?);
    Number::from_f64(if subtract { x - y } else { x + y })
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(Number::from(n))
    }
}

/// Non-finite floats have no JSON form and become `Null`.
impl From<f64> for Value {
    fn from(f: f64) -> Self {
        number_from_f64(f).map_or(Value::Null, Value::Number)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map.iter() {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

/// A stored record: an object with a non-empty string `_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    fields: Arc<Map>,
}

impl Document {
    pub fn from_fields(fields: Map) -> Result<Self> {
        Self::from_record(Arc::new(fields))
    }

    fn from_record(fields: Arc<Map>) -> Result<Self> {
        match fields.get("_id") {
            Some(Value::String(id)) if !id.is_empty() => Ok(Self { fields }),
            Some(other) => Err(StoreError::InvalidDocument(format!(
                "`_id` must be a non-empty string, found {}",
                other.kind_name()
            ))),
            None => Err(StoreError::InvalidDocument("missing `_id`".into())),
        }
    }

    pub fn id(&self) -> &str {
        self.fields
            .get("_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn doc_type(&self) -> Option<&str> {
        self.fields.get("_type").and_then(Value::as_str)
    }

    pub fn rev(&self) -> Option<&str> {
        self.fields.get("_rev").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map {
        &self.fields
    }

    /// The document as a value sharing the same record.
    pub fn to_value(&self) -> Value {
        Value::Object(Arc::clone(&self.fields))
    }

    pub fn ptr_eq(&self, other: &Document) -> bool {
        Arc::ptr_eq(&self.fields, &other.fields)
    }

    /// Stamp for insertion into a dataset. Timestamps already present are kept.
    pub(crate) fn created(&self, tx: &Transaction) -> Document {
        let mut doc = self.clone();
        let fields = Arc::make_mut(&mut doc.fields);
        fields.insert("_rev".into(), Value::from(tx.id.as_str()));
        fields
            .entry("_createdAt".into())
            .or_insert_with(|| Value::from(tx.timestamp.as_str()));
        fields
            .entry("_updatedAt".into())
            .or_insert_with(|| Value::from(tx.timestamp.as_str()));
        doc
    }

    /// Stamp after a successful patch.
    pub(crate) fn revised(mut self, tx: &Transaction) -> Document {
        let fields = Arc::make_mut(&mut self.fields);
        fields.insert("_rev".into(), Value::from(tx.id.as_str()));
        fields.insert("_updatedAt".into(), Value::from(tx.timestamp.as_str()));
        self
    }
}

impl TryFrom<Value> for Document {
    type Error = StoreError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Document::from_record(fields),
            other => Err(StoreError::InvalidDocument(format!(
                "expected an object, found {}",
                other.kind_name()
            ))),
        }
    }
}

impl TryFrom<serde_json::Value> for Document {
    type Error = StoreError;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        Document::try_from(Value::from(value))
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Object(doc.fields)
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.fields.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Document::try_from(value).map_err(de::Error::custom)
    }
}
