//! Structural patches and the operators that apply them.

pub mod operators;
pub mod reducer;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::errors::StoreError;
use crate::value::Value;

pub use reducer::reduce_document;

/// A set of edits against one document, in the content API's JSON shape.
///
/// Each operator group keeps the order it was written in. Unknown keys such
/// as `ifRevisionId` are ignored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<IndexMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_if_missing: Option<IndexMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unset: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inc: Option<IndexMap<String, Number>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dec: Option<IndexMap<String, Number>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_match_patch: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert: Option<InsertPatch>,
}

impl Patch {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set
            .get_or_insert_with(IndexMap::new)
            .insert(path.into(), value.into());
        self
    }

    pub fn with_set_if_missing(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_if_missing
            .get_or_insert_with(IndexMap::new)
            .insert(path.into(), value.into());
        self
    }

    pub fn with_unset(mut self, path: impl Into<String>) -> Self {
        self.unset.get_or_insert_with(Vec::new).push(path.into());
        self
    }

    pub fn with_inc(mut self, path: impl Into<String>, by: impl Into<Number>) -> Self {
        self.inc
            .get_or_insert_with(IndexMap::new)
            .insert(path.into(), by.into());
        self
    }

    pub fn with_dec(mut self, path: impl Into<String>, by: impl Into<Number>) -> Self {
        self.dec
            .get_or_insert_with(IndexMap::new)
            .insert(path.into(), by.into());
        self
    }

    pub fn with_diff_match_patch(mut self, path: impl Into<String>, patch: impl Into<String>) -> Self {
        self.diff_match_patch
            .get_or_insert_with(IndexMap::new)
            .insert(path.into(), patch.into());
        self
    }

    pub fn with_insert(mut self, insert: InsertPatch) -> Self {
        self.insert = Some(insert);
        self
    }

    /// Every operator in this patch, in application order:
    /// `set, setIfMissing, unset, dec, inc, diffMatchPatch, insert`.
    pub fn operations(&self) -> impl Iterator<Item = Operation<'_>> {
        let set = self
            .set
            .iter()
            .flatten()
            .map(|(path, value)| Operation::Set { path, value });
        let set_if_missing = self
            .set_if_missing
            .iter()
            .flatten()
            .map(|(path, value)| Operation::SetIfMissing { path, value });
        let unset = self
            .unset
            .iter()
            .flatten()
            .map(|path| Operation::Unset { path });
        let dec = self
            .dec
            .iter()
            .flatten()
            .map(|(path, by)| Operation::Dec { path, by });
        let inc = self
            .inc
            .iter()
            .flatten()
            .map(|(path, by)| Operation::Inc { path, by });
        let diff_match_patch = self
            .diff_match_patch
            .iter()
            .flatten()
            .map(|(path, patch)| Operation::DiffMatchPatch { path, patch });
        let insert = self.insert.iter().map(Operation::Insert);

        set.chain(set_if_missing)
            .chain(unset)
            .chain(dec)
            .chain(inc)
            .chain(diff_match_patch)
            .chain(insert)
    }
}

/// One operator of a patch, borrowed from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation<'a> {
    Set { path: &'a str, value: &'a Value },
    SetIfMissing { path: &'a str, value: &'a Value },
    Unset { path: &'a str },
    Dec { path: &'a str, by: &'a Number },
    Inc { path: &'a str, by: &'a Number },
    DiffMatchPatch { path: &'a str, patch: &'a str },
    Insert(&'a InsertPatch),
}

impl<'a> Operation<'a> {
    /// Name as written in a patch.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Set { .. } => "set",
            Operation::SetIfMissing { .. } => "setIfMissing",
            Operation::Unset { .. } => "unset",
            Operation::Dec { .. } => "dec",
            Operation::Inc { .. } => "inc",
            Operation::DiffMatchPatch { .. } => "diffMatchPatch",
            Operation::Insert(_) => "insert",
        }
    }

    pub fn path(&self) -> &'a str {
        match *self {
            Operation::Set { path, .. }
            | Operation::SetIfMissing { path, .. }
            | Operation::Unset { path }
            | Operation::Dec { path, .. }
            | Operation::Inc { path, .. }
            | Operation::DiffMatchPatch { path, .. } => path,
            Operation::Insert(insert) => insert.position.anchor(),
        }
    }
}

/// Where inserted items go relative to the element the anchor path addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertPosition {
    After(String),
    Before(String),
    Replace(String),
}

impl InsertPosition {
    pub fn anchor(&self) -> &str {
        match self {
            InsertPosition::After(path)
            | InsertPosition::Before(path)
            | InsertPosition::Replace(path) => path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawInsert", into = "RawInsert")]
pub struct InsertPatch {
    pub position: InsertPosition,
    pub items: Vec<Value>,
}

impl InsertPatch {
    pub fn after(anchor: impl Into<String>, items: Vec<Value>) -> Self {
        Self {
            position: InsertPosition::After(anchor.into()),
            items,
        }
    }

    pub fn before(anchor: impl Into<String>, items: Vec<Value>) -> Self {
        Self {
            position: InsertPosition::Before(anchor.into()),
            items,
        }
    }

    pub fn replace(anchor: impl Into<String>, items: Vec<Value>) -> Self {
        Self {
            position: InsertPosition::Replace(anchor.into()),
            items,
        }
    }
}

// Wire shape: `{"after": "path", "items": [...]}` and friends.
#[derive(Serialize, Deserialize)]
struct RawInsert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    replace: Option<String>,
    #[serde(default)]
    items: Vec<Value>,
}

impl TryFrom<RawInsert> for InsertPatch {
    type Error = StoreError;

    fn try_from(raw: RawInsert) -> Result<Self, Self::Error> {
        let position = match (raw.after, raw.before, raw.replace) {
            (Some(path), _, _) => InsertPosition::After(path),
            (None, Some(path), _) => InsertPosition::Before(path),
            (None, None, Some(path)) => InsertPosition::Replace(path),
            (None, None, None) => {
                return Err(StoreError::UnsupportedMutation(
                    "insert: missing either `after`, `before` or `replace` property".into(),
                ))
            }
        };
        Ok(Self {
            position,
            items: raw.items,
        })
    }
}

impl From<InsertPatch> for RawInsert {
    fn from(insert: InsertPatch) -> Self {
        let mut raw = RawInsert {
            after: None,
            before: None,
            replace: None,
            items: insert.items,
        };
        match insert.position {
            InsertPosition::After(path) => raw.after = Some(path),
            InsertPosition::Before(path) => raw.before = Some(path),
            InsertPosition::Replace(path) => raw.replace = Some(path),
        }
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn decodes_content_api_shape() {
        let patch: Patch = serde_json::from_value(json!({
            "id": "t",
            "ifRevisionId": "r0",
            "setIfMissing": {"body": []},
            "inc": {"count": 2},
            "insert": {"before": "body[0]", "items": [{"_key": "foo"}]}
        }))
        .unwrap();
        assert_eq!(patch.id, "t");
        assert_eq!(
            patch.insert.as_ref().map(|i| &i.position),
            Some(&InsertPosition::Before("body[0]".into()))
        );
        assert_eq!(patch.inc.as_ref().unwrap()["count"], Number::from(2));
    }

    #[test]
    fn insert_needs_a_position() {
        let err = serde_json::from_value::<InsertPatch>(json!({"items": []})).unwrap_err();
        assert!(err.to_string().contains("missing either"));
    }

    #[test]
    fn insert_serializes_back_to_wire_shape() {
        let insert = InsertPatch::replace("body[-1]", vec![Value::from("x")]);
        assert_eq!(
            serde_json::to_value(&insert).unwrap(),
            json!({"replace": "body[-1]", "items": ["x"]})
        );
    }

    #[test]
    fn operations_follow_application_order() {
        let patch = Patch::new("t")
            .with_insert(InsertPatch::after("a[-1]", vec![]))
            .with_inc("n", 1)
            .with_unset("gone")
            .with_set("b", "x")
            .with_set("a", "y")
            .with_dec("m", 1)
            .with_diff_match_patch("text", "@@ -0,0 +1 @@\n+s\n")
            .with_set_if_missing("c", true);
        let names: Vec<_> = patch
            .operations()
            .map(|op| (op.name(), op.path()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("set", "b"),
                ("set", "a"),
                ("setIfMissing", "c"),
                ("unset", "gone"),
                ("dec", "m"),
                ("inc", "n"),
                ("diffMatchPatch", "text"),
                ("insert", "a[-1]"),
            ]
        );
    }
}
