use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::StoreError;
use crate::patch::Patch;
use crate::value::{Document, Map};

/// One entry of a mutation batch, in the content API's JSON shape
/// (`{"create": {...}}`, `{"patch": {...}}`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mutation {
    Create(Document),
    CreateIfNotExists(Document),
    CreateOrReplace(Document),
    Delete(DeleteSelection),
    Patch(Patch),
}

impl Mutation {
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::Create(_) => "create",
            Mutation::CreateIfNotExists(_) => "createIfNotExists",
            Mutation::CreateOrReplace(_) => "createOrReplace",
            Mutation::Delete(_) => "delete",
            Mutation::Patch(_) => "patch",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeleteSelection {
    Ids {
        id: IdSelector,
    },
    Query {
        query: String,
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        params: Map,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdSelector {
    One(String),
    Many(Vec<String>),
}

impl IdSelector {
    pub fn contains(&self, id: &str) -> bool {
        match self {
            IdSelector::One(one) => one == id,
            IdSelector::Many(many) => many.iter().any(|m| m == id),
        }
    }
}

/// Decode a batch leniently: entries that are not a known mutation are
/// logged and skipped. A lone object is treated as a batch of one.
pub fn decode_mutations(batch: serde_json::Value) -> Vec<Mutation> {
    let entries = match batch {
        serde_json::Value::Array(entries) => entries,
        single => vec![single],
    };
    entries
        .iter()
        .filter_map(|entry| match Mutation::deserialize(entry) {
            Ok(mutation) => Some(mutation),
            Err(e) => {
                let error = StoreError::UnsupportedMutation(format!("{entry}: {e}"));
                warn!(%error, "skipping mutation");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn decodes_every_kind() {
        let batch = json!([
            {"create": {"_id": "a", "_type": "post"}},
            {"createIfNotExists": {"_id": "b"}},
            {"createOrReplace": {"_id": "c"}},
            {"delete": {"id": "a"}},
            {"delete": {"id": ["b", "c"]}},
            {"delete": {"query": "*[_type == $t]", "params": {"t": "post"}}},
            {"patch": {"id": "a", "set": {"title": "x"}}}
        ]);
        let kinds: Vec<_> = decode_mutations(batch).iter().map(Mutation::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "create",
                "createIfNotExists",
                "createOrReplace",
                "delete",
                "delete",
                "delete",
                "patch"
            ]
        );
    }

    #[test]
    fn skips_unknown_shapes() {
        let batch = json!([
            {"explode": {"_id": "a"}},
            {"create": {"title": "no id"}},
            {"delete": {"id": "a"}}
        ]);
        assert_eq!(
            decode_mutations(batch),
            vec![Mutation::Delete(DeleteSelection::Ids {
                id: IdSelector::One("a".into())
            })]
        );
    }

    #[test]
    fn serializes_externally_tagged() {
        let mutation = Mutation::Delete(DeleteSelection::Ids {
            id: IdSelector::Many(vec!["a".into(), "b".into()]),
        });
        assert_eq!(
            serde_json::to_value(&mutation).unwrap(),
            json!({"delete": {"id": ["a", "b"]}})
        );
    }

    #[test]
    fn id_selector_contains() {
        assert!(IdSelector::One("a".into()).contains("a"));
        assert!(!IdSelector::Many(vec!["a".into()]).contains("b"));
    }
}
