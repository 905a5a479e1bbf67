//! Dataset snapshots and the mutation reducer.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::Transaction;
use crate::errors::{Result, StoreError};
use crate::mutation::{DeleteSelection, Mutation};
use crate::patch::reduce_document;
use crate::value::Document;

/// An ordered set of documents with unique ids.
///
/// Snapshots are never changed in place: reducing a batch yields a new
/// dataset in which untouched documents share their record with the old one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    documents: Vec<Document>,
}

impl Dataset {
    /// Later documents with an id already seen are dropped.
    pub fn new(documents: Vec<Document>) -> Self {
        let mut seen = HashSet::new();
        let documents = documents
            .into_iter()
            .filter(|doc| {
                let fresh = seen.insert(doc.id().to_string());
                if !fresh {
                    warn!(document_id = %doc.id(), "duplicate document id, keeping the first");
                }
                fresh
            })
            .collect();
        Self { documents }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|doc| doc.id() == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.documents.iter().position(|doc| doc.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.documents.iter()
    }
}

impl FromIterator<Document> for Dataset {
    fn from_iter<I: IntoIterator<Item = Document>>(iter: I) -> Self {
        Dataset::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Document;
    type IntoIter = std::slice::Iter<'a, Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Apply a batch in order. Any fatal error aborts the whole batch.
pub fn reduce_dataset(dataset: &Dataset, mutations: &[Mutation], tx: &Transaction) -> Result<Dataset> {
    let mut next = dataset.clone();
    for mutation in mutations {
        apply_mutation(&mut next, mutation, tx)?;
    }
    Ok(next)
}

pub fn apply_mutation(dataset: &mut Dataset, mutation: &Mutation, tx: &Transaction) -> Result<()> {
    let documents = &mut dataset.documents;
    match mutation {
        Mutation::Create(doc) => {
            if documents.iter().any(|d| d.id() == doc.id()) {
                warn!(document_id = %doc.id(), "document already exists, skipping create");
            } else {
                documents.push(doc.created(tx));
            }
        }
        Mutation::CreateIfNotExists(doc) => {
            if !documents.iter().any(|d| d.id() == doc.id()) {
                documents.push(doc.created(tx));
            }
        }
        Mutation::CreateOrReplace(doc) => {
            match documents.iter().position(|d| d.id() == doc.id()) {
                Some(i) => documents[i] = doc.created(tx),
                None => documents.push(doc.created(tx)),
            }
        }
        Mutation::Delete(DeleteSelection::Ids { id }) => {
            documents.retain(|d| !id.contains(d.id()));
        }
        Mutation::Delete(DeleteSelection::Query { query, .. }) => {
            let error = StoreError::UnsupportedMutation(format!("delete by query `{query}`"));
            warn!(%error, "skipping mutation");
        }
        Mutation::Patch(patch) => match documents.iter().position(|d| d.id() == patch.id) {
            Some(i) => {
                let patched = reduce_document(&documents[i], patch, tx)?;
                documents[i] = patched;
            }
            None => debug!(document_id = %patch.id, "patch target does not exist"),
        },
    }
    debug!(mutation = mutation.kind(), transaction_id = %tx.id, "applied mutation");
    Ok(())
}

/// What happened to one document between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub id: String,
    pub operation: ChangeKind,
}

/// Documents created or updated (in `current` order), then deleted (in `previous` order).
/// A document counts as updated when its record is no longer the same one.
pub fn diff(previous: &Dataset, current: &Dataset) -> Vec<Change> {
    let before: HashMap<&str, &Document> =
        previous.iter().map(|doc| (doc.id(), doc)).collect();
    let after: HashSet<&str> = current.iter().map(Document::id).collect();

    let upserts = current.iter().filter_map(|doc| {
        let operation = match before.get(doc.id()) {
            None => ChangeKind::Create,
            Some(old) if !old.ptr_eq(doc) => ChangeKind::Update,
            Some(_) => return None,
        };
        Some(Change {
            id: doc.id().to_string(),
            operation,
        })
    });
    let deletes = previous
        .iter()
        .filter(|doc| !after.contains(doc.id()))
        .map(|doc| Change {
            id: doc.id().to_string(),
            operation: ChangeKind::Delete,
        });

    upserts.chain(deletes).collect()
}
