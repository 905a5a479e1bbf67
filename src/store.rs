//! The store facade: one dataset snapshot, its listeners and a request log.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::context::{StoreConfig, Transaction};
use crate::dataset::{diff, reduce_dataset, Change, Dataset};
use crate::errors::Result;
use crate::listener::{BatchContext, ListenerId, ListenerRegistry, Subscription};
use crate::mutation::{decode_mutations, Mutation};
use crate::query::{FilterQuery, QueryEvaluator};
use crate::value::{Document, Map};

/// Response of [`Store::mutate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResult {
    pub transaction_id: String,
    pub results: Vec<Change>,
}

impl MutationResult {
    pub fn affected_ids(&self) -> Vec<&str> {
        self.results.iter().map(|change| change.id.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OmitReason {
    Existence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Omitted {
    pub id: String,
    pub reason: OmitReason,
}

/// Response of [`Store::get_documents`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentsResponse {
    pub documents: Vec<Document>,
    pub omitted: Vec<Omitted>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenLogEntry {
    pub query: String,
    pub params: Map,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionLogEntry {
    pub id: String,
    pub timestamp: String,
    pub mutations: Vec<Mutation>,
}

/// Calls made against a store, for assertions in tests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreLog {
    pub listen: Vec<ListenLogEntry>,
    pub transactions: Vec<TransactionLogEntry>,
}

pub struct Store<Q = FilterQuery> {
    config: StoreConfig,
    dataset: Arc<Dataset>,
    listeners: ListenerRegistry,
    evaluator: Q,
    log: StoreLog,
}

impl Store<FilterQuery> {
    pub fn new(config: StoreConfig, documents: Vec<Document>) -> Self {
        Self::with_evaluator(config, documents, FilterQuery)
    }
}

impl Default for Store<FilterQuery> {
    fn default() -> Self {
        Self::new(StoreConfig::default(), Vec::new())
    }
}

impl<Q: QueryEvaluator> Store<Q> {
    pub fn with_evaluator(config: StoreConfig, documents: Vec<Document>, evaluator: Q) -> Self {
        Self {
            config,
            dataset: Arc::new(Dataset::new(documents)),
            listeners: ListenerRegistry::new(),
            evaluator,
            log: StoreLog::default(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The current snapshot. It stays valid, and unchanged, after later mutations.
    pub fn snapshot(&self) -> Arc<Dataset> {
        Arc::clone(&self.dataset)
    }

    pub fn documents(&self) -> &[Document] {
        self.dataset.documents()
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.dataset.get(id)
    }

    pub fn log(&self) -> &StoreLog {
        &self.log
    }

    /// Apply a batch atomically and notify listeners.
    ///
    /// On error nothing is committed and no listener hears about the batch.
    pub fn mutate(&mut self, transaction_id: Option<&str>, mutations: Vec<Mutation>) -> Result<MutationResult> {
        let tx = Transaction::new(transaction_id);
        let previous = Arc::clone(&self.dataset);

        let next = match reduce_dataset(&previous, &mutations, &tx) {
            Ok(next) => next,
            Err(error) => {
                warn!(transaction_id = %tx.id, %error, "transaction aborted");
                return Err(error);
            }
        };
        let results = diff(&previous, &next);
        self.dataset = Arc::new(next);

        let batch = BatchContext {
            transaction: &tx,
            identity: &self.config.identity,
            mutations: &mutations,
        };
        self.listeners
            .notify(&self.evaluator, &previous, &self.dataset, &batch);

        info!(
            transaction_id = %tx.id,
            mutations = mutations.len(),
            changed = results.len(),
            "committed transaction"
        );
        self.log.transactions.push(TransactionLogEntry {
            id: tx.id.clone(),
            timestamp: tx.timestamp,
            mutations,
        });

        Ok(MutationResult {
            transaction_id: tx.id,
            results,
        })
    }

    /// Like [`Store::mutate`], decoding the batch leniently from JSON.
    pub fn mutate_json(&mut self, transaction_id: Option<&str>, batch: serde_json::Value) -> Result<MutationResult> {
        self.mutate(transaction_id, decode_mutations(batch))
    }

    /// Start listening to changes of the documents matching `query`.
    pub fn subscribe(&mut self, query: &str, params: Map) -> Result<Subscription> {
        self.evaluator.evaluate(query, &self.dataset, &params)?;
        self.log.listen.push(ListenLogEntry {
            query: query.to_string(),
            params: params.clone(),
        });
        Ok(self.listeners.register(query, params))
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unregister(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn fetch(&self, query: &str, params: &Map) -> Result<Vec<Document>> {
        self.evaluator.evaluate(query, &self.dataset, params)
    }

    /// Documents by id, in request order. Unknown ids are reported as omitted.
    pub fn get_documents<I, S>(&self, ids: I) -> DocumentsResponse
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut response = DocumentsResponse {
            documents: Vec::new(),
            omitted: Vec::new(),
        };
        for id in ids {
            let id = id.as_ref();
            match self.dataset.get(id) {
                Some(doc) => response.documents.push(doc.clone()),
                None => response.omitted.push(Omitted {
                    id: id.to_string(),
                    reason: OmitReason::Existence,
                }),
            }
        }
        response
    }
}
