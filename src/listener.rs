//! Change notification for query listeners.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::context::Transaction;
use crate::dataset::Dataset;
use crate::mutation::Mutation;
use crate::query::QueryEvaluator;
use crate::value::{Document, Map};

pub type ListenerId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ListenEvent {
    /// Sent once, right after subscribing.
    #[serde(rename_all = "camelCase")]
    Welcome { listener_name: String },
    Mutation(MutationEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    /// The document matched the query before and after the batch.
    Update,
    /// The document matches the query for the first time.
    Appear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationEvent {
    pub event_id: String,
    pub document_id: String,
    pub transaction_id: String,
    pub transition: Transition,
    pub identity: String,
    pub mutations: Vec<Mutation>,
    pub result: Document,
    pub previous_rev: Option<String>,
    pub result_rev: Option<String>,
    pub timestamp: String,
    pub visibility: String,
}

/// Everything a batch notification needs besides the snapshots.
pub struct BatchContext<'a> {
    pub transaction: &'a Transaction,
    pub identity: &'a str,
    pub mutations: &'a [Mutation],
}

struct Listener {
    id: ListenerId,
    name: String,
    query: String,
    params: Map,
    sender: UnboundedSender<ListenEvent>,
}

/// Receiving end of a listener.
#[derive(Debug)]
pub struct Subscription {
    pub id: ListenerId,
    pub name: String,
    events: UnboundedReceiver<ListenEvent>,
}

impl Subscription {
    /// Next queued event without waiting.
    pub fn try_next(&mut self) -> Option<ListenEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Wait for the next event; `None` once the listener is gone.
    pub async fn next(&mut self) -> Option<ListenEvent> {
        self.events.recv().await
    }

    /// Every event queued so far.
    pub fn drain(&mut self) -> Vec<ListenEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}

#[derive(Default)]
pub struct ListenerRegistry {
    next_id: ListenerId,
    listeners: Vec<Listener>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, query: &str, params: Map) -> Subscription {
        let (sender, events) = mpsc::unbounded_channel();
        let id = self.next_id;
        self.next_id += 1;
        let name: String = Uuid::new_v4().simple().to_string().chars().take(22).collect();

        // The receiver is alive, so this cannot fail.
        let _ = sender.send(ListenEvent::Welcome {
            listener_name: name.clone(),
        });
        self.listeners.push(Listener {
            id,
            name: name.clone(),
            query: query.to_string(),
            params,
            sender,
        });
        debug!(listener = %name, query, "registered listener");

        Subscription { id, name, events }
    }

    /// Remove a listener; `false` when the id is unknown.
    pub fn unregister(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Emit one event per document that entered or changed in each listener's
    /// result between `previous` and `current`.
    pub fn notify<Q>(&mut self, evaluator: &Q, previous: &Dataset, current: &Dataset, batch: &BatchContext<'_>)
    where
        Q: QueryEvaluator + ?Sized,
    {
        let mut closed = Vec::new();

        for listener in &self.listeners {
            if listener.sender.is_closed() {
                closed.push(listener.id);
                continue;
            }

            let results = evaluator
                .evaluate(&listener.query, previous, &listener.params)
                .and_then(|before| {
                    evaluator
                        .evaluate(&listener.query, current, &listener.params)
                        .map(|after| (before, after))
                });
            let (before, after) = match results {
                Ok(results) => results,
                Err(error) => {
                    warn!(listener = %listener.name, %error, "listener query failed, skipping listener");
                    continue;
                }
            };

            for (prev, doc) in changed_documents(&before, &after) {
                let event = mutation_event(prev, doc, batch);
                if listener.sender.send(ListenEvent::Mutation(event)).is_err() {
                    closed.push(listener.id);
                    break;
                }
                debug!(listener = %listener.name, document_id = %doc.id(), "emitted mutation event");
            }
        }

        if !closed.is_empty() {
            self.listeners.retain(|l| !closed.contains(&l.id));
            debug!(pruned = closed.len(), "pruned closed listeners");
        }
    }
}

fn mutation_event(prev: Option<&Document>, doc: &Document, batch: &BatchContext<'_>) -> MutationEvent {
    let tx = batch.transaction;
    MutationEvent {
        event_id: format!("{}#{}", tx.id, doc.id()),
        document_id: doc.id().to_string(),
        transaction_id: tx.id.clone(),
        transition: if prev.is_some() {
            Transition::Update
        } else {
            Transition::Appear
        },
        identity: batch.identity.to_string(),
        mutations: batch.mutations.to_vec(),
        result: doc.clone(),
        previous_rev: prev.and_then(Document::rev).map(str::to_string),
        result_rev: doc.rev().map(str::to_string),
        timestamp: tx.timestamp.clone(),
        visibility: "query".into(),
    }
}

/// Documents of `current`, in order, whose predecessor with the same id in
/// `previous` is missing or no longer the same record.
pub fn changed_documents<'a>(
    previous: &'a [Document],
    current: &'a [Document],
) -> Vec<(Option<&'a Document>, &'a Document)> {
    let before: HashMap<&str, &Document> = previous.iter().map(|doc| (doc.id(), doc)).collect();
    current
        .iter()
        .filter_map(|doc| match before.get(doc.id()) {
            Some(prev) if prev.ptr_eq(doc) => None,
            prev => Some((prev.copied(), doc)),
        })
        .collect()
}
