use patch_store::{
    Document, ListenEvent, Map, Mutation, MutationEvent, Patch, Store, StoreConfig, Transition, Value,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn store() -> Store {
    let docs = vec![
        Document::try_from(json!({"_id": "t", "_rev": "r0", "_type": "post", "count": 1})).unwrap(),
        Document::try_from(json!({"_id": "u", "_rev": "r0", "_type": "post", "count": 5})).unwrap(),
    ];
    Store::new(StoreConfig::default().with_identity("tester"), docs)
}

fn params(pairs: &[(&str, &str)]) -> Map {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::from(*v)))
        .collect()
}

fn mutation_events(events: Vec<ListenEvent>) -> Vec<MutationEvent> {
    events
        .into_iter()
        .filter_map(|event| match event {
            ListenEvent::Mutation(event) => Some(event),
            ListenEvent::Welcome { .. } => None,
        })
        .collect()
}

#[test]
fn test_listener_sees_one_event_for_its_document() {
    let mut store = store();
    let mut sub = store
        .subscribe("*[_id == $id]", params(&[("id", "t")]))
        .unwrap();
    assert!(matches!(sub.try_next(), Some(ListenEvent::Welcome { .. })));

    let patch = Mutation::Patch(Patch::new("t").with_inc("count", 2));
    store.mutate(Some("tx1"), vec![patch.clone()]).unwrap();

    let events = mutation_events(sub.drain());
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.event_id, "tx1#t");
    assert_eq!(event.document_id, "t");
    assert_eq!(event.transaction_id, "tx1");
    assert_eq!(event.transition, Transition::Update);
    assert_eq!(event.identity, "tester");
    assert_eq!(event.mutations, vec![patch]);
    assert_eq!(event.previous_rev.as_deref(), Some("r0"));
    assert_eq!(event.result_rev.as_deref(), Some("tx1"));
    assert_eq!(event.result.get("count"), Some(&Value::from(3)));
}

#[test]
fn test_unchanged_documents_are_not_reported() {
    let mut store = store();
    let mut sub = store.subscribe(r#"*[_type == "post"]"#, Map::new()).unwrap();
    sub.drain();

    store
        .mutate(Some("tx1"), vec![Mutation::Patch(Patch::new("u").with_set("count", 6))])
        .unwrap();

    let ids: Vec<_> = mutation_events(sub.drain())
        .into_iter()
        .map(|e| e.document_id)
        .collect();
    assert_eq!(ids, vec!["u"]);
}

#[test]
fn test_new_matches_appear() {
    let mut store = store();
    let mut sub = store.subscribe("*[count > 2]", Map::new()).unwrap();
    sub.drain();

    store
        .mutate(Some("tx1"), vec![Mutation::Patch(Patch::new("t").with_inc("count", 10))])
        .unwrap();

    let events = mutation_events(sub.drain());
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].document_id, "t");
    assert_eq!(events[0].transition, Transition::Appear);
    assert_eq!(events[0].previous_rev, None);
}

#[test]
fn test_failed_batch_notifies_nobody() {
    let mut store = store();
    let mut sub = store.subscribe("*", Map::new()).unwrap();
    sub.drain();

    let result = store.mutate(
        None,
        vec![
            Mutation::Patch(Patch::new("t").with_inc("count", 1)),
            Mutation::Patch(Patch::new("u").with_inc("_type", 1)),
        ],
    );
    assert!(result.is_err());
    assert!(sub.drain().is_empty());
}

#[test]
fn test_unsubscribe_stops_events() {
    let mut store = store();
    let mut sub = store.subscribe("*", Map::new()).unwrap();
    sub.drain();
    assert!(store.unsubscribe(sub.id));

    store
        .mutate(None, vec![Mutation::Patch(Patch::new("t").with_inc("count", 1))])
        .unwrap();
    assert!(sub.drain().is_empty());
    assert_eq!(store.log().listen.len(), 1);
}

#[test]
fn test_dropped_subscriptions_are_pruned_after_a_batch() {
    let mut store = store();
    let _kept = store.subscribe("*", Map::new()).unwrap();
    drop(store.subscribe("*", Map::new()).unwrap());
    assert_eq!(store.listener_count(), 2);

    store
        .mutate(None, vec![Mutation::Patch(Patch::new("t").with_inc("count", 1))])
        .unwrap();
    assert_eq!(store.listener_count(), 1);
}

#[tokio::test]
async fn test_events_can_be_awaited() {
    let mut store = store();
    let mut sub = store.subscribe(r#"*[_id == "t"]"#, Map::new()).unwrap();

    store
        .mutate(Some("tx1"), vec![Mutation::Patch(Patch::new("t").with_set("title", "x"))])
        .unwrap();

    let welcome = sub.next().await;
    assert_eq!(
        welcome,
        Some(ListenEvent::Welcome {
            listener_name: sub.name.clone()
        })
    );
    match sub.next().await {
        Some(ListenEvent::Mutation(event)) => {
            assert_eq!(event.event_id, "tx1#t");
            assert_eq!(
                serde_json::to_value(&event).unwrap()["visibility"],
                json!("query")
            );
        }
        other => panic!("expected a mutation event, got {other:?}"),
    }
}
