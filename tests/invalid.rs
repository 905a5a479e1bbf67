use patch_store::path::parse;
use patch_store::{Document, Mutation, Patch, Store, StoreConfig, StoreError, Value};
use serde_json::json;

fn store() -> Store {
    let docs = vec![
        Document::try_from(json!({"_id": "a", "title": "x", "n": 1})).unwrap(),
        Document::try_from(json!({"_id": "b", "n": 2})).unwrap(),
    ];
    Store::new(StoreConfig::default(), docs)
}

// Characters outside the path alphabet fail in the tokenizer, with the offset
// of the first one.
#[test]
fn test_invalid_path_character() {
    match parse("body[0]#") {
        Err(StoreError::Tokenize { path, offset }) => {
            assert_eq!(path, "body[0]#");
            assert_eq!(offset, 7);
        }
        other => panic!("expected a tokenize error, got {other:?}"),
    }
}

#[test]
fn test_unbalanced_union() {
    assert!(matches!(parse("body[0"), Err(StoreError::Parse { .. })));
    assert!(matches!(parse("body]"), Err(StoreError::Parse { .. })));
}

#[test]
fn test_constraint_without_literal() {
    let err = parse("body[_key==]").unwrap_err();
    assert!(err.to_string().contains("literal"), "{err}");
}

#[test]
fn test_inc_on_string_aborts_batch() {
    let mut store = store();
    let before = store.snapshot();
    let err = store
        .mutate(
            None,
            vec![
                Mutation::Patch(Patch::new("b").with_inc("n", 5)),
                Mutation::Patch(Patch::new("a").with_inc("title", 1)),
            ],
        )
        .unwrap_err();

    assert!(matches!(
        err.root_cause(),
        StoreError::TypeMismatch {
            expected: "number",
            found: "string"
        }
    ));
    assert!(err.to_string().contains("inc `title` on document `a`"), "{err}");
    // the first patch was not committed either
    assert_eq!(store.get("b").unwrap().get("n"), Some(&Value::from(2)));
    assert!(std::sync::Arc::ptr_eq(&before, &store.snapshot()));
}

#[test]
fn test_bad_path_in_patch_is_fatal() {
    let mut store = store();
    let err = store
        .mutate(None, vec![Mutation::Patch(Patch::new("a").with_set("title[", "y"))])
        .unwrap_err();
    assert!(matches!(err.root_cause(), StoreError::Parse { .. }));
}

#[test]
fn test_bad_diff_match_patch_text_is_fatal() {
    let mut store = store();
    let err = store
        .mutate(
            None,
            vec![Mutation::Patch(
                Patch::new("a").with_diff_match_patch("title", "garbage"),
            )],
        )
        .unwrap_err();
    assert!(matches!(err.root_cause(), StoreError::InvalidPatchText(_)));
}

// Missing intermediates are not errors: the document is only re-stamped.
#[test]
fn test_missing_intermediate_is_not_an_error() {
    let mut store = store();
    store
        .mutate(
            Some("tx1"),
            vec![Mutation::Patch(Patch::new("a").with_set("deep.er.path", 1))],
        )
        .unwrap();
    let a = store.get("a").unwrap();
    assert!(a.get("deep").is_none());
    assert_eq!(a.rev(), Some("tx1"));
}

#[test]
fn test_unknown_mutations_are_skipped() {
    let mut store = store();
    let result = store
        .mutate_json(None, json!([{"frobnicate": {"id": "a"}}, {"delete": {"id": "b"}}]))
        .unwrap();
    assert_eq!(result.affected_ids(), vec!["b"]);
    assert!(store.get("b").is_none());
}

#[test]
fn test_query_errors_propagate_from_fetch() {
    let store = store();
    assert!(matches!(
        store.fetch("*[_id == $id]", &Default::default()),
        Err(StoreError::Query(_))
    ));
}
