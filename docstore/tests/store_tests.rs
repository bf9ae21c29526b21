use std::sync::Arc;

use docstore::entity::Entity;
use docstore::errors::ErrorKind;
use docstore::memory::{MemoryCollection, MemoryProvider};
use docstore::query::Query;
use docstore::store::DocumentStore;
use docstore::{doc, Collection, CollectionProvider, StoreConfig, StoreError, StoreResult, Value};

#[ctor::ctor]
fn init() {
    colog::init();
}

fn store() -> DocumentStore {
    DocumentStore::new(Arc::new(MemoryProvider::new()))
}

#[test]
fn test_create_assigns_portable_id() {
    let store = store();
    let saved = store
        .save(&Entity::new("user").set("email", "alice@example.com"))
        .unwrap();

    let id = saved.id().unwrap();
    // a database-assigned id round-trips through the portable form
    assert_eq!(id.len(), 24);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(!saved.data().contains_key("_id"));
}

#[test]
fn test_generate_id_hook_applies_on_create() {
    let config = StoreConfig::new().generate_id(|ent| Some(format!("{}-0001", ent.name())));
    let store = DocumentStore::with_config(Arc::new(MemoryProvider::new()), config);

    let saved = store.save(&Entity::new("user").set("n", 1)).unwrap();
    assert_eq!(saved.id(), Some("user-0001"));

    let loaded = store
        .load(&Entity::new("user"), &Query::id("user-0001"))
        .unwrap();
    assert!(loaded.is_some());
}

#[test]
fn test_explicit_id_beats_generate_hook() {
    let config = StoreConfig::new().generate_id(|_| Some("generated".to_string()));
    let store = DocumentStore::with_config(Arc::new(MemoryProvider::new()), config);

    let saved = store
        .save(&Entity::new("user").with_explicit_id("chosen").set("n", 1))
        .unwrap();
    assert_eq!(saved.id(), Some("chosen"));
}

#[test]
fn test_update_merges_by_default() {
    let store = store();
    let created = store
        .save(&Entity::new("user").set("email", "a@b.c").set("score", 1))
        .unwrap();

    let updated = store
        .save(
            &Entity::new("user")
                .with_id(created.id().unwrap())
                .set("score", 2),
        )
        .unwrap();

    assert_eq!(updated.get("email"), Value::from("a@b.c"));
    assert_eq!(updated.get("score"), Value::I32(2));
}

#[test]
fn test_update_replaces_when_merge_disabled() {
    let store = DocumentStore::with_config(
        Arc::new(MemoryProvider::new()),
        StoreConfig::new().merge_on_update(false),
    );
    let created = store
        .save(&Entity::new("user").set("email", "a@b.c").set("score", 1))
        .unwrap();

    let updated = store
        .save(
            &Entity::new("user")
                .with_id(created.id().unwrap())
                .set("score", 2),
        )
        .unwrap();

    assert_eq!(updated.get("email"), Value::Null);
    assert_eq!(updated.get("score"), Value::I32(2));
    assert_eq!(updated.id(), created.id());
}

#[test]
fn test_entity_merge_override_beats_config() {
    let store = store();
    let created = store
        .save(&Entity::new("user").set("email", "a@b.c").set("score", 1))
        .unwrap();

    let updated = store
        .save(
            &Entity::new("user")
                .with_id(created.id().unwrap())
                .with_merge(false)
                .set("score", 2),
        )
        .unwrap();

    assert_eq!(updated.get("email"), Value::Null);
}

#[test]
fn test_upsert_by_key_converges_on_one_document() {
    let store = store();
    let first = store
        .save(
            &Entity::new("user")
                .with_upsert(["email"])
                .set("email", "a@b.c")
                .set("n", 1),
        )
        .unwrap();
    let second = store
        .save(
            &Entity::new("user")
                .with_upsert(["email"])
                .set("email", "a@b.c")
                .set("n", 2),
        )
        .unwrap();

    assert_eq!(first.id(), second.id());
    assert_eq!(second.get("n"), Value::I32(2));

    let all = store.list(&Entity::new("user"), &Query::new()).unwrap();
    assert_eq!(all.len(), 1);
}

#[test]
fn test_upsert_survives_lost_insert_race() {
    let provider = MemoryProvider::new();
    let collection = MemoryCollection::new();
    collection.fail_upsert_inserts(2);
    provider.register("user", collection);

    let store = DocumentStore::new(Arc::new(provider.clone()));
    let saved = store
        .save(
            &Entity::new("user")
                .with_upsert(["email"])
                .set("email", "a@b.c"),
        )
        .unwrap();

    assert!(saved.id().is_some());
    assert_eq!(provider.get("user").unwrap().len(), 1);
}

#[test]
fn test_upsert_surfaces_persistent_conflict() {
    let provider = MemoryProvider::new();
    let collection = MemoryCollection::new();
    collection.fail_upsert_inserts(10);
    provider.register("user", collection);

    let store = DocumentStore::new(Arc::new(provider));
    let err = store
        .save(
            &Entity::new("user")
                .with_upsert(["email"])
                .set("email", "a@b.c"),
        )
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::DuplicateKey);
}

#[test]
fn test_upsert_with_missing_key_field_degrades_to_create() {
    let store = store();
    store
        .save(&Entity::new("user").with_upsert(["email"]).set("n", 1))
        .unwrap();
    store
        .save(&Entity::new("user").with_upsert(["email"]).set("n", 2))
        .unwrap();

    let all = store.list(&Entity::new("user"), &Query::new()).unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn test_load_by_id_list() {
    let store = store();
    let a = store.save(&Entity::new("user").set("k", "a")).unwrap();
    let b = store.save(&Entity::new("user").set("k", "b")).unwrap();
    store.save(&Entity::new("user").set("k", "c")).unwrap();

    let listed = store
        .list(
            &Entity::new("user"),
            &Query::ids([a.id().unwrap(), b.id().unwrap()]),
        )
        .unwrap();
    assert_eq!(listed.len(), 2);
}

#[test]
fn test_id_term_discards_sibling_terms() {
    let store = store();
    let saved = store.save(&Entity::new("user").set("k", "a")).unwrap();

    // the mismatched sibling term is ignored: id lookup wins outright
    let loaded = store
        .load(
            &Entity::new("user"),
            &Query::new()
                .term("id", saved.id().unwrap())
                .term("k", "wrong"),
        )
        .unwrap();
    assert!(loaded.is_some());
}

#[test]
fn test_list_sort_skip_limit_fields() {
    let store = store();
    for (n, label) in [(3, "c"), (1, "a"), (4, "d"), (2, "b")] {
        store
            .save(&Entity::new("item").set("n", n).set("label", label).set("extra", true))
            .unwrap();
    }

    let listed = store
        .list(
            &Entity::new("item"),
            &Query::new()
                .sort("n", 1)
                .skip(1)
                .limit(2)
                .fields(["label"]),
        )
        .unwrap();

    let labels: Vec<_> = listed.iter().map(|e| e.get("label")).collect();
    assert_eq!(labels, vec![Value::from("b"), Value::from("c")]);
    // projected-out fields are absent; ids always survive
    assert_eq!(listed[0].get("extra"), Value::Null);
    assert!(listed[0].id().is_some());
}

#[test]
fn test_native_escape_bypasses_normalization() {
    let store = store();
    store.save(&Entity::new("user").set("status", "active")).unwrap();
    store.save(&Entity::new("user").set("status", "idle")).unwrap();

    let listed = store
        .list(
            &Entity::new("user"),
            &Query::new().native(doc! { status: "active" }),
        )
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].get("status"), Value::from("active"));
}

#[test]
fn test_array_term_matches_any_member() {
    let store = store();
    store.save(&Entity::new("user").set("fruit", "apple")).unwrap();
    store.save(&Entity::new("user").set("fruit", "orange")).unwrap();
    store.save(&Entity::new("user").set("fruit", "kiwi")).unwrap();

    let listed = store
        .list(
            &Entity::new("user"),
            &Query::new().term("fruit", Value::Array(vec!["apple".into(), "kiwi".into()])),
        )
        .unwrap();
    assert_eq!(listed.len(), 2);
}

#[test]
fn test_remove_returns_removed_entity_by_default() {
    let store = store();
    store.save(&Entity::new("user").set("k", "x")).unwrap();

    let removed = store
        .remove(&Entity::new("user"), &Query::new().term("k", "x"))
        .unwrap()
        .unwrap();
    assert_eq!(removed.get("k"), Value::from("x"));
    assert!(store
        .list(&Entity::new("user"), &Query::new())
        .unwrap()
        .is_empty());
}

#[test]
fn test_remove_all_directive() {
    let store = store();
    for n in 0..3 {
        store.save(&Entity::new("user").set("g", 1).set("n", n)).unwrap();
    }

    let removed = store
        .remove(&Entity::new("user"), &Query::new().term("g", 1).all(true))
        .unwrap();
    assert!(removed.is_none());
    assert!(store
        .list(&Entity::new("user"), &Query::new())
        .unwrap()
        .is_empty());
}

#[test]
fn test_remove_load_false_suppresses_result() {
    let store = store();
    store.save(&Entity::new("user").set("k", "x")).unwrap();

    let removed = store
        .remove(
            &Entity::new("user"),
            &Query::new().term("k", "x").load(false),
        )
        .unwrap();
    assert!(removed.is_none());
}

#[test]
fn test_unique_index_conflict_surfaces_on_create() {
    let provider = MemoryProvider::new();
    provider.register("user", MemoryCollection::with_unique_index(["email"]));
    let store = DocumentStore::new(Arc::new(provider));

    store
        .save(&Entity::new("user").set("email", "a@b.c"))
        .unwrap();
    let err = store
        .save(&Entity::new("user").set("email", "a@b.c"))
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::DuplicateKey);
}

struct FailingProvider;

impl CollectionProvider for FailingProvider {
    fn collection(&self, name: &str) -> StoreResult<Arc<dyn Collection>> {
        Err(StoreError::new(
            &format!("no backend for {}", name),
            ErrorKind::BackendError,
        ))
    }
}

#[test]
fn test_backend_failure_propagates_unchanged() {
    let store = DocumentStore::new(Arc::new(FailingProvider));

    let err = store.save(&Entity::new("user").set("n", 1)).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::BackendError);
    assert!(err.message().contains("no backend for user"));

    let err = store.load(&Entity::new("user"), &Query::id("x")).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::BackendError);
}

#[test]
fn test_query_from_document_round_trip_through_store() {
    let store = store();
    for n in [2, 1, 3] {
        store.save(&Entity::new("num").set("n", n)).unwrap();
    }

    let raw = doc! {
        "sort$": { n: -1 },
        "limit$": 2,
    };
    let listed = store
        .list(&Entity::new("num"), &Query::from_document(&raw))
        .unwrap();
    let values: Vec<_> = listed.iter().map(|e| e.get("n")).collect();
    assert_eq!(values, vec![Value::I32(3), Value::I32(2)]);
}
