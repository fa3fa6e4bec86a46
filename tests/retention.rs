//! End-to-end tests for the retention graph.
//!
//! These drive a `GraphStore` through the full protocol: define, resolve,
//! query and summarize.

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;
use retention_graph::{
    EdgeDescriptor, EdgeType, FinalizationEntry, GraphError, GraphSnapshot, GraphState,
    GraphStore, HookEvent, KeyValueEntry, NodeKind, PrivateFieldEntry, RecordingHooks, ValueRef,
};

type Store = GraphStore<&'static str, String>;

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn meta(s: &str) -> String {
    s.to_string()
}

fn new_store() -> Store {
    init_tracing();
    let mut store = GraphStore::new();
    store
        .define_target_and_held_values("target", meta("{}"), "held", meta("[...]"))
        .unwrap();
    store
}

fn object(store: &mut Store, key: &'static str) {
    store.define_object(key, meta(key)).unwrap();
}

fn strong(store: &mut Store, parent: &'static str, child: &'static str, label: &str) {
    store
        .define_property_value(&parent, &child, EdgeDescriptor::strong(label, meta(label)))
        .unwrap();
}

fn weak_entry(
    store: &mut Store,
    map: &'static str,
    key: &'static str,
    value: &'static str,
) -> retention_graph::TupleIds {
    store
        .define_map_key_value_tuple(
            &map,
            KeyValueEntry {
                key: ValueRef::Identity(key),
                value: ValueRef::Identity(value),
                is_strong_reference_to_key: false,
                tuple_metadata: meta("entry"),
                key_metadata: Some(meta("key")),
                value_metadata: Some(meta("value")),
            },
        )
        .unwrap()
}

/// heldValues = [A, B, E]; A weakly refers to the target; B is a weak map
/// with entries (C → target) and, optionally, (E → C).
fn build_chain(with_e_to_c: bool) -> Store {
    let mut store = new_store();
    for key in ["A", "B", "C", "E"] {
        object(&mut store, key);
    }
    strong(&mut store, "held", "A", "0");
    strong(&mut store, "held", "B", "1");
    strong(&mut store, "held", "E", "2");
    store
        .define_internal_slot(&"A", &"target", EdgeDescriptor::weak("[[WeakRefTarget]]", meta("slot")))
        .unwrap();
    weak_entry(&mut store, "B", "C", "target");
    if with_e_to_c {
        weak_entry(&mut store, "B", "E", "C");
    }
    store
}

// ─────────────────────────────────────────────────────────────────────────────
// Identity
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_duplicate_identity_is_rejected() {
    let mut store = new_store();
    object(&mut store, "a");

    let err = store.define_object("a", meta("again")).unwrap_err();
    assert!(matches!(err, GraphError::DuplicateDefinition(_)));
    assert_eq!(store.state(), GraphState::Error);
}

#[test]
fn test_ids_are_prefixed_per_kind() {
    let mut store = new_store();
    let a = store.define_object("a", meta("a")).unwrap();
    let b = store.define_object("b", meta("b")).unwrap();
    let sym = store.define_symbol("sym", meta("Symbol()")).unwrap();
    let name = store.define_private_name("#x", meta("#x")).unwrap();

    assert_eq!(store.target_id().map(|id| id.as_str()), Some("target:0"));
    assert_eq!(store.held_values_id().map(|id| id.as_str()), Some("heldValues:0"));
    assert_eq!(a.as_str(), "object:0");
    assert_eq!(b.as_str(), "object:1");
    assert_eq!(sym.as_str(), "symbol:0");
    assert_eq!(name.as_str(), "privateName:0");
    assert_eq!(store.get_weak_key_id(&"b").unwrap(), b);
}

#[test]
fn test_unknown_identity_is_not_found() {
    let mut store = new_store();
    object(&mut store, "a");

    let err = store
        .define_property_value(&"a", &"missing", EdgeDescriptor::strong("p", meta("p")))
        .unwrap_err();
    assert!(matches!(err, GraphError::NotFound(_)));
    assert!(!store.has_weak_key(&"missing"));
}

proptest! {
    #[test]
    fn prop_distinct_identities_get_distinct_ids(
        keys in proptest::collection::hash_set(0u32..1_000_000, 0..64)
    ) {
        let mut store: GraphStore<u32, ()> = GraphStore::new();
        store.define_target_and_held_values(u32::MAX, (), u32::MAX - 1, ()).unwrap();

        let mut seen = HashSet::new();
        for key in &keys {
            let id = store.define_object(*key, ()).unwrap();
            prop_assert!(seen.insert(id.clone()));
            prop_assert_eq!(store.get_weak_key_id(key).unwrap(), id);
        }
        prop_assert_eq!(store.node_count(), keys.len() + 2);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Joint ownership
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_weak_map_entry_without_strong_key() {
    let mut store = new_store();
    for key in ["M", "K", "V"] {
        object(&mut store, key);
    }
    strong(&mut store, "held", "M", "map");
    let ids = weak_entry(&mut store, "M", "K", "V");
    store.mark_strong_references().unwrap();

    assert!(store.is_held_strongly(&"M").unwrap());
    assert!(store.is_node_held_strongly(&ids.tuple).unwrap());
    assert!(!store.is_held_strongly(&"K").unwrap());
    assert!(!store.is_held_strongly(&"V").unwrap());
    assert!(!store
        .is_edge_held_strongly(ids.edge_for(EdgeType::MapValue).unwrap())
        .unwrap());
}

#[test]
fn test_weak_map_entry_with_strong_key() {
    let mut store = new_store();
    for key in ["M", "K", "V"] {
        object(&mut store, key);
    }
    strong(&mut store, "held", "M", "map");
    strong(&mut store, "held", "K", "key");
    let ids = weak_entry(&mut store, "M", "K", "V");
    store.mark_strong_references().unwrap();

    assert!(store.is_held_strongly(&"K").unwrap());
    assert!(store.is_held_strongly(&"V").unwrap());
    assert!(store
        .is_edge_held_strongly(ids.edge_for(EdgeType::MapValue).unwrap())
        .unwrap());
    // the weak key edge itself never propagates strength
    assert!(!store
        .is_edge_held_strongly(ids.edge_for(EdgeType::MapKey).unwrap())
        .unwrap());
}

#[test]
fn test_transitive_chain_through_weak_map() {
    let mut store = build_chain(true);
    let stats = store.mark_strong_references().unwrap();

    for key in ["target", "A", "B", "C", "E"] {
        assert!(store.is_held_strongly(&key).unwrap(), "{key} should be strongly held");
    }
    assert_eq!(stats.satisfied_edges, 7);
}

#[test]
fn test_missing_link_leaves_target_weak() {
    let mut store = build_chain(false);
    store.mark_strong_references().unwrap();

    assert!(!store.is_held_strongly(&"C").unwrap());
    assert!(!store.is_held_strongly(&"target").unwrap());
    for key in ["A", "B", "E"] {
        assert!(store.is_held_strongly(&key).unwrap(), "{key} should be strongly held");
    }
}

#[test]
fn test_finalization_registration_does_not_retain_target() {
    let mut store = new_store();
    for key in ["registry", "cleanup"] {
        object(&mut store, key);
    }
    strong(&mut store, "held", "registry", "registry");
    let ids = store
        .define_finalization_tuple(
            &"registry",
            FinalizationEntry {
                target: "target",
                held_value: ValueRef::Identity("cleanup"),
                unregister_token: None,
                tuple_metadata: meta("registration"),
                target_metadata: meta("target"),
                held_value_metadata: Some(meta("heldValue")),
                unregister_token_metadata: None,
            },
        )
        .unwrap();
    store.mark_strong_references().unwrap();

    assert!(store.is_held_strongly(&"cleanup").unwrap());
    assert!(!store.is_held_strongly(&"target").unwrap());
    assert!(store.is_node_held_strongly(&ids.tuple).unwrap());
}

// ─────────────────────────────────────────────────────────────────────────────
// Edge kinds and tuples
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_two_party_edge_kinds() {
    let mut store = new_store();
    for key in ["obj", "getter", "ctor", "captured", "set", "element"] {
        object(&mut store, key);
    }
    store.define_symbol("sym", meta("Symbol(tag)")).unwrap();
    strong(&mut store, "held", "obj", "obj");
    strong(&mut store, "held", "set", "set");

    let getter = store
        .define_property_getter(&"obj", &"getter", EdgeDescriptor::strong("get size", meta("get")))
        .unwrap();
    let ctor = store
        .define_constructor_of(&"obj", &"ctor", EdgeDescriptor::strong("constructor", meta("ctor")))
        .unwrap();
    let scope = store
        .define_scope_value(&"getter", &"captured", EdgeDescriptor::strong("cache", meta("scope")))
        .unwrap();
    let symbol = store
        .define_symbol_key(&"obj", &"sym", EdgeDescriptor::strong("[Symbol(tag)]", meta("sym")))
        .unwrap();
    let element = store
        .define_set_element(&"set", &"element", EdgeDescriptor::weak("element", meta("element")))
        .unwrap();
    store.mark_strong_references().unwrap();

    for (id, edge_type, prefix) in [
        (&getter, EdgeType::PropertyGetter, "propertyGetter:0"),
        (&ctor, EdgeType::ConstructorOf, "constructorOf:0"),
        (&scope, EdgeType::ScopeValue, "scopeValue:0"),
        (&symbol, EdgeType::SymbolKey, "symbolKey:0"),
        (&element, EdgeType::SetElement, "setElement:0"),
    ] {
        assert_eq!(id.as_str(), prefix);
        assert_eq!(store.get_edge_relationship(id).unwrap().edge_type, edge_type);
    }

    for key in ["obj", "getter", "ctor", "captured", "sym", "set"] {
        assert!(store.is_held_strongly(&key).unwrap(), "{key} should be strongly held");
    }
    assert!(!store.is_held_strongly(&"element").unwrap());
    assert!(store.is_edge_held_strongly(&scope).unwrap());
    assert!(!store.is_edge_held_strongly(&element).unwrap());
}

#[test]
fn test_private_field_retains_value() {
    let mut store = new_store();
    object(&mut store, "obj");
    store.define_private_name("#secret", meta("#secret")).unwrap();
    strong(&mut store, "held", "obj", "obj");
    let ids = store
        .define_private_field_tuple(
            &"obj",
            PrivateFieldEntry {
                private_name: "#secret",
                value: ValueRef::Identity("target"),
                is_getter: false,
                tuple_metadata: meta("field"),
                key_metadata: meta("name"),
                value_metadata: Some(meta("value")),
            },
        )
        .unwrap();
    store.mark_strong_references().unwrap();

    let name_id = store.get_weak_key_id(&"#secret").unwrap();
    let value_edge = ids.edge_for(EdgeType::PrivateValue).unwrap().clone();
    assert!(store
        .get_edge_relationship(&value_edge)
        .unwrap()
        .joint_owners
        .contains(&name_id));
    assert!(store.is_held_strongly(&"#secret").unwrap());
    assert!(store.is_held_strongly(&"target").unwrap());
    assert!(store.is_edge_held_strongly(&value_edge).unwrap());

    let summary = store.summarize_graph_to_target(true).unwrap();
    assert_eq!(summary.node_count(), 5);
    assert_eq!(summary.edge_count(), 4);
    assert!(summary.contains_node(&name_id));
}

#[test]
fn test_private_getter_edge() {
    let mut store = new_store();
    for key in ["obj", "read"] {
        object(&mut store, key);
    }
    store.define_private_name("#value", meta("#value")).unwrap();
    strong(&mut store, "held", "obj", "obj");
    let ids = store
        .define_private_field_tuple(
            &"obj",
            PrivateFieldEntry {
                private_name: "#value",
                value: ValueRef::Identity("read"),
                is_getter: true,
                tuple_metadata: meta("accessor"),
                key_metadata: meta("name"),
                value_metadata: Some(meta("get")),
            },
        )
        .unwrap();
    store.mark_strong_references().unwrap();

    assert!(ids.edge_for(EdgeType::PrivateValue).is_none());
    let getter = ids.edge_for(EdgeType::PrivateGetter).unwrap();
    assert!(store.is_edge_held_strongly(getter).unwrap());
    assert!(store.is_held_strongly(&"read").unwrap());
}

#[test]
fn test_unregister_token_is_not_retained() {
    let mut store = new_store();
    for key in ["registry", "cleanup", "token"] {
        object(&mut store, key);
    }
    strong(&mut store, "held", "registry", "registry");
    let ids = store
        .define_finalization_tuple(
            &"registry",
            FinalizationEntry {
                target: "target",
                held_value: ValueRef::Identity("cleanup"),
                unregister_token: Some("token"),
                tuple_metadata: meta("registration"),
                target_metadata: meta("target"),
                held_value_metadata: Some(meta("heldValue")),
                unregister_token_metadata: Some(meta("token")),
            },
        )
        .unwrap();
    store.mark_strong_references().unwrap();

    assert_eq!(ids.part_edges.len(), 3);
    assert!(store.is_held_strongly(&"cleanup").unwrap());
    assert!(!store.is_held_strongly(&"token").unwrap());
    assert!(!store.is_held_strongly(&"target").unwrap());
    let token_edge = ids.edge_for(EdgeType::FinalizationToUnregisterToken).unwrap();
    assert!(!store.is_edge_held_strongly(token_edge).unwrap());
    assert!(store.is_edge_held_strongly(&ids.container_edge).unwrap());
}

// ─────────────────────────────────────────────────────────────────────────────
// Summarization
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_strong_summary_keeps_only_strong_paths() {
    let mut store = build_chain(true);
    store.mark_strong_references().unwrap();
    let a_id = store.get_weak_key_id(&"A").unwrap();

    let summary = store.summarize_graph_to_target(true).unwrap();
    assert_eq!(summary.node_count(), 7);
    assert_eq!(summary.edge_count(), 6);
    assert!(!summary.contains_node(&a_id));
    assert!(summary.edges().all(|edge| edge.is_strong_reference));
    assert_eq!(store.state(), GraphState::Summarized);
}

#[test]
fn test_weak_summary_keeps_every_path() {
    let mut store = build_chain(true);
    store.mark_strong_references().unwrap();

    let summary = store.summarize_graph_to_target(false).unwrap();
    assert_eq!(summary.node_count(), 8);
    assert_eq!(summary.edge_count(), 10);
}

#[test]
fn test_strong_summary_is_empty_when_target_weak() {
    let mut store = build_chain(false);
    store.mark_strong_references().unwrap();

    let summary = store.summarize_graph_to_target(true).unwrap();
    assert_eq!(summary.node_count(), 0);
    assert_eq!(summary.edge_count(), 0);
}

#[test]
fn test_summary_preserves_metadata() {
    let mut store = build_chain(true);
    store.mark_strong_references().unwrap();
    let summary = store.summarize_graph_to_target(true).unwrap();

    let b_id = store.get_weak_key_id(&"B").unwrap();
    let node = summary.node(&b_id).unwrap();
    assert_eq!(node.kind, NodeKind::Object);
    assert_eq!(node.metadata, "B");
}

#[test]
fn test_summarize_twice_is_protocol_error() {
    let mut store = build_chain(true);
    store.mark_strong_references().unwrap();
    store.summarize_graph_to_target(true).unwrap();

    let err = store.summarize_graph_to_target(false).unwrap_err();
    assert!(matches!(err, GraphError::Protocol { .. }));
}

// ─────────────────────────────────────────────────────────────────────────────
// Idempotence
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_queries_have_no_side_effects() {
    let mut store = build_chain(true);
    store.mark_strong_references().unwrap();
    let before = store.clone_graph().unwrap().snapshot().fingerprint();

    let edge_id = store.graph().edges().next().map(|edge| edge.id.clone()).unwrap();
    let first = store.get_edge_relationship(&edge_id).unwrap().clone();
    let second = store.get_edge_relationship(&edge_id).unwrap().clone();
    assert_eq!(first, second);
    assert_eq!(
        store.is_held_strongly(&"C").unwrap(),
        store.is_held_strongly(&"C").unwrap()
    );

    let after = store.clone_graph().unwrap().snapshot().fingerprint();
    assert_eq!(before, after);
    assert_eq!(store.state(), GraphState::MarkedStrongReferences);
}

#[test]
fn test_same_definitions_same_snapshot() {
    let a = build_chain(true);
    let b = build_chain(true);
    let fa = GraphSnapshot::capture(a.graph()).fingerprint();
    let fb = GraphSnapshot::capture(b.graph()).fingerprint();
    assert_eq!(fa, fb);
}

// ─────────────────────────────────────────────────────────────────────────────
// Protocol
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_definition_before_target_is_protocol_error() {
    init_tracing();
    let mut store: Store = GraphStore::new();
    let err = store.define_object("a", meta("a")).unwrap_err();
    assert!(matches!(
        err,
        GraphError::Protocol {
            state: GraphState::AwaitingTargetAndHeldValues,
            ..
        }
    ));
}

#[test]
fn test_target_defined_twice_is_duplicate() {
    let mut store = new_store();
    let err = store
        .define_target_and_held_values("t2", meta("t2"), "h2", meta("h2"))
        .unwrap_err();
    assert!(matches!(err, GraphError::DuplicateDefinition(_)));
}

#[test]
fn test_definition_after_resolution_is_protocol_error() {
    let mut store = build_chain(true);
    store.mark_strong_references().unwrap();

    let err = store.define_object("late", meta("late")).unwrap_err();
    assert!(matches!(err, GraphError::Protocol { .. }));
}

#[test]
fn test_query_before_resolution_is_protocol_error() {
    let store = build_chain(true);
    let err = store.is_held_strongly(&"A").unwrap_err();
    assert!(matches!(
        err,
        GraphError::Protocol {
            operation: "is_held_strongly",
            state: GraphState::AcceptingDefinitions,
        }
    ));
}

#[test]
fn test_error_state_poisons_store() {
    let mut store = new_store();
    object(&mut store, "a");
    assert!(store.define_object("a", meta("a")).is_err());

    let err = store.get_weak_key_id(&"a").unwrap_err();
    assert!(matches!(
        err,
        GraphError::Protocol {
            state: GraphState::Error,
            ..
        }
    ));
    assert!(store.mark_strong_references().is_err());
    assert!(store.clone_graph().is_err());
    assert!(store.has_weak_key(&"a"));
}

#[test]
fn test_tuple_after_resolution_is_protocol_error() {
    let mut store = build_chain(true);
    store.mark_strong_references().unwrap();

    let err = store
        .define_map_key_value_tuple(
            &"B",
            KeyValueEntry {
                key: ValueRef::Identity("A"),
                value: ValueRef::Identity("C"),
                is_strong_reference_to_key: false,
                tuple_metadata: meta("entry"),
                key_metadata: Some(meta("key")),
                value_metadata: Some(meta("value")),
            },
        )
        .unwrap_err();
    assert_eq!(
        err,
        GraphError::Protocol {
            operation: "define_map_key_value_tuple",
            state: GraphState::MarkedStrongReferences,
        }
    );
    assert_eq!(store.state(), GraphState::Error);
}

#[test]
fn test_edge_after_resolution_is_protocol_error() {
    let mut store = build_chain(true);
    store.mark_strong_references().unwrap();
    let edges = store.edge_count();

    let err = store
        .define_set_element(&"B", &"E", EdgeDescriptor::weak("element", meta("element")))
        .unwrap_err();
    assert!(matches!(
        err,
        GraphError::Protocol {
            operation: "define_set_element",
            state: GraphState::MarkedStrongReferences,
        }
    ));
    assert_eq!(store.edge_count(), edges);
}

// ─────────────────────────────────────────────────────────────────────────────
// Hooks
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_hooks_observe_definitions_and_queue() {
    init_tracing();
    let hooks = Arc::new(RecordingHooks::default());
    let mut store: Store = GraphStore::new().with_hooks(Arc::clone(&hooks));
    store
        .define_target_and_held_values("target", meta("t"), "held", meta("h"))
        .unwrap();
    object(&mut store, "a");
    object(&mut store, "b");
    strong(&mut store, "held", "a", "0");
    strong(&mut store, "held", "b", "1");
    store.mark_strong_references().unwrap();

    let names: Vec<String> = hooks.enqueued().iter().map(|id| id.to_string()).collect();
    assert_eq!(names, vec!["heldValues:0", "object:0", "object:1"]);

    let events = hooks.events();
    assert!(events.contains(&HookEvent::NodeDefined(
        store.get_weak_key_id(&"a").unwrap(),
        NodeKind::Object
    )));
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, HookEvent::EdgeDefined(_, EdgeType::PropertyValue)))
            .count(),
        2
    );
}

#[test]
fn test_hooks_see_fatal_errors() {
    init_tracing();
    let hooks = Arc::new(RecordingHooks::default());
    let mut store: Store = GraphStore::new().with_hooks(Arc::clone(&hooks));
    assert!(store.mark_strong_references().is_err());

    assert_eq!(hooks.events(), vec![HookEvent::Fatal("protocol")]);
}
