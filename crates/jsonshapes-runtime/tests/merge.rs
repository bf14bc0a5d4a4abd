//! Shape-guided merging.

use proptest::prelude::*;
use rhizome_jsonshapes_runtime::ir::MergeResult;
use rhizome_jsonshapes_runtime::{Program, Registry, merge};
use serde_json::{Value, json};
use std::sync::Arc;

fn load(source: &str) -> Program {
    rhizome_jsonshapes_runtime::load(source, Arc::new(Registry::builtin())).expect("load failed")
}

fn merged(result: MergeResult) -> Value {
    match result {
        MergeResult::Merged(value) => value,
        MergeResult::Conflicts(conflicts) => panic!("unexpected conflicts: {:?}", conflicts),
    }
}

fn conflict_paths(result: &MergeResult) -> Vec<String> {
    result.conflicts().iter().map(|c| c.path.to_string()).collect()
}

const PROFILE: &str = "profile = object({\n\
    \"name\": optional(string()),\n\
    \"age\": optional(number()),\n\
    \"tags\": optional(list(string()))\n\
});";

const JSON: &str = "json = oneOf(null(), boolean(), number(), string(), list(json), dictionary(string(), json));";

#[test]
fn test_disjoint_fields_combine() {
    let program = load(PROFILE);
    let result = merge(&program, "profile", &json!({"name": "a"}), &json!({"age": 3})).unwrap();
    assert_eq!(merged(result), json!({"name": "a", "age": 3}));
}

#[test]
fn test_scalar_conflict() {
    let program = load(PROFILE);
    let result = merge(&program, "profile", &json!({"name": "a"}), &json!({"name": "b"})).unwrap();
    assert!(!result.is_merged());
    let conflict = &result.conflicts()[0];
    assert_eq!(conflict.path.to_string(), "name");
    assert_eq!(conflict.left, Some(json!("a")));
    assert_eq!(conflict.right, Some(json!("b")));
}

#[test]
fn test_conflicts_follow_declaration_order() {
    let program = load("q = object({\"a\": number(), \"b\": number()});");
    let result = merge(&program, "q", &json!({"b": 1, "a": 1}), &json!({"b": 2, "a": 2})).unwrap();
    assert_eq!(conflict_paths(&result), ["a", "b"]);
}

#[test]
fn test_lists_merge_positionally() {
    let program = load("l = list(number());");
    assert_eq!(merged(merge(&program, "l", &json!([1, 2]), &json!([1, 2])).unwrap()), json!([1, 2]));

    let changed = merge(&program, "l", &json!([1, 2]), &json!([1, 3])).unwrap();
    assert_eq!(conflict_paths(&changed), ["[1]"]);

    let resized = merge(&program, "l", &json!([1]), &json!([1, 2])).unwrap();
    assert_eq!(conflict_paths(&resized), ["$"]);
}

#[test]
fn test_tuples_merge_positionally() {
    let program = load("t = [string(), number()];");
    let result = merge(&program, "t", &json!(["a", 1]), &json!(["b", 1])).unwrap();
    assert_eq!(conflict_paths(&result), ["[0]"]);
}

#[test]
fn test_optional_null_against_value() {
    let program = load("o = object({\"x\": optional(number())});");
    let result = merge(&program, "o", &json!({"x": null}), &json!({"x": 1})).unwrap();
    assert_eq!(conflict_paths(&result), ["x"]);
    assert_eq!(
        merged(merge(&program, "o", &json!({"x": null}), &json!({"x": null})).unwrap()),
        json!({"x": null})
    );
}

#[test]
fn test_one_of_merges_under_shared_option() {
    let program = load("v = oneOf(object({\"kind\": \"a\", \"n\": optional(number())}), string());");
    let result = merge(&program, "v", &json!({"kind": "a", "n": 1}), &json!({"kind": "a"})).unwrap();
    assert_eq!(merged(result), json!({"kind": "a", "n": 1}));

    let mixed = merge(&program, "v", &json!({"kind": "a"}), &json!("text")).unwrap();
    assert_eq!(conflict_paths(&mixed), ["$"]);
}

#[test]
fn test_extended_record_merges_per_field() {
    let program = load(
        "named = {\"name\": optional(string())};\n\
         entry = extend(named, {\"created\": optional(number())});",
    );
    let result = merge(&program, "entry", &json!({"name": "a"}), &json!({"created": 1})).unwrap();
    assert_eq!(merged(result), json!({"name": "a", "created": 1}));

    let clash = merge(&program, "entry", &json!({"created": 1}), &json!({"created": 2})).unwrap();
    assert_eq!(conflict_paths(&clash), ["created"]);
}

#[test]
fn test_named_choice_merges_under_shared_option() {
    let program = load(
        "v = oneOfNamed({\"pair\": {\"n\": optional(number()), \"m\": optional(number())}, \"text\": string()});",
    );
    let result = merge(&program, "v", &json!({"n": 1}), &json!({"m": 2})).unwrap();
    assert_eq!(merged(result), json!({"n": 1, "m": 2}));

    let text = merge(&program, "v", &json!("a"), &json!("b")).unwrap();
    assert_eq!(conflict_paths(&text), ["$"]);
}

#[test]
fn test_dictionary_unions_keys() {
    let program = load("d = dictionary(string(), number());");
    let result = merge(&program, "d", &json!({"a": 1, "b": 2}), &json!({"b": 2, "c": 3})).unwrap();
    assert_eq!(merged(result), json!({"a": 1, "b": 2, "c": 3}));

    let clash = merge(&program, "d", &json!({"a": 1}), &json!({"a": 2})).unwrap();
    assert_eq!(conflict_paths(&clash), ["a"]);
}

#[test]
fn test_undeclared_keys_are_opaque() {
    let program = load("r = object({\"a\": number()}, \"ignore\");");
    let result = merge(&program, "r", &json!({"a": 1, "x": {"y": 1}}), &json!({"a": 1, "x": {"y": 2}})).unwrap();
    assert_eq!(conflict_paths(&result), ["x"]);

    let kept = merge(&program, "r", &json!({"a": 1, "x": 1}), &json!({"a": 1, "z": 2})).unwrap();
    assert_eq!(merged(kept), json!({"a": 1, "x": 1, "z": 2}));
}

#[test]
fn test_recursive_merge() {
    let program = load("node = object({\"value\": number(), \"next\": optional(node)});");
    let left = json!({"value": 1, "next": {"value": 2, "next": null}});
    let right = json!({"value": 1, "next": {"value": 3, "next": null}});
    let result = merge(&program, "node", &left, &right).unwrap();
    assert_eq!(conflict_paths(&result), ["next.value"]);
}

#[test]
fn test_merge_result_serializes() {
    let program = load("l = list(number());");
    let result = merge(&program, "l", &json!([1]), &json!([2])).unwrap();
    let encoded = serde_json::to_value(&result).unwrap();
    assert_eq!(encoded["result"], json!("conflicts"));
    assert_eq!(encoded["value"][0]["path"], json!([0]));
}

fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        (0i32..4).prop_map(Value::from),
        "[ab]{0,2}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..3).prop_map(Value::Array),
            prop::collection::btree_map("[ab]", inner, 0..3)
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
}

fn profile_value() -> impl Strategy<Value = Value> {
    (
        proptest::option::of("[ab]"),
        proptest::option::of(0i32..3),
        proptest::option::of(prop::collection::vec("[ab]", 0..3)),
    )
        .prop_map(|(name, age, tags)| {
            let mut map = serde_json::Map::new();
            if let Some(name) = name {
                map.insert("name".into(), json!(name));
            }
            if let Some(age) = age {
                map.insert("age".into(), json!(age));
            }
            if let Some(tags) = tags {
                map.insert("tags".into(), json!(tags));
            }
            Value::Object(map)
        })
}

fn assert_commutes(program: &Program, shape: &str, a: &Value, b: &Value) -> Result<(), TestCaseError> {
    let ab = merge(program, shape, a, b).unwrap();
    let ba = merge(program, shape, b, a).unwrap();
    prop_assert_eq!(conflict_paths(&ab), conflict_paths(&ba));
    for (x, y) in ab.conflicts().iter().zip(ba.conflicts()) {
        prop_assert_eq!(&x.left, &y.right);
        prop_assert_eq!(&x.right, &y.left);
    }
    prop_assert_eq!(ab.merged(), ba.merged());
    Ok(())
}

proptest! {
    #[test]
    fn prop_merge_is_idempotent(a in json_value()) {
        let program = load(JSON);
        prop_assert_eq!(merge(&program, "json", &a, &a).unwrap(), MergeResult::Merged(a.clone()));
    }

    #[test]
    fn prop_profile_merge_is_idempotent(a in profile_value()) {
        let program = load(PROFILE);
        prop_assert_eq!(merge(&program, "profile", &a, &a).unwrap(), MergeResult::Merged(a.clone()));
    }

    #[test]
    fn prop_merge_commutes(a in json_value(), b in json_value()) {
        let program = load(JSON);
        assert_commutes(&program, "json", &a, &b)?;
    }

    #[test]
    fn prop_profile_merge_commutes(a in profile_value(), b in profile_value()) {
        let program = load(PROFILE);
        assert_commutes(&program, "profile", &a, &b)?;
    }
}
