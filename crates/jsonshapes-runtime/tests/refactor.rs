//! Moving data between shapes.

use rhizome_jsonshapes_runtime::{
    Correspondence, OperationError, Program, RefactorOutcome, Registry, refactor, validate,
};
use serde_json::{Value, json};
use std::sync::Arc;

fn load(source: &str) -> Program {
    rhizome_jsonshapes_runtime::load(source, Arc::new(Registry::builtin())).expect("load failed")
}

fn run(program: &Program, old: &str, new: &str, data: Value, table: &Correspondence) -> RefactorOutcome {
    refactor(program, old, new, &data, table).unwrap()
}

fn unresolved(outcome: &RefactorOutcome) -> Vec<String> {
    outcome.unresolved.iter().map(ToString::to_string).collect()
}

#[test]
fn test_field_rename() {
    let program = load("before = object({\"oldName\": string()});\nafter = object({\"newName\": string()});");
    let table = Correspondence::new().rename("oldName", "newName");
    let outcome = run(&program, "before", "after", json!({"oldName": "x"}), &table);
    assert!(outcome.unresolved.is_empty());
    assert_eq!(outcome.clone().into_result(), Ok(json!({"newName": "x"})));
    assert!(outcome.is_complete());
}

#[test]
fn test_identity_refactor() {
    let program = load("p = object({\"a\": string(), \"b\": list(number())});");
    let data = json!({"a": "x", "b": [1, 2]});
    let outcome = run(&program, "p", "p", data.clone(), &Correspondence::new());
    assert!(outcome.is_complete());
    assert_eq!(outcome.data, data);
}

#[test]
fn test_dropped_and_orphaned_fields() {
    let program = load(
        "old = object({\"a\": string(), \"legacy\": number()});\n\
         current = object({\"a\": string()});",
    );
    let data = json!({"a": "x", "legacy": 1});

    let dropped = run(&program, "old", "current", data.clone(), &Correspondence::new().drop_field("legacy"));
    assert!(dropped.is_complete());
    assert_eq!(dropped.data, json!({"a": "x"}));

    let orphaned = run(&program, "old", "current", data, &Correspondence::new());
    assert_eq!(unresolved(&orphaned), ["legacy"]);
    let err = orphaned.into_result().unwrap_err();
    assert_eq!(err.partial, json!({"a": "x"}));
    assert_eq!(err.to_string(), "refactor left 1 path(s) unresolved: legacy");
}

#[test]
fn test_required_target_without_source() {
    let program = load(
        "old = object({\"a\": string()});\n\
         required = object({\"a\": string(), \"b\": number()});\n\
         optional_b = object({\"a\": string(), \"b\": optional(number())});",
    );
    let data = json!({"a": "x"});
    let missing = run(&program, "old", "required", data.clone(), &Correspondence::new());
    assert_eq!(unresolved(&missing), ["b"]);
    assert_eq!(missing.data, json!({"a": "x"}));

    assert!(run(&program, "old", "optional_b", data, &Correspondence::new()).is_complete());
}

#[test]
fn test_incompatible_values_are_unresolved() {
    let program = load("old = object({\"n\": string()});\ncurrent = object({\"n\": number()});");
    let outcome = run(&program, "old", "current", json!({"n": "5"}), &Correspondence::new());
    assert_eq!(unresolved(&outcome), ["n"]);
    assert_eq!(outcome.data, json!({"n": "5"}));
}

#[test]
fn test_lists_report_source_paths() {
    let program = load(
        "olds = list(object({\"oldName\": string()}));\n\
         news = list(object({\"newName\": string()}));",
    );
    let table = Correspondence::new().rename("oldName", "newName");
    let outcome = run(
        &program,
        "olds",
        "news",
        json!([{"oldName": "a"}, {"oldName": 2}]),
        &table,
    );
    assert_eq!(outcome.data, json!([{"newName": "a"}, {"newName": 2}]));
    assert_eq!(unresolved(&outcome), ["[1].oldName"]);
}

#[test]
fn test_dictionary_values_are_refactored() {
    let program = load(
        "od = dictionary(string(), object({\"oldName\": string()}));\n\
         nd = dictionary(string(), object({\"newName\": string()}));",
    );
    let table = Correspondence::new().rename("oldName", "newName");
    let outcome = run(&program, "od", "nd", json!({"k": {"oldName": "v"}}), &table);
    assert!(outcome.is_complete());
    assert_eq!(outcome.data, json!({"k": {"newName": "v"}}));
}

#[test]
fn test_one_of_picks_matching_option() {
    let program = load(
        "old = oneOf(object({\"oldName\": string()}), number());\n\
         current = object({\"newName\": string()});",
    );
    let table = Correspondence::new().rename("oldName", "newName");
    let outcome = run(&program, "old", "current", json!({"oldName": "x"}), &table);
    assert!(outcome.is_complete());
    assert_eq!(outcome.data, json!({"newName": "x"}));
}

#[test]
fn test_derived_shape_round_trip() {
    let original = load("oldName = object({\"value\": number(), \"next\": optional(oldName)});");
    let table = Correspondence::new().rename("value", "amount");
    let program = original.refactor_shape("oldName", "newName", &table).unwrap();

    let data = json!({"value": 1, "next": {"value": 2, "next": null}});
    let outcome = run(&program, "oldName", "newName", data, &table);
    assert!(outcome.is_complete(), "unresolved: {:?}", outcome.unresolved);
    assert_eq!(outcome.data, json!({"amount": 1, "next": {"amount": 2, "next": null}}));
    assert!(validate(&program, "newName", &outcome.data).unwrap().is_valid());
}

#[test]
fn test_unknown_shapes() {
    let program = load("a = string();");
    assert_eq!(
        refactor(&program, "a", "missing", &json!("x"), &Correspondence::new()),
        Err(OperationError::UnknownShape("missing".into()))
    );
}

#[test]
fn test_correspondence_from_json() {
    let table: Correspondence =
        serde_json::from_value(json!({"renames": {"a": "b"}, "drops": ["c"]})).unwrap();
    assert_eq!(table, Correspondence::new().rename("a", "b").drop_field("c"));
    let empty: Correspondence = serde_json::from_value(json!({})).unwrap();
    assert_eq!(empty, Correspondence::default());
}
