//! Records: `object({...})`, bare object literals, `extend`, and `dictionary`.

use super::scalar::same_value;
use crate::merge::Merger;
use crate::options::UnknownKeys;
use crate::program::{Node, NodeId, Program, Structure};
use crate::refactor::Refactorer;
use crate::registry::{Arity, ShapeFunction};
use crate::render::Renderer;
use crate::ui::UiGenerator;
use crate::validate::{Validator, type_name};
use crate::OperationError;
use rhizome_jsonshapes_ir::{RenderNode, WidgetNode};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

fn is_declared(fields: &[(String, NodeId)], key: &str) -> bool {
    fields.iter().any(|(k, _)| k == key)
}

pub(crate) fn validate_record(
    fields: &[(String, NodeId)],
    policy: UnknownKeys,
    data: &Value,
    cx: &mut Validator<'_>,
) -> Result<(), OperationError> {
    let Value::Object(map) = data else {
        cx.error(format!("expected object, found {}", type_name(data)));
        return Ok(());
    };
    let program = cx.program();
    for (key, node) in fields {
        match map.get(key) {
            Some(value) => cx.descend(key.as_str(), *node, value)?,
            None if program.accepts_absent(*node) => {}
            None => cx.error_at(key.as_str(), "missing required field"),
        }
    }
    for key in map.keys().filter(|key| !is_declared(fields, key)) {
        match policy {
            UnknownKeys::Reject => cx.error_at(key.as_str(), "unexpected field"),
            UnknownKeys::Collect => cx.warning_at(key.as_str(), "unexpected field"),
            UnknownKeys::Ignore => {}
        }
    }
    Ok(())
}

pub(crate) fn render_record(
    kind: &str,
    fields: &[(String, NodeId)],
    policy: UnknownKeys,
    data: &Value,
    cx: &mut Renderer<'_>,
) -> Result<RenderNode, OperationError> {
    let Value::Object(map) = data else {
        return Ok(cx.leaf(kind, data, false));
    };
    let mut node = cx.node(kind);
    let mut valid = true;
    for (key, field) in fields {
        let child = match map.get(key) {
            Some(value) => cx.descend(key.as_str(), *field, value)?,
            None => {
                let placeholder = cx.absent(key, *field);
                valid &= !placeholder.annotations.contains_key("invalid");
                placeholder
            }
        };
        node.children.push(child);
    }
    for (key, value) in map.iter().filter(|(key, _)| !is_declared(fields, key)) {
        let extra = RenderNode::new("unexpected", cx.path().join(key.as_str()))
            .with_label(key.as_str())
            .with_value(value.clone());
        match policy {
            UnknownKeys::Reject => {
                valid = false;
                node.children.push(extra.annotate("invalid", true));
            }
            UnknownKeys::Collect => node.children.push(extra),
            UnknownKeys::Ignore => {}
        }
    }
    Ok(if valid { node } else { node.annotate("invalid", true) })
}

pub(crate) fn ui_record(
    kind: &str,
    fields: &[(String, NodeId)],
    policy: UnknownKeys,
    cx: &mut UiGenerator<'_>,
) -> Result<WidgetNode, OperationError> {
    let program = cx.program();
    let mut children = Vec::with_capacity(fields.len());
    for (key, field) in fields {
        let child = cx
            .visit(*field)?
            .with_label(key.as_str())
            .prop("required", !program.accepts_absent(*field));
        children.push(child);
    }
    Ok(WidgetNode::new(kind, "fieldset")
        .prop("unknown_keys", policy.as_str())
        .with_children(children))
}

/// Declared fields merge recursively, in declaration order. A field present
/// on one side only is kept. Undeclared keys are compared as opaque values.
pub(crate) fn merge_record(
    fields: &[(String, NodeId)],
    left: &Value,
    right: &Value,
    cx: &mut Merger<'_>,
) -> Result<Value, OperationError> {
    let (Value::Object(l), Value::Object(r)) = (left, right) else {
        return Ok(cx.merge_opaque(left, right));
    };
    let mut out = Map::new();
    for (key, node) in fields {
        match (l.get(key), r.get(key)) {
            (Some(a), Some(b)) => {
                out.insert(key.clone(), cx.descend(key.as_str(), *node, a, b)?);
            }
            (Some(v), None) | (None, Some(v)) => {
                out.insert(key.clone(), v.clone());
            }
            (None, None) => {}
        }
    }
    let extra: BTreeSet<&String> = l
        .keys()
        .chain(r.keys())
        .filter(|key| !is_declared(fields, key))
        .collect();
    for key in extra {
        out.insert(key.clone(), merge_entry(key, l.get(key), r.get(key), cx));
    }
    Ok(Value::Object(out))
}

fn merge_entry(key: &str, left: Option<&Value>, right: Option<&Value>, cx: &mut Merger<'_>) -> Value {
    match (left, right) {
        (Some(a), Some(b)) => {
            if !same_value(a, b) {
                cx.conflict_at(key, Some(a), Some(b));
            }
            a.clone()
        }
        (Some(v), None) | (None, Some(v)) => v.clone(),
        (None, None) => Value::Null,
    }
}

/// Rebuilds an object for the target record, mapping field names through
/// the correspondence.
pub(crate) fn refactor_record(
    fields: &[(String, NodeId)],
    data: &Value,
    target: NodeId,
    cx: &mut Refactorer<'_>,
) -> Result<Value, OperationError> {
    let program = cx.program();
    let (Value::Object(map), Some(new_fields)) = (data, program.record_fields(target)) else {
        return cx.carry(data, target);
    };
    let correspondence = cx.correspondence();

    let mut out = Map::new();
    for (new_key, new_node) in &new_fields {
        let source = correspondence
            .source_for(new_key)
            .and_then(|old_key| map.get(old_key).map(|value| (old_key, value)));
        match source {
            Some((old_key, value)) => {
                // An undeclared source field is walked under the new shape alone
                let old_node = fields
                    .iter()
                    .find(|(k, _)| k == old_key)
                    .map_or(*new_node, |(_, node)| *node);
                let value = cx.descend(old_key, new_key.as_str(), old_node, *new_node, value)?;
                out.insert(new_key.clone(), value);
            }
            None if program.accepts_absent(*new_node) => {}
            None => cx.unresolved_target_at(new_key.as_str()),
        }
    }
    for key in map.keys() {
        let carried = correspondence.target_of(key).is_none_or(|to| {
            is_declared(&new_fields, to) && correspondence.source_for(to) == Some(key.as_str())
        });
        if !carried {
            cx.unresolved_source_at(key.as_str());
        }
    }
    Ok(Value::Object(out))
}

fn object_fields<'p>(args: &[NodeId], program: &'p Program) -> &'p [(String, NodeId)] {
    match program.node(program.deref(args[0])) {
        Node::Record { fields } => fields,
        _ => &[],
    }
}

/// The explicit policy argument, if any.
fn object_policy(args: &[NodeId], program: &Program) -> Option<UnknownKeys> {
    let node = args.get(1)?;
    match program.node(*node) {
        Node::Literal {
            value: Value::String(policy),
        } => policy.parse().ok(),
        _ => None,
    }
}

/// `object({"field": shape, ...}[, policy])`
pub(crate) struct ObjectShape;

impl ObjectShape {
    fn policy(args: &[NodeId], program: &Program, default: UnknownKeys) -> UnknownKeys {
        object_policy(args, program).unwrap_or(default)
    }
}

impl ShapeFunction for ObjectShape {
    fn name(&self) -> &str {
        "object"
    }

    fn arity(&self) -> Arity {
        Arity::between(1, 2)
    }

    fn check_args(&self, args: &[NodeId], program: &Program) -> Result<(), String> {
        if !matches!(program.node(program.deref(args[0])), Node::Record { .. }) {
            return Err("expected an object literal of fields".to_string());
        }
        if let Some(&policy) = args.get(1) {
            match program.node(policy) {
                Node::Literal {
                    value: Value::String(policy),
                } => {
                    policy.parse::<UnknownKeys>()?;
                }
                _ => return Err("unknown key policy must be a string".to_string()),
            }
        }
        Ok(())
    }

    fn structure(&self, args: &[NodeId], program: &Program) -> Structure {
        Structure::Record(object_fields(args, program).to_vec())
    }

    fn validate(&self, args: &[NodeId], data: &Value, cx: &mut Validator<'_>) -> Result<(), OperationError> {
        let program = cx.program();
        let policy = Self::policy(args, program, cx.context().options.unknown_keys);
        validate_record(object_fields(args, program), policy, data, cx)
    }

    fn render(&self, args: &[NodeId], data: &Value, cx: &mut Renderer<'_>) -> Result<RenderNode, OperationError> {
        let program = cx.program();
        let policy = Self::policy(args, program, cx.context().options.unknown_keys);
        render_record("object", object_fields(args, program), policy, data, cx)
    }

    fn ui(&self, args: &[NodeId], cx: &mut UiGenerator<'_>) -> Result<WidgetNode, OperationError> {
        let program = cx.program();
        let policy = Self::policy(args, program, cx.context().options.unknown_keys);
        ui_record("object", object_fields(args, program), policy, cx)
    }

    fn merge(&self, args: &[NodeId], left: &Value, right: &Value, cx: &mut Merger<'_>) -> Result<Value, OperationError> {
        merge_record(object_fields(args, cx.program()), left, right, cx)
    }

    fn refactor(
        &self,
        args: &[NodeId],
        data: &Value,
        target: NodeId,
        cx: &mut Refactorer<'_>,
    ) -> Result<Value, OperationError> {
        refactor_record(object_fields(args, cx.program()), data, target, cx)
    }
}

/// Declared fields of one `extend` piece: an object literal, an `object(...)`
/// call or another `extend(...)`, possibly behind references.
fn piece_fields(
    piece: NodeId,
    program: &Program,
    seen: &mut Vec<NodeId>,
) -> Result<Vec<(String, NodeId)>, String> {
    let id = program.deref(piece);
    match program.node(id) {
        Node::Record { fields } => Ok(fields.clone()),
        Node::Call { function, args } if function == "object" => Ok(object_fields(args, program).to_vec()),
        Node::Call { function, args } if function == "extend" => {
            if seen.contains(&id) {
                return Err("a piece extends itself".to_string());
            }
            seen.push(id);
            let fields = extended_fields(args, program, seen);
            seen.pop();
            fields
        }
        _ => Err("every piece must be an object shape".to_string()),
    }
}

fn extended_fields(
    args: &[NodeId],
    program: &Program,
    seen: &mut Vec<NodeId>,
) -> Result<Vec<(String, NodeId)>, String> {
    let mut fields: Vec<(String, NodeId)> = Vec::new();
    for piece in args {
        for (key, node) in piece_fields(*piece, program, seen)? {
            if is_declared(&fields, &key) {
                return Err(format!("field {key:?} is declared by more than one piece"));
            }
            fields.push((key, node));
        }
    }
    Ok(fields)
}

/// The combined fields; empty if the pieces do not compose (already
/// rejected at resolve time).
fn extend_fields(args: &[NodeId], program: &Program) -> Vec<(String, NodeId)> {
    extended_fields(args, program, &mut Vec::new()).unwrap_or_default()
}

/// `extend(piece, ...)`: one record with the fields of every piece, which
/// must not overlap. Unknown keys follow the default policy.
pub(crate) struct Extend;

impl ShapeFunction for Extend {
    fn name(&self) -> &str {
        "extend"
    }

    fn arity(&self) -> Arity {
        Arity::at_least(1)
    }

    fn check_args(&self, args: &[NodeId], program: &Program) -> Result<(), String> {
        extended_fields(args, program, &mut Vec::new()).map(|_| ())
    }

    fn structure(&self, args: &[NodeId], program: &Program) -> Structure {
        Structure::Record(extend_fields(args, program))
    }

    fn validate(&self, args: &[NodeId], data: &Value, cx: &mut Validator<'_>) -> Result<(), OperationError> {
        let fields = extend_fields(args, cx.program());
        let policy = cx.context().options.unknown_keys;
        validate_record(&fields, policy, data, cx)
    }

    fn render(&self, args: &[NodeId], data: &Value, cx: &mut Renderer<'_>) -> Result<RenderNode, OperationError> {
        let fields = extend_fields(args, cx.program());
        let policy = cx.context().options.unknown_keys;
        render_record("extend", &fields, policy, data, cx)
    }

    fn ui(&self, args: &[NodeId], cx: &mut UiGenerator<'_>) -> Result<WidgetNode, OperationError> {
        let fields = extend_fields(args, cx.program());
        let policy = cx.context().options.unknown_keys;
        ui_record("extend", &fields, policy, cx)
    }

    fn merge(&self, args: &[NodeId], left: &Value, right: &Value, cx: &mut Merger<'_>) -> Result<Value, OperationError> {
        let fields = extend_fields(args, cx.program());
        merge_record(&fields, left, right, cx)
    }

    fn refactor(
        &self,
        args: &[NodeId],
        data: &Value,
        target: NodeId,
        cx: &mut Refactorer<'_>,
    ) -> Result<Value, OperationError> {
        let fields = extend_fields(args, cx.program());
        refactor_record(&fields, data, target, cx)
    }
}

/// `dictionary(keyShape, valueShape)`: an object with arbitrary keys, each
/// key checked against `keyShape` as a string and each value against
/// `valueShape`.
pub(crate) struct Dictionary;

impl ShapeFunction for Dictionary {
    fn name(&self) -> &str {
        "dictionary"
    }

    fn arity(&self) -> Arity {
        Arity::exactly(2)
    }

    fn structure(&self, args: &[NodeId], _program: &Program) -> Structure {
        Structure::Map {
            key: args[0],
            value: args[1],
        }
    }

    fn validate(&self, args: &[NodeId], data: &Value, cx: &mut Validator<'_>) -> Result<(), OperationError> {
        let Value::Object(map) = data else {
            cx.error(format!("expected object, found {}", type_name(data)));
            return Ok(());
        };
        for (key, value) in map {
            if !cx.accepts(args[0], &Value::String(key.clone()))? {
                cx.error_at(key.as_str(), format!("invalid key {key:?}"));
            }
            cx.descend(key.as_str(), args[1], value)?;
        }
        Ok(())
    }

    fn render(&self, args: &[NodeId], data: &Value, cx: &mut Renderer<'_>) -> Result<RenderNode, OperationError> {
        let Value::Object(map) = data else {
            return Ok(cx.leaf("dictionary", data, false));
        };
        let mut node = cx.node("dictionary");
        for (key, value) in map {
            let child = cx.descend(key.as_str(), args[1], value)?;
            let key_ok = cx.accepts(args[0], &Value::String(key.clone()))?;
            node.children.push(if key_ok {
                child
            } else {
                child.annotate("invalid_key", true)
            });
        }
        Ok(node)
    }

    fn ui(&self, args: &[NodeId], cx: &mut UiGenerator<'_>) -> Result<WidgetNode, OperationError> {
        let key = cx.visit(args[0])?.with_label("key");
        let value = cx.visit(args[1])?.with_label("value");
        Ok(WidgetNode::new("dictionary", "key-value").with_children(vec![key, value]))
    }

    /// Shared keys merge under the value shape; the rest is a union.
    fn merge(&self, args: &[NodeId], left: &Value, right: &Value, cx: &mut Merger<'_>) -> Result<Value, OperationError> {
        let (Value::Object(l), Value::Object(r)) = (left, right) else {
            return Ok(cx.merge_opaque(left, right));
        };
        let keys: BTreeSet<&String> = l.keys().chain(r.keys()).collect();
        let mut out = Map::new();
        for key in keys {
            let merged = match (l.get(key), r.get(key)) {
                (Some(a), Some(b)) => cx.descend(key.as_str(), args[1], a, b)?,
                (a, b) => merge_entry(key, a, b, cx),
            };
            out.insert(key.clone(), merged);
        }
        Ok(Value::Object(out))
    }

    fn refactor(
        &self,
        args: &[NodeId],
        data: &Value,
        target: NodeId,
        cx: &mut Refactorer<'_>,
    ) -> Result<Value, OperationError> {
        let program = cx.program();
        let (Value::Object(map), Structure::Map { value: new_value, .. }) =
            (data, program.unwrapped_structure(target))
        else {
            return cx.carry(data, target);
        };
        let mut out = Map::new();
        for (key, value) in map {
            let value = cx.descend(key.as_str(), key.as_str(), args[1], new_value, value)?;
            out.insert(key.clone(), value);
        }
        Ok(Value::Object(out))
    }
}
