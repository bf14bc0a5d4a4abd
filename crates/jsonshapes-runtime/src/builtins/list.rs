//! Sequences: `list(shape)` and array literals used as tuples.

use crate::merge::Merger;
use crate::program::{Node, NodeId, Program, Structure};
use crate::refactor::Refactorer;
use crate::registry::{Arity, ShapeFunction};
use crate::render::Renderer;
use crate::ui::UiGenerator;
use crate::validate::{Validator, type_name};
use crate::OperationError;
use rhizome_jsonshapes_ir::{RenderNode, WidgetNode};
use serde_json::Value;

pub(crate) fn validate_tuple(items: &[NodeId], data: &Value, cx: &mut Validator<'_>) -> Result<(), OperationError> {
    let Value::Array(values) = data else {
        cx.error(format!("expected array, found {}", type_name(data)));
        return Ok(());
    };
    if values.len() != items.len() {
        cx.error(format!(
            "expected array of length {}, found length {}",
            items.len(),
            values.len()
        ));
    }
    for (index, (item, value)) in items.iter().zip(values).enumerate() {
        cx.descend(index, *item, value)?;
    }
    Ok(())
}

pub(crate) fn render_tuple(items: &[NodeId], data: &Value, cx: &mut Renderer<'_>) -> Result<RenderNode, OperationError> {
    let Value::Array(values) = data else {
        return Ok(cx.leaf("tuple", data, false));
    };
    let mut node = cx.node("tuple");
    for (index, (item, value)) in items.iter().zip(values).enumerate() {
        node.children.push(cx.descend(index, *item, value)?);
    }
    if values.len() != items.len() {
        node = node.annotate("invalid", true);
    }
    Ok(node)
}

pub(crate) fn ui_tuple(items: &[NodeId], cx: &mut UiGenerator<'_>) -> Result<WidgetNode, OperationError> {
    let children = cx.visit_all(items)?;
    Ok(WidgetNode::new("tuple", "group")
        .prop("length", items.len())
        .with_children(children))
}

pub(crate) fn merge_tuple(
    items: &[NodeId],
    left: &Value,
    right: &Value,
    cx: &mut Merger<'_>,
) -> Result<Value, OperationError> {
    match (left, right) {
        (Value::Array(l), Value::Array(r)) if l.len() == items.len() && r.len() == items.len() => {
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                out.push(cx.descend(index, *item, &l[index], &r[index])?);
            }
            Ok(Value::Array(out))
        }
        _ => Ok(cx.merge_opaque(left, right)),
    }
}

pub(crate) fn refactor_tuple(
    items: &[NodeId],
    data: &Value,
    target: NodeId,
    cx: &mut Refactorer<'_>,
) -> Result<Value, OperationError> {
    let program = cx.program();
    let new_items = match program.node(program.deref(target)) {
        Node::Tuple { items: new_items } if new_items.len() == items.len() => new_items,
        _ => return cx.carry(data, target),
    };
    let Value::Array(values) = data else {
        return cx.carry(data, target);
    };
    if values.len() != items.len() {
        return cx.carry(data, target);
    }
    let mut out = Vec::with_capacity(values.len());
    for (index, value) in values.iter().enumerate() {
        out.push(cx.descend(index, index, items[index], new_items[index], value)?);
    }
    Ok(Value::Array(out))
}

/// `list(shape)`: an array of any length whose elements all match `shape`.
pub(crate) struct ListShape;

impl ShapeFunction for ListShape {
    fn name(&self) -> &str {
        "list"
    }

    fn arity(&self) -> Arity {
        Arity::exactly(1)
    }

    fn structure(&self, args: &[NodeId], _program: &Program) -> Structure {
        Structure::Sequence(args[0])
    }

    fn validate(&self, args: &[NodeId], data: &Value, cx: &mut Validator<'_>) -> Result<(), OperationError> {
        let Value::Array(values) = data else {
            cx.error(format!("expected array, found {}", type_name(data)));
            return Ok(());
        };
        for (index, value) in values.iter().enumerate() {
            cx.descend(index, args[0], value)?;
        }
        Ok(())
    }

    fn render(&self, args: &[NodeId], data: &Value, cx: &mut Renderer<'_>) -> Result<RenderNode, OperationError> {
        let Value::Array(values) = data else {
            return Ok(cx.leaf("list", data, false));
        };
        let mut node = cx.node("list");
        for (index, value) in values.iter().enumerate() {
            node.children.push(cx.descend(index, args[0], value)?);
        }
        Ok(node)
    }

    fn ui(&self, args: &[NodeId], cx: &mut UiGenerator<'_>) -> Result<WidgetNode, OperationError> {
        let item = cx.visit(args[0])?.with_label("item");
        Ok(WidgetNode::new("list", "repeater").with_children(vec![item]))
    }

    /// Positional; arrays of different lengths conflict as a whole.
    fn merge(&self, args: &[NodeId], left: &Value, right: &Value, cx: &mut Merger<'_>) -> Result<Value, OperationError> {
        match (left, right) {
            (Value::Array(l), Value::Array(r)) if l.len() == r.len() => {
                let mut out = Vec::with_capacity(l.len());
                for (index, (a, b)) in l.iter().zip(r).enumerate() {
                    out.push(cx.descend(index, args[0], a, b)?);
                }
                Ok(Value::Array(out))
            }
            _ => Ok(cx.merge_opaque(left, right)),
        }
    }

    fn refactor(
        &self,
        args: &[NodeId],
        data: &Value,
        target: NodeId,
        cx: &mut Refactorer<'_>,
    ) -> Result<Value, OperationError> {
        let program = cx.program();
        let (Value::Array(values), Structure::Sequence(element)) = (data, program.unwrapped_structure(target)) else {
            return cx.carry(data, target);
        };
        let mut out = Vec::with_capacity(values.len());
        for (index, value) in values.iter().enumerate() {
            out.push(cx.descend(index, index, args[0], element, value)?);
        }
        Ok(Value::Array(out))
    }
}
