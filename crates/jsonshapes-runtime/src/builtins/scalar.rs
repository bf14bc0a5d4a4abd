//! Scalar shapes and scalar literals.

use crate::program::{NodeId, Program};
use crate::registry::{Absence, Arity, ShapeFunction};
use crate::render::Renderer;
use crate::ui::UiGenerator;
use crate::validate::{Validator, type_name};
use crate::OperationError;
use rhizome_jsonshapes_ir::{RenderNode, WidgetNode};
use serde_json::Value;

/// JSON equality, except that numbers compare by value (`1 == 1.0`).
pub(crate) fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| same_value(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| same_value(x, y)))
        }
        _ => a == b,
    }
}

pub(crate) fn validate_literal(expected: &Value, data: &Value, cx: &mut Validator<'_>) {
    if !same_value(expected, data) {
        cx.error(format!("expected {expected}, found {data}"));
    }
}

pub(crate) fn render_literal(expected: &Value, data: &Value, cx: &mut Renderer<'_>) -> RenderNode {
    cx.leaf("literal", data, same_value(expected, data))
}

pub(crate) fn ui_literal(value: &Value) -> WidgetNode {
    WidgetNode::new("literal", "static").prop("value", value.clone())
}

fn expect_type(expected: &str, data: &Value, cx: &mut Validator<'_>) {
    let found = type_name(data);
    if found != expected {
        cx.error(format!("expected {expected}, found {found}"));
    }
}

pub(crate) struct StringShape;

impl ShapeFunction for StringShape {
    fn name(&self) -> &str {
        "string"
    }

    fn arity(&self) -> Arity {
        Arity::exactly(0)
    }

    fn validate(&self, _args: &[NodeId], data: &Value, cx: &mut Validator<'_>) -> Result<(), OperationError> {
        expect_type("string", data, cx);
        Ok(())
    }

    fn ui(&self, _args: &[NodeId], _cx: &mut UiGenerator<'_>) -> Result<WidgetNode, OperationError> {
        Ok(WidgetNode::new("string", "text"))
    }
}

pub(crate) struct NonEmptyString;

impl ShapeFunction for NonEmptyString {
    fn name(&self) -> &str {
        "nonemptyString"
    }

    fn arity(&self) -> Arity {
        Arity::exactly(0)
    }

    fn validate(&self, _args: &[NodeId], data: &Value, cx: &mut Validator<'_>) -> Result<(), OperationError> {
        match data {
            Value::String(s) if s.is_empty() => cx.error("expected non-empty string"),
            Value::String(_) => {}
            other => cx.error(format!("expected string, found {}", type_name(other))),
        }
        Ok(())
    }

    fn ui(&self, _args: &[NodeId], _cx: &mut UiGenerator<'_>) -> Result<WidgetNode, OperationError> {
        Ok(WidgetNode::new("nonemptyString", "text").prop("required", true))
    }
}

pub(crate) struct NumberShape;

impl ShapeFunction for NumberShape {
    fn name(&self) -> &str {
        "number"
    }

    fn arity(&self) -> Arity {
        Arity::exactly(0)
    }

    fn validate(&self, _args: &[NodeId], data: &Value, cx: &mut Validator<'_>) -> Result<(), OperationError> {
        expect_type("number", data, cx);
        Ok(())
    }

    fn ui(&self, _args: &[NodeId], _cx: &mut UiGenerator<'_>) -> Result<WidgetNode, OperationError> {
        Ok(WidgetNode::new("number", "number"))
    }
}

pub(crate) struct BooleanShape;

impl ShapeFunction for BooleanShape {
    fn name(&self) -> &str {
        "boolean"
    }

    fn arity(&self) -> Arity {
        Arity::exactly(0)
    }

    fn validate(&self, _args: &[NodeId], data: &Value, cx: &mut Validator<'_>) -> Result<(), OperationError> {
        expect_type("boolean", data, cx);
        Ok(())
    }

    fn ui(&self, _args: &[NodeId], _cx: &mut UiGenerator<'_>) -> Result<WidgetNode, OperationError> {
        Ok(WidgetNode::new("boolean", "checkbox"))
    }
}

pub(crate) struct NullShape;

impl ShapeFunction for NullShape {
    fn name(&self) -> &str {
        "null"
    }

    fn arity(&self) -> Arity {
        Arity::exactly(0)
    }

    fn validate(&self, _args: &[NodeId], data: &Value, cx: &mut Validator<'_>) -> Result<(), OperationError> {
        expect_type("null", data, cx);
        Ok(())
    }

    fn ui(&self, _args: &[NodeId], _cx: &mut UiGenerator<'_>) -> Result<WidgetNode, OperationError> {
        Ok(WidgetNode::new("null", "static").prop("value", Value::Null))
    }
}

/// Accepts any value, including a missing field.
pub(crate) struct Anything;

impl ShapeFunction for Anything {
    fn name(&self) -> &str {
        "anything"
    }

    fn arity(&self) -> Arity {
        Arity::exactly(0)
    }

    fn absence(&self, _args: &[NodeId], _program: &Program) -> Absence {
        Absence::Allowed
    }

    fn validate(&self, _args: &[NodeId], _data: &Value, _cx: &mut Validator<'_>) -> Result<(), OperationError> {
        Ok(())
    }

    fn ui(&self, _args: &[NodeId], _cx: &mut UiGenerator<'_>) -> Result<WidgetNode, OperationError> {
        Ok(WidgetNode::new("anything", "json"))
    }
}

/// `constant(literal)`: exactly the given JSON value, arrays and objects included.
pub(crate) struct Constant;

impl ShapeFunction for Constant {
    fn name(&self) -> &str {
        "constant"
    }

    fn arity(&self) -> Arity {
        Arity::exactly(1)
    }

    fn check_args(&self, args: &[NodeId], program: &Program) -> Result<(), String> {
        match program.literal_value(args[0]) {
            Some(_) => Ok(()),
            None => Err("expected a literal JSON value".to_string()),
        }
    }

    fn validate(&self, args: &[NodeId], data: &Value, cx: &mut Validator<'_>) -> Result<(), OperationError> {
        match cx.program().literal_value(args[0]) {
            Some(expected) => validate_literal(&expected, data, cx),
            None => cx.error("constant argument is not a literal"),
        }
        Ok(())
    }

    fn ui(&self, args: &[NodeId], cx: &mut UiGenerator<'_>) -> Result<WidgetNode, OperationError> {
        let value = cx.program().literal_value(args[0]).unwrap_or(Value::Null);
        Ok(WidgetNode::new("constant", "static").prop("value", value))
    }
}
