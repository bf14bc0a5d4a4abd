//! Combinators: `oneOf`, `oneOfNamed`, `optional`, `not`, `allOf`.

use crate::merge::Merger;
use crate::program::{Node, NodeId, Program, Structure};
use crate::refactor::Refactorer;
use crate::registry::{Absence, Arity, ShapeFunction};
use crate::render::Renderer;
use crate::ui::UiGenerator;
use crate::validate::Validator;
use crate::OperationError;
use rhizome_jsonshapes_ir::{RenderNode, Severity, Violation, WidgetNode};
use serde_json::Value;
use std::fmt;

fn has_errors(violations: &[Violation]) -> bool {
    violations.iter().any(|v| v.severity == Severity::Error)
}

/// Name of the labelled alternation; its record argument holds option
/// names, not data fields.
pub(crate) const ONE_OF_NAMED: &str = "oneOfNamed";

fn validate_choice<L: fmt::Display>(
    options: impl ExactSizeIterator<Item = (L, NodeId)>,
    data: &Value,
    cx: &mut Validator<'_>,
) -> Result<(), OperationError> {
    let count = options.len();
    let mut reasons = Vec::with_capacity(count);
    for (label, option) in options {
        let probed = cx.probe(option, data)?;
        if !has_errors(&probed) {
            cx.extend(probed);
            return Ok(());
        }
        let mut errors = probed.iter().filter(|v| v.severity == Severity::Error);
        let first = errors.next().map(|v| v.message.as_str()).unwrap_or_default();
        let rest = errors.count();
        reasons.push(if rest == 0 {
            format!("[{label}] {first}")
        } else {
            format!("[{label}] {first} (+{rest} more)")
        });
    }
    cx.error(format!(
        "matched none of {count} options: {}",
        reasons.join("; ")
    ));
    Ok(())
}

fn render_choice<L: Into<Value>>(
    kind: &str,
    options: impl Iterator<Item = (L, NodeId)>,
    data: &Value,
    cx: &mut Renderer<'_>,
) -> Result<RenderNode, OperationError> {
    for (label, option) in options {
        if cx.accepts(option, data)? {
            return Ok(cx.visit(option, data)?.annotate("option", label));
        }
    }
    Ok(cx.leaf(kind, data, false))
}

/// Merges under the first option both sides satisfy.
fn merge_choice(
    options: impl Iterator<Item = NodeId>,
    left: &Value,
    right: &Value,
    cx: &mut Merger<'_>,
) -> Result<Value, OperationError> {
    for option in options {
        if cx.accepts(option, left)? && cx.accepts(option, right)? {
            return cx.visit(option, left, right);
        }
    }
    Ok(cx.merge_opaque(left, right))
}

fn refactor_choice(
    options: impl Iterator<Item = NodeId>,
    data: &Value,
    target: NodeId,
    cx: &mut Refactorer<'_>,
) -> Result<Value, OperationError> {
    for option in options {
        if cx.matches_source(option, data)? {
            return cx.visit(option, target, data);
        }
    }
    cx.carry(data, target)
}

/// The first option that accepts the value wins.
pub(crate) struct OneOf;

impl ShapeFunction for OneOf {
    fn name(&self) -> &str {
        "oneOf"
    }

    fn arity(&self) -> Arity {
        Arity::at_least(1)
    }

    fn absence(&self, args: &[NodeId], _program: &Program) -> Absence {
        Absence::AnyOf(args.to_vec())
    }

    fn validate(&self, args: &[NodeId], data: &Value, cx: &mut Validator<'_>) -> Result<(), OperationError> {
        validate_choice(args.iter().copied().enumerate(), data, cx)
    }

    fn render(&self, args: &[NodeId], data: &Value, cx: &mut Renderer<'_>) -> Result<RenderNode, OperationError> {
        render_choice("oneOf", args.iter().copied().enumerate(), data, cx)
    }

    fn ui(&self, args: &[NodeId], cx: &mut UiGenerator<'_>) -> Result<WidgetNode, OperationError> {
        let options = cx.visit_all(args)?;
        Ok(WidgetNode::new("oneOf", "choice")
            .prop("options", args.len())
            .with_children(options))
    }

    fn merge(&self, args: &[NodeId], left: &Value, right: &Value, cx: &mut Merger<'_>) -> Result<Value, OperationError> {
        merge_choice(args.iter().copied(), left, right, cx)
    }

    fn refactor(
        &self,
        args: &[NodeId],
        data: &Value,
        target: NodeId,
        cx: &mut Refactorer<'_>,
    ) -> Result<Value, OperationError> {
        refactor_choice(args.iter().copied(), data, target, cx)
    }
}

fn named_options<'p>(args: &[NodeId], program: &'p Program) -> &'p [(String, NodeId)] {
    match program.node(program.deref(args[0])) {
        Node::Record { fields } => fields,
        _ => &[],
    }
}

/// `oneOfNamed({"name": shape, ...})`: like `oneOf`, but options are
/// reported and annotated by name rather than position.
pub(crate) struct OneOfNamed;

impl ShapeFunction for OneOfNamed {
    fn name(&self) -> &str {
        ONE_OF_NAMED
    }

    fn arity(&self) -> Arity {
        Arity::exactly(1)
    }

    fn check_args(&self, args: &[NodeId], program: &Program) -> Result<(), String> {
        match program.node(args[0]) {
            Node::Record { fields } if !fields.is_empty() => Ok(()),
            Node::Record { .. } => Err("expected at least one named option".to_string()),
            _ => Err("expected an object literal of named options".to_string()),
        }
    }

    fn absence(&self, args: &[NodeId], program: &Program) -> Absence {
        Absence::AnyOf(named_options(args, program).iter().map(|(_, node)| *node).collect())
    }

    fn validate(&self, args: &[NodeId], data: &Value, cx: &mut Validator<'_>) -> Result<(), OperationError> {
        let options = named_options(args, cx.program());
        validate_choice(options.iter().map(|(name, node)| (name, *node)), data, cx)
    }

    fn render(&self, args: &[NodeId], data: &Value, cx: &mut Renderer<'_>) -> Result<RenderNode, OperationError> {
        let options = named_options(args, cx.program());
        render_choice(ONE_OF_NAMED, options.iter().map(|(name, node)| (name.as_str(), *node)), data, cx)
    }

    fn ui(&self, args: &[NodeId], cx: &mut UiGenerator<'_>) -> Result<WidgetNode, OperationError> {
        let options = named_options(args, cx.program());
        let mut children = Vec::with_capacity(options.len());
        for (name, node) in options {
            children.push(cx.visit(*node)?.with_label(name.as_str()));
        }
        Ok(WidgetNode::new(ONE_OF_NAMED, "choice")
            .prop("options", options.len())
            .with_children(children))
    }

    fn merge(&self, args: &[NodeId], left: &Value, right: &Value, cx: &mut Merger<'_>) -> Result<Value, OperationError> {
        let options = named_options(args, cx.program());
        merge_choice(options.iter().map(|(_, node)| *node), left, right, cx)
    }

    fn refactor(
        &self,
        args: &[NodeId],
        data: &Value,
        target: NodeId,
        cx: &mut Refactorer<'_>,
    ) -> Result<Value, OperationError> {
        let options = named_options(args, cx.program());
        refactor_choice(options.iter().map(|(_, node)| *node), data, target, cx)
    }
}

/// `optional(shape)`: `null`, a missing field, or a value matching `shape`.
pub(crate) struct Optional;

impl ShapeFunction for Optional {
    fn name(&self) -> &str {
        "optional"
    }

    fn arity(&self) -> Arity {
        Arity::exactly(1)
    }

    fn absence(&self, _args: &[NodeId], _program: &Program) -> Absence {
        Absence::Allowed
    }

    fn structure(&self, args: &[NodeId], _program: &Program) -> Structure {
        Structure::Wrapper(args[0])
    }

    fn validate(&self, args: &[NodeId], data: &Value, cx: &mut Validator<'_>) -> Result<(), OperationError> {
        if data.is_null() {
            return Ok(());
        }
        cx.visit(args[0], data)
    }

    fn render(&self, args: &[NodeId], data: &Value, cx: &mut Renderer<'_>) -> Result<RenderNode, OperationError> {
        if data.is_null() {
            return Ok(cx.leaf("optional", data, true));
        }
        cx.visit(args[0], data)
    }

    fn ui(&self, args: &[NodeId], cx: &mut UiGenerator<'_>) -> Result<WidgetNode, OperationError> {
        let inner = cx.visit(args[0])?;
        Ok(WidgetNode::new("optional", "optional").with_children(vec![inner]))
    }

    fn merge(&self, args: &[NodeId], left: &Value, right: &Value, cx: &mut Merger<'_>) -> Result<Value, OperationError> {
        match (left.is_null(), right.is_null()) {
            (true, true) => Ok(Value::Null),
            (false, false) => cx.visit(args[0], left, right),
            _ => {
                cx.conflict(Some(left), Some(right));
                Ok(left.clone())
            }
        }
    }

    fn refactor(
        &self,
        args: &[NodeId],
        data: &Value,
        target: NodeId,
        cx: &mut Refactorer<'_>,
    ) -> Result<Value, OperationError> {
        if data.is_null() {
            return cx.carry(data, target);
        }
        cx.visit(args[0], target, data)
    }
}

/// `not(shape)`: anything the inner shape rejects.
pub(crate) struct Not;

impl ShapeFunction for Not {
    fn name(&self) -> &str {
        "not"
    }

    fn arity(&self) -> Arity {
        Arity::exactly(1)
    }

    fn validate(&self, args: &[NodeId], data: &Value, cx: &mut Validator<'_>) -> Result<(), OperationError> {
        if cx.accepts(args[0], data)? {
            cx.error("matches a negated shape");
        }
        Ok(())
    }

    fn ui(&self, args: &[NodeId], cx: &mut UiGenerator<'_>) -> Result<WidgetNode, OperationError> {
        let inner = cx.visit(args[0])?;
        Ok(WidgetNode::new("not", "group")
            .prop("negated", true)
            .with_children(vec![inner]))
    }
}

/// `allOf(shape, ...)`: a value every argument accepts.
pub(crate) struct AllOf;

impl ShapeFunction for AllOf {
    fn name(&self) -> &str {
        "allOf"
    }

    fn arity(&self) -> Arity {
        Arity::at_least(1)
    }

    fn absence(&self, args: &[NodeId], _program: &Program) -> Absence {
        Absence::AllOf(args.to_vec())
    }

    fn validate(&self, args: &[NodeId], data: &Value, cx: &mut Validator<'_>) -> Result<(), OperationError> {
        for part in args {
            cx.visit(*part, data)?;
        }
        Ok(())
    }

    fn ui(&self, args: &[NodeId], cx: &mut UiGenerator<'_>) -> Result<WidgetNode, OperationError> {
        let parts = cx.visit_all(args)?;
        Ok(WidgetNode::new("allOf", "group").with_children(parts))
    }
}
