//! Shape-guided rendering of data into a [`RenderNode`] tree.
//!
//! Rendering never fails on bad data: a node whose data does not fit its
//! shape is emitted with an `invalid: true` annotation instead.

use crate::builtins::{list, object, scalar};
use crate::context::Context;
use crate::program::{DefId, Node, NodeId, Program};
use crate::validate::Validator;
use crate::OperationError;
use rhizome_jsonshapes_ir::{Path, PathSegment, RenderNode};
use serde_json::Value;
use std::collections::HashSet;

pub fn render(program: &Program, shape: &str, data: &Value) -> Result<RenderNode, OperationError> {
    render_with(program, shape, data, &Context::default())
}

pub fn render_with(
    program: &Program,
    shape: &str,
    data: &Value,
    cx: &Context,
) -> Result<RenderNode, OperationError> {
    let def = program.shape(shape)?;
    tracing::debug!(shape, "rendering");
    let mut renderer = Renderer {
        program,
        cx,
        path: Path::root(),
        active: HashSet::new(),
    };
    renderer.visit_definition(def, data)
}

pub struct Renderer<'p> {
    program: &'p Program,
    cx: &'p Context,
    path: Path,
    active: HashSet<(DefId, *const Value)>,
}

impl<'p> Renderer<'p> {
    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn context(&self) -> &'p Context {
        self.cx
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A node for the current path with no children.
    pub fn node(&self, kind: &str) -> RenderNode {
        RenderNode::new(kind, self.path.clone())
    }

    /// A scalar node carrying `data`, marked invalid if needed.
    pub fn leaf(&self, kind: &str, data: &Value, valid: bool) -> RenderNode {
        let node = self.node(kind).with_value(data.clone());
        if valid { node } else { node.annotate("invalid", true) }
    }

    /// Runs a validation check at the current path.
    pub fn satisfies(
        &mut self,
        check: impl FnOnce(&mut Validator<'_>) -> Result<(), OperationError>,
    ) -> Result<bool, OperationError> {
        let mut validator = Validator::new(self.program, self.cx, self.path.clone());
        check(&mut validator)?;
        Ok(validator.finish().is_valid())
    }

    /// True when `node` accepts `data`.
    pub fn accepts(&mut self, node: NodeId, data: &Value) -> Result<bool, OperationError> {
        self.satisfies(|v| v.visit(node, data))
    }

    /// Renders a child value under `node`, labelled with the segment.
    pub fn descend(
        &mut self,
        segment: impl Into<PathSegment>,
        node: NodeId,
        data: &Value,
    ) -> Result<RenderNode, OperationError> {
        let segment = segment.into();
        let label = match &segment {
            PathSegment::Key(key) => Some(key.clone()),
            PathSegment::Index(_) => None,
        };
        self.path.push(segment);
        let result = self.visit(node, data);
        self.path.pop();
        let rendered = result?;
        Ok(match label {
            Some(label) => rendered.with_label(label),
            None => rendered,
        })
    }

    /// A placeholder for a declared field that is missing from the data.
    pub fn absent(&mut self, key: &str, node: NodeId) -> RenderNode {
        let program = self.program;
        let placeholder = RenderNode::new(program.kind(node), self.path.join(key))
            .with_label(key)
            .annotate("absent", true);
        if program.accepts_absent(node) {
            placeholder
        } else {
            placeholder.annotate("invalid", true)
        }
    }

    pub fn visit(&mut self, node: NodeId, data: &Value) -> Result<RenderNode, OperationError> {
        self.cx.checkpoint()?;
        let program = self.program;
        match program.node(node) {
            Node::Literal { value } => Ok(scalar::render_literal(value, data, self)),
            Node::Tuple { items } => list::render_tuple(items, data, self),
            Node::Record { fields } => {
                object::render_record("record", fields, self.cx.options.unknown_keys, data, self)
            }
            Node::Call { function, args } => program.function(function)?.render(args, data, self),
            Node::Reference { target } => self.visit_definition(*target, data),
        }
    }

    fn visit_definition(&mut self, def: DefId, data: &Value) -> Result<RenderNode, OperationError> {
        let program = self.program;
        let name = &program.definition(def).name;
        let key = (def, data as *const Value);
        if !self.active.insert(key) {
            tracing::trace!(shape = %name, path = %self.path, "recursion guard hit");
            return Ok(self
                .node("reference")
                .with_value(data.clone())
                .annotate("definition", name.as_str()));
        }
        let result = self.visit(program.definition(def).body, data);
        self.active.remove(&key);
        Ok(result?.annotate("definition", name.as_str()))
    }
}
