//! Shape-guided merging of two values.
//!
//! Both sides are walked together under one shape. Each shape function
//! decides how its values combine; anything it cannot reconcile is recorded
//! as a [`Conflict`] at the current path and the walk carries on, so every
//! conflict in the pair is reported in one pass.

use crate::builtins::{list, object, scalar};
use crate::context::Context;
use crate::program::{DefId, Node, NodeId, Program};
use crate::validate::Validator;
use crate::OperationError;
use rhizome_jsonshapes_ir::{Conflict, MergeResult, Path, PathSegment};
use serde_json::Value;
use std::collections::HashSet;

pub fn merge(program: &Program, shape: &str, left: &Value, right: &Value) -> Result<MergeResult, OperationError> {
    merge_with(program, shape, left, right, &Context::default())
}

pub fn merge_with(
    program: &Program,
    shape: &str,
    left: &Value,
    right: &Value,
    cx: &Context,
) -> Result<MergeResult, OperationError> {
    let def = program.shape(shape)?;
    tracing::debug!(shape, "merging");
    let mut merger = Merger {
        program,
        cx,
        path: Path::root(),
        conflicts: Vec::new(),
        active: HashSet::new(),
    };
    let merged = merger.visit_definition(def, left, right)?;
    if merger.conflicts.is_empty() {
        Ok(MergeResult::Merged(merged))
    } else {
        tracing::debug!(shape, conflicts = merger.conflicts.len(), "merge produced conflicts");
        Ok(MergeResult::Conflicts(merger.conflicts))
    }
}

pub struct Merger<'p> {
    program: &'p Program,
    cx: &'p Context,
    path: Path,
    conflicts: Vec<Conflict>,
    active: HashSet<(DefId, *const Value, *const Value)>,
}

impl<'p> Merger<'p> {
    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn context(&self) -> &'p Context {
        self.cx
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records a conflict at the current path.
    pub fn conflict(&mut self, left: Option<&Value>, right: Option<&Value>) {
        self.conflicts.push(Conflict {
            path: self.path.clone(),
            left: left.cloned(),
            right: right.cloned(),
        });
    }

    /// Merges two values with no inner structure: equal values merge, anything
    /// else is a conflict. The left value stands in the partial result.
    pub fn merge_opaque(&mut self, left: &Value, right: &Value) -> Value {
        if !scalar::same_value(left, right) {
            self.conflict(Some(left), Some(right));
        }
        left.clone()
    }

    /// True when `node` accepts `data` at the current path.
    pub fn accepts(&mut self, node: NodeId, data: &Value) -> Result<bool, OperationError> {
        let mut validator = Validator::new(self.program, self.cx, self.path.clone());
        validator.visit(node, data)?;
        Ok(validator.finish().is_valid())
    }

    pub fn descend(
        &mut self,
        segment: impl Into<PathSegment>,
        node: NodeId,
        left: &Value,
        right: &Value,
    ) -> Result<Value, OperationError> {
        self.path.push(segment);
        let result = self.visit(node, left, right);
        self.path.pop();
        result
    }

    /// Records a conflict at a child of the current path.
    pub fn conflict_at(
        &mut self,
        segment: impl Into<PathSegment>,
        left: Option<&Value>,
        right: Option<&Value>,
    ) {
        self.path.push(segment);
        self.conflict(left, right);
        self.path.pop();
    }

    pub fn visit(&mut self, node: NodeId, left: &Value, right: &Value) -> Result<Value, OperationError> {
        self.cx.checkpoint()?;
        let program = self.program;
        match program.node(node) {
            Node::Literal { .. } => Ok(self.merge_opaque(left, right)),
            Node::Tuple { items } => list::merge_tuple(items, left, right, self),
            Node::Record { fields } => object::merge_record(fields, left, right, self),
            Node::Call { function, args } => program.function(function)?.merge(args, left, right, self),
            Node::Reference { target } => self.visit_definition(*target, left, right),
        }
    }

    fn visit_definition(&mut self, def: DefId, left: &Value, right: &Value) -> Result<Value, OperationError> {
        let program = self.program;
        let key = (def, left as *const Value, right as *const Value);
        if !self.active.insert(key) {
            tracing::trace!(
                shape = %program.definition(def).name,
                path = %self.path,
                "recursion guard hit"
            );
            return Ok(self.merge_opaque(left, right));
        }
        let result = self.visit(program.definition(def).body, left, right);
        self.active.remove(&key);
        result
    }
}
