//! Shape-guided validation.
//!
//! The validator descends the shape graph, not the data, so malformed data
//! can only add violations; it never aborts the walk.

use crate::builtins::{list, object, scalar};
use crate::context::Context;
use crate::program::{DefId, Node, NodeId, Program};
use crate::OperationError;
use rhizome_jsonshapes_ir::{Path, PathSegment, ValidationResult, Violation};
use serde_json::Value;
use std::collections::HashSet;

/// Validate `data` against the named shape with default options.
pub fn validate(program: &Program, shape: &str, data: &Value) -> Result<ValidationResult, OperationError> {
    validate_with(program, shape, data, &Context::default())
}

pub fn validate_with(
    program: &Program,
    shape: &str,
    data: &Value,
    cx: &Context,
) -> Result<ValidationResult, OperationError> {
    let def = program.shape(shape)?;
    tracing::debug!(shape, "validating");
    let mut validator = Validator::new(program, cx, Path::root());
    validator.visit_definition(def, data)?;
    Ok(validator.finish())
}

/// Walk state for one validation run.
pub struct Validator<'p> {
    program: &'p Program,
    cx: &'p Context,
    path: Path,
    violations: Vec<Violation>,
    /// Definitions currently being expanded, keyed with the data they were entered with
    active: HashSet<(DefId, *const Value)>,
}

impl<'p> Validator<'p> {
    pub(crate) fn new(program: &'p Program, cx: &'p Context, path: Path) -> Self {
        Self {
            program,
            cx,
            path,
            violations: Vec::new(),
            active: HashSet::new(),
        }
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn context(&self) -> &'p Context {
        self.cx
    }

    /// Path of the value currently being validated.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.violations
            .push(Violation::error(self.path.clone(), message));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.violations
            .push(Violation::warning(self.path.clone(), message));
    }

    /// Reports an error at a child of the current path.
    pub fn error_at(&mut self, segment: impl Into<PathSegment>, message: impl Into<String>) {
        self.violations
            .push(Violation::error(self.path.join(segment), message));
    }

    pub fn warning_at(&mut self, segment: impl Into<PathSegment>, message: impl Into<String>) {
        self.violations
            .push(Violation::warning(self.path.join(segment), message));
    }

    /// Validates a child value under `node`.
    pub fn descend(
        &mut self,
        segment: impl Into<PathSegment>,
        node: NodeId,
        data: &Value,
    ) -> Result<(), OperationError> {
        self.path.push(segment);
        let result = self.visit(node, data);
        self.path.pop();
        result
    }

    /// Runs `node` against `data` in isolation and returns what it reported,
    /// leaving this validator's own violations untouched.
    pub fn probe(&mut self, node: NodeId, data: &Value) -> Result<Vec<Violation>, OperationError> {
        let saved = std::mem::take(&mut self.violations);
        let result = self.visit(node, data);
        let probed = std::mem::replace(&mut self.violations, saved);
        result.map(|()| probed)
    }

    /// True when `node` accepts `data` without errors.
    pub fn accepts(&mut self, node: NodeId, data: &Value) -> Result<bool, OperationError> {
        let probed = self.probe(node, data)?;
        Ok(ValidationResult::new(probed).is_valid())
    }

    /// Appends violations gathered by [`probe`](Self::probe).
    pub fn extend(&mut self, violations: Vec<Violation>) {
        self.violations.extend(violations);
    }

    pub fn visit(&mut self, node: NodeId, data: &Value) -> Result<(), OperationError> {
        self.cx.checkpoint()?;
        if let Some(max) = self.cx.options.max_depth {
            if self.path.len() > max {
                self.error(format!("maximum depth of {max} exceeded"));
                return Ok(());
            }
        }

        let program = self.program;
        match program.node(node) {
            Node::Literal { value } => {
                scalar::validate_literal(value, data, self);
                Ok(())
            }
            Node::Tuple { items } => list::validate_tuple(items, data, self),
            Node::Record { fields } => {
                object::validate_record(fields, self.cx.options.unknown_keys, data, self)
            }
            Node::Call { function, args } => program.function(function)?.validate(args, data, self),
            Node::Reference { target } => self.visit_definition(*target, data),
        }
    }

    pub(crate) fn finish(self) -> ValidationResult {
        ValidationResult::new(self.violations)
    }

    fn visit_definition(&mut self, def: DefId, data: &Value) -> Result<(), OperationError> {
        let program = self.program;
        let key = (def, data as *const Value);
        if !self.active.insert(key) {
            // Same shape, same data, no progress: a terminal leaf
            tracing::trace!(
                shape = %program.definition(def).name,
                path = %self.path,
                "recursion guard hit"
            );
            return Ok(());
        }
        let result = self.visit(program.definition(def).body, data);
        self.active.remove(&key);
        result
    }
}

/// Short JSON type name for messages.
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
