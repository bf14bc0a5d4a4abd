//! Shape-function registry.
//!
//! Each shape function (`string`, `object`, `list`, ...) is a capability
//! bundle: one value implementing [`ShapeFunction`] knows how to check its
//! own arguments and how to validate, render, describe, merge and refactor
//! data under a call to it. Operations look functions up by name here
//! instead of branching on shape kinds themselves.

use crate::merge::Merger;
use crate::program::{NodeId, Program, Structure};
use crate::refactor::Refactorer;
use crate::render::Renderer;
use crate::ui::UiGenerator;
use crate::validate::Validator;
use crate::{OperationError, builtins};
use rhizome_jsonshapes_ir::{RenderNode, WidgetNode};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Accepted argument counts for a shape function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    /// `None` for variadic functions
    pub max: Option<usize>,
}

impl Arity {
    pub const fn exactly(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    pub const fn between(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    pub fn contains(&self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{}", self.min),
            Some(max) => write!(f, "{} to {}", self.min, max),
            None => write!(f, "at least {}", self.min),
        }
    }
}

/// Whether a shape is satisfied by a missing object field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Absence {
    Required,
    Allowed,
    /// Allowed if any of these shapes allows it
    AnyOf(Vec<NodeId>),
    /// Allowed if all of these shapes allow it
    AllOf(Vec<NodeId>),
}

/// A shape function: its arity plus one hook per operation.
///
/// Only [`name`](Self::name), [`arity`](Self::arity) and
/// [`validate`](Self::validate) are required. The remaining operations have
/// leaf defaults: render the value as-is, compare for merging, copy when
/// refactoring if the value also fits the target shape.
pub trait ShapeFunction: Send + Sync {
    fn name(&self) -> &str;

    fn arity(&self) -> Arity;

    /// Checks argument kinds at resolve time. The error string becomes
    /// the reason of a `ResolveError::InvalidArgument`.
    fn check_args(&self, _args: &[NodeId], _program: &Program) -> Result<(), String> {
        Ok(())
    }

    fn absence(&self, _args: &[NodeId], _program: &Program) -> Absence {
        Absence::Required
    }

    /// How the shape decomposes data, used for refactoring and widget hints.
    fn structure(&self, _args: &[NodeId], _program: &Program) -> Structure {
        Structure::Opaque
    }

    fn validate(
        &self,
        args: &[NodeId],
        data: &Value,
        cx: &mut Validator<'_>,
    ) -> Result<(), OperationError>;

    fn render(
        &self,
        args: &[NodeId],
        data: &Value,
        cx: &mut Renderer<'_>,
    ) -> Result<RenderNode, OperationError> {
        let valid = cx.satisfies(|v| self.validate(args, data, v))?;
        Ok(cx.leaf(self.name(), data, valid))
    }

    fn ui(&self, _args: &[NodeId], _cx: &mut UiGenerator<'_>) -> Result<WidgetNode, OperationError> {
        Ok(WidgetNode::new(self.name(), "input"))
    }

    fn merge(
        &self,
        _args: &[NodeId],
        left: &Value,
        right: &Value,
        cx: &mut Merger<'_>,
    ) -> Result<Value, OperationError> {
        Ok(cx.merge_opaque(left, right))
    }

    fn refactor(
        &self,
        _args: &[NodeId],
        data: &Value,
        target: NodeId,
        cx: &mut Refactorer<'_>,
    ) -> Result<Value, OperationError> {
        cx.carry(data, target)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("shape function '{0}' is already registered")]
    Duplicate(String),

    #[error("shape function name '{0}' is not a valid identifier")]
    InvalidName(String),
}

/// A named set of shape functions.
#[derive(Clone, Default)]
pub struct Registry {
    functions: BTreeMap<String, Arc<dyn ShapeFunction>>,
}

impl Registry {
    /// A registry with no functions at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with every built-in shape function.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        builtins::install(&mut registry);
        registry
    }

    /// Adds a function. Names must be unique and usable as identifiers.
    pub fn register<F: ShapeFunction + 'static>(&mut self, function: F) -> Result<(), RegistryError> {
        let name = function.name().to_string();
        if !is_identifier(&name) {
            return Err(RegistryError::InvalidName(name));
        }
        if self.functions.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.functions.insert(name, Arc::new(function));
        Ok(())
    }

    pub(crate) fn insert(&mut self, function: impl ShapeFunction + 'static) {
        self.functions
            .insert(function.name().to_string(), Arc::new(function));
    }

    pub fn get(&self, name: &str) -> Option<&dyn ShapeFunction> {
        self.functions.get(name).map(|f| f.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.functions.keys()).finish()
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
