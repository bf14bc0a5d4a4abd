//! Unresolved document types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A location in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// Byte offset from the start of the document
    pub offset: usize,
    /// 1-based line number
    pub line: usize,
    /// 1-based column (in characters)
    pub column: usize,
}

impl Position {
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The shape of an expression node.
///
/// Object members keep their declaration order; call arguments are positional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExprKind {
    /// A JSON scalar: string, number, boolean or null
    Literal { value: Value },
    /// A JSON array whose elements may be any expression
    Array { items: Vec<Expr> },
    /// A JSON object whose values may be any expression
    Object { members: Vec<(String, Expr)> },
    /// `function(arg, ...)`
    Call { function: String, args: Vec<Expr> },
    /// A bare identifier naming a definition
    Reference { name: String },
}

/// An expression together with the position it was parsed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub position: Position,
}

impl Expr {
    pub fn new(kind: ExprKind, position: Position) -> Self {
        Self { kind, position }
    }

    pub fn literal(value: impl Into<Value>, position: Position) -> Self {
        Self::new(
            ExprKind::Literal {
                value: value.into(),
            },
            position,
        )
    }

    pub fn call(function: impl Into<String>, args: Vec<Expr>, position: Position) -> Self {
        Self::new(
            ExprKind::Call {
                function: function.into(),
                args,
            },
            position,
        )
    }

    pub fn reference(name: impl Into<String>, position: Position) -> Self {
        Self::new(ExprKind::Reference { name: name.into() }, position)
    }

    /// Returns the function name if this is a call.
    pub fn function(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Call { function, .. } => Some(function),
            _ => None,
        }
    }

    /// Returns the arguments if this is a call.
    pub fn args(&self) -> Option<&[Expr]> {
        match &self.kind {
            ExprKind::Call { args, .. } => Some(args),
            _ => None,
        }
    }

    /// Returns the referenced name if this is a reference.
    pub fn reference_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Reference { name } => Some(name),
            _ => None,
        }
    }

    /// Converts the expression to plain JSON if it contains no calls or references.
    pub fn to_json(&self) -> Option<Value> {
        match &self.kind {
            ExprKind::Literal { value } => Some(value.clone()),
            ExprKind::Array { items } => items
                .iter()
                .map(Expr::to_json)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            ExprKind::Object { members } => {
                let mut map = serde_json::Map::new();
                for (key, value) in members {
                    map.insert(key.clone(), value.to_json()?);
                }
                Some(Value::Object(map))
            }
            ExprKind::Call { .. } | ExprKind::Reference { .. } => None,
        }
    }
}

/// A named shape: `name = body`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    pub name: String,
    pub position: Position,
    pub body: Expr,
}

/// One top-level statement of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "statement", rename_all = "snake_case")]
pub enum Statement {
    Definition(Definition),
    Expression(Expr),
}

impl Statement {
    /// Returns the definition name, if this statement defines one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Statement::Definition(def) => Some(&def.name),
            Statement::Expression(_) => None,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Statement::Definition(def) => def.position,
            Statement::Expression(expr) => expr.position,
        }
    }
}
