//! Shared data model for JSON-Shapes.
//!
//! This crate defines the types passed between the syntax frontend and the
//! runtime operations:
//! - [`Statement`] / [`Expr`]: the unresolved document, as produced by the parser
//! - [`Path`]: a location inside a JSON data value
//! - [`ValidationResult`] / [`MergeResult`]: data-level reports
//! - [`RenderNode`] / [`WidgetNode`]: declarative presentation trees
//!
//! # Source format
//!
//! A document is a sequence of `;`-separated statements. Each statement is a
//! definition (`name = expr`) or a bare expression, where an expression is any
//! JSON value extended with shape-function calls and references:
//!
//! ```text
//! node = object({"value": number(), "next": optional(node)});
//! ```

mod ast;
mod path;
mod report;
mod tree;

pub use ast::{Definition, Expr, ExprKind, Position, Statement};
pub use path::{Path, PathSegment};
pub use report::{Conflict, MergeResult, Severity, ValidationResult, Violation};
pub use tree::{RenderNode, WidgetNode};
