//! Shape resolution and the five shape-guided operations.
//!
//! ```text
//! text ──► parse_source ──► statements ──► resolve(registry) ──► Program
//!                                                                 │
//!        validate / render / ui_schema / merge / refactor ◄───────┘
//! ```
//!
//! Every operation borrows the [`Program`] read-only and dispatches each
//! shape-function call through the [`Registry`] the program was resolved
//! against. Registries are plain values: build one with
//! [`Registry::builtin`], add your own [`ShapeFunction`]s, and share it via
//! `Arc` between as many programs as needed.

mod builtins;
pub mod context;
pub mod merge;
pub mod options;
pub mod program;
pub mod refactor;
pub mod registry;
pub mod render;
pub mod resolve;
pub mod ui;
pub mod validate;

pub use context::{CancelToken, Context};
pub use merge::{Merger, merge, merge_with};
pub use options::{Options, OptionsError, UnknownKeys};
pub use program::{DefId, Node, NodeId, Program, Structure};
pub use refactor::{
    Correspondence, RefactorError, RefactorOutcome, Refactorer, refactor, refactor_with,
};
pub use registry::{Absence, Arity, Registry, RegistryError, ShapeFunction};
pub use render::{Renderer, render, render_with};
pub use resolve::{ResolveError, resolve, resolve_documents};
pub use ui::{UiGenerator, ui_schema, ui_schema_with};
pub use validate::{Validator, validate, validate_with};

pub use rhizome_jsonshapes_ir as ir;
pub use rhizome_jsonshapes_syntax::{SyntaxError, parse_source};

use std::sync::Arc;
use thiserror::Error;

/// Errors raised while running an operation against a program.
///
/// Data-level disagreements are never errors; these cover a bad request
/// (unknown shape name) or an interrupted run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error("unknown shape: {0}")]
    UnknownShape(String),

    #[error("shape function '{0}' is not in the program's registry")]
    UnknownFunction(String),

    #[error("a definition named '{0}' already exists")]
    ShapeExists(String),

    #[error("'{0}' is not a usable shape name")]
    InvalidShapeName(String),

    #[error("field '{field}' would be declared twice in '{shape}'")]
    DuplicateField { shape: String, field: String },

    #[error("operation cancelled")]
    Cancelled,
}

/// Everything [`load`] can fail with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),
}

/// Parse and resolve a document in one step.
pub fn load(source: &str, registry: Arc<Registry>) -> Result<Program, Error> {
    let statements = parse_source(source)?;
    Ok(resolve(&statements, registry)?)
}
