//! Moving data from one shape to another.
//!
//! Two halves:
//! - [`refactor`] walks a value under an old and a new shape together and
//!   rebuilds it for the new one, renaming and dropping record fields per a
//!   [`Correspondence`].
//! - [`Program::refactor_shape`] derives the new shape itself by copying an
//!   existing definition with the same field table applied.

use crate::builtins::{choice, list, object};
use crate::context::Context;
use crate::program::{DefId, DefinitionEntry, Node, NodeId, Program, Structure};
use crate::validate::Validator;
use crate::OperationError;
use rhizome_jsonshapes_ir::{Path, PathSegment, Position};
use rhizome_jsonshapes_syntax::is_reserved;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use thiserror::Error;

/// Field-name table from an old shape to a new one.
///
/// Fields not mentioned keep their name. The table applies to records at
/// every depth.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Correspondence {
    pub renames: BTreeMap<String, String>,
    pub drops: BTreeSet<String>,
}

impl Correspondence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.renames.insert(from.into(), to.into());
        self
    }

    pub fn drop_field(mut self, name: impl Into<String>) -> Self {
        self.drops.insert(name.into());
        self
    }

    pub fn is_dropped(&self, key: &str) -> bool {
        self.drops.contains(key)
    }

    /// New name for an old field, or `None` if it is dropped.
    pub fn target_of<'a>(&'a self, key: &'a str) -> Option<&'a str> {
        if self.is_dropped(key) {
            return None;
        }
        Some(self.renames.get(key).map_or(key, String::as_str))
    }

    /// The old field that feeds a new one, if any.
    pub fn source_for<'a>(&'a self, target: &'a str) -> Option<&'a str> {
        if let Some((from, _)) = self.renames.iter().find(|(_, to)| to.as_str() == target) {
            return Some(from.as_str());
        }
        if self.renames.contains_key(target) || self.is_dropped(target) {
            None
        } else {
            Some(target)
        }
    }
}

/// Best-effort refactored data plus everything that could not be carried over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefactorOutcome {
    pub data: Value,
    /// Source paths with no destination, and required target paths with no source
    pub unresolved: Vec<Path>,
}

impl RefactorOutcome {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    pub fn into_result(self) -> Result<Value, RefactorError> {
        if self.unresolved.is_empty() {
            Ok(self.data)
        } else {
            Err(RefactorError {
                partial: self.data,
                unresolved: self.unresolved,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("refactor left {} path(s) unresolved: {}", .unresolved.len(), display_paths(.unresolved))]
pub struct RefactorError {
    pub partial: Value,
    pub unresolved: Vec<Path>,
}

fn display_paths(paths: &[Path]) -> String {
    paths
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn refactor(
    program: &Program,
    old: &str,
    new: &str,
    data: &Value,
    correspondence: &Correspondence,
) -> Result<RefactorOutcome, OperationError> {
    refactor_with(program, old, new, data, correspondence, &Context::default())
}

pub fn refactor_with(
    program: &Program,
    old: &str,
    new: &str,
    data: &Value,
    correspondence: &Correspondence,
    cx: &Context,
) -> Result<RefactorOutcome, OperationError> {
    let old_def = program.shape(old)?;
    let new_def = program.shape(new)?;
    tracing::debug!(old, new, "refactoring");
    let mut refactorer = Refactorer {
        program,
        cx,
        correspondence,
        source: Path::root(),
        target: Path::root(),
        unresolved: Vec::new(),
        active: HashSet::new(),
    };
    let data = refactorer.visit_definition(old_def, program.definition(new_def).body, data)?;
    Ok(RefactorOutcome {
        data,
        unresolved: refactorer.unresolved,
    })
}

pub struct Refactorer<'p> {
    program: &'p Program,
    cx: &'p Context,
    correspondence: &'p Correspondence,
    source: Path,
    target: Path,
    unresolved: Vec<Path>,
    active: HashSet<(DefId, NodeId, *const Value)>,
}

impl<'p> Refactorer<'p> {
    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn correspondence(&self) -> &'p Correspondence {
        self.correspondence
    }

    /// Path in the old data.
    pub fn source_path(&self) -> &Path {
        &self.source
    }

    /// Path in the rebuilt data.
    pub fn target_path(&self) -> &Path {
        &self.target
    }

    pub fn unresolved_source(&mut self) {
        self.unresolved.push(self.source.clone());
    }

    pub fn unresolved_source_at(&mut self, segment: impl Into<PathSegment>) {
        self.unresolved.push(self.source.join(segment));
    }

    pub fn unresolved_target_at(&mut self, segment: impl Into<PathSegment>) {
        self.unresolved.push(self.target.join(segment));
    }

    /// Copies `data` unchanged if it already fits `target`, otherwise keeps it
    /// and marks the source path unresolved.
    pub fn carry(&mut self, data: &Value, target: NodeId) -> Result<Value, OperationError> {
        if !self.fits(target, data)? {
            self.unresolved_source();
        }
        Ok(data.clone())
    }

    /// True when `node` accepts `data` at the current target path.
    pub fn fits(&mut self, node: NodeId, data: &Value) -> Result<bool, OperationError> {
        let mut validator = Validator::new(self.program, self.cx, self.target.clone());
        validator.visit(node, data)?;
        Ok(validator.finish().is_valid())
    }

    /// True when the old shape `node` accepts `data` at the current source path.
    pub fn matches_source(&mut self, node: NodeId, data: &Value) -> Result<bool, OperationError> {
        let mut validator = Validator::new(self.program, self.cx, self.source.clone());
        validator.visit(node, data)?;
        Ok(validator.finish().is_valid())
    }

    /// Refactors a child value; the old and new segments differ for renamed fields.
    pub fn descend(
        &mut self,
        from: impl Into<PathSegment>,
        to: impl Into<PathSegment>,
        old: NodeId,
        new: NodeId,
        data: &Value,
    ) -> Result<Value, OperationError> {
        self.source.push(from);
        self.target.push(to);
        let result = self.visit(old, new, data);
        self.source.pop();
        self.target.pop();
        result
    }

    pub fn visit(&mut self, old: NodeId, new: NodeId, data: &Value) -> Result<Value, OperationError> {
        self.cx.checkpoint()?;
        let new = self.settle_target(new, data);
        let program = self.program;
        match program.node(old) {
            Node::Literal { .. } => self.carry(data, new),
            Node::Tuple { items } => list::refactor_tuple(items, data, new, self),
            Node::Record { fields } => object::refactor_record(fields, data, new, self),
            Node::Call { function, args } => program.function(function)?.refactor(args, data, new, self),
            Node::Reference { target } => self.visit_definition(*target, new, data),
        }
    }

    /// Looks through wrappers such as `optional` on the new side when the
    /// data is present, so the wrapped structure lines up with the old one.
    fn settle_target(&self, mut new: NodeId, data: &Value) -> NodeId {
        if data.is_null() {
            return new;
        }
        let mut seen = HashSet::new();
        while let Structure::Wrapper(inner) = self.program.structure(new) {
            if !seen.insert(new) {
                break;
            }
            new = inner;
        }
        new
    }

    fn visit_definition(&mut self, def: DefId, new: NodeId, data: &Value) -> Result<Value, OperationError> {
        let program = self.program;
        let key = (def, new, data as *const Value);
        if !self.active.insert(key) {
            tracing::trace!(
                shape = %program.definition(def).name,
                path = %self.source,
                "recursion guard hit"
            );
            return self.carry(data, new);
        }
        let result = self.visit(program.definition(def).body, new, data);
        self.active.remove(&key);
        result
    }
}

impl Program {
    /// A copy of this program with one more definition, `new`, derived from
    /// `old` by applying the field table to its record keys.
    ///
    /// References inside the copied body are kept; a reference back to `old`
    /// itself is pointed at `new`, so a recursive shape stays recursive. A
    /// rename that lands on a field the record already declares is an error.
    pub fn refactor_shape(
        &self,
        old: &str,
        new: &str,
        correspondence: &Correspondence,
    ) -> Result<Program, OperationError> {
        let old_def = self.shape(old)?;
        if !is_shape_name(new) {
            return Err(OperationError::InvalidShapeName(new.to_string()));
        }
        if self.lookup(new).is_some() {
            return Err(OperationError::ShapeExists(new.to_string()));
        }

        let mut program = self.clone();
        let new_def = DefId(program.definitions.len());
        let source = self.definition(old_def);
        let body = ShapeCopier {
            from: self,
            into: &mut program,
            old_def,
            new_def,
            new_name: new,
            correspondence,
        }
        .copy(source.body)?;
        program.definitions.push(DefinitionEntry {
            name: new.to_string(),
            position: source.position,
            body,
        });
        program.by_name.insert(new.to_string(), new_def);

        tracing::debug!(
            old,
            new,
            nodes = program.nodes.len() - self.nodes.len(),
            "derived shape"
        );
        Ok(program)
    }
}

/// A name a document could have declared itself.
fn is_shape_name(name: &str) -> bool {
    let mut chars = name.chars();
    let identifier = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    identifier && !matches!(name, "true" | "false" | "null") && !is_reserved(name)
}

struct ShapeCopier<'a> {
    from: &'a Program,
    into: &'a mut Program,
    old_def: DefId,
    new_def: DefId,
    new_name: &'a str,
    correspondence: &'a Correspondence,
}

impl ShapeCopier<'_> {
    fn copy(&mut self, id: NodeId) -> Result<NodeId, OperationError> {
        let from = self.from;
        let node = match from.node(id) {
            Node::Literal { value } => Node::Literal {
                value: value.clone(),
            },
            Node::Tuple { items } => Node::Tuple {
                items: self.copy_all(items)?,
            },
            Node::Record { fields } => Node::Record {
                fields: self.copy_fields(fields, true)?,
            },
            // option names of a named choice are labels, not data fields
            Node::Call { function, args } if function == choice::ONE_OF_NAMED => {
                let mut copied = Vec::with_capacity(args.len());
                for &arg in args {
                    copied.push(match from.node(arg) {
                        Node::Record { fields } => {
                            let fields = self.copy_fields(fields, false)?;
                            self.push(Node::Record { fields }, from.position(arg))
                        }
                        _ => self.copy(arg)?,
                    });
                }
                Node::Call {
                    function: function.clone(),
                    args: copied,
                }
            }
            Node::Call { function, args } => Node::Call {
                function: function.clone(),
                args: self.copy_all(args)?,
            },
            Node::Reference { target } if *target == self.old_def => Node::Reference {
                target: self.new_def,
            },
            Node::Reference { target } => Node::Reference { target: *target },
        };
        Ok(self.push(node, from.position(id)))
    }

    fn copy_all(&mut self, ids: &[NodeId]) -> Result<Vec<NodeId>, OperationError> {
        ids.iter().map(|&id| self.copy(id)).collect()
    }

    fn copy_fields(
        &mut self,
        fields: &[(String, NodeId)],
        rename: bool,
    ) -> Result<Vec<(String, NodeId)>, OperationError> {
        let correspondence = self.correspondence;
        let mut copied: Vec<(String, NodeId)> = Vec::with_capacity(fields.len());
        for (key, field) in fields {
            let key = if rename {
                match correspondence.target_of(key) {
                    Some(key) => key,
                    None => continue,
                }
            } else {
                key.as_str()
            };
            if copied.iter().any(|(k, _)| k == key) {
                return Err(OperationError::DuplicateField {
                    shape: self.new_name.to_string(),
                    field: key.to_string(),
                });
            }
            copied.push((key.to_string(), self.copy(*field)?));
        }
        Ok(copied)
    }

    fn push(&mut self, node: Node, position: Position) -> NodeId {
        self.into.nodes.push(node);
        self.into.positions.push(position);
        NodeId(self.into.nodes.len() - 1)
    }
}
