//! The resolved shape graph.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. A
//! reference to a definition is a [`DefId`] handle into the definition
//! table, never an inline copy, so a recursive shape such as
//! `node = object({"next": optional(node)})` is a finite graph with a back
//! edge rather than an infinite tree.

use crate::registry::{Absence, Registry, ShapeFunction};
use crate::OperationError;
use rhizome_jsonshapes_ir::Position;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DefId(pub(crate) usize);

impl DefId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One node of the shape graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    /// A JSON scalar that matches only itself
    Literal { value: Value },
    /// An array literal: a fixed-length, positional shape
    Tuple { items: Vec<NodeId> },
    /// An object literal: a record of declared fields
    Record { fields: Vec<(String, NodeId)> },
    /// A shape-function call
    Call { function: String, args: Vec<NodeId> },
    /// A handle to a named definition
    Reference { target: DefId },
}

/// How a shape decomposes its data. Used to line up an old and a new shape
/// when refactoring, and to mark required fields in widget trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Structure {
    /// No visible sub-structure
    Opaque,
    /// Named fields, in declaration order
    Record(Vec<(String, NodeId)>),
    /// Homogeneous elements
    Sequence(NodeId),
    /// Homogeneous values under validated keys
    Map { key: NodeId, value: NodeId },
    /// Same structure as the wrapped shape (e.g. `optional`)
    Wrapper(NodeId),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefinitionEntry {
    pub name: String,
    pub position: Position,
    pub body: NodeId,
}

/// A fully linked set of definitions.
///
/// Operations borrow a program read-only. Programs compare equal when their
/// graphs are structurally identical, whatever registry they hold.
#[derive(Clone)]
pub struct Program {
    pub(crate) nodes: Vec<Node>,
    pub(crate) positions: Vec<Position>,
    pub(crate) definitions: Vec<DefinitionEntry>,
    pub(crate) by_name: HashMap<String, DefId>,
    pub(crate) expressions: Vec<NodeId>,
    pub(crate) registry: Arc<Registry>,
}

impl PartialEq for Program {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
            && self.definitions == other.definitions
            && self.expressions == other.expressions
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("definitions", &self.definitions)
            .field("nodes", &self.nodes)
            .field("expressions", &self.expressions)
            .finish()
    }
}

impl Program {
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn position(&self, id: NodeId) -> Position {
        self.positions[id.0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn definition(&self, id: DefId) -> &DefinitionEntry {
        &self.definitions[id.0]
    }

    /// Definitions in source order.
    pub fn definitions(&self) -> impl Iterator<Item = (DefId, &DefinitionEntry)> {
        self.definitions
            .iter()
            .enumerate()
            .map(|(i, def)| (DefId(i), def))
    }

    pub fn lookup(&self, name: &str) -> Option<DefId> {
        self.by_name.get(name).copied()
    }

    /// The root node of the named definition.
    pub fn shape(&self, name: &str) -> Result<DefId, OperationError> {
        self.lookup(name)
            .ok_or_else(|| OperationError::UnknownShape(name.to_string()))
    }

    /// Roots of the bare expression statements, in source order.
    pub fn expressions(&self) -> &[NodeId] {
        &self.expressions
    }

    pub fn function(&self, name: &str) -> Result<&dyn ShapeFunction, OperationError> {
        self.registry
            .get(name)
            .ok_or_else(|| OperationError::UnknownFunction(name.to_string()))
    }

    /// Follows references until a non-reference node.
    ///
    /// Terminates because pure reference cycles are rejected at resolve time.
    pub fn deref(&self, mut id: NodeId) -> NodeId {
        while let Node::Reference { target } = self.node(id) {
            id = self.definition(*target).body;
        }
        id
    }

    /// The kind name used in render and widget trees.
    pub fn kind(&self, id: NodeId) -> &str {
        match self.node(self.deref(id)) {
            Node::Literal { .. } => "literal",
            Node::Tuple { .. } => "tuple",
            Node::Record { .. } => "record",
            Node::Call { function, .. } => function,
            Node::Reference { .. } => "reference",
        }
    }

    /// The literal JSON value of a node, if it contains no calls or references.
    pub fn literal_value(&self, id: NodeId) -> Option<Value> {
        match self.node(id) {
            Node::Literal { value } => Some(value.clone()),
            Node::Tuple { items } => items
                .iter()
                .map(|&item| self.literal_value(item))
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            Node::Record { fields } => {
                let mut map = serde_json::Map::new();
                for (key, value) in fields {
                    map.insert(key.clone(), self.literal_value(*value)?);
                }
                Some(Value::Object(map))
            }
            Node::Call { .. } | Node::Reference { .. } => None,
        }
    }

    /// Whether a missing object field satisfies this shape.
    pub fn accepts_absent(&self, id: NodeId) -> bool {
        self.accepts_absent_inner(id, &mut HashSet::new())
    }

    fn accepts_absent_inner(&self, id: NodeId, seen: &mut HashSet<NodeId>) -> bool {
        let id = self.deref(id);
        if !seen.insert(id) {
            return false;
        }
        let absence = match self.node(id) {
            Node::Call { function, args } => match self.registry.get(function) {
                Some(f) => f.absence(args, self),
                None => Absence::Required,
            },
            _ => Absence::Required,
        };
        let result = match absence {
            Absence::Required => false,
            Absence::Allowed => true,
            Absence::AnyOf(options) => options
                .into_iter()
                .any(|option| self.accepts_absent_inner(option, seen)),
            Absence::AllOf(parts) => parts
                .into_iter()
                .all(|part| self.accepts_absent_inner(part, seen)),
        };
        seen.remove(&id);
        result
    }

    /// The decomposition of a shape, looking through references.
    pub fn structure(&self, id: NodeId) -> Structure {
        match self.node(self.deref(id)) {
            Node::Record { fields } => Structure::Record(fields.clone()),
            Node::Call { function, args } => match self.registry.get(function) {
                Some(f) => f.structure(args, self),
                None => Structure::Opaque,
            },
            Node::Literal { .. } | Node::Tuple { .. } | Node::Reference { .. } => {
                Structure::Opaque
            }
        }
    }

    /// Like [`structure`](Self::structure) but also looks through wrappers.
    pub fn unwrapped_structure(&self, id: NodeId) -> Structure {
        let mut seen = HashSet::new();
        let mut current = id;
        loop {
            match self.structure(current) {
                Structure::Wrapper(inner) => {
                    if !seen.insert(current) {
                        return Structure::Opaque;
                    }
                    current = inner;
                }
                other => return other,
            }
        }
    }

    /// Declared record fields of a shape (through references and wrappers).
    pub fn record_fields(&self, id: NodeId) -> Option<Vec<(String, NodeId)>> {
        match self.unwrapped_structure(id) {
            Structure::Record(fields) => Some(fields),
            _ => None,
        }
    }
}
