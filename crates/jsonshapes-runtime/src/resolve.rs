//! Statements to a linked [`Program`].
//!
//! Resolution runs in passes:
//! 1. collect every definition name (duplicates are an error, never a
//!    silent overwrite)
//! 2. lower each body into the node arena, binding references to
//!    definition handles and checking calls against the registry
//! 3. reject pure alias cycles (`a = b; b = a;`)
//! 4. run each function's argument checks
//!
//! A cycle that passes through a call or a structural literal
//! (`tree = object({"children": list(tree)})`) is legitimate recursion.

use crate::program::{DefId, DefinitionEntry, Node, NodeId, Program};
use crate::registry::{Arity, Registry};
use rhizome_jsonshapes_ir::{Expr, ExprKind, Position, Statement};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("{second}: duplicate definition of '{name}' (first defined at {first})")]
    DuplicateDefinition {
        name: String,
        first: Position,
        second: Position,
    },

    #[error("{position}: unknown shape function '{name}'")]
    UnknownShapeFunction { name: String, position: Position },

    #[error("{position}: '{function}' takes {expected} argument(s), got {got}")]
    Arity {
        function: String,
        expected: Arity,
        got: usize,
        position: Position,
    },

    #[error("{position}: definitions form an alias cycle: {}", .cycle.join(" -> "))]
    CyclicDefinition { cycle: Vec<String>, position: Position },

    #[error("{position}: reference to undefined shape '{name}'")]
    UnresolvedReference { name: String, position: Position },

    #[error("{position}: invalid argument to '{function}': {reason}")]
    InvalidArgument {
        function: String,
        position: Position,
        reason: String,
    },
}

/// Resolve one document.
pub fn resolve(statements: &[Statement], registry: Arc<Registry>) -> Result<Program, ResolveError> {
    resolve_documents(&[statements], registry)
}

/// Resolve several documents into one program.
///
/// Documents share one namespace: a later document may refer to shapes
/// defined by an earlier one (and vice versa), but may not redefine them.
pub fn resolve_documents<D: AsRef<[Statement]>>(
    documents: &[D],
    registry: Arc<Registry>,
) -> Result<Program, ResolveError> {
    let mut resolver = Resolver {
        registry: &registry,
        names: HashMap::new(),
        nodes: Vec::new(),
        positions: Vec::new(),
    };

    // Pass 1: collect names
    let mut defs = Vec::new();
    for statement in documents.iter().flat_map(|d| d.as_ref()) {
        if let Statement::Definition(def) = statement {
            if let Some(&(_, first)) = resolver.names.get(&def.name) {
                return Err(ResolveError::DuplicateDefinition {
                    name: def.name.clone(),
                    first,
                    second: def.position,
                });
            }
            let id = DefId(defs.len());
            resolver.names.insert(def.name.clone(), (id, def.position));
            defs.push(def);
        }
    }

    // Pass 2: lower bodies in definition order, then bare expressions
    let mut definitions = Vec::with_capacity(defs.len());
    for def in defs {
        let body = resolver.lower(&def.body)?;
        definitions.push(DefinitionEntry {
            name: def.name.clone(),
            position: def.position,
            body,
        });
    }
    let mut expressions = Vec::new();
    for statement in documents.iter().flat_map(|d| d.as_ref()) {
        if let Statement::Expression(expr) = statement {
            expressions.push(resolver.lower(expr)?);
        }
    }

    let by_name = resolver
        .names
        .into_iter()
        .map(|(name, (id, _))| (name, id))
        .collect();
    let program = Program {
        nodes: resolver.nodes,
        positions: resolver.positions,
        definitions,
        by_name,
        expressions,
        registry: registry.clone(),
    };

    check_alias_cycles(&program)?;
    check_arguments(&program)?;

    tracing::debug!(
        definitions = program.definitions.len(),
        nodes = program.nodes.len(),
        expressions = program.expressions.len(),
        "resolved shape program"
    );
    Ok(program)
}

struct Resolver<'r> {
    registry: &'r Registry,
    names: HashMap<String, (DefId, Position)>,
    nodes: Vec<Node>,
    positions: Vec<Position>,
}

impl Resolver<'_> {
    fn push(&mut self, node: Node, position: Position) -> NodeId {
        self.nodes.push(node);
        self.positions.push(position);
        NodeId(self.nodes.len() - 1)
    }

    fn lower(&mut self, expr: &Expr) -> Result<NodeId, ResolveError> {
        let position = expr.position;
        let node = match &expr.kind {
            ExprKind::Literal { value } => Node::Literal {
                value: value.clone(),
            },
            ExprKind::Array { items } => Node::Tuple {
                items: items
                    .iter()
                    .map(|item| self.lower(item))
                    .collect::<Result<_, _>>()?,
            },
            ExprKind::Object { members } => {
                let mut fields = Vec::with_capacity(members.len());
                for (key, value) in members {
                    fields.push((key.clone(), self.lower(value)?));
                }
                Node::Record { fields }
            }
            ExprKind::Call { function, args } => {
                let Some(f) = self.registry.get(function) else {
                    return Err(ResolveError::UnknownShapeFunction {
                        name: function.clone(),
                        position,
                    });
                };
                let arity = f.arity();
                if !arity.contains(args.len()) {
                    return Err(ResolveError::Arity {
                        function: function.clone(),
                        expected: arity,
                        got: args.len(),
                        position,
                    });
                }
                Node::Call {
                    function: function.clone(),
                    args: args
                        .iter()
                        .map(|arg| self.lower(arg))
                        .collect::<Result<_, _>>()?,
                }
            }
            ExprKind::Reference { name } => match self.names.get(name) {
                Some(&(target, _)) => Node::Reference { target },
                None => {
                    return Err(ResolveError::UnresolvedReference {
                        name: name.clone(),
                        position,
                    });
                }
            },
        };
        Ok(self.push(node, position))
    }
}

/// Rejects definitions whose body is a chain of references leading back to
/// itself. Such a shape never reaches a structural boundary.
fn check_alias_cycles(program: &Program) -> Result<(), ResolveError> {
    let mut acyclic = vec![false; program.definitions.len()];
    for (start, _) in program.definitions() {
        let mut chain: Vec<DefId> = Vec::new();
        let mut current = start;
        loop {
            if acyclic[current.0] {
                break;
            }
            if let Some(at) = chain.iter().position(|&d| d == current) {
                let mut cycle: Vec<String> = chain[at..]
                    .iter()
                    .map(|&d| program.definition(d).name.clone())
                    .collect();
                cycle.push(program.definition(current).name.clone());
                return Err(ResolveError::CyclicDefinition {
                    cycle,
                    position: program.definition(current).position,
                });
            }
            chain.push(current);
            match program.node(program.definition(current).body) {
                Node::Reference { target } => current = *target,
                _ => break,
            }
        }
        for def in chain {
            acyclic[def.0] = true;
        }
    }
    Ok(())
}

fn check_arguments(program: &Program) -> Result<(), ResolveError> {
    for (index, node) in program.nodes.iter().enumerate() {
        if let Node::Call { function, args } = node {
            let Some(f) = program.registry.get(function) else {
                continue;
            };
            f.check_args(args, program)
                .map_err(|reason| ResolveError::InvalidArgument {
                    function: function.clone(),
                    position: program.positions[index],
                    reason,
                })?;
        }
    }
    Ok(())
}
