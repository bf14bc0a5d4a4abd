//! Data-independent widget trees.
//!
//! Without data to consume, a recursive shape would expand forever, so a
//! definition met again while it is still being expanded becomes a
//! `reference` widget pointing back at it by name.

use crate::builtins::{list, object, scalar};
use crate::context::Context;
use crate::program::{DefId, Node, NodeId, Program};
use crate::OperationError;
use rhizome_jsonshapes_ir::WidgetNode;

pub fn ui_schema(program: &Program, shape: &str) -> Result<WidgetNode, OperationError> {
    ui_schema_with(program, shape, &Context::default())
}

pub fn ui_schema_with(program: &Program, shape: &str, cx: &Context) -> Result<WidgetNode, OperationError> {
    let def = program.shape(shape)?;
    tracing::debug!(shape, "generating widget tree");
    let mut generator = UiGenerator {
        program,
        cx,
        expanding: Vec::new(),
    };
    generator.visit_definition(def)
}

pub struct UiGenerator<'p> {
    program: &'p Program,
    cx: &'p Context,
    expanding: Vec<DefId>,
}

impl<'p> UiGenerator<'p> {
    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn context(&self) -> &'p Context {
        self.cx
    }

    /// Widgets for each node, in order.
    pub fn visit_all(&mut self, nodes: &[NodeId]) -> Result<Vec<WidgetNode>, OperationError> {
        nodes.iter().map(|&node| self.visit(node)).collect()
    }

    pub fn visit(&mut self, node: NodeId) -> Result<WidgetNode, OperationError> {
        self.cx.checkpoint()?;
        let program = self.program;
        match program.node(node) {
            Node::Literal { value } => Ok(scalar::ui_literal(value)),
            Node::Tuple { items } => list::ui_tuple(items, self),
            Node::Record { fields } => {
                object::ui_record("record", fields, self.cx.options.unknown_keys, self)
            }
            Node::Call { function, args } => program.function(function)?.ui(args, self),
            Node::Reference { target } => self.visit_definition(*target),
        }
    }

    fn visit_definition(&mut self, def: DefId) -> Result<WidgetNode, OperationError> {
        let program = self.program;
        let name = program.definition(def).name.as_str();
        if self.expanding.contains(&def) {
            return Ok(WidgetNode::new("reference", "reference").prop("target", name));
        }
        self.expanding.push(def);
        let result = self.visit(program.definition(def).body);
        self.expanding.pop();
        Ok(result?.prop("definition", name))
    }
}
