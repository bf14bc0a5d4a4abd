//! Declarative presentation trees.
//!
//! These carry no visual semantics. A caller (a web form, a terminal
//! renderer, a docs generator) walks the tree and decides how each `kind`
//! looks.

use crate::Path;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A shape-guided view of one data value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderNode {
    /// Shape function name, or `literal` / `tuple` / `record` for structural literals
    pub kind: String,
    /// Field name or element label within the parent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub path: Path,
    /// Scalar data at this node (containers carry their data in `children`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub annotations: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RenderNode>,
}

impl RenderNode {
    pub fn new(kind: impl Into<String>, path: Path) -> Self {
        Self {
            kind: kind.into(),
            label: None,
            path,
            value: None,
            annotations: Map::new(),
            children: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn annotate(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.annotations.insert(key.to_string(), value.into());
        self
    }

    /// Finds the first descendant (or self) at `path`.
    pub fn find(&self, path: &Path) -> Option<&RenderNode> {
        if &self.path == path {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(path))
    }
}

/// A data-independent form description derived from a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetNode {
    /// Shape function name, or `literal` / `tuple` / `record` / `reference`
    pub kind: String,
    /// Suggested widget (e.g. `text`, `checkbox`, `repeater`)
    pub widget: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub props: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<WidgetNode>,
}

impl WidgetNode {
    pub fn new(kind: impl Into<String>, widget: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            widget: widget.into(),
            label: None,
            props: Map::new(),
            children: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn prop(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.props.insert(key.to_string(), value.into());
        self
    }

    pub fn with_children(mut self, children: Vec<WidgetNode>) -> Self {
        self.children = children;
        self
    }

    /// Total number of nodes in the tree.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(WidgetNode::size).sum::<usize>()
    }
}
