//! Expression tree nodes

use super::function::{Function, FunctionCatalog};
use crate::types::Value;
use serde::{Deserialize, Serialize};

/// Expression AST node
///
/// The set of node kinds is closed; evaluators match on it exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// Literal value
    Constant { value: Value },

    /// Call of a catalog function on evaluated children
    FunctionCall {
        function: Function,
        #[serde(default)]
        children: Vec<Node>,
    },

    /// Field of a stored record reached from the trigger object through links
    /// (e.g. `transactions → account → country`). An empty path reads the
    /// trigger object itself.
    DatabaseAccessor {
        table: String,
        field: String,
        #[serde(default)]
        path: Vec<String>,
    },

    /// Field of the trigger object
    PayloadAccessor { field: String },
}

impl Node {
    /// Create a constant node
    pub fn constant(value: impl Into<Value>) -> Self {
        Node::Constant {
            value: value.into(),
        }
    }

    /// Create a function call node
    pub fn call(function: Function, children: Vec<Node>) -> Self {
        Node::FunctionCall { function, children }
    }

    /// Create a payload accessor
    pub fn payload(field: impl Into<String>) -> Self {
        Node::PayloadAccessor {
            field: field.into(),
        }
    }

    /// Create a database accessor starting at `table` and following `path`
    pub fn database(table: impl Into<String>, path: Vec<String>, field: impl Into<String>) -> Self {
        Node::DatabaseAccessor {
            table: table.into(),
            field: field.into(),
            path,
        }
    }

    /// Direct children of this node
    pub fn children(&self) -> &[Node] {
        match self {
            Node::FunctionCall { children, .. } => children,
            _ => &[],
        }
    }

    /// Whether the subtree is a literal: a constant, or a call of a
    /// constant-marker function whose children are all literals
    pub fn is_literal(&self, catalog: &FunctionCatalog) -> bool {
        match self {
            Node::Constant { .. } => true,
            Node::FunctionCall { function, children } => {
                catalog
                    .get(*function)
                    .map(|attrs| attrs.is_constant_marker)
                    .unwrap_or(false)
                    && children.iter().all(|c| c.is_literal(catalog))
            }
            Node::DatabaseAccessor { .. } | Node::PayloadAccessor { .. } => false,
        }
    }

    /// Number of nodes in the subtree
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(Node::size).sum::<usize>()
    }
}
