//! Error types for graph editing and compilation.
//!
//! [`ValidationError`] is the Graph Model's rejection surface: the action is
//! refused and graph state is untouched. [`CompileError`] comes out of the
//! schedule compiler; the previously installed schedule keeps running when it
//! does.

use thiserror::Error;

use crate::node::{Connection, ModuleId, NodeId};

/// An action was rejected by the Graph Model. State is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The requested node type is not in the registry, or is internal.
    #[error("unknown node type '{name}'")]
    UnknownType {
        /// The type name that failed to resolve.
        name: String,
    },

    /// A referenced node, module, or connection does not exist.
    #[error("{entity} not found")]
    NotFound {
        /// Description of the missing entity, e.g. `node 3`.
        entity: String,
    },

    /// A port reference does not match the node type's declaration.
    #[error("node {node} ({type_name}) has no {direction} port '{port}'")]
    PortMismatch {
        /// Node whose type was consulted.
        node: NodeId,
        /// That node's type name.
        type_name: String,
        /// The port name that failed to resolve.
        port: String,
        /// `"input"` or `"output"`.
        direction: &'static str,
    },

    /// A parameter name is not declared by the node's type.
    #[error("node {node} ({type_name}) has no parameter '{param}'")]
    UnknownParam {
        /// Node whose type was consulted.
        node: NodeId,
        /// That node's type name.
        type_name: String,
        /// The parameter name that failed to resolve.
        param: String,
    },

    /// A node already belongs to a module and cannot join another.
    #[error("node {node} already belongs to module {module}")]
    AlreadyGrouped {
        /// The node that is already grouped.
        node: NodeId,
        /// The module it belongs to.
        module: ModuleId,
    },
}

impl ValidationError {
    /// A node id failed to resolve.
    pub fn node_not_found(id: NodeId) -> Self {
        ValidationError::NotFound {
            entity: format!("node {id}"),
        }
    }

    /// A module id failed to resolve.
    pub fn module_not_found(id: ModuleId) -> Self {
        ValidationError::NotFound {
            entity: format!("module {id}"),
        }
    }

    /// A connection failed to resolve.
    pub fn connection_not_found(connection: &Connection) -> Self {
        ValidationError::NotFound {
            entity: format!("connection {connection}"),
        }
    }
}

/// The graph could not be compiled into a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The graph contains a feedback cycle with no delay node on it.
    ///
    /// Cycles are legal graph states; they only become schedulable once at
    /// least one edge of the loop passes through a delay node's split pair.
    #[error("feedback cycle with no delay node: [{}]", fmt_ids(nodes))]
    FeedbackCycle {
        /// The nodes on the cycle, ascending.
        nodes: Vec<NodeId>,
    },
}

fn fmt_ids(ids: &[NodeId]) -> String {
    let mut out = String::new();
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&id.to_string());
    }
    out
}
