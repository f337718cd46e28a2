//! Graph entities: nodes, connections, and modules.
//!
//! Ids are allocated from monotonic counters owned by
//! [`PatchGraph`](crate::PatchGraph) and are never reused within a session,
//! so a deleted node's id stays dead and undo can restore the exact id it
//! recorded.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a node. Monotonically assigned, never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a module. Monotonically assigned, never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ModuleId(pub u64);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One node instance in the patch graph.
///
/// The shape (ports, declared parameters) lives in the registry under
/// `type_name`; the node itself carries only per-instance state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable identity of this node.
    pub id: NodeId,
    /// Registry type this node instantiates.
    pub type_name: String,
    /// User-visible display name.
    pub name: String,
    /// Editor canvas position.
    pub x: f32,
    /// Editor canvas position.
    pub y: f32,
    /// Current value of every parameter declared by the type.
    pub params: BTreeMap<String, f32>,
}

/// A directed edge from one node's output port to another node's input port.
///
/// An input port accepts at most one connection; an output port may feed any
/// number of them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// Source node.
    pub src: NodeId,
    /// Output port on the source node.
    pub src_port: String,
    /// Destination node.
    pub dst: NodeId,
    /// Input port on the destination node.
    pub dst_port: String,
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} → {}.{}",
            self.src, self.src_port, self.dst, self.dst_port
        )
    }
}

/// Side of a node a port sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDirection {
    /// Signal flows into the node.
    Input,
    /// Signal flows out of the node.
    Output,
}

/// A member-node port exposed at a module's boundary because a connection
/// crosses it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BoundaryPort {
    /// Member node the port belongs to.
    pub node: NodeId,
    /// Port name on that node.
    pub port: String,
    /// Whether the crossing connection enters or leaves the module.
    pub direction: PortDirection,
}

/// A named grouping of nodes.
///
/// Grouping is bookkeeping for the editor; the compiler sees through it
/// completely. Boundary ports are derived from the live connection set (see
/// [`PatchGraph::module_boundary`](crate::PatchGraph::module_boundary)) so
/// they stay consistent under later edits without any stored state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Stable identity of this module.
    pub id: ModuleId,
    /// Display name.
    pub name: String,
    /// Ids of member nodes. A node belongs to at most one module.
    pub members: BTreeSet<NodeId>,
}
