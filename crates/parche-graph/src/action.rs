//! The serializable action vocabulary and inverse records.
//!
//! Every edit the system can make is one [`Action`] variant; the enum is the
//! wire format between the UI and the editing context. Applying a graph
//! action yields an [`InverseRecord`], the exact data needed to restore the
//! prior state; inverse records are what the undo and redo stacks hold.
//!
//! Dispatch is an exhaustive `match`; adding a variant breaks the build
//! everywhere it must be handled.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::node::{Connection, Module, ModuleId, Node, NodeId};

/// One user-intent edit to the graph or transport state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Instantiate a node of a registered, non-internal type.
    CreateNode {
        /// Registry type name.
        node_type: String,
        /// Initial parameter values; unnamed parameters take type defaults.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        init_params: Option<BTreeMap<String, f32>>,
        /// The id assigned on first application. `None` allocates the next
        /// id; replaying a recorded id reproduces the original node exactly.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node_id: Option<NodeId>,
    },
    /// Remove a node and every connection incident to it.
    DeleteNode {
        /// Node to remove.
        id: NodeId,
    },
    /// Connect an output port to an input port, replacing whatever the input
    /// was previously fed by.
    Connect {
        /// Source node.
        src_id: NodeId,
        /// Output port on the source node.
        src_port: String,
        /// Destination node.
        dst_id: NodeId,
        /// Input port on the destination node.
        dst_port: String,
    },
    /// Remove an existing connection.
    Disconnect {
        /// Source node.
        src_id: NodeId,
        /// Output port on the source node.
        src_port: String,
        /// Destination node.
        dst_id: NodeId,
        /// Input port on the destination node.
        dst_port: String,
    },
    /// Move a node on the editor canvas.
    MoveNode {
        /// Node to move.
        id: NodeId,
        /// New canvas position.
        x: f32,
        /// New canvas position.
        y: f32,
    },
    /// Group nodes into a new module.
    CreateModule {
        /// Member nodes; none may already belong to a module.
        node_ids: BTreeSet<NodeId>,
    },
    /// Dissolve a module, leaving members and connections untouched.
    SplitModule {
        /// Module to dissolve.
        module_id: ModuleId,
    },
    /// Snapshot nodes (and the connections among them) to the clipboard.
    Copy {
        /// Nodes to snapshot.
        node_ids: BTreeSet<NodeId>,
    },
    /// Re-instantiate the clipboard with fresh ids, offset so the group's
    /// bounding-box origin lands at the given point.
    Paste {
        /// Target bounding-box origin.
        min_x: f32,
        /// Target bounding-box origin.
        min_y: f32,
    },
    /// Start the transport clock.
    Play,
    /// Stop the transport clock, leaving node internal state untouched.
    Stop,
    /// Set the playback position in seconds. Valid in either transport state.
    SetPlayPos {
        /// Position in seconds.
        time: f64,
    },
    /// Undo the most recent recorded action.
    Undo,
    /// Re-apply the most recently undone action.
    Redo,
    /// Rename a node.
    SetName {
        /// Node to rename.
        id: NodeId,
        /// New display name.
        name: String,
    },
    /// Set a parameter. `None` resets to the type's declared default.
    SetParam {
        /// Node whose parameter changes.
        id: NodeId,
        /// Declared parameter name.
        param: String,
        /// New value, or `None` for the default.
        value: Option<f32>,
    },
    /// Visualization samples for one node (editing-visible only; the engine
    /// emits the same payload as feedback).
    SendAudioData {
        /// Node the samples belong to.
        id: NodeId,
        /// Waveform samples.
        samples: Vec<f32>,
    },
}

/// The data needed to undo one previously applied action.
///
/// Applying an inverse record through
/// [`PatchGraph::apply_inverse`](crate::PatchGraph::apply_inverse) restores
/// the prior state bit-for-bit and returns the record's own inverse, which is
/// what makes redo exact: ids, names, positions, and parameter values all
/// come from the record, never from live counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InverseRecord {
    /// Nothing to restore. Produced by actions that did not touch graph
    /// state; never worth recording.
    Noop,
    /// Remove a node (and its incident connections). Undoes a creation.
    RemoveNode {
        /// Node to remove.
        id: NodeId,
    },
    /// Re-insert a removed node with its exact prior state. Undoes a
    /// deletion.
    RestoreNode {
        /// The node as it was at removal.
        node: Node,
        /// Connections that were incident to it at removal.
        connections: Vec<Connection>,
        /// Module it belonged to, if any.
        module: Option<ModuleId>,
    },
    /// Re-insert a removed connection. Undoes a disconnect.
    AddConnection {
        /// The connection as it was.
        connection: Connection,
    },
    /// Remove a connection. Undoes a connect.
    RemoveConnection {
        /// The connection to remove.
        connection: Connection,
    },
    /// Restore a node's prior position.
    MoveNode {
        /// Node to move back.
        id: NodeId,
        /// Prior canvas position.
        x: f32,
        /// Prior canvas position.
        y: f32,
    },
    /// Remove a module record. Undoes a grouping.
    RemoveModule {
        /// Module to remove.
        id: ModuleId,
    },
    /// Re-insert a dissolved module. Undoes a split.
    RestoreModule {
        /// The module as it was.
        module: Module,
    },
    /// Restore a node's prior display name.
    SetName {
        /// Node to rename back.
        id: NodeId,
        /// Prior name.
        name: String,
    },
    /// Restore a parameter's prior value.
    SetParam {
        /// Node whose parameter is restored.
        id: NodeId,
        /// Parameter name.
        param: String,
        /// Prior value.
        value: f32,
    },
    /// A sequence applied in order as a single undo step. Paste undoes
    /// through one of these; connect-with-replacement uses a two-element one.
    Batch {
        /// Child records, applied first to last.
        records: Vec<InverseRecord>,
    },
}

impl InverseRecord {
    /// Whether applying this record changes what the compiler would emit.
    ///
    /// Position, name, grouping, and parameter restorations are not
    /// structural: the first three are editor-only state, and parameter
    /// values replay through the engine's live table (see
    /// [`param_changes`](Self::param_changes)) without a recompile.
    pub fn is_structural(&self) -> bool {
        match self {
            InverseRecord::Noop
            | InverseRecord::MoveNode { .. }
            | InverseRecord::RemoveModule { .. }
            | InverseRecord::RestoreModule { .. }
            | InverseRecord::SetName { .. }
            | InverseRecord::SetParam { .. } => false,
            InverseRecord::RemoveNode { .. }
            | InverseRecord::RestoreNode { .. }
            | InverseRecord::AddConnection { .. }
            | InverseRecord::RemoveConnection { .. } => true,
            InverseRecord::Batch { records } => records.iter().any(InverseRecord::is_structural),
        }
    }

    /// Collects the parameter values this record makes live when applied,
    /// so a non-structural undo/redo can be forwarded to the engine without
    /// recompiling.
    pub fn param_changes(&self, out: &mut Vec<(NodeId, String, f32)>) {
        match self {
            InverseRecord::SetParam { id, param, value } => {
                out.push((*id, param.clone(), *value));
            }
            InverseRecord::Batch { records } => {
                for record in records {
                    record.param_changes(out);
                }
            }
            _ => {}
        }
    }
}
