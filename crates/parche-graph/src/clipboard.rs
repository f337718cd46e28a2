//! Clipboard for subgraph copy/paste.
//!
//! Copy snapshots the selected nodes and the connections running *between*
//! them; edges to the outside are dropped. The snapshot owns its data, so it
//! outlives any later edits to the source nodes, including their deletion.
//! Paste stamps the snapshot back in under fresh ids, offset so the pasted
//! group's bounding-box corner lands where the caller asked, and yields one
//! batch record so the whole paste unwinds as a single undo step.

use std::collections::{BTreeMap, BTreeSet};

use crate::action::InverseRecord;
use crate::error::ValidationError;
use crate::model::PatchGraph;
use crate::node::{Connection, Node, NodeId};

/// An owned snapshot of a subgraph.
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    /// Snapshot nodes, ascending by original id.
    nodes: Vec<Node>,
    /// Connections with both endpoints in `nodes`.
    connections: Vec<Connection>,
}

/// What a successful paste produced.
#[derive(Debug)]
pub struct Pasted {
    /// Single record that removes everything the paste added.
    pub record: InverseRecord,
    /// Ids of the pasted nodes, in snapshot order.
    pub nodes: Vec<NodeId>,
}

impl Clipboard {
    /// An empty clipboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when there is nothing to paste.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes in the snapshot.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Drop the snapshot.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.connections.clear();
    }

    /// Replace the snapshot with a copy of `ids` out of `graph`.
    ///
    /// Every id must resolve; on error the previous snapshot is kept.
    /// Module membership is deliberately not captured: a pasted group is
    /// plain ungrouped nodes.
    pub fn copy(
        &mut self,
        graph: &PatchGraph,
        ids: &BTreeSet<NodeId>,
    ) -> Result<(), ValidationError> {
        let mut nodes = Vec::with_capacity(ids.len());
        for &id in ids {
            let node = graph
                .node(id)
                .ok_or_else(|| ValidationError::node_not_found(id))?;
            nodes.push(node.clone());
        }
        let connections = graph
            .connections()
            .filter(|c| ids.contains(&c.src) && ids.contains(&c.dst))
            .cloned()
            .collect();
        self.nodes = nodes;
        self.connections = connections;
        tracing::debug!(
            "clipboard_copy: {} nodes, {} connections",
            self.nodes.len(),
            self.connections.len()
        );
        Ok(())
    }

    /// Paste the snapshot into `graph` with the group's minimum x/y moved to
    /// (`min_x`, `min_y`).
    ///
    /// Returns `None` when the clipboard is empty. The snapshot itself is
    /// untouched, so pasting twice yields two independent copies.
    pub fn paste(
        &self,
        graph: &mut PatchGraph,
        min_x: f32,
        min_y: f32,
    ) -> Result<Option<Pasted>, ValidationError> {
        if self.nodes.is_empty() {
            return Ok(None);
        }
        let src_min_x = self.nodes.iter().map(|n| n.x).fold(f32::INFINITY, f32::min);
        let src_min_y = self.nodes.iter().map(|n| n.y).fold(f32::INFINITY, f32::min);
        let dx = min_x - src_min_x;
        let dy = min_y - src_min_y;

        let mut remap = BTreeMap::new();
        let mut records = Vec::with_capacity(self.nodes.len() + self.connections.len());
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for snapshot in &self.nodes {
            let mut node = snapshot.clone();
            node.id = graph.alloc_node_id();
            node.x += dx;
            node.y += dy;
            remap.insert(snapshot.id, node.id);
            nodes.push(node.id);
            records.push(InverseRecord::RestoreNode {
                node,
                connections: Vec::new(),
                module: None,
            });
        }
        for c in &self.connections {
            records.push(InverseRecord::AddConnection {
                connection: Connection {
                    src: remap[&c.src],
                    src_port: c.src_port.clone(),
                    dst: remap[&c.dst],
                    dst_port: c.dst_port.clone(),
                },
            });
        }

        // Stamping in nodes then edges is itself a batch replay, and the
        // record it hands back removes everything again in reverse order.
        let record = graph.apply_inverse(&InverseRecord::Batch { records })?;
        tracing::debug!("clipboard_paste: {} nodes at ({min_x}, {min_y})", nodes.len());
        Ok(Some(Pasted { record, nodes }))
    }
}
