//! The patch graph and its transactional mutation surface.
//!
//! All mutation goes through [`PatchGraph::apply`], which validates the
//! action against the current state, performs it atomically, and returns an
//! [`InverseRecord`] that restores the prior state bit-for-bit when replayed
//! through [`PatchGraph::apply_inverse`]. A rejected action leaves the graph
//! untouched. That pair of guarantees is what makes unbounded undo/redo a
//! bookkeeping exercise instead of a snapshot store.
//!
//! # Identity
//!
//! Node and module ids are allocated from monotonic counters and never
//! reused, even across undo. Undoing a `CreateNode` removes the node but
//! does not roll the counter back; redo re-inserts the node under its
//! recorded id, so references held by action logs and remote peers stay
//! valid forever. Graph equality consequently compares nodes, connections,
//! and modules only, never the counters.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parche_registry::{NodeRegistry, NodeType};

use crate::action::{Action, InverseRecord};
use crate::error::ValidationError;
use crate::node::{BoundaryPort, Connection, Module, ModuleId, Node, NodeId, PortDirection};

/// The editable node graph: nodes, connections, and module groupings.
///
/// State is deliberately dumb. Every structural rule (ports must exist, an
/// input holds at most one connection, a node joins at most one module) is
/// enforced at the [`apply`](PatchGraph::apply) boundary, so any reachable
/// graph is a valid one.
#[derive(Debug, Clone)]
pub struct PatchGraph {
    registry: Arc<NodeRegistry>,
    nodes: BTreeMap<NodeId, Node>,
    connections: BTreeSet<Connection>,
    modules: BTreeMap<ModuleId, Module>,
    next_node_id: u64,
    next_module_id: u64,
}

/// Equality over observable state only. The id counters are excluded:
/// undoing a create leaves the counter advanced, and the graph should still
/// compare equal to its pre-create self.
impl PartialEq for PatchGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
            && self.connections == other.connections
            && self.modules == other.modules
    }
}

impl PatchGraph {
    /// An empty graph whose node types resolve against `registry`.
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        PatchGraph {
            registry,
            nodes: BTreeMap::new(),
            connections: BTreeSet::new(),
            modules: BTreeMap::new(),
            next_node_id: 0,
            next_module_id: 0,
        }
    }

    /// The registry node types resolve against.
    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Look up a node by id.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// All nodes, ascending by id.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All connections, in (src, src_port, dst, dst_port) order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    /// Number of connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// The connection feeding `dst_port` on `dst`, if any. At most one can
    /// exist; [`apply`](PatchGraph::apply) replaces rather than stacks.
    pub fn connection_to(&self, dst: NodeId, dst_port: &str) -> Option<&Connection> {
        self.connections
            .iter()
            .find(|c| c.dst == dst && c.dst_port == dst_port)
    }

    /// Look up a module by id.
    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(&id)
    }

    /// All modules, ascending by id.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    /// The module `id` belongs to, if any. Membership is exclusive.
    pub fn module_of(&self, id: NodeId) -> Option<ModuleId> {
        self.modules
            .values()
            .find(|m| m.members.contains(&id))
            .map(|m| m.id)
    }

    /// The boundary ports of a module: every member port with a connection
    /// to a non-member, deduplicated and sorted. Derived from the live
    /// connection set on each call, so later edits can never leave a stale
    /// boundary behind. `None` if the module does not exist.
    pub fn module_boundary(&self, id: ModuleId) -> Option<Vec<BoundaryPort>> {
        let module = self.modules.get(&id)?;
        let mut ports = BTreeSet::new();
        for c in &self.connections {
            let src_inside = module.members.contains(&c.src);
            let dst_inside = module.members.contains(&c.dst);
            if src_inside && !dst_inside {
                ports.insert(BoundaryPort {
                    node: c.src,
                    port: c.src_port.clone(),
                    direction: PortDirection::Output,
                });
            } else if dst_inside && !src_inside {
                ports.insert(BoundaryPort {
                    node: c.dst,
                    port: c.dst_port.clone(),
                    direction: PortDirection::Input,
                });
            }
        }
        Some(ports.into_iter().collect())
    }

    /// Allocate a fresh node id. Used by paste, which inserts prebuilt nodes
    /// instead of going through `CreateNode`.
    pub(crate) fn alloc_node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    /// Apply a graph action.
    ///
    /// On success the graph has changed and the returned record undoes it.
    /// On error the graph is exactly as it was. Actions with no graph-state
    /// meaning (transport, clipboard, history, visualization traffic) are
    /// accepted and return [`InverseRecord::Noop`]; routing them elsewhere
    /// is the editor's job.
    pub fn apply(&mut self, action: &Action) -> Result<InverseRecord, ValidationError> {
        match action {
            Action::CreateNode {
                node_type,
                init_params,
                node_id,
            } => self.create_node(node_type, init_params.as_ref(), *node_id),
            Action::DeleteNode { id } => self.delete_node(*id),
            Action::Connect {
                src_id,
                src_port,
                dst_id,
                dst_port,
            } => self.connect(*src_id, src_port, *dst_id, dst_port),
            Action::Disconnect {
                src_id,
                src_port,
                dst_id,
                dst_port,
            } => self.disconnect(*src_id, src_port, *dst_id, dst_port),
            Action::MoveNode { id, x, y } => self.move_node(*id, *x, *y),
            Action::CreateModule { node_ids } => self.create_module(node_ids),
            Action::SplitModule { module_id } => self.split_module(*module_id),
            Action::SetName { id, name } => self.set_name(*id, name),
            Action::SetParam { id, param, value } => self.set_param(*id, param, *value),
            Action::Copy { .. }
            | Action::Paste { .. }
            | Action::Play
            | Action::Stop
            | Action::SetPlayPos { .. }
            | Action::Undo
            | Action::Redo
            | Action::SendAudioData { .. } => Ok(InverseRecord::Noop),
        }
    }

    /// Replay an inverse record, returning the record that undoes *it*.
    ///
    /// Undo applies the record captured by [`apply`](PatchGraph::apply) and
    /// keeps the result for redo; redo applies that and gets the undo record
    /// back. The returned record is always structurally stable under further
    /// round trips.
    pub fn apply_inverse(
        &mut self,
        record: &InverseRecord,
    ) -> Result<InverseRecord, ValidationError> {
        match record {
            InverseRecord::Noop => Ok(InverseRecord::Noop),
            InverseRecord::RemoveNode { id } => self.delete_node(*id),
            InverseRecord::RestoreNode {
                node,
                connections,
                module,
            } => self.restore_node(node, connections, *module),
            InverseRecord::AddConnection { connection } => self.connect(
                connection.src,
                &connection.src_port,
                connection.dst,
                &connection.dst_port,
            ),
            InverseRecord::RemoveConnection { connection } => self.disconnect(
                connection.src,
                &connection.src_port,
                connection.dst,
                &connection.dst_port,
            ),
            InverseRecord::MoveNode { id, x, y } => self.move_node(*id, *x, *y),
            InverseRecord::RemoveModule { id } => self.split_module(*id),
            InverseRecord::RestoreModule { module } => self.restore_module(module),
            InverseRecord::SetName { id, name } => self.set_name(*id, name),
            InverseRecord::SetParam { id, param, value } => {
                self.set_param(*id, param, Some(*value))
            }
            InverseRecord::Batch { records } => self.apply_batch(records),
        }
    }

    fn lookup(&self, id: NodeId) -> Result<&Node, ValidationError> {
        self.nodes
            .get(&id)
            .ok_or_else(|| ValidationError::node_not_found(id))
    }

    fn type_of(&self, node: &Node) -> Result<&NodeType, ValidationError> {
        // A node's type was resolved when it was created and the registry is
        // immutable, so this only fails if a caller smuggled in a foreign
        // node. Surface it as the same error creation would have given.
        self.registry
            .get(&node.type_name)
            .ok_or_else(|| ValidationError::UnknownType {
                name: node.type_name.clone(),
            })
    }

    fn create_node(
        &mut self,
        type_name: &str,
        init_params: Option<&BTreeMap<String, f32>>,
        recorded_id: Option<NodeId>,
    ) -> Result<InverseRecord, ValidationError> {
        let ty = match self.registry.get(type_name) {
            // Internal types are compiler artifacts; users never instantiate
            // them directly.
            Some(ty) if !ty.internal => ty,
            _ => {
                return Err(ValidationError::UnknownType {
                    name: type_name.to_string(),
                });
            }
        };
        let id = match recorded_id {
            Some(id) if self.nodes.contains_key(&id) => {
                return Err(ValidationError::NotFound {
                    entity: format!("free node id {id}"),
                });
            }
            Some(id) => id,
            None => NodeId(self.next_node_id),
        };
        // Declared parameters all get a value up front; init overrides the
        // defaults and unknown init keys are ignored.
        let mut params = BTreeMap::new();
        for spec in ty.params {
            let value = init_params
                .and_then(|m| m.get(spec.name))
                .copied()
                .unwrap_or(spec.default);
            params.insert(spec.name.to_string(), value);
        }
        let node = Node {
            id,
            type_name: ty.name.to_string(),
            name: ty.label.to_string(),
            x: 0.0,
            y: 0.0,
            params,
        };
        // Replayed ids (redo, paste records) advance the counter past
        // themselves so fresh allocations can never collide.
        self.next_node_id = self.next_node_id.max(id.0 + 1);
        self.nodes.insert(id, node);
        tracing::debug!("graph_create: node {id} ({type_name})");
        Ok(InverseRecord::RemoveNode { id })
    }

    fn delete_node(&mut self, id: NodeId) -> Result<InverseRecord, ValidationError> {
        let Some(node) = self.nodes.remove(&id) else {
            return Err(ValidationError::node_not_found(id));
        };
        let incident: Vec<Connection> = self
            .connections
            .iter()
            .filter(|c| c.src == id || c.dst == id)
            .cloned()
            .collect();
        self.connections.retain(|c| c.src != id && c.dst != id);
        let module = self.module_of(id);
        if let Some(module_id) = module
            && let Some(m) = self.modules.get_mut(&module_id)
        {
            m.members.remove(&id);
        }
        tracing::debug!(
            "graph_delete: node {id} ({} incident connections)",
            incident.len()
        );
        Ok(InverseRecord::RestoreNode {
            node,
            connections: incident,
            module,
        })
    }

    fn restore_node(
        &mut self,
        node: &Node,
        connections: &[Connection],
        module: Option<ModuleId>,
    ) -> Result<InverseRecord, ValidationError> {
        if self.nodes.contains_key(&node.id) {
            return Err(ValidationError::NotFound {
                entity: format!("free node id {}", node.id),
            });
        }
        for c in connections {
            let other = if c.src == node.id { c.dst } else { c.src };
            if other != node.id && !self.nodes.contains_key(&other) {
                return Err(ValidationError::node_not_found(other));
            }
        }
        if let Some(module_id) = module
            && !self.modules.contains_key(&module_id)
        {
            return Err(ValidationError::module_not_found(module_id));
        }
        self.next_node_id = self.next_node_id.max(node.id.0 + 1);
        self.nodes.insert(node.id, node.clone());
        for c in connections {
            self.connections.insert(c.clone());
        }
        if let Some(module_id) = module
            && let Some(m) = self.modules.get_mut(&module_id)
        {
            m.members.insert(node.id);
        }
        Ok(InverseRecord::RemoveNode { id: node.id })
    }

    fn connect(
        &mut self,
        src: NodeId,
        src_port: &str,
        dst: NodeId,
        dst_port: &str,
    ) -> Result<InverseRecord, ValidationError> {
        {
            let src_node = self.lookup(src)?;
            let src_ty = self.type_of(src_node)?;
            if src_ty.output_index(src_port).is_none() {
                return Err(ValidationError::PortMismatch {
                    node: src,
                    type_name: src_node.type_name.clone(),
                    port: src_port.to_string(),
                    direction: "output",
                });
            }
            let dst_node = self.lookup(dst)?;
            let dst_ty = self.type_of(dst_node)?;
            if dst_ty.input_index(dst_port).is_none() {
                return Err(ValidationError::PortMismatch {
                    node: dst,
                    type_name: dst_node.type_name.clone(),
                    port: dst_port.to_string(),
                    direction: "input",
                });
            }
        }
        let connection = Connection {
            src,
            src_port: src_port.to_string(),
            dst,
            dst_port: dst_port.to_string(),
        };
        // An input port holds at most one connection. Connecting over an
        // occupied port replaces it, and the inverse puts the old one back.
        let replaced = self.connection_to(dst, dst_port).cloned();
        if let Some(old) = &replaced {
            self.connections.remove(old);
        }
        self.connections.insert(connection.clone());
        tracing::debug!("graph_connect: {connection}");
        let removed = InverseRecord::RemoveConnection { connection };
        Ok(match replaced {
            Some(old) => InverseRecord::Batch {
                records: vec![removed, InverseRecord::AddConnection { connection: old }],
            },
            None => removed,
        })
    }

    fn disconnect(
        &mut self,
        src: NodeId,
        src_port: &str,
        dst: NodeId,
        dst_port: &str,
    ) -> Result<InverseRecord, ValidationError> {
        let connection = Connection {
            src,
            src_port: src_port.to_string(),
            dst,
            dst_port: dst_port.to_string(),
        };
        if !self.connections.remove(&connection) {
            return Err(ValidationError::connection_not_found(&connection));
        }
        tracing::debug!("graph_disconnect: {connection}");
        Ok(InverseRecord::AddConnection { connection })
    }

    fn move_node(&mut self, id: NodeId, x: f32, y: f32) -> Result<InverseRecord, ValidationError> {
        let Some(node) = self.nodes.get_mut(&id) else {
            return Err(ValidationError::node_not_found(id));
        };
        let record = InverseRecord::MoveNode {
            id,
            x: node.x,
            y: node.y,
        };
        node.x = x;
        node.y = y;
        Ok(record)
    }

    fn set_name(&mut self, id: NodeId, name: &str) -> Result<InverseRecord, ValidationError> {
        let Some(node) = self.nodes.get_mut(&id) else {
            return Err(ValidationError::node_not_found(id));
        };
        let previous = std::mem::replace(&mut node.name, name.to_string());
        Ok(InverseRecord::SetName { id, name: previous })
    }

    fn set_param(
        &mut self,
        id: NodeId,
        param: &str,
        value: Option<f32>,
    ) -> Result<InverseRecord, ValidationError> {
        let default = {
            let node = self.lookup(id)?;
            let ty = self.type_of(node)?;
            let Some(spec) = ty.param(param) else {
                return Err(ValidationError::UnknownParam {
                    node: id,
                    type_name: node.type_name.clone(),
                    param: param.to_string(),
                });
            };
            spec.default
        };
        // `None` means reset to the declared default.
        let next = value.unwrap_or(default);
        let Some(node) = self.nodes.get_mut(&id) else {
            return Err(ValidationError::node_not_found(id));
        };
        let previous = node.params.insert(param.to_string(), next).unwrap_or(default);
        tracing::debug!("graph_set_param: {id}.{param} = {next}");
        Ok(InverseRecord::SetParam {
            id,
            param: param.to_string(),
            value: previous,
        })
    }

    fn create_module(
        &mut self,
        node_ids: &BTreeSet<NodeId>,
    ) -> Result<InverseRecord, ValidationError> {
        for &id in node_ids {
            if !self.nodes.contains_key(&id) {
                return Err(ValidationError::node_not_found(id));
            }
            if let Some(module) = self.module_of(id) {
                return Err(ValidationError::AlreadyGrouped { node: id, module });
            }
        }
        let id = ModuleId(self.next_module_id);
        self.next_module_id += 1;
        let module = Module {
            id,
            name: format!("module-{id}"),
            members: node_ids.clone(),
        };
        self.modules.insert(id, module);
        tracing::debug!("graph_group: module {id} ({} members)", node_ids.len());
        Ok(InverseRecord::RemoveModule { id })
    }

    fn split_module(&mut self, id: ModuleId) -> Result<InverseRecord, ValidationError> {
        let Some(module) = self.modules.remove(&id) else {
            return Err(ValidationError::module_not_found(id));
        };
        tracing::debug!("graph_split: module {id}");
        Ok(InverseRecord::RestoreModule { module })
    }

    fn restore_module(&mut self, module: &Module) -> Result<InverseRecord, ValidationError> {
        if self.modules.contains_key(&module.id) {
            return Err(ValidationError::NotFound {
                entity: format!("free module id {}", module.id),
            });
        }
        for &id in &module.members {
            if !self.nodes.contains_key(&id) {
                return Err(ValidationError::node_not_found(id));
            }
            if let Some(other) = self.module_of(id) {
                return Err(ValidationError::AlreadyGrouped {
                    node: id,
                    module: other,
                });
            }
        }
        self.next_module_id = self.next_module_id.max(module.id.0 + 1);
        self.modules.insert(module.id, module.clone());
        Ok(InverseRecord::RemoveModule { id: module.id })
    }

    /// Apply batch children in order; the inverse of a sequence is the
    /// reversed sequence of inverses. A failing child rolls the earlier ones
    /// back so the batch stays all-or-nothing.
    fn apply_batch(
        &mut self,
        records: &[InverseRecord],
    ) -> Result<InverseRecord, ValidationError> {
        if records.is_empty() {
            return Ok(InverseRecord::Noop);
        }
        let mut redos = Vec::with_capacity(records.len());
        for record in records {
            match self.apply_inverse(record) {
                Ok(redo) => redos.push(redo),
                Err(err) => {
                    for redo in redos.iter().rev() {
                        // Redos of records that just applied; replaying them
                        // cannot fail.
                        let _ = self.apply_inverse(redo);
                    }
                    return Err(err);
                }
            }
        }
        redos.reverse();
        Ok(InverseRecord::Batch { records: redos })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> PatchGraph {
        PatchGraph::new(Arc::new(NodeRegistry::new()))
    }

    fn create(g: &mut PatchGraph, ty: &str) -> NodeId {
        let record = g
            .apply(&Action::CreateNode {
                node_type: ty.to_string(),
                init_params: None,
                node_id: None,
            })
            .unwrap();
        let InverseRecord::RemoveNode { id } = record else {
            panic!("unexpected inverse record");
        };
        id
    }

    fn connect(g: &mut PatchGraph, src: NodeId, sp: &str, dst: NodeId, dp: &str) -> InverseRecord {
        g.apply(&Action::Connect {
            src_id: src,
            src_port: sp.to_string(),
            dst_id: dst,
            dst_port: dp.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_create_assigns_sequential_ids() {
        let mut g = graph();
        assert_eq!(create(&mut g, "sine"), NodeId(0));
        assert_eq!(create(&mut g, "saw"), NodeId(1));
        assert_eq!(create(&mut g, "audio_out"), NodeId(2));
        assert_eq!(g.node_count(), 3);
    }

    #[test]
    fn test_create_unknown_type_rejected() {
        let mut g = graph();
        let err = g
            .apply(&Action::CreateNode {
                node_type: "theremin".to_string(),
                init_params: None,
                node_id: None,
            })
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownType { .. }));
        assert_eq!(g.node_count(), 0);
    }

    #[test]
    fn test_create_internal_type_rejected() {
        let mut g = graph();
        let err = g
            .apply(&Action::CreateNode {
                node_type: "delay_write".to_string(),
                init_params: None,
                node_id: None,
            })
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownType { .. }));
    }

    #[test]
    fn test_create_with_init_params() {
        let mut g = graph();
        let mut init = BTreeMap::new();
        init.insert("freq".to_string(), 880.0);
        init.insert("no_such_param".to_string(), 1.0);
        g.apply(&Action::CreateNode {
            node_type: "sine".to_string(),
            init_params: Some(init),
            node_id: None,
        })
        .unwrap();
        let node = g.node(NodeId(0)).unwrap();
        assert_eq!(node.params["freq"], 880.0);
        // Unknown init keys are dropped, declared params get defaults.
        assert!(!node.params.contains_key("no_such_param"));
        assert_eq!(node.params["amp"], 1.0);
        assert_eq!(node.name, "Sine");
    }

    #[test]
    fn test_create_with_recorded_id_advances_counter() {
        let mut g = graph();
        g.apply(&Action::CreateNode {
            node_type: "sine".to_string(),
            init_params: None,
            node_id: Some(NodeId(7)),
        })
        .unwrap();
        assert_eq!(create(&mut g, "saw"), NodeId(8));
    }

    #[test]
    fn test_create_with_taken_id_rejected() {
        let mut g = graph();
        create(&mut g, "sine");
        let err = g
            .apply(&Action::CreateNode {
                node_type: "saw".to_string(),
                init_params: None,
                node_id: Some(NodeId(0)),
            })
            .unwrap_err();
        assert!(matches!(err, ValidationError::NotFound { .. }));
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn test_delete_and_restore_round_trip() {
        let mut g = graph();
        let osc = create(&mut g, "sine");
        let flt = create(&mut g, "lowpass");
        let out = create(&mut g, "audio_out");
        connect(&mut g, osc, "out", flt, "in");
        connect(&mut g, flt, "out", out, "left");
        g.apply(&Action::CreateModule {
            node_ids: BTreeSet::from([flt]),
        })
        .unwrap();

        let before = g.clone();
        let record = g.apply(&Action::DeleteNode { id: flt }).unwrap();
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.connection_count(), 0);
        assert!(g.module(ModuleId(0)).unwrap().members.is_empty());

        let redo = g.apply_inverse(&record).unwrap();
        assert_eq!(g, before);
        assert_eq!(g.module_of(flt), Some(ModuleId(0)));
        assert_eq!(redo, InverseRecord::RemoveNode { id: flt });
    }

    #[test]
    fn test_ids_never_reused_after_undo() {
        let mut g = graph();
        let first = create(&mut g, "sine");
        let record = g.apply(&Action::DeleteNode { id: first }).unwrap();
        g.apply_inverse(&record).unwrap();
        g.apply(&Action::DeleteNode { id: first }).unwrap();
        // The slot is free but the counter has moved on.
        assert_eq!(create(&mut g, "sine"), NodeId(1));
    }

    #[test]
    fn test_connect_validates_ports() {
        let mut g = graph();
        let osc = create(&mut g, "sine");
        let out = create(&mut g, "audio_out");

        let err = g
            .apply(&Action::Connect {
                src_id: osc,
                src_port: "wibble".to_string(),
                dst_id: out,
                dst_port: "left".to_string(),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::PortMismatch {
                direction: "output",
                ..
            }
        ));

        let err = g
            .apply(&Action::Connect {
                src_id: osc,
                src_port: "out".to_string(),
                dst_id: out,
                dst_port: "wibble".to_string(),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::PortMismatch {
                direction: "input",
                ..
            }
        ));
        assert_eq!(g.connection_count(), 0);
    }

    #[test]
    fn test_connect_missing_node_rejected() {
        let mut g = graph();
        let osc = create(&mut g, "sine");
        let err = g
            .apply(&Action::Connect {
                src_id: osc,
                src_port: "out".to_string(),
                dst_id: NodeId(99),
                dst_port: "left".to_string(),
            })
            .unwrap_err();
        assert_eq!(err, ValidationError::node_not_found(NodeId(99)));
    }

    #[test]
    fn test_connect_replaces_occupied_input() {
        let mut g = graph();
        let a = create(&mut g, "sine");
        let b = create(&mut g, "saw");
        let out = create(&mut g, "audio_out");
        connect(&mut g, a, "out", out, "left");
        let before = g.clone();

        let record = connect(&mut g, b, "out", out, "left");
        assert_eq!(g.connection_count(), 1);
        assert_eq!(g.connection_to(out, "left").unwrap().src, b);

        // Undo puts the replaced connection back.
        g.apply_inverse(&record).unwrap();
        assert_eq!(g, before);
        assert_eq!(g.connection_to(out, "left").unwrap().src, a);
    }

    #[test]
    fn test_disconnect_round_trip() {
        let mut g = graph();
        let osc = create(&mut g, "sine");
        let out = create(&mut g, "audio_out");
        connect(&mut g, osc, "out", out, "left");
        let before = g.clone();

        let record = g
            .apply(&Action::Disconnect {
                src_id: osc,
                src_port: "out".to_string(),
                dst_id: out,
                dst_port: "left".to_string(),
            })
            .unwrap();
        assert_eq!(g.connection_count(), 0);
        g.apply_inverse(&record).unwrap();
        assert_eq!(g, before);
    }

    #[test]
    fn test_disconnect_missing_rejected() {
        let mut g = graph();
        let osc = create(&mut g, "sine");
        let out = create(&mut g, "audio_out");
        let err = g
            .apply(&Action::Disconnect {
                src_id: osc,
                src_port: "out".to_string(),
                dst_id: out,
                dst_port: "left".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, ValidationError::NotFound { .. }));
    }

    #[test]
    fn test_move_and_rename_round_trip() {
        let mut g = graph();
        let osc = create(&mut g, "sine");
        let before = g.clone();

        let moved = g
            .apply(&Action::MoveNode {
                id: osc,
                x: 120.0,
                y: -40.0,
            })
            .unwrap();
        let renamed = g
            .apply(&Action::SetName {
                id: osc,
                name: "carrier".to_string(),
            })
            .unwrap();
        let node = g.node(osc).unwrap();
        assert_eq!((node.x, node.y), (120.0, -40.0));
        assert_eq!(node.name, "carrier");

        g.apply_inverse(&renamed).unwrap();
        g.apply_inverse(&moved).unwrap();
        assert_eq!(g, before);
    }

    #[test]
    fn test_set_param_records_previous_value() {
        let mut g = graph();
        let osc = create(&mut g, "sine");
        let record = g
            .apply(&Action::SetParam {
                id: osc,
                param: "freq".to_string(),
                value: Some(880.0),
            })
            .unwrap();
        assert_eq!(g.node(osc).unwrap().params["freq"], 880.0);
        assert_eq!(
            record,
            InverseRecord::SetParam {
                id: osc,
                param: "freq".to_string(),
                value: 440.0,
            }
        );
    }

    #[test]
    fn test_set_param_none_resets_to_default() {
        let mut g = graph();
        let osc = create(&mut g, "sine");
        g.apply(&Action::SetParam {
            id: osc,
            param: "freq".to_string(),
            value: Some(880.0),
        })
        .unwrap();
        g.apply(&Action::SetParam {
            id: osc,
            param: "freq".to_string(),
            value: None,
        })
        .unwrap();
        assert_eq!(g.node(osc).unwrap().params["freq"], 440.0);
    }

    #[test]
    fn test_set_param_unknown_rejected() {
        let mut g = graph();
        let osc = create(&mut g, "sine");
        let err = g
            .apply(&Action::SetParam {
                id: osc,
                param: "detune".to_string(),
                value: Some(1.0),
            })
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownParam { .. }));
    }

    #[test]
    fn test_module_membership_is_exclusive() {
        let mut g = graph();
        let a = create(&mut g, "sine");
        let b = create(&mut g, "saw");
        g.apply(&Action::CreateModule {
            node_ids: BTreeSet::from([a]),
        })
        .unwrap();
        let err = g
            .apply(&Action::CreateModule {
                node_ids: BTreeSet::from([a, b]),
            })
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::AlreadyGrouped {
                node: a,
                module: ModuleId(0),
            }
        );
        // Rejected action creates nothing.
        assert_eq!(g.modules().count(), 1);
    }

    #[test]
    fn test_module_boundary_derived_from_connections() {
        let mut g = graph();
        let osc = create(&mut g, "sine");
        let flt = create(&mut g, "lowpass");
        let out = create(&mut g, "audio_out");
        connect(&mut g, osc, "out", flt, "in");
        connect(&mut g, flt, "out", out, "left");
        connect(&mut g, flt, "out", out, "right");
        g.apply(&Action::CreateModule {
            node_ids: BTreeSet::from([flt]),
        })
        .unwrap();

        let boundary = g.module_boundary(ModuleId(0)).unwrap();
        assert_eq!(
            boundary,
            vec![
                BoundaryPort {
                    node: flt,
                    port: "in".to_string(),
                    direction: PortDirection::Input,
                },
                BoundaryPort {
                    node: flt,
                    port: "out".to_string(),
                    direction: PortDirection::Output,
                },
            ]
        );

        // Internal edges never show up: group the oscillator in too and the
        // osc→filter connection stops crossing the boundary.
        g.apply(&Action::SplitModule {
            module_id: ModuleId(0),
        })
        .unwrap();
        g.apply(&Action::CreateModule {
            node_ids: BTreeSet::from([osc, flt]),
        })
        .unwrap();
        let boundary = g.module_boundary(ModuleId(1)).unwrap();
        assert_eq!(boundary.len(), 1);
        assert_eq!(boundary[0].port, "out");
    }

    #[test]
    fn test_split_and_restore_module() {
        let mut g = graph();
        let a = create(&mut g, "sine");
        let b = create(&mut g, "saw");
        g.apply(&Action::CreateModule {
            node_ids: BTreeSet::from([a, b]),
        })
        .unwrap();
        let before = g.clone();

        let record = g
            .apply(&Action::SplitModule {
                module_id: ModuleId(0),
            })
            .unwrap();
        assert_eq!(g.modules().count(), 0);
        g.apply_inverse(&record).unwrap();
        assert_eq!(g, before);
    }

    #[test]
    fn test_module_ids_never_reused() {
        let mut g = graph();
        let a = create(&mut g, "sine");
        g.apply(&Action::CreateModule {
            node_ids: BTreeSet::from([a]),
        })
        .unwrap();
        g.apply(&Action::SplitModule {
            module_id: ModuleId(0),
        })
        .unwrap();
        let record = g
            .apply(&Action::CreateModule {
                node_ids: BTreeSet::from([a]),
            })
            .unwrap();
        assert_eq!(record, InverseRecord::RemoveModule { id: ModuleId(1) });
    }

    #[test]
    fn test_batch_failure_rolls_back() {
        let mut g = graph();
        create(&mut g, "sine");
        let before = g.clone();
        let batch = InverseRecord::Batch {
            records: vec![
                InverseRecord::RemoveNode { id: NodeId(0) },
                InverseRecord::RemoveNode { id: NodeId(99) },
            ],
        };
        let err = g.apply_inverse(&batch).unwrap_err();
        assert_eq!(err, ValidationError::node_not_found(NodeId(99)));
        assert_eq!(g, before);
    }

    #[test]
    fn test_rejected_action_leaves_state_unchanged() {
        let mut g = graph();
        let a = create(&mut g, "sine");
        let before = g.clone();
        // Second id does not exist, so the whole grouping must be refused.
        let err = g
            .apply(&Action::CreateModule {
                node_ids: BTreeSet::from([a, NodeId(42)]),
            })
            .unwrap_err();
        assert!(matches!(err, ValidationError::NotFound { .. }));
        assert_eq!(g, before);
        assert_eq!(g.modules().count(), 0);
    }

    #[test]
    fn test_transport_actions_are_noop_for_the_graph() {
        let mut g = graph();
        for action in [
            Action::Play,
            Action::Stop,
            Action::SetPlayPos { time: 1.5 },
            Action::Undo,
            Action::Redo,
        ] {
            assert_eq!(g.apply(&action).unwrap(), InverseRecord::Noop);
        }
        assert_eq!(g, graph());
    }
}
