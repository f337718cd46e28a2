//! Bounded undo/redo history over inverse records.
//!
//! The log never stores actions or graph snapshots, only the
//! [`InverseRecord`]s that [`PatchGraph::apply`] hands back. Undo replays a
//! record and pushes what comes back onto the redo stack; redo is the mirror
//! image. Recording a new edit clears the redo stack, and when the undo
//! stack is full the oldest entry falls off the bottom.

use std::collections::VecDeque;

use crate::action::InverseRecord;
use crate::error::ValidationError;
use crate::model::PatchGraph;

/// History depth used by [`ActionLog::default`].
pub const DEFAULT_DEPTH: usize = 128;

/// Undo/redo stacks for one graph.
#[derive(Debug)]
pub struct ActionLog {
    undo: VecDeque<InverseRecord>,
    redo: Vec<InverseRecord>,
    depth: usize,
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::new(DEFAULT_DEPTH)
    }
}

impl ActionLog {
    /// A log holding at most `depth` undoable edits.
    ///
    /// # Panics
    ///
    /// Panics if `depth` is zero.
    pub fn new(depth: usize) -> Self {
        assert!(depth > 0, "history depth must be at least 1");
        ActionLog {
            undo: VecDeque::with_capacity(depth),
            redo: Vec::new(),
            depth,
        }
    }

    /// Record the inverse of an edit that just applied.
    ///
    /// Noop records are not worth a history slot and are dropped. Any new
    /// edit invalidates the redo stack.
    pub fn record(&mut self, record: InverseRecord) {
        if matches!(record, InverseRecord::Noop) {
            return;
        }
        self.redo.clear();
        if self.undo.len() == self.depth {
            self.undo.pop_front();
        }
        self.undo.push_back(record);
    }

    /// Undo the most recent edit against `graph`.
    ///
    /// Returns the record that was replayed so the caller can inspect what
    /// changed, or `None` when there is nothing to undo. On error the graph
    /// and both stacks are unchanged.
    pub fn undo(
        &mut self,
        graph: &mut PatchGraph,
    ) -> Result<Option<InverseRecord>, ValidationError> {
        let Some(record) = self.undo.pop_back() else {
            return Ok(None);
        };
        match graph.apply_inverse(&record) {
            Ok(redo) => {
                self.redo.push(redo);
                tracing::debug!("log_undo: {} entries left", self.undo.len());
                Ok(Some(record))
            }
            Err(err) => {
                // A record that came out of apply() replays cleanly against
                // the state it was recorded under; reaching this arm means a
                // caller edited the graph behind the log's back.
                self.undo.push_back(record);
                Err(err)
            }
        }
    }

    /// Redo the most recently undone edit against `graph`.
    ///
    /// Returns the replayed record, or `None` when there is nothing to redo.
    pub fn redo(
        &mut self,
        graph: &mut PatchGraph,
    ) -> Result<Option<InverseRecord>, ValidationError> {
        let Some(record) = self.redo.pop() else {
            return Ok(None);
        };
        match graph.apply_inverse(&record) {
            Ok(undo) => {
                if self.undo.len() == self.depth {
                    self.undo.pop_front();
                }
                self.undo.push_back(undo);
                tracing::debug!("log_redo: {} entries left", self.redo.len());
                Ok(Some(record))
            }
            Err(err) => {
                self.redo.push(record);
                Err(err)
            }
        }
    }

    /// True when an undo is available.
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// True when a redo is available.
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of undoable edits currently held.
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Number of redoable edits currently held.
    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Drop all history.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parche_registry::NodeRegistry;

    use super::*;
    use crate::action::Action;
    use crate::node::NodeId;

    fn graph() -> PatchGraph {
        PatchGraph::new(Arc::new(NodeRegistry::new()))
    }

    fn create(g: &mut PatchGraph, log: &mut ActionLog, ty: &str) {
        let record = g
            .apply(&Action::CreateNode {
                node_type: ty.to_string(),
                init_params: None,
                node_id: None,
            })
            .unwrap();
        log.record(record);
    }

    #[test]
    fn test_undo_redo_restores_state() {
        let mut g = graph();
        let mut log = ActionLog::default();
        let empty = g.clone();

        create(&mut g, &mut log, "sine");
        create(&mut g, &mut log, "audio_out");
        let full = g.clone();

        assert!(log.undo(&mut g).unwrap().is_some());
        assert!(log.undo(&mut g).unwrap().is_some());
        assert_eq!(g, empty);
        assert!(!log.can_undo());
        assert!(log.undo(&mut g).unwrap().is_none());

        assert!(log.redo(&mut g).unwrap().is_some());
        assert!(log.redo(&mut g).unwrap().is_some());
        assert_eq!(g, full);
        assert!(log.redo(&mut g).unwrap().is_none());
    }

    #[test]
    fn test_redo_restores_original_ids() {
        let mut g = graph();
        let mut log = ActionLog::default();
        create(&mut g, &mut log, "sine");
        create(&mut g, &mut log, "saw");

        log.undo(&mut g).unwrap();
        log.redo(&mut g).unwrap();
        // The redone node comes back under the id it first had.
        assert!(g.node(NodeId(1)).is_some());
        assert_eq!(g.node(NodeId(1)).unwrap().type_name, "saw");
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut g = graph();
        let mut log = ActionLog::default();
        create(&mut g, &mut log, "sine");
        log.undo(&mut g).unwrap();
        assert!(log.can_redo());

        create(&mut g, &mut log, "saw");
        assert!(!log.can_redo());
        assert!(log.redo(&mut g).unwrap().is_none());
    }

    #[test]
    fn test_depth_bound_discards_oldest() {
        let mut g = graph();
        let mut log = ActionLog::new(2);
        create(&mut g, &mut log, "sine");
        create(&mut g, &mut log, "saw");
        create(&mut g, &mut log, "square");
        assert_eq!(log.undo_depth(), 2);

        // Only the two newest edits unwind; the first node stays.
        log.undo(&mut g).unwrap();
        log.undo(&mut g).unwrap();
        assert!(log.undo(&mut g).unwrap().is_none());
        assert_eq!(g.node_count(), 1);
        assert!(g.node(NodeId(0)).is_some());
    }

    #[test]
    fn test_noop_records_are_skipped() {
        let mut log = ActionLog::default();
        log.record(InverseRecord::Noop);
        assert!(!log.can_undo());
    }

    #[test]
    fn test_clear_drops_both_stacks() {
        let mut g = graph();
        let mut log = ActionLog::default();
        create(&mut g, &mut log, "sine");
        log.undo(&mut g).unwrap();
        log.clear();
        assert!(!log.can_undo());
        assert!(!log.can_redo());
    }
}
