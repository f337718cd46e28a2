//! The editing-context facade.
//!
//! [`Editor`] owns everything that lives on the editing thread: the patch
//! graph, the undo/redo log, the clipboard, the engine handle, and the
//! caches the UI reads (play position, visualization samples). Every user
//! operation arrives as one [`Action`] through [`Editor::dispatch`], which
//! keeps the pieces consistent: graph edits are logged, structural changes
//! recompile and install a schedule, parameter changes go straight to the
//! running engine, and history replay re-synchronizes whichever of the two
//! applies.

use std::collections::BTreeMap;
use std::sync::Arc;

use parche_engine::{AudioEngine, EngineHandle, Feedback, ProcessorFactory, ScheduleUpdate, pair};
use parche_graph::{
    Action, ActionLog, Clipboard, CompileError, ConfigError, EngineConfig, InverseRecord, NodeId,
    Pasted, PatchGraph, Schedule, compile,
};
use parche_registry::NodeRegistry;
use tracing::{trace, warn};

use crate::error::EditorError;

/// Samples of visualization history kept per node.
const VIZ_CAPACITY: usize = 4096;

/// What a dispatched action did beyond mutating the graph.
#[derive(Debug, Default)]
pub struct Dispatched {
    /// Node created by this action.
    pub created: Option<NodeId>,
    /// Nodes created by a paste, in clipboard order.
    pub pasted: Vec<NodeId>,
    /// Whether a schedule rebuild was attempted.
    pub recompiled: bool,
    /// Set when the graph changed but its topology cannot compile. The
    /// edit stands; the engine keeps the previous schedule.
    pub compile_error: Option<CompileError>,
}

/// Single-threaded editing front end over a running audio engine.
pub struct Editor {
    config: EngineConfig,
    graph: PatchGraph,
    log: ActionLog,
    clipboard: Clipboard,
    engine: EngineHandle,
    factory: Box<dyn ProcessorFactory>,
    schedule: Option<Arc<Schedule>>,
    play_pos: f64,
    viz: BTreeMap<NodeId, Vec<f32>>,
}

impl Editor {
    /// Build an editor and the audio engine it drives.
    ///
    /// The engine half is returned for the embedder to move into its audio
    /// callback. The empty patch is compiled and installed immediately, so
    /// the engine starts on a live (silent) generation.
    pub fn new(
        config: EngineConfig,
        registry: Arc<NodeRegistry>,
        factory: Box<dyn ProcessorFactory>,
    ) -> Result<(Self, AudioEngine), ConfigError> {
        config.validate()?;
        let (handle, audio) = pair(&config);
        let mut editor = Self {
            graph: PatchGraph::new(registry),
            log: ActionLog::default(),
            clipboard: Clipboard::new(),
            engine: handle,
            factory,
            schedule: None,
            play_pos: 0.0,
            viz: BTreeMap::new(),
            config,
        };
        editor.recompile_and_install();
        Ok((editor, audio))
    }

    /// Apply one user operation.
    ///
    /// Graph edits are validated, applied atomically, and logged for undo.
    /// Structural edits additionally recompile; a compile failure is
    /// reported in the result but does not roll the edit back. Transport
    /// and parameter traffic goes to the engine without touching history.
    pub fn dispatch(&mut self, action: Action) -> Result<Dispatched, EditorError> {
        trace!("dispatch: {action:?}");
        let result = match action {
            Action::Undo => self.undo(),
            Action::Redo => self.redo(),
            Action::Copy { node_ids } => self
                .clipboard
                .copy(&self.graph, &node_ids)
                .map(|()| Dispatched::default())
                .map_err(Into::into),
            Action::Paste { min_x, min_y } => self.paste(min_x, min_y),
            Action::Play => {
                self.engine.play();
                Ok(Dispatched::default())
            }
            Action::Stop => {
                self.engine.stop();
                Ok(Dispatched::default())
            }
            Action::SetPlayPos { time } => {
                self.engine.set_play_pos(time);
                self.play_pos = time.max(0.0);
                Ok(Dispatched::default())
            }
            Action::SendAudioData { id, samples } => {
                self.push_viz(id, &samples);
                Ok(Dispatched::default())
            }
            edit => self.apply_edit(edit),
        };
        if let Err(err) = &result {
            warn!("dispatch rejected: {err}");
        }
        result
    }

    /// Drain engine feedback into the play position and visualization
    /// caches. Returns the number of messages processed.
    pub fn pump(&mut self) -> usize {
        let feedback: Vec<Feedback> = self.engine.poll_feedback().collect();
        let drained = feedback.len();
        for message in feedback {
            match message {
                Feedback::PlayPos { seconds } => self.play_pos = seconds,
                Feedback::AudioData { node, chunk } => self.push_viz(node, chunk.samples()),
            }
        }
        drained
    }

    /// The current patch.
    pub fn graph(&self) -> &PatchGraph {
        &self.graph
    }

    /// The most recently installed schedule.
    pub fn schedule(&self) -> Option<&Arc<Schedule>> {
        self.schedule.as_ref()
    }

    /// Last play position reported by the engine, in seconds.
    pub fn play_pos(&self) -> f64 {
        self.play_pos
    }

    /// Visualization history for a node, oldest sample first.
    pub fn viz(&self, node: NodeId) -> Option<&[f32]> {
        self.viz.get(&node).map(Vec::as_slice)
    }

    /// Whether an undo step is available.
    pub fn can_undo(&self) -> bool {
        self.log.can_undo()
    }

    /// Whether a redo step is available.
    pub fn can_redo(&self) -> bool {
        self.log.can_redo()
    }

    fn apply_edit(&mut self, action: Action) -> Result<Dispatched, EditorError> {
        let record = self.graph.apply(&action)?;
        let mut out = Dispatched::default();
        if let InverseRecord::RemoveNode { id } = &record {
            out.created = Some(*id);
        }
        let structural = record.is_structural();
        self.log.record(record);

        if structural {
            out.recompiled = true;
            out.compile_error = self.recompile_and_install();
        } else if let Action::SetParam { id, param, .. } = &action {
            self.forward_param(*id, param);
        }
        Ok(out)
    }

    fn paste(&mut self, min_x: f32, min_y: f32) -> Result<Dispatched, EditorError> {
        let Some(Pasted { record, nodes }) = self.clipboard.paste(&mut self.graph, min_x, min_y)?
        else {
            return Ok(Dispatched::default());
        };
        self.log.record(record);
        let compile_error = self.recompile_and_install();
        Ok(Dispatched {
            pasted: nodes,
            recompiled: true,
            compile_error,
            ..Dispatched::default()
        })
    }

    fn undo(&mut self) -> Result<Dispatched, EditorError> {
        let record = self
            .log
            .undo(&mut self.graph)?
            .ok_or(EditorError::NothingToUndo)?;
        Ok(self.sync_history(&record))
    }

    fn redo(&mut self) -> Result<Dispatched, EditorError> {
        let record = self
            .log
            .redo(&mut self.graph)?
            .ok_or(EditorError::NothingToRedo)?;
        Ok(self.sync_history(&record))
    }

    /// Re-synchronize the engine after history replay applied `record`.
    fn sync_history(&mut self, record: &InverseRecord) -> Dispatched {
        let mut out = Dispatched::default();
        if record.is_structural() {
            out.recompiled = true;
            out.compile_error = self.recompile_and_install();
        } else {
            let mut changes = Vec::new();
            record.param_changes(&mut changes);
            for (id, param, _) in changes {
                self.forward_param(id, &param);
            }
        }
        out
    }

    /// Send a node's current parameter value to the running engine.
    ///
    /// Reads back from the graph rather than trusting the caller, so the
    /// engine always sees what the model settled on.
    fn forward_param(&self, id: NodeId, param: &str) {
        let Some(node) = self.graph.node(id) else {
            return;
        };
        let Some(ty) = self.graph.registry().get(&node.type_name) else {
            return;
        };
        let Some(index) = ty.param_index(param) else {
            return;
        };
        let Some(value) = node.params.get(param).copied() else {
            return;
        };
        self.engine.set_param(id, index, value);
    }

    /// Compile the current graph and hand the engine a fresh generation.
    ///
    /// On failure the engine keeps its previous schedule and the error is
    /// returned for the caller to surface.
    fn recompile_and_install(&mut self) -> Option<CompileError> {
        match compile(&self.graph, &self.config) {
            Ok(schedule) => {
                let schedule = Arc::new(schedule);
                self.engine.install(ScheduleUpdate::new(
                    Arc::clone(&schedule),
                    self.config.block_size,
                    self.factory.as_ref(),
                ));
                self.schedule = Some(schedule);
                self.viz.retain(|id, _| self.graph.node(*id).is_some());
                None
            }
            Err(err) => {
                warn!("recompile rejected: {err}");
                Some(err)
            }
        }
    }

    fn push_viz(&mut self, node: NodeId, samples: &[f32]) {
        let buf = self.viz.entry(node).or_default();
        buf.extend_from_slice(samples);
        let excess = buf.len().saturating_sub(VIZ_CAPACITY);
        if excess > 0 {
            buf.drain(..excess);
        }
    }
}
