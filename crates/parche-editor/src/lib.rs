//! Parche Editor - the editing-context facade
//!
//! This crate ties the other parche crates into the single object an
//! embedder talks to. An [`Editor`] owns the patch graph, the undo/redo
//! log, the clipboard, and the control half of a running audio engine;
//! every user operation goes through [`Editor::dispatch`] as one
//! [`Action`](parche_graph::Action), and the editor keeps all of the
//! pieces consistent: edits are validated and logged, structural changes
//! recompile and atomically install a new schedule, parameter changes are
//! forwarded to the running engine without a rebuild, and history replay
//! re-synchronizes whichever of the two applies.
//!
//! # Core Abstractions
//!
//! - [`Editor`] - Single-threaded editing front end; constructed together
//!   with the [`AudioEngine`](parche_engine::AudioEngine) it drives
//! - [`Dispatched`] - What an action did beyond mutating the graph:
//!   created/pasted ids, whether a recompile ran, and any compile error
//! - [`EditorError`] - Why a dispatch was rejected; the editor is left
//!   unchanged in every case
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use parche_editor::Editor;
//! use parche_engine::SilenceFactory;
//! use parche_graph::{Action, EngineConfig, NodeRegistry};
//!
//! let (mut editor, _engine) = Editor::new(
//!     EngineConfig::default(),
//!     Arc::new(NodeRegistry::new()),
//!     Box::new(SilenceFactory),
//! )
//! .unwrap();
//!
//! let action: Action =
//!     serde_json::from_str(r#"{"type": "create_node", "node_type": "sine"}"#).unwrap();
//! let result = editor.dispatch(action).unwrap();
//! assert!(result.created.is_some());
//! assert!(editor.can_undo());
//! ```

pub mod editor;
pub mod error;

pub use editor::{Dispatched, Editor};
pub use error::EditorError;
