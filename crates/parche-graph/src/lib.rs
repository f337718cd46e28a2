//! Parche Graph - transactional patch editing and schedule compilation
//!
//! This crate is the editing-thread half of the parche synthesizer backend:
//! a node graph that mutates only through validated actions, an undo/redo
//! log built from exact inverse records, and a compiler that lowers the
//! graph into a linear [`Schedule`] the audio engine can execute without
//! touching the graph again.
//!
//! # Core Abstractions
//!
//! ## Editing
//!
//! - [`Action`] - The complete user-operation vocabulary, serde-tagged for
//!   wire transport
//! - [`PatchGraph`] - Graph state; [`PatchGraph::apply`] validates and
//!   mutates atomically, returning an [`InverseRecord`]
//! - [`InverseRecord`] - Exact undo information for one applied action
//! - [`ActionLog`] - Bounded undo/redo stacks over inverse records
//! - [`Clipboard`] - Subgraph copy/paste with id remapping
//!
//! ## Compilation
//!
//! - [`compile`] - Delay splitting, deterministic topological ordering,
//!   slot and parameter assignment
//! - [`Schedule`] - The compiled program: steps, slots, parameter table,
//!   delay ring requirements
//!
//! ## Configuration
//!
//! - [`EngineConfig`] - Buffer sizes and channel capacities, loadable from
//!   TOML
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use parche_graph::{Action, ActionLog, EngineConfig, PatchGraph, compile};
//! use parche_registry::NodeRegistry;
//!
//! let mut graph = PatchGraph::new(Arc::new(NodeRegistry::new()));
//! let mut log = ActionLog::default();
//!
//! let record = graph
//!     .apply(&Action::CreateNode {
//!         node_type: "sine".to_string(),
//!         init_params: None,
//!         node_id: None,
//!     })
//!     .unwrap();
//! log.record(record);
//!
//! let schedule = compile(&graph, &EngineConfig::default()).unwrap();
//! assert_eq!(schedule.step_count(), 1);
//!
//! log.undo(&mut graph).unwrap();
//! assert_eq!(graph.node_count(), 0);
//! ```

pub mod action;
pub mod clipboard;
pub mod compile;
pub mod config;
pub mod error;
pub mod log;
pub mod model;
pub mod node;
pub mod schedule;

pub use action::{Action, InverseRecord};
pub use clipboard::{Clipboard, Pasted};
pub use compile::compile;
pub use config::{ConfigError, EngineConfig};
pub use error::{CompileError, ValidationError};
pub use log::{ActionLog, DEFAULT_DEPTH};
pub use model::PatchGraph;
pub use node::{BoundaryPort, Connection, Module, ModuleId, Node, NodeId, PortDirection};
pub use schedule::{
    DelaySpec, InputSource, MAX_STEP_INPUTS, MAX_STEP_OUTPUTS, ParamSlot, Schedule, SlotRange,
    Step, StepKind,
};

/// Re-export of the registry types the graph API speaks in.
pub use parche_registry::{NodeRegistry, NodeType};
