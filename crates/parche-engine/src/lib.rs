//! Parche Engine - real-time schedule execution and cross-thread handoff
//!
//! This crate is the audio-thread half of the parche synthesizer backend.
//! It interprets the [`Schedule`](parche_graph::Schedule) the graph crate
//! compiles, block by block, against preallocated slot buffers and delay
//! rings, and it owns the only traffic allowed between the editing context
//! and the audio callback: bounded non-blocking channels and an atomic
//! schedule swap.
//!
//! # Core Abstractions
//!
//! - [`pair`] - Construct a connected [`EngineHandle`] / [`AudioEngine`]
//!   pair from an [`EngineConfig`](parche_graph::EngineConfig)
//! - [`EngineHandle`] - Editing-side: submit commands, install schedule
//!   generations, drain feedback
//! - [`AudioEngine`] - Real-time side: [`run_block`](AudioEngine::run_block)
//!   renders one stereo block without blocking or allocating
//! - [`ScheduleUpdate`] - One generation: schedule plus every allocation
//!   execution touches, built off the audio thread
//! - [`BlockProcessor`] / [`ProcessorFactory`] - The seam where embedders
//!   plug in per-node DSP
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use parche_engine::{ScheduleUpdate, SilenceFactory, pair};
//! use parche_graph::{EngineConfig, NodeRegistry, PatchGraph, compile};
//!
//! let config = EngineConfig::default();
//! let (handle, mut engine) = pair(&config);
//!
//! let graph = PatchGraph::new(Arc::new(NodeRegistry::new()));
//! let schedule = Arc::new(compile(&graph, &config).unwrap());
//! handle.install(ScheduleUpdate::new(schedule, config.block_size, &SilenceFactory));
//!
//! let mut left = vec![0.0; config.block_size];
//! let mut right = vec![0.0; config.block_size];
//! engine.run_block(&mut left, &mut right);
//! assert!(left.iter().all(|&s| s == 0.0));
//! ```

pub mod delay_line;
pub mod engine;
pub mod message;
pub mod processor;
pub mod transport;
pub mod update;

pub use delay_line::DelayLine;
pub use engine::{AudioEngine, EngineHandle, pair};
pub use message::{AUDIO_CHUNK_LEN, AudioChunk, EngineCommand, Feedback};
pub use processor::{BlockCtx, BlockProcessor, InputRef, ProcessorFactory, Silence, SilenceFactory};
pub use transport::Transport;
pub use update::ScheduleUpdate;
