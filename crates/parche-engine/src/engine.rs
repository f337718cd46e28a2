//! The audio-side engine and its editing-side handle.
//!
//! [`pair`] builds the two halves wired together. [`EngineHandle`] stays in
//! the editing context; [`AudioEngine`] moves into the audio callback and is
//! driven by [`run_block`](AudioEngine::run_block). Everything between them
//! is non-blocking on the audio side: bounded channels that drop on
//! overflow, and an atomically swapped schedule generation adopted at block
//! boundaries, so a block never runs against a half-updated schedule.

use std::mem;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use crossbeam_channel::{Receiver, Sender, bounded};
use parche_graph::{
    EngineConfig, InputSource, MAX_STEP_INPUTS, MAX_STEP_OUTPUTS, NodeId, StepKind,
};
use tracing::{debug, warn};

use crate::message::{AUDIO_CHUNK_LEN, AudioChunk, EngineCommand, Feedback};
use crate::processor::{BlockCtx, InputRef};
use crate::transport::Transport;
use crate::update::ScheduleUpdate;

/// Build a connected handle/engine pair sized by `config`.
pub fn pair(config: &EngineConfig) -> (EngineHandle, AudioEngine) {
    let (command_tx, command_rx) = bounded(config.command_capacity);
    let (feedback_tx, feedback_rx) = bounded(config.feedback_capacity);
    let pending = Arc::new(ArcSwapOption::empty());
    debug!(
        "engine_pair: {} Hz, {} frames per block",
        config.sample_rate, config.block_size
    );

    let handle = EngineHandle {
        commands: command_tx,
        feedback: feedback_rx,
        pending: Arc::clone(&pending),
    };
    let engine = AudioEngine {
        commands: command_rx,
        feedback: feedback_tx,
        pending,
        generation: None,
        transport: Transport::new(config.sample_rate),
        sample_rate: config.sample_rate,
        block_size: config.block_size,
    };
    (handle, engine)
}

/// Editing-side handle to a running [`AudioEngine`].
///
/// All methods are non-blocking. Commands and feedback ride bounded
/// channels; schedule installs go through an atomic last-writer-wins slot.
pub struct EngineHandle {
    commands: Sender<EngineCommand>,
    feedback: Receiver<Feedback>,
    pending: Arc<ArcSwapOption<ScheduleUpdate>>,
}

impl EngineHandle {
    /// Queue a command for the next block boundary.
    ///
    /// Returns `false` when the queue is full and the command was dropped.
    pub fn submit(&self, command: EngineCommand) -> bool {
        match self.commands.try_send(command) {
            Ok(()) => true,
            Err(err) => {
                warn!("engine_submit: queue full, dropped {:?}", err.into_inner());
                false
            }
        }
    }

    /// Publish a schedule generation; the engine adopts it at its next
    /// block boundary. An earlier install it has not picked up yet is
    /// replaced.
    pub fn install(&self, update: ScheduleUpdate) {
        debug!(
            "engine_install: {} steps, {} slots, {} rings",
            update.schedule.step_count(),
            update.schedule.slot_count(),
            update.rings.len()
        );
        self.pending.store(Some(Arc::new(update)));
    }

    /// Drain whatever feedback the engine has produced, without blocking.
    pub fn poll_feedback(&self) -> impl Iterator<Item = Feedback> + '_ {
        self.feedback.try_iter()
    }

    /// Start the transport.
    pub fn play(&self) -> bool {
        self.submit(EngineCommand::Play)
    }

    /// Stop the transport, keeping the playhead in place.
    pub fn stop(&self) -> bool {
        self.submit(EngineCommand::Stop)
    }

    /// Move the playhead to an absolute time in seconds.
    pub fn set_play_pos(&self, time: f64) -> bool {
        self.submit(EngineCommand::SetPlayPos { time })
    }

    /// Overwrite one value in the running schedule's parameter table.
    pub fn set_param(&self, node: NodeId, index: usize, value: f32) -> bool {
        self.submit(EngineCommand::SetParam { node, index, value })
    }
}

/// The real-time half: owns the running generation and renders blocks.
pub struct AudioEngine {
    commands: Receiver<EngineCommand>,
    feedback: Sender<Feedback>,
    pending: Arc<ArcSwapOption<ScheduleUpdate>>,
    generation: Option<ScheduleUpdate>,
    transport: Transport,
    sample_rate: u32,
    block_size: usize,
}

impl AudioEngine {
    /// Frames rendered per block.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Output sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Render one stereo block into `left` and `right`.
    ///
    /// Never blocks, never allocates. At most `block_size` frames are
    /// rendered; anything past that stays silent. With no schedule
    /// installed the output is silence but commands are still consumed.
    pub fn run_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        left.fill(0.0);
        right.fill(0.0);
        let frames = left.len().min(right.len()).min(self.block_size);

        self.take_pending();
        self.drain_commands();

        // Position goes out before any probe chunks so it wins the fight
        // for queue space on a congested block.
        if self.transport.playing() {
            let _ = self.feedback.try_send(Feedback::PlayPos {
                seconds: self.transport.pos_seconds(),
            });
        }

        if let Some(generation) = self.generation.as_mut() {
            execute(
                generation,
                &self.transport,
                self.sample_rate,
                frames,
                &mut left[..frames],
                &mut right[..frames],
                &self.feedback,
            );
            for ring in &mut generation.rings {
                ring.advance(frames);
            }
        }
        self.transport.advance(frames);
    }

    /// Adopt a freshly published generation, moving delay history and
    /// processor state over from the outgoing one where the node survived.
    /// The outgoing generation is dropped here, at the block boundary.
    fn take_pending(&mut self) {
        let Some(update) = self.pending.swap(None) else {
            return;
        };
        // install() hands over the only Arc, so there are no other owners.
        let Ok(mut next) = Arc::try_unwrap(update) else {
            return;
        };
        if let Some(mut old) = self.generation.take() {
            carry_over(&mut old, &mut next);
        }
        self.generation = Some(next);
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                EngineCommand::Play => self.transport.play(),
                EngineCommand::Stop => self.transport.stop(),
                EngineCommand::SetPlayPos { time } => self.transport.seek_seconds(time),
                EngineCommand::SetParam { node, index, value } => {
                    if let Some(generation) = self.generation.as_mut()
                        && let Some(slot) = generation.schedule.param_slot(node, index)
                    {
                        generation.params[slot] = value;
                    }
                }
            }
        }
    }
}

/// Move delay history and processor state from `old` into `next` wherever
/// the node survived with the same shape.
fn carry_over(old: &mut ScheduleUpdate, next: &mut ScheduleUpdate) {
    for (spec, ring) in next.schedule.delays().iter().zip(next.rings.iter_mut()) {
        if let Some(i) = old
            .schedule
            .delays()
            .iter()
            .position(|o| o.node == spec.node && o.capacity == spec.capacity)
        {
            mem::swap(ring, &mut old.rings[i]);
        }
    }
    for cell in &mut next.processors {
        if let Some(old_cell) = old
            .processors
            .iter_mut()
            .find(|o| o.node == cell.node && o.type_name == cell.type_name)
        {
            mem::swap(&mut cell.dsp, &mut old_cell.dsp);
        }
    }
}

/// Run every step for one block. `left` and `right` are the master bus,
/// already zeroed and exactly `frames` long.
fn execute(
    generation: &mut ScheduleUpdate,
    transport: &Transport,
    sample_rate: u32,
    frames: usize,
    left: &mut [f32],
    right: &mut [f32],
    feedback: &Sender<Feedback>,
) {
    let schedule = Arc::clone(&generation.schedule);
    let block = generation.block_size;

    for step in schedule.steps() {
        // Slots below the step's output range were produced by earlier
        // steps; splitting there gives disjoint read and write regions.
        let (read_slots, write_slots) = generation.slots.split_at_mut(step.outputs.first * block);

        let mut inputs = [InputRef::Scalar(0.0); MAX_STEP_INPUTS];
        for (input, source) in inputs.iter_mut().zip(step.inputs.iter()) {
            *input = match *source {
                InputSource::Constant(v) => InputRef::Scalar(v),
                InputSource::Param(slot) => InputRef::Scalar(generation.params[slot]),
                InputSource::Slot(slot) => {
                    InputRef::Buffer(&read_slots[slot * block..slot * block + frames])
                }
            };
        }

        match step.kind {
            StepKind::Node { proc } => {
                let mut outputs: [&mut [f32]; MAX_STEP_OUTPUTS] = Default::default();
                let mut rest = &mut write_slots[..step.outputs.count * block];
                for out in outputs.iter_mut().take(step.outputs.count) {
                    let (buf, tail) = mem::take(&mut rest).split_at_mut(block);
                    *out = &mut buf[..frames];
                    rest = tail;
                }

                let ctx = BlockCtx {
                    sample_rate: sample_rate as f32,
                    frames,
                    params: &generation.params[step.param_base..step.param_base + step.param_count],
                    play_pos: transport.pos_samples(),
                    playing: transport.playing(),
                };
                generation.processors[proc].dsp.process(
                    &ctx,
                    &inputs[..step.inputs.len()],
                    &mut outputs[..step.outputs.count],
                );
            }
            StepKind::DelayRead { ring } => {
                // The single input is the live time parameter in seconds.
                let seconds = f64::from(inputs[0].sample(0).max(0.0));
                let delay_samples = (seconds * f64::from(sample_rate)).round() as usize;
                generation.rings[ring].read_block(delay_samples, &mut write_slots[..frames]);
            }
            StepKind::DelayWrite { ring } => match inputs[0] {
                InputRef::Buffer(buf) => generation.rings[ring].write_block(buf),
                InputRef::Scalar(v) => generation.rings[ring].fill_block(v, frames),
            },
            StepKind::Output => {
                let gain = if step.param_count > 0 {
                    generation.params[step.param_base]
                } else {
                    1.0
                };
                for i in 0..frames {
                    left[i] += inputs[0].sample(i) * gain;
                    right[i] += inputs[1].sample(i) * gain;
                }
            }
            StepKind::Probe => {
                if let InputRef::Buffer(buf) = inputs[0] {
                    for chunk in buf.chunks(AUDIO_CHUNK_LEN) {
                        let _ = feedback.try_send(Feedback::AudioData {
                            node: step.node,
                            chunk: AudioChunk::from_slice(chunk),
                        });
                    }
                }
            }
        }
    }
}
