//! The message vocabulary crossing the control/audio boundary.
//!
//! Commands flow control-to-audio and are consumed at block boundaries;
//! feedback flows the other way. Both directions ride bounded channels and
//! are dropped rather than blocked on when a queue is full, so neither
//! thread can stall the other.

use parche_graph::NodeId;
use serde::{Deserialize, Serialize};

/// Samples per visualization chunk sent back to the editor.
///
/// Small enough to fit several chunks in the feedback queue per block,
/// large enough that a block of typical size needs only a handful.
pub const AUDIO_CHUNK_LEN: usize = 64;

/// A lightweight command applied by the audio engine between blocks.
///
/// Everything structural goes through a full schedule install instead;
/// commands cover only what must not wait for a recompile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineCommand {
    /// Start the transport.
    Play,
    /// Stop the transport, keeping the playhead where it is.
    Stop,
    /// Move the playhead to an absolute time in seconds.
    SetPlayPos {
        /// Target position in seconds; negative values clamp to zero.
        time: f64,
    },
    /// Overwrite one value in the live parameter table.
    SetParam {
        /// Node whose parameter changes.
        node: NodeId,
        /// Index into the node type's declared parameter list.
        index: usize,
        /// New value.
        value: f32,
    },
}

/// A fixed-capacity run of samples tapped from a probe step.
///
/// Sized statically so chunks move through the feedback channel without
/// touching the heap on the audio thread.
#[derive(Debug, Clone, Copy)]
pub struct AudioChunk {
    samples: [f32; AUDIO_CHUNK_LEN],
    len: usize,
}

impl AudioChunk {
    /// Copy up to [`AUDIO_CHUNK_LEN`] samples out of `slice`.
    pub(crate) fn from_slice(slice: &[f32]) -> Self {
        let len = slice.len().min(AUDIO_CHUNK_LEN);
        let mut samples = [0.0; AUDIO_CHUNK_LEN];
        samples[..len].copy_from_slice(&slice[..len]);
        Self { samples, len }
    }

    /// The valid samples of this chunk.
    pub fn samples(&self) -> &[f32] {
        &self.samples[..self.len]
    }

    /// Number of valid samples.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the chunk carries no samples.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Engine-to-editor feedback, drained by the control thread between UI
/// updates.
#[derive(Debug, Clone)]
pub enum Feedback {
    /// Playhead position after the most recent block, sent while playing.
    PlayPos {
        /// Position in seconds.
        seconds: f64,
    },
    /// Samples tapped at a probe node during the most recent block.
    AudioData {
        /// The probe node.
        node: NodeId,
        /// The tapped samples.
        chunk: AudioChunk,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_truncates_to_capacity() {
        let long = vec![1.0; AUDIO_CHUNK_LEN * 2];
        let chunk = AudioChunk::from_slice(&long);
        assert_eq!(chunk.len(), AUDIO_CHUNK_LEN);
        assert!(chunk.samples().iter().all(|&s| s == 1.0));
    }

    #[test]
    fn test_chunk_keeps_short_runs_short() {
        let chunk = AudioChunk::from_slice(&[0.5, 0.25]);
        assert_eq!(chunk.samples(), &[0.5, 0.25]);
        assert!(!chunk.is_empty());
    }

    #[test]
    fn test_command_serde_round_trip() {
        let cmd = EngineCommand::SetParam {
            node: NodeId(3),
            index: 1,
            value: 0.5,
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"set_param\""));
        let back: EngineCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
    }
}
