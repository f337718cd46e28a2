//! Block-granular transport state owned by the audio engine.

/// Play state and playhead, advanced once per rendered block.
///
/// The playhead is kept in samples so block arithmetic stays exact; seconds
/// only appear at the seam to the editor.
#[derive(Debug, Clone, Copy)]
pub struct Transport {
    playing: bool,
    pos_samples: u64,
    sample_rate: u32,
}

impl Transport {
    /// A stopped transport at position zero.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            playing: false,
            pos_samples: 0,
            sample_rate,
        }
    }

    /// Whether the playhead advances.
    pub fn playing(&self) -> bool {
        self.playing
    }

    /// Start advancing from the current position.
    pub fn play(&mut self) {
        self.playing = true;
    }

    /// Stop advancing, keeping the current position.
    pub fn stop(&mut self) {
        self.playing = false;
    }

    /// Move the playhead to an absolute time; negative times clamp to zero.
    pub fn seek_seconds(&mut self, time: f64) {
        let t = time.max(0.0);
        self.pos_samples = (t * f64::from(self.sample_rate)).round() as u64;
    }

    /// Playhead position in samples.
    pub fn pos_samples(&self) -> u64 {
        self.pos_samples
    }

    /// Playhead position in seconds.
    pub fn pos_seconds(&self) -> f64 {
        self.pos_samples as f64 / f64::from(self.sample_rate)
    }

    /// Move past one block if playing.
    pub fn advance(&mut self, frames: usize) {
        if self.playing {
            self.pos_samples += frames as u64;
        }
    }
}
