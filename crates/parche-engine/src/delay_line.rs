//! Mono ring buffer backing one delay node.
//!
//! A compiled schedule gives every delay node one ring. Because the node is
//! split, the ring is touched twice per block: the read half copies a block
//! out at the requested delay, the write half copies the node's input in at
//! the head. Neither call moves the head; [`DelayLine::advance`] does that
//! once per block after every step has run, so the two halves see a
//! consistent position no matter where they land in the schedule.

/// Ring buffer with block-granular access.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buf: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    /// Create a ring holding `capacity` samples of zeroed history.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "delay ring needs a nonzero capacity");
        Self {
            buf: vec![0.0; capacity],
            write_pos: 0,
        }
    }

    /// Samples of history the ring can hold.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Copy one block into the ring at the head. Does not advance.
    pub fn write_block(&mut self, input: &[f32]) {
        let len = self.buf.len();
        for (i, &sample) in input.iter().enumerate() {
            self.buf[(self.write_pos + i) % len] = sample;
        }
    }

    /// Fill one block's worth of positions at the head with a constant.
    /// Does not advance.
    pub fn fill_block(&mut self, value: f32, frames: usize) {
        let len = self.buf.len();
        for i in 0..frames {
            self.buf[(self.write_pos + i) % len] = value;
        }
    }

    /// Copy `output.len()` samples delayed by `delay_samples` out of the
    /// ring.
    ///
    /// The delay is clamped to at least one block so the read never
    /// overlaps the block currently being written, and to at most
    /// `capacity - frames` so it never wraps into it from behind. A patch
    /// asking for less than a block of delay gets exactly one block.
    pub fn read_block(&self, delay_samples: usize, output: &mut [f32]) {
        let len = self.buf.len();
        let frames = output.len();
        let max_d = len.saturating_sub(frames).max(1);
        let d = delay_samples.clamp(frames.min(max_d), max_d);
        for (i, out) in output.iter_mut().enumerate() {
            *out = self.buf[(self.write_pos + i + len - d) % len];
        }
    }

    /// Move the head past one block. Call once per block after both halves
    /// ran.
    pub fn advance(&mut self, frames: usize) {
        self.write_pos = (self.write_pos + frames) % self.buf.len();
    }

    /// Zero the history, keeping the head position.
    pub fn reset(&mut self) {
        self.buf.fill(0.0);
    }
}
