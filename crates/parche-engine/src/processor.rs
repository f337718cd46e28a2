//! The seam between schedule execution and per-node DSP.
//!
//! The engine owns step order, routing, delay rings, and the parameter
//! table; what happens inside one node's block stays behind
//! [`BlockProcessor`]. Implementations come from the embedder through a
//! [`ProcessorFactory`], which is consulted once per node when a schedule
//! generation is built, never on the audio thread.

/// One resolved step input for the current block.
#[derive(Debug, Clone, Copy)]
pub enum InputRef<'a> {
    /// The same value for every frame: an unconnected port's default or a
    /// parameter-table entry.
    Scalar(f32),
    /// One value per frame, borrowed from the producing step's output slot.
    Buffer(&'a [f32]),
}

impl InputRef<'_> {
    /// Value of this input at frame `i`.
    #[inline]
    pub fn sample(&self, i: usize) -> f32 {
        match self {
            InputRef::Scalar(v) => *v,
            InputRef::Buffer(buf) => buf[i],
        }
    }
}

/// Per-block context handed to every processor.
#[derive(Debug, Clone, Copy)]
pub struct BlockCtx<'a> {
    /// Output sample rate in Hz.
    pub sample_rate: f32,
    /// Frames in this block.
    pub frames: usize,
    /// This node's slice of the live parameter table, in declared order.
    pub params: &'a [f32],
    /// Playhead position at block start, in samples.
    pub play_pos: u64,
    /// Whether the transport is running.
    pub playing: bool,
}

/// Block DSP for one node.
///
/// `inputs` follow the node type's declared input order and always hold one
/// entry per declared port; `outputs` follow the declared output order and
/// are `ctx.frames` long. Implementations must fill every output frame.
pub trait BlockProcessor: Send {
    /// Render one block.
    fn process(&mut self, ctx: &BlockCtx<'_>, inputs: &[InputRef<'_>], outputs: &mut [&mut [f32]]);

    /// Clear internal state such as oscillator phase or filter memory.
    fn reset(&mut self) {}
}

/// Maps node type names to fresh processor instances.
///
/// Called on the editing thread while a schedule generation is assembled.
/// State carry-over across recompiles is the engine's job; a factory only
/// ever builds new instances.
pub trait ProcessorFactory: Send {
    /// Instantiate DSP for `type_name`.
    fn create(&self, type_name: &str) -> Box<dyn BlockProcessor>;
}

/// Processor that writes silence regardless of inputs.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silence;

impl BlockProcessor for Silence {
    fn process(
        &mut self,
        _ctx: &BlockCtx<'_>,
        _inputs: &[InputRef<'_>],
        outputs: &mut [&mut [f32]],
    ) {
        for out in outputs.iter_mut() {
            out.fill(0.0);
        }
    }
}

/// Factory producing [`Silence`] for every type name.
///
/// Lets the routing layer run without any DSP wired up, which is all the
/// tests here need and a reasonable stand-in for unknown types.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilenceFactory;

impl ProcessorFactory for SilenceFactory {
    fn create(&self, _type_name: &str) -> Box<dyn BlockProcessor> {
        Box::new(Silence)
    }
}
