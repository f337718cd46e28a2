//! The compiled form of a patch: a linear program over preallocated slots.
//!
//! A [`Schedule`] is what the compiler hands the audio engine. It contains
//! no graph structure at all, just an ordered step list where every input
//! has already been resolved to a constant, a parameter slot, or the output
//! slot of an earlier step. The engine walks the steps once per block and
//! never consults the graph, the registry, or an allocator.

use crate::node::NodeId;

/// Upper bound on inputs a single step may carry.
///
/// Lets the engine resolve inputs into a fixed-size array on the stack
/// instead of allocating per step. The widest builtin type has two inputs,
/// so there is generous headroom.
pub const MAX_STEP_INPUTS: usize = 8;

/// Upper bound on output slots a single step may carry.
pub const MAX_STEP_OUTPUTS: usize = 4;

/// Where one step input gets its samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputSource {
    /// A fixed value, one per frame. Unconnected ports with no same-name
    /// parameter resolve here, to the port's declared default.
    Constant(f32),
    /// A live parameter slot in the schedule's parameter table, one value
    /// per frame. Unconnected ports whose type declares a parameter of the
    /// same name resolve here.
    Param(usize),
    /// The output slot of an earlier step, one buffer of samples.
    Slot(usize),
}

/// What the engine does when it reaches a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Run a DSP processor. `proc` indexes the processor bank built
    /// alongside the schedule, in step order.
    Node {
        /// Index into the processor bank.
        proc: usize,
    },
    /// Push the step's single input into a delay ring buffer.
    DelayWrite {
        /// Index into the schedule's delay ring list.
        ring: usize,
    },
    /// Read from a delay ring buffer behind its write position. Has no
    /// slot inputs by construction, which is what lets a delay sit on a
    /// feedback loop.
    DelayRead {
        /// Index into the schedule's delay ring list.
        ring: usize,
    },
    /// Accumulate the step's inputs onto the master stereo bus.
    Output,
    /// Stream the step's input to the editor as visualization chunks.
    Probe,
}

/// A contiguous run of output slots.
///
/// A step's outputs are always adjacent and sit past every slot an earlier
/// step produced, so the engine can split its flat slot storage at
/// `first` and hand the step disjoint read and write halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRange {
    /// First slot of the run.
    pub first: usize,
    /// Number of slots.
    pub count: usize,
}

/// One entry in the schedule's sorted parameter index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSlot {
    /// Node the parameter belongs to.
    pub node: NodeId,
    /// Position in the node type's parameter list.
    pub index: usize,
    /// Slot in the schedule's parameter table.
    pub slot: usize,
}

/// A delay node's ring buffer requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelaySpec {
    /// The delay node this ring belongs to. Carried so a schedule swap can
    /// hand surviving delays their old buffer contents.
    pub node: NodeId,
    /// Ring capacity in frames.
    pub capacity: usize,
}

/// One unit of work per block.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// The graph node this step was lowered from. Delay nodes produce two
    /// steps sharing one id.
    pub node: NodeId,
    /// Registry type name of the step, e.g. `"sine"` or `"delay_read"`.
    pub type_name: &'static str,
    /// What to do.
    pub kind: StepKind,
    /// Resolved input sources, in the type's declared port order.
    pub inputs: Vec<InputSource>,
    /// Output slots this step fills.
    pub outputs: SlotRange,
    /// First entry of this step's parameters in the parameter table.
    pub param_base: usize,
    /// Number of parameters, contiguous from `param_base`.
    pub param_count: usize,
}

/// An executable schedule plus the tables the engine runs it against.
///
/// Equality compares every table, so two compilations of the same graph can
/// be asserted identical.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schedule {
    pub(crate) steps: Vec<Step>,
    pub(crate) slot_count: usize,
    pub(crate) params: Vec<f32>,
    pub(crate) param_index: Vec<ParamSlot>,
    pub(crate) delays: Vec<DelaySpec>,
}

impl Schedule {
    /// The ordered steps.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Number of steps.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Total output slots across all steps.
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// The parameter table: each node's parameter values at compile time,
    /// in step order. The engine copies this once and then patches it from
    /// `SetParam` commands.
    pub fn params(&self) -> &[f32] {
        &self.params
    }

    /// Resolve (node, parameter position) to a parameter table slot.
    ///
    /// The index is sorted, so this is a binary search and safe to call on
    /// the audio thread.
    pub fn param_slot(&self, node: NodeId, index: usize) -> Option<usize> {
        self.param_index
            .binary_search_by_key(&(node, index), |p| (p.node, p.index))
            .ok()
            .map(|i| self.param_index[i].slot)
    }

    /// Ring buffer requirements, one per delay node, in first-use order.
    pub fn delays(&self) -> &[DelaySpec] {
        &self.delays
    }

    /// Number of steps that need a DSP processor, which is the size of the
    /// processor bank a host must build for this schedule.
    pub fn processor_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.kind, StepKind::Node { .. }))
            .count()
    }
}
