//! Graph → schedule compilation.
//!
//! Compilation happens on the editing thread, away from audio. It lowers
//! the patch to a dependency graph, splits every delay node into a read and
//! a write half so feedback loops become schedulable, orders the result
//! with a deterministic topological sort, and resolves every port to a
//! concrete slot. The output is a [`Schedule`] the engine can execute with
//! zero allocation.
//!
//! # Delay splitting
//!
//! A delay's output depends only on *past* blocks, never on its input in
//! the current one. Lowering exploits that: consumers of the delay's
//! output hang off its read half, which has no dependencies at all, while
//! the write half depends on whatever feeds the delay. A loop through a
//! delay therefore arrives here already broken open; a loop avoiding every
//! delay stays cyclic and is reported as [`CompileError::FeedbackCycle`].
//!
//! # Determinism
//!
//! Ready vertices are drained through a min-heap keyed on (node id, half),
//! read halves before write halves. Equal graphs compile to equal
//! schedules, which keeps undo/redo, tests, and schedule swaps honest.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use parche_registry::{NodeType, PortSpec};

use crate::config::EngineConfig;
use crate::error::CompileError;
use crate::model::PatchGraph;
use crate::node::NodeId;
use crate::schedule::{
    DelaySpec, InputSource, MAX_STEP_INPUTS, MAX_STEP_OUTPUTS, ParamSlot, Schedule, SlotRange,
    Step, StepKind,
};

/// The node type the compiler splits into a write/read pair.
const DELAY_TYPE: &str = "delay";
/// Node types lowered to engine-internal step kinds instead of processors.
const OUTPUT_TYPE: &str = "audio_out";
const PROBE_TYPE: &str = "scope";
/// Registry names of the two delay halves.
const DELAY_READ_TYPE: &str = "delay_read";
const DELAY_WRITE_TYPE: &str = "delay_write";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VertexKind {
    Whole,
    DelayRead,
    DelayWrite,
}

/// A schedulable unit: a plain node, or one half of a split delay.
#[derive(Debug, Clone, Copy)]
struct Vertex {
    node: NodeId,
    kind: VertexKind,
}

impl Vertex {
    /// Heap key: ascending node id, read half ahead of write half.
    fn key(self) -> (u64, u8) {
        let rank = match self.kind {
            VertexKind::Whole | VertexKind::DelayRead => 0,
            VertexKind::DelayWrite => 1,
        };
        (self.node.0, rank)
    }
}

/// The dependency graph compilation runs over.
struct Lowered {
    vertices: Vec<Vertex>,
    /// Successor lists; parallel edges are kept, the sort counts them.
    edges: Vec<Vec<usize>>,
    in_degree: Vec<usize>,
}

/// Compile a patch into an executable schedule.
///
/// Fails only on a feedback loop that avoids every delay node. Everything
/// else is schedulable, including an empty graph and disconnected nodes.
pub fn compile(graph: &PatchGraph, config: &EngineConfig) -> Result<Schedule, CompileError> {
    let lowered = lower(graph);
    let order = kahn_sort(&lowered)?;

    // Who feeds each input port. Input-port exclusivity makes this a map.
    let mut feeder: BTreeMap<(NodeId, &str), (NodeId, &str)> = BTreeMap::new();
    for c in graph.connections() {
        feeder.insert((c.dst, c.dst_port.as_str()), (c.src, c.src_port.as_str()));
    }

    let registry = graph.registry();
    let mut steps = Vec::with_capacity(order.len());
    let mut slot_count = 0usize;
    let mut out_slot: BTreeMap<(NodeId, &str), usize> = BTreeMap::new();
    let mut params: Vec<f32> = Vec::new();
    let mut param_index: Vec<ParamSlot> = Vec::new();
    let mut delays: Vec<DelaySpec> = Vec::new();
    let mut ring_of: BTreeMap<NodeId, usize> = BTreeMap::new();
    // A delay's parameters are emitted with its read half; the write half
    // comes later in the order and points back at them.
    let mut delay_param_base: BTreeMap<NodeId, usize> = BTreeMap::new();
    let mut proc_count = 0usize;

    for &v in &order {
        let vertex = lowered.vertices[v];
        let node = graph
            .node(vertex.node)
            .expect("scheduled vertex refers to a live node");
        let ty = registry
            .get(&node.type_name)
            .expect("node type was resolved at creation");

        match vertex.kind {
            VertexKind::Whole => {
                let param_base = params.len();
                for (index, spec) in ty.params.iter().enumerate() {
                    let value = node.params.get(spec.name).copied().unwrap_or(spec.default);
                    params.push(value);
                    param_index.push(ParamSlot {
                        node: node.id,
                        index,
                        slot: param_base + index,
                    });
                }
                let mut inputs = Vec::with_capacity(ty.inputs.len());
                for port in ty.inputs {
                    inputs.push(resolve_input(node.id, port, ty, param_base, &feeder, &out_slot));
                }
                debug_assert!(inputs.len() <= MAX_STEP_INPUTS);
                debug_assert!(ty.outputs.len() <= MAX_STEP_OUTPUTS);
                let outputs = SlotRange {
                    first: slot_count,
                    count: ty.outputs.len(),
                };
                for out in ty.outputs {
                    out_slot.insert((node.id, out), slot_count);
                    slot_count += 1;
                }
                let kind = match ty.name {
                    OUTPUT_TYPE => StepKind::Output,
                    PROBE_TYPE => StepKind::Probe,
                    _ => {
                        let proc = proc_count;
                        proc_count += 1;
                        StepKind::Node { proc }
                    }
                };
                steps.push(Step {
                    node: node.id,
                    type_name: ty.name,
                    kind,
                    inputs,
                    outputs,
                    param_base,
                    param_count: ty.params.len(),
                });
            }
            VertexKind::DelayRead => {
                let ring = ring_index(&mut delays, &mut ring_of, node.id, config);
                let param_base = params.len();
                delay_param_base.insert(node.id, param_base);
                for (index, spec) in ty.params.iter().enumerate() {
                    let value = node.params.get(spec.name).copied().unwrap_or(spec.default);
                    params.push(value);
                    param_index.push(ParamSlot {
                        node: node.id,
                        index,
                        slot: param_base + index,
                    });
                }
                // The read's one input is the live time parameter.
                let time = ty
                    .param_index("time")
                    .map(|i| InputSource::Param(param_base + i))
                    .unwrap_or(InputSource::Constant(0.0));
                let outputs = SlotRange {
                    first: slot_count,
                    count: ty.outputs.len(),
                };
                for out in ty.outputs {
                    out_slot.insert((node.id, out), slot_count);
                    slot_count += 1;
                }
                steps.push(Step {
                    node: node.id,
                    type_name: DELAY_READ_TYPE,
                    kind: StepKind::DelayRead { ring },
                    inputs: vec![time],
                    outputs,
                    param_base,
                    param_count: ty.params.len(),
                });
            }
            VertexKind::DelayWrite => {
                let ring = ring_index(&mut delays, &mut ring_of, node.id, config);
                // Read halves are unblocked from the start, so the read was
                // already emitted and its parameter base recorded.
                let param_base = delay_param_base.get(&node.id).copied().unwrap_or(params.len());
                let mut inputs = Vec::with_capacity(ty.inputs.len());
                for port in ty.inputs {
                    inputs.push(resolve_input(node.id, port, ty, param_base, &feeder, &out_slot));
                }
                steps.push(Step {
                    node: node.id,
                    type_name: DELAY_WRITE_TYPE,
                    kind: StepKind::DelayWrite { ring },
                    inputs,
                    outputs: SlotRange {
                        first: slot_count,
                        count: 0,
                    },
                    param_base,
                    param_count: 0,
                });
            }
        }
    }

    param_index.sort_unstable_by_key(|p| (p.node, p.index));
    tracing::debug!(
        "compile: {} steps, {} slots, {} params, {} delay rings",
        steps.len(),
        slot_count,
        params.len(),
        delays.len()
    );
    Ok(Schedule {
        steps,
        slot_count,
        params,
        param_index,
        delays,
    })
}

/// Resolve one input port: connected ports read their producer's slot,
/// unconnected ports fall back to the same-name parameter if the type
/// declares one, and otherwise to the port's constant default.
fn resolve_input(
    node: NodeId,
    port: &PortSpec,
    ty: &NodeType,
    param_base: usize,
    feeder: &BTreeMap<(NodeId, &str), (NodeId, &str)>,
    out_slot: &BTreeMap<(NodeId, &str), usize>,
) -> InputSource {
    if let Some(&(src, src_port)) = feeder.get(&(node, port.name)) {
        // Topological order: the producer's output slot already exists.
        return InputSource::Slot(out_slot[&(src, src_port)]);
    }
    if let Some(index) = ty.param_index(port.name) {
        return InputSource::Param(param_base + index);
    }
    InputSource::Constant(port.default)
}

fn ring_index(
    delays: &mut Vec<DelaySpec>,
    ring_of: &mut BTreeMap<NodeId, usize>,
    node: NodeId,
    config: &EngineConfig,
) -> usize {
    *ring_of.entry(node).or_insert_with(|| {
        delays.push(DelaySpec {
            node,
            capacity: config.delay_ring_capacity(),
        });
        delays.len() - 1
    })
}

/// Lower the patch to its dependency graph, splitting delays in two.
fn lower(graph: &PatchGraph) -> Lowered {
    let mut vertices = Vec::new();
    // Vertex producing a node's outputs / consuming its inputs.
    let mut out_vertex: BTreeMap<NodeId, usize> = BTreeMap::new();
    let mut in_vertex: BTreeMap<NodeId, usize> = BTreeMap::new();
    for node in graph.nodes() {
        if node.type_name == DELAY_TYPE {
            out_vertex.insert(node.id, vertices.len());
            vertices.push(Vertex {
                node: node.id,
                kind: VertexKind::DelayRead,
            });
            in_vertex.insert(node.id, vertices.len());
            vertices.push(Vertex {
                node: node.id,
                kind: VertexKind::DelayWrite,
            });
        } else {
            out_vertex.insert(node.id, vertices.len());
            in_vertex.insert(node.id, vertices.len());
            vertices.push(Vertex {
                node: node.id,
                kind: VertexKind::Whole,
            });
        }
    }
    let mut edges = vec![Vec::new(); vertices.len()];
    let mut in_degree = vec![0usize; vertices.len()];
    for c in graph.connections() {
        let from = out_vertex[&c.src];
        let to = in_vertex[&c.dst];
        edges[from].push(to);
        in_degree[to] += 1;
    }
    Lowered {
        vertices,
        edges,
        in_degree,
    }
}

/// Kahn's algorithm with a min-heap over vertex keys.
fn kahn_sort(lowered: &Lowered) -> Result<Vec<usize>, CompileError> {
    let mut in_degree = lowered.in_degree.clone();
    let mut ready = BinaryHeap::new();
    for (v, &degree) in in_degree.iter().enumerate() {
        if degree == 0 {
            ready.push(Reverse((lowered.vertices[v].key(), v)));
        }
    }
    let mut order = Vec::with_capacity(lowered.vertices.len());
    while let Some(Reverse((_, v))) = ready.pop() {
        order.push(v);
        for &succ in &lowered.edges[v] {
            in_degree[succ] -= 1;
            if in_degree[succ] == 0 {
                ready.push(Reverse((lowered.vertices[succ].key(), succ)));
            }
        }
    }
    if order.len() == lowered.vertices.len() {
        Ok(order)
    } else {
        Err(CompileError::FeedbackCycle {
            nodes: cycle_members(lowered, &in_degree),
        })
    }
}

/// Dig an actual cycle out of the vertices Kahn's algorithm left blocked.
///
/// The remainder is every cycle plus the acyclic tails hanging downstream
/// of one; a depth-first walk restricted to the remainder finds the first
/// loop by ascending node id. Delay halves never appear here, since reads
/// have no dependencies and writes no dependents.
fn cycle_members(lowered: &Lowered, in_degree: &[usize]) -> Vec<NodeId> {
    const WHITE: u8 = 0;

    let remaining: Vec<bool> = in_degree.iter().map(|&d| d > 0).collect();
    let mut color = vec![WHITE; lowered.vertices.len()];
    let mut stack = Vec::new();
    for start in 0..lowered.vertices.len() {
        if remaining[start]
            && color[start] == WHITE
            && let Some(mut nodes) = dfs_cycle(lowered, &remaining, &mut color, &mut stack, start)
        {
            nodes.sort_unstable();
            nodes.dedup();
            return nodes;
        }
    }
    // A blocked remainder always contains a cycle; not reached.
    Vec::new()
}

fn dfs_cycle(
    lowered: &Lowered,
    remaining: &[bool],
    color: &mut [u8],
    stack: &mut Vec<usize>,
    v: usize,
) -> Option<Vec<NodeId>> {
    const WHITE: u8 = 0;
    const GRAY: u8 = 1;
    const BLACK: u8 = 2;

    color[v] = GRAY;
    stack.push(v);
    for &succ in &lowered.edges[v] {
        if !remaining[succ] {
            continue;
        }
        if color[succ] == GRAY {
            // Back edge: the loop is the stack from succ down to v.
            let from = stack.iter().position(|&s| s == succ).unwrap_or(0);
            return Some(
                stack[from..]
                    .iter()
                    .map(|&s| lowered.vertices[s].node)
                    .collect(),
            );
        }
        if color[succ] == WHITE
            && let Some(found) = dfs_cycle(lowered, remaining, color, stack, succ)
        {
            return Some(found);
        }
    }
    stack.pop();
    color[v] = BLACK;
    None
}
