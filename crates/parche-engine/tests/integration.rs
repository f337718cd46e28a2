//! End-to-end engine tests: schedule handoff, delay timing, live parameter
//! updates, and feedback, driven through hand-rolled block processors.

use std::sync::Arc;

use parche_engine::{
    AudioEngine, BlockCtx, BlockProcessor, EngineHandle, Feedback, InputRef, ProcessorFactory,
    ScheduleUpdate, Silence, pair,
};
use parche_graph::{
    Action, EngineConfig, InverseRecord, NodeId, NodeRegistry, PatchGraph, compile,
};

/// 100 Hz with 10-frame blocks keeps delay arithmetic readable: one block
/// is exactly 0.1 seconds.
fn small_config() -> EngineConfig {
    EngineConfig {
        sample_rate: 100,
        block_size: 10,
        max_delay_secs: 1.0,
        command_capacity: 16,
        feedback_capacity: 64,
    }
}

fn graph() -> PatchGraph {
    PatchGraph::new(Arc::new(NodeRegistry::new()))
}

fn create(graph: &mut PatchGraph, node_type: &str) -> NodeId {
    create_with(graph, node_type, &[])
}

fn create_with(graph: &mut PatchGraph, node_type: &str, params: &[(&str, f32)]) -> NodeId {
    let init = params
        .iter()
        .map(|(name, value)| ((*name).to_string(), *value))
        .collect();
    let record = graph
        .apply(&Action::CreateNode {
            node_type: node_type.to_string(),
            init_params: Some(init),
            node_id: None,
        })
        .unwrap();
    let InverseRecord::RemoveNode { id } = record else {
        panic!("unexpected inverse record");
    };
    id
}

fn connect(graph: &mut PatchGraph, src: NodeId, src_port: &str, dst: NodeId, dst_port: &str) {
    graph
        .apply(&Action::Connect {
            src_id: src,
            src_port: src_port.to_string(),
            dst_id: dst,
            dst_port: dst_port.to_string(),
        })
        .unwrap();
}

fn install(handle: &EngineHandle, graph: &PatchGraph, config: &EngineConfig) {
    let schedule = Arc::new(compile(graph, config).unwrap());
    handle.install(ScheduleUpdate::new(
        schedule,
        config.block_size,
        &TestFactory,
    ));
}

fn run(engine: &mut AudioEngine, frames: usize) -> (Vec<f32>, Vec<f32>) {
    let mut left = vec![0.0; frames];
    let mut right = vec![0.0; frames];
    engine.run_block(&mut left, &mut right);
    (left, right)
}

/// Writes its first parameter to every output frame.
struct ParamLevel;

impl BlockProcessor for ParamLevel {
    fn process(
        &mut self,
        ctx: &BlockCtx<'_>,
        _inputs: &[InputRef<'_>],
        outputs: &mut [&mut [f32]],
    ) {
        let level = ctx.params.first().copied().unwrap_or(0.0);
        for out in outputs.iter_mut() {
            out.fill(level);
        }
    }
}

/// Sums all inputs into every output frame.
struct Mix;

impl BlockProcessor for Mix {
    fn process(&mut self, ctx: &BlockCtx<'_>, inputs: &[InputRef<'_>], outputs: &mut [&mut [f32]]) {
        for out in outputs.iter_mut() {
            for i in 0..ctx.frames {
                out[i] = inputs.iter().map(|input| input.sample(i)).sum();
            }
        }
    }
}

/// Counts processed blocks and writes the count, exposing state carry-over.
#[derive(Default)]
struct BlockCounter {
    blocks: f32,
}

impl BlockProcessor for BlockCounter {
    fn process(
        &mut self,
        _ctx: &BlockCtx<'_>,
        _inputs: &[InputRef<'_>],
        outputs: &mut [&mut [f32]],
    ) {
        self.blocks += 1.0;
        for out in outputs.iter_mut() {
            out.fill(self.blocks);
        }
    }
}

struct TestFactory;

impl ProcessorFactory for TestFactory {
    fn create(&self, type_name: &str) -> Box<dyn BlockProcessor> {
        match type_name {
            "sine" | "saw" => Box::new(ParamLevel),
            "add" | "mul" => Box::new(Mix),
            "square" => Box::new(BlockCounter::default()),
            _ => Box::new(Silence),
        }
    }
}

/// source -> delay -> audio_out, with the source emitting a constant 1.0.
fn delay_patch(time: f32) -> PatchGraph {
    let mut g = graph();
    let src = create_with(&mut g, "sine", &[("freq", 1.0)]);
    let delay = create_with(&mut g, "delay", &[("time", time)]);
    let out = create(&mut g, "audio_out");
    connect(&mut g, src, "out", delay, "in");
    connect(&mut g, delay, "out", out, "left");
    g
}

#[test]
fn test_delay_arrives_after_its_time() {
    let config = small_config();
    let (handle, mut engine) = pair(&config);
    let g = delay_patch(0.2);
    install(&handle, &g, &config);

    // 0.2 s is two blocks: the source signal shows up in the third.
    let (b0, _) = run(&mut engine, 10);
    let (b1, _) = run(&mut engine, 10);
    let (b2, _) = run(&mut engine, 10);
    assert_eq!(b0, vec![0.0; 10]);
    assert_eq!(b1, vec![0.0; 10]);
    assert_eq!(b2, vec![1.0; 10]);
}

#[test]
fn test_feedback_loop_accumulates_through_delay() {
    let config = small_config();
    let (handle, mut engine) = pair(&config);

    // saw feeds one mul input, the delayed mul output feeds the other:
    // a legal cycle broken at the delay node.
    let mut g = graph();
    let src = create_with(&mut g, "saw", &[("freq", 1.0)]);
    let mix = create(&mut g, "mul");
    let delay = create_with(&mut g, "delay", &[("time", 0.2)]);
    let out = create(&mut g, "audio_out");
    connect(&mut g, src, "out", mix, "in1");
    connect(&mut g, delay, "out", mix, "in0");
    connect(&mut g, mix, "out", delay, "in");
    connect(&mut g, mix, "out", out, "left");
    install(&handle, &g, &config);

    // Every loop round-trip (two blocks) adds the source once more.
    let levels: Vec<f32> = (0..5).map(|_| run(&mut engine, 10).0[0]).collect();
    assert_eq!(levels, vec![1.0, 1.0, 2.0, 2.0, 3.0]);
}

#[test]
fn test_set_param_latches_between_blocks() {
    let config = small_config();
    let (handle, mut engine) = pair(&config);

    let mut g = graph();
    let src = create_with(&mut g, "sine", &[("freq", 440.0)]);
    let out = create(&mut g, "audio_out");
    connect(&mut g, src, "out", out, "left");
    install(&handle, &g, &config);

    let (before, _) = run(&mut engine, 10);
    assert_eq!(before, vec![440.0; 10]);

    // freq is the sine type's parameter 0.
    assert!(handle.set_param(src, 0, 880.0));
    let (after, _) = run(&mut engine, 10);
    assert_eq!(after, vec![880.0; 10]);
}

#[test]
fn test_processor_state_survives_reinstall() {
    let config = small_config();
    let (handle, mut engine) = pair(&config);

    let mut g = graph();
    let src = create(&mut g, "square");
    let out = create(&mut g, "audio_out");
    connect(&mut g, src, "out", out, "left");
    install(&handle, &g, &config);

    assert_eq!(run(&mut engine, 10).0[0], 1.0);
    assert_eq!(run(&mut engine, 10).0[0], 2.0);

    // A fresh generation would restart the counter at 1; carried state
    // keeps counting.
    install(&handle, &g, &config);
    assert_eq!(run(&mut engine, 10).0[0], 3.0);
}

#[test]
fn test_delay_history_survives_reinstall() {
    let config = small_config();
    let (handle, mut engine) = pair(&config);
    let g = delay_patch(0.2);
    install(&handle, &g, &config);

    let (b0, _) = run(&mut engine, 10);
    assert_eq!(b0, vec![0.0; 10]);

    // Swap in a recompiled schedule mid-stream; the ring keeps its history
    // and the signal still lands exactly two blocks after it entered.
    install(&handle, &g, &config);
    let (b1, _) = run(&mut engine, 10);
    let (b2, _) = run(&mut engine, 10);
    assert_eq!(b1, vec![0.0; 10]);
    assert_eq!(b2, vec![1.0; 10]);
}

#[test]
fn test_constants_and_slots_feed_processors() {
    let config = small_config();
    let (handle, mut engine) = pair(&config);

    // mul's unconnected inputs fall back to their port defaults (0.0 and
    // 1.0); connecting the source replaces only in0.
    let mut g = graph();
    let src = create_with(&mut g, "sine", &[("freq", 2.0)]);
    let mix = create(&mut g, "mul");
    let out = create(&mut g, "audio_out");
    connect(&mut g, src, "out", mix, "in0");
    connect(&mut g, mix, "out", out, "left");
    install(&handle, &g, &config);

    let (left, _) = run(&mut engine, 10);
    assert_eq!(left, vec![3.0; 10]);
}

#[test]
fn test_multiple_outputs_accumulate() {
    let config = small_config();
    let (handle, mut engine) = pair(&config);

    let mut g = graph();
    let a = create_with(&mut g, "sine", &[("freq", 1.0)]);
    let b = create_with(&mut g, "sine", &[("freq", 2.0)]);
    let out_a = create(&mut g, "audio_out");
    let out_b = create(&mut g, "audio_out");
    connect(&mut g, a, "out", out_a, "left");
    connect(&mut g, b, "out", out_b, "left");
    install(&handle, &g, &config);

    let (left, right) = run(&mut engine, 10);
    assert_eq!(left, vec![3.0; 10]);
    assert_eq!(right, vec![0.0; 10]);
}

#[test]
fn test_output_gain_scales() {
    let config = small_config();
    let (handle, mut engine) = pair(&config);

    let mut g = graph();
    let src = create_with(&mut g, "sine", &[("freq", 2.0)]);
    let out = create_with(&mut g, "audio_out", &[("gain", 0.5)]);
    connect(&mut g, src, "out", out, "left");
    install(&handle, &g, &config);

    let (left, _) = run(&mut engine, 10);
    assert_eq!(left, vec![1.0; 10]);
}

#[test]
fn test_probe_streams_chunks() {
    let config = small_config();
    let (handle, mut engine) = pair(&config);

    let mut g = graph();
    let src = create_with(&mut g, "sine", &[("freq", 0.5)]);
    let scope = create(&mut g, "scope");
    connect(&mut g, src, "out", scope, "in");
    install(&handle, &g, &config);

    run(&mut engine, 10);
    let chunks: Vec<(NodeId, Vec<f32>)> = handle
        .poll_feedback()
        .filter_map(|fb| match fb {
            Feedback::AudioData { node, chunk } => Some((node, chunk.samples().to_vec())),
            Feedback::PlayPos { .. } => None,
        })
        .collect();

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].0, scope);
    assert_eq!(chunks[0].1, vec![0.5; 10]);
}

#[test]
fn test_feedback_overflow_drops_instead_of_blocking() {
    let mut config = small_config();
    config.feedback_capacity = 2;
    let (handle, mut engine) = pair(&config);

    let mut g = graph();
    let src = create_with(&mut g, "sine", &[("freq", 1.0)]);
    let scope = create(&mut g, "scope");
    connect(&mut g, src, "out", scope, "in");
    install(&handle, &g, &config);
    handle.play();

    // Five blocks produce five positions and five chunks against a queue
    // of two; the engine must keep rendering regardless.
    for _ in 0..5 {
        run(&mut engine, 10);
    }
    assert_eq!(handle.poll_feedback().count(), 2);

    // Draining frees space for the next block's feedback.
    run(&mut engine, 10);
    assert!(handle.poll_feedback().count() > 0);
}

#[test]
fn test_unconnected_probe_sends_nothing() {
    let config = small_config();
    let (handle, mut engine) = pair(&config);

    let mut g = graph();
    create(&mut g, "scope");
    install(&handle, &g, &config);

    run(&mut engine, 10);
    assert!(handle.poll_feedback().next().is_none());
}
