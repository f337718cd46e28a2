//! End-to-end tour of the parche editing loop
//!
//! Builds a delay patch from JSON actions, renders it by driving the audio
//! engine inline, edits a parameter on the running patch, and walks the
//! undo history. A minimal oscillator factory stands in for an embedder's
//! real DSP.
//!
//! Run with: cargo run --example patch_demo
//! Set RUST_LOG=debug to watch the editing traffic.

use std::sync::Arc;

use parche_editor::Editor;
use parche_engine::{AudioEngine, BlockCtx, BlockProcessor, InputRef, ProcessorFactory, Silence};
use parche_graph::{Action, CompileError, EngineConfig, NodeRegistry};
use tracing_subscriber::EnvFilter;

/// Phase-accumulating sine driven by its `freq` input and `amp` parameter.
struct SineOsc {
    phase: f32,
}

impl BlockProcessor for SineOsc {
    fn process(
        &mut self,
        ctx: &BlockCtx<'_>,
        inputs: &[InputRef<'_>],
        outputs: &mut [&mut [f32]],
    ) {
        let amp = ctx.params.get(1).copied().unwrap_or(1.0);
        let Some(out) = outputs.first_mut() else {
            return;
        };
        for i in 0..ctx.frames {
            let freq = inputs.first().map_or(440.0, |input| input.sample(i));
            out[i] = (self.phase * std::f32::consts::TAU).sin() * amp;
            self.phase = (self.phase + freq / ctx.sample_rate).fract();
        }
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}

struct DemoFactory;

impl ProcessorFactory for DemoFactory {
    fn create(&self, type_name: &str) -> Box<dyn BlockProcessor> {
        match type_name {
            "sine" | "saw" => Box::new(SineOsc { phase: 0.0 }),
            _ => Box::new(Silence),
        }
    }
}

fn dispatch_json(editor: &mut Editor, json: &str) -> parche_editor::Dispatched {
    let action: Action = serde_json::from_str(json).expect("demo action parses");
    editor.dispatch(action).expect("demo action applies")
}

/// Render one second of audio and report what came out.
fn render_second(editor: &mut Editor, engine: &mut AudioEngine) -> (f32, f32) {
    let block = engine.block_size();
    let blocks = engine.sample_rate() as usize / block;
    let mut left = vec![0.0; block];
    let mut right = vec![0.0; block];
    let mut sum_sq = 0.0f32;
    let mut peak = 0.0f32;
    for _ in 0..blocks {
        engine.run_block(&mut left, &mut right);
        for &s in &left {
            sum_sq += s * s;
            peak = peak.max(s.abs());
        }
        editor.pump();
    }
    let rms = (sum_sq / (blocks * block) as f32).sqrt();
    (rms, peak)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    println!("Parche Patch Demo");
    println!("=================\n");

    let config = EngineConfig::default();
    let (mut editor, mut engine) = Editor::new(
        config,
        Arc::new(NodeRegistry::new()),
        Box::new(DemoFactory),
    )
    .expect("default config is valid");

    // 1. Build a patch from JSON actions, the same wire format a UI speaks.
    println!("1. Building a Patch from JSON Actions");
    println!("--------------------------------------");

    let sine = dispatch_json(
        &mut editor,
        r#"{"type": "create_node", "node_type": "sine", "init_params": {"freq": 220.0, "amp": 0.5}}"#,
    )
    .created
    .expect("create returns the new id");
    let delay = dispatch_json(
        &mut editor,
        r#"{"type": "create_node", "node_type": "delay", "init_params": {"time": 0.25}}"#,
    )
    .created
    .expect("create returns the new id");
    let out = dispatch_json(
        &mut editor,
        r#"{"type": "create_node", "node_type": "audio_out"}"#,
    )
    .created
    .expect("create returns the new id");
    let scope = dispatch_json(
        &mut editor,
        r#"{"type": "create_node", "node_type": "scope"}"#,
    )
    .created
    .expect("create returns the new id");

    for (src, src_port, dst, dst_port) in [
        (sine, "out", delay, "in"),
        (delay, "out", out, "left"),
        (delay, "out", out, "right"),
        (sine, "out", scope, "in"),
    ] {
        let json = format!(
            r#"{{"type": "connect", "src_id": {}, "src_port": "{src_port}", "dst_id": {}, "dst_port": "{dst_port}"}}"#,
            src.0, dst.0
        );
        dispatch_json(&mut editor, &json);
    }

    let schedule = editor.schedule().expect("patch compiles");
    println!("Patch: sine -> delay -> audio_out, scope on the sine");
    println!(
        "Schedule: {} steps, {} slots, {} delay ring(s)\n",
        schedule.step_count(),
        schedule.slot_count(),
        schedule.delays().len()
    );

    // 2. Render by driving the engine inline, the way an audio callback
    // would, and pump feedback back into the editor.
    println!("2. Rendering One Second");
    println!("-----------------------");

    editor.dispatch(Action::Play).expect("play dispatches");
    let (rms, peak) = render_second(&mut editor, &mut engine);
    println!("220 Hz sine through 0.25 s delay");
    println!("Output RMS: {rms:.4}");
    println!("Peak: {peak:.4}");
    println!("Play position: {:.3} s", editor.play_pos());
    println!(
        "Scope history: {} samples\n",
        editor.viz(scope).map_or(0, |v| v.len())
    );

    // 3. Edit a parameter on the running patch; no recompile happens.
    println!("3. Live Parameter Edit");
    println!("----------------------");

    let result = dispatch_json(
        &mut editor,
        &format!(
            r#"{{"type": "set_param", "id": {}, "param": "freq", "value": 880.0}}"#,
            sine.0
        ),
    );
    println!("Set freq to 880 Hz (recompiled: {})", result.recompiled);
    let (rms, peak) = render_second(&mut editor, &mut engine);
    println!("Output RMS: {rms:.4}");
    println!("Peak: {peak:.4}");
    println!("Play position: {:.3} s\n", editor.play_pos());

    // 4. Walk the history. Undoing the parameter edit re-syncs the engine;
    // undoing a connect rebuilds the schedule.
    println!("4. Undo and Redo");
    println!("----------------");

    editor.dispatch(Action::Undo).expect("undo the param edit");
    println!(
        "Undid the param edit: freq is {} Hz again",
        editor
            .graph()
            .node(sine)
            .and_then(|n| n.params.get("freq"))
            .copied()
            .unwrap_or_default()
    );
    editor.dispatch(Action::Undo).expect("undo the scope tap");
    println!(
        "Undid the scope tap: {} connections left, can_redo = {}",
        editor.graph().connection_count(),
        editor.can_redo()
    );
    editor.dispatch(Action::Redo).expect("redo the scope tap");
    println!(
        "Redid it: {} connections, schedule has {} steps\n",
        editor.graph().connection_count(),
        editor.schedule().map_or(0, |s| s.step_count())
    );

    // 5. Edits that cannot compile still stand; the engine keeps the last
    // good schedule until the graph is fixed.
    println!("5. A Feedback Loop Without a Delay");
    println!("-----------------------------------");

    let a = dispatch_json(&mut editor, r#"{"type": "create_node", "node_type": "add"}"#)
        .created
        .expect("create returns the new id");
    let b = dispatch_json(&mut editor, r#"{"type": "create_node", "node_type": "add"}"#)
        .created
        .expect("create returns the new id");
    dispatch_json(
        &mut editor,
        &format!(
            r#"{{"type": "connect", "src_id": {}, "src_port": "out", "dst_id": {}, "dst_port": "in0"}}"#,
            a.0, b.0
        ),
    );
    let result = editor
        .dispatch(Action::Connect {
            src_id: b,
            src_port: "out".to_string(),
            dst_id: a,
            dst_port: "in0".to_string(),
        })
        .expect("the edit itself is legal");
    match result.compile_error {
        Some(CompileError::FeedbackCycle { nodes }) => {
            println!("Compile rejected the loop through {} node(s)", nodes.len());
        }
        None => println!("unexpected: the loop compiled"),
    }
    println!("The connection stands; undoing it recompiles cleanly.");
    let result = editor.dispatch(Action::Undo).expect("undo the bad connect");
    println!(
        "After undo: recompiled = {}, clean = {}",
        result.recompiled,
        result.compile_error.is_none()
    );
}
