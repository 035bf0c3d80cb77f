//! Criterion benchmarks for the graph processor's per-block render.
//!
//! Run with: cargo bench -p sonido-session

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sonido_session::graph::{Graph, GraphProcessor, NodeKind, PortKind};
use sonido_session::plugin_adapters::PolySynthPlugin;
use sonido_session::{HostHandle, JobPool, LiveKeyState, PluginTable, SessionConfig, SharedState, StateSnapshot};

const SAMPLE_RATE: f64 = 48_000.0;
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512, 1024];

fn build_track_session(tracks: usize, max_frames: usize) -> (GraphProcessor, StateSnapshot) {
    let mut graph = Graph::new(max_frames);
    let mixer = graph.add_node(NodeKind::Mixer);
    let master = graph.add_node(NodeKind::Master);

    let mut plugins = PluginTable::new();
    let mut snapshot = StateSnapshot::empty(tracks, 1);

    for t in 0..tracks {
        let note_source = graph.add_node(NodeKind::NoteSource { track: t });
        let synth = graph.add_node(NodeKind::Synth { track: t });
        let gain = graph.add_node(NodeKind::Gain { track: t });
        graph.connect(note_source, synth, PortKind::Events).unwrap();
        graph.connect(synth, gain, PortKind::Audio).unwrap();
        graph.connect(gain, mixer, PortKind::Audio).unwrap();

        let plugin_id = plugins.insert(Box::new(PolySynthPlugin::new(SAMPLE_RATE as f32)));
        snapshot.track_plugins[t] = Some(plugin_id);
        let mut keys = LiveKeyState::default();
        keys.held[60 + (t % 24)] = true;
        keys.velocity[60 + (t % 24)] = 0.9;
        snapshot.live_keys[t] = keys;
    }
    graph.connect(mixer, master, PortKind::Audio).unwrap();
    graph.prepare().unwrap();

    snapshot.playing = true;
    let shared = SharedState::new(graph.node_count());
    let host = HostHandle::new(shared.clone());
    let mut config = SessionConfig::default();
    config.parallel_threshold = 100; // sequential dispatch for the baseline benchmarks
    let processor = GraphProcessor::new(graph, plugins, shared, host, None, config, SAMPLE_RATE);
    (processor, snapshot)
}

fn bench_single_track_block_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("GraphProcessor_SingleTrack");

    for &block_size in BLOCK_SIZES {
        let (mut processor, snapshot) = build_track_session(1, 1024.max(block_size));
        group.bench_with_input(BenchmarkId::from_parameter(block_size), &block_size, |b, &size| {
            b.iter(|| {
                processor.process_block(&snapshot, size);
                black_box(processor.master_output().unwrap().left()[0]);
            })
        });
    }

    group.finish();
}

fn bench_sequential_synth_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("GraphProcessor_SequentialSynthScaling");
    let block_size = 256;

    for &track_count in &[1usize, 2, 4, 8, 16] {
        let (mut processor, snapshot) = build_track_session(track_count, block_size);
        group.bench_with_input(
            BenchmarkId::from_parameter(track_count),
            &track_count,
            |b, _| {
                b.iter(|| {
                    processor.process_block(&snapshot, block_size);
                    black_box(processor.master_output().unwrap().left()[0]);
                })
            },
        );
    }

    group.finish();
}

fn bench_parallel_vs_sequential_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("GraphProcessor_ParallelVsSequential");
    let block_size = 256;
    let track_count = 8;

    group.bench_function("sequential", |b| {
        let (mut processor, snapshot) = build_track_session(track_count, block_size);
        b.iter(|| {
            processor.process_block(&snapshot, block_size);
            black_box(processor.master_output().unwrap().left()[0]);
        })
    });

    group.bench_function("parallel", |b| {
        let mut graph = Graph::new(block_size);
        let mixer = graph.add_node(NodeKind::Mixer);
        let master = graph.add_node(NodeKind::Master);
        let mut plugins = PluginTable::new();
        let mut snapshot = StateSnapshot::empty(track_count, 1);
        for t in 0..track_count {
            let note_source = graph.add_node(NodeKind::NoteSource { track: t });
            let synth = graph.add_node(NodeKind::Synth { track: t });
            let gain = graph.add_node(NodeKind::Gain { track: t });
            graph.connect(note_source, synth, PortKind::Events).unwrap();
            graph.connect(synth, gain, PortKind::Audio).unwrap();
            graph.connect(gain, mixer, PortKind::Audio).unwrap();
            let plugin_id = plugins.insert(Box::new(PolySynthPlugin::new(SAMPLE_RATE as f32)));
            snapshot.track_plugins[t] = Some(plugin_id);
            let mut keys = LiveKeyState::default();
            keys.held[60 + (t % 24)] = true;
            keys.velocity[60 + (t % 24)] = 0.9;
            snapshot.live_keys[t] = keys;
        }
        graph.connect(mixer, master, PortKind::Audio).unwrap();
        graph.prepare().unwrap();
        snapshot.playing = true;

        let shared = SharedState::new(graph.node_count());
        let host = HostHandle::new(shared.clone());
        let mut config = SessionConfig::default();
        config.parallel_threshold = 1;
        let jobs = std::sync::Arc::new(JobPool::new(4, 4));
        let mut processor = GraphProcessor::new(graph, plugins, shared, host, Some(jobs), config, SAMPLE_RATE);

        b.iter(|| {
            processor.process_block(&snapshot, block_size);
            black_box(processor.master_output().unwrap().left()[0]);
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_single_track_block_sizes,
    bench_sequential_synth_scaling,
    bench_parallel_vs_sequential_dispatch,
);
criterion_main!(benches);
