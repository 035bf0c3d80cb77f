//! Sonido Session CLI - exercise the session graph engine from the command
//! line: build a small one-track session, drive it block by block, and
//! render the master bus to a WAV file.

use clap::{Parser, Subcommand};
use sonido_core::graph::StereoSamples;
use sonido_io::{WavSpec, write_wav_stereo};
use sonido_session::graph::{Graph, GraphProcessor, NodeKind, PortKind};
use sonido_session::plugin_adapters::{PolySynthPlugin, RegistryEffectPlugin};
use sonido_session::{HostHandle, LiveKeyState, PluginTable, SessionConfig, SharedState, StateSnapshot};

#[derive(Parser)]
#[command(name = "sonido-session")]
#[command(author, version, about = "Sonido session graph engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a single held note through the reference poly synth and an
    /// optional registry effect, writing the master bus to a WAV file.
    Render(RenderArgs),

    /// List effect ids available to the `--effect` flag.
    Effects,
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Output WAV path.
    #[arg(short, long, default_value = "session_render.wav")]
    output: String,

    /// MIDI pitch to hold for the whole render.
    #[arg(short, long, default_value_t = 60)]
    pitch: u8,

    /// Render length in seconds.
    #[arg(short, long, default_value_t = 2.0)]
    seconds: f32,

    /// Registry effect id to insert in the track's FX chain (e.g. "preamp").
    /// Omit for a dry synth render.
    #[arg(short, long)]
    effect: Option<String>,

    /// Sample rate in Hz.
    #[arg(long, default_value_t = 48_000.0)]
    sample_rate: f32,

    /// Block size in frames.
    #[arg(long, default_value_t = 256)]
    block_size: usize,
}

fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Render(args) => run_render(args),
        Commands::Effects => {
            for descriptor in sonido_registry::EffectRegistry::new().all_effects() {
                println!("{} - {}", descriptor.id, descriptor.name);
            }
            Ok(())
        }
    }
}

fn run_render(args: RenderArgs) -> anyhow::Result<()> {
    let frames_total = (args.seconds * args.sample_rate) as usize;
    let mut graph = Graph::new(args.block_size);

    let note_source = graph.add_node(NodeKind::NoteSource { track: 0 });
    let synth = graph.add_node(NodeKind::Synth { track: 0 });
    let fx = args
        .effect
        .as_ref()
        .map(|_| graph.add_node(NodeKind::Fx { track: 0, fx_slot: 0 }));
    let gain = graph.add_node(NodeKind::Gain { track: 0 });
    let mixer = graph.add_node(NodeKind::Mixer);
    let master = graph.add_node(NodeKind::Master);

    graph.connect(note_source, synth, PortKind::Events)?;
    if let Some(fx) = fx {
        graph.connect(synth, fx, PortKind::Audio)?;
        graph.connect(fx, gain, PortKind::Audio)?;
    } else {
        graph.connect(synth, gain, PortKind::Audio)?;
    }
    graph.connect(gain, mixer, PortKind::Audio)?;
    graph.connect(mixer, master, PortKind::Audio)?;
    graph.prepare()?;

    let mut plugins = PluginTable::new();
    let mut snapshot = StateSnapshot::empty(1, 1);
    snapshot.track_plugins[0] = Some(plugins.insert(Box::new(PolySynthPlugin::new(args.sample_rate))));
    if let Some(effect_id) = &args.effect {
        let adapter = RegistryEffectPlugin::new(effect_id, args.sample_rate)
            .ok_or_else(|| anyhow::anyhow!("unknown registry effect id '{effect_id}'"))?;
        let fx_plugin_id = plugins.insert(Box::new(adapter));
        snapshot.track_fx_plugins[0] = vec![Some(fx_plugin_id)];
    }
    let mut keys = LiveKeyState::default();
    keys.held[args.pitch as usize] = true;
    keys.velocity[args.pitch as usize] = 1.0;
    snapshot.live_keys[0] = keys;
    snapshot.playing = true;

    let shared = SharedState::new(graph.node_count());
    let host = HostHandle::new(shared.clone());
    let config = SessionConfig::default();
    let mut processor = GraphProcessor::new(graph, plugins, shared, host, None, config, args.sample_rate as f64);

    let mut left = Vec::with_capacity(frames_total);
    let mut right = Vec::with_capacity(frames_total);
    let mut rendered = 0usize;
    while rendered < frames_total {
        let this_block = args.block_size.min(frames_total - rendered);
        processor.process_block(&snapshot, this_block);
        let master_buf = processor.master_output().expect("graph has a master node");
        left.extend_from_slice(&master_buf.left()[..this_block]);
        right.extend_from_slice(&master_buf.right()[..this_block]);
        rendered += this_block;
    }

    let spec = WavSpec {
        channels: 2,
        sample_rate: args.sample_rate as u32,
        bits_per_sample: 32,
    };
    write_wav_stereo(&args.output, &StereoSamples::new(left, right), spec)?;
    tracing::info!(path = %args.output, frames = frames_total, "rendered session output");
    Ok(())
}
