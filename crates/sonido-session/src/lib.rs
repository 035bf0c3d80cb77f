//! Sonido Session - real-time session graph engine
//!
//! This crate hosts the audio-thread core of a session-based music
//! production environment: a per-track clip sequencer, a DAG audio/event
//! router, and the lock-free machinery that lets a UI/control thread publish
//! state and host plugin instances without ever blocking the audio thread.
//!
//! # Core Abstractions
//!
//! ## Data model
//!
//! - [`Clip`], [`Note`], [`AutomationLane`] - the looping note/automation
//!   pattern assigned to a track×scene slot
//! - [`Track`], [`SlotState`] - mixer channels and clip-slot playback state
//! - [`StateSnapshot`], [`SnapshotPublisher`] - the immutable, lock-free
//!   UI→audio handoff (`arc_swap`-backed double buffering)
//!
//! ## Sequencing
//!
//! - [`NoteSource`] - turns a track's active clip and live keyboard input
//!   into a sample-accurate, block-scoped event stream
//! - [`Event`], [`EventBuffer`] - the fixed-capacity event list every
//!   instrument/effect `process()` call consumes
//!
//! ## Processing graph
//!
//! - [`graph::Graph`] - node/connection storage, cycle-safe mutation, stable
//!   topological order
//! - [`graph::GraphNode`], [`graph::NodeKind`] - the tagged-union node
//!   variants (note source, synth, fx, gain, mixer, master)
//! - [`graph::GraphProcessor`] - the audio thread's per-block entry point,
//!   driving the five-phase render
//! - [`graph::buffer`] - SIMD-shaped stereo buffer kernels
//!
//! ## Plugin hosting
//!
//! - [`Plugin`], [`PluginStatus`] - the abstract per-block plugin ABI,
//!   modeled on CLAP's process contract
//! - [`PluginTable`], [`PluginSlot`] - ownership and soft-removal of loaded
//!   plugin instances
//! - [`plugin_adapters`] - reference adapters wrapping this workspace's own
//!   synth and effect registry as hosted plugins
//!
//! ## Coordination
//!
//! - [`SharedState`] - lock-free atomic flags coordinating the control
//!   thread and the audio thread (start/stop, suspend/quiesce)
//! - [`HostHandle`] - the callback capability handed to hosted plugins
//! - [`JobPool`] - the work-stealing thread pool backing parallel synth
//!   dispatch and the plugin thread-pool extension
//!
//! # Example
//!
//! ```rust,ignore
//! use sonido_session::graph::{Graph, GraphProcessor, NodeKind, PortKind};
//! use sonido_session::{PluginTable, SharedState, HostHandle, SessionConfig};
//! use sonido_session::plugin_adapters::PolySynthPlugin;
//!
//! let mut graph = Graph::new(512);
//! let note_source = graph.add_node(NodeKind::NoteSource { track: 0 });
//! let synth = graph.add_node(NodeKind::Synth { track: 0 });
//! let master = graph.add_node(NodeKind::Master);
//! graph.connect(note_source, synth, PortKind::Events)?;
//! graph.connect(synth, master, PortKind::Audio)?;
//! graph.prepare()?;
//!
//! let mut plugins = PluginTable::new();
//! plugins.insert(Box::new(PolySynthPlugin::new(48_000.0)));
//!
//! let shared = SharedState::new(graph.node_count());
//! let host = HostHandle::new(shared.clone());
//! let mut processor = GraphProcessor::new(
//!     graph, plugins, shared, host, None, SessionConfig::default(), 48_000.0,
//! );
//! ```

pub mod clip;
pub mod config;
pub mod error;
pub mod event;
pub mod graph;
pub mod host;
pub mod jobs;
pub mod note_source;
pub mod plugin;
pub mod plugin_adapters;
pub mod shared_state;
pub mod snapshot;
pub mod track;
pub mod transport;

pub use clip::{AutomationLane, AutomationPoint, AutomationTarget, Clip, Note, TrackAttribute};
pub use config::SessionConfig;
pub use error::{ConfigError, GraphError, SessionError, StateError};
pub use event::{Event, EventBuffer};
pub use host::HostHandle;
pub use jobs::{JobHandle, JobPool};
pub use note_source::NoteSource;
pub use plugin::{Plugin, PluginError, PluginId, PluginSlot, PluginStatus, PluginTable};
pub use shared_state::SharedState;
pub use snapshot::{ClipSlot, LiveKeyState, PluginRef, SnapshotPublisher, StateSnapshot};
pub use track::{SlotState, Track};
pub use transport::TransportRecord;
