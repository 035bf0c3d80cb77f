//! Graph processor (C7): the audio thread's per-block entry point.
//!
//! Drives the five-phase render documented in §4.6: note sources first
//! (sequential, they only produce events), then synths (parallel-eligible),
//! then the FX chain (sequential, one plugin's output can feed the next),
//! then gain staging, then mixer/master summing. Every phase after the
//! first reads `block_active` flags the previous phase set, so phase order
//! is load-bearing — this is not a pipeline that can be reordered for
//! convenience.
//!
//! Phase 2's parallel dispatch needs several tasks to each hold an exclusive
//! `&mut GraphNode` and `&mut dyn Plugin` at once, dispatched onto
//! [`crate::jobs::JobPool`]'s persistent worker threads (§4.6 Phase 2:
//! "dispatch via C8 with one job per task and a root sync job"). Rather than
//! reach for `unsafe` (the workspace denies it, see the root `Cargo.toml`) to
//! launder a `&mut` borrow across that dispatch, each task's state — output
//! buffer, plugin instance, input events — is moved out of its owner
//! ([`crate::graph::node::GraphNode::take_buffer`],
//! [`crate::plugin::PluginTable::take`], `mem::take` on the note-source event
//! buffer) into a fully owned `'static` closure, handed to
//! [`crate::jobs::JobPool::run_batch`], and moved back once the batch
//! completes. Each task's result — the processed buffer, the plugin, its
//! status — crosses back from worker to audio thread through a
//! `parking_lot::Mutex` slot touched by exactly one worker per block and read
//! only after `run_batch`'s completion barrier, so contention is never real.

use super::buffer::{self, StereoBuffer};
use super::node::{GraphNode, NodeId, NodeKind};
use super::topology::Graph;
use crate::clip::AutomationTarget;
use crate::config::SessionConfig;
use crate::event::{Event, EventBuffer};
use crate::host::{self, HostHandle};
use crate::jobs::{BoxedJob, JobPool};
use crate::note_source::NoteSource;
use crate::plugin::{Plugin, PluginId, PluginStatus, PluginTable};
use crate::shared_state::{self, SharedState};
use crate::snapshot::StateSnapshot;
use crate::transport::TransportRecord;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{trace_span, warn};

/// Owns the processing graph and loaded plugins, and renders one block at a
/// time against a published [`StateSnapshot`] (§4.6).
///
/// Constructed and mutated from the control thread; [`GraphProcessor::process_block`]
/// is the only method meant to run on the audio thread.
pub struct GraphProcessor {
    graph: Graph,
    plugins: PluginTable,
    shared: SharedState,
    host: HostHandle,
    jobs: Option<Arc<JobPool>>,
    config: SessionConfig,
    sample_rate: f64,

    note_sources: Vec<NoteSource>,
    note_source_events: Vec<EventBuffer>,
    synth_events_out: Vec<EventBuffer>,

    note_source_ids: Vec<NodeId>,
    synth_ids: Vec<NodeId>,
    fx_ids: Vec<NodeId>,
    gain_ids: Vec<NodeId>,
    mixer_ids: Vec<NodeId>,
    master_id: Option<NodeId>,

    // Per-block scratch, reused to avoid allocating inside `process_block`.
    scratch_in: StereoBuffer,
    fx_events_scratch: EventBuffer,
    fx_events_out_scratch: EventBuffer,
    empty_events: EventBuffer,
    active_tasks: Vec<usize>,
    task_node_ids: Vec<NodeId>,
    task_plugin_ids: Vec<PluginId>,
    task_event_slots: Vec<Option<usize>>,
    task_positions: Vec<usize>,
    /// One result slot per synth node (indexed the same as `synth_events_out`),
    /// handed to a parallel task's closure and drained after
    /// [`crate::jobs::JobPool::run_batch`]'s completion barrier.
    task_results: Vec<Arc<parking_lot::Mutex<Option<TaskResult>>>>,
}

impl GraphProcessor {
    /// Build a processor around an already-[`Graph::prepare`]d graph. `jobs`
    /// is `None` to force every block through the sequential synth path
    /// (tests, or a host that opted out of the work-stealing pool); when
    /// `Some`, it is also attached to `host` so hosted plugins can reach the
    /// thread-pool extension (§4.7 point 2) from inside `process()`.
    pub fn new(
        graph: Graph,
        plugins: PluginTable,
        shared: SharedState,
        host: HostHandle,
        jobs: Option<Arc<JobPool>>,
        config: SessionConfig,
        sample_rate: f64,
    ) -> Self {
        let max_frames = graph.max_frames();
        let host = match &jobs {
            Some(pool) => host.with_jobs(pool.clone()),
            None => host,
        };
        let mut processor = Self {
            graph,
            plugins,
            shared,
            host,
            jobs,
            config,
            sample_rate,
            note_sources: Vec::new(),
            note_source_events: Vec::new(),
            synth_events_out: Vec::new(),
            note_source_ids: Vec::new(),
            synth_ids: Vec::new(),
            fx_ids: Vec::new(),
            gain_ids: Vec::new(),
            mixer_ids: Vec::new(),
            master_id: None,
            scratch_in: StereoBuffer::new(max_frames),
            fx_events_scratch: EventBuffer::new(),
            fx_events_out_scratch: EventBuffer::new(),
            empty_events: EventBuffer::new(),
            active_tasks: Vec::new(),
            task_node_ids: Vec::new(),
            task_plugin_ids: Vec::new(),
            task_event_slots: Vec::new(),
            task_positions: Vec::new(),
            task_results: Vec::new(),
        };
        processor.resync_topology();
        processor
    }

    /// Re-read the graph's per-kind node lists and reset note-source state.
    /// Call after any topology change (`add_node`/`connect`/`compact`) and a
    /// fresh [`Graph::prepare`] — typically right after the host has
    /// observed [`SharedState::is_quiesced`] (§4.11).
    pub fn resync(&mut self) {
        self.resync_topology();
    }

    fn resync_topology(&mut self) {
        self.note_source_ids = self.graph.note_sources().to_vec();
        self.synth_ids = self.graph.synths().to_vec();
        self.fx_ids = self.graph.fx_nodes().to_vec();
        self.gain_ids = self.graph.gains().to_vec();
        self.mixer_ids = self.graph.mixers().to_vec();
        self.master_id = self.graph.master();

        self.note_sources = self
            .note_source_ids
            .iter()
            .map(|&id| {
                let track = match self.graph.node(id).map(GraphNode::kind) {
                    Some(NodeKind::NoteSource { track }) => track,
                    _ => 0,
                };
                NoteSource::new(track)
            })
            .collect();
        self.note_source_events = self.note_source_ids.iter().map(|_| EventBuffer::new()).collect();
        self.synth_events_out = self.synth_ids.iter().map(|_| EventBuffer::new()).collect();
        self.task_results = self
            .synth_ids
            .iter()
            .map(|_| Arc::new(parking_lot::Mutex::new(None)))
            .collect();
    }

    /// Shared reference to the processing graph (topology edits go through
    /// [`GraphProcessor::graph_mut`]).
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Exclusive reference to the processing graph, for control-plane
    /// mutation. Call [`GraphProcessor::resync`] after `prepare()`.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Shared reference to the loaded-plugin table.
    pub fn plugins(&self) -> &PluginTable {
        &self.plugins
    }

    /// Exclusive reference to the loaded-plugin table, for loading/removing
    /// plugin instances from the control plane.
    pub fn plugins_mut(&mut self) -> &mut PluginTable {
        &mut self.plugins
    }

    /// The shared lock-free coordination state.
    pub fn shared_state(&self) -> &SharedState {
        &self.shared
    }

    /// The host-callback capability handed to plugin instances.
    pub fn host_handle(&self) -> &HostHandle {
        &self.host
    }

    /// The final stereo block produced by the last [`GraphProcessor::process_block`]
    /// call, if the graph has a master node.
    pub fn master_output(&self) -> Option<&StereoBuffer> {
        self.master_id.and_then(|id| self.graph.node(id)).and_then(GraphNode::buffers)
    }

    /// Render one block of `frame_count` samples against `snapshot` (§4.6).
    /// Must only be called from the audio thread.
    pub fn process_block(&mut self, snapshot: &StateSnapshot, frame_count: usize) {
        host::mark_audio_thread();
        let span = trace_span!("process_block", frame_count, active_task_count = tracing::field::Empty);
        let _enter = span.enter();

        if self.shared.is_suspend_requested() {
            for i in 0..self.graph.node_count() {
                if let Some(node) = self.graph.node_mut(NodeId(i as u32)) {
                    node.buffer_zeroed = false;
                    node.zero_once(frame_count);
                }
            }
            self.shared.acknowledge_suspend();
            return;
        }

        let process_requested = self.shared.take_process_requested();
        let solo_active = snapshot.tracks.iter().any(|t| t.solo);
        let transport = TransportRecord::new(snapshot.bpm, snapshot.playhead_beat, snapshot.playing);

        // Phase 0: reset per-block activity scratch.
        for i in 0..self.graph.node_count() {
            if let Some(node) = self.graph.node_mut(NodeId(i as u32)) {
                node.block_active = false;
                node.buffer_zeroed = false;
            }
        }

        self.run_note_source_phase(snapshot, frame_count);

        self.gather_active_synths(snapshot, process_requested, frame_count);
        let task_count = self.active_tasks.len();
        span.record("active_task_count", task_count as u64);
        let effective_threshold = self.config.effective_parallel_threshold(frame_count);
        if self.jobs.is_some() && task_count >= effective_threshold {
            self.run_synth_tasks_parallel(snapshot, &transport, frame_count);
        } else {
            self.run_synth_tasks_sequential(snapshot, &transport, frame_count);
        }

        self.run_fx_phase(snapshot, &transport, frame_count);
        self.run_gain_phase(snapshot, solo_active, frame_count);
        self.run_mixer_and_master_phase(snapshot, frame_count);
    }

    fn run_note_source_phase(&mut self, snapshot: &StateSnapshot, frame_count: usize) {
        for i in 0..self.note_source_ids.len() {
            let id = self.note_source_ids[i];
            if self.graph.node(id).is_none_or(|n| n.removed) {
                self.note_source_events[i].clear();
                continue;
            }
            let (source, events) = (&mut self.note_sources[i], &mut self.note_source_events[i]);
            source.process(snapshot, self.sample_rate, frame_count as u32, events);
        }
    }

    fn gather_active_synths(&mut self, snapshot: &StateSnapshot, process_requested: bool, frame_count: usize) {
        self.active_tasks.clear();
        for i in 0..self.synth_ids.len() {
            let id = self.synth_ids[i];
            if self.graph.node(id).is_none_or(|n| n.removed) {
                continue;
            }
            let track = match self.graph.node(id).map(GraphNode::kind) {
                Some(NodeKind::Synth { track }) => track,
                _ => continue,
            };
            if snapshot.track_plugins[track].is_none() {
                if let Some(node) = self.graph.node_mut(id) {
                    node.zero_once(frame_count);
                    node.sleeping = false;
                }
                continue;
            }
            let events_len = self
                .note_source_index_for(id)
                .map_or(0, |slot| self.note_source_events[slot].size());

            let Some(node) = self.graph.node_mut(id) else { continue };
            let should_run = process_requested || events_len > 0 || !node.sleeping;
            if should_run {
                self.active_tasks.push(i);
            } else {
                node.zero_once(frame_count);
            }
        }
    }

    fn note_source_index_for(&self, node_id: NodeId) -> Option<usize> {
        let src = self.graph.connected_note_source(node_id)?;
        self.note_source_ids.iter().position(|&id| id == src)
    }

    fn run_synth_tasks_sequential(&mut self, snapshot: &StateSnapshot, transport: &TransportRecord, frame_count: usize) {
        for slot in 0..self.active_tasks.len() {
            let i = self.active_tasks[slot];
            self.run_one_synth_task(i, snapshot, transport, frame_count);
        }
    }

    fn run_one_synth_task(&mut self, i: usize, snapshot: &StateSnapshot, transport: &TransportRecord, frame_count: usize) {
        let id = self.synth_ids[i];
        let node_index = id.index() as usize;
        let track = match self.graph.node(id).map(GraphNode::kind) {
            Some(NodeKind::Synth { track }) => track,
            _ => return,
        };
        let Some(plugin_id) = snapshot.track_plugins[track] else { return };
        let events_slot = self.note_source_index_for(id);

        if let Some(node) = self.graph.node_mut(id) {
            if let Some(buf) = node.buffers_mut() {
                buf.clear(frame_count);
            }
        }

        let flags = self.shared.node_flags(node_index);
        if flags & shared_state::START_REQUESTED != 0 && !self.shared.is_started(node_index) {
            if let Some(plugin) = self.plugins.get_mut(plugin_id) {
                match plugin.start_processing() {
                    Ok(()) => self.shared.mark_started(node_index),
                    Err(err) => warn!(node = node_index, %err, "synth start_processing failed"),
                }
            }
        }

        let events_in: &EventBuffer = events_slot
            .map(|slot| &self.note_source_events[slot])
            .unwrap_or(&self.empty_events);

        let Some(node) = self.graph.node_mut(id) else { return };
        let Some(output) = node.buffers_mut() else { return };
        let Some(plugin) = self.plugins.get_mut(plugin_id) else {
            node.block_active = false;
            return;
        };
        self.synth_events_out[i].clear();
        let status = plugin.process(
            transport,
            frame_count,
            None,
            output,
            events_in,
            &mut self.synth_events_out[i],
            &self.host,
        );
        node.sleeping = matches!(status, PluginStatus::Sleep);
        node.block_active = true;
    }

    fn run_synth_tasks_parallel(&mut self, snapshot: &StateSnapshot, transport: &TransportRecord, frame_count: usize) {
        self.task_node_ids.clear();
        self.task_plugin_ids.clear();
        self.task_event_slots.clear();
        self.task_positions.clear();
        for k in 0..self.active_tasks.len() {
            let i = self.active_tasks[k];
            let id = self.synth_ids[i];
            let track = match self.graph.node(id).map(GraphNode::kind) {
                Some(NodeKind::Synth { track }) => track,
                _ => continue,
            };
            let Some(plugin_id) = snapshot.track_plugins[track] else { continue };
            self.task_node_ids.push(id);
            self.task_plugin_ids.push(plugin_id);
            self.task_event_slots.push(self.note_source_index_for(id));
            self.task_positions.push(i);
        }

        let task_count = self.task_node_ids.len();
        if task_count == 0 {
            return;
        }

        // Build one owned closure per task, moving its buffer/plugin/events
        // out of their owners rather than borrowing — the closures must be
        // `'static` to cross onto the pool's persistent workers without
        // `unsafe`.
        let mut jobs: SmallVec<[BoxedJob; 16]> = SmallVec::new();
        for k in 0..task_count {
            let node_id = self.task_node_ids[k];
            let plugin_id = self.task_plugin_ids[k];
            let pos = self.task_positions[k];
            let node_index = node_id.index() as usize;

            let Some(node) = self.graph.node_mut(node_id) else { continue };
            let Some(mut buffer) = node.take_buffer() else { continue };
            buffer.clear(frame_count);

            let Some(plugin) = self.plugins.take(plugin_id) else {
                node.give_buffer(buffer);
                continue;
            };

            let events_in = match self.task_event_slots[k] {
                Some(slot) => std::mem::take(&mut self.note_source_events[slot]),
                None => EventBuffer::new(),
            };

            let result_slot = self.task_results[pos].clone();
            let shared = self.shared.clone();
            let host = self.host.clone();
            let transport = *transport;

            jobs.push(Box::new(move || {
                host::mark_audio_thread();
                let mut plugin = plugin;
                let mut buffer = buffer;

                let flags = shared.node_flags(node_index);
                if flags & shared_state::START_REQUESTED != 0 && !shared.is_started(node_index) {
                    match plugin.start_processing() {
                        Ok(()) => shared.mark_started(node_index),
                        Err(err) => warn!(node = node_index, %err, "synth start_processing failed"),
                    }
                }

                let mut events_out = EventBuffer::new();
                let status = plugin.process(&transport, frame_count, None, &mut buffer, &events_in, &mut events_out, &host);
                *result_slot.lock() = Some(TaskResult { buffer, plugin, events_in, status });
            }));
        }

        match self.jobs.as_deref() {
            Some(pool) => pool.run_batch(jobs),
            // `process_block` only calls this path once `self.jobs.is_some()`;
            // kept for defensiveness rather than reachable in practice.
            None => {
                for job in jobs {
                    job();
                }
            }
        }

        for k in 0..task_count {
            let pos = self.task_positions[k];
            let node_id = self.task_node_ids[k];
            let plugin_id = self.task_plugin_ids[k];
            let Some(result) = self.task_results[pos].lock().take() else { continue };
            if let Some(node) = self.graph.node_mut(node_id) {
                node.give_buffer(result.buffer);
                node.sleeping = matches!(result.status, PluginStatus::Sleep);
                node.block_active = true;
            }
            self.plugins.put_back(plugin_id, result.plugin);
            if let Some(slot) = self.task_event_slots[k] {
                self.note_source_events[slot] = result.events_in;
            }
        }
    }

    fn run_fx_phase(&mut self, snapshot: &StateSnapshot, transport: &TransportRecord, frame_count: usize) {
        for i in 0..self.fx_ids.len() {
            let fx_id = self.fx_ids[i];
            if self.graph.node(fx_id).is_none_or(|n| n.removed) {
                continue;
            }
            let (track, fx_slot) = match self.graph.node(fx_id).map(GraphNode::kind) {
                Some(NodeKind::Fx { track, fx_slot }) => (track, fx_slot),
                _ => continue,
            };

            let has_active_audio = self
                .graph
                .incoming_audio(fx_id)
                .iter()
                .any(|&src| self.graph.node(src).is_some_and(|n| n.block_active));

            let plugin_id = snapshot
                .track_fx_plugins
                .get(track)
                .and_then(|slots| slots.get(fx_slot))
                .copied()
                .flatten();

            let Some(plugin_id) = plugin_id else {
                let any = self.sum_active_inputs(fx_id, frame_count);
                if any {
                    self.write_scaled_to(fx_id, frame_count, 1.0);
                } else if let Some(node) = self.graph.node_mut(fx_id) {
                    node.zero_once(frame_count);
                }
                if let Some(node) = self.graph.node_mut(fx_id) {
                    node.sleeping = false;
                }
                continue;
            };

            let node_index = fx_id.index() as usize;
            let flags = self.shared.node_flags(node_index);
            if flags & shared_state::START_REQUESTED != 0 && !self.shared.is_started(node_index) {
                if let Some(plugin) = self.plugins.get_mut(plugin_id) {
                    match plugin.start_processing() {
                        Ok(()) => self.shared.mark_started(node_index),
                        Err(err) => warn!(node = node_index, %err, "fx start_processing failed"),
                    }
                }
            }

            let raw_events = self
                .note_source_index_for(fx_id)
                .map(|slot| &self.note_source_events[slot])
                .unwrap_or(&self.empty_events);
            filter_fx_events(raw_events, fx_slot as i32, &mut self.fx_events_scratch);
            let has_events = !self.fx_events_scratch.is_empty();

            let sleeping = self.graph.node(fx_id).is_some_and(|n| n.sleeping);
            if !has_active_audio && sleeping && !has_events {
                if let Some(node) = self.graph.node_mut(fx_id) {
                    node.zero_once(frame_count);
                }
                continue;
            }

            let any_input = self.sum_active_inputs(fx_id, frame_count);
            if !any_input {
                self.scratch_in.clear(frame_count);
            }

            let Some(node) = self.graph.node_mut(fx_id) else { continue };
            node.buffer_zeroed = false;
            let Some(output) = node.buffers_mut() else { continue };
            let Some(plugin) = self.plugins.get_mut(plugin_id) else {
                node.block_active = false;
                continue;
            };
            self.fx_events_out_scratch.clear();
            let status = plugin.process(
                transport,
                frame_count,
                Some(&self.scratch_in),
                output,
                &self.fx_events_scratch,
                &mut self.fx_events_out_scratch,
                &self.host,
            );
            node.sleeping = matches!(status, PluginStatus::Sleep);
            node.block_active = true;
        }
    }

    fn run_gain_phase(&mut self, snapshot: &StateSnapshot, solo_active: bool, frame_count: usize) {
        for i in 0..self.gain_ids.len() {
            let gain_id = self.gain_ids[i];
            if self.graph.node(gain_id).is_none_or(|n| n.removed) {
                continue;
            }
            let track = match self.graph.node(gain_id).map(GraphNode::kind) {
                Some(NodeKind::Gain { track }) => track,
                _ => continue,
            };
            let gain = snapshot.tracks[track].effective_gain(solo_active);
            let any = self.sum_active_inputs(gain_id, frame_count);
            if !any || gain == 0.0 {
                if let Some(node) = self.graph.node_mut(gain_id) {
                    node.zero_once(frame_count);
                }
            } else {
                self.write_scaled_to(gain_id, frame_count, gain);
            }
        }
    }

    fn run_mixer_and_master_phase(&mut self, snapshot: &StateSnapshot, frame_count: usize) {
        for i in 0..self.mixer_ids.len() {
            let mixer_id = self.mixer_ids[i];
            let any = self.sum_active_inputs(mixer_id, frame_count);
            if any {
                self.write_scaled_to(mixer_id, frame_count, 1.0);
            } else if let Some(node) = self.graph.node_mut(mixer_id) {
                node.zero_once(frame_count);
            }
        }

        let Some(master_id) = self.master_id else { return };
        let gain = if snapshot.master.mute { 0.0 } else { snapshot.master.volume };
        let any = self.sum_active_inputs(master_id, frame_count);
        if !any || gain == 0.0 {
            if let Some(node) = self.graph.node_mut(master_id) {
                node.zero_once(frame_count);
            }
        } else {
            self.write_scaled_to(master_id, frame_count, gain);
        }
    }

    /// Sum every `block_active` audio source feeding `node_id` into
    /// `self.scratch_in`. Returns `false` (and zeroes the scratch buffer) if
    /// no source was active.
    fn sum_active_inputs(&mut self, node_id: NodeId, frame_count: usize) -> bool {
        let mut any = false;
        for &src in self.graph.incoming_audio(node_id) {
            let Some(node) = self.graph.node(src) else { continue };
            if !node.block_active {
                continue;
            }
            let Some(buf) = node.buffers() else { continue };
            if !any {
                self.scratch_in.left_mut()[..frame_count].copy_from_slice(&buf.left()[..frame_count]);
                self.scratch_in.right_mut()[..frame_count].copy_from_slice(&buf.right()[..frame_count]);
                any = true;
            } else {
                buffer::add(
                    &mut self.scratch_in.left_mut()[..frame_count],
                    &mut self.scratch_in.right_mut()[..frame_count],
                    &buf.left()[..frame_count],
                    &buf.right()[..frame_count],
                );
            }
        }
        if !any {
            self.scratch_in.clear(frame_count);
        }
        any
    }

    /// Write `self.scratch_in * gain` into `node_id`'s own buffer and mark
    /// it active.
    fn write_scaled_to(&mut self, node_id: NodeId, frame_count: usize, gain: f32) {
        let Some(node) = self.graph.node_mut(node_id) else { return };
        node.buffer_zeroed = false;
        if let Some(buf) = node.buffers_mut() {
            buffer::copy_scaled(
                &mut buf.left_mut()[..frame_count],
                &mut buf.right_mut()[..frame_count],
                &self.scratch_in.left()[..frame_count],
                &self.scratch_in.right()[..frame_count],
                gain,
            );
        }
        node.block_active = true;
    }
}

/// One parallel synth task's owned state, moved out of the graph/plugin
/// table/note-source scratch before dispatch and moved back in by
/// [`GraphProcessor::run_synth_tasks_parallel`] once the task's closure has
/// stored it here.
struct TaskResult {
    buffer: StereoBuffer,
    plugin: Box<dyn Plugin>,
    events_in: EventBuffer,
    status: PluginStatus,
}

/// Narrow a track's mixed note-source event buffer down to the
/// [`Event::ParamValue`] events addressed at `fx_slot` (§4.3's
/// `fx_index`/[`AutomationTarget::PluginParameter`] addressing) — an FX node
/// must not see the instrument's note events, nor another FX slot's
/// parameter changes, even though all of a track's events share one
/// upstream buffer.
fn filter_fx_events(raw: &EventBuffer, fx_slot: i32, out: &mut EventBuffer) {
    out.clear();
    for event in raw.iter() {
        if let Event::ParamValue { fx_index, .. } = *event {
            if fx_index == fx_slot {
                out.push(*event);
            }
        }
    }
}
