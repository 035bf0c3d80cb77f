//! State snapshot (C10): the lock-free UI→audio handoff.
//!
//! The UI thread owns a mutable session (tracks, clips, live key state) and
//! periodically publishes an immutable [`StateSnapshot`] for the audio
//! thread to consume. Publication is single-writer, double-buffered via
//! [`arc_swap::ArcSwap`]: the UI builds a new snapshot, then swaps the
//! published pointer. The audio thread loads the pointer once at block
//! entry and holds that `Arc` for the duration of the block — it never
//! blocks and never observes a partially-written snapshot (§4.9).

use crate::clip::Clip;
use crate::track::{SlotState, Track};
use arc_swap::ArcSwap;
use std::sync::Arc;

/// A clip assignment in the track×scene grid: the clip itself (shared,
/// immutable once published) and its current playback state.
#[derive(Debug, Clone)]
pub struct ClipSlot {
    /// The assigned clip, or `None` if the slot is empty.
    pub clip: Option<Arc<Clip>>,
    /// Playback state of this slot.
    pub state: SlotState,
}

impl Default for ClipSlot {
    fn default() -> Self {
        Self {
            clip: None,
            state: SlotState::Empty,
        }
    }
}

/// An opaque reference to a plugin instance, borrowed for the duration of
/// one block. `None` represents the "null" plugin pointer described in §3
/// (an empty instrument or FX slot).
///
/// The plugin-lifecycle container (see [`crate::plugin::PluginTable`])
/// guarantees that any `PluginRef` appearing in a published snapshot remains
/// valid — not swapped out, not dropped — until the *next* snapshot replaces
/// it, satisfying the "borrowed references valid for the duration of the
/// block" ownership rule in §3.
pub type PluginRef = Option<crate::plugin::PluginId>;

/// Live-performance state for one track: which of the 128 MIDI pitches are
/// currently held down, and at what velocity.
#[derive(Debug, Clone)]
pub struct LiveKeyState {
    /// Per-pitch held flag.
    pub held: [bool; 128],
    /// Per-pitch onset velocity, meaningful only where `held[p]` is true.
    pub velocity: [f32; 128],
}

impl Default for LiveKeyState {
    fn default() -> Self {
        Self {
            held: [false; 128],
            velocity: [0.0; 128],
        }
    }
}

/// The immutable, flat, per-block view of session state consumed by the
/// note source (C3) and the graph processor (C7). See §3 for the field-level
/// contract.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    /// Transport is playing.
    pub playing: bool,
    /// Tempo in beats per minute.
    pub bpm: f64,
    /// Playhead position in beats.
    pub playhead_beat: f64,
    /// Number of musical tracks (excludes the master track).
    pub track_count: usize,
    /// Number of scenes.
    pub scene_count: usize,
    /// Per-track mixer settings, indexed `0..track_count`.
    pub tracks: Vec<Track>,
    /// The master track's mixer settings.
    pub master: Track,
    /// `clip_slots[track][scene]`.
    pub clip_slots: Vec<Vec<ClipSlot>>,
    /// `track_plugins[track]` — the track's instrument, or `None`.
    pub track_plugins: Vec<PluginRef>,
    /// `track_fx_plugins[track][fx_slot]`.
    pub track_fx_plugins: Vec<Vec<PluginRef>>,
    /// Live keyboard state per track.
    pub live_keys: Vec<LiveKeyState>,
}

impl StateSnapshot {
    /// Build an empty snapshot sized for `track_count` tracks and
    /// `scene_count` scenes, all slots empty, transport stopped at beat 0.
    pub fn empty(track_count: usize, scene_count: usize) -> Self {
        Self {
            playing: false,
            bpm: 120.0,
            playhead_beat: 0.0,
            track_count,
            scene_count,
            tracks: (0..track_count).map(|i| Track::new(format!("Track {i}"))).collect(),
            master: Track::new("Master"),
            clip_slots: (0..track_count)
                .map(|_| (0..scene_count).map(|_| ClipSlot::default()).collect())
                .collect(),
            track_plugins: vec![None; track_count],
            track_fx_plugins: (0..track_count).map(|_| Vec::new()).collect(),
            live_keys: (0..track_count).map(|_| LiveKeyState::default()).collect(),
        }
    }

    /// The first scene index for `track` currently in a playing slot state,
    /// if any (§4.3 step 4).
    pub fn first_playing_scene(&self, track: usize) -> Option<usize> {
        self.clip_slots
            .get(track)?
            .iter()
            .position(|slot| slot.state.is_playing())
    }
}

/// UI-side handle: owns the published snapshot and exposes single-writer
/// double-buffered publication.
pub struct SnapshotPublisher {
    current: ArcSwap<StateSnapshot>,
}

impl SnapshotPublisher {
    /// Create a publisher seeded with an initial snapshot.
    pub fn new(initial: StateSnapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// Publish a new snapshot. The audio thread will observe it at the next
    /// block boundary (acquire load); in-flight blocks keep the `Arc` they
    /// already loaded.
    pub fn publish(&self, snapshot: StateSnapshot) {
        self.current.store(Arc::new(snapshot));
    }

    /// Audio-side entry point: load the most recently published snapshot.
    /// Never blocks.
    pub fn load(&self) -> Arc<StateSnapshot> {
        self.current.load_full()
    }
}
