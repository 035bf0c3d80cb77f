//! Plugin ABI and lifecycle (C12): the abstract audio-plugin contract the
//! host consumes, plus state save/load and the soft-removal wrapper around
//! it that the graph actually stores.
//!
//! The `Plugin` trait below is the host-side mirror of what a sonido CLAP
//! plugin implements against `clack_plugin` — same per-block call shape
//! (transport, frame count, optional input pair, one output pair, event
//! lists) and the same `{continue, continue_if_not_quiet, tail, sleep,
//! error}` status vocabulary clack surfaces as `ClapProcessStatus`, but
//! decoupled from CLAP's FFI boundary so the host can drive either a real
//! CLAP plugin adapter or the in-process reference adapters in
//! `plugin_adapters`.

use crate::event::EventBuffer;
use crate::graph::buffer::StereoBuffer;
use crate::host::HostHandle;
use crate::transport::TransportRecord;
use std::io::{Read, Write};

/// Stable identifier for a loaded plugin instance, distinct from
/// [`crate::graph::node::NodeId`] — a node may have no plugin loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginId(pub u32);

/// Per-block return status (§6 plugin protocol).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginStatus {
    /// Keep calling every block; output may be non-silent.
    Continue,
    /// Keep calling while output is non-silent; equivalent to `Continue`
    /// from the host's perspective except for how long a tail is expected.
    ContinueIfNotQuiet,
    /// Output is a decaying tail (e.g. reverb/delay); keep calling.
    Tail,
    /// No further output until an event or explicit process-request wakes
    /// this plugin (§4.6 sleep/wake hysteresis).
    Sleep,
    /// The block call failed; the host logs once per plugin per second and
    /// treats output as silent (§7 error table).
    Error,
}

/// The abstract audio-plugin ABI the host drives once per block per hosted
/// plugin instance (§6).
pub trait Plugin: Send {
    /// Called once before the first `process()` after activation or a
    /// start-processing ratchet transition. Only ever called from the audio
    /// thread (§4.11).
    fn start_processing(&mut self) -> Result<(), PluginError>;

    /// Called once when the plugin is taken off the active rotation
    /// (sleeping, or removed). Only ever called from the audio thread.
    fn stop_processing(&mut self);

    /// One block of processing. `input` is `Some` only for FX nodes with at
    /// least one active audio source feeding them; `output` is always
    /// present and exactly one stereo pair. `events_in` carries this
    /// block's note/automation events; `events_out` is a scratch sink for
    /// plugin-originated events (the host-side engine discards these —
    /// no sonido-session node currently needs to read them back, but the
    /// slot exists because the ABI requires an output sink symmetrically
    /// with `events_in`).
    fn process(
        &mut self,
        transport: &TransportRecord,
        frame_count: usize,
        input: Option<&StereoBuffer>,
        output: &mut StereoBuffer,
        events_in: &EventBuffer,
        events_out: &mut EventBuffer,
        host: &HostHandle,
    ) -> PluginStatus;

    /// Serialize plugin-internal state to `writer`. The plugin-id envelope
    /// (magic + id) is added by [`save_state`], not by this method.
    fn save(&self, writer: &mut dyn Write) -> Result<(), PluginError>;

    /// Restore plugin-internal state from `reader`. The caller has already
    /// stripped any envelope (see [`load_state`]).
    fn load(&mut self, reader: &mut dyn Read) -> Result<(), PluginError>;

    /// Stable registry id for this plugin instance (used in the state
    /// envelope and in `.clap-preset` archive entries).
    fn plugin_id(&self) -> &str;
}

/// Non-realtime plugin error (state I/O, activation failure). Audio-thread
/// failures are represented by [`PluginStatus::Error`] instead, since the
/// hot path must not allocate or unwind.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// `start_processing` failed (e.g. a resource the plugin needs is
    /// unavailable).
    #[error("plugin '{plugin_id}' failed to start processing: {reason}")]
    StartProcessingFailed {
        /// The plugin's registry id.
        plugin_id: String,
        /// Human-readable cause.
        reason: String,
    },
    /// State save/load I/O failed.
    #[error("plugin state I/O failed")]
    Io(#[from] std::io::Error),
}

const STATE_MAGIC: &[u8; 4] = b"clap";

/// Write the self-describing state envelope (§4.11, §6 project archive
/// format): magic `"clap"`, 4-byte big-endian plugin-id length, the
/// plugin-id bytes, then the raw plugin state payload.
pub fn save_state(plugin: &dyn Plugin) -> Result<Vec<u8>, PluginError> {
    let mut payload = Vec::new();
    plugin.save(&mut payload)?;

    let id = plugin.plugin_id().as_bytes();
    let mut out = Vec::with_capacity(4 + 4 + id.len() + payload.len());
    out.extend_from_slice(STATE_MAGIC);
    out.extend_from_slice(&(id.len() as u32).to_be_bytes());
    out.extend_from_slice(id);
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Load a state blob previously produced by [`save_state`]. If `blob` does
/// not start with the `"clap"` magic, the entire blob is treated as a raw
/// payload (§6: "if the magic is absent, the entire blob is treated as raw
/// state") — this lets the host accept state saved by a bare third-party
/// CLAP plugin that never wrote the envelope.
pub fn load_state(plugin: &mut dyn Plugin, blob: &[u8]) -> Result<(), PluginError> {
    let payload = if blob.len() >= 8 && &blob[0..4] == STATE_MAGIC {
        let id_len = u32::from_be_bytes([blob[4], blob[5], blob[6], blob[7]]) as usize;
        let payload_start = 8 + id_len;
        if blob.len() < payload_start {
            blob
        } else {
            &blob[payload_start..]
        }
    } else {
        blob
    };
    let mut cursor = payload;
    plugin.load(&mut cursor)
}

/// A soft-removable slot holding at most one loaded plugin instance. This
/// is what the graph actually stores per synth/FX node rather than a bare
/// `Box<dyn Plugin>`, so `mark_removed` (§4.11) and "no plugin loaded yet"
/// (§4.6 Phase 2: `snapshot.track_plugins[track] == null`) are both
/// representable without an `Option<Option<_>>`.
pub struct PluginSlot {
    plugin: Option<Box<dyn Plugin>>,
    removed: bool,
}

impl PluginSlot {
    /// An empty slot (no plugin loaded).
    pub fn empty() -> Self {
        Self {
            plugin: None,
            removed: false,
        }
    }

    /// A slot holding `plugin`.
    pub fn occupied(plugin: Box<dyn Plugin>) -> Self {
        Self {
            plugin: Some(plugin),
            removed: false,
        }
    }

    /// Shared reference to the loaded plugin, if any and not removed.
    pub fn get(&self) -> Option<&dyn Plugin> {
        if self.removed {
            None
        } else {
            self.plugin.as_deref()
        }
    }

    /// Exclusive reference to the loaded plugin, if any and not removed.
    pub fn get_mut(&mut self) -> Option<&mut (dyn Plugin + 'static)> {
        if self.removed {
            None
        } else {
            self.plugin.as_deref_mut()
        }
    }

    /// `true` if a plugin is loaded and the slot has not been soft-removed.
    pub fn is_occupied(&self) -> bool {
        !self.removed && self.plugin.is_some()
    }

    /// Soft-remove: the node is skipped from now on, but the plugin
    /// instance is kept alive until [`PluginSlot::compact`] drops it, in
    /// case an in-flight borrow (e.g. a snapshot taken right before
    /// removal) still references it this block.
    pub fn mark_removed(&mut self) {
        self.removed = true;
    }

    /// `true` if this slot has been soft-removed.
    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Physically drop a soft-removed plugin instance. Only safe to call
    /// once the host has observed a fully quiesced block (§4.11, §5).
    pub fn compact(&mut self) {
        if self.removed {
            self.plugin = None;
        }
    }

    /// Replace the loaded plugin, clearing any soft-removal flag.
    pub fn set(&mut self, plugin: Box<dyn Plugin>) {
        self.plugin = Some(plugin);
        self.removed = false;
    }
}

impl Default for PluginSlot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Owns every loaded plugin instance by stable [`PluginId`]. Graph nodes and
/// snapshots only ever hold a `PluginId`; this table is the single place
/// that actually owns the `Box<dyn Plugin>`, so a plugin instance's address
/// never moves even as the snapshot publishing re-points `track_plugins`
/// from one id to another (e.g. swapping an instrument).
#[derive(Default)]
pub struct PluginTable {
    slots: Vec<PluginSlot>,
}

impl PluginTable {
    /// An empty table.
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Load a plugin instance, returning its new stable id.
    pub fn insert(&mut self, plugin: Box<dyn Plugin>) -> PluginId {
        let id = PluginId(self.slots.len() as u32);
        self.slots.push(PluginSlot::occupied(plugin));
        id
    }

    /// Shared reference to a loaded plugin by id.
    pub fn get(&self, id: PluginId) -> Option<&dyn Plugin> {
        self.slots.get(id.0 as usize).and_then(PluginSlot::get)
    }

    /// Exclusive reference to a loaded plugin by id.
    pub fn get_mut(&mut self, id: PluginId) -> Option<&mut (dyn Plugin + 'static)> {
        self.slots.get_mut(id.0 as usize).and_then(PluginSlot::get_mut)
    }

    /// Soft-remove a plugin instance (§4.11): it stops being returned by
    /// `get`/`get_mut`, but its storage slot (and any snapshot still
    /// referencing its id) remains valid until [`PluginTable::compact`].
    pub fn mark_removed(&mut self, id: PluginId) {
        if let Some(slot) = self.slots.get_mut(id.0 as usize) {
            slot.mark_removed();
        }
    }

    /// Physically drop every soft-removed plugin instance. Only safe once
    /// the host has observed a fully quiesced block (§4.11, §5) — any
    /// snapshot published before that point may still reference a removed
    /// id, and this only frees the instance, it doesn't reuse the id.
    pub fn compact(&mut self) {
        for slot in &mut self.slots {
            slot.compact();
        }
    }

    /// Number of slots ever allocated (including soft-removed ones).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// `true` if no plugin has ever been loaded into this table.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Move a loaded, non-removed plugin out of its slot, for the
    /// ownership-transfer parallel synth dispatch (§4.6 Phase 2): each task
    /// needs to own its plugin instance outright rather than hold a borrow
    /// into the table for the duration of the dispatch. Returns `None` if
    /// the slot is empty or soft-removed. Must be paired with
    /// [`PluginTable::put_back`] before the slot is read again.
    pub(crate) fn take(&mut self, id: PluginId) -> Option<Box<dyn Plugin>> {
        let slot = self.slots.get_mut(id.0 as usize)?;
        if slot.removed {
            return None;
        }
        slot.plugin.take()
    }

    /// Restore a plugin previously removed by [`PluginTable::take`].
    pub(crate) fn put_back(&mut self, id: PluginId, plugin: Box<dyn Plugin>) {
        if let Some(slot) = self.slots.get_mut(id.0 as usize) {
            slot.set(plugin);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakePlugin {
        id: String,
        saved: Vec<u8>,
        loaded: Vec<u8>,
    }

    impl Plugin for FakePlugin {
        fn start_processing(&mut self) -> Result<(), PluginError> {
            Ok(())
        }
        fn stop_processing(&mut self) {}
        fn process(
            &mut self,
            _transport: &TransportRecord,
            _frame_count: usize,
            _input: Option<&StereoBuffer>,
            _output: &mut StereoBuffer,
            _events_in: &EventBuffer,
            _events_out: &mut EventBuffer,
            _host: &HostHandle,
        ) -> PluginStatus {
            PluginStatus::Continue
        }
        fn save(&self, writer: &mut dyn Write) -> Result<(), PluginError> {
            writer.write_all(&self.saved)?;
            Ok(())
        }
        fn load(&mut self, reader: &mut dyn Read) -> Result<(), PluginError> {
            self.loaded.clear();
            reader.read_to_end(&mut self.loaded)?;
            Ok(())
        }
        fn plugin_id(&self) -> &str {
            &self.id
        }
    }

    #[test]
    fn state_envelope_roundtrips() {
        let plugin = FakePlugin {
            id: "sonido.synth.poly".into(),
            saved: vec![1, 2, 3, 4, 5],
            loaded: Vec::new(),
        };
        let blob = save_state(&plugin).unwrap();
        assert_eq!(&blob[0..4], b"clap");
        let id_len = u32::from_be_bytes([blob[4], blob[5], blob[6], blob[7]]) as usize;
        assert_eq!(id_len, plugin.id.len());

        let mut plugin2 = FakePlugin {
            id: "sonido.synth.poly".into(),
            saved: Vec::new(),
            loaded: Vec::new(),
        };
        load_state(&mut plugin2, &blob).unwrap();
        assert_eq!(plugin2.loaded, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn load_without_magic_treats_whole_blob_as_payload() {
        let mut plugin = FakePlugin {
            id: "x".into(),
            saved: Vec::new(),
            loaded: Vec::new(),
        };
        load_state(&mut plugin, &[9, 9, 9]).unwrap();
        assert_eq!(plugin.loaded, vec![9, 9, 9]);
    }

    #[test]
    fn plugin_slot_soft_removal_hides_but_keeps_instance_until_compact() {
        let plugin = FakePlugin {
            id: "x".into(),
            saved: Vec::new(),
            loaded: Vec::new(),
        };
        let mut slot = PluginSlot::occupied(Box::new(plugin));
        assert!(slot.is_occupied());
        slot.mark_removed();
        assert!(!slot.is_occupied());
        assert!(slot.get().is_none());
        slot.compact();
        assert!(slot.plugin.is_none());
    }

    #[test]
    fn plugin_table_insert_and_soft_remove() {
        let mut table = PluginTable::new();
        let plugin = FakePlugin {
            id: "x".into(),
            saved: Vec::new(),
            loaded: Vec::new(),
        };
        let id = table.insert(Box::new(plugin));
        assert!(table.get(id).is_some());
        table.mark_removed(id);
        assert!(table.get(id).is_none());
        table.compact();
        assert_eq!(table.len(), 1);
    }
}
