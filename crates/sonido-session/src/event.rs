//! Event buffer (C1): a fixed-capacity list of timed events feeding one
//! block's worth of plugin processing.
//!
//! The event kinds mirror the minimal set a CLAP-like plugin ABI expects:
//! note on/off/end/choke, a continuous parameter value, and a transport
//! marker. Capacity is bounded so the sequencer never needs to allocate
//! inside `process()`; pushes past capacity are dropped silently (§4.1,
//! §7 "Event capacity exceeded").

/// Maximum number of events a single block's [`EventBuffer`] can hold.
pub const MAX_INPUT_EVENTS: usize = 256;

/// A single timed event destined for a plugin's block-process callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// A note began sounding.
    NoteOn {
        /// Sample offset within the block.
        sample_offset: u32,
        /// MIDI pitch, 0..127.
        pitch: u8,
        /// Onset velocity, 0.0..1.0.
        velocity: f32,
    },
    /// A note was released.
    NoteOff {
        /// Sample offset within the block.
        sample_offset: u32,
        /// MIDI pitch, 0..127.
        pitch: u8,
        /// Release velocity, 0.0..1.0.
        velocity: f32,
    },
    /// A note has fully ended (voice deallocated on the plugin side).
    NoteEnd {
        /// Sample offset within the block.
        sample_offset: u32,
        /// MIDI pitch, 0..127.
        pitch: u8,
    },
    /// A note was choked (immediate silence, no release stage).
    NoteChoke {
        /// Sample offset within the block.
        sample_offset: u32,
        /// MIDI pitch, 0..127.
        pitch: u8,
    },
    /// A parameter value changed.
    ParamValue {
        /// Sample offset within the block.
        sample_offset: u32,
        /// -1 addresses the track's instrument; >= 0 addresses that FX
        /// slot, per [`crate::clip::AutomationTarget::PluginParameter`].
        fx_index: i32,
        /// Plugin-defined parameter identifier.
        param_id: u32,
        /// New value.
        value: f32,
    },
    /// Transport position marker, used when a plugin needs mid-block
    /// transport resolution (rare; most plugins read the transport record
    /// passed alongside the event list instead).
    Transport {
        /// Sample offset within the block.
        sample_offset: u32,
        /// Playhead position in beats at this offset.
        beat: f64,
    },
}

impl Event {
    /// Sample offset within the block, common to every variant.
    pub fn sample_offset(&self) -> u32 {
        match *self {
            Event::NoteOn { sample_offset, .. }
            | Event::NoteOff { sample_offset, .. }
            | Event::NoteEnd { sample_offset, .. }
            | Event::NoteChoke { sample_offset, .. }
            | Event::ParamValue { sample_offset, .. }
            | Event::Transport { sample_offset, .. } => sample_offset,
        }
    }
}

/// A fixed-capacity, append-only event list for one block.
///
/// Mirrors the capability interface described in §4.1: `size()`/`get()` for
/// plugin consumption, plus a `push` that silently drops events past
/// [`MAX_INPUT_EVENTS`] — the scheduler is expected to never produce more
/// than capacity in a single block, so overflow is a defensive backstop, not
/// a normal path.
#[derive(Debug, Clone, Default)]
pub struct EventBuffer {
    events: Vec<Event>,
    dropped: u32,
}

impl EventBuffer {
    /// Create an empty event buffer with capacity for [`MAX_INPUT_EVENTS`].
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(MAX_INPUT_EVENTS),
            dropped: 0,
        }
    }

    /// Remove all events, retaining the allocated capacity.
    pub fn clear(&mut self) {
        self.events.clear();
        self.dropped = 0;
    }

    /// Append an event. Returns `false` and drops it if capacity is
    /// exhausted.
    pub fn push(&mut self, event: Event) -> bool {
        if self.events.len() >= MAX_INPUT_EVENTS {
            self.dropped += 1;
            return false;
        }
        self.events.push(event);
        true
    }

    /// Number of events currently stored.
    pub fn size(&self) -> usize {
        self.events.len()
    }

    /// `true` if no events are stored.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Fetch event by index, or `None` if out of range.
    pub fn get(&self, index: usize) -> Option<&Event> {
        self.events.get(index)
    }

    /// Iterate events in storage order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Number of events dropped due to capacity overflow since the last
    /// `clear()`.
    pub fn dropped_count(&self) -> u32 {
        self.dropped
    }

    /// Sort events by sample offset. Not required by the plugin protocol
    /// (§4.3 "Ordering guarantees"), but performed as a quality-of-service
    /// convenience — stable so events emitted at the same offset keep their
    /// segment/storage order.
    pub fn sort_by_sample_offset(&mut self) {
        self.events.sort_by_key(Event::sample_offset);
    }
}
