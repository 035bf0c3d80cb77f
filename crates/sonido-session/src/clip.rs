//! Clip model (C2): a finite-length, looping pattern of notes and
//! automation for one track.
//!
//! A clip is a torus of length `length_beats`: beat positions wrap modulo
//! the length, and notes/automation that straddle the wrap boundary are
//! treated as continuing from the origin (§3, §4.2).

/// Minimum note duration in beats. Notes shorter than this are rejected by
/// [`Clip::add_note`].
pub const MIN_NOTE_DURATION_BEATS: f64 = 1.0 / 960.0;

/// Maximum notes a single clip may hold.
pub const MAX_NOTES_PER_CLIP: usize = 256;

/// Maximum automation lanes a single clip may hold.
pub const MAX_LANES_PER_CLIP: usize = 8;

/// Maximum automation points a single lane may hold.
pub const MAX_POINTS_PER_LANE: usize = 64;

/// A pitched note within a clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    /// MIDI pitch, 0..127.
    pub pitch: u8,
    /// Onset position in beats from the clip origin.
    pub start: f64,
    /// Duration in beats. Invariant: `duration >= MIN_NOTE_DURATION_BEATS`.
    pub duration: f64,
    /// Onset velocity, 0.0..1.0.
    pub onset_velocity: f32,
    /// Release velocity, 0.0..1.0.
    pub release_velocity: f32,
}

impl Note {
    /// End position in beats from the clip origin (may exceed the clip
    /// length — callers wrap via [`Clip::length_beats`]).
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// A single breakpoint in an [`AutomationLane`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutomationPoint {
    /// Position in beats from the clip origin.
    pub time_beats: f64,
    /// Parameter value at this point.
    pub value: f32,
}

/// What an [`AutomationLane`] modulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutomationTarget {
    /// A track-level attribute (volume or pan), consumed by the gain node
    /// rather than emitted as a plugin event (§9, resolved open question).
    TrackAttribute(TrackAttribute),
    /// A plugin parameter. `fx_index == -1` addresses the track's
    /// instrument; `fx_index >= 0` addresses that FX slot.
    PluginParameter {
        /// -1 for the instrument, otherwise a zero-based FX slot index.
        fx_index: i32,
        /// Plugin-defined parameter identifier.
        param_id: u32,
    },
}

/// Track attributes that can be automated directly (as opposed to through a
/// plugin parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackAttribute {
    /// Track volume, 0.0..2.0.
    Volume,
    /// Track pan, 0.0..1.0 (0.5 = center).
    Pan,
}

/// An ordered sequence of automation breakpoints targeting one parameter.
#[derive(Debug, Clone)]
pub struct AutomationLane {
    /// What this lane modulates.
    pub target: AutomationTarget,
    /// Points ordered by `time_beats`, ascending. Capacity-bounded to
    /// [`MAX_POINTS_PER_LANE`].
    points: Vec<AutomationPoint>,
}

impl AutomationLane {
    /// Create an empty lane for the given target.
    pub fn new(target: AutomationTarget) -> Self {
        Self {
            target,
            points: Vec::new(),
        }
    }

    /// Insert a point, keeping `points` sorted by `time_beats`. Silently
    /// ignored once [`MAX_POINTS_PER_LANE`] is reached.
    pub fn add_point(&mut self, point: AutomationPoint) -> bool {
        if self.points.len() >= MAX_POINTS_PER_LANE {
            return false;
        }
        let idx = self
            .points
            .partition_point(|p| p.time_beats < point.time_beats);
        self.points.insert(idx, point);
        true
    }

    /// All points in ascending time order.
    pub fn points(&self) -> &[AutomationPoint] {
        &self.points
    }

    /// Evaluate the piecewise-linear value at `beat mod length`, wrapping
    /// interpolation between the last and first point (§4.2).
    pub fn value_at(&self, beat: f64, length_beats: f64) -> f32 {
        if self.points.is_empty() {
            return 0.0;
        }
        if self.points.len() == 1 {
            return self.points[0].value;
        }
        let b = beat.rem_euclid(length_beats);
        // Find the first point at or after `b`.
        let idx = self.points.partition_point(|p| p.time_beats < b);
        if idx == 0 {
            // Before the first point: wrap-interpolate from the last point
            // (at length_beats worth before the origin) to the first.
            let last = self.points[self.points.len() - 1];
            let first = self.points[0];
            let span = length_beats - last.time_beats + first.time_beats;
            if span <= 0.0 {
                return first.value;
            }
            let t = (b - last.time_beats + length_beats).rem_euclid(length_beats) / span;
            return lerp(last.value, first.value, t as f32);
        }
        if idx == self.points.len() {
            let last = self.points[self.points.len() - 1];
            // Exactly at or past the last point but before wrap: hold, then
            // the wrap case above takes over once `b` resets past 0.
            return last.value;
        }
        let prev = self.points[idx - 1];
        let next = self.points[idx];
        let span = next.time_beats - prev.time_beats;
        if span <= 0.0 {
            return next.value;
        }
        let t = ((b - prev.time_beats) / span) as f32;
        lerp(prev.value, next.value, t)
    }

    /// Points lying strictly within `[s, e)`, in storage (time-ascending)
    /// order — used by the note source to emit `param_value` events for a
    /// segment (§4.3 step 12).
    pub fn points_in_segment(&self, s: f64, e: f64) -> impl Iterator<Item = &AutomationPoint> {
        self.points
            .iter()
            .filter(move |p| p.time_beats > s && p.time_beats < e)
    }

    /// `true` if any point lies exactly at `beat`.
    pub fn has_point_at(&self, beat: f64) -> bool {
        self.points.iter().any(|p| (p.time_beats - beat).abs() < 1e-9)
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// A looping pattern of notes and automation for one track, one scene slot.
#[derive(Debug, Clone)]
pub struct Clip {
    /// Loop length in beats. Invariant: `> 0`.
    length_beats: f64,
    notes: Vec<Note>,
    lanes: Vec<AutomationLane>,
}

impl Clip {
    /// Create an empty clip of the given length. Panics if `length_beats <=
    /// 0` — this mirrors the invariant in §4.2 being a programmer error to
    /// violate, not a runtime condition.
    pub fn new(length_beats: f64) -> Self {
        assert!(length_beats > 0.0, "clip length_beats must be > 0");
        Self {
            length_beats,
            notes: Vec::new(),
            lanes: Vec::new(),
        }
    }

    /// Loop length in beats.
    pub fn length_beats(&self) -> f64 {
        self.length_beats
    }

    /// Change the loop length. Does not itself re-wrap any in-flight
    /// playhead — callers (the note source) re-wrap modulo the new length
    /// at the next block, per §4.2.
    pub fn set_length_beats(&mut self, length_beats: f64) {
        assert!(length_beats > 0.0, "clip length_beats must be > 0");
        self.length_beats = length_beats;
    }

    /// Add a note, trimming any existing sounding note of the same pitch
    /// that overlaps the new note's start (§3: "at most one note of a given
    /// pitch may be sounding at any beat position").
    ///
    /// Returns `false` (and does nothing) if `duration <
    /// MIN_NOTE_DURATION_BEATS` or the clip is at capacity.
    pub fn add_note(&mut self, note: Note) -> bool {
        if note.duration < MIN_NOTE_DURATION_BEATS {
            return false;
        }
        if self.notes.len() >= MAX_NOTES_PER_CLIP {
            return false;
        }
        for existing in &mut self.notes {
            if existing.pitch == note.pitch && self.covers(existing, note.start) {
                existing.duration = (note.start - existing.start).max(MIN_NOTE_DURATION_BEATS);
            }
        }
        self.notes.push(note);
        true
    }

    fn covers(&self, note: &Note, beat: f64) -> bool {
        let len = self.length_beats;
        let b = beat.rem_euclid(len);
        let start = note.start.rem_euclid(len);
        let end = start + note.duration;
        if end <= len {
            b >= start && b < end
        } else {
            b >= start || b < end - len
        }
    }

    /// All notes, in storage order.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Add an automation lane. Returns `false` if the clip is at lane
    /// capacity.
    pub fn add_lane(&mut self, lane: AutomationLane) -> bool {
        if self.lanes.len() >= MAX_LANES_PER_CLIP {
            return false;
        }
        self.lanes.push(lane);
        true
    }

    /// All automation lanes, in storage order.
    pub fn lanes(&self) -> &[AutomationLane] {
        &self.lanes
    }

    /// Notes active (sounding) at beat `b` modulo `length_beats`, handling
    /// wrap per §4.2.
    pub fn notes_active_at(&self, b: f64) -> impl Iterator<Item = &Note> {
        let len = self.length_beats;
        let b = b.rem_euclid(len);
        self.notes.iter().filter(move |n| {
            let start = n.start.rem_euclid(len);
            let end = start + n.duration;
            if end <= len {
                b >= start && b < end
            } else {
                b >= start || b < end - len
            }
        })
    }

    /// For each note, split into one or two "virtual notes" so that onset
    /// and offset queries never need to reason about wraparound directly
    /// (§4.2: "split into two virtual notes").
    pub fn virtual_notes(&self) -> Vec<Note> {
        let len = self.length_beats;
        let mut out = Vec::with_capacity(self.notes.len() + 4);
        for n in &self.notes {
            let start = n.start.rem_euclid(len);
            let end = start + n.duration;
            if end <= len {
                out.push(Note { start, ..*n });
            } else {
                out.push(Note {
                    start,
                    duration: len - start,
                    ..*n
                });
                out.push(Note {
                    start: 0.0,
                    duration: end - len,
                    ..*n
                });
            }
        }
        out
    }
}
