//! Note source (C3): per-track sequencer.
//!
//! Turns a track's active clip plus live keyboard input into a
//! block-scoped, sample-accurate event stream. See §4.3 for the full
//! algorithm this module implements step-by-step.

use crate::clip::{AutomationTarget, Clip, Note};
use crate::event::EventBuffer;
use crate::snapshot::StateSnapshot;
use std::sync::Arc;

/// Per-track sequencer state, persisted across blocks.
#[derive(Debug, Clone)]
pub struct NoteSource {
    track: usize,
    current_beat: f64,
    last_scene: Option<usize>,
    active_pitches: [bool; 128],
    prev_live: [bool; 128],
    prev_playing: bool,
    /// Identity of the clip `cached_virtual_notes` was split from. Compared
    /// by pointer, not by scene index, since a scene's clip can be edited in
    /// place without the slot's identity changing.
    cached_clip: Option<Arc<Clip>>,
    /// [`Clip::virtual_notes`] output for `cached_clip`, rebuilt only when
    /// the resolved clip changes so `process` never allocates (§4.6/§5).
    cached_virtual_notes: Vec<Note>,
}

impl NoteSource {
    /// Create a note source for the given track index, with all state at
    /// rest (no active pitches, stopped, beat 0).
    pub fn new(track: usize) -> Self {
        Self {
            track,
            current_beat: 0.0,
            last_scene: None,
            active_pitches: [false; 128],
            prev_live: [false; 128],
            prev_playing: false,
            cached_clip: None,
            cached_virtual_notes: Vec::new(),
        }
    }

    /// Track index this source sequences.
    pub fn track(&self) -> usize {
        self.track
    }

    /// Current playhead position within the active clip, in beats.
    pub fn current_beat(&self) -> f64 {
        self.current_beat
    }

    /// Pitches currently emitted-on-but-not-yet-ended, used by invariant 1
    /// (outstanding note-on count).
    pub fn active_pitches(&self) -> &[bool; 128] {
        &self.active_pitches
    }

    /// Run one block of sequencing, appending events to `out` (which is
    /// cleared first, per §4.3 step 1).
    pub fn process(
        &mut self,
        snapshot: &StateSnapshot,
        sample_rate: f64,
        frame_count: u32,
        out: &mut EventBuffer,
    ) {
        out.clear();

        let live_state = &snapshot.live_keys[self.track];
        let live = live_state.held;
        let live_vel = live_state.velocity;

        if !snapshot.playing {
            self.current_beat = 0.0;
            self.emit_diff(&live, &live_vel, out);
            self.prev_live = live;
            self.prev_playing = false;
            return;
        }

        let scene = match snapshot.first_playing_scene(self.track) {
            Some(s) => s,
            None => {
                self.current_beat = 0.0;
                self.emit_diff(&live, &live_vel, out);
                self.prev_live = live;
                self.prev_playing = true;
                return;
            }
        };

        if self.last_scene != Some(scene) {
            self.current_beat = 0.0;
            self.last_scene = Some(scene);
        }

        let clip_arc: &Arc<Clip> = match snapshot.clip_slots[self.track][scene].clip.as_ref() {
            Some(clip_arc) if clip_arc.length_beats() > 0.0 => clip_arc,
            _ => {
                self.emit_diff(&live, &live_vel, out);
                self.prev_live = live;
                self.prev_playing = true;
                return;
            }
        };
        let clip: &Clip = clip_arc;

        let clip_len = clip.length_beats();
        let beats_per_sample = (snapshot.bpm / 60.0) / sample_rate;
        let block_beats = beats_per_sample * frame_count as f64;

        let beat_start = self.current_beat.rem_euclid(clip_len);
        let beat_end = beat_start + block_beats;

        self.reconcile_at_beat_start(clip, beat_start, &live, &live_vel, out);

        let clip_changed = !matches!(&self.cached_clip, Some(cached) if Arc::ptr_eq(cached, clip_arc));
        if clip_changed {
            self.cached_virtual_notes = clip.virtual_notes();
            self.cached_clip = Some(Arc::clone(clip_arc));
        }
        // Moved out rather than borrowed: `process_segment` also needs `&mut
        // self`, and this keeps the block allocation-free (a `Vec::take`
        // leaves an empty, capacity-0 stand-in, no heap traffic).
        let virtual_notes = std::mem::take(&mut self.cached_virtual_notes);

        if beat_end < clip_len {
            self.process_segment(&virtual_notes, beat_start, beat_end, 0, beats_per_sample, out);
        } else {
            self.process_segment(&virtual_notes, beat_start, clip_len, 0, beats_per_sample, out);
            let base_offset = ((clip_len - beat_start) / beats_per_sample).floor() as u32;
            let wrapped_end = beat_end.rem_euclid(clip_len);
            self.process_segment(
                &virtual_notes,
                0.0,
                wrapped_end,
                base_offset,
                beats_per_sample,
                out,
            );
        }
        self.cached_virtual_notes = virtual_notes;

        self.emit_automation(clip, beat_start, beat_end.min(clip_len), 0, out);
        if beat_end >= clip_len {
            let base_offset = ((clip_len - beat_start) / beats_per_sample).floor() as u32;
            self.emit_automation(clip, 0.0, beat_end.rem_euclid(clip_len), base_offset, out);
        }

        self.current_beat = if beat_end >= clip_len {
            beat_end.rem_euclid(clip_len)
        } else {
            beat_end
        };

        self.prev_live = live;
        self.prev_playing = true;

        out.sort_by_sample_offset();
    }

    /// §4.3 step 3/4/6 fallback: emit note-off for active-but-not-live
    /// pitches, note-on for live-but-not-active pitches, all at sample
    /// offset 0.
    fn emit_diff(&mut self, live: &[bool; 128], live_vel: &[f32; 128], out: &mut EventBuffer) {
        for pitch in 0..128u8 {
            let idx = pitch as usize;
            let active = self.active_pitches[idx];
            let is_live = live[idx];
            if active && !is_live {
                out.push(crate::event::Event::NoteOff {
                    sample_offset: 0,
                    pitch,
                    velocity: 0.0,
                });
                self.active_pitches[idx] = false;
            } else if !active && is_live {
                out.push(crate::event::Event::NoteOn {
                    sample_offset: 0,
                    pitch,
                    velocity: live_vel[idx],
                });
                self.active_pitches[idx] = true;
            }
        }
    }

    /// §4.3 step 9: reconcile `active_pitches` against "should be sounding"
    /// (clip notes at `beat_start` OR live keys) at sample offset 0. Runs
    /// every block; it is a no-op once steady state is reached, which
    /// subsumes the scene-changed/live-changed/transport-transition/
    /// wrap-boundary disjunction discussed in §9.
    fn reconcile_at_beat_start(
        &mut self,
        clip: &Clip,
        beat_start: f64,
        live: &[bool; 128],
        live_vel: &[f32; 128],
        out: &mut EventBuffer,
    ) {
        let mut should = [false; 128];
        let mut clip_velocity = [0.0f32; 128];
        for note in clip.notes_active_at(beat_start) {
            should[note.pitch as usize] = true;
            clip_velocity[note.pitch as usize] = note.onset_velocity;
        }
        for pitch in 0..128usize {
            should[pitch] |= live[pitch];
        }

        for pitch in 0..128u8 {
            let idx = pitch as usize;
            let active = self.active_pitches[idx];
            if active && !should[idx] {
                out.push(crate::event::Event::NoteOff {
                    sample_offset: 0,
                    pitch,
                    velocity: 0.0,
                });
                self.active_pitches[idx] = false;
            } else if !active && should[idx] {
                let velocity = if clip_velocity[idx] > 0.0 {
                    clip_velocity[idx]
                } else {
                    live_vel[idx]
                };
                out.push(crate::event::Event::NoteOn {
                    sample_offset: 0,
                    pitch,
                    velocity,
                });
                self.active_pitches[idx] = true;
            }
        }
    }

    /// §4.3 step 11: emit onset/offset events for every virtual note whose
    /// boundary lies strictly inside `[seg_start, seg_end)`.
    fn process_segment(
        &mut self,
        virtual_notes: &[crate::clip::Note],
        seg_start: f64,
        seg_end: f64,
        base_offset: u32,
        beats_per_sample: f64,
        out: &mut EventBuffer,
    ) {
        for note in virtual_notes {
            let onset = note.start;
            if seg_start < onset && onset < seg_end {
                let offset = base_offset + ((onset - seg_start) / beats_per_sample).floor() as u32;
                out.push(crate::event::Event::NoteOn {
                    sample_offset: offset,
                    pitch: note.pitch,
                    velocity: note.onset_velocity,
                });
                self.active_pitches[note.pitch as usize] = true;
            }
            let offset_beat = note.end();
            if seg_start < offset_beat && offset_beat < seg_end {
                let offset =
                    base_offset + ((offset_beat - seg_start) / beats_per_sample).floor() as u32;
                out.push(crate::event::Event::NoteOff {
                    sample_offset: offset,
                    pitch: note.pitch,
                    velocity: note.release_velocity,
                });
                self.active_pitches[note.pitch as usize] = false;
            }
        }
    }

    /// §4.3 step 12: emit `param_value` events for every automation point
    /// within `[seg_start, seg_end)`, plus an interpolated value at sample
    /// offset 0 if no point lies exactly at `seg_start` (only meaningful for
    /// the first segment of the block, `base_offset == 0`).
    fn emit_automation(
        &self,
        clip: &Clip,
        seg_start: f64,
        seg_end: f64,
        base_offset: u32,
        out: &mut EventBuffer,
    ) {
        let len = clip.length_beats();
        for lane in clip.lanes() {
            let fx_index = match lane.target {
                AutomationTarget::PluginParameter { fx_index, .. } => fx_index,
                AutomationTarget::TrackAttribute(_) => continue,
            };
            let param_id = match lane.target {
                AutomationTarget::PluginParameter { param_id, .. } => param_id,
                AutomationTarget::TrackAttribute(_) => unreachable!(),
            };
            if base_offset == 0 && !lane.has_point_at(seg_start) {
                out.push(crate::event::Event::ParamValue {
                    sample_offset: 0,
                    fx_index,
                    param_id,
                    value: lane.value_at(seg_start, len),
                });
            }
            for point in lane.points_in_segment(seg_start, seg_end) {
                out.push(crate::event::Event::ParamValue {
                    sample_offset: base_offset,
                    fx_index,
                    param_id,
                    value: point.value,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::{Clip, Note};
    use crate::snapshot::StateSnapshot;
    use crate::track::SlotState;
    use std::sync::Arc;

    fn note(pitch: u8, start: f64, duration: f64) -> Note {
        Note {
            pitch,
            start,
            duration,
            onset_velocity: 0.8,
            release_velocity: 0.5,
        }
    }

    /// S1: single track, one note C4 start=0 dur=1 beat in a 4-beat clip,
    /// bpm=120, sample_rate=48000, frame_count=4800 (one block = 0.2 beat).
    #[test]
    fn scenario_s1_note_on_then_note_off_after_one_beat() {
        let mut clip = Clip::new(4.0);
        clip.add_note(note(60, 0.0, 1.0));
        let clip = Arc::new(clip);

        let mut snapshot = StateSnapshot::empty(1, 1);
        snapshot.playing = true;
        snapshot.bpm = 120.0;
        snapshot.clip_slots[0][0].clip = Some(clip);
        snapshot.clip_slots[0][0].state = SlotState::Playing;

        let mut source = NoteSource::new(0);
        let mut buf = EventBuffer::new();

        source.process(&snapshot, 48_000.0, 4800, &mut buf);
        assert!(buf.iter().any(|e| matches!(
            e,
            crate::event::Event::NoteOn { pitch: 60, sample_offset: 0, .. }
        )));
        assert!(!buf
            .iter()
            .any(|e| matches!(e, crate::event::Event::NoteOff { pitch: 60, .. })));

        // 0.2 beat/block in exact beats, but `beats_per_sample * frame_count`
        // only reaches 0.19999999999999998 in f64, so the accumulated
        // `current_beat` doesn't land a segment with beat 1.0 in its
        // strict interior until the 6th call.
        for _ in 1..6 {
            source.process(&snapshot, 48_000.0, 4800, &mut buf);
        }
        assert!(buf
            .iter()
            .any(|e| matches!(e, crate::event::Event::NoteOff { pitch: 60, .. })));
    }

    #[test]
    fn stopped_transport_emits_only_live_diff() {
        let mut snapshot = StateSnapshot::empty(1, 1);
        snapshot.playing = false;
        snapshot.live_keys[0].held[60] = true;
        snapshot.live_keys[0].velocity[60] = 0.9;

        let mut source = NoteSource::new(0);
        let mut buf = EventBuffer::new();
        source.process(&snapshot, 48_000.0, 512, &mut buf);
        assert_eq!(buf.size(), 1);
        assert!(matches!(
            buf.get(0),
            Some(crate::event::Event::NoteOn { pitch: 60, .. })
        ));
    }

    #[test]
    fn scene_change_resets_beat_and_reconciles() {
        let mut clip_a = Clip::new(4.0);
        clip_a.add_note(note(60, 0.0, 4.0));
        let mut clip_b = Clip::new(4.0);
        clip_b.add_note(note(64, 0.0, 4.0));

        let mut snapshot = StateSnapshot::empty(1, 2);
        snapshot.playing = true;
        snapshot.clip_slots[0][0].clip = Some(Arc::new(clip_a));
        snapshot.clip_slots[0][0].state = SlotState::Playing;
        snapshot.clip_slots[0][1].clip = Some(Arc::new(clip_b));
        snapshot.clip_slots[0][1].state = SlotState::Stopped;

        let mut source = NoteSource::new(0);
        let mut buf = EventBuffer::new();
        source.process(&snapshot, 48_000.0, 4800, &mut buf);
        assert!(source.active_pitches()[60]);

        // Switch scenes.
        snapshot.clip_slots[0][0].state = SlotState::Stopped;
        snapshot.clip_slots[0][1].state = SlotState::Playing;
        source.process(&snapshot, 48_000.0, 4800, &mut buf);

        assert!(buf
            .iter()
            .any(|e| matches!(e, crate::event::Event::NoteOff { pitch: 60, .. })));
        assert!(buf
            .iter()
            .any(|e| matches!(e, crate::event::Event::NoteOn { pitch: 64, .. })));
        assert!((source.current_beat() - 0.2).abs() < 1e-9); // one block advanced after reset
    }

    /// S2: wrapping note (clip length 2 beats, pitch 64, start=1.5,
    /// duration=1.0) emits exactly one note-on and one note-off per clip
    /// period once steady state is reached, at the expected beat positions.
    #[test]
    fn scenario_s2_wrapping_note_emits_one_on_and_one_off_per_period() {
        let mut clip = Clip::new(2.0);
        clip.add_note(note(64, 1.5, 1.0));
        let clip = Arc::new(clip);

        let mut snapshot = StateSnapshot::empty(1, 1);
        snapshot.playing = true;
        snapshot.bpm = 120.0;
        snapshot.clip_slots[0][0].clip = Some(clip);
        snapshot.clip_slots[0][0].state = SlotState::Playing;

        let mut source = NoteSource::new(0);
        let mut buf = EventBuffer::new();

        // 0.1 beat per block (48000 * 0.1/0.2bps); run past the settling
        // transient (the reconcile-at-beat-start block, which sees the
        // wrapping note already active at beat 0) before counting.
        let frames_per_block = 2400u32; // 0.1 beat at 120bpm/48000Hz
        source.process(&snapshot, 48_000.0, frames_per_block, &mut buf);

        let mut ons = 0u32;
        let mut offs = 0u32;
        for _ in 0..19 {
            source.process(&snapshot, 48_000.0, frames_per_block, &mut buf);
            for event in buf.iter() {
                match event {
                    crate::event::Event::NoteOn { pitch: 64, .. } => ons += 1,
                    crate::event::Event::NoteOff { pitch: 64, .. } => offs += 1,
                    _ => {}
                }
            }
        }
        assert_eq!(ons, 1);
        assert_eq!(offs, 1);
    }
}
