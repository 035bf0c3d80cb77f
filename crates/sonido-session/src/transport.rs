//! Per-block transport record (§4.6 step 4, §6 plugin protocol).
//!
//! Built fresh each block from the published [`crate::snapshot::StateSnapshot`]
//! and the node's track index; passed alongside the event list to every
//! synth/FX block-process call. This host fixes the time signature at 4/4
//! (§6, §1 Non-goals: "tempo automation within a block" is out of scope, so
//! tempo is constant for the duration of one `TransportRecord`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportRecord {
    /// Tempo in beats per minute.
    pub tempo_bpm: f64,
    /// Playhead position in beats at the start of the block.
    pub beats: f64,
    /// Playhead position in seconds at the start of the block.
    pub seconds: f64,
    /// Bar position (1-based bar number, fractional part is progress
    /// through the bar) assuming a fixed 4/4 time signature.
    pub bar_position: f64,
    /// Time signature numerator (fixed at 4 for this host).
    pub time_sig_numerator: u16,
    /// Time signature denominator (fixed at 4 for this host).
    pub time_sig_denominator: u16,
    /// Transport is currently playing.
    pub playing: bool,
    /// Transport is currently recording.
    pub recording: bool,
    /// Transport loop is enabled.
    pub looping: bool,
    /// Transport is in a pre-roll count-in.
    pub preroll: bool,
}

impl TransportRecord {
    /// Build a transport record from a bpm and playhead position, with the
    /// remaining flags at their steady-state defaults (not recording, not
    /// looping, not in pre-roll). `playing` is supplied explicitly since the
    /// graph processor already knows it from the snapshot.
    pub fn new(tempo_bpm: f64, playhead_beat: f64, playing: bool) -> Self {
        let seconds = playhead_beat * 60.0 / tempo_bpm.max(1e-6);
        let bar_position = playhead_beat / 4.0 + 1.0;
        Self {
            tempo_bpm,
            beats: playhead_beat,
            seconds,
            bar_position,
            time_sig_numerator: 4,
            time_sig_denominator: 4,
            playing,
            recording: false,
            looping: false,
            preroll: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_position_tracks_beats_in_4_4() {
        let t = TransportRecord::new(120.0, 4.0, true);
        assert!((t.bar_position - 2.0).abs() < 1e-9);
    }

    #[test]
    fn seconds_derived_from_tempo() {
        // 120 bpm -> 2 beats/sec -> 1 beat = 0.5s
        let t = TransportRecord::new(120.0, 1.0, true);
        assert!((t.seconds - 0.5).abs() < 1e-9);
    }
}
