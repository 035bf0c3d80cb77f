//! Property-based tests for clip wraparound (invariant 2) and buffer-kernel
//! bit-exactness (invariant 6).

use proptest::prelude::*;
use sonido_session::clip::{Clip, Note};
use sonido_session::graph::buffer;

fn note(pitch: u8, start: f64, duration: f64) -> Note {
    Note {
        pitch,
        start,
        duration,
        onset_velocity: 0.8,
        release_velocity: 0.5,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// `virtual_notes` never produces a note whose start/end fall outside
    /// `[0, length_beats]`, regardless of where the source note straddles
    /// the wrap boundary.
    #[test]
    fn virtual_notes_stay_within_clip_bounds(
        length_beats in 0.25f64..16.0,
        start in 0.0f64..64.0,
        duration in (MIN_DURATION)..4.0,
    ) {
        let mut clip = Clip::new(length_beats);
        let duration = duration.min(length_beats - 1e-6).max(MIN_DURATION);
        clip.add_note(note(60, start, duration));
        for virt in clip.virtual_notes() {
            prop_assert!(virt.start >= 0.0 && virt.start <= length_beats + 1e-9);
            prop_assert!(virt.end() >= 0.0 && virt.end() <= length_beats + 1e-9);
        }
    }

    /// Splitting a wrapping note into two virtual notes never changes the
    /// total sounding duration.
    #[test]
    fn virtual_notes_preserve_total_duration(
        length_beats in 0.25f64..16.0,
        start in 0.0f64..64.0,
        duration in (MIN_DURATION)..4.0,
    ) {
        let mut clip = Clip::new(length_beats);
        let duration = duration.min(length_beats - 1e-6).max(MIN_DURATION);
        clip.add_note(note(60, start, duration));
        let total: f64 = clip.virtual_notes().iter().map(|n| n.duration).sum();
        prop_assert!((total - duration).abs() < 1e-6);
    }

    /// `notes_active_at` agrees with direct wrap-aware containment for any
    /// query beat, including beats past several loop iterations.
    #[test]
    fn notes_active_at_matches_wrapped_containment(
        length_beats in 0.5f64..8.0,
        start in 0.0f64..8.0,
        duration in (MIN_DURATION)..2.0,
        query_offset in 0.0f64..32.0,
    ) {
        let mut clip = Clip::new(length_beats);
        let duration = duration.min(length_beats - 1e-6).max(MIN_DURATION);
        clip.add_note(note(60, start, duration));

        let b = query_offset.rem_euclid(length_beats);
        let expected_active = {
            let s = start.rem_euclid(length_beats);
            let e = s + duration;
            if e <= length_beats {
                b >= s && b < e
            } else {
                b >= s || b < e - length_beats
            }
        };
        let got_active = clip.notes_active_at(b).count() > 0;
        prop_assert_eq!(expected_active, got_active);
    }

    /// An automation lane's wrap-interpolated value is always within the
    /// convex hull of its point values (piecewise-linear interpolation never
    /// overshoots).
    #[test]
    fn automation_value_stays_within_point_range(
        length_beats in 1.0f64..8.0,
        v0 in -10.0f32..10.0,
        v1 in -10.0f32..10.0,
        query_offset in 0.0f64..16.0,
    ) {
        use sonido_session::clip::{AutomationLane, AutomationPoint, AutomationTarget, TrackAttribute};
        let mut lane = AutomationLane::new(AutomationTarget::TrackAttribute(TrackAttribute::Volume));
        lane.add_point(AutomationPoint { time_beats: 0.0, value: v0 });
        lane.add_point(AutomationPoint { time_beats: length_beats / 2.0, value: v1 });

        let lo = v0.min(v1);
        let hi = v0.max(v1);
        let value = lane.value_at(query_offset, length_beats);
        prop_assert!(value >= lo - 1e-4 && value <= hi + 1e-4);
    }

    /// The four buffer kernels are deterministic: running the same kernel
    /// twice on identical inputs produces bit-identical output, for any
    /// buffer length (not just multiples of the 64-sample unrolled chunk).
    #[test]
    fn buffer_kernels_are_deterministic(
        len in 0usize..300,
        gain in -4.0f32..4.0,
        seed in 0u32..1000,
    ) {
        let src_l: Vec<f32> = (0..len).map(|i| ((i as u32 + seed) as f32 * 0.013).sin()).collect();
        let src_r: Vec<f32> = (0..len).map(|i| ((i as u32 + seed) as f32 * 0.029).cos()).collect();

        let run = |gain: f32| {
            let mut dst_l = vec![0.25f32; len];
            let mut dst_r = vec![-0.25f32; len];
            buffer::add_scaled(&mut dst_l, &mut dst_r, &src_l, &src_r, gain);
            buffer::mul(&mut dst_l, &mut dst_r, 0.9);
            (dst_l, dst_r)
        };

        let (a_l, a_r) = run(gain);
        let (b_l, b_r) = run(gain);
        prop_assert_eq!(a_l, b_l);
        prop_assert_eq!(a_r, b_r);
    }

    /// `copy_scaled` followed by `mul` with the reciprocal gain round-trips
    /// to the original source (within floating-point tolerance), for any
    /// buffer length.
    #[test]
    fn copy_scaled_then_inverse_mul_round_trips(
        len in 1usize..300,
        gain in 0.1f32..4.0,
    ) {
        let src_l: Vec<f32> = (0..len).map(|i| (i as f32 * 0.017).sin()).collect();
        let src_r: Vec<f32> = (0..len).map(|i| (i as f32 * 0.023).cos()).collect();
        let mut dst_l = vec![0.0f32; len];
        let mut dst_r = vec![0.0f32; len];

        buffer::copy_scaled(&mut dst_l, &mut dst_r, &src_l, &src_r, gain);
        buffer::mul(&mut dst_l, &mut dst_r, 1.0 / gain);

        for (got, expected) in dst_l.iter().zip(src_l.iter()) {
            prop_assert!((got - expected).abs() < 1e-4);
        }
        for (got, expected) in dst_r.iter().zip(src_r.iter()) {
            prop_assert!((got - expected).abs() < 1e-4);
        }
    }
}

const MIN_DURATION: f64 = sonido_session::clip::MIN_NOTE_DURATION_BEATS;
