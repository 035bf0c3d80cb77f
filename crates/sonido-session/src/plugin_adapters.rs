//! Reference plugin adapters (A6): wraps the workspace's own DSP engines —
//! `sonido_synth::PolyphonicSynth` and `sonido_registry::EffectRegistry`
//! effects — as [`Plugin`] implementations, so a session can be exercised
//! end to end (CLI smoke test, integration tests, benches) without a real
//! CLAP host or third-party plugin binary.
//!
//! FX adapters run two independent mono effect instances (dual-mono) since
//! `sonido_core::Effect` is a single-channel trait by design (see its own
//! "mono processing" design note) — the session host never needs a true
//! stereo-linked effect for these reference adapters.

use crate::event::{Event, EventBuffer};
use crate::graph::buffer::StereoBuffer;
use crate::host::HostHandle;
use crate::plugin::{Plugin, PluginError, PluginStatus};
use crate::transport::TransportRecord;
use sonido_registry::EffectRegistry;
use sonido_synth::PolyphonicSynth;
use std::io::{Read, Write};

const POLY_VOICES: usize = 16;

/// Adapts [`PolyphonicSynth`] to the session's [`Plugin`] ABI.
pub struct PolySynthPlugin {
    synth: PolyphonicSynth<POLY_VOICES>,
    registry_id: String,
}

impl PolySynthPlugin {
    /// Create a new instance at `sample_rate`.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            synth: PolyphonicSynth::new(sample_rate),
            registry_id: "sonido.reference.poly_synth".to_string(),
        }
    }
}

impl Plugin for PolySynthPlugin {
    fn start_processing(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    fn stop_processing(&mut self) {
        self.synth.all_notes_off();
    }

    fn process(
        &mut self,
        _transport: &TransportRecord,
        frame_count: usize,
        _input: Option<&StereoBuffer>,
        output: &mut StereoBuffer,
        events_in: &EventBuffer,
        _events_out: &mut EventBuffer,
        _host: &HostHandle,
    ) -> PluginStatus {
        for event in events_in.iter() {
            match *event {
                Event::NoteOn { pitch, velocity, .. } => {
                    let vel = (velocity.clamp(0.0, 1.0) * 127.0) as u8;
                    self.synth.note_on(pitch, vel);
                }
                Event::NoteOff { pitch, .. } | Event::NoteEnd { pitch, .. } => {
                    self.synth.note_off(pitch);
                }
                Event::NoteChoke { pitch, .. } => {
                    self.synth.note_off(pitch);
                }
                _ => {}
            }
        }

        let left = output.left_mut();
        let right = output.right_mut();
        for i in 0..frame_count {
            let (l, r) = self.synth.process_stereo();
            left[i] = l;
            right[i] = r;
        }

        if self.synth.active_voice_count() == 0 {
            PluginStatus::Sleep
        } else {
            PluginStatus::Continue
        }
    }

    fn save(&self, _writer: &mut dyn Write) -> Result<(), PluginError> {
        // Stateless beyond live voices, which aren't meaningful to persist
        // across a save/load boundary (notes are re-triggered by the clip
        // sequencer on playback).
        Ok(())
    }

    fn load(&mut self, _reader: &mut dyn Read) -> Result<(), PluginError> {
        Ok(())
    }

    fn plugin_id(&self) -> &str {
        &self.registry_id
    }
}

/// Adapts a registry-created mono [`sonido_registry::EffectWithParams`]
/// effect to the session's stereo [`Plugin`] ABI by running two instances
/// dual-mono.
pub struct RegistryEffectPlugin {
    left: Box<dyn sonido_registry::EffectWithParams + Send>,
    right: Box<dyn sonido_registry::EffectWithParams + Send>,
    effect_id: String,
}

impl RegistryEffectPlugin {
    /// Create an adapter wrapping the registry effect named `effect_id`, or
    /// `None` if the id isn't registered.
    pub fn new(effect_id: &str, sample_rate: f32) -> Option<Self> {
        let registry = EffectRegistry::new();
        let left = registry.create(effect_id, sample_rate)?;
        let right = registry.create(effect_id, sample_rate)?;
        Some(Self {
            left,
            right,
            effect_id: format!("sonido.reference.fx.{effect_id}"),
        })
    }
}

impl Plugin for RegistryEffectPlugin {
    fn start_processing(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    fn stop_processing(&mut self) {
        self.left.reset();
        self.right.reset();
    }

    fn process(
        &mut self,
        _transport: &TransportRecord,
        frame_count: usize,
        input: Option<&StereoBuffer>,
        output: &mut StereoBuffer,
        events_in: &EventBuffer,
        _events_out: &mut EventBuffer,
        _host: &HostHandle,
    ) -> PluginStatus {
        for event in events_in.iter() {
            if let Event::ParamValue { param_id, value, .. } = *event {
                self.left.effect_set_param(param_id as usize, value);
                self.right.effect_set_param(param_id as usize, value);
            }
        }

        let (src_l, src_r): (&[f32], &[f32]) = match input {
            Some(buf) => (&buf.left()[..frame_count], &buf.right()[..frame_count]),
            None => (&[], &[]),
        };

        let out_l = &mut output.left_mut()[..frame_count];
        let out_r = &mut output.right_mut()[..frame_count];
        if let (Some(sl), Some(sr)) = (src_l.get(..frame_count), src_r.get(..frame_count)) {
            self.left.process_block(sl, out_l);
            self.right.process_block(sr, out_r);
        } else {
            out_l.fill(0.0);
            out_r.fill(0.0);
        }

        PluginStatus::Continue
    }

    fn save(&self, _writer: &mut dyn Write) -> Result<(), PluginError> {
        Ok(())
    }

    fn load(&mut self, _reader: &mut dyn Read) -> Result<(), PluginError> {
        Ok(())
    }

    fn plugin_id(&self) -> &str {
        &self.effect_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostHandle;
    use crate::shared_state::SharedState;

    fn fake_transport() -> TransportRecord {
        TransportRecord::new(120.0, 0.0, true)
    }

    #[test]
    fn poly_synth_produces_output_after_note_on() {
        let mut plugin = PolySynthPlugin::new(48000.0);
        let host = HostHandle::new(SharedState::new(1));
        let mut events = EventBuffer::new();
        events.push(Event::NoteOn {
            sample_offset: 0,
            pitch: 69,
            velocity: 1.0,
        });
        let mut output = StereoBuffer::new(128);
        let mut scratch_out = EventBuffer::new();
        let status = plugin.process(
            &fake_transport(),
            128,
            None,
            &mut output,
            &events,
            &mut scratch_out,
            &host,
        );
        assert_eq!(status, PluginStatus::Continue);
        assert!(output.left()[..128].iter().any(|&s| s != 0.0));
        events.clear();
    }

    #[test]
    fn registry_effect_adapter_passes_audio_dual_mono() {
        let mut plugin = RegistryEffectPlugin::new("preamp", 48000.0).unwrap();
        let host = HostHandle::new(SharedState::new(1));
        let mut input = StereoBuffer::new(64);
        input.left_mut().fill(0.5);
        input.right_mut().fill(-0.5);
        let mut output = StereoBuffer::new(64);
        let events = EventBuffer::new();
        let mut scratch_out = EventBuffer::new();
        let status = plugin.process(
            &fake_transport(),
            64,
            Some(&input),
            &mut output,
            &events,
            &mut scratch_out,
            &host,
        );
        assert_eq!(status, PluginStatus::Continue);
    }

    #[test]
    fn unknown_registry_effect_returns_none() {
        assert!(RegistryEffectPlugin::new("not-a-real-effect", 48000.0).is_none());
    }
}
