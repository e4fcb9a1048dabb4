#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! In-memory voice bank implementing the engine's audio service.
//!
//! The bank tracks every voice and modulator the engine creates, the voices
//! mixed into the global channel, the channel's shelf filters and the notes
//! that were triggered. It performs no signal generation; a playback backend
//! can render the recorded state, and tests inspect it directly.

use std::collections::{BTreeMap, BTreeSet};

use pulse_field_core::{
    AudioService, Envelope, ModulatorHandle, ModulatorShape, NoteTrigger, StereoVolume,
    ToneShaping, VoiceHandle, Waveform,
};

/// Recorded state of a voice.
#[derive(Clone, Debug, PartialEq)]
pub struct VoiceState {
    /// Oscillator waveform.
    pub waveform: Waveform,
    /// Modulator routed into the frequency input.
    pub frequency_modulator: Option<ModulatorHandle>,
    /// Modulator routed into the amplitude input.
    pub amplitude_modulator: Option<ModulatorHandle>,
    /// Most recent envelope.
    pub envelope: Envelope,
    /// Most recent stereo gains.
    pub volume: StereoVolume,
}

/// Recorded state of a modulator.
#[derive(Clone, Debug, PartialEq)]
pub struct ModulatorState {
    /// Modulator shape.
    pub shape: ModulatorShape,
    /// Oscillation rate in hertz.
    pub rate: f32,
    /// Phase offset in cycles.
    pub phase: f32,
    /// Modulation depth.
    pub depth: f32,
    /// Centre value.
    pub center: f32,
}

/// Note triggered on a voice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayedNote {
    /// Voice that played the note.
    pub voice: VoiceHandle,
    /// Note parameters.
    pub note: NoteTrigger,
}

/// Audio service that records every request in memory.
#[derive(Debug, Default)]
pub struct VoiceBank {
    next_id: u32,
    voices: BTreeMap<VoiceHandle, VoiceState>,
    modulators: BTreeMap<ModulatorHandle, ModulatorState>,
    channel: BTreeSet<VoiceHandle>,
    tone: ToneShaping,
    played: Vec<PlayedNote>,
    stale_requests: usize,
}

impl VoiceBank {
    /// Creates an empty bank.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of voices that have not been destroyed.
    #[must_use]
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Number of modulators that have not been destroyed.
    #[must_use]
    pub fn modulator_count(&self) -> usize {
        self.modulators.len()
    }

    /// Number of voices mixed into the global channel.
    #[must_use]
    pub fn channel_len(&self) -> usize {
        self.channel.len()
    }

    /// Reports whether the voice is mixed into the global channel.
    #[must_use]
    pub fn in_channel(&self, voice: VoiceHandle) -> bool {
        self.channel.contains(&voice)
    }

    /// Recorded state of a voice.
    #[must_use]
    pub fn voice(&self, voice: VoiceHandle) -> Option<&VoiceState> {
        self.voices.get(&voice)
    }

    /// Recorded state of a modulator.
    #[must_use]
    pub fn modulator(&self, modulator: ModulatorHandle) -> Option<&ModulatorState> {
        self.modulators.get(&modulator)
    }

    /// Current shelf gains of the global channel.
    #[must_use]
    pub fn tone_shaping(&self) -> ToneShaping {
        self.tone
    }

    /// Every note played since creation or the last drain.
    #[must_use]
    pub fn played_notes(&self) -> &[PlayedNote] {
        &self.played
    }

    /// Removes and returns the recorded notes.
    pub fn drain_played_notes(&mut self) -> Vec<PlayedNote> {
        std::mem::take(&mut self.played)
    }

    /// Number of requests that referenced a voice or modulator that does not exist.
    #[must_use]
    pub fn stale_requests(&self) -> usize {
        self.stale_requests
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    fn voice_mut(&mut self, voice: VoiceHandle) -> Option<&mut VoiceState> {
        let state = self.voices.get_mut(&voice);
        if state.is_none() {
            self.stale_requests += 1;
            tracing::warn!(voice = voice.get(), "request for unknown voice");
        }
        state
    }

    fn modulator_mut(&mut self, modulator: ModulatorHandle) -> Option<&mut ModulatorState> {
        let state = self.modulators.get_mut(&modulator);
        if state.is_none() {
            self.stale_requests += 1;
            tracing::warn!(modulator = modulator.get(), "request for unknown modulator");
        }
        state
    }
}

impl AudioService for VoiceBank {
    fn create_voice(&mut self, waveform: Waveform) -> VoiceHandle {
        let handle = VoiceHandle::new(self.allocate_id());
        let _ = self.voices.insert(
            handle,
            VoiceState {
                waveform,
                frequency_modulator: None,
                amplitude_modulator: None,
                envelope: Envelope::default(),
                volume: StereoVolume::default(),
            },
        );
        handle
    }

    fn set_frequency_modulator(&mut self, voice: VoiceHandle, modulator: ModulatorHandle) {
        if let Some(state) = self.voice_mut(voice) {
            state.frequency_modulator = Some(modulator);
        }
    }

    fn set_amplitude_modulator(&mut self, voice: VoiceHandle, modulator: ModulatorHandle) {
        if let Some(state) = self.voice_mut(voice) {
            state.amplitude_modulator = Some(modulator);
        }
    }

    fn set_envelope(&mut self, voice: VoiceHandle, envelope: Envelope) {
        if let Some(state) = self.voice_mut(voice) {
            state.envelope = envelope;
        }
    }

    fn set_volume(&mut self, voice: VoiceHandle, volume: StereoVolume) {
        if let Some(state) = self.voice_mut(voice) {
            state.volume = volume;
        }
    }

    fn play_note(&mut self, voice: VoiceHandle, note: NoteTrigger) {
        if self.voice_mut(voice).is_some() {
            self.played.push(PlayedNote { voice, note });
        }
    }

    fn destroy_voice(&mut self, voice: VoiceHandle) {
        if self.voices.remove(&voice).is_none() {
            self.stale_requests += 1;
            tracing::warn!(voice = voice.get(), "destroying unknown voice");
        }
        let _ = self.channel.remove(&voice);
    }

    fn create_modulator(&mut self, shape: ModulatorShape) -> ModulatorHandle {
        let handle = ModulatorHandle::new(self.allocate_id());
        let _ = self.modulators.insert(
            handle,
            ModulatorState {
                shape,
                rate: 0.0,
                phase: 0.0,
                depth: 0.0,
                center: 0.0,
            },
        );
        handle
    }

    fn set_modulator_rate(&mut self, modulator: ModulatorHandle, rate: f32) {
        if let Some(state) = self.modulator_mut(modulator) {
            state.rate = rate;
        }
    }

    fn set_modulator_phase(&mut self, modulator: ModulatorHandle, phase: f32) {
        if let Some(state) = self.modulator_mut(modulator) {
            state.phase = phase;
        }
    }

    fn set_modulator_depth(&mut self, modulator: ModulatorHandle, depth: f32) {
        if let Some(state) = self.modulator_mut(modulator) {
            state.depth = depth;
        }
    }

    fn set_modulator_center(&mut self, modulator: ModulatorHandle, center: f32) {
        if let Some(state) = self.modulator_mut(modulator) {
            state.center = center;
        }
    }

    fn destroy_modulator(&mut self, modulator: ModulatorHandle) {
        if self.modulators.remove(&modulator).is_none() {
            self.stale_requests += 1;
            tracing::warn!(modulator = modulator.get(), "destroying unknown modulator");
        }
    }

    fn add_to_channel(&mut self, voice: VoiceHandle) {
        if self.voice_mut(voice).is_some() && self.channel.insert(voice) {
            tracing::debug!(voice = voice.get(), voices = self.channel.len(), "voice joined channel");
        }
    }

    fn remove_from_channel(&mut self, voice: VoiceHandle) {
        if self.channel.remove(&voice) {
            tracing::debug!(voice = voice.get(), voices = self.channel.len(), "voice left channel");
        }
    }

    fn set_tone_shaping(&mut self, shaping: ToneShaping) {
        tracing::debug!(
            low = shaping.low_shelf_gain,
            high = shaping.high_shelf_gain,
            "channel tone shaping updated"
        );
        self.tone = shaping;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voices_and_modulators_share_handle_space() {
        let mut bank = VoiceBank::new();
        let voice = bank.create_voice(Waveform::Sine);
        let modulator = bank.create_modulator(ModulatorShape::Sine);
        assert_ne!(voice.get(), modulator.get());
        assert_eq!(bank.voice_count(), 1);
        assert_eq!(bank.modulator_count(), 1);
    }

    #[test]
    fn destroying_voice_leaves_channel() {
        let mut bank = VoiceBank::new();
        let voice = bank.create_voice(Waveform::Sawtooth);
        bank.add_to_channel(voice);
        assert!(bank.in_channel(voice));
        bank.destroy_voice(voice);
        assert!(!bank.in_channel(voice));
        assert_eq!(bank.stale_requests(), 0);
    }

    #[test]
    fn requests_for_destroyed_handles_are_counted() {
        let mut bank = VoiceBank::new();
        let voice = bank.create_voice(Waveform::Sine);
        bank.destroy_voice(voice);
        bank.play_note(
            voice,
            NoteTrigger {
                pitch: 60,
                velocity: 1.0,
                duration: 0.1,
            },
        );
        bank.set_modulator_rate(ModulatorHandle::new(42), 1.0);
        assert_eq!(bank.stale_requests(), 2);
        assert!(bank.played_notes().is_empty());
    }

    #[test]
    fn modulator_settings_are_recorded() {
        let mut bank = VoiceBank::new();
        let modulator = bank.create_modulator(ModulatorShape::Triangle);
        bank.set_modulator_rate(modulator, 2.0);
        bank.set_modulator_phase(modulator, 0.25);
        bank.set_modulator_depth(modulator, 0.1);
        bank.set_modulator_center(modulator, 0.5);
        let state = bank.modulator(modulator).expect("modulator exists");
        assert_eq!(state.rate, 2.0);
        assert_eq!(state.phase, 0.25);
        assert_eq!(state.depth, 0.1);
        assert_eq!(state.center, 0.5);
    }

    #[test]
    fn played_notes_drain() {
        let mut bank = VoiceBank::new();
        let voice = bank.create_voice(Waveform::Sine);
        let note = NoteTrigger {
            pitch: 45,
            velocity: 0.7,
            duration: 1.5,
        };
        bank.play_note(voice, note);
        let drained = bank.drain_played_notes();
        assert_eq!(drained, vec![PlayedNote { voice, note }]);
        assert!(bank.played_notes().is_empty());
    }
}
