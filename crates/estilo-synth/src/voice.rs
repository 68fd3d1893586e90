//! Voice state and multi-voice management.
//!
//! A [`Voice`] is one playable unit: pitch mapper, waveform patch, envelope,
//! and interaction state. The [`VoiceManager`] owns a set of voices, the
//! shared sustain latch, and the "last interacted" selection that pointer
//! and octave gestures target. Single-voice operation is simply the
//! one-voice configuration of the same types — there is no separate code
//! path.
//!
//! Signal graphs are created lazily: a voice only builds its patch when it
//! first needs to sound (and the context is running), and rebuilds it from
//! scratch when its waveform kind changes.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use estilo_graph::{Context, ContextState, GraphError};
use libm::exp2;

use crate::envelope::EnvelopeController;
use crate::patch::{SignalGraph, WaveformGraphBuilder, WaveformKind};
use crate::pitch::PitchMapper;

/// Default voice volume.
pub const DEFAULT_VOLUME: f32 = 0.8;

/// One playable sound source.
#[derive(Debug, Clone)]
pub struct Voice {
    kind: WaveformKind,
    volume: f32,
    octave_shift: i32,
    snap_to_note: bool,
    /// Last commanded surface position, normalized.
    position: f64,
    slider_active: bool,
    keyboard_active: bool,
    sound_playing: bool,
    last_frequency: f64,
    pitch: PitchMapper,
    envelope: EnvelopeController,
    graph: Option<SignalGraph>,
    /// A note/frequency readout is currently showing for this voice.
    display_active: bool,
}

impl Default for Voice {
    fn default() -> Self {
        Self::new(WaveformKind::Sine)
    }
}

impl Voice {
    /// Create a silent voice playing `kind`, parked at the range bottom.
    pub fn new(kind: WaveformKind) -> Self {
        let pitch = PitchMapper::new();
        let last_frequency = pitch.frequency_from_position(0.0, 0);
        Self {
            kind,
            volume: DEFAULT_VOLUME,
            octave_shift: 0,
            snap_to_note: false,
            position: 0.0,
            slider_active: false,
            keyboard_active: false,
            sound_playing: false,
            last_frequency,
            pitch,
            envelope: EnvelopeController::new(),
            graph: None,
            display_active: false,
        }
    }

    // --- Accessors ---

    /// The voice's waveform kind.
    pub fn kind(&self) -> WaveformKind {
        self.kind
    }

    /// The voice's target volume.
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Current octave shift.
    pub fn octave_shift(&self) -> i32 {
        self.octave_shift
    }

    /// Whether pitches snap to the nearest semitone.
    pub fn snap_to_note(&self) -> bool {
        self.snap_to_note
    }

    /// Enable or disable semitone snapping.
    pub fn set_snap_to_note(&mut self, snap: bool) {
        self.snap_to_note = snap;
    }

    /// Last commanded frequency in Hz.
    pub fn last_frequency(&self) -> f64 {
        self.last_frequency
    }

    /// Last commanded surface position.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Set the parked surface position without touching a live graph.
    ///
    /// Used to pre-place key-triggered voices along the surface.
    pub fn park_position(&mut self, position: f64) {
        self.position = position.clamp(0.0, 1.0);
        self.last_frequency = self.current_frequency();
    }

    /// Set the playable span in octaves.
    ///
    /// Reparks the voice's frequency within the new span; takes effect on
    /// the next pitch gesture for a sounding voice.
    pub fn set_octave_span(&mut self, octaves: u32) {
        self.pitch = PitchMapper::with_octaves(octaves);
        self.last_frequency = self.current_frequency();
    }

    /// Whether a pointer or key currently engages this voice.
    pub fn engaged(&self) -> bool {
        self.slider_active || self.keyboard_active
    }

    /// Whether the voice's envelope was opened and not yet released.
    pub fn sound_playing(&self) -> bool {
        self.sound_playing
    }

    /// The voice's pitch mapper.
    pub fn pitch(&self) -> &PitchMapper {
        &self.pitch
    }

    /// The envelope controller, for stage inspection.
    pub fn envelope(&self) -> &EnvelopeController {
        &self.envelope
    }

    /// The live signal graph, if one has been built.
    pub fn graph(&self) -> Option<&SignalGraph> {
        self.graph.as_ref()
    }

    /// Frequency for the current position, shift, and snap setting.
    fn current_frequency(&self) -> f64 {
        let freq = self
            .pitch
            .frequency_from_position(self.position, self.octave_shift);
        if self.snap_to_note {
            self.pitch.snap_to_nearest_note(freq, self.octave_shift)
        } else {
            freq
        }
    }

    /// Build the signal graph if the context is running and none is live.
    fn ensure_graph(
        &mut self,
        ctx: &mut Context,
        builder: &WaveformGraphBuilder,
    ) -> Result<(), GraphError> {
        if self.graph.is_none() && ctx.state() == ContextState::Running {
            let graph = builder.build(ctx, self.kind, self.last_frequency as f32)?;
            self.graph = Some(graph);
        }
        Ok(())
    }

    // --- Sound control ---

    /// Open the envelope at the voice's volume, building the graph lazily.
    pub fn note_on(
        &mut self,
        ctx: &mut Context,
        builder: &WaveformGraphBuilder,
    ) -> Result<(), GraphError> {
        self.ensure_graph(ctx, builder)?;
        let Some(graph) = self.graph else {
            // Context not running; stay silent until the next gesture.
            return Ok(());
        };
        self.envelope.note_on(ctx, graph.output_gain(), self.volume)?;
        self.sound_playing = true;
        self.display_active = true;
        Ok(())
    }

    /// Release the envelope unless the sustain pedal holds it.
    pub fn note_off(&mut self, ctx: &mut Context, sustained: bool) -> Result<(), GraphError> {
        if sustained {
            return Ok(());
        }
        if let Some(graph) = self.graph {
            self.envelope.note_off(ctx, graph.output_gain())?;
        }
        self.sound_playing = false;
        Ok(())
    }

    /// Move the pitch to `position`, retuning a live graph.
    ///
    /// Returns the commanded frequency for display.
    pub fn set_position(&mut self, ctx: &mut Context, position: f64) -> Result<f64, GraphError> {
        self.position = if position.is_finite() {
            position.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.retune(ctx)
    }

    /// Shift the octave by `delta`, retuning without retriggering.
    pub fn shift_octave(&mut self, ctx: &mut Context, delta: i32) -> Result<f64, GraphError> {
        self.octave_shift = self.octave_shift.saturating_add(delta);
        self.retune(ctx)
    }

    /// Recompute the frequency from current state and glide a live graph
    /// onto it.
    fn retune(&mut self, ctx: &mut Context) -> Result<f64, GraphError> {
        let freq = self.current_frequency();
        self.last_frequency = freq;
        if let Some(graph) = self.graph {
            graph.retune(ctx, freq as f32)?;
        }
        Ok(freq)
    }

    /// Change the target volume, gliding a sounding voice onto it.
    pub fn set_volume(&mut self, ctx: &mut Context, volume: f32) -> Result<(), GraphError> {
        self.volume = volume.clamp(0.0, 1.0);
        if self.sound_playing
            && let Some(graph) = self.graph
        {
            self.envelope
                .retarget_volume(ctx, graph.output_gain(), self.volume)?;
        }
        Ok(())
    }

    /// Switch waveform kind, rebuilding a live graph in place.
    ///
    /// Rebuild protocol: mute, tear the old topology down completely, build
    /// the new one at the current pitch, and restore the audible level if
    /// the voice was sounding — so a live switch never clicks and never
    /// leaks nodes.
    pub fn set_waveform(
        &mut self,
        ctx: &mut Context,
        builder: &WaveformGraphBuilder,
        kind: WaveformKind,
    ) -> Result<(), GraphError> {
        if kind == self.kind {
            return Ok(());
        }
        self.kind = kind;

        let Some(old) = self.graph.take() else {
            return Ok(());
        };
        if let Ok(param) = ctx.param_mut(old.output_gain(), estilo_graph::ParamKey::Gain) {
            param.set_value(0.0);
        }
        old.teardown(ctx);

        let graph = builder.build(ctx, self.kind, self.last_frequency as f32)?;
        if self.sound_playing {
            self.envelope.restore(ctx, graph.output_gain(), self.volume)?;
        }
        self.graph = Some(graph);
        Ok(())
    }

    /// Engagement flag setters used by the manager.
    fn set_slider_active(&mut self, active: bool) {
        self.slider_active = active;
    }

    fn set_keyboard_active(&mut self, active: bool) {
        self.keyboard_active = active;
    }

    /// Whether the note display should be cleared now: the readout is
    /// showing but the voice has fully released with nothing holding it.
    fn display_expired(&self, now: f64, sustained: bool) -> bool {
        self.display_active
            && !self.sound_playing
            && !self.engaged()
            && !sustained
            && self.envelope.release_complete(now)
    }
}

/// Owns the voices, the shared sustain latch, and gesture routing.
#[derive(Debug, Clone)]
pub struct VoiceManager {
    voices: Vec<Voice>,
    builder: WaveformGraphBuilder,
    sustain: bool,
    last_interacted: usize,
    /// When set, waveform and volume gestures apply to every voice, the
    /// original single-select behavior. When clear they target only the
    /// selected voice.
    shared_controls: bool,
}

impl Default for VoiceManager {
    fn default() -> Self {
        Self::new(1)
    }
}

impl VoiceManager {
    /// Manager with `count` voices (at least one), shared controls on.
    ///
    /// Key-triggered voices are parked evenly across the surface with
    /// semitone snapping, so the key row plays in tune.
    pub fn new(count: usize) -> Self {
        let count = count.max(1);
        let mut voices = Vec::with_capacity(count);
        for i in 0..count {
            let mut voice = Voice::new(WaveformKind::Sine);
            if count > 1 {
                voice.set_snap_to_note(true);
                voice.park_position(i as f64 / (count - 1) as f64);
            }
            voices.push(voice);
        }
        Self {
            voices,
            builder: WaveformGraphBuilder::new(),
            sustain: false,
            last_interacted: 0,
            shared_controls: true,
        }
    }

    /// Number of voices.
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Read access to all voices.
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Mutable access to one voice for configuration.
    pub fn voice_mut(&mut self, index: usize) -> Option<&mut Voice> {
        self.voices.get_mut(index)
    }

    /// Append a fresh voice, returning its index.
    pub fn add_voice(&mut self) -> usize {
        let template_kind = self.voices[self.last_interacted].kind();
        self.voices.push(Voice::new(template_kind));
        self.voices.len() - 1
    }

    /// Whether the sustain pedal is held.
    pub fn sustain(&self) -> bool {
        self.sustain
    }

    /// Index of the last interacted voice.
    pub fn selected(&self) -> usize {
        self.last_interacted
    }

    /// Route waveform/volume gestures to all voices (true) or only the
    /// selected one (false).
    pub fn set_shared_controls(&mut self, shared: bool) {
        self.shared_controls = shared;
    }

    // --- Gesture handlers ---
    //
    // Pointer gestures drive the selected voice; key gestures select and
    // drive the voice bound to their index. Every handler returns the index
    // of the affected voice so the caller can refresh its display.

    /// Pointer down at `position`.
    pub fn interaction_start(
        &mut self,
        ctx: &mut Context,
        position: f64,
    ) -> Result<usize, GraphError> {
        let index = self.last_interacted;
        let voice = &mut self.voices[index];
        voice.set_slider_active(true);
        voice.set_position(ctx, position)?;
        voice.note_on(ctx, &self.builder)?;
        Ok(index)
    }

    /// Pointer drag to `position`.
    ///
    /// Self-healing: a move while engaged but silent re-opens the envelope,
    /// recovering if gain bookkeeping ever lost sync with the gesture
    /// stream.
    pub fn interaction_move(
        &mut self,
        ctx: &mut Context,
        position: f64,
    ) -> Result<usize, GraphError> {
        let index = self.last_interacted;
        let voice = &mut self.voices[index];
        voice.set_position(ctx, position)?;
        if voice.engaged() && !voice.sound_playing() {
            voice.note_on(ctx, &self.builder)?;
        }
        Ok(index)
    }

    /// Pointer up.
    pub fn interaction_end(&mut self, ctx: &mut Context) -> Result<usize, GraphError> {
        let index = self.last_interacted;
        let sustained = self.sustain;
        let voice = &mut self.voices[index];
        voice.set_slider_active(false);
        voice.note_off(ctx, sustained)?;
        Ok(index)
    }

    /// Key down bound to voice `index`. Ignored while already sounding.
    pub fn key_note_on(&mut self, ctx: &mut Context, index: usize) -> Result<usize, GraphError> {
        if index >= self.voices.len() {
            return Ok(self.last_interacted);
        }
        self.last_interacted = index;
        let voice = &mut self.voices[index];
        voice.set_keyboard_active(true);
        if !voice.sound_playing() {
            // Re-assert the parked pitch before sounding.
            let position = voice.position();
            voice.set_position(ctx, position)?;
            voice.note_on(ctx, &self.builder)?;
        }
        Ok(index)
    }

    /// Key up bound to voice `index`.
    pub fn key_note_off(&mut self, ctx: &mut Context, index: usize) -> Result<usize, GraphError> {
        if index >= self.voices.len() {
            return Ok(self.last_interacted);
        }
        let sustained = self.sustain;
        let voice = &mut self.voices[index];
        voice.set_keyboard_active(false);
        if voice.sound_playing() {
            voice.note_off(ctx, sustained)?;
        }
        Ok(index)
    }

    /// Shift the selected voice's octave, retuning without retrigger.
    pub fn octave_shift(&mut self, ctx: &mut Context, delta: i32) -> Result<usize, GraphError> {
        let index = self.last_interacted;
        self.voices[index].shift_octave(ctx, delta)?;
        Ok(index)
    }

    /// Latch the sustain pedal: all note-offs are deferred.
    pub fn sustain_on(&mut self) {
        self.sustain = true;
    }

    /// Release the sustain pedal.
    ///
    /// Every voice still sounding without a pointer or key holding it gets
    /// its deferred release now.
    pub fn sustain_off(&mut self, ctx: &mut Context) -> Result<(), GraphError> {
        self.sustain = false;
        for voice in &mut self.voices {
            if voice.sound_playing() && !voice.engaged() {
                voice.note_off(ctx, false)?;
            }
        }
        Ok(())
    }

    /// Change waveform kind on the targeted voices, rebuilding live graphs.
    pub fn waveform_changed(
        &mut self,
        ctx: &mut Context,
        kind: WaveformKind,
    ) -> Result<usize, GraphError> {
        if self.shared_controls {
            for voice in &mut self.voices {
                voice.set_waveform(ctx, &self.builder, kind)?;
            }
        } else {
            self.voices[self.last_interacted].set_waveform(ctx, &self.builder, kind)?;
        }
        Ok(self.last_interacted)
    }

    /// Change volume on the targeted voices, gliding any sounding ones.
    pub fn volume_changed(&mut self, ctx: &mut Context, value: f32) -> Result<usize, GraphError> {
        if self.shared_controls {
            for voice in &mut self.voices {
                voice.set_volume(ctx, value)?;
            }
        } else {
            self.voices[self.last_interacted].set_volume(ctx, value)?;
        }
        Ok(self.last_interacted)
    }

    /// Indices whose note display has expired and should be cleared.
    ///
    /// Event-driven hosts call this from their idle loop; each index is
    /// reported once per release.
    pub fn expired_displays(&mut self, now: f64) -> Vec<usize> {
        let sustained = self.sustain;
        let mut expired = Vec::new();
        for (i, voice) in self.voices.iter_mut().enumerate() {
            if voice.display_expired(now, sustained) {
                voice.display_active = false;
                expired.push(i);
            }
        }
        expired
    }
}

/// Exact power-of-two frequency ratio for an octave delta.
pub fn octave_ratio(delta: i32) -> f64 {
    exp2(f64::from(delta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use estilo_graph::Context;

    const SR: f32 = 48_000.0;

    fn running_context() -> Context {
        let mut ctx = Context::new(SR);
        ctx.resume().unwrap();
        ctx
    }

    #[test]
    fn graph_is_built_lazily_on_first_note_on() {
        let mut ctx = running_context();
        let mut manager = VoiceManager::new(1);
        assert!(manager.voices()[0].graph().is_none());

        manager.interaction_start(&mut ctx, 0.5).unwrap();
        assert!(manager.voices()[0].graph().is_some());
        assert_eq!(ctx.census().total(), 2); // sine: osc + gain
    }

    #[test]
    fn suspended_context_defers_graph_building() {
        let mut ctx = Context::new(SR); // never resumed
        let mut manager = VoiceManager::new(1);
        manager.interaction_start(&mut ctx, 0.5).unwrap();
        assert!(manager.voices()[0].graph().is_none());
        assert_eq!(ctx.census().total(), 0);
    }

    #[test]
    fn midpoint_interaction_lands_on_220_hz() {
        let mut ctx = running_context();
        let mut manager = VoiceManager::new(1);
        manager.interaction_start(&mut ctx, 0.5).unwrap();
        let freq = manager.voices()[0].last_frequency();
        assert!((freq - 220.0).abs() < 1e-9, "expected 220 Hz, got {freq}");
    }

    #[test]
    fn octave_shift_retunes_without_retrigger() {
        let mut ctx = running_context();
        let mut manager = VoiceManager::new(1);
        manager.interaction_start(&mut ctx, 0.5).unwrap();

        let gain = manager.voices()[0].graph().unwrap().output_gain();
        let ramps_before = ctx
            .param(gain, estilo_graph::ParamKey::Gain)
            .unwrap()
            .events()
            .len();

        manager.octave_shift(&mut ctx, 1).unwrap();
        let freq = manager.voices()[0].last_frequency();
        assert!((freq - 440.0).abs() < 1e-9, "expected 440 Hz, got {freq}");

        // No new gain automation: the envelope was not retriggered.
        let ramps_after = ctx
            .param(gain, estilo_graph::ParamKey::Gain)
            .unwrap()
            .events()
            .len();
        assert_eq!(ramps_before, ramps_after);
    }

    #[test]
    fn key_note_on_is_ignored_while_sounding() {
        let mut ctx = running_context();
        let mut manager = VoiceManager::new(4);
        manager.key_note_on(&mut ctx, 2).unwrap();
        let gain = manager.voices()[2].graph().unwrap().output_gain();
        let events_first = ctx
            .param(gain, estilo_graph::ParamKey::Gain)
            .unwrap()
            .events()
            .to_vec();

        // Second key-down on the same sounding voice changes nothing.
        manager.key_note_on(&mut ctx, 2).unwrap();
        let events_second = ctx
            .param(gain, estilo_graph::ParamKey::Gain)
            .unwrap()
            .events()
            .to_vec();
        assert_eq!(events_first, events_second);
    }

    #[test]
    fn key_voices_are_parked_across_the_surface() {
        let manager = VoiceManager::new(5);
        let positions: Vec<f64> = manager.voices().iter().map(|v| v.position()).collect();
        assert_eq!(positions[0], 0.0);
        assert_eq!(positions[4], 1.0);
        for pair in positions.windows(2) {
            assert!(pair[0] < pair[1], "positions should ascend: {positions:?}");
        }
    }

    #[test]
    fn sustain_defers_release_until_pedal_lifts() {
        let mut ctx = running_context();
        let mut manager = VoiceManager::new(1);

        manager.sustain_on();
        manager.interaction_start(&mut ctx, 0.5).unwrap();
        manager.interaction_end(&mut ctx).unwrap();

        // Pedal held: still sounding.
        assert!(manager.voices()[0].sound_playing());

        manager.sustain_off(&mut ctx).unwrap();
        assert!(!manager.voices()[0].sound_playing());
    }

    #[test]
    fn sustain_off_skips_engaged_voices() {
        let mut ctx = running_context();
        let mut manager = VoiceManager::new(2);

        manager.sustain_on();
        manager.key_note_on(&mut ctx, 0).unwrap();
        manager.key_note_on(&mut ctx, 1).unwrap();
        manager.key_note_off(&mut ctx, 0).unwrap(); // released, pedal holds it

        manager.sustain_off(&mut ctx).unwrap();
        assert!(!manager.voices()[0].sound_playing(), "pedaled voice releases");
        assert!(manager.voices()[1].sound_playing(), "held key keeps sounding");
    }

    #[test]
    fn waveform_switch_rebuilds_without_leaking_nodes() {
        let mut ctx = running_context();
        let mut manager = VoiceManager::new(1);
        manager.interaction_start(&mut ctx, 0.5).unwrap();
        assert_eq!(ctx.census().total(), 2);

        manager.waveform_changed(&mut ctx, WaveformKind::Fm).unwrap();
        let census = ctx.census();
        assert_eq!(census.oscillators, 2);
        assert_eq!(census.gains, 2);

        manager.waveform_changed(&mut ctx, WaveformKind::Sine).unwrap();
        let census = ctx.census();
        assert_eq!(census.oscillators, 1);
        assert_eq!(census.gains, 1);
        assert_eq!(census.constants, 0);
    }

    #[test]
    fn expired_displays_report_once_after_release() {
        let mut ctx = running_context();
        let mut manager = VoiceManager::new(1);
        manager.interaction_start(&mut ctx, 0.5).unwrap();
        manager.interaction_end(&mut ctx).unwrap();

        // Mid-release: nothing to clear yet.
        let mut out = vec![0.0_f32; (SR as f64 * 0.05) as usize];
        ctx.render(&mut out);
        assert!(manager.expired_displays(ctx.current_time()).is_empty());

        // Past the release: cleared exactly once.
        let mut out = vec![0.0_f32; (SR as f64 * 0.2) as usize];
        ctx.render(&mut out);
        assert_eq!(manager.expired_displays(ctx.current_time()), vec![0]);
        assert!(manager.expired_displays(ctx.current_time()).is_empty());
    }

    #[test]
    fn add_voice_inherits_the_selected_kind() {
        let mut ctx = running_context();
        let mut manager = VoiceManager::new(1);
        manager.waveform_changed(&mut ctx, WaveformKind::Pwm).unwrap();

        let index = manager.add_voice();
        assert_eq!(index, 1);
        assert_eq!(manager.voice_count(), 2);
        assert_eq!(manager.voices()[1].kind(), WaveformKind::Pwm);
    }

    #[test]
    fn octave_ratio_is_exact() {
        assert_eq!(octave_ratio(1), 2.0);
        assert_eq!(octave_ratio(-2), 0.25);
        assert_eq!(octave_ratio(0), 1.0);
    }
}
