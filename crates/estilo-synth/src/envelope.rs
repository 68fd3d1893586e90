//! Attack/release envelope control over a patch's output gain.
//!
//! The controller never touches samples itself: it schedules gain
//! automation on the audio timeline, cancelling any in-flight ramp first so
//! overlapping gestures can never leave stale automation behind. Ramps
//! always anchor at the gain's current value, which is what makes a release
//! that interrupts an attack click-free — the release starts exactly where
//! the attack had gotten to.

use estilo_graph::{Context, GraphError, NodeId, ParamKey};

/// Default attack ramp length, seconds.
pub const ATTACK_TIME: f64 = 0.015;

/// Default release ramp length, seconds.
pub const RELEASE_TIME: f64 = 0.150;

/// Near-zero release floor.
///
/// Releasing to exactly zero leaves exponential retargeting chasing a value
/// it can never scale away from; a -80 dB floor is inaudible and keeps
/// every later ramp well-conditioned.
pub const RELEASE_FLOOR: f32 = 1e-4;

/// Smoothing constant for live volume changes while sustaining, seconds.
const VOLUME_RETARGET_TAU: f64 = 0.010;

/// Envelope stage, refined by elapsed time on the audio clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeStage {
    /// No sound scheduled.
    #[default]
    Silent,
    /// Attack ramp in flight.
    Attacking,
    /// Holding at the target volume.
    Sustaining,
    /// Release ramp in flight or complete.
    Releasing,
}

/// Drives a gain node through attack and release ramps.
#[derive(Debug, Clone)]
pub struct EnvelopeController {
    attack: f64,
    release: f64,
    stage: EnvelopeStage,
    /// When the in-flight ramp lands (attack or release end time).
    stage_ends: f64,
}

impl Default for EnvelopeController {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvelopeController {
    /// Controller with the default 15 ms attack and 150 ms release.
    pub fn new() -> Self {
        Self::with_times(ATTACK_TIME, RELEASE_TIME)
    }

    /// Controller with explicit ramp times in seconds.
    pub fn with_times(attack: f64, release: f64) -> Self {
        Self {
            attack: attack.max(0.001),
            release: release.max(0.001),
            stage: EnvelopeStage::Silent,
            stage_ends: 0.0,
        }
    }

    /// Attack ramp length in seconds.
    pub fn attack(&self) -> f64 {
        self.attack
    }

    /// Release ramp length in seconds.
    pub fn release(&self) -> f64 {
        self.release
    }

    /// The stage as of audio time `now`.
    ///
    /// Attack promotes to sustain and release to silent once their ramps
    /// have landed; the promotion is observational, no scheduling happens.
    pub fn stage(&self, now: f64) -> EnvelopeStage {
        match self.stage {
            EnvelopeStage::Attacking if now >= self.stage_ends => EnvelopeStage::Sustaining,
            EnvelopeStage::Releasing if now >= self.stage_ends => EnvelopeStage::Silent,
            stage => stage,
        }
    }

    /// Whether the envelope is in attack or sustain at `now`.
    pub fn is_sounding(&self, now: f64) -> bool {
        matches!(
            self.stage(now),
            EnvelopeStage::Attacking | EnvelopeStage::Sustaining
        )
    }

    /// Whether a release has fully landed by `now`.
    pub fn release_complete(&self, now: f64) -> bool {
        self.stage(now) == EnvelopeStage::Silent
    }

    /// Ramp the gain from wherever it is to `volume` over the attack time.
    ///
    /// Cancels pending automation first so a re-trigger replaces, rather
    /// than stacks on, an earlier gesture's ramps.
    pub fn note_on(
        &mut self,
        ctx: &mut Context,
        gain: NodeId,
        volume: f32,
    ) -> Result<(), GraphError> {
        let now = ctx.current_time();
        ctx.cancel_scheduled_values(gain, ParamKey::Gain, now)?;
        let current = ctx.param(gain, ParamKey::Gain)?.value();
        ctx.set_value_at(gain, ParamKey::Gain, current, now)?;
        ctx.linear_ramp_to_value_at(gain, ParamKey::Gain, volume, now + self.attack)?;

        self.stage = EnvelopeStage::Attacking;
        self.stage_ends = now + self.attack;
        Ok(())
    }

    /// Ramp the gain from its current value down to the release floor.
    ///
    /// Anchors at the current value, so releasing mid-attack continues
    /// from the attack's reached level without a discontinuity.
    pub fn note_off(&mut self, ctx: &mut Context, gain: NodeId) -> Result<(), GraphError> {
        let now = ctx.current_time();
        ctx.cancel_scheduled_values(gain, ParamKey::Gain, now)?;
        let current = ctx.param(gain, ParamKey::Gain)?.value();
        ctx.set_value_at(gain, ParamKey::Gain, current, now)?;
        ctx.linear_ramp_to_value_at(gain, ParamKey::Gain, RELEASE_FLOOR, now + self.release)?;

        self.stage = EnvelopeStage::Releasing;
        self.stage_ends = now + self.release;
        Ok(())
    }

    /// Retarget the sustained volume without restarting the envelope.
    pub fn retarget_volume(
        &mut self,
        ctx: &mut Context,
        gain: NodeId,
        volume: f32,
    ) -> Result<(), GraphError> {
        let now = ctx.current_time();
        ctx.set_target_at(gain, ParamKey::Gain, volume, now, VOLUME_RETARGET_TAU)
    }

    /// Snap the gain open to `volume` with a short glide.
    ///
    /// Used after a live graph rebuild to restore the audible level of a
    /// voice that was sounding, without running a full attack.
    pub fn restore(&mut self, ctx: &mut Context, gain: NodeId, volume: f32) -> Result<(), GraphError> {
        let now = ctx.current_time();
        ctx.set_target_at(gain, ParamKey::Gain, volume, now, VOLUME_RETARGET_TAU / 2.0)
    }

    /// Drop back to silent without scheduling anything.
    ///
    /// Used when the graph the envelope was driving has been torn down.
    pub fn reset(&mut self) {
        self.stage = EnvelopeStage::Silent;
        self.stage_ends = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estilo_graph::AutomationEvent;

    const SR: f32 = 48_000.0;

    fn patched_context() -> (Context, NodeId) {
        let mut ctx = Context::new(SR);
        ctx.resume().unwrap();
        let dc = ctx.create_constant_source(1.0).unwrap();
        let gain = ctx.create_gain(0.0).unwrap();
        ctx.connect(dc, gain).unwrap();
        ctx.connect_to_destination(gain).unwrap();
        ctx.start(dc).unwrap();
        (ctx, gain)
    }

    fn ramp_count(ctx: &Context, gain: NodeId) -> usize {
        ctx.param(gain, ParamKey::Gain)
            .unwrap()
            .events()
            .iter()
            .filter(|e| matches!(e, AutomationEvent::LinearRamp { .. }))
            .count()
    }

    #[test]
    fn note_on_schedules_one_attack_ramp() {
        let (mut ctx, gain) = patched_context();
        let mut env = EnvelopeController::new();

        env.note_on(&mut ctx, gain, 0.8).unwrap();
        assert_eq!(ramp_count(&ctx, gain), 1);
        assert_eq!(env.stage(ctx.current_time()), EnvelopeStage::Attacking);
    }

    #[test]
    fn immediate_note_off_replaces_not_stacks() {
        let (mut ctx, gain) = patched_context();
        let mut env = EnvelopeController::new();

        env.note_on(&mut ctx, gain, 0.8).unwrap();
        env.note_off(&mut ctx, gain).unwrap();

        // The attack's ramp was cancelled; exactly one (release) ramp
        // remains scheduled.
        assert_eq!(ramp_count(&ctx, gain), 1);
        assert_eq!(env.stage(ctx.current_time()), EnvelopeStage::Releasing);
    }

    #[test]
    fn release_anchors_at_the_attacks_reached_level() {
        let (mut ctx, gain) = patched_context();
        let mut env = EnvelopeController::new();

        env.note_on(&mut ctx, gain, 1.0).unwrap();

        // Render a third of the attack, then release mid-ramp.
        let mid_attack = (SR as f64 * env.attack() / 3.0) as usize;
        let mut out = vec![0.0_f32; mid_attack];
        ctx.render(&mut out);
        let reached = ctx.param(gain, ParamKey::Gain).unwrap().value();
        assert!(reached > 0.1 && reached < 0.6, "mid-attack level {reached}");

        env.note_off(&mut ctx, gain).unwrap();
        let mut out = vec![0.0_f32; 8];
        ctx.render(&mut out);

        // The first released samples continue from the reached level.
        assert!(
            (out[0] - reached).abs() < 0.01,
            "release should start at {reached}, got {}",
            out[0]
        );
    }

    #[test]
    fn attack_promotes_to_sustain_after_its_ramp() {
        let (mut ctx, gain) = patched_context();
        let mut env = EnvelopeController::new();
        env.note_on(&mut ctx, gain, 0.8).unwrap();

        let mut out = vec![0.0_f32; (SR as f64 * env.attack() * 2.0) as usize];
        ctx.render(&mut out);

        assert_eq!(env.stage(ctx.current_time()), EnvelopeStage::Sustaining);
        assert!(env.is_sounding(ctx.current_time()));
    }

    #[test]
    fn release_lands_at_the_floor_and_goes_silent() {
        let (mut ctx, gain) = patched_context();
        let mut env = EnvelopeController::new();
        env.note_on(&mut ctx, gain, 0.8).unwrap();

        let mut out = vec![0.0_f32; (SR as f64 * 0.05) as usize];
        ctx.render(&mut out);
        env.note_off(&mut ctx, gain).unwrap();

        let mut out = vec![0.0_f32; (SR as f64 * env.release() * 1.5) as usize];
        ctx.render(&mut out);

        let level = ctx.param(gain, ParamKey::Gain).unwrap().value();
        assert!(
            (level - RELEASE_FLOOR).abs() < 1e-5,
            "release should land at the floor, got {level}"
        );
        assert!(env.release_complete(ctx.current_time()));
        assert!(!env.is_sounding(ctx.current_time()));
    }

    #[test]
    fn volume_retarget_keeps_the_stage() {
        let (mut ctx, gain) = patched_context();
        let mut env = EnvelopeController::new();
        env.note_on(&mut ctx, gain, 0.8).unwrap();

        let mut out = vec![0.0_f32; (SR as f64 * 0.05) as usize];
        ctx.render(&mut out);
        assert_eq!(env.stage(ctx.current_time()), EnvelopeStage::Sustaining);

        env.retarget_volume(&mut ctx, gain, 0.3).unwrap();
        assert_eq!(env.stage(ctx.current_time()), EnvelopeStage::Sustaining);

        let mut out = vec![0.0_f32; (SR as f64 * 0.1) as usize];
        ctx.render(&mut out);
        let level = ctx.param(gain, ParamKey::Gain).unwrap().value();
        assert!((level - 0.3).abs() < 0.01, "expected glide to 0.3, got {level}");
    }
}
