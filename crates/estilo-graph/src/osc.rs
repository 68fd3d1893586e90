//! Oscillator source nodes.
//!
//! Oscillators read their frequency parameter at audio rate — automation
//! plus any modulation inputs — so FM patches retune sample-accurately.
//! Saw and square use a 2nd-order polyBLEP correction at their step
//! discontinuities; sine and custom waves are band-limited by construction,
//! and triangle's discontinuity is only in its derivative, so it stays
//! naive.

#[cfg(not(feature = "std"))]
use alloc::sync::Arc;
#[cfg(feature = "std")]
use std::sync::Arc;

use libm::{fabs, floor, sin};

use crate::param::AudioParam;
use crate::wave::PeriodicWave;

/// Wrap to [0, 1), compatible with no_std (no `f64::rem_euclid`).
#[inline]
fn wrap_phase(x: f64) -> f64 {
    let r = x - floor(x);
    if r < 0.0 { r + 1.0 } else { r }
}

/// Oscillator waveform selection.
#[derive(Debug, Clone, Default)]
pub enum Waveform {
    /// Pure sine — single partial.
    #[default]
    Sine,
    /// Square (50% duty), polyBLEP-corrected.
    Square,
    /// Sawtooth, polyBLEP-corrected.
    Sawtooth,
    /// Triangle, naive.
    Triangle,
    /// Custom single-cycle wave from harmonic coefficients.
    Custom(Arc<PeriodicWave>),
}

/// A periodic source node.
///
/// Produces silence until started and again after being stopped. Phase
/// accumulates from per-sample frequency, which may go negative under heavy
/// frequency modulation; the accumulator wraps in both directions.
#[derive(Debug, Clone)]
pub struct OscillatorNode {
    /// Frequency in Hz; automatable and modulatable at audio rate.
    pub frequency: AudioParam,
    waveform: Waveform,
    phase: f64,
    started: bool,
    stopped: bool,
}

impl OscillatorNode {
    /// Create an oscillator with the given waveform and initial frequency.
    pub fn new(waveform: Waveform, frequency_hz: f32) -> Self {
        Self {
            frequency: AudioParam::new(frequency_hz),
            waveform,
            phase: 0.0,
            started: false,
            stopped: false,
        }
    }

    /// The configured waveform.
    pub fn waveform(&self) -> &Waveform {
        &self.waveform
    }

    /// Begin producing output. Idempotent.
    pub fn start(&mut self) {
        self.started = true;
    }

    /// Stop producing output permanently. Idempotent.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Whether the node currently produces output.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.started && !self.stopped
    }

    /// Render one sample at time `t`, with `freq_mod` summed onto the
    /// frequency automation value. `dt` is the sample period in seconds.
    #[inline]
    pub(crate) fn render_sample(&mut self, t: f64, dt: f64, freq_mod: f32) -> f32 {
        if !self.is_running() {
            return 0.0;
        }

        let freq = f64::from(self.frequency.evaluate(t) + freq_mod);
        let phase_inc = freq * dt;
        let out = sample_waveform(&self.waveform, self.phase, fabs(phase_inc));

        self.phase = wrap_phase(self.phase + phase_inc);
        out
    }
}

/// Evaluate `waveform` at normalized phase [0, 1).
///
/// `dt` is the per-sample phase increment, used as the polyBLEP window
/// width.
#[inline]
fn sample_waveform(waveform: &Waveform, phase: f64, dt: f64) -> f32 {
    match waveform {
        Waveform::Sine => sin(phase * core::f64::consts::TAU) as f32,

        Waveform::Square => {
            let naive = if phase < 0.5 { 1.0 } else { -1.0 };
            naive + poly_blep(phase, dt) - poly_blep(wrap_phase(phase + 0.5), dt)
        }

        Waveform::Sawtooth => {
            let naive = (2.0 * phase - 1.0) as f32;
            naive - poly_blep(phase, dt)
        }

        Waveform::Triangle => (1.0 - 4.0 * fabs(phase - 0.5)) as f32,

        Waveform::Custom(wave) => wave.sample(phase),
    }
}

/// 2nd-order polyBLEP correction near a step discontinuity at phase 0.
///
/// Smooths the step over one sample on each side; returns 0 away from the
/// discontinuity.
#[inline]
fn poly_blep(t: f64, dt: f64) -> f32 {
    if dt <= 0.0 {
        return 0.0;
    }
    if t < dt {
        let x = t / dt;
        (2.0 * x - x * x - 1.0) as f32
    } else if t > 1.0 - dt {
        let x = (t - 1.0) / dt;
        (x * x + 2.0 * x + 1.0) as f32
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 48_000.0;

    fn run(osc: &mut OscillatorNode, samples: usize) -> Vec<f32> {
        let dt = 1.0 / SR;
        (0..samples)
            .map(|i| osc.render_sample(i as f64 * dt, dt, 0.0))
            .collect()
    }

    #[test]
    fn silent_until_started() {
        let mut osc = OscillatorNode::new(Waveform::Sine, 440.0);
        assert_eq!(osc.render_sample(0.0, 1.0 / SR, 0.0), 0.0);

        osc.start();
        let out = run(&mut osc, 100);
        assert!(out.iter().any(|&x| x.abs() > 0.1));
    }

    #[test]
    fn silent_after_stopped() {
        let mut osc = OscillatorNode::new(Waveform::Sine, 440.0);
        osc.start();
        run(&mut osc, 100);
        osc.stop();
        let out = run(&mut osc, 100);
        assert!(out.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn sine_cycle_count_matches_frequency() {
        let mut osc = OscillatorNode::new(Waveform::Sine, 440.0);
        osc.start();
        let out = run(&mut osc, SR as usize);

        let mut crossings = 0_i32;
        let mut prev = 0.0_f32;
        for &x in &out {
            if prev <= 0.0 && x > 0.0 {
                crossings += 1;
            }
            prev = x;
        }
        assert!(
            (crossings - 440).abs() <= 2,
            "expected ~440 cycles, counted {crossings}"
        );
    }

    #[test]
    fn frequency_modulation_shifts_pitch() {
        // +110 Hz of constant modulation on a 110 Hz oscillator doubles it.
        let mut osc = OscillatorNode::new(Waveform::Sine, 110.0);
        osc.start();
        let dt = 1.0 / SR;
        let out: Vec<f32> = (0..SR as usize)
            .map(|i| osc.render_sample(i as f64 * dt, dt, 110.0))
            .collect();

        let mut crossings = 0_i32;
        let mut prev = 0.0_f32;
        for &x in &out {
            if prev <= 0.0 && x > 0.0 {
                crossings += 1;
            }
            prev = x;
        }
        assert!(
            (crossings - 220).abs() <= 2,
            "expected ~220 cycles, counted {crossings}"
        );
    }

    #[test]
    fn waveforms_stay_in_range() {
        for waveform in [Waveform::Square, Waveform::Sawtooth, Waveform::Triangle] {
            let mut osc = OscillatorNode::new(waveform, 440.0);
            osc.start();
            for x in run(&mut osc, 10_000) {
                assert!((-2.0..=2.0).contains(&x), "sample out of range: {x}");
            }
        }
    }

    #[test]
    fn negative_frequency_wraps_phase_backwards() {
        let mut osc = OscillatorNode::new(Waveform::Sine, 100.0);
        osc.start();
        let dt = 1.0 / SR;
        // Push net frequency to -100 Hz; output must stay finite and bounded.
        for i in 0..1000 {
            let x = osc.render_sample(i as f64 * dt, dt, -200.0);
            assert!(x.is_finite() && (-1.0..=1.0).contains(&x));
        }
    }
}
