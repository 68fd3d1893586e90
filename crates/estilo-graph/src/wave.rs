//! Custom periodic waveforms from harmonic coefficient tables.
//!
//! A [`PeriodicWave`] is defined by per-harmonic Fourier coefficients:
//! `real[n]` scales the cosine partial at harmonic `n`, `imag[n]` the sine
//! partial. Index 0 is the DC term and is ignored. The waveform is rendered
//! once into a single-cycle lookup table, peak-normalized, and shared
//! read-only between every oscillator that uses it.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use libm::{cos, fabsf, floor, sin};

/// Samples in the rendered single cycle.
///
/// 2048 points keeps interpolation error below audibility for the harmonic
/// counts this engine uses (tables of ~8 partials).
const TABLE_SIZE: usize = 2048;

/// A single-cycle waveform rendered from harmonic coefficients.
///
/// Construct once, wrap in an `Arc`, and hand to any number of oscillators;
/// the table is immutable after construction.
#[derive(Debug, Clone)]
pub struct PeriodicWave {
    table: Vec<f32>,
}

impl PeriodicWave {
    /// Render a wave from cosine (`real`) and sine (`imag`) coefficients.
    ///
    /// The shorter slice is padded with zeros; index 0 of both is ignored.
    /// The rendered cycle is normalized so its peak magnitude is 1.0
    /// (unless the table is all-zero, which renders silence).
    pub fn new(real: &[f32], imag: &[f32]) -> Self {
        let harmonics = real.len().max(imag.len());
        let mut table = Vec::with_capacity(TABLE_SIZE);

        let tau = core::f64::consts::TAU;
        for s in 0..TABLE_SIZE {
            let phase = s as f64 / TABLE_SIZE as f64;
            let mut sum = 0.0_f64;
            for n in 1..harmonics {
                let a = f64::from(real.get(n).copied().unwrap_or(0.0));
                let b = f64::from(imag.get(n).copied().unwrap_or(0.0));
                let angle = tau * n as f64 * phase;
                sum += a * cos(angle) + b * sin(angle);
            }
            table.push(sum as f32);
        }

        let peak = table.iter().fold(0.0_f32, |acc, &x| acc.max(fabsf(x)));
        if peak > 0.0 {
            for x in &mut table {
                *x /= peak;
            }
        }

        Self { table }
    }

    /// Sample the cycle at normalized phase [0, 1), linearly interpolated.
    #[inline]
    pub fn sample(&self, phase: f64) -> f32 {
        let wrapped = phase - floor(phase);
        let pos = wrapped * self.table.len() as f64;
        let i0 = pos as usize % self.table.len();
        let i1 = (i0 + 1) % self.table.len();
        let frac = (pos - floor(pos)) as f32;
        self.table[i0] + (self.table[i1] - self.table[i0]) * frac
    }
}
