//! Pitch mapping between surface position, frequency, and note names.
//!
//! The playing surface is a normalized position in [0, 1] spanning a
//! configurable number of octaves above a base frequency. The mapping is
//! logarithmic (equal-ratio), so equal distances along the surface are
//! equal musical intervals. An integer octave shift transposes the whole
//! range by powers of two.
//!
//! All pitch math is `f64`: the mapping must invert to within floating
//! rounding error, which single precision cannot guarantee over the
//! audible range. Conversion to `f32` happens only at the graph boundary.

#[cfg(not(feature = "std"))]
use alloc::string::{String, ToString};

use libm::{exp2, log, log2, round};

/// Bottom of the unshifted playable range: A2.
pub const BASE_MIN_HZ: f64 = 110.0;

/// Default playable span in octaves (A2..A4, the classic surface).
pub const DEFAULT_OCTAVES: u32 = 2;

/// The chromatic scale starting at C.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// MIDI-style note number of A4 (440 Hz).
const A4_NOTE: f64 = 69.0;
const A4_HZ: f64 = 440.0;

/// Maps normalized surface position to frequency and back.
#[derive(Debug, Clone)]
pub struct PitchMapper {
    base_min: f64,
    octaves: u32,
}

impl Default for PitchMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl PitchMapper {
    /// Mapper over the default A2..A4 surface.
    pub fn new() -> Self {
        Self::with_octaves(DEFAULT_OCTAVES)
    }

    /// Mapper spanning `octaves` octaves above [`BASE_MIN_HZ`].
    ///
    /// A span of zero octaves would make the mapping degenerate, so the
    /// span is at least one.
    pub fn with_octaves(octaves: u32) -> Self {
        Self {
            base_min: BASE_MIN_HZ,
            octaves: octaves.max(1),
        }
    }

    /// The configured span in octaves.
    pub fn octaves(&self) -> u32 {
        self.octaves
    }

    /// The playable frequency range under `octave_shift`, as `(min, max)`.
    pub fn range(&self, octave_shift: i32) -> (f64, f64) {
        let shift = exp2(f64::from(octave_shift));
        let min = self.base_min * shift;
        (min, min * exp2(f64::from(self.octaves)))
    }

    /// Frequency at a normalized surface position.
    ///
    /// `position` is clamped to [0, 1] first (non-finite input maps to the
    /// range bottom), so the result always lies inside the shifted range.
    pub fn frequency_from_position(&self, position: f64, octave_shift: i32) -> f64 {
        let position = if position.is_finite() {
            position.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let (min, _) = self.range(octave_shift);
        // Equal-ratio interpolation: min * (max/min)^position.
        min * exp2(f64::from(self.octaves) * position)
    }

    /// Normalized surface position of a frequency, the inverse mapping.
    ///
    /// Used to place note markers along the surface. The result is outside
    /// [0, 1] for frequencies outside the shifted range.
    pub fn position_of_frequency(&self, freq: f64, octave_shift: i32) -> f64 {
        let (min, max) = self.range(octave_shift);
        log(freq / min) / log(max / min)
    }

    /// Snap a frequency to the nearest equal-tempered semitone.
    ///
    /// Returns the snapped frequency only when it stays inside the shifted
    /// playable range; otherwise the input passes through unchanged, so
    /// snapping never pushes pitch off the surface.
    pub fn snap_to_nearest_note(&self, freq: f64, octave_shift: i32) -> f64 {
        let (min, max) = self.range(octave_shift);
        let Some(note) = note_number_from_frequency(freq) else {
            return freq;
        };
        let snapped = frequency_of_note(note);
        if (min..=max).contains(&snapped) {
            snapped
        } else {
            freq
        }
    }
}

/// Nearest MIDI-style note number for a frequency, `None` for
/// non-positive or non-finite input.
fn note_number_from_frequency(freq: f64) -> Option<i64> {
    if !freq.is_finite() || freq <= 0.0 {
        return None;
    }
    Some(round(12.0 * log2(freq / A4_HZ) + A4_NOTE) as i64)
}

/// Frequency of a MIDI-style note number (A4 = 69 = 440 Hz).
pub fn frequency_of_note(note: i64) -> f64 {
    A4_HZ * exp2((note as f64 - A4_NOTE) / 12.0)
}

/// Name of the nearest note, e.g. `"A4"` for 440 Hz.
///
/// Returns an empty string for non-positive input rather than failing.
pub fn note_name_from_frequency(freq: f64) -> String {
    let Some(note) = note_number_from_frequency(freq) else {
        return String::new();
    };
    let index = note.rem_euclid(12) as usize;
    let octave = note.div_euclid(12) - 1;
    let mut name = String::from(NOTE_NAMES[index]);
    name.push_str(&octave.to_string());
    name
}
