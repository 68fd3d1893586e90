//! CLI subcommands.

pub mod kinds;
pub mod live;
pub mod play;
pub mod render;

use estilo_synth::Gesture;

/// A simple eight-step phrase walking up the surface, used by the demo
/// commands. Positions land on scale-ish points of the two-octave span.
pub const DEMO_POSITIONS: [f64; 8] = [0.0, 0.125, 0.25, 0.375, 0.5, 0.625, 0.75, 1.0];

/// The gestures that apply a waveform and volume before a phrase.
pub fn setup_gestures(kind: estilo_synth::WaveformKind, volume: f32) -> [Gesture; 2] {
    [
        Gesture::WaveformChanged { kind },
        Gesture::VolumeChanged { value: volume },
    ]
}
