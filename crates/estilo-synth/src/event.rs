//! Semantic gesture events.
//!
//! Input plumbing (pointer, touch, terminal keys) is translated by the host
//! into these gestures; the synthesis core never sees raw platform events.

use crate::patch::WaveformKind;

/// A semantic input gesture, dispatched into a
/// [`Session`](crate::session::Session).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// Pointer/touch down on the surface at a normalized position.
    InteractionStart {
        /// Position along the surface, [0, 1].
        position: f64,
    },
    /// Pointer/touch drag to a normalized position.
    InteractionMove {
        /// Position along the surface, [0, 1].
        position: f64,
    },
    /// Pointer/touch lifted.
    InteractionEnd,
    /// Key down bound to a voice index.
    KeyNoteOn {
        /// The bound voice.
        voice: usize,
    },
    /// Key up bound to a voice index.
    KeyNoteOff {
        /// The bound voice.
        voice: usize,
    },
    /// Transpose the selected voice by whole octaves.
    OctaveShift {
        /// Signed octave delta, typically ±1.
        delta: i32,
    },
    /// Latch the sustain pedal.
    SustainOn,
    /// Release the sustain pedal.
    SustainOff,
    /// Select a waveform kind.
    WaveformChanged {
        /// The new kind.
        kind: WaveformKind,
    },
    /// Move the volume control.
    VolumeChanged {
        /// New volume, [0, 1].
        value: f32,
    },
}
