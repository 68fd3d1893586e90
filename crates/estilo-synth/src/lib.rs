//! Estilo Synth - the stylophone synthesis engine
//!
//! This crate turns surface gestures into sound: a logarithmic pitch
//! surface, per-waveform signal topologies, attack/release envelope
//! shaping, and multi-voice state with a shared sustain pedal, all driving
//! the `estilo-graph` audio subsystem.
//!
//! # Core Components
//!
//! ## Pitch Mapping
//!
//! - [`PitchMapper`] - normalized surface position ↔ frequency, octave
//!   shifting, semitone snapping
//! - [`note_name_from_frequency`] - nearest-note naming (`"A4"`)
//!
//! ```rust
//! use estilo_synth::PitchMapper;
//!
//! let mapper = PitchMapper::new();
//! let freq = mapper.frequency_from_position(0.5, 0);
//! assert!((freq - 220.0).abs() < 1e-9);
//! ```
//!
//! ## Waveform Patches
//!
//! - [`WaveformKind`] - sine/square/sawtooth/triangle/pwm/fm/am/ring
//! - [`SignalGraph`] - the realized topology, one tagged variant per kind
//! - [`WaveformGraphBuilder`] - builds, retunes, and tears down topologies
//!
//! ## Envelope
//!
//! - [`EnvelopeController`] - attack/release gain ramps scheduled on the
//!   audio timeline, sustain-aware
//!
//! ## Voices
//!
//! - [`Voice`] - one playable unit: pitch, patch, envelope, interaction
//!   state
//! - [`VoiceManager`] - the voice set, sustain latch, and gesture routing
//! - [`Session`] / [`Gesture`] - host-facing gesture entry point with
//!   status and display reporting
//!
//! # Example
//!
//! ```rust
//! use estilo_graph::Context;
//! use estilo_synth::{Gesture, Session, VoiceManager, WaveformKind};
//!
//! let mut ctx = Context::new(48_000.0);
//! let mut session = Session::headless(VoiceManager::new(1));
//!
//! session.handle(&mut ctx, Gesture::WaveformChanged { kind: WaveformKind::Fm }).unwrap();
//! session.handle(&mut ctx, Gesture::InteractionStart { position: 0.5 }).unwrap();
//!
//! let mut buffer = vec![0.0_f32; 1024];
//! ctx.render(&mut buffer);
//! ```
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible. Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! estilo-synth = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod envelope;
pub mod event;
pub mod patch;
pub mod pitch;
pub mod session;
pub mod voice;

// Re-export main types at crate root
pub use envelope::{ATTACK_TIME, EnvelopeController, EnvelopeStage, RELEASE_FLOOR, RELEASE_TIME};
pub use event::Gesture;
pub use patch::{
    AM_DEPTH, AM_RATE_HZ, FM_DEPTH_SCALE, FM_RATIO, PWM_PARTIALS, RING_RATIO, SignalGraph,
    WaveformGraphBuilder, WaveformKind,
};
pub use pitch::{
    BASE_MIN_HZ, DEFAULT_OCTAVES, NOTE_NAMES, PitchMapper, frequency_of_note,
    note_name_from_frequency,
};
pub use session::{AudioStatus, DisplaySink, NullDisplay, Session};
pub use voice::{DEFAULT_VOLUME, Voice, VoiceManager, octave_ratio};

// Re-export the graph types hosts need to drive a session
pub use estilo_graph::{Context, ContextState, GraphError};
