//! Estilo Graph - audio node graph with scheduled parameter automation
//!
//! This crate provides the audio subsystem the estilo synthesizer drives: a
//! small node graph (oscillators, gain stages, constant sources) whose
//! parameters are automated on the rendering timeline rather than from the
//! calling thread, so envelope ramps and pitch glides are sample-accurate
//! regardless of control-thread timing.
//!
//! # Core Types
//!
//! - [`Context`] — owns nodes, connections, the sample clock, and the
//!   lifecycle (`Suspended` / `Running` / `Closed`)
//! - [`AudioParam`] — an automatable value with a scheduled event timeline
//! - [`Waveform`] / [`PeriodicWave`] — oscillator shapes, including custom
//!   single-cycle waves from harmonic coefficients
//! - [`NodeId`] / [`ParamKey`] — handles for routing and automation
//!
//! # Example
//!
//! ```rust
//! use estilo_graph::{Context, ParamKey, Waveform};
//!
//! let mut ctx = Context::new(48_000.0);
//! ctx.resume().unwrap();
//!
//! let osc = ctx.create_oscillator(Waveform::Sawtooth, 220.0).unwrap();
//! let gain = ctx.create_gain(0.0).unwrap();
//! ctx.connect(osc, gain).unwrap();
//! ctx.connect_to_destination(gain).unwrap();
//! ctx.start(osc).unwrap();
//!
//! // Fade in over 15 ms, scheduled on the audio timeline.
//! let now = ctx.current_time();
//! ctx.set_value_at(gain, ParamKey::Gain, 0.0, now).unwrap();
//! ctx.linear_ramp_to_value_at(gain, ParamKey::Gain, 0.8, now + 0.015)
//!     .unwrap();
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
//! estilo-graph = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod context;
pub mod node;
pub mod osc;
pub mod param;
pub mod wave;

// Re-export main types at crate root
pub use context::{Context, ContextState, GraphError, NodeCensus, RENDER_QUANTUM};
pub use node::{ConstantSourceNode, GainNode, NodeId, ParamKey};
pub use osc::{OscillatorNode, Waveform};
pub use param::{AudioParam, AutomationEvent};
pub use wave::PeriodicWave;
