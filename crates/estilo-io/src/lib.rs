//! Audio I/O layer for the estilo synthesizer.
//!
//! This crate connects an [`estilo_graph::Context`] to the outside world:
//!
//! - **Real-time output**: [`OutputStream`] renders a shared context into
//!   the platform's default audio device via cpal
//! - **Offline rendering**: [`render_seconds`] pulls audio from a context
//!   into a buffer, and [`write_wav`] saves it as a 16-bit WAV file
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::{Arc, Mutex};
//! use estilo_graph::Context;
//! use estilo_io::{OutputStream, StreamSettings};
//!
//! let ctx = Arc::new(Mutex::new(Context::new(44_100.0)));
//! let stream = OutputStream::open(StreamSettings::default(), Arc::clone(&ctx))?;
//! // Audio plays until `stream` is dropped; drive the context through
//! // its mutex from the control thread.
//! # Ok::<(), estilo_io::Error>(())
//! ```

mod stream;
mod wav;

pub use stream::{OutputStream, StreamSettings, default_output_device_name};
pub use wav::{render_seconds, write_wav};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
