//! Session: gesture entry point, audio status, and display routing.
//!
//! A [`Session`] wraps a [`VoiceManager`] with the two host-facing
//! concerns the manager itself stays free of: resuming a suspended context
//! on the first gesture (aborting gracefully if the audio subsystem won't
//! come up), and feeding note/frequency text plus readiness status to a
//! [`DisplaySink`].

#[cfg(not(feature = "std"))]
use alloc::boxed::Box;

use estilo_graph::{Context, ContextState, GraphError};

use crate::event::Gesture;
use crate::pitch::note_name_from_frequency;
use crate::voice::VoiceManager;

/// Audio subsystem readiness, as presented to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioStatus {
    /// Rendering; ready to play.
    Ready,
    /// Waiting for a first gesture to start the audio subsystem.
    Suspended,
    /// The audio subsystem has shut down.
    Closed,
    /// The audio subsystem failed to start or is unavailable.
    Error,
}

impl AudioStatus {
    /// The status for a context state.
    pub fn of(state: ContextState) -> Self {
        match state {
            ContextState::Running => Self::Ready,
            ContextState::Suspended => Self::Suspended,
            ContextState::Closed => Self::Closed,
        }
    }
}

/// Receives per-voice note readouts and subsystem status.
pub trait DisplaySink {
    /// Show a voice's note name and frequency.
    fn note_display(&mut self, voice: usize, note_name: &str, frequency_hz: f64);

    /// Clear a voice's note readout.
    fn clear_note_display(&mut self, voice: usize);

    /// Present the audio subsystem's readiness.
    fn status(&mut self, status: AudioStatus);
}

/// A sink that drops everything, for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn note_display(&mut self, _voice: usize, _note_name: &str, _frequency_hz: f64) {}

    fn clear_note_display(&mut self, _voice: usize) {}

    fn status(&mut self, _status: AudioStatus) {}
}

/// The top-level gesture handler.
pub struct Session {
    manager: VoiceManager,
    display: Box<dyn DisplaySink + Send>,
    last_status: Option<AudioStatus>,
}

impl Session {
    /// Session over `manager`, reporting to `display`.
    pub fn new(manager: VoiceManager, display: Box<dyn DisplaySink + Send>) -> Self {
        Self {
            manager,
            display,
            last_status: None,
        }
    }

    /// Headless session with no display.
    pub fn headless(manager: VoiceManager) -> Self {
        Self::new(manager, Box::new(NullDisplay))
    }

    /// The voice manager.
    pub fn manager(&self) -> &VoiceManager {
        &self.manager
    }

    /// Mutable access to the voice manager for configuration.
    pub fn manager_mut(&mut self) -> &mut VoiceManager {
        &mut self.manager
    }

    /// Handle one gesture.
    ///
    /// A gesture arriving while the context is suspended first attempts to
    /// resume it; if that fails the failure is reported as a status and the
    /// gesture is dropped — voices stay intact and the next gesture retries.
    pub fn handle(&mut self, ctx: &mut Context, gesture: Gesture) -> Result<(), GraphError> {
        if ctx.state() == ContextState::Suspended && ctx.resume().is_err() {
            self.report_status(AudioStatus::Error);
            return Ok(());
        }
        self.report_status(AudioStatus::of(ctx.state()));

        let affected = match gesture {
            Gesture::InteractionStart { position } => {
                Some(self.manager.interaction_start(ctx, position)?)
            }
            Gesture::InteractionMove { position } => {
                Some(self.manager.interaction_move(ctx, position)?)
            }
            Gesture::InteractionEnd => {
                self.manager.interaction_end(ctx)?;
                None
            }
            Gesture::KeyNoteOn { voice } => Some(self.manager.key_note_on(ctx, voice)?),
            Gesture::KeyNoteOff { voice } => {
                self.manager.key_note_off(ctx, voice)?;
                None
            }
            Gesture::OctaveShift { delta } => Some(self.manager.octave_shift(ctx, delta)?),
            Gesture::SustainOn => {
                self.manager.sustain_on();
                None
            }
            Gesture::SustainOff => {
                self.manager.sustain_off(ctx)?;
                None
            }
            Gesture::WaveformChanged { kind } => {
                self.manager.waveform_changed(ctx, kind)?;
                None
            }
            Gesture::VolumeChanged { value } => {
                self.manager.volume_changed(ctx, value)?;
                None
            }
        };

        if let Some(index) = affected {
            let freq = self.manager.voices()[index].last_frequency();
            let name = note_name_from_frequency(freq);
            self.display.note_display(index, &name, freq);
        }
        Ok(())
    }

    /// Idle-loop housekeeping: clear expired note readouts and refresh the
    /// status line if the context state changed underneath us.
    pub fn poll(&mut self, ctx: &mut Context) {
        self.report_status(AudioStatus::of(ctx.state()));
        for index in self.manager.expired_displays(ctx.current_time()) {
            self.display.clear_note_display(index);
        }
    }

    fn report_status(&mut self, status: AudioStatus) {
        if self.last_status != Some(status) {
            self.last_status = Some(status);
            self.display.status(status);
        }
    }
}
