//! Terminal display sink.

use std::io::{Write, stdout};

use estilo_synth::{AudioStatus, DisplaySink};

/// Prints note readouts and status to the terminal.
///
/// Uses carriage-return refreshes so the readout stays on one line, which
/// also works in raw mode.
#[derive(Debug, Default)]
pub struct TermDisplay {
    raw_mode: bool,
}

impl TermDisplay {
    /// A display for cooked-mode output.
    pub fn new() -> Self {
        Self { raw_mode: false }
    }

    /// A display that terminates lines for raw-mode terminals.
    pub fn raw() -> Self {
        Self { raw_mode: true }
    }

    fn line(&self, text: &str) {
        if self.raw_mode {
            print!("\r{text:<60}\r");
        } else {
            print!("\r{text:<60}");
        }
        stdout().flush().ok();
    }
}

impl DisplaySink for TermDisplay {
    fn note_display(&mut self, voice: usize, note_name: &str, frequency_hz: f64) {
        self.line(&format!("voice {voice}: {note_name:<4} {frequency_hz:8.2} Hz"));
    }

    fn clear_note_display(&mut self, voice: usize) {
        self.line(&format!("voice {voice}:"));
    }

    fn status(&mut self, status: AudioStatus) {
        let text = match status {
            AudioStatus::Ready => "audio ready",
            AudioStatus::Suspended => "press a key to enable audio",
            AudioStatus::Closed => "audio closed",
            AudioStatus::Error => "audio error",
        };
        if self.raw_mode {
            print!("\r[{text}]{:<40}\r\n", "");
        } else {
            println!("[{text}]");
        }
        stdout().flush().ok();
    }
}
