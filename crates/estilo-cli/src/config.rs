//! Engine settings loaded from a TOML file.

use std::path::Path;

use estilo_synth::{VoiceManager, WaveformKind};
use serde::Deserialize;

/// Engine settings, all optional in the file.
///
/// ```toml
/// voices = 8
/// octaves = 3
/// waveform = "fm"
/// volume = 0.7
/// snap_to_note = true
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of voices.
    pub voices: usize,
    /// Playable span in octaves.
    pub octaves: u32,
    /// Waveform kind name; unknown names fall back to square.
    pub waveform: String,
    /// Initial volume, 0 to 1.
    pub volume: f32,
    /// Snap pitches to the nearest semitone.
    pub snap_to_note: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            voices: 1,
            octaves: 2,
            waveform: WaveformKind::Sine.as_str().into(),
            volume: estilo_synth::DEFAULT_VOLUME,
            snap_to_note: false,
        }
    }
}

impl EngineConfig {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// The configured waveform kind.
    pub fn waveform_kind(&self) -> WaveformKind {
        WaveformKind::from_name(&self.waveform)
    }

    /// Build a voice manager matching these settings.
    ///
    /// Waveform and volume travel through the gesture surface once a
    /// context exists; callers send those as the first gestures.
    pub fn build_manager(&self) -> VoiceManager {
        let mut manager = VoiceManager::new(self.voices);
        for i in 0..manager.voice_count() {
            let voice = manager.voice_mut(i).expect("index in range");
            voice.set_octave_span(self.octaves);
            voice.set_snap_to_note(self.snap_to_note || self.voices > 1);
        }
        manager
    }
}
