//! Offline rendering and WAV export.

use std::path::Path;

use estilo_graph::Context;

use crate::Result;

/// Pull `seconds` of mono audio from the context.
///
/// Rendering advances the context's clock exactly as the realtime path
/// does, so gesture schedules interleaved with render calls produce the
/// same output offline as live.
pub fn render_seconds(ctx: &mut Context, seconds: f64) -> Vec<f32> {
    let frames = (seconds * f64::from(ctx.sample_rate())).round() as usize;
    let mut out = vec![0.0_f32; frames];
    ctx.render(&mut out);
    out
}

/// Write mono samples as a 16-bit PCM WAV file.
///
/// Samples are clamped to [-1, 1] before conversion.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        writer.write_sample((clamped * f32::from(i16::MAX)) as i16)?;
    }
    writer.finalize()?;

    tracing::info!(path = %path.display(), frames = samples.len(), "wrote WAV");
    Ok(())
}
