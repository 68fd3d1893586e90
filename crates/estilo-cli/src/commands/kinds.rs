//! Waveform kind listing command.

use clap::Args;

use estilo_synth::WaveformKind;

#[derive(Args)]
pub struct KindsArgs {}

pub fn run(_args: KindsArgs) -> anyhow::Result<()> {
    println!("Waveform kinds:\n");
    for kind in WaveformKind::ALL {
        println!("  {:<10} {}", kind.as_str(), describe(kind));
    }
    Ok(())
}

fn describe(kind: WaveformKind) -> &'static str {
    match kind {
        WaveformKind::Sine => "one oscillator, pure tone",
        WaveformKind::Square => "one oscillator, hollow odd-harmonic tone",
        WaveformKind::Sawtooth => "one oscillator, bright full-harmonic tone",
        WaveformKind::Triangle => "one oscillator, soft odd-harmonic tone",
        WaveformKind::Pwm => "custom 8-partial spectrum, shared wave table",
        WaveformKind::Fm => "carrier plus pitch-tracking frequency modulator",
        WaveformKind::Am => "carrier with fixed 7 Hz tremolo",
        WaveformKind::Ring => "carrier multiplied by a pitch-tracking modulator",
    }
}
