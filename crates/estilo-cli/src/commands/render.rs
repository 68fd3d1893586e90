//! Offline render command.

use std::path::PathBuf;

use clap::Args;

use estilo_graph::Context;
use estilo_io::{render_seconds, write_wav};
use estilo_synth::{Gesture, Session};

use crate::commands::{DEMO_POSITIONS, setup_gestures};
use crate::config::EngineConfig;

#[derive(Args)]
pub struct RenderArgs {
    /// Output WAV path
    #[arg(short, long, default_value = "estilo.wav")]
    output: PathBuf,

    /// Waveform kind (sine, square, sawtooth, triangle, pwm, fm, am, ring)
    #[arg(short, long)]
    waveform: Option<String>,

    /// Engine config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sample rate in Hz
    #[arg(long, default_value = "44100")]
    sample_rate: u32,

    /// Seconds each note is held
    #[arg(long, default_value = "0.4")]
    note_length: f64,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(waveform) = &args.waveform {
        config.waveform = waveform.clone();
    }

    let mut ctx = Context::new(args.sample_rate as f32);
    let mut session = Session::headless(config.build_manager());

    for gesture in setup_gestures(config.waveform_kind(), config.volume) {
        session.handle(&mut ctx, gesture)?;
    }

    let mut samples = Vec::new();
    for (i, &position) in DEMO_POSITIONS.iter().enumerate() {
        let gesture = if i == 0 {
            Gesture::InteractionStart { position }
        } else {
            Gesture::InteractionMove { position }
        };
        session.handle(&mut ctx, gesture)?;
        samples.extend(render_seconds(&mut ctx, args.note_length));
    }
    session.handle(&mut ctx, Gesture::InteractionEnd)?;
    samples.extend(render_seconds(&mut ctx, 0.4));

    write_wav(&args.output, &samples, args.sample_rate)?;
    println!(
        "Rendered {:.1}s of {} to {}",
        samples.len() as f64 / f64::from(args.sample_rate),
        config.waveform_kind(),
        args.output.display()
    );
    Ok(())
}
