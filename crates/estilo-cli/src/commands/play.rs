//! Demo playback command.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Args;

use estilo_graph::Context;
use estilo_io::{OutputStream, StreamSettings, default_output_device_name};
use estilo_synth::{Gesture, Session};

use crate::commands::{DEMO_POSITIONS, setup_gestures};
use crate::config::EngineConfig;
use crate::term::TermDisplay;

#[derive(Args)]
pub struct PlayArgs {
    /// Waveform kind (sine, square, sawtooth, triangle, pwm, fm, am, ring)
    #[arg(short, long)]
    waveform: Option<String>,

    /// Engine config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output device name fragment
    #[arg(long)]
    device: Option<String>,

    /// Seconds each note is held
    #[arg(long, default_value = "0.4")]
    note_length: f64,
}

pub fn run(args: PlayArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(waveform) = &args.waveform {
        config.waveform = waveform.clone();
    }

    let sample_rate = OutputStream::probe_sample_rate(args.device.as_deref())?;
    let ctx = Arc::new(Mutex::new(Context::new(sample_rate)));
    let mut session = Session::new(config.build_manager(), Box::new(TermDisplay::new()));

    let stream = OutputStream::open(
        StreamSettings {
            device_name: args.device.clone(),
            buffer_size: Some(256),
        },
        Arc::clone(&ctx),
    )?;

    println!(
        "Playing {} demo on {} at {} Hz",
        config.waveform_kind(),
        default_output_device_name().unwrap_or_else(|_| "default output".into()),
        stream.sample_rate(),
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let mut send = |session: &mut Session, gesture| -> anyhow::Result<()> {
        let mut ctx = ctx.lock().expect("context lock");
        session.handle(&mut ctx, gesture)?;
        Ok(())
    };

    for gesture in setup_gestures(config.waveform_kind(), config.volume) {
        send(&mut session, gesture)?;
    }

    for (i, &position) in DEMO_POSITIONS.iter().enumerate() {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        if i == 0 {
            send(&mut session, Gesture::InteractionStart { position })?;
        } else {
            send(&mut session, Gesture::InteractionMove { position })?;
        }
        std::thread::sleep(Duration::from_secs_f64(args.note_length));
    }
    send(&mut session, Gesture::InteractionEnd)?;

    // Let the release tail ring out before the stream drops.
    std::thread::sleep(Duration::from_millis(400));
    {
        let mut ctx = ctx.lock().expect("context lock");
        session.poll(&mut ctx);
    }
    println!();
    Ok(())
}
