//! Synthesis demo: gestures, waveform kinds, and envelope shaping.
//!
//! Run with: cargo run -p estilo-synth --example synthesis_demo

use estilo_graph::Context;
use estilo_synth::{Gesture, PitchMapper, Session, VoiceManager, WaveformKind};

fn main() {
    let sample_rate = 48_000.0;

    // --- Pitch surface ---
    println!("=== Pitch Surface (2 octaves above A2) ===\n");

    let mapper = PitchMapper::new();
    for step in 0..=8 {
        let position = f64::from(step) / 8.0;
        let freq = mapper.frequency_from_position(position, 0);
        let name = estilo_synth::note_name_from_frequency(freq);
        println!("position {position:>5.3} -> {freq:>8.2} Hz  ({name})");
    }

    // --- Every waveform kind through the gesture surface ---
    println!("\n=== Waveform Kinds (peak after 100 ms at position 0.5) ===\n");

    for kind in WaveformKind::ALL {
        let mut ctx = Context::new(sample_rate);
        let mut session = Session::headless(VoiceManager::new(1));

        session
            .handle(&mut ctx, Gesture::WaveformChanged { kind })
            .unwrap();
        session
            .handle(&mut ctx, Gesture::InteractionStart { position: 0.5 })
            .unwrap();

        let mut out = vec![0.0_f32; (sample_rate * 0.1) as usize];
        ctx.render(&mut out);
        let peak = out.iter().fold(0.0_f32, |acc, &x| acc.max(x.abs()));
        println!("{:<10} peak {:>6.3}", kind.as_str(), peak);
    }

    // --- Envelope shape over a tap ---
    println!("\n=== Envelope Over a Tap (attack 15 ms, release 150 ms) ===\n");

    let mut ctx = Context::new(sample_rate);
    let mut session = Session::headless(VoiceManager::new(1));
    session
        .handle(&mut ctx, Gesture::InteractionStart { position: 0.5 })
        .unwrap();

    let mut held = vec![0.0_f32; (sample_rate * 0.05) as usize];
    ctx.render(&mut held);
    session.handle(&mut ctx, Gesture::InteractionEnd).unwrap();
    let mut released = vec![0.0_f32; (sample_rate * 0.2) as usize];
    ctx.render(&mut released);

    let window = (sample_rate * 0.01) as usize;
    println!("time (ms) | peak over 10 ms window");
    println!("----------+-----------------------");
    for (i, chunk) in held.chunks(window).chain(released.chunks(window)).enumerate() {
        if i % 2 == 0 {
            let peak = chunk.iter().fold(0.0_f32, |acc, &x| acc.max(x.abs()));
            println!("{:>9} | {:.4}", i * 10, peak);
        }
    }
}
