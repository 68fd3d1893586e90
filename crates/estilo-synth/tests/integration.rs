//! Integration tests for estilo-synth.
//!
//! Drives the engine through the public gesture surface and checks the
//! scheduled automation and node populations underneath — the behaviors a
//! host would actually observe.

use estilo_graph::{AutomationEvent, Context, NodeId, ParamKey};
use estilo_synth::{
    EnvelopeStage, Gesture, Session, VoiceManager, WaveformKind, note_name_from_frequency,
};

const SR: f32 = 48_000.0;

fn session() -> (Context, Session) {
    let ctx = Context::new(SR);
    let session = Session::headless(VoiceManager::new(1));
    (ctx, session)
}

fn gain_ramps(ctx: &Context, gain: NodeId) -> Vec<(f32, f64)> {
    ctx.param(gain, ParamKey::Gain)
        .unwrap()
        .events()
        .iter()
        .filter_map(|e| match *e {
            AutomationEvent::LinearRamp { value, time } => Some((value, time)),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// 1. Pitch surface end to end
// ---------------------------------------------------------------------------

#[test]
fn midpoint_sine_voice_plays_220_hz_named_a3() {
    let (mut ctx, mut session) = session();
    session
        .handle(&mut ctx, Gesture::InteractionStart { position: 0.5 })
        .unwrap();

    let voice = &session.manager().voices()[0];
    let freq = voice.last_frequency();
    assert!((freq - 220.0).abs() < 1e-9, "expected 220 Hz, got {freq}");
    assert_eq!(note_name_from_frequency(freq), "A3");

    // And it is audible: render a second and count cycles.
    let mut out = vec![0.0_f32; SR as usize];
    ctx.render(&mut out);
    let mut crossings = 0;
    let mut prev = 0.0_f32;
    for &x in &out[4096..] {
        // skip the attack
        if prev <= 0.0 && x > 0.0 {
            crossings += 1;
        }
        prev = x;
    }
    let seconds = (out.len() - 4096) as f64 / f64::from(SR);
    let measured = f64::from(crossings) / seconds;
    assert!(
        (measured - 220.0).abs() < 3.0,
        "audible pitch should be ~220 Hz, measured {measured:.1}"
    );
}

#[test]
fn drag_across_the_surface_stays_inside_the_range() {
    let (mut ctx, mut session) = session();
    session
        .handle(&mut ctx, Gesture::InteractionStart { position: 0.0 })
        .unwrap();

    for step in 0..=50 {
        let position = f64::from(step) / 50.0;
        session
            .handle(&mut ctx, Gesture::InteractionMove { position })
            .unwrap();
        let freq = session.manager().voices()[0].last_frequency();
        assert!(
            (110.0..=440.0).contains(&freq),
            "drag left the surface range: {freq}"
        );
    }
}

// ---------------------------------------------------------------------------
// 2. Envelope scheduling through gestures
// ---------------------------------------------------------------------------

#[test]
fn tap_schedules_one_attack_then_one_release() {
    let (mut ctx, mut session) = session();
    session
        .handle(&mut ctx, Gesture::InteractionStart { position: 0.5 })
        .unwrap();

    let gain = session.manager().voices()[0].graph().unwrap().output_gain();
    let ramps = gain_ramps(&ctx, gain);
    assert_eq!(ramps.len(), 1, "attack should be the only ramp");
    let attack_target = ramps[0].0;

    session.handle(&mut ctx, Gesture::InteractionEnd).unwrap();
    let ramps = gain_ramps(&ctx, gain);
    assert_eq!(ramps.len(), 1, "release should replace the attack ramp");
    assert!(
        ramps[0].0 < attack_target,
        "release ramps down from the attack target"
    );
}

#[test]
fn release_continues_from_the_attacks_reached_gain() {
    let (mut ctx, mut session) = session();
    session
        .handle(&mut ctx, Gesture::InteractionStart { position: 0.5 })
        .unwrap();

    // Render 5 ms of a 15 ms attack, then lift.
    let mut out = vec![0.0_f32; (SR * 0.005) as usize];
    ctx.render(&mut out);
    let gain = session.manager().voices()[0].graph().unwrap().output_gain();
    let reached = ctx.param(gain, ParamKey::Gain).unwrap().value();
    assert!(reached > 0.0, "attack should have opened the gain");

    session.handle(&mut ctx, Gesture::InteractionEnd).unwrap();

    // The release anchor equals the reached value: no discontinuity.
    let events = ctx.param(gain, ParamKey::Gain).unwrap().events().to_vec();
    let anchor = events.iter().find_map(|e| match *e {
        AutomationEvent::SetValue { value, .. } => Some(value),
        _ => None,
    });
    assert_eq!(anchor, Some(reached));
}

// ---------------------------------------------------------------------------
// 3. Sustain pedal
// ---------------------------------------------------------------------------

#[test]
fn sustain_suppresses_release_until_pedal_lifts() {
    let (mut ctx, mut session) = session();
    session.handle(&mut ctx, Gesture::SustainOn).unwrap();
    session
        .handle(&mut ctx, Gesture::InteractionStart { position: 0.5 })
        .unwrap();

    let gain = session.manager().voices()[0].graph().unwrap().output_gain();
    let ramps_before = gain_ramps(&ctx, gain).len();

    session.handle(&mut ctx, Gesture::InteractionEnd).unwrap();
    assert_eq!(
        gain_ramps(&ctx, gain).len(),
        ramps_before,
        "pedal held: no release ramp may be scheduled"
    );

    session.handle(&mut ctx, Gesture::SustainOff).unwrap();
    let ramps = gain_ramps(&ctx, gain);
    assert_eq!(ramps.len(), 1, "pedal lift schedules exactly one release");
    assert!(ramps[0].0 < 0.01, "release ramps toward the floor");
}

#[test]
fn sustain_off_releases_every_unengaged_sounding_voice() {
    let mut ctx = Context::new(SR);
    let mut session = Session::headless(VoiceManager::new(3));

    session.handle(&mut ctx, Gesture::SustainOn).unwrap();
    for voice in 0..3 {
        session.handle(&mut ctx, Gesture::KeyNoteOn { voice }).unwrap();
        session.handle(&mut ctx, Gesture::KeyNoteOff { voice }).unwrap();
    }
    // All three sound, held only by the pedal.
    assert!(session.manager().voices().iter().all(|v| v.sound_playing()));

    session.handle(&mut ctx, Gesture::SustainOff).unwrap();
    assert!(session.manager().voices().iter().all(|v| !v.sound_playing()));

    let now = ctx.current_time();
    for voice in session.manager().voices() {
        assert_eq!(voice.envelope().stage(now), EnvelopeStage::Releasing);
    }
}

// ---------------------------------------------------------------------------
// 4. Live waveform switching
// ---------------------------------------------------------------------------

#[test]
fn sine_to_fm_and_back_leaves_one_oscillator_and_one_gain() {
    let (mut ctx, mut session) = session();
    session
        .handle(&mut ctx, Gesture::InteractionStart { position: 0.5 })
        .unwrap();

    session
        .handle(&mut ctx, Gesture::WaveformChanged { kind: WaveformKind::Fm })
        .unwrap();
    let census = ctx.census();
    assert_eq!((census.oscillators, census.gains), (2, 2));

    session
        .handle(&mut ctx, Gesture::WaveformChanged { kind: WaveformKind::Sine })
        .unwrap();
    let census = ctx.census();
    assert_eq!(census.oscillators, 1, "no modulator may remain");
    assert_eq!(census.gains, 1);
    assert_eq!(census.constants, 0);
}

#[test]
fn switching_through_every_kind_never_leaks() {
    let (mut ctx, mut session) = session();
    session
        .handle(&mut ctx, Gesture::InteractionStart { position: 0.3 })
        .unwrap();

    for kind in WaveformKind::ALL {
        session
            .handle(&mut ctx, Gesture::WaveformChanged { kind })
            .unwrap();
        let mut out = vec![0.0_f32; 1024];
        ctx.render(&mut out);
    }

    // Last kind is ring: carrier + modulator + ring stage + output gain.
    let census = ctx.census();
    assert_eq!(census.total(), 4, "exactly one live topology at a time");
}

#[test]
fn rebuild_mid_note_restores_audibility() {
    let (mut ctx, mut session) = session();
    session
        .handle(&mut ctx, Gesture::InteractionStart { position: 0.5 })
        .unwrap();

    // Let the attack land, then switch kinds while sounding.
    let mut out = vec![0.0_f32; (SR * 0.05) as usize];
    ctx.render(&mut out);
    session
        .handle(&mut ctx, Gesture::WaveformChanged { kind: WaveformKind::Sawtooth })
        .unwrap();

    let mut out = vec![0.0_f32; (SR * 0.1) as usize];
    ctx.render(&mut out);
    let tail = &out[out.len() / 2..];
    let peak = tail.iter().fold(0.0_f32, |acc, &x| acc.max(x.abs()));
    assert!(peak > 0.3, "voice should stay audible after rebuild, peak {peak}");
}

// ---------------------------------------------------------------------------
// 5. Octave shifting
// ---------------------------------------------------------------------------

#[test]
fn octave_shift_doubles_the_held_pitch() {
    let (mut ctx, mut session) = session();
    session
        .handle(&mut ctx, Gesture::InteractionStart { position: 0.5 })
        .unwrap();
    assert!((session.manager().voices()[0].last_frequency() - 220.0).abs() < 1e-9);

    session.handle(&mut ctx, Gesture::OctaveShift { delta: 1 }).unwrap();
    assert!((session.manager().voices()[0].last_frequency() - 440.0).abs() < 1e-9);

    session.handle(&mut ctx, Gesture::OctaveShift { delta: -2 }).unwrap();
    assert!((session.manager().voices()[0].last_frequency() - 110.0).abs() < 1e-9);
}
