//! Live terminal keyboard command.
//!
//! Terminals report key presses but not releases, so key notes are played
//! as taps: each press opens the bound voice and a deferred release lands
//! a fixed hold later. The sustain pedal is a toggle for the same reason.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use clap::Args;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal;

use estilo_graph::Context;
use estilo_io::{OutputStream, StreamSettings};
use estilo_synth::{Gesture, Session, WaveformKind};

use crate::config::EngineConfig;
use crate::term::TermDisplay;

/// Keys bound to voices, left to right across the surface.
const VOICE_KEYS: [char; 8] = ['a', 's', 'd', 'f', 'g', 'h', 'j', 'k'];

/// How long a tapped key note is held before its deferred release.
const KEY_HOLD: Duration = Duration::from_millis(250);

#[derive(Args)]
pub struct LiveArgs {
    /// Engine config file (TOML); defaults to 8 snapping voices
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output device name fragment
    #[arg(long)]
    device: Option<String>,
}

pub fn run(args: LiveArgs) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => {
            let mut config = EngineConfig::default();
            config.voices = VOICE_KEYS.len();
            config.snap_to_note = true;
            config
        }
    };

    let sample_rate = OutputStream::probe_sample_rate(args.device.as_deref())?;
    let ctx = Arc::new(Mutex::new(Context::new(sample_rate)));
    let mut session = Session::new(config.build_manager(), Box::new(TermDisplay::raw()));

    let _stream = OutputStream::open(
        StreamSettings {
            device_name: args.device.clone(),
            buffer_size: Some(256),
        },
        Arc::clone(&ctx),
    )?;

    println!("estilo live — {} voices", session.manager().voice_count());
    println!("{}", surface_ruler(&session, 64));
    println!("  a s d f g h j k   play voices across the surface");
    println!("  1-8               waveform (sine square sawtooth triangle pwm fm am ring)");
    println!("  up/down           octave shift");
    println!("  space             sustain pedal (toggle)");
    println!("  [ ]               volume");
    println!("  q / esc           quit");

    terminal::enable_raw_mode()?;
    let result = event_loop(&ctx, &mut session);
    terminal::disable_raw_mode()?;
    println!();
    result
}

fn event_loop(ctx: &Arc<Mutex<Context>>, session: &mut Session) -> anyhow::Result<()> {
    let mut sustain = false;
    let mut volume = estilo_synth::DEFAULT_VOLUME;
    let voice_count = session.manager().voice_count();
    // Pending deferred key releases, one slot per voice.
    let mut release_at: Vec<Option<Instant>> = vec![None; voice_count];

    let mut send = |session: &mut Session, gesture| -> anyhow::Result<()> {
        let mut ctx = ctx.lock().expect("context lock");
        session.handle(&mut ctx, gesture)?;
        Ok(())
    };

    loop {
        if crossterm::event::poll(Duration::from_millis(25))? {
            match crossterm::event::read()? {
                Event::Key(KeyEvent {
                    code,
                    kind: KeyEventKind::Press,
                    ..
                }) => match code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Char(' ') => {
                        sustain = !sustain;
                        let gesture = if sustain {
                            Gesture::SustainOn
                        } else {
                            Gesture::SustainOff
                        };
                        send(session, gesture)?;
                    }
                    KeyCode::Up => send(session, Gesture::OctaveShift { delta: 1 })?,
                    KeyCode::Down => send(session, Gesture::OctaveShift { delta: -1 })?,
                    KeyCode::Char('[') => {
                        volume = (volume - 0.05).max(0.0);
                        send(session, Gesture::VolumeChanged { value: volume })?;
                    }
                    KeyCode::Char(']') => {
                        volume = (volume + 0.05).min(1.0);
                        send(session, Gesture::VolumeChanged { value: volume })?;
                    }
                    KeyCode::Char(c) => {
                        if let Some(voice) = VOICE_KEYS.iter().position(|&k| k == c) {
                            if voice < voice_count {
                                send(session, Gesture::KeyNoteOn { voice })?;
                                release_at[voice] = Some(Instant::now() + KEY_HOLD);
                            }
                        } else if let Some(kind) = kind_for_digit(c) {
                            send(session, Gesture::WaveformChanged { kind })?;
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
        }

        // Deferred key releases: taps end after their hold time.
        let now = Instant::now();
        for voice in 0..voice_count {
            if let Some(deadline) = release_at[voice]
                && now >= deadline
            {
                release_at[voice] = None;
                send(session, Gesture::KeyNoteOff { voice })?;
            }
        }

        let mut ctx = ctx.lock().expect("context lock");
        session.poll(&mut ctx);
    }
    Ok(())
}

fn kind_for_digit(c: char) -> Option<WaveformKind> {
    let index = c.to_digit(10)? as usize;
    WaveformKind::ALL.get(index.checked_sub(1)?).copied()
}

/// Draw semitone markers across the surface, naturals as their letter and
/// accidentals as `·`, placed by the inverse pitch mapping.
fn surface_ruler(session: &Session, width: usize) -> String {
    let mut ruler = vec![' '; width];
    let Some(voice) = session.manager().voices().first() else {
        return String::new();
    };
    let mapper = voice.pitch();
    let shift = voice.octave_shift();
    let (min, max) = mapper.range(shift);

    let mut note = (12.0 * (min / 440.0).log2() + 69.0).ceil() as i64;
    loop {
        let freq = estilo_synth::frequency_of_note(note);
        if freq > max {
            break;
        }
        let position = mapper.position_of_frequency(freq, shift);
        if (0.0..=1.0).contains(&position) {
            let col = (position * (width - 1) as f64).round() as usize;
            let name = estilo_synth::note_name_from_frequency(freq);
            let mark = if name.contains('#') {
                '·'
            } else {
                name.chars().next().unwrap_or('|')
            };
            ruler[col] = mark;
        }
        note += 1;
    }
    ruler.into_iter().collect()
}
