//! Waveform patch topologies.
//!
//! Each [`WaveformKind`] realizes as a distinct node topology — a
//! [`SignalGraph`] — built against the audio context. The tagged variants
//! make each kind's node set statically known, so teardown is exhaustive by
//! construction instead of relying on a loosely-typed bag of nodes.
//!
//! Topologies are never mutated in place: switching kinds tears the old
//! graph down completely (mute first, every step tolerant of already-dead
//! nodes) and builds a fresh one. Parameters, by contrast, are retuned live
//! with a short smoothing constant so fast pitch changes never click.

#[cfg(not(feature = "std"))]
use alloc::sync::Arc;
#[cfg(feature = "std")]
use std::sync::Arc;

use estilo_graph::{Context, GraphError, NodeId, ParamKey, PeriodicWave, Waveform};

/// FM modulator rate as a multiple of the carrier frequency.
pub const FM_RATIO: f32 = 1.4;
/// FM modulation depth as a multiple of the carrier frequency.
pub const FM_DEPTH_SCALE: f32 = 2.0;
/// AM (tremolo) modulator rate in Hz, independent of carrier pitch.
pub const AM_RATE_HZ: f32 = 7.0;
/// AM modulation depth: the tremolo gain swings over `[1-depth, 1]`.
pub const AM_DEPTH: f32 = 0.7;
/// Ring modulator rate as a multiple of the carrier frequency.
pub const RING_RATIO: f32 = 0.78;

/// Cosine partial amplitudes of the PWM-flavored custom wave.
///
/// Index 0 is the ignored DC term. Built into a periodic wave once and
/// shared read-only across every PWM voice.
pub const PWM_PARTIALS: [f32; 8] = [0.0, 0.8, 0.8, 0.4, 0.0, -0.4, -0.8, -0.8];

/// Smoothing time constant for live pitch changes, seconds.
///
/// Applied on every pitch-set path — including sustain re-triggers — so
/// there is a single smoothing policy with no instantaneous special case.
pub const PITCH_SMOOTHING_TAU: f64 = 0.005;

/// The waveform selection a voice plays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WaveformKind {
    /// Pure sine.
    #[default]
    Sine,
    /// Square wave.
    Square,
    /// Sawtooth wave.
    Sawtooth,
    /// Triangle wave.
    Triangle,
    /// Pulse-width-modulation-flavored custom spectrum.
    Pwm,
    /// Frequency modulation, modulator tracking the carrier.
    Fm,
    /// Amplitude modulation (tremolo) at a fixed rate.
    Am,
    /// Ring modulation, modulator tracking the carrier.
    Ring,
}

impl WaveformKind {
    /// Every kind, in menu order.
    pub const ALL: [Self; 8] = [
        Self::Sine,
        Self::Square,
        Self::Sawtooth,
        Self::Triangle,
        Self::Pwm,
        Self::Fm,
        Self::Am,
        Self::Ring,
    ];

    /// The kind's lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sine => "sine",
            Self::Square => "square",
            Self::Sawtooth => "sawtooth",
            Self::Triangle => "triangle",
            Self::Pwm => "pwm",
            Self::Fm => "fm",
            Self::Am => "am",
            Self::Ring => "ring",
        }
    }

    /// Parse a kind by name, defaulting unknown names to [`Self::Square`].
    ///
    /// The square fallback mirrors the engine's behavior for unrecognized
    /// selections arriving from external configuration.
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or(Self::Square)
    }
}

impl core::str::FromStr for WaveformKind {
    type Err = UnknownWaveform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or(UnknownWaveform)
    }
}

impl core::fmt::Display for WaveformKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a waveform kind name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownWaveform;

impl core::fmt::Display for UnknownWaveform {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("unknown waveform kind")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UnknownWaveform {}

/// The realized node topology for one voice's current waveform kind.
///
/// Every variant ends in an output `gain` node — the envelope's target —
/// connected to the context destination. Ids are private to the patch; the
/// voice layer only ever needs the output gain and the retune/teardown
/// operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalGraph {
    /// One oscillator into the output gain.
    Simple {
        /// The audible oscillator.
        osc: NodeId,
        /// Output gain, driven by the envelope.
        gain: NodeId,
    },
    /// Custom-spectrum oscillator into the output gain.
    Pwm {
        /// The audible oscillator, playing the shared PWM wave.
        osc: NodeId,
        /// Output gain, driven by the envelope.
        gain: NodeId,
    },
    /// Modulator scaled into the carrier's frequency parameter.
    Fm {
        /// Sine carrier.
        carrier: NodeId,
        /// Modulator at [`FM_RATIO`] × carrier frequency.
        modulator: NodeId,
        /// Modulation depth, [`FM_DEPTH_SCALE`] × carrier frequency.
        mod_gain: NodeId,
        /// Output gain, driven by the envelope.
        gain: NodeId,
    },
    /// Carrier through a tremolo gain oscillating in `[1-depth, 1]`.
    Am {
        /// Sine carrier.
        carrier: NodeId,
        /// Fixed-rate modulator at [`AM_RATE_HZ`].
        modulator: NodeId,
        /// Scales the modulator by depth/2 before it reaches the tremolo.
        mod_gain: NodeId,
        /// DC offset of `1 - depth/2` summed into the tremolo amount.
        dc_offset: NodeId,
        /// The tremolo stage the carrier passes through.
        scale_gain: NodeId,
        /// Output gain, driven by the envelope.
        gain: NodeId,
    },
    /// Carrier through a gain driven directly by a bipolar modulator.
    Ring {
        /// Sine carrier.
        carrier: NodeId,
        /// Modulator at [`RING_RATIO`] × carrier frequency.
        modulator: NodeId,
        /// The ring stage: its gain amount *is* the raw modulator output.
        mod_gain: NodeId,
        /// Output gain, driven by the envelope.
        gain: NodeId,
    },
}

impl SignalGraph {
    /// The output gain node the envelope drives.
    pub fn output_gain(&self) -> NodeId {
        match *self {
            Self::Simple { gain, .. }
            | Self::Pwm { gain, .. }
            | Self::Fm { gain, .. }
            | Self::Am { gain, .. }
            | Self::Ring { gain, .. } => gain,
        }
    }

    /// Every node in the topology, for teardown.
    fn nodes(&self) -> [Option<NodeId>; 6] {
        match *self {
            Self::Simple { osc, gain } | Self::Pwm { osc, gain } => {
                [Some(osc), Some(gain), None, None, None, None]
            }
            Self::Fm {
                carrier,
                modulator,
                mod_gain,
                gain,
            }
            | Self::Ring {
                carrier,
                modulator,
                mod_gain,
                gain,
            } => [
                Some(carrier),
                Some(modulator),
                Some(mod_gain),
                Some(gain),
                None,
                None,
            ],
            Self::Am {
                carrier,
                modulator,
                mod_gain,
                dc_offset,
                scale_gain,
                gain,
            } => [
                Some(carrier),
                Some(modulator),
                Some(mod_gain),
                Some(dc_offset),
                Some(scale_gain),
                Some(gain),
            ],
        }
    }

    /// Retarget every pitch-tracking parameter toward `frequency_hz`.
    ///
    /// Carrier frequency and any frequency- or depth-dependent modulator
    /// parameters move together, each smoothed over
    /// [`PITCH_SMOOTHING_TAU`].
    pub fn retune(&self, ctx: &mut Context, frequency_hz: f32) -> Result<(), GraphError> {
        let now = ctx.current_time();
        let glide = |ctx: &mut Context, node, key, value| {
            ctx.cancel_scheduled_values(node, key, now)?;
            ctx.set_target_at(node, key, value, now, PITCH_SMOOTHING_TAU)
        };
        match *self {
            Self::Simple { osc, .. } | Self::Pwm { osc, .. } => {
                glide(ctx, osc, ParamKey::Frequency, frequency_hz)
            }
            Self::Fm {
                carrier,
                modulator,
                mod_gain,
                ..
            } => {
                glide(ctx, carrier, ParamKey::Frequency, frequency_hz)?;
                glide(ctx, modulator, ParamKey::Frequency, frequency_hz * FM_RATIO)?;
                glide(ctx, mod_gain, ParamKey::Gain, frequency_hz * FM_DEPTH_SCALE)
            }
            Self::Am { carrier, .. } => glide(ctx, carrier, ParamKey::Frequency, frequency_hz),
            Self::Ring {
                carrier, modulator, ..
            } => {
                glide(ctx, carrier, ParamKey::Frequency, frequency_hz)?;
                glide(
                    ctx,
                    modulator,
                    ParamKey::Frequency,
                    frequency_hz * RING_RATIO,
                )
            }
        }
    }

    /// Stop, disconnect, and remove every node in the topology.
    ///
    /// Each step tolerates nodes that are already stopped or gone, so a
    /// teardown racing a previous teardown can never fail halfway through.
    pub fn teardown(self, ctx: &mut Context) {
        for node in self.nodes().into_iter().flatten() {
            ctx.stop(node);
            ctx.disconnect(node);
            ctx.remove_node(node);
        }
    }
}

/// Builds [`SignalGraph`] topologies for waveform kinds.
///
/// Owns the shared PWM periodic wave, constructed once and reused across
/// every PWM patch this builder creates.
#[derive(Debug, Clone)]
pub struct WaveformGraphBuilder {
    pwm_wave: Arc<PeriodicWave>,
}

impl Default for WaveformGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WaveformGraphBuilder {
    /// Create a builder, rendering the shared PWM wave table.
    pub fn new() -> Self {
        Self {
            pwm_wave: Arc::new(PeriodicWave::new(&PWM_PARTIALS, &[0.0; 8])),
        }
    }

    /// Build the topology for `kind` at `frequency_hz`.
    ///
    /// The output gain starts muted; the envelope ramps it up when the
    /// voice actually sounds. All sources are started before returning.
    pub fn build(
        &self,
        ctx: &mut Context,
        kind: WaveformKind,
        frequency_hz: f32,
    ) -> Result<SignalGraph, GraphError> {
        match kind {
            WaveformKind::Sine => self.simple(ctx, Waveform::Sine, frequency_hz),
            WaveformKind::Square => self.simple(ctx, Waveform::Square, frequency_hz),
            WaveformKind::Sawtooth => self.simple(ctx, Waveform::Sawtooth, frequency_hz),
            WaveformKind::Triangle => self.simple(ctx, Waveform::Triangle, frequency_hz),
            WaveformKind::Pwm => self.pwm(ctx, frequency_hz),
            WaveformKind::Fm => self.fm(ctx, frequency_hz),
            WaveformKind::Am => self.am(ctx, frequency_hz),
            WaveformKind::Ring => self.ring(ctx, frequency_hz),
        }
    }

    fn simple(
        &self,
        ctx: &mut Context,
        waveform: Waveform,
        frequency_hz: f32,
    ) -> Result<SignalGraph, GraphError> {
        let osc = ctx.create_oscillator(waveform, frequency_hz)?;
        let gain = ctx.create_gain(0.0)?;
        ctx.connect(osc, gain)?;
        ctx.connect_to_destination(gain)?;
        ctx.start(osc)?;
        Ok(SignalGraph::Simple { osc, gain })
    }

    fn pwm(&self, ctx: &mut Context, frequency_hz: f32) -> Result<SignalGraph, GraphError> {
        let osc =
            ctx.create_oscillator(Waveform::Custom(Arc::clone(&self.pwm_wave)), frequency_hz)?;
        let gain = ctx.create_gain(0.0)?;
        ctx.connect(osc, gain)?;
        ctx.connect_to_destination(gain)?;
        ctx.start(osc)?;
        Ok(SignalGraph::Pwm { osc, gain })
    }

    fn fm(&self, ctx: &mut Context, frequency_hz: f32) -> Result<SignalGraph, GraphError> {
        let carrier = ctx.create_oscillator(Waveform::Sine, frequency_hz)?;
        let modulator = ctx.create_oscillator(Waveform::Sine, frequency_hz * FM_RATIO)?;
        let mod_gain = ctx.create_gain(frequency_hz * FM_DEPTH_SCALE)?;
        let gain = ctx.create_gain(0.0)?;

        ctx.connect(modulator, mod_gain)?;
        ctx.connect_param(mod_gain, carrier, ParamKey::Frequency)?;
        ctx.connect(carrier, gain)?;
        ctx.connect_to_destination(gain)?;
        ctx.start(carrier)?;
        ctx.start(modulator)?;

        Ok(SignalGraph::Fm {
            carrier,
            modulator,
            mod_gain,
            gain,
        })
    }

    fn am(&self, ctx: &mut Context, frequency_hz: f32) -> Result<SignalGraph, GraphError> {
        let carrier = ctx.create_oscillator(Waveform::Sine, frequency_hz)?;
        let modulator = ctx.create_oscillator(Waveform::Sine, AM_RATE_HZ)?;
        let mod_gain = ctx.create_gain(AM_DEPTH / 2.0)?;
        let dc_offset = ctx.create_constant_source(1.0 - AM_DEPTH / 2.0)?;
        // The tremolo amount is entirely modulation input: DC rest level
        // plus the scaled modulator, oscillating in [1-depth, 1].
        let scale_gain = ctx.create_gain(0.0)?;
        let gain = ctx.create_gain(0.0)?;

        ctx.connect(modulator, mod_gain)?;
        ctx.connect_param(mod_gain, scale_gain, ParamKey::Gain)?;
        ctx.connect_param(dc_offset, scale_gain, ParamKey::Gain)?;
        ctx.connect(carrier, scale_gain)?;
        ctx.connect(scale_gain, gain)?;
        ctx.connect_to_destination(gain)?;
        ctx.start(carrier)?;
        ctx.start(modulator)?;
        ctx.start(dc_offset)?;

        Ok(SignalGraph::Am {
            carrier,
            modulator,
            mod_gain,
            dc_offset,
            scale_gain,
            gain,
        })
    }

    fn ring(&self, ctx: &mut Context, frequency_hz: f32) -> Result<SignalGraph, GraphError> {
        let carrier = ctx.create_oscillator(Waveform::Sine, frequency_hz)?;
        let modulator = ctx.create_oscillator(Waveform::Sine, frequency_hz * RING_RATIO)?;
        // No DC offset: the stage's gain is the raw bipolar modulator, so
        // the output carries only the classic sum and difference sidebands.
        let mod_gain = ctx.create_gain(0.0)?;
        let gain = ctx.create_gain(0.0)?;

        ctx.connect_param(modulator, mod_gain, ParamKey::Gain)?;
        ctx.connect(carrier, mod_gain)?;
        ctx.connect(mod_gain, gain)?;
        ctx.connect_to_destination(gain)?;
        ctx.start(carrier)?;
        ctx.start(modulator)?;

        Ok(SignalGraph::Ring {
            carrier,
            modulator,
            mod_gain,
            gain,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;

    fn running_context() -> Context {
        let mut ctx = Context::new(SR);
        ctx.resume().unwrap();
        ctx
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in WaveformKind::ALL {
            assert_eq!(kind.as_str().parse::<WaveformKind>(), Ok(kind));
        }
        assert!("theremin".parse::<WaveformKind>().is_err());
    }

    #[test]
    fn unknown_names_fall_back_to_square() {
        assert_eq!(WaveformKind::from_name("sine"), WaveformKind::Sine);
        assert_eq!(WaveformKind::from_name("theremin"), WaveformKind::Square);
    }

    #[test]
    fn simple_topology_has_two_nodes() {
        let mut ctx = running_context();
        let builder = WaveformGraphBuilder::new();
        let graph = builder.build(&mut ctx, WaveformKind::Sine, 220.0).unwrap();

        let census = ctx.census();
        assert_eq!(census.oscillators, 1);
        assert_eq!(census.gains, 1);
        assert_eq!(census.constants, 0);

        graph.teardown(&mut ctx);
        assert_eq!(ctx.census().total(), 0);
    }

    #[test]
    fn fm_topology_tracks_carrier_on_retune() {
        let mut ctx = running_context();
        let builder = WaveformGraphBuilder::new();
        let graph = builder.build(&mut ctx, WaveformKind::Fm, 220.0).unwrap();

        graph.retune(&mut ctx, 330.0).unwrap();

        // Render past the smoothing constant so targets settle.
        let mut out = vec![0.0_f32; (SR * 0.05) as usize];
        ctx.render(&mut out);

        let SignalGraph::Fm {
            carrier,
            modulator,
            mod_gain,
            ..
        } = graph
        else {
            panic!("expected FM topology");
        };
        let carrier_freq = ctx.param(carrier, ParamKey::Frequency).unwrap().value();
        let mod_freq = ctx.param(modulator, ParamKey::Frequency).unwrap().value();
        let depth = ctx.param(mod_gain, ParamKey::Gain).unwrap().value();

        assert!((carrier_freq - 330.0).abs() < 1.0);
        assert!((mod_freq - 330.0 * FM_RATIO).abs() < 2.0);
        assert!((depth - 330.0 * FM_DEPTH_SCALE).abs() < 4.0);
    }

    #[test]
    fn am_topology_modulates_but_never_silences() {
        // With the output gain open, an AM patch's envelope floor is
        // 1-depth = 0.3 of the carrier; the signal dips but never gates.
        let mut ctx = running_context();
        let builder = WaveformGraphBuilder::new();
        let graph = builder.build(&mut ctx, WaveformKind::Am, 220.0).unwrap();
        ctx.param_mut(graph.output_gain(), ParamKey::Gain)
            .unwrap()
            .set_value(1.0);

        let mut out = vec![0.0_f32; SR as usize];
        ctx.render(&mut out);

        let peak = out.iter().fold(0.0_f32, |acc, &x| acc.max(x.abs()));
        assert!(peak > 0.9, "tremolo peak should approach 1, got {peak}");

        // RMS over a full second stays well above the 30% floor.
        let rms =
            (out.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>() / out.len() as f64)
                .sqrt();
        assert!(rms > 0.3, "AM must not gate the carrier, rms {rms}");
    }

    #[test]
    fn ring_topology_is_bipolar_balanced() {
        // Ring modulation suppresses the carrier itself; the output is
        // symmetric around zero with no DC buildup.
        let mut ctx = running_context();
        let builder = WaveformGraphBuilder::new();
        let graph = builder.build(&mut ctx, WaveformKind::Ring, 220.0).unwrap();
        ctx.param_mut(graph.output_gain(), ParamKey::Gain)
            .unwrap()
            .set_value(1.0);

        let mut out = vec![0.0_f32; SR as usize];
        ctx.render(&mut out);

        let mean = out.iter().map(|&x| f64::from(x)).sum::<f64>() / out.len() as f64;
        assert!(mean.abs() < 0.01, "ring output should average zero, got {mean}");

        let peak = out.iter().fold(0.0_f32, |acc, &x| acc.max(x.abs()));
        assert!(peak > 0.5, "ring output should carry sidebands, peak {peak}");
    }

    #[test]
    fn am_teardown_removes_all_six_nodes() {
        let mut ctx = running_context();
        let builder = WaveformGraphBuilder::new();
        let graph = builder.build(&mut ctx, WaveformKind::Am, 220.0).unwrap();
        assert_eq!(ctx.census().total(), 6);

        graph.teardown(&mut ctx);
        assert_eq!(ctx.census().total(), 0);

        // A second teardown of the same (stale) handles is harmless.
        graph.teardown(&mut ctx);
        assert_eq!(ctx.census().total(), 0);
    }

    #[test]
    fn pwm_patches_share_one_wave_table() {
        let builder = WaveformGraphBuilder::new();
        let mut ctx = running_context();
        let a = builder.build(&mut ctx, WaveformKind::Pwm, 220.0).unwrap();
        let b = builder.build(&mut ctx, WaveformKind::Pwm, 440.0).unwrap();
        // Two PWM voices, one shared table: strong count is builder + 2.
        assert_eq!(Arc::strong_count(&builder.pwm_wave), 3);
        a.teardown(&mut ctx);
        b.teardown(&mut ctx);
    }
}
