//! Scheduled parameter automation.
//!
//! Every automatable node parameter (oscillator frequency, gain amount,
//! constant-source offset) is an [`AudioParam`]: a value plus a timeline of
//! automation events realized sample-accurately by the renderer. Events are
//! scheduled from the control thread and consumed on the audio timeline, so
//! ramps land exactly where they were asked to regardless of callback
//! timing.
//!
//! ## Event kinds
//!
//! - **Set-value**: jump to a value at a time. Used to anchor ramps at the
//!   parameter's current value so envelopes never click.
//! - **Linear ramp**: straight line from the previous anchor to a value at
//!   an end time.
//! - **Set-target**: exponential approach toward a target with a time
//!   constant, starting at a time and holding until superseded. Used for
//!   zipper-free pitch and volume retargeting.
//!
//! Cancelling removes every event scheduled at or after the given time and
//! freezes the parameter at its current value; callers re-anchor with a
//! set-value event immediately afterwards, so the freeze is never audible.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use libm::exp;

/// One scheduled automation event.
///
/// `time` is in seconds on the context's rendering timeline. For
/// [`AutomationEvent::LinearRamp`] it is the time the ramp *ends*; the ramp
/// starts from the previous anchor point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutomationEvent {
    /// Jump to `value` at `time`.
    SetValue {
        /// Value to jump to.
        value: f32,
        /// Time of the jump, seconds.
        time: f64,
    },
    /// Ramp linearly from the previous anchor to `value`, arriving at `time`.
    LinearRamp {
        /// Ramp end value.
        value: f32,
        /// Ramp end time, seconds.
        time: f64,
    },
    /// From `time` on, approach `target` exponentially with `time_constant`.
    SetTarget {
        /// Value approached (never quite reached).
        target: f32,
        /// Time the approach begins, seconds.
        time: f64,
        /// Exponential time constant, seconds.
        time_constant: f64,
    },
}

impl AutomationEvent {
    /// The event's scheduling time (ramp end time for ramps).
    #[inline]
    pub fn time(&self) -> f64 {
        match *self {
            Self::SetValue { time, .. }
            | Self::LinearRamp { time, .. }
            | Self::SetTarget { time, .. } => time,
        }
    }
}

/// An exponential approach currently in effect.
#[derive(Debug, Clone, Copy)]
struct ActiveTarget {
    target: f32,
    start_time: f64,
    time_constant: f64,
    start_value: f32,
}

/// An automatable parameter: current value plus pending automation.
///
/// The renderer calls [`evaluate`](Self::evaluate) once per sample with a
/// non-decreasing time; scheduling methods may be called at any time from
/// the control side. Audio-rate modulation inputs (nodes connected to this
/// parameter) are summed *on top of* the automation value by the renderer —
/// they never touch the timeline.
#[derive(Debug, Clone)]
pub struct AudioParam {
    /// Value and time of the most recent completed event.
    anchor_value: f32,
    anchor_time: f64,
    /// Last evaluated automation value.
    current: f32,
    /// Pending events, sorted by time.
    events: Vec<AutomationEvent>,
    /// Set-target currently in effect, if any.
    active_target: Option<ActiveTarget>,
}

impl AudioParam {
    /// Create a parameter holding `initial` with no automation scheduled.
    pub fn new(initial: f32) -> Self {
        Self {
            anchor_value: initial,
            anchor_time: 0.0,
            current: initial,
            events: Vec::new(),
            active_target: None,
        }
    }

    /// The most recently evaluated automation value.
    ///
    /// Between renders this is the value as of the last rendered sample;
    /// it is what envelope anchoring reads to start ramps without a jump.
    #[inline]
    pub fn value(&self) -> f32 {
        self.current
    }

    /// Immediately set the value, discarding all scheduled automation.
    pub fn set_value(&mut self, value: f32) {
        self.events.clear();
        self.active_target = None;
        self.anchor_value = value;
        self.current = value;
    }

    /// Pending automation events, in timeline order.
    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    /// Schedule a jump to `value` at `time`.
    pub fn set_value_at(&mut self, value: f32, time: f64) {
        self.insert(AutomationEvent::SetValue { value, time });
    }

    /// Schedule a linear ramp ending at `value` at `time`.
    ///
    /// The ramp starts from the previous event's value and time (or the
    /// current value if nothing precedes it); schedule a set-value anchor
    /// first for a click-free start.
    pub fn linear_ramp_to_value_at(&mut self, value: f32, time: f64) {
        self.insert(AutomationEvent::LinearRamp { value, time });
    }

    /// Schedule an exponential approach toward `target` starting at `time`.
    ///
    /// The approach stays in effect until a later event or a cancellation
    /// supersedes it.
    pub fn set_target_at(&mut self, target: f32, time: f64, time_constant: f64) {
        self.insert(AutomationEvent::SetTarget {
            target,
            time,
            time_constant: time_constant.max(f64::MIN_POSITIVE),
        });
    }

    /// Remove every event scheduled at or after `time`.
    ///
    /// The parameter holds its current value until new automation arrives.
    /// An in-flight ramp or approach that started before `time` is halted
    /// where it stands rather than rewound.
    pub fn cancel_scheduled_values(&mut self, time: f64) {
        self.events.retain(|e| e.time() < time);
        if let Some(active) = self.active_target
            && active.start_time >= time
        {
            self.active_target = None;
        }
        self.anchor_value = self.current;
        self.anchor_time = time.max(self.anchor_time);
    }

    /// Evaluate the automation value at time `t`.
    ///
    /// Must be called with non-decreasing `t`; completed events collapse
    /// into the anchor as time passes them.
    pub fn evaluate(&mut self, t: f64) -> f32 {
        // Fold every event whose time has passed into the anchor.
        while let Some(&event) = self.events.first() {
            match event {
                AutomationEvent::SetValue { value, time } => {
                    if time > t {
                        break;
                    }
                    self.anchor_value = value;
                    self.anchor_time = time;
                    self.active_target = None;
                    self.events.remove(0);
                }
                AutomationEvent::LinearRamp { value, time } => {
                    if time > t {
                        // Ramp still in flight: interpolate from the anchor.
                        self.current = self.ramp_value(value, time, t);
                        return self.current;
                    }
                    self.anchor_value = value;
                    self.anchor_time = time;
                    self.active_target = None;
                    self.events.remove(0);
                }
                AutomationEvent::SetTarget {
                    target,
                    time,
                    time_constant,
                } => {
                    if time > t {
                        break;
                    }
                    let start_value = self.settled_value(time);
                    self.active_target = Some(ActiveTarget {
                        target,
                        start_time: time,
                        time_constant,
                        start_value,
                    });
                    self.events.remove(0);
                }
            }
        }

        self.current = self.settled_value(t);
        self.current
    }

    /// Value at `t` assuming no pending event intervenes before `t`.
    fn settled_value(&self, t: f64) -> f32 {
        match self.active_target {
            Some(active) if t >= active.start_time => {
                let elapsed = t - active.start_time;
                let decay = exp(-elapsed / active.time_constant) as f32;
                active.target + (active.start_value - active.target) * decay
            }
            _ => self.anchor_value,
        }
    }

    /// Linear interpolation along an in-flight ramp at time `t`.
    fn ramp_value(&self, end_value: f32, end_time: f64, t: f64) -> f32 {
        if end_time <= self.anchor_time {
            return end_value;
        }
        let span = end_time - self.anchor_time;
        let progress = ((t - self.anchor_time) / span).clamp(0.0, 1.0) as f32;
        self.anchor_value + (end_value - self.anchor_value) * progress
    }

    /// Insert an event keeping the queue sorted by time (stable for ties).
    fn insert(&mut self, event: AutomationEvent) {
        let time = event.time();
        let idx = self.events.partition_point(|e| e.time() <= time);
        self.events.insert(idx, event);
    }
}

impl Default for AudioParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}
