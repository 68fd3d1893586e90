//! Property-based tests for parameter automation.
//!
//! Uses proptest to check ramp boundedness, target convergence, and
//! cancellation invariants over randomized schedules.

use proptest::prelude::*;

use estilo_graph::AudioParam;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// A linear ramp never leaves the interval between its endpoints, and
    /// evaluation is monotone along the ramp's direction.
    #[test]
    fn linear_ramp_is_bounded_and_monotone(
        start in -1.0f32..=1.0f32,
        end in -1.0f32..=1.0f32,
        duration in 0.001f64..0.5f64,
    ) {
        let mut param = AudioParam::new(start);
        param.set_value_at(start, 0.0);
        param.linear_ramp_to_value_at(end, duration);

        let lo = start.min(end);
        let hi = start.max(end);
        let mut prev = param.evaluate(0.0);
        for step in 1..=100 {
            let t = duration * f64::from(step) / 100.0;
            let v = param.evaluate(t);
            prop_assert!(v >= lo - 1e-5 && v <= hi + 1e-5,
                "ramp escaped [{lo}, {hi}]: {v}");
            if end >= start {
                prop_assert!(v >= prev - 1e-5, "upward ramp decreased");
            } else {
                prop_assert!(v <= prev + 1e-5, "downward ramp increased");
            }
            prev = v;
        }
        prop_assert!((param.evaluate(duration) - end).abs() < 1e-5);
    }

    /// A set-target approach converges to within 1% after ten time
    /// constants and never overshoots the target.
    #[test]
    fn set_target_converges_without_overshoot(
        start in -1.0f32..=1.0f32,
        target in -1.0f32..=1.0f32,
        tau in 0.001f64..0.1f64,
    ) {
        let mut param = AudioParam::new(start);
        param.set_target_at(target, 0.0, tau);

        let lo = start.min(target);
        let hi = start.max(target);
        for step in 1..=100 {
            let t = 10.0 * tau * f64::from(step) / 100.0;
            let v = param.evaluate(t);
            prop_assert!(v >= lo - 1e-5 && v <= hi + 1e-5,
                "approach escaped [{lo}, {hi}]: {v}");
        }

        let settled = param.evaluate(10.0 * tau);
        let span = (start - target).abs().max(1e-6);
        prop_assert!(
            (settled - target).abs() <= span * 0.01 + 1e-5,
            "not converged after 10 tau: {settled} vs {target}"
        );
    }

    /// After cancellation, the parameter holds a constant value for all
    /// later times until new automation is scheduled.
    #[test]
    fn cancel_freezes_the_value(
        start in -1.0f32..=1.0f32,
        end in -1.0f32..=1.0f32,
        duration in 0.01f64..0.5f64,
        cancel_frac in 0.1f64..0.9f64,
    ) {
        let mut param = AudioParam::new(start);
        param.set_value_at(start, 0.0);
        param.linear_ramp_to_value_at(end, duration);

        let cancel_at = duration * cancel_frac;
        let before = param.evaluate(cancel_at);
        param.cancel_scheduled_values(cancel_at);

        for step in 1..=20 {
            let t = cancel_at + f64::from(step) * 0.05;
            let v = param.evaluate(t);
            prop_assert!(
                (v - before).abs() < 1e-5,
                "value drifted after cancel: {v} vs {before}"
            );
        }
    }
}
