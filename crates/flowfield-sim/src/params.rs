/// Upper bound on the integration step, in seconds.
///
/// A stalled frame (debugger, minimized window) would otherwise hand the
/// integrator a delta large enough to fling every particle off screen.
pub const MAX_DELTA_TIME: f32 = 1.0 / 30.0;

/// Influence range exposed to tweaking UIs.
pub const INFLUENCE_RANGE: (f32, f32) = (0.0, 1.0);
/// Strength range exposed to tweaking UIs.
pub const STRENGTH_RANGE: (f32, f32) = (0.0, 10.0);
/// Frequency range exposed to tweaking UIs.
pub const FREQUENCY_RANGE: (f32, f32) = (0.0, 1.0);

/// Caller-owned simulation parameters.
///
/// The integrator only reads this record. Out-of-range values are tolerated:
/// [`SimulationParams::sanitized`] produces the copy the integrator actually
/// uses.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SimulationParams {
    /// Seconds since the previous step (clamped to `[0, MAX_DELTA_TIME]` on use).
    pub delta_time: f32,

    /// Seconds since the simulation started.
    pub elapsed_time: f32,

    /// Share of the motion driven by the flow field, `0..=1`.
    ///
    /// `0` freezes particles on their seed; values below `1` keep a pull toward
    /// the seed that bounds drift.
    pub flow_field_influence: f32,

    /// Overall speed multiplier, `0..=10`.
    pub flow_field_strength: f32,

    /// Spatial frequency of the noise field, `0..=1`.
    pub flow_field_frequency: f32,

    /// Age gained per second. A particle whose age reaches `1` respawns on its
    /// seed. `0` disables respawning.
    pub decay_rate: f32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            delta_time: 0.0,
            elapsed_time: 0.0,
            flow_field_influence: 0.5,
            flow_field_strength: 2.0,
            flow_field_frequency: 0.5,
            decay_rate: 0.3,
        }
    }
}

impl SimulationParams {
    /// Records the timing of the frame about to be simulated.
    #[inline]
    pub fn advance(&mut self, elapsed_time: f32, delta_time: f32) {
        self.elapsed_time = elapsed_time;
        self.delta_time = delta_time;
    }

    /// Delta time as the integrator sees it.
    ///
    /// Negative and non-finite values become `0`; large values are capped at
    /// [`MAX_DELTA_TIME`].
    #[inline]
    pub fn clamped_delta_time(&self) -> f32 {
        clamp_finite(self.delta_time, 0.0, MAX_DELTA_TIME)
    }

    /// Copy with every field forced into its valid range.
    pub fn sanitized(&self) -> Self {
        Self {
            delta_time: self.clamped_delta_time(),
            elapsed_time: finite_or_zero(self.elapsed_time),
            flow_field_influence: clamp_finite(
                self.flow_field_influence,
                INFLUENCE_RANGE.0,
                INFLUENCE_RANGE.1,
            ),
            flow_field_strength: clamp_finite(
                self.flow_field_strength,
                STRENGTH_RANGE.0,
                STRENGTH_RANGE.1,
            ),
            flow_field_frequency: finite_or_zero(self.flow_field_frequency).max(0.0),
            decay_rate: finite_or_zero(self.decay_rate).max(0.0),
        }
    }

    /// Nudges the influence by `delta`, staying inside the tweak range.
    pub fn nudge_influence(&mut self, delta: f32) {
        self.flow_field_influence =
            (self.flow_field_influence + delta).clamp(INFLUENCE_RANGE.0, INFLUENCE_RANGE.1);
    }

    /// Nudges the strength by `delta`, staying inside the tweak range.
    pub fn nudge_strength(&mut self, delta: f32) {
        self.flow_field_strength =
            (self.flow_field_strength + delta).clamp(STRENGTH_RANGE.0, STRENGTH_RANGE.1);
    }

    /// Nudges the frequency by `delta`, staying inside the tweak range.
    pub fn nudge_frequency(&mut self, delta: f32) {
        self.flow_field_frequency =
            (self.flow_field_frequency + delta).clamp(FREQUENCY_RANGE.0, FREQUENCY_RANGE.1);
    }
}

#[inline]
fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() { v } else { 0.0 }
}

#[inline]
fn clamp_finite(v: f32, min: f32, max: f32) -> f32 {
    if v.is_nan() {
        return min;
    }
    v.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── delta time ────────────────────────────────────────────────────────

    #[test]
    fn delta_time_is_capped() {
        let p = SimulationParams { delta_time: 10.0, ..Default::default() };
        assert_eq!(p.clamped_delta_time(), MAX_DELTA_TIME);
    }

    #[test]
    fn negative_delta_time_becomes_zero() {
        let p = SimulationParams { delta_time: -0.5, ..Default::default() };
        assert_eq!(p.clamped_delta_time(), 0.0);
    }

    #[test]
    fn nan_delta_time_becomes_zero() {
        let p = SimulationParams { delta_time: f32::NAN, ..Default::default() };
        assert_eq!(p.clamped_delta_time(), 0.0);
    }

    #[test]
    fn small_delta_time_passes_through() {
        let p = SimulationParams { delta_time: 0.01, ..Default::default() };
        assert_eq!(p.clamped_delta_time(), 0.01);
    }

    // ── sanitize ──────────────────────────────────────────────────────────

    #[test]
    fn sanitized_clamps_every_field() {
        let p = SimulationParams {
            delta_time: 1.0,
            elapsed_time: f32::INFINITY,
            flow_field_influence: 3.0,
            flow_field_strength: -1.0,
            flow_field_frequency: f32::NAN,
            decay_rate: -2.0,
        }
        .sanitized();
        assert_eq!(p.delta_time, MAX_DELTA_TIME);
        assert_eq!(p.elapsed_time, 0.0);
        assert_eq!(p.flow_field_influence, 1.0);
        assert_eq!(p.flow_field_strength, 0.0);
        assert_eq!(p.flow_field_frequency, 0.0);
        assert_eq!(p.decay_rate, 0.0);
    }

    #[test]
    fn sanitized_keeps_valid_values() {
        let p = SimulationParams { delta_time: 0.016, ..Default::default() };
        assert_eq!(p.sanitized(), p);
    }

    // ── tweaks ────────────────────────────────────────────────────────────

    #[test]
    fn nudges_stay_in_range() {
        let mut p = SimulationParams::default();
        p.nudge_influence(5.0);
        p.nudge_strength(-50.0);
        p.nudge_frequency(0.25);
        assert_eq!(p.flow_field_influence, 1.0);
        assert_eq!(p.flow_field_strength, 0.0);
        assert_eq!(p.flow_field_frequency, 0.75);
    }

    #[test]
    fn advance_records_timing() {
        let mut p = SimulationParams::default();
        p.advance(12.5, 0.02);
        assert_eq!(p.elapsed_time, 12.5);
        assert_eq!(p.delta_time, 0.02);
    }
}
