use glam::Vec3;

use crate::noise_field::{NoiseField, SimplexField};
use crate::params::SimulationParams;
use crate::state::{StateStore, Texel};

/// Elapsed time is slowed down before it enters the noise field.
pub const TIME_SCALE: f32 = 0.2;

/// Spatial scale of the noise that gates where the flow field acts.
pub const GATE_NOISE_SCALE: f32 = 0.2;

/// Flow directions shorter than this are treated as "no flow".
const DIRECTION_EPSILON: f32 = 1.0e-6;

/// Per-texel flow-field update rule.
///
/// For a texel at position `p` with seed `b` and age `a`:
///
/// - `a >= 1`: the particle respawns on `b` and its age wraps to `fract(a)`.
/// - otherwise, with influence `w`, strength `s` and clamped delta `dt`:
///   `v = s * (g * d + (1 - w) * (b - p))`, `p' = p + v * dt`,
///   `a' = a + dt * decay_rate`, where `d` is the normalized noise direction at
///   `p * frequency` and `g` is a noise gate in `[0, 1]` evaluated at the seed
///   (`0` whenever `w == 0`).
///
/// The rule is a pure function of its inputs and the noise field. It never
/// fails; parameters are sanitized before use.
#[derive(Debug, Clone)]
pub struct FlowFieldIntegrator<N = SimplexField> {
    noise: N,
}

impl Default for FlowFieldIntegrator {
    fn default() -> Self {
        Self::new(SimplexField::default())
    }
}

impl<N: NoiseField> FlowFieldIntegrator<N> {
    pub fn new(noise: N) -> Self {
        Self { noise }
    }

    /// Computes the next state of one texel.
    pub fn integrate(&self, current: &Texel, base: &Texel, params: &SimulationParams) -> Texel {
        self.advect(current, base, &params.sanitized())
    }

    /// Advances every texel of `store` by one step.
    pub fn step(&self, store: &mut StateStore, params: &SimulationParams) {
        let params = params.sanitized();
        store.step(|current, base| self.advect(current, base, &params));
    }

    /// `params` must already be sanitized.
    fn advect(&self, current: &Texel, base: &Texel, params: &SimulationParams) -> Texel {
        if current.aux >= 1.0 {
            return Texel::new(base.position, current.aux.fract());
        }

        let dt = params.delta_time;
        let influence = params.flow_field_influence;
        let time = params.elapsed_time * TIME_SCALE;

        let gate = if influence <= 0.0 {
            0.0
        } else {
            let n = self.sample(base.position * GATE_NOISE_SCALE, time + 1.0);
            smoothstep((0.5 - influence) * 2.0, 1.0, n)
        };

        let direction = if gate > 0.0 {
            self.direction(current.position * params.flow_field_frequency, time)
        } else {
            Vec3::ZERO
        };

        let pull = (base.position - current.position) * (1.0 - influence);
        let velocity = (direction * gate + pull) * params.flow_field_strength;

        Texel::new(
            current.position + velocity * dt,
            current.aux + dt * params.decay_rate,
        )
    }

    /// Unit flow direction, or zero where the field vanishes.
    fn direction(&self, p: Vec3, time: f32) -> Vec3 {
        let raw = Vec3::new(
            self.sample(p, time),
            self.sample(p + Vec3::splat(1.0), time),
            self.sample(p + Vec3::splat(2.0), time),
        );
        let len = raw.length();
        if len.is_finite() && len > DIRECTION_EPSILON {
            raw / len
        } else {
            Vec3::ZERO
        }
    }

    #[inline]
    fn sample(&self, p: Vec3, time: f32) -> f32 {
        self.noise
            .sample([p.x as f64, p.y as f64, p.z as f64, time as f64]) as f32
    }
}

/// Hermite step between `edge0` and `edge1`.
///
/// A degenerate range (`edge0 >= edge1`) acts as a hard step at `edge1`.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge0 >= edge1 {
        return if x >= edge1 { 1.0 } else { 0.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridMapping;
    use crate::params::MAX_DELTA_TIME;
    use crate::state::AuxInit;

    fn simplex() -> FlowFieldIntegrator {
        FlowFieldIntegrator::default()
    }

    fn ring(n: usize) -> Vec<Vec3> {
        (0..n)
            .map(|i| {
                let a = i as f32 / n as f32 * std::f32::consts::TAU;
                Vec3::new(a.cos() * 3.0, a.sin() * 3.0, (a * 2.0).sin())
            })
            .collect()
    }

    fn store(seeds: &[Vec3]) -> StateStore {
        StateStore::initialize(GridMapping::new(seeds.len()).unwrap(), seeds, AuxInit::Zero)
            .unwrap()
    }

    fn params(influence: f32, dt: f32) -> SimulationParams {
        SimulationParams {
            delta_time: dt,
            elapsed_time: 1.0,
            flow_field_influence: influence,
            flow_field_strength: 2.0,
            flow_field_frequency: 0.5,
            decay_rate: 0.0,
        }
    }

    fn max_distance(s: &StateStore) -> f32 {
        let g = s.grid();
        (0..g.count())
            .map(|i| {
                let c = g.linear(g.coord(i).unwrap());
                s.current_surface()[c].position.distance(s.base_surface()[c].position)
            })
            .fold(0.0, f32::max)
    }

    // ── smoothstep ────────────────────────────────────────────────────────

    #[test]
    fn smoothstep_edges() {
        assert_eq!(smoothstep(0.0, 1.0, -1.0), 0.0);
        assert_eq!(smoothstep(0.0, 1.0, 2.0), 1.0);
        assert_eq!(smoothstep(0.0, 1.0, 0.5), 0.5);
    }

    #[test]
    fn degenerate_smoothstep_is_a_step() {
        assert_eq!(smoothstep(1.0, 1.0, 0.99), 0.0);
        assert_eq!(smoothstep(1.0, 1.0, 1.0), 1.0);
    }

    // ── scenarios ─────────────────────────────────────────────────────────

    #[test]
    fn zero_delta_time_does_not_move() {
        let mut s = store(&[Vec3::ZERO; 4]);
        simplex().step(&mut s, &params(1.0, 0.0));
        assert_eq!(s.current_surface(), s.base_surface());
    }

    #[test]
    fn zero_influence_pins_particles_to_seed() {
        let seeds = ring(50);
        let mut s = store(&seeds);
        let integrator = simplex();
        for frame in 0..200 {
            let mut p = params(0.0, 1.0 / 60.0);
            p.elapsed_time = frame as f32 / 60.0;
            p.decay_rate = 0.3;
            integrator.step(&mut s, &p);
        }
        for (i, seed) in seeds.iter().enumerate() {
            assert_eq!(s.particle(i).unwrap().position, *seed);
        }
    }

    #[test]
    fn oversized_delta_time_matches_clamped() {
        let seeds = ring(16);
        let integrator = simplex();

        let mut raw = store(&seeds);
        integrator.step(&mut raw, &params(0.8, 10.0));

        let mut clamped = store(&seeds);
        integrator.step(&mut clamped, &params(0.8, MAX_DELTA_TIME));

        assert_eq!(raw.current_surface(), clamped.current_surface());
        assert!(max_distance(&raw) > 0.0, "flow field should move something");
    }

    #[test]
    fn negative_delta_time_is_treated_as_zero() {
        let seeds = ring(9);
        let mut s = store(&seeds);
        simplex().step(&mut s, &params(1.0, -0.25));
        assert_eq!(s.current_surface(), s.base_surface());
    }

    // ── properties ────────────────────────────────────────────────────────

    #[test]
    fn runs_are_deterministic() {
        let seeds = ring(37);
        let run = || {
            let mut s = store(&seeds);
            let integrator = FlowFieldIntegrator::new(SimplexField::new(3));
            for frame in 0..120 {
                let mut p = params(0.6, 1.0 / 60.0);
                p.elapsed_time = frame as f32 / 60.0;
                integrator.step(&mut s, &p);
            }
            s.current_surface().to_vec()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn drift_stays_bounded_below_full_influence() {
        let seeds = ring(64);
        let mut s = store(&seeds);
        let integrator = simplex();
        let influence = 0.75;
        for frame in 0..3000 {
            let mut p = params(influence, 1.0 / 30.0);
            p.flow_field_strength = 10.0;
            p.elapsed_time = frame as f32 / 30.0;
            integrator.step(&mut s, &p);
        }
        let bound = 1.0 / (1.0 - influence) + 1.0e-3;
        assert!(max_distance(&s) <= bound, "drift {} > {bound}", max_distance(&s));
    }

    #[test]
    fn constant_field_converges_to_equilibrium() {
        // A uniform field pushes along +x,+y,+z; the pull balances it at
        // distance g / (1 - w) from the seed, with g = 1 here.
        let integrator = FlowFieldIntegrator::new(|_p: [f64; 4]| 1.0);
        let mut s = store(&[Vec3::ZERO]);
        for _ in 0..2000 {
            integrator.step(&mut s, &params(0.5, 1.0 / 30.0));
        }
        let pos = s.particle(0).unwrap().position;
        assert!((pos.length() - 2.0).abs() < 1.0e-3, "got {pos:?}");
        assert!((pos.x - pos.y).abs() < 1.0e-6 && (pos.y - pos.z).abs() < 1.0e-6);
    }

    // ── lifetime ──────────────────────────────────────────────────────────

    #[test]
    fn age_advances_with_decay_rate() {
        let integrator = FlowFieldIntegrator::new(|_p: [f64; 4]| 0.0);
        let mut p = params(0.5, 0.02);
        p.decay_rate = 0.5;
        let next = integrator.integrate(&Texel::new(Vec3::ONE, 0.25), &Texel::default(), &p);
        assert!((next.aux - 0.26).abs() < 1.0e-6);
    }

    #[test]
    fn expired_particle_respawns_on_seed() {
        let integrator = simplex();
        let base = Texel::new(Vec3::new(1.0, 2.0, 3.0), 0.1);
        let current = Texel::new(Vec3::new(9.0, 9.0, 9.0), 1.25);
        let next = integrator.integrate(&current, &base, &params(0.5, 0.016));
        assert_eq!(next.position, base.position);
        assert_eq!(next.aux, 0.25);
    }

    #[test]
    fn vanishing_field_leaves_only_pull() {
        let integrator = FlowFieldIntegrator::new(|_p: [f64; 4]| 0.0);
        let base = Texel::new(Vec3::ZERO, 0.0);
        let current = Texel::new(Vec3::new(1.0, 0.0, 0.0), 0.0);
        // Zero noise on the gate: smoothstep(0, 1, 0) = 0 at w = 0.5.
        let next = integrator.integrate(&current, &base, &params(0.5, 0.025));
        // v = 2 * 0.5 * (0 - 1) = -1 along x; dt = 0.025.
        assert!((next.position.x - 0.975).abs() < 1.0e-6);
        assert_eq!(next.position.y, 0.0);
    }
}
