use noise::{NoiseFn, Simplex};

/// Continuous scalar noise over `(x, y, z, time)`, roughly in `[-1, 1]`.
///
/// The integrator is generic over this seam so callers can pin the field down
/// (tests, reproducible captures) or swap in another generator.
pub trait NoiseField {
    fn sample(&self, point: [f64; 4]) -> f64;
}

impl<F> NoiseField for F
where
    F: Fn([f64; 4]) -> f64,
{
    #[inline]
    fn sample(&self, point: [f64; 4]) -> f64 {
        self(point)
    }
}

/// 4D simplex noise from the `noise` crate.
#[derive(Clone)]
pub struct SimplexField {
    seed: u32,
    simplex: Simplex,
}

impl SimplexField {
    pub fn new(seed: u32) -> Self {
        Self { seed, simplex: Simplex::new(seed) }
    }
}

impl std::fmt::Debug for SimplexField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimplexField").field("seed", &self.seed).finish()
    }
}

impl Default for SimplexField {
    fn default() -> Self {
        Self::new(0)
    }
}

impl NoiseField for SimplexField {
    #[inline]
    fn sample(&self, point: [f64; 4]) -> f64 {
        self.simplex.get(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_noise_fields() {
        let field = |p: [f64; 4]| p[0] + p[3];
        assert_eq!(field.sample([1.0, 0.0, 0.0, 2.0]), 3.0);
    }

    #[test]
    fn simplex_is_deterministic_per_seed() {
        let a = SimplexField::new(7);
        let b = SimplexField::new(7);
        let p = [0.3, -1.2, 4.5, 0.25];
        assert_eq!(a.sample(p), b.sample(p));
    }

    #[test]
    fn simplex_stays_roughly_unit() {
        let field = SimplexField::default();
        for i in 0..500 {
            let t = i as f64 * 0.137;
            let v = field.sample([t, t * 0.5, -t, t * 0.01]);
            assert!(v.is_finite());
            assert!(v.abs() <= 1.5, "sample {v} out of range");
        }
    }
}
