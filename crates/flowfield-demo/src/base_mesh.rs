use flowfield_engine::coords::ColorRgba;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seed point cloud: ordered positions with one colour each.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseMesh {
    pub positions: Vec<Vec3>,
    pub colors: Vec<[f32; 3]>,
}

/// Shape of the (2, 3) torus knot the points are scattered around.
const KNOT_P: f32 = 2.0;
const KNOT_Q: f32 = 3.0;
const KNOT_SCALE: f32 = 1.3;
const TUBE_RADIUS: f32 = 0.35;

impl BaseMesh {
    /// Scatters `count` points in a tube around a torus knot, coloured from
    /// `start` to `end` along the curve. Same seed, same cloud.
    pub fn torus_knot(count: usize, seed: u64, start: ColorRgba, end: ColorRgba) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut positions = Vec::with_capacity(count);
        let mut colors = Vec::with_capacity(count);

        for i in 0..count {
            let t = (i as f32 + 0.5) / count as f32;
            let phi = t * std::f32::consts::TAU;

            let r = (KNOT_Q * phi).cos() + 2.0;
            let on_curve = Vec3::new(
                r * (KNOT_P * phi).cos(),
                -(KNOT_Q * phi).sin(),
                r * (KNOT_P * phi).sin(),
            ) * KNOT_SCALE;

            positions.push(on_curve + random_in_ball(&mut rng) * TUBE_RADIUS);
            colors.push(start.lerp(end, t).rgb());
        }

        log::debug!("base mesh: {count} points (seed {seed})");
        Self { positions, colors }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

fn random_in_ball(rng: &mut StdRng) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        if v.length_squared() <= 1.0 {
            return v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh(count: usize, seed: u64) -> BaseMesh {
        BaseMesh::torus_knot(count, seed, ColorRgba::black(), ColorRgba::white())
    }

    #[test]
    fn one_colour_per_point() {
        let m = mesh(500, 1);
        assert_eq!(m.len(), 500);
        assert_eq!(m.colors.len(), 500);
    }

    #[test]
    fn points_are_finite_and_near_the_knot() {
        let m = mesh(2000, 2);
        let max_radius = (3.0 * 3.0 + 1.0f32).sqrt() * KNOT_SCALE + TUBE_RADIUS;
        for p in &m.positions {
            assert!(p.is_finite());
            assert!(p.length() <= max_radius + 1.0e-4, "{p:?}");
        }
    }

    #[test]
    fn same_seed_same_cloud() {
        assert_eq!(mesh(300, 9), mesh(300, 9));
        assert_ne!(mesh(300, 9).positions, mesh(300, 10).positions);
    }

    #[test]
    fn colours_run_along_the_curve() {
        let m = mesh(100, 3);
        assert!(m.colors[0][0] < 0.01);
        assert!(m.colors[99][0] > 0.99);
    }

    #[test]
    fn empty_mesh() {
        assert!(mesh(0, 0).is_empty());
    }
}
