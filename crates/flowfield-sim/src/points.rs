use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::grid::GridMapping;
use crate::integrator::smoothstep;
use crate::state::StateStore;
use crate::SimError;

/// Static per-particle draw attributes, in particle index order.
///
/// These never change after setup; only the state texel a particle points at
/// evolves.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleAttributes {
    /// Texel-centred UV of each particle's state texel.
    pub uvs: Vec<[f32; 2]>,
    /// Per-particle size factor in `[0, 1)`.
    pub sizes: Vec<f32>,
    /// Linear RGB colour.
    pub colors: Vec<[f32; 3]>,
}

impl ParticleAttributes {
    /// Builds attributes for `grid` using the base mesh colours.
    ///
    /// `size_seed = None` draws sizes from OS entropy.
    pub fn new(
        grid: &GridMapping,
        colors: &[[f32; 3]],
        size_seed: Option<u64>,
    ) -> Result<Self, SimError> {
        if colors.len() != grid.count() {
            return Err(SimError::SeedLengthMismatch {
                expected: grid.count(),
                actual: colors.len(),
            });
        }

        let mut rng = match size_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let sizes = (0..grid.count()).map(|_| rng.gen_range(0.0..1.0)).collect();

        Ok(Self {
            uvs: grid.uvs(),
            sizes,
            colors: colors.to_vec(),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.uvs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.uvs.is_empty()
    }
}

/// Size multiplier over a particle's life: fades in over the first 10% and out
/// over the last 30%.
pub fn lifetime_scale(age: f32) -> f32 {
    let fade_in = smoothstep(0.0, 0.1, age);
    let fade_out = 1.0 - smoothstep(0.7, 1.0, age);
    fade_in.min(fade_out)
}

/// A point ready to be handed to a rasterizer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointSprite {
    pub position: Vec3,
    pub size: f32,
    pub color: [f32; 3],
}

/// Resolves every particle to a point sprite by exact-texel lookup into the
/// store's readable surface.
///
/// This is the CPU counterpart of the GPU sprite pass. Padding texels are never
/// visited and the store is only read.
pub fn point_sprites(store: &StateStore, attributes: &ParticleAttributes) -> Vec<PointSprite> {
    attributes
        .uvs
        .iter()
        .zip(&attributes.sizes)
        .zip(&attributes.colors)
        .map(|((&uv, &size), &color)| {
            let texel = store.sample_nearest(uv);
            PointSprite {
                position: texel.position,
                size: size * lifetime_scale(texel.aux),
                color,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AuxInit, Texel};

    fn setup(n: usize) -> (StateStore, ParticleAttributes) {
        let grid = GridMapping::new(n).unwrap();
        let seeds: Vec<Vec3> = (0..n).map(|i| Vec3::splat(i as f32)).collect();
        let colors: Vec<[f32; 3]> = (0..n).map(|i| [i as f32 / n as f32, 0.5, 1.0]).collect();
        let store = StateStore::initialize(grid, &seeds, AuxInit::Seeded(1)).unwrap();
        let attrs = ParticleAttributes::new(&grid, &colors, Some(8)).unwrap();
        (store, attrs)
    }

    // ── attributes ────────────────────────────────────────────────────────

    #[test]
    fn attributes_follow_grid() {
        let (store, attrs) = setup(10);
        assert_eq!(attrs.len(), 10);
        assert_eq!(attrs.uvs, store.grid().uvs());
        assert!(attrs.sizes.iter().all(|s| (0.0..1.0).contains(s)));
    }

    #[test]
    fn seeded_sizes_are_reproducible() {
        let (_, a) = setup(20);
        let (_, b) = setup(20);
        assert_eq!(a.sizes, b.sizes);
    }

    #[test]
    fn colour_length_mismatch_is_fatal() {
        let grid = GridMapping::new(4).unwrap();
        let err = ParticleAttributes::new(&grid, &[[1.0; 3]; 5], None).unwrap_err();
        assert_eq!(err, SimError::SeedLengthMismatch { expected: 4, actual: 5 });
    }

    // ── lifetime ──────────────────────────────────────────────────────────

    #[test]
    fn lifetime_scale_fades_in_and_out() {
        assert_eq!(lifetime_scale(0.0), 0.0);
        assert_eq!(lifetime_scale(0.5), 1.0);
        assert_eq!(lifetime_scale(1.0), 0.0);
        assert!(lifetime_scale(0.05) > 0.0 && lifetime_scale(0.05) < 1.0);
        assert!(lifetime_scale(0.85) > 0.0 && lifetime_scale(0.85) < 1.0);
    }

    // ── sprites ───────────────────────────────────────────────────────────

    #[test]
    fn sprites_track_current_surface() {
        let (mut store, attrs) = setup(5);
        store.step(|cur, _| Texel::new(cur.position + Vec3::Y, 0.5));
        let sprites = point_sprites(&store, &attrs);
        assert_eq!(sprites.len(), 5);
        for (i, sprite) in sprites.iter().enumerate() {
            assert_eq!(sprite.position, Vec3::splat(i as f32) + Vec3::Y);
            assert_eq!(sprite.size, attrs.sizes[i]);
            assert_eq!(sprite.color, attrs.colors[i]);
        }
    }

    #[test]
    fn sprites_never_read_padding() {
        let (mut store, attrs) = setup(5);
        // Mark padding texels; none of them may show up as a sprite.
        store.step(|cur, base| {
            if *base == Texel::default() {
                Texel::new(Vec3::splat(-99.0), 0.5)
            } else {
                *cur
            }
        });
        assert!(point_sprites(&store, &attrs).iter().all(|s| s.position.x >= 0.0));
    }
}
