use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::grid::GridMapping;
use crate::ping_pong::PingPong;
use crate::SimError;

/// One particle's simulation state, laid out as an `Rgba32Float` texel.
///
///  offset  0  position  [f32; 3]   rgb
///  offset 12  aux       f32        a   (normalized age)
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Texel {
    pub position: Vec3,
    pub aux: f32,
}

impl Texel {
    #[inline]
    pub const fn new(position: Vec3, aux: f32) -> Self {
        Self { position, aux }
    }
}

/// How the aux channel of each particle is initialized.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum AuxInit {
    /// Every particle starts at age `0`.
    #[default]
    Zero,
    /// Uniform `[0, 1)` values from a generator seeded with the given value.
    /// Two stores built with the same seed are identical.
    Seeded(u64),
    /// Uniform `[0, 1)` values from OS entropy; differs on every run.
    Entropy,
}

impl AuxInit {
    fn values(self, count: usize) -> Vec<f32> {
        match self {
            AuxInit::Zero => vec![0.0; count],
            AuxInit::Seeded(seed) => uniform(StdRng::seed_from_u64(seed), count),
            AuxInit::Entropy => uniform(StdRng::from_entropy(), count),
        }
    }
}

fn uniform(mut rng: StdRng, count: usize) -> Vec<f32> {
    (0..count).map(|_| rng.gen_range(0.0..1.0)).collect()
}

/// Ping-pong particle state surfaces plus the immutable seed surface.
///
/// All surfaces are `grid.size()²` texels in row-major order. Texels not
/// addressed by a particle are zero in the seed and carry no meaning afterwards.
#[derive(Debug, Clone)]
pub struct StateStore {
    grid: GridMapping,
    base: Vec<Texel>,
    surfaces: PingPong<Texel>,
    steps: u64,
}

impl StateStore {
    /// Allocates the surfaces and seeds them from `seeds`.
    ///
    /// `seeds[i]` becomes the position of particle `i`. The seed length must
    /// equal `grid.count()` and every coordinate must be finite.
    pub fn initialize(grid: GridMapping, seeds: &[Vec3], aux: AuxInit) -> Result<Self, SimError> {
        if seeds.len() != grid.count() {
            return Err(SimError::SeedLengthMismatch {
                expected: grid.count(),
                actual: seeds.len(),
            });
        }
        if let Some(index) = seeds.iter().position(|p| !p.is_finite()) {
            return Err(SimError::NonFiniteSeed { index });
        }

        let aux_values = aux.values(grid.count());
        let mut base = vec![Texel::default(); grid.cell_count()];
        for ((index, coord), (&position, &aux)) in
            grid.iter().zip(seeds.iter().zip(aux_values.iter()))
        {
            debug_assert_eq!(grid.linear(coord), index);
            base[grid.linear(coord)] = Texel::new(position, aux);
        }

        log::debug!(
            "state store: {} particles on a {}x{} grid ({} padding texels, aux {:?})",
            grid.count(),
            grid.size(),
            grid.size(),
            grid.padding(),
            aux
        );

        Ok(Self {
            grid,
            surfaces: PingPong::new(base.clone()),
            base,
            steps: 0,
        })
    }

    #[inline]
    pub fn grid(&self) -> GridMapping {
        self.grid
    }

    /// Number of completed steps since initialization or the last reset.
    #[inline]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// The readable surface: the result of the last completed step, or the
    /// seed when no step has run.
    #[inline]
    pub fn current_surface(&self) -> &[Texel] {
        self.surfaces.front()
    }

    /// Seed surface; never modified after initialization.
    #[inline]
    pub fn base_surface(&self) -> &[Texel] {
        &self.base
    }

    /// Current state of particle `index`.
    pub fn particle(&self, index: usize) -> Option<Texel> {
        let coord = self.grid.coord(index)?;
        Some(self.current_surface()[self.grid.linear(coord)])
    }

    /// Exact-texel lookup at a normalized texture coordinate.
    ///
    /// Never interpolates. Coordinates outside the grid clamp to its edge, and
    /// padding cells return whatever they hold; both stay bounded.
    pub fn sample_nearest(&self, uv: [f32; 2]) -> Texel {
        let coord = self.grid.texel_at(uv);
        self.current_surface()[self.grid.linear(coord)]
    }

    /// Runs `rule(current, base)` for every texel into the writable surface and
    /// then makes it the readable one.
    pub fn step<F>(&mut self, mut rule: F)
    where
        F: FnMut(&Texel, &Texel) -> Texel,
    {
        let (current, next) = self.surfaces.split();
        for ((dst, src), base) in next.iter_mut().zip(current).zip(&self.base) {
            *dst = rule(src, base);
        }
        self.surfaces.swap();
        self.steps += 1;
    }

    /// Restores both surfaces to the seed.
    pub fn reset(&mut self) {
        self.surfaces.fill_from(&self.base);
        self.steps = 0;
    }
}
