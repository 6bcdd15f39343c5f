use crate::SimError;

/// Integer texel coordinate inside the square state grid.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct GridCoord {
    pub x: u32,
    pub y: u32,
}

impl GridCoord {
    #[inline]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Stable bijection between particle indices and cells of a square grid.
///
/// The grid is the smallest square that can hold every particle
/// (`size = ceil(sqrt(count))`). Particles fill it row-major; the trailing
/// `size² - count` cells are padding and are never addressed by a particle.
///
/// The mapping is a pure function of `count`; two mappings built from the same
/// count are identical.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GridMapping {
    count: usize,
    size: u32,
}

impl GridMapping {
    /// Builds the mapping for `count` particles.
    pub fn new(count: usize) -> Result<Self, SimError> {
        Self::with_max_size(count, u32::MAX)
    }

    /// Builds the mapping and rejects grids wider than `max_size` texels.
    ///
    /// `max_size` is usually the device's `max_texture_dimension_2d`.
    pub fn with_max_size(count: usize, max_size: u32) -> Result<Self, SimError> {
        if count == 0 {
            return Err(SimError::EmptyParticleSet);
        }

        let side = ceil_sqrt(count);
        if side > max_size as u64 {
            return Err(SimError::GridTooLarge {
                size: u32::try_from(side).unwrap_or(u32::MAX),
                max: max_size,
            });
        }

        Ok(Self {
            count,
            // `side <= max_size <= u32::MAX` after the check above.
            size: side as u32,
        })
    }

    /// Number of real particles.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Width and height of the grid, in texels.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Total number of cells, including padding.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.size as usize * self.size as usize
    }

    /// Number of padding cells that no particle maps to.
    #[inline]
    pub fn padding(&self) -> usize {
        self.cell_count() - self.count
    }

    /// Grid cell of particle `index`, or `None` when out of range.
    pub fn coord(&self, index: usize) -> Option<GridCoord> {
        if index >= self.count {
            return None;
        }
        let size = self.size as usize;
        Some(GridCoord::new((index % size) as u32, (index / size) as u32))
    }

    /// Texel-centred texture coordinate of particle `index`.
    ///
    /// The half-texel offset places the sample point in the middle of the texel
    /// so that no filtering mode can blend in a neighbour.
    pub fn uv(&self, index: usize) -> Option<[f32; 2]> {
        let c = self.coord(index)?;
        let size = self.size as f32;
        Some([(c.x as f32 + 0.5) / size, (c.y as f32 + 0.5) / size])
    }

    /// Row-major linear index of `coord` inside a surface of this grid.
    #[inline]
    pub fn linear(&self, coord: GridCoord) -> usize {
        coord.y as usize * self.size as usize + coord.x as usize
    }

    /// Inverse mapping. Returns `None` for padding cells and out-of-grid coords.
    pub fn index_of(&self, coord: GridCoord) -> Option<usize> {
        if coord.x >= self.size || coord.y >= self.size {
            return None;
        }
        let index = self.linear(coord);
        (index < self.count).then_some(index)
    }

    /// Iterates `(index, coord)` for every particle in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, GridCoord)> + '_ {
        (0..self.count).filter_map(move |i| self.coord(i).map(|c| (i, c)))
    }

    /// Per-particle UV attribute array, in index order.
    pub fn uvs(&self) -> Vec<[f32; 2]> {
        (0..self.count).filter_map(|i| self.uv(i)).collect()
    }

    /// Exact texel lookup for a normalized texture coordinate.
    ///
    /// Coordinates outside `[0, 1)` clamp to the edge of the grid; the result is
    /// always a valid cell, but it may be a padding cell.
    pub fn texel_at(&self, uv: [f32; 2]) -> GridCoord {
        let size = self.size as f32;
        let max = self.size - 1;
        let axis = |v: f32| {
            if !v.is_finite() || v <= 0.0 {
                0
            } else {
                ((v * size).floor() as u32).min(max)
            }
        };
        GridCoord::new(axis(uv[0]), axis(uv[1]))
    }
}

/// `ceil(sqrt(n))` without trusting float rounding for large `n`.
///
/// Squares are taken in `u128`, so counts near `usize::MAX` cannot overflow.
fn ceil_sqrt(n: usize) -> u64 {
    let n = n as u128;
    let mut s = (n as f64).sqrt().ceil() as u128;
    while s > 0 && (s - 1) * (s - 1) >= n {
        s -= 1;
    }
    while s * s < n {
        s += 1;
    }
    s as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    // ── sizing ────────────────────────────────────────────────────────────

    #[test]
    fn zero_particles_is_rejected() {
        assert_eq!(GridMapping::new(0), Err(SimError::EmptyParticleSet));
    }

    #[test]
    fn size_is_ceil_sqrt() {
        let cases = [(1, 1), (2, 2), (4, 2), (5, 3), (9, 3), (10, 4), (16, 4), (17, 5), (1000, 32)];
        for (n, expected) in cases {
            assert_eq!(GridMapping::new(n).unwrap().size(), expected, "n = {n}");
        }
    }

    #[test]
    fn size_is_minimal_for_large_counts() {
        for n in [99_999usize, 100_000, 1 << 20, (1 << 20) + 1, 4_000_000_000] {
            let s = GridMapping::new(n).unwrap().size() as u64;
            assert!(s * s >= n as u64);
            assert!((s - 1) * (s - 1) < n as u64);
        }
    }

    #[test]
    fn grid_over_limit_is_rejected() {
        let err = GridMapping::with_max_size(17, 4).unwrap_err();
        assert_eq!(err, SimError::GridTooLarge { size: 5, max: 4 });
        assert!(GridMapping::with_max_size(16, 4).is_ok());
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn huge_count_is_rejected_without_overflow() {
        let err = GridMapping::new(usize::MAX).unwrap_err();
        assert_eq!(err, SimError::GridTooLarge { size: u32::MAX, max: u32::MAX });

        let largest = (u32::MAX as usize) * (u32::MAX as usize);
        assert_eq!(GridMapping::new(largest).unwrap().size(), u32::MAX);
    }

    #[test]
    fn padding_counts_unused_cells() {
        let g = GridMapping::new(5).unwrap();
        assert_eq!(g.cell_count(), 9);
        assert_eq!(g.padding(), 4);
    }

    // ── mapping ───────────────────────────────────────────────────────────

    #[test]
    fn four_particles_fill_two_by_two() {
        let g = GridMapping::new(4).unwrap();
        assert_eq!(g.size(), 2);
        let coords: Vec<_> = (0..4).map(|i| g.coord(i).unwrap()).collect();
        assert_eq!(
            coords,
            vec![
                GridCoord::new(0, 0),
                GridCoord::new(1, 0),
                GridCoord::new(0, 1),
                GridCoord::new(1, 1),
            ]
        );
    }

    #[test]
    fn mapping_is_injective_and_in_range() {
        for n in 1..=300 {
            let g = GridMapping::new(n).unwrap();
            let mut seen = HashSet::new();
            for (_, c) in g.iter() {
                assert!(c.x < g.size() && c.y < g.size());
                assert!(seen.insert(c), "duplicate cell {c:?} for n = {n}");
            }
            assert_eq!(seen.len(), n);
        }
    }

    #[test]
    fn index_of_inverts_coord() {
        let g = GridMapping::new(7).unwrap();
        for i in 0..7 {
            assert_eq!(g.index_of(g.coord(i).unwrap()), Some(i));
        }
        // (1, 2) is linear index 7: padding.
        assert_eq!(g.index_of(GridCoord::new(1, 2)), None);
        assert_eq!(g.index_of(GridCoord::new(3, 0)), None);
    }

    #[test]
    fn out_of_range_index_has_no_coord() {
        let g = GridMapping::new(3).unwrap();
        assert!(g.coord(3).is_none());
        assert!(g.uv(3).is_none());
    }

    // ── uv ────────────────────────────────────────────────────────────────

    #[test]
    fn uv_is_texel_centred() {
        let g = GridMapping::new(4).unwrap();
        assert_eq!(g.uv(0), Some([0.25, 0.25]));
        assert_eq!(g.uv(1), Some([0.75, 0.25]));
        assert_eq!(g.uv(2), Some([0.25, 0.75]));
        assert_eq!(g.uv(3), Some([0.75, 0.75]));
    }

    #[test]
    fn uv_round_trips_through_texel_at() {
        let g = GridMapping::new(1234).unwrap();
        for (i, c) in g.iter() {
            assert_eq!(g.texel_at(g.uv(i).unwrap()), c);
        }
    }

    #[test]
    fn texel_at_clamps_outside_unit_square() {
        let g = GridMapping::new(9).unwrap();
        assert_eq!(g.texel_at([-0.5, 2.0]), GridCoord::new(0, 2));
        assert_eq!(g.texel_at([1.0, f32::NAN]), GridCoord::new(2, 0));
    }

    #[test]
    fn uvs_has_one_entry_per_particle() {
        let g = GridMapping::new(10).unwrap();
        let uvs = g.uvs();
        assert_eq!(uvs.len(), 10);
        assert_eq!(uvs[9], g.uv(9).unwrap());
    }
}
