use glam::Vec3;

use crate::grid::GridMapping;
use crate::integrator::FlowFieldIntegrator;
use crate::noise_field::{NoiseField, SimplexField};
use crate::params::SimulationParams;
use crate::state::{AuxInit, StateStore, Texel};
use crate::SimError;

/// CPU reference simulation: a state store driven by the flow-field rule.
///
/// The GPU path in the engine crate runs the same rule in a fragment shader;
/// this type is what tests and headless tools step.
#[derive(Debug, Clone)]
pub struct Simulation<N = SimplexField> {
    store: StateStore,
    integrator: FlowFieldIntegrator<N>,
}

impl Simulation {
    /// Seeds a simulation with the default simplex field.
    pub fn new(seeds: &[Vec3], aux: AuxInit) -> Result<Self, SimError> {
        Self::with_noise(seeds, aux, SimplexField::default())
    }
}

impl<N: NoiseField> Simulation<N> {
    pub fn with_noise(seeds: &[Vec3], aux: AuxInit, noise: N) -> Result<Self, SimError> {
        let grid = GridMapping::new(seeds.len())?;
        let store = StateStore::initialize(grid, seeds, aux)?;
        Ok(Self {
            store,
            integrator: FlowFieldIntegrator::new(noise),
        })
    }

    #[inline]
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    #[inline]
    pub fn grid(&self) -> GridMapping {
        self.store.grid()
    }

    /// Advances every particle by one step.
    pub fn step(&mut self, params: &SimulationParams) {
        self.integrator.step(&mut self.store, params);
    }

    /// Readable surface (see [`StateStore::current_surface`]).
    #[inline]
    pub fn current_surface(&self) -> &[Texel] {
        self.store.current_surface()
    }

    /// Current particle positions in index order; padding is skipped.
    pub fn positions(&self) -> Vec<Vec3> {
        (0..self.grid().count())
            .filter_map(|i| self.store.particle(i))
            .map(|t| t.position)
            .collect()
    }

    pub fn reset(&mut self) {
        self.store.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_seed_buffer_is_rejected() {
        assert_eq!(
            Simulation::new(&[], AuxInit::Zero).unwrap_err(),
            SimError::EmptyParticleSet
        );
    }

    #[test]
    fn positions_skip_padding() {
        let seeds = vec![Vec3::X, Vec3::Y, Vec3::Z];
        let sim = Simulation::new(&seeds, AuxInit::Zero).unwrap();
        assert_eq!(sim.current_surface().len(), 4);
        assert_eq!(sim.positions(), seeds);
    }

    #[test]
    fn step_then_reset_round_trips() {
        let seeds: Vec<Vec3> = (0..12).map(|i| Vec3::new(i as f32, 0.0, 1.0)).collect();
        let mut sim = Simulation::new(&seeds, AuxInit::Seeded(4)).unwrap();
        let params = SimulationParams { delta_time: 1.0 / 60.0, ..Default::default() };
        for _ in 0..10 {
            sim.step(&params);
        }
        assert_eq!(sim.store().steps(), 10);
        sim.reset();
        assert_eq!(sim.positions(), seeds);
    }

    #[test]
    fn injected_noise_is_used() {
        // Strong constant field with no pull: everything moves the same way.
        let seeds = vec![Vec3::ZERO, Vec3::ONE];
        let mut sim = Simulation::with_noise(&seeds, AuxInit::Zero, |_p: [f64; 4]| 1.0).unwrap();
        let params = SimulationParams {
            delta_time: 0.03,
            flow_field_influence: 1.0,
            flow_field_strength: 1.0,
            decay_rate: 0.0,
            ..Default::default()
        };
        sim.step(&params);
        let moved = sim.positions();
        let d0 = moved[0] - seeds[0];
        let d1 = moved[1] - seeds[1];
        assert!((d0 - d1).length() < 1.0e-6);
        assert!((d0.length() - 0.03).abs() < 1.0e-6);
    }
}
