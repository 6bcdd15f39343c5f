//! GPU-resident simulation: state textures plus the integration pass.
//!
//! Mirrors `flowfield_sim::Simulation`, with the rule running as a fragment
//! shader over the whole state surface instead of a CPU loop.

mod integrate;
mod state_textures;

pub use integrate::{IntegratePass, STEPS_PER_SUBMIT};
pub use state_textures::{GpuStateStore, STATE_FORMAT};

use anyhow::Result;
use flowfield_sim::{SimulationParams, StateStore};

use crate::render::RenderCtx;

/// A [`GpuStateStore`] driven by an [`IntegratePass`].
pub struct GpuSimulation {
    state: GpuStateStore,
    pass: IntegratePass,
    steps: u64,
}

impl GpuSimulation {
    /// Uploads `store` (seed and current surface) to the GPU.
    pub fn new(ctx: &RenderCtx<'_>, store: &StateStore) -> Result<Self> {
        Ok(Self {
            state: GpuStateStore::new(ctx.device, ctx.queue, store)?,
            pass: IntegratePass::new(),
            steps: 0,
        })
    }

    #[inline]
    pub fn state(&self) -> &GpuStateStore {
        &self.state
    }

    /// Steps recorded since creation or the last reset.
    #[inline]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Records one step on `encoder`; later passes on it see the result.
    ///
    /// Up to [`STEPS_PER_SUBMIT`] steps may be recorded before the encoder is
    /// submitted.
    pub fn step(
        &mut self,
        ctx: &RenderCtx<'_>,
        encoder: &mut wgpu::CommandEncoder,
        params: &SimulationParams,
    ) {
        self.pass.encode(ctx, encoder, &mut self.state, params);
        self.steps += 1;
    }

    /// Restores the readable surface from `store`, which should be freshly
    /// reset.
    pub fn reset(&mut self, queue: &wgpu::Queue, store: &StateStore) {
        self.state.upload_current(queue, store);
        self.steps = 0;
    }
}
