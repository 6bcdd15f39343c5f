//! Presentation passes.
//!
//! Each renderer owns its GPU resources (pipelines, buffers, bind groups) and
//! creates them lazily from the first `RenderCtx` it sees.

mod ctx;
mod particles;

pub use ctx::{RenderCtx, RenderTarget};
pub use particles::{ParticleRenderer, ParticleStyle};
