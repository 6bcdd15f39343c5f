//! Flow-field particle simulation core.
//!
//! Particles live in a square grid of `Rgba32Float`-shaped texels: `xyz` is the
//! world position, `w` a normalized age. Each step reads the readable surface,
//! writes the other one through a pure per-texel rule, then swaps.
//!
//! This crate holds the layout and the rule only. GPU resources live in
//! `flowfield-engine`, which mirrors [`FlowFieldIntegrator`] in WGSL.

mod error;
pub mod grid;
pub mod integrator;
pub mod noise_field;
pub mod params;
pub mod ping_pong;
pub mod points;
pub mod simulation;
pub mod state;

pub use error::SimError;
pub use grid::{GridCoord, GridMapping};
pub use integrator::{smoothstep, FlowFieldIntegrator};
pub use noise_field::{NoiseField, SimplexField};
pub use params::{SimulationParams, MAX_DELTA_TIME};
pub use ping_pong::PingPong;
pub use points::{lifetime_scale, point_sprites, ParticleAttributes, PointSprite};
pub use simulation::Simulation;
pub use state::{AuxInit, StateStore, Texel};
