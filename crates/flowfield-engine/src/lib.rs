//! Flowfield engine crate.
//!
//! Platform and GPU runtime for the particle simulation: window loop, wgpu
//! device, frame clock, and the two per-frame passes (state integration and
//! sprite rendering).

pub mod camera;
pub mod coords;
pub mod core;
pub mod device;
pub mod gpgpu;
pub mod logging;
pub mod render;
pub mod time;
pub mod window;
