//! Screen-space value types shared by the render passes.

mod color;
mod viewport;

pub use color::ColorRgba;
pub use viewport::Viewport;
