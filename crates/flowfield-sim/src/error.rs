use thiserror::Error;

/// Setup-time contract violations.
///
/// Per-step numeric problems never surface here; the integrator absorbs them by
/// clamping. Only conditions that would otherwise leave the store in a corrupted
/// state abort initialization.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("particle count must be greater than zero")]
    EmptyParticleSet,

    #[error("grid of {size}x{size} texels exceeds the maximum of {max}x{max}")]
    GridTooLarge { size: u32, max: u32 },

    #[error("seed buffer holds {actual} positions but the grid maps {expected} particles")]
    SeedLengthMismatch { expected: usize, actual: usize },

    #[error("seed position {index} is not finite")]
    NonFiniteSeed { index: usize },
}
