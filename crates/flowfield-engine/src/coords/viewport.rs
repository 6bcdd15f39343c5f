use winit::dpi::PhysicalSize;

/// Drawable size in physical pixels.
///
/// The sprite pass needs the true pixel aspect ratio and height to size
/// points, so no DPI scaling is applied here.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// Width over height; `1.0` for a degenerate viewport.
    #[inline]
    pub fn aspect(self) -> f32 {
        if self.is_valid() { self.width / self.height } else { 1.0 }
    }
}

impl From<PhysicalSize<u32>> for Viewport {
    fn from(size: PhysicalSize<u32>) -> Self {
        Self::new(size.width as f32, size.height as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_of_wide_window() {
        assert_eq!(Viewport::new(1600.0, 800.0).aspect(), 2.0);
    }

    #[test]
    fn minimized_window_has_unit_aspect() {
        let v = Viewport::from(PhysicalSize::new(0, 0));
        assert!(!v.is_valid());
        assert_eq!(v.aspect(), 1.0);
    }
}
