/// Linear RGBA color.
///
/// Values are linear; the sRGB surface formats encode on write.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ColorRgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorRgba {
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn black() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    #[inline]
    pub const fn white() -> Self {
        Self::new(1.0, 1.0, 1.0, 1.0)
    }

    /// Opaque color from a `0xRRGGBB` sRGB literal.
    pub fn from_hex(rgb: u32) -> Self {
        let channel = |shift: u32| srgb_to_linear(((rgb >> shift) & 0xff) as f32 / 255.0);
        Self::new(channel(16), channel(8), channel(0), 1.0)
    }

    #[inline]
    pub fn rgb(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// Linear interpolation, `t` clamped to `[0, 1]`.
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a + (other.a - self.a) * t,
        )
    }

    pub fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r as f64,
            g: self.g as f64,
            b: self.b as f64,
            a: self.a as f64,
        }
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_extremes() {
        assert_eq!(ColorRgba::from_hex(0x000000), ColorRgba::black());
        assert_eq!(ColorRgba::from_hex(0xffffff), ColorRgba::white());
    }

    #[test]
    fn hex_is_linearized() {
        let c = ColorRgba::from_hex(0x808080);
        assert!((c.r - 0.2158).abs() < 1.0e-3, "got {}", c.r);
        assert_eq!(c.r, c.g);
    }

    #[test]
    fn lerp_clamps() {
        let a = ColorRgba::black();
        let b = ColorRgba::white();
        assert_eq!(a.lerp(b, 2.0), b);
        assert_eq!(a.lerp(b, 0.5).g, 0.5);
    }
}
