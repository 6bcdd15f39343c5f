use winit::dpi::PhysicalSize;

use super::SurfaceErrorAction;

/// Picks the swapchain format.
///
/// With `prefer_srgb` an sRGB 8-bit format wins; without it the first linear
/// format does. Falls back to the adapter's first format either way.
pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    let first = *caps.formats.first()?;

    let preferred = caps
        .formats
        .iter()
        .copied()
        .find(|f| f.is_srgb() == prefer_srgb && is_8bit_rgba(*f));

    Some(preferred.unwrap_or(first))
}

fn is_8bit_rgba(format: wgpu::TextureFormat) -> bool {
    matches!(
        format,
        wgpu::TextureFormat::Bgra8UnormSrgb
            | wgpu::TextureFormat::Rgba8UnormSrgb
            | wgpu::TextureFormat::Bgra8Unorm
            | wgpu::TextureFormat::Rgba8Unorm
    )
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// Reconfigures the swapchain for `new_size`.
///
/// Only the presentation surface follows the window; the particle state
/// textures are sized by particle count and stay untouched.
pub(crate) fn apply_resize(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &mut wgpu::SurfaceConfiguration,
    size: &mut PhysicalSize<u32>,
    new_size: PhysicalSize<u32>,
) {
    *size = new_size;

    // wgpu rejects 0x0 surfaces (minimized windows); configuration is deferred.
    if new_size.width == 0 || new_size.height == 0 {
        return;
    }

    config.width = new_size.width;
    config.height = new_size.height;

    surface.configure(device, config);
}

pub(crate) fn map_surface_error(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    err: wgpu::SurfaceError,
) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
            if size.width > 0 && size.height > 0 {
                surface.configure(device, config);
            }
            SurfaceErrorAction::Reconfigured
        }
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout => SurfaceErrorAction::SkipFrame,
        wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::TextureFormat as F;

    fn caps(formats: &[F]) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities {
            formats: formats.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn no_formats_yields_none() {
        assert_eq!(choose_surface_format(&caps(&[]), true), None);
    }

    #[test]
    fn srgb_preferred_when_requested() {
        let c = caps(&[F::Bgra8Unorm, F::Bgra8UnormSrgb]);
        assert_eq!(choose_surface_format(&c, true), Some(F::Bgra8UnormSrgb));
    }

    #[test]
    fn linear_preferred_when_srgb_not_requested() {
        let c = caps(&[F::Rgba8UnormSrgb, F::Rgba8Unorm]);
        assert_eq!(choose_surface_format(&c, false), Some(F::Rgba8Unorm));
    }

    #[test]
    fn falls_back_to_first_format() {
        let c = caps(&[F::Rgb10a2Unorm, F::Rgba16Float]);
        assert_eq!(choose_surface_format(&c, true), Some(F::Rgb10a2Unorm));
    }

    #[test]
    fn unsupported_alpha_mode_is_replaced() {
        let c = wgpu::SurfaceCapabilities {
            alpha_modes: vec![wgpu::CompositeAlphaMode::Opaque],
            ..Default::default()
        };
        assert_eq!(
            choose_alpha_mode(&c, Some(wgpu::CompositeAlphaMode::PreMultiplied)),
            wgpu::CompositeAlphaMode::Opaque
        );
    }
}
