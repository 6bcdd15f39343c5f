use flowfield_engine::coords::ColorRgba;
use flowfield_engine::device::GpuInit;
use flowfield_engine::render::ParticleStyle;
use flowfield_engine::window::RuntimeConfig;
use flowfield_sim::{AuxInit, SimulationParams};
use winit::dpi::LogicalSize;

/// Everything the demo needs before the first frame.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub particle_count: usize,
    /// Seed of the procedural base cloud.
    pub mesh_seed: u64,
    /// Initial particle ages.
    pub aux: AuxInit,
    /// `None` draws sprite sizes from OS entropy.
    pub size_seed: Option<u64>,
    /// Colours at the start and end of the base curve.
    pub palette: (ColorRgba, ColorRgba),
    pub params: SimulationParams,
    pub style: ParticleStyle,
    pub runtime: RuntimeConfig,
    pub gpu: GpuInit,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            particle_count: 65_536,
            mesh_seed: 7,
            aux: AuxInit::Entropy,
            size_seed: None,
            palette: (ColorRgba::from_hex(0xff5e3a), ColorRgba::from_hex(0x3ab7ff)),
            params: SimulationParams::default(),
            style: ParticleStyle::default(),
            runtime: RuntimeConfig {
                title: "flowfield".to_string(),
                initial_size: LogicalSize::new(1280.0, 720.0),
            },
            gpu: GpuInit {
                present_mode: wgpu::PresentMode::AutoVsync,
                ..GpuInit::default()
            },
        }
    }
}
