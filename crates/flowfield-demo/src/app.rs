use anyhow::Result;
use flowfield_engine::camera::Camera;
use flowfield_engine::core::{App, AppControl, FrameCtx};
use flowfield_engine::gpgpu::{GpuSimulation, STATE_FORMAT};
use flowfield_engine::render::{ParticleRenderer, ParticleStyle};
use flowfield_engine::time::FrameTime;
use flowfield_sim::{GridMapping, ParticleAttributes, SimulationParams, StateStore, Texel};
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use crate::base_mesh::BaseMesh;
use crate::config::DemoConfig;

const INFLUENCE_STEP: f32 = 0.1;
const STRENGTH_STEP: f32 = 0.1;
const FREQUENCY_STEP: f32 = 0.01;
const ORBIT_STEP: f32 = 0.08;
const ZOOM_STEP: f32 = 0.5;

/// Frame driver: advances the GPU simulation, then draws it.
pub struct FlowFieldApp {
    store: StateStore,
    attributes: ParticleAttributes,
    params: SimulationParams,
    style: ParticleStyle,
    camera: Camera,

    gpu_sim: Option<GpuSimulation>,
    renderer: ParticleRenderer,

    paused: bool,
    reset_requested: bool,
    inspect_requested: bool,
    title_dirty: bool,
}

/// Displacement and age statistics of the particles on one state surface.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct StateSummary {
    pub mean_offset: f32,
    pub max_offset: f32,
    pub mean_age: f32,
}

impl StateSummary {
    /// Compares the first `count` texels of `current` with their seeds.
    pub fn measure(current: &[Texel], base: &[Texel], count: usize) -> Self {
        let n = count.min(current.len()).min(base.len());
        if n == 0 {
            return Self::default();
        }
        let mut sum_offset = 0.0;
        let mut max_offset: f32 = 0.0;
        let mut sum_age = 0.0;
        for (c, b) in current[..n].iter().zip(&base[..n]) {
            let d = c.position.distance(b.position);
            sum_offset += d;
            max_offset = max_offset.max(d);
            sum_age += c.aux;
        }
        Self {
            mean_offset: sum_offset / n as f32,
            max_offset,
            mean_age: sum_age / n as f32,
        }
    }
}

impl FlowFieldApp {
    /// Builds the seed surfaces on the CPU; GPU resources follow on the first
    /// frame.
    pub fn new(config: &DemoConfig) -> Result<Self> {
        let (start, end) = config.palette;
        let mesh = BaseMesh::torus_knot(config.particle_count, config.mesh_seed, start, end);

        let grid = GridMapping::new(mesh.len())?;
        let store = StateStore::initialize(grid, &mesh.positions, config.aux)?;
        let attributes = ParticleAttributes::new(&grid, &mesh.colors, config.size_seed)?;

        let mut renderer = ParticleRenderer::new();
        renderer.set_particles(&attributes);

        log::info!(
            "flowfield: {} particles on a {}x{} state grid",
            grid.count(),
            grid.size(),
            grid.size()
        );

        Ok(Self {
            store,
            attributes,
            params: config.params,
            style: config.style,
            camera: Camera::default(),
            gpu_sim: None,
            renderer,
            paused: false,
            reset_requested: false,
            inspect_requested: false,
            title_dirty: true,
        })
    }

    #[inline]
    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Applies one key press.
    pub fn handle_key(&mut self, key: KeyCode) -> AppControl {
        match key {
            KeyCode::Digit1 => self.params.nudge_influence(-INFLUENCE_STEP),
            KeyCode::Digit2 => self.params.nudge_influence(INFLUENCE_STEP),
            KeyCode::Digit3 => self.params.nudge_strength(-STRENGTH_STEP),
            KeyCode::Digit4 => self.params.nudge_strength(STRENGTH_STEP),
            KeyCode::Digit5 => self.params.nudge_frequency(-FREQUENCY_STEP),
            KeyCode::Digit6 => self.params.nudge_frequency(FREQUENCY_STEP),
            KeyCode::Space => {
                self.paused = !self.paused;
                log::info!("simulation {}", if self.paused { "paused" } else { "resumed" });
            }
            KeyCode::KeyR => {
                self.reset_requested = true;
                log::info!("simulation reset");
            }
            KeyCode::KeyI => {
                self.inspect_requested = true;
                return AppControl::Continue;
            }
            KeyCode::ArrowLeft => self.camera.orbit(-ORBIT_STEP, 0.0),
            KeyCode::ArrowRight => self.camera.orbit(ORBIT_STEP, 0.0),
            KeyCode::ArrowUp => self.camera.orbit(0.0, ORBIT_STEP),
            KeyCode::ArrowDown => self.camera.orbit(0.0, -ORBIT_STEP),
            KeyCode::Equal => self.camera.zoom(ZOOM_STEP),
            KeyCode::Minus => self.camera.zoom(-ZOOM_STEP),
            KeyCode::Escape => return AppControl::Exit,
            _ => return AppControl::Continue,
        }
        self.title_dirty = true;
        AppControl::Continue
    }

    /// Applies a pending reset to the CPU store and records this frame's
    /// timing. Returns whether the GPU surface must be re-uploaded.
    ///
    /// A reset frame starts the noise clock from zero, matching the restarted
    /// frame clock.
    fn prepare_step(&mut self, time: &FrameTime) -> bool {
        let reset = std::mem::take(&mut self.reset_requested);
        if reset {
            self.store.reset();
            self.params.advance(0.0, time.dt);
        } else {
            self.params.advance(time.elapsed, time.dt);
        }
        reset
    }

    fn log_state(&self, texels: &[Texel]) {
        let s = StateSummary::measure(texels, self.store.base_surface(), self.attributes.len());
        log::info!(
            "gpu state: mean offset {:.3}, max offset {:.3}, mean age {:.3}",
            s.mean_offset,
            s.max_offset,
            s.mean_age
        );
    }

    fn title(&self) -> String {
        format!(
            "flowfield | {} particles | influence {:.2} strength {:.2} frequency {:.2}{}",
            self.attributes.len(),
            self.params.flow_field_influence,
            self.params.flow_field_strength,
            self.params.flow_field_frequency,
            if self.paused { " | paused" } else { "" }
        )
    }
}

impl App for FlowFieldApp {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed =>
            {
                match event.physical_key {
                    PhysicalKey::Code(code) => self.handle_key(code),
                    PhysicalKey::Unidentified(_) => AppControl::Continue,
                }
            }
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if self.gpu_sim.is_none() && !ctx.gpu.supports_render_target(STATE_FORMAT) {
            log::error!("adapter cannot render into {STATE_FORMAT:?}; the state store needs it");
            return AppControl::Exit;
        }

        if self.reset_requested {
            ctx.clock.restart();
        }
        ctx.clock.set_paused(self.paused);

        if self.title_dirty {
            ctx.window.set_title(&self.title());
            self.title_dirty = false;
        }

        let reset = self.prepare_step(&ctx.time);

        let store = &self.store;
        let params = &self.params;
        let camera = &self.camera;
        let style = &self.style;
        let renderer = &mut self.renderer;
        let gpu_sim = &mut self.gpu_sim;
        let step = !self.paused;
        let mut failed = false;

        let control = ctx.render(style.clear, |rctx, target| {
            if gpu_sim.is_none() {
                match GpuSimulation::new(rctx, store) {
                    Ok(sim) => *gpu_sim = Some(sim),
                    Err(e) => {
                        log::error!("failed to create GPU simulation: {e:#}");
                        failed = true;
                        return;
                    }
                }
            }
            let Some(sim) = gpu_sim.as_mut() else { return };

            if reset {
                sim.reset(rctx.queue, store);
            }
            if step {
                sim.step(rctx, target.encoder, params);
            }
            renderer.render(rctx, target, sim.state(), camera, style);
        });

        if failed {
            return AppControl::Exit;
        }

        if std::mem::take(&mut self.inspect_requested) {
            if let Some(sim) = self.gpu_sim.as_ref() {
                match sim.state().read_current(ctx.gpu.device(), ctx.gpu.queue()) {
                    Ok(texels) => self.log_state(&texels),
                    Err(e) => log::warn!("state readback failed: {e:#}"),
                }
            }
        }

        control
    }
}
