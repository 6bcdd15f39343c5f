use bytemuck::{Pod, Zeroable};
use flowfield_sim::ParticleAttributes;
use wgpu::util::DeviceExt;

use crate::camera::Camera;
use crate::coords::{ColorRgba, Viewport};
use crate::gpgpu::GpuStateStore;

use super::{RenderCtx, RenderTarget};

/// Look of the particle cloud.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ParticleStyle {
    /// Sprite radius in clip units at unit size factor; the on-screen size is
    /// this over view depth, times half the viewport height in pixels.
    pub point_size: f32,
    pub clear: ColorRgba,
}

impl Default for ParticleStyle {
    fn default() -> Self {
        Self {
            point_size: 0.07,
            clear: ColorRgba::from_hex(0x29191f),
        }
    }
}

/// Draws one camera-facing disc per particle.
///
/// Positions come straight from the state texture the integration pass just
/// wrote, read with `textureLoad` on the particle's own texel. The renderer
/// only reads that texture. Padding cells are never instanced.
#[derive(Default)]
pub struct ParticleRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,

    bind_group_layout: Option<wgpu::BindGroupLayout>,
    camera_ubo: Option<wgpu::Buffer>,
    /// `bind_groups[i]` reads state surface `i`.
    bind_groups: Option<[wgpu::BindGroup; 2]>,
    bound_generation: u64,

    quad_vbo: Option<wgpu::Buffer>,
    quad_ibo: Option<wgpu::Buffer>,

    instances: Vec<ParticleInstance>,
    instances_dirty: bool,
    instance_vbo: Option<wgpu::Buffer>,
    instance_capacity: usize,
}

impl ParticleRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the static per-particle attributes; uploaded on the next
    /// `render`.
    pub fn set_particles(&mut self, attributes: &ParticleAttributes) {
        self.instances = ParticleInstance::from_attributes(attributes);
        self.instances_dirty = true;
    }

    #[inline]
    pub fn particle_count(&self) -> usize {
        self.instances.len()
    }

    /// Renders every particle at its position in `state`'s current surface.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        state: &GpuStateStore,
        camera: &Camera,
        style: &ParticleStyle,
    ) {
        if self.instances.is_empty() || !ctx.viewport.is_valid() {
            return;
        }

        self.ensure_pipeline(ctx);
        self.ensure_static_buffers(ctx);
        self.ensure_bindings(ctx, state);
        self.write_camera_uniform(ctx, camera, style);
        self.upload_instances(ctx);

        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(bind_groups) = self.bind_groups.as_ref() else { return };
        let Some(quad_vbo) = self.quad_vbo.as_ref() else { return };
        let Some(quad_ibo) = self.quad_ibo.as_ref() else { return };
        let Some(instance_vbo) = self.instance_vbo.as_ref() else { return };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("flowfield particle pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, &bind_groups[state.front_index()], &[]);
        rpass.set_vertex_buffer(0, quad_vbo.slice(..));
        rpass.set_vertex_buffer(1, instance_vbo.slice(..));
        rpass.set_index_buffer(quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..6, 0, 0..self.instances.len() as u32);
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("flowfield particle shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/particles.wgsl").into()),
        });

        let bind_group_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("flowfield particle bgl"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::VERTEX,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: wgpu::BufferSize::new(
                                    std::mem::size_of::<CameraUniform>() as u64,
                                ),
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::VERTEX,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                                view_dimension: wgpu::TextureViewDimension::D2,
                                multisampled: false,
                            },
                            count: None,
                        },
                    ],
                });

        let pipeline_layout =
            ctx.device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("flowfield particle pipeline layout"),
                    bind_group_layouts: &[&bind_group_layout],
                    immediate_size: 0,
                });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("flowfield particle pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout(), ParticleInstance::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let camera_ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("flowfield particle camera ubo"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bind_group_layout);
        self.camera_ubo = Some(camera_ubo);

        self.bind_groups = None;
    }

    fn ensure_bindings(&mut self, ctx: &RenderCtx<'_>, state: &GpuStateStore) {
        if self.bind_groups.is_some() && self.bound_generation == state.generation() {
            return;
        }
        let Some(bgl) = self.bind_group_layout.as_ref() else { return };
        let Some(ubo) = self.camera_ubo.as_ref() else { return };

        let make = |read: usize| {
            ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("flowfield particle bind group"),
                layout: bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: ubo.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(state.view(read)),
                    },
                ],
            })
        };

        self.bind_groups = Some([make(0), make(1)]);
        self.bound_generation = state.generation();
    }

    fn ensure_static_buffers(&mut self, ctx: &RenderCtx<'_>) {
        if self.quad_vbo.is_some() && self.quad_ibo.is_some() {
            return;
        }

        self.quad_vbo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("flowfield particle quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        }));

        self.quad_ibo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("flowfield particle quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        }));
    }

    fn write_camera_uniform(&self, ctx: &RenderCtx<'_>, camera: &Camera, style: &ParticleStyle) {
        let Some(ubo) = self.camera_ubo.as_ref() else { return };
        let u = CameraUniform::new(camera, ctx.viewport, style);
        ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&u));
    }

    fn upload_instances(&mut self, ctx: &RenderCtx<'_>) {
        let required = self.instances.len();
        if required > self.instance_capacity || self.instance_vbo.is_none() {
            let new_cap = required.next_power_of_two().max(64);
            self.instance_vbo = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("flowfield particle instance vbo"),
                size: (new_cap * std::mem::size_of::<ParticleInstance>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.instance_capacity = new_cap;
            self.instances_dirty = true;
        }

        if !self.instances_dirty {
            return;
        }
        let Some(vbo) = self.instance_vbo.as_ref() else { return };
        ctx.queue.write_buffer(vbo, 0, bytemuck::cast_slice(&self.instances));
        self.instances_dirty = false;
        log::debug!("uploaded {} particle instances", required);
    }
}

// ── camera uniform ────────────────────────────────────────────────────────

///  offset  0  view_proj   mat4x4<f32>
///  offset 64  resolution  vec2<f32>   physical px
///  offset 72  point_size  f32
///  offset 76  _pad        f32
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct CameraUniform {
    view_proj: [[f32; 4]; 4],
    resolution: [f32; 2],
    point_size: f32,
    _pad: f32,
}

impl CameraUniform {
    fn new(camera: &Camera, viewport: Viewport, style: &ParticleStyle) -> Self {
        Self {
            view_proj: camera.view_projection(viewport.aspect()).to_cols_array_2d(),
            resolution: [viewport.width.max(1.0), viewport.height.max(1.0)],
            point_size: style.point_size,
            _pad: 0.0,
        }
    }
}

// ── quad vertex ───────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct QuadVertex {
    corner: [f32; 2], // 0..1
}

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { corner: [0.0, 0.0] },
    QuadVertex { corner: [1.0, 0.0] },
    QuadVertex { corner: [1.0, 1.0] },
    QuadVertex { corner: [0.0, 1.0] },
];

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

// ── instance ──────────────────────────────────────────────────────────────

///  offset  0  uv     [f32; 2]
///  offset  8  size   f32
///  offset 12  color  [f32; 3]
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct ParticleInstance {
    uv: [f32; 2],
    size: f32,
    color: [f32; 3],
}

impl ParticleInstance {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        1 => Float32x2, // uv
        2 => Float32,   // size
        3 => Float32x3  // color
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ParticleInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }

    fn from_attributes(attributes: &ParticleAttributes) -> Vec<Self> {
        attributes
            .uvs
            .iter()
            .zip(&attributes.sizes)
            .zip(&attributes.colors)
            .map(|((&uv, &size), &color)| Self { uv, size, color })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowfield_sim::GridMapping;

    #[test]
    fn gpu_struct_sizes() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 80);
        assert_eq!(std::mem::size_of::<ParticleInstance>(), 24);
        assert_eq!(std::mem::size_of::<QuadVertex>(), 8);
    }

    #[test]
    fn instances_cover_particles_only() {
        let grid = GridMapping::new(5).unwrap();
        let colors = vec![[0.2, 0.4, 0.6]; 5];
        let attrs = ParticleAttributes::new(&grid, &colors, Some(1)).unwrap();
        let instances = ParticleInstance::from_attributes(&attrs);
        assert_eq!(instances.len(), 5);
        assert_eq!(instances[4].uv, grid.uv(4).unwrap());
        assert_eq!(instances[2].size, attrs.sizes[2]);
    }

    #[test]
    fn camera_uniform_guards_zero_viewport() {
        let style = ParticleStyle::default();
        let u = CameraUniform::new(&Camera::default(), Viewport::default(), &style);
        assert_eq!(u.resolution, [1.0, 1.0]);
        assert!(u.view_proj.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn set_particles_tracks_count() {
        let grid = GridMapping::new(3).unwrap();
        let attrs = ParticleAttributes::new(&grid, &[[1.0; 3]; 3], Some(2)).unwrap();
        let mut renderer = ParticleRenderer::new();
        renderer.set_particles(&attrs);
        assert_eq!(renderer.particle_count(), 3);
    }
}
