use bytemuck::{Pod, Zeroable};
use flowfield_sim::SimulationParams;

use crate::render::RenderCtx;

use super::state_textures::{GpuStateStore, STATE_FORMAT};

/// Uniform block of `shaders/integrate.wgsl`.
///
///  offset  0  time          f32   elapsed seconds (unscaled)
///  offset  4  delta_time    f32   already clamped
///  offset  8  influence     f32
///  offset 12  strength      f32
///  offset 16  frequency     f32
///  offset 20  decay_rate    f32
///  offset 24  _pad          [f32; 2]
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(crate) struct IntegrateUniform {
    pub time: f32,
    pub delta_time: f32,
    pub influence: f32,
    pub strength: f32,
    pub frequency: f32,
    pub decay_rate: f32,
    pub _pad: [f32; 2],
}

impl IntegrateUniform {
    pub(crate) fn from_params(params: &SimulationParams) -> Self {
        let p = params.sanitized();
        Self {
            time: p.elapsed_time,
            delta_time: p.delta_time,
            influence: p.flow_field_influence,
            strength: p.flow_field_strength,
            frequency: p.flow_field_frequency,
            decay_rate: p.decay_rate,
            _pad: [0.0; 2],
        }
    }
}

/// Parameter slots in the uniform ring. Each step recorded before a submit
/// takes its own slot, so up to this many steps may share one encoder.
pub const STEPS_PER_SUBMIT: usize = 8;

/// Dynamic-offset stride: the largest `min_uniform_buffer_offset_alignment`
/// a device may report.
const UNIFORM_STRIDE: u64 = 256;

#[inline]
fn uniform_offset(slot: usize) -> u32 {
    ((slot % STEPS_PER_SUBMIT) as u64 * UNIFORM_STRIDE) as u32
}

/// Runs the flow-field rule over a [`GpuStateStore`] as a fullscreen render
/// pass into the non-current state texture.
///
/// Two bind groups are built per store: one reading surface A (writing B) and
/// one reading B (writing A). The pass never binds a texture it renders into.
#[derive(Default)]
pub struct IntegratePass {
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
    params_ubo: Option<wgpu::Buffer>,

    /// `bind_groups[i]` reads state surface `i`.
    bind_groups: Option<[wgpu::BindGroup; 2]>,
    bound_generation: u64,

    next_slot: usize,
}

impl IntegratePass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one integration step on `encoder` and swaps `state`.
    ///
    /// Passes recorded later on the same encoder observe the new state. Each
    /// call writes `params` into its own uniform slot, so consecutive steps on
    /// one encoder keep their own parameters (up to [`STEPS_PER_SUBMIT`]).
    pub fn encode(
        &mut self,
        ctx: &RenderCtx<'_>,
        encoder: &mut wgpu::CommandEncoder,
        state: &mut GpuStateStore,
        params: &SimulationParams,
    ) {
        self.ensure_pipeline(ctx);
        self.ensure_bindings(ctx, state);

        let Some(ubo) = self.params_ubo.as_ref() else { return };
        let uniform = IntegrateUniform::from_params(params);
        let offset = uniform_offset(self.next_slot);
        self.next_slot = (self.next_slot + 1) % STEPS_PER_SUBMIT;
        ctx.queue.write_buffer(ubo, u64::from(offset), bytemuck::bytes_of(&uniform));

        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(bind_groups) = self.bind_groups.as_ref() else { return };

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("flowfield integrate pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: state.next_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        // Every texel is overwritten by the fullscreen triangle.
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
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
            rpass.set_bind_group(0, &bind_groups[state.front_index()], &[offset]);
            rpass.draw(0..3, 0..1);
        }

        state.swap();
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("flowfield integrate shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/integrate.wgsl").into()),
        });

        let state_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        let bind_group_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("flowfield integrate bgl"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: true,
                                min_binding_size: wgpu::BufferSize::new(
                                    std::mem::size_of::<IntegrateUniform>() as u64,
                                ),
                            },
                            count: None,
                        },
                        state_entry(1),
                        state_entry(2),
                    ],
                });

        let pipeline_layout =
            ctx.device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("flowfield integrate pipeline layout"),
                    bind_group_layouts: &[&bind_group_layout],
                    immediate_size: 0,
                });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("flowfield integrate pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: STATE_FORMAT,
                    // Float32 targets are not blendable.
                    blend: None,
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

        let params_ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("flowfield integrate params ubo"),
            size: UNIFORM_STRIDE * STEPS_PER_SUBMIT as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bind_group_layout);
        self.params_ubo = Some(params_ubo);
        self.bind_groups = None;
    }

    fn ensure_bindings(&mut self, ctx: &RenderCtx<'_>, state: &GpuStateStore) {
        if self.bind_groups.is_some() && self.bound_generation == state.generation() {
            return;
        }
        let Some(bgl) = self.bind_group_layout.as_ref() else { return };
        let Some(ubo) = self.params_ubo.as_ref() else { return };

        let make = |read: usize| {
            ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(if read == 0 {
                    "flowfield integrate A->B"
                } else {
                    "flowfield integrate B->A"
                }),
                layout: bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                            buffer: ubo,
                            offset: 0,
                            size: wgpu::BufferSize::new(
                                std::mem::size_of::<IntegrateUniform>() as u64,
                            ),
                        }),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(state.view(read)),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(state.base_view()),
                    },
                ],
            })
        };

        self.bind_groups = Some([make(0), make(1)]);
        self.bound_generation = state.generation();
        log::debug!("integrate pass bound to state store #{}", state.generation());
    }
}
