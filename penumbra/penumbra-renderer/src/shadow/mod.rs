//! Shadow pass: depth from the light's point of view into an R32Float target.

use crate::bindings::{object_bind_group, object_layout, uniform_buffer, uniform_entry};
use crate::error::{validation_scope, RenderError};
use crate::frame::{FrameContext, ShadowUniform};
use crate::geometry::{GpuMesh, Vertex};
use crate::scene::DrawItem;
use crate::shader::ProgramModules;
use crate::targets::{RenderTarget, DEPTH_FORMAT};

pub const SHADOW_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Float;

pub struct ShadowTarget {
    target: RenderTarget,
}

impl ShadowTarget {
    pub fn create(device: &wgpu::Device, size: u32) -> Result<Self, RenderError> {
        Ok(Self { target: RenderTarget::create(device, "shadow_map", size, size, &[SHADOW_FORMAT])? })
    }

    pub fn target(&self) -> &RenderTarget { &self.target }

    /// Stored light-space depth, readable with `textureLoad`.
    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.target.bind_for_read()[0]
    }
}

pub struct ShadowPass {
    pipeline: wgpu::RenderPipeline,
    frame_layout: wgpu::BindGroupLayout,
    object_layout: wgpu::BindGroupLayout,
}

impl ShadowPass {
    pub fn new(device: &wgpu::Device, program: &ProgramModules) -> Result<Self, RenderError> {
        validation_scope(device, "shadow pass", || {
            let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("shadow_frame_layout"),
                entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX, std::mem::size_of::<ShadowUniform>())],
            });
            let object_layout = object_layout(device, "shadow_object_layout", wgpu::ShaderStages::VERTEX);
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("shadow_pipeline_layout"),
                bind_group_layouts: &[&frame_layout, &object_layout],
                push_constant_ranges: &[],
            });
            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("shadow_pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &program.vertex,
                    entry_point: Some(program.vertex_entry.as_str()),
                    buffers: &[Vertex::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &program.fragment,
                    entry_point: Some(program.fragment_entry.as_str()),
                    targets: &[Some(SHADOW_FORMAT.into())],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    cull_mode: Some(wgpu::Face::Front),
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });
            Self { pipeline, frame_layout, object_layout }
        })
    }

    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        shadow: &ShadowTarget,
        items: &[DrawItem<GpuMesh>],
        ctx: &FrameContext,
    ) {
        let frame_buf = uniform_buffer(device, queue, "shadow_frame", &ctx.shadow_uniform());
        let frame_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow_frame_bind_group"),
            layout: &self.frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buf.as_entire_binding(),
            }],
        });
        // Cleared to the far plane so unlit texels never shadow.
        let mut rp = shadow.target.bind_for_write(encoder, wgpu::Color::WHITE);
        rp.set_pipeline(&self.pipeline);
        rp.set_bind_group(0, &frame_group, &[]);
        for item in items.iter().filter(|i| i.kind.casts_shadow()) {
            let object = object_bind_group(device, queue, &self.object_layout, item);
            rp.set_bind_group(1, &object, &[]);
            item.mesh.draw(&mut rp);
        }
        RenderTarget::unbind(rp);
    }
}
