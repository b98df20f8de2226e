//! G-buffer pass: one multi-output program fills all seven attachments.
//! Closed shapes are drawn with back faces culled; open surfaces (ground plane,
//! loaded scans, the teapot) are drawn two-sided.

use crate::bindings::{object_bind_group, object_layout, uniform_buffer, uniform_entry};
use crate::error::{validation_scope, RenderError};
use crate::frame::{FrameContext, FrameUniform};
use crate::geometry::{GpuMesh, Vertex};
use crate::material::MaterialBindings;
use crate::scene::DrawItem;
use crate::shader::ProgramModules;
use crate::targets::{GBuffer, GBufferAttachment, DEPTH_FORMAT};

pub struct GBufferPass {
    culled: wgpu::RenderPipeline,
    two_sided: wgpu::RenderPipeline,
    frame_layout: wgpu::BindGroupLayout,
    object_layout: wgpu::BindGroupLayout,
}

impl GBufferPass {
    pub fn new(device: &wgpu::Device, program: &ProgramModules, materials: &MaterialBindings) -> Result<Self, RenderError> {
        validation_scope(device, "gbuffer pass", || {
            let stages = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
            let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("gbuffer_frame_layout"),
                entries: &[uniform_entry(0, stages, std::mem::size_of::<FrameUniform>())],
            });
            let object_layout = object_layout(device, "gbuffer_object_layout", stages);
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("gbuffer_pipeline_layout"),
                bind_group_layouts: &[&frame_layout, &object_layout, materials.layout()],
                push_constant_ranges: &[],
            });
            let targets: Vec<Option<wgpu::ColorTargetState>> =
                (0..GBufferAttachment::COUNT).map(|_| Some(GBuffer::FORMAT.into())).collect();
            let make = |label: &str, cull_mode: Option<wgpu::Face>| {
                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(label),
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
                        targets: &targets,
                        compilation_options: Default::default(),
                    }),
                    primitive: wgpu::PrimitiveState {
                        cull_mode,
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
                })
            };
            let culled = make("gbuffer_pipeline_culled", Some(wgpu::Face::Back));
            let two_sided = make("gbuffer_pipeline_two_sided", None);
            Self { culled, two_sided, frame_layout, object_layout }
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        gbuffer: &GBuffer,
        materials: &MaterialBindings,
        items: &[DrawItem<GpuMesh>],
        ctx: &FrameContext,
    ) {
        let frame_buf = uniform_buffer(device, queue, "gbuffer_frame", &ctx.camera_uniform());
        let frame_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("gbuffer_frame_bind_group"),
            layout: &self.frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buf.as_entire_binding(),
            }],
        });
        let mut rp = gbuffer.bind_for_write(encoder);
        rp.set_bind_group(0, &frame_group, &[]);
        for item in items.iter().filter(|i| i.kind.in_gbuffer()) {
            rp.set_pipeline(if item.two_sided { &self.two_sided } else { &self.culled });
            let object = object_bind_group(device, queue, &self.object_layout, item);
            rp.set_bind_group(1, &object, &[]);
            rp.set_bind_group(2, materials.bind_group(item.textured), &[]);
            item.mesh.draw(&mut rp);
        }
        drop(rp);
    }
}
