//! Present pass: blit one raw buffer (a G-buffer attachment or the shadow map)
//! to the surface for the debug display modes.

use scene_api::DisplayMode;

use crate::bindings::{texture_entry, uniform_buffer, uniform_entry};
use crate::error::{validation_scope, RenderError};
use crate::shader::ProgramModules;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PresentUniform {
    /// x: remap kind, y: scale
    pub params: [f32; 4],
}

const RAW: f32 = 0.0;
const UNIT_VECTOR: f32 = 1.0;
const AFFINE: f32 = 2.0;
const PROJECTIVE: f32 = 3.0;
const DEPTH: f32 = 4.0;

impl PresentUniform {
    /// How a debug mode maps its buffer into displayable [0,1] colors; `None` for the
    /// composite modes.
    pub fn for_mode(mode: DisplayMode) -> Option<Self> {
        let (kind, scale) = match mode {
            DisplayMode::Lit | DisplayMode::Ambient => return None,
            // world positions span the ring of radius ~33
            DisplayMode::Position => (AFFINE, 0.015),
            DisplayMode::Diffuse | DisplayMode::TexCoord => (RAW, 1.0),
            DisplayMode::Normal | DisplayMode::EyeVector | DisplayMode::LightVector => (UNIT_VECTOR, 1.0),
            DisplayMode::ShadowCoord => (PROJECTIVE, 1.0),
            // perspective depth crowds near 1
            DisplayMode::ShadowDepth => (DEPTH, 400.0),
        };
        Some(Self { params: [kind, scale, 0.0, 0.0] })
    }
}

pub struct PresentPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl PresentPass {
    pub fn new(device: &wgpu::Device, program: &ProgramModules, output_format: wgpu::TextureFormat) -> Result<Self, RenderError> {
        validation_scope(device, "present pass", || {
            let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("present_bind_group_layout"),
                entries: &[
                    texture_entry(0, false),
                    uniform_entry(1, wgpu::ShaderStages::FRAGMENT, std::mem::size_of::<PresentUniform>()),
                ],
            });
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("present_pipeline_layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });
            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("present_pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &program.vertex,
                    entry_point: Some(program.vertex_entry.as_str()),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &program.fragment,
                    entry_point: Some(program.fragment_entry.as_str()),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: output_format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });
            Self { pipeline, bind_group_layout }
        })
    }

    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        source: &wgpu::TextureView,
        output_view: &wgpu::TextureView,
        params: &PresentUniform,
    ) {
        let params_buf = uniform_buffer(device, queue, "present_params", params);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("present_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: params_buf.as_entire_binding(),
                },
            ],
        });
        let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("present_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rp.set_pipeline(&self.pipeline);
        rp.set_bind_group(0, &bind_group, &[]);
        rp.draw(0..3, 0..1);
        drop(rp);
    }
}
