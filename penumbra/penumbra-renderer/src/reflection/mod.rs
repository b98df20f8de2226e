//! Reflection passes: the scene seen in the ground mirror, lit forward with shadows.
//! The mirror flips winding, so nothing is culled; each side discards the fragments
//! on the wrong side of the plane.

use crate::bindings::{object_bind_group, object_layout, texture_entry, uniform_buffer, uniform_entry};
use crate::error::{validation_scope, RenderError};
use crate::frame::{FrameContext, FrameUniform, ReflectionSide};
use crate::geometry::{GpuMesh, Vertex};
use crate::material::MaterialBindings;
use crate::scene::DrawItem;
use crate::shader::ProgramModules;
use crate::shadow::ShadowTarget;
use crate::targets::{RenderTarget, DEPTH_FORMAT};

pub const REFLECTION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const CLEAR: f64 = 0.2;

/// One color target per mirror side.
pub struct ReflectionTargets {
    top: RenderTarget,
    bottom: RenderTarget,
}

impl ReflectionTargets {
    pub fn create(device: &wgpu::Device, size: u32) -> Result<Self, RenderError> {
        Ok(Self {
            top: RenderTarget::create(device, "reflection_top", size, size, &[REFLECTION_FORMAT])?,
            bottom: RenderTarget::create(device, "reflection_bottom", size, size, &[REFLECTION_FORMAT])?,
        })
    }

    pub fn target(&self, side: ReflectionSide) -> &RenderTarget {
        match side {
            ReflectionSide::Top => &self.top,
            ReflectionSide::Bottom => &self.bottom,
        }
    }

    pub fn view(&self, side: ReflectionSide) -> &wgpu::TextureView {
        &self.target(side).bind_for_read()[0]
    }
}

pub struct ReflectionPass {
    pipeline: wgpu::RenderPipeline,
    frame_layout: wgpu::BindGroupLayout,
    object_layout: wgpu::BindGroupLayout,
}

impl ReflectionPass {
    pub fn new(device: &wgpu::Device, program: &ProgramModules, materials: &MaterialBindings) -> Result<Self, RenderError> {
        validation_scope(device, "reflection pass", || {
            let stages = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
            let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("reflection_frame_layout"),
                entries: &[
                    uniform_entry(0, stages, std::mem::size_of::<FrameUniform>()),
                    texture_entry(1, false),
                ],
            });
            let object_layout = object_layout(device, "reflection_object_layout", stages);
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("reflection_pipeline_layout"),
                bind_group_layouts: &[&frame_layout, &object_layout, materials.layout()],
                push_constant_ranges: &[],
            });
            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("reflection_pipeline"),
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
                    targets: &[Some(REFLECTION_FORMAT.into())],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState::default(),
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

    #[allow(clippy::too_many_arguments)]
    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        side: ReflectionSide,
        targets: &ReflectionTargets,
        shadow: &ShadowTarget,
        materials: &MaterialBindings,
        items: &[DrawItem<GpuMesh>],
        ctx: &FrameContext,
    ) {
        let frame_buf = uniform_buffer(device, queue, "reflection_frame", &ctx.reflection_uniform(side));
        let frame_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("reflection_frame_bind_group"),
            layout: &self.frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: frame_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(shadow.depth_view()),
                },
            ],
        });
        let keep = |item: &&DrawItem<GpuMesh>| match side {
            ReflectionSide::Top => item.kind.in_top_reflection(),
            ReflectionSide::Bottom => item.kind.in_bottom_reflection(),
        };
        let clear = wgpu::Color { r: CLEAR, g: CLEAR, b: CLEAR, a: 1.0 };
        let mut rp = targets.target(side).bind_for_write(encoder, clear);
        rp.set_pipeline(&self.pipeline);
        rp.set_bind_group(0, &frame_group, &[]);
        for item in items.iter().filter(keep) {
            let object = object_bind_group(device, queue, &self.object_layout, item);
            rp.set_bind_group(1, &object, &[]);
            rp.set_bind_group(2, materials.bind_group(item.textured), &[]);
            item.mesh.draw(&mut rp);
        }
        RenderTarget::unbind(rp);
    }
}
