//! Global lighting composite: full-screen triangle, per-pixel Phong from the G-buffer,
//! shadow test against the shadow map, mirror term from the reflection images.

use crate::bindings::{sampler_entry, texture_entry, uniform_buffer, uniform_entry};
use crate::error::{validation_scope, RenderError};
use crate::frame::{FrameContext, LightingUniform, ReflectionSide};
use crate::reflection::{ReflectionTargets, REFLECTION_FORMAT};
use crate::shader::ProgramModules;
use crate::shadow::ShadowTarget;
use crate::targets::{GBuffer, GBufferAttachment};

const CLEAR: f32 = 0.1;
const SHADOW_BINDING: u32 = GBufferAttachment::COUNT as u32;
const REFLECTION_TOP_BINDING: u32 = SHADOW_BINDING + 1;
const REFLECTION_BOTTOM_BINDING: u32 = SHADOW_BINDING + 2;
const SAMPLER_BINDING: u32 = SHADOW_BINDING + 3;
const LIGHTING_BINDING: u32 = SHADOW_BINDING + 4;

pub struct CompositePass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    /// Bound in place of the reflection images when they are not rendered.
    no_reflection: wgpu::TextureView,
}

impl CompositePass {
    pub fn new(device: &wgpu::Device, program: &ProgramModules, output_format: wgpu::TextureFormat) -> Result<Self, RenderError> {
        validation_scope(device, "composite pass", || {
            let mut entries: Vec<wgpu::BindGroupLayoutEntry> =
                (0..SHADOW_BINDING).map(|binding| texture_entry(binding, false)).collect();
            entries.push(texture_entry(SHADOW_BINDING, false));
            entries.push(texture_entry(REFLECTION_TOP_BINDING, true));
            entries.push(texture_entry(REFLECTION_BOTTOM_BINDING, true));
            entries.push(sampler_entry(SAMPLER_BINDING));
            entries.push(uniform_entry(
                LIGHTING_BINDING,
                wgpu::ShaderStages::FRAGMENT,
                std::mem::size_of::<LightingUniform>(),
            ));
            let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("composite_bind_group_layout"),
                entries: &entries,
            });
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("composite_pipeline_layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });
            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("composite_pipeline"),
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
                    targets: &[Some(output_format.into())],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });
            let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("composite_reflection_sampler"),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::FilterMode::Nearest,
                ..Default::default()
            });
            let placeholder = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("composite_no_reflection"),
                size: wgpu::Extent3d { width: 1, height: 1, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: REFLECTION_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            });
            let no_reflection = placeholder.create_view(&Default::default());
            Self { pipeline, bind_group_layout, sampler, no_reflection }
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        output_view: &wgpu::TextureView,
        gbuffer: &GBuffer,
        shadow: &ShadowTarget,
        reflections: Option<&ReflectionTargets>,
        ctx: &FrameContext,
    ) {
        let lighting = ctx.lighting_uniform(reflections.is_some(), CLEAR);
        let lighting_buf = uniform_buffer(device, queue, "composite_lighting", &lighting);
        let (top, bottom) = match reflections {
            Some(r) => (r.view(ReflectionSide::Top), r.view(ReflectionSide::Bottom)),
            None => (&self.no_reflection, &self.no_reflection),
        };

        let mut entries: Vec<wgpu::BindGroupEntry> = gbuffer
            .bind_for_read()
            .iter()
            .enumerate()
            .map(|(i, view)| wgpu::BindGroupEntry {
                binding: i as u32,
                resource: wgpu::BindingResource::TextureView(view),
            })
            .collect();
        entries.extend([
            wgpu::BindGroupEntry {
                binding: SHADOW_BINDING,
                resource: wgpu::BindingResource::TextureView(shadow.depth_view()),
            },
            wgpu::BindGroupEntry {
                binding: REFLECTION_TOP_BINDING,
                resource: wgpu::BindingResource::TextureView(top),
            },
            wgpu::BindGroupEntry {
                binding: REFLECTION_BOTTOM_BINDING,
                resource: wgpu::BindingResource::TextureView(bottom),
            },
            wgpu::BindGroupEntry {
                binding: SAMPLER_BINDING,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            },
            wgpu::BindGroupEntry {
                binding: LIGHTING_BINDING,
                resource: lighting_buf.as_entire_binding(),
            },
        ]);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("composite_bind_group"),
            layout: &self.bind_group_layout,
            entries: &entries,
        });

        let clear = CLEAR as f64;
        let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("composite_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color { r: clear, g: clear, b: clear, a: 1.0 }),
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
