//! Group 2 of the geometry programs: color map, normal map and their sampler.

use image::RgbaImage;

use crate::bindings::{sampler_entry, texture_entry};
use crate::config::RendererConfig;
use crate::error::{validation_scope, RenderError};
use crate::texture::{self, Texture, FLAT_NORMAL};

const CHECKER_SIZE: u32 = 256;
const CHECKER_CELLS: u32 = 8;

fn ground_checker() -> RgbaImage {
    texture::checker(CHECKER_SIZE, CHECKER_CELLS, [150, 110, 70, 255], [90, 60, 35, 255])
}

pub struct MaterialBindings {
    layout: wgpu::BindGroupLayout,
    ground: wgpu::BindGroup,
    plain: wgpu::BindGroup,
    _textures: [Texture; 3],
}

impl MaterialBindings {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, config: &RendererConfig) -> Result<Self, RenderError> {
        let ground_color = Texture::from_path_or(
            device,
            queue,
            "ground_color",
            config.ground_color_texture.as_deref(),
            ground_checker,
        )?;
        let ground_normal = Texture::from_path_or(
            device,
            queue,
            "ground_normal",
            config.ground_normal_texture.as_deref(),
            || texture::solid(4, FLAT_NORMAL),
        )?;
        let white = Texture::from_image(device, queue, "white", texture::solid(1, [255; 4]));

        validation_scope(device, "material bindings", || {
            let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("material_bind_group_layout"),
                entries: &[texture_entry(0, true), texture_entry(1, true), sampler_entry(2)],
            });
            let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("material_sampler"),
                address_mode_u: wgpu::AddressMode::Repeat,
                address_mode_v: wgpu::AddressMode::Repeat,
                address_mode_w: wgpu::AddressMode::Repeat,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::FilterMode::Linear,
                ..Default::default()
            });
            let group = |label: &str, color: &wgpu::TextureView, normal: &wgpu::TextureView| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(label),
                    layout: &layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(color),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(normal),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::Sampler(&sampler),
                        },
                    ],
                })
            };
            let ground = group("ground_material", &ground_color.view, &ground_normal.view);
            let plain = group("plain_material", &white.view, &white.view);
            (layout, ground, plain)
        })
        .map(|(layout, ground, plain)| Self {
            layout,
            ground,
            plain,
            _textures: [ground_color, ground_normal, white],
        })
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout { &self.layout }

    pub fn bind_group(&self, textured: bool) -> &wgpu::BindGroup {
        if textured {
            &self.ground
        } else {
            &self.plain
        }
    }
}
