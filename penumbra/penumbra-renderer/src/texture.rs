//! Material textures: decoded with `image`, mip chain built on the CPU.

use std::path::Path;

use image::imageops::FilterType;
use image::{Rgba, RgbaImage};

use crate::error::RenderError;

pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Tangent-space +Z, encoded.
pub const FLAT_NORMAL: [u8; 4] = [128, 128, 255, 255];

pub fn load_image(path: &Path) -> Result<RgbaImage, RenderError> {
    let img = image::open(path).map_err(|e| RenderError::Texture { path: path.to_path_buf(), reason: e.to_string() })?;
    let rgba = img.to_rgba8();
    log::info!("loaded texture {} ({}x{})", path.display(), rgba.width(), rgba.height());
    Ok(rgba)
}

/// Base level followed by successively halved levels down to 1x1.
pub fn mip_chain(base: RgbaImage) -> Vec<RgbaImage> {
    let mut levels = vec![base];
    loop {
        let last = &levels[levels.len() - 1];
        let (w, h) = last.dimensions();
        if w <= 1 && h <= 1 {
            break;
        }
        let next = image::imageops::resize(last, (w / 2).max(1), (h / 2).max(1), FilterType::Triangle);
        levels.push(next);
    }
    levels
}

pub fn checker(size: u32, cells: u32, a: [u8; 4], b: [u8; 4]) -> RgbaImage {
    let cell = (size / cells.max(1)).max(1);
    RgbaImage::from_fn(size, size, |x, y| {
        if ((x / cell) + (y / cell)) % 2 == 0 {
            Rgba(a)
        } else {
            Rgba(b)
        }
    })
}

pub fn solid(size: u32, rgba: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(size, size, Rgba(rgba))
}

pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl Texture {
    pub fn from_image(device: &wgpu::Device, queue: &wgpu::Queue, label: &str, image: RgbaImage) -> Self {
        let levels = mip_chain(image);
        let (width, height) = levels[0].dimensions();
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        for (level, img) in levels.iter().enumerate() {
            let (w, h) = img.dimensions();
            queue.write_texture(
                wgpu::ImageCopyTexture {
                    texture: &texture,
                    mip_level: level as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                img.as_raw(),
                wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * w),
                    rows_per_image: Some(h),
                },
                wgpu::Extent3d { width: w, height: h, depth_or_array_layers: 1 },
            );
        }
        let view = texture.create_view(&Default::default());
        log::debug!("texture '{label}' {width}x{height}, {} mip levels", levels.len());
        Self { texture, view }
    }

    /// Load `path` if given, otherwise upload the procedural `fallback`.
    pub fn from_path_or(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        path: Option<&Path>,
        fallback: impl FnOnce() -> RgbaImage,
    ) -> Result<Self, RenderError> {
        let image = match path {
            Some(p) => load_image(p)?,
            None => fallback(),
        };
        Ok(Self::from_image(device, queue, label, image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_chain_halves_to_one() {
        let levels = mip_chain(solid(1, [0; 4]));
        assert_eq!(levels.len(), 1);

        let levels = mip_chain(RgbaImage::new(256, 64));
        let dims: Vec<(u32, u32)> = levels.iter().map(|l| l.dimensions()).collect();
        assert_eq!(dims.len(), 9);
        assert_eq!(dims[1], (128, 32));
        assert_eq!(dims[6], (4, 1));
        assert_eq!(dims[8], (1, 1));
    }

    #[test]
    fn mips_average_colors() {
        let levels = mip_chain(checker(64, 64, [255, 255, 255, 255], [0, 0, 0, 255]));
        let last = levels.last().unwrap().get_pixel(0, 0);
        assert!(last[0] > 64 && last[0] < 192, "got {:?}", last);
    }

    #[test]
    fn checker_alternates() {
        let img = checker(8, 4, [1, 1, 1, 1], [2, 2, 2, 2]);
        assert_eq!(img.get_pixel(0, 0).0, [1, 1, 1, 1]);
        assert_eq!(img.get_pixel(2, 0).0, [2, 2, 2, 2]);
        assert_eq!(img.get_pixel(2, 2).0, [1, 1, 1, 1]);
    }

    #[test]
    fn missing_image_is_a_texture_error() {
        let r = load_image(Path::new("/nonexistent/ground.png"));
        assert!(matches!(r, Err(RenderError::Texture { .. })));
    }
}
