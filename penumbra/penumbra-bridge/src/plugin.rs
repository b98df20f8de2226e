//! Penumbra plugin: implements RenderBackend for the host.

use std::sync::Arc;

use penumbra_renderer::{Renderer, RendererConfig};
use scene_api::{RenderBackend, SceneState};

/// Offscreen color target for hosts without a window.
struct Offscreen {
    view: Arc<wgpu::TextureView>,
    size: (u32, u32),
}

/// Owns the renderer (and with it the wgpu device and queue).
pub struct PenumbraPlugin {
    renderer: Renderer,
    offscreen: Option<Offscreen>,
}

impl PenumbraPlugin {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Result<Self, String> {
        Self::new_with_config(device, queue, RendererConfig::default())
    }

    pub fn new_with_config(device: wgpu::Device, queue: wgpu::Queue, config: RendererConfig) -> Result<Self, String> {
        let renderer = Renderer::new_with_config(device, queue, config).map_err(|e| e.to_string())?;
        Ok(Self { renderer, offscreen: None })
    }

    pub fn device(&self) -> &wgpu::Device {
        self.renderer.device()
    }
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Render one frame into `view` (e.g. the swapchain image) and submit it.
    pub fn render_frame_to_view(&mut self, state: &SceneState, view: &wgpu::TextureView) -> Result<(), String> {
        self.renderer.render_to_view(view, state).map_err(|e| e.to_string())
    }

    fn offscreen_view(&mut self, width: u32, height: u32) -> Arc<wgpu::TextureView> {
        let size = (width.max(1), height.max(1));
        if let Some(o) = &self.offscreen {
            if o.size == size {
                return Arc::clone(&o.view);
            }
        }
        let texture = self.renderer.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("penumbra_offscreen"),
            size: wgpu::Extent3d { width: size.0, height: size.1, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.renderer.config().swapchain_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = Arc::new(texture.create_view(&Default::default()));
        log::debug!("offscreen target {}x{}", size.0, size.1);
        self.offscreen = Some(Offscreen { view: Arc::clone(&view), size });
        view
    }
}

impl RenderBackend for PenumbraPlugin {
    fn prepare(&mut self, state: &SceneState) -> Result<(), String> {
        self.renderer.prepare(state).map_err(|e| e.to_string())
    }

    fn render_frame(&mut self, state: &SceneState) -> Result<(), String> {
        let view = self.offscreen_view(state.width, state.height);
        self.render_frame_to_view(state, &view)
    }
}
