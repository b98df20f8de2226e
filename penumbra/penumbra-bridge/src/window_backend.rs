//! Window-capable backend: created from a window, implements RenderBackendWindow.

use penumbra_renderer::RendererConfig;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use scene_api::{RenderBackend, RenderBackendWindow, SceneState};
use wgpu::SurfaceTargetUnsafe;

use crate::plugin::PenumbraPlugin;

/// Backend that owns the wgpu instance and a [`PenumbraPlugin`]; presents to a window.
/// The surface is recreated from the raw handles every frame, so the host only has
/// to keep the window alive.
pub struct PenumbraWindowBackend {
    instance: wgpu::Instance,
    plugin: PenumbraPlugin,
}

impl PenumbraWindowBackend {
    /// `config.swapchain_format` is overwritten with a format the window's surface supports.
    pub fn from_window(
        window: &(impl HasWindowHandle + HasDisplayHandle),
        config: RendererConfig,
    ) -> Result<Box<dyn RenderBackendWindow>, String> {
        let (raw_window, raw_display) = {
            let wh = window.window_handle().map_err(|e| e.to_string())?;
            let dh = window.display_handle().map_err(|e| e.to_string())?;
            (wh.as_raw(), dh.as_raw())
        };
        let backend = pollster::block_on(Self::from_raw_handles_async(raw_window, raw_display, config))?;
        Ok(Box::new(backend))
    }

    async fn from_raw_handles_async(
        raw_window_handle: raw_window_handle::RawWindowHandle,
        raw_display_handle: raw_window_handle::RawDisplayHandle,
        config: RendererConfig,
    ) -> Result<Self, String> {
        let instance = wgpu::Instance::default();
        let target = SurfaceTargetUnsafe::RawHandle {
            raw_window_handle,
            raw_display_handle,
        };
        let surface = unsafe { instance.create_surface_unsafe(target).map_err(|e| e.to_string())? };
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or("No adapter")?;
        let info = adapter.get_info();
        log::info!("adapter: {} ({:?})", info.name, info.backend);
        // Seven Rgba32Float attachments need far more color bytes per sample than
        // the default limits allow.
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("penumbra_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(|e| e.to_string())?;
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .unwrap_or(wgpu::TextureFormat::Bgra8Unorm);
        log::info!("swapchain format {format:?}");
        let config = RendererConfig {
            swapchain_format: format,
            ..config
        };
        let plugin = PenumbraPlugin::new_with_config(device, queue, config)?;
        drop(surface);
        Ok(Self { instance, plugin })
    }

    fn surface_config(format: wgpu::TextureFormat, width: u32, height: u32) -> wgpu::SurfaceConfiguration {
        wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Opaque,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        }
    }
}

impl RenderBackend for PenumbraWindowBackend {
    fn prepare(&mut self, state: &SceneState) -> Result<(), String> {
        self.plugin.prepare(state)
    }

    fn render_frame(&mut self, state: &SceneState) -> Result<(), String> {
        self.plugin.render_frame(state)
    }
}

impl RenderBackendWindow for PenumbraWindowBackend {
    fn render_frame_to_window(
        &mut self,
        state: &SceneState,
        raw_window_handle: raw_window_handle::RawWindowHandle,
        raw_display_handle: raw_window_handle::RawDisplayHandle,
    ) -> Result<(), String> {
        let target = SurfaceTargetUnsafe::RawHandle {
            raw_window_handle,
            raw_display_handle,
        };
        let surface = unsafe {
            self.instance
                .create_surface_unsafe(target)
                .map_err(|e| e.to_string())?
        };
        let config = Self::surface_config(
            self.plugin.renderer().config().swapchain_format,
            state.width.max(1),
            state.height.max(1),
        );
        surface.configure(self.plugin.device(), &config);

        let frame = match surface.get_current_texture() {
            Ok(f) => f,
            Err(e @ (wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost)) => {
                log::warn!("surface {e}; reconfiguring and skipping frame");
                surface.configure(self.plugin.device(), &config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface timeout; skipping frame");
                return Ok(());
            }
            Err(e) => return Err(e.to_string()),
        };
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.plugin.render_frame_to_view(state, &view)?;
        frame.present();
        Ok(())
    }
}
