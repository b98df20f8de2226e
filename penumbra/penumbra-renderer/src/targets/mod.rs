//! Offscreen render targets: N color attachments + one depth attachment of equal size,
//! checked for completeness once at creation and never resized.

mod gbuffer;

use wgpu::{CommandEncoder, TextureFormat, TextureView};

use crate::error::{validation_scope, RenderError};

pub use gbuffer::{GBuffer, GBufferAttachment};

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// Format and extent of one attachment, as seen by the completeness check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttachmentDesc {
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
}

impl AttachmentDesc {
    fn of(texture: &wgpu::Texture) -> Self {
        Self { format: texture.format(), width: texture.width(), height: texture.height() }
    }
}

/// Completeness rules for a render target against device limits. A target that fails
/// any of them is never drawn into.
pub fn check_completeness(
    label: &str,
    colors: &[AttachmentDesc],
    depth: &AttachmentDesc,
    limits: &wgpu::Limits,
) -> Result<(), RenderError> {
    let incomplete = |reason: String| RenderError::IncompleteTarget { label: label.to_string(), reason };

    if colors.is_empty() {
        return Err(incomplete("no color attachments".to_string()));
    }
    if colors.len() as u32 > limits.max_color_attachments {
        return Err(incomplete(format!(
            "{} color attachments exceed device limit {}",
            colors.len(),
            limits.max_color_attachments
        )));
    }
    let (w, h) = (depth.width, depth.height);
    if w == 0 || h == 0 {
        return Err(incomplete("zero-sized attachment".to_string()));
    }
    if w > limits.max_texture_dimension_2d || h > limits.max_texture_dimension_2d {
        return Err(incomplete(format!(
            "{w}x{h} exceeds max texture dimension {}",
            limits.max_texture_dimension_2d
        )));
    }
    if !depth.format.has_depth_aspect() {
        return Err(incomplete(format!("{:?} is not a depth format", depth.format)));
    }

    let mut bytes_per_sample = 0u32;
    for (i, c) in colors.iter().enumerate() {
        if (c.width, c.height) != (w, h) {
            return Err(incomplete(format!(
                "color attachment {i} is {}x{}, depth is {w}x{h}",
                c.width, c.height
            )));
        }
        let cost = match (c.format.is_depth_stencil_format(), c.format.target_pixel_byte_cost()) {
            (false, Some(cost)) => cost,
            _ => return Err(incomplete(format!("color attachment {i} format {:?} is not color-renderable", c.format))),
        };
        let align = c.format.target_component_alignment().unwrap_or(1);
        bytes_per_sample = bytes_per_sample.div_ceil(align) * align + cost;
    }
    if bytes_per_sample > limits.max_color_attachment_bytes_per_sample {
        return Err(incomplete(format!(
            "{bytes_per_sample} color bytes per sample exceed device limit {}",
            limits.max_color_attachment_bytes_per_sample
        )));
    }
    Ok(())
}

/// [`check_completeness`], logging the failure. Every fatal target error goes through here.
fn check_logged(
    label: &str,
    colors: &[AttachmentDesc],
    depth: &AttachmentDesc,
    limits: &wgpu::Limits,
) -> Result<(), RenderError> {
    check_completeness(label, colors, depth, limits).inspect_err(|e| log::error!("{e}"))
}

pub struct RenderTarget {
    label: String,
    width: u32,
    height: u32,
    colors: Vec<wgpu::Texture>,
    color_views: Vec<TextureView>,
    depth: wgpu::Texture,
    depth_view: TextureView,
}

impl RenderTarget {
    pub fn create(
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
        color_formats: &[TextureFormat],
    ) -> Result<Self, RenderError> {
        let make = |name: String, format: TextureFormat| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(&name),
                size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
        };
        // Limits are checked before allocation so an oversized request fails with a
        // completeness error instead of a device validation error.
        let requested: Vec<AttachmentDesc> = color_formats
            .iter()
            .map(|&format| AttachmentDesc { format, width, height })
            .collect();
        let limits = device.limits();
        check_logged(label, &requested, &AttachmentDesc { format: DEPTH_FORMAT, width, height }, &limits)?;

        let (colors, depth) = validation_scope(device, label, || {
            let colors: Vec<wgpu::Texture> = color_formats
                .iter()
                .enumerate()
                .map(|(i, &format)| make(format!("{label}_color{i}"), format))
                .collect();
            let depth = make(format!("{label}_depth"), DEPTH_FORMAT);
            (colors, depth)
        })?;

        let allocated: Vec<AttachmentDesc> = colors.iter().map(AttachmentDesc::of).collect();
        check_logged(label, &allocated, &AttachmentDesc::of(&depth), &limits)?;

        let color_views = colors.iter().map(|t| t.create_view(&Default::default())).collect();
        let depth_view = depth.create_view(&Default::default());
        log::info!("render target '{label}' {width}x{height}: {} color + depth", colors.len());
        Ok(Self {
            label: label.to_string(),
            width,
            height,
            colors,
            color_views,
            depth,
            depth_view,
        })
    }

    pub fn label(&self) -> &str { &self.label }
    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }
    pub fn color_count(&self) -> usize { self.colors.len() }
    pub fn color_format(&self, index: usize) -> Option<TextureFormat> { self.colors.get(index).map(|t| t.format()) }
    pub fn depth_texture(&self) -> &wgpu::Texture { &self.depth }
    pub fn depth_view(&self) -> &TextureView { &self.depth_view }

    /// Begin a render pass whose outputs are this target's attachments. Colors are
    /// cleared to `clear`, depth to 1.0, and the viewport covers the whole target.
    pub fn bind_for_write<'e>(&self, encoder: &'e mut CommandEncoder, clear: wgpu::Color) -> wgpu::RenderPass<'e> {
        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = self
            .color_views
            .iter()
            .map(|view| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                })
            })
            .collect();
        let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&self.label),
            color_attachments: &color_attachments,
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rp.set_viewport(0.0, 0.0, self.width as f32, self.height as f32, 0.0, 1.0);
        rp
    }

    /// Color attachments as sampleable views, in attachment order.
    pub fn bind_for_read(&self) -> &[TextureView] {
        &self.color_views
    }

    /// End the pass; the next pass may target the surface again.
    pub fn unbind(rp: wgpu::RenderPass<'_>) {
        drop(rp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(format: TextureFormat, size: u32) -> AttachmentDesc {
        AttachmentDesc { format, width: size, height: size }
    }

    fn roomy_limits() -> wgpu::Limits {
        wgpu::Limits {
            max_color_attachment_bytes_per_sample: 128,
            ..wgpu::Limits::default()
        }
    }

    #[test]
    fn single_color_target_is_complete() {
        let r = check_completeness(
            "shadow",
            &[desc(TextureFormat::R32Float, 1024)],
            &desc(DEPTH_FORMAT, 1024),
            &wgpu::Limits::default(),
        );
        assert!(r.is_ok());
    }

    #[test]
    fn size_mismatch_is_incomplete() {
        let r = check_completeness(
            "mismatch",
            &[desc(TextureFormat::Rgba8Unorm, 512), desc(TextureFormat::Rgba8Unorm, 256)],
            &desc(DEPTH_FORMAT, 512),
            &wgpu::Limits::default(),
        );
        match r {
            Err(RenderError::IncompleteTarget { label, reason }) => {
                assert_eq!(label, "mismatch");
                assert!(reason.contains("color attachment 1"));
            }
            other => panic!("expected incomplete target, got {other:?}"),
        }
    }

    #[test]
    fn missing_colors_and_bad_formats_are_incomplete() {
        let limits = wgpu::Limits::default();
        assert!(check_completeness("empty", &[], &desc(DEPTH_FORMAT, 64), &limits).is_err());
        assert!(check_completeness("zero", &[desc(TextureFormat::Rgba8Unorm, 0)], &desc(DEPTH_FORMAT, 0), &limits).is_err());
        assert!(check_completeness(
            "depth-as-color",
            &[desc(DEPTH_FORMAT, 64)],
            &desc(DEPTH_FORMAT, 64),
            &limits
        )
        .is_err());
        assert!(check_completeness(
            "color-as-depth",
            &[desc(TextureFormat::Rgba8Unorm, 64)],
            &desc(TextureFormat::Rgba8Unorm, 64),
            &limits
        )
        .is_err());
    }

    #[test]
    fn oversized_target_is_incomplete() {
        let limits = wgpu::Limits::default();
        let too_big = limits.max_texture_dimension_2d + 1;
        let r = check_completeness(
            "huge",
            &[desc(TextureFormat::Rgba8Unorm, too_big)],
            &desc(DEPTH_FORMAT, too_big),
            &limits,
        );
        assert!(matches!(r, Err(RenderError::IncompleteTarget { .. })));
    }

    #[test]
    fn gbuffer_layout_needs_wide_color_limit() {
        let colors = [desc(GBuffer::FORMAT, 1024); 7];
        let depth = desc(DEPTH_FORMAT, 1024);
        assert!(check_completeness("gbuffer", &colors, &depth, &wgpu::Limits::default()).is_err());
        assert!(check_completeness("gbuffer", &colors, &depth, &roomy_limits()).is_ok());
    }

    struct ErrorLog;

    static ERRORS: std::sync::Mutex<Vec<String>> = std::sync::Mutex::new(Vec::new());
    static ERROR_LOG: ErrorLog = ErrorLog;

    impl log::Log for ErrorLog {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.level() <= log::Level::Error
        }
        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                ERRORS.lock().unwrap().push(record.args().to_string());
            }
        }
        fn flush(&self) {}
    }

    #[test]
    fn refused_request_is_logged() {
        let _ = log::set_logger(&ERROR_LOG);
        log::set_max_level(log::LevelFilter::Error);
        let limits = wgpu::Limits::default();
        let too_big = limits.max_texture_dimension_2d * 2;
        let r = check_logged(
            "oversized_shadow",
            &[desc(TextureFormat::R32Float, too_big)],
            &desc(DEPTH_FORMAT, too_big),
            &limits,
        );
        assert!(r.is_err());
        assert!(ERRORS.lock().unwrap().iter().any(|line| line.contains("oversized_shadow")));
    }

    #[test]
    fn device_refuses_over_limit_targets() {
        let Some((device, _queue)) = crate::test_gpu::device() else {
            return;
        };
        let limits = device.limits();
        let too_big = limits.max_texture_dimension_2d + 1;
        let r = RenderTarget::create(&device, "huge", too_big, too_big, &[TextureFormat::Rgba8Unorm]);
        assert!(matches!(r, Err(RenderError::IncompleteTarget { .. })));
        let too_many = vec![TextureFormat::R8Unorm; limits.max_color_attachments as usize + 1];
        let r = RenderTarget::create(&device, "wide", 16, 16, &too_many);
        assert!(matches!(r, Err(RenderError::IncompleteTarget { .. })));
    }

    #[test]
    fn device_target_binds_for_write_and_read() {
        let Some((device, queue)) = crate::test_gpu::device() else {
            return;
        };
        let target = RenderTarget::create(
            &device,
            "pair",
            32,
            32,
            &[TextureFormat::Rgba8Unorm, TextureFormat::R32Float],
        )
        .unwrap();
        assert_eq!((target.width(), target.height()), (32, 32));
        assert_eq!(target.color_count(), 2);
        assert_eq!(target.bind_for_read().len(), 2);
        assert_eq!(target.color_format(1), Some(TextureFormat::R32Float));
        assert_eq!(target.depth_texture().format(), DEPTH_FORMAT);

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("pair_test") });
        let rp = target.bind_for_write(&mut encoder, wgpu::Color::RED);
        RenderTarget::unbind(rp);
        queue.submit([encoder.finish()]);
        assert!(pollster::block_on(device.pop_error_scope()).is_none());
    }

    #[test]
    fn too_many_attachments_is_incomplete() {
        let limits = wgpu::Limits { max_color_attachments: 4, ..roomy_limits() };
        let colors = [desc(TextureFormat::R8Unorm, 16); 5];
        assert!(check_completeness("wide", &colors, &desc(DEPTH_FORMAT, 16), &limits).is_err());
    }
}
