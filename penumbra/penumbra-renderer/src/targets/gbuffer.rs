//! G-buffer: seven full-float color attachments written in one pass, plus depth.

use scene_api::DisplayMode;
use wgpu::{CommandEncoder, TextureFormat, TextureView};

use super::RenderTarget;
use crate::error::RenderError;

/// Attachment order is fixed; shader output locations follow it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GBufferAttachment {
    /// World position, w = 1 where geometry was drawn.
    #[default]
    Position,
    /// Diffuse color, a = shininess.
    Diffuse,
    /// World normal, w = specular strength.
    Normal,
    /// uv, z = mirror flag for reflective surfaces.
    TexCoord,
    EyeVector,
    LightVector,
    /// Light-space coordinate before the perspective divide.
    ShadowCoord,
}

impl GBufferAttachment {
    pub const COUNT: usize = 7;
    pub const ALL: [GBufferAttachment; 7] = [
        GBufferAttachment::Position,
        GBufferAttachment::Diffuse,
        GBufferAttachment::Normal,
        GBufferAttachment::TexCoord,
        GBufferAttachment::EyeVector,
        GBufferAttachment::LightVector,
        GBufferAttachment::ShadowCoord,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Debug display mode that shows this attachment directly.
    pub fn for_display_mode(mode: DisplayMode) -> Option<Self> {
        Some(match mode {
            DisplayMode::Position => GBufferAttachment::Position,
            DisplayMode::Diffuse => GBufferAttachment::Diffuse,
            DisplayMode::Normal => GBufferAttachment::Normal,
            DisplayMode::TexCoord => GBufferAttachment::TexCoord,
            DisplayMode::EyeVector => GBufferAttachment::EyeVector,
            DisplayMode::LightVector => GBufferAttachment::LightVector,
            DisplayMode::ShadowCoord => GBufferAttachment::ShadowCoord,
            DisplayMode::Lit | DisplayMode::Ambient | DisplayMode::ShadowDepth => return None,
        })
    }
}

pub struct GBuffer {
    target: RenderTarget,
    read_attachment: GBufferAttachment,
}

impl GBuffer {
    pub const FORMAT: TextureFormat = TextureFormat::Rgba32Float;

    pub fn create(device: &wgpu::Device, width: u32, height: u32) -> Result<Self, RenderError> {
        let formats = [Self::FORMAT; GBufferAttachment::COUNT];
        let target = RenderTarget::create(device, "gbuffer", width, height, &formats)?;
        Ok(Self { target, read_attachment: GBufferAttachment::default() })
    }

    pub fn width(&self) -> u32 { self.target.width() }
    pub fn height(&self) -> u32 { self.target.height() }
    pub fn target(&self) -> &RenderTarget { &self.target }

    /// All seven attachments become outputs of the returned pass, cleared to zero.
    pub fn bind_for_write<'e>(&self, encoder: &'e mut CommandEncoder) -> wgpu::RenderPass<'e> {
        self.target.bind_for_write(encoder, wgpu::Color::TRANSPARENT)
    }

    /// Every attachment as a sampleable view, in [`GBufferAttachment`] order.
    pub fn bind_for_read(&self) -> &[TextureView] {
        self.target.bind_for_read()
    }

    pub fn select_read_attachment(&mut self, attachment: GBufferAttachment) {
        self.read_attachment = attachment;
    }

    pub fn read_attachment(&self) -> GBufferAttachment {
        self.read_attachment
    }

    /// The attachment chosen by [`GBuffer::select_read_attachment`].
    pub fn read_view(&self) -> &TextureView {
        &self.target.bind_for_read()[self.read_attachment.index()]
    }

    pub fn view(&self, attachment: GBufferAttachment) -> &TextureView {
        &self.target.bind_for_read()[attachment.index()]
    }
}
