//! Penumbra configuration: target sizes, mesh resolutions, asset paths, swapchain.

use std::path::{Path, PathBuf};

use scene_api::CentralModel;

use crate::error::RenderError;
use crate::geometry::Shape;

/// Renderer configuration. Every field has a default, so a config file only
/// needs to list what it overrides.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Directory holding `<program>.vert.wgsl` / `<program>.frag.wgsl`.
    pub shader_dir: PathBuf,
    /// Square shadow map resolution.
    pub shadow_size: u32,
    /// Square G-buffer resolution.
    pub gbuffer_size: u32,
    /// Square resolution of each reflection target.
    pub reflection_size: u32,
    /// Run the top/bottom reflection passes before the composite.
    pub reflections: bool,
    pub teapot_resolution: u32,
    pub sphere_resolution: u32,
    /// Ground half-extent and grid subdivisions.
    pub ground_range: f32,
    pub ground_resolution: u32,
    /// Ground color / normal maps. A procedural checker is used when unset.
    pub ground_color_texture: Option<PathBuf>,
    pub ground_normal_texture: Option<PathBuf>,
    /// Mesh files for the scanned central models (PLY or OBJ).
    pub bunny_path: Option<PathBuf>,
    pub dragon_path: Option<PathBuf>,
    /// Flip face winding of loaded meshes when accumulating normals.
    pub reverse_loaded_normals: bool,
    /// Swapchain texture format for the final passes (set by the bridge from surface caps).
    #[serde(skip)]
    pub swapchain_format: wgpu::TextureFormat,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            shader_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders")),
            shadow_size: 1024,
            gbuffer_size: 1024,
            reflection_size: 512,
            reflections: true,
            teapot_resolution: 62,
            sphere_resolution: 32,
            ground_range: 50.0,
            ground_resolution: 100,
            ground_color_texture: None,
            ground_normal_texture: None,
            bunny_path: None,
            dragon_path: None,
            reverse_loaded_normals: false,
            swapchain_format: wgpu::TextureFormat::Bgra8Unorm,
        }
    }
}

impl RendererConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, RenderError> {
        let config: Self = toml::from_str(text).map_err(|e| RenderError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let text = std::fs::read_to_string(path).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Central models that can be built with this configuration. Scanned models
    /// need a mesh path.
    pub fn available_models(&self) -> Vec<CentralModel> {
        CentralModel::ALL
            .into_iter()
            .filter(|m| self.central_shape(*m).is_ok())
            .collect()
    }

    pub fn central_shape(&self, model: CentralModel) -> Result<Shape, RenderError> {
        let loaded = |path: &Option<PathBuf>| match path {
            Some(path) => Ok(Shape::Loaded { path: path.clone(), reverse: self.reverse_loaded_normals }),
            None => Err(RenderError::Config(format!("no mesh path configured for {}", model.name()))),
        };
        match model {
            CentralModel::Teapot => Ok(Shape::Teapot { n: self.teapot_resolution }),
            CentralModel::Sphere => Ok(Shape::Sphere { n: self.sphere_resolution }),
            CentralModel::Bunny => loaded(&self.bunny_path),
            CentralModel::Dragon => loaded(&self.dragon_path),
        }
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        for (name, size) in [
            ("shadow_size", self.shadow_size),
            ("gbuffer_size", self.gbuffer_size),
            ("reflection_size", self.reflection_size),
        ] {
            if size == 0 {
                return Err(RenderError::Config(format!("{name} must be > 0")));
            }
        }
        if self.teapot_resolution == 0 || self.sphere_resolution == 0 || self.ground_resolution == 0 {
            return Err(RenderError::Config("mesh resolutions must be > 0".to_string()));
        }
        if !(self.ground_range > 0.0) {
            return Err(RenderError::Config("ground_range must be positive".to_string()));
        }
        Ok(())
    }
}
