//! Per-frame camera and light matrices derived from the scene state, and the
//! uniform blocks the passes upload.

use glam::{Mat4, Vec3, Vec4};
use scene_api::{DisplayMode, SceneState, GROUND_HEIGHT};

use crate::geometry::Material;

pub const LIGHT_COLOR: Vec3 = Vec3::splat(0.8);
pub const AMBIENT: Vec3 = Vec3::new(0.3, 0.3, 0.2);
/// Depth slack for the shadow comparison.
pub const SHADOW_EPSILON: f32 = 0.0005;

/// Clip space -> shadow texture space: x,y in [-1,1] to u,v in [0,1] with v flipped,
/// z already in [0,1].
pub const SHADOW_BIAS: Mat4 = Mat4::from_cols_array(&[
    0.5, 0.0, 0.0, 0.0, //
    0.0, -0.5, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.5, 0.5, 0.0, 1.0,
]);

/// Reflection across the horizontal plane z = `height`.
pub fn mirror_z(height: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(0.0, 0.0, height))
        * Mat4::from_scale(Vec3::new(1.0, 1.0, -1.0))
        * Mat4::from_translation(Vec3::new(0.0, 0.0, -height))
}

/// Inverse-transpose of the model matrix; identity for a singular model.
pub fn normal_matrix(model: Mat4) -> Mat4 {
    if model.determinant().abs() < 1e-12 {
        Mat4::IDENTITY
    } else {
        model.inverse().transpose()
    }
}

/// `h`, `s`, `v` in [0,1]; hue wraps.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Vec3 {
    let h6 = h.rem_euclid(1.0) * 6.0;
    let sector = h6.floor();
    let f = h6 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match sector as u32 {
        0 => Vec3::new(v, t, p),
        1 => Vec3::new(q, v, p),
        2 => Vec3::new(p, v, t),
        3 => Vec3::new(p, q, v),
        4 => Vec3::new(t, p, v),
        _ => Vec3::new(v, p, q),
    }
}

/// Which half-space a reflection image keeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReflectionSide {
    Top,
    Bottom,
}

impl ReflectionSide {
    fn sign(self) -> f32 {
        match self {
            ReflectionSide::Top => 1.0,
            ReflectionSide::Bottom => -1.0,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniform {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub view_inverse: [[f32; 4]; 4],
    pub shadow_matrix: [[f32; 4]; 4],
    pub light_pos: [f32; 4],
    pub light_color: [f32; 4],
    pub ambient: [f32; 4],
    /// x: kept side for reflections (0 = none), y: mirror plane height, z: shadow epsilon.
    pub params: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShadowUniform {
    pub light_view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub diffuse: [f32; 4],
    /// w: shininess
    pub specular: [f32; 4],
    /// x: color map, y: normal map, z: mirror surface, w: texture repeat
    pub flags: [f32; 4],
    pub emission: [f32; 4],
}

impl ObjectUniform {
    pub fn new(model: Mat4, material: &Material, flags: [f32; 4], emission: Vec3) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: normal_matrix(model).to_cols_array_2d(),
            diffuse: material.diffuse.extend(1.0).to_array(),
            specular: material.specular.extend(material.shininess).to_array(),
            flags,
            emission: emission.extend(0.0).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingUniform {
    pub light_color: [f32; 4],
    pub ambient: [f32; 4],
    pub clear_color: [f32; 4],
    /// x: ambient only, y: reflections available, z: eye above mirror plane, w: shadow epsilon
    pub params: [f32; 4],
}

/// Everything the passes need from the scene for one frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameContext {
    pub view: Mat4,
    pub proj: Mat4,
    pub light_view: Mat4,
    pub eye_position: Vec3,
    pub light_position: Vec3,
    pub mode: DisplayMode,
    pub width: u32,
    pub height: u32,
}

impl FrameContext {
    pub fn new(state: &SceneState) -> Self {
        Self {
            view: state.eye_view(),
            proj: state.projection(),
            light_view: state.light_view(),
            eye_position: state.eye_position(),
            light_position: state.light_position(),
            mode: state.mode,
            width: state.width,
            height: state.height,
        }
    }

    pub fn light_view_proj(&self) -> Mat4 {
        self.proj * self.light_view
    }

    /// World -> shadow texture coordinates (before the perspective divide).
    pub fn shadow_matrix(&self) -> Mat4 {
        SHADOW_BIAS * self.light_view_proj()
    }

    pub fn eye_above_ground(&self) -> bool {
        self.eye_position.z > GROUND_HEIGHT
    }

    /// Camera view composed with the reflection across the ground plane.
    pub fn mirrored_view(&self) -> Mat4 {
        self.view * mirror_z(GROUND_HEIGHT)
    }

    fn frame_uniform(&self, view: Mat4, params: [f32; 4]) -> FrameUniform {
        FrameUniform {
            view: view.to_cols_array_2d(),
            proj: self.proj.to_cols_array_2d(),
            view_inverse: view.inverse().to_cols_array_2d(),
            shadow_matrix: self.shadow_matrix().to_cols_array_2d(),
            light_pos: self.light_position.extend(1.0).to_array(),
            light_color: LIGHT_COLOR.extend(1.0).to_array(),
            ambient: AMBIENT.extend(1.0).to_array(),
            params,
        }
    }

    pub fn camera_uniform(&self) -> FrameUniform {
        self.frame_uniform(self.view, [0.0, GROUND_HEIGHT, SHADOW_EPSILON, 0.0])
    }

    pub fn reflection_uniform(&self, side: ReflectionSide) -> FrameUniform {
        self.frame_uniform(self.mirrored_view(), [side.sign(), GROUND_HEIGHT, SHADOW_EPSILON, 0.0])
    }

    pub fn shadow_uniform(&self) -> ShadowUniform {
        ShadowUniform { light_view_proj: self.light_view_proj().to_cols_array_2d() }
    }

    pub fn lighting_uniform(&self, reflections: bool, clear: f32) -> LightingUniform {
        let ambient_only = if self.mode == DisplayMode::Ambient { 1.0 } else { 0.0 };
        LightingUniform {
            light_color: LIGHT_COLOR.extend(1.0).to_array(),
            ambient: AMBIENT.extend(1.0).to_array(),
            clear_color: Vec4::new(clear, clear, clear, 1.0).to_array(),
            params: [
                ambient_only,
                if reflections { 1.0 } else { 0.0 },
                if self.eye_above_ground() { 1.0 } else { 0.0 },
                SHADOW_EPSILON,
            ],
        }
    }
}
