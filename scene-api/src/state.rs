//! Scene state: camera, light, visibility toggles, display mode and animation clock.
//!
//! The state is a plain value mutated only through [`SceneState::apply`] between frames.
//! Renderers read it and derive every per-frame matrix from it; no GPU handle lives here.

use glam::{Mat4, Vec3, Vec4};

use crate::Control;

/// Far clip plane shared by the camera and light projections.
pub const FAR_PLANE: f32 = 10000.0;
/// Height of the ground plane (and the reflection mirror plane) in world z.
pub const GROUND_HEIGHT: f32 = -3.0;

/// Mesh shown at the center of the scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CentralModel {
    #[default]
    Teapot,
    Bunny,
    Dragon,
    Sphere,
}

impl CentralModel {
    pub const ALL: [CentralModel; 4] = [
        CentralModel::Teapot,
        CentralModel::Bunny,
        CentralModel::Dragon,
        CentralModel::Sphere,
    ];

    pub fn next(self) -> Self {
        match self {
            CentralModel::Teapot => CentralModel::Bunny,
            CentralModel::Bunny => CentralModel::Dragon,
            CentralModel::Dragon => CentralModel::Sphere,
            CentralModel::Sphere => CentralModel::Teapot,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CentralModel::Teapot => "teapot",
            CentralModel::Bunny => "bunny",
            CentralModel::Dragon => "dragon",
            CentralModel::Sphere => "sphere",
        }
    }
}

/// What the final pass puts on screen. Selected with the number keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DisplayMode {
    /// Full lighting composite (ambient + shadowed Phong + optional mirror term).
    #[default]
    Lit,
    /// Ambient term only.
    Ambient,
    Position,
    Diffuse,
    Normal,
    TexCoord,
    EyeVector,
    LightVector,
    ShadowCoord,
    /// Raw light-space depth from the shadow pass.
    ShadowDepth,
}

impl DisplayMode {
    pub fn from_index(index: u8) -> Option<Self> {
        Some(match index {
            0 => DisplayMode::Lit,
            1 => DisplayMode::Ambient,
            2 => DisplayMode::Position,
            3 => DisplayMode::Diffuse,
            4 => DisplayMode::Normal,
            5 => DisplayMode::TexCoord,
            6 => DisplayMode::EyeVector,
            7 => DisplayMode::LightVector,
            8 => DisplayMode::ShadowCoord,
            9 => DisplayMode::ShadowDepth,
            _ => return None,
        })
    }

    pub fn index(self) -> u8 {
        match self {
            DisplayMode::Lit => 0,
            DisplayMode::Ambient => 1,
            DisplayMode::Position => 2,
            DisplayMode::Diffuse => 3,
            DisplayMode::Normal => 4,
            DisplayMode::TexCoord => 5,
            DisplayMode::EyeVector => 6,
            DisplayMode::LightVector => 7,
            DisplayMode::ShadowCoord => 8,
            DisplayMode::ShadowDepth => 9,
        }
    }

    /// True for modes resolved by the lighting composite rather than a debug blit.
    pub fn is_composite(self) -> bool {
        matches!(self, DisplayMode::Lit | DisplayMode::Ambient)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneState {
    pub mode: DisplayMode,
    /// Ring density of the environment spheres.
    pub sphere_count: u32,
    pub draw_spheres: bool,
    pub draw_ground: bool,
    pub draw_central: bool,
    pub central_model: CentralModel,
    /// Near clip plane.
    pub front: f32,
    /// Camera orbit, degrees.
    pub eye_spin: f32,
    pub eye_tilt: f32,
    pub zoom: f32,
    pub translate_x: f32,
    pub translate_y: f32,
    /// Light orbit, degrees.
    pub light_spin: f32,
    pub light_tilt: f32,
    pub light_dist: f32,
    /// Viewport in physical pixels.
    pub width: u32,
    pub height: u32,
    /// Rotation of the sphere ring around +Z, degrees.
    pub anim_degrees: f32,
}

impl Default for SceneState {
    fn default() -> Self {
        Self {
            mode: DisplayMode::Lit,
            sphere_count: 16,
            draw_spheres: true,
            draw_ground: true,
            draw_central: true,
            central_model: CentralModel::Teapot,
            front: 0.1,
            eye_spin: -150.0,
            eye_tilt: -70.0,
            zoom: 90.0,
            translate_x: 0.0,
            translate_y: 0.0,
            light_spin: -50.0,
            light_tilt: -50.0,
            light_dist: 90.0,
            width: 750,
            height: 750,
            anim_degrees: 0.0,
        }
    }
}

impl SceneState {
    pub fn apply(&mut self, control: Control) {
        match control {
            Control::SelectMode(key) => {
                if let Some(mode) = DisplayMode::from_index(key) {
                    self.mode = mode;
                }
            }
            Control::Orbit { dx, dy } => {
                self.eye_spin += dx / 2.0;
                self.eye_tilt += dy / 2.0;
            }
            Control::OrbitLight { dx, dy } => {
                self.light_spin += dx / 3.0;
                self.light_tilt -= dy / 3.0;
            }
            Control::Zoom { dy } => self.zoom += dy / 10.0,
            Control::LightDistance { dy } => {
                self.light_dist = self.light_dist.powf(1.0 - dy / 200.0);
            }
            Control::Pan { dx, dy } => {
                self.translate_x += dx / 20.0;
                self.translate_y -= dy / 20.0;
            }
            Control::Wheel { steps, light } => {
                let exponent = 1.02f32.powf(-steps);
                if light {
                    self.light_dist = self.light_dist.powf(exponent);
                } else {
                    self.zoom = self.zoom.powf(exponent);
                }
            }
            Control::ToggleGround => self.draw_ground = !self.draw_ground,
            Control::ToggleSpheres => self.draw_spheres = !self.draw_spheres,
            Control::ToggleCentral => self.draw_central = !self.draw_central,
            Control::SelectModel(model) => self.central_model = model,
            Control::NextModel => self.central_model = self.central_model.next(),
            Control::Resize { width, height } => {
                if width > 0 && height > 0 {
                    self.width = width;
                    self.height = height;
                }
            }
            Control::Tick { elapsed_ms } => {
                self.anim_degrees = 360.0 * elapsed_ms as f32 / 120_000.0;
            }
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }

    /// World-space light position on its orbit sphere.
    pub fn light_position(&self) -> Vec3 {
        let spin = self.light_spin.to_radians();
        let tilt = self.light_tilt.to_radians();
        self.light_dist * Vec3::new(spin.cos() * tilt.sin(), spin.sin() * tilt.sin(), tilt.cos())
    }

    /// World to eye: translate(tx, ty, -zoom) * rotX(tilt) * rotZ(spin).
    pub fn eye_view(&self) -> Mat4 {
        Mat4::from_translation(Vec3::new(self.translate_x, self.translate_y, -self.zoom))
            * Mat4::from_rotation_x(self.eye_tilt.to_radians())
            * Mat4::from_rotation_z(self.eye_spin.to_radians())
    }

    /// Eye position in world space.
    pub fn eye_position(&self) -> Vec3 {
        self.eye_view().inverse().transform_point3(Vec3::ZERO)
    }

    /// Light view: looking from the light at the origin with +Z up, or +Y up when
    /// the light sits on the Z axis.
    pub fn light_view(&self) -> Mat4 {
        let eye = self.light_position();
        let up = if eye.normalize_or_zero().cross(Vec3::Z).length_squared() < 1e-8 {
            Vec3::Y
        } else {
            Vec3::Z
        };
        Mat4::look_at_rh(eye, Vec3::ZERO, up)
    }

    /// Symmetric frustum shared by the camera and the light: half-height 0.6 * front.
    pub fn projection(&self) -> Mat4 {
        let sy = 0.6 * self.front;
        let sx = sy * self.aspect();
        frustum(-sx, sx, -sy, sy, self.front, FAR_PLANE)
    }
}

/// Off-axis perspective frustum, right-handed, clip depth in [0, 1].
pub fn frustum(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let w = right - left;
    let h = top - bottom;
    let d = near - far;
    Mat4::from_cols(
        Vec4::new(2.0 * near / w, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 2.0 * near / h, 0.0, 0.0),
        Vec4::new((right + left) / w, (top + bottom) / h, far / d, -1.0),
        Vec4::new(0.0, 0.0, near * far / d, 0.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn defaults_match_initial_scene() {
        let s = SceneState::default();
        assert_eq!(s.mode, DisplayMode::Lit);
        assert_eq!((s.width, s.height), (750, 750));
        assert_eq!(s.eye_spin, -150.0);
        assert_eq!(s.light_dist, 90.0);
        assert!(s.draw_spheres && s.draw_ground && s.draw_central);
    }

    #[test]
    fn drag_controls() {
        let mut s = SceneState::default();
        s.apply(Control::Orbit { dx: 10.0, dy: -4.0 });
        assert!(close(s.eye_spin, -145.0));
        assert!(close(s.eye_tilt, -72.0));
        s.apply(Control::OrbitLight { dx: 3.0, dy: 3.0 });
        assert!(close(s.light_spin, -49.0));
        assert!(close(s.light_tilt, -51.0));
        s.apply(Control::Pan { dx: 20.0, dy: 40.0 });
        assert!(close(s.translate_x, 1.0));
        assert!(close(s.translate_y, -2.0));
        s.apply(Control::Zoom { dy: 50.0 });
        assert!(close(s.zoom, 95.0));
    }

    #[test]
    fn wheel_scales_zoom_geometrically() {
        let mut s = SceneState::default();
        s.apply(Control::Wheel { steps: 1.0, light: false });
        assert!(close(s.zoom, 90.0f32.powf(1.0 / 1.02)));
        s.apply(Control::Wheel { steps: -1.0, light: false });
        assert!(close(s.zoom, 90.0));
        s.apply(Control::Wheel { steps: -1.0, light: true });
        assert!(close(s.light_dist, 90.0f32.powf(1.02)));
    }

    #[test]
    fn mode_keys_and_resize() {
        let mut s = SceneState::default();
        s.apply(Control::SelectMode(4));
        assert_eq!(s.mode, DisplayMode::Normal);
        s.apply(Control::SelectMode(12));
        assert_eq!(s.mode, DisplayMode::Normal);
        s.apply(Control::Resize { width: 0, height: 300 });
        assert_eq!((s.width, s.height), (750, 750));
        s.apply(Control::Resize { width: 1200, height: 600 });
        assert!(close(s.aspect(), 2.0));
        for i in 0..10u8 {
            assert_eq!(DisplayMode::from_index(i).map(DisplayMode::index), Some(i));
        }
    }

    #[test]
    fn tick_drives_animation_clock() {
        let mut s = SceneState::default();
        s.apply(Control::Tick { elapsed_ms: 60_000 });
        assert!(close(s.anim_degrees, 180.0));
    }

    #[test]
    fn model_cycle_visits_every_model() {
        let mut m = CentralModel::Teapot;
        for expected in CentralModel::ALL.iter().skip(1) {
            m = m.next();
            assert_eq!(m, *expected);
        }
        assert_eq!(m.next(), CentralModel::Teapot);
    }

    #[test]
    fn light_orbit_radius_is_light_dist() {
        let s = SceneState::default();
        assert!(close(s.light_position().length(), s.light_dist));
    }

    #[test]
    fn light_view_is_finite_over_the_poles() {
        let mut s = SceneState::default();
        for tilt in [0.0, 180.0, -180.0, 360.0, 0.001, -50.0] {
            s.light_tilt = tilt;
            let view = s.light_view();
            assert!(view.is_finite(), "tilt {tilt}");
            let origin = view.transform_point3(Vec3::ZERO);
            assert!(close(origin.x, 0.0) && close(origin.y, 0.0), "tilt {tilt}");
            assert!((origin.z + s.light_dist).abs() < 1e-2, "tilt {tilt}");
        }
    }

    #[test]
    fn symmetric_frustum_matches_perspective() {
        let near = 0.1;
        let sy = 0.6 * near;
        let f = frustum(-sy * 1.5, sy * 1.5, -sy, sy, near, FAR_PLANE);
        let p = Mat4::perspective_rh(2.0 * (sy / near).atan(), 1.5, near, FAR_PLANE);
        assert!(f.abs_diff_eq(p, 1e-4));
        let on_near = f * Vec4::new(0.0, 0.0, -near, 1.0);
        assert!(close(on_near.z / on_near.w, 0.0));
    }

    #[test]
    fn eye_sits_zoom_units_from_origin_without_pan() {
        let s = SceneState::default();
        assert!(close(s.eye_position().length(), s.zoom));
    }
}
