//! What gets drawn each frame: central model, sphere ring, ground and the sun marker.

use std::f32::consts::PI;

use glam::{Mat4, Vec3};
use scene_api::{CentralModel, SceneState};

use crate::frame::hsv_to_rgb;
use crate::geometry::{Bounds, Material};

/// Radius of the sphere ring around the origin.
const RING_RADIUS: f32 = 30.0;
const SUN_SCALE: f32 = 1.5;
const SUN_EMISSION: Vec3 = Vec3::new(1.0, 0.9, 0.5);
/// Repeat count of the ground textures across the plane.
const GROUND_TEXTURE_REPEAT: f32 = 8.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    Central,
    Sphere,
    Ground,
    Sun,
}

impl ObjectKind {
    pub fn casts_shadow(self) -> bool {
        !matches!(self, ObjectKind::Sun)
    }

    pub fn in_gbuffer(self) -> bool {
        !matches!(self, ObjectKind::Sun)
    }

    pub fn in_top_reflection(self) -> bool {
        matches!(self, ObjectKind::Sun | ObjectKind::Sphere | ObjectKind::Ground)
    }

    pub fn in_bottom_reflection(self) -> bool {
        matches!(self, ObjectKind::Sun | ObjectKind::Sphere)
    }
}

/// One draw: mesh handle plus everything the per-draw uniform needs.
#[derive(Clone, Debug)]
pub struct DrawItem<M> {
    pub kind: ObjectKind,
    pub mesh: M,
    pub model: Mat4,
    pub material: Material,
    /// Sample color and normal maps.
    pub textured: bool,
    /// Draw without back-face culling.
    pub two_sided: bool,
    /// Receives the reflection images in the composite.
    pub mirror: bool,
    pub emission: Vec3,
}

impl<M> DrawItem<M> {
    fn new(kind: ObjectKind, mesh: M, model: Mat4, material: Material) -> Self {
        Self {
            kind,
            mesh,
            model,
            material,
            textured: false,
            two_sided: false,
            mirror: false,
            emission: Vec3::ZERO,
        }
    }

    /// Per-draw flags in shader order: color map, normal map, mirror, texture repeat.
    pub fn flags(&self) -> [f32; 4] {
        let on = |b: bool| if b { 1.0 } else { 0.0 };
        let repeat = if self.textured { GROUND_TEXTURE_REPEAT } else { 1.0 };
        [on(self.textured), on(self.textured), on(self.mirror), repeat]
    }
}

/// Meshes the draw list refers to. Generic so the list can be built without a GPU.
#[derive(Clone, Debug)]
pub struct SceneMeshes<M> {
    pub sphere: M,
    pub ground: M,
    pub central: M,
    pub central_model: CentralModel,
    pub central_bounds: Bounds,
    pub central_material: Material,
}

/// Placement of the central model so it sits at the origin at a comparable size.
pub fn central_transform(model: CentralModel, bounds: &Bounds) -> Mat4 {
    match model {
        CentralModel::Teapot => Mat4::from_scale(Vec3::splat(2.0)) * Mat4::from_translation(-bounds.center),
        CentralModel::Bunny | CentralModel::Dragon => {
            Mat4::from_rotation_z(180f32.to_radians())
                * Mat4::from_rotation_x(90f32.to_radians())
                * Mat4::from_scale(Vec3::splat(3.0))
                * bounds.normalizing_transform()
        }
        CentralModel::Sphere => Mat4::IDENTITY,
    }
}

/// Transforms and colors of the environment spheres. Instances whose scale is zero
/// are left out.
pub fn sphere_ring(count: u32, anim_degrees: f32) -> Vec<(Mat4, Vec3)> {
    let n = count as usize;
    let mut out = Vec::new();
    for i in (0..2 * n).step_by(2) {
        for j in (0..=n / 2).step_by(2) {
            let u = i as f32 / (2 * n) as f32;
            let v = j as f32 / n as f32;
            let s = 3.0 * (PI * v).sin();
            if s <= f32::EPSILON {
                continue;
            }
            let color = hsv_to_rgb(u, 1.0 - 2.0 * (v - 0.5).abs(), 1.0);
            let model = Mat4::from_rotation_z(anim_degrees.to_radians())
                * Mat4::from_rotation_z((360.0 * u).to_radians())
                * Mat4::from_rotation_y((180.0 * v).to_radians())
                * Mat4::from_translation(Vec3::new(0.0, 0.0, RING_RADIUS))
                * Mat4::from_scale(Vec3::splat(s));
            out.push((model, color));
        }
    }
    out
}

/// Per-frame draw list. Hidden objects are absent; the sun marker is always present
/// and is filtered out by the passes that do not draw it.
pub fn build_draw_list<M: Clone>(state: &SceneState, meshes: &SceneMeshes<M>) -> Vec<DrawItem<M>> {
    let mut items = Vec::new();

    if state.draw_central {
        let mut item = DrawItem::new(
            ObjectKind::Central,
            meshes.central.clone(),
            central_transform(meshes.central_model, &meshes.central_bounds),
            meshes.central_material,
        );
        item.two_sided = true;
        items.push(item);
    }

    if state.draw_spheres {
        for (model, color) in sphere_ring(state.sphere_count, state.anim_degrees) {
            let material = Material::SPHERE.with_diffuse(color);
            items.push(DrawItem::new(ObjectKind::Sphere, meshes.sphere.clone(), model, material));
        }
    }

    if state.draw_ground {
        let mut item = DrawItem::new(ObjectKind::Ground, meshes.ground.clone(), Mat4::IDENTITY, Material::GROUND);
        item.textured = true;
        item.two_sided = true;
        item.mirror = true;
        items.push(item);
    }

    let mut sun = DrawItem::new(
        ObjectKind::Sun,
        meshes.sphere.clone(),
        Mat4::from_translation(state.light_position()) * Mat4::from_scale(Vec3::splat(SUN_SCALE)),
        Material::SPHERE.with_diffuse(Vec3::ZERO),
    );
    sun.emission = SUN_EMISSION;
    sun.two_sided = true;
    items.push(sun);

    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meshes(model: CentralModel) -> SceneMeshes<&'static str> {
        let bounds = Bounds::from_points(&[Vec3::new(-1.0, 0.0, 0.0), Vec3::new(3.0, 2.0, 1.0)]).unwrap();
        SceneMeshes {
            sphere: "sphere",
            ground: "ground",
            central: "central",
            central_model: model,
            central_bounds: bounds,
            central_material: Material::TEAPOT,
        }
    }

    fn count(items: &[DrawItem<&str>], kind: ObjectKind) -> usize {
        items.iter().filter(|i| i.kind == kind).count()
    }

    #[test]
    fn default_ring_has_64_spheres() {
        assert_eq!(sphere_ring(16, 0.0).len(), 64);
        let items = build_draw_list(&SceneState::default(), &meshes(CentralModel::Teapot));
        assert_eq!(count(&items, ObjectKind::Sphere), 64);
        assert_eq!(count(&items, ObjectKind::Central), 1);
        assert_eq!(count(&items, ObjectKind::Ground), 1);
        assert_eq!(count(&items, ObjectKind::Sun), 1);
    }

    #[test]
    fn ring_spheres_sit_on_radius_30() {
        for (model, color) in sphere_ring(16, 37.0) {
            let center = model.transform_point3(Vec3::ZERO);
            assert!((center.length() - RING_RADIUS).abs() < 1e-3);
            assert!(color.max_element() <= 1.0 + 1e-6 && color.min_element() >= -1e-6);
        }
    }

    #[test]
    fn animation_rotates_ring_about_z() {
        let a = sphere_ring(16, 0.0);
        let b = sphere_ring(16, 90.0);
        let pa = a[5].0.transform_point3(Vec3::ZERO);
        let pb = b[5].0.transform_point3(Vec3::ZERO);
        let rotated = Mat4::from_rotation_z(90f32.to_radians()).transform_point3(pa);
        assert!(rotated.abs_diff_eq(pb, 1e-3));
        assert!((pa.z - pb.z).abs() < 1e-4);
    }

    #[test]
    fn hidden_objects_are_absent() {
        let mut state = SceneState::default();
        state.draw_spheres = false;
        state.draw_ground = false;
        state.draw_central = false;
        let items = build_draw_list(&state, &meshes(CentralModel::Teapot));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, ObjectKind::Sun);
    }

    #[test]
    fn ground_is_textured_mirror() {
        let items = build_draw_list(&SceneState::default(), &meshes(CentralModel::Teapot));
        let ground = items.iter().find(|i| i.kind == ObjectKind::Ground).unwrap();
        assert!(ground.textured && ground.mirror && ground.two_sided);
        assert_eq!(ground.flags(), [1.0, 1.0, 1.0, GROUND_TEXTURE_REPEAT]);
        let sphere = items.iter().find(|i| i.kind == ObjectKind::Sphere).unwrap();
        assert_eq!(sphere.flags(), [0.0, 0.0, 0.0, 1.0]);
        assert!(!sphere.two_sided);
    }

    #[test]
    fn sun_follows_light() {
        let state = SceneState::default();
        let items = build_draw_list(&state, &meshes(CentralModel::Teapot));
        let sun = items.iter().find(|i| i.kind == ObjectKind::Sun).unwrap();
        let center = sun.model.transform_point3(Vec3::ZERO);
        assert!(center.abs_diff_eq(state.light_position(), 1e-3));
        assert!(!ObjectKind::Sun.casts_shadow() && !ObjectKind::Sun.in_gbuffer());
    }

    #[test]
    fn pass_membership() {
        assert!(ObjectKind::Ground.in_top_reflection());
        assert!(!ObjectKind::Ground.in_bottom_reflection());
        assert!(!ObjectKind::Central.in_top_reflection());
        assert!(ObjectKind::Sphere.in_bottom_reflection());
    }

    #[test]
    fn central_placement() {
        let m = meshes(CentralModel::Teapot);
        let teapot = central_transform(CentralModel::Teapot, &m.central_bounds);
        assert!(teapot.transform_point3(m.central_bounds.center).abs_diff_eq(Vec3::ZERO, 1e-6));
        assert!(teapot.transform_point3(Vec3::new(2.0, 1.0, 0.5)).abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-5));

        let bunny = central_transform(CentralModel::Bunny, &m.central_bounds);
        let corner = bunny.transform_point3(m.central_bounds.max);
        assert!(bunny.transform_point3(m.central_bounds.center).abs_diff_eq(Vec3::ZERO, 1e-5));
        // radius 2 is normalized to 3
        assert!((corner.abs().max_element() - 3.0).abs() < 1e-4);

        assert_eq!(central_transform(CentralModel::Sphere, &m.central_bounds), Mat4::IDENTITY);
    }
}
