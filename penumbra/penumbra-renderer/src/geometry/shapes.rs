//! Procedural shapes: UV sphere, Bezier teapot, ground grid.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};
use scene_api::GROUND_HEIGHT;

use super::teapot_data::{CONTROL_POINTS, PATCHES};
use super::{Faces, Material, Mesh};
use crate::error::RenderError;

fn require_resolution(what: &str, n: u32) -> Result<(), RenderError> {
    if n == 0 {
        return Err(RenderError::InvalidMesh(format!("{what} resolution must be > 0")));
    }
    Ok(())
}

/// Quad for grid cell (i, j) with `stride` vertices per row, starting at `base`.
fn grid_quad(base: u32, stride: u32, i: u32, j: u32) -> [u32; 4] {
    [
        base + (i - 1) * stride + (j - 1),
        base + (i - 1) * stride + j,
        base + i * stride + j,
        base + i * stride + (j - 1),
    ]
}

/// Unit sphere with (2n+1) x (n+1) vertices. The seam column is duplicated so
/// texture coordinates run 0..1 around the equator.
pub fn sphere(n: u32) -> Result<Mesh, RenderError> {
    require_resolution("sphere", n)?;
    let count = ((2 * n + 1) * (n + 1)) as usize;
    let mut positions = Vec::with_capacity(count);
    let mut normals = Vec::with_capacity(count);
    let mut texcoords = Vec::with_capacity(count);
    let mut tangents = Vec::with_capacity(count);
    let mut quads = Vec::with_capacity((2 * n * n) as usize);

    for i in 0..=2 * n {
        let s = i as f32 * 2.0 * PI / (2 * n) as f32;
        for j in 0..=n {
            let t = j as f32 * PI / n as f32;
            let p = Vec3::new(s.cos() * t.sin(), s.sin() * t.sin(), t.cos());
            positions.push(p);
            normals.push(p);
            texcoords.push(Vec2::new(s / (2.0 * PI), t / PI));
            tangents.push(Vec3::new(-s.sin(), s.cos(), 0.0));
            if i > 0 && j > 0 {
                quads.push(grid_quad(0, n + 1, i, j));
            }
        }
    }
    Mesh::new(positions, normals, texcoords, tangents, Faces::Quads(quads), Material::SPHERE)
}

/// Flat grid on z = GROUND_HEIGHT covering [-range, range]^2 with n x n quads.
pub fn ground(range: f32, n: u32) -> Result<Mesh, RenderError> {
    require_resolution("ground", n)?;
    let count = ((n + 1) * (n + 1)) as usize;
    let mut positions = Vec::with_capacity(count);
    let mut texcoords = Vec::with_capacity(count);
    let mut quads = Vec::with_capacity((n * n) as usize);

    for i in 0..=n {
        let s = i as f32 / n as f32;
        for j in 0..=n {
            let t = j as f32 / n as f32;
            positions.push(Vec3::new(s * 2.0 * range - range, t * 2.0 * range - range, GROUND_HEIGHT));
            texcoords.push(Vec2::new(s, t));
            if i > 0 && j > 0 {
                quads.push(grid_quad(0, n + 1, i, j));
            }
        }
    }
    let normals = vec![Vec3::Z; count];
    let tangents = vec![Vec3::X; count];
    Mesh::new(positions, normals, texcoords, tangents, Faces::Quads(quads), Material::GROUND)
}

/// Position and partial derivatives of a bicubic patch at (u, v).
#[derive(Clone, Copy, Debug)]
pub struct PatchSample {
    pub position: Vec3,
    pub du: Vec3,
    pub dv: Vec3,
}

fn bernstein(t: f32) -> [f32; 4] {
    let s = 1.0 - t;
    [s * s * s, 3.0 * s * s * t, 3.0 * s * t * t, t * t * t]
}

fn bernstein_derivative(t: f32) -> [f32; 4] {
    let s = 1.0 - t;
    [-3.0 * s * s, 3.0 * s * s - 6.0 * s * t, 6.0 * s * t - 3.0 * t * t, 3.0 * t * t]
}

/// Evaluates a bicubic Bezier patch. `control[4 * a + b]` is weighted by
/// the a-th u basis and the b-th v basis.
pub fn evaluate_patch(control: &[Vec3; 16], u: f32, v: f32) -> PatchSample {
    let (bu, bv) = (bernstein(u), bernstein(v));
    let (du, dv) = (bernstein_derivative(u), bernstein_derivative(v));
    let mut sample = PatchSample { position: Vec3::ZERO, du: Vec3::ZERO, dv: Vec3::ZERO };
    for a in 0..4 {
        for b in 0..4 {
            let p = control[4 * a + b];
            sample.position += bu[a] * bv[b] * p;
            sample.du += du[a] * bv[b] * p;
            sample.dv += bu[a] * dv[b] * p;
        }
    }
    sample
}

/// Utah teapot: every patch sampled on an (n+1) x (n+1) grid.
pub fn teapot(n: u32) -> Result<Mesh, RenderError> {
    require_resolution("teapot", n)?;
    let per_patch = (n + 1) * (n + 1);
    let count = PATCHES.len() * per_patch as usize;
    let mut positions = Vec::with_capacity(count);
    let mut normals = Vec::with_capacity(count);
    let mut texcoords = Vec::with_capacity(count);
    let mut tangents = Vec::with_capacity(count);
    let mut quads = Vec::with_capacity(PATCHES.len() * (n * n) as usize);

    for (p, indices) in PATCHES.iter().enumerate() {
        let control: [Vec3; 16] = std::array::from_fn(|k| Vec3::from_array(CONTROL_POINTS[indices[k] as usize]));
        let base = p as u32 * per_patch;
        for i in 0..=n {
            let u = i as f32 / n as f32;
            for j in 0..=n {
                let v = j as f32 / n as f32;
                let sample = evaluate_patch(&control, u, v);
                let mut normal = sample.dv.cross(sample.du);
                if normal.length_squared() < 1e-12 {
                    // Collapsed patch edge (lid tip, bottom center): step inside the patch.
                    let inner = evaluate_patch(&control, u.clamp(1e-3, 1.0 - 1e-3), v.clamp(1e-3, 1.0 - 1e-3));
                    normal = inner.dv.cross(inner.du);
                }
                positions.push(sample.position);
                normals.push(normal.normalize_or_zero());
                texcoords.push(Vec2::new(u, v));
                tangents.push(sample.du.normalize_or_zero());
                if i > 0 && j > 0 {
                    quads.push(grid_quad(base, n + 1, i, j));
                }
            }
        }
    }
    Mesh::new(positions, normals, texcoords, tangents, Faces::Quads(quads), Material::TEAPOT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_counts_and_indices() {
        let n = 8;
        let mesh = sphere(n).unwrap();
        assert_eq!(mesh.vertex_count(), ((2 * n + 1) * (n + 1)) as usize);
        assert_eq!(mesh.faces().len(), (2 * n * n) as usize);
        let max = mesh.triangle_indices().into_iter().max().unwrap();
        assert!((max as usize) < mesh.vertex_count());
    }

    #[test]
    fn sphere_vertices_are_unit_with_matching_normals() {
        let mesh = sphere(6).unwrap();
        for (p, n) in mesh.positions().iter().zip(mesh.normals()) {
            assert!((p.length() - 1.0).abs() < 1e-5);
            assert!(p.abs_diff_eq(*n, 1e-6));
        }
        for (t, n) in mesh.tangents().iter().zip(mesh.normals()) {
            assert!(t.dot(*n).abs() < 1e-5);
        }
    }

    #[test]
    fn sphere_winding_faces_outward() {
        let mesh = sphere(8).unwrap();
        let idx = mesh.triangle_indices();
        let pos = mesh.positions();
        // Skip the pole rows where quads degenerate into triangles.
        let tri = idx.chunks(3).find(|t| {
            let c = (pos[t[0] as usize] + pos[t[1] as usize] + pos[t[2] as usize]) / 3.0;
            c.z.abs() < 0.5
        });
        let t = tri.unwrap();
        let (a, b, c) = (pos[t[0] as usize], pos[t[1] as usize], pos[t[2] as usize]);
        let face = (b - a).cross(c - a);
        assert!(face.dot((a + b + c) / 3.0) > 0.0);
    }

    #[test]
    fn zero_resolution_is_rejected() {
        assert!(sphere(0).is_err());
        assert!(teapot(0).is_err());
        assert!(ground(10.0, 0).is_err());
    }

    #[test]
    fn patch_corners_reproduce_control_points() {
        let control: [Vec3; 16] = std::array::from_fn(|k| Vec3::new(k as f32, (k * k) as f32, 1.0 - k as f32));
        let corner = |u, v| evaluate_patch(&control, u, v).position;
        assert!(corner(0.0, 0.0).abs_diff_eq(control[0], 1e-5));
        assert!(corner(0.0, 1.0).abs_diff_eq(control[3], 1e-5));
        assert!(corner(1.0, 0.0).abs_diff_eq(control[12], 1e-5));
        assert!(corner(1.0, 1.0).abs_diff_eq(control[15], 1e-4));
    }

    #[test]
    fn patch_derivative_matches_finite_difference() {
        let control: [Vec3; 16] = std::array::from_fn(|k| Vec3::new((k % 4) as f32, (k / 4) as f32, ((k * 7) % 5) as f32));
        let h = 1e-3;
        let s = evaluate_patch(&control, 0.4, 0.6);
        let fd_u = (evaluate_patch(&control, 0.4 + h, 0.6).position - evaluate_patch(&control, 0.4 - h, 0.6).position) / (2.0 * h);
        let fd_v = (evaluate_patch(&control, 0.4, 0.6 + h).position - evaluate_patch(&control, 0.4, 0.6 - h).position) / (2.0 * h);
        assert!(s.du.abs_diff_eq(fd_u, 1e-2));
        assert!(s.dv.abs_diff_eq(fd_v, 1e-2));
    }

    #[test]
    fn teapot_has_32_patches() {
        let n = 4;
        let mesh = teapot(n).unwrap();
        assert_eq!(mesh.vertex_count(), 32 * ((n + 1) * (n + 1)) as usize);
        assert_eq!(mesh.faces().len(), 32 * (n * n) as usize);
        assert!(mesh.normals().iter().all(|n| n.is_finite()));
        // Rim of the body: first control point sits at (1.4, 0, 2.4).
        assert!(mesh.positions()[0].abs_diff_eq(Vec3::new(1.4, 0.0, 2.4), 1e-5));
    }

    #[test]
    fn ground_is_flat_at_ground_height() {
        let mesh = ground(50.0, 10).unwrap();
        assert_eq!(mesh.vertex_count(), 121);
        assert!(mesh.positions().iter().all(|p| p.z == GROUND_HEIGHT));
        let b = mesh.bounds();
        assert_eq!(b.min.x, -50.0);
        assert_eq!(b.max.y, 50.0);
        assert_eq!(mesh.material(), Material::GROUND);
    }
}
