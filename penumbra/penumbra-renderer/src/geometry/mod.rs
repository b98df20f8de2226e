//! Mesh provider: procedural shapes, loaded triangle meshes, bounds and GPU upload.

mod gpu;
mod loader;
mod shapes;
mod teapot_data;

use std::path::PathBuf;

use glam::{Mat4, Vec2, Vec3};

use crate::error::RenderError;

pub use gpu::{GpuMesh, Vertex};
pub use loader::{load_obj, load_ply, read_ply_into, MeshBuilder, TriangleSink};
pub use shapes::{evaluate_patch, ground, sphere, teapot, PatchSample};

/// Surface response used by every pass that shades.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
}

impl Material {
    pub const SPHERE: Material = Material::phong(Vec3::new(0.5, 0.5, 1.0));
    pub const TEAPOT: Material = Material::phong(Vec3::new(0.5, 0.5, 0.1));
    pub const GROUND: Material = Material::phong(Vec3::new(0.3, 0.2, 0.1));
    pub const LOADED: Material = Material::phong(Vec3::new(0.8, 0.8, 0.5));

    const fn phong(diffuse: Vec3) -> Self {
        Self { diffuse, specular: Vec3::ONE, shininess: 120.0 }
    }

    pub fn with_diffuse(self, diffuse: Vec3) -> Self {
        Self { diffuse, ..self }
    }
}

/// Connectivity of a mesh: quads or triangles, never both.
#[derive(Clone, Debug, PartialEq)]
pub enum Faces {
    Quads(Vec<[u32; 4]>),
    Triangles(Vec<[u32; 3]>),
}

impl Faces {
    pub fn len(&self) -> usize {
        match self {
            Faces::Quads(q) => q.len(),
            Faces::Triangles(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn max_index(&self) -> Option<u32> {
        match self {
            Faces::Quads(q) => q.iter().flatten().copied().max(),
            Faces::Triangles(t) => t.iter().flatten().copied().max(),
        }
    }
}

/// Axis-aligned extent of a point set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
    /// Midpoint of min and max.
    pub center: Vec3,
    /// Largest half-extent over the three axes.
    pub radius: f32,
}

impl Bounds {
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let first = *points.first()?;
        let (min, max) = points
            .iter()
            .fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
        let center = (min + max) / 2.0;
        let radius = ((max - min) / 2.0).max_element();
        Some(Self { min, max, center, radius })
    }

    /// Maps the mesh into a unit box around the origin: scale(1/radius) * translate(-center).
    pub fn normalizing_transform(&self) -> Mat4 {
        let s = if self.radius > 0.0 { 1.0 / self.radius } else { 1.0 };
        Mat4::from_scale(Vec3::splat(s)) * Mat4::from_translation(-self.center)
    }
}

/// CPU-side mesh. Attribute arrays are parallel and indices are in range;
/// both are checked once in [`Mesh::new`] and the mesh is immutable afterwards.
#[derive(Clone, Debug)]
pub struct Mesh {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    texcoords: Vec<Vec2>,
    tangents: Vec<Vec3>,
    faces: Faces,
    material: Material,
    bounds: Bounds,
}

impl Mesh {
    pub fn new(
        positions: Vec<Vec3>,
        normals: Vec<Vec3>,
        texcoords: Vec<Vec2>,
        tangents: Vec<Vec3>,
        faces: Faces,
        material: Material,
    ) -> Result<Self, RenderError> {
        let n = positions.len();
        if normals.len() != n || texcoords.len() != n || tangents.len() != n {
            return Err(RenderError::InvalidMesh(format!(
                "attribute lengths differ: positions {n}, normals {}, texcoords {}, tangents {}",
                normals.len(),
                texcoords.len(),
                tangents.len()
            )));
        }
        if faces.is_empty() {
            return Err(RenderError::InvalidMesh("mesh has no faces".to_string()));
        }
        if let Some(max) = faces.max_index() {
            if max as usize >= n {
                return Err(RenderError::InvalidMesh(format!(
                    "index {max} out of range for {n} vertices"
                )));
            }
        }
        let bounds = Bounds::from_points(&positions)
            .ok_or_else(|| RenderError::InvalidMesh("mesh has no vertices".to_string()))?;
        Ok(Self { positions, normals, texcoords, tangents, faces, material, bounds })
    }

    pub fn positions(&self) -> &[Vec3] { &self.positions }
    pub fn normals(&self) -> &[Vec3] { &self.normals }
    pub fn texcoords(&self) -> &[Vec2] { &self.texcoords }
    pub fn tangents(&self) -> &[Vec3] { &self.tangents }
    pub fn faces(&self) -> &Faces { &self.faces }
    pub fn material(&self) -> Material { self.material }
    pub fn bounds(&self) -> &Bounds { &self.bounds }
    pub fn vertex_count(&self) -> usize { self.positions.len() }

    /// Triangle list indices; each quad (a, b, c, d) becomes (a, b, c) and (a, c, d).
    pub fn triangle_indices(&self) -> Vec<u32> {
        match &self.faces {
            Faces::Triangles(tris) => tris.iter().flatten().copied().collect(),
            Faces::Quads(quads) => quads
                .iter()
                .flat_map(|&[a, b, c, d]| [a, b, c, a, c, d])
                .collect(),
        }
    }

    /// Interleaved vertex stream in the layout every pipeline consumes.
    pub fn vertices(&self) -> Vec<Vertex> {
        (0..self.positions.len())
            .map(|i| Vertex {
                position: self.positions[i].to_array(),
                normal: self.normals[i].to_array(),
                texcoord: self.texcoords[i].to_array(),
                tangent: self.tangents[i].to_array(),
            })
            .collect()
    }
}

/// Recipe for one of the meshes the scene draws.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Sphere { n: u32 },
    Teapot { n: u32 },
    Ground { range: f32, n: u32 },
    /// External triangulated surface (`.ply` or `.obj`).
    Loaded { path: PathBuf, reverse: bool },
}

impl Shape {
    pub fn build(&self) -> Result<Mesh, RenderError> {
        match self {
            Shape::Sphere { n } => sphere(*n),
            Shape::Teapot { n } => teapot(*n),
            Shape::Ground { range, n } => ground(*range, *n),
            Shape::Loaded { path, reverse } => {
                let ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.to_ascii_lowercase());
                match ext.as_deref() {
                    Some("ply") => load_ply(path, *reverse),
                    Some("obj") => load_obj(path, *reverse),
                    _ => Err(RenderError::MeshLoad {
                        path: path.clone(),
                        reason: "unsupported mesh format (expected .ply or .obj)".to_string(),
                    }),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_of_scaled_sphere() {
        let mesh = sphere(12).unwrap();
        let scaled: Vec<Vec3> = mesh.positions().iter().map(|p| *p * 2.5).collect();
        let b = Bounds::from_points(&scaled).unwrap();
        assert!((b.radius - 2.5).abs() < 1e-4);
        assert!(b.center.length() < 1e-4);
    }

    #[test]
    fn normalizing_transform_fits_unit_box() {
        let pts = [Vec3::new(2.0, 4.0, 6.0), Vec3::new(6.0, 8.0, 10.0), Vec3::new(4.0, 5.0, 8.0)];
        let b = Bounds::from_points(&pts).unwrap();
        assert_eq!(b.center, Vec3::new(4.0, 6.0, 8.0));
        assert_eq!(b.radius, 2.0);
        let m = b.normalizing_transform();
        let lo = m.transform_point3(b.min);
        let hi = m.transform_point3(b.max);
        assert!(lo.abs_diff_eq(Vec3::splat(-1.0), 1e-5));
        assert!(hi.abs_diff_eq(Vec3::splat(1.0), 1e-5));
    }

    #[test]
    fn rejects_mismatched_attributes() {
        let err = Mesh::new(
            vec![Vec3::ZERO; 3],
            vec![Vec3::Z; 2],
            vec![Vec2::ZERO; 3],
            vec![Vec3::X; 3],
            Faces::Triangles(vec![[0, 1, 2]]),
            Material::LOADED,
        );
        assert!(matches!(err, Err(RenderError::InvalidMesh(_))));
    }

    #[test]
    fn rejects_out_of_range_index() {
        let err = Mesh::new(
            vec![Vec3::ZERO; 3],
            vec![Vec3::Z; 3],
            vec![Vec2::ZERO; 3],
            vec![Vec3::X; 3],
            Faces::Triangles(vec![[0, 1, 3]]),
            Material::LOADED,
        );
        assert!(matches!(err, Err(RenderError::InvalidMesh(_))));
    }

    #[test]
    fn quads_split_into_two_triangles() {
        let mesh = Mesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
            vec![Vec3::Z; 4],
            vec![Vec2::ZERO; 4],
            vec![Vec3::X; 4],
            Faces::Quads(vec![[0, 1, 2, 3]]),
            Material::GROUND,
        )
        .unwrap();
        assert_eq!(mesh.triangle_indices(), vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn unknown_extension_is_a_load_error() {
        let shape = Shape::Loaded { path: PathBuf::from("model.stl"), reverse: false };
        assert!(matches!(shape.build(), Err(RenderError::MeshLoad { .. })));
    }
}
