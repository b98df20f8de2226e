//! Loaded triangle meshes. File parsers push positions and polygons into a
//! [`TriangleSink`]; [`MeshBuilder`] turns that stream into a shaded mesh.

use std::path::Path;

use glam::{Vec2, Vec3};
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};

use super::{Faces, Material, Mesh};
use crate::error::RenderError;

/// Receiver for a parser's vertex and face stream.
pub trait TriangleSink {
    fn push_position(&mut self, position: Vec3);
    /// A polygon as vertex indices. Anything past three vertices is fanned around the first.
    fn push_polygon(&mut self, indices: &[u32]);
}

#[derive(Debug, Default)]
pub struct MeshBuilder {
    positions: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
}

impl TriangleSink for MeshBuilder {
    fn push_position(&mut self, position: Vec3) {
        self.positions.push(position);
    }

    fn push_polygon(&mut self, indices: &[u32]) {
        if indices.len() < 3 {
            return;
        }
        for k in 2..indices.len() {
            self.triangles.push([indices[0], indices[k - 1], indices[k]]);
        }
    }
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Smooth vertex normals from area-independent face normals, planar texture
    /// coordinates from (x, y), constant +X tangents.
    pub fn finish(self, reverse: bool) -> Result<Mesh, RenderError> {
        let n = self.positions.len();
        if let Some(bad) = self.triangles.iter().flatten().find(|&&i| i as usize >= n) {
            return Err(RenderError::InvalidMesh(format!("face index {bad} out of range for {n} vertices")));
        }
        let mut normals = vec![Vec3::ZERO; n];
        for &[i0, i1, i2] in &self.triangles {
            let (v0, v1, v2) = (
                self.positions[i0 as usize],
                self.positions[i1 as usize],
                self.positions[i2 as usize],
            );
            let mut face = (v1 - v0).cross(v2 - v0);
            if reverse {
                face = -face;
            }
            let face = face.normalize_or_zero();
            normals[i0 as usize] += face;
            normals[i1 as usize] += face;
            normals[i2 as usize] += face;
        }
        let normals: Vec<Vec3> = normals.into_iter().map(|v| v.normalize_or_zero()).collect();
        let texcoords: Vec<Vec2> = self.positions.iter().map(|p| p.truncate()).collect();
        let tangents = vec![Vec3::X; n];
        Mesh::new(
            self.positions,
            normals,
            texcoords,
            tangents,
            Faces::Triangles(self.triangles),
            Material::LOADED,
        )
    }
}

fn scalar(property: &Property) -> Option<f32> {
    Some(match *property {
        Property::Float(v) => v,
        Property::Double(v) => v as f32,
        Property::Int(v) => v as f32,
        Property::UInt(v) => v as f32,
        Property::Short(v) => v as f32,
        Property::UShort(v) => v as f32,
        Property::Char(v) => v as f32,
        Property::UChar(v) => v as f32,
        _ => return None,
    })
}

fn index_list(property: &Property) -> Option<Vec<u32>> {
    Some(match property {
        Property::ListInt(v) => v.iter().map(|&i| i as u32).collect(),
        Property::ListUInt(v) => v.clone(),
        Property::ListShort(v) => v.iter().map(|&i| i as u32).collect(),
        Property::ListUShort(v) => v.iter().map(|&i| i as u32).collect(),
        Property::ListChar(v) => v.iter().map(|&i| i as u32).collect(),
        Property::ListUChar(v) => v.iter().map(|&i| i as u32).collect(),
        _ => return None,
    })
}

/// Streams a PLY file's `vertex` (x, y, z) and `face` (vertex_indices) elements into `sink`.
pub fn read_ply_into(path: &Path, sink: &mut impl TriangleSink) -> Result<(), RenderError> {
    let load_err = |reason: String| RenderError::MeshLoad { path: path.to_path_buf(), reason };
    let mut file = std::fs::File::open(path).map_err(|source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parser = Parser::<DefaultElement>::new();
    let ply = parser.read_ply(&mut file).map_err(|e| load_err(e.to_string()))?;

    let vertices = ply
        .payload
        .get("vertex")
        .ok_or_else(|| load_err("no vertex element".to_string()))?;
    for (i, v) in vertices.iter().enumerate() {
        let coord = |name: &str| v.get(name).and_then(scalar);
        match (coord("x"), coord("y"), coord("z")) {
            (Some(x), Some(y), Some(z)) => sink.push_position(Vec3::new(x, y, z)),
            _ => return Err(load_err(format!("vertex {i} is missing x/y/z"))),
        }
    }

    let faces = ply
        .payload
        .get("face")
        .ok_or_else(|| load_err("no face element".to_string()))?;
    for (i, f) in faces.iter().enumerate() {
        let indices = f
            .get("vertex_indices")
            .or_else(|| f.get("vertex_index"))
            .and_then(index_list)
            .ok_or_else(|| load_err(format!("face {i} has no vertex index list")))?;
        sink.push_polygon(&indices);
    }
    Ok(())
}

pub fn load_ply(path: &Path, reverse: bool) -> Result<Mesh, RenderError> {
    let mut builder = MeshBuilder::new();
    read_ply_into(path, &mut builder)?;
    log::info!(
        "loaded {}: {} triangles",
        path.display(),
        builder.triangle_count()
    );
    builder.finish(reverse)
}

/// OBJ through tobj, all models merged into one mesh. File normals and UVs are
/// ignored so OBJ and PLY meshes shade the same way.
pub fn load_obj(path: &Path, reverse: bool) -> Result<Mesh, RenderError> {
    let (models, _) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS).map_err(|e| RenderError::MeshLoad {
        path: path.to_path_buf(),
        reason: format!("{e:?}"),
    })?;
    let mut builder = MeshBuilder::new();
    for model in models {
        let base = builder.positions.len() as u32;
        for p in model.mesh.positions.chunks_exact(3) {
            builder.push_position(Vec3::new(p[0], p[1], p[2]));
        }
        for tri in model.mesh.indices.chunks_exact(3) {
            builder.push_polygon(&[base + tri[0], base + tri[1], base + tri[2]]);
        }
    }
    log::info!(
        "loaded {}: {} triangles",
        path.display(),
        builder.triangle_count()
    );
    builder.finish(reverse)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_builder() -> MeshBuilder {
        let mut b = MeshBuilder::new();
        b.push_position(Vec3::new(0.0, 0.0, 0.0));
        b.push_position(Vec3::new(1.0, 0.0, 0.0));
        b.push_position(Vec3::new(1.0, 1.0, 0.0));
        b.push_position(Vec3::new(0.0, 1.0, 0.0));
        b.push_polygon(&[0, 1, 2, 3]);
        b
    }

    #[test]
    fn quad_fans_into_two_triangles() {
        let b = quad_builder();
        assert_eq!(b.triangles, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn normals_follow_winding_and_reverse_flag() {
        let mesh = quad_builder().finish(false).unwrap();
        assert!(mesh.normals().iter().all(|n| n.abs_diff_eq(Vec3::Z, 1e-6)));
        let flipped = quad_builder().finish(true).unwrap();
        assert!(flipped.normals().iter().all(|n| n.abs_diff_eq(-Vec3::Z, 1e-6)));
        assert_eq!(mesh.texcoords()[2], Vec2::new(1.0, 1.0));
        assert_eq!(mesh.material(), Material::LOADED);
    }

    #[test]
    fn shared_vertex_normal_is_normalized_average() {
        // Two faces meeting at a right angle along the x axis.
        let mut b = MeshBuilder::new();
        b.push_position(Vec3::new(0.0, 0.0, 0.0));
        b.push_position(Vec3::new(1.0, 0.0, 0.0));
        b.push_position(Vec3::new(0.0, 1.0, 0.0));
        b.push_position(Vec3::new(0.0, 0.0, 1.0));
        b.push_polygon(&[0, 1, 2]);
        b.push_polygon(&[0, 3, 1]);
        let mesh = b.finish(false).unwrap();
        let expected = (Vec3::Z + Vec3::Y).normalize();
        assert!(mesh.normals()[0].abs_diff_eq(expected, 1e-6));
        assert!((mesh.normals()[1].length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_polygons_are_dropped() {
        let mut b = MeshBuilder::new();
        b.push_polygon(&[0, 1]);
        assert_eq!(b.triangle_count(), 0);
    }

    #[test]
    fn out_of_range_face_is_rejected() {
        let mut b = MeshBuilder::new();
        b.push_position(Vec3::ZERO);
        b.push_polygon(&[0, 1, 2]);
        assert!(matches!(b.finish(false), Err(RenderError::InvalidMesh(_))));
    }

    #[test]
    fn reads_ascii_ply() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("square.ply");
        std::fs::write(
            &path,
            "ply\nformat ascii 1.0\nelement vertex 4\nproperty float x\nproperty float y\nproperty float z\n\
             element face 1\nproperty list uchar int vertex_indices\nend_header\n\
             0 0 0\n1 0 0\n1 1 0\n0 1 0\n4 0 1 2 3\n",
        )
        .unwrap();
        let mesh = load_ply(&path, false).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.faces().len(), 2);
        assert!(mesh.normals()[0].abs_diff_eq(Vec3::Z, 1e-6));
    }

    #[test]
    fn reads_obj_quads_as_triangles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("square.obj");
        std::fs::write(&path, "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n").unwrap();
        let mesh = load_obj(&path, true).unwrap();
        assert_eq!(mesh.faces().len(), 2);
        assert!(mesh.normals().iter().all(|n| n.abs_diff_eq(-Vec3::Z, 1e-6)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_ply(Path::new("/nonexistent/bunny.ply"), false);
        assert!(matches!(err, Err(RenderError::Io { .. })));
    }
}
