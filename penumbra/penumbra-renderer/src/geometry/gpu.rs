//! GPU-resident meshes: interleaved vertex buffer + u32 triangle list.

use std::sync::Arc;

use super::{Material, Mesh};

/// Interleaved vertex, stride 44. Locations: 0 position, 1 normal, 2 texcoord, 3 tangent.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub texcoord: [f32; 2],
    pub tangent: [f32; 3],
}

impl Vertex {
    pub const STRIDE: u64 = std::mem::size_of::<Vertex>() as u64;

    const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2,
        3 => Float32x3
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Self::STRIDE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Uploaded mesh. Buffers are shared so draw lists can hold cheap clones.
#[derive(Clone)]
pub struct GpuMesh {
    pub vertex_buf: Arc<wgpu::Buffer>,
    pub index_buf: Arc<wgpu::Buffer>,
    pub index_count: u32,
    pub material: Material,
}

impl GpuMesh {
    pub fn upload(device: &wgpu::Device, queue: &wgpu::Queue, label: &str, mesh: &Mesh) -> Self {
        let vertices = mesh.vertices();
        let indices = mesh.triangle_indices();
        let vertex_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label}_vertex")),
            size: (vertices.len() as u64) * Vertex::STRIDE,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&vertex_buf, 0, bytemuck::cast_slice(&vertices));
        let index_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label}_index")),
            size: (indices.len() * std::mem::size_of::<u32>()) as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&index_buf, 0, bytemuck::cast_slice(&indices));
        log::debug!("uploaded mesh '{label}': {} vertices, {} indices", vertices.len(), indices.len());
        Self {
            vertex_buf: Arc::new(vertex_buf),
            index_buf: Arc::new(index_buf),
            index_count: indices.len() as u32,
            material: mesh.material(),
        }
    }

    pub fn draw(&self, rp: &mut wgpu::RenderPass<'_>) {
        rp.set_vertex_buffer(0, self.vertex_buf.slice(..));
        rp.set_index_buffer(self.index_buf.slice(..), wgpu::IndexFormat::Uint32);
        rp.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_is_tightly_packed() {
        assert_eq!(Vertex::STRIDE, 44);
        let layout = Vertex::layout();
        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24, 32]);
    }
}
