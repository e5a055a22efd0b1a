use crate::color::Color;

/// A vertex as recorded between `begin_shape` and `end_shape`, in the shape's local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    /// Normalized texture coordinates, if the vertex was given any.
    pub uv: Option<[f32; 2]>,
    pub fill: Color,
    pub stroke: Color,
    pub normal: Option<[f32; 3]>,
}

impl Vertex {
    pub fn new(position: [f32; 3], fill: Color, stroke: Color) -> Self {
        Self {
            position,
            uv: None,
            fill,
            stroke,
            normal: None,
        }
    }

    pub fn with_uv(mut self, uv: [f32; 2]) -> Self {
        self.uv = Some(uv);
        self
    }

    pub fn with_normal(mut self, normal: Option<[f32; 3]>) -> Self {
        self.normal = normal;
        self
    }
}

/// Tessellated vertex, still in the shape's local frame, ready for transformation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub color: Color,
    pub uv: [f32; 2],
    pub normal: Option<[f32; 3]>,
}

/// Vertex layout consumed by the backends: clip-space position (GL depth convention),
/// straight-alpha color and normalized texture coordinates.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuVertex {
    pub clip: [f32; 4],
    pub color: [f32; 4],
    pub tex_coords: [f32; 2],
}

impl GpuVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x4, 1 => Float32x4, 2 => Float32x2];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}
