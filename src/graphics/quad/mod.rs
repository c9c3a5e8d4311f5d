pub mod atlas;
pub mod indices;
pub mod session;

/// The data for a quad vertex: position, RGBA color and texture coordinates.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 3],
    pub color: [u8; 4],
    pub tex_coords: [f32; 2],
}

impl QuadVertex {
    pub fn new(position: [f32; 3], color: [u8; 4], tex_coords: [f32; 2]) -> Self {
        Self {
            position,
            color,
            tex_coords,
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 0,
                    shader_location: 0,
                },
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Unorm8x4,
                    offset: size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                },
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x2,
                    offset: (size_of::<[f32; 3]>() + size_of::<[u8; 4]>()) as wgpu::BufferAddress,
                    shader_location: 2,
                },
            ],
        }
    }
}

/// A textured, colored rectangle; four vertices drawn as two triangles.
///
/// Vertex order is the one the index buffer expects.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Quad {
    pub bottom_left: QuadVertex,
    pub bottom_right: QuadVertex,
    pub top_left: QuadVertex,
    pub top_right: QuadVertex,
}

impl Quad {
    /// A quad with every vertex zeroed. Draws nothing visible.
    pub const EMPTY: Quad = Quad {
        bottom_left: QuadVertex {
            position: [0.0; 3],
            color: [0; 4],
            tex_coords: [0.0; 2],
        },
        bottom_right: QuadVertex {
            position: [0.0; 3],
            color: [0; 4],
            tex_coords: [0.0; 2],
        },
        top_left: QuadVertex {
            position: [0.0; 3],
            color: [0; 4],
            tex_coords: [0.0; 2],
        },
        top_right: QuadVertex {
            position: [0.0; 3],
            color: [0; 4],
            tex_coords: [0.0; 2],
        },
    };

    /// Size of a quad in a vertex buffer, in bytes.
    pub const SIZE: u64 = size_of::<Quad>() as u64;

    /// An axis-aligned quad.
    ///
    /// `rect` and `uv_rect` are `[x, y, width, height]`, with `y` growing upwards for
    /// `rect` and downwards (image rows) for `uv_rect`.
    pub fn from_rect(rect: [f32; 4], uv_rect: [f32; 4], color: [u8; 4]) -> Self {
        let [x, y, w, h] = rect;
        let [u, v, uw, vh] = uv_rect;
        Self {
            bottom_left: QuadVertex::new([x, y, 0.0], color, [u, v + vh]),
            bottom_right: QuadVertex::new([x + w, y, 0.0], color, [u + uw, v + vh]),
            top_left: QuadVertex::new([x, y + h, 0.0], color, [u, v]),
            top_right: QuadVertex::new([x + w, y + h, 0.0], color, [u + uw, v]),
        }
    }

    /// The vertices, in buffer order.
    pub fn vertices(&self) -> [QuadVertex; 4] {
        [
            self.bottom_left,
            self.bottom_right,
            self.top_left,
            self.top_right,
        ]
    }
}
