pub const ATLAS_TEXTURE_BIND_GROUP_SLOT: u32 = 0;

pub const VERTEX_BUFFER_SLOT: u32 = 0;
pub const INDEX_BUFFER_FORMAT: wgpu::IndexFormat = wgpu::IndexFormat::Uint32;

pub const VERTICES_PER_QUAD: usize = 4;
pub const INDICES_PER_QUAD: usize = 6;

/// The most quads an atlas can hold while every index fits into [`INDEX_BUFFER_FORMAT`].
pub const MAX_QUADS: usize = u32::MAX as usize / INDICES_PER_QUAD;
