pub mod graphics;

pub use graphics::gpu::{GpuBackend, GpuError, GpuResult};
pub use graphics::quad::atlas::{AtlasError, AtlasResult, QuadAtlas};
pub use graphics::quad::{Quad, QuadVertex};
pub use graphics::textures::cache::TextureCache;
