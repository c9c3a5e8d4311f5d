pub mod constants;
pub mod gpu;
pub mod quad;
pub mod textures;
