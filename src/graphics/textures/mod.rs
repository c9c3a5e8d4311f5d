pub mod atlas_texture;
pub mod cache;
