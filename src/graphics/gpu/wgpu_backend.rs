use std::ops::Range;
use std::path::Path;

use crate::graphics::{
    constants::{ATLAS_TEXTURE_BIND_GROUP_SLOT, INDEX_BUFFER_FORMAT, VERTEX_BUFFER_SLOT},
    gpu::{
        BufferKind, GpuBackend, GpuContext, GpuResult, bind_group::GpuBindGroup,
        buffer::GpuBuffer, texture::GpuTexture,
    },
    textures::atlas_texture::AtlasTexture,
};

/// The wgpu implementation of the GPU services.
///
/// Draws are recorded into a [`wgpu::RenderPass`] whose pipeline expects the atlas
/// texture at [`ATLAS_TEXTURE_BIND_GROUP_SLOT`] and quad vertices at [`VERTEX_BUFFER_SLOT`].
#[derive(Clone, Debug)]
pub struct WgpuBackend {
    gpu: GpuContext,
    texture_layout: wgpu::BindGroupLayout,
}

impl WgpuBackend {
    /// Instantiate, creating the bind group layout shared by all atlas textures.
    pub fn new(gpu: GpuContext) -> Self {
        let texture_layout =
            GpuBindGroup::create_layout("atlas_texture", &gpu, &GpuTexture::BIND_GROUP_LAYOUT_ENTRIES);
        Self {
            gpu,
            texture_layout,
        }
    }

    /// The layout atlas textures are bound with; render pipelines need this.
    pub fn texture_layout(&self) -> &wgpu::BindGroupLayout {
        &self.texture_layout
    }

    /// Create an atlas texture from an already decoded image.
    pub fn texture_from_image(&self, img: &image::DynamicImage, label: &str) -> AtlasTexture {
        let texture = GpuTexture::from_image(&self.gpu, img, Some(label));
        AtlasTexture::new(&self.gpu, texture, &self.texture_layout, label)
    }
}

impl GpuBackend for WgpuBackend {
    type Buffer = GpuBuffer;
    type Texture = AtlasTexture;
    type Pass<'pass> = wgpu::RenderPass<'pass>;

    fn allocate_buffer(&self, kind: BufferKind, label: &str, size: u64) -> GpuResult<GpuBuffer> {
        GpuBuffer::create_writeable_uninit(label, &self.gpu, kind, size)
    }

    fn update_subrange(&self, buffer: &GpuBuffer, offset: u64, bytes: &[u8]) {
        buffer.write(&self.gpu, offset, bytes);
    }

    fn release_buffer(&self, buffer: GpuBuffer) {
        // wgpu frees the storage once submitted work stops using it; a draw recorded
        // earlier in the frame may still reference this buffer.
        drop(buffer);
    }

    fn load_texture(&self, path: &Path) -> GpuResult<AtlasTexture> {
        let bytes = std::fs::read(path)?;
        let label = path.to_string_lossy();
        let texture = GpuTexture::from_bytes(&self.gpu, &bytes, &label)?;
        Ok(AtlasTexture::new(
            &self.gpu,
            texture,
            &self.texture_layout,
            &label,
        ))
    }

    fn texture_dimensions(&self, texture: &AtlasTexture) -> (u32, u32) {
        texture.inner().dimensions()
    }

    fn bind(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        texture: &AtlasTexture,
        vertices: &GpuBuffer,
        indices: &GpuBuffer,
    ) {
        pass.set_bind_group(
            ATLAS_TEXTURE_BIND_GROUP_SLOT,
            texture.bind_group().handle(),
            &[],
        );
        pass.set_vertex_buffer(VERTEX_BUFFER_SLOT, vertices.handle().slice(..));
        pass.set_index_buffer(indices.handle().slice(..), INDEX_BUFFER_FORMAT);
    }

    fn draw_indexed(&self, pass: &mut wgpu::RenderPass<'_>, indices: Range<u32>) {
        pass.draw_indexed(indices, 0, 0..1);
    }
}
