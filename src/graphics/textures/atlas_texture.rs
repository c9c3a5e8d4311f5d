use crate::graphics::gpu::{GpuContext, bind_group::GpuBindGroup, texture::GpuTexture};

/// A texture shared by every quad of an atlas, together with the bind group sampling it.
#[derive(Clone, Debug)]
pub struct AtlasTexture {
    texture: GpuTexture,
    bind_group: GpuBindGroup,
}

impl AtlasTexture {
    /// Wrap a texture, creating its bind group against `layout`.
    pub fn new(
        gpu: &GpuContext,
        texture: GpuTexture,
        layout: &wgpu::BindGroupLayout,
        label: &str,
    ) -> Self {
        let bind_group =
            GpuBindGroup::create_with_layout(label, gpu, layout, &texture.bind_group_entries());
        Self {
            texture,
            bind_group,
        }
    }

    /// Get a handle to the texture.
    pub fn inner(&self) -> &GpuTexture {
        &self.texture
    }

    /// Get the bind group sampling the texture.
    pub fn bind_group(&self) -> &GpuBindGroup {
        &self.bind_group
    }
}
