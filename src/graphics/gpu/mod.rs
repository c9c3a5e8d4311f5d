pub mod bind_group;
pub mod buffer;
pub mod pipeline;
pub mod recording;
pub mod shader;
pub mod texture;
pub mod wgpu_backend;

use std::ops::Range;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Abstraction over GPU-related data.
#[derive(Clone, Debug)]
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl GpuContext {
    /// Instantiate.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

/// What a buffer allocated through a [`GpuBackend`] is used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferKind {
    Vertex,
    Index,
}

/// The GPU services a quad atlas needs: buffer storage, texture loading and draw submission.
///
/// A backend owns none of the buffers it hands out; whoever allocated a buffer is
/// responsible for handing it back through [`GpuBackend::release_buffer`].
pub trait GpuBackend {
    /// A GPU-resident buffer.
    type Buffer;
    /// A sampled 2D texture, ready to be bound for drawing.
    type Texture;
    /// Whatever draw commands are recorded into.
    type Pass<'pass>;

    /// Allocate a writeable buffer of `size` bytes.
    fn allocate_buffer(&self, kind: BufferKind, label: &str, size: u64) -> GpuResult<Self::Buffer>;

    /// Overwrite `bytes.len()` bytes of the buffer, starting at `offset`.
    ///
    /// A backend may stage the write until its next submission, so draws recorded
    /// before and after the write within one submission can both see the new bytes.
    fn update_subrange(&self, buffer: &Self::Buffer, offset: u64, bytes: &[u8]);

    /// Release the buffer's storage.
    fn release_buffer(&self, buffer: Self::Buffer);

    /// Resolve an image file into a texture.
    fn load_texture(&self, path: &Path) -> GpuResult<Self::Texture>;

    /// Pixel dimensions of the texture, as `(width, height)`.
    fn texture_dimensions(&self, texture: &Self::Texture) -> (u32, u32);

    /// Bind the texture and the vertex/index buffers for the following draws.
    fn bind(
        &self,
        pass: &mut Self::Pass<'_>,
        texture: &Self::Texture,
        vertices: &Self::Buffer,
        indices: &Self::Buffer,
    );

    /// Issue an indexed draw over the given index range.
    fn draw_indexed(&self, pass: &mut Self::Pass<'_>, indices: Range<u32>);
}

/// An error from the GPU services.
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("Buffer {label} needs {size} bytes, but the device allows at most {max}")]
    BufferTooLarge { label: String, size: u64, max: u64 },
    #[error("No texture could be resolved for {0:?}")]
    TextureNotFound(PathBuf),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Image(#[from] image::ImageError),
}

/// A result from the GPU services.
pub type GpuResult<T> = Result<T, GpuError>;
