use crate::graphics::gpu::{BufferKind, GpuContext, GpuError, GpuResult};

#[derive(Clone, Debug)]
pub struct GpuBuffer {
    buffer: wgpu::Buffer,
}

impl GpuBuffer {
    /// Creates a writeable buffer that is uninitialized but has fixed capacity of `size` bytes.
    ///
    /// Fails if `size` is more than the device allows for a single buffer.
    pub fn create_writeable_uninit(
        label: &str,
        gpu: &GpuContext,
        kind: BufferKind,
        size: u64,
    ) -> GpuResult<Self> {
        let max = gpu.device().limits().max_buffer_size;
        if size > max {
            return Err(GpuError::BufferTooLarge {
                label: label.into(),
                size,
                max,
            });
        }

        let usage = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
        };
        let buffer = gpu.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(Self { buffer })
    }

    /// Write `bytes` into the buffer at `offset`.
    ///
    /// The write is queued and lands before the next submitted command buffer.
    pub fn write(&self, gpu: &GpuContext, offset: u64, bytes: &[u8]) {
        gpu.queue().write_buffer(&self.buffer, offset, bytes);
    }

    /// Get the actual buffer.
    pub fn handle(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}
