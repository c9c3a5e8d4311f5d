use crate::graphics::gpu::GpuContext;

/// Abstraction of a bind group.
#[derive(Clone, Debug)]
pub struct GpuBindGroup {
    group: wgpu::BindGroup,
}

impl GpuBindGroup {
    /// Create a bind group layout, to share between many bind groups.
    pub fn create_layout(
        label: &str,
        gpu: &GpuContext,
        layout_entries: &[wgpu::BindGroupLayoutEntry],
    ) -> wgpu::BindGroupLayout {
        gpu.device()
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: layout_entries,
                label: Some(&format!("{label}_layout")),
            })
    }

    /// Create the bind group against an existing layout.
    pub fn create_with_layout(
        label: &str,
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        entries: &[wgpu::BindGroupEntry],
    ) -> Self {
        let group = gpu.device().create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries,
            label: Some(label),
        });

        Self { group }
    }

    /// Get the actual bind group.
    pub fn handle(&self) -> &wgpu::BindGroup {
        &self.group
    }
}
