use crate::graphics::gpu::GpuContext;

#[derive(Clone, Debug)]
pub struct GpuShader {
    shader: wgpu::ShaderModule,
}

impl GpuShader {
    /// Initialize from file at compile time.
    pub fn create(gpu: &GpuContext, desc: wgpu::ShaderModuleDescriptor<'_>) -> Self {
        let shader = gpu.device().create_shader_module(desc);
        Self { shader }
    }

    /// The textured, vertex-colored quad shader.
    pub fn quad(gpu: &GpuContext) -> Self {
        Self::create(gpu, wgpu::include_wgsl!("../shaders/quad.wgsl"))
    }

    /// Get the actual shader.
    pub fn handle(&self) -> &wgpu::ShaderModule {
        &self.shader
    }
}
