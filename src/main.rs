use std::env;
use std::rc::Rc;

use anyhow::Context;
use quad_atlas::graphics::gpu::{
    GpuContext, pipeline::GpuPipeline, shader::GpuShader, texture::GpuTexture,
    wgpu_backend::WgpuBackend,
};
use quad_atlas::{Quad, QuadAtlas, QuadVertex, TextureCache};
use wgpu::{
    Backends, DeviceDescriptor, ExperimentalFeatures, Features, Instance, InstanceDescriptor,
    Limits, PowerPreference, RequestAdapterOptions, Trace,
};

const TARGET_SIZE: u32 = 256;
const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
const DEFAULT_CAPACITY: usize = 4;

/// Renders a handful of quads from one atlas into an offscreen texture.
///
/// Usage: `quad_atlas [texture path] [capacity]`. Without a path a checkerboard is used.
fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let texture_path = args.next();
    let capacity = args
        .next()
        .map(|arg| arg.parse::<usize>())
        .transpose()
        .context("capacity must be a whole number")?
        .unwrap_or(DEFAULT_CAPACITY);

    pollster::block_on(run(texture_path, capacity))
}

async fn run(texture_path: Option<String>, capacity: usize) -> anyhow::Result<()> {
    let instance = Instance::new(&InstanceDescriptor {
        backends: Backends::PRIMARY,
        ..Default::default()
    });
    let adapter = instance
        .request_adapter(&RequestAdapterOptions {
            power_preference: PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await?;
    let (device, queue) = adapter
        .request_device(&DeviceDescriptor {
            label: None,
            required_features: Features::empty(),
            experimental_features: ExperimentalFeatures::disabled(),
            required_limits: Limits::default(),
            memory_hints: Default::default(),
            trace: Trace::Off,
        })
        .await?;

    let gpu = GpuContext::new(device, queue);
    let backend = WgpuBackend::new(gpu.clone());
    let mut cache = TextureCache::new();

    let mut atlas = match texture_path {
        Some(path) => QuadAtlas::from_file(backend.clone(), &mut cache, &path, capacity)
            .with_context(|| format!("couldn't create an atlas for {path}"))?,
        None => {
            let texture = Rc::new(backend.texture_from_image(&checkerboard(), "checkerboard"));
            QuadAtlas::with_texture(backend.clone(), "checkerboard", texture, capacity)?
        }
    };
    let (width, height) = atlas.texture_dimensions();
    log::info!("Atlas texture is {width}x{height}");

    let white = [255, 255, 255, 255];
    let full_uv = [0.0, 0.0, 1.0, 1.0];
    atlas.insert_quad(Quad::from_rect([-0.9, -0.9, 0.8, 0.8], full_uv, white), 0)?;
    atlas.insert_quad(Quad::from_rect([-0.4, -0.4, 0.8, 0.8], full_uv, [255, 128, 128, 255]), 1)?;
    atlas.insert_quad(Quad::from_rect([0.1, 0.1, 0.8, 0.8], full_uv, [128, 128, 255, 200]), 2)?;
    atlas.insert_quad_from_index(0, 2)?;
    atlas.remove_quad_at_index(1)?;
    log::info!("{atlas}, capacity {}", atlas.capacity());

    {
        let mut session = atlas.begin_write(0..1)?;
        session[0].bottom_left.color = [255, 255, 0, 255];
    }

    let target = GpuTexture::create_render_target(
        &gpu,
        "offscreen_target",
        TARGET_SIZE,
        TARGET_SIZE,
        TARGET_FORMAT,
    );
    let shader = GpuShader::quad(&gpu);
    let pipeline = GpuPipeline::create_quad(
        "quad_pipeline",
        &gpu,
        TARGET_FORMAT,
        &[backend.texture_layout()],
        &[QuadVertex::desc()],
        shader.handle(),
    );

    let mut encoder = gpu
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });
    {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("render_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.view(),
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        render_pass.set_pipeline(pipeline.handle());
        atlas.draw_quads(&mut render_pass)?;
    }
    gpu.queue().submit([encoder.finish()]);

    log::info!(
        "Rendered {} quads into a {TARGET_SIZE}x{TARGET_SIZE} target (dirty: {})",
        atlas.total_quads(),
        atlas.is_dirty()
    );
    Ok(())
}

fn checkerboard() -> image::DynamicImage {
    let img = image::RgbaImage::from_fn(64, 64, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            image::Rgba([255, 255, 255, 255])
        } else {
            image::Rgba([40, 40, 40, 255])
        }
    });
    image::DynamicImage::ImageRgba8(img)
}
