//! Headless capture: one GPU frame into a PNG, no window required.
//!
//! Also hosts the PNG export for CPU-rendered films so the runtime can
//! exercise the `march` crate end to end without a GPU.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glam::Vec3;
use tracing::info;
use wgpu::util::DeviceExt;

use march::{CameraFrame, Film, PerformanceState};

use crate::compute::{uniform_bind_group, uniform_bind_group_layout, MarchPipeline};
use crate::gpu_types::{CameraData, PerformanceData};

/// Parameters for a single offscreen frame.
#[derive(Debug, Clone, Copy)]
pub struct ScreenshotConfig {
    pub width: u32,
    pub height: u32,
    pub eye: Vec3,
    pub target: Vec3,
    pub base_voxel_size: f32,
}

/// Render one frame on the GPU and save it as a timestamped PNG in the
/// working directory. Returns the written path.
///
/// # Errors
///
/// Fails when no adapter/device is available or the readback/encode fails.
pub fn capture(config: &ScreenshotConfig) -> Result<PathBuf> {
    info!("initializing headless capture at {}x{}", config.width, config.height);

    let instance = wgpu::Instance::default();
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .context("failed to get adapter")?;

    let (device, queue) = pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: Some("Capture Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
        },
        None,
    ))
    .context("failed to request device")?;

    #[allow(clippy::cast_precision_loss)]
    let frame = CameraFrame::look_at(
        config.eye,
        config.target,
        glam::Vec2::new(config.width as f32, config.height as f32),
    );
    let perf = PerformanceState {
        base_voxel_size: config.base_voxel_size,
        frame_time: 1.0 / 60.0,
    };

    let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Camera Buffer"),
        contents: bytemuck::bytes_of(&CameraData::from(&frame)),
        usage: wgpu::BufferUsages::UNIFORM,
    });
    let performance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Performance Buffer"),
        contents: bytemuck::bytes_of(&PerformanceData::from(&perf)),
        usage: wgpu::BufferUsages::UNIFORM,
    });

    let camera_layout = uniform_bind_group_layout(&device, "Camera Layout");
    let performance_layout = uniform_bind_group_layout(&device, "Performance Layout");
    let camera_bind_group = uniform_bind_group(&device, &camera_layout, &camera_buffer, "Camera Bind Group");
    let performance_bind_group =
        uniform_bind_group(&device, &performance_layout, &performance_buffer, "Performance Bind Group");
    let pipeline = MarchPipeline::new(&device, &camera_layout, &performance_layout);

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Capture Texture"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    // Readback rows must be aligned to 256 bytes.
    let unpadded_bytes_per_row = config.width * 4;
    let padded_bytes_per_row =
        unpadded_bytes_per_row.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let readback = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Capture Readback"),
        size: u64::from(padded_bytes_per_row) * u64::from(config.height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Capture Encoder"),
    });
    pipeline.dispatch(
        &device,
        &mut encoder,
        &texture_view,
        &camera_bind_group,
        &performance_bind_group,
        config.width,
        config.height,
    );
    encoder.copy_texture_to_buffer(
        texture.as_image_copy(),
        wgpu::ImageCopyBuffer {
            buffer: &readback,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded_bytes_per_row),
                rows_per_image: Some(config.height),
            },
        },
        wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(Some(encoder.finish()));

    let slice = readback.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        tx.send(result).ok();
    });
    let _ = device.poll(wgpu::Maintain::Wait);
    rx.recv()
        .context("map_async callback dropped")?
        .context("failed to map readback buffer")?;

    let mut pixels = Vec::with_capacity((config.width * config.height * 4) as usize);
    {
        let data = slice.get_mapped_range();
        for row in 0..config.height {
            let start = (row * padded_bytes_per_row) as usize;
            pixels.extend_from_slice(&data[start..start + unpadded_bytes_per_row as usize]);
        }
    }
    readback.unmap();

    let path = PathBuf::from(format!(
        "capture_{}_{}x{}.png",
        chrono::Local::now().format("%Y%m%d_%H%M%S"),
        config.width,
        config.height
    ));
    save_rgba8(&pixels, config.width, config.height, &path)?;
    info!("capture saved to {}", path.display());
    Ok(path)
}

/// Save a CPU-rendered film as a PNG.
///
/// # Errors
///
/// Propagates PNG encoding failures.
pub fn write_film_png(film: &Film, path: &Path) -> Result<()> {
    save_rgba8(&film.to_rgba8(), film.width(), film.height(), path)
}

fn save_rgba8(pixels: &[u8], width: u32, height: u32, path: &Path) -> Result<()> {
    let image = image::RgbaImage::from_raw(width, height, pixels.to_vec())
        .context("pixel buffer does not match image dimensions")?;
    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
