//! Windowed renderer state and the per-frame sequence.
//!
//! One frame runs strictly in this order: measure the frame time, feed the
//! controller, publish the new performance snapshot to the GPU, upload the
//! camera, dispatch the compute marcher, blit, present. The controller is
//! the only writer of the performance uniform and touches it exactly once
//! per frame boundary.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use glam::Vec3;
use tracing::info;
use wgpu::util::DeviceExt;
use winit::event::WindowEvent;
use winit::window::Window;

use march::PerformanceController;

use crate::blit::BlitPipeline;
use crate::camera::{CameraController, FlyCamera};
use crate::compute::{uniform_bind_group, uniform_bind_group_layout, MarchPipeline};
use crate::gpu_types::{CameraData, PerformanceData};
use crate::monitor::FrameMonitor;

/// Front-end configuration for the windowed renderer.
#[derive(Debug, Clone, Copy)]
pub struct RendererConfig {
    pub eye: Vec3,
    pub target: Vec3,
    pub target_fps: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 1.0, -2.5),
            target: Vec3::new(0.0, 1.0, 1.0),
            target_fps: 60.0,
        }
    }
}

pub struct State {
    pub window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    march_pipeline: MarchPipeline,
    blit_pipeline: BlitPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    performance_buffer: wgpu::Buffer,
    performance_bind_group: wgpu::BindGroup,
    output_view: wgpu::TextureView,
    camera: FlyCamera,
    camera_controller: CameraController,
    controller: PerformanceController,
    pub monitor: FrameMonitor,
    last_frame: Instant,
    frame_count: u32,
}

impl State {
    pub async fn new(window: Arc<Window>, renderer_config: RendererConfig) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::from_window(&*window)?)?
        };
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to get adapter")?;
        info!("using adapter: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Marcher Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .context("failed to request device")?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            desired_maximum_frame_latency: 2,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let camera = FlyCamera::new(renderer_config.eye, renderer_config.target);
        let camera_data = CameraData::from(&camera.frame(config.width, config.height));
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::bytes_of(&camera_data),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let controller = PerformanceController::new(renderer_config.target_fps);
        let performance_data = PerformanceData::from(&controller.snapshot());
        let performance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Performance Buffer"),
            contents: bytemuck::bytes_of(&performance_data),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_layout = uniform_bind_group_layout(&device, "Camera Layout");
        let performance_layout = uniform_bind_group_layout(&device, "Performance Layout");
        let camera_bind_group = uniform_bind_group(&device, &camera_layout, &camera_buffer, "Camera Bind Group");
        let performance_bind_group =
            uniform_bind_group(&device, &performance_layout, &performance_buffer, "Performance Bind Group");

        let march_pipeline = MarchPipeline::new(&device, &camera_layout, &performance_layout);
        let blit_pipeline = BlitPipeline::new(&device, format);

        let output_view = create_output_view(&device, config.width, config.height);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            march_pipeline,
            blit_pipeline,
            camera_buffer,
            camera_bind_group,
            performance_buffer,
            performance_bind_group,
            output_view,
            camera,
            camera_controller: CameraController::new(2.5, 0.002),
            controller,
            monitor: FrameMonitor::new(),
            last_frame: Instant::now(),
            frame_count: 0,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            info!("resizing to {}x{}", new_size.width, new_size.height);
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.output_view = create_output_view(&self.device, new_size.width, new_size.height);
        }
    }

    /// Route keyboard input to the camera controller.
    pub fn input(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    winit::event::KeyEvent {
                        physical_key: winit::keyboard::PhysicalKey::Code(keycode),
                        state,
                        ..
                    },
                ..
            } => self.camera_controller.process_keyboard(*keycode, *state),
            _ => false,
        }
    }

    pub fn mouse_motion(&mut self, delta_x: f64, delta_y: f64) {
        self.camera_controller
            .process_mouse(&mut self.camera, delta_x, delta_y);
    }

    pub fn update(&mut self, dt: f32) {
        self.camera_controller.update_camera(&mut self.camera, dt);
    }

    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let now = Instant::now();
        let frame_time = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.monitor.record_frame(frame_time);

        // Frame boundary: the controller runs once, and whatever snapshot it
        // publishes is what every invocation of this frame reads.
        let perf = self.controller.update(frame_time);
        self.queue.write_buffer(
            &self.performance_buffer,
            0,
            bytemuck::bytes_of(&PerformanceData::from(&perf)),
        );

        let camera_data = CameraData::from(&self.camera.frame(self.config.width, self.config.height));
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&camera_data));

        let output = self.surface.get_current_texture()?;
        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        self.march_pipeline.dispatch(
            &self.device,
            &mut encoder,
            &self.output_view,
            &self.camera_bind_group,
            &self.performance_bind_group,
            self.config.width,
            self.config.height,
        );
        self.blit_pipeline
            .blit(&self.device, &mut encoder, &self.output_view, &surface_view);

        self.queue.submit(Some(encoder.finish()));
        output.present();

        self.frame_count += 1;
        if self.frame_count % 60 == 0 {
            info!(
                "frame time: {:.2} ms, fps: {:.1}, base voxel size: {:.4}",
                frame_time * 1000.0,
                1.0 / frame_time,
                self.controller.base_voxel_size()
            );
        }
        Ok(())
    }
}

fn create_output_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("March Output Texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
