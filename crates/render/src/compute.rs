//! Marching compute pipeline.
//!
//! Wraps `ray_march.wgsl` behind a fixed bind layout: output storage texture
//! at group 0, camera uniform at group 1, performance uniform at group 2.

use tracing::info;

/// Workgroup edge length; one workgroup covers one 8x8 tile.
pub const WORKGROUP_SIZE: u32 = 8;

/// Layout for a single uniform buffer visible to the compute stage.
pub fn uniform_bind_group_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

/// Bind group pairing one uniform buffer with the layout above.
pub fn uniform_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    })
}

pub struct MarchPipeline {
    pipeline: wgpu::ComputePipeline,
    output_layout: wgpu::BindGroupLayout,
}

impl MarchPipeline {
    pub fn new(
        device: &wgpu::Device,
        camera_layout: &wgpu::BindGroupLayout,
        performance_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        info!("creating ray march compute pipeline");

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Ray March Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("ray_march.wgsl").into()),
        });

        let output_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("March Output Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: wgpu::TextureFormat::Rgba8Unorm,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("March Pipeline Layout"),
            bind_group_layouts: &[&output_layout, camera_layout, performance_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Ray March Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "ray_march",
        });

        Self {
            pipeline,
            output_layout,
        }
    }

    /// Dispatch one frame: a ceil-divided grid of 8x8 workgroups over the
    /// canvas. The shader guards invocations past the edge.
    pub fn dispatch(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        output: &wgpu::TextureView,
        camera_bind_group: &wgpu::BindGroup,
        performance_bind_group: &wgpu::BindGroup,
        width: u32,
        height: u32,
    ) {
        let output_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("March Output Bind Group"),
            layout: &self.output_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(output),
            }],
        });

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Ray March Pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &output_bind_group, &[]);
        pass.set_bind_group(1, camera_bind_group, &[]);
        pass.set_bind_group(2, performance_bind_group, &[]);
        pass.dispatch_workgroups(
            width.div_ceil(WORKGROUP_SIZE),
            height.div_ceil(WORKGROUP_SIZE),
            1,
        );
    }
}
