//! GPU-compatible type definitions for the marching shader.
//!
//! These structs are uploaded as uniform buffers and must match the WGSL
//! declarations in `ray_march.wgsl` byte for byte, padding included.

use bytemuck::{Pod, Zeroable};
use march::{CameraFrame, PerformanceState};

/// Uniform mirror of [`march::CameraFrame`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CameraData {
    pub view_proj: [[f32; 4]; 4],
    pub position: [f32; 3],
    pub _pad0: f32,
    pub forward: [f32; 3],
    pub _pad1: f32,
    pub screen_size: [f32; 2],
    pub _pad2: [f32; 2],
}

impl From<&CameraFrame> for CameraData {
    fn from(frame: &CameraFrame) -> Self {
        Self {
            view_proj: frame.view_proj.to_cols_array_2d(),
            position: frame.position.into(),
            _pad0: 0.0,
            forward: frame.forward.into(),
            _pad1: 0.0,
            screen_size: frame.screen_size.into(),
            _pad2: [0.0; 2],
        }
    }
}

/// Uniform mirror of [`march::PerformanceState`], published once per frame.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct PerformanceData {
    pub base_voxel_size: f32,
    pub frame_time: f32,
    pub _pad: [f32; 2],
}

impl From<&PerformanceState> for PerformanceData {
    fn from(state: &PerformanceState) -> Self {
        Self {
            base_voxel_size: state.base_voxel_size,
            frame_time: state.frame_time,
            _pad: [0.0; 2],
        }
    }
}
