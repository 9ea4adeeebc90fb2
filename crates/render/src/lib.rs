//! GPU presentation layer for the adaptive volumetric marcher.
//!
//! The actual marching runs in `ray_march.wgsl`, a compute-shader mirror of
//! the `march` crate, dispatched over 8x8 workgroups. This crate owns the
//! device plumbing around it: uniform upload, the blit to the surface, the
//! fly camera, the frame loop and offscreen capture.

pub mod blit;
pub mod camera;
pub mod compute;
pub mod gpu_types;
pub mod monitor;
pub mod offscreen;
pub mod run;
pub mod state;

pub use run::run;
pub use state::RendererConfig;
