#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! # Adaptive Volumetric Ray Marcher
//!
//! Core library for a performance-adaptive volumetric renderer. Every pixel
//! of a frame is resolved independently by marching a camera ray through an
//! axis-aligned scene bound, sampling a voxel scene at adaptively sized steps
//! and compositing absorption until an opaque hit or a budget runs out.
//!
//! ## Key Components
//!
//! -   **Scene sampling:** [`SceneSampler`] maps any world position to a
//!     [`VoxelSample`]. Two variants exist behind the same capability: a
//!     procedural Cornell-room scene and a trilinear [`DensityGrid`].
//! -   **Marching:** [`MarchState`] is the per-ray state machine. Its step
//!     transition is a pure function, so the whole march is unit-testable
//!     without any dispatch context.
//! -   **Feedback control:** [`PerformanceController`] consumes one frame
//!     time per frame and retunes the global step coarseness, published as an
//!     immutable [`PerformanceState`] snapshot at the frame boundary.
//! -   **Dispatch:** [`Film`] plus [`render_frame`] form the CPU reference
//!     for the GPU compute path: a flat grid of 8x8 tiles, each pixel reading
//!     only frame-global immutable inputs.
//!
//! The per-pixel path is total: rays that miss, leave the bound or exhaust
//! their budget all resolve to defined colors, never to errors.

pub mod bounds;
pub mod composite;
pub mod control;
pub mod film;
pub mod grid;
pub mod marcher;
pub mod ray;
pub mod sample;

pub use bounds::{scene_bounds, Aabb, Interval};
pub use composite::Accumulated;
pub use control::{PerformanceController, PerformanceState};
pub use film::{render_frame, Film, TILE_SIZE};
pub use grid::{DensityGrid, GridError};
pub use marcher::{march, shade, MarchState};
pub use ray::{CameraFrame, Ray};
pub use sample::{SceneSampler, VoxelSample};
